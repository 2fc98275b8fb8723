//! Payment provider abstraction for subscription webhooks.
//!
//! The payment processor owns the subscription lifecycle. This service only observes it:
//! providers turn a webhook delivery into a [`WebhookEvent`], and [`apply_webhook_event`]
//! writes the resulting plan onto the matching accounts. The access policy then reads
//! `subscription_tier` like any other account field.
//!
//! ```text
//! POST /webhooks/payments
//!        │
//!        ↓
//! PaymentProvider::validate_webhook   (signature, parsing)
//!        │
//!        ↓
//! PaymentProvider::process_webhook_event → accounts.subscription_tier
//! ```

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode};
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use crate::{
    config::PaymentConfig,
    db::{
        errors::DbError,
        handlers::{Accounts, Repository},
        models::accounts::{AccountBillingUpdate, AccountUpdateDBRequest},
    },
    types::{AccountId, abbrev_uuid},
};

pub mod dummy;
pub mod stripe;

/// Tier name the processor uses for "no paid plan". Stored as `NULL`.
pub const FREE_TIER: &str = "free";

/// Create a payment provider from configuration
pub fn create_provider(config: PaymentConfig) -> Box<dyn PaymentProvider> {
    match config {
        PaymentConfig::Stripe(stripe_config) => Box::new(stripe::StripeProvider::from(stripe_config)),
        PaymentConfig::Dummy(dummy_config) => Box::new(dummy::DummyProvider::from(dummy_config)),
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid payment data: {0}")]
    InvalidData(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl From<&PaymentError> for StatusCode {
    fn from(err: &PaymentError) -> Self {
        match err {
            PaymentError::InvalidSignature(_) | PaymentError::InvalidData(_) => StatusCode::BAD_REQUEST,
            // The processor retries deliveries that fail with a server error
            PaymentError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// What a webhook delivery asks us to change.
#[derive(Debug, Clone, PartialEq)]
pub enum BillingAction {
    /// Checkout finished: remember which processor customer belongs to which account.
    LinkCustomer {
        account_id: Option<AccountId>,
        email: Option<String>,
        customer_id: String,
        subscription_id: Option<String>,
    },
    /// Subscription created, changed or ended. `update.subscription_tier` is already mapped.
    SyncSubscription {
        customer_id: String,
        /// Fallback when no account is linked to `customer_id` yet
        account_id: Option<AccountId>,
        update: AccountBillingUpdate,
    },
    /// Set an account's plan directly.
    SetTier { account_id: AccountId, tier: Option<String> },
    /// Acknowledged without changes.
    Ignore,
}

/// A validated webhook delivery
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEvent {
    /// Provider event type (e.g. "customer.subscription.updated")
    pub event_type: String,
    pub action: BillingAction,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &'static str;

    /// Validate and parse a webhook delivery.
    ///
    /// Returns `Err(InvalidSignature)` for unauthenticated deliveries and `Err(InvalidData)` for
    /// authenticated payloads that cannot be parsed.
    async fn validate_webhook(&self, headers: &HeaderMap, body: &str) -> Result<WebhookEvent>;

    /// Apply a validated event. Safe to call more than once for the same event.
    async fn process_webhook_event(&self, db_pool: &PgPool, event: &WebhookEvent) -> Result<()> {
        apply_webhook_event(db_pool, event).await
    }
}

/// Map a processor tier name to the stored value. The free tier is stored as `NULL`.
pub fn stored_tier(name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() || name.eq_ignore_ascii_case(FREE_TIER) {
        None
    } else {
        Some(name.to_string())
    }
}

/// Write the effect of a webhook event to the accounts table.
///
/// Events that reference no known account are logged and acknowledged; retrying them would
/// not help.
#[instrument(skip(db_pool, event), fields(event_type = %event.event_type), err)]
pub async fn apply_webhook_event(db_pool: &PgPool, event: &WebhookEvent) -> Result<()> {
    let mut conn = db_pool.acquire().await.map_err(DbError::from)?;
    let mut accounts = Accounts::new(&mut conn);

    match &event.action {
        BillingAction::LinkCustomer {
            account_id,
            email,
            customer_id,
            subscription_id,
        } => {
            let account_id = match (account_id, email) {
                (Some(id), _) => Some(*id),
                (None, Some(email)) => accounts.get_by_email(email).await?.map(|a| a.id),
                (None, None) => None,
            };

            let Some(account_id) = account_id else {
                warn!(customer_id = %customer_id, "Checkout completed for an unknown account");
                return Ok(());
            };

            if accounts.link_payment_customer(account_id, customer_id, subscription_id.as_deref()).await? {
                info!(account_id = %abbrev_uuid(&account_id), customer_id = %customer_id, "Linked payment customer");
            } else {
                warn!(account_id = %abbrev_uuid(&account_id), "Checkout completed for an account that does not exist");
            }
        }
        BillingAction::SyncSubscription {
            customer_id,
            account_id,
            update,
        } => {
            let mut updated = accounts.update_billing_by_customer(customer_id, update).await?;

            if updated == 0
                && let Some(account_id) = account_id
                && accounts.update_billing_by_id(*account_id, customer_id, update).await?
            {
                updated = 1;
            }

            if updated == 0 {
                warn!(customer_id = %customer_id, "No account found for payment customer");
            } else {
                info!(
                    customer_id = %customer_id,
                    accounts = updated,
                    tier = update.subscription_tier.as_deref().unwrap_or(FREE_TIER),
                    "Synced subscription"
                );
            }
        }
        BillingAction::SetTier { account_id, tier } => {
            let request = AccountUpdateDBRequest {
                subscription_tier: Some(tier.clone()),
                ..Default::default()
            };
            match accounts.update(*account_id, &request).await {
                Ok(_) => info!(account_id = %abbrev_uuid(account_id), tier = tier.as_deref().unwrap_or(FREE_TIER), "Set subscription tier"),
                Err(DbError::NotFound) => {
                    return Err(PaymentError::InvalidData(format!("account {account_id} not found")));
                }
                Err(e) => return Err(e.into()),
            }
        }
        BillingAction::Ignore => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::accounts::AccountCreateDBRequest;

    async fn create_account(pool: &PgPool, email: &str) -> AccountId {
        let mut conn = pool.acquire().await.unwrap();
        Accounts::new(&mut conn)
            .create(&AccountCreateDBRequest {
                email: email.to_string(),
                display_name: None,
                role: None,
                subscription_tier: None,
                password_hash: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn tier_of(pool: &PgPool, id: AccountId) -> Option<String> {
        let mut conn = pool.acquire().await.unwrap();
        Accounts::new(&mut conn).get_by_id(id).await.unwrap().unwrap().subscription_tier
    }

    fn sync(customer_id: &str, account_id: Option<AccountId>, tier: Option<&str>) -> WebhookEvent {
        WebhookEvent {
            event_type: "customer.subscription.updated".to_string(),
            action: BillingAction::SyncSubscription {
                customer_id: customer_id.to_string(),
                account_id,
                update: AccountBillingUpdate {
                    subscription_tier: tier.map(str::to_string),
                    payment_subscription_id: Some("sub_1".to_string()),
                    payment_status: Some("active".to_string()),
                    current_period_end: None,
                },
            },
        }
    }

    #[test]
    fn free_tier_is_stored_as_null() {
        assert_eq!(stored_tier("free"), None);
        assert_eq!(stored_tier("Free"), None);
        assert_eq!(stored_tier(""), None);
        assert_eq!(stored_tier("quant edge"), Some("quant edge".to_string()));
    }

    #[test]
    fn status_codes() {
        assert_eq!(StatusCode::from(&PaymentError::InvalidSignature("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            StatusCode::from(&PaymentError::Database(DbError::Other(anyhow::anyhow!("down")))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_checkout_links_by_email_then_subscription_syncs(pool: PgPool) {
        let id = create_account(&pool, "buyer@example.com").await;

        let link = WebhookEvent {
            event_type: "checkout.session.completed".to_string(),
            action: BillingAction::LinkCustomer {
                account_id: None,
                email: Some("BUYER@example.com".to_string()),
                customer_id: "cus_1".to_string(),
                subscription_id: Some("sub_1".to_string()),
            },
        };
        apply_webhook_event(&pool, &link).await.unwrap();

        apply_webhook_event(&pool, &sync("cus_1", None, Some("active trader"))).await.unwrap();
        assert_eq!(tier_of(&pool, id).await.as_deref(), Some("active trader"));

        apply_webhook_event(&pool, &sync("cus_1", None, None)).await.unwrap();
        assert_eq!(tier_of(&pool, id).await, None);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_sync_falls_back_to_account_metadata(pool: PgPool) {
        let id = create_account(&pool, "meta@example.com").await;

        apply_webhook_event(&pool, &sync("cus_unlinked", Some(id), Some("quant edge"))).await.unwrap();
        assert_eq!(tier_of(&pool, id).await.as_deref(), Some("quant edge"));

        let mut conn = pool.acquire().await.unwrap();
        let account = Accounts::new(&mut conn).get_by_id(id).await.unwrap().unwrap();
        assert_eq!(account.payment_customer_id.as_deref(), Some("cus_unlinked"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unknown_customer_is_acknowledged(pool: PgPool) {
        apply_webhook_event(&pool, &sync("cus_nobody", None, Some("quant edge"))).await.unwrap();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_set_tier_for_missing_account_is_invalid(pool: PgPool) {
        let event = WebhookEvent {
            event_type: "dummy".to_string(),
            action: BillingAction::SetTier {
                account_id: uuid::Uuid::new_v4(),
                tier: Some("quant edge".to_string()),
            },
        };
        let err = apply_webhook_event(&pool, &event).await.unwrap_err();
        assert!(matches!(err, PaymentError::InvalidData(_)));
    }
}
