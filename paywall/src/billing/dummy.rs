//! Unsigned development provider.
//!
//! Accepts `{"account_id": "<uuid>", "tier": "quant edge"}` and sets the account's plan. There
//! is no signature, so this must never be configured in production.

use async_trait::async_trait;
use axum::http::HeaderMap;
use serde::Deserialize;

use super::{BillingAction, PaymentError, PaymentProvider, Result, WebhookEvent, stored_tier};
use crate::{config::DummyConfig, types::AccountId};

pub const EVENT_TYPE: &str = "dummy.tier_changed";

pub struct DummyProvider {
    default_tier: Option<String>,
}

impl From<DummyConfig> for DummyProvider {
    fn from(config: DummyConfig) -> Self {
        Self {
            default_tier: config.default_tier,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DummyEvent {
    account_id: AccountId,
    #[serde(default)]
    tier: Option<String>,
}

#[async_trait]
impl PaymentProvider for DummyProvider {
    fn name(&self) -> &'static str {
        "dummy"
    }

    async fn validate_webhook(&self, _headers: &HeaderMap, body: &str) -> Result<WebhookEvent> {
        let event: DummyEvent = serde_json::from_str(body).map_err(|e| PaymentError::InvalidData(e.to_string()))?;
        let tier = event.tier.or_else(|| self.default_tier.clone());

        Ok(WebhookEvent {
            event_type: EVENT_TYPE.to_string(),
            action: BillingAction::SetTier {
                account_id: event.account_id,
                tier: tier.as_deref().and_then(stored_tier),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::{Accounts, Repository};
    use crate::db::models::accounts::AccountCreateDBRequest;
    use sqlx::PgPool;
    use uuid::Uuid;

    fn provider(default_tier: Option<&str>) -> DummyProvider {
        DummyProvider::from(DummyConfig {
            default_tier: default_tier.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn test_parses_tier_change() {
        let account_id = Uuid::new_v4();
        let body = format!(r#"{{"account_id":"{account_id}","tier":"active trader"}}"#);

        let event = provider(None).validate_webhook(&HeaderMap::new(), &body).await.unwrap();
        assert_eq!(
            event.action,
            BillingAction::SetTier {
                account_id,
                tier: Some("active trader".to_string())
            }
        );
    }

    #[tokio::test]
    async fn test_missing_tier_uses_default_and_free_is_null() {
        let account_id = Uuid::new_v4();
        let body = format!(r#"{{"account_id":"{account_id}"}}"#);

        let event = provider(Some("curious retail")).validate_webhook(&HeaderMap::new(), &body).await.unwrap();
        assert!(matches!(event.action, BillingAction::SetTier { tier: Some(ref t), .. } if t == "curious retail"));

        let body = format!(r#"{{"account_id":"{account_id}","tier":"free"}}"#);
        let event = provider(None).validate_webhook(&HeaderMap::new(), &body).await.unwrap();
        assert!(matches!(event.action, BillingAction::SetTier { tier: None, .. }));
    }

    #[tokio::test]
    async fn test_garbage_is_invalid_data() {
        let err = provider(None).validate_webhook(&HeaderMap::new(), "not json").await.unwrap_err();
        assert!(matches!(err, PaymentError::InvalidData(_)));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_dummy_full_flow(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let account = Accounts::new(&mut conn)
            .create(&AccountCreateDBRequest {
                email: "dev@example.com".to_string(),
                display_name: None,
                role: None,
                subscription_tier: None,
                password_hash: None,
            })
            .await
            .unwrap();

        let provider = provider(None);
        let body = format!(r#"{{"account_id":"{}","tier":"quant edge"}}"#, account.id);
        let event = provider.validate_webhook(&HeaderMap::new(), &body).await.unwrap();
        provider.process_webhook_event(&pool, &event).await.unwrap();

        let updated = Accounts::new(&mut conn).get_by_id(account.id).await.unwrap().unwrap();
        assert_eq!(updated.subscription_tier.as_deref(), Some("quant edge"));
    }
}
