//! Stripe subscription webhooks.
//!
//! Deliveries carry a `stripe-signature` header of the form `t=<unix>,v1=<hex>[,v1=<hex>]`,
//! where each `v1` is HMAC-SHA256 over `"{t}.{body}"` keyed with the endpoint secret.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, warn};

use super::{BillingAction, FREE_TIER, PaymentError, PaymentProvider, Result, WebhookEvent, stored_tier};
use crate::{config::StripeConfig, db::models::accounts::AccountBillingUpdate, types::AccountId};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Metadata key set on checkout sessions and subscriptions to identify the account
pub const ACCOUNT_METADATA_KEY: &str = "account_id";

pub struct StripeProvider {
    webhook_secret: String,
    price_tiers: HashMap<String, String>,
    tolerance: Duration,
}

impl From<StripeConfig> for StripeProvider {
    fn from(config: StripeConfig) -> Self {
        Self {
            webhook_secret: config.webhook_secret,
            price_tiers: config.price_tiers,
            tolerance: config.signature_tolerance,
        }
    }
}

/// Compute the hex `v1` signature for a payload.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a `stripe-signature` header against `payload` at time `now` (unix seconds).
pub fn verify_signature(header: &str, payload: &str, secret: &str, tolerance: Duration, now: i64) -> Result<()> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| PaymentError::InvalidSignature("timestamp is not a number".to_string()))?,
                )
            }
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| PaymentError::InvalidSignature("missing timestamp".to_string()))?;
    if signatures.is_empty() {
        return Err(PaymentError::InvalidSignature("no v1 signature".to_string()));
    }

    let age = now.saturating_sub(timestamp).unsigned_abs();
    if age > tolerance.as_secs() {
        return Err(PaymentError::InvalidSignature(format!("timestamp outside tolerance ({age}s)")));
    }

    let signed = format!("{timestamp}.{payload}");
    for signature in signatures {
        let Ok(expected) = hex::decode(signature) else {
            continue;
        };
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| PaymentError::InvalidSignature(e.to_string()))?;
        mac.update(signed.as_bytes());
        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }

    Err(PaymentError::InvalidSignature("no matching signature".to_string()))
}

#[derive(Debug, Deserialize)]
struct StripeEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CheckoutSession {
    customer: Option<String>,
    subscription: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
    customer_details: Option<CustomerDetails>,
}

#[derive(Debug, Deserialize)]
struct CustomerDetails {
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Subscription {
    id: String,
    customer: String,
    status: String,
    current_period_end: Option<i64>,
    #[serde(default)]
    metadata: HashMap<String, String>,
    items: SubscriptionItems,
}

#[derive(Debug, Default, Deserialize)]
struct SubscriptionItems {
    #[serde(default)]
    data: Vec<SubscriptionItem>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionItem {
    price: Option<Price>,
    /// Newer API versions report the period per item
    current_period_end: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Price {
    id: String,
}

fn account_from_metadata(metadata: &HashMap<String, String>) -> Option<AccountId> {
    let raw = metadata.get(ACCOUNT_METADATA_KEY)?;
    match raw.parse() {
        Ok(id) => Some(id),
        Err(_) => {
            warn!(account_id = %raw, "Ignoring malformed account id in payment metadata");
            None
        }
    }
}

fn parse_object<T: for<'de> Deserialize<'de>>(event_type: &str, object: serde_json::Value) -> Result<T> {
    serde_json::from_value(object).map_err(|e| PaymentError::InvalidData(format!("{event_type}: {e}")))
}

impl StripeProvider {
    /// Tier name for a price. Unknown prices fall back to the free tier.
    pub fn tier_for_price(&self, price_id: &str) -> &str {
        self.price_tiers.get(price_id).map(String::as_str).unwrap_or(FREE_TIER)
    }

    fn subscription_action(&self, event_type: &str, subscription: Subscription) -> BillingAction {
        let deleted = event_type == "customer.subscription.deleted";
        let first_item = subscription.items.data.first();
        let price_id = first_item.and_then(|item| item.price.as_ref()).map(|price| price.id.as_str());

        let tier = match price_id {
            _ if deleted || subscription.status == "canceled" => FREE_TIER,
            Some(price_id) => self.tier_for_price(price_id),
            None => {
                warn!(subscription_id = %subscription.id, "Subscription has no price, ignoring");
                return BillingAction::Ignore;
            }
        };

        let current_period_end = subscription
            .current_period_end
            .or_else(|| first_item.and_then(|item| item.current_period_end))
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0));

        BillingAction::SyncSubscription {
            account_id: account_from_metadata(&subscription.metadata),
            customer_id: subscription.customer,
            update: AccountBillingUpdate {
                subscription_tier: stored_tier(tier),
                payment_subscription_id: Some(subscription.id),
                payment_status: Some(subscription.status),
                current_period_end,
            },
        }
    }

    /// Turn a verified payload into an event.
    fn parse_event(&self, body: &str) -> Result<WebhookEvent> {
        let event: StripeEvent = serde_json::from_str(body).map_err(|e| PaymentError::InvalidData(e.to_string()))?;
        let event_type = event.event_type;

        let action = match event_type.as_str() {
            "checkout.session.completed" => {
                let session: CheckoutSession = parse_object(&event_type, event.data.object)?;
                match session.customer {
                    Some(customer_id) => BillingAction::LinkCustomer {
                        account_id: account_from_metadata(&session.metadata),
                        email: session.customer_details.and_then(|details| details.email),
                        customer_id,
                        subscription_id: session.subscription,
                    },
                    None => {
                        warn!("Checkout session completed without a customer, ignoring");
                        BillingAction::Ignore
                    }
                }
            }
            "customer.subscription.created" | "customer.subscription.updated" | "customer.subscription.deleted" => {
                let subscription: Subscription = parse_object(&event_type, event.data.object)?;
                self.subscription_action(&event_type, subscription)
            }
            other => {
                debug!("Ignoring webhook event type: {}", other);
                BillingAction::Ignore
            }
        };

        Ok(WebhookEvent { event_type, action })
    }
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    fn name(&self) -> &'static str {
        "stripe"
    }

    async fn validate_webhook(&self, headers: &HeaderMap, body: &str) -> Result<WebhookEvent> {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .ok_or_else(|| PaymentError::InvalidSignature(format!("missing {SIGNATURE_HEADER} header")))?
            .to_str()
            .map_err(|e| PaymentError::InvalidSignature(e.to_string()))?;

        verify_signature(signature, body, &self.webhook_secret, self.tolerance, Utc::now().timestamp())?;
        self.parse_event(body)
    }
}
