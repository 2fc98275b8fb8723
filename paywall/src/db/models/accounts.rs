//! Database models for accounts.

use crate::entitlements::AccountSnapshot;
use crate::types::AccountId;
use chrono::{DateTime, Utc};

/// Database request for creating a new account
#[derive(Debug, Clone)]
pub struct AccountCreateDBRequest {
    pub email: String,
    pub display_name: Option<String>,
    pub role: Option<String>,
    pub subscription_tier: Option<String>,
    pub password_hash: Option<String>,
}

/// Database request for updating an account
///
/// `None` leaves a column untouched. The nested options on `role` and
/// `subscription_tier` distinguish "leave alone" from "clear".
#[derive(Debug, Clone, Default)]
pub struct AccountUpdateDBRequest {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: Option<Option<String>>,
    pub subscription_tier: Option<Option<String>>,
    pub password_hash: Option<String>,
}

/// Billing state written from payment provider events
#[derive(Debug, Clone, PartialEq)]
pub struct AccountBillingUpdate {
    pub subscription_tier: Option<String>,
    pub payment_subscription_id: Option<String>,
    pub payment_status: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
}

/// Database response for an account
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountDBResponse {
    pub id: AccountId,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: Option<String>,
    pub subscription_tier: Option<String>,
    pub password_hash: Option<String>,
    pub payment_customer_id: Option<String>,
    pub payment_subscription_id: Option<String>,
    pub payment_status: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccountDBResponse {
    pub fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            role: self.role.clone(),
            subscription_tier: self.subscription_tier.clone(),
        }
    }
}
