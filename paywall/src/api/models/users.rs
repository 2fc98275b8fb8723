//! API request/response models for accounts.

use super::pagination::Pagination;
use crate::db::models::accounts::AccountDBResponse;
use crate::entitlements::{ADMIN_ROLE, Identity, Tier, resolve_tier};
use crate::types::AccountId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// The verified caller of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    #[schema(value_type = String, format = "uuid")]
    pub id: AccountId,
    pub email: Option<String>,
}

impl From<&CurrentUser> for Identity {
    fn from(user: &CurrentUser) -> Self {
        Identity {
            account_id: user.id,
            email: user.email.clone(),
        }
    }
}

impl From<&AccountDBResponse> for CurrentUser {
    fn from(account: &AccountDBResponse) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: AccountId,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: Option<String>,
    /// Plan name as written by billing or an administrator
    pub subscription_tier: Option<String>,
    /// Access tier resolved from `role` and `subscription_tier`
    pub tier: Tier,
    pub is_admin: bool,
    /// Whether the account is linked to a payment provider customer
    pub has_payment_customer: bool,
    pub payment_status: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AccountDBResponse> for AccountResponse {
    fn from(account: AccountDBResponse) -> Self {
        let tier = resolve_tier(Some(&account.snapshot()));
        Self {
            id: account.id,
            is_admin: account.role.as_deref() == Some(ADMIN_ROLE),
            has_payment_customer: account.payment_customer_id.is_some(),
            email: account.email,
            display_name: account.display_name,
            role: account.role,
            subscription_tier: account.subscription_tier,
            tier,
            payment_status: account.payment_status,
            current_period_end: account.current_period_end,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountCreate {
    pub email: String,
    /// Omit to create an account that cannot log in with a password
    pub password: Option<String>,
    pub display_name: Option<String>,
    pub role: Option<String>,
    /// Plan name; `Inactive` or an empty value leaves the account without a plan
    pub subscription_tier: Option<String>,
}

/// Partial update. For `role` and `subscription_tier`, an explicit `null` clears the value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AccountUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub role: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub subscription_tier: Option<Option<String>>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListAccountsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive match on email or display name
    pub search: Option<String>,
}

/// Normalise a plan name from the admin console. `Inactive`, `free` and blank values mean no plan.
pub fn normalize_subscription_tier(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("inactive") || trimmed.eq_ignore_ascii_case("free") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Blank roles are stored as `NULL`.
pub fn normalize_role(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn inactive_status_means_no_plan() {
        assert_eq!(normalize_subscription_tier(Some("Inactive".to_string())), None);
        assert_eq!(normalize_subscription_tier(Some("  ".to_string())), None);
        assert_eq!(normalize_subscription_tier(Some("free".to_string())), None);
        assert_eq!(normalize_subscription_tier(None), None);
        assert_eq!(
            normalize_subscription_tier(Some(" Quant Edge ".to_string())),
            Some("Quant Edge".to_string())
        );
    }

    #[test]
    fn update_distinguishes_null_from_missing() {
        let update: AccountUpdate = serde_json::from_str(r#"{"subscription_tier": null}"#).unwrap();
        assert_eq!(update.subscription_tier, Some(None));
        assert_eq!(update.role, None);

        let update: AccountUpdate = serde_json::from_str(r#"{"role": "admin"}"#).unwrap();
        assert_eq!(update.role, Some(Some("admin".to_string())));
    }

    #[test]
    fn response_resolves_tier() {
        let now = Utc::now();
        let account = AccountDBResponse {
            id: Uuid::new_v4(),
            email: Some("a@example.com".to_string()),
            display_name: None,
            role: Some("admin".to_string()),
            subscription_tier: Some("Inactive".to_string()),
            password_hash: Some("secret-hash".to_string()),
            payment_customer_id: Some("cus_123".to_string()),
            payment_subscription_id: None,
            payment_status: None,
            current_period_end: None,
            created_at: now,
            updated_at: now,
        };

        let response = AccountResponse::from(account);
        assert_eq!(response.tier, Tier::Admin);
        assert!(response.is_admin);
        assert!(response.has_payment_customer);

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("password_hash").is_none());
    }
}
