//! Normalizes raw account state into an access tier.
//!
//! Subscription names arrive as free text written by the billing webhook or by
//! an admin ("Curious Retail", "Active Trader", "Quant Edge") and older
//! accounts still carry legacy values such as `"active"`. Matching is by
//! case-insensitive substring so every spelling collapses onto one [`Tier`].

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// The role value that grants administrator access regardless of subscription.
pub const ADMIN_ROLE: &str = "admin";

/// Normalized access level of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// No account, or no paid subscription
    None,
    /// Free plan with a monthly allowance of gated views
    Curious,
    Active,
    Quant,
    Admin,
}

impl Tier {
    /// Whether access for this tier is metered by the monthly quota.
    pub fn is_quota_bound(self) -> bool {
        matches!(self, Tier::Curious)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::None => "none",
            Tier::Curious => "curious",
            Tier::Active => "active",
            Tier::Quant => "quant",
            Tier::Admin => "admin",
        };
        f.write_str(name)
    }
}

/// The subset of an account record the tier depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub role: Option<String>,
    pub subscription_tier: Option<String>,
}

/// Resolve the tier of an account. First matching rule wins:
///
/// 1. no account: [`Tier::None`]
/// 2. role is exactly `admin`: [`Tier::Admin`]
/// 3. subscription mentions `admin`, `quant`, `active` or `curious`, checked in that order
/// 4. anything else (missing, blank, unknown): [`Tier::None`]
pub fn resolve_tier(account: Option<&AccountSnapshot>) -> Tier {
    let Some(account) = account else {
        return Tier::None;
    };

    if account.role.as_deref() == Some(ADMIN_ROLE) {
        return Tier::Admin;
    }

    let subscription = account.subscription_tier.as_deref().unwrap_or_default().to_lowercase();

    if subscription.contains("admin") {
        Tier::Admin
    } else if subscription.contains("quant") {
        Tier::Quant
    } else if subscription.contains("active") {
        Tier::Active
    } else if subscription.contains("curious") {
        Tier::Curious
    } else {
        Tier::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(role: Option<&str>, tier: Option<&str>) -> AccountSnapshot {
        AccountSnapshot {
            role: role.map(str::to_string),
            subscription_tier: tier.map(str::to_string),
        }
    }

    fn resolve(role: Option<&str>, tier: Option<&str>) -> Tier {
        resolve_tier(Some(&account(role, tier)))
    }

    #[test]
    fn missing_account_has_no_tier() {
        assert_eq!(resolve_tier(None), Tier::None);
    }

    #[test]
    fn admin_role_overrides_subscription() {
        assert_eq!(resolve(Some("admin"), None), Tier::Admin);
        assert_eq!(resolve(Some("admin"), Some("Inactive")), Tier::Admin);
        assert_eq!(resolve(Some("admin"), Some("Curious Retail")), Tier::Admin);
    }

    #[test]
    fn role_match_is_exact() {
        // Only the subscription text is case-folded
        assert_eq!(resolve(Some("Admin"), None), Tier::None);
        assert_eq!(resolve(Some("user"), Some("Quant Edge")), Tier::Quant);
    }

    #[test]
    fn admin_subscription_text() {
        assert_eq!(resolve(None, Some("Admin")), Tier::Admin);
        assert_eq!(resolve(None, Some("super-ADMIN")), Tier::Admin);
    }

    #[test]
    fn product_names() {
        assert_eq!(resolve(None, Some("Quant Edge")), Tier::Quant);
        assert_eq!(resolve(None, Some("Active Trader")), Tier::Active);
        assert_eq!(resolve(None, Some("Curious Retail")), Tier::Curious);
    }

    #[test]
    fn legacy_and_mixed_case_values() {
        assert_eq!(resolve(None, Some("active")), Tier::Active);
        assert_eq!(resolve(None, Some("QUANT")), Tier::Quant);
        assert_eq!(resolve(None, Some("cUrIoUs")), Tier::Curious);
    }

    #[test]
    fn priority_order_when_several_keywords_match() {
        assert_eq!(resolve(None, Some("quant active curious")), Tier::Quant);
        assert_eq!(resolve(None, Some("curious but active")), Tier::Active);
        assert_eq!(resolve(None, Some("admin quant")), Tier::Admin);
    }

    #[test]
    fn malformed_subscription_has_no_tier() {
        assert_eq!(resolve(None, None), Tier::None);
        assert_eq!(resolve(None, Some("")), Tier::None);
        assert_eq!(resolve(None, Some("   ")), Tier::None);
        assert_eq!(resolve(None, Some("free")), Tier::None);
        assert_eq!(resolve(Some("editor"), Some("platinum")), Tier::None);
    }

    #[test]
    fn substring_matching_catches_inactive() {
        // Admin console writes "Inactive" as no subscription, so this only shows up in stale data
        assert_eq!(resolve(None, Some("Inactive")), Tier::Active);
    }

    #[test]
    fn only_curious_is_metered() {
        assert!(Tier::Curious.is_quota_bound());
        for tier in [Tier::None, Tier::Active, Tier::Quant, Tier::Admin] {
            assert!(!tier.is_quota_bound(), "{tier} should not be metered");
        }
    }
}
