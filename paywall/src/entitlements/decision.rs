//! The access decision for gated strategy content.

use crate::db::errors::DbError;
use crate::entitlements::quota::QuotaGate;
use crate::entitlements::tier::{AccountSnapshot, Tier, resolve_tier};
use crate::metrics;
use crate::types::{AccountId, StrategyId, abbrev_uuid};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::ToSchema;

/// A verified caller, as produced by session authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub account_id: AccountId,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// No verified caller, or the caller has no account or plan
    Unauthenticated,
    /// Metered plan with this month's allowance used up
    QuotaExceeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    Denied(DenialReason),
}

impl AccessDecision {
    pub fn is_granted(self) -> bool {
        matches!(self, AccessDecision::Granted)
    }
}

/// Point lookup of the account fields that determine the tier.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn snapshot(&self, account_id: AccountId) -> Result<Option<AccountSnapshot>, DbError>;
}

/// Decides whether a caller may open a gated strategy.
#[derive(Clone)]
pub struct AccessPolicy {
    accounts: Arc<dyn AccountDirectory>,
    quota: QuotaGate,
}

impl AccessPolicy {
    pub fn new(accounts: Arc<dyn AccountDirectory>, quota: QuotaGate) -> Self {
        Self { accounts, quota }
    }

    pub fn quota(&self) -> &QuotaGate {
        &self.quota
    }

    /// Resolve the caller's tier. Lookup failures resolve to [`Tier::None`].
    pub async fn tier_of(&self, identity: Option<&Identity>) -> Tier {
        let Some(identity) = identity else {
            return Tier::None;
        };

        match self.accounts.snapshot(identity.account_id).await {
            Ok(snapshot) => resolve_tier(snapshot.as_ref()),
            Err(e) => {
                error!(account_id = %abbrev_uuid(&identity.account_id), "Account lookup failed, treating as no tier: {:#}", e);
                Tier::None
            }
        }
    }

    /// Decide access to `resource_id` at `now`.
    ///
    /// Only [`Tier::Curious`] consumes quota; a view is counted at most once per
    /// strategy per month.
    #[instrument(skip(self, identity), fields(resource_id = %abbrev_uuid(&resource_id), tier = tracing::field::Empty))]
    pub async fn decide_access(&self, identity: Option<&Identity>, resource_id: StrategyId, now: DateTime<Utc>) -> AccessDecision {
        let tier = self.tier_of(identity).await;
        tracing::Span::current().record("tier", tracing::field::display(tier));

        let decision = match (tier, identity) {
            (Tier::None, _) | (_, None) => AccessDecision::Denied(DenialReason::Unauthenticated),
            (Tier::Admin | Tier::Active | Tier::Quant, Some(_)) => AccessDecision::Granted,
            (Tier::Curious, Some(identity)) => {
                if self.quota.check(identity.account_id, resource_id, tier, now).await {
                    AccessDecision::Granted
                } else {
                    AccessDecision::Denied(DenialReason::QuotaExceeded)
                }
            }
        };

        metrics::record_access_decision(tier, decision);
        decision
    }
}
