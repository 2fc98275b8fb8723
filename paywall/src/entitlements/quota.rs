//! Monthly view quota for metered tiers.
//!
//! Each metered account has one usage record per calendar month holding the set
//! of strategy ids it has opened. A view is recorded by a single atomic
//! read-modify-write on that record ([`UsageStore::record_view`]), so
//! concurrent requests for the same account can never push the set past the
//! limit. Re-opening a strategy already in the set is free.

use crate::db::errors::DbError;
use crate::entitlements::period::PeriodKey;
use crate::entitlements::tier::Tier;
use crate::types::{AccountId, StrategyId, abbrev_uuid};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// Distinct strategies a metered account may open per month.
pub const QUOTA_LIMIT: usize = 3;

/// Result of applying one view to a usage record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewOutcome {
    /// Already in this period's set; nothing written
    AlreadyViewed,
    /// Added to the set
    Recorded,
    /// Set is full; nothing written
    LimitReached,
}

impl ViewOutcome {
    pub fn is_allowed(self) -> bool {
        !matches!(self, ViewOutcome::LimitReached)
    }
}

/// Decide a view against the ids already recorded this period, adding the id when allowed.
///
/// Stores call this while holding their lock on the record, then persist
/// `viewed` only for [`ViewOutcome::Recorded`].
pub fn apply_view(viewed: &mut Vec<StrategyId>, resource_id: StrategyId, limit: usize) -> ViewOutcome {
    if viewed.contains(&resource_id) {
        ViewOutcome::AlreadyViewed
    } else if viewed.len() >= limit {
        ViewOutcome::LimitReached
    } else {
        viewed.push(resource_id);
        ViewOutcome::Recorded
    }
}

/// Storage for per-account, per-period usage records.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Atomically apply a view to the `(account_id, period)` record, creating it when missing.
    async fn record_view(
        &self,
        account_id: AccountId,
        period: &PeriodKey,
        resource_id: StrategyId,
        limit: usize,
    ) -> Result<ViewOutcome, DbError>;
}

/// Enforces the monthly allowance for metered tiers.
#[derive(Clone)]
pub struct QuotaGate {
    store: Arc<dyn UsageStore>,
    limit: usize,
    timeout: Duration,
}

impl QuotaGate {
    pub fn new(store: Arc<dyn UsageStore>, limit: usize, timeout: Duration) -> Self {
        Self { store, limit, timeout }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Whether `account_id` may open `resource_id` at `now`.
    ///
    /// Unmetered tiers pass without touching the store. Store failures and
    /// timeouts deny.
    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&account_id), resource_id = %abbrev_uuid(&resource_id)))]
    pub async fn check(&self, account_id: AccountId, resource_id: StrategyId, tier: Tier, now: DateTime<Utc>) -> bool {
        if !tier.is_quota_bound() {
            return true;
        }

        let period = PeriodKey::for_instant(now);
        let attempt = self.store.record_view(account_id, &period, resource_id, self.limit);

        match tokio::time::timeout(self.timeout, attempt).await {
            Ok(Ok(outcome)) => {
                debug!(%period, ?outcome, "Applied view to usage record");
                outcome.is_allowed()
            }
            Ok(Err(e)) => {
                error!(%period, "Usage record transaction failed, denying: {:#}", e);
                false
            }
            Err(_) => {
                warn!(%period, timeout = ?self.timeout, "Usage record transaction timed out, denying");
                false
            }
        }
    }
}
