//! In-process stores for the access policy.
//!
//! Used when running the policy without PostgreSQL (tests, local
//! experiments). Each usage record is mutated under its dashmap shard lock,
//! which gives the same per-key serialization as a row lock.

use crate::db::errors::DbError;
use crate::entitlements::decision::AccountDirectory;
use crate::entitlements::period::PeriodKey;
use crate::entitlements::quota::{UsageStore, ViewOutcome, apply_view};
use crate::entitlements::tier::AccountSnapshot;
use crate::types::{AccountId, StrategyId};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct InMemoryUsageStore {
    periods: DashMap<(AccountId, PeriodKey), Vec<StrategyId>>,
    transactions: AtomicUsize,
}

impl InMemoryUsageStore {
    /// Number of `record_view` transactions started so far.
    pub fn transaction_count(&self) -> usize {
        self.transactions.load(Ordering::SeqCst)
    }

    pub fn viewed(&self, account_id: AccountId, period: &PeriodKey) -> Vec<StrategyId> {
        self.periods
            .get(&(account_id, period.clone()))
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl UsageStore for InMemoryUsageStore {
    async fn record_view(
        &self,
        account_id: AccountId,
        period: &PeriodKey,
        resource_id: StrategyId,
        limit: usize,
    ) -> Result<ViewOutcome, DbError> {
        self.transactions.fetch_add(1, Ordering::SeqCst);
        let mut record = self.periods.entry((account_id, period.clone())).or_default();
        Ok(apply_view(record.value_mut(), resource_id, limit))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAccountDirectory {
    accounts: DashMap<AccountId, AccountSnapshot>,
}

impl InMemoryAccountDirectory {
    pub fn insert(&self, account_id: AccountId, snapshot: AccountSnapshot) {
        self.accounts.insert(account_id, snapshot);
    }
}

#[async_trait]
impl AccountDirectory for InMemoryAccountDirectory {
    async fn snapshot(&self, account_id: AccountId) -> Result<Option<AccountSnapshot>, DbError> {
        Ok(self.accounts.get(&account_id).map(|entry| entry.value().clone()))
    }
}
