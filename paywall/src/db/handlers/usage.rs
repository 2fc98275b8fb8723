//! Database repository for monthly usage records.

use crate::db::{errors::Result, models::usage::UsagePeriodDBResponse};
use crate::entitlements::{PeriodKey, UsageStore, ViewOutcome, quota::apply_view};
use crate::types::{AccountId, StrategyId, abbrev_uuid};
use async_trait::async_trait;
use sqlx::{Connection, PgConnection, PgPool};
use tracing::instrument;

pub struct UsagePeriods<'c> {
    db: &'c mut PgConnection,
}

impl<'c> UsagePeriods<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&account_id), period = %period), err)]
    pub async fn get(&mut self, account_id: AccountId, period: &PeriodKey) -> Result<Option<UsagePeriodDBResponse>> {
        let record = sqlx::query_as::<_, UsagePeriodDBResponse>(
            "SELECT account_id, period_key, viewed_resource_ids, created_at, updated_at
             FROM usage_periods WHERE account_id = $1 AND period_key = $2",
        )
        .bind(account_id)
        .bind(period.as_str())
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(record)
    }

    /// Apply one view to the `(account_id, period)` record in a single transaction.
    ///
    /// The row is created if missing and then locked with `FOR UPDATE`, so
    /// concurrent calls for the same account and month run one at a time.
    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&account_id), period = %period, resource_id = %abbrev_uuid(&resource_id)), err)]
    pub async fn record_view(
        &mut self,
        account_id: AccountId,
        period: &PeriodKey,
        resource_id: StrategyId,
        limit: usize,
    ) -> Result<ViewOutcome> {
        let mut tx = self.db.begin().await?;

        sqlx::query("INSERT INTO usage_periods (account_id, period_key) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(account_id)
            .bind(period.as_str())
            .execute(&mut *tx)
            .await?;

        let mut viewed = sqlx::query_scalar::<_, Vec<StrategyId>>(
            "SELECT viewed_resource_ids FROM usage_periods WHERE account_id = $1 AND period_key = $2 FOR UPDATE",
        )
        .bind(account_id)
        .bind(period.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let outcome = apply_view(&mut viewed, resource_id, limit);

        if outcome == ViewOutcome::Recorded {
            sqlx::query(
                "UPDATE usage_periods SET viewed_resource_ids = $3, updated_at = NOW()
                 WHERE account_id = $1 AND period_key = $2",
            )
            .bind(account_id)
            .bind(period.as_str())
            .bind(viewed.as_slice())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(outcome)
    }
}

/// [`UsageStore`] backed by the `usage_periods` table.
#[derive(Clone)]
pub struct PgUsageStore {
    pool: PgPool,
}

impl PgUsageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageStore for PgUsageStore {
    async fn record_view(&self, account_id: AccountId, period: &PeriodKey, resource_id: StrategyId, limit: usize) -> Result<ViewOutcome> {
        let mut conn = self.pool.acquire().await?;
        UsagePeriods::new(&mut conn).record_view(account_id, period, resource_id, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::{Accounts, Repository};
    use crate::db::models::accounts::AccountCreateDBRequest;
    use crate::entitlements::{AccessDecision, AccessPolicy, DenialReason, Identity, QUOTA_LIMIT, QuotaGate};
    use crate::db::handlers::accounts::PgAccountDirectory;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use std::time::Duration;
    use uuid::Uuid;

    async fn curious_account(pool: &PgPool) -> AccountId {
        let mut conn = pool.acquire().await.unwrap();
        Accounts::new(&mut conn)
            .create(&AccountCreateDBRequest {
                email: format!("{}@example.com", Uuid::new_v4()),
                display_name: None,
                role: None,
                subscription_tier: Some("Curious Retail".to_string()),
                password_hash: None,
            })
            .await
            .unwrap()
            .id
    }

    fn january() -> PeriodKey {
        PeriodKey::for_instant(Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap())
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_record_view_creates_and_caps_the_record(pool: PgPool) {
        let account_id = curious_account(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = UsagePeriods::new(&mut conn);
        let period = january();

        assert!(repo.get(account_id, &period).await.unwrap().is_none());

        let ids: Vec<_> = (0..4).map(|_| Uuid::new_v4()).collect();
        for id in &ids[..3] {
            assert_eq!(repo.record_view(account_id, &period, *id, 3).await.unwrap(), ViewOutcome::Recorded);
        }
        assert_eq!(repo.record_view(account_id, &period, ids[0], 3).await.unwrap(), ViewOutcome::AlreadyViewed);
        assert_eq!(repo.record_view(account_id, &period, ids[3], 3).await.unwrap(), ViewOutcome::LimitReached);

        let record = repo.get(account_id, &period).await.unwrap().unwrap();
        assert_eq!(record.period_key, "2025-01");
        assert_eq!(record.viewed_resource_ids, ids[..3].to_vec());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_records_are_removed_with_the_account(pool: PgPool) {
        let account_id = curious_account(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        UsagePeriods::new(&mut conn)
            .record_view(account_id, &january(), Uuid::new_v4(), 3)
            .await
            .unwrap();

        assert!(Accounts::new(&mut conn).delete(account_id).await.unwrap());
        assert!(UsagePeriods::new(&mut conn).get(account_id, &january()).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_concurrent_decisions_grant_exactly_the_quota(pool: PgPool) {
        let account_id = curious_account(&pool).await;
        let policy = AccessPolicy::new(
            Arc::new(PgAccountDirectory::new(pool.clone())),
            QuotaGate::new(Arc::new(PgUsageStore::new(pool.clone())), QUOTA_LIMIT, Duration::from_secs(30)),
        );
        let identity = Identity { account_id, email: None };
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let policy = policy.clone();
                let identity = identity.clone();
                tokio::spawn(async move { policy.decide_access(Some(&identity), Uuid::new_v4(), now).await })
            })
            .collect();

        let mut granted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                AccessDecision::Granted => granted += 1,
                AccessDecision::Denied(reason) => assert_eq!(reason, DenialReason::QuotaExceeded),
            }
        }
        assert_eq!(granted, 3);

        let mut conn = pool.acquire().await.unwrap();
        let record = UsagePeriods::new(&mut conn).get(account_id, &january()).await.unwrap().unwrap();
        assert_eq!(record.viewed_resource_ids.len(), 3);
    }
}
