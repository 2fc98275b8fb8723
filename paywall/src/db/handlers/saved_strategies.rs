//! Per-account strategy bookmarks.

use crate::db::errors::Result;
use crate::db::handlers::strategies::STRATEGY_COLUMNS;
use crate::db::models::strategies::StrategyDBResponse;
use crate::types::{AccountId, StrategyId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;

pub struct SavedStrategies<'c> {
    db: &'c mut PgConnection,
}

impl<'c> SavedStrategies<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Bookmark a strategy. Returns false when it was already saved.
    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&account_id), strategy_id = %abbrev_uuid(&strategy_id)), err)]
    pub async fn save(&mut self, account_id: AccountId, strategy_id: StrategyId) -> Result<bool> {
        let result = sqlx::query("INSERT INTO saved_strategies (account_id, strategy_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(account_id)
            .bind(strategy_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&account_id), strategy_id = %abbrev_uuid(&strategy_id)), err)]
    pub async fn remove(&mut self, account_id: AccountId, strategy_id: StrategyId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM saved_strategies WHERE account_id = $1 AND strategy_id = $2")
            .bind(account_id)
            .bind(strategy_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Saved strategies, most recently saved first.
    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&account_id)), err)]
    pub async fn list(&mut self, account_id: AccountId) -> Result<Vec<StrategyDBResponse>> {
        let columns = STRATEGY_COLUMNS
            .split(", ")
            .map(|column| format!("s.{}", column.trim()))
            .collect::<Vec<_>>()
            .join(", ");

        let strategies = sqlx::query_as::<_, StrategyDBResponse>(&format!(
            "SELECT {columns} FROM saved_strategies ss
             JOIN strategies s ON s.id = ss.strategy_id
             WHERE ss.account_id = $1
             ORDER BY ss.saved_at DESC, s.id"
        ))
        .bind(account_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(strategies)
    }
}
