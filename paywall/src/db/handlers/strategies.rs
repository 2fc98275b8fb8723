//! Database repository for the strategy catalogue.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::strategies::{StrategyCreateDBRequest, StrategyDBResponse, StrategyUpdateDBRequest},
};
use crate::types::{StrategyId, abbrev_uuid};
use sqlx::PgConnection;
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

pub(crate) const STRATEGY_COLUMNS: &str = "id, name, description, asset_class, win_rate, profit_factor, max_drawdown, \
     source_reference, youtube_thumbnail_url, backtest_image_url, download_link, source_link, created_at, updated_at";

/// Filter for listing strategies
#[derive(Debug, Clone)]
pub struct StrategyFilter {
    pub skip: i64,
    pub limit: i64,
    pub asset_class: Option<String>,
    /// Case-insensitive match on name or description
    pub search: Option<String>,
}

impl StrategyFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            asset_class: None,
            search: None,
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"))
    }
}

pub struct Strategies<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Strategies<'c> {
    type CreateRequest = StrategyCreateDBRequest;
    type UpdateRequest = StrategyUpdateDBRequest;
    type Response = StrategyDBResponse;
    type Id = StrategyId;
    type Filter = StrategyFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let strategy = sqlx::query_as::<_, StrategyDBResponse>(&format!(
            "INSERT INTO strategies (id, name, description, asset_class, win_rate, profit_factor, max_drawdown,
                source_reference, youtube_thumbnail_url, backtest_image_url, download_link, source_link)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {STRATEGY_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&request.name)
        .bind(&request.description)
        .bind(&request.asset_class)
        .bind(request.win_rate)
        .bind(request.profit_factor)
        .bind(request.max_drawdown)
        .bind(&request.source_reference)
        .bind(&request.youtube_thumbnail_url)
        .bind(&request.backtest_image_url)
        .bind(&request.download_link)
        .bind(&request.source_link)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(strategy)
    }

    #[instrument(skip(self), fields(strategy_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let strategy = sqlx::query_as::<_, StrategyDBResponse>(&format!("SELECT {STRATEGY_COLUMNS} FROM strategies WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(strategy)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let strategies = sqlx::query_as::<_, StrategyDBResponse>(&format!("SELECT {STRATEGY_COLUMNS} FROM strategies WHERE id = ANY($1)"))
            .bind(ids.as_slice())
            .fetch_all(&mut *self.db)
            .await?;

        Ok(strategies.into_iter().map(|s| (s.id, s)).collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let strategies = sqlx::query_as::<_, StrategyDBResponse>(&format!(
            "SELECT {STRATEGY_COLUMNS} FROM strategies
             WHERE ($3::TEXT IS NULL OR asset_class = $3)
               AND ($4::TEXT IS NULL OR name ILIKE $4 OR description ILIKE $4)
             ORDER BY created_at DESC, id
             LIMIT $1 OFFSET $2"
        ))
        .bind(filter.limit)
        .bind(filter.skip)
        .bind(&filter.asset_class)
        .bind(filter.search_pattern())
        .fetch_all(&mut *self.db)
        .await?;

        Ok(strategies)
    }

    #[instrument(skip(self), fields(strategy_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM strategies WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(strategy_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let strategy = sqlx::query_as::<_, StrategyDBResponse>(&format!(
            "UPDATE strategies SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                asset_class = CASE WHEN $4 THEN $5 ELSE asset_class END,
                win_rate = CASE WHEN $6 THEN $7 ELSE win_rate END,
                profit_factor = CASE WHEN $8 THEN $9 ELSE profit_factor END,
                max_drawdown = CASE WHEN $10 THEN $11 ELSE max_drawdown END,
                source_reference = CASE WHEN $12 THEN $13 ELSE source_reference END,
                youtube_thumbnail_url = CASE WHEN $14 THEN $15 ELSE youtube_thumbnail_url END,
                backtest_image_url = CASE WHEN $16 THEN $17 ELSE backtest_image_url END,
                download_link = CASE WHEN $18 THEN $19 ELSE download_link END,
                source_link = CASE WHEN $20 THEN $21 ELSE source_link END,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {STRATEGY_COLUMNS}"
        ))
        .bind(id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(request.asset_class.is_some())
        .bind(request.asset_class.clone().flatten())
        .bind(request.win_rate.is_some())
        .bind(request.win_rate.flatten())
        .bind(request.profit_factor.is_some())
        .bind(request.profit_factor.flatten())
        .bind(request.max_drawdown.is_some())
        .bind(request.max_drawdown.flatten())
        .bind(request.source_reference.is_some())
        .bind(request.source_reference.clone().flatten())
        .bind(request.youtube_thumbnail_url.is_some())
        .bind(request.youtube_thumbnail_url.clone().flatten())
        .bind(request.backtest_image_url.is_some())
        .bind(request.backtest_image_url.clone().flatten())
        .bind(request.download_link.is_some())
        .bind(request.download_link.clone().flatten())
        .bind(request.source_link.is_some())
        .bind(request.source_link.clone().flatten())
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(strategy)
    }
}

impl<'c> Strategies<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &StrategyFilter) -> Result<i64> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM strategies
             WHERE ($1::TEXT IS NULL OR asset_class = $1)
               AND ($2::TEXT IS NULL OR name ILIKE $2 OR description ILIKE $2)",
        )
        .bind(&filter.asset_class)
        .bind(filter.search_pattern())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(total)
    }
}
