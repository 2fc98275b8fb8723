//! Database models for strategies.

use crate::types::StrategyId;
use chrono::{DateTime, Utc};

/// Database request for creating a new strategy
#[derive(Debug, Clone, Default)]
pub struct StrategyCreateDBRequest {
    pub name: String,
    pub description: String,
    pub asset_class: Option<String>,
    pub win_rate: Option<f64>,
    pub profit_factor: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub source_reference: Option<String>,
    pub youtube_thumbnail_url: Option<String>,
    pub backtest_image_url: Option<String>,
    pub download_link: Option<String>,
    pub source_link: Option<String>,
}

/// Database request for updating a strategy. `None` leaves the column as is; for nullable
/// columns `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct StrategyUpdateDBRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub asset_class: Option<Option<String>>,
    pub win_rate: Option<Option<f64>>,
    pub profit_factor: Option<Option<f64>>,
    pub max_drawdown: Option<Option<f64>>,
    pub source_reference: Option<Option<String>>,
    pub youtube_thumbnail_url: Option<Option<String>>,
    pub backtest_image_url: Option<Option<String>>,
    pub download_link: Option<Option<String>>,
    pub source_link: Option<Option<String>>,
}

/// Database response for a strategy
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StrategyDBResponse {
    pub id: StrategyId,
    pub name: String,
    pub description: String,
    pub asset_class: Option<String>,
    pub win_rate: Option<f64>,
    pub profit_factor: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub source_reference: Option<String>,
    pub youtube_thumbnail_url: Option<String>,
    pub backtest_image_url: Option<String>,
    pub download_link: Option<String>,
    pub source_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
