//! API request/response models for strategies.

use super::pagination::Pagination;
use crate::db::models::strategies::{StrategyCreateDBRequest, StrategyDBResponse, StrategyUpdateDBRequest};
use crate::types::StrategyId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Catalogue entry, visible to everyone.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StrategySummary {
    #[schema(value_type = String, format = "uuid")]
    pub id: StrategyId,
    pub name: String,
    pub asset_class: Option<String>,
    pub source_reference: Option<String>,
    pub win_rate: Option<f64>,
    pub profit_factor: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub youtube_thumbnail_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<StrategyDBResponse> for StrategySummary {
    fn from(s: StrategyDBResponse) -> Self {
        Self {
            id: s.id,
            name: s.name,
            asset_class: s.asset_class,
            source_reference: s.source_reference,
            win_rate: s.win_rate,
            profit_factor: s.profit_factor,
            max_drawdown: s.max_drawdown,
            youtube_thumbnail_url: s.youtube_thumbnail_url,
            created_at: s.created_at,
        }
    }
}

/// The full record, returned only once access is granted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StrategyResponse {
    #[schema(value_type = String, format = "uuid")]
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

impl From<StrategyDBResponse> for StrategyResponse {
    fn from(s: StrategyDBResponse) -> Self {
        Self {
            id: s.id,
            name: s.name,
            description: s.description,
            asset_class: s.asset_class,
            win_rate: s.win_rate,
            profit_factor: s.profit_factor,
            max_drawdown: s.max_drawdown,
            source_reference: s.source_reference,
            youtube_thumbnail_url: s.youtube_thumbnail_url,
            backtest_image_url: s.backtest_image_url,
            download_link: s.download_link,
            source_link: s.source_link,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct StrategyCreate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub asset_class: Option<String>,
    /// Percentage between 0 and 100
    pub win_rate: Option<f64>,
    pub profit_factor: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub source_reference: Option<String>,
    pub youtube_thumbnail_url: Option<String>,
    pub backtest_image_url: Option<String>,
    pub download_link: Option<String>,
    pub source_link: Option<String>,
}

impl From<StrategyCreate> for StrategyCreateDBRequest {
    fn from(c: StrategyCreate) -> Self {
        Self {
            name: c.name,
            description: c.description,
            asset_class: c.asset_class,
            win_rate: c.win_rate,
            profit_factor: c.profit_factor,
            max_drawdown: c.max_drawdown,
            source_reference: c.source_reference,
            youtube_thumbnail_url: c.youtube_thumbnail_url,
            backtest_image_url: c.backtest_image_url,
            download_link: c.download_link,
            source_link: c.source_link,
        }
    }
}

/// Partial update. Explicit `null` clears any optional field; `name` and `description` can only be
/// replaced.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct StrategyUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub asset_class: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<f64>)]
    pub win_rate: Option<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<f64>)]
    pub profit_factor: Option<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<f64>)]
    pub max_drawdown: Option<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub source_reference: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub youtube_thumbnail_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub backtest_image_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub download_link: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub source_link: Option<Option<String>>,
}

impl From<StrategyUpdate> for StrategyUpdateDBRequest {
    fn from(u: StrategyUpdate) -> Self {
        Self {
            name: u.name,
            description: u.description,
            asset_class: u.asset_class,
            win_rate: u.win_rate,
            profit_factor: u.profit_factor,
            max_drawdown: u.max_drawdown,
            source_reference: u.source_reference,
            youtube_thumbnail_url: u.youtube_thumbnail_url,
            backtest_image_url: u.backtest_image_url,
            download_link: u.download_link,
            source_link: u.source_link,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListStrategiesQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Only strategies in this asset class
    pub asset_class: Option<String>,

    /// Case-insensitive match on name or description
    pub search: Option<String>,
}
