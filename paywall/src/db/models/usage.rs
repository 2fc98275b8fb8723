//! Database models for monthly usage records.

use crate::types::{AccountId, StrategyId};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UsagePeriodDBResponse {
    pub account_id: AccountId,
    pub period_key: String,
    pub viewed_resource_ids: Vec<StrategyId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
