//! API response model for the caller's monthly usage.

use crate::entitlements::{PeriodKey, Tier};
use crate::types::StrategyId;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UsageResponse {
    pub tier: Tier,
    /// UTC calendar month, `YYYY-MM`
    #[schema(value_type = String, example = "2025-01")]
    pub period: PeriodKey,
    /// Distinct strategies opened this period
    pub viewed_count: usize,
    #[schema(value_type = Vec<String>)]
    pub viewed_strategy_ids: Vec<StrategyId>,
    /// `null` for unmetered tiers
    pub limit: Option<usize>,
    /// `null` for unmetered tiers
    pub remaining: Option<usize>,
}
