use crate::api::models::usage::UsageResponse;
use crate::auth::permissions::{RequiresPermission, operation, resource};
use crate::db::handlers::UsagePeriods;
use crate::entitlements::{Identity, PeriodKey, Tier};
use crate::errors::{Error, Result};
use crate::AppState;
use axum::{Json, extract::State};
use chrono::Utc;

#[utoipa::path(
    get,
    path = "/api/v1/users/current/usage",
    tag = "users",
    summary = "Get current usage",
    description = "Strategies opened this UTC month and, for metered plans, how many views remain.",
    responses(
        (status = 200, description = "Usage for the current period", body = UsageResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_current_usage(
    State(state): State<AppState>,
    permission: RequiresPermission<resource::Usage, operation::ReadOwn>,
) -> Result<Json<UsageResponse>> {
    let identity = Identity::from(&permission.caller.user);
    let tier = state.access.tier_of(Some(&identity)).await;
    let period = PeriodKey::for_instant(Utc::now());

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let viewed = UsagePeriods::new(&mut conn)
        .get(identity.account_id, &period)
        .await?
        .map(|record| record.viewed_resource_ids)
        .unwrap_or_default();

    let limit = (tier == Tier::Curious).then(|| state.access.quota().limit());

    Ok(Json(UsageResponse {
        tier,
        period,
        viewed_count: viewed.len(),
        remaining: limit.map(|limit| limit.saturating_sub(viewed.len())),
        viewed_strategy_ids: viewed,
        limit,
    }))
}
