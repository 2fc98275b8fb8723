use crate::api::models::pagination::PaginatedResponse;
use crate::api::models::strategies::{ListStrategiesQuery, StrategyCreate, StrategyResponse, StrategySummary, StrategyUpdate};
use crate::api::models::users::CurrentUser;
use crate::auth::permissions::{RequiresPermission, operation, resource};
use crate::db::handlers::{Repository, Strategies, strategies::StrategyFilter};
use crate::entitlements::{AccessDecision, DenialReason, Identity};
use crate::errors::{Error, Result};
use crate::{AppState, types::StrategyId};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;

fn strategy_not_found(id: StrategyId) -> Error {
    Error::NotFound {
        resource: "Strategy".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/strategies",
    tag = "strategies",
    summary = "List strategies",
    description = "Public catalogue. Gated fields (description, backtests, downloads) are never included.",
    params(ListStrategiesQuery),
    responses(
        (status = 200, description = "Page of strategy summaries", body = PaginatedResponse<StrategySummary>),
        (status = 500, description = "Internal server error"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_strategies(
    State(state): State<AppState>,
    Query(query): Query<ListStrategiesQuery>,
) -> Result<Json<PaginatedResponse<StrategySummary>>> {
    let (skip, limit) = query.pagination.params();
    let filter = StrategyFilter {
        skip,
        limit,
        asset_class: query.asset_class.filter(|a| !a.trim().is_empty()),
        search: query.search,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Strategies::new(&mut conn);
    let strategies = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        strategies.into_iter().map(StrategySummary::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

/// Open a gated strategy.
///
/// Missing strategies are reported before the caller's allowance is touched, so a bad link never
/// costs a view.
#[utoipa::path(
    get,
    path = "/api/v1/strategies/{id}",
    tag = "strategies",
    summary = "Get strategy",
    description = "Returns the full strategy when the caller's plan allows it. \
        Curious plans may open a limited number of distinct strategies per UTC calendar month; \
        re-opening one already viewed this month is free.",
    params(("id" = String, Path, description = "Strategy ID")),
    responses(
        (status = 200, description = "Full strategy", body = StrategyResponse),
        (status = 401, description = "Not signed in, or no plan"),
        (status = 403, description = "Monthly view limit reached; body has `reason: quota_exceeded`"),
        (status = 404, description = "Strategy not found"),
    ),
    security(
        (),
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all, fields(strategy_id = %id))]
pub async fn get_strategy(
    State(state): State<AppState>,
    Path(id): Path<StrategyId>,
    current_user: Option<CurrentUser>,
) -> Result<Json<StrategyResponse>> {
    let strategy = {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Strategies::new(&mut conn).get_by_id(id).await?.ok_or_else(|| strategy_not_found(id))?
    };

    let identity = current_user.as_ref().map(Identity::from);
    match state.access.decide_access(identity.as_ref(), id, Utc::now()).await {
        AccessDecision::Granted => Ok(Json(StrategyResponse::from(strategy))),
        AccessDecision::Denied(DenialReason::Unauthenticated) => Err(Error::Unauthenticated {
            message: Some("Sign in with an active plan to view this strategy".to_string()),
        }),
        AccessDecision::Denied(DenialReason::QuotaExceeded) => Err(Error::QuotaExceeded),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/strategies",
    tag = "strategies",
    summary = "Create strategy",
    request_body = StrategyCreate,
    responses(
        (status = 201, description = "Strategy created", body = StrategyResponse),
        (status = 400, description = "Invalid strategy"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_strategy(
    State(state): State<AppState>,
    _: RequiresPermission<resource::Strategies, operation::CreateAll>,
    Json(create): Json<StrategyCreate>,
) -> Result<(StatusCode, Json<StrategyResponse>)> {
    if create.name.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "Strategy name is required".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let strategy = Strategies::new(&mut conn).create(&create.into()).await?;

    Ok((StatusCode::CREATED, Json(StrategyResponse::from(strategy))))
}

#[utoipa::path(
    patch,
    path = "/api/v1/strategies/{id}",
    tag = "strategies",
    summary = "Update strategy",
    request_body = StrategyUpdate,
    params(("id" = String, Path, description = "Strategy ID")),
    responses(
        (status = 200, description = "Strategy updated", body = StrategyResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Strategy not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(strategy_id = %id))]
pub async fn update_strategy(
    State(state): State<AppState>,
    Path(id): Path<StrategyId>,
    _: RequiresPermission<resource::Strategies, operation::UpdateAll>,
    Json(update): Json<StrategyUpdate>,
) -> Result<Json<StrategyResponse>> {
    if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(Error::BadRequest {
            message: "Strategy name cannot be empty".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let strategy = Strategies::new(&mut conn).update(id, &update.into()).await.map_err(|e| match e {
        crate::db::errors::DbError::NotFound => strategy_not_found(id),
        other => other.into(),
    })?;

    Ok(Json(StrategyResponse::from(strategy)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/strategies/{id}",
    tag = "strategies",
    summary = "Delete strategy",
    params(("id" = String, Path, description = "Strategy ID")),
    responses(
        (status = 204, description = "Strategy deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Strategy not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(strategy_id = %id))]
pub async fn delete_strategy(
    State(state): State<AppState>,
    Path(id): Path<StrategyId>,
    _: RequiresPermission<resource::Strategies, operation::DeleteAll>,
) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if Strategies::new(&mut conn).delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(strategy_not_found(id))
    }
}
