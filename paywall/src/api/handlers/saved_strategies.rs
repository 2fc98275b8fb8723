use crate::api::models::strategies::StrategySummary;
use crate::auth::permissions::{RequiresPermission, operation, resource};
use crate::db::handlers::{Repository, SavedStrategies, Strategies};
use crate::errors::{Error, Result};
use crate::{AppState, types::StrategyId};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

#[utoipa::path(
    get,
    path = "/api/v1/users/current/saved-strategies",
    tag = "saved strategies",
    summary = "List saved strategies",
    description = "Bookmarked strategies, most recently saved first. Listing does not consume quota.",
    responses(
        (status = 200, description = "Saved strategies", body = [StrategySummary]),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_saved_strategies(
    State(state): State<AppState>,
    permission: RequiresPermission<resource::SavedStrategies, operation::ReadOwn>,
) -> Result<Json<Vec<StrategySummary>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let saved = SavedStrategies::new(&mut conn).list(permission.caller.user.id).await?;

    Ok(Json(saved.into_iter().map(StrategySummary::from).collect()))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/current/saved-strategies/{strategy_id}",
    tag = "saved strategies",
    summary = "Save strategy",
    params(("strategy_id" = String, Path, description = "Strategy ID")),
    responses(
        (status = 201, description = "Strategy saved"),
        (status = 204, description = "Strategy was already saved"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Strategy not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn save_strategy(
    State(state): State<AppState>,
    Path(strategy_id): Path<StrategyId>,
    permission: RequiresPermission<resource::SavedStrategies, operation::UpdateOwn>,
) -> Result<StatusCode> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    if Strategies::new(&mut tx).get_by_id(strategy_id).await?.is_none() {
        return Err(Error::NotFound {
            resource: "Strategy".to_string(),
            id: strategy_id.to_string(),
        });
    }

    let created = SavedStrategies::new(&mut tx).save(permission.caller.user.id, strategy_id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(if created { StatusCode::CREATED } else { StatusCode::NO_CONTENT })
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/current/saved-strategies/{strategy_id}",
    tag = "saved strategies",
    summary = "Remove saved strategy",
    params(("strategy_id" = String, Path, description = "Strategy ID")),
    responses(
        (status = 204, description = "Removed"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Strategy was not saved"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn remove_saved_strategy(
    State(state): State<AppState>,
    Path(strategy_id): Path<StrategyId>,
    permission: RequiresPermission<resource::SavedStrategies, operation::UpdateOwn>,
) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    if SavedStrategies::new(&mut conn).remove(permission.caller.user.id, strategy_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound {
            resource: "Saved strategy".to_string(),
            id: strategy_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::api::models::strategies::StrategySummary;
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use serde_json::Value;
    use sqlx::PgPool;
    use uuid::Uuid;

    #[sqlx::test]
    #[test_log::test]
    async fn test_save_list_and_remove(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let member = create_test_account(&pool, None, Some("Curious Retail")).await;
        let first = create_test_strategy(&pool, "Opening Range").await;
        let second = create_test_strategy(&pool, "Carry").await;
        let (name, value) = auth_header(&member);

        for strategy in [&first, &second] {
            server
                .put(&format!("/api/v1/users/current/saved-strategies/{}", strategy.id))
                .add_header(&name, &value)
                .await
                .assert_status(StatusCode::CREATED);
        }

        server
            .put(&format!("/api/v1/users/current/saved-strategies/{}", first.id))
            .add_header(&name, &value)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let saved: Vec<StrategySummary> = server
            .get("/api/v1/users/current/saved-strategies")
            .add_header(&name, &value)
            .await
            .json();
        assert_eq!(saved.len(), 2);

        server
            .delete(&format!("/api/v1/users/current/saved-strategies/{}", first.id))
            .add_header(&name, &value)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        server
            .delete(&format!("/api/v1/users/current/saved-strategies/{}", first.id))
            .add_header(&name, &value)
            .await
            .assert_status(StatusCode::NOT_FOUND);

        let saved: Vec<StrategySummary> = server
            .get("/api/v1/users/current/saved-strategies")
            .add_header(&name, &value)
            .await
            .json();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].id, second.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_saving_does_not_consume_quota(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let member = create_test_account(&pool, None, Some("Curious Retail")).await;
        let strategy = create_test_strategy(&pool, "Momentum").await;
        let (name, value) = auth_header(&member);

        server
            .put(&format!("/api/v1/users/current/saved-strategies/{}", strategy.id))
            .add_header(&name, &value)
            .await
            .assert_status(StatusCode::CREATED);
        server
            .get("/api/v1/users/current/saved-strategies")
            .add_header(&name, &value)
            .await
            .assert_status_ok();

        let usage: Value = server.get("/api/v1/users/current/usage").add_header(&name, &value).await.json();
        assert_eq!(usage["viewed_count"], 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_save_unknown_strategy(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let member = create_test_account(&pool, None, None).await;
        let (name, value) = auth_header(&member);

        server
            .put(&format!("/api/v1/users/current/saved-strategies/{}", Uuid::new_v4()))
            .add_header(&name, &value)
            .await
            .assert_status(StatusCode::NOT_FOUND);

        server.get("/api/v1/users/current/saved-strategies").await.assert_status(StatusCode::UNAUTHORIZED);
    }
}
