use crate::api::models::pagination::PaginatedResponse;
use crate::api::models::users::{
    AccountCreate, AccountResponse, AccountUpdate, CurrentUser, ListAccountsQuery, normalize_role, normalize_subscription_tier,
};
use crate::auth::{
    password,
    permissions::{self, RequiresPermission, can_read_all_resources, operation, resource},
};
use crate::db::errors::DbError;
use crate::db::handlers::{Accounts, Repository, accounts::AccountFilter};
use crate::db::models::accounts::{AccountCreateDBRequest, AccountUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::types::{AccountId, AccountIdOrCurrent, Operation, Permission, Resource};
use crate::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

fn account_not_found(id: AccountId) -> Error {
    Error::NotFound {
        resource: "Account".to_string(),
        id: id.to_string(),
    }
}

fn validate_email(email: &str) -> Result<String> {
    let email = email.trim();
    if !email.contains('@') {
        return Err(Error::BadRequest {
            message: "A valid email address is required".to_string(),
        });
    }
    Ok(email.to_string())
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    summary = "List accounts",
    params(ListAccountsQuery),
    responses(
        (status = 200, description = "Page of accounts", body = PaginatedResponse<AccountResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListAccountsQuery>,
    _: RequiresPermission<resource::Users, operation::ReadAll>,
) -> Result<Json<PaginatedResponse<AccountResponse>>> {
    let (skip, limit) = query.pagination.params();
    let mut filter = AccountFilter::new(skip, limit);
    if let Some(search) = query.search.as_deref()
        && !search.trim().is_empty()
    {
        filter = filter.with_search(search.trim());
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Accounts::new(&mut conn);
    let accounts = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        accounts.into_iter().map(AccountResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "users",
    summary = "Create account",
    description = "Create an account with an optional password, role and plan. \
        A plan of `Inactive` leaves the account without a plan.",
    request_body = AccountCreate,
    responses(
        (status = 201, description = "Account created", body = AccountResponse),
        (status = 400, description = "Invalid email or password"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 409, description = "Email already registered"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    _: RequiresPermission<resource::Users, operation::CreateAll>,
    Json(create): Json<AccountCreate>,
) -> Result<(StatusCode, Json<AccountResponse>)> {
    let email = validate_email(&create.email)?;

    let password_config = &state.config.auth.native.password;
    let password_hash = match create.password {
        Some(password) => {
            password::validate_password(&password, password_config)?;
            Some(password::hash_password(password, password_config).await?)
        }
        None => None,
    };

    let request = AccountCreateDBRequest {
        email,
        display_name: create.display_name.filter(|n| !n.trim().is_empty()),
        role: normalize_role(create.role),
        subscription_tier: normalize_subscription_tier(create.subscription_tier),
        password_hash,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let account = Accounts::new(&mut conn).create(&request).await?;

    Ok((StatusCode::CREATED, Json(AccountResponse::from(account))))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "users",
    summary = "Get account",
    description = "Use `current` as the ID for the caller's own account. Other accounts are admin only.",
    params(("id" = String, Path, description = "Account ID or `current`")),
    responses(
        (status = 200, description = "Account", body = AccountResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Account not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<AccountIdOrCurrent>,
    current_user: CurrentUser,
) -> Result<Json<AccountResponse>> {
    let caller = permissions::load_caller(&state, current_user).await?;
    let target = id.resolve(caller.user.id);

    if target != caller.user.id && !can_read_all_resources(&caller, Resource::Users) {
        return Err(Error::InsufficientPermissions {
            required: Permission::Allow(Resource::Users, Operation::ReadAll),
            action: Operation::ReadAll,
            resource: format!("account {target}"),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let account = Accounts::new(&mut conn).get_by_id(target).await?.ok_or_else(|| account_not_found(target))?;

    Ok(Json(AccountResponse::from(account)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    tag = "users",
    summary = "Update account",
    description = "Update email, password, display name, role or plan. An explicit `null` clears role or plan.",
    request_body = AccountUpdate,
    params(("id" = String, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Account updated", body = AccountResponse),
        (status = 400, description = "Invalid email or password"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Account not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<AccountIdOrCurrent>,
    permission: RequiresPermission<resource::Users, operation::UpdateAll>,
    Json(update): Json<AccountUpdate>,
) -> Result<Json<AccountResponse>> {
    let target = id.resolve(permission.caller.user.id);

    let email = update.email.as_deref().map(validate_email).transpose()?;

    let password_config = &state.config.auth.native.password;
    let password_hash = match update.password {
        Some(password) => {
            password::validate_password(&password, password_config)?;
            Some(password::hash_password(password, password_config).await?)
        }
        None => None,
    };

    let request = AccountUpdateDBRequest {
        email,
        display_name: update.display_name,
        role: update.role.map(normalize_role),
        subscription_tier: update.subscription_tier.map(normalize_subscription_tier),
        password_hash,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let account = Accounts::new(&mut conn).update(target, &request).await.map_err(|e| match e {
        DbError::NotFound => account_not_found(target),
        other => other.into(),
    })?;

    Ok(Json(AccountResponse::from(account)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "users",
    summary = "Delete account",
    description = "Deletes the account with its usage records and saved strategies.",
    params(("id" = String, Path, description = "Account ID")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 400, description = "Cannot delete your own account"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Account not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<AccountId>,
    permission: RequiresPermission<resource::Users, operation::DeleteAll>,
) -> Result<StatusCode> {
    if id == permission.caller.user.id {
        return Err(Error::BadRequest {
            message: "You cannot delete your own account".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if Accounts::new(&mut conn).delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(account_not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use crate::api::models::pagination::PaginatedResponse;
    use crate::api::models::users::AccountResponse;
    use crate::entitlements::Tier;
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_admin_creates_account(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;
        let (name, value) = auth_header(&admin);

        let response = server
            .post("/api/v1/users")
            .add_header(&name, &value)
            .json(&json!({
                "email": "new.trader@example.com",
                "password": "secret1",
                "subscription_tier": "Curious Retail"
            }))
            .await;
        response.assert_status(StatusCode::CREATED);

        let account: AccountResponse = response.json();
        assert_eq!(account.email.as_deref(), Some("new.trader@example.com"));
        assert_eq!(account.tier, Tier::Curious);
        assert!(!account.is_admin);

        // The new account can log in with the password it was given
        server
            .post("/authentication/login")
            .json(&json!({ "email": "new.trader@example.com", "password": "secret1" }))
            .await
            .assert_status_ok();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_inactive_status_creates_account_without_plan(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;
        let (name, value) = auth_header(&admin);

        let account: AccountResponse = server
            .post("/api/v1/users")
            .add_header(&name, &value)
            .json(&json!({ "email": "idle@example.com", "subscription_tier": "Inactive" }))
            .await
            .json();
        assert_eq!(account.subscription_tier, None);
        assert_eq!(account.tier, Tier::None);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_validates_input(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;
        let (name, value) = auth_header(&admin);

        server
            .post("/api/v1/users")
            .add_header(&name, &value)
            .json(&json!({ "email": "not-an-email" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        server
            .post("/api/v1/users")
            .add_header(&name, &value)
            .json(&json!({ "email": "short@example.com", "password": "12345" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        server
            .post("/api/v1/users")
            .add_header(&name, &value)
            .json(&json!({ "email": "twice@example.com" }))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .post("/api/v1/users")
            .add_header(&name, &value)
            .json(&json!({ "email": "twice@example.com" }))
            .await;
        response.assert_status(StatusCode::CONFLICT);
        let body: Value = response.json();
        assert_eq!(body["message"], "An account with this email address already exists");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_members_only_see_themselves(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let member = create_test_account(&pool, None, Some("active trader")).await;
        let other = create_test_account(&pool, None, None).await;
        let (name, value) = auth_header(&member);

        let me: AccountResponse = server.get("/api/v1/users/current").add_header(&name, &value).await.json();
        assert_eq!(me.id, member.id);
        assert_eq!(me.tier, Tier::Active);

        server
            .get(&format!("/api/v1/users/{}", member.id))
            .add_header(&name, &value)
            .await
            .assert_status_ok();

        server
            .get(&format!("/api/v1/users/{}", other.id))
            .add_header(&name, &value)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        server.get("/api/v1/users").add_header(&name, &value).await.assert_status(StatusCode::FORBIDDEN);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_admin_lists_and_searches(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;
        create_test_account(&pool, None, None).await;
        let (name, value) = auth_header(&admin);

        // The bootstrap administrator, the test admin and the member
        let page: PaginatedResponse<AccountResponse> = server.get("/api/v1/users").add_header(&name, &value).await.json();
        assert_eq!(page.total_count, 3);

        let page: PaginatedResponse<AccountResponse> = server
            .get("/api/v1/users")
            .add_query_param("search", "admin-")
            .add_header(&name, &value)
            .await
            .json();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.data[0].id, admin.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_admin_updates_plan_and_role(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;
        let member = create_test_account(&pool, None, Some("curious retail")).await;
        let (name, value) = auth_header(&admin);

        let updated: AccountResponse = server
            .patch(&format!("/api/v1/users/{}", member.id))
            .add_header(&name, &value)
            .json(&json!({ "subscription_tier": "Quant Edge", "display_name": "Q" }))
            .await
            .json();
        assert_eq!(updated.tier, Tier::Quant);
        assert_eq!(updated.display_name.as_deref(), Some("Q"));

        let updated: AccountResponse = server
            .patch(&format!("/api/v1/users/{}", member.id))
            .add_header(&name, &value)
            .json(&json!({ "subscription_tier": null, "role": "admin" }))
            .await
            .json();
        assert_eq!(updated.subscription_tier, None);
        assert_eq!(updated.tier, Tier::Admin);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_members_cannot_change_their_plan(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let member = create_test_account(&pool, None, Some("curious retail")).await;
        let (name, value) = auth_header(&member);

        server
            .patch("/api/v1/users/current")
            .add_header(&name, &value)
            .json(&json!({ "subscription_tier": "quant edge" }))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_account(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;
        let member = create_test_account(&pool, None, None).await;
        let (name, value) = auth_header(&admin);

        server
            .delete(&format!("/api/v1/users/{}", admin.id))
            .add_header(&name, &value)
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        server
            .delete(&format!("/api/v1/users/{}", member.id))
            .add_header(&name, &value)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        // The deleted member's session no longer authenticates
        let (member_name, member_value) = auth_header(&member);
        server
            .get("/api/v1/users/current")
            .add_header(&member_name, &member_value)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}
