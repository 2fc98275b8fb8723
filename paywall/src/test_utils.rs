//! Test helpers: app construction, fixtures and session headers.

use crate::api::models::strategies::StrategyResponse;
use crate::api::models::users::{AccountResponse, CurrentUser};
use crate::auth::{password, session};
use crate::config::{AuthConfig, Config, NativeAuthConfig, PasswordConfig, PoolSettings, SessionConfig};
use crate::db::handlers::{Accounts, Repository, Strategies};
use crate::db::models::{accounts::AccountCreateDBRequest, strategies::StrategyCreateDBRequest};
use crate::entitlements::ADMIN_ROLE;
use crate::AppState;
use axum_test::TestServer;
use sqlx::PgPool;
use uuid::Uuid;

pub async fn create_test_app(pool: PgPool) -> TestServer {
    create_test_app_with_config(pool, create_test_config()).await
}

pub async fn create_test_app_with_config(pool: PgPool, config: Config) -> TestServer {
    let app = crate::Application::new_with_pool(config, Some(pool))
        .await
        .expect("Failed to create application");

    app.into_test_server()
}

pub fn create_test_config() -> Config {
    Config {
        database: crate::config::DatabaseConfig {
            pool: PoolSettings {
                max_connections: 2,
                min_connections: 0,
                ..Default::default()
            },
            ..Default::default()
        },
        admin_email: "root@example.com".to_string(),
        secret_key: Some("test-secret-key-for-session-tokens".to_string()),
        auth: AuthConfig {
            native: NativeAuthConfig {
                enabled: true,
                password: PasswordConfig {
                    // Cheap argon2 parameters keep the suite fast
                    argon2_memory_kib: 1024,
                    argon2_iterations: 1,
                    argon2_parallelism: 1,
                    ..Default::default()
                },
                session: SessionConfig {
                    cookie_secure: false,
                    ..Default::default()
                },
            },
            ..Default::default()
        },
        enable_metrics: false,
        ..Default::default()
    }
}

pub fn create_test_state(pool: PgPool, config: Config) -> AppState {
    let access = crate::build_access_policy(&pool, &config);
    AppState::builder().db(pool).config(config).access(access).build()
}

async fn insert_account(pool: &PgPool, request: AccountCreateDBRequest) -> AccountResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let account = Accounts::new(&mut conn).create(&request).await.expect("Failed to create test account");
    AccountResponse::from(account)
}

pub async fn create_test_account(pool: &PgPool, role: Option<&str>, subscription_tier: Option<&str>) -> AccountResponse {
    insert_account(
        pool,
        AccountCreateDBRequest {
            email: format!("trader-{}@example.com", Uuid::new_v4().simple()),
            display_name: Some("Test Trader".to_string()),
            role: role.map(str::to_string),
            subscription_tier: subscription_tier.map(str::to_string),
            password_hash: None,
        },
    )
    .await
}

pub async fn create_test_account_with_password(
    pool: &PgPool,
    email: &str,
    plain_password: &str,
    subscription_tier: Option<&str>,
) -> AccountResponse {
    let params = password::Argon2Params::from(&create_test_config().auth.native.password);
    let password_hash = password::hash_string_with_params(plain_password, Some(params)).expect("Failed to hash test password");

    insert_account(
        pool,
        AccountCreateDBRequest {
            email: email.to_string(),
            display_name: None,
            role: None,
            subscription_tier: subscription_tier.map(str::to_string),
            password_hash: Some(password_hash),
        },
    )
    .await
}

pub async fn create_test_admin(pool: &PgPool) -> AccountResponse {
    insert_account(
        pool,
        AccountCreateDBRequest {
            email: format!("admin-{}@example.com", Uuid::new_v4().simple()),
            display_name: Some("Test Admin".to_string()),
            role: Some(ADMIN_ROLE.to_string()),
            subscription_tier: None,
            password_hash: None,
        },
    )
    .await
}

pub async fn create_test_strategy(pool: &PgPool, name: &str) -> StrategyResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let strategy = Strategies::new(&mut conn)
        .create(&StrategyCreateDBRequest {
            name: name.to_string(),
            description: format!("How {name} works"),
            asset_class: Some("equities".to_string()),
            win_rate: Some(55.0),
            profit_factor: Some(1.4),
            max_drawdown: Some(12.5),
            download_link: Some("https://example.com/download".to_string()),
            ..Default::default()
        })
        .await
        .expect("Failed to create test strategy");
    StrategyResponse::from(strategy)
}

/// Bearer header for `account`, signed with the [`create_test_config`] secret.
pub fn auth_header(account: &AccountResponse) -> (String, String) {
    let user = CurrentUser {
        id: account.id,
        email: account.email.clone(),
    };
    let token = session::create_session_token(&user, &create_test_config()).expect("Failed to create session token");
    ("authorization".to_string(), format!("Bearer {token}"))
}
