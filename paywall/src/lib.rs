//! # paywall: subscription-gated strategy catalogue
//!
//! `paywall` serves a catalogue of trading strategies. Anyone may browse the catalogue; opening a
//! strategy's full record (description, backtest, downloads) is gated by the caller's plan:
//!
//! | Tier      | Access                                                          |
//! |-----------|-----------------------------------------------------------------|
//! | none      | anonymous, or no recognised plan: always denied                 |
//! | curious   | up to [`entitlements::QUOTA_LIMIT`] distinct strategies per UTC month |
//! | active    | unlimited                                                       |
//! | quant     | unlimited                                                       |
//! | admin     | unlimited, plus catalogue and account management                |
//!
//! ## Architecture
//!
//! The HTTP layer is [Axum](https://github.com/tokio-rs/axum) over PostgreSQL.
//!
//! - [`api`]: route handlers and request/response models
//! - [`auth`]: session tokens, password hashing, extractors and permission checks
//! - [`entitlements`]: tier resolution and the monthly quota, behind store traits
//! - [`billing`]: payment processor webhooks that keep `subscription_tier` current
//! - [`db`]: repositories over the `accounts`, `strategies`, `usage_periods` and
//!   `saved_strategies` tables
//!
//! A gated read resolves the caller's tier from the account row on every request, so plan
//! changes written by a webhook take effect immediately. For metered plans the view is recorded
//! inside one transaction that locks the `(account, month)` usage row, which keeps the quota
//! exact under concurrent requests.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use paywall::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = paywall::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     paywall::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod api;
pub mod auth;
pub mod billing;
pub mod config;
pub mod db;
pub mod entitlements;
pub mod errors;
mod metrics;
mod openapi;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::{
    auth::password,
    billing::PaymentProvider,
    config::CorsOrigin,
    db::handlers::{Accounts, Repository, accounts::PgAccountDirectory, usage::PgUsageStore},
    db::models::accounts::AccountCreateDBRequest,
    entitlements::{ADMIN_ROLE, AccessPolicy, QuotaGate},
    openapi::ApiDoc,
    types::AccountId,
};
use axum::http::HeaderValue;
use axum::{
    Router, http,
    routing::{get, post, put},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool.clone())
///     .config(config.clone())
///     .access(build_access_policy(&pool, &config))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Decides gated strategy reads
    pub access: Arc<AccessPolicy>,
    /// Present when `payment` is configured
    pub payment_provider: Option<Arc<dyn PaymentProvider>>,
}

/// Get the paywall database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Access policy backed by the `accounts` and `usage_periods` tables.
pub fn build_access_policy(pool: &PgPool, config: &Config) -> Arc<AccessPolicy> {
    let quota = QuotaGate::new(
        Arc::new(PgUsageStore::new(pool.clone())),
        config.access.monthly_view_quota,
        config.access.decision_timeout,
    );
    Arc::new(AccessPolicy::new(Arc::new(PgAccountDirectory::new(pool.clone())), quota))
}

/// Create the initial admin account if it doesn't exist.
///
/// Idempotent: an existing account with `email` is promoted to admin, and its password is
/// replaced when one is given.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(email: &str, password: Option<&str>, db: &PgPool) -> Result<AccountId, sqlx::Error> {
    let password_hash = if let Some(pwd) = password {
        Some(password::hash_string(pwd).map_err(|e| sqlx::Error::Encode(format!("Failed to hash admin password: {e}").into()))?)
    } else {
        None
    };

    let mut tx = db.begin().await?;
    let mut accounts = Accounts::new(&mut tx);

    if let Some(existing) = accounts
        .get_by_email(email)
        .await
        .map_err(|e| sqlx::Error::Protocol(format!("Failed to check existing account: {e}")))?
    {
        sqlx::query("UPDATE accounts SET role = $1, password_hash = COALESCE($2, password_hash), updated_at = NOW() WHERE id = $3")
            .bind(ADMIN_ROLE)
            .bind(password_hash)
            .bind(existing.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        return Ok(existing.id);
    }

    let created = accounts
        .create(&AccountCreateDBRequest {
            email: email.to_string(),
            display_name: None,
            role: Some(ADMIN_ROLE.to_string()),
            subscription_tier: None,
            password_hash,
        })
        .await
        .map_err(|e| sqlx::Error::Protocol(format!("Failed to create admin account: {e}")))?;

    tx.commit().await?;
    info!(email = %email, "Created initial admin account");
    Ok(created.id)
}

/// Connect, run migrations, and ensure the admin account exists
async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let pool_settings = &config.database.pool;
    let optional_secs = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));

    let pool = PgPoolOptions::new()
        .max_connections(pool_settings.max_connections)
        .min_connections(pool_settings.min_connections)
        .acquire_timeout(Duration::from_secs(pool_settings.acquire_timeout_secs))
        .idle_timeout(optional_secs(pool_settings.idle_timeout_secs))
        .max_lifetime(optional_secs(pool_settings.max_lifetime_secs))
        .connect(&config.database.url)
        .await?;

    migrator().run(&pool).await?;

    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.auth.security.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().trim_end_matches('/').parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::PUT, http::Method::PATCH, http::Method::DELETE])
        .allow_headers([http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
        .allow_credentials(config.auth.security.cors.allow_credentials)
        .expose_headers(vec![http::header::LOCATION]);

    if let Some(max_age) = config.auth.security.cors.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router.
///
/// - `/authentication/*`: login and logout
/// - `/api/v1/*`: strategies, accounts, usage and saved strategies
/// - `/webhooks/payments`: payment processor webhooks
/// - `/healthz`, `/docs`, and `/internal/metrics` when metrics are enabled
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    use api::handlers::{auth, payments, saved_strategies, strategies, usage, users};

    let auth_routes = Router::new()
        .route("/authentication/login", post(auth::login))
        .route("/authentication/logout", post(auth::logout));

    let api_routes = Router::new()
        .route("/strategies", get(strategies::list_strategies).post(strategies::create_strategy))
        .route(
            "/strategies/{id}",
            get(strategies::get_strategy)
                .patch(strategies::update_strategy)
                .delete(strategies::delete_strategy),
        )
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/current/usage", get(usage::get_current_usage))
        .route("/users/current/saved-strategies", get(saved_strategies::list_saved_strategies))
        .route(
            "/users/current/saved-strategies/{strategy_id}",
            put(saved_strategies::save_strategy).delete(saved_strategies::remove_saved_strategy),
        )
        .route("/users/{id}", get(users::get_user).patch(users::update_user).delete(users::delete_user));

    let cors_layer = create_cors_layer(&state.config)?;
    let enable_metrics = state.config.enable_metrics;

    let mut router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/webhooks/payments", post(payments::webhook_handler))
        .merge(auth_routes)
        .nest("/api/v1", api_routes)
        .with_state(state)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(cors_layer);

    if enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

        // HTTP metrics from axum-prometheus, then the access and billing counters
        router = router
            .route(
                "/internal/metrics",
                get(|| async move {
                    let mut rendered = metric_handle.render();
                    match metrics::gather_default_registry() {
                        Ok(counters) => rendered.push_str(&counters),
                        Err(e) => tracing::error!("Failed to encode metrics: {:#}", e),
                    }
                    rendered
                }),
            )
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::new_with_pool(config, None).await
    }

    /// Create an application, reusing `pool` when given instead of connecting.
    pub async fn new_with_pool(config: Config, pool: Option<PgPool>) -> anyhow::Result<Self> {
        debug!("Starting paywall with configuration: {:#?}", config);

        let pool = match pool {
            Some(pool) => pool,
            None => setup_database(&config).await?,
        };

        create_initial_admin_user(&config.admin_email, config.admin_password.as_deref(), &pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {}", e))?;

        let payment_provider: Option<Arc<dyn PaymentProvider>> = config.payment.clone().map(|payment| {
            let provider: Arc<dyn PaymentProvider> = Arc::from(billing::create_provider(payment));
            info!(provider = provider.name(), "Payment webhooks enabled");
            provider
        });

        let app_state = AppState::builder()
            .db(pool.clone())
            .config(config.clone())
            .access(build_access_policy(&pool, &config))
            .maybe_payment_provider(payment_provider)
            .build();

        let router = build_router(app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("Paywall listening on http://{}, available at http://localhost:{}", bind_addr, self.config.port);

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::create_initial_admin_user;
    use crate::db::handlers::{Accounts, Repository};
    use crate::entitlements::{Tier, resolve_tier};
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_initial_admin_is_idempotent(pool: PgPool) {
        let first = create_initial_admin_user("boss@example.com", Some("first-pass"), &pool).await.unwrap();
        let second = create_initial_admin_user("boss@example.com", None, &pool).await.unwrap();
        assert_eq!(first, second);

        let mut conn = pool.acquire().await.unwrap();
        let account = Accounts::new(&mut conn).get_by_id(first).await.unwrap().unwrap();
        assert_eq!(resolve_tier(Some(&account.snapshot())), Tier::Admin);
        // A bootstrap without a password keeps the existing one
        let hash = account.password_hash.unwrap();
        assert!(crate::auth::password::verify_string("first-pass", &hash).unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_initial_admin_promotes_existing_account(pool: PgPool) {
        let member = create_test_account(&pool, None, Some("curious retail")).await;
        let email = member.email.clone().unwrap();

        let id = create_initial_admin_user(&email, None, &pool).await.unwrap();
        assert_eq!(id, member.id);

        let mut conn = pool.acquire().await.unwrap();
        let account = Accounts::new(&mut conn).get_by_id(id).await.unwrap().unwrap();
        assert_eq!(account.role.as_deref(), Some("admin"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_bootstrap_admin_can_log_in(pool: PgPool) {
        let mut config = create_test_config();
        config.admin_password = Some("bootstrap-pass".to_string());
        let server = create_test_app_with_config(pool, config).await;

        server
            .post("/authentication/login")
            .json(&serde_json::json!({ "email": "root@example.com", "password": "bootstrap-pass" }))
            .await
            .assert_status_ok();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_healthz_and_docs(pool: PgPool) {
        let server = create_test_app(pool).await;

        let response = server.get("/healthz").await;
        response.assert_status_ok();
        assert_eq!(response.text(), "OK");

        server.get("/docs").await.assert_status_ok();
        server.get("/internal/metrics").await.assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_metrics_endpoint_when_enabled(pool: PgPool) {
        let mut config = create_test_config();
        config.enable_metrics = true;
        let server = create_test_app_with_config(pool.clone(), config).await;

        let strategy = create_test_strategy(&pool, "Metered").await;
        server.get(&format!("/api/v1/strategies/{}", strategy.id)).await;

        let response = server.get("/internal/metrics").await;
        response.assert_status_ok();
        assert!(response.text().contains("paywall_access_decisions_total"));
    }
}
