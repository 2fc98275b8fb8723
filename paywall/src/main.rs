//! `paywall` server binary.
//!
//! ```text
//! paywall [-f config.yaml] [--validate]
//! ```
//!
//! Settings come from the YAML file, then `PAYWALL_*` environment variables, then `DATABASE_URL`.

use clap::Parser;
use paywall::{Application, Config, config::Args, telemetry};

/// Resolves on Ctrl+C, or on SIGTERM where available.
async fn shutdown_signal() {
    let interrupt = async {
        tokio::signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
        "Ctrl+C"
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        signal(SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
        "SIGTERM"
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    let received = tokio::select! {
        name = interrupt => name,
        name = terminate => name,
    };
    tracing::info!(signal = received, "Shutting down; draining in-flight requests");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load(&args)?;

    if args.validate {
        println!("Configuration in {} is valid.", args.config);
        return Ok(());
    }

    telemetry::init_telemetry(config.enable_otel_export)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config,
        monthly_view_quota = config.access.monthly_view_quota,
        payments = config.payment.is_some(),
        "Starting paywall"
    );

    let app = Application::new(config).await?;
    app.serve(shutdown_signal()).await
}
