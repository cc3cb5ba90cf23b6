use clap::{Parser, Subcommand};
use insight_relay_integration::ApiService;
use insight_relay_server::{AppState, ServerConfig, ServerError, Services, demo, router};
use insight_relay_core::Result;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired sessions and stale rate-limit windows are dropped.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Parser)]
#[command(name = "insight-relay", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API (default).
    Serve,
    /// Run sample utterances through the built-in triggers without network access.
    Demo,
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match run(cli.command.unwrap_or(Command::Serve)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            eprintln!("{report:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<(), ServerError> {
    let config = ServerConfig::from_env().map_err(|e| ServerError::Config {
        reason: e.to_string(),
    })?;

    match command {
        Command::Serve => serve(config).await,
        Command::Demo => {
            let runs = demo::run(config.builtin_options()).await?;
            let fired = runs
                .iter()
                .filter(|r| r.result.response().is_some())
                .count();
            tracing::info!(utterances = runs.len(), fired, "Demo finished");
            Ok(())
        }
    }
}

async fn serve(config: ServerConfig) -> Result<(), ServerError> {
    let missing: Vec<&str> = config
        .credentials()
        .missing()
        .iter()
        .map(ApiService::env_var)
        .collect();
    if missing.is_empty() {
        tracing::info!("All API keys configured");
    } else {
        tracing::warn!(
            missing = ?missing,
            "API keys missing; dependent endpoints will fail"
        );
    }

    let services = Services::from_config(&config)?;
    let state = Arc::new(AppState::new(&config, services)?);
    tracing::info!(
        triggers = state.registry.list().len(),
        max_sessions = config.realtime_max_sessions,
        rate_limiting = config.rate_limiting_enabled,
        "Application state ready"
    );

    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let sessions = cleanup_state.sessions.cleanup_expired().await;
            let windows = cleanup_state
                .rate_limiter
                .as_ref()
                .map_or(0, |limiter| limiter.prune());
            if sessions > 0 || windows > 0 {
                tracing::debug!(sessions, windows, "Periodic cleanup");
            }
        }
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| ServerError::Bind {
            addr: config.bind_addr.clone(),
            reason: e.to_string(),
        })?;
    tracing::info!("listening on http://{}", config.bind_addr);

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| ServerError::Serve {
        reason: e.to_string(),
    })?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
