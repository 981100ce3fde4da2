use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use grid_api::config::ServerConfig;
use grid_api::router::build_app_router;
use grid_api::state::AppState;
use grid_db::PgStore;
use grid_events::{Dispatcher, NotifyConfig, WebhookSink};
use grid_lifecycle::{JobLifecycle, LifecycleConfig};
use grid_registry::config::REQUEST_TIMEOUT;
use grid_registry::{HttpRegistryClient, ModelResolver, ResolverConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "grid_api=debug,grid_lifecycle=info,grid_registry=info,grid_events=info,tower_http=debug"
            .into()
    });
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = grid_db::create_pool(&database_url)
        .await
        .context("Cannot connect to database")?;
    grid_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    tracing::info!("Database connection established");
    grid_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    // --- Notifications ---
    let notify_config = NotifyConfig::from_env();
    let sink = WebhookSink::from_config(&notify_config).context("Failed to build webhook sink")?;
    let (notifier, dispatcher) = Dispatcher::spawn(Arc::new(sink), notify_config.queue_capacity);

    // --- Model catalog ---
    let resolver_config = ResolverConfig::from_env();
    let client = HttpRegistryClient::new(&resolver_config.registry_url, REQUEST_TIMEOUT)
        .context("Failed to build registry client")?;
    let resolver = ModelResolver::bootstrap(Arc::new(client), resolver_config)
        .await
        .context("No model catalog available")?;
    let refresh_cancel = CancellationToken::new();
    let refresh_handle = resolver.spawn_refresher(refresh_cancel.clone());

    // --- Lifecycle ---
    let lifecycle = Arc::new(JobLifecycle::new(
        Arc::new(PgStore::new(pool.clone())),
        Arc::clone(&resolver),
        notifier,
        LifecycleConfig::from_env(),
    ));

    let state = AppState {
        pool: Some(pool),
        config: Arc::new(config.clone()),
        lifecycle,
        resolver,
    };
    let app = build_app_router(state, &config);

    // --- Serve ---
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid HOST/PORT")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    refresh_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), refresh_handle).await;
    tracing::info!("Catalog refresher stopped");

    // Deliver notifications still queued.
    dispatcher.shutdown().await;
    tracing::info!("Graceful shutdown complete");

    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
