use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use grid_db::PgStore;
use grid_events::{Dispatcher, NotifyConfig, WebhookSink};
use grid_monitor::{run_sweep, MonitorArgs};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let args = MonitorArgs::parse();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "grid_monitor=info,grid_lifecycle=info,grid_events=info".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = grid_db::create_pool(&database_url)
        .await
        .context("Cannot connect to database")?;
    let store = PgStore::new(pool);

    // --- Notifications ---
    let notify_config = NotifyConfig::from_env();
    let sink = WebhookSink::from_config(&notify_config).context("Failed to build webhook sink")?;
    let (notifier, dispatcher) = Dispatcher::spawn(Arc::new(sink), notify_config.queue_capacity);

    // --- Sweep ---
    let outcome = run_sweep(&store, &store, &notifier, &args.options(), Utc::now()).await;

    // Deliver whatever the sweep enqueued before exiting.
    drop(notifier);
    dispatcher.shutdown().await;

    let outcome = outcome.context("Queue sweep failed")?;
    let now = Utc::now().format("%Y-%m-%d %H:%M:%S");
    for line in outcome.summary(args.quiet) {
        println!("[{now}] {line}");
    }

    Ok(ExitCode::from(outcome.exit_code()))
}
