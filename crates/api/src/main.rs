//! Slotwise binary entry point.
//!
//! Loads configuration, wires the context, starts the background passes,
//! and waits for Ctrl-C.

use anyhow::Context as _;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use slotwise_app::AppContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = slotwise_infra::config::load().context("loading configuration")?;
    let context = AppContext::new(config).context("wiring application context")?;

    let (mut reconcile, mut reminder) = context.build_schedulers();
    reconcile.start().await.context("starting reconciliation scheduler")?;
    reminder.start().await.context("starting reminder scheduler")?;
    info!("slotwise running, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
    info!("shutting down");

    reminder.stop().await.context("stopping reminder scheduler")?;
    reconcile.stop().await.context("stopping reconciliation scheduler")?;
    Ok(())
}
