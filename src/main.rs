//! Earthquake Widget Daemon — Binary Entrypoint
//! Wires the feed providers, the persistent store, and the refresh
//! scheduler; the display surface renders as structured log lines.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use quake_widget_engine::display::{RenderSurface, SurfaceMetadata};
use quake_widget_engine::feed::config::FeedConfig;
use quake_widget_engine::feed::providers::{emsc::EmscProvider, usgs::UsgsProvider};
use quake_widget_engine::feed::scheduler::{spawn_refresh_scheduler, RefreshSchedulerCfg};
use quake_widget_engine::feed::types::EventProvider;
use quake_widget_engine::gate::RefreshGate;
use quake_widget_engine::store::{FileStore, KvStore};

/// Stands in for a real home-screen surface: the header line becomes a log
/// record.
struct TracingSurface;

impl RenderSurface for TracingSurface {
    fn notify_data_changed(&self) {
        tracing::debug!("display data invalidated");
    }

    fn update_surface(&self, metadata: &SurfaceMetadata) {
        tracing::info!(
            count = metadata.item_count,
            last_updated = %metadata.last_updated_label,
            "widget surface updated"
        );
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("quake_widget_engine=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op elsewhere.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = FeedConfig::load_default().context("loading feed configuration")?;
    tracing::info!(
        min_magnitude = cfg.min_magnitude,
        interval_secs = cfg.refresh_interval_secs,
        "starting widget daemon"
    );

    let store: Arc<dyn KvStore> =
        Arc::new(FileStore::open(cfg.store_path.clone()).context("opening widget store")?);
    let providers: Arc<Vec<Box<dyn EventProvider>>> = Arc::new(vec![
        Box::new(UsgsProvider::from_config(&cfg)?) as Box<dyn EventProvider>,
        Box::new(EmscProvider::from_config(&cfg)?) as Box<dyn EventProvider>,
    ]);
    let surface: Arc<dyn RenderSurface> = Arc::new(TracingSurface);
    let gate = RefreshGate::new(Arc::clone(&store));

    let scheduler = spawn_refresh_scheduler(
        RefreshSchedulerCfg {
            interval: cfg.refresh_interval(),
        },
        providers,
        store,
        surface,
        gate,
    );

    scheduler.await.context("refresh scheduler exited")?;
    Ok(())
}
