//! Flowdash - Main Entry Point
//!
//! Desktop dashboard for schema-driven battery/inverter telemetry. Spawns
//! the feed worker thread against the configured backend (or the built-in
//! mock with `--mock`) and runs the egui frontend on the main thread.

use std::sync::{Arc, Mutex};

use anyhow::Context;
use flowdash::config::AppConfig;
use flowdash::feed::{self, DataSource, FeedCommand, HttpSource, MockSource};
use flowdash::frontend::{DashApp, DashboardView, EguiSink};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,flowdash=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Flowdash");

    let use_mock = std::env::args().any(|arg| arg == "--mock");
    let config = AppConfig::load_or_default();

    let source: Box<dyn DataSource> = if use_mock {
        tracing::info!("Using the built-in mock data source");
        Box::new(MockSource::new())
    } else {
        tracing::info!("Polling backend at {}", config.api.base_url);
        Box::new(
            HttpSource::new(
                &config.api.base_url,
                config.api.timeout(),
                config.api.token.clone(),
            )
            .context("failed to build the HTTP client")?,
        )
    };

    // Shared view model: written by the feed worker through the sink,
    // read by the app once per frame.
    let view = Arc::new(Mutex::new(DashboardView::default()));
    let handle = feed::spawn(
        config.feed_config(),
        source,
        Box::new(EguiSink::new(view.clone())),
    );

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("Flowdash"),
        ..Default::default()
    };

    let commands = handle.commands.clone();
    let events = handle.events.clone();
    let site = config.site.clone();
    let result = eframe::run_native(
        "Flowdash",
        native_options,
        Box::new(move |_cc| Ok(Box::new(DashApp::new(view, commands, events, site)))),
    );

    // The app sends Shutdown on drop as well; this covers early exits.
    let _ = handle.commands.send(FeedCommand::Shutdown);
    if handle.thread.join().is_err() {
        tracing::warn!("Feed worker panicked during shutdown");
    }

    result.map_err(|e| anyhow::anyhow!("eframe failed: {}", e))
}
