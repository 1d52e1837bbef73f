//! # Flowdash: Schema-Driven Live Telemetry Dashboard
//!
//! A live dashboard for battery/inverter monitoring backends. The backend
//! publishes a register definition document describing every measurement
//! (unit, scale, display grouping, widget kind, status/bitmask decoding
//! rules); flowdash materializes its widgets purely from that schema, then
//! keeps them fresh from a 1 s polling endpoint while maintaining bounded,
//! time-windowed series for the charts.
//!
//! ## Architecture
//!
//! - **Feed worker**: owns the poll loop, the register catalog, the widget
//!   plan and the windowing store on a dedicated thread
//! - **Frontend**: renders the shared view model using eframe/egui with
//!   egui_plot for chart groups
//! - **Communication**: crossbeam channels for commands and events; display
//!   updates flow through the [`render::RenderSink`] trait
//! - **Sources**: a reqwest-backed HTTP client against the real backend, or
//!   a deterministic mock (`--mock`) for offline use
//!
//! ## Configuration
//!
//! Settings live in the platform data directory under `flowdash/`:
//!
//! - **Linux**: `~/.local/share/flowdash/config.json`
//! - **macOS**: `~/Library/Application Support/flowdash/config.json`
//! - **Windows**: `%APPDATA%\flowdash\config.json`
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::{Arc, Mutex};
//! use flowdash::{
//!     config::AppConfig,
//!     feed::{self, HttpSource},
//!     frontend::{DashApp, DashboardView, EguiSink},
//! };
//!
//! fn main() -> eframe::Result<()> {
//!     let config = AppConfig::load_or_default();
//!     let view = Arc::new(Mutex::new(DashboardView::default()));
//!
//!     let source = HttpSource::new(
//!         &config.api.base_url,
//!         config.api.timeout(),
//!         config.api.token.clone(),
//!     )
//!     .expect("http client");
//!     let handle = feed::spawn(
//!         config.feed_config(),
//!         Box::new(source),
//!         Box::new(EguiSink::new(view.clone())),
//!     );
//!
//!     eframe::run_native(
//!         "Flowdash",
//!         eframe::NativeOptions::default(),
//!         Box::new(move |_cc| {
//!             Ok(Box::new(DashApp::new(
//!                 view,
//!                 handle.commands.clone(),
//!                 handle.events.clone(),
//!                 config.site.clone(),
//!             )))
//!         }),
//!     )
//! }
//! ```

pub mod config;
pub mod decode;
pub mod error;
pub mod feed;
pub mod frontend;
pub mod registry;
pub mod render;
pub mod schema;
pub mod store;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{DashError, Result};
pub use feed::{FeedCommand, FeedEvent, LoopState};
pub use registry::{WidgetPlan, WidgetTarget};
pub use schema::{Catalog, RegisterDef};
pub use store::{SeriesPoint, WindowPolicy, WindowStore};
