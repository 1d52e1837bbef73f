//! Feed backend: data sources and the poll loop worker
//!
//! The feed side of the application mirrors the classic backend/frontend
//! split: a dedicated worker thread owns the poll loop controller and all
//! engine state (catalog, widget plan, windowing store), the UI owns the
//! render surfaces, and the two communicate over crossbeam channels:
//! commands in, events out. Display updates flow through the
//! [`RenderSink`](crate::render::RenderSink) the worker was given.

pub mod client;
pub mod mock;
pub mod poll;
pub mod source;

pub use client::HttpSource;
pub use mock::MockSource;
pub use poll::FeedWorker;
pub use source::{DataSource, HistoryRange, HistoryRecord, LiveSample};

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, Sender};
use std::path::PathBuf;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::registry::BucketRules;
use crate::render::RenderSink;

/// Event channel capacity; overflow drops events rather than blocking the
/// poll loop
const EVENT_QUEUE_CAPACITY: usize = 256;

/// Poll loop state machine.
///
/// `Idle -> LoadingSchema -> Ready -> Polling <-> Paused`, with
/// `NeedsAuth` on an auth challenge (recoverable via `SetToken`) and
/// `Failed` on an unrecoverable schema load failure (recoverable only via
/// `Reload`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    #[default]
    Idle,
    LoadingSchema,
    NeedsAuth,
    Ready,
    Polling,
    Paused,
    Failed,
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopState::Idle => write!(f, "Idle"),
            LoopState::LoadingSchema => write!(f, "Loading schema..."),
            LoopState::NeedsAuth => write!(f, "Authentication required"),
            LoopState::Ready => write!(f, "Ready"),
            LoopState::Polling => write!(f, "Live"),
            LoopState::Paused => write!(f, "Paused"),
            LoopState::Failed => write!(f, "Failed"),
        }
    }
}

/// Commands the UI sends to the feed worker
#[derive(Debug, Clone)]
pub enum FeedCommand {
    /// Suspend live fetch issuance; buffers and widgets stay intact
    Pause,
    /// Resume polling; issues one fetch immediately
    Resume,
    /// Tear down and re-run schema load, plan build and backfill
    Reload,
    /// Install or clear the auth token, then retry the blocked stage
    SetToken(Option<String>),
    /// Fetch historical charts for a range (the historical page)
    LoadHistory(HistoryRange),
    /// Download a CSV export and write it to `dest`
    Export {
        range: HistoryRange,
        variables: Option<Vec<String>>,
        dest: PathBuf,
    },
    Shutdown,
}

/// One series of a historical chart snapshot
#[derive(Debug, Clone)]
pub struct HistorySeries {
    pub register: String,
    pub label: String,
    pub color: Option<String>,
    pub points: Vec<crate::store::SeriesPoint>,
}

/// One chart surface of a historical snapshot
#[derive(Debug, Clone)]
pub struct HistoryGroup {
    pub key: String,
    pub axis_title: String,
    pub series: Vec<HistorySeries>,
}

/// Events the feed worker sends to the UI
#[derive(Debug, Clone)]
pub enum FeedEvent {
    State(LoopState),
    /// Widget plan summary after a successful schema load
    PlanReady {
        groups: usize,
        datasets: usize,
        cards: usize,
        /// Historical-view register names, offered by the export picker
        export_variables: Vec<String>,
    },
    /// One live sample was decoded and routed
    TickApplied { timestamp: DateTime<Utc> },
    /// A single fetch failed; the next tick is the retry
    FetchError(String),
    /// Historical snapshot answering a LoadHistory command
    HistoryLoaded {
        range: String,
        groups: Vec<HistoryGroup>,
    },
    /// Schema load failed; blocking until Reload
    Fatal(String),
    ExportFinished {
        dest: PathBuf,
        error: Option<String>,
    },
    Shutdown,
}

/// Worker configuration assembled by the caller from [`crate::config`]
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Live poll cadence (nominal 1 s)
    pub poll_interval: Duration,
    /// History window in minutes; drives the backfill lookback and the
    /// windowing policy
    pub history_minutes: u32,
    /// Display bucket classification for card widgets
    pub buckets: BucketRules,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            history_minutes: 5,
            buckets: BucketRules::default(),
        }
    }
}

/// Handle to a running feed worker
pub struct FeedHandle {
    pub commands: Sender<FeedCommand>,
    pub events: Receiver<FeedEvent>,
    pub thread: JoinHandle<()>,
}

/// Spawn the feed worker thread.
///
/// The worker owns the source and the sink; the returned handle carries
/// the command/event channel endpoints for the UI.
pub fn spawn(
    config: FeedConfig,
    source: Box<dyn DataSource>,
    sink: Box<dyn RenderSink>,
) -> FeedHandle {
    let (command_tx, command_rx) = crossbeam_channel::unbounded();
    let (event_tx, event_rx) = crossbeam_channel::bounded(EVENT_QUEUE_CAPACITY);

    let thread = std::thread::spawn(move || {
        let mut worker = FeedWorker::new(config, source, sink, command_rx, event_tx);
        worker.run();
    });

    FeedHandle {
        commands: command_tx,
        events: event_rx,
        thread,
    }
}
