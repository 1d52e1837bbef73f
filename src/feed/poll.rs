//! Poll loop controller: the scheduling core of the dashboard
//!
//! [`FeedWorker`] runs on its own thread and owns every piece of engine
//! state: the register catalog, the widget plan, and the windowing store.
//! Startup loads the schema once, builds the plan, fetches one historical
//! backfill and seeds the store; after that a fixed-cadence tick fetches a
//! live sample, decodes and routes every schema-declared live register,
//! and flushes the charts with exactly one redraw per touched surface,
//! never one per register.
//!
//! Single-writer discipline: the store and the per-group dataset arrays
//! are mutated only here, by the tick handler and the one-time seed, so no
//! locking is needed around them.
//!
//! Fetches are issued blocking from inside the tick, so a tick never
//! overlaps the previous one; a slow response simply delays the next tick.
//! Points are ordered by the sample's own timestamp, never by arrival.
//! Pausing suspends fetch issuance only (buffers and widgets stay
//! intact), and resuming fetches immediately instead of waiting out a full
//! period.

use chrono::Utc;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::decode;
use crate::error::DashError;
use crate::feed::source::{DataSource, HistoryRange};
use crate::feed::{FeedCommand, FeedConfig, FeedEvent, LoopState};
use crate::registry::{point_radius_for, GroupId, WidgetPlan, WidgetTarget};
use crate::render::RenderSink;
use crate::schema::{Catalog, ComponentKind, ViewTag};
use crate::store::{SeriesPoint, WindowPolicy, WindowStore};

/// Live samples arrive pre-scaled by the backend; display precision still
/// derives from the register's declared scale
const LIVE_SCALE: f64 = 1.0;

/// How long to wait for commands when not polling
const IDLE_WAIT: Duration = Duration::from_millis(500);

/// The feed worker that runs the poll loop
pub struct FeedWorker {
    config: FeedConfig,
    source: Box<dyn DataSource>,
    sink: Box<dyn RenderSink>,
    command_rx: Receiver<FeedCommand>,
    event_tx: Sender<FeedEvent>,
    state: LoopState,
    catalog: Option<Arc<Catalog>>,
    plan: WidgetPlan,
    store: WindowStore,
    last_tick: Instant,
    force_tick: bool,
    running: bool,
    dropped_events: u64,
}

impl FeedWorker {
    pub fn new(
        config: FeedConfig,
        source: Box<dyn DataSource>,
        sink: Box<dyn RenderSink>,
        command_rx: Receiver<FeedCommand>,
        event_tx: Sender<FeedEvent>,
    ) -> Self {
        let policy = WindowPolicy::from_history(
            config.history_minutes,
            config.poll_interval.as_secs().max(1),
        );
        Self {
            config,
            source,
            sink,
            command_rx,
            event_tx,
            state: LoopState::Idle,
            catalog: None,
            plan: WidgetPlan::default(),
            store: WindowStore::new(policy),
            last_tick: Instant::now(),
            force_tick: false,
            running: true,
            dropped_events: 0,
        }
    }

    /// Run the worker loop until shutdown
    pub fn run(&mut self) {
        tracing::info!("Feed worker started");
        self.initialize();

        while self.running {
            match self.command_rx.recv_timeout(self.wait_budget()) {
                Ok(cmd) => self.handle_command(cmd),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    self.running = false;
                    break;
                }
            }
            if self.running && self.tick_due() {
                self.tick();
            }
        }

        self.emit(FeedEvent::Shutdown);
        tracing::info!("Feed worker stopped");
    }

    /// Load the schema, build the widget plan, seed the backfill and start
    /// polling. Also services `Reload`.
    fn initialize(&mut self) {
        self.catalog = None;
        self.plan = WidgetPlan::default();
        self.store.clear();
        self.set_state(LoopState::LoadingSchema);

        let raw = match self.source.fetch_schema() {
            Ok(raw) => raw,
            Err(e) if e.is_auth() => {
                tracing::warn!("Schema fetch hit an auth challenge");
                self.set_state(LoopState::NeedsAuth);
                return;
            }
            Err(e) => {
                tracing::error!("Schema fetch failed: {}", e);
                self.emit(FeedEvent::Fatal(e.to_string()));
                self.set_state(LoopState::Failed);
                return;
            }
        };

        let catalog = match Catalog::load(raw) {
            Ok(catalog) => Arc::new(catalog),
            Err(e) => {
                tracing::error!("{}", e);
                self.emit(FeedEvent::Fatal(e.to_string()));
                self.set_state(LoopState::Failed);
                return;
            }
        };

        let mut plan = WidgetPlan::build(&catalog, &ViewTag::Live, &self.config.buckets);
        self.store = WindowStore::new(WindowPolicy::from_history(
            self.config.history_minutes,
            self.config.poll_interval.as_secs().max(1),
        ));
        self.seed_backfill(&catalog, &mut plan);
        self.set_state(LoopState::Ready);

        self.sink.create_widgets(&plan);
        for (gi, group) in plan.groups.iter().enumerate() {
            for (slot, spec) in group.slots.iter().enumerate() {
                let points = self.store.snapshot(&spec.register);
                self.sink
                    .set_series(GroupId(gi), slot, points, spec.point_radius);
            }
        }
        if !plan.groups.is_empty() {
            let all: Vec<GroupId> = (0..plan.groups.len()).map(GroupId).collect();
            self.sink.redraw(&all);
        }

        let export_variables = catalog
            .view_registers(&ViewTag::Historical)
            .iter()
            .map(|r| r.name.clone())
            .collect();
        self.emit(FeedEvent::PlanReady {
            groups: plan.groups.len(),
            datasets: plan.slot_count(),
            cards: plan.card_count(),
            export_variables,
        });

        self.catalog = Some(catalog);
        self.plan = plan;
        self.set_state(LoopState::Polling);
        self.force_tick = true;
    }

    /// Fetch one backfill scoped to the history window and seed the store.
    ///
    /// A failed backfill is logged and skipped; charts start empty and
    /// fill from live data; there is no automatic retry.
    fn seed_backfill(&mut self, catalog: &Catalog, plan: &mut WidgetPlan) {
        let chart_regs = catalog.registers_for(&ViewTag::Live, &ComponentKind::LineChart);
        if chart_regs.is_empty() {
            return;
        }

        let range = HistoryRange::Minutes(self.config.history_minutes);
        let records = match self.source.fetch_history(&range) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Backfill fetch failed, charts start empty: {}", e);
                self.emit(FeedEvent::FetchError(e.to_string()));
                return;
            }
        };
        tracing::debug!("Backfill returned {} records", records.len());

        // Records arrive in arbitrary order with possible nulls; the store
        // sorts and windows on seed. Unlike live samples, backfill values
        // are raw and take the register scale here.
        let mut per_register: HashMap<&str, Vec<SeriesPoint>> = HashMap::new();
        let mut newest = None;
        for record in &records {
            let Some(timestamp) = record.parsed_timestamp() else {
                continue;
            };
            if newest.map_or(true, |n| timestamp > n) {
                newest = Some(timestamp);
            }
            for reg in &chart_regs {
                if let Some(value) = record.values.get(&reg.name) {
                    let y = decode::numeric_value(Some(value)).map(|v| v * reg.scale_or_default());
                    per_register
                        .entry(reg.name.as_str())
                        .or_default()
                        .push(SeriesPoint { x: timestamp, y });
                }
            }
        }

        // Window relative to the newest record, matching how append evicts
        // relative to the appended point.
        let now = newest.unwrap_or_else(Utc::now);
        let max_points = self.store.policy().max_points;
        let mut any_seeded = false;
        for reg in &chart_regs {
            let points = per_register.remove(reg.name.as_str()).unwrap_or_default();
            self.store.seed(&reg.name, points, now);

            let seeded = self.store.get(&reg.name).map_or(0, |b| b.len());
            if seeded > 0 {
                any_seeded = true;
            }
            for target in plan.targets_for(&reg.name).to_vec() {
                if let WidgetTarget::ChartSlot { group, slot } = target {
                    if let Some(spec) = plan
                        .groups
                        .get_mut(group.0)
                        .and_then(|g| g.slots.get_mut(slot))
                    {
                        spec.point_radius = point_radius_for(seeded, max_points);
                    }
                }
            }
        }

        // Reduced animation when any series starts non-empty; a full
        // backfill animating in looks like a storm.
        plan.animate = !any_seeded;
    }

    /// One poll tick: fetch, decode, route, flush
    fn tick(&mut self) {
        self.force_tick = false;
        self.last_tick = Instant::now();

        let sample = match self.source.fetch_live() {
            Ok(sample) => sample,
            Err(e) if e.is_auth() => {
                tracing::warn!("Live fetch hit an auth challenge, polling halted");
                self.set_state(LoopState::NeedsAuth);
                return;
            }
            Err(e) => {
                tracing::warn!("Live fetch failed, skipping tick: {}", e);
                self.emit(FeedEvent::FetchError(e.to_string()));
                return;
            }
        };

        if let Some(error) = &sample.error {
            tracing::warn!("Live endpoint reported an error, skipping tick: {}", error);
            self.emit(FeedEvent::FetchError(error.clone()));
            return;
        }

        let timestamp = sample.resolved_timestamp(Utc::now());
        let Some(catalog) = self.catalog.clone() else {
            return;
        };

        let mut touched: BTreeSet<GroupId> = BTreeSet::new();
        for reg in catalog.view_registers(&ViewTag::Live) {
            let raw = sample.value(&reg.name);
            if raw.is_none() {
                tracing::trace!("No live value for register '{}'", reg.name);
            }

            for target in self.plan.targets_for(&reg.name).to_vec() {
                match target {
                    WidgetTarget::ChartSlot { group, slot } => {
                        // Absent key: no point this tick. Present but
                        // malformed: a gap point, so the series survives.
                        let Some(value) = raw else { continue };
                        let point = SeriesPoint {
                            x: timestamp,
                            y: decode::numeric_value(Some(value)),
                        };
                        self.store.append(&reg.name, point);

                        let radius = self
                            .plan
                            .group(group)
                            .and_then(|g| g.slots.get(slot))
                            .map_or(1.5, |s| s.point_radius);
                        self.sink
                            .set_series(group, slot, self.store.snapshot(&reg.name), radius);
                        touched.insert(group);
                    }
                    WidgetTarget::Gauge { .. } => {
                        self.sink
                            .apply_gauge(&reg.name, decode::decode_gauge(raw, reg));
                    }
                    WidgetTarget::Scalar { .. } => {
                        self.sink.apply_scalar(
                            &reg.name,
                            decode::decode_scalar(raw, reg, Some(LIVE_SCALE)),
                        );
                    }
                    WidgetTarget::StatusPanel { .. } => {
                        self.sink.apply_status(
                            &reg.name,
                            decode::decode_status(raw, &reg.ui.status_mapping),
                        );
                    }
                    WidgetTarget::BitmaskPanel { .. } => {
                        self.sink.apply_bitmask(
                            &reg.name,
                            decode::decode_bitmask(raw, &reg.ui.bit_mapping),
                        );
                    }
                    WidgetTarget::Indicator { .. } => {
                        self.sink
                            .apply_indicator(&reg.name, decode::decode_indicator(raw, reg));
                    }
                }
            }
        }

        // Batch-then-flush: every register was routed above, now exactly
        // one redraw per touched surface.
        if !touched.is_empty() {
            let groups: Vec<GroupId> = touched.into_iter().collect();
            self.sink.redraw(&groups);
        }

        self.emit(FeedEvent::TickApplied { timestamp });
    }

    fn handle_command(&mut self, cmd: FeedCommand) {
        match cmd {
            FeedCommand::Pause => {
                if self.state == LoopState::Polling {
                    self.set_state(LoopState::Paused);
                }
            }
            FeedCommand::Resume => {
                if self.state == LoopState::Paused {
                    self.set_state(LoopState::Polling);
                    self.force_tick = true;
                }
            }
            FeedCommand::Reload => {
                tracing::info!("Reload requested");
                self.initialize();
            }
            FeedCommand::SetToken(token) => {
                self.source.set_token(token);
                if self.state == LoopState::NeedsAuth {
                    if self.catalog.is_none() {
                        self.initialize();
                    } else {
                        self.set_state(LoopState::Polling);
                        self.force_tick = true;
                    }
                }
            }
            FeedCommand::LoadHistory(range) => {
                self.handle_load_history(range);
            }
            FeedCommand::Export {
                range,
                variables,
                dest,
            } => {
                self.handle_export(range, variables, dest);
            }
            FeedCommand::Shutdown => {
                self.running = false;
            }
        }
    }

    /// Build a historical chart snapshot for the historical page.
    ///
    /// Grouping follows the same plan builder as the live view, just
    /// filtered on the historical tag, so chart composition matches the
    /// schema on both pages. Snapshots are one-shot and range-scoped; the
    /// windowing store is not involved.
    fn handle_load_history(&mut self, range: HistoryRange) {
        let Some(catalog) = self.catalog.clone() else {
            tracing::warn!("History requested before the schema loaded, ignoring");
            return;
        };

        let records = match self.source.fetch_history(&range) {
            Ok(records) => records,
            Err(e) if e.is_auth() => {
                self.set_state(LoopState::NeedsAuth);
                return;
            }
            Err(e) => {
                tracing::warn!("History fetch failed: {}", e);
                self.emit(FeedEvent::FetchError(e.to_string()));
                return;
            }
        };

        let plan = WidgetPlan::build(&catalog, &ViewTag::Historical, &self.config.buckets);
        let mut groups: Vec<crate::feed::HistoryGroup> = plan
            .groups
            .iter()
            .map(|g| crate::feed::HistoryGroup {
                key: g.key.clone(),
                axis_title: g.axis_title(),
                series: g
                    .slots
                    .iter()
                    .map(|s| crate::feed::HistorySeries {
                        register: s.register.clone(),
                        label: s.label.clone(),
                        color: s.color.clone(),
                        points: Vec::new(),
                    })
                    .collect(),
            })
            .collect();

        for record in &records {
            let Some(timestamp) = record.parsed_timestamp() else {
                continue;
            };
            for group in &mut groups {
                for series in &mut group.series {
                    if let Some(value) = record.values.get(&series.register) {
                        let scale = catalog
                            .get(&series.register)
                            .map_or(1.0, |r| r.scale_or_default());
                        series.points.push(SeriesPoint {
                            x: timestamp,
                            y: decode::numeric_value(Some(value)).map(|v| v * scale),
                        });
                    }
                }
            }
        }
        for group in &mut groups {
            for series in &mut group.series {
                series.points.sort_by_key(|p| p.x);
            }
        }

        tracing::debug!(
            "History snapshot for '{}': {} groups from {} records",
            range,
            groups.len(),
            records.len()
        );
        self.emit(FeedEvent::HistoryLoaded {
            range: range.to_string(),
            groups,
        });
    }

    fn handle_export(
        &mut self,
        range: HistoryRange,
        variables: Option<Vec<String>>,
        dest: PathBuf,
    ) {
        let result = self
            .source
            .export_csv(&range, variables.as_deref())
            .and_then(|bytes| std::fs::write(&dest, bytes).map_err(DashError::Io));

        match result {
            Ok(()) => {
                tracing::info!("Exported CSV to {:?}", dest);
                self.emit(FeedEvent::ExportFinished { dest, error: None });
            }
            Err(e) => {
                tracing::warn!("CSV export failed: {}", e);
                self.emit(FeedEvent::ExportFinished {
                    dest,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    fn wait_budget(&self) -> Duration {
        if self.state == LoopState::Polling {
            if self.force_tick {
                Duration::ZERO
            } else {
                self.config
                    .poll_interval
                    .saturating_sub(self.last_tick.elapsed())
            }
        } else {
            IDLE_WAIT
        }
    }

    fn tick_due(&self) -> bool {
        self.state == LoopState::Polling
            && (self.force_tick || self.last_tick.elapsed() >= self.config.poll_interval)
    }

    fn set_state(&mut self, state: LoopState) {
        if self.state != state {
            tracing::info!("Feed state: {} -> {}", self.state, state);
            self.state = state;
            self.emit(FeedEvent::State(state));
        }
    }

    /// Send an event without blocking; a full queue drops the event
    fn emit(&mut self, event: FeedEvent) {
        if self.event_tx.try_send(event).is_err() {
            self.dropped_events += 1;
            tracing::trace!("Event queue full, {} dropped so far", self.dropped_events);
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn plan(&self) -> &WidgetPlan {
        &self.plan
    }

    pub fn store(&self) -> &WindowStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::feed::source::{HistoryRecord, LiveSample};
    use crate::feed::MockSource;
    use crate::render::{MockRenderSink, NullSink, RenderSink};
    use chrono::TimeZone;
    use crossbeam_channel::unbounded;
    use std::sync::Mutex;

    fn anchored_source() -> MockSource {
        MockSource::anchored(Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap())
    }

    fn worker_with(
        source: Box<dyn DataSource>,
        sink: Box<dyn RenderSink>,
    ) -> (FeedWorker, Receiver<FeedEvent>) {
        let (_cmd_tx, cmd_rx) = unbounded();
        let (event_tx, event_rx) = crossbeam_channel::bounded(256);
        let worker = FeedWorker::new(FeedConfig::default(), source, sink, cmd_rx, event_tx);
        (worker, event_rx)
    }

    fn drain(rx: &Receiver<FeedEvent>) -> Vec<FeedEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Source whose schema fetch always fails with a transient error
    struct BrokenSource;

    impl DataSource for BrokenSource {
        fn fetch_schema(&mut self) -> Result<serde_json::Value> {
            Err(DashError::Fetch("connection refused".to_string()))
        }
        fn fetch_live(&mut self) -> Result<LiveSample> {
            Err(DashError::Fetch("connection refused".to_string()))
        }
        fn fetch_history(&mut self, _: &HistoryRange) -> Result<Vec<HistoryRecord>> {
            Err(DashError::Fetch("connection refused".to_string()))
        }
        fn export_csv(&mut self, _: &HistoryRange, _: Option<&[String]>) -> Result<Vec<u8>> {
            Err(DashError::Fetch("connection refused".to_string()))
        }
        fn set_token(&mut self, _: Option<String>) {}
    }

    #[test]
    fn test_initialize_reaches_polling_with_seeded_store() {
        let (mut worker, events) =
            worker_with(Box::new(anchored_source()), Box::new(NullSink));
        worker.initialize();

        assert_eq!(worker.state(), LoopState::Polling);
        assert!(worker.plan().slot_count() > 0);

        // Backfill seeded the chart registers, so animation is suppressed.
        assert!(worker.store().get("CL1_Voltage").is_some_and(|b| !b.is_empty()));
        assert!(!worker.plan().animate);

        let events = drain(&events);
        assert!(events
            .iter()
            .any(|e| matches!(e, FeedEvent::PlanReady { groups, .. } if *groups == 3)));
        assert!(events
            .iter()
            .any(|e| matches!(e, FeedEvent::State(LoopState::Polling))));
    }

    #[test]
    fn test_tick_appends_points_and_emits() {
        let (mut worker, events) =
            worker_with(Box::new(anchored_source()), Box::new(NullSink));
        worker.initialize();
        let before = worker.store().get("CL1_Voltage").unwrap().len();

        worker.tick();

        let after = worker.store().get("CL1_Voltage").unwrap().len();
        assert_eq!(after, before + 1);
        assert!(drain(&events)
            .iter()
            .any(|e| matches!(e, FeedEvent::TickApplied { .. })));
    }

    #[test]
    fn test_one_redraw_per_touched_surface() {
        let redraws: Arc<Mutex<Vec<Vec<GroupId>>>> = Arc::new(Mutex::new(Vec::new()));
        let log = redraws.clone();

        let mut sink = MockRenderSink::new();
        sink.expect_create_widgets().return_const(());
        sink.expect_set_series().return_const(());
        sink.expect_apply_gauge().return_const(());
        sink.expect_apply_scalar().return_const(());
        sink.expect_apply_status().return_const(());
        sink.expect_apply_bitmask().return_const(());
        sink.expect_apply_indicator().return_const(());
        sink.expect_redraw()
            .returning(move |groups| log.lock().unwrap().push(groups.to_vec()));

        let (mut worker, _events) = worker_with(Box::new(anchored_source()), Box::new(sink));
        worker.initialize();
        worker.tick();

        let calls = redraws.lock().unwrap();
        // One flush for the seed, one for the tick, not one per register.
        assert_eq!(calls.len(), 2);
        // The mock schema has three chart groups, all touched on tick 1.
        assert_eq!(calls[1].len(), 3);
    }

    #[test]
    fn test_auth_challenge_blocks_then_token_recovers() {
        let source = anchored_source().with_auth_required();
        let (mut worker, events) = worker_with(Box::new(source), Box::new(NullSink));

        worker.initialize();
        assert_eq!(worker.state(), LoopState::NeedsAuth);
        assert!(worker.plan().slot_count() == 0);

        worker.handle_command(FeedCommand::SetToken(Some("token".to_string())));
        assert_eq!(worker.state(), LoopState::Polling);
        assert!(worker.plan().slot_count() > 0);

        let events = drain(&events);
        assert!(events
            .iter()
            .any(|e| matches!(e, FeedEvent::State(LoopState::NeedsAuth))));
    }

    #[test]
    fn test_schema_failure_is_terminal_until_reload() {
        let (mut worker, events) = worker_with(Box::new(BrokenSource), Box::new(NullSink));
        worker.initialize();

        assert_eq!(worker.state(), LoopState::Failed);
        assert!(drain(&events)
            .iter()
            .any(|e| matches!(e, FeedEvent::Fatal(_))));

        // Reload retries and fails again against the same broken source.
        worker.handle_command(FeedCommand::Reload);
        assert_eq!(worker.state(), LoopState::Failed);
    }

    #[test]
    fn test_pause_suspends_and_resume_forces_tick() {
        let (mut worker, _events) =
            worker_with(Box::new(anchored_source()), Box::new(NullSink));
        worker.initialize();

        worker.handle_command(FeedCommand::Pause);
        assert_eq!(worker.state(), LoopState::Paused);
        assert!(!worker.tick_due());

        // Buffers survive the pause.
        assert!(!worker.store().is_empty());

        worker.handle_command(FeedCommand::Resume);
        assert_eq!(worker.state(), LoopState::Polling);
        assert!(worker.tick_due());
    }

    #[test]
    fn test_fetch_error_skips_tick_but_keeps_polling() {
        let (mut worker, events) =
            worker_with(Box::new(anchored_source()), Box::new(NullSink));
        worker.initialize();
        drain(&events);

        // Swap in a broken source mid-flight to fail exactly one tick.
        worker.source = Box::new(BrokenSource);
        worker.tick();

        assert_eq!(worker.state(), LoopState::Polling);
        assert!(drain(&events)
            .iter()
            .any(|e| matches!(e, FeedEvent::FetchError(_))));
    }

    #[test]
    fn test_load_history_snapshot_is_grouped_and_sorted() {
        let (mut worker, events) =
            worker_with(Box::new(anchored_source()), Box::new(NullSink));
        worker.initialize();
        drain(&events);

        worker.handle_command(FeedCommand::LoadHistory(HistoryRange::Minutes(5)));

        let snapshot = drain(&events)
            .into_iter()
            .find_map(|e| match e {
                FeedEvent::HistoryLoaded { range, groups } => Some((range, groups)),
                _ => None,
            })
            .expect("history event");

        let (range, groups) = snapshot;
        assert_eq!(range, "5m");
        // The mock schema declares three historical chart groups.
        assert_eq!(groups.len(), 3);
        for group in &groups {
            for series in &group.series {
                assert!(!series.points.is_empty());
                assert!(series.points.windows(2).all(|w| w[0].x <= w[1].x));
            }
        }
    }

    #[test]
    fn test_load_history_before_schema_is_ignored() {
        let (mut worker, events) =
            worker_with(Box::new(anchored_source()), Box::new(NullSink));
        worker.handle_command(FeedCommand::LoadHistory(HistoryRange::Hours(1)));
        assert!(!drain(&events)
            .iter()
            .any(|e| matches!(e, FeedEvent::HistoryLoaded { .. })));
    }

    #[test]
    fn test_export_writes_destination_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("telemetry.csv");

        let (mut worker, events) =
            worker_with(Box::new(anchored_source()), Box::new(NullSink));
        worker.handle_command(FeedCommand::Export {
            range: HistoryRange::Minutes(1),
            variables: Some(vec!["SOC1".to_string()]),
            dest: dest.clone(),
        });

        assert!(dest.exists());
        let finished = drain(&events)
            .into_iter()
            .find_map(|e| match e {
                FeedEvent::ExportFinished { error, .. } => Some(error),
                _ => None,
            })
            .expect("export event");
        assert!(finished.is_none());
    }
}
