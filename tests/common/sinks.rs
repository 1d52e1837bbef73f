//! Recording render sink for integration tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use flowdash::decode::{BitReading, GaugeReading, ScalarReading, StatusReading};
use flowdash::registry::GroupId;
use flowdash::render::RenderSink;
use flowdash::store::SeriesPoint;
use flowdash::WidgetPlan;

/// Everything a [`RecordingSink`] has observed
#[derive(Debug, Default)]
pub struct Recording {
    /// Group keys captured at each create_widgets call
    pub plans: Vec<Vec<String>>,
    /// Latest points per (group, slot)
    pub series: HashMap<(usize, usize), Vec<SeriesPoint>>,
    /// Every set_series call in order, as (group, slot)
    pub series_calls: Vec<(usize, usize)>,
    pub gauges: HashMap<String, GaugeReading>,
    pub scalars: HashMap<String, ScalarReading>,
    pub statuses: HashMap<String, StatusReading>,
    pub bitmasks: HashMap<String, Option<Vec<BitReading>>>,
    pub indicators: HashMap<String, String>,
    /// Every redraw call in order
    pub redraws: Vec<Vec<GroupId>>,
}

/// [`RenderSink`] that logs every call into a shared [`Recording`]
pub struct RecordingSink {
    recording: Arc<Mutex<Recording>>,
}

impl RecordingSink {
    /// Build a sink plus the shared recording to assert against
    pub fn new() -> (Self, Arc<Mutex<Recording>>) {
        let recording = Arc::new(Mutex::new(Recording::default()));
        (
            Self {
                recording: recording.clone(),
            },
            recording,
        )
    }
}

impl RenderSink for RecordingSink {
    fn create_widgets(&mut self, plan: &WidgetPlan) {
        let keys = plan.groups.iter().map(|g| g.key.clone()).collect();
        self.recording.lock().unwrap().plans.push(keys);
    }

    fn set_series(
        &mut self,
        group: GroupId,
        slot: usize,
        points: Vec<SeriesPoint>,
        _point_radius: f32,
    ) {
        let mut rec = self.recording.lock().unwrap();
        rec.series_calls.push((group.0, slot));
        rec.series.insert((group.0, slot), points);
    }

    fn apply_gauge(&mut self, register: &str, reading: GaugeReading) {
        self.recording
            .lock()
            .unwrap()
            .gauges
            .insert(register.to_string(), reading);
    }

    fn apply_scalar(&mut self, register: &str, reading: ScalarReading) {
        self.recording
            .lock()
            .unwrap()
            .scalars
            .insert(register.to_string(), reading);
    }

    fn apply_status(&mut self, register: &str, reading: StatusReading) {
        self.recording
            .lock()
            .unwrap()
            .statuses
            .insert(register.to_string(), reading);
    }

    fn apply_bitmask(&mut self, register: &str, rows: Option<Vec<BitReading>>) {
        self.recording
            .lock()
            .unwrap()
            .bitmasks
            .insert(register.to_string(), rows);
    }

    fn apply_indicator(&mut self, register: &str, text: String) {
        self.recording
            .lock()
            .unwrap()
            .indicators
            .insert(register.to_string(), text);
    }

    fn redraw(&mut self, groups: &[GroupId]) {
        self.recording
            .lock()
            .unwrap()
            .redraws
            .push(groups.to_vec());
    }
}
