//! Retained dashboard view model and the sink that feeds it
//!
//! egui is immediate mode, so the feed worker cannot hold chart objects
//! the way a retained toolkit would. [`DashboardView`] is the stand-in:
//! a plain data model of every widget and its latest reading, shared as
//! `Arc<Mutex<..>>` between [`EguiSink`] (written from the worker thread)
//! and the app (read once per frame). The sink is the only writer besides
//! widget creation, and each frame takes the lock exactly once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::decode::{BitReading, GaugeReading, ScalarReading, StatusReading};
use crate::registry::{GroupId, WidgetPlan};
use crate::render::RenderSink;
use crate::store::SeriesPoint;

/// One chart dataset as the renderer sees it
#[derive(Debug, Clone, Default)]
pub struct DatasetView {
    pub label: String,
    pub color: Option<String>,
    pub point_radius: f32,
    pub points: Vec<SeriesPoint>,
}

/// One chart surface
#[derive(Debug, Clone, Default)]
pub struct GroupView {
    pub key: String,
    pub axis_title: String,
    pub datasets: Vec<DatasetView>,
}

/// One card widget (gauge, scalar, status, bitmask or indicator)
#[derive(Debug, Clone)]
pub struct CardView {
    pub register: String,
    pub label: String,
    pub bucket: usize,
}

/// Everything the dashboard frame renders
#[derive(Debug, Default)]
pub struct DashboardView {
    pub groups: Vec<GroupView>,
    pub buckets: Vec<String>,
    pub gauges: Vec<CardView>,
    pub scalars: Vec<CardView>,
    pub status_panels: Vec<CardView>,
    pub bitmask_panels: Vec<CardView>,
    pub indicators: Vec<CardView>,

    pub gauge_values: HashMap<String, GaugeReading>,
    pub scalar_values: HashMap<String, ScalarReading>,
    pub status_values: HashMap<String, StatusReading>,
    /// `Some(None)` means the register reported unusable data this tick
    pub bitmask_values: HashMap<String, Option<Vec<BitReading>>>,
    pub indicator_values: HashMap<String, String>,

    /// Whether the initial draw may animate
    pub animate: bool,
    /// Bumped once per flushed tick; cheap change detection for the app
    pub revision: u64,
}

impl DashboardView {
    fn rebuild(&mut self, plan: &WidgetPlan) {
        *self = DashboardView {
            groups: plan
                .groups
                .iter()
                .map(|g| GroupView {
                    key: g.key.clone(),
                    axis_title: g.axis_title(),
                    datasets: g
                        .slots
                        .iter()
                        .map(|s| DatasetView {
                            label: s.label.clone(),
                            color: s.color.clone(),
                            point_radius: s.point_radius,
                            points: Vec::new(),
                        })
                        .collect(),
                })
                .collect(),
            buckets: plan.buckets.clone(),
            gauges: Self::cards(&plan.gauges),
            scalars: Self::cards(&plan.scalars),
            status_panels: Self::cards(&plan.status_panels),
            bitmask_panels: Self::cards(&plan.bitmask_panels),
            indicators: Self::cards(&plan.indicators),
            animate: plan.animate,
            ..Default::default()
        };
    }

    fn cards(specs: &[crate::registry::CardSpec]) -> Vec<CardView> {
        specs
            .iter()
            .map(|s| CardView {
                register: s.register.clone(),
                label: s.label.clone(),
                bucket: s.bucket,
            })
            .collect()
    }

    /// Cards of a kind belonging to one bucket
    pub fn cards_in_bucket<'a>(cards: &'a [CardView], bucket: usize) -> Vec<&'a CardView> {
        cards.iter().filter(|c| c.bucket == bucket).collect()
    }
}

/// [`RenderSink`] implementation writing into the shared view model
pub struct EguiSink {
    view: Arc<Mutex<DashboardView>>,
}

impl EguiSink {
    pub fn new(view: Arc<Mutex<DashboardView>>) -> Self {
        Self { view }
    }

    /// True when some card list contains the register
    fn has_card(cards: &[CardView], register: &str) -> bool {
        cards.iter().any(|c| c.register == register)
    }
}

impl RenderSink for EguiSink {
    fn create_widgets(&mut self, plan: &WidgetPlan) {
        self.view.lock().unwrap().rebuild(plan);
    }

    fn set_series(
        &mut self,
        group: GroupId,
        slot: usize,
        points: Vec<SeriesPoint>,
        point_radius: f32,
    ) {
        let mut view = self.view.lock().unwrap();
        match view
            .groups
            .get_mut(group.0)
            .and_then(|g| g.datasets.get_mut(slot))
        {
            Some(dataset) => {
                dataset.points = points;
                dataset.point_radius = point_radius;
            }
            None => {
                // One broken widget must not block the others.
                tracing::warn!(
                    "No dataset surface for group {:?} slot {}, skipping",
                    group,
                    slot
                );
            }
        }
    }

    fn apply_gauge(&mut self, register: &str, reading: GaugeReading) {
        let mut view = self.view.lock().unwrap();
        if !Self::has_card(&view.gauges, register) {
            tracing::warn!("No gauge widget for register '{}', skipping", register);
            return;
        }
        view.gauge_values.insert(register.to_string(), reading);
    }

    fn apply_scalar(&mut self, register: &str, reading: ScalarReading) {
        let mut view = self.view.lock().unwrap();
        if !Self::has_card(&view.scalars, register) {
            tracing::warn!("No scalar widget for register '{}', skipping", register);
            return;
        }
        view.scalar_values.insert(register.to_string(), reading);
    }

    fn apply_status(&mut self, register: &str, reading: StatusReading) {
        let mut view = self.view.lock().unwrap();
        if !Self::has_card(&view.status_panels, register) {
            tracing::warn!("No status widget for register '{}', skipping", register);
            return;
        }
        view.status_values.insert(register.to_string(), reading);
    }

    fn apply_bitmask(&mut self, register: &str, rows: Option<Vec<BitReading>>) {
        let mut view = self.view.lock().unwrap();
        if !Self::has_card(&view.bitmask_panels, register) {
            tracing::warn!("No bitmask widget for register '{}', skipping", register);
            return;
        }
        view.bitmask_values.insert(register.to_string(), rows);
    }

    fn apply_indicator(&mut self, register: &str, text: String) {
        let mut view = self.view.lock().unwrap();
        if !Self::has_card(&view.indicators, register) {
            tracing::warn!("No indicator widget for register '{}', skipping", register);
            return;
        }
        view.indicator_values.insert(register.to_string(), text);
    }

    fn redraw(&mut self, groups: &[GroupId]) {
        let mut view = self.view.lock().unwrap();
        view.revision += 1;
        tracing::trace!("Redraw of {} surfaces (rev {})", groups.len(), view.revision);
    }
}
