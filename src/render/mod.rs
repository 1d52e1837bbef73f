//! Renderer adapter: the seam between the engine and the display layer
//!
//! The feed worker never talks to chart or DOM-like objects directly; it
//! drives a [`RenderSink`]. The egui frontend provides the production
//! implementation, [`NullSink`] serves headless runs, and tests install
//! recording/mock sinks. Dispatch is polymorphic via vtable, the same
//! pattern the probe seam uses for real-versus-mock data sources.
//!
//! Contract notes:
//!
//! - `create_widgets` is called once per schema load, before any data.
//! - `set_series` replaces one dataset's points; it is a data update, not
//!   a redraw. The worker batches: within a tick every register is decoded
//!   and routed first, then `redraw` fires exactly once per touched chart
//!   surface.
//! - `apply_*` calls address card widgets by register name. A sink that
//!   cannot locate a target must log and skip it; one broken widget never
//!   blocks the rest.

use crate::decode::{BitReading, GaugeReading, ScalarReading, StatusReading};
use crate::registry::{GroupId, WidgetPlan};
use crate::store::SeriesPoint;

/// Sink for widget creation and per-tick display updates
#[cfg_attr(test, mockall::automock)]
pub trait RenderSink: Send {
    /// Materialize every widget the plan names (chart groups first, then
    /// cards). Replaces any previously created widgets.
    fn create_widgets(&mut self, plan: &WidgetPlan);

    /// Replace the points of one chart dataset
    fn set_series(
        &mut self,
        group: GroupId,
        slot: usize,
        points: Vec<SeriesPoint>,
        point_radius: f32,
    );

    /// Update a SOC meter
    fn apply_gauge(&mut self, register: &str, reading: GaugeReading);

    /// Update a scalar value card
    fn apply_scalar(&mut self, register: &str, reading: ScalarReading);

    /// Update a status card
    fn apply_status(&mut self, register: &str, reading: StatusReading);

    /// Update a bitmask panel; `None` means data unavailable this tick
    fn apply_bitmask(&mut self, register: &str, rows: Option<Vec<BitReading>>);

    /// Update a raw-value indicator card
    fn apply_indicator(&mut self, register: &str, text: String);

    /// Flush the surfaces touched this tick; one call per tick
    fn redraw(&mut self, groups: &[GroupId]);
}

/// Sink that discards everything; used for headless operation
#[derive(Debug, Default)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn create_widgets(&mut self, plan: &WidgetPlan) {
        tracing::trace!(
            "NullSink: plan with {} groups / {} cards",
            plan.groups.len(),
            plan.card_count()
        );
    }

    fn set_series(&mut self, _: GroupId, _: usize, _: Vec<SeriesPoint>, _: f32) {}
    fn apply_gauge(&mut self, _: &str, _: GaugeReading) {}
    fn apply_scalar(&mut self, _: &str, _: ScalarReading) {}
    fn apply_status(&mut self, _: &str, _: StatusReading) {}
    fn apply_bitmask(&mut self, _: &str, _: Option<Vec<BitReading>>) {}
    fn apply_indicator(&mut self, _: &str, _: String) {}
    fn redraw(&mut self, _: &[GroupId]) {}
}
