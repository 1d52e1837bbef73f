//! Widget registry: maps schema registers to rendering targets
//!
//! [`WidgetPlan::build`] walks the catalog once, in declaration order, and
//! materializes a target for every (register, component-kind) pair:
//!
//! - chart kinds land in the chart group keyed by the register's `group`
//!   field; a group's surface is created lazily on the first member
//!   encountered, and the register takes the next dataset slot in it. Both
//!   the group handle ([`GroupId`], an arena index) and the slot index are
//!   stable for the session, so per-tick routing looks targets up by
//!   register name instead of re-deriving identity from strings.
//! - card kinds (gauge, scalar, status, bitmask, indicator) each get one
//!   DOM-like target keyed by register name, partitioned into a display
//!   bucket by an injectable classification table ([`BucketRules`]). The
//!   bucket heuristic is presentation convenience, not domain logic; the
//!   default table reproduces the cluster layout of the shipped dashboard
//!   and can be replaced wholesale from configuration.
//!
//! The plan owns no chart or DOM objects, only the association. A render
//! sink that cannot materialize one target logs and skips it without
//! affecting the others.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::schema::{Catalog, ComponentKind, RegisterDef, ViewTag};

/// Group name for chart registers that do not declare one
pub const DEFAULT_CHART_GROUP: &str = "Uncategorized Charts";

/// Y-axis unit used when no group member declares one
pub const DEFAULT_GROUP_UNIT: &str = "Value";

/// Stable handle to a chart group surface (index into the plan's arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub usize);

/// One dataset slot inside a chart group
#[derive(Debug, Clone)]
pub struct SlotSpec {
    pub register: String,
    pub label: String,
    pub color: Option<String>,
    /// Marker size for this dataset; recomputed once after backfill
    /// seeding via [`point_radius_for`], constant afterwards
    pub point_radius: f32,
}

/// A named collection of datasets sharing one surface and time axis
#[derive(Debug, Clone)]
pub struct ChartGroup {
    /// Group key from the schema (also the surface title)
    pub key: String,
    /// Y-axis unit, taken from the first member register
    pub unit: String,
    /// Dataset slots; index is stable for the session
    pub slots: Vec<SlotSpec>,
}

impl ChartGroup {
    pub fn axis_title(&self) -> String {
        format!("{} ({})", self.key, self.unit)
    }
}

/// One card-style widget bound to a register
#[derive(Debug, Clone)]
pub struct CardSpec {
    pub register: String,
    pub label: String,
    /// Index into [`WidgetPlan::buckets`]
    pub bucket: usize,
}

/// Identity binding from a register to one rendering location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetTarget {
    ChartSlot { group: GroupId, slot: usize },
    Gauge { bucket: usize },
    Scalar { bucket: usize },
    StatusPanel { bucket: usize },
    BitmaskPanel { bucket: usize },
    Indicator { bucket: usize },
}

/// One classification rule: register name prefix or group substring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketRule {
    /// Bucket label cards matching this rule land in
    pub bucket: String,
    /// Register-name prefixes that match
    #[serde(default)]
    pub name_prefixes: Vec<String>,
    /// Substrings matched against the register's group
    #[serde(default)]
    pub group_contains: Vec<String>,
}

/// Injectable display-bucket classification table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketRules {
    pub rules: Vec<BucketRule>,
    pub default_bucket: String,
}

impl Default for BucketRules {
    fn default() -> Self {
        Self {
            rules: vec![
                BucketRule {
                    bucket: "Cluster 1".to_string(),
                    name_prefixes: vec!["SOC1".to_string(), "CL1".to_string()],
                    group_contains: vec!["Cluster 1".to_string()],
                },
                BucketRule {
                    bucket: "Cluster 2".to_string(),
                    name_prefixes: vec!["SOC2".to_string(), "CL2".to_string()],
                    group_contains: vec!["Cluster 2".to_string()],
                },
            ],
            default_bucket: "System".to_string(),
        }
    }
}

impl BucketRules {
    /// Bucket label for a register; first matching rule wins
    pub fn classify(&self, def: &RegisterDef) -> &str {
        for rule in &self.rules {
            if rule
                .name_prefixes
                .iter()
                .any(|p| def.name.starts_with(p.as_str()))
            {
                return &rule.bucket;
            }
            if let Some(group) = def.group.as_deref() {
                if rule.group_contains.iter().any(|s| group.contains(s.as_str())) {
                    return &rule.bucket;
                }
            }
        }
        &self.default_bucket
    }
}

/// Marker size for a dataset given how densely it was backfilled.
///
/// Sparse series keep visible markers; densely backfilled series shrink
/// them so the seed does not render as a bead chain. Live-only series use
/// the 1.5 default.
pub fn point_radius_for(seeded_len: usize, max_points: usize) -> f32 {
    if seeded_len == 0 {
        1.5
    } else if seeded_len < 20 {
        2.0
    } else if seeded_len < max_points / 2 {
        1.0
    } else {
        0.5
    }
}

/// The complete widget layout for one view, built once per schema load
#[derive(Debug, Clone, Default)]
pub struct WidgetPlan {
    /// Chart group arena; [`GroupId`] indexes into this
    pub groups: Vec<ChartGroup>,
    /// Display bucket labels, rule order then the default bucket
    pub buckets: Vec<String>,
    pub gauges: Vec<CardSpec>,
    pub scalars: Vec<CardSpec>,
    pub status_panels: Vec<CardSpec>,
    pub bitmask_panels: Vec<CardSpec>,
    pub indicators: Vec<CardSpec>,
    /// Whether the renderer may animate the initial draw; cleared when any
    /// series starts pre-seeded to avoid an animation storm on load
    pub animate: bool,
    targets: HashMap<String, Vec<WidgetTarget>>,
}

impl WidgetPlan {
    /// Build the plan for a view from the catalog, in declaration order
    pub fn build(catalog: &Catalog, view: &ViewTag, rules: &BucketRules) -> Self {
        let mut plan = WidgetPlan {
            animate: true,
            ..Default::default()
        };

        plan.buckets = rules.rules.iter().map(|r| r.bucket.clone()).collect();
        plan.buckets.push(rules.default_bucket.clone());

        let mut group_ids: HashMap<String, GroupId> = HashMap::new();

        for reg in catalog.view_registers(view) {
            let bucket = plan
                .buckets
                .iter()
                .position(|b| b == rules.classify(reg))
                .unwrap_or(plan.buckets.len() - 1);

            for component in &reg.ui.component {
                match component {
                    ComponentKind::LineChart => {
                        let key = reg
                            .group
                            .clone()
                            .unwrap_or_else(|| DEFAULT_CHART_GROUP.to_string());
                        let group = *group_ids.entry(key.clone()).or_insert_with(|| {
                            plan.groups.push(ChartGroup {
                                key,
                                unit: if reg.unit.is_empty() {
                                    DEFAULT_GROUP_UNIT.to_string()
                                } else {
                                    reg.unit.clone()
                                },
                                slots: Vec::new(),
                            });
                            GroupId(plan.groups.len() - 1)
                        });
                        let slot = plan.groups[group.0].slots.len();
                        plan.groups[group.0].slots.push(SlotSpec {
                            register: reg.name.clone(),
                            label: reg.label().to_string(),
                            color: reg.ui.color.clone(),
                            point_radius: point_radius_for(0, usize::MAX),
                        });
                        plan.bind(reg, WidgetTarget::ChartSlot { group, slot });
                    }
                    ComponentKind::SocMeter => {
                        plan.gauges.push(Self::card(reg, bucket));
                        plan.bind(reg, WidgetTarget::Gauge { bucket });
                    }
                    ComponentKind::DisplayValue => {
                        plan.scalars.push(Self::card(reg, bucket));
                        plan.bind(reg, WidgetTarget::Scalar { bucket });
                    }
                    ComponentKind::StatusDisplay => {
                        plan.status_panels.push(Self::card(reg, bucket));
                        plan.bind(reg, WidgetTarget::StatusPanel { bucket });
                    }
                    ComponentKind::BitmaskDisplay => {
                        plan.bitmask_panels.push(Self::card(reg, bucket));
                        plan.bind(reg, WidgetTarget::BitmaskPanel { bucket });
                    }
                    ComponentKind::StatusIndicator => {
                        plan.indicators.push(Self::card(reg, bucket));
                        plan.bind(reg, WidgetTarget::Indicator { bucket });
                    }
                    ComponentKind::Other(name) => {
                        tracing::warn!(
                            "Register '{}' declares unknown component '{}', skipping",
                            reg.name,
                            name
                        );
                    }
                }
            }
        }

        tracing::debug!(
            "Built widget plan: {} chart groups, {} datasets, {} cards",
            plan.groups.len(),
            plan.slot_count(),
            plan.card_count()
        );
        plan
    }

    fn card(reg: &RegisterDef, bucket: usize) -> CardSpec {
        CardSpec {
            register: reg.name.clone(),
            label: reg.label().to_string(),
            bucket,
        }
    }

    fn bind(&mut self, reg: &RegisterDef, target: WidgetTarget) {
        self.targets
            .entry(reg.name.clone())
            .or_default()
            .push(target);
    }

    /// All rendering targets bound to a register name; empty for names the
    /// schema does not declare (such samples are ignored, not errors)
    pub fn targets_for(&self, name: &str) -> &[WidgetTarget] {
        self.targets.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn group(&self, id: GroupId) -> Option<&ChartGroup> {
        self.groups.get(id.0)
    }

    /// Total dataset slots across all groups
    pub fn slot_count(&self) -> usize {
        self.groups.iter().map(|g| g.slots.len()).sum()
    }

    /// Total card-style widgets
    pub fn card_count(&self) -> usize {
        self.gauges.len()
            + self.scalars.len()
            + self.status_panels.len()
            + self.bitmask_panels.len()
            + self.indicators.len()
    }
}
