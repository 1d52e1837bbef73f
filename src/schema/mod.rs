//! Register schema model
//!
//! The backend describes every measurement it publishes with a register
//! definition document. This module parses and validates that document into
//! a typed [`Catalog`] that the rest of the application treats as immutable
//! for the session.
//!
//! # Normalization
//!
//! The source schema is loosely typed in two places: `ui.view` and
//! `ui.component` may each be a single string or an array of strings.
//! Both are normalized once at load time into `Vec`-backed sets so all
//! downstream logic sees a single shape. Unknown view/component strings
//! are preserved as `Other(..)` variants and skipped (with a warning) when
//! widgets are built, so newer backends do not break older dashboards.
//!
//! # Ordering
//!
//! Declaration order is significant: it determines widget creation order
//! and, for chart groups, dataset slot assignment. [`Catalog`] preserves it
//! and all filter accessors iterate in it.

use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashMap};

use crate::error::{DashError, Result};

/// Which dashboard views a register participates in
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewTag {
    /// Live dashboard (1 s polling)
    Live,
    /// Historical charts page
    Historical,
    /// Unrecognized view tag, preserved verbatim
    Other(String),
}

impl From<String> for ViewTag {
    fn from(s: String) -> Self {
        match s.as_str() {
            "live" => ViewTag::Live,
            "historical" => ViewTag::Historical,
            _ => ViewTag::Other(s),
        }
    }
}

impl std::fmt::Display for ViewTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewTag::Live => write!(f, "live"),
            ViewTag::Historical => write!(f, "historical"),
            ViewTag::Other(s) => write!(f, "{}", s),
        }
    }
}

impl<'de> Deserialize<'de> for ViewTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(ViewTag::from(String::deserialize(deserializer)?))
    }
}

/// Widget kind a register is rendered as
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Time-series dataset in a grouped chart surface
    LineChart,
    /// State-of-charge donut meter
    SocMeter,
    /// Scalar value card (scaled numeric + unit)
    DisplayValue,
    /// Enumerated status card (code -> text/color)
    StatusDisplay,
    /// Per-bit flag panel
    BitmaskDisplay,
    /// Raw value passthrough card
    StatusIndicator,
    /// Unrecognized component, preserved verbatim
    Other(String),
}

impl From<String> for ComponentKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "line_chart" => ComponentKind::LineChart,
            "soc_meter" => ComponentKind::SocMeter,
            "display_value" => ComponentKind::DisplayValue,
            "status_display" => ComponentKind::StatusDisplay,
            "bitmask_display" => ComponentKind::BitmaskDisplay,
            "status_indicator" => ComponentKind::StatusIndicator,
            _ => ComponentKind::Other(s),
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentKind::LineChart => write!(f, "line_chart"),
            ComponentKind::SocMeter => write!(f, "soc_meter"),
            ComponentKind::DisplayValue => write!(f, "display_value"),
            ComponentKind::StatusDisplay => write!(f, "status_display"),
            ComponentKind::BitmaskDisplay => write!(f, "bitmask_display"),
            ComponentKind::StatusIndicator => write!(f, "status_indicator"),
            ComponentKind::Other(s) => write!(f, "{}", s),
        }
    }
}

impl<'de> Deserialize<'de> for ComponentKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(ComponentKind::from(String::deserialize(deserializer)?))
    }
}

/// Accepts `"x"` or `["x", "y"]` and always yields a `Vec`
fn one_or_many<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        One(T),
        Many(Vec<T>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(v) => vec![v],
        OneOrMany::Many(vs) => vs,
    })
}

/// Entry in a status code mapping: code -> text/color
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusEntry {
    pub text: Option<String>,
    pub color: Option<String>,
}

/// Label configuration for one bit position.
///
/// The schema carries two shapes for historical reasons: the legacy form is
/// a bare descriptive string (rendered as that label plus ON/OFF), the
/// newer form maps bit state `"0"`/`"1"` to the text for that state.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BitLabel {
    /// Legacy shape: one descriptive label, value rendered as ON/OFF
    Label(String),
    /// State map shape: `{"0": "text when clear", "1": "text when set"}`
    States(BTreeMap<String, String>),
}

/// Presentation metadata for a register
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UiSpec {
    /// Views this register appears in (normalized from string-or-array)
    #[serde(default, deserialize_with = "one_or_many")]
    pub view: Vec<ViewTag>,

    /// Widget kinds this register is rendered as (normalized likewise)
    #[serde(default, deserialize_with = "one_or_many")]
    pub component: Vec<ComponentKind>,

    /// Display label; falls back to the register name
    pub label: Option<String>,

    /// CSS-style color for chart datasets (`#rrggbb` or `rgba(..)`)
    pub color: Option<String>,

    /// Decimal places for scalar display; inferred from `scale` if absent
    pub decimals: Option<u32>,

    /// Status code -> text/color mapping (status_display registers)
    #[serde(default)]
    pub status_mapping: BTreeMap<String, StatusEntry>,

    /// Bit position -> label mapping (bitmask_display registers)
    #[serde(default)]
    pub bit_mapping: BTreeMap<String, BitLabel>,
}

/// One named measurement defined by the schema
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterDef {
    /// Unique key; also the field name in live samples and history records
    pub name: String,

    /// Unit label for display (e.g. "V", "A", "%")
    #[serde(default)]
    pub unit: String,

    /// Multiplier applied to raw historical values; `None` means 1.0
    #[serde(default)]
    pub scale: Option<f64>,

    /// Chart group this register's dataset belongs to
    #[serde(default)]
    pub group: Option<String>,

    /// Presentation metadata
    #[serde(default)]
    pub ui: UiSpec,
}

impl RegisterDef {
    /// Display label: `ui.label` if present, otherwise the register name
    pub fn label(&self) -> &str {
        self.ui.label.as_deref().unwrap_or(&self.name)
    }

    /// Scale with the 1.0 default applied
    pub fn scale_or_default(&self) -> f64 {
        self.scale.unwrap_or(1.0)
    }

    /// Whether this register participates in the given view
    pub fn has_view(&self, tag: &ViewTag) -> bool {
        self.ui.view.contains(tag)
    }

    /// Whether this register declares the given widget kind
    pub fn has_component(&self, kind: &ComponentKind) -> bool {
        self.ui.component.contains(kind)
    }
}

/// Raw schema payload: either `{"registers": [...]}` or a bare array
#[derive(Deserialize)]
#[serde(untagged)]
enum SchemaPayload {
    Wrapped { registers: Vec<RegisterDef> },
    Bare(Vec<RegisterDef>),
}

/// Immutable register catalog for the session
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    registers: Vec<RegisterDef>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Parse and validate a raw schema document.
    ///
    /// Accepts both payload forms the backend serves. Fails with
    /// [`DashError::Schema`] on a payload that is neither, on a register
    /// without a name, and on duplicate names.
    pub fn load(raw: serde_json::Value) -> Result<Self> {
        let registers = match serde_json::from_value::<SchemaPayload>(raw) {
            Ok(SchemaPayload::Wrapped { registers }) => registers,
            Ok(SchemaPayload::Bare(registers)) => registers,
            Err(e) => {
                return Err(DashError::Schema(format!(
                    "payload is not a register list: {}",
                    e
                )))
            }
        };

        let mut index = HashMap::with_capacity(registers.len());
        for (i, reg) in registers.iter().enumerate() {
            if reg.name.is_empty() {
                return Err(DashError::Schema(format!("register {} has no name", i)));
            }
            if index.insert(reg.name.clone(), i).is_some() {
                return Err(DashError::Schema(format!(
                    "duplicate register name '{}'",
                    reg.name
                )));
            }
        }

        tracing::debug!("Loaded catalog with {} registers", registers.len());
        Ok(Self { registers, index })
    }

    /// All registers in declaration order
    pub fn registers(&self) -> &[RegisterDef] {
        &self.registers
    }

    /// Look up a register by name
    pub fn get(&self, name: &str) -> Option<&RegisterDef> {
        self.index.get(name).map(|&i| &self.registers[i])
    }

    /// Registers participating in a view, in declaration order
    pub fn view_registers(&self, view: &ViewTag) -> Vec<&RegisterDef> {
        self.registers.iter().filter(|r| r.has_view(view)).collect()
    }

    /// Registers matching both a view and a component kind, in declaration
    /// order. Order drives widget creation and chart slot assignment.
    pub fn registers_for(&self, view: &ViewTag, component: &ComponentKind) -> Vec<&RegisterDef> {
        self.registers
            .iter()
            .filter(|r| r.has_view(view) && r.has_component(component))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }
}
