//! Pure decoders turning raw sample values into widget-ready readings
//!
//! Three encodings share the raw value stream: scaled numerics, enumerated
//! status codes, and per-bit flag words. Dispatch is by the register's
//! component kind; every decoder takes the raw wire value (a loosely typed
//! [`serde_json::Value`]) plus the register definition and produces a
//! display reading. Decoders are total: missing, null, or malformed input
//! resolves to an "N/A"/"Unknown" sentinel, never an error. A blank card
//! or a chart gap beats tearing down the dashboard.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::schema::{BitLabel, RegisterDef, StatusEntry};

/// Sentinel shown when a numeric value is absent or malformed
pub const UNAVAILABLE: &str = "N/A";

/// Sentinel shown for unmapped or non-numeric status codes
pub const UNKNOWN_STATUS: &str = "Unknown";

/// Scalar card reading: formatted number (or sentinel) plus unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarReading {
    pub text: String,
    pub unit: String,
}

impl ScalarReading {
    pub fn is_available(&self) -> bool {
        self.text != UNAVAILABLE
    }
}

/// Gauge (SOC meter) reading: clamped percentage plus display text
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeReading {
    /// Meter fill in 0..=100; `None` renders an empty meter
    pub percent: Option<f64>,
    /// e.g. `"42.5%"`, or the unavailable sentinel
    pub text: String,
}

/// Status card reading: mapped text and color
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReading {
    pub text: String,
    pub color: Option<String>,
    /// False for unmapped codes and non-numeric input
    pub known: bool,
}

/// One decoded bit row of a bitmask panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitReading {
    pub bit: u32,
    pub label: String,
    pub state: String,
    pub set: bool,
}

/// Extract a number from a wire value; numeric strings are tolerated.
/// Nulls, non-numeric strings and structured values yield `None`.
pub fn numeric_value(raw: Option<&Value>) -> Option<f64> {
    match raw? {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Decimal places for a register's scalar display.
///
/// Explicit `ui.decimals` wins; otherwise the count of fractional digits in
/// the declared scale (e.g. 0.1 -> 1), else 2. A precision floor raises the
/// result for very small scales so quantities like 0.0042 do not collapse
/// to "0.00": scale < 0.01 forces at least 4 decimals, scale < 0.001 at
/// least 5.
pub fn decimals_for(def: &RegisterDef) -> u32 {
    let scale = def.scale_or_default();

    let mut decimals = def.ui.decimals.unwrap_or_else(|| {
        let text = format!("{}", scale);
        match text.split_once('.') {
            Some((_, frac)) => frac.len() as u32,
            None => 2,
        }
    });

    if scale < 0.01 && decimals < 4 {
        decimals = 4;
    }
    if scale < 0.001 && decimals < 5 {
        decimals = 5;
    }
    decimals
}

/// Decode a raw value for a scalar display card.
///
/// `scale_override` exists because the live endpoint delivers pre-scaled
/// values (pass `Some(1.0)`) while backfill records carry raw counts that
/// still need `def.scale` applied; display precision derives from
/// `def.scale` either way.
pub fn decode_scalar(
    raw: Option<&Value>,
    def: &RegisterDef,
    scale_override: Option<f64>,
) -> ScalarReading {
    let unit = def.unit.clone();
    match numeric_value(raw) {
        Some(v) => {
            let scale = scale_override.unwrap_or_else(|| def.scale_or_default());
            let decimals = decimals_for(def) as usize;
            ScalarReading {
                text: format!("{:.*}", decimals, v * scale),
                unit,
            }
        }
        None => ScalarReading {
            text: UNAVAILABLE.to_string(),
            unit,
        },
    }
}

/// Decode a raw value for a SOC meter.
///
/// The meter fill is clamped to 0..=100; the text shows one decimal with
/// the register unit, defaulting to `%` when the schema leaves it empty.
pub fn decode_gauge(raw: Option<&Value>, def: &RegisterDef) -> GaugeReading {
    let unit = if def.unit.is_empty() { "%" } else { &def.unit };
    match numeric_value(raw) {
        Some(v) => GaugeReading {
            percent: Some(v.clamp(0.0, 100.0)),
            text: format!("{:.1}{}", v, unit),
        },
        None => GaugeReading {
            percent: None,
            text: UNAVAILABLE.to_string(),
        },
    }
}

/// Normalize a raw status code to its mapping key.
///
/// Integer-valued numbers map to their integer string form so `3.0` and
/// `3` hit the same entry; non-numeric strings are used verbatim.
fn status_key(raw: Option<&Value>) -> Option<String> {
    match raw? {
        Value::Number(n) => {
            let v = n.as_f64()?;
            if v.is_finite() && v.fract() == 0.0 {
                Some(format!("{}", v as i64))
            } else {
                Some(format!("{}", v))
            }
        }
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() && v.fract() == 0.0 => Some(format!("{}", v as i64)),
            _ => Some(s.clone()),
        },
        _ => None,
    }
}

/// Decode an enumerated status code via its code -> text/color mapping
pub fn decode_status(
    raw: Option<&Value>,
    mapping: &BTreeMap<String, StatusEntry>,
) -> StatusReading {
    let unknown = StatusReading {
        text: UNKNOWN_STATUS.to_string(),
        color: None,
        known: false,
    };

    let Some(key) = status_key(raw) else {
        return unknown;
    };
    match mapping.get(&key) {
        Some(entry) => StatusReading {
            text: entry
                .text
                .clone()
                .unwrap_or_else(|| UNKNOWN_STATUS.to_string()),
            color: entry.color.clone(),
            known: true,
        },
        None => unknown,
    }
}

/// Decode a flag word via its bit -> label mapping.
///
/// Returns one row per declared bit position in ascending order, or `None`
/// when the raw value is absent or non-numeric (the panel renders a single
/// "data unavailable" message in that case, keeping the widget alive).
pub fn decode_bitmask(
    raw: Option<&Value>,
    mapping: &BTreeMap<String, BitLabel>,
) -> Option<Vec<BitReading>> {
    let word = numeric_value(raw)? as i64;

    let mut positions: Vec<(u32, &BitLabel)> = mapping
        .iter()
        .filter_map(|(pos, label)| match pos.parse::<u32>() {
            Ok(p) if p < 64 => Some((p, label)),
            _ => {
                tracing::warn!("Ignoring non-numeric bit position '{}'", pos);
                None
            }
        })
        .collect();
    positions.sort_by_key(|(p, _)| *p);

    let rows = positions
        .into_iter()
        .map(|(bit, label)| {
            let set = (word >> bit) & 1 == 1;
            let state_key = if set { "1" } else { "0" };
            match label {
                BitLabel::Label(text) => BitReading {
                    bit,
                    label: text.clone(),
                    state: if set { "ON" } else { "OFF" }.to_string(),
                    set,
                },
                BitLabel::States(states) => BitReading {
                    bit,
                    label: format!("Bit {}", bit),
                    state: states
                        .get(state_key)
                        .cloned()
                        .unwrap_or_else(|| format!("Undefined state ({})", state_key)),
                    set,
                },
            }
        })
        .collect();

    Some(rows)
}

/// Raw passthrough for status indicator cards: value and unit, no scaling
pub fn decode_indicator(raw: Option<&Value>, def: &RegisterDef) -> String {
    let text = match raw {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => UNAVAILABLE.to_string(),
    };
    if def.unit.is_empty() {
        text
    } else {
        format!("{} {}", text, def.unit)
    }
}
