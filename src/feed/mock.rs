//! Synthetic data source for tests and offline demos
//!
//! [`MockSource`] serves a built-in two-cluster battery schema and
//! deterministic waveforms derived from a tick counter, so the full
//! dashboard runs without a backend (`flowdash --mock`) and integration
//! tests get reproducible samples. Auth behavior is scriptable to exercise
//! the NeedsAuth path.

use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::error::{DashError, Result};
use crate::feed::source::{DataSource, HistoryRange, HistoryRecord, LiveSample};

/// Spacing of generated backfill records
const HISTORY_STEP_SECS: i64 = 2;
/// Cap on generated backfill depth
const HISTORY_MAX_SECS: i64 = 3600;

/// Deterministic in-process [`DataSource`]
pub struct MockSource {
    start: DateTime<Utc>,
    tick: u64,
    require_token: bool,
    token: Option<String>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::anchored(Utc::now())
    }

    /// Anchor the generated timeline for reproducible tests
    pub fn anchored(start: DateTime<Utc>) -> Self {
        Self {
            start,
            tick: 0,
            require_token: false,
            token: None,
        }
    }

    /// Make every fetch fail with an auth challenge until a token is set
    pub fn with_auth_required(mut self) -> Self {
        self.require_token = true;
        self
    }

    fn check_auth(&self) -> Result<()> {
        if self.require_token && self.token.is_none() {
            return Err(DashError::AuthRequired);
        }
        Ok(())
    }

    /// Waveform value for a register at `t` seconds on the mock timeline
    fn value_at(name: &str, t: i64) -> Option<Value> {
        let phase = t as f64 / 60.0;
        match name {
            "SOC1" => Some(json!(62.0 + 18.0 * phase.sin())),
            "SOC2" => Some(json!(58.0 + 15.0 * (phase + 1.0).sin())),
            "CL1_Voltage" => Some(json!(48.3 + 1.2 * phase.sin())),
            "CL2_Voltage" => Some(json!(48.1 + 1.1 * (phase + 0.5).cos())),
            "CL1_Current" => Some(json!(12.0 * (phase * 2.0).sin())),
            "CL2_Current" => Some(json!(11.0 * (phase * 2.0 + 0.7).sin())),
            "Total_Power" => Some(json!(1.1 * (phase * 2.0).sin().abs())),
            "Sys_Status" => Some(json!((t / 30) % 4)),
            "Sys_Alarms" => Some(json!(((t / 45) % 2) | (((t / 90) % 2) << 2))),
            "Cycle_Count" => Some(json!(412 + t / 600)),
            _ => None,
        }
    }

    fn register_names() -> &'static [&'static str] {
        &[
            "SOC1",
            "SOC2",
            "CL1_Voltage",
            "CL2_Voltage",
            "CL1_Current",
            "CL2_Current",
            "Total_Power",
            "Sys_Status",
            "Sys_Alarms",
            "Cycle_Count",
        ]
    }

    fn range_secs(range: &HistoryRange) -> i64 {
        let secs = match range {
            HistoryRange::Minutes(n) => *n as i64 * 60,
            HistoryRange::Hours(n) => *n as i64 * 3600,
            HistoryRange::Days(n) => *n as i64 * 86_400,
            HistoryRange::Weeks(n) => *n as i64 * 604_800,
            HistoryRange::Custom { start, end } => (*end - *start).num_seconds().max(0),
        };
        secs.min(HISTORY_MAX_SECS)
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DataSource for MockSource {
    fn fetch_schema(&mut self) -> Result<Value> {
        self.check_auth()?;
        Ok(json!({
            "registers": [
                {"name": "SOC1", "unit": "%", "group": "Cluster 1",
                 "ui": {"view": ["live"], "component": ["soc_meter"], "label": "SOC Cluster 1"}},
                {"name": "SOC2", "unit": "%", "group": "Cluster 2",
                 "ui": {"view": ["live"], "component": ["soc_meter"], "label": "SOC Cluster 2"}},
                {"name": "CL1_Voltage", "unit": "V", "group": "Cluster Voltage",
                 "ui": {"view": ["live", "historical"],
                        "component": ["line_chart", "display_value"],
                        "label": "Cluster 1 Voltage", "decimals": 1,
                        "color": "rgba(75, 192, 192, 1)"}},
                {"name": "CL2_Voltage", "unit": "V", "group": "Cluster Voltage",
                 "ui": {"view": ["live", "historical"],
                        "component": ["line_chart", "display_value"],
                        "label": "Cluster 2 Voltage", "decimals": 1,
                        "color": "rgba(255, 99, 132, 1)"}},
                {"name": "CL1_Current", "unit": "A", "group": "Cluster Current",
                 "ui": {"view": ["live", "historical"],
                        "component": ["line_chart"], "label": "Cluster 1 Current",
                        "decimals": 2}},
                {"name": "CL2_Current", "unit": "A", "group": "Cluster Current",
                 "ui": {"view": ["live", "historical"],
                        "component": ["line_chart"], "label": "Cluster 2 Current",
                        "decimals": 2}},
                {"name": "Total_Power", "unit": "kW", "group": "System Power",
                 "ui": {"view": ["live", "historical"],
                        "component": ["line_chart", "display_value"],
                        "label": "Total Power", "decimals": 2,
                        "color": "#8e44ad"}},
                {"name": "Sys_Status",
                 "ui": {"view": "live", "component": "status_display",
                        "label": "System Condition",
                        "status_mapping": {
                            "0": {"text": "Idle", "color": "#9e9e9e"},
                            "1": {"text": "Charging", "color": "#2e7d32"},
                            "2": {"text": "Discharging", "color": "#1565c0"},
                            "3": {"text": "Fault", "color": "#c62828"}
                        }}},
                {"name": "Sys_Alarms",
                 "ui": {"view": "live", "component": "bitmask_display",
                        "label": "System Alarms",
                        "bit_mapping": {
                            "0": "Fan",
                            "1": {"0": "Grid OK", "1": "Grid fault"},
                            "2": "Overtemp"
                        }}},
                {"name": "Cycle_Count", "unit": "cycles",
                 "ui": {"view": "live", "component": "status_indicator",
                        "label": "Cycle Count"}}
            ]
        }))
    }

    fn fetch_live(&mut self) -> Result<LiveSample> {
        self.check_auth()?;
        self.tick += 1;
        let t = self.tick as i64;
        let timestamp = self.start + Duration::seconds(t);

        let mut data = HashMap::new();
        for name in Self::register_names() {
            // One register goes quiet periodically so missing-value
            // handling stays exercised end to end.
            if *name == "CL2_Current" && t % 10 == 0 {
                continue;
            }
            if let Some(value) = Self::value_at(name, t) {
                data.insert((*name).to_string(), value);
            }
        }

        Ok(LiveSample {
            timestamp: Some(timestamp.to_rfc3339()),
            data,
            error: None,
        })
    }

    fn fetch_history(&mut self, range: &HistoryRange) -> Result<Vec<HistoryRecord>> {
        self.check_auth()?;
        let span = Self::range_secs(range);

        let mut records = Vec::new();
        let mut offset = -span;
        while offset <= 0 {
            let timestamp = self.start + Duration::seconds(offset);
            let mut values = HashMap::new();
            for name in Self::register_names() {
                // Sprinkle nulls so gap handling is covered.
                if offset.rem_euclid(100) == 0 {
                    values.insert((*name).to_string(), Value::Null);
                } else if let Some(value) = Self::value_at(name, offset) {
                    values.insert((*name).to_string(), value);
                }
            }
            records.push(HistoryRecord {
                timestamp: Some(timestamp.to_rfc3339()),
                values,
            });
            offset += HISTORY_STEP_SECS;
        }

        // The real endpoint does not guarantee order; neither do we.
        records.reverse();
        Ok(records)
    }

    fn export_csv(
        &mut self,
        range: &HistoryRange,
        variables: Option<&[String]>,
    ) -> Result<Vec<u8>> {
        let records = self.fetch_history(range)?;
        let columns: Vec<String> = match variables {
            Some(vars) if !vars.is_empty() => vars.to_vec(),
            _ => Self::register_names().iter().map(|s| s.to_string()).collect(),
        };

        let mut csv = String::from("timestamp");
        for col in &columns {
            csv.push(',');
            csv.push_str(col);
        }
        csv.push('\n');

        for record in records.iter().rev() {
            csv.push_str(record.timestamp.as_deref().unwrap_or(""));
            for col in &columns {
                csv.push(',');
                match record.values.get(col) {
                    Some(Value::Null) | None => {}
                    Some(v) => csv.push_str(&v.to_string()),
                }
            }
            csv.push('\n');
        }
        Ok(csv.into_bytes())
    }

    fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }
}
