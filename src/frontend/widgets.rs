//! Card widgets: gauges, scalar values, status and bitmask panels
//!
//! Cards render from the view model's latest readings. A card whose
//! register has not produced a reading yet shows the N/A sentinel; it is
//! never removed from the layout.

use egui::{Color32, RichText, Ui};

use crate::decode::{BitReading, GaugeReading, ScalarReading, StatusReading, UNAVAILABLE};
use crate::frontend::charts::parse_color;

/// Card width used for the wrapping grid layout
const CARD_WIDTH: f32 = 150.0;

fn card_frame(ui: &mut Ui, add_contents: impl FnOnce(&mut Ui)) {
    egui::Frame::group(ui.style())
        .inner_margin(egui::Margin::same(8))
        .show(ui, |ui| {
            ui.set_min_width(CARD_WIDTH);
            ui.vertical(|ui| add_contents(ui));
        });
}

/// SOC meter: progress arc stand-in plus the formatted value
pub fn gauge_card(ui: &mut Ui, label: &str, reading: Option<&GaugeReading>) {
    card_frame(ui, |ui| {
        ui.label(RichText::new(label).small());
        let (fraction, text) = match reading {
            Some(reading) => (
                reading.percent.unwrap_or(0.0) as f32 / 100.0,
                reading.text.clone(),
            ),
            None => (0.0, UNAVAILABLE.to_string()),
        };
        ui.add(egui::ProgressBar::new(fraction).desired_width(CARD_WIDTH));
        ui.label(RichText::new(text).heading());
    });
}

/// Scalar value card: formatted number plus unit
pub fn scalar_card(ui: &mut Ui, label: &str, reading: Option<&ScalarReading>) {
    card_frame(ui, |ui| {
        ui.label(RichText::new(label).small());
        match reading {
            Some(reading) => {
                ui.label(
                    RichText::new(format!("{} {}", reading.text, reading.unit).trim())
                        .heading(),
                );
            }
            None => {
                ui.label(RichText::new(UNAVAILABLE).heading());
            }
        }
    });
}

/// Status card: mapped text in its mapped color
pub fn status_card(ui: &mut Ui, label: &str, reading: Option<&StatusReading>) {
    card_frame(ui, |ui| {
        ui.label(RichText::new(label).small());
        match reading {
            Some(reading) => {
                let color = reading
                    .color
                    .as_deref()
                    .and_then(parse_color)
                    .unwrap_or(ui.visuals().text_color());
                ui.label(RichText::new(&reading.text).heading().color(color));
            }
            None => {
                ui.label(RichText::new(UNAVAILABLE).heading());
            }
        }
    });
}

/// Bitmask panel: one row per declared bit
pub fn bitmask_card(ui: &mut Ui, label: &str, rows: Option<&Option<Vec<BitReading>>>) {
    card_frame(ui, |ui| {
        ui.label(RichText::new(label).small());
        match rows {
            Some(Some(rows)) => {
                for row in rows {
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(format!("{}:", row.label)).small());
                        let color = if row.set {
                            Color32::from_rgb(46, 125, 50)
                        } else {
                            Color32::from_rgb(198, 40, 40)
                        };
                        ui.label(RichText::new(&row.state).small().strong().color(color));
                    });
                }
            }
            Some(None) => {
                ui.label("Data N/A");
            }
            None => {
                ui.label(UNAVAILABLE);
            }
        }
    });
}

/// Raw-value indicator card
pub fn indicator_card(ui: &mut Ui, label: &str, text: Option<&String>) {
    card_frame(ui, |ui| {
        ui.label(RichText::new(label).small());
        ui.label(RichText::new(text.map_or(UNAVAILABLE, |t| t.as_str())).heading());
    });
}
