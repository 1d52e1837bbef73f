//! egui dashboard frontend
//!
//! [`DashApp`] renders the shared [`DashboardView`] once per frame and
//! talks to the feed worker exclusively over the command/event channels.
//! The frontend owns no engine state: pause, reload, re-auth and export
//! are all commands; state changes, tick confirmations and errors arrive
//! as events and only affect chrome (status bar, banners).

pub mod charts;
pub mod view;
pub mod widgets;

pub use view::{DashboardView, EguiSink};

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use crossbeam_channel::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::SiteInfo;
use crate::feed::{FeedCommand, FeedEvent, HistoryRange, LoopState};

/// Refresh cadence for the UI while live data is flowing
const REPAINT_INTERVAL: Duration = Duration::from_millis(250);

/// Wall-clock format for custom export bounds
const CUSTOM_RANGE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Preset export ranges offered by the dialog; `None` marks custom
const EXPORT_RANGES: &[(&str, Option<HistoryRange>)] = &[
    ("Last 30 minutes", Some(HistoryRange::Minutes(30))),
    ("Last hour", Some(HistoryRange::Hours(1))),
    ("Last 24 hours", Some(HistoryRange::Hours(24))),
    ("Last 7 days", Some(HistoryRange::Days(7))),
    ("Last 30 days", Some(HistoryRange::Days(30))),
    ("Custom", None),
];

/// Parse custom range bounds entered as local wall-clock minute precision
fn parse_custom_range(start: &str, end: &str) -> Result<HistoryRange, String> {
    let start = NaiveDateTime::parse_from_str(start.trim(), CUSTOM_RANGE_FORMAT)
        .map_err(|_| format!("Start must be {}", CUSTOM_RANGE_FORMAT))?;
    let end = NaiveDateTime::parse_from_str(end.trim(), CUSTOM_RANGE_FORMAT)
        .map_err(|_| format!("End must be {}", CUSTOM_RANGE_FORMAT))?;
    if end <= start {
        return Err("End must be after start".to_string());
    }
    Ok(HistoryRange::Custom { start, end })
}

/// Export dialog state
#[derive(Default)]
struct ExportDialog {
    open: bool,
    range_index: usize,
    custom_start: String,
    custom_end: String,
    /// (register, selected); populated from the schema via PlanReady
    variables: Vec<(String, bool)>,
    error: Option<String>,
}

impl ExportDialog {
    /// Resolve the chosen range, parsing custom bounds at minute precision
    fn selected_range(&self) -> Result<HistoryRange, String> {
        match EXPORT_RANGES[self.range_index].1.clone() {
            Some(range) => Ok(range),
            None => parse_custom_range(&self.custom_start, &self.custom_end),
        }
    }

    fn selected_variables(&self) -> Vec<String> {
        self.variables
            .iter()
            .filter(|(_, selected)| *selected)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Which page the central panel shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Page {
    #[default]
    Live,
    Historical,
}

/// Historical page state: range picker plus the last loaded snapshot
#[derive(Default)]
struct HistoryPage {
    range_index: usize,
    custom_start: String,
    custom_end: String,
    /// Snapshot converted to drawable group views
    groups: Vec<view::GroupView>,
    loaded_range: Option<String>,
    error: Option<String>,
    loading: bool,
}

impl HistoryPage {
    fn selected_range(&self) -> Result<HistoryRange, String> {
        match EXPORT_RANGES[self.range_index].1.clone() {
            Some(range) => Ok(range),
            None => parse_custom_range(&self.custom_start, &self.custom_end),
        }
    }
}

/// The dashboard application
pub struct DashApp {
    view: Arc<Mutex<DashboardView>>,
    commands: Sender<FeedCommand>,
    events: Receiver<FeedEvent>,
    site: SiteInfo,

    state: LoopState,
    paused: bool,
    last_tick: Option<DateTime<Utc>>,
    last_error: Option<String>,
    fatal_error: Option<String>,
    export_status: Option<String>,
    token_input: String,
    export: ExportDialog,
    page: Page,
    history: HistoryPage,
}

impl DashApp {
    pub fn new(
        view: Arc<Mutex<DashboardView>>,
        commands: Sender<FeedCommand>,
        events: Receiver<FeedEvent>,
        site: SiteInfo,
    ) -> Self {
        Self {
            view,
            commands,
            events,
            site,
            state: LoopState::Idle,
            paused: false,
            last_tick: None,
            last_error: None,
            fatal_error: None,
            export_status: None,
            token_input: String::new(),
            export: ExportDialog::default(),
            page: Page::default(),
            history: HistoryPage::default(),
        }
    }

    fn send(&self, cmd: FeedCommand) {
        if self.commands.send(cmd).is_err() {
            tracing::error!("Feed worker is gone, command dropped");
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                FeedEvent::State(state) => {
                    self.state = state;
                    self.paused = state == LoopState::Paused;
                    if state == LoopState::Polling {
                        self.fatal_error = None;
                    }
                }
                FeedEvent::PlanReady {
                    groups,
                    datasets,
                    cards,
                    export_variables,
                } => {
                    tracing::debug!(
                        "Plan ready: {} groups, {} datasets, {} cards",
                        groups,
                        datasets,
                        cards
                    );
                    self.export.variables = export_variables
                        .into_iter()
                        .map(|name| (name, true))
                        .collect();
                }
                FeedEvent::TickApplied { timestamp } => {
                    self.last_tick = Some(timestamp);
                    self.last_error = None;
                }
                FeedEvent::FetchError(message) => {
                    self.last_error = Some(message);
                    self.history.loading = false;
                }
                FeedEvent::HistoryLoaded { range, groups } => {
                    self.history.groups = groups
                        .into_iter()
                        .map(|group| view::GroupView {
                            key: group.key,
                            axis_title: group.axis_title,
                            datasets: group
                                .series
                                .into_iter()
                                .map(|series| view::DatasetView {
                                    label: series.label,
                                    color: series.color,
                                    point_radius: 0.0,
                                    points: series.points,
                                })
                                .collect(),
                        })
                        .collect();
                    self.history.loaded_range = Some(range);
                    self.history.loading = false;
                }
                FeedEvent::Fatal(message) => {
                    self.fatal_error = Some(message);
                }
                FeedEvent::ExportFinished { dest, error } => {
                    self.export_status = Some(match error {
                        None => format!("Exported to {}", dest.display()),
                        Some(e) => format!("Export failed: {}", e),
                    });
                }
                FeedEvent::Shutdown => {}
            }
        }
    }

    fn draw_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.strong(&self.site.unit_name);
            ui.label(&self.site.profile_info);
            ui.label(format!("Site: {}", self.site.site_name));

            ui.separator();

            ui.selectable_value(&mut self.page, Page::Live, "Live");
            ui.selectable_value(&mut self.page, Page::Historical, "Historical");

            ui.separator();

            let pause_label = if self.paused { "Resume Updates" } else { "Pause Updates" };
            if ui.button(pause_label).clicked() {
                if self.paused {
                    self.send(FeedCommand::Resume);
                } else {
                    self.send(FeedCommand::Pause);
                }
            }
            if ui.button("Reload").clicked() {
                self.send(FeedCommand::Reload);
            }
            if ui.button("Export CSV").clicked() {
                self.export.open = true;
                self.export.error = None;
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(self.state.to_string());
            });
        });
    }

    fn draw_banners(&mut self, ui: &mut egui::Ui) {
        if self.state == LoopState::NeedsAuth {
            egui::Frame::group(ui.style()).show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.colored_label(
                        ui.visuals().warn_fg_color,
                        "Authentication required. Enter an API token to continue.",
                    );
                    ui.add(
                        egui::TextEdit::singleline(&mut self.token_input)
                            .password(true)
                            .hint_text("API token"),
                    );
                    if ui.button("Log in").clicked() && !self.token_input.is_empty() {
                        self.send(FeedCommand::SetToken(Some(self.token_input.clone())));
                        self.token_input.clear();
                    }
                });
            });
        }

        if let Some(message) = self.fatal_error.clone() {
            egui::Frame::group(ui.style()).show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.colored_label(
                        ui.visuals().error_fg_color,
                        format!("Failed to load dashboard: {}", message),
                    );
                    if ui.button("Retry").clicked() {
                        self.send(FeedCommand::Reload);
                    }
                });
            });
        }
    }

    fn draw_status_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            match self.last_tick {
                Some(ts) => {
                    let local = ts.with_timezone(&Local);
                    ui.label(format!("Last sample: {}", local.format("%H:%M:%S")));
                }
                None => {
                    ui.label("Waiting for data...");
                }
            }
            if let Some(error) = &self.last_error {
                ui.separator();
                ui.colored_label(ui.visuals().warn_fg_color, error);
            }
            if let Some(status) = &self.export_status {
                ui.separator();
                ui.label(status);
            }
        });
    }

    fn draw_bucket_cards(ui: &mut egui::Ui, view: &DashboardView, bucket: usize) {
        let gauges = DashboardView::cards_in_bucket(&view.gauges, bucket);
        let scalars = DashboardView::cards_in_bucket(&view.scalars, bucket);
        let statuses = DashboardView::cards_in_bucket(&view.status_panels, bucket);
        let bitmasks = DashboardView::cards_in_bucket(&view.bitmask_panels, bucket);
        let indicators = DashboardView::cards_in_bucket(&view.indicators, bucket);

        // Empty buckets stay hidden, matching the reference layout.
        if gauges.is_empty()
            && scalars.is_empty()
            && statuses.is_empty()
            && bitmasks.is_empty()
            && indicators.is_empty()
        {
            return;
        }

        ui.heading(&view.buckets[bucket]);
        ui.horizontal_wrapped(|ui| {
            for card in gauges {
                widgets::gauge_card(ui, &card.label, view.gauge_values.get(&card.register));
            }
            for card in scalars {
                widgets::scalar_card(ui, &card.label, view.scalar_values.get(&card.register));
            }
            for card in statuses {
                widgets::status_card(ui, &card.label, view.status_values.get(&card.register));
            }
            for card in bitmasks {
                widgets::bitmask_card(ui, &card.label, view.bitmask_values.get(&card.register));
            }
            for card in indicators {
                widgets::indicator_card(
                    ui,
                    &card.label,
                    view.indicator_values.get(&card.register),
                );
            }
        });
        ui.add_space(8.0);
    }

    fn bucket_order(view: &DashboardView) -> Vec<usize> {
        (0..view.buckets.len()).collect()
    }

    fn draw_history_page(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let current = EXPORT_RANGES[self.history.range_index].0;
            egui::ComboBox::from_id_salt("history_range")
                .selected_text(current)
                .show_ui(ui, |ui| {
                    for (index, (label, _)) in EXPORT_RANGES.iter().enumerate() {
                        ui.selectable_value(&mut self.history.range_index, index, *label);
                    }
                });

            if EXPORT_RANGES[self.history.range_index].1.is_none() {
                ui.add(
                    egui::TextEdit::singleline(&mut self.history.custom_start)
                        .desired_width(140.0)
                        .hint_text(format!("Start ({})", CUSTOM_RANGE_FORMAT)),
                );
                ui.add(
                    egui::TextEdit::singleline(&mut self.history.custom_end)
                        .desired_width(140.0)
                        .hint_text(format!("End ({})", CUSTOM_RANGE_FORMAT)),
                );
            }

            if ui.button("Load").clicked() {
                match self.history.selected_range() {
                    Ok(range) => {
                        self.history.error = None;
                        self.history.loading = true;
                        self.send(FeedCommand::LoadHistory(range));
                    }
                    Err(message) => {
                        self.history.error = Some(message);
                    }
                }
            }

            if self.history.loading {
                ui.spinner();
            } else if let Some(range) = &self.history.loaded_range {
                ui.weak(format!("Showing: {}", range));
            }
        });

        if let Some(error) = &self.history.error {
            ui.colored_label(ui.visuals().error_fg_color, error);
        }

        ui.separator();
        egui::ScrollArea::vertical().show(ui, |ui| {
            if self.history.groups.is_empty() {
                ui.weak("No historical data loaded yet.");
            }
            for group in &self.history.groups {
                charts::draw_chart_group(ui, group);
                ui.add_space(12.0);
            }
        });
    }

    fn draw_export_dialog(&mut self, ctx: &egui::Context) {
        if !self.export.open {
            return;
        }

        let mut open = true;
        egui::Window::new("Export CSV")
            .open(&mut open)
            .resizable(false)
            .show(ctx, |ui| {
                let current = EXPORT_RANGES[self.export.range_index].0;
                egui::ComboBox::from_label("Range")
                    .selected_text(current)
                    .show_ui(ui, |ui| {
                        for (index, (label, _)) in EXPORT_RANGES.iter().enumerate() {
                            ui.selectable_value(&mut self.export.range_index, index, *label);
                        }
                    });

                if EXPORT_RANGES[self.export.range_index].1.is_none() {
                    ui.add(
                        egui::TextEdit::singleline(&mut self.export.custom_start)
                            .hint_text(format!("Start ({})", CUSTOM_RANGE_FORMAT)),
                    );
                    ui.add(
                        egui::TextEdit::singleline(&mut self.export.custom_end)
                            .hint_text(format!("End ({})", CUSTOM_RANGE_FORMAT)),
                    );
                }

                if !self.export.variables.is_empty() {
                    ui.separator();
                    ui.label("Variables");
                    egui::ScrollArea::vertical().max_height(160.0).show(ui, |ui| {
                        for (name, selected) in &mut self.export.variables {
                            ui.checkbox(selected, name.as_str());
                        }
                    });
                }

                if let Some(error) = &self.export.error {
                    ui.colored_label(ui.visuals().error_fg_color, error);
                }

                ui.separator();
                if ui.button("Download").clicked() {
                    match self.export.selected_range() {
                        Ok(range) => {
                            let dest = rfd::FileDialog::new()
                                .set_file_name("sensor_data.csv")
                                .save_file();
                            if let Some(dest) = dest {
                                let variables = self.export.selected_variables();
                                self.send(FeedCommand::Export {
                                    range,
                                    variables: if variables.is_empty() {
                                        None
                                    } else {
                                        Some(variables)
                                    },
                                    dest,
                                });
                                self.export.open = false;
                            }
                        }
                        Err(message) => {
                            self.export.error = Some(message);
                        }
                    }
                }
            });

        if !open {
            self.export.open = false;
        }
    }
}

impl eframe::App for DashApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.draw_toolbar(ui);
            self.draw_banners(ui);
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            self.draw_status_bar(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| match self.page {
            Page::Live => {
                let shared = self.view.clone();
                let view = shared.lock().unwrap();

                egui::ScrollArea::vertical().show(ui, |ui| {
                    for bucket in Self::bucket_order(&view) {
                        Self::draw_bucket_cards(ui, &view, bucket);
                    }
                    for group in &view.groups {
                        charts::draw_chart_group(ui, group);
                        ui.add_space(12.0);
                    }

                    if view.groups.is_empty()
                        && view.gauges.is_empty()
                        && view.scalars.is_empty()
                        && view.status_panels.is_empty()
                        && view.bitmask_panels.is_empty()
                        && view.indicators.is_empty()
                    {
                        ui.weak("No widgets yet.");
                    }
                });
            }
            Page::Historical => {
                self.draw_history_page(ui);
            }
        });

        self.draw_export_dialog(ctx);

        // Live data arrives between frames; keep repainting at a gentle
        // cadence instead of waiting for input events.
        ctx.request_repaint_after(REPAINT_INTERVAL);
    }
}

impl Drop for DashApp {
    fn drop(&mut self) {
        let _ = self.commands.send(FeedCommand::Shutdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_dialog_preset_range() {
        let dialog = ExportDialog {
            range_index: 0,
            ..Default::default()
        };
        assert_eq!(dialog.selected_range(), Ok(HistoryRange::Minutes(30)));
    }

    #[test]
    fn test_export_dialog_custom_range_parsing() {
        let mut dialog = ExportDialog {
            range_index: EXPORT_RANGES.len() - 1,
            custom_start: "2026-08-01 09:15".to_string(),
            custom_end: "2026-08-02 18:00".to_string(),
            ..Default::default()
        };
        match dialog.selected_range() {
            Ok(HistoryRange::Custom { start, end }) => {
                assert_eq!(start.format("%H:%M:%S").to_string(), "09:15:00");
                assert!(end > start);
            }
            other => panic!("unexpected: {:?}", other),
        }

        dialog.custom_end = "not a date".to_string();
        assert!(dialog.selected_range().is_err());

        dialog.custom_end = "2026-07-01 00:00".to_string();
        assert!(dialog.selected_range().is_err());
    }

    #[test]
    fn test_export_dialog_variable_selection() {
        let dialog = ExportDialog {
            variables: vec![
                ("SOC1".to_string(), true),
                ("CL1_Voltage".to_string(), false),
                ("Total_Power".to_string(), true),
            ],
            ..Default::default()
        };
        assert_eq!(
            dialog.selected_variables(),
            vec!["SOC1".to_string(), "Total_Power".to_string()]
        );
    }
}
