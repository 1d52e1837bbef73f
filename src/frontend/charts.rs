//! Chart group rendering with egui_plot
//!
//! Each chart group from the widget plan becomes one plot surface with a
//! shared time axis and a legend. Series with `y: None` gap points are
//! split into separate line segments so the gap renders as a break, not an
//! interpolated slope.

use chrono::Local;
use egui::Color32;
use egui_plot::{Corner, GridMark, Legend, Line, Plot, PlotPoints, Points};
use std::ops::RangeInclusive;

use crate::frontend::view::GroupView;
use crate::store::SeriesPoint;

/// Chart surface height in points
const CHART_HEIGHT: f32 = 260.0;

/// Parse a schema color string: `#rrggbb` or `rgba(r, g, b, a)`
pub fn parse_color(spec: &str) -> Option<Color32> {
    let spec = spec.trim();

    if let Some(hex) = spec.strip_prefix('#') {
        if hex.len() == 6 {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            return Some(Color32::from_rgb(r, g, b));
        }
        return None;
    }

    let body = spec
        .strip_prefix("rgba(")
        .or_else(|| spec.strip_prefix("rgb("))?
        .strip_suffix(')')?;
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();
    if parts.len() < 3 {
        return None;
    }
    let r = parts[0].parse::<f64>().ok()?.clamp(0.0, 255.0) as u8;
    let g = parts[1].parse::<f64>().ok()?.clamp(0.0, 255.0) as u8;
    let b = parts[2].parse::<f64>().ok()?.clamp(0.0, 255.0) as u8;
    Some(Color32::from_rgb(r, g, b))
}

/// Generate a distinct fallback color for a dataset index.
/// Uses the golden ratio to spread hues evenly across the color wheel,
/// with medium saturation/value so it reads on light and dark themes.
pub fn auto_color(index: usize) -> Color32 {
    const GOLDEN_RATIO: f32 = 0.618033988749895;

    let hue = ((index as f32 * GOLDEN_RATIO) % 1.0) * 360.0;
    let (r, g, b) = hsv_to_rgb(hue, 0.7, 0.85);
    Color32::from_rgb(r, g, b)
}

/// Convert HSV (hue 0-360, saturation 0-1, value 0-1) to RGB
fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> (u8, u8, u8) {
    let c = value * saturation;
    let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let m = value - c;

    let (r, g, b) = match (hue / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    (
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    )
}

/// Split a series into contiguous non-gap segments of `[epoch_secs, y]`
pub fn segments(points: &[SeriesPoint]) -> Vec<Vec<[f64; 2]>> {
    let mut out = Vec::new();
    let mut current: Vec<[f64; 2]> = Vec::new();

    for point in points {
        match point.y {
            Some(y) if y.is_finite() => {
                current.push([point.x.timestamp_millis() as f64 / 1000.0, y]);
            }
            _ => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Format an epoch-seconds axis mark as local wall-clock time
fn format_clock(mark: GridMark, _range: &RangeInclusive<f64>) -> String {
    chrono::DateTime::from_timestamp(mark.value as i64, 0)
        .map(|ts| ts.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

/// Draw one chart group surface
pub fn draw_chart_group(ui: &mut egui::Ui, group: &GroupView) {
    ui.strong(&group.key);
    ui.weak(&group.axis_title);

    Plot::new(format!("chart_group_{}", group.key))
        .height(CHART_HEIGHT)
        .legend(Legend::default().position(Corner::LeftTop))
        .x_axis_formatter(format_clock)
        .allow_drag(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for (index, dataset) in group.datasets.iter().enumerate() {
                let color = dataset
                    .color
                    .as_deref()
                    .and_then(parse_color)
                    .unwrap_or_else(|| auto_color(index));

                let segments = segments(&dataset.points);
                for segment in &segments {
                    plot_ui.line(
                        Line::new(dataset.label.clone(), PlotPoints::from(segment.clone()))
                            .color(color)
                            .width(1.5),
                    );
                }
                if dataset.point_radius > 0.0 {
                    let markers: Vec<[f64; 2]> =
                        segments.into_iter().flatten().collect();
                    if !markers.is_empty() {
                        plot_ui.points(
                            Points::new(dataset.label.clone(), PlotPoints::from(markers))
                                .color(color)
                                .radius(dataset.point_radius),
                        );
                    }
                }
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_color("#8e44ad"), Some(Color32::from_rgb(142, 68, 173)));
        assert_eq!(parse_color("#xyzxyz"), None);
        assert_eq!(parse_color("#fff"), None);
    }

    #[test]
    fn test_parse_rgba_color() {
        assert_eq!(
            parse_color("rgba(75, 192, 192, 1)"),
            Some(Color32::from_rgb(75, 192, 192))
        );
        assert_eq!(
            parse_color("rgb(255, 99, 132)"),
            Some(Color32::from_rgb(255, 99, 132))
        );
        assert_eq!(parse_color("rgba(banana)"), None);
        assert_eq!(parse_color("blue"), None);
    }

    #[test]
    fn test_auto_colors_are_distinct() {
        let a = auto_color(0);
        let b = auto_color(1);
        let c = auto_color(2);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn test_segments_split_at_gaps() {
        let t = |s: i64| Utc.timestamp_opt(1_700_000_000 + s, 0).unwrap();
        let points = vec![
            SeriesPoint::new(t(0), 1.0),
            SeriesPoint::new(t(1), 2.0),
            SeriesPoint::gap(t(2)),
            SeriesPoint::new(t(3), 3.0),
        ];
        let segs = segments(&points);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].len(), 2);
        assert_eq!(segs[1].len(), 1);
        assert_eq!(segs[1][0][1], 3.0);
    }

    #[test]
    fn test_segments_all_gaps_yield_nothing() {
        let t = |s: i64| Utc.timestamp_opt(1_700_000_000 + s, 0).unwrap();
        let points = vec![SeriesPoint::gap(t(0)), SeriesPoint::gap(t(1))];
        assert!(segments(&points).is_empty());
    }
}
