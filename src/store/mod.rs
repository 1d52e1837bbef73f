//! Bounded time-series storage for chart datasets
//!
//! Each chart-bound register owns one [`SeriesBuffer`], a ring of
//! timestamped points kept inside a rolling window. Two independent
//! eviction axes apply on every mutation:
//!
//! - **age**: points older than the window duration are dropped;
//! - **count**: the buffer never exceeds `max_points`.
//!
//! The count bound guards against a backed-up poll loop producing bursts
//! beyond the nominal rate; the age bound guards against a historical
//! backfill larger than the live window. Both are derived from one
//! "history minutes" setting (one point per expected poll tick).
//!
//! Points are removed only from the front, so eviction is O(1) amortized
//! per append. Buffers are mutated only by the feed worker's tick handler
//! and the one-time backfill seed; malformed numeric values become
//! `y: None` gap points rather than failing a series.

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};

/// A single timestamped point in a series.
///
/// `y: None` marks a gap (missing or malformed sample); renderers break
/// the line there instead of interpolating across it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub x: DateTime<Utc>,
    pub y: Option<f64>,
}

impl SeriesPoint {
    pub fn new(x: DateTime<Utc>, y: f64) -> Self {
        Self { x, y: Some(y) }
    }

    /// A gap marker breaking line continuity in charts
    pub fn gap(x: DateTime<Utc>) -> Self {
        Self { x, y: None }
    }

    pub fn is_gap(&self) -> bool {
        self.y.is_none() || self.y.is_some_and(|y| y.is_nan())
    }
}

/// Eviction policy shared by every series buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    /// Rolling time span retained per series
    pub window: Duration,
    /// Hard cap on points per series
    pub max_points: usize,
}

impl WindowPolicy {
    /// Derive the policy from the history-window setting and poll cadence:
    /// the count cap is one point per expected poll tick over the window.
    pub fn from_history(history_minutes: u32, poll_interval_secs: u64) -> Self {
        let secs = (history_minutes as u64) * 60;
        Self {
            window: Duration::seconds(secs as i64),
            max_points: (secs / poll_interval_secs.max(1)).max(1) as usize,
        }
    }
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self::from_history(5, 1)
    }
}

/// Ring buffer of points for one register
#[derive(Debug, Clone, Default)]
pub struct SeriesBuffer {
    points: VecDeque<SeriesPoint>,
}

impl SeriesBuffer {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeriesPoint> {
        self.points.iter()
    }

    pub fn front(&self) -> Option<&SeriesPoint> {
        self.points.front()
    }

    pub fn back(&self) -> Option<&SeriesPoint> {
        self.points.back()
    }

    /// Owned snapshot in timestamp order, for handing to a render sink
    pub fn snapshot(&self) -> Vec<SeriesPoint> {
        self.points.iter().copied().collect()
    }

    fn evict(&mut self, reference: DateTime<Utc>, policy: &WindowPolicy) {
        let cutoff = reference - policy.window;
        while self.points.front().is_some_and(|p| p.x < cutoff) {
            self.points.pop_front();
        }
        while self.points.len() > policy.max_points {
            self.points.pop_front();
        }
    }
}

/// Per-register series buffers under one eviction policy
#[derive(Debug, Clone, Default)]
pub struct WindowStore {
    policy: WindowPolicy,
    series: HashMap<String, SeriesBuffer>,
}

impl WindowStore {
    pub fn new(policy: WindowPolicy) -> Self {
        Self {
            policy,
            series: HashMap::new(),
        }
    }

    pub fn policy(&self) -> &WindowPolicy {
        &self.policy
    }

    /// Bulk-load backfill points for a series.
    ///
    /// Replace semantics: any existing buffer for the key is discarded, so
    /// seeding twice with the same payload yields the same result as
    /// seeding once. Points arrive in arbitrary order and are sorted
    /// ascending by timestamp; points outside `[now - window, now]` are
    /// dropped, and if the remainder still exceeds the count cap only the
    /// most recent points are kept.
    pub fn seed(&mut self, key: &str, mut points: Vec<SeriesPoint>, now: DateTime<Utc>) {
        points.sort_by_key(|p| p.x);

        let cutoff = now - self.policy.window;
        points.retain(|p| p.x >= cutoff && p.x <= now);

        if points.len() > self.policy.max_points {
            points.drain(..points.len() - self.policy.max_points);
        }

        let buffer = SeriesBuffer {
            points: points.into(),
        };
        self.series.insert(key.to_string(), buffer);
    }

    /// Append one point assumed to be the most recent for its series, then
    /// evict by age (relative to the point's own timestamp) and by count.
    pub fn append(&mut self, key: &str, point: SeriesPoint) {
        let buffer = self.series.entry(key.to_string()).or_default();
        let reference = point.x;
        buffer.points.push_back(point);
        buffer.evict(reference, &self.policy);
    }

    /// Read-only view of a series; absent keys read as empty
    pub fn get(&self, key: &str) -> Option<&SeriesBuffer> {
        self.series.get(key)
    }

    /// Owned snapshot of a series, empty when the key is unknown
    pub fn snapshot(&self, key: &str) -> Vec<SeriesPoint> {
        self.series
            .get(key)
            .map(|b| b.snapshot())
            .unwrap_or_default()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Drop every buffer (full re-initialization, e.g. schema reload)
    pub fn clear(&mut self) {
        self.series.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn policy(window_secs: i64, max_points: usize) -> WindowPolicy {
        WindowPolicy {
            window: Duration::seconds(window_secs),
            max_points,
        }
    }

    #[test]
    fn test_policy_from_history() {
        let p = WindowPolicy::from_history(5, 1);
        assert_eq!(p.window, Duration::minutes(5));
        assert_eq!(p.max_points, 300);

        let p = WindowPolicy::from_history(5, 2);
        assert_eq!(p.max_points, 150);
    }

    #[test]
    fn test_seed_sorts_out_of_order_points() {
        let mut store = WindowStore::new(policy(600, 100));
        store.seed(
            "v",
            vec![
                SeriesPoint::new(at(30), 3.0),
                SeriesPoint::new(at(10), 1.0),
                SeriesPoint::new(at(20), 2.0),
            ],
            at(60),
        );
        let xs: Vec<_> = store.get("v").unwrap().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![at(10), at(20), at(30)]);
    }

    #[test]
    fn test_seed_is_idempotent() {
        let mut store = WindowStore::new(policy(600, 100));
        let points = vec![
            SeriesPoint::new(at(10), 1.0),
            SeriesPoint::new(at(20), 2.0),
        ];
        store.seed("v", points.clone(), at(60));
        let once = store.snapshot("v");

        store.seed("v", points, at(60));
        assert_eq!(store.snapshot("v"), once);
        assert_eq!(once.len(), 2);
    }

    #[test]
    fn test_seed_applies_window_and_count() {
        let mut store = WindowStore::new(policy(100, 3));
        let points: Vec<_> = (0..20).map(|i| SeriesPoint::new(at(i * 10), i as f64)).collect();
        store.seed("v", points, at(190));

        let buf = store.get("v").unwrap();
        // Window keeps x >= 90; count cap then keeps the 3 most recent.
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.front().unwrap().x, at(170));
        assert_eq!(buf.back().unwrap().x, at(190));
    }

    #[test]
    fn test_append_evicts_by_age() {
        let mut store = WindowStore::new(policy(30, 100));
        for i in 0..10 {
            store.append("v", SeriesPoint::new(at(i * 10), i as f64));
        }
        // Last point at t=90; window keeps x >= 60.
        let xs: Vec<_> = store.get("v").unwrap().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![at(60), at(70), at(80), at(90)]);
    }

    #[test]
    fn test_append_evicts_by_count() {
        let mut store = WindowStore::new(policy(10_000, 5));
        for i in 0..50 {
            store.append("v", SeriesPoint::new(at(i), i as f64));
        }
        let buf = store.get("v").unwrap();
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.front().unwrap().y, Some(45.0));
    }

    #[test]
    fn test_duplicate_timestamps_not_deduplicated() {
        let mut store = WindowStore::new(policy(100, 10));
        store.append("v", SeriesPoint::new(at(5), 1.0));
        store.append("v", SeriesPoint::new(at(5), 2.0));
        assert_eq!(store.get("v").unwrap().len(), 2);
    }

    #[test]
    fn test_gap_points_survive_windowing() {
        let mut store = WindowStore::new(policy(100, 10));
        store.append("v", SeriesPoint::new(at(0), 1.0));
        store.append("v", SeriesPoint::gap(at(1)));
        store.append("v", SeriesPoint::new(at(2), 3.0));

        let buf = store.get("v").unwrap();
        assert_eq!(buf.len(), 3);
        assert!(buf.iter().nth(1).unwrap().is_gap());
    }

    #[test]
    fn test_unknown_key_reads_empty() {
        let store = WindowStore::new(WindowPolicy::default());
        assert!(store.get("nope").is_none());
        assert!(store.snapshot("nope").is_empty());
    }

    #[test]
    fn test_clear_resets_all_series() {
        let mut store = WindowStore::new(WindowPolicy::default());
        store.append("a", SeriesPoint::new(at(0), 1.0));
        store.append("b", SeriesPoint::new(at(0), 2.0));
        assert_eq!(store.len(), 2);
        store.clear();
        assert!(store.is_empty());
    }
}
