//! Property-based tests for the series windowing store

use chrono::{DateTime, Duration, TimeZone, Utc};
use flowdash::store::{SeriesPoint, WindowPolicy, WindowStore};
use proptest::prelude::*;

const BASE_SECS: i64 = 1_700_000_000;

fn at(offset: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(BASE_SECS + offset, 0).unwrap()
}

fn policy(window_secs: i64, max_points: usize) -> WindowPolicy {
    WindowPolicy {
        window: Duration::seconds(window_secs),
        max_points,
    }
}

proptest! {
    /// Backfill points supplied in any order come back sorted.
    #[test]
    fn seed_returns_non_decreasing_timestamps(
        offsets in prop::collection::vec(0i64..600, 0..200),
    ) {
        let mut store = WindowStore::new(policy(600, 500));
        let points: Vec<SeriesPoint> = offsets
            .iter()
            .map(|&o| SeriesPoint::new(at(o), o as f64))
            .collect();
        store.seed("s", points, at(600));

        let snapshot = store.snapshot("s");
        prop_assert!(snapshot.windows(2).all(|w| w[0].x <= w[1].x));
    }

    /// Seeding is replace, not append: twice equals once.
    #[test]
    fn seed_is_idempotent(
        offsets in prop::collection::vec(0i64..600, 0..200),
    ) {
        let mut store = WindowStore::new(policy(600, 100));
        let points: Vec<SeriesPoint> = offsets
            .iter()
            .map(|&o| SeriesPoint::new(at(o), o as f64))
            .collect();

        store.seed("s", points.clone(), at(600));
        let once = store.snapshot("s");
        store.seed("s", points, at(600));
        prop_assert_eq!(store.snapshot("s"), once);
    }

    /// Both eviction bounds hold regardless of how much is appended.
    #[test]
    fn append_respects_window_and_count(
        window_secs in 10i64..120,
        max_points in 1usize..50,
        steps in prop::collection::vec(0i64..10, 1..300),
    ) {
        let mut store = WindowStore::new(policy(window_secs, max_points));

        // Non-decreasing timestamps, as the live path guarantees.
        let mut t = 0i64;
        let mut last = at(0);
        for step in steps {
            t += step;
            last = at(t);
            store.append("s", SeriesPoint::new(last, t as f64));
        }

        let snapshot = store.snapshot("s");
        prop_assert!(snapshot.len() <= max_points);
        let cutoff = last - Duration::seconds(window_secs);
        prop_assert!(snapshot.iter().all(|p| p.x >= cutoff));
        prop_assert!(snapshot.windows(2).all(|w| w[0].x <= w[1].x));
    }

    /// Seeding never keeps points outside [now - window, now] and never
    /// exceeds the count cap.
    #[test]
    fn seed_respects_window_and_count(
        offsets in prop::collection::vec(-600i64..1200, 0..300),
        window_secs in 10i64..600,
        max_points in 1usize..100,
    ) {
        let mut store = WindowStore::new(policy(window_secs, max_points));
        let now = at(600);
        let points: Vec<SeriesPoint> = offsets
            .iter()
            .map(|&o| SeriesPoint::new(at(o), o as f64))
            .collect();
        store.seed("s", points, now);

        let snapshot = store.snapshot("s");
        prop_assert!(snapshot.len() <= max_points);
        let cutoff = now - Duration::seconds(window_secs);
        prop_assert!(snapshot.iter().all(|p| p.x >= cutoff && p.x <= now));
    }
}
