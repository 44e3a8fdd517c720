use chrono::NaiveDate;

use kline_downloader::model::interval::{Interval, SUPPORTED_INTERVALS};
use kline_downloader::window_planner::{
    day_start_ms, plan_windows, plan_windows_until, TimeWindow, REQUEST_LIMIT,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Number of interval ticks `t` with `w.start <= t <= w.end` on the grid
/// that starts at `w.start`.
fn ticks_in(window: &TimeWindow, interval: Interval) -> u32 {
    let mut n = 0;
    let mut t = window.start;
    while t <= window.end {
        n += 1;
        t = interval.advance(t, 1).unwrap();
    }
    n
}

fn assert_covers(windows: &[TimeWindow], start_ms: i64, end_ms: i64, interval: Interval) {
    assert!(!windows.is_empty());
    assert_eq!(windows[0].start, start_ms);
    for w in windows {
        assert!(w.start <= w.end, "window {w:?} is reversed");
        assert!(ticks_in(w, interval) <= REQUEST_LIMIT, "window {w:?} exceeds a page");
    }
    for pair in windows.windows(2) {
        assert_eq!(
            pair[1].start,
            interval.advance(pair[0].end, 1).unwrap(),
            "gap or overlap between {:?} and {:?}",
            pair[0],
            pair[1]
        );
    }
    let last = windows.last().unwrap();
    // Either the range end is reached or the leftover tail holds no tick.
    assert!(last.end == end_ms || interval.advance(last.end, 1).unwrap() > end_ms);
}

#[test]
/// Every supported interval over several range lengths:
/// windows start at the range start, chain tick to tick, and hold at most one page.
fn windows_cover_range_without_gaps_or_overlap() {
    let ranges = [
        (date(2021, 7, 1), date(2021, 7, 1)),
        (date(2021, 7, 1), date(2021, 7, 2)),
        (date(2021, 7, 1), date(2021, 8, 1)),
        (date(2020, 1, 1), date(2021, 7, 1)),
        (date(2017, 8, 17), date(2024, 2, 29)),
    ];
    for s in SUPPORTED_INTERVALS {
        let interval: Interval = s.parse().unwrap();
        for (start, end) in ranges {
            let windows = plan_windows(start, Some(end), interval);
            assert_covers(&windows, day_start_ms(start), day_start_ms(end), interval);
        }
    }
}

#[test]
/// Window count stays within one of ceil(span / page span) for fixed intervals.
fn window_count_matches_page_arithmetic() {
    for s in ["1m", "5m", "1h", "4h", "1d", "1w"] {
        let interval: Interval = s.parse().unwrap();
        let step = interval.fixed_millis().unwrap();
        let page = i64::from(REQUEST_LIMIT - 1) * step;
        for days in [1i64, 7, 30, 365, 1500] {
            let start_ms = day_start_ms(date(2019, 1, 1));
            let end_ms = start_ms + days * 86_400_000;
            let windows = plan_windows_until(start_ms, end_ms, interval);
            let expected = ((end_ms - start_ms) + page - 1) / page;
            let got = windows.len() as i64;
            assert!(
                (got - expected).abs() <= 1,
                "{s} over {days}d: got {got} windows, expected about {expected}"
            );
        }
    }
}

#[test]
/// A zero-length range still yields exactly one window.
fn single_instant_range_yields_one_window() {
    for s in SUPPORTED_INTERVALS {
        let interval: Interval = s.parse().unwrap();
        let windows = plan_windows(date(2022, 3, 15), Some(date(2022, 3, 15)), interval);
        assert_eq!(windows.len(), 1, "{s}");
        assert_eq!(windows[0].start, windows[0].end);
    }
}

#[test]
fn concrete_one_hour_single_day_window() {
    let windows = plan_windows(date(2021, 7, 1), Some(date(2021, 7, 1)), "1h".parse().unwrap());
    assert_eq!(windows.len(), 1);
    // 2021-07-01T00:00:00Z
    assert_eq!(windows[0].start, 1_625_097_600_000);
    assert_eq!(windows[0].end, 1_625_097_600_000);
}

#[test]
/// Minute pages hold 999 intervals each and advance by one tick.
fn one_minute_pages_are_full_except_last() {
    let interval: Interval = "1m".parse().unwrap();
    let windows = plan_windows(date(2021, 7, 1), Some(date(2021, 7, 2)), interval);
    // 1440 intervals -> ticks 0..=1440 over two pages
    assert_eq!(windows.len(), 2);
    assert_eq!(ticks_in(&windows[0], interval), 1000);
    assert_eq!(ticks_in(&windows[1], interval), 441);
}
