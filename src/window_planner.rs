use chrono::{NaiveDate, Utc};

use crate::model::interval::Interval;

/// Maximum klines returned by a single page request.
pub const REQUEST_LIMIT: u32 = 1000;

/// Inclusive millisecond bounds of one page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

/// Epoch milliseconds of `date` at 00:00:00 UTC.
pub fn day_start_ms(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or_default()
}

/// Plans page windows from `range_start` to `range_end`, or to the current
/// wall clock when `range_end` is `None`.
pub fn plan_windows(
    range_start: NaiveDate,
    range_end: Option<NaiveDate>,
    interval: Interval,
) -> Vec<TimeWindow> {
    let end_ms = match range_end {
        Some(date) => day_start_ms(date),
        None => Utc::now().timestamp_millis(),
    };
    plan_windows_until(day_start_ms(range_start), end_ms, interval)
}

/// Splits `[start_ms, end_ms]` into contiguous windows of at most
/// `REQUEST_LIMIT` interval ticks each.
///
/// Every window starts one interval after the previous window's end. The
/// last window ends at `end_ms` unless the remainder after a full window is
/// shorter than one interval, in which case it holds no tick and is skipped.
/// A single instant (`start_ms == end_ms`) yields exactly one window.
pub fn plan_windows_until(start_ms: i64, end_ms: i64, interval: Interval) -> Vec<TimeWindow> {
    let mut windows = Vec::new();
    if start_ms > end_ms {
        return windows;
    }

    let mut cur = start_ms;
    loop {
        let window_end = interval
            .advance(cur, REQUEST_LIMIT - 1)
            .map_or(end_ms, |full| full.min(end_ms));
        windows.push(TimeWindow {
            start: cur,
            end: window_end,
        });
        if window_end >= end_ms {
            break;
        }
        match interval.advance(window_end, 1) {
            Some(next) if next <= end_ms => cur = next,
            _ => break,
        }
    }

    tracing::debug!(
        interval = %interval,
        start_ms,
        end_ms,
        windows = windows.len(),
        "Planned kline windows"
    );
    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn single_day_one_hour_yields_single_instant_window() {
        let windows = plan_windows(date(2021, 7, 1), Some(date(2021, 7, 1)), "1h".parse().unwrap());
        assert_eq!(
            windows,
            vec![TimeWindow {
                start: 1_625_097_600_000,
                end: 1_625_097_600_000
            }]
        );
    }

    #[test]
    fn range_shorter_than_one_interval_yields_one_window() {
        let windows = plan_windows_until(0, 30_000, "1m".parse().unwrap());
        assert_eq!(windows, vec![TimeWindow { start: 0, end: 30_000 }]);
    }

    #[test]
    fn reversed_range_yields_nothing() {
        assert!(plan_windows_until(10, 0, "1m".parse().unwrap()).is_empty());
    }

    #[test]
    fn fifteen_minute_month_splits_on_page_boundaries() {
        let interval: Interval = "15m".parse().unwrap();
        let windows = plan_windows(date(2021, 7, 1), Some(date(2021, 8, 1)), interval);
        // 31 days * 96 ticks = 2976 intervals, so ticks 0..=2976 over 3 pages.
        assert_eq!(windows.len(), 3);
        let step = 900_000;
        assert_eq!(windows[0].end - windows[0].start, 999 * step);
        assert_eq!(windows[1].start, windows[0].end + step);
        assert_eq!(windows[2].end, day_start_ms(date(2021, 8, 1)));
    }

    #[test]
    fn exactly_one_full_page_is_one_window() {
        let interval: Interval = "1h".parse().unwrap();
        let windows = plan_windows_until(0, 999 * 3_600_000, interval);
        assert_eq!(windows.len(), 1);
        let windows = plan_windows_until(0, 1000 * 3_600_000, interval);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[1], TimeWindow { start: 1000 * 3_600_000, end: 1000 * 3_600_000 });
    }

    #[test]
    fn tail_shorter_than_interval_is_skipped() {
        let interval: Interval = "1h".parse().unwrap();
        let windows = plan_windows_until(0, 999 * 3_600_000 + 60_000, interval);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].end, 999 * 3_600_000);
    }

    #[test]
    fn month_windows_use_calendar_months() {
        let interval: Interval = "1M".parse().unwrap();
        let windows = plan_windows(date(2017, 8, 1), Some(date(2021, 7, 1)), interval);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start, day_start_ms(date(2017, 8, 1)));
        assert_eq!(windows[0].end, day_start_ms(date(2021, 7, 1)));
    }

    #[test]
    fn open_end_plans_up_to_now() {
        let before = Utc::now().timestamp_millis();
        let windows = plan_windows(date(2024, 1, 1), None, "1d".parse().unwrap());
        let after = Utc::now().timestamp_millis();
        let last = windows.last().unwrap();
        assert!(last.end <= after);
        assert!(last.end + 86_400_000 > before);
    }
}
