use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Months, Utc};

use crate::error::DownloadError;

/// Kline intervals accepted by the spot klines endpoint.
pub const SUPPORTED_INTERVALS: [&str; 15] = [
    "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w", "1M",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum IntervalUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl IntervalUnit {
    fn suffix(self) -> char {
        match self {
            Self::Minute => 'm',
            Self::Hour => 'h',
            Self::Day => 'd',
            Self::Week => 'w',
            Self::Month => 'M',
        }
    }

    /// Fixed length in seconds. Months have none.
    fn seconds(self) -> Option<i64> {
        match self {
            Self::Minute => Some(60),
            Self::Hour => Some(60 * 60),
            Self::Day => Some(24 * 60 * 60),
            Self::Week => Some(7 * 24 * 60 * 60),
            Self::Month => None,
        }
    }
}

/// A validated kline interval such as `15m` or `1M`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    count: u32,
    unit: IntervalUnit,
}

impl Interval {
    /// Fixed interval length in milliseconds, `None` for calendar months.
    pub fn fixed_millis(&self) -> Option<i64> {
        self.unit
            .seconds()
            .map(|secs| secs * 1_000 * i64::from(self.count))
    }

    /// Moves `ts_ms` forward by `steps` intervals.
    ///
    /// Month intervals advance by calendar months and keep the time of day;
    /// day-of-month is clamped to the target month's length. Returns `None`
    /// on overflow.
    pub fn advance(&self, ts_ms: i64, steps: u32) -> Option<i64> {
        match self.fixed_millis() {
            Some(step) => step
                .checked_mul(i64::from(steps))
                .and_then(|span| ts_ms.checked_add(span)),
            None => {
                let months = self.count.checked_mul(steps)?;
                let dt = DateTime::<Utc>::from_timestamp_millis(ts_ms)?;
                dt.checked_add_months(Months::new(months))
                    .map(|next| next.timestamp_millis())
            }
        }
    }
}

impl FromStr for Interval {
    type Err = DownloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !SUPPORTED_INTERVALS.contains(&s) {
            return Err(DownloadError::UnsupportedInterval(s.to_string()));
        }
        let (num, suffix) = s.split_at(s.len() - 1);
        let unit = match suffix {
            "m" => IntervalUnit::Minute,
            "h" => IntervalUnit::Hour,
            "d" => IntervalUnit::Day,
            "w" => IntervalUnit::Week,
            "M" => IntervalUnit::Month,
            _ => return Err(DownloadError::UnsupportedInterval(s.to_string())),
        };
        let count = num
            .parse()
            .map_err(|_| DownloadError::UnsupportedInterval(s.to_string()))?;
        Ok(Self { count, unit })
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.count, self.unit.suffix())
    }
}
