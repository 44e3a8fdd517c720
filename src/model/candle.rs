use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::DownloadError;

/// One kline row exactly as the API returns it: a JSON array of mixed
/// numbers and decimal strings.
pub type RawKline = Vec<Value>;

/// Fields per raw row: eleven data fields plus the trailing ignore flag.
pub const RAW_KLINE_FIELDS: usize = 12;

pub const OHLCV_COLUMNS: [&str; 6] = ["open_time", "open", "high", "low", "close", "volume"];

pub const EXTENDED_COLUMNS: [&str; 4] = [
    "quote_volume",
    "trade_count",
    "taker_buy_base_volume",
    "taker_buy_quote_volume",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnMode {
    #[default]
    Ohlcv,
    Extended,
}

impl ColumnMode {
    pub fn columns(self) -> Vec<&'static str> {
        match self {
            Self::Ohlcv => OHLCV_COLUMNS.to_vec(),
            Self::Extended => OHLCV_COLUMNS
                .iter()
                .chain(EXTENDED_COLUMNS.iter())
                .copied()
                .collect(),
        }
    }
}

impl fmt::Display for ColumnMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ohlcv => f.write_str("ohlcv"),
            Self::Extended => f.write_str("extended"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtendedFields {
    pub quote_volume: f64,
    pub trade_count: u64,
    pub taker_buy_base_volume: f64,
    pub taker_buy_quote_volume: f64,
}

/// A typed kline. `close_time` is not kept: it is always the next candle's
/// `open_time` minus one millisecond.
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    /// Open time in epoch milliseconds.
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub extended: Option<ExtendedFields>,
}

impl Candle {
    /// Types a raw API row. `index` is the row position in the merged buffer
    /// and only feeds error messages.
    pub fn from_raw(index: usize, row: &[Value]) -> Result<Self, DownloadError> {
        if row.len() != RAW_KLINE_FIELDS {
            return Err(DownloadError::MalformedRow {
                index,
                reason: format!(
                    "expected {} fields, got {}",
                    RAW_KLINE_FIELDS,
                    row.len()
                ),
            });
        }

        let open_time = field_i64(index, row, 0, "open_time")?;
        let open = field_f64(index, row, 1, "open")?;
        let high = field_f64(index, row, 2, "high")?;
        let low = field_f64(index, row, 3, "low")?;
        let close = field_f64(index, row, 4, "close")?;
        let volume = field_f64(index, row, 5, "volume")?;
        // close_time is checked but not carried.
        field_i64(index, row, 6, "close_time")?;
        let extended = ExtendedFields {
            quote_volume: field_f64(index, row, 7, "quote_volume")?,
            trade_count: field_u64(index, row, 8, "trade_count")?,
            taker_buy_base_volume: field_f64(index, row, 9, "taker_buy_base_volume")?,
            taker_buy_quote_volume: field_f64(index, row, 10, "taker_buy_quote_volume")?,
        };

        Ok(Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
            extended: Some(extended),
        })
    }

    /// Keeps or drops the extended fields to match `mode`.
    pub fn project(mut self, mode: ColumnMode) -> Self {
        if mode == ColumnMode::Ohlcv {
            self.extended = None;
        }
        self
    }

    pub fn open_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.open_time)
    }

    pub fn open_date(&self) -> Option<NaiveDate> {
        self.open_datetime().map(|dt| dt.date_naive())
    }
}

fn malformed(index: usize, name: &str, value: &Value) -> DownloadError {
    DownloadError::MalformedRow {
        index,
        reason: format!("field {} has non-numeric value {}", name, value),
    }
}

fn field_f64(index: usize, row: &[Value], pos: usize, name: &str) -> Result<f64, DownloadError> {
    let value = &row[pos];
    let parsed = match value {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| malformed(index, name, value))
}

fn field_i64(index: usize, row: &[Value], pos: usize, name: &str) -> Result<i64, DownloadError> {
    let value = &row[pos];
    let parsed = match value {
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    };
    parsed.ok_or_else(|| malformed(index, name, value))
}

fn field_u64(index: usize, row: &[Value], pos: usize, name: &str) -> Result<u64, DownloadError> {
    let value = &row[pos];
    let parsed = match value {
        Value::String(s) => s.trim().parse::<u64>().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    };
    parsed.ok_or_else(|| malformed(index, name, value))
}
