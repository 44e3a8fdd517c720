use thiserror::Error;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("interval {0} is not supported")]
    UnsupportedInterval(String),

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: String, end: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("binance API error (status {status}, code {code}): {msg}")]
    Api { status: u16, code: i64, msg: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no klines returned for {symbol} {interval} in the requested range")]
    EmptyResult { symbol: String, interval: String },

    #[error("malformed kline row {index}: {reason}")]
    MalformedRow { index: usize, reason: String },

    #[error("klines out of order: open_time {current} follows {previous}")]
    OutOfOrder { previous: i64, current: i64 },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    /// True for failures raised by the HTTP collaborator rather than by local validation.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Api { .. } | Self::Json(_))
    }
}
