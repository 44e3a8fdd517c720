use std::time::Duration;

use chrono::NaiveDate;
use indicatif::ProgressBar;

use crate::error::DownloadError;
use crate::market_data::MarketDataApi;
use crate::model::candle::{Candle, ColumnMode, RawKline};
use crate::model::interval::Interval;
use crate::window_planner::{TimeWindow, REQUEST_LIMIT};

/// Normalized klines for one symbol and interval, ordered by open time.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    symbol: String,
    interval: Interval,
    column_mode: ColumnMode,
    candles: Vec<Candle>,
}

impl Dataset {
    /// Types `rows`, projects them to `column_mode` and checks ordering.
    pub fn from_raw(
        symbol: &str,
        interval: Interval,
        column_mode: ColumnMode,
        rows: Vec<RawKline>,
    ) -> Result<Self, DownloadError> {
        let mut candles = Vec::with_capacity(rows.len());
        append_rows(&mut candles, 0, &rows, column_mode)?;
        Self::from_candles(symbol, interval, column_mode, candles)
    }

    fn from_candles(
        symbol: &str,
        interval: Interval,
        column_mode: ColumnMode,
        candles: Vec<Candle>,
    ) -> Result<Self, DownloadError> {
        if candles.is_empty() {
            return Err(DownloadError::EmptyResult {
                symbol: symbol.to_string(),
                interval: interval.to_string(),
            });
        }
        Ok(Self {
            symbol: symbol.to_string(),
            interval,
            column_mode,
            candles,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn column_mode(&self) -> ColumnMode {
        self.column_mode
    }

    pub fn columns(&self) -> Vec<&'static str> {
        self.column_mode.columns()
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// UTC calendar date of the first candle.
    pub fn real_start(&self) -> Option<NaiveDate> {
        self.candles.first().and_then(Candle::open_date)
    }

    /// UTC calendar date of the last candle.
    pub fn real_end(&self) -> Option<NaiveDate> {
        self.candles.last().and_then(Candle::open_date)
    }
}

/// Types `rows` onto the end of `candles`. `first_index` is the position of
/// `rows[0]` in the merged stream and only feeds error messages.
fn append_rows(
    candles: &mut Vec<Candle>,
    first_index: usize,
    rows: &[RawKline],
    column_mode: ColumnMode,
) -> Result<(), DownloadError> {
    for (offset, row) in rows.iter().enumerate() {
        let candle = Candle::from_raw(first_index + offset, row)?.project(column_mode);
        if let Some(prev) = candles.last() {
            if candle.open_time <= prev.open_time {
                return Err(DownloadError::OutOfOrder {
                    previous: prev.open_time,
                    current: candle.open_time,
                });
            }
        }
        candles.push(candle);
    }
    Ok(())
}

/// Fetches every window in order and builds the dataset.
///
/// `symbol` may be given as `BASE/QUOTE`; the separator is stripped before
/// it reaches the API. Each page is typed as soon as it arrives, so the first
/// failing or malformed page aborts the whole download.
pub async fn download<A>(
    api: &A,
    symbol: &str,
    interval: Interval,
    windows: &[TimeWindow],
    column_mode: ColumnMode,
    throttle: Option<Duration>,
) -> Result<Dataset, DownloadError>
where
    A: MarketDataApi + ?Sized,
{
    download_with_progress(
        api,
        symbol,
        interval,
        windows,
        column_mode,
        throttle,
        &ProgressBar::hidden(),
    )
    .await
}

/// Same as [`download`], advancing `progress` by one per fetched window.
pub async fn download_with_progress<A>(
    api: &A,
    symbol: &str,
    interval: Interval,
    windows: &[TimeWindow],
    column_mode: ColumnMode,
    throttle: Option<Duration>,
    progress: &ProgressBar,
) -> Result<Dataset, DownloadError>
where
    A: MarketDataApi + ?Sized,
{
    let api_symbol = symbol.replace('/', "");
    let mut candles: Vec<Candle> = Vec::new();
    let mut rows_seen = 0;
    progress.set_length(windows.len() as u64);

    for (idx, window) in windows.iter().enumerate() {
        let page = api
            .fetch_klines(&api_symbol, interval, window.start, window.end, REQUEST_LIMIT)
            .await?;
        tracing::info!(
            symbol = %api_symbol,
            %interval,
            window = idx + 1,
            total = windows.len(),
            rows = page.len(),
            "Fetched window"
        );
        append_rows(&mut candles, rows_seen, &page, column_mode)?;
        rows_seen += page.len();
        progress.inc(1);

        if let Some(pause) = throttle {
            if idx + 1 < windows.len() && !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
        }
    }

    let dataset = Dataset::from_candles(symbol, interval, column_mode, candles)?;
    progress.finish_with_message("done");
    tracing::info!(
        symbol,
        %interval,
        rows = dataset.len(),
        real_start = ?dataset.real_start(),
        real_end = ?dataset.real_end(),
        "Download complete"
    );
    Ok(dataset)
}
