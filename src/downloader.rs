use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use indicatif::ProgressBar;

use crate::error::DownloadError;
use crate::market_data::MarketDataApi;
use crate::model::candle::ColumnMode;
use crate::model::interval::Interval;
use crate::pipeline::{self, Dataset};
use crate::window_planner::plan_windows;

/// Everything one download invocation needs.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    /// `BASE/QUOTE` or the bare exchange symbol.
    pub symbol: String,
    /// Interval string, validated before any request is made.
    pub interval: String,
    pub start: NaiveDate,
    /// `None` downloads up to now.
    pub end: Option<NaiveDate>,
    pub save_to: Option<PathBuf>,
    pub throttle: Option<Duration>,
    pub column_mode: ColumnMode,
}

impl DownloadRequest {
    pub fn new(symbol: &str, interval: &str, start: NaiveDate) -> Self {
        Self {
            symbol: symbol.to_string(),
            interval: interval.to_string(),
            start,
            end: None,
            save_to: None,
            throttle: None,
            column_mode: ColumnMode::default(),
        }
    }
}

/// Validates the request, plans the windows and runs the fetch pipeline.
pub async fn download_full_klines<A>(
    api: &A,
    request: &DownloadRequest,
) -> Result<Dataset, DownloadError>
where
    A: MarketDataApi + ?Sized,
{
    download_full_klines_with_progress(api, request, &ProgressBar::hidden()).await
}

/// [`download_full_klines`] reporting one `progress` tick per window.
pub async fn download_full_klines_with_progress<A>(
    api: &A,
    request: &DownloadRequest,
    progress: &ProgressBar,
) -> Result<Dataset, DownloadError>
where
    A: MarketDataApi + ?Sized,
{
    let interval: Interval = request.interval.parse()?;
    if let Some(end) = request.end {
        if request.start > end {
            return Err(DownloadError::InvalidRange {
                start: request.start.to_string(),
                end: end.to_string(),
            });
        }
    }

    let windows = plan_windows(request.start, request.end, interval);
    if windows.is_empty() {
        return Err(DownloadError::InvalidRange {
            start: request.start.to_string(),
            end: "now".to_string(),
        });
    }

    tracing::info!(
        symbol = %request.symbol,
        %interval,
        start = %request.start,
        end = ?request.end,
        windows = windows.len(),
        column_mode = %request.column_mode,
        "Starting kline download"
    );

    pipeline::download_with_progress(
        api,
        &request.symbol,
        interval,
        &windows,
        request.column_mode,
        request.throttle,
        progress,
    )
    .await
}
