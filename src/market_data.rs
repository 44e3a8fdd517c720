use async_trait::async_trait;

use crate::error::DownloadError;
use crate::model::candle::RawKline;
use crate::model::interval::Interval;

/// The two calls the downloader needs from a market-data provider.
///
/// Implementations must return a page's rows in chronological order and
/// must not retry on their own.
#[async_trait]
pub trait MarketDataApi: Send + Sync {
    /// Actively tradable symbols in `BASE/QUOTE` form.
    async fn list_symbols(&self) -> Result<Vec<String>, DownloadError>;

    /// Up to `limit` raw klines for `symbol` (no separator) with open times
    /// in `[start_ms, end_ms]`.
    async fn fetch_klines(
        &self,
        symbol: &str,
        interval: Interval,
        start_ms: i64,
        end_ms: i64,
        limit: u32,
    ) -> Result<Vec<RawKline>, DownloadError>;
}
