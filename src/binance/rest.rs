use async_trait::async_trait;

use crate::error::DownloadError;
use crate::market_data::MarketDataApi;
use crate::model::candle::RawKline;
use crate::model::interval::Interval;

use super::types::{BinanceApiErrorResponse, ExchangeInfo};

pub const DEFAULT_REST_BASE_URL: &str = "https://api.binance.com";

/// Public (unsigned) spot market-data client.
pub struct BinanceRestClient {
    http: reqwest::Client,
    base_url: String,
}

impl BinanceRestClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, DownloadError> {
        let url = format!("{}{}", self.base_url, path);

        let resp = self.http.get(&url).query(query).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(%url, status = status.as_u16(), body = %body, "Binance request failed");
            if let Ok(err) = serde_json::from_str::<BinanceApiErrorResponse>(&body) {
                return Err(DownloadError::Api {
                    status: status.as_u16(),
                    code: err.code,
                    msg: err.msg,
                });
            }
            return Err(DownloadError::Api {
                status: status.as_u16(),
                code: 0,
                msg: body,
            });
        }

        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl MarketDataApi for BinanceRestClient {
    async fn list_symbols(&self) -> Result<Vec<String>, DownloadError> {
        let info: ExchangeInfo = self.get_json("/api/v3/exchangeInfo", &[]).await?;
        let symbols: Vec<String> = info
            .symbols
            .iter()
            .filter(|s| s.is_trading())
            .map(|s| s.pair())
            .collect();
        tracing::info!(count = symbols.len(), "Fetched tradable symbols");
        Ok(symbols)
    }

    async fn fetch_klines(
        &self,
        symbol: &str,
        interval: Interval,
        start_ms: i64,
        end_ms: i64,
        limit: u32,
    ) -> Result<Vec<RawKline>, DownloadError> {
        let query = [
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
            ("startTime", start_ms.to_string()),
            ("endTime", end_ms.to_string()),
            ("limit", limit.to_string()),
        ];
        let rows: Vec<RawKline> = self.get_json("/api/v3/klines", &query).await?;
        tracing::debug!(symbol, %interval, start_ms, end_ms, rows = rows.len(), "Fetched kline page");
        Ok(rows)
    }
}
