use serde::Deserialize;

/// Binance API error response.
#[derive(Debug, Deserialize)]
pub struct BinanceApiErrorResponse {
    pub code: i64,
    pub msg: String,
}

/// Exchange info response (GET /api/v3/exchangeInfo), reduced to the symbol list.
#[derive(Debug, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    pub status: String,
    pub base_asset: String,
    pub quote_asset: String,
}

impl SymbolInfo {
    pub fn is_trading(&self) -> bool {
        self.status == "TRADING"
    }

    /// `BASE/QUOTE`, upper-cased.
    pub fn pair(&self) -> String {
        format!(
            "{}/{}",
            self.base_asset.to_ascii_uppercase(),
            self.quote_asset.to_ascii_uppercase()
        )
    }
}
