//! Binance Kline Feed
//!
//! Public REST endpoints only, no API key:
//! - `GET /api/v3/klines?symbol&interval&limit`
//! - `GET /api/v3/ticker/price?symbol`
//!
//! Status codes are mapped to [`MarketDataError`] variants; the retry and
//! fallback decisions are made by `CandleSource`.

use crate::domain::errors::MarketDataError;
use crate::domain::market::candle::Candle;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::KlineFeed;
use crate::infrastructure::core::http_client_factory::HttpClientFactory;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// Upstream error bodies are truncated to this many characters
const MAX_ERROR_BODY: usize = 200;

pub struct BinanceKlineFeed {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl BinanceKlineFeed {
    pub fn builder() -> BinanceKlineFeedBuilder {
        BinanceKlineFeedBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, MarketDataError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                self.transport_error(e)
            } else {
                MarketDataError::MalformedPayload {
                    symbol: query
                        .iter()
                        .find(|(k, _)| *k == "symbol")
                        .map(|(_, v)| v.to_string())
                        .unwrap_or_default(),
                    reason: e.to_string(),
                }
            }
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> MarketDataError {
        if err.is_timeout() {
            MarketDataError::Timeout {
                duration_ms: self.timeout.as_millis() as u64,
            }
        } else {
            MarketDataError::Transport {
                reason: err.to_string(),
            }
        }
    }
}

#[derive(Default)]
pub struct BinanceKlineFeedBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl BinanceKlineFeedBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> BinanceKlineFeed {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(12));
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        BinanceKlineFeed {
            client: HttpClientFactory::create_client(timeout),
            base_url,
            timeout,
        }
    }
}

#[async_trait]
impl KlineFeed for BinanceKlineFeed {
    async fn klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let limit = limit.to_string();
        let payload = self
            .get_json(
                &url,
                &[
                    ("symbol", symbol),
                    ("interval", timeframe.binance_interval()),
                    ("limit", limit.as_str()),
                ],
            )
            .await?;

        let candles = parse_klines(symbol, &payload)?;
        debug!(
            "BinanceKlineFeed: Fetched {} {} bars for {}",
            candles.len(),
            timeframe,
            symbol
        );
        Ok(candles)
    }

    async fn latest_price(&self, symbol: &str) -> Result<f64, MarketDataError> {
        #[derive(Debug, Deserialize)]
        struct PriceTicker {
            price: String,
        }

        let url = format!("{}/api/v3/ticker/price", self.base_url);
        let payload = self.get_json(&url, &[("symbol", symbol)]).await?;

        let malformed = |reason: String| MarketDataError::MalformedPayload {
            symbol: symbol.to_string(),
            reason,
        };
        let ticker: PriceTicker =
            serde_json::from_value(payload).map_err(|e| malformed(e.to_string()))?;
        ticker
            .price
            .parse::<f64>()
            .map_err(|e| malformed(format!("price '{}': {}", ticker.price, e)))
    }
}

fn status_error(status: StatusCode, body: &str) -> MarketDataError {
    match status.as_u16() {
        429 => MarketDataError::RateLimited,
        418 => MarketDataError::TemporarilyBanned,
        code => MarketDataError::HttpStatus {
            status: code,
            body: body.chars().take(MAX_ERROR_BODY).collect(),
        },
    }
}

/// Parse a klines payload: an array of
/// `[open_time, open, high, low, close, volume, close_time, ...]` tuples with
/// prices as decimal strings. Any bad row rejects the whole payload.
pub fn parse_klines(symbol: &str, payload: &Value) -> Result<Vec<Candle>, MarketDataError> {
    let malformed = |reason: String| MarketDataError::MalformedPayload {
        symbol: symbol.to_string(),
        reason,
    };

    let rows = payload
        .as_array()
        .ok_or_else(|| malformed("klines payload is not an array".to_string()))?;

    let mut candles: Vec<Candle> = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let candle = parse_row(row).ok_or_else(|| malformed(format!("bad kline row {}", index)))?;
        if !candle.is_consistent() {
            return Err(malformed(format!("inconsistent OHLC in row {}", index)));
        }
        if let Some(prev) = candles.last()
            && candle.open_time <= prev.open_time
        {
            return Err(malformed(format!("row {} is out of order", index)));
        }
        candles.push(candle);
    }
    Ok(candles)
}

fn parse_row(row: &Value) -> Option<Candle> {
    let fields = row.as_array()?;
    if fields.len() < 7 {
        return None;
    }

    Some(Candle {
        open_time: fields[0].as_i64()?,
        open: number(&fields[1])?,
        high: number(&fields[2])?,
        low: number(&fields[3])?,
        close: number(&fields[4])?,
        volume: number(&fields[5])?,
        close_time: fields[6].as_i64()?,
    })
}

/// Binance sends decimals as strings; plain JSON numbers are accepted too
fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::String(s) => s.parse::<f64>().ok()?,
        other => other.as_f64()?,
    };
    parsed.is_finite().then_some(parsed)
}
