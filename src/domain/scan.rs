use crate::domain::errors::ScanRequestError;
use crate::domain::indicators::IndicatorBundle;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::signal::{Direction, SignalLabel};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_EXCHANGE: &str = "BINANCE";

/// Which signal direction the caller wants back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanType {
    #[default]
    All,
    Long,
    Short,
}

impl ScanType {
    /// Direction a representative must carry to be reported, if any
    pub fn required_direction(&self) -> Option<Direction> {
        match self {
            ScanType::All => None,
            ScanType::Long => Some(Direction::Long),
            ScanType::Short => Some(Direction::Short),
        }
    }
}

impl FromStr for ScanType {
    type Err = ScanRequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "" => Ok(ScanType::All),
            "long" => Ok(ScanType::Long),
            "short" => Ok(ScanType::Short),
            other => Err(ScanRequestError::UnknownScanType(other.to_string())),
        }
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanType::All => f.write_str("all"),
            ScanType::Long => f.write_str("long"),
            ScanType::Short => f.write_str("short"),
        }
    }
}

/// Request body as sent by a client, before validation
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawScanRequest {
    #[serde(default)]
    pub symbols: Option<Vec<String>>,
    #[serde(default)]
    pub timeframes: Option<Vec<String>>,
    #[serde(default)]
    pub scan_type: Option<String>,
    #[serde(default)]
    pub exchange: Option<String>,
}

/// Validated scan request. Immutable for the lifetime of one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    symbols: Vec<String>,
    timeframes: Vec<Timeframe>,
    scan_type: ScanType,
    exchange: String,
}

impl ScanRequest {
    /// Validate and normalize.
    ///
    /// Symbols are trimmed, upper-cased and deduplicated in order, then cut to
    /// `max_symbols`. Timeframes are deduplicated and sorted by priority, highest first.
    pub fn new(
        symbols: Vec<String>,
        timeframes: Vec<Timeframe>,
        scan_type: ScanType,
        exchange: impl Into<String>,
        max_symbols: usize,
    ) -> Result<Self, ScanRequestError> {
        let mut seen = HashSet::new();
        let mut symbols: Vec<String> = symbols
            .into_iter()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .filter(|s| seen.insert(s.clone()))
            .collect();

        if symbols.is_empty() {
            return Err(ScanRequestError::EmptySymbols);
        }

        if max_symbols > 0 && symbols.len() > max_symbols {
            warn!(
                "ScanRequest: {} symbols requested, limiting to first {}",
                symbols.len(),
                max_symbols
            );
            symbols.truncate(max_symbols);
        }

        let mut timeframes = timeframes;
        timeframes.sort_by_key(|tf| std::cmp::Reverse(tf.priority()));
        timeframes.dedup();
        if timeframes.is_empty() {
            return Err(ScanRequestError::EmptyTimeframes);
        }

        let exchange = exchange.into().trim().to_uppercase();
        let exchange = if exchange.is_empty() {
            DEFAULT_EXCHANGE.to_string()
        } else {
            exchange
        };

        Ok(Self {
            symbols,
            timeframes,
            scan_type,
            exchange,
        })
    }

    /// Validate a raw client body. Absent and empty lists are both rejected;
    /// unknown timeframe labels fall back to 1h.
    pub fn from_raw(raw: RawScanRequest, max_symbols: usize) -> Result<Self, ScanRequestError> {
        let symbols = raw.symbols.unwrap_or_default();
        if symbols.iter().all(|s| s.trim().is_empty()) {
            return Err(ScanRequestError::EmptySymbols);
        }

        let labels = raw.timeframes.unwrap_or_default();
        let timeframes: Vec<Timeframe> = labels
            .iter()
            .filter(|label| !label.trim().is_empty())
            .map(|label| {
                label.parse::<Timeframe>().unwrap_or_else(|_| {
                    warn!("ScanRequest: unknown timeframe '{}', scanning as 1h", label);
                    Timeframe::OneHour
                })
            })
            .collect();
        if timeframes.is_empty() {
            return Err(ScanRequestError::EmptyTimeframes);
        }

        let scan_type = match raw.scan_type.as_deref() {
            Some(s) => s.parse::<ScanType>()?,
            None => ScanType::All,
        };

        Self::new(
            symbols,
            timeframes,
            scan_type,
            raw.exchange.unwrap_or_default(),
            max_symbols,
        )
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn timeframes(&self) -> &[Timeframe] {
        &self.timeframes
    }

    pub fn scan_type(&self) -> ScanType {
        self.scan_type
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// Number of (symbol, timeframe) units this request expands to
    pub fn unit_count(&self) -> usize {
        self.symbols.len() * self.timeframes.len()
    }
}

/// Outcome of the pipeline for one (symbol, timeframe)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub exchange: String,
    pub price: f64,
    #[serde(flatten)]
    pub indicators: IndicatorBundle,
    pub final_signal: SignalLabel,
    /// True when the candles came from the synthetic generator
    pub synthetic: bool,
}

/// Unit accounting for one scheduler run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    pub total_units: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub live: usize,
    pub synthetic: usize,
    pub dropped: usize,
    pub timed_out: usize,
}

/// Envelope handed to the transport layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub success: bool,
    pub results: Vec<ScanResult>,
    pub total: usize,
    pub scanned_symbols: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<ScanStats>,
}

impl ScanResponse {
    pub fn completed(results: Vec<ScanResult>, scanned_symbols: usize, stats: ScanStats) -> Self {
        Self {
            success: true,
            total: results.len(),
            results,
            scanned_symbols,
            error: None,
            stats: Some(stats),
        }
    }

    pub fn rejected(error: &ScanRequestError) -> Self {
        Self {
            success: false,
            results: Vec::new(),
            total: 0,
            scanned_symbols: 0,
            error: Some(error.to_string()),
            stats: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(symbols: &[&str], timeframes: &[&str], scan_type: Option<&str>) -> RawScanRequest {
        RawScanRequest {
            symbols: Some(symbols.iter().map(|s| s.to_string()).collect()),
            timeframes: Some(timeframes.iter().map(|s| s.to_string()).collect()),
            scan_type: scan_type.map(str::to_string),
            exchange: None,
        }
    }

    #[test]
    fn test_symbols_are_normalized_and_deduplicated() {
        let request = ScanRequest::from_raw(
            raw(&["btcusdt", " ETHUSDT", "BTCUSDT", ""], &["1h"], None),
            100,
        )
        .unwrap();
        assert_eq!(request.symbols(), ["BTCUSDT", "ETHUSDT"]);
        assert_eq!(request.exchange(), DEFAULT_EXCHANGE);
        assert_eq!(request.scan_type(), ScanType::All);
    }

    #[test]
    fn test_timeframes_sorted_by_priority() {
        let request =
            ScanRequest::from_raw(raw(&["BTCUSDT"], &["15m", "1d", "1h", "15m"], None), 100)
                .unwrap();
        assert_eq!(
            request.timeframes(),
            [Timeframe::OneDay, Timeframe::OneHour, Timeframe::FifteenMin]
        );
        assert_eq!(request.unit_count(), 3);
    }

    #[test]
    fn test_unknown_timeframe_scans_as_one_hour() {
        let request = ScanRequest::from_raw(raw(&["BTCUSDT"], &["2h"], None), 100).unwrap();
        assert_eq!(request.timeframes(), [Timeframe::OneHour]);

        let request =
            ScanRequest::from_raw(raw(&["BTCUSDT"], &["3h", "1h", "4h"], None), 100).unwrap();
        assert_eq!(request.timeframes(), [Timeframe::FourHour, Timeframe::OneHour]);
        assert_eq!(request.unit_count(), 2);
    }

    #[test]
    fn test_rejections() {
        assert_eq!(
            ScanRequest::from_raw(raw(&[], &["1h"], None), 100),
            Err(ScanRequestError::EmptySymbols)
        );
        assert_eq!(
            ScanRequest::from_raw(RawScanRequest::default(), 100),
            Err(ScanRequestError::EmptySymbols)
        );
        assert_eq!(
            ScanRequest::from_raw(raw(&["BTCUSDT"], &[], None), 100),
            Err(ScanRequestError::EmptyTimeframes)
        );
        assert_eq!(
            ScanRequest::from_raw(raw(&["BTCUSDT"], &["1h"], Some("sideways")), 100),
            Err(ScanRequestError::UnknownScanType("sideways".to_string()))
        );
    }

    #[test]
    fn test_symbol_cap() {
        let symbols: Vec<String> = (0..5).map(|i| format!("C{}USDT", i)).collect();
        let request = ScanRequest::new(
            symbols,
            vec![Timeframe::OneHour],
            ScanType::Long,
            "binance",
            3,
        )
        .unwrap();
        assert_eq!(request.symbols().len(), 3);
        assert_eq!(request.exchange(), "BINANCE");
    }

    #[test]
    fn test_raw_request_wire_format() {
        let body = r#"{"symbols":["BTCUSDT"],"timeframes":["1h","4h"],"scanType":"long","exchange":"BINANCE"}"#;
        let parsed: RawScanRequest = serde_json::from_str(body).unwrap();
        let request = ScanRequest::from_raw(parsed, 100).unwrap();
        assert_eq!(request.scan_type(), ScanType::Long);
        assert_eq!(request.timeframes(), [Timeframe::FourHour, Timeframe::OneHour]);
    }

    #[test]
    fn test_rejected_envelope() {
        let response = ScanResponse::rejected(&ScanRequestError::EmptyTimeframes);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["scannedSymbols"], 0);
        assert!(json["error"].as_str().unwrap().contains("timeframes"));
        assert!(json.get("stats").is_none());
    }
}
