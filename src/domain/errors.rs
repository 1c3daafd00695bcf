use std::time::Duration;
use thiserror::Error;

/// Errors raised while talking to the upstream candle API
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MarketDataError {
    #[error("Rate limit exceeded (HTTP 429)")]
    RateLimited,

    #[error("Temporarily banned by upstream (HTTP 418)")]
    TemporarilyBanned,

    #[error("Upstream returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Upstream request timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    #[error("Connection failed: {reason}")]
    Transport { reason: String },

    #[error("Invalid market data for {symbol}: {reason}")]
    MalformedPayload { symbol: String, reason: String },

    #[error("Not enough candles: got {got}, need {required}")]
    InsufficientCandles { got: usize, required: usize },

    #[error("No price available for {symbol}")]
    NoPriceAvailable { symbol: String },
}

/// How a failed upstream call is handled by the candle source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Wait, then retry once
    Retryable { backoff: Duration },
    /// Upstream unavailable: serve synthetic candles instead
    Degrade,
    /// Permanent for this unit: no result
    Drop,
}

/// Backoff schedule used to classify retryable failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffSchedule {
    pub rate_limit: Duration,
    pub ban: Duration,
    /// 418 is only retried against the primary exchange
    pub honor_ban: bool,
}

impl MarketDataError {
    pub fn failure_class(&self, schedule: &BackoffSchedule) -> FailureClass {
        match self {
            MarketDataError::RateLimited => FailureClass::Retryable {
                backoff: schedule.rate_limit,
            },
            MarketDataError::TemporarilyBanned if schedule.honor_ban => FailureClass::Retryable {
                backoff: schedule.ban,
            },
            MarketDataError::TemporarilyBanned => FailureClass::Degrade,
            MarketDataError::HttpStatus { status, .. } if *status >= 500 => FailureClass::Degrade,
            MarketDataError::HttpStatus { .. } => FailureClass::Drop,
            MarketDataError::Timeout { .. } | MarketDataError::Transport { .. } => {
                FailureClass::Degrade
            }
            MarketDataError::MalformedPayload { .. }
            | MarketDataError::InsufficientCandles { .. }
            | MarketDataError::NoPriceAvailable { .. } => FailureClass::Drop,
        }
    }

    /// Whether this failure says the upstream itself is unreachable
    pub fn is_unavailability(&self) -> bool {
        match self {
            MarketDataError::Timeout { .. } | MarketDataError::Transport { .. } => true,
            MarketDataError::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Request-level validation failures, reported before any upstream work
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScanRequestError {
    #[error("symbols must be a non-empty list")]
    EmptySymbols,

    #[error("timeframes must be a non-empty list")]
    EmptyTimeframes,

    #[error("Invalid timeframe: '{0}'. Valid options: 5m, 15m, 30m, 1h, 4h, 1d, 1w")]
    UnknownTimeframe(String),

    #[error("Invalid scanType: '{0}'. Must be 'all', 'long' or 'short'")]
    UnknownScanType(String),
}
