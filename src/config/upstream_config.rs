//! Upstream exchange configuration: endpoint, timeouts, backoff and circuit breaker.

use super::parse_env;
use crate::domain::errors::BackoffSchedule;
use crate::infrastructure::binance::market_data::DEFAULT_BASE_URL;
use crate::infrastructure::core::circuit_breaker::CircuitBreaker;
use anyhow::{Result, ensure};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamEnvConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub rate_limit_backoff: Duration,
    pub ban_backoff: Duration,
    /// 418 is retried only against this exchange
    pub primary_exchange: String,
    pub circuit_failure_threshold: usize,
    pub circuit_cooldown: Duration,
}

impl Default for UpstreamEnvConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_millis(12_000),
            rate_limit_backoff: Duration::from_millis(2_500),
            ban_backoff: Duration::from_millis(60_000),
            primary_exchange: "BINANCE".to_string(),
            circuit_failure_threshold: 5,
            circuit_cooldown: Duration::from_secs(60),
        }
    }
}

impl UpstreamEnvConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            base_url: env::var("BINANCE_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_millis(parse_env("UPSTREAM_TIMEOUT_MS", 12_000u64)?),
            rate_limit_backoff: Duration::from_millis(parse_env("RATE_LIMIT_BACKOFF_MS", 2_500u64)?),
            ban_backoff: Duration::from_millis(parse_env("BAN_BACKOFF_MS", 60_000u64)?),
            primary_exchange: env::var("PRIMARY_EXCHANGE")
                .unwrap_or_else(|_| "BINANCE".to_string())
                .trim()
                .to_uppercase(),
            circuit_failure_threshold: parse_env("CIRCUIT_FAILURE_THRESHOLD", 5usize)?,
            circuit_cooldown: Duration::from_secs(parse_env("CIRCUIT_COOLDOWN_SECS", 60u64)?),
        };

        ensure!(!config.timeout.is_zero(), "UPSTREAM_TIMEOUT_MS must be positive");
        ensure!(
            config.circuit_failure_threshold > 0,
            "CIRCUIT_FAILURE_THRESHOLD must be positive"
        );
        Ok(config)
    }

    pub fn backoff_for(&self, exchange: &str) -> BackoffSchedule {
        BackoffSchedule {
            rate_limit: self.rate_limit_backoff,
            ban: self.ban_backoff,
            honor_ban: exchange.eq_ignore_ascii_case(&self.primary_exchange),
        }
    }

    pub fn circuit_breaker(&self) -> CircuitBreaker {
        CircuitBreaker::new(
            "Upstream",
            self.circuit_failure_threshold,
            1,
            self.circuit_cooldown,
        )
    }
}
