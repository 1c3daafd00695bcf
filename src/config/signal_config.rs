//! Signal classification thresholds parsing from environment variables.

use super::parse_env;
use crate::application::signals::SignalThresholds;
use anyhow::{Context, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct SignalEnvConfig {
    pub strong_change_pct: f64,
    pub weak_change_pct: f64,
    pub volume_ratio_confirm: f64,
    pub strength_confirm: f64,
}

impl Default for SignalEnvConfig {
    fn default() -> Self {
        Self {
            strong_change_pct: 0.5,
            weak_change_pct: 0.2,
            volume_ratio_confirm: 1.2,
            strength_confirm: 25.0,
        }
    }
}

impl SignalEnvConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            strong_change_pct: parse_env("SIGNAL_STRONG_CHANGE_PCT", 0.5f64)?,
            weak_change_pct: parse_env("SIGNAL_WEAK_CHANGE_PCT", 0.2f64)?,
            volume_ratio_confirm: parse_env("SIGNAL_VOLUME_RATIO", 1.2f64)?,
            strength_confirm: parse_env("SIGNAL_STRENGTH_CONFIRM", 25.0f64)?,
        };
        // Fail at load time rather than on the first scan
        config.thresholds()?;
        Ok(config)
    }

    pub fn thresholds(&self) -> Result<SignalThresholds> {
        SignalThresholds::new(
            self.strong_change_pct,
            self.weak_change_pct,
            self.volume_ratio_confirm,
            self.strength_confirm,
        )
        .context("Invalid signal thresholds")
    }
}
