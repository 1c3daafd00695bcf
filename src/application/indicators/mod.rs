// Indicator math, one concern per module
pub mod atr;
pub mod directional;
pub mod engine;
pub mod session;
pub mod structure;
pub mod volatility;

pub use engine::{IndicatorConfig, IndicatorEngine};
