use serde::{Deserialize, Serialize};
use std::fmt;

/// Directional verdict for one (symbol, timeframe)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalLabel {
    StrongShort,
    Short,
    Neutral,
    Long,
    StrongLong,
}

/// Side a label leans to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Long,
    Short,
    Neutral,
}

impl SignalLabel {
    pub fn direction(&self) -> Direction {
        match self {
            SignalLabel::StrongLong | SignalLabel::Long => Direction::Long,
            SignalLabel::StrongShort | SignalLabel::Short => Direction::Short,
            SignalLabel::Neutral => Direction::Neutral,
        }
    }

    pub fn is_strong(&self) -> bool {
        matches!(self, SignalLabel::StrongLong | SignalLabel::StrongShort)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalLabel::StrongLong => "STRONG_LONG",
            SignalLabel::Long => "LONG",
            SignalLabel::Neutral => "NEUTRAL",
            SignalLabel::Short => "SHORT",
            SignalLabel::StrongShort => "STRONG_SHORT",
        }
    }
}

impl fmt::Display for SignalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
