//! Per-symbol reference data used when upstream cannot answer.
//!
//! Reference prices seed the synthetic candle walk and serve as the
//! last-known price; volatilities bound the per-step noise of the walk.

use std::collections::HashMap;

const DEFAULT_REFERENCE_PRICE: f64 = 100.0;
const DEFAULT_VOLATILITY: f64 = 0.03;

/// Immutable lookup tables, built once and shared by the candle source
/// and the synthetic generator.
#[derive(Debug, Clone)]
pub struct MarketProfile {
    reference_prices: HashMap<String, f64>,
    volatilities: HashMap<String, f64>,
    default_price: f64,
    default_volatility: f64,
}

impl Default for MarketProfile {
    fn default() -> Self {
        let table: [(&str, f64, f64); 15] = [
            ("BTCUSDT", 65_000.0, 0.015),
            ("ETHUSDT", 3_400.0, 0.02),
            ("BNBUSDT", 580.0, 0.02),
            ("ADAUSDT", 0.45, 0.035),
            ("XRPUSDT", 0.60, 0.035),
            ("DOTUSDT", 7.0, 0.035),
            ("LTCUSDT", 80.0, 0.025),
            ("LINKUSDT", 15.0, 0.035),
            ("BCHUSDT", 450.0, 0.03),
            ("EOSUSDT", 0.80, 0.04),
            ("XLMUSDT", 0.11, 0.035),
            ("ATOMUSDT", 8.0, 0.035),
            ("SOLUSDT", 150.0, 0.03),
            ("MATICUSDT", 0.70, 0.04),
            ("AVAXUSDT", 35.0, 0.035),
        ];

        let mut profile = Self::empty();
        for (symbol, price, volatility) in table {
            profile = profile.with_symbol(symbol, price, volatility);
        }
        profile
    }
}

impl MarketProfile {
    pub fn empty() -> Self {
        Self {
            reference_prices: HashMap::new(),
            volatilities: HashMap::new(),
            default_price: DEFAULT_REFERENCE_PRICE,
            default_volatility: DEFAULT_VOLATILITY,
        }
    }

    /// Adds or replaces one symbol. Non-positive or non-finite inputs are ignored.
    pub fn with_symbol(mut self, symbol: &str, price: f64, volatility: f64) -> Self {
        let key = symbol.to_uppercase();
        if price.is_finite() && price > 0.0 {
            self.reference_prices.insert(key.clone(), price);
        }
        if volatility.is_finite() && volatility >= 0.0 {
            self.volatilities.insert(key, volatility.min(0.5));
        }
        self
    }

    /// Symbols with a known reference price
    pub fn known_price(&self, symbol: &str) -> Option<f64> {
        self.reference_prices.get(&symbol.to_uppercase()).copied()
    }

    /// Reference price, or the generic default for unknown symbols
    pub fn reference_price(&self, symbol: &str) -> f64 {
        self.known_price(symbol).unwrap_or(self.default_price)
    }

    /// Per-step fractional volatility
    pub fn volatility(&self, symbol: &str) -> f64 {
        self.volatilities
            .get(&symbol.to_uppercase())
            .copied()
            .unwrap_or(self.default_volatility)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.reference_prices.keys().map(String::as_str)
    }
}
