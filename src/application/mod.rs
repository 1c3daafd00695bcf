pub mod indicators;
pub mod market_data;
pub mod scan;
pub mod signals;
