pub mod consolidation;
pub mod scanner;
pub mod scheduler;

pub use consolidation::ConsolidationFilter;
pub use scanner::MarketScanner;
pub use scheduler::{Grouping, ScanOutcome, ScanScheduler, SchedulerConfig};
