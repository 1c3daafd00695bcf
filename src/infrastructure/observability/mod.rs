//! Scan observability: Prometheus counters rendered on demand.
//!
//! Nothing is served over HTTP. Callers pull the text exposition with
//! [`ScanMetrics::render`].

pub mod metrics;

pub use metrics::ScanMetrics;
