//! Prometheus metrics for klinescan
//!
//! All metrics use the `klinescan_` prefix. The registry is private to one
//! `ScanMetrics` instance so tests and embedders never collide on names.

use crate::domain::market::timeframe::Timeframe;
use crate::domain::signal::SignalLabel;
use prometheus::{CounterVec, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Unit outcome labels used by `klinescan_units_total`
pub mod outcome {
    pub const LIVE: &str = "live";
    pub const SYNTHETIC: &str = "synthetic";
    pub const DROPPED: &str = "dropped";
    pub const TIMED_OUT: &str = "timed_out";
}

#[derive(Clone)]
pub struct ScanMetrics {
    registry: Arc<Registry>,
    /// Scan units by outcome
    pub units_total: CounterVec,
    /// Classified signals by timeframe and label, before consolidation
    pub signals_total: CounterVec,
    /// Scans by status (completed, rejected)
    pub scans_total: CounterVec,
    /// Wall-clock duration of a scheduler run
    pub scan_duration_seconds: Histogram,
}

impl ScanMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let units_total = CounterVec::new(
            Opts::new("klinescan_units_total", "Scan units by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(units_total.clone()))?;

        let signals_total = CounterVec::new(
            Opts::new(
                "klinescan_signals_total",
                "Signals classified per timeframe and label",
            ),
            &["timeframe", "label"],
        )?;
        registry.register(Box::new(signals_total.clone()))?;

        let scans_total = CounterVec::new(
            Opts::new("klinescan_scans_total", "Scan requests by status"),
            &["status"],
        )?;
        registry.register(Box::new(scans_total.clone()))?;

        let scan_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "klinescan_scan_duration_seconds",
                "Scheduler run duration in seconds",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0]),
        )?;
        registry.register(Box::new(scan_duration_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            units_total,
            signals_total,
            scans_total,
            scan_duration_seconds,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn inc_units(&self, outcome: &str, count: u64) {
        if count > 0 {
            self.units_total
                .with_label_values(&[outcome])
                .inc_by(count as f64);
        }
    }

    pub fn inc_signal(&self, timeframe: Timeframe, label: SignalLabel) {
        self.signals_total
            .with_label_values(&[timeframe.binance_interval(), label.as_str()])
            .inc();
    }

    pub fn inc_scans(&self, status: &str) {
        self.scans_total.with_label_values(&[status]).inc();
    }

    pub fn observe_scan_duration(&self, seconds: f64) {
        self.scan_duration_seconds.observe(seconds);
    }
}
