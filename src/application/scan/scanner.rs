use crate::application::scan::consolidation::ConsolidationFilter;
use crate::application::scan::scheduler::ScanScheduler;
use crate::domain::scan::{RawScanRequest, ScanRequest, ScanResponse};
use crate::infrastructure::observability::ScanMetrics;
use crate::infrastructure::observability::metrics::outcome;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Request in, envelope out: validation, scheduling and consolidation
pub struct MarketScanner {
    scheduler: ScanScheduler,
    filter: ConsolidationFilter,
    max_symbols: usize,
    metrics: Option<Arc<ScanMetrics>>,
}

impl MarketScanner {
    pub fn new(scheduler: ScanScheduler, max_symbols: usize) -> Self {
        Self {
            scheduler,
            filter: ConsolidationFilter::new(),
            max_symbols,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<ScanMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Validate a client body first; a bad request never reaches the scheduler
    pub async fn scan_raw(&self, raw: RawScanRequest) -> ScanResponse {
        match ScanRequest::from_raw(raw, self.max_symbols) {
            Ok(request) => self.scan(&request).await,
            Err(e) => {
                warn!("MarketScanner: Rejected scan request: {}", e);
                if let Some(metrics) = &self.metrics {
                    metrics.inc_scans("rejected");
                }
                ScanResponse::rejected(&e)
            }
        }
    }

    pub async fn scan(&self, request: &ScanRequest) -> ScanResponse {
        let started = Instant::now();
        let run = self.scheduler.run(request).await;

        if let Some(metrics) = &self.metrics {
            metrics.observe_scan_duration(started.elapsed().as_secs_f64());
            metrics.inc_scans("completed");
            metrics.inc_units(outcome::LIVE, run.stats.live as u64);
            metrics.inc_units(outcome::SYNTHETIC, run.stats.synthetic as u64);
            metrics.inc_units(outcome::DROPPED, run.stats.dropped as u64);
            metrics.inc_units(outcome::TIMED_OUT, run.stats.timed_out as u64);
            for result in &run.results {
                metrics.inc_signal(result.timeframe, result.final_signal);
            }
        }

        let results = self.filter.consolidate(run.results, request.scan_type());
        info!(
            "MarketScanner: {} scan over {} symbols returned {} results",
            request.scan_type(),
            request.symbols().len(),
            results.len()
        );

        ScanResponse::completed(results, request.symbols().len(), run.stats)
    }
}
