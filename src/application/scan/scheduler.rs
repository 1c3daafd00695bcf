//! Scan Scheduler
//!
//! Expands a request into (symbol, timeframe) units and drives each one
//! through fetch, indicators and classification. Units run in small
//! concurrent batches with a pause between batches so the shared upstream
//! rate limit is respected. A unit that fails produces no result and never
//! affects its neighbours. The whole run is bounded by a wall-clock deadline;
//! units still in flight at the deadline are left to finish on their own and
//! their late results are discarded.

use crate::application::indicators::IndicatorEngine;
use crate::application::market_data::candle_source::{CandleSource, QuoteSource};
use crate::application::signals::SignalClassifier;
use crate::domain::errors::MarketDataError;
use crate::domain::market::candle::CandleSeries;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::scan::{ScanRequest, ScanResult, ScanStats};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// How units are packed into batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Grouping {
    /// Each batch holds `batch_size` independent units
    #[default]
    Unit,
    /// Each batch holds `batch_size` symbols; a symbol walks its timeframes
    /// one after another with `unit_delay` in between
    Symbol,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub unit_delay: Duration,
    pub deadline: Duration,
    pub candle_limit: usize,
    pub min_candles: usize,
    pub grouping: Grouping,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_size: 2,
            batch_delay: Duration::from_millis(2000),
            unit_delay: Duration::from_millis(300),
            deadline: Duration::from_secs(60),
            candle_limit: 50,
            min_candles: 10,
            grouping: Grouping::Unit,
        }
    }
}

/// Results of one run in arbitrary completion order, plus unit accounting
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub results: Vec<ScanResult>,
    pub stats: ScanStats,
}

/// Append-only sink shared by the unit tasks of one run
#[derive(Default)]
struct Collector {
    results: Vec<ScanResult>,
    stats: ScanStats,
    closed: bool,
}

type SharedCollector = Arc<Mutex<Collector>>;

impl Collector {
    fn begin(&mut self) {
        if !self.closed {
            self.stats.attempted += 1;
        }
    }

    fn record(&mut self, outcome: Option<ScanResult>) {
        if self.closed {
            return;
        }
        match outcome {
            Some(result) => {
                if result.synthetic {
                    self.stats.synthetic += 1;
                } else {
                    self.stats.live += 1;
                }
                self.stats.succeeded += 1;
                self.results.push(result);
            }
            None => self.stats.dropped += 1,
        }
    }

    /// Freeze the collector; later arrivals are ignored
    fn close(&mut self, total_units: usize) -> ScanOutcome {
        self.closed = true;
        let mut stats = self.stats;
        stats.total_units = total_units;
        stats.timed_out = total_units.saturating_sub(stats.succeeded + stats.dropped);
        ScanOutcome {
            results: std::mem::take(&mut self.results),
            stats,
        }
    }
}

/// Ticker quotes of one run, fetched at most once per symbol. `None` means
/// no ticker price was available and units price from their last close.
#[derive(Default)]
struct QuoteBook {
    quotes: Mutex<HashMap<String, Arc<OnceCell<Option<f64>>>>>,
}

impl QuoteBook {
    async fn slot(&self, symbol: &str) -> Arc<OnceCell<Option<f64>>> {
        self.quotes
            .lock()
            .await
            .entry(symbol.to_string())
            .or_default()
            .clone()
    }
}

/// Everything one unit needs, shareable across spawned tasks
struct UnitPipeline {
    source: Arc<CandleSource>,
    engine: Arc<IndicatorEngine>,
    classifier: Arc<SignalClassifier>,
    candle_limit: usize,
    min_candles: usize,
}

impl UnitPipeline {
    async fn process(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        exchange: &str,
        quotes: &QuoteBook,
    ) -> Option<ScanResult> {
        let series = match self.source.fetch(symbol, timeframe, self.candle_limit).await {
            Ok(series) => series,
            Err(e) => {
                debug!("ScanScheduler: {} {} dropped: {}", symbol, timeframe, e);
                return None;
            }
        };

        if series.len() < self.min_candles {
            let err = MarketDataError::InsufficientCandles {
                got: series.len(),
                required: self.min_candles,
            };
            info!("ScanScheduler: {} {} dropped: {}", symbol, timeframe, err);
            return None;
        }

        let indicators = self.engine.compute(&series);
        let final_signal = self.classifier.classify(&indicators, timeframe);
        let price = self.price_for(&series, quotes).await;

        debug!(
            "ScanScheduler: {} {} -> {} (change {:.3}%, synthetic={})",
            symbol,
            timeframe,
            final_signal,
            indicators.price_change_window,
            series.is_synthetic()
        );

        Some(ScanResult {
            symbol: symbol.to_string(),
            timeframe,
            exchange: exchange.to_string(),
            price,
            indicators,
            final_signal,
            synthetic: series.is_synthetic(),
        })
    }

    /// Live series are priced from the ticker; a stale table quote or a
    /// failed lookup falls back to the last close of the window. The ticker
    /// is asked once per symbol and run.
    async fn price_for(&self, series: &CandleSeries, quotes: &QuoteBook) -> f64 {
        let last_close = series.last_close().unwrap_or(0.0);
        if series.is_synthetic() {
            return last_close;
        }

        let slot = quotes.slot(&series.symbol).await;
        let ticker = slot
            .get_or_init(|| async {
                match self.source.fetch_latest_price(&series.symbol).await {
                    Ok(quote) if quote.source == QuoteSource::Ticker => Some(quote.price),
                    Ok(_) => None,
                    Err(e) => {
                        debug!(
                            "ScanScheduler: No ticker price for {}, using last close: {}",
                            series.symbol, e
                        );
                        None
                    }
                }
            })
            .await;
        ticker.unwrap_or(last_close)
    }
}

pub struct ScanScheduler {
    pipeline: Arc<UnitPipeline>,
    config: SchedulerConfig,
}

impl ScanScheduler {
    pub fn new(
        source: Arc<CandleSource>,
        engine: Arc<IndicatorEngine>,
        classifier: Arc<SignalClassifier>,
        config: SchedulerConfig,
    ) -> Self {
        let pipeline = UnitPipeline {
            source,
            engine,
            classifier,
            candle_limit: config.candle_limit,
            min_candles: config.min_candles,
        };
        Self {
            pipeline: Arc::new(pipeline),
            config,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Attempt every unit of `request` and collect what completes before the deadline
    pub async fn run(&self, request: &ScanRequest) -> ScanOutcome {
        let total_units = request.unit_count();
        let collector: SharedCollector = Arc::new(Mutex::new(Collector::default()));
        let quotes = Arc::new(QuoteBook::default());
        let started = Instant::now();

        info!(
            "ScanScheduler: Starting scan of {} units ({} symbols x {} timeframes, {:?} grouping)",
            total_units,
            request.symbols().len(),
            request.timeframes().len(),
            self.config.grouping
        );

        let work = async {
            match self.config.grouping {
                Grouping::Unit => self.drive_units(request, &collector, &quotes).await,
                Grouping::Symbol => self.drive_symbols(request, &collector, &quotes).await,
            }
        };

        if tokio::time::timeout(self.config.deadline, work).await.is_err() {
            warn!(
                "ScanScheduler: Deadline of {:?} reached, returning partial results",
                self.config.deadline
            );
        }

        let outcome = collector.lock().await.close(total_units);
        info!(
            "ScanScheduler: Scan finished in {:?}: {} succeeded ({} live, {} synthetic), {} dropped, {} timed out",
            started.elapsed(),
            outcome.stats.succeeded,
            outcome.stats.live,
            outcome.stats.synthetic,
            outcome.stats.dropped,
            outcome.stats.timed_out
        );
        outcome
    }

    async fn drive_units(
        &self,
        request: &ScanRequest,
        collector: &SharedCollector,
        quotes: &Arc<QuoteBook>,
    ) {
        let units: Vec<(String, Timeframe)> = request
            .symbols()
            .iter()
            .flat_map(|symbol| {
                request
                    .timeframes()
                    .iter()
                    .map(move |tf| (symbol.clone(), *tf))
            })
            .collect();

        for (index, batch) in units.chunks(self.config.batch_size.max(1)).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.batch_delay).await;
            }

            let handles: Vec<_> = batch
                .iter()
                .map(|(symbol, timeframe)| {
                    let pipeline = self.pipeline.clone();
                    let collector = collector.clone();
                    let quotes = quotes.clone();
                    let symbol = symbol.clone();
                    let timeframe = *timeframe;
                    let exchange = request.exchange().to_string();
                    tokio::spawn(async move {
                        run_unit(&pipeline, &collector, &quotes, &symbol, timeframe, &exchange).await;
                    })
                })
                .collect();

            await_batch(handles).await;
        }
    }

    async fn drive_symbols(
        &self,
        request: &ScanRequest,
        collector: &SharedCollector,
        quotes: &Arc<QuoteBook>,
    ) {
        let batches = request.symbols().chunks(self.config.batch_size.max(1));
        for (index, batch) in batches.enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.batch_delay).await;
            }

            let handles: Vec<_> = batch
                .iter()
                .map(|symbol| {
                    let pipeline = self.pipeline.clone();
                    let collector = collector.clone();
                    let quotes = quotes.clone();
                    let symbol = symbol.clone();
                    let timeframes = request.timeframes().to_vec();
                    let exchange = request.exchange().to_string();
                    let unit_delay = self.config.unit_delay;
                    tokio::spawn(async move {
                        for (i, timeframe) in timeframes.into_iter().enumerate() {
                            if i > 0 {
                                tokio::time::sleep(unit_delay).await;
                            }
                            run_unit(&pipeline, &collector, &quotes, &symbol, timeframe, &exchange).await;
                        }
                    })
                })
                .collect();

            await_batch(handles).await;
        }
    }
}

async fn run_unit(
    pipeline: &UnitPipeline,
    collector: &SharedCollector,
    quotes: &QuoteBook,
    symbol: &str,
    timeframe: Timeframe,
    exchange: &str,
) {
    collector.lock().await.begin();
    let outcome = pipeline.process(symbol, timeframe, exchange, quotes).await;
    collector.lock().await.record(outcome);
}

async fn await_batch(handles: Vec<tokio::task::JoinHandle<()>>) {
    for joined in join_all(handles).await {
        if let Err(e) = joined {
            // A panicking unit is just a missing result
            error!("ScanScheduler: Unit task failed: {}", e);
        }
    }
}
