use klinescan::application::indicators::IndicatorEngine;
use klinescan::application::market_data::{CandleSource, MarketProfile, SyntheticCandleGenerator};
use klinescan::application::scan::{Grouping, MarketScanner, ScanScheduler, SchedulerConfig};
use klinescan::application::signals::SignalClassifier;
use klinescan::domain::errors::{BackoffSchedule, MarketDataError};
use klinescan::domain::market::timeframe::Timeframe;
use klinescan::domain::ports::KlineFeed;
use klinescan::domain::scan::{RawScanRequest, ScanRequest, ScanType};
use klinescan::domain::signal::Direction;
use klinescan::infrastructure::core::circuit_breaker::CircuitBreaker;
use klinescan::infrastructure::mock::{
    ScriptedKlineFeed, UnreachableFeed, falling_candles, rising_candles,
};
use klinescan::infrastructure::observability::ScanMetrics;
use std::sync::Arc;
use std::time::Duration;

fn fast_scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        batch_delay: Duration::from_millis(1),
        unit_delay: Duration::from_millis(1),
        deadline: Duration::from_secs(10),
        ..SchedulerConfig::default()
    }
}

fn scheduler(feed: Arc<dyn KlineFeed>) -> ScanScheduler {
    let source = CandleSource::new(
        feed,
        Arc::new(SyntheticCandleGenerator::with_seed(
            Arc::new(MarketProfile::default()),
            42,
        )),
        Arc::new(CircuitBreaker::new("test", 1_000, 1, Duration::from_secs(60))),
        BackoffSchedule {
            rate_limit: Duration::from_millis(2),
            ban: Duration::from_millis(2),
            honor_ban: true,
        },
    );
    ScanScheduler::new(
        Arc::new(source),
        Arc::new(IndicatorEngine::default()),
        Arc::new(SignalClassifier::default()),
        fast_scheduler_config(),
    )
}

fn scanner(feed: Arc<dyn KlineFeed>) -> MarketScanner {
    MarketScanner::new(scheduler(feed), 100)
}

fn raw(symbols: &[&str], timeframes: &[&str], scan_type: &str) -> RawScanRequest {
    RawScanRequest {
        symbols: Some(symbols.iter().map(|s| s.to_string()).collect()),
        timeframes: Some(timeframes.iter().map(|s| s.to_string()).collect()),
        scan_type: Some(scan_type.to_string()),
        exchange: Some("BINANCE".to_string()),
    }
}

#[tokio::test]
async fn test_rising_closes_consolidate_to_highest_timeframe() {
    let feed = ScriptedKlineFeed::new()
        .with_klines("BTCUSDT", Timeframe::OneHour, Ok(rising_candles(50, Timeframe::OneHour)))
        .with_klines("BTCUSDT", Timeframe::FourHour, Ok(rising_candles(50, Timeframe::FourHour)));

    let response = scanner(Arc::new(feed))
        .scan_raw(raw(&["BTCUSDT"], &["1h", "4h"], "all"))
        .await;

    assert!(response.success);
    assert_eq!(response.total, 1);
    assert_eq!(response.scanned_symbols, 1);
    let result = &response.results[0];
    assert_eq!(result.symbol, "BTCUSDT");
    assert_eq!(result.timeframe, Timeframe::FourHour);
    assert_eq!(result.final_signal.direction(), Direction::Long);
    assert!(!result.synthetic);

    let stats = response.stats.expect("completed scans carry stats");
    assert_eq!(stats.total_units, 2);
    assert_eq!(stats.live, 2);
}

#[tokio::test]
async fn test_double_rate_limit_drops_the_unit() {
    let feed = Arc::new(
        ScriptedKlineFeed::new()
            .with_klines("BTCUSDT", Timeframe::OneHour, Err(MarketDataError::RateLimited))
            .with_klines("BTCUSDT", Timeframe::OneHour, Err(MarketDataError::RateLimited)),
    );

    let response = scanner(feed.clone())
        .scan_raw(raw(&["BTCUSDT"], &["1h"], "all"))
        .await;

    assert!(response.success);
    assert!(response.results.is_empty());
    assert_eq!(feed.kline_calls(), 2);
    let stats = response.stats.unwrap();
    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.succeeded, 0);
}

#[tokio::test]
async fn test_unreachable_upstream_serves_every_unit_synthetic() {
    let symbols = ["BTCUSDT", "ETHUSDT", "DOGEUSDT", "UNLISTEDUSDT"];
    let timeframes = ["5m", "1h", "1d"];
    let request = ScanRequest::from_raw(raw(&symbols, &timeframes, "all"), 100).unwrap();

    let outcome = scheduler(Arc::new(UnreachableFeed)).run(&request).await;

    assert_eq!(outcome.results.len(), symbols.len() * timeframes.len());
    assert!(outcome.results.iter().all(|r| r.synthetic));
    assert_eq!(outcome.stats.synthetic, 12);
    assert_eq!(outcome.stats.live, 0);
    for result in &outcome.results {
        assert!(result.indicators.is_finite());
        assert!(result.price > 0.0);
    }
}

#[tokio::test]
async fn test_conflicting_directions_are_excluded_from_long_scan() {
    let feed = Arc::new(
        ScriptedKlineFeed::new()
            .with_klines("BTCUSDT", Timeframe::OneHour, Ok(rising_candles(50, Timeframe::OneHour)))
            .with_klines(
                "BTCUSDT",
                Timeframe::FourHour,
                Ok(falling_candles(50, Timeframe::FourHour)),
            )
            .with_klines("ETHUSDT", Timeframe::OneHour, Ok(rising_candles(50, Timeframe::OneHour)))
            .with_klines("ETHUSDT", Timeframe::FourHour, Ok(rising_candles(50, Timeframe::FourHour))),
    );
    let scanner = scanner(feed);

    let long = scanner
        .scan_raw(raw(&["BTCUSDT", "ETHUSDT"], &["1h", "4h"], "long"))
        .await;
    assert_eq!(long.total, 1);
    assert_eq!(long.results[0].symbol, "ETHUSDT");
    assert_eq!(long.results[0].timeframe, Timeframe::FourHour);

    let short = scanner
        .scan_raw(raw(&["BTCUSDT", "ETHUSDT"], &["1h", "4h"], "short"))
        .await;
    assert!(short.results.is_empty());

    let all = scanner
        .scan_raw(raw(&["BTCUSDT", "ETHUSDT"], &["1h", "4h"], "all"))
        .await;
    assert_eq!(all.total, 2);
    assert_eq!(all.results[0].symbol, "BTCUSDT");
    assert_eq!(all.results[0].final_signal.direction(), Direction::Short);
}

#[tokio::test]
async fn test_directional_scans_only_report_matching_labels() {
    let symbols = [
        "BTCUSDT", "ETHUSDT", "SOLUSDT", "XRPUSDT", "ADAUSDT", "DOGEUSDT", "LINKUSDT",
    ];
    let request = |scan_type: ScanType| {
        ScanRequest::new(
            symbols.iter().map(|s| s.to_string()).collect(),
            vec![Timeframe::FifteenMin, Timeframe::OneHour, Timeframe::FourHour],
            scan_type,
            "BINANCE",
            100,
        )
        .unwrap()
    };

    let scanner = scanner(Arc::new(UnreachableFeed));
    for (scan_type, wanted) in [(ScanType::Long, Direction::Long), (ScanType::Short, Direction::Short)] {
        let response = scanner.scan(&request(scan_type)).await;
        assert!(response.success);
        for result in &response.results {
            assert_eq!(result.final_signal.direction(), wanted);
        }
    }
}

#[tokio::test]
async fn test_invalid_request_never_reaches_upstream() {
    let feed = Arc::new(ScriptedKlineFeed::new());
    let scanner = scanner(feed.clone());

    for body in [
        raw(&[], &["1h"], "all"),
        raw(&["BTCUSDT"], &[], "all"),
        raw(&["BTCUSDT"], &["1h"], "sideways"),
    ] {
        let response = scanner.scan_raw(body).await;
        assert!(!response.success);
        assert!(response.error.is_some());
        assert_eq!(response.total, 0);
    }
    assert_eq!(feed.kline_calls(), 0);
}

#[tokio::test]
async fn test_unknown_timeframe_is_scanned_as_one_hour() {
    let feed = Arc::new(
        ScriptedKlineFeed::new()
            .with_klines("BTCUSDT", Timeframe::OneHour, Ok(rising_candles(50, Timeframe::OneHour))),
    );

    let response = scanner(feed.clone())
        .scan_raw(raw(&["BTCUSDT"], &["2h", "1h"], "all"))
        .await;

    assert!(response.success);
    assert_eq!(response.total, 1);
    assert_eq!(response.results[0].timeframe, Timeframe::OneHour);
    assert_eq!(response.stats.unwrap().total_units, 1);
    assert_eq!(feed.kline_calls(), 1);
}

#[tokio::test]
async fn test_symbol_grouping_matches_unit_grouping() {
    let request = ScanRequest::from_raw(
        raw(&["BTCUSDT", "ETHUSDT", "SOLUSDT"], &["1h", "4h", "1d"], "all"),
        100,
    )
    .unwrap();

    let feed = || {
        let mut feed = ScriptedKlineFeed::new();
        for symbol in ["BTCUSDT", "ETHUSDT", "SOLUSDT"] {
            for tf in [Timeframe::OneHour, Timeframe::FourHour, Timeframe::OneDay] {
                feed = feed.with_klines(symbol, tf, Ok(rising_candles(30, tf)));
            }
        }
        Arc::new(feed)
    };

    let source = |feed: Arc<ScriptedKlineFeed>| {
        CandleSource::new(
            feed,
            Arc::new(SyntheticCandleGenerator::new(Arc::new(MarketProfile::default()))),
            Arc::new(CircuitBreaker::new("test", 5, 1, Duration::from_secs(60))),
            BackoffSchedule {
                rate_limit: Duration::from_millis(1),
                ban: Duration::from_millis(1),
                honor_ban: true,
            },
        )
    };

    let mut outcomes = Vec::new();
    for grouping in [Grouping::Unit, Grouping::Symbol] {
        let scheduler = ScanScheduler::new(
            Arc::new(source(feed())),
            Arc::new(IndicatorEngine::default()),
            Arc::new(SignalClassifier::default()),
            SchedulerConfig {
                grouping,
                ..fast_scheduler_config()
            },
        );
        let mut keys: Vec<_> = scheduler
            .run(&request)
            .await
            .results
            .into_iter()
            .map(|r| (r.symbol, r.timeframe, r.final_signal))
            .collect();
        keys.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
        outcomes.push(keys);
    }

    assert_eq!(outcomes[0].len(), 9);
    assert_eq!(outcomes[0], outcomes[1]);
}

#[tokio::test]
async fn test_metrics_track_unit_outcomes() {
    let metrics = Arc::new(ScanMetrics::new().unwrap());
    let feed = ScriptedKlineFeed::new()
        .with_klines("BTCUSDT", Timeframe::OneHour, Ok(rising_candles(50, Timeframe::OneHour)));
    let scanner = scanner(Arc::new(feed)).with_metrics(metrics.clone());

    let response = scanner
        .scan_raw(raw(&["BTCUSDT", "NOPEUSDT"], &["1h"], "all"))
        .await;
    tokio_test::assert_ok!(serde_json::to_string(&response));
    scanner.scan_raw(raw(&[], &["1h"], "all")).await;

    let rendered = metrics.render();
    assert!(rendered.contains("klinescan_units_total{outcome=\"live\"} 1"));
    assert!(rendered.contains("klinescan_units_total{outcome=\"dropped\"} 1"));
    assert!(rendered.contains("klinescan_scans_total{status=\"rejected\"} 1"));
    assert!(rendered.contains("klinescan_scans_total{status=\"completed\"} 1"));
}
