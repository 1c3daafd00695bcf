use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use klinescan::config::{Config, Mode};
use klinescan::domain::scan::{DEFAULT_EXCHANGE, RawScanRequest, ScanRequest, ScanResponse};
use klinescan::infrastructure::observability::ScanMetrics;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about = "Multi-timeframe candle scanner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan symbols across timeframes and print the JSON envelope
    Scan {
        /// Comma-separated symbols, e.g. BTCUSDT,ETHUSDT
        #[arg(short, long, value_delimiter = ',')]
        symbols: Vec<String>,

        /// Comma-separated timeframes: 5m,15m,30m,1h,4h,1d,1w
        #[arg(short, long, value_delimiter = ',', default_value = "1h,4h")]
        timeframes: Vec<String>,

        /// all, long or short
        #[arg(long, default_value = "all")]
        scan_type: String,

        #[arg(short, long, default_value = DEFAULT_EXCHANGE)]
        exchange: String,

        /// JSON request body; replaces the flags above
        #[arg(short, long)]
        request: Option<PathBuf>,

        /// Serve synthetic candles only, never call upstream
        #[arg(long)]
        offline: bool,

        /// Print Prometheus metrics to stderr after the scan
        #[arg(long)]
        metrics: bool,
    },
    /// Print the latest price for one symbol
    Price {
        symbol: String,

        #[arg(long)]
        offline: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout carries the JSON output
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(stderr_layer)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::Scan {
            symbols,
            timeframes,
            scan_type,
            exchange,
            request,
            offline,
            metrics,
        } => {
            if offline {
                config.mode = Mode::Offline;
            }

            let raw = match request {
                Some(path) => {
                    let body = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    serde_json::from_str::<RawScanRequest>(&body)
                        .with_context(|| format!("Failed to parse {}", path.display()))?
                }
                None => RawScanRequest {
                    symbols: Some(symbols),
                    timeframes: Some(timeframes),
                    scan_type: Some(scan_type),
                    exchange: Some(exchange),
                },
            };

            let request = match ScanRequest::from_raw(raw, config.scan.max_symbols) {
                Ok(request) => request,
                Err(e) => {
                    print_json(&ScanResponse::rejected(&e))?;
                    return Ok(ExitCode::from(2));
                }
            };

            info!(
                "klinescan {}: {:?} mode, exchange {}",
                env!("CARGO_PKG_VERSION"),
                config.mode,
                request.exchange()
            );

            let scan_metrics = if metrics {
                Some(Arc::new(ScanMetrics::new()?))
            } else {
                None
            };
            let scanner = config.market_scanner(request.exchange(), scan_metrics.clone())?;
            let response = scanner.scan(&request).await;
            print_json(&response)?;

            if let Some(scan_metrics) = scan_metrics {
                eprint!("{}", scan_metrics.render());
            }
        }
        Commands::Price { symbol, offline } => {
            if offline {
                config.mode = Mode::Offline;
            }

            let symbol = symbol.trim().to_uppercase();
            let source = config.candle_source(DEFAULT_EXCHANGE);
            let quote = source
                .fetch_latest_price(&symbol)
                .await
                .with_context(|| format!("No price for {}", symbol))?;

            print_json(&serde_json::json!({
                "symbol": symbol,
                "price": quote.price,
                "source": format!("{:?}", quote.source),
            }))?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
