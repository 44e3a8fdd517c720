//! Historical kline downloader.
//!
//! ```bash
//! # BTC/USDT 15m candles for July 2021
//! kline-downloader download -s BTC/USDT -i 15m -f 2021-07-01 -t 2021-08-01
//!
//! # everything since 2024-01-01, with extended columns, to an explicit file
//! kline-downloader download -s ETH/USDT -i 1h -f 2024-01-01 --extended -o eth.csv
//!
//! # tradable symbols
//! kline-downloader symbols
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use kline_downloader::binance::rest::BinanceRestClient;
use kline_downloader::config::{throttle_duration, Config, DEFAULT_CONFIG_PATH};
use kline_downloader::csv_sink::save_dataset;
use kline_downloader::downloader::{download_full_klines_with_progress, DownloadRequest};
use kline_downloader::market_data::MarketDataApi;
use kline_downloader::model::candle::ColumnMode;

#[derive(Parser)]
#[command(name = "kline-downloader")]
#[command(about = "Download historical Binance klines to CSV", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML config file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download klines for one symbol
    Download {
        /// Symbol, e.g. BTC/USDT or BTCUSDT
        #[arg(short, long)]
        symbol: String,

        /// Kline interval (1m 3m 5m 15m 30m 1h 2h 4h 6h 8h 12h 1d 3d 1w 1M)
        #[arg(short, long)]
        interval: String,

        /// Start date (YYYY-MM-DD)
        #[arg(short = 'f', long)]
        start: NaiveDate,

        /// End date (YYYY-MM-DD), defaults to now
        #[arg(short = 't', long)]
        end: Option<NaiveDate>,

        /// Output file, defaults to SYMBOL_INTERVAL_START_END.csv
        #[arg(short = 'o', long)]
        save_to: Option<PathBuf>,

        /// Seconds to pause between page requests
        #[arg(long)]
        throttle: Option<f64>,

        /// Add quote volume, trade count and taker-buy columns
        #[arg(long)]
        extended: bool,
    },

    /// List tradable symbols
    Symbols,
}

/// `--extended` forces extended columns; otherwise the configured mode applies.
fn column_mode(extended: bool, configured: ColumnMode) -> ColumnMode {
    if extended {
        ColumnMode::Extended
    } else {
        configured
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                level
                    .parse()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
            }),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;
    init_tracing(&config.logging.level);

    let client = BinanceRestClient::new(&config.binance.rest_base_url);
    tracing::debug!(rest_url = %client.base_url(), "Using market data endpoint");

    match cli.command {
        Commands::Download {
            symbol,
            interval,
            start,
            end,
            save_to,
            throttle,
            extended,
        } => {
            let throttle = match throttle {
                Some(secs) => throttle_duration(Some(secs))?,
                None => config.download.throttle()?,
            };
            let request = DownloadRequest {
                symbol,
                interval,
                start,
                end,
                save_to,
                throttle,
                column_mode: column_mode(extended, config.download.column_mode),
            };

            let progress = ProgressBar::new(0);
            progress.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} windows ({eta})")
                    .context("invalid progress template")?
                    .progress_chars("#>-"),
            );
            let dataset = download_full_klines_with_progress(&client, &request, &progress)
                .await
                .with_context(|| format!("download failed for {} {}", request.symbol, request.interval))?;
            let path = save_dataset(
                &dataset,
                request.save_to.as_deref(),
                &config.download.output_dir,
                config.download.time_format,
            )
            .context("failed to write dataset")?;
            println!("{} rows -> {}", dataset.len(), path.display());
        }
        Commands::Symbols => {
            let symbols = client
                .list_symbols()
                .await
                .context("failed to list symbols")?;
            for symbol in symbols {
                println!("{}", symbol);
            }
        }
    }

    Ok(())
}
