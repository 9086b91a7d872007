use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands;
use crate::constants::{DEFAULT_MAX_PRICE, INDEX_COMPONENT_COUNT};

#[derive(Parser)]
#[command(name = "djia")]
#[command(about = "Market reference data sync", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download the exchange ticker listing to a local file
    DownloadTickers {
        /// Output file (defaults to TICKER_SYMBOL_PATH or TickerSymbols.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Fetch a quote for every listed common stock and store it
    SyncQuotes {
        /// Ticker listing file (defaults to TICKER_SYMBOL_PATH or TickerSymbols.json)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Only sync the first N stocks
        #[arg(long)]
        limit: Option<usize>,

        /// Fetch quotes but keep them in an in-memory store
        #[arg(long)]
        dry_run: bool,
    },
    /// Look up stored quotes by symbol
    Get {
        /// Ticker symbols
        #[arg(required = true)]
        symbols: Vec<String>,
    },
    /// List the price-weighted index components
    Djia {
        /// Price ceiling for components
        #[arg(long, default_value_t = DEFAULT_MAX_PRICE)]
        max_price: f64,

        /// Extra symbols to exclude (added to the default exclusion list)
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,

        /// Number of components to list
        #[arg(long, default_value_t = INDEX_COMPONENT_COUNT)]
        count: usize,
    },
}

pub fn run() {
    let cli = Cli::parse();

    match cli.command {
        Commands::DownloadTickers { output } => {
            commands::download_tickers::run(output);
        }
        Commands::SyncQuotes {
            input,
            limit,
            dry_run,
        } => {
            commands::sync_quotes::run(input, limit, dry_run);
        }
        Commands::Get { symbols } => {
            commands::get::run(symbols);
        }
        Commands::Djia {
            max_price,
            exclude,
            count,
        } => {
            commands::djia::run(max_price, exclude, count);
        }
    }
}
