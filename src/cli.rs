use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use ibrest::config::DEFAULT_CONFIG_FILE;

#[derive(Parser)]
#[command(name = "ibrest")]
#[command(about = "Query a local trading gateway: session, accounts, contracts and historical bars")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Gateway configuration file (JSON). Missing file means builtin defaults.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ping the gateway to keep the session alive
    Tickle,

    /// List brokerage accounts
    Accounts,

    /// Look up contract ids for one or more symbols
    Contract {
        /// Symbols to resolve (e.g., AAPL MSFT)
        #[arg(required = true)]
        symbols: Vec<String>,
    },

    /// Download historical bars, split into gateway-sized requests
    History {
        /// Symbol to download
        symbol: String,

        /// Total span to cover (e.g., 30d, 6m, 2y, 12h, 90min)
        #[arg(short, long, default_value = "1d")]
        period: String,

        /// Bar size (e.g., 1min, 5min, 1h, 1d, 1w, 1m)
        #[arg(short, long, default_value = "1min")]
        bar: String,

        /// Anchor timestamp the span runs forward from
        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        exchange: Option<String>,

        /// Include bars outside regular trading hours
        #[arg(long)]
        outside_rth: bool,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Csv,
}
