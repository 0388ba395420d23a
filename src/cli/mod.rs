//! CLI interface for trade-bot
//!
//! Provides subcommands for:
//! - `serve`: Run the trading gateway
//! - `config`: Show the effective configuration

mod serve;

pub use serve::ServeArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "trade-bot")]
#[command(about = "Stop-loss/take-profit trading bot for Kraken Futures")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the trading gateway
    Serve(ServeArgs),
    /// Show the effective configuration
    Config,
}
