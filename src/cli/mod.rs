//! CLI interface for rate-relay
//!
//! Provides subcommands for:
//! - `serve`: Run the fetch / fan-out / replay pipeline and WebSocket server
//! - `config`: Show the effective configuration

mod serve;

pub use serve::ServeArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "rate-relay")]
#[command(about = "Real-time BTC exchange rate relay over WebSocket")]
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
    /// Run the rate server
    Serve(ServeArgs),
    /// Show configuration
    Config,
}
