use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// SkyCache - scheduled weather forecasts with a persistent per-feed cache
#[derive(Parser, Debug)]
#[command(name = "skycache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (default: ~/.config/skycache/config.toml)
    #[arg(short, long, global = true, env = "SKYCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Refresh every configured feed on its schedule until interrupted
    Run,

    /// Show the current forecast for a configured feed
    Show {
        /// Feed id from the config file
        source_id: String,
    },

    /// Fetch a place once and print its upcoming forecast
    Fetch {
        /// Place path, e.g. Norway/Oslo/Oslo/Oslo
        place: String,
    },

    /// List configured feeds and every feed with a cached forecast
    List,

    /// Delete the cached forecast for a feed
    Purge {
        /// Feed id whose cache record is removed
        source_id: String,
    },
}
