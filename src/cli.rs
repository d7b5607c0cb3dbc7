//! CLI argument surface
//!
//! Two modes: `search` runs the matcher once over the directory and exits;
//! `watch` drives the full debounced pipeline from stdin query lines.

use crate::pipeline::PipelineConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// livesearch CLI
#[derive(Parser)]
#[command(name = "livesearch")]
#[command(about = "Debounced live search over a people directory", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// People directory as a JSON array of {firstName, lastName}
    /// (defaults to the built-in sample roster)
    #[arg(long, global = true, value_name = "FILE", env = "LIVESEARCH_PEOPLE")]
    pub people: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Filter the directory once and print the matches
    Search(SearchArgs),
    /// Interactive mode: each stdin line becomes the new query
    Watch(WatchArgs),
}

/// One-shot search arguments
#[derive(Parser, Debug)]
pub struct SearchArgs {
    /// Query text (case-insensitive; matches names and initials)
    #[arg(short = 'q', long)]
    pub query: String,

    /// Emit matches as JSON instead of text rows
    #[arg(long)]
    pub json: bool,
}

/// Interactive mode arguments
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Debounce quiet period in milliseconds
    #[arg(long, default_value_t = 500)]
    pub debounce_ms: u64,

    /// Simulated lookup latency in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub latency_ms: u64,

    /// Keep-alive grace period in milliseconds
    #[arg(long, default_value_t = 5000)]
    pub keep_alive_ms: u64,
}

impl Default for WatchArgs {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            latency_ms: 1000,
            keep_alive_ms: 5000,
        }
    }
}

impl WatchArgs {
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            debounce: Duration::from_millis(self.debounce_ms),
            latency: Duration::from_millis(self.latency_ms),
            keep_alive: Duration::from_millis(self.keep_alive_ms),
        }
    }
}
