//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use clap::{Args, Parser, Subcommand};

use crate::client::{DEFAULT_FEED_URL, FeedSource};
use crate::feed::{DEFAULT_DISPATCH, FeedSelector};
use crate::output::Format;

/// Shortest poll interval the `watch` command accepts, in seconds.
pub const MIN_POLL_INTERVAL_SECS: u64 = 30;

/// Live CHP traffic incidents from your terminal.
#[derive(Parser, Debug)]
#[command(name = "chptail")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show current incidents (one-shot fetch and exit)
    Show(ShowArgs),

    /// Poll the feed and print what changes
    Watch(WatchArgs),
}

/// Feed options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct FeedArgs {
    /// Feed URL or path to a saved XML document
    #[arg(long, default_value = DEFAULT_FEED_URL, value_parser = parse_source)]
    pub source: FeedSource,

    /// Dispatch center ID to show
    #[arg(long, default_value = DEFAULT_DISPATCH)]
    pub dispatch: String,

    /// Also show logs from every dispatch center
    #[arg(long, conflicts_with = "dispatch")]
    pub all_centers: bool,

    /// Include Freeway Service Patrol logs
    #[arg(long)]
    pub include_fsp: bool,
}

impl FeedArgs {
    /// Build the feed selector these options describe.
    #[must_use]
    pub fn selector(&self) -> FeedSelector {
        FeedSelector {
            dispatch: (!self.all_centers).then(|| self.dispatch.clone()),
            exclude_service_patrol: !self.include_fsp,
        }
    }
}

/// Arguments for the `show` command.
#[derive(Parser, Debug)]
pub struct ShowArgs {
    #[command(flatten)]
    pub feed: FeedArgs,

    /// Only show incidents with a SigAlert
    #[arg(long)]
    pub alerts_only: bool,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `watch` command.
#[derive(Parser, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub feed: FeedArgs,

    /// Poll interval in seconds (minimum 30)
    #[arg(long, default_value = "60")]
    pub poll_interval: u64,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Parse a feed source from string.
fn parse_source(s: &str) -> Result<FeedSource, String> {
    s.parse()
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}
