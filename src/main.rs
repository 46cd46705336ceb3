//! chptail - Live CHP traffic incidents from your terminal.
//!
//! A terminal-first, pipe-friendly viewer for the CHP dispatch-log feed.

use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info, warn};

use chptail::cli::{self, Cli, Command, MIN_POLL_INTERVAL_SECS};
use chptail::client::FeedClient;
use chptail::output;
use chptail::store::IncidentStore;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Show(args) => cmd_show(args),
        Command::Watch(args) => cmd_watch(args),
    }
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the `show` command - one-shot fetch of current incidents.
fn cmd_show(args: cli::ShowArgs) -> Result<()> {
    let client = FeedClient::new().context("failed to create feed client")?;

    let entries = client
        .fetch_entries(&args.feed.source, &args.feed.selector())
        .context("failed to fetch incident feed")?;

    // A fresh store reports every valid entry as added, in feed order
    let mut store = IncidentStore::new();
    let mut incidents = store.update(&entries).added;

    if args.alerts_only {
        incidents.retain(|i| i.has_alert);
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_incidents(&mut handle, &incidents, args.format)?;

    Ok(())
}

/// Execute the `watch` command - poll and print changes.
fn cmd_watch(args: cli::WatchArgs) -> Result<()> {
    let poll_interval = args.poll_interval.max(MIN_POLL_INTERVAL_SECS);
    if poll_interval != args.poll_interval {
        warn!("poll interval clamped to minimum of {MIN_POLL_INTERVAL_SECS} seconds");
    }

    let client = FeedClient::new().context("failed to create feed client")?;
    let selector = args.feed.selector();
    let mut store = IncidentStore::new();

    info!(
        "watching incidents from {} (poll every {}s)",
        args.feed.source, poll_interval
    );

    let mut poll_count = 0u64;

    loop {
        poll_count += 1;

        match client.fetch_entries(&args.feed.source, &selector) {
            Ok(entries) => {
                let diff = store.update(&entries);

                let stdout = io::stdout();
                let mut handle = stdout.lock();
                if let Err(e) = output::write_diff(&mut handle, &diff, args.format) {
                    warn!("failed to write changes: {}", e);
                }
                let _ = handle.flush();

                if !diff.is_empty() {
                    debug!("poll #{}: {}", poll_count, diff.summary());
                }
                if let Some(bounds) = store.bounds() {
                    debug!(
                        "incident bounds: sw ({:.4}, {:.4}) ne ({:.4}, {:.4})",
                        bounds.sw.lat, bounds.sw.lon, bounds.ne.lat, bounds.ne.lon
                    );
                }
            }
            Err(e) => {
                warn!("fetch failed, will retry: {}", e);
            }
        }

        std::thread::sleep(Duration::from_secs(poll_interval));
    }
}
