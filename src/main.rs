//! quakemap - Recent earthquakes on an interactive map.
//!
//! Loads the USGS summary feed once, filters it by a user-controlled minimum
//! magnitude, and keeps a Leaflet map framed on what is left.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

mod cli;
mod client;
mod errors;
mod map_view;
mod markers;
mod models;
mod output;
mod server;
mod store;
mod viewport;

use cli::{Cli, Command, FeedArgs};
use client::UsgsClient;
use store::{FeedStatus, FeedStore};

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

    let runtime = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;
    match cli.command {
        Command::Serve(args) => runtime.block_on(cmd_serve(args)),
        Command::List(args) => runtime.block_on(cmd_list(args)),
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

fn build_client(args: &FeedArgs) -> Result<UsgsClient> {
    let client = UsgsClient::new(args.window).context("failed to create USGS client")?;
    Ok(match &args.base_url {
        Some(url) => client.with_base_url(url),
        None => client,
    })
}

/// Execute the `list` command - one fetch, print the visible set.
async fn cmd_list(args: cli::ListArgs) -> Result<()> {
    let client = build_client(&args.feed)?;
    let store = FeedStore::with_threshold(args.feed.min_magnitude);

    store.initialize(&client).await;
    if let FeedStatus::Failed(message) = store.status() {
        anyhow::bail!(message);
    }

    let visible = store.visible_records();
    let limit = args.limit.unwrap_or(usize::MAX);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_events(&mut handle, visible.iter().take(limit), args.format)?;

    tracing::debug!(
        "{} of {} events at magnitude >= {}",
        visible.len(),
        store.snapshot().records().len(),
        store.threshold()
    );
    Ok(())
}

/// Execute the `serve` command - start the map server.
async fn cmd_serve(args: cli::ServeArgs) -> Result<()> {
    let client = build_client(&args.feed)?;
    let store = Arc::new(FeedStore::with_threshold(args.feed.min_magnitude));

    let config = server::ServerConfig {
        port: args.port,
        host: args.host.clone(),
        fit_mode: args.fit_mode,
    };

    // Print startup message
    let url = format!("http://{}:{}", args.host, args.port);
    println!("\x1b[1m🌍 quakemap\x1b[0m");
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("  Local:   \x1b[96m{url}\x1b[0m");
    println!("  Feed:    {}", client.feed_url());
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("\x1b[2mPress Ctrl+C to stop\x1b[0m\n");

    // Open browser if requested (using xdg-open/open command)
    if args.open {
        #[cfg(target_os = "linux")]
        let _ = std::process::Command::new("xdg-open").arg(&url).spawn();
        #[cfg(target_os = "macos")]
        let _ = std::process::Command::new("open").arg(&url).spawn();
        #[cfg(target_os = "windows")]
        let _ = std::process::Command::new("cmd").args(["/c", "start", &url]).spawn();
    }

    server::run_server(config, store, client).await
}
