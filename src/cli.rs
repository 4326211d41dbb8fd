//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use clap::{Parser, Subcommand};

use crate::client::FeedWindow;
use crate::output::Format;
use crate::viewport::FitMode;

/// Recent earthquakes on an interactive map, filtered by magnitude.
#[derive(Parser, Debug)]
#[command(name = "quakemap")]
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
    /// Start the map server
    Serve(ServeArgs),

    /// Print the visible earthquakes once and exit
    List(ListArgs),
}

/// Feed selection shared by every command.
#[derive(Parser, Debug)]
pub struct FeedArgs {
    /// Feed window to load (hour, day, week, month)
    #[arg(long, default_value = "day", value_parser = parse_window)]
    pub window: FeedWindow,

    /// Alternate host serving the USGS feed tree
    #[arg(long)]
    pub base_url: Option<String>,

    /// Initial minimum magnitude
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub min_magnitude: f64,
}

/// Arguments for the `serve` command.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub feed: FeedArgs,

    /// Port to listen on
    #[arg(long, short = 'p', default_value = "8080")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Fit the view around the current view and events (view) or events only (data)
    #[arg(long, default_value = "view", value_parser = parse_fit_mode)]
    pub fit_mode: FitMode,

    /// Open browser automatically
    #[arg(long)]
    pub open: bool,
}

/// Arguments for the `list` command.
#[derive(Parser, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub feed: FeedArgs,

    /// Maximum number of events to show
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Parse a feed window from string.
fn parse_window(s: &str) -> Result<FeedWindow, String> {
    s.parse()
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}

/// Parse a fit mode from string.
fn parse_fit_mode(s: &str) -> Result<FitMode, String> {
    s.parse()
}
