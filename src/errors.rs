//! Error types for quakemap.
//!
//! Uses `thiserror` for library-style error definitions.

use thiserror::Error;

/// Message shown to the user whenever the feed cannot be loaded.
///
/// Detail from [`QuakeMapError`] goes to the log; only this text reaches the UI.
pub const FEED_LOAD_FAILURE: &str = "Failed to load earthquake data";

/// Errors that can occur while loading the earthquake feed.
#[derive(Error, Debug)]
pub enum QuakeMapError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Feed endpoint returned an error status
    #[error("USGS feed error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Invalid response structure
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Event validation failed
    #[error("Invalid event data: {0}")]
    Validation(String),
}
