//! Output formatters for the `list` command.
//!
//! Supports human-readable (with colors), JSON, and NDJSON formats.

use std::io::{self, Write};

use serde::Serialize;

use crate::markers::{MarkerColor, MarkerView, format_utc, marker_color, marker_radius};
use crate::models::EventRecord;

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

// Depth bucket colors, closest terminal match to the map markers
const GREEN: &str = "\x1b[92m";
const YELLOW: &str = "\x1b[93m";
const ORANGE: &str = "\x1b[38;5;208m";
const RED: &str = "\x1b[91m";

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// JSON array
    Json,
    /// Newline-delimited JSON (one object per line)
    Ndjson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!("unknown format: {s} (expected: human, json, ndjson)")),
        }
    }
}

const fn ansi(color: MarkerColor) -> &'static str {
    match color {
        MarkerColor::Green => GREEN,
        MarkerColor::Yellow => YELLOW,
        MarkerColor::Orange => ORANGE,
        MarkerColor::Red => RED,
    }
}

/// Write events one per line, colored by depth like the map markers.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_human<'a, W: Write>(
    writer: &mut W,
    events: impl IntoIterator<Item = &'a EventRecord>,
) -> io::Result<()> {
    for event in events {
        let depth = event.position().depth_km;
        let color = ansi(marker_color(depth));
        let place = event.place().unwrap_or("Unknown location");
        let time = format_utc(event.time());
        let radius = marker_radius(event.magnitude());

        writeln!(
            writer,
            "{color}●{RESET} {BOLD}M{mag:<4.1}{RESET} │ \
             {color}{depth:>5.0}km{RESET} │ \
             {DIM}r={radius:<4.1}{RESET} │ \
             {time} │ \
             {place}",
            mag = event.magnitude(),
        )?;
    }
    Ok(())
}

/// Write events as a JSON array of marker views.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<'a, W: Write>(
    writer: &mut W,
    events: impl IntoIterator<Item = &'a EventRecord>,
) -> io::Result<()> {
    let output: Vec<MarkerView> = events.into_iter().map(MarkerView::from).collect();
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

/// Write events as newline-delimited JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_ndjson<'a, W: Write>(
    writer: &mut W,
    events: impl IntoIterator<Item = &'a EventRecord>,
) -> io::Result<()> {
    for event in events {
        write_line(writer, &MarkerView::from(event))?;
    }
    Ok(())
}

fn write_line<W: Write, T: Serialize>(writer: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

/// Write events in the specified format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_events<'a, W: Write>(
    writer: &mut W,
    events: impl IntoIterator<Item = &'a EventRecord>,
    format: Format,
) -> io::Result<()> {
    match format {
        Format::Human => write_human(writer, events),
        Format::Json => write_json(writer, events),
        Format::Ndjson => write_ndjson(writer, events),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::record;

    #[test]
    fn test_format_parse() {
        assert_eq!("human".parse::<Format>().unwrap(), Format::Human);
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("ndjson".parse::<Format>().unwrap(), Format::Ndjson);
        assert!("invalid".parse::<Format>().is_err());
    }

    #[test]
    fn test_human_line_uses_depth_color() {
        let events = [record("deep", 4.2, 0.0, 0.0, 300.0)];
        let mut buf = Vec::new();
        write_human(&mut buf, &events).unwrap();
        let out = String::from_utf8(buf).unwrap();

        assert!(out.starts_with(RED));
        assert!(out.contains("M4.2"));
        assert!(out.contains("300km"));
        assert!(out.contains("near deep"));
    }

    #[test]
    fn test_ndjson_one_line_per_event() {
        let events = [
            record("a", 2.0, 1.0, 2.0, 5.0),
            record("b", 5.5, 3.0, 4.0, 60.0),
        ];
        let mut buf = Vec::new();
        write_events(&mut buf, &events, Format::Ndjson).unwrap();
        let out = String::from_utf8(buf).unwrap();
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["id"], "b");
        assert_eq!(lines[1]["style"]["color"], "#ff9900");
        assert_eq!(lines[1]["style"]["radius"], 16.5);
    }
}
