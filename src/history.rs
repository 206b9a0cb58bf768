//! Scan history listing for the CLI.
//!
//! `visionaid history` prints the most recent scan summaries as a table,
//! newest first, with relative timestamps.

use anyhow::Result;
use chrono::{DateTime, Utc};

use visionaid_core::models::ScanLogEntry;
use visionaid_core::store::scan_history;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Width of the RESULT column; longer summaries are cut with `...`.
const RESULT_WIDTH: usize = 48;

/// Run the history command: read recent scan logs and print them.
pub async fn run_history(config: &Config, limit: Option<usize>) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);

    let entries = scan_history(&store, limit).await?;
    store.pool().close().await;

    if entries.is_empty() {
        println!("No scans recorded yet.");
        return Ok(());
    }

    let now = Utc::now();
    println!(
        "  {:<6} {:<9} {:<width$} {:>5}   {}",
        "ID",
        "TYPE",
        "RESULT",
        "CONF",
        "WHEN",
        width = RESULT_WIDTH
    );
    println!("  {}", "-".repeat(RESULT_WIDTH + 40));
    for entry in &entries {
        println!("  {}", format_row(entry, now));
    }
    println!();
    println!("{} scan(s)", entries.len());

    Ok(())
}

fn format_row(entry: &ScanLogEntry, now: DateTime<Utc>) -> String {
    let confidence = entry
        .confidence
        .map(|c| format!("{}%", c))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<6} {:<9} {:<width$} {:>5}   {}",
        entry.id,
        entry.kind,
        clip(&entry.result, RESULT_WIDTH),
        confidence,
        format_relative(entry.timestamp, now),
        width = RESULT_WIDTH
    )
}

/// Shorten `s` to at most `width` characters on one line.
fn clip(s: &str, width: usize) -> String {
    let flat = s.replace(['\n', '\r'], " ");
    if flat.chars().count() <= width {
        return flat;
    }
    let kept: String = flat.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Format a timestamp relative to `now` (e.g. "3 hours ago").
fn format_relative(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = (now - ts).num_seconds();

    if delta < 0 {
        return ts.format("%Y-%m-%d %H:%M").to_string();
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        ts.format("%Y-%m-%d %H:%M").to_string()
    }
}
