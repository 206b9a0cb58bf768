//! Scan log recording.
//!
//! Only non-trivial results are logged, and only as a compact summary:
//!
//! | Task | Logged when | `result` | `confidence` |
//! |------|-------------|----------|--------------|
//! | object | at least one object | first object's name | first object's confidence |
//! | text | text is not blank | first 100 chars (+ `...` if cut) | null |
//! | currency | `value > 0` | `"<value> <currency>"` | null |
//!
//! A failed write never fails the analysis that produced it; it is reported
//! as a `warn` event and dropped.

use tracing::warn;

use crate::models::{
    format_number, CurrencyScan, NewScanLog, ObjectScan, ScanKind, ScanLogEntry, TextScan,
};
use crate::store::Store;

/// Maximum number of characters of recognized text kept in a log row.
pub const TEXT_SUMMARY_CHARS: usize = 100;

/// Produce the scan-log summary for a result, or `None` if it is trivial.
pub trait Summarize {
    fn summarize(&self) -> Option<NewScanLog>;
}

impl Summarize for ObjectScan {
    fn summarize(&self) -> Option<NewScanLog> {
        let top = self.objects.first()?;
        Some(NewScanLog {
            kind: ScanKind::Object,
            result: top.name.clone(),
            confidence: Some(top.confidence.round() as i64),
        })
    }
}

impl Summarize for TextScan {
    fn summarize(&self) -> Option<NewScanLog> {
        if self.text.trim().is_empty() {
            return None;
        }
        Some(NewScanLog {
            kind: ScanKind::Text,
            result: summarize_text(&self.text),
            confidence: None,
        })
    }
}

impl Summarize for CurrencyScan {
    fn summarize(&self) -> Option<NewScanLog> {
        if self.value <= 0.0 {
            return None;
        }
        Some(NewScanLog {
            kind: ScanKind::Currency,
            result: format!("{} {}", format_number(self.value), self.currency),
            confidence: None,
        })
    }
}

/// Cut text to [`TEXT_SUMMARY_CHARS`] characters, marking the cut with `...`.
///
/// ```rust
/// use visionaid_core::record::summarize_text;
///
/// assert_eq!(summarize_text("STOP"), "STOP");
/// assert_eq!(summarize_text(&"a".repeat(150)).len(), 103);
/// ```
pub fn summarize_text(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(TEXT_SUMMARY_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Persist the summary of `result`, if it has one.
///
/// Returns the stored row, or `None` when the result was trivial or the
/// write failed.
pub async fn record_scan<T: Summarize + ?Sized>(
    store: &dyn Store,
    result: &T,
) -> Option<ScanLogEntry> {
    let entry = result.summarize()?;
    let kind = entry.kind;
    match store.create_scan_log(&entry).await {
        Ok(row) => Some(row),
        Err(e) => {
            warn!(scan_type = %kind, error = %e, "failed to record scan log");
            None
        }
    }
}
