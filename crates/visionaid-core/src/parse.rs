//! Tolerant parsing of vision-model output.
//!
//! The model is told to answer with bare JSON, but it regularly wraps the
//! answer in a markdown code fence or answers in prose. Parsing therefore
//! never fails: output that does not decode into the task's shape is
//! replaced by a task-specific degraded value that still carries the raw
//! text, and the caller is told which of the two happened through
//! [`ParseOutcome`].
//!
//! # Algorithm
//!
//! 1. Remove every `` ```json `` marker, then every remaining `` ``` `` marker.
//! 2. Trim surrounding whitespace.
//! 3. Strictly decode into the typed result and normalize it.
//! 4. On any failure, fall back to [`ScanResult::degraded`].
//!
//! | Task | Degraded value |
//! |------|----------------|
//! | object | `{"objects":[{"name": <raw>, "confidence": 0}]}` |
//! | text | `{"text": <raw>}` |
//! | currency | `{"value": 0, "currency": "Unknown"}` |

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{CurrencyScan, DetectedObject, ObjectScan, ScanKind, TextScan};
use crate::record::Summarize;

/// Outcome of parsing model output. Both arms carry a usable value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome<T> {
    /// The output decoded into the expected shape.
    Parsed(T),
    /// The output was malformed; the value is the task's fallback.
    Degraded(T),
}

impl<T> ParseOutcome<T> {
    pub fn is_degraded(&self) -> bool {
        matches!(self, ParseOutcome::Degraded(_))
    }

    pub fn value(&self) -> &T {
        match self {
            ParseOutcome::Parsed(v) | ParseOutcome::Degraded(v) => v,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            ParseOutcome::Parsed(v) | ParseOutcome::Degraded(v) => v,
        }
    }

    /// `"parsed"` or `"degraded"`, for log fields.
    pub fn label(&self) -> &'static str {
        if self.is_degraded() {
            "degraded"
        } else {
            "parsed"
        }
    }
}

/// A structured analysis result for one [`ScanKind`].
pub trait ScanResult: DeserializeOwned + Serialize + Summarize + Send + Sync + 'static {
    const KIND: ScanKind;

    /// Fallback value built from the raw model text.
    fn degraded(raw: &str) -> Self;

    /// Check and tidy a freshly decoded value. `None` rejects it as malformed.
    fn normalize(self) -> Option<Self> {
        Some(self)
    }
}

pub const UNKNOWN_CURRENCY: &str = "Unknown";

impl ScanResult for ObjectScan {
    const KIND: ScanKind = ScanKind::Object;

    fn degraded(raw: &str) -> Self {
        ObjectScan {
            objects: vec![DetectedObject {
                name: raw.trim().to_string(),
                confidence: 0.0,
            }],
        }
    }

    fn normalize(mut self) -> Option<Self> {
        for obj in &mut self.objects {
            obj.confidence = obj.confidence.clamp(0.0, 100.0);
        }
        Some(self)
    }
}

impl ScanResult for TextScan {
    const KIND: ScanKind = ScanKind::Text;

    fn degraded(raw: &str) -> Self {
        TextScan {
            text: raw.trim().to_string(),
        }
    }
}

impl ScanResult for CurrencyScan {
    const KIND: ScanKind = ScanKind::Currency;

    fn degraded(_raw: &str) -> Self {
        CurrencyScan {
            value: 0.0,
            currency: UNKNOWN_CURRENCY.to_string(),
        }
    }

    fn normalize(self) -> Option<Self> {
        if self.value.is_finite() && self.value >= 0.0 {
            Some(self)
        } else {
            None
        }
    }
}

/// Remove markdown code-fence markers anywhere in the text and trim it.
///
/// ```rust
/// use visionaid_core::parse::strip_code_fences;
///
/// assert_eq!(strip_code_fences("```json\n{\"text\":\"STOP\"}\n```"), "{\"text\":\"STOP\"}");
/// ```
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// Parse raw model output for the task `T`. Never fails.
pub fn parse_model_output<T: ScanResult>(raw: &str) -> ParseOutcome<T> {
    let cleaned = strip_code_fences(raw);
    match serde_json::from_str::<T>(&cleaned).ok().and_then(T::normalize) {
        Some(value) => ParseOutcome::Parsed(value),
        None => ParseOutcome::Degraded(T::degraded(raw)),
    }
}
