//! Error types for the scan pipeline and profile validation.
//!
//! Only failures that the client should see are modelled here. Malformed
//! model output is not an error at all: it is recovered by the parser as a
//! [`ParseOutcome::Degraded`](crate::parse::ParseOutcome::Degraded) value.

use thiserror::Error;

/// Failure of the external vision-model call.
///
/// Covers transport errors, non-success statuses, timeouts and response
/// envelopes that cannot be decoded. The call is never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("vision analysis failed: {message}")]
pub struct AnalysisFailure {
    message: String,
}

impl AnalysisFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors surfaced by [`run_scan`](crate::scan::run_scan).
#[derive(Error, Debug)]
pub enum ScanError {
    /// The request carried no usable image.
    #[error("Image required")]
    MissingImage,

    #[error(transparent)]
    Analysis(#[from] AnalysisFailure),
}

impl ScanError {
    /// Whether the error was caused by the client rather than the model.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ScanError::MissingImage)
    }
}

/// Rejected profile update.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid user data: {field} {reason}")]
pub struct ProfileError {
    pub field: &'static str,
    pub reason: String,
}

impl ProfileError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}
