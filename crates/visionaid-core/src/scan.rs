//! The image-analysis round trip.
//!
//! ```text
//! image ─▶ DataUri ─▶ VisionModel::analyze ─▶ parse_model_output ─▶ record_scan
//!   │                       │                        │                   │
//!  400                     500                (never fails)      (failure logged,
//! (MissingImage)       (AnalysisFailure)                           not returned)
//! ```
//!
//! Only a missing image and a failed model call become errors. Everything
//! after the model call always produces a result.

use tracing::{debug, info};

use crate::error::ScanError;
use crate::image::DataUri;
use crate::models::ScanLogEntry;
use crate::parse::{parse_model_output, ParseOutcome, ScanResult};
use crate::prompt::prompt_for;
use crate::record::record_scan;
use crate::store::Store;
use crate::vision::VisionModel;

/// Result of one successful analysis.
#[derive(Debug, Clone)]
pub struct ScanReport<T> {
    pub outcome: ParseOutcome<T>,
    /// The scan log row written for this analysis, if any.
    pub logged: Option<ScanLogEntry>,
}

impl<T> ScanReport<T> {
    pub fn result(&self) -> &T {
        self.outcome.value()
    }

    pub fn into_result(self) -> T {
        self.outcome.into_inner()
    }
}

/// Run the full pipeline on a client-supplied image string.
pub async fn run_scan<T: ScanResult>(
    model: &dyn VisionModel,
    store: &dyn Store,
    image: &str,
) -> Result<ScanReport<T>, ScanError> {
    let image = DataUri::from_client(image)?;
    analyze_image::<T>(model, store, &image).await
}

/// Run the pipeline on an already-encoded image.
pub async fn analyze_image<T: ScanResult>(
    model: &dyn VisionModel,
    store: &dyn Store,
    image: &DataUri,
) -> Result<ScanReport<T>, ScanError> {
    debug!(
        scan_type = %T::KIND,
        model = model.model_name(),
        image_bytes = image.len(),
        "invoking vision model"
    );
    let raw = model.analyze(image, prompt_for(T::KIND)).await?;

    let outcome = parse_model_output::<T>(&raw);
    if outcome.is_degraded() {
        debug!(scan_type = %T::KIND, raw_len = raw.len(), "model output was not valid JSON");
    }

    let logged = record_scan(store, outcome.value()).await;
    info!(
        scan_type = %T::KIND,
        outcome = outcome.label(),
        logged = logged.is_some(),
        "scan complete"
    );

    Ok(ScanReport { outcome, logged })
}
