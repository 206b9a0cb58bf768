//! One-shot image analysis from the command line.
//!
//! `visionaid scan <kind> <file>` runs the same pipeline as the HTTP
//! endpoints against a local image file: the result is logged to the
//! configured database and printed as JSON.

use anyhow::{Context, Result};
use std::path::Path;

use visionaid_core::image::mime_for_extension;
use visionaid_core::models::{CurrencyScan, ObjectScan, ScanKind, TextScan};
use visionaid_core::{analyze_image, DataUri, ScanResult, Store, VisionModel};

use crate::config::Config;
use crate::sqlite_store::SqliteStore;
use crate::{db, migrate, vision};

/// Read an image file and encode it as a data URI.
pub fn load_image(path: &Path) -> Result<DataUri> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read image: {}", path.display()))?;
    let mime = path
        .extension()
        .and_then(|e| e.to_str())
        .map(mime_for_extension)
        .unwrap_or(visionaid_core::image::DEFAULT_MIME);

    DataUri::from_bytes(&bytes, mime)
        .with_context(|| format!("Image file is empty: {}", path.display()))
}

/// Run the scan command and print the result.
pub async fn run_scan_cmd(config: &Config, kind: ScanKind, path: &Path) -> Result<()> {
    let image = load_image(path)?;
    let model = vision::create_vision_model(&config.vision)?;

    let pool = db::connect(config).await?;
    migrate::apply_schema(&pool).await?;
    let store = SqliteStore::new(pool);

    let output = scan_to_json(kind, model.as_ref(), &store, &image).await;
    store.pool().close().await;

    println!("{}", serde_json::to_string_pretty(&output?)?);
    Ok(())
}

/// Analyze `image` as `kind` and return the response body.
pub async fn scan_to_json(
    kind: ScanKind,
    model: &dyn VisionModel,
    store: &dyn Store,
    image: &DataUri,
) -> Result<serde_json::Value> {
    match kind {
        ScanKind::Object => scan_as::<ObjectScan>(model, store, image).await,
        ScanKind::Text => scan_as::<TextScan>(model, store, image).await,
        ScanKind::Currency => scan_as::<CurrencyScan>(model, store, image).await,
    }
}

async fn scan_as<T: ScanResult>(
    model: &dyn VisionModel,
    store: &dyn Store,
    image: &DataUri,
) -> Result<serde_json::Value> {
    let report = analyze_image::<T>(model, store, image).await?;
    if report.outcome.is_degraded() {
        eprintln!("note: model output was not valid JSON; showing best-effort result");
    }
    Ok(serde_json::to_value(report.result())?)
}
