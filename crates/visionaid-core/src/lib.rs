//! # VisionAid Core
//!
//! Shared logic for VisionAid: scan models, the image codec, task prompts,
//! tolerant parsing of model output, scan-log recording, the scan pipeline,
//! and the [`store::Store`] / [`vision::VisionModel`] collaborator traits.
//!
//! This crate has no sqlx, HTTP client, or filesystem dependencies; the
//! `visionaid` app crate supplies the concrete store and model.

pub mod error;
pub mod image;
pub mod models;
pub mod parse;
pub mod prompt;
pub mod record;
pub mod scan;
pub mod store;
pub mod vision;

pub use error::{AnalysisFailure, ProfileError, ScanError};
pub use image::DataUri;
pub use models::{CurrencyScan, ObjectScan, ScanKind, TextScan};
pub use parse::{parse_model_output, ParseOutcome, ScanResult};
pub use scan::{analyze_image, run_scan, ScanReport};
pub use store::Store;
pub use vision::VisionModel;
