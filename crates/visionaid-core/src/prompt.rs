//! Fixed instructions sent to the vision model, one per [`ScanKind`].
//!
//! Each prompt asks for a bare JSON object of the shape the parser expects.
//! Models do not always comply, which is why [`crate::parse`] exists.

use crate::models::ScanKind;

const OBJECT_PROMPT: &str = "Identify the main objects in this image. Return ONLY a JSON object with a key 'objects' containing an array of objects, where each object has 'name' and 'confidence' (0-100). Example: { \"objects\": [{ \"name\": \"chair\", \"confidence\": 95 }] }. Do not include markdown formatting.";

const TEXT_PROMPT: &str = "Read all the visible text in this image. Return ONLY a JSON object with a key 'text' containing the extracted string. Example: { \"text\": \"Hello World\" }. Do not include markdown formatting.";

const CURRENCY_PROMPT: &str = "Identify the Indian currency note in this image. Return ONLY a JSON object with keys 'value' (number) and 'currency' (string, e.g. \"INR\"). If no currency is found, return value 0. Example: { \"value\": 500, \"currency\": \"INR\" }. Do not include markdown formatting.";

/// Instruction for a task.
pub fn prompt_for(kind: ScanKind) -> &'static str {
    match kind {
        ScanKind::Object => OBJECT_PROMPT,
        ScanKind::Text => TEXT_PROMPT,
        ScanKind::Currency => CURRENCY_PROMPT,
    }
}
