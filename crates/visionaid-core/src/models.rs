//! Core data types shared by the scan pipeline, the store and the HTTP layer.
//!
//! Field names on the wire are camelCase to stay compatible with the mobile
//! client. Integral numbers (confidences, note values) serialize without a
//! fractional part so a model answer of `500` comes back as `500`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ProfileError;

/// The three analysis tasks. Selects the prompt and the result shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanKind {
    Object,
    Text,
    Currency,
}

impl ScanKind {
    pub const ALL: [ScanKind; 3] = [ScanKind::Object, ScanKind::Text, ScanKind::Currency];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanKind::Object => "object",
            ScanKind::Text => "text",
            ScanKind::Currency => "currency",
        }
    }
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ScanKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "object" => Ok(ScanKind::Object),
            "text" => Ok(ScanKind::Text),
            "currency" => Ok(ScanKind::Currency),
            other => Err(format!(
                "unknown scan type '{}': expected object, text, or currency",
                other
            )),
        }
    }
}

// ============ Analysis results ============

/// One identified object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    pub name: String,
    /// Confidence in `[0, 100]`.
    #[serde(serialize_with = "serialize_number")]
    pub confidence: f64,
}

/// Result of the object task. An empty list means nothing was identified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectScan {
    pub objects: Vec<DetectedObject>,
}

/// Result of the text task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextScan {
    pub text: String,
}

/// Result of the currency task. `value == 0` means "not recognized".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyScan {
    #[serde(serialize_with = "serialize_number")]
    pub value: f64,
    pub currency: String,
}

// ============ Persisted rows ============

/// A persisted summary of one successful analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanLogEntry {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ScanKind,
    pub result: String,
    pub confidence: Option<i64>,
    pub timestamp: DateTime<Utc>,
}

/// Insert payload for [`ScanLogEntry`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewScanLog {
    pub kind: ScanKind,
    pub result: String,
    pub confidence: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyLogEntry {
    pub id: i64,
    pub location_lat: Option<String>,
    pub location_lng: Option<String>,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

pub const DEFAULT_EMERGENCY_STATUS: &str = "triggered";

/// Body of `POST /api/emergency/trigger`.
///
/// Every field is optional; the client sends `status = "triggered_no_location"`
/// when geolocation was unavailable.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEmergencyLog {
    #[serde(default)]
    pub location_lat: Option<String>,
    #[serde(default)]
    pub location_lng: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl NewEmergencyLog {
    /// Blank coordinates are stored as missing.
    pub fn normalized(self) -> Self {
        let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Self {
            location_lat: non_blank(self.location_lat),
            location_lng: non_blank(self.location_lng),
            status: Some(
                non_blank(self.status).unwrap_or_else(|| DEFAULT_EMERGENCY_STATUS.to_string()),
            ),
        }
    }

    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or(DEFAULT_EMERGENCY_STATUS)
    }
}

// ============ User profile ============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_contrast: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_speed: Option<f64>,
}

/// The single user of the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub emergency_contact: String,
    pub alternate_contact: Option<String>,
    pub language: String,
    pub preferences: Option<Preferences>,
}

impl UserProfile {
    /// `tel:` URI for the saved emergency contact, if one is set.
    pub fn dial_uri(&self) -> Option<String> {
        let contact = self.emergency_contact.trim();
        if contact.is_empty() {
            None
        } else {
            let digits: String = contact.chars().filter(|c| !c.is_whitespace()).collect();
            Some(format!("tel:{}", digits))
        }
    }
}

pub const DEFAULT_LANGUAGE: &str = "en";

/// Body of `POST /api/user/profile`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    pub emergency_contact: String,
    #[serde(default)]
    pub alternate_contact: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub preferences: Option<Preferences>,
}

impl ProfileUpdate {
    /// The profile seeded on first start.
    pub fn seed() -> Self {
        Self {
            name: "User".to_string(),
            address: Some(String::new()),
            emergency_contact: String::new(),
            alternate_contact: None,
            language: Some(DEFAULT_LANGUAGE.to_string()),
            preferences: None,
        }
    }

    pub fn language(&self) -> &str {
        self.language
            .as_deref()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or(DEFAULT_LANGUAGE)
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.name.trim().is_empty() {
            return Err(ProfileError::new("name", "must not be empty"));
        }
        if let Some(speed) = self.preferences.as_ref().and_then(|p| p.voice_speed) {
            if !(speed > 0.0 && speed <= 4.0) {
                return Err(ProfileError::new(
                    "preferences",
                    "voiceSpeed must be in (0, 4]",
                ));
            }
        }
        Ok(())
    }
}

// ============ Number formatting ============

/// Largest magnitude at which every integer is exactly representable in f64.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

fn as_exact_int(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < MAX_EXACT_INT {
        Some(v as i64)
    } else {
        None
    }
}

/// Serialize integral floats as JSON integers.
pub fn serialize_number<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    match as_exact_int(*v) {
        Some(i) => s.serialize_i64(i),
        None => s.serialize_f64(*v),
    }
}

/// Human form of a number: `500` rather than `500.0`.
pub fn format_number(v: f64) -> String {
    match as_exact_int(v) {
        Some(i) => i.to_string(),
        None => v.to_string(),
    }
}
