//! Image codec boundary.
//!
//! Captured frames arrive either as a bare base64 payload or as a complete
//! `data:` URI (the browser's `getScreenshot()` output). Both are normalized
//! into a [`DataUri`] that can be embedded in a model request. The bytes
//! behind the payload are never decoded or validated here; a broken image is
//! only noticed when the model rejects or misreads it.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::error::ScanError;

/// MIME type assumed for bare base64 payloads.
pub const DEFAULT_MIME: &str = "image/jpeg";

/// A `data:` URI ready to be sent as an `image_url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri(String);

impl DataUri {
    /// Normalize a client-supplied image string.
    ///
    /// Returns [`ScanError::MissingImage`] for empty or whitespace-only input.
    ///
    /// ```rust
    /// use visionaid_core::image::DataUri;
    ///
    /// let uri = DataUri::from_client("aGVsbG8=").unwrap();
    /// assert_eq!(uri.as_str(), "data:image/jpeg;base64,aGVsbG8=");
    ///
    /// let uri = DataUri::from_client("data:image/png;base64,aGVsbG8=").unwrap();
    /// assert_eq!(uri.as_str(), "data:image/png;base64,aGVsbG8=");
    /// ```
    pub fn from_client(image: &str) -> Result<Self, ScanError> {
        let image = image.trim();
        if image.is_empty() {
            return Err(ScanError::MissingImage);
        }
        if image.starts_with("data:") {
            Ok(Self(image.to_string()))
        } else {
            Ok(Self(format!("data:{};base64,{}", DEFAULT_MIME, image)))
        }
    }

    /// Encode raw image bytes (e.g. a file read by the CLI).
    pub fn from_bytes(bytes: &[u8], mime: &str) -> Result<Self, ScanError> {
        if bytes.is_empty() {
            return Err(ScanError::MissingImage);
        }
        Ok(Self(format!("data:{};base64,{}", mime, BASE64.encode(bytes))))
    }

    /// The MIME type declared in the URI header, if any.
    pub fn mime(&self) -> Option<&str> {
        let header = self.0.strip_prefix("data:")?.split(',').next()?;
        let mime = header.split(';').next()?;
        if mime.is_empty() {
            None
        } else {
            Some(mime)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length of the URI in bytes; used for request logging.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Guess an image MIME type from a file extension.
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "jpg" | "jpeg" => "image/jpeg",
        _ => DEFAULT_MIME,
    }
}
