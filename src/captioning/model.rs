use sha2::{Digest, Sha256};
use std::path::Path;

/// A description attached to one image's content
///
/// Captions are immutable once built. They are keyed by `content_hash`, so
/// byte-identical images share one caption whatever their name or location.
#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    content_hash: String,
    display_name: String,
    description: String,
    confidence: f64,
}

impl Caption {
    /// Confidence given to alt text written by a person
    pub const AUTHORED_CONFIDENCE: f64 = 1.0;

    /// Create a caption; confidence is clamped to `[0.0, 1.0]`
    pub fn new(
        content_hash: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
        confidence: f64,
    ) -> Self {
        let confidence = if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) };

        Self {
            content_hash: content_hash.into(),
            display_name: display_name.into(),
            description: description.into(),
            confidence,
        }
    }

    /// Caption taken verbatim from pre-existing markup.
    ///
    /// The image is never read for these, so the content hash stays empty
    /// and the caption is never cached.
    pub fn authored(display_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(String::new(), display_name, description, Self::AUTHORED_CONFIDENCE)
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Whether this caption came from authored alt text
    pub fn is_authored(&self) -> bool {
        self.content_hash.is_empty() && self.confidence >= Self::AUTHORED_CONFIDENCE
    }

    /// Same caption reported under another file name
    pub fn renamed(&self, display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            ..self.clone()
        }
    }
}

/// SHA-256 of the image bytes as lowercase hex
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Base file name of a path or `src` reference
pub fn display_name_for(reference: &str) -> String {
    let trimmed = reference.trim_end_matches(['/', '\\']);
    Path::new(trimmed)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| trimmed.to_string())
}
