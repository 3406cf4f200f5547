/*!
 * Description providers.
 *
 * A provider turns raw image bytes into candidate descriptions:
 * - `azure`: Azure Computer Vision `describe` API
 * - `mock`: deterministic provider for tests and benchmarks
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// One (text, confidence) guess returned for an image
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateDescription {
    /// Description text
    pub text: String,

    /// Provider certainty between 0.0 and 1.0
    pub confidence: f64,
}

impl CandidateDescription {
    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Common trait for all description providers
///
/// Implementations may return candidates in any order; an empty list means
/// the provider had nothing to say about the image.
#[async_trait]
pub trait DescriptionProvider: Send + Sync + Debug {
    /// Describe an image
    ///
    /// # Arguments
    /// * `image` - Raw bytes of the image file
    ///
    /// # Returns
    /// * `Result<Vec<CandidateDescription>, ProviderError>` - Candidates or an error
    async fn describe(&self, image: &[u8]) -> Result<Vec<CandidateDescription>, ProviderError>;

    /// Short name used in log output
    fn name(&self) -> &str;
}

pub mod azure;
pub mod mock;
