/*!
 * Mock description provider for testing.
 *
 * - `MockProvider::working()` - One confident caption derived from the bytes
 * - `MockProvider::low_confidence(c)` - One caption with confidence `c`
 * - `MockProvider::empty()` - No candidates
 * - `MockProvider::failing()` - Always fails with an error
 */

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::providers::{CandidateDescription, DescriptionProvider};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a confident caption
    Working,
    /// Succeeds with a single caption of the given confidence
    LowConfidence { confidence: f64 },
    /// Returns a fixed candidate list
    Candidates(Vec<CandidateDescription>),
    /// Succeeds with no candidates
    Empty,
    /// Always fails with an error
    Failing,
}

/// Mock provider that counts requests
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter
    request_count: Arc<AtomicUsize>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a mock provider that answers with the given confidence
    pub fn low_confidence(confidence: f64) -> Self {
        Self::new(MockBehavior::LowConfidence { confidence })
    }

    /// Create a mock provider with a fixed candidate list
    pub fn with_candidates(candidates: Vec<CandidateDescription>) -> Self {
        Self::new(MockBehavior::Candidates(candidates))
    }

    /// Create a mock provider that never finds a caption
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Number of describe calls received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Caption text the working mock gives for `image`
    pub fn caption_for(image: &[u8]) -> String {
        format!("A picture of {} bytes", image.len())
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior.clone(),
            request_count: Arc::clone(&self.request_count),
        }
    }
}

#[async_trait]
impl DescriptionProvider for MockProvider {
    async fn describe(&self, image: &[u8]) -> Result<Vec<CandidateDescription>, ProviderError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);

        match &self.behavior {
            MockBehavior::Working => Ok(vec![CandidateDescription::new(Self::caption_for(image), 0.95)]),

            MockBehavior::LowConfidence { confidence } => {
                Ok(vec![CandidateDescription::new(Self::caption_for(image), *confidence)])
            }

            MockBehavior::Candidates(candidates) => Ok(candidates.clone()),

            MockBehavior::Empty => Ok(Vec::new()),

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
