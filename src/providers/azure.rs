use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::errors::ProviderError;
use crate::providers::{CandidateDescription, DescriptionProvider};

/// Azure Computer Vision client for the `describe` operation
#[derive(Debug)]
pub struct AzureVision {
    /// HTTP client for API requests
    client: Client,
    /// Subscription key for authentication
    api_key: String,
    /// Resource endpoint, e.g. `https://<name>.cognitiveservices.azure.com`
    endpoint: String,
    /// Maximum number of candidate captions to request
    max_candidates: u32,
}

/// Describe response
#[derive(Debug, Deserialize)]
pub struct DescribeResponse {
    /// Image description block
    pub description: ImageDescription,
}

/// Captions and tags for an image
#[derive(Debug, Deserialize)]
pub struct ImageDescription {
    /// Tags recognised in the image
    #[serde(default)]
    pub tags: Vec<String>,

    /// Candidate captions
    #[serde(default)]
    pub captions: Vec<ImageCaption>,
}

/// Individual caption in a describe response
#[derive(Debug, Deserialize)]
pub struct ImageCaption {
    /// Caption text
    pub text: String,
    /// Confidence between 0 and 1
    pub confidence: f64,
}

impl AzureVision {
    /// Create a new Azure Computer Vision client
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        max_candidates: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            max_candidates: max_candidates.max(1),
        }
    }

    /// Full URL of the describe operation
    pub fn describe_url(&self) -> String {
        format!(
            "{}/vision/v3.2/describe?maxCandidates={}&language=en",
            self.endpoint.trim_end_matches('/'),
            self.max_candidates
        )
    }

    /// Extract candidates from a describe response
    pub fn extract_candidates(response: DescribeResponse) -> Vec<CandidateDescription> {
        response
            .description
            .captions
            .into_iter()
            .map(|c| CandidateDescription::new(c.text, c.confidence))
            .collect()
    }

    fn map_status(status: StatusCode, message: String) -> ProviderError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthenticationError(message),
            StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimitExceeded(message),
            _ => ProviderError::ApiError {
                status_code: status.as_u16(),
                message,
            },
        }
    }
}

#[async_trait]
impl DescriptionProvider for AzureVision {
    async fn describe(&self, image: &[u8]) -> Result<Vec<CandidateDescription>, ProviderError> {
        let url = self.describe_url();
        debug!("Sending {} bytes to {}", image.len(), url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/octet-stream")
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .body(image.to_vec())
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    ProviderError::ConnectionError(e.to_string())
                } else {
                    ProviderError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Azure Computer Vision error ({}): {}", status, error_text);
            return Err(Self::map_status(status, error_text));
        }

        let describe_response = response
            .json::<DescribeResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(Self::extract_candidates(describe_response))
    }

    fn name(&self) -> &str {
        "Azure Computer Vision"
    }
}
