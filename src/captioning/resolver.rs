/*!
 * Caption resolution policy.
 *
 * Authored alt text always wins. Otherwise the image is located, hashed and
 * looked up in the cache; only a cache miss reaches the description provider,
 * and whatever the provider produces is cached before it is returned.
 */

use std::path::Path;

use log::{debug, error, info, warn};

use crate::captioning::cache::CaptionCache;
use crate::captioning::model::{Caption, content_hash, display_name_for};
use crate::document::ImageReference;
use crate::errors::{CacheError, CaptionError};
use crate::path_resolver::PathResolver;
use crate::providers::{CandidateDescription, DescriptionProvider};

/// Thresholds and text policy applied to provider output
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionPolicy {
    /// Minimum confidence for a caption to pass without review
    pub threshold: f64,

    /// Marker prepended to weak captions before they are cached
    pub low_confidence_prefix: Option<String>,
}

impl Default for CaptionPolicy {
    fn default() -> Self {
        Self {
            threshold: 0.7,
            low_confidence_prefix: None,
        }
    }
}

/// Something the caller should know about a caption that is still usable
#[derive(Debug)]
pub enum CaptionWarning {
    /// The provider was less certain than the threshold requires
    LowConfidence {
        confidence: f64,
        threshold: f64,
    },

    /// The caption could not be written to the cache file
    CacheWrite(CacheError),
}

impl std::fmt::Display for CaptionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LowConfidence { confidence, threshold } => {
                write!(f, "low confidence: {:.3} (threshold {:.3})", confidence, threshold)
            }
            Self::CacheWrite(e) => write!(f, "{}", e),
        }
    }
}

/// Result of captioning one image
#[derive(Debug)]
pub enum CaptionOutcome {
    /// Caption ready to use as is
    Captioned(Caption),

    /// Caption usable but should be reviewed
    Flagged {
        caption: Caption,
        warnings: Vec<CaptionWarning>,
    },
}

impl CaptionOutcome {
    pub fn caption(&self) -> &Caption {
        match self {
            Self::Captioned(caption) | Self::Flagged { caption, .. } => caption,
        }
    }

    pub fn warnings(&self) -> &[CaptionWarning] {
        match self {
            Self::Captioned(_) => &[],
            Self::Flagged { warnings, .. } => warnings,
        }
    }

    pub fn is_low_confidence(&self) -> bool {
        self.warnings()
            .iter()
            .any(|w| matches!(w, CaptionWarning::LowConfidence { .. }))
    }

    pub fn into_parts(self) -> (Caption, Vec<CaptionWarning>) {
        match self {
            Self::Captioned(caption) => (caption, Vec::new()),
            Self::Flagged { caption, warnings } => (caption, warnings),
        }
    }

    fn from_parts(caption: Caption, warnings: Vec<CaptionWarning>) -> Self {
        if warnings.is_empty() {
            Self::Captioned(caption)
        } else {
            Self::Flagged { caption, warnings }
        }
    }
}

/// Produces captions using the cache first and the provider second
pub struct CaptionResolver<'a> {
    cache: &'a CaptionCache,
    provider: &'a dyn DescriptionProvider,
    paths: PathResolver,
    policy: CaptionPolicy,
}

impl<'a> CaptionResolver<'a> {
    pub fn new(cache: &'a CaptionCache, provider: &'a dyn DescriptionProvider, policy: CaptionPolicy) -> Self {
        Self {
            cache,
            provider,
            paths: PathResolver::new(),
            policy,
        }
    }

    pub fn policy(&self) -> &CaptionPolicy {
        &self.policy
    }

    /// Caption an image referenced from the document at `document_path`
    pub async fn resolve(
        &self,
        document_path: &Path,
        reference: &ImageReference<'_>,
    ) -> Result<CaptionOutcome, CaptionError> {
        if !reference.raw_alt.trim().is_empty() {
            debug!("Keeping authored alt text for {}", reference.raw_src);
            let caption = Caption::authored(display_name_for(&reference.raw_src), &*reference.raw_alt);
            return Ok(CaptionOutcome::Captioned(caption));
        }

        let image_path = self.paths.resolve(document_path, &reference.raw_src)?;
        debug!("Resolved {} to {}", reference.raw_src, image_path.display());

        self.caption_image(&image_path).await
    }

    /// Caption the image file at `image_path`
    pub async fn caption_image(&self, image_path: &Path) -> Result<CaptionOutcome, CaptionError> {
        let bytes = tokio::fs::read(image_path)
            .await
            .map_err(|source| CaptionError::ImageRead {
                path: image_path.to_path_buf(),
                source,
            })?;

        let hash = content_hash(&bytes);
        let display_name = display_name_for(&image_path.to_string_lossy());

        if let Some(cached) = self.cache.get(&hash) {
            let caption = cached.renamed(display_name);
            let warnings = self.confidence_warnings(caption.confidence());
            return Ok(CaptionOutcome::from_parts(caption, warnings));
        }

        info!("Requesting description for {} from {}", display_name, self.provider.name());
        let candidates = self.provider.describe(&bytes).await?;

        let best = select_best(candidates).ok_or_else(|| CaptionError::NoCaption(display_name.clone()))?;

        let mut warnings = self.confidence_warnings(best.confidence);
        let mut description = best.text.trim().to_string();

        if !warnings.is_empty() {
            warn!(
                "Low confidence caption for {} ({:.3} < {:.3}): {}",
                display_name, best.confidence, self.policy.threshold, description
            );
            if let Some(prefix) = &self.policy.low_confidence_prefix {
                description = format!("{}{}", prefix, description);
            }
        }

        let caption = Caption::new(hash, display_name, description, best.confidence);

        if let Err(e) = self.cache.put(&caption) {
            error!("Failed to save caption for {}: {}", caption.display_name(), e);
            warnings.push(CaptionWarning::CacheWrite(e));
        }

        Ok(CaptionOutcome::from_parts(caption, warnings))
    }

    fn confidence_warnings(&self, confidence: f64) -> Vec<CaptionWarning> {
        if confidence < self.policy.threshold {
            vec![CaptionWarning::LowConfidence {
                confidence,
                threshold: self.policy.threshold,
            }]
        } else {
            Vec::new()
        }
    }
}

/// Highest-confidence candidate with usable text; input order is not trusted
fn select_best(candidates: Vec<CandidateDescription>) -> Option<CandidateDescription> {
    candidates
        .into_iter()
        .filter(|c| !c.text.trim().is_empty())
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
}
