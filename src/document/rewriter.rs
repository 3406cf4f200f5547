/*!
 * Streaming rewrite of image tags.
 *
 * The document is read once, front to back. Every token is copied to the
 * output unchanged except self-closing image tags, which are rebuilt with a
 * single leading `alt` attribute followed by the original attributes in their
 * original order and spelling.
 */

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::captioning::{Caption, CaptionResolver, CaptionWarning};
use crate::document::ImageReference;
use crate::document::tokenizer::{StartTag, Token, Tokenizer};
use crate::errors::{CaptionError, DocumentError, PathError};

/// How per-image failures are treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteOptions {
    /// A provider failure aborts the document instead of skipping the image
    pub abort_on_provider_error: bool,
}

/// An image whose caption needs review
#[derive(Debug)]
pub struct FlaggedImage {
    pub caption: Caption,
    pub warnings: Vec<CaptionWarning>,
}

/// An image left untouched because no caption could be produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedImage {
    /// `src` as written in the document
    pub reference: String,
    /// Why it was skipped
    pub reason: String,
}

/// Output of one rewrite pass
#[derive(Debug)]
pub struct RewrittenDocument {
    path: PathBuf,
    content: Vec<u8>,
    changed: bool,
    captions: Vec<Caption>,
    flagged: Vec<FlaggedImage>,
    skipped: Vec<SkippedImage>,
}

impl RewrittenDocument {
    /// Document location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full rewritten bytes
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Rewritten content as text, invalid UTF-8 replaced
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }

    /// Whether the rewritten text differs from the input
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Captions in document order
    pub fn captions(&self) -> &[Caption] {
        &self.captions
    }

    /// Captions that came with warnings, in document order
    pub fn flagged(&self) -> &[FlaggedImage] {
        &self.flagged
    }

    /// Images left untouched, in document order
    pub fn skipped(&self) -> &[SkippedImage] {
        &self.skipped
    }

    /// Save the rewritten text over the original document
    pub async fn write(&self) -> Result<(), DocumentError> {
        tokio::fs::write(&self.path, &self.content)
            .await
            .map_err(|source| DocumentError::Io {
                path: self.path.clone(),
                source,
            })?;

        info!("Updated {}", self.path.display());
        Ok(())
    }
}

/// Rewrites the image tags of HTML documents
pub struct DocumentRewriter<'a> {
    resolver: &'a CaptionResolver<'a>,
    options: RewriteOptions,
}

impl<'a> DocumentRewriter<'a> {
    pub fn new(resolver: &'a CaptionResolver<'a>, options: RewriteOptions) -> Self {
        Self { resolver, options }
    }

    /// Whether `path` names an HTML document
    pub fn is_html(path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
            .unwrap_or(false)
    }

    /// Read and rewrite the document at `document_path`
    pub async fn rewrite(&self, document_path: &Path) -> Result<RewrittenDocument, DocumentError> {
        if !Self::is_html(document_path) {
            return Err(DocumentError::NotHtml(document_path.to_path_buf()));
        }

        let io_error = |source| DocumentError::Io {
            path: document_path.to_path_buf(),
            source,
        };

        let absolute = tokio::fs::canonicalize(document_path).await.map_err(io_error)?;
        let html = tokio::fs::read(&absolute).await.map_err(io_error)?;

        self.rewrite_bytes(&absolute, &html).await
    }

    /// Rewrite `html` as if it were stored at `document_path`
    pub async fn rewrite_str(&self, document_path: &Path, html: &str) -> Result<RewrittenDocument, DocumentError> {
        self.rewrite_bytes(document_path, html.as_bytes()).await
    }

    /// Rewrite raw document bytes as if they were stored at `document_path`.
    ///
    /// The bytes need not be UTF-8; everything outside rewritten image tags
    /// is copied through unchanged.
    pub async fn rewrite_bytes(&self, document_path: &Path, html: &[u8]) -> Result<RewrittenDocument, DocumentError> {
        let mut content = Vec::with_capacity(html.len() + html.len() / 8);
        let mut captions = Vec::new();
        let mut flagged = Vec::new();
        let mut skipped = Vec::new();

        for token in Tokenizer::new(html) {
            let token = token.map_err(|e| DocumentError::MalformedTokenStream {
                offset: e.offset,
                reason: e.reason.to_string(),
            })?;

            let tag = match token {
                Token::StartTag(tag) if tag.is_image() && tag.self_closing => tag,
                Token::StartTag(tag) if tag.is_image() => {
                    debug!(
                        "Leaving non self-closing image tag untouched: {}",
                        String::from_utf8_lossy(tag.raw)
                    );
                    content.extend_from_slice(tag.raw);
                    continue;
                }
                other => {
                    content.extend_from_slice(other.raw());
                    continue;
                }
            };

            let reference = ImageReference::from_tag(&tag);

            match self.resolver.resolve(document_path, &reference).await {
                Ok(outcome) => {
                    content.extend_from_slice(&render_image_tag(&tag, &reference, outcome.caption()));

                    let (caption, warnings) = outcome.into_parts();
                    if !warnings.is_empty() {
                        flagged.push(FlaggedImage {
                            caption: caption.clone(),
                            warnings,
                        });
                    }
                    captions.push(caption);
                }
                Err(e) if self.is_recoverable(&e) => {
                    warn!("Can't caption {}; {}.", reference.raw_src, e);
                    content.extend_from_slice(tag.raw);
                    skipped.push(SkippedImage {
                        reference: reference.raw_src.to_string(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(RewrittenDocument {
            path: document_path.to_path_buf(),
            changed: content != html,
            content,
            captions,
            flagged,
            skipped,
        })
    }

    fn is_recoverable(&self, error: &CaptionError) -> bool {
        match error {
            CaptionError::Path(PathError::NotFound { .. }) | CaptionError::NoCaption(_) => true,
            CaptionError::Provider(_) => !self.options.abort_on_provider_error,
            CaptionError::Path(PathError::InvalidBase { .. }) | CaptionError::ImageRead { .. } => false,
        }
    }
}

/// Rebuild an image tag with `caption` as its only `alt`
fn render_image_tag(tag: &StartTag<'_>, reference: &ImageReference<'_>, caption: &Caption) -> Vec<u8> {
    let mut out = Vec::with_capacity(tag.raw.len() + caption.description().len() + 8);
    out.push(b'<');
    out.extend_from_slice(tag.name);
    out.push(b' ');

    match reference.alt_attribute {
        Some(alt) if caption.is_authored() => out.extend_from_slice(alt.raw),
        _ => {
            out.extend_from_slice(b"alt=\"");
            out.extend_from_slice(escape_attribute(caption.description()).as_bytes());
            out.push(b'"');
        }
    }

    for attribute in &reference.other_attributes {
        out.push(b' ');
        out.extend_from_slice(attribute.raw);
    }

    out.extend_from_slice(b" />");
    out
}

/// Escape text for a double-quoted attribute value
fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
