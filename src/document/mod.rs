/*!
 * HTML document rewriting.
 *
 * - `tokenizer`: byte-preserving token stream over a document
 * - `rewriter`: single forward pass that re-emits image tags with captions
 */

pub mod rewriter;
pub mod tokenizer;

pub use rewriter::{DocumentRewriter, FlaggedImage, RewriteOptions, RewrittenDocument, SkippedImage};
pub use tokenizer::{Attribute, StartTag, Token, Tokenizer};

use std::borrow::Cow;

/// The parts of one image tag the caption pipeline cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference<'a> {
    /// `src` value as written, empty if absent
    pub raw_src: Cow<'a, str>,
    /// `alt` value as written, empty if absent
    pub raw_alt: Cow<'a, str>,
    /// The first `alt` attribute, kept for verbatim re-emission
    pub alt_attribute: Option<Attribute<'a>>,
    /// Every attribute except `alt`, in source order
    pub other_attributes: Vec<Attribute<'a>>,
}

impl<'a> ImageReference<'a> {
    /// Pull the reference out of an image start tag
    pub fn from_tag(tag: &StartTag<'a>) -> Self {
        let raw_src = tag
            .attributes
            .iter()
            .find(|a| a.is("src"))
            .and_then(|a| a.value_text())
            .unwrap_or_default();

        let alt_attribute = tag.attributes.iter().find(|a| a.is("alt")).copied();

        let other_attributes = tag
            .attributes
            .iter()
            .filter(|a| !a.is("alt"))
            .copied()
            .collect();

        Self {
            raw_src,
            raw_alt: alt_attribute.and_then(|a| a.value_text()).unwrap_or_default(),
            alt_attribute,
            other_attributes,
        }
    }
}
