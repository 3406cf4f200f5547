/*!
 * Error types for the altwriter application.
 *
 * Each stage of the rewrite pipeline has its own error enum so callers can
 * decide per variant whether to skip an image, abort a document, or stop the
 * run. All of them use the thiserror crate for ergonomic definitions.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when working with description provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

/// Errors raised while mapping an image reference onto a file
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// No ancestor of the document contains the referenced file
    #[error("{reference} not found on disk")]
    NotFound {
        /// The reference as written in the document
        reference: String,
    },

    /// The document path is not absolute or does not exist
    #[error("{} must be an existing absolute path", .path.display())]
    InvalidBase {
        /// The offending document path
        path: PathBuf,
    },
}

/// Errors raised while persisting the caption cache
#[derive(Error, Debug)]
pub enum CacheError {
    /// The cache could not be serialized
    #[error("Failed to serialize caption cache: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The cache file could not be written
    #[error("Failed to write caption cache {}: {source}", .path.display())]
    Io {
        /// Storage location
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },
}

/// Errors that prevent a caption from being produced for one image
#[derive(Error, Debug)]
pub enum CaptionError {
    /// The image could not be located
    #[error(transparent)]
    Path(#[from] PathError),

    /// The provider returned no usable candidate
    #[error("no descriptions found for {0}")]
    NoCaption(String),

    /// The provider call failed
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The image was located but could not be read
    #[error("Failed to read image {}: {source}", .path.display())]
    ImageRead {
        /// Resolved image path
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },
}

/// Errors that abort the rewrite of a whole document
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The path does not name an HTML document
    #[error("{} is not an .html file", .0.display())]
    NotHtml(PathBuf),

    /// The document could not be read or written
    #[error("Document I/O failed for {}: {source}", .path.display())]
    Io {
        /// Document path
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The markup could not be tokenized
    #[error("Malformed markup at byte {offset}: {reason}")]
    MalformedTokenStream {
        /// Byte offset where the bad token starts
        offset: usize,
        /// What was left unterminated
        reason: String,
    },

    /// An image failed in a way that is fatal for the document
    #[error("Caption error: {0}")]
    Caption(#[from] CaptionError),
}
