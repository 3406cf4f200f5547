/*!
 * Resolution of image references against a document's ancestor chain.
 *
 * A `src` attribute is relative to *some* root, but the document tree and the
 * image tree may have been moved independently and only share a suffix of
 * their directory layout. The resolver tries the reference against every
 * ancestor of the document, closest first, and keeps the first hit.
 */

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use log::debug;

use crate::errors::PathError;

/// Maps references found inside a document onto files on disk
#[derive(Debug, Clone, Copy, Default)]
pub struct PathResolver;

impl PathResolver {
    /// Create a new resolver
    pub fn new() -> Self {
        Self
    }

    /// Find the file `reference` denotes for the document at `document_path`.
    ///
    /// `document_path` must be absolute and exist. It may name the document
    /// itself or its containing directory.
    pub fn resolve(&self, document_path: &Path, reference: &str) -> Result<PathBuf, PathError> {
        if !document_path.is_absolute() {
            return Err(PathError::InvalidBase {
                path: document_path.to_path_buf(),
            });
        }

        let metadata = std::fs::metadata(document_path).map_err(|_| PathError::InvalidBase {
            path: document_path.to_path_buf(),
        })?;

        let base_dir = if metadata.is_dir() {
            document_path
        } else {
            document_path.parent().unwrap_or(document_path)
        };

        let root: PathBuf = base_dir
            .components()
            .take_while(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
            .collect();
        let base_parts = Self::split_components(base_dir);
        let reference_parts = Self::split_components(Path::new(reference));

        for i in (0..=base_parts.len()).rev() {
            let candidate = Self::join(&root, &base_parts[..i], &reference_parts);
            debug!("Trying {} for reference '{}'", candidate.display(), reference);

            if candidate.is_file() {
                return Ok(candidate);
            }
        }

        Err(PathError::NotFound {
            reference: reference.to_string(),
        })
    }

    // Root, prefix and `.` components are dropped; `..` is kept for `join`.
    fn split_components(path: &Path) -> Vec<OsString> {
        path.components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part.to_os_string()),
                Component::ParentDir => Some(OsString::from("..")),
                Component::RootDir | Component::Prefix(_) | Component::CurDir => None,
            })
            .collect()
    }

    /// Join an absolute component list with a relative one, resolving `..` lexically
    fn join(root: &Path, base: &[OsString], other: &[OsString]) -> PathBuf {
        let mut parts: Vec<&OsString> = Vec::with_capacity(base.len() + other.len());

        for part in base.iter().chain(other.iter()) {
            if part == ".." {
                // `..` at the root stays at the root
                parts.pop();
            } else {
                parts.push(part);
            }
        }

        let mut path = root.to_path_buf();
        for part in parts {
            path.push(part);
        }
        path
    }
}
