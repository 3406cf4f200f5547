/*!
 * Persistent caption cache.
 *
 * Captions are keyed by the content hash of the image they describe and kept
 * in a JSON file. Every insertion rewrites the file before returning, so an
 * interrupted run never loses a description that was already paid for.
 */

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use log::{debug, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::captioning::model::Caption;
use crate::errors::CacheError;

/// On-disk shape of one cache entry
#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord {
    #[serde(default)]
    hash: String,

    #[serde(default, alias = "FilePath")]
    display_name: String,

    #[serde(default, alias = "Description")]
    description: String,

    #[serde(default, alias = "Confidence")]
    confidence: f64,
}

impl From<&Caption> for CacheRecord {
    fn from(caption: &Caption) -> Self {
        Self {
            hash: caption.content_hash().to_string(),
            display_name: caption.display_name().to_string(),
            description: caption.description().to_string(),
            confidence: caption.confidence(),
        }
    }
}

/// Content-addressed caption cache backed by a JSON file
pub struct CaptionCache {
    /// Storage location
    path: PathBuf,

    /// Entries ordered by hash so the file diffs cleanly
    entries: Arc<RwLock<BTreeMap<String, Caption>>>,

    /// Set while the file lags behind `entries` after a failed write
    unsaved: Arc<AtomicBool>,

    /// Cache hit counter
    hits: Arc<AtomicUsize>,

    /// Cache miss counter
    misses: Arc<AtomicUsize>,
}

impl CaptionCache {
    /// Load the cache stored at `path`.
    ///
    /// Never fails: a missing, empty or unparsable file yields an empty cache.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = Self::read_entries(&path);

        debug!("Loaded {} cached caption(s) from {}", entries.len(), path.display());

        Self {
            path,
            entries: Arc::new(RwLock::new(entries)),
            unsaved: Arc::new(AtomicBool::new(false)),
            hits: Arc::new(AtomicUsize::new(0)),
            misses: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn read_entries(path: &Path) -> BTreeMap<String, Caption> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No caption cache at {} ({}), starting empty", path.display(), e);
                return BTreeMap::new();
            }
        };

        if content.trim().is_empty() {
            return BTreeMap::new();
        }

        let records: BTreeMap<String, CacheRecord> = match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(e) => {
                warn!("Ignoring unreadable caption cache {}: {}", path.display(), e);
                return BTreeMap::new();
            }
        };

        records
            .into_iter()
            .filter(|(_, record)| !record.description.is_empty())
            .map(|(key, record)| {
                let caption = Caption::new(key.clone(), record.display_name, record.description, record.confidence);
                (key, caption)
            })
            .collect()
    }

    /// Get the caption cached for `content_hash`
    ///
    /// Never touches the entries or the file. Only the hit and miss counters
    /// reported by [`CaptionCache::stats`] move.
    pub fn get(&self, content_hash: &str) -> Option<Caption> {
        let entries = self.entries.read();

        match entries.get(content_hash) {
            Some(caption) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for {} ({})", caption.display_name(), truncate_hash(content_hash));
                Some(caption.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache miss for {}", truncate_hash(content_hash));
                None
            }
        }
    }

    /// Insert a caption and rewrite the storage file.
    ///
    /// Captions with an empty description and hashes that are already cached
    /// are not inserted. The write lock is held until the file is on disk. If
    /// the write fails the entry stays cached in memory and the next `put`
    /// writes the file again, even for a hash that is already cached.
    pub fn put(&self, caption: &Caption) -> Result<(), CacheError> {
        if caption.description().is_empty() || caption.content_hash().is_empty() {
            return Ok(());
        }

        let mut entries = self.entries.write();

        if entries.contains_key(caption.content_hash()) {
            debug!("Keeping existing cache entry for {}", truncate_hash(caption.content_hash()));
            if !self.unsaved.load(Ordering::Acquire) {
                return Ok(());
            }
        } else {
            entries.insert(caption.content_hash().to_string(), caption.clone());
        }

        if let Err(e) = self.save(&entries) {
            self.unsaved.store(true, Ordering::Release);
            return Err(e);
        }
        self.unsaved.store(false, Ordering::Release);

        debug!("Cached caption for {}", caption.display_name());
        Ok(())
    }

    fn save(&self, entries: &BTreeMap<String, Caption>) -> Result<(), CacheError> {
        let records: BTreeMap<&str, CacheRecord> = entries
            .iter()
            .map(|(key, caption)| (key.as_str(), CacheRecord::from(caption)))
            .collect();
        let json = serde_json::to_string_pretty(&records)?;

        let io_error = |source| CacheError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(io_error)?;

        // Write beside the target and rename so a crash never leaves half a file
        let mut file = NamedTempFile::new_in(&dir).map_err(io_error)?;
        file.write_all(json.as_bytes()).map_err(io_error)?;
        file.as_file().sync_all().map_err(io_error)?;
        file.persist(&self.path).map_err(|e| io_error(e.error))?;

        Ok(())
    }

    /// Get cache statistics as (hits, misses, hit rate)
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        (hits, misses, hit_rate)
    }

    /// Get the number of entries in the cache
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Storage location
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Clone for CaptionCache {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            entries: self.entries.clone(),
            unsaved: self.unsaved.clone(),
            hits: self.hits.clone(),
            misses: self.misses.clone(),
        }
    }
}

/// Shorten a hash for log output
fn truncate_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
