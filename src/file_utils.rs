use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

// @module: File and directory utilities

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
const DOCUMENT_EXTENSIONS: [&str; 2] = ["html", "htm"];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @expands: Leading `~` to the home directory
    pub fn expand_user_dir(path: &Path) -> PathBuf {
        let Ok(rest) = path.strip_prefix("~") else {
            return path.to_path_buf();
        };

        match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => {
                warn!("No home directory, using {} as given", path.display());
                path.to_path_buf()
            }
        }
    }

    /// Detect whether a path names an image, an HTML document or neither
    pub fn detect_file_type<P: AsRef<Path>>(path: P) -> FileType {
        let Some(ext) = path.as_ref().extension() else {
            return FileType::Unknown;
        };
        let ext = ext.to_string_lossy().to_lowercase();

        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            FileType::Image
        } else if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
            FileType::Document
        } else {
            FileType::Unknown
        }
    }

    /// Expand command line arguments into the files to process
    ///
    /// Plain files are taken as given. Directories are walked recursively,
    /// skipping hidden directories, and filtered by `file_types` when it is
    /// not empty. Paths that cannot be read are logged and skipped.
    pub fn collect_input_files(args: &[PathBuf], file_types: &[String]) -> Vec<PathBuf> {
        let wanted: Vec<String> = file_types
            .iter()
            .map(|t| t.trim().trim_start_matches('.').to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        let mut files = Vec::new();

        for arg in args {
            if arg.is_file() {
                files.push(arg.clone());
                continue;
            }

            if !arg.is_dir() {
                warn!("Skipping {}: no such file or directory", arg.display());
                continue;
            }

            let walker = WalkDir::new(arg)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !Self::is_hidden_dir(e));

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!("Skipping unreadable path: {}", e);
                        continue;
                    }
                };

                if !entry.file_type().is_file() {
                    continue;
                }

                if wanted.is_empty() || Self::has_extension(entry.path(), &wanted) {
                    files.push(entry.into_path());
                }
            }
        }

        debug!("Collected {} input files", files.len());
        files
    }

    fn is_hidden_dir(entry: &DirEntry) -> bool {
        entry.file_type().is_dir() && entry.file_name().to_string_lossy().starts_with('.')
    }

    fn has_extension(path: &Path, wanted: &[String]) -> bool {
        path.extension()
            .map(|ext| wanted.contains(&ext.to_string_lossy().to_lowercase()))
            .unwrap_or(false)
    }
}

/// Enum representing different file types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Image to caption directly
    Image,
    /// HTML document to rewrite
    Document,
    /// Anything else
    Unknown,
}
