use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::app_config::Config;
use crate::captioning::{Caption, CaptionCache, CaptionResolver};
use crate::document::DocumentRewriter;
use crate::file_utils::{FileManager, FileType};
use crate::providers::DescriptionProvider;
use crate::providers::azure::AzureVision;

// @module: Application controller for batch captioning

/// Per-run switches coming from the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Save rewritten documents over the originals
    pub write: bool,
    /// Suppress the caption report
    pub silent: bool,
    /// Draw a progress bar on stderr
    pub show_progress: bool,
}

/// Counters for one batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// HTML documents processed
    pub documents: usize,
    /// Image files named directly
    pub images: usize,
    /// Captions produced, authored ones included
    pub captions: usize,
    /// Captions that came with warnings
    pub flagged: usize,
    /// Images left without a caption
    pub skipped: usize,
    /// Files that could not be processed
    pub failed: usize,
}

/// Main application controller for captioning files
pub struct Controller<P: DescriptionProvider = AzureVision> {
    // @field: App configuration
    config: Config,
    // @field: Caption cache shared by every file in the run
    cache: CaptionCache,
    // @field: Description provider
    provider: P,
}

impl Controller<AzureVision> {
    // @method: Create a new controller talking to Azure Computer Vision
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;

        let provider = AzureVision::new(
            config.key.trim(),
            config.endpoint.trim(),
            config.max_candidates,
            config.timeout(),
        );

        Ok(Self::with_provider(config, provider))
    }
}

impl<P: DescriptionProvider> Controller<P> {
    // @method: Create a controller around any provider
    pub fn with_provider(config: Config, provider: P) -> Self {
        let cache = CaptionCache::load(config.cache_path());
        Self { config, cache, provider }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &CaptionCache {
        &self.cache
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Caption or rewrite every file in `files`, reporting captions to `out`
    ///
    /// A file that fails is logged and counted; the rest of the batch still
    /// runs. Only failures writing to `out` end the run early.
    pub async fn run<W: Write>(&self, files: &[PathBuf], options: &RunOptions, out: &mut W) -> Result<RunSummary> {
        let start_time = std::time::Instant::now();
        let resolver = CaptionResolver::new(&self.cache, &self.provider, self.config.caption_policy());
        let rewriter = DocumentRewriter::new(&resolver, self.config.rewrite_options());

        let progress_bar = if options.show_progress {
            let pb = ProgressBar::new(files.len() as u64);
            let template_result = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg}")
                .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            pb.set_style(template_result.progress_chars("█▓▒░"));
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut summary = RunSummary::default();

        for file in files {
            let file_name = file
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| file.display().to_string());
            progress_bar.set_message(file_name.clone());

            match FileManager::detect_file_type(file) {
                FileType::Image => {
                    summary.images += 1;
                    match resolver.caption_image(file).await {
                        Ok(outcome) => {
                            summary.captions += 1;
                            if !outcome.warnings().is_empty() {
                                summary.flagged += 1;
                            }
                            if !options.silent {
                                progress_bar.suspend(|| Self::report(out, outcome.caption()))?;
                            }
                        }
                        Err(e) => {
                            error!("Error processing file {}: {}", file_name, e);
                            summary.failed += 1;
                        }
                    }
                }
                FileType::Document => {
                    summary.documents += 1;
                    if let Err(e) = self
                        .process_document(&rewriter, file, options, &progress_bar, out, &mut summary)
                        .await
                    {
                        error!("Error processing file {}: {}", file_name, e);
                        summary.failed += 1;
                    }
                }
                FileType::Unknown => {
                    debug!("Skipping {}: not an image or HTML document", file.display());
                }
            }

            progress_bar.inc(1);
        }

        progress_bar.finish_and_clear();

        let (hits, misses, hit_rate) = self.cache.stats();
        debug!(
            "Cache: {} hits, {} misses ({:.1}% hit rate), {} entries",
            hits,
            misses,
            hit_rate * 100.0,
            self.cache.len()
        );
        info!(
            "Processed {} documents and {} images in {:.1}s: {} captions, {} flagged, {} skipped, {} failed",
            summary.documents,
            summary.images,
            start_time.elapsed().as_secs_f64(),
            summary.captions,
            summary.flagged,
            summary.skipped,
            summary.failed
        );

        Ok(summary)
    }

    async fn process_document<W: Write>(
        &self,
        rewriter: &DocumentRewriter<'_>,
        file: &Path,
        options: &RunOptions,
        progress_bar: &ProgressBar,
        out: &mut W,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let document = rewriter.rewrite(file).await?;

        summary.captions += document.captions().len();
        summary.flagged += document.flagged().len();
        summary.skipped += document.skipped().len();

        if !options.silent {
            progress_bar.suspend(|| -> std::io::Result<()> {
                for caption in document.captions() {
                    Self::report(out, caption)?;
                }
                Ok(())
            })?;
        }

        if !document.skipped().is_empty() {
            warn!(
                "{}: {} image(s) left without a caption",
                file.display(),
                document.skipped().len()
            );
        }

        if !document.is_changed() {
            debug!("{} is already up to date", file.display());
        } else if options.write {
            document.write().await?;
        } else {
            debug!("{} has new captions, pass --write to save them", file.display());
        }

        Ok(())
    }

    fn report<W: Write>(out: &mut W, caption: &Caption) -> std::io::Result<()> {
        writeln!(out, "{}\t{}", caption.display_name(), caption.description())
    }
}
