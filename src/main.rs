// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug, warn};
use std::io::Write;
use std::path::PathBuf;

use altwriter::app_config::{self, Config, LogLevel};
use altwriter::app_controller::{Controller, RunOptions};
use altwriter::file_utils::FileManager;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate shell completions for altwriter
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// altwriter - alt text for the images of static sites
///
/// Captions images with Azure Computer Vision and writes the captions into
/// the `alt` attribute of every image tag in HTML documents.
#[derive(Parser, Debug)]
#[command(name = "altwriter")]
#[command(version)]
#[command(about = "Fill in alt text for images in HTML documents")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "altwriter reads HTML documents, captions every image that has no alt text and
writes the caption into the tag. Images named directly are captioned and reported.

EXAMPLES:
    altwriter site/index.html                 # Report captions without changing anything
    altwriter -w site/                        # Rewrite every document under site/
    altwriter -w -f html,htm public/          # Only consider .html and .htm files
    altwriter -t 0.5 photo.jpg                # Caption one image, flag below 0.5
    altwriter completions bash > altwriter.bash

CONFIGURATION:
    Settings are read from ~/.labelrc.json by default (see --config). The
    endpoint and key can also be given with --endpoint/--key or through the
    ALTWRITER_ENDPOINT and ALTWRITER_API_KEY environment variables. Captions
    are cached by image content in ~/.label_captions.json.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// HTML documents, images or directories to process
    #[arg(value_name = "FILES")]
    files: Vec<PathBuf>,

    /// Save rewritten documents over the originals
    #[arg(short, long)]
    write: bool,

    /// Don't print captions
    #[arg(short, long, visible_alias = "quiet", visible_short_alias = 'q')]
    silent: bool,

    /// Log every provider request
    #[arg(short, long)]
    loud: bool,

    /// Configuration file path
    #[arg(short, long, default_value_t = app_config::default_config_path())]
    config: String,

    /// Subscription key
    #[arg(short, long, env = "ALTWRITER_API_KEY", hide_env_values = true)]
    key: Option<String>,

    /// Azure Computer Vision endpoint
    #[arg(short, long, env = "ALTWRITER_ENDPOINT")]
    endpoint: Option<String>,

    /// Confidence below which captions are flagged
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Caption cache file
    #[arg(long)]
    cache: Option<String>,

    /// Comma separated extensions to consider when walking directories
    #[arg(short = 'f', long = "filetypes", value_delimiter = ',')]
    file_types: Vec<String>,

    /// Set logging level
    #[arg(long, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.target().starts_with("altwriter")
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let color = Self::color_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:<5} {}\x1B[0m",
                color,
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Error => LevelFilter::Error,
        LogLevel::Warn => LevelFilter::Warn,
        LogLevel::Info => LevelFilter::Info,
        LogLevel::Debug => LevelFilter::Debug,
        LogLevel::Trace => LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The logger accepts everything; the effective level is set through
    // log::set_max_level once the config is loaded
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "altwriter", &mut std::io::stdout());
            Ok(())
        }
        None => run_captioning(cli).await,
    }
}

async fn run_captioning(options: CommandLineOptions) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        log::set_max_level(level_filter(cmd_log_level.clone().into()));
    }

    if options.files.is_empty() {
        println!("No files given. Try `altwriter --help`.");
        return Ok(());
    }

    let mut config = Config::load(&options.config)?;

    // Override config with CLI options if provided
    if let Some(key) = &options.key {
        config.key = key.clone();
    }
    if let Some(endpoint) = &options.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(threshold) = options.threshold {
        config.threshold = threshold;
    }
    if let Some(cache) = &options.cache {
        config.cache_file = cache.clone();
    }
    if !options.file_types.is_empty() {
        config.file_types = options.file_types.clone();
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    } else if options.loud && level_filter(config.log_level) < LevelFilter::Debug {
        config.log_level = LogLevel::Debug;
    }

    log::set_max_level(level_filter(config.log_level));

    if !config.has_credentials() {
        eprintln!(
            "An endpoint and key are required. Put them in {} (see --config) or pass --endpoint and --key.",
            options.config
        );
        return Err(anyhow!("Missing endpoint or key"));
    }

    let controller = Controller::with_config(config)?;
    debug!("Using caption cache {}", controller.cache().path().display());

    let files = FileManager::collect_input_files(&options.files, &controller.config().file_types);
    if files.is_empty() {
        warn!("Nothing to do: no files found");
        return Ok(());
    }

    let run_options = RunOptions {
        write: options.write,
        silent: options.silent,
        show_progress: !options.silent,
    };

    let stdout = std::io::stdout();
    let summary = controller.run(&files, &run_options, &mut stdout.lock()).await?;

    if summary.failed > 0 {
        return Err(anyhow!("{} of {} files failed", summary.failed, files.len()));
    }

    Ok(())
}
