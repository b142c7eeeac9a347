// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use tokio::sync::watch;

use crate::app_config::{Config, DualLayout, OutputMode};
use crate::pipeline::Pipeline;

mod app_config;
mod document;
mod errors;
mod fonts;
mod geometry;
mod language_utils;
mod layout;
mod pipeline;
mod providers;
mod reconstruct;
mod report;
mod segment;
mod translation;

/// CLI wrapper for OutputMode to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliOutputMode {
    Mono,
    Dual,
    Both,
}

impl From<CliOutputMode> for OutputMode {
    fn from(mode: CliOutputMode) -> Self {
        match mode {
            CliOutputMode::Mono => OutputMode::Mono,
            CliOutputMode::Dual => OutputMode::Dual,
            CliOutputMode::Both => OutputMode::Both,
        }
    }
}

/// CLI wrapper for DualLayout to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliDualLayout {
    Alternate,
    SideBySide,
}

impl From<CliDualLayout> for DualLayout {
    fn from(layout: CliDualLayout) -> Self {
        match layout {
            CliDualLayout::Alternate => DualLayout::Alternate,
            CliDualLayout::SideBySide => DualLayout::SideBySide,
        }
    }
}

/// CLI wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a PDF document (default command)
    #[command(alias = "translate")]
    Translate(TranslateArgs),
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Input PDF file to translate
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Output directory (defaults to the input file's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Source language code (e.g. 'en', 'fr')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g. 'zh', 'de')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Which artifacts to produce
    #[arg(long, value_enum)]
    output_mode: Option<CliOutputMode>,

    /// Page arrangement of the bilingual artifact
    #[arg(long, value_enum)]
    dual_layout: Option<CliDualLayout>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// pdflate - layout-preserving PDF translation
///
/// Translates the text of a PDF while leaving images, vector graphics and
/// layout geometry untouched, producing monolingual and bilingual output.
#[derive(Parser, Debug)]
#[command(name = "pdflate")]
#[command(version = "0.3.0")]
#[command(about = "Layout-preserving AI PDF translation")]
#[command(long_about = "pdflate translates the text content of PDF documents while preserving \
their layout, images and vector graphics.

EXAMPLES:
    pdflate paper.pdf                          # Translate using default config
    pdflate -s en -t zh paper.pdf              # Translate from English to Chinese
    pdflate --output-mode both paper.pdf       # Produce mono and dual artifacts
    pdflate --dual-layout side-by-side paper.pdf
    pdflate --log-level debug paper.pdf

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a
    different file with --config-path. If the config file doesn't exist, a
    default one will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input PDF file to translate
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Output directory (defaults to the input file's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Source language code (e.g. 'en', 'fr')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g. 'zh', 'de')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Which artifacts to produce
    #[arg(long, value_enum)]
    output_mode: Option<CliOutputMode>,

    /// Page arrangement of the bilingual artifact
    #[arg(long, value_enum)]
    dual_layout: Option<CliDualLayout>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// Custom logger writing colored, timestamped lines to stderr.
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

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
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S%.3f");
            let color = Self::color_for_level(record.level());
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:5} {}\x1B[0m",
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

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize with info level; updated after the config is loaded
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();
    match cli.command {
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => {
            let input_path = cli
                .input_path
                .ok_or_else(|| anyhow!("INPUT_PATH is required when no subcommand is specified"))?;
            run_translate(TranslateArgs {
                input_path,
                output_dir: cli.output_dir,
                source_language: cli.source_language,
                target_language: cli.target_language,
                model: cli.model,
                output_mode: cli.output_mode,
                dual_layout: cli.dual_layout,
                config_path: cli.config_path,
                log_level: cli.log_level,
            })
            .await
        }
    }
}

fn load_config(args: &TranslateArgs) -> Result<Config> {
    let config_path = Path::new(&args.config_path);
    let mut config = if config_path.exists() {
        Config::from_file(config_path)?
    } else {
        info!("Config file not found, creating default at {}", args.config_path);
        Config::create_default_config(config_path)?
    };

    if let Some(source) = &args.source_language {
        config.source_language = source.clone();
    }
    if let Some(target) = &args.target_language {
        config.target_language = target.clone();
    }
    if let Some(model) = &args.model {
        config.translation.model = model.clone();
    }
    if let Some(mode) = &args.output_mode {
        config.output_mode = mode.clone().into();
    }
    if let Some(layout) = &args.dual_layout {
        config.dual_layout = layout.clone().into();
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone().into();
    }
    config.validate()?;
    Ok(config)
}

fn output_path(input: &Path, dir: Option<&Path>, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    let dir = dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    dir.join(format!("{stem}.{suffix}"))
}

async fn run_translate(args: TranslateArgs) -> Result<()> {
    let config = load_config(&args)?;
    log::set_max_level(config.log_level.to_level_filter());

    if !args.input_path.exists() {
        return Err(anyhow!("Input file not found: {:?}", args.input_path));
    }
    let input = std::fs::read(&args.input_path)
        .with_context(|| format!("Failed to read input file: {:?}", args.input_path))?;

    let target = config.target_language.clone();
    let pipeline = Pipeline::from_config(config).map_err(|e| anyhow!(e.to_string()))?;
    pipeline
        .verify_provider()
        .await
        .map_err(|e| anyhow!("Translation provider check failed: {e}"))?;

    // Ctrl-C flips the cancellation flag; in-flight units finish, the rest
    // of the job aborts.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling job");
            let _ = cancel_tx.send(true);
        }
    });

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} units {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    let progress_for_cb = progress.clone();
    let output = pipeline
        .run_with(&input, Some(cancel_rx), move |done, total| {
            progress_for_cb.set_length(total as u64);
            progress_for_cb.set_position(done as u64);
        })
        .await
        .map_err(|e| anyhow!(e.to_string()))?;
    progress.finish_and_clear();

    let dir = args.output_dir.as_deref();
    if let Some(mono) = &output.mono {
        let path = output_path(&args.input_path, dir, &format!("{target}.pdf"));
        std::fs::write(&path, mono)
            .with_context(|| format!("Failed to write output file: {:?}", path))?;
        info!("Wrote monolingual output to {:?}", path);
    }
    if let Some(dual) = &output.dual {
        let path = output_path(&args.input_path, dir, &format!("{target}.dual.pdf"));
        std::fs::write(&path, dual)
            .with_context(|| format!("Failed to write output file: {:?}", path))?;
        info!("Wrote bilingual output to {:?}", path);
    }

    let report_path = output_path(&args.input_path, dir, "report.json");
    let report_json = serde_json::to_string_pretty(&output.report)?;
    std::fs::write(&report_path, report_json)
        .with_context(|| format!("Failed to write job report: {:?}", report_path))?;
    info!(
        "Job {} finished with {} warnings; report at {:?}",
        output.report.job_id,
        output.report.warnings.len(),
        report_path
    );
    Ok(())
}
