// cane: command line driver for the perception pipeline
// Replays synthetic sensor scenarios, renders depth heat-maps and checks model files.

mod config;
mod scenario;
mod simulate;

use anyhow::{anyhow, bail, Context};
use cane_eye::models::store::ModelStatus;
use cane_eye::models::ModelStore;
use clap::{Parser, Subcommand};
use config::{CaneConfig, LoggingConfig};
use scenario::Scenario;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cane")]
#[command(about = "Assistive cane perception pipeline", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario through the pipeline, printing each published state as JSON
    Simulate {
        /// Scenario file
        scenario: PathBuf,

        /// Sensor frame rate
        #[arg(long, default_value = "30")]
        fps: f64,
    },

    /// Render one scenario frame's depth heat-map to PNG
    Heatmap {
        /// Scenario file
        scenario: PathBuf,

        /// Scenario frame index
        #[arg(long, default_value = "0")]
        frame: usize,

        /// Output PNG path
        #[arg(long, short)]
        out: PathBuf,
    },

    /// Model file operations
    #[command(subcommand)]
    Models(ModelCommands),

    /// Print the default configuration as TOML
    Config,
}

#[derive(Subcommand)]
enum ModelCommands {
    /// Check the configured model files exist and match their checksums
    Verify,
}

fn init_logging(config: &LoggingConfig, level: Option<&str>, json: bool) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level.unwrap_or(&config.level))
            .with_context(|| format!("Invalid log level: {}", level.unwrap_or(&config.level)))?,
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let result = if json || config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow!("Failed to initialise logging: {}", e))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = CaneConfig::load(cli.config.as_deref())?;
    init_logging(&config.logging, cli.log_level.as_deref(), cli.json_logs)?;

    match cli.command {
        Commands::Simulate { scenario, fps } => {
            let scenario = Scenario::load(&scenario)?;
            let stdout = std::io::stdout();
            let summary = simulate::simulate(&config, scenario, fps, &mut stdout.lock()).await?;
            eprintln!(
                "{} frames delivered, {} accepted, {} dropped, {} failed",
                summary.delivered, summary.accepted, summary.dropped, summary.failed
            );
        }
        Commands::Heatmap { scenario, frame, out } => {
            render_heatmap(&config, &scenario, frame, &out)?;
        }
        Commands::Models(ModelCommands::Verify) => {
            verify_models(&config)?;
        }
        Commands::Config => {
            print!("{}", CaneConfig::default().to_toml()?);
        }
    }

    Ok(())
}

fn render_heatmap(config: &CaneConfig, scenario: &Path, frame: usize, out: &Path) -> anyhow::Result<()> {
    let scenario = Scenario::load(scenario)?;
    let grid = scenario
        .depth_grid(frame)?
        .with_context(|| format!("Scenario frame {} has no depth", frame))?;
    let image = cane_eye::heatmap::render(&grid, &config.vision.heatmap)?;
    image
        .save(out)
        .with_context(|| format!("Failed to write {}", out.display()))?;
    info!("Heat-map for frame {} written to {}", frame, out.display());
    Ok(())
}

fn verify_models(config: &CaneConfig) -> anyhow::Result<()> {
    let store = ModelStore::new(config.vision.models.clone());
    let checks = [
        ("detector", store.check_detector()?),
        ("classifier", store.check_classifier()?),
    ];

    let mut all_ready = true;
    for (role, status) in &checks {
        match status {
            ModelStatus::Ready { path, sha256 } => println!("{:<10} ok        {} ({})", role, path.display(), sha256),
            ModelStatus::Missing { path } => println!("{:<10} missing   {}", role, path.display()),
            ModelStatus::ChecksumMismatch { path, expected, actual } => println!(
                "{:<10} mismatch  {} (expected {}, got {})",
                role,
                path.display(),
                expected,
                actual
            ),
        }
        all_ready &= status.is_ready();
    }

    #[cfg(feature = "onnx")]
    if all_ready {
        load_models(&store, config)?;
    }

    if !all_ready {
        bail!("Model files are not ready");
    }
    Ok(())
}

/// Open both models once to prove ONNX Runtime accepts them
#[cfg(feature = "onnx")]
fn load_models(store: &ModelStore, config: &CaneConfig) -> anyhow::Result<()> {
    use cane_eye::models::{Classifier, OnnxSegmenter, YoloDetector};

    let models = &config.vision.models;
    let detector_path = store.require(&models.detector_file, &models.detector_sha256)?;
    YoloDetector::load(&detector_path, models)?;
    println!("detector   loads");

    let classifier_path = store.require(&models.classifier_file, &models.classifier_sha256)?;
    let segmenter = OnnxSegmenter::load(&classifier_path, models)?;
    println!("classifier loads    {} labels", segmenter.labels().len());
    Ok(())
}
