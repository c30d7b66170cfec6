//! Command-line driver for the screenshot triage pipeline.
//!
//! Thin wrapper over `triage_core`: one subcommand per lifecycle operation,
//! printing the resulting artifact name (or id) on stdout so calls can be
//! chained from scripts.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use triage_core::{ArtifactId, ArtifactStore, Classifier, Config, Model, Outcome, Pipeline};

#[derive(Parser)]
#[command(name = "pixel-triage", about = "Pixel-art screenshot triage")]
struct Cli {
    /// Path to a TOML config file; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate an image file and store it as a new pending artifact.
    Ingest { file: PathBuf },
    /// Run the classifier on a pending artifact.
    Classify { id: String },
    /// Record the human judgment on a classified artifact.
    Confirm {
        name: String,
        #[arg(value_enum)]
        judgment: Judgment,
    },
    /// List every artifact in the store with its decoded state.
    List,
    /// Export the store contents to a CSV file.
    Export { out: PathBuf },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Judgment {
    Correct,
    Incorrect,
}

impl From<Judgment> for Outcome {
    fn from(j: Judgment) -> Self {
        match j {
            Judgment::Correct => Outcome::Confirmed,
            Judgment::Incorrect => Outcome::Rejected,
        }
    }
}

/// Placeholder model for builds without an inference backend; every
/// classify attempt reports how to get one.
#[cfg(not(feature = "ort"))]
struct NoBackend;

#[cfg(not(feature = "ort"))]
impl Model for NoBackend {
    fn infer(
        &self,
        _input: &triage_core::ImageTensor,
    ) -> Result<[f32; 2], triage_core::ModelError> {
        Err(triage_core::ModelError::new(
            "compiled without a model backend; rebuild with --features ort",
        ))
    }
}

fn build_pipeline(cfg: &Config) -> Result<Pipeline<impl Model>> {
    let store = ArtifactStore::open(&cfg.store_dir)
        .with_context(|| format!("cannot open store at {}", cfg.store_dir.display()))?;
    #[cfg(feature = "ort")]
    let model = triage_core::OnnxModel::load(&cfg.model_path)
        .with_context(|| format!("cannot load model {}", cfg.model_path.display()))?;
    #[cfg(not(feature = "ort"))]
    let model = NoBackend;
    Ok(Pipeline::new(
        store,
        Classifier::new(model, cfg.input_size),
        cfg.max_upload_bytes,
    ))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let pipeline = build_pipeline(&cfg)?;

    match cli.command {
        Command::Ingest { file } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("cannot read {}", file.display()))?;
            let Some(ext) = file.extension().and_then(|e| e.to_str()) else {
                bail!("{} has no file extension", file.display());
            };
            let id = pipeline.ingest(&bytes, ext)?;
            println!("{id}");
        }
        Command::Classify { id } => {
            let id = ArtifactId::parse(&id).context("malformed artifact id")?;
            let name = pipeline.classify(&id)?;
            println!("{name}");
        }
        Command::Confirm { name, judgment } => {
            let name = pipeline.confirm(&name, judgment.into())?;
            println!("{name}");
        }
        Command::List => {
            for state in pipeline.store().list()? {
                println!("{state}");
            }
        }
        Command::Export { out } => {
            let states = pipeline.store().list()?;
            triage_core::export_csv(&states, &out)
                .with_context(|| format!("cannot export to {}", out.display()))?;
            tracing::info!("exported {} artifacts to {}", states.len(), out.display());
        }
    }
    Ok(())
}
