//! CLI definition and handler

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::analyzers::AnalysisEngine;
use crate::config::{load_config, load_config_file, EngineConfig};
use crate::model::{ModelDocument, SemanticModel};

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// Object-oriented metrics over a semantic model
#[derive(Parser, Debug)]
#[command(name = "oometrics")]
#[command(
    version,
    about = "Cohesion, coupling, inheritance, Halstead and size metrics over a semantic model",
    after_help = "\
Examples:
  oometrics model.json                        Print metrics as JSON
  oometrics model.json -o metrics.json        Write metrics to a file
  oometrics model.json --skip-analyzer halstead
  oometrics model.json --config oometrics.toml --workers 4"
)]
pub struct Cli {
    /// Semantic model document (JSON)
    pub model: PathBuf,

    /// Config file (default: oometrics.toml or .oometricsrc.json next to the model)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Number of parallel workers (1-64, default: auto)
    #[arg(long, value_parser = parse_workers)]
    pub workers: Option<usize>,

    /// Skip specific analyzers (cohesion, coupling, inheritance, halstead, size)
    #[arg(long)]
    pub skip_analyzer: Vec<String>,

    /// Output file path (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,
}

fn resolve_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => {
            let dir = cli
                .model
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            load_config(dir)
        }
    };

    if let Some(workers) = cli.workers {
        config.engine.workers = workers;
    }
    config
        .engine
        .disabled_analyzers
        .extend(cli.skip_analyzer.iter().cloned());
    Ok(config)
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    let document = ModelDocument::from_path(&cli.model)
        .with_context(|| format!("reading model {}", cli.model.display()))?;
    let config = resolve_config(&cli)?;

    let model = SemanticModel::from_document(&document);
    let engine = AnalysisEngine::new(config)?;
    let report = engine.run(&model)?;

    let json = serde_json::to_string_pretty(&report)?;
    match &cli.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("writing {}", path.display()))?;
            info!("Wrote metrics to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", json)?;
        }
    }
    Ok(())
}
