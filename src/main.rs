//! DataVis-Math - Command Line Entry Point
//!
//! Checks definition documents, evaluates them against series loaded from
//! JSON and exports the built-in snippet library.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use datavis_math::{
    config::{EngineConfig, LoggingConfig},
    document::{self, SnippetMap},
    scripting::builtins,
    CompiledTransform, SeriesMap, SeriesSnapshot, TransformSet,
};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log file name prefix inside the configured log directory
const LOG_FILE_PREFIX: &str = "datavis-math.log";

/// DataVis-Math - scripted math channels over time series
#[derive(Parser, Debug)]
#[command(name = "datavis-math")]
#[command(about = "Compute derived signals from time series", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: platform config directory)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile every definition in a document and print its outputs
    Check {
        /// Definition document (XML)
        #[arg(value_name = "FILE")]
        definitions: PathBuf,
    },

    /// Evaluate definitions against series loaded from JSON
    Eval {
        /// Definition document (XML)
        #[arg(short, long, value_name = "FILE")]
        definitions: PathBuf,

        /// Input series as `{"name": [[x, y], ...]}`
        #[arg(long, value_name = "FILE")]
        data: PathBuf,

        /// Output file for the derived series (default: stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Include the input series in the output
        #[arg(long)]
        all: bool,
    },

    /// List the built-in snippets
    Snippets {
        /// Write the library as an XML document instead
        #[arg(long, value_name = "FILE")]
        export: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = EngineConfig::load_or_default(args.config.as_deref());

    // Keep the guard alive so buffered log lines are flushed on exit
    let _guard = init_logging(args.verbose, &config.logging);

    tracing::debug!("DataVis-Math v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Check { definitions } => check(&definitions, &config),
        Command::Eval {
            definitions,
            data,
            output,
            all,
        } => eval(&definitions, &data, output.as_deref(), all, &config),
        Command::Snippets { export } => snippets(export.as_deref()),
    }
}

fn init_logging(verbose: u8, logging: &LoggingConfig) -> Option<WorkerGuard> {
    let default_filter = match verbose {
        0 => logging.filter.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr));

    match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            registry.init();
            None
        }
    }
}

fn check(path: &Path, config: &EngineConfig) -> Result<()> {
    let definitions = document::load_definitions(path)
        .with_context(|| format!("Failed to load definitions from {:?}", path))?;

    let mut failed = 0;
    for definition in definitions.into_values() {
        let name = definition.name().to_string();
        match CompiledTransform::compile_with_limits(definition, &config.limits) {
            Ok(transform) => {
                println!(
                    "{} (linked: {}) -> {}",
                    name,
                    transform.linked_series_name(),
                    transform.output_names().join(", ")
                );
                if !transform.channels().is_empty() {
                    println!("    channels: {}", transform.channels().join(", "));
                }
            }
            Err(e) => {
                println!("{}: {}", name, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} definition(s) failed to compile", failed);
    }
    Ok(())
}

fn eval(
    definitions: &Path,
    data: &Path,
    output: Option<&Path>,
    all: bool,
    config: &EngineConfig,
) -> Result<()> {
    let text = std::fs::read_to_string(data)
        .with_context(|| format!("Failed to read data file {:?}", data))?;
    let snapshot: SeriesSnapshot =
        serde_json::from_str(&text).with_context(|| format!("Invalid data file {:?}", data))?;
    let mut registry = SeriesMap::from_snapshot(snapshot);

    let mut set = TransformSet::new(config.limits.clone());
    let failures = set
        .load_file(definitions, &mut registry)
        .with_context(|| format!("Failed to load definitions from {:?}", definitions))?;
    for (name, error) in &failures {
        eprintln!("{}: {}", name, error);
    }

    let outputs: Vec<String> = set
        .iter()
        .flat_map(|t| t.output_names().iter().cloned())
        .collect();
    let result = if all {
        registry.snapshot(None)
    } else {
        registry.snapshot(Some(outputs.as_slice()))
    };

    let json = serde_json::to_string_pretty(&result)?;
    match output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("Failed to write output {:?}", path))?,
        None => println!("{}", json),
    }

    if !failures.is_empty() {
        bail!("{} definition(s) failed", failures.len());
    }
    Ok(())
}

fn snippets(export: Option<&Path>) -> Result<()> {
    let library: SnippetMap = builtins::all()
        .into_iter()
        .map(|s| (s.name.clone(), s))
        .collect();

    match export {
        Some(path) => {
            std::fs::write(path, document::snippets_to_xml(&library)?)
                .with_context(|| format!("Failed to write {:?}", path))?;
            tracing::info!("Exported {} snippets to {:?}", library.len(), path);
        }
        None => {
            for snippet in library.values() {
                println!("{}: {}", snippet.name, snippet.equation.trim());
            }
        }
    }
    Ok(())
}
