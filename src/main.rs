//! sn-batch CLI
//!
//! Entry point for the `sn-batch` command-line tool.

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{Map, Value};
use sn_batch::config::host_config_path;
use sn_batch::{
    BatchError, BatchLock, BatchOutput, BatchReport, BatchRequest, CommandProvider,
    EffectiveConfig, ExitCode, LoggingBatch, Orchestrator, ReferenceBatch, SignerSettings,
    TaskItem,
};
use std::path::PathBuf;
use std::process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sn-batch")]
#[command(about = "Strong-name sign a build's references as one batch", version)]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign a batch of references
    Sign {
        /// Build output directory; signed copies go to a subdirectory
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Reference to sign (repeatable, build order)
        #[arg(long = "reference", short = 'r')]
        references: Vec<PathBuf>,

        /// Auxiliary copy-local item (repeatable)
        #[arg(long = "copy-local")]
        copy_local: Vec<PathBuf>,

        /// Project config file
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Key-pair file (created if missing)
        #[arg(long)]
        key_file: Option<PathBuf>,

        /// Signing provider executable
        #[arg(long)]
        provider: Option<String>,

        /// Write the batch report to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config {
        /// Project config file
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct SignOutput<'a> {
    references: Vec<&'a PathBuf>,
    copy_local: Vec<&'a PathBuf>,
    report: &'a BatchReport,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Sign {
            output,
            references,
            copy_local,
            config,
            key_file,
            provider,
            report,
            json,
        } => {
            let mut overrides = Map::new();
            if let Some(key_file) = key_file {
                overrides.insert("key_file".into(), Value::String(key_file.display().to_string()));
            }
            if let Some(command) = provider {
                overrides.insert("provider".into(), serde_json::json!({ "command": command }));
            }
            let request = BatchRequest {
                references: references.into_iter().map(TaskItem::new).collect(),
                output_dir: output,
                copy_local: copy_local.into_iter().map(TaskItem::new).collect(),
            };
            run_sign(config, Value::Object(overrides), request, report, json);
        }
        Commands::Config { config } => {
            run_config(config);
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(config_path: Option<PathBuf>, cli: Option<Value>) -> EffectiveConfig {
    let host = host_config_path();
    match EffectiveConfig::build(host.as_deref(), config_path.as_deref(), cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            process::exit(ExitCode::InvalidConfiguration.as_i32());
        }
    }
}

fn run_config(config_path: Option<PathBuf>) {
    let config = load_config(config_path, None);
    match config.to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => {
            error!("Error serializing config: {}", e);
            process::exit(ExitCode::Io.as_i32());
        }
    }
}

fn run_sign(
    config_path: Option<PathBuf>,
    overrides: Value,
    request: BatchRequest<TaskItem>,
    report_path: Option<PathBuf>,
    json: bool,
) {
    let config = load_config(config_path, Some(overrides));
    let settings = match config.settings() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Configuration error: {}", e);
            process::exit(ExitCode::InvalidConfiguration.as_i32());
        }
    };

    let output = match execute(&settings, request) {
        Ok(output) => output,
        Err(e) => process::exit(e.exit_code().as_i32()),
    };

    if let Some(path) = report_path {
        if let Err(e) = output.report.write_to_file(&path) {
            error!(report = %path.display(), "Failed to write report: {}", e);
            process::exit(ExitCode::Io.as_i32());
        }
        info!(report = %path.display(), "Report written");
    }

    if json {
        let body = SignOutput {
            references: output.references.iter().map(|i| &i.item_spec).collect(),
            copy_local: output.copy_local.iter().map(|i| &i.item_spec).collect(),
            report: &output.report,
        };
        match serde_json::to_string_pretty(&body) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                error!("Error serializing output: {}", e);
                process::exit(ExitCode::Io.as_i32());
            }
        }
    } else {
        println!("References:");
        for item in &output.references {
            println!("  {}", item.item_spec.display());
        }
        if !output.copy_local.is_empty() {
            println!("Copy-local:");
            for item in &output.copy_local {
                println!("  {}", item.item_spec.display());
            }
        }
        println!();
        println!("{}", output.report.human_summary);
    }

    process::exit(output.report.exit_code().as_i32());
}

/// Errors raised before the batch starts are logged here; batch errors are
/// logged by `LoggingBatch`.
fn execute(
    settings: &SignerSettings,
    request: BatchRequest<TaskItem>,
) -> Result<BatchOutput<TaskItem>, BatchError> {
    let batch_settings = settings
        .batch_settings()
        .map_err(|e| fatal(BatchError::InvalidConfiguration(e.to_string())))?;

    let provider = match &settings.provider {
        Some(p) => CommandProvider::new(&p.command).with_args(&p.args),
        // never invoked for an empty batch
        None if request.references.is_empty() => CommandProvider::new(""),
        None => {
            return Err(fatal(BatchError::InvalidConfiguration(
                "no signing provider configured (use --provider or provider.command)".to_string(),
            )))
        }
    };

    let _lock = match &request.output_dir {
        Some(dir) if !request.references.is_empty() && !dir.as_os_str().is_empty() => {
            let signed_dir = dir.join(&batch_settings.signed_dir_name);
            let lock = BatchLock::acquire(&signed_dir, settings.lock_timeout())
                .map_err(|e| fatal(e.into()))?;
            Some(lock)
        }
        _ => None,
    };

    LoggingBatch::new(Orchestrator::new(provider, batch_settings)).execute(request)
}

fn fatal(e: BatchError) -> BatchError {
    error!(error = %e, exit_code = e.exit_code().as_i32(), "Cannot start batch");
    e
}
