//! ForgeKeeper CLI - Bridge interface for the setup wizard and portal
//!
//! Commands: langs, parse, import, merge, ports, mask
//! Outputs JSON to stdout, logs to stderr (FORGEKEEPER_LOG)
//! Returns 2 when the input was processed but rejected

use clap::{ArgGroup, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use forgekeeper_core::{
    env_file::{masked_env, render_env_file},
    is_sensitive, mask_value, validate_ports, ConfigLayer, DescriptorParser, ImportPipeline,
    ImportReport, ImportSettings, Language, ParseResult,
};

#[derive(Parser)]
#[command(name = "forgekeeper-cli")]
#[command(about = "ForgeKeeper CLI - devcontainer import and config merge")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON settings file (maxFileSize, allowedRoot)
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    /// Override the maximum descriptor size in bytes
    #[arg(long, global = true)]
    max_file_size: Option<u64>,

    /// Reject descriptor files outside this directory
    #[arg(long, global = true)]
    allowed_root: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported language runtimes
    Langs,

    /// Parse a descriptor without mapping it
    #[command(group(ArgGroup::new("source").required(true).args(["file", "content"])))]
    Parse {
        #[arg(short, long)]
        file: Option<PathBuf>,

        #[arg(short, long)]
        content: Option<String>,
    },

    /// Parse and map a descriptor
    #[command(group(ArgGroup::new("source").required(true).args(["file", "content", "payload_base64"])))]
    Import {
        #[arg(short, long)]
        file: Option<PathBuf>,

        #[arg(short, long)]
        content: Option<String>,

        /// Base64 encoded upload
        #[arg(short, long)]
        payload_base64: Option<String>,
    },

    /// Merge wizard config with an imported config
    Merge {
        /// JSON payload (ConfigLayer) from the wizard
        #[arg(short, long)]
        user: String,

        /// JSON payload (ConfigLayer) to merge under the user config
        #[arg(short, long, conflicts_with = "report")]
        imported: Option<String>,

        /// JSON payload (ImportReport) from a previous import
        #[arg(short, long)]
        report: Option<String>,

        /// Print the merged env vars as an env file instead of JSON
        #[arg(long)]
        env: bool,
    },

    /// Split ports into valid and out-of-range
    Ports {
        #[arg(allow_negative_numbers = true)]
        ports: Vec<i64>,
    },

    /// Mask a value for display
    Mask {
        value: String,

        /// Only mask when this env var name looks sensitive
        #[arg(short, long)]
        key: Option<String>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("FORGEKEEPER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(cli: &Cli) -> Result<ImportSettings, String> {
    let mut settings = match &cli.settings {
        Some(path) => ImportSettings::load(path).map_err(|e| e.to_string())?,
        None => ImportSettings::default(),
    };
    if let Some(max) = cli.max_file_size {
        settings.max_file_size = max;
    }
    if let Some(root) = &cli.allowed_root {
        settings.allowed_root = Some(root.clone());
    }
    Ok(settings)
}

fn emit<T: Serialize>(value: &T, ok: bool) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(out) => {
            println!("{}", out);
            if ok {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }
        Err(e) => fail(&format!("Failed to serialize output: {}", e)),
    }
}

fn fail(message: &str) -> ExitCode {
    let output = serde_json::json!({"success": false, "error": message});
    println!("{}", output);
    ExitCode::FAILURE
}

fn parse_layer(payload: &str, what: &str) -> Result<ConfigLayer, String> {
    serde_json::from_str(payload).map_err(|e| format!("Invalid {} payload: {}", what, e))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let settings = match load_settings(&cli) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let pipeline = ImportPipeline::new(settings);

    match cli.command {
        Commands::Langs => {
            let langs: Vec<&str> = Language::ALL.iter().map(Language::as_str).collect();
            emit(&serde_json::json!({"langs": langs}), true)
        }

        Commands::Parse { file, content } => {
            let parser = DescriptorParser::new();
            let result = match (file, content) {
                (Some(path), _) => parser.parse_file(path),
                (None, Some(content)) => parser.parse_content(&content),
                (None, None) => ParseResult::Failure(vec!["No descriptor source given".into()]),
            };
            let output = serde_json::json!({
                "success": result.is_success(),
                "config": result.config(),
                "errors": result.errors(),
            });
            emit(&output, result.is_success())
        }

        Commands::Import {
            file,
            content,
            payload_base64,
        } => {
            let report = match (file, content, payload_base64) {
                (Some(path), _, _) => pipeline.import_file(path),
                (None, Some(content), _) => pipeline.import_content(&content),
                (None, None, Some(payload)) => pipeline.import_base64(&payload),
                (None, None, None) => ImportReport::failure(vec!["No descriptor source given".into()]),
            };
            emit(&report, report.success)
        }

        Commands::Merge {
            user,
            imported,
            report,
            env,
        } => {
            let user = match parse_layer(&user, "user") {
                Ok(layer) => layer,
                Err(e) => return fail(&e),
            };
            let merged = match (imported, report) {
                (Some(imported), _) => match parse_layer(&imported, "imported") {
                    Ok(layer) => forgekeeper_core::merge_config(&user, &layer),
                    Err(e) => return fail(&e),
                },
                (None, Some(report)) => match serde_json::from_str::<ImportReport>(&report) {
                    Ok(report) => pipeline.merge(&user, &report),
                    Err(e) => return fail(&format!("Invalid report payload: {}", e)),
                },
                (None, None) => forgekeeper_core::merge_config(&user, &ConfigLayer::default()),
            };

            if env {
                match render_env_file(&merged.env_vars) {
                    Ok(rendered) => {
                        print!("{}", rendered);
                        ExitCode::SUCCESS
                    }
                    Err(e) => fail(&e.to_string()),
                }
            } else {
                let output = serde_json::json!({
                    "merged": merged,
                    "display_env": masked_env(&merged.env_vars),
                });
                emit(&output, true)
            }
        }

        Commands::Ports { ports } => {
            let result = validate_ports(&ports);
            let ok = result.invalid_ports.is_empty();
            emit(&result, ok)
        }

        Commands::Mask { value, key } => {
            let masked = match key.as_deref() {
                Some(key) if !is_sensitive(key) => value,
                _ => mask_value(&value),
            };
            emit(&serde_json::json!({"masked": masked}), true)
        }
    }
}
