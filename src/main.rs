//! `toolsmith` command-line interface.

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use toolsmith::config::{self, ToolManifest, ToolsmithConfig};
use toolsmith::logging;
use toolsmith::tools::InvokeOptions;
use toolsmith::{Toolsmith, ToolsmithError};

#[derive(Debug, Parser)]
#[command(name = "toolsmith", version, about = "Discover, invoke and author agent tools")]
struct Cli {
    /// Configuration file (default: ./toolsmith.toml, then the XDG config dir)
    #[arg(long, global = true, env = "TOOLSMITH_CONFIG")]
    config: Option<PathBuf>,

    /// Also log to stderr, filtered by RUST_LOG
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List registered tools
    List,
    /// Show one tool's descriptor
    Show {
        /// Tool name
        name: String,
    },
    /// Invoke a tool and print the result as JSON
    Invoke {
        /// Tool name
        name: String,
        /// Input as a JSON object
        #[arg(long, default_value = "{}")]
        input: String,
        /// Abandon the call after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Print the Markdown view of the registry
    Render,
    /// Author a script tool from a TOML manifest
    Author {
        /// Path to the manifest
        manifest: PathBuf,
    },
    /// Remove a tool from the registry
    Retire {
        /// Tool name
        name: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<ToolsmithConfig, ToolsmithError> {
    match path {
        Some(path) => config::from_path(path),
        None => config::load(),
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<(), ToolsmithError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| ToolsmithError::io("stdout", e.to_string()))?;
    println!("{text}");
    Ok(())
}

async fn run(cli: Cli) -> Result<ExitCode, ToolsmithError> {
    let config = load_config(cli.config.as_ref())?;
    logging::init_and_store_logging(&config.logging, cli.verbose)?;

    let toolsmith = Toolsmith::builder()
        .config(config)
        .with_builtins()
        .launch()
        .await?;

    match cli.command {
        Command::List => {
            for descriptor in &toolsmith.list() {
                println!(
                    "{:<24} {:<10} {}",
                    descriptor.name,
                    descriptor.version.to_string(),
                    descriptor.description
                );
            }
        }
        Command::Show { name } => {
            let descriptor = toolsmith.lookup(&name)?;
            print_json(&descriptor)?;
        }
        Command::Invoke {
            name,
            input,
            timeout_ms,
        } => {
            let input: Value = serde_json::from_str(&input).map_err(|e| {
                ToolsmithError::configuration("--input", format!("invalid JSON: {e}"))
            })?;
            let mut options = InvokeOptions::new();
            if let Some(ms) = timeout_ms {
                options = options.with_timeout(Duration::from_millis(ms));
            }

            let result = toolsmith.invoke_with(&name, input, options).await;
            print_json(&result)?;
            if result.is_not_found() {
                let suggestions = toolsmith.suggest(&name);
                if !suggestions.is_empty() {
                    eprintln!("did you mean: {}?", suggestions.join(", "));
                }
            }
            if !result.success {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Render => print!("{}", toolsmith.render_registry()),
        Command::Author { manifest } => {
            let draft = ToolManifest::load_draft(&manifest)?;
            let report = toolsmith.author(draft).await;
            print_json(&report)?;
            if !report.is_available() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Retire { name } => {
            let descriptor = toolsmith.retire(&name).await?;
            println!("retired {} {}", descriptor.name, descriptor.version);
        }
    }

    Ok(ExitCode::SUCCESS)
}
