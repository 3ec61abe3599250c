//! llm-lint CLI tool.
//!
//! Usage:
//! ```bash
//! llm-lint check [OPTIONS] [PATH]
//! llm-lint list-rules [PATH]
//! llm-lint init
//! llm-lint ranges <MATCHES> [FILES]...
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;
mod discover;
mod oracle_cmd;

/// Linter that asks a language model to judge natural-language coding rules
#[derive(Parser)]
#[command(name = "llm-lint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "LLM_LINT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run lint checks
    Check {
        /// Path to analyze (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Only run specific rules (comma-separated)
        #[arg(long)]
        rules: Option<String>,

        /// Exclude patterns (can be specified multiple times)
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Do not persist the result cache
        #[arg(long)]
        no_cache: bool,

        /// Stop scheduling tasks after the first violation
        #[arg(long)]
        early_exit: bool,

        /// Run tasks one at a time
        #[arg(long)]
        debug: bool,

        /// Maximum number of tasks in flight
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,
    },

    /// List configured rules
    ListRules {
        /// Project directory (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Initialize configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Resolve pattern-match ranges into file excerpts
    Ranges {
        /// JSON file with pattern matches
        matches: PathBuf,

        /// Additional files to report even without matches
        files: Vec<PathBuf>,

        /// Root the match paths are relative to
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Lines of context around each match
        #[arg(short = 'C', long, default_value_t = 3)]
        context: usize,
    },
}

/// Output format for lint results.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// One-line-per-violation compact format.
    Compact,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check {
            path,
            format,
            rules,
            exclude,
            no_cache,
            early_exit,
            debug,
            concurrency,
        } => {
            let args = commands::check::CheckArgs {
                path,
                format,
                rules,
                exclude,
                no_cache,
                early_exit,
                debug,
                concurrency,
            };
            if !commands::check::run(args, cli.config.as_deref()).await? {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::ListRules { path } => commands::list_rules::run(&path, cli.config.as_deref()),
        Commands::Init { force } => commands::init::run(force),
        Commands::Ranges {
            matches,
            files,
            root,
            context,
        } => commands::ranges::run(&matches, &root, context, &files),
    }
}
