use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "license-gate")]
#[command(about = "Gate npm dependencies on a governed license policy")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate installed dependencies against the policy
    Check {
        /// Project directory (default: current directory)
        path: Option<PathBuf>,

        /// Output format
        #[arg(short, long)]
        format: Option<OutputFormat>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Policy file (overrides license-gate.toml)
        #[arg(long)]
        policy: Option<PathBuf>,

        /// Evaluate as of this instant instead of now
        #[arg(long, value_name = "TIMESTAMP")]
        at: Option<String>,

        /// Upstream chains shown per violation
        #[arg(long)]
        upstream_limit: Option<usize>,

        /// Read installed package.json files for missing lock metadata
        #[arg(long)]
        read_manifests: bool,

        /// Exit with code 0 even on violations
        #[arg(long)]
        exit_zero: bool,
    },
    /// Write a preset policy file
    Init {
        /// Policy preset
        preset: InitPreset,

        /// Project directory (default: current directory)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Replace an existing policy file
        #[arg(long)]
        force: bool,
    },
    /// Append exact-version exceptions for current violations
    Fix {
        /// Project directory (default: current directory)
        path: Option<PathBuf>,

        /// Show changes without applying them
        #[arg(long)]
        dry_run: bool,

        /// Days until the generated exceptions expire
        #[arg(long, default_value_t = 90)]
        expires_in_days: i64,

        /// Evidence reference recorded on the generated exceptions
        #[arg(long, default_value = "license-gate fix")]
        evidence: String,
    },
    /// Show or validate configuration
    Config {
        /// Project directory (default: current directory)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Validate configuration and policy files
        #[arg(long)]
        validate: bool,

        /// Rewrite the policy file in canonical record order
        #[arg(long)]
        normalize: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum InitPreset {
    Permissive,
    WeakCopyleft,
    Strict,
}
