//! Clap derive structures for the `picklist` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// picklist -- browse and curate a buffered catalog from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "picklist",
    version,
    about = "Browse, select, and reorder items in a buffered catalog",
    long_about = "Runs an in-process catalog engine and a client session over it.\n\n\
        Mutations are acknowledged immediately and applied on the engine's\n\
        flush timers; the shell shows them optimistically in the meantime.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "PICKLIST_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format (defaults to the config file's setting)
    #[arg(long, short = 'o', global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Plain text, one id per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start an interactive session over a freshly seeded catalog
    #[command(alias = "sh")]
    Shell(ShellArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shell ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ShellArgs {
    /// Number of items to seed (overrides engine.seed_count)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Add flush interval in ms; 0 means only the `flush` command commits
    #[arg(long)]
    pub add_flush_ms: Option<u64>,

    /// Action flush interval in ms; 0 means only the `flush` command commits
    #[arg(long)]
    pub action_flush_ms: Option<u64>,

    /// Poll interval in ms
    #[arg(long)]
    pub poll_ms: Option<u64>,

    /// Rows per page
    #[arg(long)]
    pub page_size: Option<usize>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a config file populated with defaults
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Display current resolved configuration
    Show,

    /// Print the config file location
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
