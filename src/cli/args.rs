//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Pattern library tooling
#[derive(Parser)]
#[command(
    name = "patternkit",
    version = env!("CARGO_PKG_VERSION"),
    about = "Pattern library with live reload",
    long_about = "Load, search and validate declarative patterns, and keep a running library in sync with edits on disk.",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = "Examples:\n  patternkit watch --dir ./patterns\n  patternkit search \"funnel conversion\"\n  patternkit show funnel_analysis\n  patternkit reload funnel_analysis\n  patternkit check"
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Patterns directory (overrides patterns.dir)
    #[arg(short, long, global = true, env = "PK_PATTERNS__DIR")]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Create .patternkit/settings.toml with defaults
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Display active settings
    Config,

    /// Watch the patterns directory and report reloads until Ctrl-C
    Watch {
        /// Quiet period before a changed file is reloaded (100-5000 ms)
        #[arg(long)]
        debounce_ms: Option<u64>,
    },

    /// Reload one pattern from disk immediately
    Reload {
        /// Pattern name
        name: String,
    },

    /// Show hot-reload configuration and library contents (does not watch)
    Status {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Search patterns by keywords
    Search {
        /// Free-text query; empty lists everything
        #[arg(default_value = "")]
        query: String,

        /// Only patterns in this category
        #[arg(long)]
        category: Option<String>,

        /// Only patterns with this difficulty
        #[arg(long)]
        difficulty: Option<String>,

        /// Only patterns with this backend type
        #[arg(long)]
        backend: Option<String>,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a pattern definition
    Show {
        /// Pattern name
        name: String,

        /// Output JSON instead of YAML
        #[arg(long)]
        json: bool,
    },

    /// Validate every pattern file; exits non-zero on failures
    Check,
}
