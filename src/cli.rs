use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Debug, Parser)]
#[command(
    name = "lorebook",
    about = "Priority-aware indexing and retrieval for world-building reference documents"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log warnings and errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage registered reference documents
    Doc {
        #[command(subcommand)]
        action: DocAction,
    },
    /// Reindex registered documents into the section store
    Sync(SyncArgs),
    /// Retrieve grounding context for a query or tag
    Search(SearchArgs),
    /// Show index status and per-document section counts
    Status(StatusArgs),
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Doc subcommands --

#[derive(Debug, Subcommand)]
pub enum DocAction {
    /// Register a markdown file under a document key
    Add {
        /// Stable document key (e.g. rules_core)
        key: String,
        /// Path to the markdown source file
        path: PathBuf,
        /// Human-readable label (defaults to the filename)
        #[arg(long)]
        label: Option<String>,
        /// Default priority tier for unclassified sections (1 or 2)
        #[arg(short = 'p', long, default_value = "2")]
        priority: u8,
        /// Force every section of this document to priority 1
        #[arg(long)]
        critical: bool,
        /// Pin this document's critical sections into every retrieval
        #[arg(long)]
        always_on: bool,
    },
    /// Remove a document and all its indexed sections
    Remove {
        /// Key of the document to remove
        key: String,
    },
    /// List all registered documents
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

// -- Sync --

#[derive(Debug, Parser)]
pub struct SyncArgs {
    /// Reindex only these document keys (repeatable); default: all
    #[arg(short = 'd', long = "doc")]
    pub docs: Vec<String>,

    /// Output the sync report as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Search --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// Free-text query keywords
    pub query: Option<String>,

    /// Topic tag (e.g. @무공) resolved through the tag table
    #[arg(short = 't', long, conflicts_with = "query")]
    pub tag: Option<String>,

    /// Number of results on the fallback path
    #[arg(short = 'n', long, default_value = "5")]
    pub count: usize,

    /// Category filter (e.g. 지리)
    #[arg(short = 'c', long)]
    pub category: Option<String>,

    /// Skip the index store and answer from source files directly
    #[arg(long)]
    pub local: bool,

    /// Primary-path timeout in seconds before degrading to fallback
    #[arg(long, default_value = "3")]
    pub timeout: u64,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Status --

#[derive(Debug, Parser)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "lorebook",
            &mut std::io::stdout(),
        );
    }
}
