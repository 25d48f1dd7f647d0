//! CLI interface for Plume.

pub mod handlers;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::init::AppContext;
use anyhow::Result;
use output::OutputMode;

/// Plume - narrative intelligence for fiction manuscripts
#[derive(Parser)]
#[command(name = "plume", version, about, long_about = None)]
pub struct Cli {
    /// Override data directory (default: ~/.plume)
    #[arg(long, env = "PLUME_DATA_PATH", global = true)]
    pub data_path: Option<PathBuf>,

    /// Output as JSON instead of human-readable format
    #[arg(long, global = true)]
    pub json: bool,

    /// Skip loading the NER model (regex-only extraction)
    #[arg(long, global = true)]
    pub no_ml: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze prose for style, word choice, dialogue, and readability issues
    Analyze {
        /// Text file to analyze
        file: PathBuf,
        /// Analysis depth: realtime, paragraph, or chapter
        #[arg(long, default_value = "chapter")]
        mode: String,
        /// Genre for readability targets
        #[arg(long, default_value = "adult_fiction")]
        genre: String,
        /// Include INFO-level findings
        #[arg(long)]
        verbose: bool,
    },

    /// Extract entities, relationships, and world rules from prose
    Extract {
        /// Text file to extract from
        file: PathBuf,
        /// Manuscript whose codex provides known entities
        #[arg(long)]
        manuscript: Option<String>,
    },

    /// List available story-structure templates
    Structures,

    /// Outline management
    #[command(subcommand)]
    Outline(OutlineCommands),

    /// Proposed-change queue management
    #[command(subcommand)]
    Changes(ChangeCommands),

    /// Background scan management
    #[command(subcommand)]
    Scan(ScanCommands),

    /// Generate shell completions
    Completions {
        /// Shell to generate for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum OutlineCommands {
    /// Create an outline from a structure template
    Create {
        /// Manuscript ID
        #[arg(long)]
        manuscript: String,
        /// Structure template id (see `plume structures`)
        #[arg(long)]
        structure: String,
        /// Target manuscript word count
        #[arg(long, default_value = "80000")]
        words: i64,
    },
    /// Show outline progress
    Progress {
        /// Outline ID
        outline_id: String,
    },
    /// Report structural gaps
    Gaps {
        /// Outline ID
        outline_id: String,
    },
}

#[derive(Subcommand)]
pub enum ChangeCommands {
    /// List pending changes for a world
    List {
        /// World ID
        world_id: String,
    },
    /// Approve a change
    Approve {
        /// Change ID
        change_id: String,
        /// Reviewer note
        #[arg(long)]
        note: Option<String>,
    },
    /// Reject a change
    Reject {
        /// Change ID
        change_id: String,
        /// Reviewer note
        #[arg(long)]
        note: Option<String>,
    },
    /// Approve all pending changes at or above a confidence threshold
    AutoApprove {
        /// World ID
        world_id: String,
        /// Confidence threshold
        #[arg(long, default_value = "0.95")]
        threshold: f64,
    },
}

#[derive(Subcommand)]
pub enum ScanCommands {
    /// Scan every manuscript in a world
    World {
        /// World ID
        world_id: String,
    },
    /// Scan a single manuscript
    Manuscript {
        /// Manuscript ID
        manuscript_id: String,
    },
    /// Show the active scan for a world
    Status {
        /// World ID
        world_id: String,
    },
}

/// Dispatch a parsed command against the app context.
pub async fn execute(command: &Commands, ctx: &AppContext, mode: OutputMode) -> Result<()> {
    match command {
        Commands::Analyze {
            file,
            mode: analysis_mode,
            genre,
            verbose,
        } => handlers::analyze::handle(ctx, file, analysis_mode, genre, *verbose, mode).await,
        Commands::Extract { file, manuscript } => {
            handlers::extract::handle(ctx, file, manuscript.as_deref(), mode).await
        }
        Commands::Structures => handlers::structure::handle_list(mode),
        Commands::Outline(outline_command) => {
            handlers::structure::handle_outline(ctx, outline_command, mode).await
        }
        Commands::Changes(change_command) => {
            handlers::changes::handle(ctx, change_command, mode).await
        }
        Commands::Scan(scan_command) => handlers::scan::handle(ctx, scan_command, mode).await,
        Commands::Completions { shell } => {
            handlers::utility::handle_completions(*shell);
            Ok(())
        }
    }
}
