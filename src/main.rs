//! Plume - narrative intelligence engine for fiction manuscripts
//!
//! Usage:
//!   plume analyze chapter.txt        Run the writing analyzers
//!   plume extract chapter.txt        Extract entities and world rules
//!   plume structures                 List story-structure templates
//!   plume scan world <world-id>      Run a full-world background scan
//!   plume changes list <world-id>    Review the proposed-change queue
//!   plume --help                     Show all commands

use anyhow::Result;
use clap::Parser;

use plume::cli::output::OutputMode;
use plume::cli::{Cli, Commands};
use plume::init::AppContext;

/// Commands that need the NER model loaded.
fn needs_ml(command: &Commands) -> bool {
    matches!(command, Commands::Extract { .. } | Commands::Scan(_))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("plume=info".parse()?),
        )
        .init();

    let mode = OutputMode::from_json_flag(cli.json);

    if let Commands::Completions { shell } = &cli.command {
        plume::cli::handlers::utility::handle_completions(*shell);
        return Ok(());
    }

    let enable_ml = needs_ml(&cli.command) && !cli.no_ml;
    let ctx = AppContext::new(cli.data_path.clone(), enable_ml).await?;
    plume::cli::execute(&cli.command, &ctx, mode).await
}
