mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use refsync::config::RefsyncConfig;

#[derive(Parser)]
#[command(name = "refsync", version, about = "Denormalized reference synchronization for record stores")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a sync pass for one relation
    Sync {
        /// Relation name (see `refsync relations`)
        #[arg(long)]
        relation: String,
        /// JSON file with owner(s) whose refs should be attached
        #[arg(long)]
        add: Option<PathBuf>,
        /// JSON file with owner(s) whose refs should be detached
        #[arg(long)]
        remove: Option<PathBuf>,
        /// JSON file with the owner's previous state; removals are derived from it
        #[arg(long)]
        prior: Option<PathBuf>,
        /// Actor stamped on summary writes
        #[arg(long)]
        actor: Option<String>,
    },
    /// Load documents into a collection
    Import {
        collection: String,
        file: PathBuf,
    },
    /// Print documents from a collection
    Export {
        collection: String,
        #[arg(long)]
        id: Option<String>,
    },
    /// List the registered relations
    Relations,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = RefsyncConfig::load()?;

    // Log to stderr so stdout stays clean for JSON output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Sync {
            relation,
            add,
            remove,
            prior,
            actor,
        } => cli::sync::sync(
            &config,
            cli::sync::SyncArgs {
                relation: &relation,
                add: add.as_deref(),
                remove: remove.as_deref(),
                prior: prior.as_deref(),
                actor: actor.as_deref(),
            },
        )?,
        Command::Import { collection, file } => cli::import::import(&config, &collection, &file)?,
        Command::Export { collection, id } => cli::export::export(&config, &collection, id.as_deref())?,
        Command::Relations => cli::relations::list(),
    }

    Ok(())
}
