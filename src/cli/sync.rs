//! CLI `sync` command: run one sync pass against the configured database.

use anyhow::{anyhow, ensure, Context, Result};
use std::path::Path;

use refsync::config::RefsyncConfig;
use refsync::sync::diff::plan_update;
use refsync::sync::{relations, SyncEngine};

/// Command-line inputs of a sync pass.
pub struct SyncArgs<'a> {
    pub relation: &'a str,
    pub add: Option<&'a Path>,
    pub remove: Option<&'a Path>,
    /// Owner state before the edit; `add` then holds the state after it.
    pub prior: Option<&'a Path>,
    pub actor: Option<&'a str>,
}

/// Run a sync pass and print the result as JSON.
pub fn sync(config: &RefsyncConfig, args: SyncArgs<'_>) -> Result<()> {
    let relation = relations::find(args.relation).ok_or_else(|| {
        anyhow!(
            "unknown relation: {} (run `refsync relations` to list them)",
            args.relation
        )
    })?;

    let add = args.add.map(super::read_json).transpose()?;
    let remove = args.remove.map(super::read_json).transpose()?;

    let (add, remove) = match args.prior {
        Some(prior_path) => {
            ensure!(remove.is_none(), "--prior derives the remove side; drop --remove");
            let next = add.context("--prior needs --add with the owner's new state")?;
            let prior = super::read_json(prior_path)?;
            let plan = plan_update(relation, &prior, &next)?;
            (plan.add, plan.remove)
        }
        None => (add, remove),
    };

    let store = super::open_store(config)?;
    let engine = SyncEngine::new(&store);
    let actor = config.sync.actor(args.actor);

    let result = engine.synchronize(relation, add.as_ref(), remove.as_ref(), &actor)?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    eprintln!(
        "Synchronized {} {} document(s) via {} ({} modified).",
        result.distinct_foreign_count,
        relation.foreign_kind,
        relation.name,
        result.modified()
    );
    Ok(())
}
