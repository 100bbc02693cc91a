use refsync::sync::{relations, SyncMode};

/// List the registered relations.
pub fn list() {
    println!("{:<22} {:<14} {:<14} {:<8} Foreign field", "Relation", "Owner", "Foreign", "Mode");
    println!("{}", "=".repeat(76));
    for relation in relations::ALL {
        let field = match relation.mode {
            SyncMode::Summary {
                foreign_refs_field, ..
            } => foreign_refs_field,
            SyncMode::Counter { counter_field } => counter_field,
        };
        println!(
            "{:<22} {:<14} {:<14} {:<8} {}",
            relation.name,
            relation.owner_kind.to_string(),
            relation.foreign_kind.to_string(),
            relation.mode_name(),
            field
        );
    }
}
