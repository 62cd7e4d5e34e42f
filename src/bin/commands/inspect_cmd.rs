use anyhow::{Context, Result};
use ipdb::Database;
use serde_json::json;
use std::path::PathBuf;

use crate::cli_utils::{format_unix_timestamp, version_label};

pub fn cmd_inspect(database: PathBuf, json_output: bool, verbose: bool) -> Result<()> {
    let db = Database::open(&database)
        .with_context(|| format!("Failed to load database: {}", database.display()))?;

    let metadata = db.metadata();
    let tree_stats = if verbose {
        let tree = db
            .grow_tree()
            .with_context(|| format!("Failed to materialize trie: {}", database.display()))?;
        Some((tree.internal_count(), tree.leaf_count()))
    } else {
        None
    };

    if json_output {
        let mut output = json!({
            "file": database.display().to_string(),
            "size": db.size(),
            "ip_version": version_label(db.ip_version()),
            "start_from": db.start_from(),
            "metadata": metadata,
        });

        if let Some((internal, leaves)) = tree_stats {
            output["tree"] = json!({
                "internal_nodes": internal,
                "leaves": leaves,
            });
        }

        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Database:   {}", database.display());
        println!("Size:       {} bytes", db.size());
        println!("IP version: {}", version_label(db.ip_version()));
        println!(
            "Build time: {} ({})",
            format_unix_timestamp(metadata.build),
            metadata.build
        );
        println!("Node count: {}", metadata.node_count);
        println!("Start node: {}", db.start_from());
        println!();
        println!("Languages:");
        for (lang, column) in &metadata.languages {
            println!("  {:<8} column {}", lang, column);
        }
        println!();
        println!("Fields:");
        for field in db.fields() {
            println!("  {}", field);
        }

        if let Some((internal, leaves)) = tree_stats {
            println!();
            println!("Trie:");
            println!("  Internal nodes:  {}", internal);
            println!("  Distinct leaves: {}", leaves);
        }
    }

    Ok(())
}
