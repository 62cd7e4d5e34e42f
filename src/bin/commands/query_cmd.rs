use anyhow::{Context, Result};
use ipdb::{Database, IpdbError};
use serde_json::json;
use std::path::PathBuf;

pub fn cmd_query(
    database: PathBuf,
    ip: String,
    lang: Option<String>,
    in_memory: bool,
    quiet: bool,
) -> Result<()> {
    let opener = Database::opener(&database);
    let opener = if in_memory { opener.in_memory() } else { opener };
    let db = opener
        .open()
        .with_context(|| format!("Failed to load database: {}", database.display()))?;

    let locator = match db.lookup(&ip) {
        Ok(locator) => Some(locator),
        Err(IpdbError::NotFound) => None,
        Err(e) => return Err(e).with_context(|| format!("Query failed for: {}", ip)),
    };

    if quiet {
        // Quiet mode: no output, just exit code
        std::process::exit(if locator.is_some() { 0 } else { 1 });
    }

    let Some(locator) = locator else {
        println!("[]");
        std::process::exit(1);
    };

    let fields = match &lang {
        Some(lang) => serde_json::to_value(db.get_all_fields_locale(locator, lang)?)?,
        None => serde_json::to_value(db.get_all_fields(locator)?)?,
    };

    let result = json!({
        "ip": ip,
        "locator": locator,
        "fields": fields,
    });
    println!("{}", serde_json::to_string_pretty(&json!([result]))?);

    Ok(())
}
