//! Item commands: store, get, search, show, list, dump and delete.

use std::io::Write;

use secrecy::{ExposeSecret, SecretString};
use simplesecret_core::{Attributes, SimpleCollection};

use crate::error::CliError;

/// Store command handler
pub fn cmd_store(
    collection: &mut SimpleCollection,
    label: &str,
    password: &SecretString,
    attributes: &Attributes,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let attributes = (!attributes.is_empty()).then_some(attributes);
    match collection.create_item(label, password.expose_secret(), attributes)? {
        Some(item) => {
            writeln!(out, "{item}")?;
            Ok(())
        }
        None => Err(CliError::Dismissed(format!(
            "item '{label}' was not created"
        ))),
    }
}

/// Get command handler
pub fn cmd_get(
    collection: &mut SimpleCollection,
    path: &str,
    out: &mut impl Write,
) -> Result<(), CliError> {
    match collection.get_secret(path)? {
        Some(secret) => {
            writeln!(out, "{}", secret.expose_secret())?;
            Ok(())
        }
        None => Err(absent(collection, path)),
    }
}

/// Search command handler
pub fn cmd_search(
    collection: &mut SimpleCollection,
    attributes: &Attributes,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let Some(mut found) = collection.get_items(attributes)? else {
        return Err(CliError::NotFound(
            "no item matches the given attributes".to_string(),
        ));
    };
    found.sort();
    for item in found {
        writeln!(out, "{item}")?;
    }
    Ok(())
}

/// Show command handler
pub fn cmd_show(
    collection: &mut SimpleCollection,
    path: &str,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let Some(label) = collection.get_label(path)? else {
        return Err(absent(collection, path));
    };
    let attributes = collection.get_attributes(path)?.unwrap_or_default();

    writeln!(out, "Item Details:")?;
    writeln!(out, "  Path:  {path}")?;
    writeln!(out, "  Label: {label}")?;
    if !attributes.is_empty() {
        let mut pairs: Vec<_> = attributes.into_iter().collect();
        pairs.sort();
        writeln!(out, "  Attributes:")?;
        for (key, value) in pairs {
            writeln!(out, "    {key} = {value}")?;
        }
    }
    Ok(())
}

/// List command handler
pub fn cmd_list(collection: &mut SimpleCollection, out: &mut impl Write) -> Result<(), CliError> {
    let mut items = collection.items()?;
    if items.is_empty() {
        writeln!(out, "No items found.")?;
        return Ok(());
    }
    items.sort();

    for item in &items {
        let label = collection.get_label(item)?.unwrap_or_default();
        writeln!(out, "{item}\t{label}")?;
    }
    Ok(())
}

/// Dump command handler
pub fn cmd_dump(collection: &mut SimpleCollection, out: &mut impl Write) -> Result<(), CliError> {
    let mut secrets: Vec<_> = collection.get_secrets()?.into_iter().collect();
    secrets.sort_by(|a, b| a.0.cmp(&b.0));

    for (item, secret) in &secrets {
        writeln!(out, "{item}\t{}", secret.expose_secret())?;
    }
    Ok(())
}

/// Delete command handler
pub fn cmd_delete(
    collection: &mut SimpleCollection,
    paths: &[String],
    out: &mut impl Write,
) -> Result<(), CliError> {
    let deleted = collection.delete_items(paths)?;
    writeln!(out, "Deleted {deleted} of {} item(s)", paths.len())?;

    if deleted < paths.len() {
        return Err(CliError::NotFound(format!(
            "{} item(s) were not deleted",
            paths.len() - deleted
        )));
    }
    Ok(())
}

/// Explains an absent result: a collection that stayed locked, or a missing item
fn absent(collection: &mut SimpleCollection, path: &str) -> CliError {
    if collection.is_locked().unwrap_or(false) {
        CliError::Dismissed("the collection was not unlocked".to_string())
    } else {
        CliError::NotFound(path.to_string())
    }
}
