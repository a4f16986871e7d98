//! Collection commands: lock and drop-collection.

use std::io::Write;

use simplesecret_core::SimpleCollection;

use crate::error::CliError;

/// Lock command handler
pub fn cmd_lock(collection: &mut SimpleCollection, out: &mut impl Write) -> Result<(), CliError> {
    collection.lock()?;
    writeln!(out, "Locked {}", collection.path())?;
    Ok(())
}

/// Drop-collection command handler
pub fn cmd_drop_collection(
    collection: &mut SimpleCollection,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let label = collection.label()?;
    if !collection.delete()? {
        return Err(CliError::Dismissed(format!(
            "collection '{label}' was not deleted"
        )));
    }
    writeln!(out, "Deleted collection '{label}'")?;
    Ok(())
}
