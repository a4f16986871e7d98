//! Status command: checks the service and lists its collections.

use std::io::Write;

use simplesecret_core::{BusContext, SecretError};

use crate::error::CliError;

/// Status command handler
pub fn cmd_status(context: &BusContext, out: &mut impl Write) -> Result<(), CliError> {
    if !context.is_available() {
        return Err(CliError::ServiceUnavailable(
            "the secret service does not answer".to_string(),
        ));
    }

    let bus = context.bus();
    let mut collections = bus.collections().map_err(SecretError::from)?;
    collections.sort();

    writeln!(out, "Secret service is available")?;
    writeln!(out, "{} collection(s):", collections.len())?;
    for collection in &collections {
        let label = bus.collection_label(collection).unwrap_or_default();
        let state = match bus.is_locked(collection) {
            Ok(true) => "locked",
            Ok(false) => "unlocked",
            Err(_) => "unknown",
        };
        writeln!(out, "  {collection}\t{label}\t{state}")?;
    }
    Ok(())
}
