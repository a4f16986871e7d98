//! Shared utility functions used across command modules.

use std::io::BufRead;
use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use simplesecret_core::{Attributes, ClientSettings};

use crate::error::CliError;

/// Loads the settings file given on the command line, or the user's settings,
/// and applies the `--timeout` override
pub fn load_settings(
    config_path: Option<&Path>,
    timeout_secs: Option<u64>,
) -> Result<ClientSettings, CliError> {
    let mut settings = match config_path {
        Some(path) => ClientSettings::load(path)?,
        None => ClientSettings::load_or_default(),
    };

    if let Some(secs) = timeout_secs {
        if secs == 0 {
            return Err(CliError::Validation(
                "--timeout must be greater than zero".to_string(),
            ));
        }
        settings.prompt_timeout = Duration::from_secs(secs);
    }
    Ok(settings)
}

/// Parse a key=value pair for attribute arguments
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=value: no `=` found in `{s}`"))?;
    if pos == 0 {
        return Err(format!("invalid KEY=value: empty key in `{s}`"));
    }
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

/// Collects attribute pairs; later pairs win over earlier ones with the same key
pub fn attributes_from_pairs(pairs: Vec<(String, String)>) -> Attributes {
    pairs.into_iter().collect()
}

/// Reads a password from the terminal, or from the first line of `input`
pub fn read_password(
    prompt: &str,
    input: Option<&mut dyn BufRead>,
) -> Result<SecretString, CliError> {
    let password = match input {
        Some(reader) => {
            let mut line = String::new();
            reader.read_line(&mut line)?;
            let trimmed = line.trim_end_matches(['\r', '\n']).to_string();
            secrecy::zeroize::Zeroize::zeroize(&mut line);
            trimmed
        }
        None => rpassword::prompt_password(prompt)?,
    };

    if password.is_empty() {
        return Err(CliError::Validation("The password may not be empty".to_string()));
    }
    Ok(SecretString::from(password))
}
