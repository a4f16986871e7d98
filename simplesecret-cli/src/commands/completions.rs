//! Shell completion generation.

use std::io::Write;

use clap::CommandFactory;
use clap_complete::{Shell, generate};

use crate::cli::Cli;
use crate::error::CliError;

/// Generate shell completions and write them to `out`.
pub fn cmd_completions(shell: Shell, out: &mut impl Write) -> Result<(), CliError> {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "simplesecret", out);
    Ok(())
}
