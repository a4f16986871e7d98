//! Man page generation via `clap_mangen`.

use std::io::Write;

use clap::CommandFactory;

use crate::cli::Cli;
use crate::error::CliError;

/// Generate a man page for the CLI and write it to `out`.
pub fn cmd_manpage(out: &mut impl Write) -> Result<(), CliError> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    man.render(out).map_err(CliError::Io)?;
    Ok(())
}
