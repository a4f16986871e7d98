//! `simplesecret` CLI - Command-line interface for the freedesktop.org Secret Service
//!
//! Stores, looks up, lists and deletes passwords in a collection of the
//! running secret service (gnome-keyring, KeePassXC, ...).

mod cli;
mod commands;
mod error;
mod util;

use clap::Parser;
use cli::Cli;
use simplesecret_core::tracing::{TracingConfig, TracingLevel, init_tracing};

fn main() {
    let cli = Cli::parse();

    if !cli.quiet {
        let config =
            TracingConfig::new().with_level(TracingLevel::from_verbosity(cli.verbose));
        if let Err(e) = init_tracing(&config) {
            eprintln!("Warning: {e}");
        }
    }

    let quiet = cli.quiet;
    let result = commands::dispatch(cli);
    simplesecret_core::BusContext::shutdown();

    if let Err(e) = result {
        if !quiet {
            eprintln!("Error: {e}");
        }
        std::process::exit(e.exit_code());
    }
}
