//! Command handler modules for the CLI.

mod collection;
mod completions;
mod items;
mod manpage;
mod status;

use std::io;

use simplesecret_core::{BusContext, ClientSettings, SimpleCollection};

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::util::{attributes_from_pairs, load_settings, read_password};

/// Dispatch a CLI command to the appropriate handler.
pub fn dispatch(cli: Cli) -> Result<(), CliError> {
    let Cli {
        collection: label,
        timeout,
        config,
        command,
        ..
    } = cli;

    // These never touch the bus
    match command {
        Commands::Completions { shell } => {
            return completions::cmd_completions(shell, &mut io::stdout());
        }
        Commands::Manpage => return manpage::cmd_manpage(&mut io::stdout()),
        _ => {}
    }

    if matches!(command, Commands::DropCollection) && label.is_none() {
        return Err(CliError::Validation(
            "drop-collection needs --collection <LABEL>".to_string(),
        ));
    }

    let settings = load_settings(config.as_deref(), timeout)?;
    let context = BusContext::session()?;
    let mut out = io::stdout().lock();

    match command {
        Commands::Status => status::cmd_status(&context, &mut out),
        Commands::Store {
            label: item_label,
            attributes,
            password_stdin,
            master_password,
        } => {
            let master = if master_password && label.is_some() {
                Some(read_password("Master password: ", None)?)
            } else {
                None
            };
            let mut collection = match label.as_deref() {
                Some(label) => {
                    SimpleCollection::create_or_open(&context, &settings, label, master.as_ref())?
                }
                None => SimpleCollection::default_collection(&context, &settings)?,
            };
            let password = if password_stdin {
                read_password("", Some(&mut io::stdin().lock()))?
            } else {
                read_password(&format!("Password for '{item_label}': "), None)?
            };
            items::cmd_store(
                &mut collection,
                &item_label,
                &password,
                &attributes_from_pairs(attributes),
                &mut out,
            )
        }
        Commands::Get { path } => {
            let mut collection = open_collection(&context, &settings, label.as_deref())?;
            items::cmd_get(&mut collection, &path, &mut out)
        }
        Commands::Search { attributes } => {
            let mut collection = open_collection(&context, &settings, label.as_deref())?;
            items::cmd_search(&mut collection, &attributes_from_pairs(attributes), &mut out)
        }
        Commands::Show { path } => {
            let mut collection = open_collection(&context, &settings, label.as_deref())?;
            items::cmd_show(&mut collection, &path, &mut out)
        }
        Commands::List => {
            let mut collection = open_collection(&context, &settings, label.as_deref())?;
            items::cmd_list(&mut collection, &mut out)
        }
        Commands::Dump => {
            let mut collection = open_collection(&context, &settings, label.as_deref())?;
            items::cmd_dump(&mut collection, &mut out)
        }
        Commands::Delete { paths } => {
            let mut collection = open_collection(&context, &settings, label.as_deref())?;
            items::cmd_delete(&mut collection, &paths, &mut out)
        }
        Commands::Lock => {
            let mut collection = open_collection(&context, &settings, label.as_deref())?;
            collection::cmd_lock(&mut collection, &mut out)
        }
        Commands::DropCollection => {
            let label = label.unwrap_or_default();
            let mut collection = SimpleCollection::open(&context, &settings, &label)?;
            collection::cmd_drop_collection(&mut collection, &mut out)
        }
        Commands::Completions { .. } | Commands::Manpage => Ok(()),
    }
}

/// Opens the collection named on the command line, or the default one
fn open_collection(
    context: &BusContext,
    settings: &ClientSettings,
    label: Option<&str>,
) -> Result<SimpleCollection, CliError> {
    let collection = match label {
        Some(label) => SimpleCollection::open(context, settings, label)?,
        None => SimpleCollection::default_collection(context, settings)?,
    };
    Ok(collection)
}
