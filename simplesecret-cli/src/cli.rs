//! CLI argument parsing types using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use crate::util::parse_key_val;

/// `simplesecret` command-line interface for the freedesktop.org Secret Service
#[derive(Parser)]
#[command(name = "simplesecret")]
#[command(author, version, about = "Store and look up passwords in the Secret Service")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Label of the collection to use; the default collection if omitted
    #[arg(short = 'C', long, global = true, env = "SIMPLESECRET_COLLECTION")]
    pub collection: Option<String>,

    /// Seconds to wait for the user to answer a prompt
    #[arg(short, long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Path to the settings file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except results
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Check that the secret service is running
    #[command(about = "Show whether the secret service is available and list its collections")]
    Status,

    /// Store a password
    #[command(about = "Create an item; the password is read from the terminal")]
    Store {
        /// Label of the new item
        label: String,

        /// Lookup attribute (repeatable)
        #[arg(short, long = "attr", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        attributes: Vec<(String, String)>,

        /// Read the password from the first line of stdin
        #[arg(long)]
        password_stdin: bool,

        /// Ask for a master password when the collection has to be created
        #[arg(long)]
        master_password: bool,
    },

    /// Print the password stored in an item
    Get {
        /// Object path of the item
        path: String,
    },

    /// Find items by attributes
    #[command(about = "Print the paths of items whose attributes contain all given pairs")]
    Search {
        /// Attributes to match
        #[arg(required = true, value_name = "KEY=VALUE", value_parser = parse_key_val)]
        attributes: Vec<(String, String)>,
    },

    /// Show the label and attributes of an item
    Show {
        /// Object path of the item
        path: String,
    },

    /// List every item of the collection
    List,

    /// Print every password of the collection
    #[command(about = "Print every password; asks for permission first")]
    Dump,

    /// Delete items
    #[command(about = "Delete items; asks for permission first")]
    Delete {
        /// Object paths of the items
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Lock the collection
    Lock,

    /// Delete the whole collection given with --collection
    #[command(about = "Delete a collection; default collections are refused")]
    DropCollection,

    /// Generate shell completions
    #[command(about = "Generate shell completion scripts")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Generate a man page
    #[command(about = "Print the man page in roff format")]
    Manpage,
}
