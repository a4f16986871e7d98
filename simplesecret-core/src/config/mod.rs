//! Client configuration
//!
//! [`ClientSettings`] holds the timeouts and transport parameters of the
//! client. They are stored as TOML in the user's configuration directory.

pub mod settings;

pub use settings::{CONFIG_DIR_NAME, CONFIG_FILE_NAME, ClientSettings};
