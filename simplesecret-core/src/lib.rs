//! `simplesecret` Core Library
//!
//! A client for the freedesktop.org Secret Service (gnome-keyring, KWallet's
//! secret service bridge, KeePassXC). It stores, looks up and deletes
//! passwords in a collection, taking care of the encrypted transport, of
//! interactive prompts and of the unlock policy.
//!
//! # Crate Structure
//!
//! - [`bus`] - Remote-call collaborator trait, object paths and signal delivery
//! - [`secret`] - Transport encryption, prompts, unlocking and the collection facades
//! - [`config`] - Client settings and their TOML persistence
//! - [`tracing`] - Structured logging setup and span names
//! - [`testing`] - In-memory secret service for tests
//!
//! # Feature Flags
//!
//! - `dbus` - zbus-backed session bus implementation (default)
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use simplesecret_core::{BusContext, ClientSettings, SimpleCollection};
//! use simplesecret_core::testing::MockSecretService;
//!
//! let context = BusContext::new(Arc::new(MockSecretService::new()));
//! let mut collection =
//!     SimpleCollection::default_collection(&context, &ClientSettings::default()).unwrap();
//! let item = collection.create_item("mail", "hunter2", None).unwrap().unwrap();
//! assert!(collection.get_secret(&item).unwrap().is_some());
//! ```

// Enable missing_docs warning for public API documentation
#![warn(missing_docs)]

pub mod bus;
pub mod config;
pub mod error;
pub mod secret;
pub mod testing;
pub mod tracing;

// =============================================================================
// Convenience re-exports
// =============================================================================

#[cfg(feature = "dbus")]
pub use bus::DbusSecretService;
pub use bus::{
    Attributes, BusContext, BusSignal, DEFAULT_COLLECTION, ItemProperties, ObjectPath,
    SecretServiceBus, SignalCursor, SignalHub,
};
pub use config::ClientSettings;
pub use error::{BusError, BusResult, ConfigError, ConfigResult, SecretError, SecretResult};
pub use secret::{
    AsyncResult, AsyncSimpleCollection, CancellationToken, CollectionClient, ConsentFlag,
    LockState, OperationOutcome, PendingOperation, PromptCoordinator, PromptOutcome, Resolution,
    Secret, Session, SimpleCollection, TransportAlgorithm, TransportEncryption, UnlockMethod,
    UnlockStateMachine, find_collection, is_default_collection, spawn_operation,
};
pub use tracing::{
    TracingConfig, TracingError, TracingLevel, TracingOutput, TracingResult, init_tracing,
};
