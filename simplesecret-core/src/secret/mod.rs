//! Session-and-consent engine
//!
//! Leaf-first:
//! - [`TransportEncryption`] negotiates the session key and encrypts secrets
//! - [`PromptCoordinator`] shows prompts and waits for their completion
//! - [`UnlockStateMachine`] picks master password or interactive unlocks and
//!   tracks the user's consent
//! - [`CollectionClient`] runs collection and item operations
//! - [`SimpleCollection`] is the synchronous facade, [`AsyncSimpleCollection`]
//!   its async wrapper

mod async_client;
mod collection;
pub(crate) mod dh;
mod prompt;
mod simple;
mod transport;
mod unlock;

pub use async_client::{
    AsyncResult, AsyncSimpleCollection, CancellationToken, PendingOperation, spawn_operation,
};
pub use collection::{
    CollectionClient, DEFAULT_COLLECTION_IDS, find_collection, is_default_collection,
};
pub use prompt::{OperationOutcome, PromptCoordinator, PromptOutcome, Resolution};
pub use simple::SimpleCollection;
pub use transport::{
    AES_BLOCK_LEN, ALGORITHM_DH, ALGORITHM_PLAIN, CONTENT_TYPE, Secret, Session,
    TransportAlgorithm, TransportEncryption,
};
pub use unlock::{ConsentFlag, LockState, UnlockMethod, UnlockStateMachine};

pub(crate) use transport::{aes_cbc_decrypt, aes_cbc_encrypt};
