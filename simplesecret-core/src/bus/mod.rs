//! Remote-call collaborator for the Secret Service
//!
//! The engine never talks to the message bus directly. It consumes the
//! narrow [`SecretServiceBus`] interface: one synchronous method per remote
//! call it needs, plus a [`SignalHub`] that the implementation feeds with the
//! `CollectionCreated`, `ItemCreated` and `Prompt.Completed` signals.
//!
//! Two implementations exist:
//! - [`DbusSecretService`] (feature `dbus`) talks to `org.freedesktop.secrets`
//!   on the session bus through zbus
//! - [`crate::testing::MockSecretService`] keeps everything in memory
//!
//! The bus connection is process-wide. [`BusContext::session`] opens it once,
//! lazily, and hands out clones; [`BusContext::shutdown`] releases it at exit.

#[cfg(feature = "dbus")]
mod dbus;
mod signals;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::error;

use crate::error::BusResult;
use crate::secret::Secret;

#[cfg(feature = "dbus")]
pub use dbus::DbusSecretService;
pub use signals::{BusSignal, SignalCursor, SignalHub};

/// Well-known bus name of the secret service
pub const SECRETS_SERVICE: &str = "org.freedesktop.secrets";
/// Object path of the service object
pub const SECRETS_PATH: &str = "/org/freedesktop/secrets";
/// Object path of the default collection alias
pub const DEFAULT_COLLECTION: &str = "/org/freedesktop/secrets/aliases/default";

/// D-Bus interface names used by the client
pub mod interfaces {
    /// `org.freedesktop.Secret.Service`
    pub const SERVICE: &str = "org.freedesktop.Secret.Service";
    /// `org.freedesktop.Secret.Collection`
    pub const COLLECTION: &str = "org.freedesktop.Secret.Collection";
    /// `org.freedesktop.Secret.Item`
    pub const ITEM: &str = "org.freedesktop.Secret.Item";
    /// `org.freedesktop.Secret.Session`
    pub const SESSION: &str = "org.freedesktop.Secret.Session";
    /// `org.freedesktop.Secret.Prompt`
    pub const PROMPT: &str = "org.freedesktop.Secret.Prompt";
    /// gnome-keyring extension for prompt-less master password handling
    pub const WITHOUT_PROMPT: &str = "org.gnome.keyring.InternalUnsupportedGuiltRiddenInterface";
    /// `org.freedesktop.DBus.Properties`
    pub const PROPERTIES: &str = "org.freedesktop.DBus.Properties";
    /// `org.freedesktop.DBus.Peer`
    pub const PEER: &str = "org.freedesktop.DBus.Peer";
}

/// Property keys exchanged in `a{sv}` property maps
pub mod properties {
    /// Collection label
    pub const COLLECTION_LABEL: &str = "org.freedesktop.Secret.Collection.Label";
    /// Item label
    pub const ITEM_LABEL: &str = "org.freedesktop.Secret.Item.Label";
    /// Item attributes
    pub const ITEM_ATTRIBUTES: &str = "org.freedesktop.Secret.Item.Attributes";
}

/// Lookup attributes of an item
pub type Attributes = HashMap<String, String>;

/// Opaque object path of a remote object
///
/// The root path `/` is the sentinel for "no object" and "no prompt needed".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectPath(String);

impl ObjectPath {
    /// The sentinel root path
    pub const ROOT: &'static str = "/";

    /// Wraps a path string
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Returns the sentinel root path
    #[must_use]
    pub fn root() -> Self {
        Self(Self::ROOT.to_string())
    }

    /// Returns true for the sentinel path (or an empty path)
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty() || self.0 == Self::ROOT
    }

    /// Returns the path as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the identifier, i.e. the last path segment
    ///
    /// `/org/freedesktop/secrets/collection/login` has the id `login`,
    /// the root path has none.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        self.0.rsplit('/').next().filter(|segment| !segment.is_empty())
    }

    /// Builds a child path
    #[must_use]
    pub fn child(&self, segment: &str) -> Self {
        Self(format!("{}/{segment}", self.0.trim_end_matches('/')))
    }

    /// Returns true if `other` is a direct child of this path
    #[must_use]
    pub fn is_parent_of(&self, other: &Self) -> bool {
        other
            .0
            .rsplit_once('/')
            .is_some_and(|(parent, _)| parent == self.0)
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectPath {
    fn from(path: &str) -> Self {
        Self(path.to_string())
    }
}

impl From<String> for ObjectPath {
    fn from(path: String) -> Self {
        Self(path)
    }
}

impl AsRef<str> for ObjectPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Properties of a new item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemProperties {
    /// Displayable label
    pub label: String,
    /// Lookup attributes
    pub attributes: Attributes,
}

impl ItemProperties {
    /// Creates item properties
    pub fn new(label: impl Into<String>, attributes: Option<&Attributes>) -> Self {
        Self {
            label: label.into(),
            attributes: attributes.cloned().unwrap_or_default(),
        }
    }
}

/// Synchronous remote-call interface to a Secret Service implementation
///
/// Methods returning `(ObjectPath, ObjectPath)` return the created object and
/// a prompt; exactly one of them is the root path. Methods returning a single
/// prompt path return the root path when no prompt is needed.
pub trait SecretServiceBus: Send + Sync {
    /// Checks that the service answers at all
    ///
    /// # Errors
    /// Returns `BusError` if the service cannot be reached.
    fn ping(&self) -> BusResult<()>;

    /// `Service.OpenSession(algorithm, input) -> (output, session)`
    ///
    /// # Errors
    /// Returns `BusError::NotSupported` if the algorithm is rejected.
    fn open_session(&self, algorithm: &str, input: &[u8]) -> BusResult<(Vec<u8>, ObjectPath)>;

    /// `Session.Close()`
    ///
    /// # Errors
    /// Returns `BusError` if the call fails.
    fn close_session(&self, session: &ObjectPath) -> BusResult<()>;

    /// Object paths of all collections
    ///
    /// # Errors
    /// Returns `BusError` if the property cannot be read.
    fn collections(&self) -> BusResult<Vec<ObjectPath>>;

    /// `Service.CreateCollection(properties, "") -> (collection, prompt)`
    ///
    /// # Errors
    /// Returns `BusError` if the call fails.
    fn create_collection(&self, label: &str) -> BusResult<(ObjectPath, ObjectPath)>;

    /// Creates a collection protected by a master password, without prompting
    ///
    /// # Errors
    /// Returns `BusError` if the call fails.
    fn create_with_master_password(&self, label: &str, master: &Secret) -> BusResult<ObjectPath>;

    /// Unlocks a collection with its master password, without prompting
    ///
    /// # Errors
    /// Returns `BusError` if the password is wrong or the call fails.
    fn unlock_with_master_password(&self, collection: &ObjectPath, master: &Secret)
    -> BusResult<()>;

    /// `Service.Lock(objects) -> (locked, prompt)`
    ///
    /// # Errors
    /// Returns `BusError` if the call fails.
    fn lock(&self, objects: &[ObjectPath]) -> BusResult<(Vec<ObjectPath>, ObjectPath)>;

    /// `Service.Unlock(objects) -> (unlocked, prompt)`
    ///
    /// # Errors
    /// Returns `BusError` if the call fails.
    fn unlock(&self, objects: &[ObjectPath]) -> BusResult<(Vec<ObjectPath>, ObjectPath)>;

    /// `Prompt.Prompt(window_id)`; completion arrives as a signal
    ///
    /// # Errors
    /// Returns `BusError` if the prompt cannot be shown.
    fn prompt(&self, prompt: &ObjectPath, window_id: &str) -> BusResult<()>;

    /// Label of a collection
    ///
    /// # Errors
    /// Returns `BusError` if the property cannot be read.
    fn collection_label(&self, collection: &ObjectPath) -> BusResult<String>;

    /// `Locked` property of a collection or item
    ///
    /// # Errors
    /// Returns `BusError` if the property cannot be read.
    fn is_locked(&self, object: &ObjectPath) -> BusResult<bool>;

    /// Object paths of all items in a collection
    ///
    /// # Errors
    /// Returns `BusError` if the property cannot be read.
    fn collection_items(&self, collection: &ObjectPath) -> BusResult<Vec<ObjectPath>>;

    /// `Collection.SearchItems(attributes) -> items`
    ///
    /// # Errors
    /// Returns `BusError` if the call fails.
    fn search_items(
        &self,
        collection: &ObjectPath,
        attributes: &Attributes,
    ) -> BusResult<Vec<ObjectPath>>;

    /// `Collection.CreateItem(properties, secret, replace) -> (item, prompt)`
    ///
    /// # Errors
    /// Returns `BusError` if the call fails.
    fn create_item(
        &self,
        collection: &ObjectPath,
        properties: &ItemProperties,
        secret: &Secret,
        replace: bool,
    ) -> BusResult<(ObjectPath, ObjectPath)>;

    /// Label of an item
    ///
    /// # Errors
    /// Returns `BusError::NoSuchObject` if the item does not exist.
    fn item_label(&self, item: &ObjectPath) -> BusResult<String>;

    /// Sets the label of an item
    ///
    /// # Errors
    /// Returns `BusError` if the property cannot be written.
    fn set_item_label(&self, item: &ObjectPath, label: &str) -> BusResult<()>;

    /// Attributes of an item
    ///
    /// # Errors
    /// Returns `BusError::NoSuchObject` if the item does not exist.
    fn item_attributes(&self, item: &ObjectPath) -> BusResult<Attributes>;

    /// Replaces the attributes of an item
    ///
    /// # Errors
    /// Returns `BusError` if the property cannot be written.
    fn set_item_attributes(&self, item: &ObjectPath, attributes: &Attributes) -> BusResult<()>;

    /// `Item.GetSecret(session) -> secret`
    ///
    /// # Errors
    /// Returns `BusError` if the item is locked or missing.
    fn get_secret(&self, item: &ObjectPath, session: &ObjectPath) -> BusResult<Secret>;

    /// `Item.SetSecret(secret)`
    ///
    /// # Errors
    /// Returns `BusError` if the item is locked or missing.
    fn set_secret(&self, item: &ObjectPath, secret: &Secret) -> BusResult<()>;

    /// `Delete() -> prompt` on an item or a collection
    ///
    /// # Errors
    /// Returns `BusError` if the call fails.
    fn delete(&self, object: &ObjectPath) -> BusResult<ObjectPath>;

    /// Hub receiving the service's signals
    fn signals(&self) -> &SignalHub;
}

/// Process-scoped handle to the bus collaborator
///
/// Cheap to clone; every clone shares the same connection. Components get the
/// context injected instead of reaching for a global.
#[derive(Clone)]
pub struct BusContext {
    bus: Arc<dyn SecretServiceBus>,
}

#[cfg(feature = "dbus")]
static SESSION_CONTEXT: parking_lot::Mutex<Option<BusContext>> = parking_lot::const_mutex(None);

impl BusContext {
    /// Wraps an existing bus implementation
    #[must_use]
    pub fn new(bus: Arc<dyn SecretServiceBus>) -> Self {
        Self { bus }
    }

    /// Returns the shared session-bus context, connecting on first use
    ///
    /// # Errors
    /// Returns `SecretError::ServiceUnavailable` if the session bus cannot be
    /// reached.
    #[cfg(feature = "dbus")]
    pub fn session() -> crate::error::SecretResult<Self> {
        let mut slot = SESSION_CONTEXT.lock();
        if let Some(context) = slot.as_ref() {
            return Ok(context.clone());
        }

        let service = DbusSecretService::connect().map_err(|e| {
            error!(error = %e, "Could not communicate properly with the D-Bus");
            crate::error::SecretError::ServiceUnavailable(e.to_string())
        })?;
        let context = Self::new(Arc::new(service));
        *slot = Some(context.clone());
        Ok(context)
    }

    /// Drops the shared session-bus context
    ///
    /// Call once at process exit. Facades still holding a clone keep the
    /// connection alive until they are dropped.
    #[cfg(feature = "dbus")]
    pub fn shutdown() {
        if SESSION_CONTEXT.lock().take().is_some() {
            tracing::debug!("Released shared session bus context");
        }
    }

    /// The underlying bus implementation
    #[must_use]
    pub fn bus(&self) -> &Arc<dyn SecretServiceBus> {
        &self.bus
    }

    /// Checks whether the secret service answers
    ///
    /// Logs an error explaining the likely cause when it does not.
    pub fn is_available(&self) -> bool {
        match self.bus.ping() {
            Ok(()) => true,
            Err(e) => {
                error!(
                    error = %e,
                    "The secret service is not available. Is gnome-keyring-daemon running?"
                );
                false
            }
        }
    }
}

impl fmt::Debug for BusContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusContext").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_path_is_sentinel() {
        assert!(ObjectPath::root().is_root());
        assert!(ObjectPath::new("").is_root());
        assert!(!ObjectPath::new(DEFAULT_COLLECTION).is_root());
    }

    #[test]
    fn test_id_is_last_segment() {
        assert_eq!(ObjectPath::new(DEFAULT_COLLECTION).id(), Some("default"));
        assert_eq!(
            ObjectPath::new("/org/freedesktop/secrets/collection/login").id(),
            Some("login")
        );
        assert_eq!(ObjectPath::root().id(), None);
    }

    #[test]
    fn test_child_and_parent() {
        let collection = ObjectPath::new("/org/freedesktop/secrets/collection/test");
        let item = collection.child("7");
        assert_eq!(item.as_str(), "/org/freedesktop/secrets/collection/test/7");
        assert!(collection.is_parent_of(&item));
        assert!(!item.is_parent_of(&collection));
    }

    #[test]
    fn test_item_properties_without_attributes() {
        let props = ItemProperties::new("label", None);
        assert_eq!(props.label, "label");
        assert!(props.attributes.is_empty());
    }
}
