//! Synchronous facade over a single collection
//!
//! ```ignore
//! use simplesecret_core::{BusContext, ClientSettings, SimpleCollection};
//!
//! let context = BusContext::session()?;
//! let settings = ClientSettings::load_or_default();
//! let mut collection = SimpleCollection::create_or_open(&context, &settings, "My Collection", None)?;
//! let item = collection.create_item("site-login", "s3cr3t", None)?;
//! ```

use std::collections::HashMap;
use std::time::Duration;

use secrecy::SecretString;
use tracing::{debug, error, instrument};

use super::collection::CollectionClient;
use super::unlock::{ConsentFlag, LockState};
use crate::bus::{Attributes, BusContext, ObjectPath};
use crate::config::ClientSettings;
use crate::error::{SecretError, SecretResult};

/// A collection of the secret service, addressed by object path strings
///
/// Calls block while the service waits for the user. A `SimpleCollection` is
/// meant to be used from one thread at a time; wrap it in
/// [`AsyncSimpleCollection`](super::AsyncSimpleCollection) to share it.
///
/// Dropping the facade closes its session.
#[derive(Debug)]
pub struct SimpleCollection {
    context: BusContext,
    client: CollectionClient,
}

impl SimpleCollection {
    /// Opens the default collection on the session bus with the user's settings
    ///
    /// # Errors
    /// Returns `SecretError::ServiceUnavailable` if the service cannot be
    /// reached.
    #[cfg(feature = "dbus")]
    pub fn new() -> SecretResult<Self> {
        let context = BusContext::session()?;
        Self::default_collection(&context, &ClientSettings::load_or_default())
    }

    /// Opens the default collection
    ///
    /// # Errors
    /// Returns `SecretError::ServiceUnavailable` if the service cannot be
    /// reached, or `SecretError::HandshakeFailed` if no session can be
    /// negotiated.
    pub fn default_collection(context: &BusContext, settings: &ClientSettings) -> SecretResult<Self> {
        ensure_available(context)?;
        let client = CollectionClient::default_collection(context.bus().clone(), settings)?;
        Ok(Self::wrap(context, client))
    }

    /// Opens the collection labelled `label`, creating it if it does not exist
    ///
    /// # Errors
    /// Returns `SecretError::ServiceUnavailable` if the service cannot be
    /// reached or the new collection cannot be confirmed, and
    /// `SecretError::AccessDenied` if the user dismisses its creation.
    #[instrument(skip(context, settings, master_password))]
    pub fn create_or_open(
        context: &BusContext,
        settings: &ClientSettings,
        label: &str,
        master_password: Option<&SecretString>,
    ) -> SecretResult<Self> {
        ensure_available(context)?;
        let client = CollectionClient::create_or_open(
            context.bus().clone(),
            settings,
            label,
            master_password,
        )?;
        Ok(Self::wrap(context, client))
    }

    /// Opens the existing collection labelled `label`
    ///
    /// # Errors
    /// Returns `SecretError::NotFound` if there is no such collection.
    pub fn open(context: &BusContext, settings: &ClientSettings, label: &str) -> SecretResult<Self> {
        ensure_available(context)?;
        let client = CollectionClient::open(context.bus().clone(), settings, label)?;
        Ok(Self::wrap(context, client))
    }

    fn wrap(context: &BusContext, client: CollectionClient) -> Self {
        Self {
            context: context.clone(),
            client,
        }
    }

    /// Object path of the collection
    #[must_use]
    pub fn path(&self) -> &str {
        self.client.path().as_str()
    }

    /// Label of the collection
    ///
    /// # Errors
    /// Returns `SecretError::Bus` if the label cannot be read.
    pub fn label(&self) -> SecretResult<String> {
        self.client.label()
    }

    /// Whether the collection is currently locked
    ///
    /// # Errors
    /// Returns `SecretError::Bus` if the state cannot be read.
    pub fn is_locked(&mut self) -> SecretResult<bool> {
        Ok(self.client.lock_state()? == LockState::Locked)
    }

    /// Whether this is one of the service's default collections
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.client.is_default()
    }

    /// Consent recorded by this facade
    #[must_use]
    pub const fn consent(&self) -> ConsentFlag {
        self.client.consent()
    }

    /// The bus context this facade uses
    #[must_use]
    pub const fn context(&self) -> &BusContext {
        &self.context
    }

    /// Prompt timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.client.timeout()
    }

    /// Changes the prompt timeout
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.client.set_timeout(timeout);
    }

    /// Locks the collection
    ///
    /// # Errors
    /// Returns `SecretError::Bus` if the service cannot lock it.
    pub fn lock(&mut self) -> SecretResult<()> {
        self.client.lock()
    }

    /// Asks the user to unlock the collection
    ///
    /// For a default collection, the first call in the lifetime of this
    /// facade locks the collection first so the user has to confirm.
    ///
    /// # Errors
    /// Returns `SecretError::AccessDenied` if the collection stays locked.
    pub fn unlock_with_user_permission(&mut self) -> SecretResult<()> {
        self.client.unlock_with_user_permission()
    }

    /// Wipes the session key and the master password
    pub fn clear(&mut self) {
        self.client.clear();
    }

    /// Wipes key material and closes the session
    pub fn close(&mut self) {
        self.client.close();
    }

    /// Creates an item and returns its path
    ///
    /// Returns `None` if the user dismissed a prompt or the item could not be
    /// confirmed.
    ///
    /// # Errors
    /// Returns `SecretError::Validation` if the label or password is empty.
    pub fn create_item(
        &mut self,
        label: &str,
        password: &str,
        attributes: Option<&Attributes>,
    ) -> SecretResult<Option<String>> {
        Ok(self
            .client
            .create_item(label, password, attributes)?
            .map(|item| item.to_string()))
    }

    /// Updates label, attributes and password of an item where given
    ///
    /// Returns false if nothing could be updated.
    ///
    /// # Errors
    /// Returns `SecretError::Validation` if `path` is empty.
    pub fn update_item(
        &mut self,
        path: &str,
        label: Option<&str>,
        attributes: Option<&Attributes>,
        password: Option<&str>,
    ) -> SecretResult<bool> {
        let item = item_path(path).ok_or_else(|| {
            SecretError::Validation("The object path of the item may not be empty".to_string())
        })?;
        self.client.update_item(&item, label, attributes, password)
    }

    /// Label of an item
    ///
    /// # Errors
    /// Returns `SecretError::Bus` if the label cannot be read.
    pub fn get_label(&mut self, path: &str) -> SecretResult<Option<String>> {
        match item_path(path) {
            Some(item) => self.client.get_label(&item),
            None => Ok(None),
        }
    }

    /// Attributes of an item
    ///
    /// # Errors
    /// Returns `SecretError::Bus` if the attributes cannot be read.
    pub fn get_attributes(&mut self, path: &str) -> SecretResult<Option<Attributes>> {
        match item_path(path) {
            Some(item) => self.client.get_attributes(&item),
            None => Ok(None),
        }
    }

    /// Paths of the items matching all of `attributes`
    ///
    /// # Errors
    /// Returns `SecretError::Bus` if the search fails.
    pub fn get_items(&mut self, attributes: &Attributes) -> SecretResult<Option<Vec<String>>> {
        Ok(self
            .client
            .get_items(attributes)?
            .map(|items| items.iter().map(ToString::to_string).collect()))
    }

    /// Paths of every item in the collection
    ///
    /// # Errors
    /// Returns `SecretError::Bus` if the items cannot be listed.
    pub fn items(&self) -> SecretResult<Vec<String>> {
        Ok(self
            .client
            .items()?
            .iter()
            .map(ToString::to_string)
            .collect())
    }

    /// Password stored in an item
    ///
    /// # Errors
    /// Returns `SecretError::Bus` if the secret cannot be fetched.
    pub fn get_secret(&mut self, path: &str) -> SecretResult<Option<SecretString>> {
        match item_path(path) {
            Some(item) => self.client.get_secret(&item),
            None => Ok(None),
        }
    }

    /// Passwords of every item, keyed by item path
    ///
    /// # Errors
    /// Returns `SecretError::AccessDenied` without the user's permission.
    pub fn get_secrets(&mut self) -> SecretResult<HashMap<String, SecretString>> {
        Ok(self
            .client
            .get_secrets()?
            .into_iter()
            .map(|(item, secret)| (item.to_string(), secret))
            .collect())
    }

    /// Deletes an item
    ///
    /// # Errors
    /// Returns `SecretError::AccessDenied` without the user's permission.
    pub fn delete_item(&mut self, path: &str) -> SecretResult<bool> {
        let item = item_path(path).ok_or_else(|| {
            SecretError::Validation("The object path of the item may not be empty".to_string())
        })?;
        self.client.delete_item(&item)
    }

    /// Deletes items, stopping at the first failure
    ///
    /// # Errors
    /// Returns `SecretError::AccessDenied` without the user's permission.
    pub fn delete_items<S: AsRef<str>>(&mut self, paths: &[S]) -> SecretResult<usize> {
        let items: Vec<ObjectPath> = paths.iter().filter_map(|p| item_path(p.as_ref())).collect();
        self.client.delete_items(&items)
    }

    /// Deletes the collection
    ///
    /// # Errors
    /// Returns `SecretError::AccessDenied` for a default collection.
    pub fn delete(&mut self) -> SecretResult<bool> {
        self.client.delete()
    }
}

impl Drop for SimpleCollection {
    fn drop(&mut self) {
        self.client.close();
    }
}

fn ensure_available(context: &BusContext) -> SecretResult<()> {
    if context.is_available() {
        debug!("Secret service is available");
        Ok(())
    } else {
        error!("Could not communicate properly with the secret service");
        Err(SecretError::ServiceUnavailable(
            "Could not communicate properly with the secret service".to_string(),
        ))
    }
}

fn item_path(path: &str) -> Option<ObjectPath> {
    let path = path.trim();
    (!path.is_empty()).then(|| ObjectPath::from(path))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use secrecy::ExposeSecret;

    use super::*;
    use crate::testing::MockSecretService;

    fn facade() -> (Arc<MockSecretService>, SimpleCollection) {
        let mock = Arc::new(MockSecretService::new());
        let context = BusContext::new(mock.clone());
        let collection =
            SimpleCollection::default_collection(&context, &ClientSettings::default()).unwrap();
        (mock, collection)
    }

    #[test]
    fn test_unavailable_service() {
        let mock = Arc::new(MockSecretService::new());
        mock.set_available(false);
        let context = BusContext::new(mock);

        let err = SimpleCollection::default_collection(&context, &ClientSettings::default())
            .unwrap_err();
        assert!(matches!(err, SecretError::ServiceUnavailable(_)));
    }

    #[test]
    fn test_store_and_read_back() {
        let (_mock, mut collection) = facade();
        let path = collection
            .create_item("site-login", "s3cr3t", None)
            .unwrap()
            .unwrap();

        let secret = collection.get_secret(&path).unwrap().unwrap();
        assert_eq!(secret.expose_secret(), "s3cr3t");
        assert_eq!(
            collection.get_label(&path).unwrap().as_deref(),
            Some("site-login")
        );
    }

    #[test]
    fn test_empty_paths() {
        let (_mock, mut collection) = facade();
        assert!(collection.get_secret("").unwrap().is_none());
        assert!(collection.get_label(" ").unwrap().is_none());
        assert!(matches!(
            collection.update_item("", Some("x"), None, None),
            Err(SecretError::Validation(_))
        ));
    }

    #[test]
    fn test_timeout_accessors() {
        let (_mock, mut collection) = facade();
        assert_eq!(collection.timeout(), ClientSettings::default().prompt_timeout);
        collection.set_timeout(Duration::from_secs(3));
        assert_eq!(collection.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_drop_closes_session() {
        let (mock, collection) = facade();
        assert_eq!(mock.open_session_count(), 1);
        drop(collection);
        assert_eq!(mock.open_session_count(), 0);
    }

    #[test]
    fn test_default_collection_cannot_be_deleted() {
        let (_mock, mut collection) = facade();
        assert!(collection.is_default());
        assert!(collection.delete().unwrap_err().is_access_denied());
    }
}
