//! Collection and item operations
//!
//! [`CollectionClient`] owns the transport session, the prompt coordinator and
//! the unlock state machine of one collection, and runs every item operation
//! through them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, info, instrument, warn};
use zeroize::Zeroize;

use super::prompt::{OperationOutcome, PromptCoordinator, Resolution};
use super::transport::TransportEncryption;
use super::unlock::{ConsentFlag, LockState, UnlockMethod, UnlockStateMachine};
use crate::bus::{
    Attributes, BusSignal, DEFAULT_COLLECTION, ItemProperties, ObjectPath, SecretServiceBus,
    SignalCursor,
};
use crate::config::ClientSettings;
use crate::error::{BusError, SecretError, SecretResult};
use crate::trace_operation;
use crate::tracing::span_names;

/// Identifiers of the collections the service provides by default
pub const DEFAULT_COLLECTION_IDS: [&str; 3] = ["login", "session", "default"];

/// Returns true if `path` names one of the service's default collections
///
/// A path without an identifier (the root path) counts as default.
#[must_use]
pub fn is_default_collection(path: &ObjectPath) -> bool {
    path.id()
        .is_none_or(|id| DEFAULT_COLLECTION_IDS.contains(&id))
}

/// Finds the collection carrying `label`
///
/// # Errors
/// Returns `SecretError::Bus` if the collections cannot be listed.
pub fn find_collection(bus: &dyn SecretServiceBus, label: &str) -> SecretResult<Option<ObjectPath>> {
    for path in bus.collections()? {
        match bus.collection_label(&path) {
            Ok(l) if l == label => return Ok(Some(path)),
            Ok(_) => {}
            Err(e) => warn!(collection = %path, error = %e, "Failed to read collection label"),
        }
    }
    Ok(None)
}

/// Maps a missing object to an absent result
fn absent_if_missing<T>(result: Result<T, BusError>) -> SecretResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(BusError::NoSuchObject(path)) => {
            debug!(path = %path, "Object no longer exists");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Client for one collection of the secret service
pub struct CollectionClient {
    bus: Arc<dyn SecretServiceBus>,
    transport: TransportEncryption,
    prompts: PromptCoordinator,
    unlock: UnlockStateMachine,
    path: ObjectPath,
    settings: ClientSettings,
    closed: bool,
}

impl CollectionClient {
    /// Opens the default collection
    ///
    /// # Errors
    /// Returns `SecretError::HandshakeFailed` if the transport cannot be
    /// negotiated.
    pub fn default_collection(
        bus: Arc<dyn SecretServiceBus>,
        settings: &ClientSettings,
    ) -> SecretResult<Self> {
        let transport = negotiate(&bus, settings)?;
        Ok(Self::assemble(
            bus,
            settings,
            transport,
            ObjectPath::from(DEFAULT_COLLECTION),
            UnlockMethod::Interactive,
        ))
    }

    /// Opens the collection labelled `label`, never creating it
    ///
    /// # Errors
    /// Returns `SecretError::NotFound` if no collection carries the label.
    pub fn open(
        bus: Arc<dyn SecretServiceBus>,
        settings: &ClientSettings,
        label: &str,
    ) -> SecretResult<Self> {
        let mut transport = negotiate(&bus, settings)?;
        match find_collection(bus.as_ref(), label) {
            Ok(Some(path)) => Ok(Self::assemble(
                bus,
                settings,
                transport,
                path,
                UnlockMethod::Interactive,
            )),
            Ok(None) => {
                transport.close();
                Err(SecretError::NotFound(format!("No collection labelled '{label}'")))
            }
            Err(e) => {
                transport.close();
                Err(e)
            }
        }
    }

    /// Opens the collection labelled `label`, creating it if needed
    ///
    /// With a master password the collection is created and later unlocked
    /// without prompting the user.
    ///
    /// # Errors
    /// Returns `SecretError::Validation` for an empty label,
    /// `SecretError::AccessDenied` if the user dismisses the creation prompt,
    /// and `SecretError::ServiceUnavailable` if the new collection cannot be
    /// confirmed.
    pub fn create_or_open(
        bus: Arc<dyn SecretServiceBus>,
        settings: &ClientSettings,
        label: &str,
        master_password: Option<&SecretString>,
    ) -> SecretResult<Self> {
        if label.is_empty() {
            return Err(SecretError::Validation(
                "The label of the collection may not be empty".to_string(),
            ));
        }

        let mut transport = negotiate(&bus, settings)?;
        match locate_or_create(&bus, settings, &transport, label, master_password) {
            Ok((path, method)) => Ok(Self::assemble(bus, settings, transport, path, method)),
            Err(e) => {
                transport.close();
                Err(e)
            }
        }
    }

    fn assemble(
        bus: Arc<dyn SecretServiceBus>,
        settings: &ClientSettings,
        transport: TransportEncryption,
        path: ObjectPath,
        method: UnlockMethod,
    ) -> Self {
        let prompts = PromptCoordinator::new(Arc::clone(&bus), settings.window_id.clone());
        let unlock = UnlockStateMachine::new(
            Arc::clone(&bus),
            prompts.clone(),
            path.clone(),
            method,
            settings.settle_delay,
        );
        debug!(collection = %path, "Collection client ready");
        Self {
            bus,
            transport,
            prompts,
            unlock,
            path,
            settings: settings.clone(),
            closed: false,
        }
    }

    /// Object path of the collection
    #[must_use]
    pub const fn path(&self) -> &ObjectPath {
        &self.path
    }

    /// Whether this is one of the service's default collections
    #[must_use]
    pub fn is_default(&self) -> bool {
        is_default_collection(&self.path)
    }

    /// Label of the collection
    ///
    /// # Errors
    /// Returns `SecretError::Bus` if the label cannot be read.
    pub fn label(&self) -> SecretResult<String> {
        Ok(self.bus.collection_label(&self.path)?)
    }

    /// Current lock state as reported by the service
    ///
    /// # Errors
    /// Returns `SecretError::Bus` if the state cannot be read.
    pub fn lock_state(&mut self) -> SecretResult<LockState> {
        self.unlock.refresh()
    }

    /// Consent recorded for this client
    #[must_use]
    pub const fn consent(&self) -> ConsentFlag {
        self.unlock.consent()
    }

    /// Prompt timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.settings.prompt_timeout
    }

    /// Changes the prompt timeout of this client
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.settings.prompt_timeout = timeout;
    }

    /// The transport of this client
    #[must_use]
    pub const fn transport(&self) -> &TransportEncryption {
        &self.transport
    }

    /// Locks the collection
    ///
    /// # Errors
    /// Returns `SecretError::Bus` if a remote call fails.
    pub fn lock(&mut self) -> SecretResult<()> {
        self.unlock.lock(self.settings.prompt_timeout)
    }

    /// Asks the user to unlock the collection explicitly
    ///
    /// # Errors
    /// Returns `SecretError::AccessDenied` if the collection stays locked.
    pub fn unlock_with_user_permission(&mut self) -> SecretResult<()> {
        self.unlock
            .unlock_with_user_permission(self.settings.prompt_timeout)
    }

    fn ensure_unlocked(&mut self) -> SecretResult<bool> {
        let unlocked = self.unlock.ensure_unlocked(self.settings.prompt_timeout)?;
        if !unlocked {
            info!(collection = %self.path, "Collection is locked; skipping operation");
        }
        Ok(unlocked)
    }

    /// Creates an item
    ///
    /// Returns the path of the new item, or `None` if the user dismissed a
    /// prompt or the creation could not be confirmed.
    ///
    /// # Errors
    /// Returns `SecretError::Validation` for an empty label or password.
    #[instrument(skip(self, password, attributes), fields(collection = %self.path))]
    pub fn create_item(
        &mut self,
        label: &str,
        password: &str,
        attributes: Option<&Attributes>,
    ) -> SecretResult<Option<ObjectPath>> {
        if password.is_empty() {
            return Err(SecretError::Validation(
                "The password may not be empty".to_string(),
            ));
        }
        if label.is_empty() {
            return Err(SecretError::Validation(
                "The label of the password may not be empty".to_string(),
            ));
        }

        if !self.ensure_unlocked()? {
            return Ok(None);
        }

        let span = trace_operation!(span_names::ITEM_CREATE);
        let _guard = span.enter();

        let properties = ItemProperties::new(label, attributes);
        let secret = self.transport.encrypt(password.as_bytes())?;

        let cursor = self.bus.signals().cursor();
        let (item, prompt) = self
            .bus
            .create_item(&self.path, &properties, &secret, false)?;
        drop(secret);

        let resolution = self.prompts.resolve(
            OperationOutcome::from_reply(item, prompt),
            self.settings.prompt_timeout,
        )?;
        match resolution {
            Resolution::Path(item) => {
                debug!(item = %item, "Item created");
                Ok(Some(item))
            }
            Resolution::Dismissed => {
                info!("Item creation was dismissed");
                Ok(None)
            }
            Resolution::NoPath => {
                let item = self.wait_for_item_created(cursor);
                if item.is_none() {
                    warn!("Could not confirm the created item");
                }
                Ok(item)
            }
        }
    }

    fn wait_for_item_created(&self, cursor: SignalCursor) -> Option<ObjectPath> {
        // A service may emit the signal from the collection's own path while
        // this handle holds an alias, so membership decides
        let signal = self.bus.signals().wait_confirmed(
            cursor,
            self.settings.notification_wait,
            |signal| matches!(signal, BusSignal::ItemCreated { .. }),
            |signal| match signal {
                BusSignal::ItemCreated { collection, item } => {
                    *collection == self.path
                        || self
                            .bus
                            .collection_items(&self.path)
                            .is_ok_and(|items| items.contains(item))
                }
                _ => false,
            },
        );
        match signal {
            Some(BusSignal::ItemCreated { item, .. }) => Some(item),
            _ => None,
        }
    }

    /// Updates the given parts of an item, leaving the others unchanged
    ///
    /// Returns false if the collection stayed locked or the item does not
    /// exist.
    ///
    /// # Errors
    /// Returns `SecretError::Bus` if an update fails for another reason.
    #[instrument(skip(self, attributes, password), fields(item = %item))]
    pub fn update_item(
        &mut self,
        item: &ObjectPath,
        label: Option<&str>,
        attributes: Option<&Attributes>,
        password: Option<&str>,
    ) -> SecretResult<bool> {
        if !self.ensure_unlocked()? {
            return Ok(false);
        }

        if let Some(label) = label {
            if absent_if_missing(self.bus.set_item_label(item, label))?.is_none() {
                return Ok(false);
            }
        }

        if let Some(attributes) = attributes {
            if absent_if_missing(self.bus.set_item_attributes(item, attributes))?.is_none() {
                return Ok(false);
            }
        }

        if let Some(password) = password {
            let secret = self.transport.encrypt(password.as_bytes())?;
            if absent_if_missing(self.bus.set_secret(item, &secret))?.is_none() {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Label of an item, `None` if it does not exist
    ///
    /// # Errors
    /// Returns `SecretError::Bus` if the label cannot be read.
    pub fn get_label(&mut self, item: &ObjectPath) -> SecretResult<Option<String>> {
        if !self.ensure_unlocked()? {
            return Ok(None);
        }
        absent_if_missing(self.bus.item_label(item))
    }

    /// Attributes of an item, `None` if it does not exist
    ///
    /// # Errors
    /// Returns `SecretError::Bus` if the attributes cannot be read.
    pub fn get_attributes(&mut self, item: &ObjectPath) -> SecretResult<Option<Attributes>> {
        if !self.ensure_unlocked()? {
            return Ok(None);
        }
        absent_if_missing(self.bus.item_attributes(item))
    }

    /// Items whose attributes contain all of `attributes`
    ///
    /// Returns `None` for an empty query or when nothing matches.
    ///
    /// # Errors
    /// Returns `SecretError::Bus` if the search fails.
    pub fn get_items(&mut self, attributes: &Attributes) -> SecretResult<Option<Vec<ObjectPath>>> {
        if attributes.is_empty() || !self.ensure_unlocked()? {
            return Ok(None);
        }

        let found = self.bus.search_items(&self.path, attributes)?;
        debug!(count = found.len(), "Searched items");
        Ok(if found.is_empty() { None } else { Some(found) })
    }

    /// Every item in the collection
    ///
    /// # Errors
    /// Returns `SecretError::Bus` if the items cannot be listed.
    pub fn items(&self) -> SecretResult<Vec<ObjectPath>> {
        Ok(self.bus.collection_items(&self.path)?)
    }

    /// Decrypted secret of an item
    ///
    /// Returns `None` if the item does not exist, the collection stayed
    /// locked, or the secret cannot be decrypted.
    ///
    /// # Errors
    /// Returns `SecretError::Bus` if the secret cannot be fetched.
    pub fn get_secret(&mut self, item: &ObjectPath) -> SecretResult<Option<SecretString>> {
        if !self.ensure_unlocked()? {
            return Ok(None);
        }
        self.fetch_secret(item)
    }

    fn fetch_secret(&self, item: &ObjectPath) -> SecretResult<Option<SecretString>> {
        let session = match self.transport.session() {
            Some(session) => session.path().clone(),
            None => {
                error!(item = %item, "No open session to fetch the secret with");
                return Ok(None);
            }
        };

        let Some(secret) = absent_if_missing(self.bus.get_secret(item, &session))? else {
            return Ok(None);
        };

        let plaintext = match self.transport.decrypt(&secret) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                error!(item = %item, error = %e, "Failed to decrypt secret");
                return Ok(None);
            }
        };

        match String::from_utf8(plaintext.to_vec()) {
            Ok(text) => Ok(Some(SecretString::from(text))),
            Err(e) => {
                e.into_bytes().zeroize();
                error!(item = %item, "Secret is not valid UTF-8");
                Ok(None)
            }
        }
    }

    /// Decrypted secrets of every item, keyed by item path
    ///
    /// Requires the user's permission. Items whose secret cannot be fetched
    /// are left out.
    ///
    /// # Errors
    /// Returns `SecretError::AccessDenied` if the user does not unlock the
    /// collection.
    #[instrument(skip(self), fields(collection = %self.path))]
    pub fn get_secrets(&mut self) -> SecretResult<HashMap<ObjectPath, SecretString>> {
        self.unlock_with_user_permission()?;

        let mut secrets = HashMap::new();
        for item in self.items()? {
            match self.fetch_secret(&item) {
                Ok(Some(secret)) => {
                    secrets.insert(item, secret);
                }
                Ok(None) => {}
                Err(e) => warn!(item = %item, error = %e, "Skipping item"),
            }
        }
        Ok(secrets)
    }

    /// Deletes an item
    ///
    /// Requires the user's permission. Returns false if the user dismissed
    /// the deletion or the item does not exist.
    ///
    /// # Errors
    /// Returns `SecretError::AccessDenied` if the user does not unlock the
    /// collection.
    pub fn delete_item(&mut self, item: &ObjectPath) -> SecretResult<bool> {
        self.unlock_with_user_permission()?;
        self.remove(item)
    }

    /// Deletes items in order, stopping at the first failure
    ///
    /// Returns how many items were deleted.
    ///
    /// # Errors
    /// Returns `SecretError::AccessDenied` if the user does not unlock the
    /// collection, or the first error raised by a deletion.
    pub fn delete_items(&mut self, items: &[ObjectPath]) -> SecretResult<usize> {
        self.unlock_with_user_permission()?;

        let mut deleted = 0;
        for item in items {
            if self.remove(item)? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    fn remove(&self, object: &ObjectPath) -> SecretResult<bool> {
        let span = trace_operation!(span_names::DELETE, object = %object);
        let _guard = span.enter();

        let Some(prompt) = absent_if_missing(self.bus.delete(object))? else {
            return Ok(false);
        };
        let resolution = self.prompts.resolve(
            OperationOutcome::from_prompt(prompt),
            self.settings.prompt_timeout,
        )?;
        if resolution.is_dismissed() {
            info!("Deletion was dismissed");
            return Ok(false);
        }
        debug!("Deleted");
        Ok(true)
    }

    /// Deletes the collection itself
    ///
    /// Returns false if the user dismissed the deletion.
    ///
    /// # Errors
    /// Returns `SecretError::AccessDenied` for a default collection.
    pub fn delete(&mut self) -> SecretResult<bool> {
        if self.is_default() {
            return Err(SecretError::AccessDenied(
                "Default collections may not be deleted".to_string(),
            ));
        }
        self.remove(&self.path)
    }

    /// Wipes the session key and the master password
    pub fn clear(&mut self) {
        self.transport.clear();
        self.unlock.clear();
    }

    /// Clears key material and closes the session
    pub fn close(&mut self) {
        self.clear();
        if !self.closed {
            self.transport.close();
            self.closed = true;
            debug!(collection = %self.path, "Collection client closed");
        }
    }

    /// Whether [`close`](Self::close) was called
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }
}

impl std::fmt::Debug for CollectionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionClient")
            .field("path", &self.path)
            .field("transport", &self.transport)
            .field("unlock", &self.unlock)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

fn negotiate(
    bus: &Arc<dyn SecretServiceBus>,
    settings: &ClientSettings,
) -> SecretResult<TransportEncryption> {
    let mut transport = TransportEncryption::new(Arc::clone(bus), settings.algorithm);
    transport.establish()?;
    Ok(transport)
}

fn locate_or_create(
    bus: &Arc<dyn SecretServiceBus>,
    settings: &ClientSettings,
    transport: &TransportEncryption,
    label: &str,
    master_password: Option<&SecretString>,
) -> SecretResult<(ObjectPath, UnlockMethod)> {
    let method = match master_password {
        Some(password) => {
            UnlockMethod::MasterPassword(transport.encrypt(password.expose_secret().as_bytes())?)
        }
        None => UnlockMethod::Interactive,
    };

    if let Some(path) = find_collection(bus.as_ref(), label)? {
        debug!(collection = %path, label = %label, "Opened existing collection");
        return Ok((path, method));
    }

    let span = trace_operation!(span_names::COLLECTION_CREATE, label = %label);
    let _guard = span.enter();

    let cursor = bus.signals().cursor();
    let resolution = match &method {
        UnlockMethod::MasterPassword(master) => {
            let path = bus.create_with_master_password(label, master)?;
            if path.is_root() {
                Resolution::NoPath
            } else {
                Resolution::Path(path)
            }
        }
        UnlockMethod::Interactive => {
            let (collection, prompt) = bus.create_collection(label)?;
            PromptCoordinator::new(Arc::clone(bus), settings.window_id.clone()).resolve(
                OperationOutcome::from_reply(collection, prompt),
                settings.prompt_timeout,
            )?
        }
    };

    let path = match resolution {
        Resolution::Path(path) => path,
        Resolution::Dismissed => {
            return Err(SecretError::AccessDenied(format!(
                "Creation of collection '{label}' was dismissed"
            )));
        }
        Resolution::NoPath => {
            let confirmed =
                wait_for_collection_created(bus.as_ref(), cursor, label, settings.notification_wait);
            confirmed.ok_or_else(|| {
                error!(label = %label, "No confirmation for the created collection");
                SecretError::ServiceUnavailable(
                    "Could not communicate properly with the secret service".to_string(),
                )
            })?
        }
    };

    info!(collection = %path, label = %label, "Created collection");
    Ok((path, method))
}

fn wait_for_collection_created(
    bus: &dyn SecretServiceBus,
    cursor: SignalCursor,
    label: &str,
    wait: Duration,
) -> Option<ObjectPath> {
    let signal = bus.signals().wait_confirmed(
        cursor,
        wait,
        |signal| matches!(signal, BusSignal::CollectionCreated { .. }),
        |signal| match signal {
            BusSignal::CollectionCreated { collection } => bus
                .collection_label(collection)
                .is_ok_and(|l| l == label),
            _ => false,
        },
    );
    match signal {
        Some(BusSignal::CollectionCreated { collection }) => Some(collection),
        _ => None,
    }
}
