//! In-memory secret service for tests and offline use.
//!
//! [`MockSecretService`] implements [`SecretServiceBus`] without a message
//! bus. It runs the service side of the transport handshake for real, so
//! secrets cross the boundary encrypted exactly as they would on D-Bus.
//!
//! Prompts complete synchronously inside [`SecretServiceBus::prompt`]
//! according to the configured [`PromptResponse`]. Knobs let a test force the
//! less common service behaviours: creation prompts that do not report the
//! created path, algorithms the service refuses, an unreachable service.
//!
//! ```
//! use std::sync::Arc;
//! use simplesecret_core::bus::BusContext;
//! use simplesecret_core::testing::MockSecretService;
//!
//! let mock = Arc::new(MockSecretService::new());
//! let context = BusContext::new(mock.clone());
//! assert!(context.is_available());
//! assert_eq!(mock.collection_count(), 1);
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};

use parking_lot::Mutex;
use ring::rand::{SecureRandom, SystemRandom};
use tracing::trace;
use zeroize::Zeroizing;

use crate::bus::{
    Attributes, BusSignal, DEFAULT_COLLECTION, ItemProperties, ObjectPath, SECRETS_PATH,
    SecretServiceBus, SignalHub,
};
use crate::error::{BusError, BusResult};
use crate::secret::dh::{AES_KEY_LEN, KeyPair};
use crate::secret::{AES_BLOCK_LEN, ALGORITHM_DH, ALGORITHM_PLAIN, Secret, aes_cbc_decrypt, aes_cbc_encrypt};

/// Label of the collection behind the default alias
pub const DEFAULT_COLLECTION_LABEL: &str = "Login";

/// Attribute the service adds to items stored without one
pub const SCHEMA_ATTRIBUTE: &str = "xdg:schema";

/// Schema recorded for items stored without one
pub const GENERIC_SCHEMA: &str = "org.freedesktop.Secret.Generic";

/// How the simulated user answers prompts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PromptResponse {
    /// Perform the prompted action
    #[default]
    Accept,
    /// Dismiss the prompt
    Dismiss,
    /// Never answer; the completion signal is not sent
    Ignore,
}

enum SessionKey {
    Aes(Zeroizing<[u8; AES_KEY_LEN]>),
    Plain,
}

struct MockItem {
    label: String,
    attributes: Attributes,
    value: Zeroizing<Vec<u8>>,
}

struct MockCollection {
    label: String,
    locked: bool,
    master: Option<Zeroizing<Vec<u8>>>,
    items: BTreeMap<u64, MockItem>,
    next_item: u64,
}

impl MockCollection {
    fn new(label: &str, master: Option<Zeroizing<Vec<u8>>>) -> Self {
        Self {
            label: label.to_string(),
            locked: false,
            master,
            items: BTreeMap::new(),
            next_item: 1,
        }
    }
}

enum PendingAction {
    Unlock(Vec<ObjectPath>),
    CreateCollection(String),
    CreateItem {
        collection: ObjectPath,
        properties: ItemProperties,
        value: Zeroizing<Vec<u8>>,
        replace: bool,
    },
    Delete(ObjectPath),
}

struct MockState {
    available: bool,
    rejected: HashSet<String>,
    response: PromptResponse,
    prompt_on_create_collection: bool,
    prompt_on_create_item: bool,
    prompt_on_delete: bool,
    report_created_path: bool,
    signal_sources: HashMap<ObjectPath, ObjectPath>,
    collections: BTreeMap<ObjectPath, MockCollection>,
    sessions: HashMap<ObjectPath, SessionKey>,
    prompts: HashMap<ObjectPath, PendingAction>,
    next_session: u64,
    next_prompt: u64,
    lock_count: usize,
    unlock_count: usize,
    prompt_count: usize,
}

impl Default for MockState {
    fn default() -> Self {
        let mut collections = BTreeMap::new();
        collections.insert(
            ObjectPath::from(DEFAULT_COLLECTION),
            MockCollection::new(DEFAULT_COLLECTION_LABEL, None),
        );
        Self {
            available: true,
            rejected: HashSet::new(),
            response: PromptResponse::Accept,
            prompt_on_create_collection: true,
            prompt_on_create_item: false,
            prompt_on_delete: false,
            report_created_path: true,
            signal_sources: HashMap::new(),
            collections,
            sessions: HashMap::new(),
            prompts: HashMap::new(),
            next_session: 1,
            next_prompt: 1,
            lock_count: 0,
            unlock_count: 0,
            prompt_count: 0,
        }
    }
}

fn missing(path: &ObjectPath) -> BusError {
    BusError::NoSuchObject(path.to_string())
}

/// Splits an item path into its collection path and item number
fn split_item(item: &ObjectPath) -> Option<(ObjectPath, u64)> {
    let (parent, id) = item.as_str().rsplit_once('/')?;
    let id = id.parse().ok()?;
    Some((ObjectPath::from(parent), id))
}

impl MockState {
    /// Path a collection's own signals are emitted from
    fn signal_source(&self, collection: &ObjectPath) -> ObjectPath {
        self.signal_sources
            .get(collection)
            .unwrap_or(collection)
            .clone()
    }

    fn collection(&self, path: &ObjectPath) -> BusResult<&MockCollection> {
        self.collections.get(path).ok_or_else(|| missing(path))
    }

    fn collection_mut(&mut self, path: &ObjectPath) -> BusResult<&mut MockCollection> {
        self.collections.get_mut(path).ok_or_else(|| missing(path))
    }

    fn item(&self, item: &ObjectPath) -> BusResult<(&MockCollection, &MockItem)> {
        let (parent, id) = split_item(item).ok_or_else(|| missing(item))?;
        let collection = self.collections.get(&parent).ok_or_else(|| missing(item))?;
        let entry = collection.items.get(&id).ok_or_else(|| missing(item))?;
        Ok((collection, entry))
    }

    /// Mutable access to an item of an unlocked collection
    fn unlocked_item_mut(&mut self, item: &ObjectPath) -> BusResult<&mut MockItem> {
        let (parent, id) = split_item(item).ok_or_else(|| missing(item))?;
        let collection = self.collections.get_mut(&parent).ok_or_else(|| missing(item))?;
        if collection.locked {
            return Err(BusError::IsLocked(item.to_string()));
        }
        collection.items.get_mut(&id).ok_or_else(|| missing(item))
    }

    fn open_secret(&self, secret: &Secret) -> BusResult<Zeroizing<Vec<u8>>> {
        let key = self
            .sessions
            .get(secret.session())
            .ok_or_else(|| missing(secret.session()))?;
        match key {
            SessionKey::Plain => Ok(Zeroizing::new(secret.value().to_vec())),
            SessionKey::Aes(key) => aes_cbc_decrypt(key, secret.parameters(), secret.value())
                .map_err(|e| BusError::call("Secret", e.to_string())),
        }
    }

    fn seal(&self, rng: &SystemRandom, session: &ObjectPath, plaintext: &[u8]) -> BusResult<Secret> {
        let key = self.sessions.get(session).ok_or_else(|| missing(session))?;
        match key {
            SessionKey::Plain => Ok(Secret::new(session.clone(), Vec::new(), plaintext.to_vec())),
            SessionKey::Aes(key) => {
                let mut iv = [0u8; AES_BLOCK_LEN];
                rng.fill(&mut iv)
                    .map_err(|_| BusError::call("GetSecret", "IV generation failed"))?;
                let value = aes_cbc_encrypt(key, &iv, plaintext)
                    .map_err(|e| BusError::call("GetSecret", e.to_string()))?;
                Ok(Secret::new(session.clone(), iv.to_vec(), value))
            }
        }
    }

    fn insert_collection(&mut self, label: &str, master: Option<Zeroizing<Vec<u8>>>) -> ObjectPath {
        let stem: String = label
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        let base = ObjectPath::from(SECRETS_PATH).child("collection");
        let mut path = base.child(&stem);
        let mut suffix = 1;
        while self.collections.contains_key(&path) {
            suffix += 1;
            path = base.child(&format!("{stem}{suffix}"));
        }
        self.collections
            .insert(path.clone(), MockCollection::new(label, master));
        path
    }

    fn insert_item(
        &mut self,
        collection: &ObjectPath,
        properties: ItemProperties,
        value: Zeroizing<Vec<u8>>,
        replace: bool,
    ) -> BusResult<ObjectPath> {
        let target = self.collection_mut(collection)?;
        if target.locked {
            return Err(BusError::IsLocked(collection.to_string()));
        }

        let mut attributes = properties.attributes;
        attributes
            .entry(SCHEMA_ATTRIBUTE.to_string())
            .or_insert_with(|| GENERIC_SCHEMA.to_string());

        let existing = if replace {
            target
                .items
                .iter()
                .find(|(_, item)| item.attributes == attributes)
                .map(|(id, _)| *id)
        } else {
            None
        };
        let id = existing.unwrap_or_else(|| {
            let id = target.next_item;
            target.next_item += 1;
            id
        });

        target.items.insert(
            id,
            MockItem {
                label: properties.label,
                attributes,
                value,
            },
        );
        Ok(collection.child(&id.to_string()))
    }

    fn remove(&mut self, object: &ObjectPath) -> BusResult<()> {
        if self.collections.remove(object).is_some() {
            return Ok(());
        }
        let (parent, id) = split_item(object).ok_or_else(|| missing(object))?;
        let collection = self.collection_mut(&parent)?;
        if collection.locked {
            return Err(BusError::IsLocked(object.to_string()));
        }
        collection
            .items
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| missing(object))
    }

    fn new_prompt(&mut self, action: PendingAction) -> ObjectPath {
        let path = ObjectPath::from(SECRETS_PATH)
            .child("prompt")
            .child(&format!("p{}", self.next_prompt));
        self.next_prompt += 1;
        self.prompts.insert(path.clone(), action);
        path
    }

    /// Performs an accepted action, returning the result paths and the
    /// signals it caused
    fn perform(&mut self, action: PendingAction) -> BusResult<(Vec<ObjectPath>, Vec<BusSignal>)> {
        match action {
            PendingAction::Unlock(objects) => {
                for object in &objects {
                    self.collection_mut(object)?.locked = false;
                }
                Ok((objects, Vec::new()))
            }
            PendingAction::CreateCollection(label) => {
                let collection = self.insert_collection(&label, None);
                let signal = BusSignal::CollectionCreated {
                    collection: collection.clone(),
                };
                Ok((vec![collection], vec![signal]))
            }
            PendingAction::CreateItem {
                collection,
                properties,
                value,
                replace,
            } => {
                let item = self.insert_item(&collection, properties, value, replace)?;
                let signal = BusSignal::ItemCreated {
                    collection: self.signal_source(&collection),
                    item: item.clone(),
                };
                Ok((vec![item], vec![signal]))
            }
            PendingAction::Delete(object) => {
                self.remove(&object)?;
                Ok((Vec::new(), Vec::new()))
            }
        }
    }
}

/// Secret service held entirely in memory
///
/// Starts with one unlocked default collection labelled
/// [`DEFAULT_COLLECTION_LABEL`] at the default alias path.
pub struct MockSecretService {
    state: Mutex<MockState>,
    hub: SignalHub,
    rng: SystemRandom,
}

impl Default for MockSecretService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSecretService {
    /// Creates a service with just the default collection
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            hub: SignalHub::new(),
            rng: SystemRandom::new(),
        }
    }

    /// Sets how future prompts are answered
    pub fn set_prompt_response(&self, response: PromptResponse) {
        self.state.lock().response = response;
    }

    /// Makes the service unreachable (`false`) or reachable again
    pub fn set_available(&self, available: bool) {
        self.state.lock().available = available;
    }

    /// Refuses sessions using `algorithm`
    pub fn reject_algorithm(&self, algorithm: &str) {
        self.state.lock().rejected.insert(algorithm.to_string());
    }

    /// Whether `CreateCollection` asks for a prompt (the default) or creates
    /// the collection right away
    pub fn set_prompt_on_create_collection(&self, prompt: bool) {
        self.state.lock().prompt_on_create_collection = prompt;
    }

    /// Whether `CreateItem` asks for a prompt; off by default
    pub fn set_prompt_on_create_item(&self, prompt: bool) {
        self.state.lock().prompt_on_create_item = prompt;
    }

    /// Whether `Delete` asks for a prompt; off by default
    pub fn set_prompt_on_delete(&self, prompt: bool) {
        self.state.lock().prompt_on_delete = prompt;
    }

    /// Whether completed creation prompts carry the created path
    ///
    /// When off, only the `CollectionCreated`/`ItemCreated` signal tells the
    /// client what was created.
    pub fn set_report_created_path(&self, report: bool) {
        self.state.lock().report_created_path = report;
    }

    /// Emits the signals of `collection` from `source` instead
    ///
    /// A real service stores the default collection under its own object
    /// path and emits `ItemCreated` from there, not from the alias.
    pub fn set_signal_source(&self, collection: &str, source: &str) {
        self.state
            .lock()
            .signal_sources
            .insert(ObjectPath::from(collection), ObjectPath::from(source));
    }

    /// Locks or unlocks a collection directly, bypassing prompts
    pub fn set_locked(&self, collection: &str, locked: bool) {
        if let Some(entry) = self
            .state
            .lock()
            .collections
            .get_mut(&ObjectPath::from(collection))
        {
            entry.locked = locked;
        }
    }

    /// Adds a collection directly, without prompting or signalling
    pub fn add_collection(&self, label: &str) -> ObjectPath {
        self.state.lock().insert_collection(label, None)
    }

    /// Number of collections
    #[must_use]
    pub fn collection_count(&self) -> usize {
        self.state.lock().collections.len()
    }

    /// Number of items in `collection`, zero if it does not exist
    #[must_use]
    pub fn item_count(&self, collection: &str) -> usize {
        self.state
            .lock()
            .collections
            .get(&ObjectPath::from(collection))
            .map_or(0, |c| c.items.len())
    }

    /// Plaintext stored for `item`, as the service sees it
    #[must_use]
    pub fn stored_secret(&self, item: &str) -> Option<Vec<u8>> {
        let state = self.state.lock();
        state
            .item(&ObjectPath::from(item))
            .ok()
            .map(|(_, entry)| entry.value.to_vec())
    }

    /// Whether `collection` is locked; `None` if it does not exist
    #[must_use]
    pub fn locked(&self, collection: &str) -> Option<bool> {
        self.state
            .lock()
            .collections
            .get(&ObjectPath::from(collection))
            .map(|c| c.locked)
    }

    /// Number of `Lock` calls
    #[must_use]
    pub fn lock_count(&self) -> usize {
        self.state.lock().lock_count
    }

    /// Number of `Unlock` and master password unlock calls
    #[must_use]
    pub fn unlock_count(&self) -> usize {
        self.state.lock().unlock_count
    }

    /// Number of prompts shown
    #[must_use]
    pub fn prompt_count(&self) -> usize {
        self.state.lock().prompt_count
    }

    /// Number of sessions currently open
    #[must_use]
    pub fn open_session_count(&self) -> usize {
        self.state.lock().sessions.len()
    }

    fn publish_all(&self, signals: Vec<BusSignal>) {
        for signal in signals {
            trace!(?signal, "Mock service signal");
            self.hub.publish(signal);
        }
    }
}

impl std::fmt::Debug for MockSecretService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MockSecretService")
            .field("collections", &state.collections.len())
            .field("sessions", &state.sessions.len())
            .field("response", &state.response)
            .finish_non_exhaustive()
    }
}

impl SecretServiceBus for MockSecretService {
    fn ping(&self) -> BusResult<()> {
        if self.state.lock().available {
            Ok(())
        } else {
            Err(BusError::Disconnected(
                "org.freedesktop.secrets is not running".to_string(),
            ))
        }
    }

    fn open_session(&self, algorithm: &str, input: &[u8]) -> BusResult<(Vec<u8>, ObjectPath)> {
        let mut state = self.state.lock();
        if state.rejected.contains(algorithm) {
            return Err(BusError::NotSupported(algorithm.to_string()));
        }

        let (output, key) = match algorithm {
            ALGORITHM_PLAIN => (Vec::new(), SessionKey::Plain),
            ALGORITHM_DH => {
                let pair = KeyPair::generate(&self.rng)
                    .map_err(|e| BusError::call("OpenSession", e.to_string()))?;
                let key = pair
                    .derive_aes_key(input)
                    .map_err(|e| BusError::call("OpenSession", e.to_string()))?;
                (pair.public_key().to_vec(), SessionKey::Aes(key))
            }
            other => return Err(BusError::NotSupported(other.to_string())),
        };

        let path = ObjectPath::from(SECRETS_PATH)
            .child("session")
            .child(&format!("s{}", state.next_session));
        state.next_session += 1;
        state.sessions.insert(path.clone(), key);
        Ok((output, path))
    }

    fn close_session(&self, session: &ObjectPath) -> BusResult<()> {
        self.state
            .lock()
            .sessions
            .remove(session)
            .map(|_| ())
            .ok_or_else(|| missing(session))
    }

    fn collections(&self) -> BusResult<Vec<ObjectPath>> {
        Ok(self.state.lock().collections.keys().cloned().collect())
    }

    fn create_collection(&self, label: &str) -> BusResult<(ObjectPath, ObjectPath)> {
        let mut state = self.state.lock();
        if state.prompt_on_create_collection {
            let prompt = state.new_prompt(PendingAction::CreateCollection(label.to_string()));
            return Ok((ObjectPath::root(), prompt));
        }

        let collection = state.insert_collection(label, None);
        drop(state);
        self.publish_all(vec![BusSignal::CollectionCreated {
            collection: collection.clone(),
        }]);
        Ok((collection, ObjectPath::root()))
    }

    fn create_with_master_password(&self, label: &str, master: &Secret) -> BusResult<ObjectPath> {
        let mut state = self.state.lock();
        let password = state.open_secret(master)?;
        let collection = state.insert_collection(label, Some(password));
        drop(state);
        self.publish_all(vec![BusSignal::CollectionCreated {
            collection: collection.clone(),
        }]);
        Ok(collection)
    }

    fn unlock_with_master_password(
        &self,
        collection: &ObjectPath,
        master: &Secret,
    ) -> BusResult<()> {
        let mut state = self.state.lock();
        state.unlock_count += 1;
        let password = state.open_secret(master)?;
        let target = state.collection_mut(collection)?;
        match &target.master {
            Some(expected) if expected.as_slice() == password.as_slice() => {
                target.locked = false;
                Ok(())
            }
            _ => Err(BusError::call(
                "UnlockWithMasterPassword",
                "The password was invalid",
            )),
        }
    }

    fn lock(&self, objects: &[ObjectPath]) -> BusResult<(Vec<ObjectPath>, ObjectPath)> {
        let mut state = self.state.lock();
        state.lock_count += 1;
        for object in objects {
            state.collection_mut(object)?.locked = true;
        }
        Ok((objects.to_vec(), ObjectPath::root()))
    }

    fn unlock(&self, objects: &[ObjectPath]) -> BusResult<(Vec<ObjectPath>, ObjectPath)> {
        let mut state = self.state.lock();
        state.unlock_count += 1;

        let mut unlocked = Vec::new();
        let mut pending = Vec::new();
        for object in objects {
            if state.collection(object)?.locked {
                pending.push(object.clone());
            } else {
                unlocked.push(object.clone());
            }
        }

        let prompt = if pending.is_empty() {
            ObjectPath::root()
        } else {
            state.new_prompt(PendingAction::Unlock(pending))
        };
        Ok((unlocked, prompt))
    }

    fn prompt(&self, prompt: &ObjectPath, _window_id: &str) -> BusResult<()> {
        let mut state = self.state.lock();
        let action = state.prompts.remove(prompt).ok_or_else(|| missing(prompt))?;
        state.prompt_count += 1;

        let (mut signals, completed) = match state.response {
            PromptResponse::Ignore => return Ok(()),
            PromptResponse::Dismiss => (Vec::new(), (true, Vec::new())),
            PromptResponse::Accept => {
                let (mut result, signals) = state.perform(action)?;
                let creates = signals.iter().any(|s| {
                    matches!(
                        s,
                        BusSignal::CollectionCreated { .. } | BusSignal::ItemCreated { .. }
                    )
                });
                if creates && !state.report_created_path {
                    result.clear();
                }
                (signals, (false, result))
            }
        };
        drop(state);

        let (dismissed, result) = completed;
        signals.push(BusSignal::PromptCompleted {
            prompt: prompt.clone(),
            dismissed,
            result,
        });
        self.publish_all(signals);
        Ok(())
    }

    fn collection_label(&self, collection: &ObjectPath) -> BusResult<String> {
        Ok(self.state.lock().collection(collection)?.label.clone())
    }

    fn is_locked(&self, object: &ObjectPath) -> BusResult<bool> {
        let state = self.state.lock();
        if let Some(collection) = state.collections.get(object) {
            return Ok(collection.locked);
        }
        Ok(state.item(object)?.0.locked)
    }

    fn collection_items(&self, collection: &ObjectPath) -> BusResult<Vec<ObjectPath>> {
        let state = self.state.lock();
        let target = state.collection(collection)?;
        Ok(target
            .items
            .keys()
            .map(|id| collection.child(&id.to_string()))
            .collect())
    }

    fn search_items(
        &self,
        collection: &ObjectPath,
        attributes: &Attributes,
    ) -> BusResult<Vec<ObjectPath>> {
        let state = self.state.lock();
        let target = state.collection(collection)?;
        Ok(target
            .items
            .iter()
            .filter(|(_, item)| {
                attributes
                    .iter()
                    .all(|(k, v)| item.attributes.get(k) == Some(v))
            })
            .map(|(id, _)| collection.child(&id.to_string()))
            .collect())
    }

    fn create_item(
        &self,
        collection: &ObjectPath,
        properties: &ItemProperties,
        secret: &Secret,
        replace: bool,
    ) -> BusResult<(ObjectPath, ObjectPath)> {
        let mut state = self.state.lock();
        if state.collection(collection)?.locked {
            return Err(BusError::IsLocked(collection.to_string()));
        }
        let value = state.open_secret(secret)?;

        if state.prompt_on_create_item {
            let prompt = state.new_prompt(PendingAction::CreateItem {
                collection: collection.clone(),
                properties: properties.clone(),
                value,
                replace,
            });
            return Ok((ObjectPath::root(), prompt));
        }

        let item = state.insert_item(collection, properties.clone(), value, replace)?;
        let source = state.signal_source(collection);
        drop(state);
        self.publish_all(vec![BusSignal::ItemCreated {
            collection: source,
            item: item.clone(),
        }]);
        Ok((item, ObjectPath::root()))
    }

    fn item_label(&self, item: &ObjectPath) -> BusResult<String> {
        Ok(self.state.lock().item(item)?.1.label.clone())
    }

    fn set_item_label(&self, item: &ObjectPath, label: &str) -> BusResult<()> {
        self.state.lock().unlocked_item_mut(item)?.label = label.to_string();
        Ok(())
    }

    fn item_attributes(&self, item: &ObjectPath) -> BusResult<Attributes> {
        Ok(self.state.lock().item(item)?.1.attributes.clone())
    }

    fn set_item_attributes(&self, item: &ObjectPath, attributes: &Attributes) -> BusResult<()> {
        self.state.lock().unlocked_item_mut(item)?.attributes = attributes.clone();
        Ok(())
    }

    fn get_secret(&self, item: &ObjectPath, session: &ObjectPath) -> BusResult<Secret> {
        let state = self.state.lock();
        if !state.sessions.contains_key(session) {
            return Err(missing(session));
        }
        let (collection, entry) = state.item(item)?;
        if collection.locked {
            return Err(BusError::IsLocked(item.to_string()));
        }
        state.seal(&self.rng, session, &entry.value)
    }

    fn set_secret(&self, item: &ObjectPath, secret: &Secret) -> BusResult<()> {
        let mut state = self.state.lock();
        let value = state.open_secret(secret)?;
        state.unlocked_item_mut(item)?.value = value;
        Ok(())
    }

    fn delete(&self, object: &ObjectPath) -> BusResult<ObjectPath> {
        let mut state = self.state.lock();
        let exists = state.collections.contains_key(object) || state.item(object).is_ok();
        if !exists {
            return Err(missing(object));
        }

        if state.prompt_on_delete {
            return Ok(state.new_prompt(PendingAction::Delete(object.clone())));
        }
        state.remove(object)?;
        Ok(ObjectPath::root())
    }

    fn signals(&self) -> &SignalHub {
        &self.hub
    }
}
