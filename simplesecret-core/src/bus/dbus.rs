//! zbus-backed secret service collaborator
//!
//! Every remote call is a blocking method call on the session bus. A
//! background thread listens to the service's signals and feeds them into the
//! [`SignalHub`].

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use tracing::{debug, trace, warn};
use zbus::blocking::{Connection, MessageIterator, Proxy};
use zbus::zvariant::{ObjectPath as WirePath, OwnedObjectPath, Value};
use zbus::{MatchRule, Message};

use super::{
    Attributes, BusSignal, ItemProperties, ObjectPath, SECRETS_PATH, SECRETS_SERVICE,
    SecretServiceBus, SignalHub, interfaces, properties,
};
use crate::error::{BusError, BusResult};
use crate::secret::Secret;

/// `(o session, ay parameters, ay value, s content_type)` as sent to the service
type WireSecretRef<'a> = (WirePath<'a>, &'a [u8], &'a [u8], &'a str);

/// The same struct as received from the service
type WireSecret = (OwnedObjectPath, Vec<u8>, Vec<u8>, String);

/// Secret service on the D-Bus session bus
pub struct DbusSecretService {
    connection: Connection,
    hub: Arc<SignalHub>,
}

impl DbusSecretService {
    /// Connects to the session bus and starts listening for service signals
    ///
    /// # Errors
    /// Returns `BusError::Disconnected` if the session bus cannot be reached.
    pub fn connect() -> BusResult<Self> {
        let connection =
            Connection::session().map_err(|e| BusError::Disconnected(e.to_string()))?;
        let hub = Arc::new(SignalHub::new());
        spawn_signal_listener(&connection, Arc::clone(&hub))?;
        debug!("Connected to the session bus");
        Ok(Self { connection, hub })
    }

    fn proxy<'a>(&self, path: &'a str, interface: &'a str) -> BusResult<Proxy<'a>> {
        Proxy::new(&self.connection, SECRETS_SERVICE, path, interface)
            .map_err(|e| map_error("Proxy", e))
    }

    fn get_property(&self, object: &ObjectPath, interface: &str, name: &str) -> BusResult<Message> {
        self.proxy(object.as_str(), interfaces::PROPERTIES)?
            .call_method("Get", &(interface, name))
            .map_err(|e| map_error("Get", e))
    }

    fn set_property(
        &self,
        object: &ObjectPath,
        interface: &str,
        name: &str,
        value: Value<'_>,
    ) -> BusResult<()> {
        self.proxy(object.as_str(), interfaces::PROPERTIES)?
            .call_method("Set", &(interface, name, value))
            .map_err(|e| map_error("Set", e))?;
        Ok(())
    }

    fn string_property(&self, object: &ObjectPath, interface: &str, name: &str) -> BusResult<String> {
        let reply = self.get_property(object, interface, name)?;
        let body = reply.body();
        let value: Value<'_> = body.deserialize().map_err(|e| decode_error(name, e))?;
        String::try_from(value).map_err(|e| decode_error(name, e))
    }

    fn bool_property(&self, object: &ObjectPath, interface: &str, name: &str) -> BusResult<bool> {
        let reply = self.get_property(object, interface, name)?;
        let body = reply.body();
        let value: Value<'_> = body.deserialize().map_err(|e| decode_error(name, e))?;
        bool::try_from(value).map_err(|e| decode_error(name, e))
    }

    fn paths_property(
        &self,
        object: &ObjectPath,
        interface: &str,
        name: &str,
    ) -> BusResult<Vec<ObjectPath>> {
        let reply = self.get_property(object, interface, name)?;
        let body = reply.body();
        let value: Value<'_> = body.deserialize().map_err(|e| decode_error(name, e))?;
        let paths = Vec::<OwnedObjectPath>::try_from(value).map_err(|e| decode_error(name, e))?;
        Ok(from_wire_paths(paths))
    }
}

impl SecretServiceBus for DbusSecretService {
    fn ping(&self) -> BusResult<()> {
        self.proxy(SECRETS_PATH, interfaces::PEER)?
            .call_method("Ping", &())
            .map_err(|e| map_error("Ping", e))?;
        Ok(())
    }

    fn open_session(&self, algorithm: &str, input: &[u8]) -> BusResult<(Vec<u8>, ObjectPath)> {
        let input = if input.is_empty() {
            Value::from("")
        } else {
            Value::from(input.to_vec())
        };

        let reply = self
            .proxy(SECRETS_PATH, interfaces::SERVICE)?
            .call_method("OpenSession", &(algorithm, input))
            .map_err(|e| map_error("OpenSession", e))?;
        let body = reply.body();
        let (output, session): (Value<'_>, OwnedObjectPath) = body
            .deserialize()
            .map_err(|e| decode_error("OpenSession", e))?;

        // The plain algorithm answers with an empty string
        let output = Vec::<u8>::try_from(output).unwrap_or_default();
        Ok((output, from_wire_path(&session)))
    }

    fn close_session(&self, session: &ObjectPath) -> BusResult<()> {
        self.proxy(session.as_str(), interfaces::SESSION)?
            .call_method("Close", &())
            .map_err(|e| map_error("Close", e))?;
        Ok(())
    }

    fn collections(&self) -> BusResult<Vec<ObjectPath>> {
        self.paths_property(&ObjectPath::from(SECRETS_PATH), interfaces::SERVICE, "Collections")
    }

    fn create_collection(&self, label: &str) -> BusResult<(ObjectPath, ObjectPath)> {
        let props = HashMap::from([(properties::COLLECTION_LABEL, Value::from(label))]);
        let (collection, prompt): (OwnedObjectPath, OwnedObjectPath) = self
            .proxy(SECRETS_PATH, interfaces::SERVICE)?
            .call("CreateCollection", &(props, ""))
            .map_err(|e| map_error("CreateCollection", e))?;
        Ok((from_wire_path(&collection), from_wire_path(&prompt)))
    }

    fn create_with_master_password(&self, label: &str, master: &Secret) -> BusResult<ObjectPath> {
        let props = HashMap::from([(properties::COLLECTION_LABEL, Value::from(label))]);
        let collection: OwnedObjectPath = self
            .proxy(SECRETS_PATH, interfaces::WITHOUT_PROMPT)?
            .call("CreateWithMasterPassword", &(props, to_wire_secret(master)?))
            .map_err(|e| map_error("CreateWithMasterPassword", e))?;
        Ok(from_wire_path(&collection))
    }

    fn unlock_with_master_password(
        &self,
        collection: &ObjectPath,
        master: &Secret,
    ) -> BusResult<()> {
        self.proxy(SECRETS_PATH, interfaces::WITHOUT_PROMPT)?
            .call_method(
                "UnlockWithMasterPassword",
                &(to_wire_path(collection)?, to_wire_secret(master)?),
            )
            .map_err(|e| map_error("UnlockWithMasterPassword", e))?;
        Ok(())
    }

    fn lock(&self, objects: &[ObjectPath]) -> BusResult<(Vec<ObjectPath>, ObjectPath)> {
        self.lock_or_unlock("Lock", objects)
    }

    fn unlock(&self, objects: &[ObjectPath]) -> BusResult<(Vec<ObjectPath>, ObjectPath)> {
        self.lock_or_unlock("Unlock", objects)
    }

    fn prompt(&self, prompt: &ObjectPath, window_id: &str) -> BusResult<()> {
        self.proxy(prompt.as_str(), interfaces::PROMPT)?
            .call_method("Prompt", &(window_id,))
            .map_err(|e| map_error("Prompt", e))?;
        Ok(())
    }

    fn collection_label(&self, collection: &ObjectPath) -> BusResult<String> {
        self.string_property(collection, interfaces::COLLECTION, "Label")
    }

    fn is_locked(&self, object: &ObjectPath) -> BusResult<bool> {
        self.bool_property(object, object_interface(object), "Locked")
    }

    fn collection_items(&self, collection: &ObjectPath) -> BusResult<Vec<ObjectPath>> {
        self.paths_property(collection, interfaces::COLLECTION, "Items")
    }

    fn search_items(
        &self,
        collection: &ObjectPath,
        attributes: &Attributes,
    ) -> BusResult<Vec<ObjectPath>> {
        let query: HashMap<&str, &str> = attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let found: Vec<OwnedObjectPath> = self
            .proxy(collection.as_str(), interfaces::COLLECTION)?
            .call("SearchItems", &(query,))
            .map_err(|e| map_error("SearchItems", e))?;
        Ok(from_wire_paths(found))
    }

    fn create_item(
        &self,
        collection: &ObjectPath,
        properties: &ItemProperties,
        secret: &Secret,
        replace: bool,
    ) -> BusResult<(ObjectPath, ObjectPath)> {
        let props = HashMap::from([
            (properties::ITEM_LABEL, Value::from(properties.label.as_str())),
            (
                properties::ITEM_ATTRIBUTES,
                Value::from(properties.attributes.clone()),
            ),
        ]);
        let (item, prompt): (OwnedObjectPath, OwnedObjectPath) = self
            .proxy(collection.as_str(), interfaces::COLLECTION)?
            .call("CreateItem", &(props, to_wire_secret(secret)?, replace))
            .map_err(|e| map_error("CreateItem", e))?;
        Ok((from_wire_path(&item), from_wire_path(&prompt)))
    }

    fn item_label(&self, item: &ObjectPath) -> BusResult<String> {
        self.string_property(item, interfaces::ITEM, "Label")
    }

    fn set_item_label(&self, item: &ObjectPath, label: &str) -> BusResult<()> {
        self.set_property(item, interfaces::ITEM, "Label", Value::from(label))
    }

    fn item_attributes(&self, item: &ObjectPath) -> BusResult<Attributes> {
        let reply = self.get_property(item, interfaces::ITEM, "Attributes")?;
        let body = reply.body();
        let value: Value<'_> = body
            .deserialize()
            .map_err(|e| decode_error("Attributes", e))?;
        HashMap::<String, String>::try_from(value).map_err(|e| decode_error("Attributes", e))
    }

    fn set_item_attributes(&self, item: &ObjectPath, attributes: &Attributes) -> BusResult<()> {
        self.set_property(
            item,
            interfaces::ITEM,
            "Attributes",
            Value::from(attributes.clone()),
        )
    }

    fn get_secret(&self, item: &ObjectPath, session: &ObjectPath) -> BusResult<Secret> {
        let (session, parameters, value, content_type): WireSecret = self
            .proxy(item.as_str(), interfaces::ITEM)?
            .call("GetSecret", &(to_wire_path(session)?,))
            .map_err(|e| map_error("GetSecret", e))?;
        Ok(Secret::with_content_type(
            from_wire_path(&session),
            parameters,
            value,
            content_type,
        ))
    }

    fn set_secret(&self, item: &ObjectPath, secret: &Secret) -> BusResult<()> {
        self.proxy(item.as_str(), interfaces::ITEM)?
            .call_method("SetSecret", &(to_wire_secret(secret)?,))
            .map_err(|e| map_error("SetSecret", e))?;
        Ok(())
    }

    fn delete(&self, object: &ObjectPath) -> BusResult<ObjectPath> {
        let prompt: OwnedObjectPath = self
            .proxy(object.as_str(), object_interface(object))?
            .call("Delete", &())
            .map_err(|e| map_error("Delete", e))?;
        Ok(from_wire_path(&prompt))
    }

    fn signals(&self) -> &SignalHub {
        &self.hub
    }
}

impl DbusSecretService {
    fn lock_or_unlock(
        &self,
        method: &'static str,
        objects: &[ObjectPath],
    ) -> BusResult<(Vec<ObjectPath>, ObjectPath)> {
        let paths = objects
            .iter()
            .map(to_wire_path)
            .collect::<BusResult<Vec<_>>>()?;
        let (done, prompt): (Vec<OwnedObjectPath>, OwnedObjectPath) = self
            .proxy(SECRETS_PATH, interfaces::SERVICE)?
            .call(method, &(paths,))
            .map_err(|e| map_error(method, e))?;
        Ok((from_wire_paths(done), from_wire_path(&prompt)))
    }
}

impl std::fmt::Debug for DbusSecretService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbusSecretService")
            .field("unique_name", &self.connection.unique_name())
            .finish_non_exhaustive()
    }
}

/// Number of `/` in a collection or alias path (`/org/freedesktop/secrets/collection/x`)
const COLLECTION_DEPTH: usize = 5;

/// Collections and aliases sit one level below `/org/freedesktop/secrets/*`,
/// items one level deeper
fn object_interface(object: &ObjectPath) -> &'static str {
    if object.as_str().matches('/').count() <= COLLECTION_DEPTH {
        interfaces::COLLECTION
    } else {
        interfaces::ITEM
    }
}

fn to_wire_path(path: &ObjectPath) -> BusResult<WirePath<'_>> {
    WirePath::try_from(path.as_str())
        .map_err(|e| BusError::call("ObjectPath", format!("{path}: {e}")))
}

fn from_wire_path(path: &OwnedObjectPath) -> ObjectPath {
    ObjectPath::from(path.as_str())
}

fn from_wire_paths(paths: Vec<OwnedObjectPath>) -> Vec<ObjectPath> {
    paths.iter().map(from_wire_path).collect()
}

fn to_wire_secret(secret: &Secret) -> BusResult<WireSecretRef<'_>> {
    Ok((
        to_wire_path(secret.session())?,
        secret.parameters(),
        secret.value(),
        secret.content_type(),
    ))
}

fn decode_error(what: &str, error: impl std::fmt::Display) -> BusError {
    BusError::call(what, format!("Unexpected reply: {error}"))
}

/// Classifies a zbus error by the D-Bus error name
fn map_error(method: &str, error: zbus::Error) -> BusError {
    match &error {
        zbus::Error::MethodError(name, detail, _) => {
            let name = name.as_str();
            let detail = detail.clone().unwrap_or_else(|| name.to_string());
            if name.ends_with(".NoSuchObject") || name.ends_with(".UnknownObject") {
                BusError::NoSuchObject(detail)
            } else if name.ends_with(".NotSupported") {
                BusError::NotSupported(detail)
            } else if name.ends_with(".IsLocked") {
                BusError::IsLocked(detail)
            } else {
                BusError::call(method, format!("{name}: {detail}"))
            }
        }
        zbus::Error::InputOutput(e) => BusError::Disconnected(e.to_string()),
        other => BusError::call(method, other.to_string()),
    }
}

fn spawn_signal_listener(connection: &Connection, hub: Arc<SignalHub>) -> BusResult<()> {
    let rule = MatchRule::builder()
        .msg_type(zbus::message::Type::Signal)
        .path_namespace(SECRETS_PATH)
        .map_err(|e| map_error("AddMatch", e))?
        .build();
    let messages = MessageIterator::for_match_rule(rule, connection, None)
        .map_err(|e| map_error("AddMatch", e))?;

    thread::Builder::new()
        .name("secret-signals".to_string())
        .spawn(move || {
            for message in messages {
                match message {
                    Ok(message) => dispatch_signal(&hub, &message),
                    Err(e) => warn!(error = %e, "Failed to receive a signal"),
                }
            }
            debug!("Signal listener stopped");
        })
        .map_err(|e| BusError::call("spawn", e.to_string()))?;
    Ok(())
}

fn dispatch_signal(hub: &SignalHub, message: &Message) {
    let header = message.header();
    let (Some(member), Some(path)) = (header.member(), header.path()) else {
        return;
    };
    let source = ObjectPath::from(path.as_str());
    let body = message.body();

    let signal = match member.as_str() {
        "CollectionCreated" => body
            .deserialize::<OwnedObjectPath>()
            .ok()
            .map(|collection| BusSignal::CollectionCreated {
                collection: from_wire_path(&collection),
            }),
        "ItemCreated" => body
            .deserialize::<OwnedObjectPath>()
            .ok()
            .map(|item| BusSignal::ItemCreated {
                collection: source,
                item: from_wire_path(&item),
            }),
        "Completed" => body
            .deserialize::<(bool, Value<'_>)>()
            .ok()
            .map(|(dismissed, result)| BusSignal::PromptCompleted {
                prompt: source,
                dismissed,
                result: result_paths(result),
            }),
        _ => None,
    };

    if let Some(signal) = signal {
        trace!(?signal, "Received signal");
        hub.publish(signal);
    }
}

/// Object paths carried in a `Prompt.Completed` result variant
fn result_paths(result: Value<'_>) -> Vec<ObjectPath> {
    match result {
        Value::ObjectPath(path) => {
            let path = ObjectPath::from(path.as_str());
            if path.is_root() { Vec::new() } else { vec![path] }
        }
        array @ Value::Array(_) => Vec::<OwnedObjectPath>::try_from(array)
            .map(from_wire_paths)
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}
