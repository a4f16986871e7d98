//! End-to-end flows over a single collection
//!
//! Each test walks the facade through what a password manager integration
//! does: create a collection, store a password, look it up, delete it.

use secrecy::ExposeSecret;
use simplesecret_core::testing::{MockSecretService, PromptResponse};
use simplesecret_core::{BusContext, SimpleCollection};

use super::{attrs, default_collection, quick_settings, service};

fn test_collection(context: &BusContext) -> SimpleCollection {
    SimpleCollection::create_or_open(context, &quick_settings(), "Test", None).unwrap()
}

fn store_site_login(collection: &mut SimpleCollection) -> String {
    collection
        .create_item("site-login", "s3cr3t", Some(&attrs(&[("url", "example.com")])))
        .unwrap()
        .unwrap()
}

#[test]
fn test_create_collection_without_master_password() {
    let (mock, context) = service();
    let collection = test_collection(&context);

    assert_eq!(collection.label().unwrap(), "Test");
    assert!(!collection.is_default());
    assert!(collection.path().starts_with("/org/freedesktop/secrets/collection/"));
    assert_eq!(mock.locked(collection.path()), Some(false));
    assert_eq!(mock.prompt_count(), 1);
}

#[test]
fn test_existing_collection_is_reused() {
    let (mock, context) = service();
    let first = test_collection(&context);
    let first_path = first.path().to_string();
    drop(first);

    let second = test_collection(&context);
    assert_eq!(second.path(), first_path);
    assert_eq!(mock.collection_count(), 2);
    assert_eq!(mock.prompt_count(), 1);
}

#[test]
fn test_store_and_read_password() {
    let (mock, context) = service();
    let mut collection = test_collection(&context);

    let item = store_site_login(&mut collection);
    assert!(!item.is_empty());

    let secret = collection.get_secret(&item).unwrap().unwrap();
    assert_eq!(secret.expose_secret(), "s3cr3t");
    assert_eq!(mock.stored_secret(&item).unwrap(), b"s3cr3t");
}

#[test]
fn test_search_by_attributes() {
    let (_mock, context) = service();
    let mut collection = test_collection(&context);
    let item = store_site_login(&mut collection);

    let found = collection
        .get_items(&attrs(&[("url", "example.com")]))
        .unwrap()
        .unwrap();
    assert!(found.contains(&item));

    assert!(
        collection
            .get_items(&attrs(&[("url", "nonexistent")]))
            .unwrap()
            .is_none()
    );
}

#[test]
fn test_deleted_item_is_absent() {
    let (mock, context) = service();
    let mut collection = test_collection(&context);
    let item = store_site_login(&mut collection);

    assert!(collection.delete_item(&item).unwrap());
    assert!(collection.get_attributes(&item).unwrap().is_none());
    assert!(collection.get_secret(&item).unwrap().is_none());
    assert_eq!(mock.item_count(collection.path()), 0);
}

#[test]
fn test_dismissed_item_creation_leaves_nothing_behind() {
    let (mock, mut collection) = default_collection();
    mock.set_prompt_on_create_item(true);
    mock.set_prompt_response(PromptResponse::Dismiss);

    let item = collection
        .create_item("site-login", "s3cr3t", Some(&attrs(&[("url", "example.com")])))
        .unwrap();

    assert!(item.is_none());
    assert_eq!(mock.item_count(collection.path()), 0);
    assert!(
        collection
            .get_items(&attrs(&[("url", "example.com")]))
            .unwrap()
            .is_none()
    );
}

#[test]
fn test_update_item_changes_only_given_parts() {
    let (_mock, mut collection) = default_collection();
    let item = store_site_login(&mut collection);

    assert!(collection.update_item(&item, None, None, Some("n3w")).unwrap());
    assert_eq!(
        collection.get_secret(&item).unwrap().unwrap().expose_secret(),
        "n3w"
    );
    assert_eq!(collection.get_label(&item).unwrap().as_deref(), Some("site-login"));

    let replaced = attrs(&[("url", "example.org")]);
    assert!(
        collection
            .update_item(&item, Some("renamed"), Some(&replaced), None)
            .unwrap()
    );
    assert_eq!(collection.get_label(&item).unwrap().as_deref(), Some("renamed"));
    assert_eq!(collection.get_attributes(&item).unwrap(), Some(replaced));
}

#[test]
fn test_update_of_missing_item_is_false() {
    let (_mock, mut collection) = default_collection();
    let missing = format!("{}/999", collection.path());
    assert!(!collection.update_item(&missing, Some("x"), None, None).unwrap());
}

#[test]
fn test_plain_transport_round_trip() {
    use simplesecret_core::TransportAlgorithm;

    let mock = std::sync::Arc::new(MockSecretService::new());
    let context = BusContext::new(mock.clone());
    let settings = quick_settings().with_algorithm(TransportAlgorithm::Plain);
    let mut collection = SimpleCollection::default_collection(&context, &settings).unwrap();

    let item = collection.create_item("plain", "visible", None).unwrap().unwrap();
    assert_eq!(
        collection.get_secret(&item).unwrap().unwrap().expose_secret(),
        "visible"
    );
}
