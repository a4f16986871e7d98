//! Collection lifecycle: creation paths, opening, deletion

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use simplesecret_core::testing::PromptResponse;
use simplesecret_core::{DEFAULT_COLLECTION, SecretError, SimpleCollection};

use super::{default_collection, quick_settings, service};

#[test]
fn test_creation_confirmed_by_signal_when_prompt_reports_nothing() {
    let (mock, context) = service();
    mock.set_report_created_path(false);

    let collection =
        SimpleCollection::create_or_open(&context, &quick_settings(), "Signalled", None).unwrap();
    assert_eq!(collection.label().unwrap(), "Signalled");
}

#[test]
fn test_creation_without_prompt() {
    let (mock, context) = service();
    mock.set_prompt_on_create_collection(false);

    let collection =
        SimpleCollection::create_or_open(&context, &quick_settings(), "Direct", None).unwrap();
    assert_eq!(collection.label().unwrap(), "Direct");
    assert_eq!(mock.prompt_count(), 0);
}

#[test]
fn test_dismissed_creation_is_access_denied() {
    let (mock, context) = service();
    mock.set_prompt_response(PromptResponse::Dismiss);

    let err = SimpleCollection::create_or_open(&context, &quick_settings(), "Nope", None)
        .unwrap_err();
    assert!(err.is_access_denied());
    assert_eq!(mock.collection_count(), 1);
    assert_eq!(mock.open_session_count(), 0);
}

#[test]
fn test_unanswered_creation_times_out() {
    let (mock, context) = service();
    mock.set_prompt_response(PromptResponse::Ignore);
    let settings = quick_settings().with_prompt_timeout(Duration::from_millis(50));

    let err = SimpleCollection::create_or_open(&context, &settings, "Slow", None).unwrap_err();
    assert!(matches!(err, SecretError::PromptTimeout { .. }));
    assert_eq!(mock.open_session_count(), 0);
}

#[test]
fn test_empty_label_is_rejected() {
    let (_mock, context) = service();
    let err = SimpleCollection::create_or_open(&context, &quick_settings(), "", None).unwrap_err();
    assert!(matches!(err, SecretError::Validation(_)));
}

#[test]
fn test_open_never_creates() {
    let (mock, context) = service();

    let err = SimpleCollection::open(&context, &quick_settings(), "Missing").unwrap_err();
    assert!(matches!(err, SecretError::NotFound(_)));
    assert_eq!(mock.collection_count(), 1);
    assert_eq!(mock.open_session_count(), 0);

    let path = mock.add_collection("Present");
    let collection = SimpleCollection::open(&context, &quick_settings(), "Present").unwrap();
    assert_eq!(collection.path(), path.as_str());
}

#[test]
fn test_master_password_unlocks_without_prompt() {
    let (mock, context) = service();
    let master = SecretString::from("correct horse");

    let mut collection =
        SimpleCollection::create_or_open(&context, &quick_settings(), "Vault", Some(&master))
            .unwrap();
    assert_eq!(mock.prompt_count(), 0);

    mock.set_locked(collection.path(), true);
    let item = collection.create_item("db", "pw", None).unwrap().unwrap();

    assert_eq!(mock.prompt_count(), 0);
    assert_eq!(mock.unlock_count(), 1);
    assert_eq!(
        collection.get_secret(&item).unwrap().unwrap().expose_secret(),
        "pw"
    );
}

#[test]
fn test_cleared_master_password_falls_back_to_prompt() {
    let (mock, context) = service();
    let master = SecretString::from("correct horse");
    let mut collection =
        SimpleCollection::create_or_open(&context, &quick_settings(), "Vault", Some(&master))
            .unwrap();

    collection.clear();
    mock.set_locked(collection.path(), true);
    mock.set_prompt_response(PromptResponse::Dismiss);

    assert!(collection.create_item("db", "pw", None).unwrap().is_none());
    assert_eq!(mock.prompt_count(), 1);
}

#[test]
fn test_item_confirmed_by_signal_when_prompt_reports_nothing() {
    let (mock, mut collection) = default_collection();
    mock.set_prompt_on_create_item(true);
    mock.set_report_created_path(false);

    let item = collection.create_item("signalled", "pw", None).unwrap().unwrap();
    assert_eq!(collection.get_label(&item).unwrap().as_deref(), Some("signalled"));
}

#[test]
fn test_item_signalled_from_real_path_of_aliased_collection() {
    let (mock, mut collection) = default_collection();
    mock.set_signal_source(DEFAULT_COLLECTION, "/org/freedesktop/secrets/collection/login");
    mock.set_prompt_on_create_item(true);
    mock.set_report_created_path(false);

    let item = collection.create_item("aliased", "pw", None).unwrap().unwrap();
    assert_eq!(mock.stored_secret(item.as_str()).unwrap(), b"pw");
    assert_eq!(
        collection.get_secret(&item).unwrap().unwrap().expose_secret(),
        "pw"
    );
}

#[test]
fn test_items_lists_every_item() {
    let (_mock, mut collection) = default_collection();
    assert!(collection.items().unwrap().is_empty());

    let a = collection.create_item("a", "1", None).unwrap().unwrap();
    let b = collection.create_item("b", "2", None).unwrap().unwrap();

    let items = collection.items().unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.contains(&a));
    assert!(items.contains(&b));
}

#[test]
fn test_delete_items_counts_deletions() {
    let (mock, mut collection) = default_collection();
    let a = collection.create_item("a", "1", None).unwrap().unwrap();
    let b = collection.create_item("b", "2", None).unwrap().unwrap();
    let missing = format!("{}/999", collection.path());

    let deleted = collection.delete_items(&[a, missing, b]).unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(mock.item_count(collection.path()), 0);
}

#[test]
fn test_dismissed_deletion_keeps_item() {
    let (mock, mut collection) = default_collection();
    let item = collection.create_item("keep", "pw", None).unwrap().unwrap();
    // Consent first, so the dismiss response only hits the deletion prompt
    collection.unlock_with_user_permission().unwrap();

    mock.set_prompt_on_delete(true);
    mock.set_prompt_response(PromptResponse::Dismiss);

    assert!(!collection.delete_item(&item).unwrap());
    assert_eq!(mock.item_count(collection.path()), 1);
}

#[test]
fn test_drop_collection() {
    let (mock, context) = service();
    let mut collection =
        SimpleCollection::create_or_open(&context, &quick_settings(), "Temporary", None).unwrap();

    assert!(collection.delete().unwrap());
    assert_eq!(mock.collection_count(), 1);
}

#[test]
fn test_default_collection_is_guarded_even_when_locked() {
    let (mock, mut collection) = default_collection();
    mock.set_locked(collection.path(), true);

    assert!(collection.delete().unwrap_err().is_access_denied());
    assert_eq!(mock.collection_count(), 1);
}

#[test]
fn test_close_is_idempotent() {
    let (mock, mut collection) = default_collection();
    collection.close();
    collection.close();
    collection.clear();
    assert_eq!(mock.open_session_count(), 0);
}
