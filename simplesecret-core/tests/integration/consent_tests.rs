//! Consent and unlock behaviour of the default collection

use secrecy::ExposeSecret;
use simplesecret_core::testing::PromptResponse;
use simplesecret_core::{ClientSettings, SimpleCollection};

use super::{default_collection, service};

#[test]
fn test_bulk_read_asks_once() {
    let (mock, mut collection) = default_collection();
    let item = collection.create_item("mail", "hunter2", None).unwrap().unwrap();

    let secrets = collection.get_secrets().unwrap();
    assert_eq!(secrets.len(), 1);
    assert_eq!(secrets[&item].expose_secret(), "hunter2");
    assert_eq!(mock.lock_count(), 1);
    assert_eq!(mock.unlock_count(), 1);
    assert!(collection.consent().is_granted());

    collection.get_secrets().unwrap();
    assert_eq!(mock.lock_count(), 1);
    assert_eq!(mock.unlock_count(), 1);
}

#[test]
fn test_explicit_lock_forgets_consent() {
    let (mock, mut collection) = default_collection();
    collection.unlock_with_user_permission().unwrap();
    assert!(collection.consent().is_granted());

    collection.lock().unwrap();
    assert!(!collection.consent().is_granted());
    assert!(collection.is_locked().unwrap());

    collection.get_secrets().unwrap();
    assert_eq!(mock.unlock_count(), 2);
    assert!(collection.consent().is_granted());
}

#[test]
fn test_dismissed_consent_denies_bulk_operations() {
    let (mock, mut collection) = default_collection();
    let item = collection.create_item("mail", "hunter2", None).unwrap().unwrap();
    mock.set_prompt_response(PromptResponse::Dismiss);

    assert!(collection.get_secrets().unwrap_err().is_access_denied());
    assert!(collection.delete_item(&item).unwrap_err().is_access_denied());
    assert!(!collection.consent().is_granted());
}

#[test]
fn test_dismissed_unlock_yields_absent_results() {
    let (mock, mut collection) = default_collection();
    let item = collection.create_item("mail", "hunter2", None).unwrap().unwrap();

    mock.set_locked(collection.path(), true);
    mock.set_prompt_response(PromptResponse::Dismiss);

    assert!(collection.get_secret(&item).unwrap().is_none());
    assert!(collection.get_label(&item).unwrap().is_none());
    assert!(collection.create_item("other", "pw", None).unwrap().is_none());
    assert!(!collection.update_item(&item, Some("x"), None, None).unwrap());
    assert_eq!(mock.item_count(collection.path()), 1);
}

#[test]
fn test_unlocking_a_locked_collection_prompts_once() {
    let (mock, mut collection) = default_collection();
    let item = collection.create_item("mail", "hunter2", None).unwrap().unwrap();
    mock.set_locked(collection.path(), true);

    assert_eq!(
        collection.get_secret(&item).unwrap().unwrap().expose_secret(),
        "hunter2"
    );
    assert!(collection.get_secret(&item).unwrap().is_some());
    assert_eq!(mock.prompt_count(), 1);
}

#[test]
fn test_settings_with_huge_settle_delay_lock_normally() {
    let settings = ClientSettings::from_toml_str("settle_delay = \"300000000000years\"").unwrap();
    let (mock, context) = service();
    let mut collection = SimpleCollection::default_collection(&context, &settings).unwrap();

    collection.lock().unwrap();
    assert!(collection.is_locked().unwrap());

    collection.get_secrets().unwrap();
    assert!(collection.consent().is_granted());
    assert_eq!(mock.unlock_count(), 1);
}
