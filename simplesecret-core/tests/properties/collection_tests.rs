//! Property-based tests for collection level rules
//!
//! Input validation of item creation and the guard against deleting the
//! service's default collections.

use std::sync::Arc;

use proptest::prelude::*;
use simplesecret_core::secret::DEFAULT_COLLECTION_IDS;
use simplesecret_core::testing::MockSecretService;
use simplesecret_core::{
    BusContext, ClientSettings, ObjectPath, SecretError, SimpleCollection, is_default_collection,
};

// ========== Strategies ==========

fn arb_default_id() -> impl Strategy<Value = &'static str> {
    prop::sample::select(DEFAULT_COLLECTION_IDS.to_vec())
}

fn arb_custom_id() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,12}".prop_filter("must not be a default id", |id| {
        !DEFAULT_COLLECTION_IDS.contains(&id.as_str())
    })
}

fn arb_text() -> impl Strategy<Value = String> {
    "[^\\x00]{1,32}"
}

fn default_facade() -> SimpleCollection {
    let context = BusContext::new(Arc::new(MockSecretService::new()));
    SimpleCollection::default_collection(&context, &ClientSettings::default()).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// An item needs both a label and a password
    #[test]
    fn empty_label_or_password_is_rejected(text in arb_text()) {
        let mut collection = default_facade();

        prop_assert!(matches!(
            collection.create_item("", &text, None),
            Err(SecretError::Validation(_))
        ));
        prop_assert!(matches!(
            collection.create_item(&text, "", None),
            Err(SecretError::Validation(_))
        ));
        prop_assert!(collection.items().unwrap().is_empty());
    }

    /// Default identifiers are recognised under any parent path
    #[test]
    fn default_ids_are_recognised(id in arb_default_id(), parent in "(/[a-z]{1,8}){1,4}") {
        let path = ObjectPath::from(format!("{parent}/{id}"));
        prop_assert!(is_default_collection(&path));
    }

    /// Other identifiers are not default collections
    #[test]
    fn custom_ids_are_not_default(id in arb_custom_id()) {
        let path = ObjectPath::from(format!("/org/freedesktop/secrets/collection/{id}"));
        prop_assert!(!is_default_collection(&path));
    }

    /// Deleting a default collection fails whatever its lock state
    #[test]
    fn default_collection_cannot_be_deleted(id in arb_default_id(), locked in any::<bool>()) {
        let mock = Arc::new(MockSecretService::new());
        let path = mock.add_collection(id);
        prop_assume!(path.id() == Some(id));
        mock.set_locked(path.as_str(), locked);

        let context = BusContext::new(mock.clone());
        let mut collection =
            SimpleCollection::open(&context, &ClientSettings::default(), id).unwrap();

        let err = collection.delete().unwrap_err();
        prop_assert!(err.is_access_denied());
        prop_assert_eq!(mock.locked(path.as_str()), Some(locked));
    }
}
