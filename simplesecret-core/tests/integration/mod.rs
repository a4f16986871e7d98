//! Integration test modules

mod async_tests;
mod collection_tests;
mod consent_tests;
mod scenario_tests;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use simplesecret_core::testing::MockSecretService;
use simplesecret_core::{Attributes, BusContext, ClientSettings, SimpleCollection};

/// Settings with short waits so failing prompts do not stall the suite
pub fn quick_settings() -> ClientSettings {
    ClientSettings::default().with_prompt_timeout(Duration::from_secs(5))
}

/// A fresh in-memory service and a context bound to it
pub fn service() -> (Arc<MockSecretService>, BusContext) {
    let mock = Arc::new(MockSecretService::new());
    let context = BusContext::new(mock.clone());
    (mock, context)
}

/// Facade over the default collection of a fresh service
pub fn default_collection() -> (Arc<MockSecretService>, SimpleCollection) {
    let (mock, context) = service();
    let collection = SimpleCollection::default_collection(&context, &quick_settings()).unwrap();
    (mock, collection)
}

/// Builds an attribute map from pairs
pub fn attrs(pairs: &[(&str, &str)]) -> Attributes {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect::<HashMap<_, _>>()
}
