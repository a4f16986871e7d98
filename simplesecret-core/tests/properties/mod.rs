//! Property test modules

mod collection_tests;
mod settings_tests;
mod tracing_tests;
mod transport_tests;
