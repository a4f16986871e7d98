//! Property-based tests for the settings file format

use std::time::Duration;

use proptest::prelude::*;
use simplesecret_core::{ClientSettings, TransportAlgorithm};

// ========== Strategies ==========

fn arb_algorithm() -> impl Strategy<Value = TransportAlgorithm> {
    prop_oneof![Just(TransportAlgorithm::Dh), Just(TransportAlgorithm::Plain)]
}

fn arb_settings() -> impl Strategy<Value = ClientSettings> {
    (
        1u64..86_400_000,
        0u64..10_000,
        0u64..10_000,
        arb_algorithm(),
        "[a-zA-Z0-9:_-]{0,16}",
    )
        .prop_map(|(timeout, settle, wait, algorithm, window_id)| ClientSettings {
            prompt_timeout: Duration::from_millis(timeout),
            settle_delay: Duration::from_millis(settle),
            notification_wait: Duration::from_millis(wait),
            algorithm,
            window_id,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Serialized settings parse back unchanged
    #[test]
    fn settings_survive_toml(settings in arb_settings()) {
        let text = toml::to_string(&settings).unwrap();
        let parsed = ClientSettings::from_toml_str(&text).unwrap();
        prop_assert_eq!(parsed, settings);
    }

    /// Any single key may be left out
    #[test]
    fn missing_keys_take_defaults(timeout in 1u64..3600) {
        let parsed = ClientSettings::from_toml_str(&format!("prompt_timeout = \"{timeout}s\"")).unwrap();
        prop_assert_eq!(parsed.prompt_timeout, Duration::from_secs(timeout));
        prop_assert_eq!(parsed.settle_delay, ClientSettings::default().settle_delay);
        prop_assert_eq!(parsed.algorithm, TransportAlgorithm::Dh);
    }
}
