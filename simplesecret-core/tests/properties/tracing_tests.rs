//! Property-based tests for the tracing configuration

use proptest::prelude::*;
use simplesecret_core::{TracingConfig, TracingLevel};

// ========== Strategies ==========

fn arb_tracing_level() -> impl Strategy<Value = TracingLevel> {
    prop_oneof![
        Just(TracingLevel::Error),
        Just(TracingLevel::Warn),
        Just(TracingLevel::Info),
        Just(TracingLevel::Debug),
        Just(TracingLevel::Trace),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// More `-v` flags never make the output quieter
    #[test]
    fn verbosity_is_monotonic(count in 0u8..u8::MAX) {
        let quieter = TracingLevel::from_verbosity(count).to_tracing_level();
        let louder = TracingLevel::from_verbosity(count + 1).to_tracing_level();
        prop_assert!(louder >= quieter);
    }

    /// The level name parses back to the same level, in any case
    #[test]
    fn level_names_parse(level in arb_tracing_level(), upper in any::<bool>()) {
        let name = if upper { level.to_string().to_uppercase() } else { level.to_string() };
        prop_assert_eq!(name.parse::<TracingLevel>(), Ok(level));
    }

    /// Every directive derived from the level names that level
    #[test]
    fn directives_carry_the_level(level in arb_tracing_level()) {
        let directives = TracingConfig::new().with_level(level).default_directives();
        let suffix = format!("={level}");
        for directive in directives.split(',') {
            prop_assert!(directive.ends_with(&suffix), "{directive}");
        }
    }
}
