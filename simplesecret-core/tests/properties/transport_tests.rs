//! Property-based tests for the transport codec
//!
//! Every secret crossing the session must decrypt to what was encrypted, and
//! only under the session that produced it.

use std::sync::Arc;

use proptest::prelude::*;
use simplesecret_core::secret::AES_BLOCK_LEN;
use simplesecret_core::testing::MockSecretService;
use simplesecret_core::{SecretError, TransportAlgorithm, TransportEncryption};

// ========== Strategies ==========

fn arb_algorithm() -> impl Strategy<Value = TransportAlgorithm> {
    prop_oneof![Just(TransportAlgorithm::Dh), Just(TransportAlgorithm::Plain)]
}

fn arb_plaintext() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}

fn established(mock: &Arc<MockSecretService>, algorithm: TransportAlgorithm) -> TransportEncryption {
    let mut transport = TransportEncryption::new(mock.clone(), algorithm);
    transport.establish().unwrap();
    transport
}

proptest! {
    // Each case runs a full key exchange
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Decrypting an encrypted secret yields the plaintext
    #[test]
    fn round_trip(algorithm in arb_algorithm(), plaintext in arb_plaintext()) {
        let mock = Arc::new(MockSecretService::new());
        let transport = established(&mock, algorithm);

        let secret = transport.encrypt(&plaintext).unwrap();
        prop_assert_eq!(secret.session(), transport.session().unwrap().path());
        let decrypted = transport.decrypt(&secret).unwrap();
        prop_assert_eq!(decrypted.as_slice(), plaintext.as_slice());
    }

    /// AES ciphertexts are padded to whole blocks and carry a full IV
    #[test]
    fn ciphertext_is_block_aligned(plaintext in arb_plaintext()) {
        let mock = Arc::new(MockSecretService::new());
        let transport = established(&mock, TransportAlgorithm::Dh);

        let secret = transport.encrypt(&plaintext).unwrap();
        prop_assert_eq!(secret.parameters().len(), AES_BLOCK_LEN);
        prop_assert_eq!(secret.value().len() % AES_BLOCK_LEN, 0);
        prop_assert!(secret.value().len() > plaintext.len());
    }

    /// A secret from one session cannot be decrypted under another
    #[test]
    fn foreign_session_is_rejected(algorithm in arb_algorithm(), plaintext in arb_plaintext()) {
        let mock = Arc::new(MockSecretService::new());
        let first = established(&mock, algorithm);
        let second = established(&mock, algorithm);

        let secret = first.encrypt(&plaintext).unwrap();
        prop_assert!(matches!(
            second.decrypt(&secret),
            Err(SecretError::EncryptionFailed(_))
        ));
    }

    /// The service stores exactly the plaintext the client encrypted
    #[test]
    fn service_sees_plaintext(algorithm in arb_algorithm(), plaintext in arb_plaintext()) {
        use simplesecret_core::bus::{DEFAULT_COLLECTION, ItemProperties, ObjectPath, SecretServiceBus};

        let mock = Arc::new(MockSecretService::new());
        let transport = established(&mock, algorithm);

        let secret = transport.encrypt(&plaintext).unwrap();
        let (item, _) = mock
            .create_item(
                &ObjectPath::from(DEFAULT_COLLECTION),
                &ItemProperties::new("p", None),
                &secret,
                false,
            )
            .unwrap();
        prop_assert_eq!(mock.stored_secret(item.as_str()).unwrap(), plaintext);
    }

    /// clear and close can be repeated in any number
    #[test]
    fn clear_and_close_are_idempotent(clears in 1usize..5, closes in 1usize..5) {
        let mock = Arc::new(MockSecretService::new());
        let mut transport = established(&mock, TransportAlgorithm::Dh);

        for _ in 0..clears {
            transport.clear();
        }
        prop_assert!(!transport.has_session_key());
        for _ in 0..closes {
            transport.close();
        }
        prop_assert!(transport.session().is_none());
        prop_assert_eq!(mock.open_session_count(), 0);
    }
}
