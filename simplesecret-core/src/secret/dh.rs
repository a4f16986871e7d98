//! Diffie-Hellman key agreement for the `dh-ietf1024-sha256-aes128-cbc-pkcs7`
//! transport
//!
//! Group: the 1024-bit MODP group of RFC 2409 (Second Oakley Group), g = 2.
//! The shared secret is left-padded to the prime length and fed through
//! HKDF-SHA256 with an empty salt and empty info to produce a 128-bit AES key.

use hkdf::Hkdf;
use num_bigint::BigUint;
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{SecretError, SecretResult};

/// Byte length of the group prime and of encoded public keys
pub const PRIME_LEN: usize = 128;

/// Byte length of the derived AES-128 key
pub const AES_KEY_LEN: usize = 16;

const GENERATOR: u32 = 2;

#[rustfmt::skip]
const MODP_1024_PRIME: [u8; PRIME_LEN] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xC9, 0x0F, 0xDA, 0xA2, 0x21, 0x68, 0xC2, 0x34,
    0xC4, 0xC6, 0x62, 0x8B, 0x80, 0xDC, 0x1C, 0xD1,
    0x29, 0x02, 0x4E, 0x08, 0x8A, 0x67, 0xCC, 0x74,
    0x02, 0x0B, 0xBE, 0xA6, 0x3B, 0x13, 0x9B, 0x22,
    0x51, 0x4A, 0x08, 0x79, 0x8E, 0x34, 0x04, 0xDD,
    0xEF, 0x95, 0x19, 0xB3, 0xCD, 0x3A, 0x43, 0x1B,
    0x30, 0x2B, 0x0A, 0x6D, 0xF2, 0x5F, 0x14, 0x37,
    0x4F, 0xE1, 0x35, 0x6D, 0x6D, 0x51, 0xC2, 0x45,
    0xE4, 0x85, 0xB5, 0x76, 0x62, 0x5E, 0x7E, 0xC6,
    0xF4, 0x4C, 0x42, 0xE9, 0xA6, 0x37, 0xED, 0x6B,
    0x0B, 0xFF, 0x5C, 0xB6, 0xF4, 0x06, 0xB7, 0xED,
    0xEE, 0x38, 0x6B, 0xFB, 0x5A, 0x89, 0x9F, 0xA5,
    0xAE, 0x9F, 0x24, 0x11, 0x7C, 0x4B, 0x1F, 0xE6,
    0x49, 0x28, 0x66, 0x51, 0xEC, 0xE6, 0x53, 0x81,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
];

fn prime() -> BigUint {
    BigUint::from_bytes_be(&MODP_1024_PRIME)
}

/// Encodes a group element big-endian, left-padded to the prime length
fn to_padded_bytes(value: &BigUint) -> Zeroizing<Vec<u8>> {
    let raw = Zeroizing::new(value.to_bytes_be());
    // Sized once so the secret bytes are never left behind by a reallocation
    let mut out = Zeroizing::new(Vec::with_capacity(PRIME_LEN.max(raw.len())));
    out.resize(PRIME_LEN.saturating_sub(raw.len()), 0);
    out.extend_from_slice(&raw);
    out
}

/// Ephemeral key pair; the private exponent is zeroized on drop
pub struct KeyPair {
    private: Zeroizing<Vec<u8>>,
    public: Vec<u8>,
}

impl KeyPair {
    /// Generates a fresh key pair
    ///
    /// # Errors
    /// Returns `SecretError::HandshakeFailed` if the system RNG fails.
    pub fn generate(rng: &SystemRandom) -> SecretResult<Self> {
        let p = prime();
        loop {
            let mut private = Zeroizing::new(vec![0u8; PRIME_LEN]);
            rng.fill(&mut private).map_err(|_| {
                SecretError::HandshakeFailed("Failed to generate private key".to_string())
            })?;

            let exponent = BigUint::from_bytes_be(&private);
            if exponent <= BigUint::from(1u32) {
                continue;
            }

            let public = BigUint::from(GENERATOR).modpow(&exponent, &p);
            return Ok(Self {
                private,
                public: to_padded_bytes(&public).to_vec(),
            });
        }
    }

    /// Public component to send to the peer
    #[must_use]
    pub fn public_key(&self) -> &[u8] {
        &self.public
    }

    /// Derives the AES-128 key shared with the owner of `peer_public`
    ///
    /// # Errors
    /// Returns `SecretError::HandshakeFailed` if the peer key is not a valid
    /// group element.
    pub fn derive_aes_key(&self, peer_public: &[u8]) -> SecretResult<Zeroizing<[u8; AES_KEY_LEN]>> {
        if peer_public.is_empty() || peer_public.len() > PRIME_LEN {
            return Err(SecretError::HandshakeFailed(format!(
                "Peer public key has invalid length {}",
                peer_public.len()
            )));
        }

        let p = prime();
        let peer = BigUint::from_bytes_be(peer_public);
        let p_minus_one = &p - 1u32;
        if peer <= BigUint::from(1u32) || peer >= p_minus_one {
            return Err(SecretError::HandshakeFailed(
                "Peer public key is outside the group".to_string(),
            ));
        }

        let exponent = BigUint::from_bytes_be(&self.private);
        let shared = to_padded_bytes(&peer.modpow(&exponent, &p));

        let mut key = Zeroizing::new([0u8; AES_KEY_LEN]);
        Hkdf::<Sha256>::new(None, &shared)
            .expand(&[], &mut key[..])
            .map_err(|e| SecretError::HandshakeFailed(format!("Key derivation failed: {e}")))?;
        Ok(key)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_len", &self.public.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_fills_a_single_allocation() {
        let padded = to_padded_bytes(&BigUint::from(0x0102_u32));
        assert_eq!(padded.len(), PRIME_LEN);
        assert_eq!(padded.capacity(), PRIME_LEN);
        assert!(padded[..PRIME_LEN - 2].iter().all(|b| *b == 0));
        assert_eq!(&padded[PRIME_LEN - 2..], &[0x01, 0x02]);

        let full = BigUint::from_bytes_be(&[0xff; PRIME_LEN]);
        let padded = to_padded_bytes(&full);
        assert_eq!(padded.capacity(), PRIME_LEN);
        assert!(padded.iter().all(|b| *b == 0xff));
    }

    #[test]
    fn test_both_sides_derive_the_same_key() {
        let rng = SystemRandom::new();
        let client = KeyPair::generate(&rng).unwrap();
        let server = KeyPair::generate(&rng).unwrap();

        let client_key = client.derive_aes_key(server.public_key()).unwrap();
        let server_key = server.derive_aes_key(client.public_key()).unwrap();
        assert_eq!(*client_key, *server_key);
    }

    #[test]
    fn test_public_key_is_prime_length() {
        let rng = SystemRandom::new();
        let pair = KeyPair::generate(&rng).unwrap();
        assert_eq!(pair.public_key().len(), PRIME_LEN);
    }

    #[test]
    fn test_rejects_degenerate_peer_keys() {
        let rng = SystemRandom::new();
        let pair = KeyPair::generate(&rng).unwrap();

        assert!(pair.derive_aes_key(&[]).is_err());
        assert!(pair.derive_aes_key(&[1]).is_err());
        assert!(pair.derive_aes_key(&MODP_1024_PRIME).is_err());
        assert!(pair.derive_aes_key(&[0u8; PRIME_LEN + 1]).is_err());
    }

    #[test]
    fn test_short_peer_key_is_accepted() {
        // Services may strip leading zero bytes from their public key
        let rng = SystemRandom::new();
        let pair = KeyPair::generate(&rng).unwrap();
        assert!(pair.derive_aes_key(&[0x02, 0x01]).is_ok());
    }
}
