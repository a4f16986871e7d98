//! Encrypted transport between the client and the secret service
//!
//! [`TransportEncryption`] negotiates a session with the service and owns the
//! derived session key. Every [`Secret`] it produces is tagged with that
//! session, and it refuses to decrypt secrets tagged with any other.

use std::fmt;
use std::sync::Arc;

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zeroize::{Zeroize, Zeroizing};

use super::dh::{AES_KEY_LEN, KeyPair};
use crate::bus::{ObjectPath, SecretServiceBus};
use crate::error::{BusError, SecretError, SecretResult};
use crate::trace_operation;
use crate::tracing::span_names;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// Block size of AES, also the IV length
pub const AES_BLOCK_LEN: usize = 16;

/// Wire name of the Diffie-Hellman transport algorithm
pub const ALGORITHM_DH: &str = "dh-ietf1024-sha256-aes128-cbc-pkcs7";

/// Wire name of the unencrypted transport algorithm
pub const ALGORITHM_PLAIN: &str = "plain";

/// Content type attached to every secret this client sends
pub const CONTENT_TYPE: &str = "text/plain; charset=utf8";

/// Transport algorithm negotiated with the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransportAlgorithm {
    /// DH key agreement, HKDF-SHA256, AES-128-CBC with PKCS#7 padding
    #[default]
    #[serde(rename = "dh-ietf1024-sha256-aes128-cbc-pkcs7")]
    Dh,
    /// Secrets travel unencrypted inside the session
    #[serde(rename = "plain")]
    Plain,
}

impl TransportAlgorithm {
    /// Wire name of the algorithm
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dh => ALGORITHM_DH,
            Self::Plain => ALGORITHM_PLAIN,
        }
    }
}

impl fmt::Display for TransportAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransportAlgorithm {
    type Err = SecretError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ALGORITHM_DH => Ok(Self::Dh),
            ALGORITHM_PLAIN => Ok(Self::Plain),
            other => Err(SecretError::Validation(format!(
                "Unknown transport algorithm: {other}"
            ))),
        }
    }
}

/// A negotiated transport session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    path: ObjectPath,
}

impl Session {
    /// Object path of the session
    #[must_use]
    pub const fn path(&self) -> &ObjectPath {
        &self.path
    }
}

/// A secret as exchanged with the service
///
/// `value` is ciphertext under the DH transport and plaintext under the plain
/// transport. Parameters and value are zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret {
    session: ObjectPath,
    parameters: Vec<u8>,
    value: Vec<u8>,
    content_type: String,
}

impl Secret {
    /// Creates a secret with the default content type
    pub fn new(session: ObjectPath, parameters: Vec<u8>, value: Vec<u8>) -> Self {
        Self::with_content_type(session, parameters, value, CONTENT_TYPE)
    }

    /// Creates a secret with an explicit content type
    pub fn with_content_type(
        session: ObjectPath,
        parameters: Vec<u8>,
        value: Vec<u8>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            session,
            parameters,
            value,
            content_type: content_type.into(),
        }
    }

    /// Session the secret is bound to
    #[must_use]
    pub const fn session(&self) -> &ObjectPath {
        &self.session
    }

    /// Algorithm parameters (the IV for the DH transport)
    #[must_use]
    pub fn parameters(&self) -> &[u8] {
        &self.parameters
    }

    /// Encoded secret value
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Content type of the plaintext
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Overwrites parameters and value with zeros and empties them
    pub fn clear(&mut self) {
        self.parameters.zeroize();
        self.value.zeroize();
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("session", &self.session)
            .field("parameters_len", &self.parameters.len())
            .field("value", &"[REDACTED]")
            .field("content_type", &self.content_type)
            .finish()
    }
}

enum SessionKey {
    Aes(Zeroizing<[u8; AES_KEY_LEN]>),
    Plain,
}

/// Client side of the transport handshake and secret codec
///
/// Lifecycle: [`initialize`](Self::initialize), [`open_session`](Self::open_session),
/// [`generate_session_key`](Self::generate_session_key), then any number of
/// [`encrypt`](Self::encrypt)/[`decrypt`](Self::decrypt) calls until
/// [`clear`](Self::clear) or [`close`](Self::close).
pub struct TransportEncryption {
    bus: Arc<dyn SecretServiceBus>,
    algorithm: TransportAlgorithm,
    rng: SystemRandom,
    keypair: Option<KeyPair>,
    server_public: Option<Zeroizing<Vec<u8>>>,
    session: Option<Session>,
    key: Option<SessionKey>,
}

impl TransportEncryption {
    /// Creates an unnegotiated transport
    pub fn new(bus: Arc<dyn SecretServiceBus>, algorithm: TransportAlgorithm) -> Self {
        Self {
            bus,
            algorithm,
            rng: SystemRandom::new(),
            keypair: None,
            server_public: None,
            session: None,
            key: None,
        }
    }

    /// Runs the whole handshake
    ///
    /// # Errors
    /// Returns `SecretError::HandshakeFailed` if any step fails.
    pub fn establish(&mut self) -> SecretResult<&Session> {
        let span = trace_operation!(span_names::TRANSPORT_HANDSHAKE, algorithm = %self.algorithm);
        let _guard = span.enter();

        self.initialize()?;
        self.open_session()?;
        self.generate_session_key()?;
        self.session
            .as_ref()
            .ok_or_else(|| SecretError::HandshakeFailed("Session was not opened".to_string()))
    }

    /// Prepares the client parameters for the negotiated algorithm
    ///
    /// # Errors
    /// Returns `SecretError::HandshakeFailed` if key generation fails.
    pub fn initialize(&mut self) -> SecretResult<()> {
        match self.algorithm {
            TransportAlgorithm::Dh => {
                self.keypair = Some(KeyPair::generate(&self.rng)?);
            }
            TransportAlgorithm::Plain => self.keypair = None,
        }
        Ok(())
    }

    /// Opens a session, sending the client public key
    ///
    /// # Errors
    /// Returns `SecretError::HandshakeFailed` if the service rejects the
    /// algorithm or the call fails.
    pub fn open_session(&mut self) -> SecretResult<()> {
        let input: &[u8] = match (self.algorithm, &self.keypair) {
            (TransportAlgorithm::Dh, Some(keypair)) => keypair.public_key(),
            (TransportAlgorithm::Dh, None) => {
                return Err(SecretError::HandshakeFailed(
                    "Transport was not initialized".to_string(),
                ));
            }
            (TransportAlgorithm::Plain, _) => &[],
        };

        let (output, path) = self
            .bus
            .open_session(self.algorithm.as_str(), input)
            .map_err(|e| match e {
                BusError::NotSupported(_) => SecretError::HandshakeFailed(format!(
                    "Service rejected algorithm {}",
                    self.algorithm
                )),
                other => SecretError::HandshakeFailed(other.to_string()),
            })?;

        if path.is_root() {
            return Err(SecretError::HandshakeFailed(
                "Service returned no session".to_string(),
            ));
        }

        debug!(session = %path, algorithm = %self.algorithm, "Opened transport session");
        self.server_public = Some(Zeroizing::new(output));
        self.session = Some(Session { path });
        Ok(())
    }

    /// Derives the session key from the service's public key
    ///
    /// # Errors
    /// Returns `SecretError::HandshakeFailed` if no session is open or the
    /// service's public key is malformed.
    pub fn generate_session_key(&mut self) -> SecretResult<()> {
        if self.session.is_none() {
            return Err(SecretError::HandshakeFailed(
                "No session to derive a key for".to_string(),
            ));
        }

        let key = match self.algorithm {
            TransportAlgorithm::Plain => SessionKey::Plain,
            TransportAlgorithm::Dh => {
                let keypair = self.keypair.as_ref().ok_or_else(|| {
                    SecretError::HandshakeFailed("Transport was not initialized".to_string())
                })?;
                let server_public = self.server_public.as_ref().ok_or_else(|| {
                    SecretError::HandshakeFailed("Service sent no public key".to_string())
                })?;
                SessionKey::Aes(keypair.derive_aes_key(server_public)?)
            }
        };

        self.key = Some(key);
        // The private exponent is not needed once the key exists
        self.keypair = None;
        self.server_public = None;
        Ok(())
    }

    /// Encrypts a plaintext into a secret bound to the current session
    ///
    /// # Errors
    /// Returns `SecretError::EncryptionFailed` if no session key is available
    /// or encryption fails.
    pub fn encrypt(&self, plaintext: &[u8]) -> SecretResult<Secret> {
        let session = self.require_session()?;
        match self.require_key()? {
            SessionKey::Plain => Ok(Secret::new(
                session.path.clone(),
                Vec::new(),
                plaintext.to_vec(),
            )),
            SessionKey::Aes(key) => {
                let mut iv = [0u8; AES_BLOCK_LEN];
                self.rng.fill(&mut iv).map_err(|_| {
                    SecretError::EncryptionFailed("Failed to generate IV".to_string())
                })?;
                let ciphertext = aes_cbc_encrypt(key, &iv, plaintext)?;
                Ok(Secret::new(session.path.clone(), iv.to_vec(), ciphertext))
            }
        }
    }

    /// Decrypts a secret received from the service
    ///
    /// # Errors
    /// Returns `SecretError::EncryptionFailed` if the secret belongs to another
    /// session, the key has been cleared, or the ciphertext is malformed.
    pub fn decrypt(&self, secret: &Secret) -> SecretResult<Zeroizing<Vec<u8>>> {
        let session = self.require_session()?;
        if secret.session() != &session.path {
            return Err(SecretError::EncryptionFailed(format!(
                "Secret belongs to session {}, not {}",
                secret.session(),
                session.path
            )));
        }

        match self.require_key()? {
            SessionKey::Plain => Ok(Zeroizing::new(secret.value().to_vec())),
            SessionKey::Aes(key) => aes_cbc_decrypt(key, secret.parameters(), secret.value()),
        }
    }

    /// Discards the key pair and the session key
    ///
    /// The session stays open but can no longer encrypt or decrypt.
    pub fn clear(&mut self) {
        self.keypair = None;
        self.server_public = None;
        self.key = None;
    }

    /// Clears key material and closes the service-side session
    pub fn close(&mut self) {
        self.clear();
        if let Some(session) = self.session.take() {
            match self.bus.close_session(&session.path) {
                Ok(()) => debug!(session = %session.path, "Closed transport session"),
                Err(e) => warn!(session = %session.path, error = %e, "Failed to close session"),
            }
        }
    }

    /// The open session, if any
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The negotiated algorithm
    #[must_use]
    pub const fn algorithm(&self) -> TransportAlgorithm {
        self.algorithm
    }

    /// Whether a usable session key exists
    #[must_use]
    pub const fn has_session_key(&self) -> bool {
        self.key.is_some()
    }

    fn require_session(&self) -> SecretResult<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| SecretError::EncryptionFailed("No open session".to_string()))
    }

    fn require_key(&self) -> SecretResult<&SessionKey> {
        self.key
            .as_ref()
            .ok_or_else(|| SecretError::EncryptionFailed("Session key is not available".to_string()))
    }
}

impl fmt::Debug for TransportEncryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportEncryption")
            .field("algorithm", &self.algorithm)
            .field("session", &self.session)
            .field("has_session_key", &self.key.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for TransportEncryption {
    fn drop(&mut self) {
        self.clear();
    }
}

/// AES-128-CBC encryption with PKCS#7 padding
pub(crate) fn aes_cbc_encrypt(
    key: &[u8; AES_KEY_LEN],
    iv: &[u8; AES_BLOCK_LEN],
    plaintext: &[u8],
) -> SecretResult<Vec<u8>> {
    let cipher = Aes128CbcEnc::new_from_slices(key, iv)
        .map_err(|e| SecretError::EncryptionFailed(e.to_string()))?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

/// AES-128-CBC decryption with PKCS#7 padding
pub(crate) fn aes_cbc_decrypt(
    key: &[u8; AES_KEY_LEN],
    iv: &[u8],
    ciphertext: &[u8],
) -> SecretResult<Zeroizing<Vec<u8>>> {
    if iv.len() != AES_BLOCK_LEN {
        return Err(SecretError::EncryptionFailed(format!(
            "Invalid IV length {}",
            iv.len()
        )));
    }
    if ciphertext.is_empty() || ciphertext.len() % AES_BLOCK_LEN != 0 {
        return Err(SecretError::EncryptionFailed(format!(
            "Ciphertext length {} is not a positive multiple of the block size",
            ciphertext.len()
        )));
    }

    let cipher = Aes128CbcDec::new_from_slices(key, iv)
        .map_err(|e| SecretError::EncryptionFailed(e.to_string()))?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| SecretError::EncryptionFailed("Invalid padding".to_string()))
}
