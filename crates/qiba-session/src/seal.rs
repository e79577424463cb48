//! Tamper-evident session payloads.
//!
//! Sealing encrypts a payload and attaches an integrity tag, so data handed
//! to the client can later be checked for tampering. The [`Sealer`] trait
//! is the seam; [`AesGcmSealer`] is the implementation the server uses.
//!
//! # Format
//!
//! ```text
//! enc_key = SHA-256("qiba-seal/enc" ‖ key)
//! mac_key = SHA-256("qiba-seal/mac" ‖ key)
//! data    = base64( nonce (12 bytes) ‖ AES-256-GCM(enc_key) ciphertext )
//! tag     = base64( HMAC-SHA256(mac_key, nonce ‖ ciphertext) )
//! ```
//!
//! The cipher and the MAC never see the same key bytes. The tag covers the
//! ciphertext, not the plaintext, so [`Sealer::verify`] checks a payload
//! without decrypting it.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use qiba_protocol::SealedPayload;
use rand::Rng;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Length of a seal key in bytes (AES-256).
pub const KEY_LEN: usize = 32;

const NONCE_LEN: usize = 12;

const ENC_LABEL: &[u8] = b"qiba-seal/enc";
const MAC_LABEL: &[u8] = b"qiba-seal/mac";

/// Errors that can occur while sealing or opening a payload.
#[derive(Debug, thiserror::Error)]
pub enum SealError {
    /// The key is not [`KEY_LEN`] bytes long.
    #[error("seal key must be 32 bytes, got {0}")]
    InvalidKey(usize),

    /// `data` or `tag` is not valid base64.
    #[error("sealed payload is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// `data` is too short to hold a nonce.
    #[error("sealed payload is truncated")]
    Truncated,

    /// The tag does not match the data.
    #[error("sealed payload failed integrity check")]
    TagMismatch,

    /// The cipher rejected the operation.
    #[error("cipher failure")]
    Cipher,
}

/// Authenticated sealing of opaque payloads.
///
/// Every call to [`seal`](Sealer::seal) uses a fresh nonce, so sealing the
/// same payload twice gives two different results.
pub trait Sealer: Send + Sync + 'static {
    /// Encrypts `payload` and tags the result.
    fn seal(&self, payload: &[u8]) -> Result<SealedPayload, SealError>;

    /// Checks the tag against the data without decrypting.
    fn verify(&self, sealed: &SealedPayload) -> Result<(), SealError>;

    /// Verifies, then decrypts.
    fn open(&self, sealed: &SealedPayload) -> Result<Vec<u8>, SealError>;
}

/// Generates a random seal key.
pub fn generate_key() -> [u8; KEY_LEN] {
    rand::rng().random()
}

/// Derives a purpose-bound subkey from the master key.
fn subkey(key: &[u8; KEY_LEN], label: &[u8]) -> [u8; KEY_LEN] {
    Sha256::new()
        .chain_update(label)
        .chain_update(key)
        .finalize()
        .into()
}

/// AES-256-GCM encryption with an HMAC-SHA256 tag, each under its own
/// subkey of one master key.
pub struct AesGcmSealer {
    cipher: Aes256Gcm,
    mac_key: [u8; KEY_LEN],
}

impl AesGcmSealer {
    /// Creates a sealer from a 32-byte master key.
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        let enc_key = subkey(&key, ENC_LABEL);
        Self {
            cipher: <Aes256Gcm as KeyInit>::new(Key::<Aes256Gcm>::from_slice(&enc_key)),
            mac_key: subkey(&key, MAC_LABEL),
        }
    }

    /// Creates a sealer from a key of unchecked length.
    ///
    /// # Errors
    /// [`SealError::InvalidKey`] unless `key` is exactly [`KEY_LEN`] bytes.
    pub fn from_slice(key: &[u8]) -> Result<Self, SealError> {
        let key: [u8; KEY_LEN] = key
            .try_into()
            .map_err(|_| SealError::InvalidKey(key.len()))?;
        Ok(Self::new(key))
    }

    /// Creates a sealer with a freshly generated key.
    pub fn generate() -> Self {
        Self::new(generate_key())
    }

    fn mac(&self) -> Result<HmacSha256, SealError> {
        <HmacSha256 as Mac>::new_from_slice(&self.mac_key)
            .map_err(|_| SealError::InvalidKey(self.mac_key.len()))
    }

    /// Decodes `data` and checks the tag, returning `nonce ‖ ciphertext`.
    fn checked_bytes(&self, sealed: &SealedPayload) -> Result<Vec<u8>, SealError> {
        let framed = BASE64.decode(&sealed.data)?;
        let tag = BASE64.decode(&sealed.tag)?;

        let mut mac = self.mac()?;
        mac.update(&framed);
        mac.verify_slice(&tag).map_err(|_| SealError::TagMismatch)?;
        Ok(framed)
    }
}

impl Sealer for AesGcmSealer {
    fn seal(&self, payload: &[u8]) -> Result<SealedPayload, SealError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, payload)
            .map_err(|_| SealError::Cipher)?;

        let mut framed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        framed.extend_from_slice(&nonce);
        framed.extend_from_slice(&ciphertext);

        let mut mac = self.mac()?;
        mac.update(&framed);
        let tag = mac.finalize().into_bytes();

        Ok(SealedPayload {
            data: BASE64.encode(&framed),
            tag: BASE64.encode(tag),
        })
    }

    fn verify(&self, sealed: &SealedPayload) -> Result<(), SealError> {
        self.checked_bytes(sealed).map(|_| ())
    }

    fn open(&self, sealed: &SealedPayload) -> Result<Vec<u8>, SealError> {
        let framed = self.checked_bytes(sealed)?;
        if framed.len() < NONCE_LEN {
            return Err(SealError::Truncated);
        }
        let (nonce, ciphertext) = framed.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| SealError::Cipher)
    }
}
