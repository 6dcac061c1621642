//! field-level encryption of secret material.
//!
//! every secret byte string is sealed with chacha20-poly1305 under one
//! process-wide key. the stored form is `nonce (12 bytes) || ciphertext+tag`
//! with a fresh random nonce per call.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use zeroize::Zeroizing;

use coffer_types::SecretsConfig;

use crate::error::{Error, Result};

/// key length in bytes.
pub const KEY_SIZE: usize = 32;

/// nonce length in bytes.
pub const NONCE_SIZE: usize = 12;

/// authentication tag length in bytes.
pub const TAG_SIZE: usize = 16;

/// the process-wide secret cipher. the key is wiped on drop.
pub struct SecretCipher {
    key: Zeroizing<[u8; KEY_SIZE]>,
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher").finish_non_exhaustive()
    }
}

impl SecretCipher {
    /// create a cipher from raw key bytes.
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self {
            key: Zeroizing::new(key),
        }
    }

    /// create a cipher from a hex-encoded 32-byte key.
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let bytes = Zeroizing::new(
            hex::decode(key_hex.trim())
                .map_err(|e| Error::Crypto(format!("secret key is not valid hex: {e}")))?,
        );
        let key: [u8; KEY_SIZE] = bytes.as_slice().try_into().map_err(|_| {
            Error::Crypto(format!(
                "secret key must be {KEY_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self::new(key))
    }

    /// load the key named by the secrets config.
    ///
    /// `secret_key_file` wins over `secret_key_env` when both are set.
    pub fn load(config: &SecretsConfig) -> Result<Self> {
        let key_hex = match &config.secret_key_file {
            Some(path) => Zeroizing::new(std::fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("failed to read secret key file {path:?}: {e}"))
            })?),
            None => Zeroizing::new(std::env::var(&config.secret_key_env).map_err(|_| {
                Error::Config(format!(
                    "secret key environment variable {} is not set",
                    config.secret_key_env
                ))
            })?),
        };
        Self::from_hex(&key_hex)
    }

    /// generate a fresh random key, hex encoded.
    pub fn generate_key_hex() -> Zeroizing<String> {
        let key = Zeroizing::new(rand::random::<[u8; KEY_SIZE]>());
        Zeroizing::new(hex::encode(key.as_slice()))
    }

    fn aead(&self) -> Result<ChaCha20Poly1305> {
        ChaCha20Poly1305::new_from_slice(self.key.as_slice())
            .map_err(|e| Error::Crypto(format!("invalid key: {e}")))
    }

    /// seal `plaintext`, returning `nonce || ciphertext`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let nonce_bytes: [u8; NONCE_SIZE] = rand::random();
        let ciphertext = self
            .aead()?
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| Error::Crypto(format!("encryption failed: {e}")))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// open a value produced by [`SecretCipher::encrypt`].
    ///
    /// short input and tag mismatches are both `Error::Crypto`.
    pub fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        if sealed.len() < NONCE_SIZE + TAG_SIZE {
            return Err(Error::Crypto(format!(
                "ciphertext too short: {} bytes",
                sealed.len()
            )));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);

        self.aead()?
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| Error::Crypto("authentication failed".to_string()))
    }

    /// seal a utf-8 string.
    pub fn encrypt_str(&self, plaintext: &str) -> Result<Vec<u8>> {
        self.encrypt(plaintext.as_bytes())
    }

    /// open a sealed utf-8 string.
    pub fn decrypt_string(&self, sealed: &[u8]) -> Result<String> {
        String::from_utf8(self.decrypt(sealed)?)
            .map_err(|_| Error::Crypto("decrypted value is not utf-8".to_string()))
    }
}
