//! At-rest encryption of chat message bodies using AES-256-GCM.
//!
//! Stored format: `base64(nonce[12] || ciphertext || tag[16])`.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::Sha256;
use tracing::warn;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const PBKDF2_ITERATIONS: u32 = 100_000;
const PBKDF2_SALT: &[u8] = b"chat-service.message-content.v1";

#[derive(Debug, thiserror::Error)]
pub enum EncryptionError {
    #[error("Failed to encrypt message content")]
    Encrypt,

    #[error("Failed to decrypt message content")]
    Decrypt,

    #[error("Stored message content is malformed")]
    Malformed,
}

pub struct MessageCipher {
    cipher: Aes256Gcm,
}

impl MessageCipher {
    pub fn new(master_key: &str) -> Self {
        let key = derive_key(master_key);
        Self {
            cipher: Aes256Gcm::new(&key),
        }
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| EncryptionError::Encrypt)?;

        let mut payload = Vec::with_capacity(NONCE_LEN + sealed.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&sealed);
        Ok(STANDARD.encode(payload))
    }

    pub fn decrypt(&self, stored: &str) -> Result<String, EncryptionError> {
        let payload = STANDARD
            .decode(stored)
            .map_err(|_| EncryptionError::Malformed)?;
        if payload.len() < NONCE_LEN + TAG_LEN {
            return Err(EncryptionError::Malformed);
        }

        // the aead api expects the tag appended to the ciphertext
        let (nonce, sealed) = payload.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| EncryptionError::Decrypt)?;
        String::from_utf8(plaintext).map_err(|_| EncryptionError::Decrypt)
    }

    /// Save-path guard: content that already decrypts under the master key is
    /// kept as is, anything else is treated as plaintext and encrypted.
    pub fn ensure_encrypted(&self, content: &str) -> Result<String, EncryptionError> {
        match self.decrypt(content) {
            Ok(_) => Ok(content.to_owned()),
            Err(_) => self.encrypt(content),
        }
    }

    /// Read-path accessor. Content that cannot be decrypted is returned raw.
    pub fn decrypt_or_raw(&self, stored: &str) -> String {
        match self.decrypt(stored) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                warn!("Returning raw message content: {e}");
                stored.to_owned()
            }
        }
    }
}

fn derive_key(master_key: &str) -> Key<Aes256Gcm> {
    let secret = master_key.as_bytes();
    let mut key_bytes = [0u8; KEY_LEN];
    if secret.len() == KEY_LEN {
        key_bytes.copy_from_slice(secret);
    } else {
        pbkdf2::pbkdf2_hmac::<Sha256>(secret, PBKDF2_SALT, PBKDF2_ITERATIONS, &mut key_bytes);
    }
    Key::<Aes256Gcm>::from(key_bytes)
}
