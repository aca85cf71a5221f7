use std::path::Path;
use std::sync::Arc;

use argon2::{
    Argon2, Params,
    password_hash::{PasswordHasher, SaltString},
};
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::crypto::EncryptionKey;
use crate::errors::{AgsError, Result};
use crate::identity::IdentityProvider;

const SALT_LEN: usize = 32;
const META_FILE: &str = "meta.json";

/// Metadata for key derivation and storage format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyMeta {
    pub version: u32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Base64-encoded salt for Argon2id
    pub salt: String,
}

/// Derives the file-encryption key from the caller's identity key.
///
/// The salt is generated once per install and persisted in `meta.json`, so the
/// same identity always re-derives the same key while a different OS account
/// lands on a key that fails decryption.
pub struct KeyManager {
    meta: KeyMeta,
    key: EncryptionKey,
}

impl KeyManager {
    pub async fn new(storage_dir: &Path, identity: Arc<dyn IdentityProvider>) -> Result<Self> {
        let meta_path = storage_dir.join(META_FILE);

        let meta = if meta_path.exists() {
            let content = fs::read_to_string(&meta_path).await?;
            serde_json::from_str(&content)
                .map_err(|e| AgsError::InvalidResponse(format!("invalid meta.json: {e}")))?
        } else {
            let meta = KeyMeta {
                version: 1,
                created_at: chrono::Utc::now(),
                salt: new_salt(),
            };
            let meta_json = serde_json::to_string_pretty(&meta)?;
            fs::write(&meta_path, meta_json).await?;
            meta
        };

        let identity_key = identity.identity_key().await;
        let key = derive_key(&identity_key, &meta.salt)?;

        Ok(Self { meta, key })
    }

    pub fn key(&self) -> &EncryptionKey {
        &self.key
    }

    pub fn meta(&self) -> &KeyMeta {
        &self.meta
    }
}

fn new_salt() -> String {
    let mut salt = vec![0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    base64::engine::general_purpose::STANDARD.encode(&salt)
}

/// Argon2id with m=64MiB, t=3, p=1, 32-byte output
fn derive_key(identity_key: &str, salt_b64: &str) -> Result<EncryptionKey> {
    let salt = base64::engine::general_purpose::STANDARD
        .decode(salt_b64)
        .map_err(|_| AgsError::CredentialsCorrupted)?;

    let params = Params::new(65536, 3, 1, Some(32))
        .map_err(|e| AgsError::Crypto(format!("invalid Argon2 params: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let salt_string = SaltString::encode_b64(&salt)
        .map_err(|e| AgsError::Crypto(format!("invalid salt: {e}")))?;

    let hash = argon2
        .hash_password(identity_key.as_bytes(), &salt_string)
        .map_err(|e| AgsError::Crypto(format!("key derivation failed: {e}")))?;

    let hash_bytes = hash
        .hash
        .ok_or_else(|| AgsError::Crypto("Argon2 produced no output".to_string()))?;

    if hash_bytes.len() != 32 {
        return Err(AgsError::Crypto(format!(
            "expected 32 bytes, got {}",
            hash_bytes.len()
        )));
    }

    let mut key = [0u8; 32];
    key.copy_from_slice(hash_bytes.as_bytes());
    Ok(EncryptionKey::from_bytes(key))
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("meta", &self.meta)
            .field("key", &"[REDACTED]")
            .finish()
    }
}
