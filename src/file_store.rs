use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use tokio::fs;

use crate::crypto::{self, EncryptedBlob};
use crate::errors::{AgsError, Result};
use crate::identity::IdentityProvider;
use crate::key_manager::KeyManager;
use crate::session::TokenPair;
use crate::store::CredentialStore;

const TOKENS_FILE: &str = "tokens.json";
const LOCK_FILE: &str = "lock";

/// File-based encrypted credential store.
///
/// Holds one token file, encrypted with a key derived from the caller's
/// identity, so the file is unreadable under a different OS account.
///
/// # Directory structure
/// ```text
/// <storage_dir>/
/// ├── meta.json       # key-derivation metadata (salt)
/// ├── lock            # advisory lock file
/// ├── device_serial   # fallback machine serial
/// └── tokens.json     # the encrypted token pair
/// ```
#[derive(Debug)]
pub struct FileCredentialStore {
    tokens_path: PathBuf,
    lock_path: PathBuf,
    key_manager: KeyManager,
}

impl FileCredentialStore {
    pub async fn new(
        storage_dir: impl AsRef<Path>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        fs::create_dir_all(&storage_dir).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            std::fs::set_permissions(&storage_dir, perms)?;
        }

        let key_manager = KeyManager::new(&storage_dir, identity).await?;

        Ok(Self {
            tokens_path: storage_dir.join(TOKENS_FILE),
            lock_path: storage_dir.join(LOCK_FILE),
            key_manager,
        })
    }

    /// Default storage directory for the current platform
    pub fn default_storage_dir() -> Result<PathBuf> {
        let project_dirs = directories::ProjectDirs::from("", "", "ags-account").ok_or_else(
            || AgsError::InvalidResponse("could not determine config directory".to_string()),
        )?;

        Ok(project_dirs.config_dir().to_path_buf())
    }

    fn acquire_lock(&self) -> Result<std::fs::File> {
        let lock_file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| AgsError::StoreLocked)?;

        Ok(lock_file)
    }
}

#[async_trait::async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<TokenPair>> {
        let content = match fs::read_to_string(&self.tokens_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let encrypted: EncryptedBlob =
            serde_json::from_str(&content).map_err(|_| AgsError::CredentialsCorrupted)?;

        let plaintext = crypto::decrypt(self.key_manager.key(), &encrypted)?;

        let tokens: TokenPair =
            serde_json::from_slice(&plaintext).map_err(|_| AgsError::CredentialsCorrupted)?;

        Ok(Some(tokens))
    }

    async fn save(&self, tokens: &TokenPair) -> Result<()> {
        let _lock = self.acquire_lock()?;

        let plaintext = serde_json::to_vec(tokens)?;
        let encrypted = crypto::encrypt(self.key_manager.key(), &plaintext)?;
        let encrypted_json = serde_json::to_string_pretty(&encrypted)?;

        // Atomic overwrite: temp file, fsync, rename. A crash mid-refresh
        // leaves the previous blob (and its refresh token) intact.
        let temp_path = self.tokens_path.with_extension("tmp");
        fs::write(&temp_path, encrypted_json).await?;

        let file = std::fs::File::open(&temp_path)?;
        file.sync_all()?;

        fs::rename(&temp_path, &self.tokens_path).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.tokens_path, perms)?;
        }

        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        let _lock = self.acquire_lock()?;

        match fs::remove_file(&self.tokens_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
