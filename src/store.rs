use std::sync::{Arc, RwLock};

use crate::errors::{AgsError, Result};
use crate::session::TokenPair;

/// Persistence seam for the token pair.
///
/// `load` distinguishes "never logged in" (`Ok(None)`) from a stored
/// credential that cannot be decrypted (`Err(CredentialsCorrupted)`).
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> Result<Option<TokenPair>>;

    async fn save(&self, tokens: &TokenPair) -> Result<()>;

    /// Idempotent; called at the start of every login attempt.
    async fn delete(&self) -> Result<()>;
}

/// In-memory credential store for tests and simple use cases
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    tokens: Arc<RwLock<Option<TokenPair>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<TokenPair>> {
        Ok(self
            .tokens
            .read()
            .map_err(|_| AgsError::InvalidResponse("lock poisoned".to_string()))?
            .clone())
    }

    async fn save(&self, tokens: &TokenPair) -> Result<()> {
        *self
            .tokens
            .write()
            .map_err(|_| AgsError::InvalidResponse("lock poisoned".to_string()))? =
            Some(tokens.clone());
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        *self
            .tokens
            .write()
            .map_err(|_| AgsError::InvalidResponse("lock poisoned".to_string()))? = None;
        Ok(())
    }
}
