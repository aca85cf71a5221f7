use zeroize::Zeroizing;

/// Source of the protection key the credential file is bound to.
///
/// The original dependency here is the ambient "current OS user"; making it a
/// trait keeps the binding explicit and lets tests supply a fixed identity.
/// The key is an identity marker, not a secret: it ties the encrypted file to
/// the local account so a copy is unreadable elsewhere.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn identity_key(&self) -> Zeroizing<String>;
}

/// Identity of the OS user running the process
#[derive(Debug, Clone, Default)]
pub struct OsUserIdentity;

#[async_trait::async_trait]
impl IdentityProvider for OsUserIdentity {
    async fn identity_key(&self) -> Zeroizing<String> {
        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown-user".to_string());
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_default();

        Zeroizing::new(format!(
            "os={}|user={}|home={}",
            std::env::consts::OS,
            user,
            home
        ))
    }
}

/// Fixed identity for tests
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    key: String,
}

impl StaticIdentity {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

#[async_trait::async_trait]
impl IdentityProvider for StaticIdentity {
    async fn identity_key(&self) -> Zeroizing<String> {
        Zeroizing::new(self.key.clone())
    }
}
