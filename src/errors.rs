use thiserror::Error;

/// Errors produced by the account client
#[derive(Error, Debug)]
pub enum AgsError {
    #[error("not authenticated - interactive login required")]
    NotAuthenticated,

    #[error("device registration rejected: {0}")]
    RegistrationFailed(String),

    #[error("token refresh rejected: {0}")]
    RefreshFailed(String),

    #[error("stored credentials could not be decrypted")]
    CredentialsCorrupted,

    #[error("redirect captured without an authorization code")]
    MissingAuthorizationCode,

    #[error("entitlement pagination exceeded {0} pages without a final page")]
    EntitlementPagesExceeded(u32),

    #[error("credential store is locked by another process")]
    StoreLocked,

    #[error("crypto failure: {0}")]
    Crypto(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error {status}: {body_snippet}")]
    Http {
        status: reqwest::StatusCode,
        body_snippet: String,
    },

    #[error("JSON serialization/deserialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, AgsError>;
