//! Backend client for the Amazon Games account service.
//!
//! Authenticates a user through the launcher's browser-redirect
//! device-registration flow, keeps the resulting token pair encrypted on
//! disk, refreshes it silently, and lists the account's owned entitlements.
//! Rendering the signin page is not this crate's job: callers inject an
//! [`InteractiveSurface`] that can load a URL and report the redirect.
//!
//! # Flow
//!
//! 1. `login()` clears prior state, opens the signin page with a fresh PKCE
//!    challenge, captures the authorization code from the redirect, and
//!    exchanges it at the device-registration endpoint.
//! 2. `is_user_logged_in()` refreshes the access token and probes the profile
//!    endpoint.
//! 3. `entitlements()` pages through the distribution service with the
//!    refreshed token until the continuation token runs out.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ags_account::{
//!     AccountClient, AgsConfig, FileCredentialStore, InteractiveSurface, OsUserIdentity,
//! };
//!
//! # async fn example(surface: Arc<dyn InteractiveSurface>) -> ags_account::Result<()> {
//! let storage_dir = FileCredentialStore::default_storage_dir()?;
//! let store = Arc::new(
//!     FileCredentialStore::new(&storage_dir, Arc::new(OsUserIdentity)).await?,
//! );
//! let client = AccountClient::new(AgsConfig::launcher_defaults(storage_dir), store, surface)?;
//!
//! if client.is_user_logged_in().await? {
//!     for entitlement in client.entitlements().await? {
//!         println!("{entitlement:?}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Tokens are stored AES-256-GCM encrypted, keyed to the OS user identity, so
//! the file is unreadable when copied to another account or machine.

pub mod account;
pub mod client;
pub mod config;
pub mod crypto;
pub mod device;
pub mod errors;
pub mod file_store;
pub mod identity;
pub mod key_manager;
pub mod models;
pub mod session;
pub mod store;
pub mod surface;

pub use account::{AccountClient, LoginOutcome};
pub use client::DeviceClient;
pub use config::{AgsConfig, HttpTimeouts};
pub use errors::{AgsError, Result};
pub use file_store::FileCredentialStore;
pub use identity::{IdentityProvider, OsUserIdentity, StaticIdentity};
pub use models::{Entitlement, EntitlementsRequest, EntitlementsResponse};
pub use session::TokenPair;
pub use store::{CredentialStore, MemoryCredentialStore};
pub use surface::InteractiveSurface;
