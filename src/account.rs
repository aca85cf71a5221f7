use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::client::DeviceClient;
use crate::config::{AgsConfig, launcher};
use crate::crypto;
use crate::device;
use crate::errors::{AgsError, Result};
use crate::models::{Entitlement, EntitlementsRequest};
use crate::session::TokenPair;
use crate::store::CredentialStore;
use crate::surface::InteractiveSurface;

/// Result of an interactive login attempt. Closing the signin window without
/// completing the redirect is not an error, but it is not success either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    LoggedIn,
    Abandoned,
}

/// Session-lifecycle orchestrator: interactive login, silent refresh, the
/// logged-in probe, and paginated entitlement retrieval.
///
/// All operations take an internal mutex for their full duration, so
/// concurrent calls cannot race on the credential file.
pub struct AccountClient {
    config: AgsConfig,
    client: DeviceClient,
    store: Arc<dyn CredentialStore>,
    surface: Arc<dyn InteractiveSurface>,
    flow: Mutex<()>,
}

impl AccountClient {
    pub fn new(
        config: AgsConfig,
        store: Arc<dyn CredentialStore>,
        surface: Arc<dyn InteractiveSurface>,
    ) -> Result<Self> {
        let client = DeviceClient::new(config.clone())?;
        Ok(Self {
            config,
            client,
            store,
            surface,
            flow: Mutex::new(()),
        })
    }

    /// Run the interactive login flow. Any previously stored credential is
    /// discarded first, so a failed attempt never leaves stale partial state.
    #[instrument(skip(self))]
    pub async fn login(&self) -> Result<LoginOutcome> {
        let _flow = self.flow.lock().await;

        let verifier = crypto::generate_code_verifier();
        self.store.delete().await?;
        self.surface
            .delete_domain_cookies(launcher::COOKIE_DOMAIN)
            .await?;

        let challenge = crypto::sha256_base64url(&verifier);
        let signin_url = self.client.build_signin_url(&challenge);

        let redirect = self
            .surface
            .capture_redirect(
                signin_url,
                launcher::SIGNIN_USER_AGENT,
                launcher::AUTHORIZATION_CODE_PARAM,
            )
            .await?;

        let Some(redirect) = redirect else {
            debug!("signin surface closed without a redirect, login abandoned");
            return Ok(LoginOutcome::Abandoned);
        };

        let code = extract_authorization_code(&redirect)?;
        let serial = device::machine_serial(&self.config.storage_dir)?;
        let tokens = self.client.register_device(&code, &verifier, &serial).await?;
        self.store.save(&tokens).await?;

        debug!("login complete, tokens persisted");
        Ok(LoginOutcome::LoggedIn)
    }

    /// Refresh the session and probe the profile endpoint. False means no
    /// usable credential or no user id; a rejected refresh is an error, since
    /// the stored credential can no longer be trusted.
    #[instrument(skip(self))]
    pub async fn is_user_logged_in(&self) -> Result<bool> {
        let _flow = self.flow.lock().await;
        self.probe_logged_in().await
    }

    /// Retrieve the complete owned-entitlement list, following continuation
    /// tokens until the server stops returning one.
    #[instrument(skip(self))]
    pub async fn entitlements(&self) -> Result<Vec<Entitlement>> {
        let _flow = self.flow.lock().await;

        if !self.probe_logged_in().await? {
            return Err(AgsError::NotAuthenticated);
        }

        // The refresh above just rewrote the blob, so a missing credential
        // here means it was deleted out from under us.
        let tokens = self
            .store
            .load()
            .await?
            .ok_or(AgsError::NotAuthenticated)?;

        let mut request = EntitlementsRequest {
            key_id: launcher::ENTITLEMENTS_KEY_ID.to_string(),
            hardware_hash: Uuid::new_v4().simple().to_string(),
            next_token: None,
        };

        let mut entitlements = Vec::new();
        for _ in 0..self.config.max_entitlement_pages {
            let page = self
                .client
                .fetch_entitlement_page(&tokens.access_token, &request)
                .await?;

            entitlements.extend(page.entitlements);

            match page.next_token.filter(|token| !token.is_empty()) {
                Some(next) => request.next_token = Some(next),
                None => {
                    debug!(count = entitlements.len(), "entitlement listing complete");
                    return Ok(entitlements);
                }
            }
        }

        Err(AgsError::EntitlementPagesExceeded(
            self.config.max_entitlement_pages,
        ))
    }

    /// Load the stored credential, treating corruption as logged out.
    async fn load_tolerant(&self) -> Result<Option<TokenPair>> {
        match self.store.load().await {
            Ok(tokens) => Ok(tokens),
            Err(AgsError::CredentialsCorrupted) => {
                warn!("stored credentials could not be decrypted, treating as logged out");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Refresh the access token and persist the updated pair. `None` when no
    /// credential is stored.
    async fn refreshed_tokens(&self) -> Result<Option<TokenPair>> {
        let Some(mut tokens) = self.load_tolerant().await? else {
            return Ok(None);
        };

        tokens.access_token = self
            .client
            .refresh_access_token(&tokens.refresh_token)
            .await?;
        self.store.save(&tokens).await?;

        Ok(Some(tokens))
    }

    async fn probe_logged_in(&self) -> Result<bool> {
        let Some(tokens) = self.refreshed_tokens().await? else {
            return Ok(false);
        };

        let user_id = self.client.fetch_profile(&tokens.access_token).await?;
        Ok(user_id.is_some())
    }
}

fn extract_authorization_code(redirect: &str) -> Result<String> {
    let url = Url::parse(redirect)?;
    url.query_pairs()
        .find(|(key, _)| key == launcher::AUTHORIZATION_CODE_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())
        .ok_or(AgsError::MissingAuthorizationCode)
}
