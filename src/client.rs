use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use crate::config::{AgsConfig, endpoints, launcher};
use crate::errors::{AgsError, Result};
use crate::models::*;
use crate::session::TokenPair;

fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}

/// HTTP client for the device-registration, token and entitlement endpoints
#[derive(Debug, Clone)]
pub struct DeviceClient {
    config: AgsConfig,
    http: Client,
}

impl DeviceClient {
    pub fn new(config: AgsConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.http_timeouts.connect)
            .timeout(config.http_timeouts.request)
            .build()?;

        Ok(Self { config, http })
    }

    /// Build the interactive signin URL. Parameter order matches the launcher,
    /// with `openid.oa2.code_challenge` appended last.
    #[instrument(skip(self, code_challenge))]
    pub fn build_signin_url(&self, code_challenge: &str) -> Url {
        let mut url = self.config.signin_base.clone();
        url.query_pairs_mut()
            .append_pair("openid.ns", "http://specs.openid.net/auth/2.0")
            .append_pair(
                "openid.claimed_id",
                "http://specs.openid.net/auth/2.0/identifier_select",
            )
            .append_pair(
                "openid.identity",
                "http://specs.openid.net/auth/2.0/identifier_select",
            )
            .append_pair("openid.mode", "checkid_setup")
            .append_pair("openid.oa2.scope", "device_auth_access")
            .append_pair("openid.ns.oa2", "http://www.amazon.com/ap/ext/oauth/2")
            .append_pair("openid.oa2.response_type", "code")
            .append_pair("openid.oa2.code_challenge_method", "S256")
            .append_pair(
                "openid.oa2.client_id",
                &format!("device:{}", launcher::CLIENT_ID),
            )
            .append_pair("language", "en_US")
            .append_pair("marketPlaceId", launcher::MARKETPLACE_ID)
            .append_pair("openid.return_to", "https://www.amazon.com")
            .append_pair("openid.pape.max_auth_age", "0")
            .append_pair("openid.assoc_handle", launcher::ASSOC_HANDLE)
            .append_pair("pageId", launcher::ASSOC_HANDLE)
            .append_pair("openid.oa2.code_challenge", code_challenge);

        debug!("built signin URL");
        url
    }

    /// Exchange a one-time authorization code (plus the unhashed verifier it
    /// was bound to) for a bearer/refresh token pair. Persisting the result is
    /// the caller's job.
    #[instrument(skip_all)]
    pub async fn register_device(
        &self,
        authorization_code: &str,
        code_verifier: &str,
        device_serial: &str,
    ) -> Result<TokenPair> {
        let request = DeviceRegistrationRequest {
            auth_data: AuthData {
                authorization_code: authorization_code.to_string(),
                code_verifier: code_verifier.to_string(),
                code_algorithm: "SHA-256".to_string(),
                client_id: launcher::CLIENT_ID.to_string(),
                client_domain: "DeviceLegacy".to_string(),
                use_global_authentication: false,
            },
            registration_data: RegistrationData {
                app_name: self.config.app_name.clone(),
                app_version: self.config.app_version.clone(),
                device_model: self.config.device_model.clone(),
                device_serial: device_serial.to_string(),
                device_type: launcher::DEVICE_TYPE.to_string(),
                domain: "Device".to_string(),
                os_version: self.config.os_version.clone(),
            },
            requested_extensions: vec!["customer_info".to_string(), "device_info".to_string()],
            requested_token_type: vec!["bearer".to_string(), "mac_dms".to_string()],
        };

        debug!("registering device");
        let response = self
            .http
            .post(self.config.api_base.join(endpoints::REGISTER_PATH)?)
            .header("User-Agent", launcher::API_USER_AGENT)
            .json(&request)
            .send()
            .await?;

        let body = response.text().await?;

        // Success is only a parseable payload with the full bearer branch;
        // error payloads, malformed JSON and empty success all reject.
        let parsed: DeviceRegistrationResponse =
            serde_json::from_str(&body).map_err(|_| AgsError::RegistrationFailed(snippet(&body)))?;

        parsed
            .response
            .and_then(|r| r.success)
            .and_then(|s| s.tokens)
            .and_then(|t| t.bearer)
            .ok_or_else(|| AgsError::RegistrationFailed(snippet(&body)))
    }

    /// Exchange a refresh token for a new access token. Failure means the
    /// stored credential can no longer be trusted, not a transient fault.
    #[instrument(skip_all)]
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<String> {
        let request = TokenRefreshRequest {
            app_name: self.config.refresh_app_name.clone(),
            app_version: self.config.refresh_app_version.clone(),
            source_token: refresh_token.to_string(),
            source_token_type: "refresh_token".to_string(),
            requested_token_type: "access_token".to_string(),
        };

        debug!("refreshing access token");
        let response = self
            .http
            .post(self.config.api_base.join(endpoints::TOKEN_PATH)?)
            .header("Expect", "100-continue")
            .json(&request)
            .send()
            .await?;

        let body = response.text().await?;
        let parsed: TokenRefreshResponse =
            serde_json::from_str(&body).map_err(|_| AgsError::RefreshFailed(snippet(&body)))?;

        parsed
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AgsError::RefreshFailed(snippet(&body)))
    }

    /// Probe the profile endpoint with a fresh access token. Returns the user
    /// id when the response carries a non-empty one; any other shape is
    /// simply "no user".
    #[instrument(skip_all)]
    pub async fn fetch_profile(&self, access_token: &str) -> Result<Option<String>> {
        debug!("fetching user profile");
        let response = self
            .http
            .get(self.config.api_base.join(endpoints::PROFILE_PATH)?)
            .header("User-Agent", launcher::API_USER_AGENT)
            .header("Authorization", format!("bearer {access_token}"))
            .header("Accept", "application/json")
            .send()
            .await?;

        let body = response.text().await?;
        let user_id = serde_json::from_str::<ProfileResponse>(&body)
            .ok()
            .and_then(|profile| profile.user_id)
            .filter(|id| !id.is_empty());

        Ok(user_id)
    }

    /// Fetch one page of entitlements. The bearer token travels in the custom
    /// `x-amzn-token` header, not `Authorization`.
    #[instrument(skip(self, access_token, request))]
    pub async fn fetch_entitlement_page(
        &self,
        access_token: &str,
        request: &EntitlementsRequest,
    ) -> Result<EntitlementsResponse> {
        debug!(
            continuation = request.next_token.is_some(),
            "fetching entitlement page"
        );
        let response = self
            .http
            .post(self.config.gaming_base.join(endpoints::ENTITLEMENTS_PATH)?)
            .header("User-Agent", launcher::ENTITLEMENTS_USER_AGENT)
            .header("X-Amz-Target", launcher::ENTITLEMENTS_TARGET)
            .header("x-amzn-token", access_token)
            .header("Expect", "100-continue")
            .header("Content-Encoding", "amz-1.0")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AgsError::Http {
                status,
                body_snippet: snippet(&body),
            });
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_client() -> DeviceClient {
        let dir = TempDir::new().unwrap();
        DeviceClient::new(AgsConfig::launcher_defaults(dir.path())).unwrap()
    }

    #[test]
    fn signin_url_ends_with_the_code_challenge() {
        let client = test_client();
        let url = client.build_signin_url("hashed-verifier");

        let query = url.query().unwrap();
        assert!(query.ends_with("openid.oa2.code_challenge=hashed-verifier"));
        assert!(query.contains("openid.assoc_handle=amzn_sonic_games_launcher"));
        assert!(query.contains("pageId=amzn_sonic_games_launcher"));
        assert!(query.contains("openid.oa2.code_challenge_method=S256"));
    }

    #[test]
    fn signin_url_client_id_carries_the_device_prefix() {
        let client = test_client();
        let url = client.build_signin_url("c");

        let client_id = url
            .query_pairs()
            .find(|(k, _)| k == "openid.oa2.client_id")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert_eq!(client_id, format!("device:{}", launcher::CLIENT_ID));
    }
}
