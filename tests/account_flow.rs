use std::sync::{Arc, Mutex};

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ags_account::{
    AccountClient, AgsConfig, AgsError, CredentialStore, FileCredentialStore, InteractiveSurface,
    LoginOutcome, MemoryCredentialStore, StaticIdentity, TokenPair,
};

/// Surface stand-in that immediately yields a pre-scripted redirect (or none,
/// simulating a user closing the window).
struct ScriptedSurface {
    redirect: Option<String>,
    last_url: Mutex<Option<Url>>,
}

impl ScriptedSurface {
    fn completing_with(redirect: &str) -> Self {
        Self {
            redirect: Some(redirect.to_string()),
            last_url: Mutex::new(None),
        }
    }

    fn abandoned() -> Self {
        Self {
            redirect: None,
            last_url: Mutex::new(None),
        }
    }
}

#[async_trait::async_trait]
impl InteractiveSurface for ScriptedSurface {
    async fn delete_domain_cookies(&self, _domain: &str) -> ags_account::Result<()> {
        Ok(())
    }

    async fn capture_redirect(
        &self,
        url: Url,
        _user_agent: &str,
        marker: &str,
    ) -> ags_account::Result<Option<String>> {
        *self.last_url.lock().unwrap() = Some(url);
        Ok(self.redirect.clone().filter(|r| r.contains(marker)))
    }
}

fn test_config(server: &MockServer, storage_dir: &std::path::Path) -> AgsConfig {
    let base = Url::parse(&server.uri()).unwrap();
    let mut config = AgsConfig::launcher_defaults(storage_dir);
    config.api_base = base.clone();
    config.gaming_base = base;
    config
}

#[tokio::test]
async fn login_exchanges_the_code_and_persists_the_tokens() {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(body_partial_json(json!({
            "auth_data": {
                "authorization_code": "code-1",
                "code_algorithm": "SHA-256",
                "client_domain": "DeviceLegacy"
            },
            "registration_data": {
                "device_type": "A2UMVHOX7UP4V7",
                "domain": "Device"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {
                "success": {
                    "tokens": {
                        "bearer": {
                            "access_token": "a1",
                            "refresh_token": "r1",
                            "expires_in": "3600"
                        }
                    }
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(
        FileCredentialStore::new(dir.path(), Arc::new(StaticIdentity::new("user-1")))
            .await
            .unwrap(),
    );
    let surface = Arc::new(ScriptedSurface::completing_with(
        "https://www.amazon.com/?openid.mode=id_res&openid.oa2.authorization_code=code-1",
    ));
    let client = AccountClient::new(
        test_config(&server, dir.path()),
        store.clone(),
        surface.clone(),
    )
    .unwrap();

    let outcome = client.login().await.unwrap();
    assert_eq!(outcome, LoginOutcome::LoggedIn);

    let stored = store.load().await.unwrap().unwrap();
    assert_eq!(stored.access_token, "a1");
    assert_eq!(stored.refresh_token, "r1");
    assert_eq!(stored.extra["expires_in"], "3600");

    // The surface was handed the signin URL with the hashed verifier last.
    let signin_url = surface.last_url.lock().unwrap().clone().unwrap();
    let query = signin_url.query().unwrap().to_string();
    assert!(query.contains("openid.oa2.code_challenge="));
    let challenge = signin_url
        .query_pairs()
        .find(|(k, _)| k == "openid.oa2.code_challenge")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    // base64url(SHA-256) is always 43 chars, never padded
    assert_eq!(challenge.len(), 43);
    assert!(!challenge.contains(['+', '/', '=']));
}

#[tokio::test]
async fn abandoned_login_is_a_silent_no_op() {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new().unwrap();

    let store = Arc::new(MemoryCredentialStore::new());
    let client = AccountClient::new(
        test_config(&server, dir.path()),
        store.clone(),
        Arc::new(ScriptedSurface::abandoned()),
    )
    .unwrap();

    let outcome = client.login().await.unwrap();
    assert_eq!(outcome, LoginOutcome::Abandoned);
    assert!(store.load().await.unwrap().is_none());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn login_discards_the_previous_credential_first() {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new().unwrap();

    let store = Arc::new(MemoryCredentialStore::new());
    store.save(&TokenPair::new("stale", "stale")).await.unwrap();

    let client = AccountClient::new(
        test_config(&server, dir.path()),
        store.clone(),
        Arc::new(ScriptedSurface::abandoned()),
    )
    .unwrap();

    assert_eq!(client.login().await.unwrap(), LoginOutcome::Abandoned);
    assert!(store.load().await.unwrap().is_none());
}

#[tokio::test]
async fn is_user_logged_in_is_false_without_a_credential() {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new().unwrap();

    let store = Arc::new(MemoryCredentialStore::new());
    let client = AccountClient::new(
        test_config(&server, dir.path()),
        store,
        Arc::new(ScriptedSurface::abandoned()),
    )
    .unwrap();

    assert!(!client.is_user_logged_in().await.unwrap());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn refresh_rewrites_the_access_token_and_keeps_the_refresh_token() {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .and(body_partial_json(json!({
            "source_token": "r1",
            "source_token_type": "refresh_token",
            "requested_token_type": "access_token"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access_token": "a2"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .and(header("Authorization", "bearer a2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user_id": "u1"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::new());
    store.save(&TokenPair::new("old", "r1")).await.unwrap();

    let client = AccountClient::new(
        test_config(&server, dir.path()),
        store.clone(),
        Arc::new(ScriptedSurface::abandoned()),
    )
    .unwrap();

    assert!(client.is_user_logged_in().await.unwrap());

    let stored = store.load().await.unwrap().unwrap();
    assert_eq!(stored.access_token, "a2");
    assert_eq!(stored.refresh_token, "r1");
}

#[tokio::test]
async fn rejected_refresh_surfaces_as_an_error_not_false() {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::new());
    store.save(&TokenPair::new("old", "r1")).await.unwrap();

    let client = AccountClient::new(
        test_config(&server, dir.path()),
        store,
        Arc::new(ScriptedSurface::abandoned()),
    )
    .unwrap();

    let result = client.is_user_logged_in().await;
    assert!(matches!(result, Err(AgsError::RefreshFailed(_))));
}

#[tokio::test]
async fn empty_profile_reads_as_logged_out() {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access_token": "a2"})),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::new());
    store.save(&TokenPair::new("old", "r1")).await.unwrap();

    let client = AccountClient::new(
        test_config(&server, dir.path()),
        store,
        Arc::new(ScriptedSurface::abandoned()),
    )
    .unwrap();

    assert!(!client.is_user_logged_in().await.unwrap());
    assert!(matches!(
        client.entitlements().await,
        Err(AgsError::NotAuthenticated)
    ));
}

async fn mount_session_mocks(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access_token": "a2"})),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user_id": "u1"})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn entitlements_concatenates_pages_in_order() {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new().unwrap();

    mount_session_mocks(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/distribution/entitlements"))
        .and(header("x-amzn-token", "a2"))
        .and(header(
            "X-Amz-Target",
            "com.amazon.animusdistributionservice.entitlement.AnimusEntitlementsService.GetEntitlements",
        ))
        .and(body_partial_json(json!({
            "keyId": "d5dc8b8b-86c8-4fc4-ae93-18c0def5314d",
            "nextToken": null
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entitlements": [{"id": "X"}, {"id": "Y"}],
            "nextToken": "t2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/distribution/entitlements"))
        .and(body_partial_json(json!({"nextToken": "t2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entitlements": [{"id": "Z"}],
            "nextToken": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::new());
    store.save(&TokenPair::new("old", "r1")).await.unwrap();

    let client = AccountClient::new(
        test_config(&server, dir.path()),
        store,
        Arc::new(ScriptedSurface::abandoned()),
    )
    .unwrap();

    let entitlements = client.entitlements().await.unwrap();
    let ids: Vec<_> = entitlements
        .iter()
        .map(|e| e.0["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, ["X", "Y", "Z"]);
}

#[tokio::test]
async fn runaway_continuation_tokens_hit_the_page_ceiling() {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new().unwrap();

    mount_session_mocks(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/distribution/entitlements"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entitlements": [{"id": "loop"}],
            "nextToken": "again"
        })))
        .expect(3)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::new());
    store.save(&TokenPair::new("old", "r1")).await.unwrap();

    let mut config = test_config(&server, dir.path());
    config.max_entitlement_pages = 3;

    let client = AccountClient::new(config, store, Arc::new(ScriptedSurface::abandoned())).unwrap();

    let result = client.entitlements().await;
    assert!(matches!(result, Err(AgsError::EntitlementPagesExceeded(3))));
}

#[tokio::test]
async fn corrupted_credentials_read_as_logged_out() {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new().unwrap();

    // Write under one identity, read under another: decryption fails and the
    // probe must treat it as "no session" rather than an error.
    let writer = FileCredentialStore::new(dir.path(), Arc::new(StaticIdentity::new("user-1")))
        .await
        .unwrap();
    writer.save(&TokenPair::new("a1", "r1")).await.unwrap();

    let reader = Arc::new(
        FileCredentialStore::new(dir.path(), Arc::new(StaticIdentity::new("user-2")))
            .await
            .unwrap(),
    );
    let client = AccountClient::new(
        test_config(&server, dir.path()),
        reader,
        Arc::new(ScriptedSurface::abandoned()),
    )
    .unwrap();

    assert!(!client.is_user_logged_in().await.unwrap());
    assert!(server.received_requests().await.unwrap().is_empty());
}
