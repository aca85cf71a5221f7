use serde::{Deserialize, Serialize};

use crate::session::TokenPair;

/// `POST /auth/register` request body
#[derive(Debug, Clone, Serialize)]
pub struct DeviceRegistrationRequest {
    pub auth_data: AuthData,
    pub registration_data: RegistrationData,
    pub requested_extensions: Vec<String>,
    pub requested_token_type: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthData {
    pub authorization_code: String,
    pub code_verifier: String,
    pub code_algorithm: String,
    pub client_id: String,
    pub client_domain: String,
    pub use_global_authentication: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationData {
    pub app_name: String,
    pub app_version: String,
    pub device_model: String,
    pub device_serial: String,
    pub device_type: String,
    pub domain: String,
    pub os_version: String,
}

/// `POST /auth/register` response. Every level is optional: error payloads
/// arrive with the `success` branch absent.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceRegistrationResponse {
    #[serde(default)]
    pub response: Option<RegistrationBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationBody {
    #[serde(default)]
    pub success: Option<RegistrationSuccess>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationSuccess {
    #[serde(default)]
    pub tokens: Option<RegistrationTokens>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationTokens {
    #[serde(default)]
    pub bearer: Option<TokenPair>,
}

/// `POST /auth/token` request body
#[derive(Debug, Clone, Serialize)]
pub struct TokenRefreshRequest {
    pub app_name: String,
    pub app_version: String,
    pub source_token: String,
    pub source_token_type: String,
    pub requested_token_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshResponse {
    #[serde(default)]
    pub access_token: Option<String>,
}

/// `GET /user/profile` response
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileResponse {
    #[serde(default)]
    pub user_id: Option<String>,
}

/// One owned title. The record is vendor-defined and passed through
/// unmodified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Entitlement(pub serde_json::Value);

/// `POST /api/distribution/entitlements` request body. `next_token` is
/// serialized as an explicit `null` on the first page, matching the launcher.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementsRequest {
    pub key_id: String,
    pub hardware_hash: String,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementsResponse {
    #[serde(default)]
    pub entitlements: Vec<Entitlement>,
    #[serde(default)]
    pub next_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entitlements_request_uses_launcher_field_names() {
        let req = EntitlementsRequest {
            key_id: "key".to_string(),
            hardware_hash: "hash".to_string(),
            next_token: None,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["keyId"], "key");
        assert_eq!(value["hardwareHash"], "hash");
        assert!(value["nextToken"].is_null());
        assert!(value.as_object().unwrap().contains_key("nextToken"));
    }

    #[test]
    fn registration_response_parses_nested_bearer() {
        let json = r#"{
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
        }"#;
        let parsed: DeviceRegistrationResponse = serde_json::from_str(json).unwrap();
        let bearer = parsed
            .response
            .and_then(|r| r.success)
            .and_then(|s| s.tokens)
            .and_then(|t| t.bearer)
            .unwrap();
        assert_eq!(bearer.access_token, "a1");
        assert_eq!(bearer.refresh_token, "r1");
        assert_eq!(bearer.extra["expires_in"], "3600");
    }

    #[test]
    fn error_payload_has_no_success_branch() {
        let json = r#"{"response": {"error": {"code": "InvalidToken"}}}"#;
        let parsed: DeviceRegistrationResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.response.unwrap().success.is_none());
    }

    #[test]
    fn entitlements_response_tolerates_missing_fields() {
        let parsed: EntitlementsResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.entitlements.is_empty());
        assert!(parsed.next_token.is_none());
    }
}
