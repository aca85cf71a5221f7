use serde::{Deserialize, Serialize};

/// The persisted credential: a bearer access token plus the refresh token used
/// to mint new ones. Extra fields returned by the service (e.g. `expires_in`)
/// are carried through unmodified so refresh rewrites never drop metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            extra: serde_json::Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_fields_survive_a_serde_roundtrip() {
        let json = r#"{"access_token":"a1","refresh_token":"r1","expires_in":3600}"#;
        let pair: TokenPair = serde_json::from_str(json).unwrap();
        assert_eq!(pair.access_token, "a1");
        assert_eq!(pair.extra["expires_in"], 3600);

        let back = serde_json::to_value(&pair).unwrap();
        assert_eq!(back["expires_in"], 3600);
    }
}
