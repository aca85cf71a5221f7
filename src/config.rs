use std::path::PathBuf;
use std::time::Duration;

use url::Url;

/// Amazon Games service endpoints
pub mod endpoints {
    pub const SIGNIN_BASE: &str = "https://www.amazon.com/ap/signin";
    pub const API_BASE: &str = "https://api.amazon.com/";
    pub const GAMING_BASE: &str = "https://gaming.amazon.com/";

    pub const REGISTER_PATH: &str = "auth/register";
    pub const TOKEN_PATH: &str = "auth/token";
    pub const PROFILE_PATH: &str = "user/profile";
    pub const ENTITLEMENTS_PATH: &str = "api/distribution/entitlements";
}

/// Wire constants of the official AGS launcher. The remote service keys on
/// these values, so they are preserved byte for byte.
pub mod launcher {
    /// Hex client id; the signin URL carries it with a `device:` prefix.
    pub const CLIENT_ID: &str = "3733646238643238366332613932346432653737653161663637373636363435234132554d56484f58375550345637";
    pub const DEVICE_TYPE: &str = "A2UMVHOX7UP4V7";
    pub const MARKETPLACE_ID: &str = "ATVPDKIKX0DER";
    pub const ASSOC_HANDLE: &str = "amzn_sonic_games_launcher";

    /// Query parameter that carries the authorization code on the redirect.
    pub const AUTHORIZATION_CODE_PARAM: &str = "openid.oa2.authorization_code";
    pub const COOKIE_DOMAIN: &str = ".amazon.com";

    /// Opaque correlation key sent with every entitlement request.
    pub const ENTITLEMENTS_KEY_ID: &str = "d5dc8b8b-86c8-4fc4-ae93-18c0def5314d";
    pub const ENTITLEMENTS_TARGET: &str =
        "com.amazon.animusdistributionservice.entitlement.AnimusEntitlementsService.GetEntitlements";

    pub const SIGNIN_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) @amzn/aga-electron-platform/1.0.0 Chrome/78.0.3904.130 Electron/7.1.9 Safari/537.36";
    pub const API_USER_AGENT: &str = "AGSLauncher/1.0.0";
    pub const ENTITLEMENTS_USER_AGENT: &str = "com.amazon.agslauncher.win/3.0.9495.3";

    pub const REGISTER_APP_NAME: &str = "AGSLauncher for Windows";
    pub const REGISTER_APP_VERSION: &str = "1.0.0";
    pub const REFRESH_APP_NAME: &str = "AGSLauncher";
    pub const REFRESH_APP_VERSION: &str = "3.0.9495.3";
    pub const DEVICE_MODEL: &str = "Windows";
    pub const OS_VERSION: &str = "10.0.19044.0";
}

/// Length of the PKCE code verifier sent as `openid.oa2.code_challenge`.
pub const CODE_VERIFIER_LEN: usize = 45;

/// HTTP client timeouts
#[derive(Debug, Clone)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(15),
            request: Duration::from_secs(30),
        }
    }
}

/// Configuration for the account client
#[derive(Debug, Clone)]
pub struct AgsConfig {
    /// Base URL of the interactive signin page.
    pub signin_base: Url,

    /// Base URL for registration, refresh and profile calls.
    pub api_base: Url,

    /// Base URL for the entitlement distribution service.
    pub gaming_base: Url,

    /// Directory holding the encrypted token file, key metadata and the
    /// fallback device serial.
    pub storage_dir: PathBuf,

    /// App identity sent in the registration payload.
    pub app_name: String,
    pub app_version: String,
    pub device_model: String,
    pub os_version: String,

    /// App identity sent in refresh requests.
    pub refresh_app_name: String,
    pub refresh_app_version: String,

    /// HTTP client timeouts
    pub http_timeouts: HttpTimeouts,

    /// Upper bound on entitlement pages before the fetch is aborted as a
    /// misbehaving server rather than looping forever.
    pub max_entitlement_pages: u32,
}

impl AgsConfig {
    /// Configuration matching the official launcher's wire behavior.
    pub fn launcher_defaults(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            signin_base: Url::parse(endpoints::SIGNIN_BASE).expect("valid signin URL"),
            api_base: Url::parse(endpoints::API_BASE).expect("valid API URL"),
            gaming_base: Url::parse(endpoints::GAMING_BASE).expect("valid gaming URL"),
            storage_dir: storage_dir.into(),
            app_name: launcher::REGISTER_APP_NAME.to_string(),
            app_version: launcher::REGISTER_APP_VERSION.to_string(),
            device_model: launcher::DEVICE_MODEL.to_string(),
            os_version: launcher::OS_VERSION.to_string(),
            refresh_app_name: launcher::REFRESH_APP_NAME.to_string(),
            refresh_app_version: launcher::REFRESH_APP_VERSION.to_string(),
            http_timeouts: HttpTimeouts::default(),
            max_entitlement_pages: 100,
        }
    }
}
