//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// JWT and password hashing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for signing JWTs.
    pub jwt_secret: String,
    /// Token lifetime in hours.
    #[serde(default = "default_expire_hours")]
    pub jwt_expire_hours: u64,
    /// Token issuer claim.
    #[serde(default = "default_issuer")]
    pub jwt_issuer: String,
}

fn default_expire_hours() -> u64 {
    24
}

fn default_issuer() -> String {
    "parlor".to_string()
}
