//! JWT issuing and validation.
//!
//! A verified token yields the authenticated identity `{user_id, username,
//! email}` — the whole of the contract the chat fabric consumes from the
//! authenticator.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use parlor_core::config::AuthConfig;
use parlor_core::error::AppError;

/// Claims payload embedded in every token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated user id.
    pub user_id: i64,
    /// Username at issuance time.
    pub username: String,
    /// Email at issuance time.
    pub email: String,
    /// Subject — mirrors the username.
    pub sub: String,
    /// Issuer.
    pub iss: String,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Not-before timestamp.
    pub nbf: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

/// HS256 signing/verification keys derived from the configured secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    expire_hours: u64,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys")
            .field("issuer", &self.issuer)
            .field("expire_hours", &self.expire_hours)
            .finish()
    }
}

impl JwtKeys {
    /// Create keys from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_issuer(&[&config.jwt_issuer]);
        validation.leeway = 5; // seconds, for clock skew

        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            issuer: config.jwt_issuer.clone(),
            expire_hours: config.jwt_expire_hours,
        }
    }

    /// Issue a token for an authenticated user.
    pub fn issue(&self, user_id: i64, username: &str, email: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let expires = now + Duration::hours(self.expire_hours as i64);

        let claims = Claims {
            user_id,
            username: username.to_string(),
            email: email.to_string(),
            sub: username.to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: expires.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::internal(format!("Failed to sign token: {e}")))
    }

    /// Decode and validate a token string.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::unauthorized("Token has expired")
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    AppError::unauthorized("Invalid token format")
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AppError::unauthorized("Invalid token signature")
                }
                _ => AppError::unauthorized(format!("Token validation failed: {e}")),
            }
        })?;

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_keys() -> JwtKeys {
        JwtKeys::new(&AuthConfig {
            jwt_secret: "test-secret".to_string(),
            jwt_expire_hours: 1,
            jwt_issuer: "parlor".to_string(),
        })
    }

    #[test]
    fn issue_and_verify_round_trip() {
        let keys = test_keys();
        let token = keys.issue(42, "alice", "alice@example.com").unwrap();
        let claims = keys.verify(&token).unwrap();

        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.iss, "parlor");
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let keys = test_keys();
        let other = JwtKeys::new(&AuthConfig {
            jwt_secret: "other-secret".to_string(),
            jwt_expire_hours: 1,
            jwt_issuer: "parlor".to_string(),
        });

        let token = other.issue(1, "mallory", "m@example.com").unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(test_keys().verify("not-a-token").is_err());
    }
}
