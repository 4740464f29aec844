//! JWT token generation and validation
//!
//! Access and refresh tokens are HMAC-SHA256 JWTs signed with two distinct
//! secrets. Both carry the same session payload; the `typ` claim keeps one
//! kind from being accepted in place of the other.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sked_core::{AuthConfig, SessionPayload, TokenPair};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// Token kind carried in the `typ` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT Claims structure
///
/// The session payload is flattened into the claims so it can be recovered
/// without a store lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user ID
    pub sub: String,
    pub email: String,
    pub is_activated: bool,
    /// Token issuer
    pub iss: String,
    /// Issued at timestamp (Unix epoch)
    pub iat: u64,
    /// Expiration timestamp (Unix epoch)
    pub exp: u64,
    /// Unique token id, so two pairs minted in the same second still differ
    pub jti: String,
    pub typ: TokenKind,
}

impl Claims {
    /// Recover the session payload embedded at issuance
    pub fn payload(&self) -> Result<SessionPayload, TokenError> {
        let id = Uuid::parse_str(&self.sub).map_err(|_| TokenError::InvalidToken)?;
        Ok(SessionPayload {
            id,
            email: self.email.clone(),
            is_activated: self.is_activated,
        })
    }
}

/// JWT token generation and validation errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token format")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Expected {expected:?} token")]
    WrongType { expected: TokenKind },

    #[error("System time error: {0}")]
    SystemTimeError(#[from] std::time::SystemTimeError),
}

/// Signing key and lifetime for one token kind
#[derive(Clone)]
struct KeySet {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
}

impl KeySet {
    fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }
}

/// Issues and validates access/refresh token pairs
#[derive(Clone)]
pub struct TokenIssuer {
    access: KeySet,
    refresh: KeySet,
    issuer: String,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("issuer", &self.issuer)
            .field("access_ttl_secs", &self.access.ttl_secs)
            .field("refresh_ttl_secs", &self.refresh.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access: KeySet::new(&config.access_secret, config.access_ttl_secs),
            refresh: KeySet::new(&config.refresh_secret, config.refresh_ttl_secs),
            issuer: config.issuer.clone(),
        }
    }

    /// Refresh token lifetime, also used as the cookie max-age
    pub fn refresh_ttl_secs(&self) -> u64 {
        self.refresh.ttl_secs
    }

    fn keys(&self, kind: TokenKind) -> &KeySet {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Generate a new access/refresh pair for the payload
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sked_api::auth::jwt::TokenIssuer;
    /// use sked_core::{AuthConfig, SessionPayload};
    /// use uuid::Uuid;
    ///
    /// let issuer = TokenIssuer::new(&AuthConfig::default());
    /// let pair = issuer
    ///     .generate_tokens(&SessionPayload {
    ///         id: Uuid::new_v4(),
    ///         email: "john@example.com".to_string(),
    ///         is_activated: false,
    ///     })
    ///     .expect("Failed to generate tokens");
    /// ```
    pub fn generate_tokens(&self, payload: &SessionPayload) -> Result<TokenPair, TokenError> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();

        Ok(TokenPair {
            access_token: self.sign(payload, TokenKind::Access, now)?,
            refresh_token: self.sign(payload, TokenKind::Refresh, now)?,
        })
    }

    fn sign(
        &self,
        payload: &SessionPayload,
        kind: TokenKind,
        now: u64,
    ) -> Result<String, TokenError> {
        let keys = self.keys(kind);
        let claims = Claims {
            sub: payload.id.to_string(),
            email: payload.email.clone(),
            is_activated: payload.is_activated,
            iss: self.issuer.clone(),
            iat: now,
            exp: now + keys.ttl_secs,
            jti: Uuid::new_v4().to_string(),
            typ: kind,
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)?)
    }

    /// Validate an access token and return its payload
    pub fn validate_access_token(&self, token: &str) -> Result<SessionPayload, TokenError> {
        self.validate(token, TokenKind::Access)?.payload()
    }

    /// Validate a refresh token and return its payload
    pub fn validate_refresh_token(&self, token: &str) -> Result<SessionPayload, TokenError> {
        self.validate(token, TokenKind::Refresh)?.payload()
    }

    fn validate(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.leeway = 0;

        let token_data = decode::<Claims>(token, &self.keys(expected).decoding, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::ExpiredToken,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::InvalidToken,
            })?;

        if token_data.claims.typ != expected {
            return Err(TokenError::WrongType { expected });
        }

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> SessionPayload {
        SessionPayload {
            id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            is_activated: false,
        }
    }

    #[test]
    fn test_generate_and_validate_tokens() {
        let issuer = TokenIssuer::new(&AuthConfig::default());
        let payload = payload();

        let pair = issuer.generate_tokens(&payload).expect("Failed to generate tokens");
        assert_ne!(pair.access_token, pair.refresh_token);

        let access = issuer.validate_access_token(&pair.access_token).unwrap();
        assert_eq!(access, payload);

        let refresh = issuer.validate_refresh_token(&pair.refresh_token).unwrap();
        assert_eq!(refresh, payload);
    }

    #[test]
    fn test_pairs_in_same_second_differ() {
        let issuer = TokenIssuer::new(&AuthConfig::default());
        let payload = payload();

        let first = issuer.generate_tokens(&payload).unwrap();
        let second = issuer.generate_tokens(&payload).unwrap();
        assert_ne!(first.refresh_token, second.refresh_token);
        assert_ne!(first.access_token, second.access_token);
    }

    #[test]
    fn test_kinds_are_not_interchangeable() {
        let issuer = TokenIssuer::new(&AuthConfig::default());
        let pair = issuer.generate_tokens(&payload()).unwrap();

        assert!(issuer.validate_refresh_token(&pair.access_token).is_err());
        assert!(issuer.validate_access_token(&pair.refresh_token).is_err());
    }

    #[test]
    fn test_kind_checked_even_with_shared_secret() {
        let config = AuthConfig {
            access_secret: "same".to_string(),
            refresh_secret: "same".to_string(),
            ..Default::default()
        };
        let issuer = TokenIssuer::new(&config);
        let pair = issuer.generate_tokens(&payload()).unwrap();

        let result = issuer.validate_refresh_token(&pair.access_token);
        assert!(matches!(
            result,
            Err(TokenError::WrongType {
                expected: TokenKind::Refresh
            })
        ));
    }

    #[test]
    fn test_invalid_token() {
        let issuer = TokenIssuer::new(&AuthConfig::default());
        let result = issuer.validate_access_token("invalid.token.here");
        assert!(matches!(result, Err(TokenError::InvalidToken)));
    }

    #[test]
    fn test_wrong_secret() {
        let issuer1 = TokenIssuer::new(&AuthConfig {
            access_secret: "secret1".to_string(),
            ..Default::default()
        });
        let issuer2 = TokenIssuer::new(&AuthConfig {
            access_secret: "secret2".to_string(),
            ..Default::default()
        });

        let pair = issuer1.generate_tokens(&payload()).unwrap();
        let result = issuer2.validate_access_token(&pair.access_token);
        assert!(matches!(result, Err(TokenError::InvalidSignature)));
    }

    #[test]
    fn test_expired_token() {
        let config = AuthConfig::default();
        let issuer = TokenIssuer::new(&config);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();

        // Create a token that expired 1 hour ago
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            is_activated: true,
            iss: config.issuer.clone(),
            iat: now - 7200,
            exp: now - 3600,
            jti: Uuid::new_v4().to_string(),
            typ: TokenKind::Access,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.access_secret.as_bytes()),
        )
        .unwrap();

        let result = issuer.validate_access_token(&token);
        assert!(matches!(result, Err(TokenError::ExpiredToken)));
    }

    #[test]
    fn test_foreign_issuer_rejected() {
        let issuer = TokenIssuer::new(&AuthConfig::default());
        let other = TokenIssuer::new(&AuthConfig {
            issuer: "someone-else".to_string(),
            ..Default::default()
        });

        let pair = other.generate_tokens(&payload()).unwrap();
        assert!(issuer.validate_access_token(&pair.access_token).is_err());
    }
}
