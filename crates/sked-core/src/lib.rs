//! sked Core - Domain models, collaborator traits, and shared types
//!
//! This crate defines the core abstractions used by the sked backend:
//! - Account and session models (users, session payloads, refresh tokens)
//! - Collaborator traits for the credential store, session store, and mailer
//! - Common error types
//! - Configuration management

pub mod config;
pub mod models;

pub use config::{
    AppConfig, AuthConfig, ConfigError, DatabaseConfig, LoggingConfig, MailConfig,
    PasswordConfig, ServerConfig,
};
pub use models::{SessionPayload, StoredRefreshToken, TokenPair, User, UserId, UserPublic};

use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised by credential and session store implementations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Record conflict: {0}")]
    Conflict(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors raised by mail collaborators
#[derive(Error, Debug)]
pub enum MailError {
    #[error("Mail delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Persistence for user accounts
///
/// Implementations must enforce uniqueness of `email` and `activation_link`
/// and report a violation as [`StoreError::Conflict`].
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a new user record
    async fn create_user(&self, user: &User) -> StoreResult<()>;

    /// Find a user by email address
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Find a user by ID
    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<User>>;

    /// Find a user by the opaque activation link minted at registration
    async fn find_by_activation_link(&self, link: &str) -> StoreResult<Option<User>>;

    /// Persist changes to an existing user
    async fn save_user(&self, user: &User) -> StoreResult<()>;

    /// List all users
    async fn list_users(&self) -> StoreResult<Vec<User>>;
}

/// Persistence for the single live refresh token of each user
///
/// At most one record exists per user id. Lookups and deletions by token
/// value are exact matches.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Upsert the refresh token for `user_id`, replacing any previous value
    async fn save_token(
        &self,
        user_id: UserId,
        refresh_token: &str,
    ) -> StoreResult<StoredRefreshToken>;

    /// Find the session record holding exactly this refresh token
    async fn find_token(&self, refresh_token: &str) -> StoreResult<Option<StoredRefreshToken>>;

    /// Delete the session record holding exactly this refresh token
    async fn remove_token(&self, refresh_token: &str)
        -> StoreResult<Option<StoredRefreshToken>>;

    /// Replace the token for `user_id` only if it still equals `previous`
    ///
    /// Returns `false` when the stored token has changed or was removed in
    /// the meantime. The check and the write happen as one atomic step.
    async fn replace_token(&self, user_id: UserId, previous: &str, next: &str)
        -> StoreResult<bool>;
}

/// Outbound mail delivery
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send the account activation link to a newly registered address
    async fn send_activation_mail(
        &self,
        to_address: &str,
        activation_url: &str,
    ) -> std::result::Result<(), MailError>;

    /// Mailer name for logging
    fn name(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Conflict("email already exists".to_string());
        assert_eq!(err.to_string(), "Record conflict: email already exists");

        let err = StoreError::DatabaseError("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_store_error_from_anyhow() {
        let err: StoreError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, StoreError::Other(_)));
    }
}
