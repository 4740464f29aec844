//! Account and session models
//!
//! - User: credentials and activation state
//! - UserPublic: the user view returned to clients
//! - SessionPayload: identity snapshot embedded in issued tokens
//! - StoredRefreshToken: the one live refresh token of a user
//! - TokenPair: access and refresh token issued together

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// User identifier
pub type UserId = Uuid;

/// User account model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Unique user identifier
    pub id: UserId,

    /// Email address (unique, used for login)
    pub email: String,

    /// Argon2id PHC string. Never serialized in API responses.
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Whether the email address has been confirmed
    #[serde(default)]
    pub is_activated: bool,

    /// Opaque unique token mailed to the user at registration
    pub activation_link: String,

    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new, not yet activated user
    pub fn new(email: String, password_hash: String, activation_link: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            is_activated: false,
            activation_link,
            created_at: Utc::now(),
        }
    }

    /// Mark the account as activated
    ///
    /// Returns `true` if the state changed.
    pub fn activate(&mut self) -> bool {
        let changed = !self.is_activated;
        self.is_activated = true;
        changed
    }

    /// Convert user to public representation (without sensitive fields)
    pub fn to_public(&self) -> UserPublic {
        UserPublic {
            id: self.id,
            email: self.email.clone(),
            is_activated: self.is_activated,
        }
    }

    /// Snapshot of the identity to embed in tokens
    pub fn session_payload(&self) -> SessionPayload {
        SessionPayload {
            id: self.id,
            email: self.email.clone(),
            is_activated: self.is_activated,
        }
    }
}

/// Public user representation (safe for API responses)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPublic {
    pub id: UserId,
    pub email: String,
    pub is_activated: bool,
}

/// Identity snapshot taken at token issuance
///
/// Not re-validated against the live record until the next login or refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    pub id: UserId,
    pub email: String,
    pub is_activated: bool,
}

/// The live refresh token of a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredRefreshToken {
    /// Owner of the session (at most one record per user)
    pub user_id: UserId,

    /// Exact refresh token value, also the lookup key
    pub refresh_token: String,

    /// When the token was last written
    pub updated_at: DateTime<Utc>,
}

impl StoredRefreshToken {
    pub fn new(user_id: UserId, refresh_token: String) -> Self {
        Self {
            user_id,
            refresh_token,
            updated_at: Utc::now(),
        }
    }
}

/// Access and refresh token issued together
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}
