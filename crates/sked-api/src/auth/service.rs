//! Authentication service layer
//!
//! Orchestrates registration, activation, login, logout and refresh-token
//! rotation on top of the credential store, session store, password hasher,
//! token issuer and mailer.

use super::jwt::{TokenError, TokenIssuer};
use super::password::{PasswordError, PasswordHasher};
use crate::audit::{audit_log, AuditEvent};
use serde::{Deserialize, Serialize};
use sked_core::{
    AppConfig, CredentialStore, MailConfig, Mailer, SessionStore, StoreError, StoreResult,
    TokenPair, User, UserPublic,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// User registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 3, max = 32, message = "must be between 3 and 32 characters"))]
    pub password: String,
}

/// User login request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token pair plus the public view of the authenticated user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub auth: TokenPair,
    pub user: UserPublic,
}

/// Authentication failures
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("User with email {0} already exists")]
    DuplicateEmail(String),

    /// Unknown email and wrong password are deliberately indistinguishable
    #[error("Invalid email or password")]
    BadCredentials,

    #[error("Invalid activation link")]
    InvalidActivationLink,

    #[error("User is not authorized")]
    Unauthorized,

    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PasswordError> for AuthError {
    fn from(e: PasswordError) -> Self {
        AuthError::Internal(e.to_string())
    }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        AuthError::Internal(format!("Failed to issue tokens: {e}"))
    }
}

/// Authentication service
pub struct AuthService {
    users: Arc<dyn CredentialStore>,
    sessions: Arc<dyn SessionStore>,
    mailer: Arc<dyn Mailer>,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
    mail: MailConfig,
    store_timeout: Duration,
    /// Digest verified against when the email is unknown, so both login
    /// failure paths cost one hash
    dummy_digest: String,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(
        config: &AppConfig,
        users: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self, AuthError> {
        let hasher = PasswordHasher::new(&config.auth.password)?;
        let dummy_digest = hasher.hash(&Uuid::new_v4().to_string())?;

        Ok(Self {
            users,
            sessions,
            mailer,
            hasher,
            tokens: TokenIssuer::new(&config.auth),
            mail: config.mail.clone(),
            store_timeout: config.database.timeout(),
            dummy_digest,
        })
    }

    /// Token issuer shared with the access guard
    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Run a store call under the configured deadline
    async fn store<T>(&self, call: impl Future<Output = StoreResult<T>>) -> Result<T, AuthError> {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                warn!(timeout = ?self.store_timeout, "Store call timed out");
                Err(AuthError::Timeout(self.store_timeout))
            }
        }
    }

    /// Register a new account and open its first session
    ///
    /// The activation mail is dispatched on a background task; its failure
    /// is logged and does not undo the registration.
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AuthError> {
        if let Err(e) = request.validate() {
            audit_log(&AuditEvent::RegistrationFailure {
                email: request.email.clone(),
                reason: "validation".to_string(),
            });
            return Err(AuthError::Validation(e.to_string()));
        }

        if self.store(self.users.find_by_email(&request.email)).await?.is_some() {
            audit_log(&AuditEvent::RegistrationFailure {
                email: request.email.clone(),
                reason: "duplicate_email".to_string(),
            });
            return Err(AuthError::DuplicateEmail(request.email));
        }

        let password_hash = self.hasher.hash_async(request.password).await?;
        let activation_link = Uuid::new_v4().simple().to_string();
        let user = User::new(request.email, password_hash, activation_link);

        match self.store(self.users.create_user(&user)).await {
            Ok(()) => {}
            // Lost a race with a concurrent registration of the same email
            Err(AuthError::Store(StoreError::Conflict(_))) => {
                return Err(AuthError::DuplicateEmail(user.email));
            }
            Err(e) => return Err(e),
        }

        self.dispatch_activation_mail(&user);

        let auth = self.open_session(&user).await?;

        audit_log(&AuditEvent::RegistrationSuccess {
            user_id: user.id,
            email: user.email.clone(),
        });

        Ok(AuthResponse {
            auth,
            user: user.to_public(),
        })
    }

    fn dispatch_activation_mail(&self, user: &User) {
        let mailer = self.mailer.clone();
        let to_address = user.email.clone();
        let activation_url = self.mail.activation_url(&user.activation_link);

        tokio::spawn(async move {
            match mailer.send_activation_mail(&to_address, &activation_url).await {
                Ok(()) => debug!(mailer = mailer.name(), to = %to_address, "Activation mail sent"),
                Err(e) => warn!(
                    mailer = mailer.name(),
                    to = %to_address,
                    error = %e,
                    "Failed to send activation mail"
                ),
            }
        });
    }

    /// Issue a fresh pair and make its refresh token the live one
    async fn open_session(&self, user: &User) -> Result<TokenPair, AuthError> {
        let pair = self.tokens.generate_tokens(&user.session_payload())?;
        self.store(self.sessions.save_token(user.id, &pair.refresh_token))
            .await?;
        Ok(pair)
    }

    /// Mark the account behind an activation link as activated
    ///
    /// Activating an already activated account is a successful no-op.
    pub async fn activate(&self, activation_link: &str) -> Result<(), AuthError> {
        let Some(mut user) = self
            .store(self.users.find_by_activation_link(activation_link))
            .await?
        else {
            audit_log(&AuditEvent::ActivationFailure {
                reason: "unknown_link".to_string(),
            });
            return Err(AuthError::InvalidActivationLink);
        };

        if user.activate() {
            self.store(self.users.save_user(&user)).await?;
            audit_log(&AuditEvent::AccountActivated {
                user_id: user.id,
                email: user.email.clone(),
            });
        } else {
            debug!(user_id = %user.id, "Account already activated");
        }

        Ok(())
    }

    /// Login with email and password
    ///
    /// Succeeds regardless of activation state and supersedes any previous
    /// session of the user.
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        let user = self.store(self.users.find_by_email(&request.email)).await?;

        let (user, digest) = match user {
            Some(user) => {
                let digest = user.password_hash.clone();
                (Some(user), digest)
            }
            None => (None, self.dummy_digest.clone()),
        };

        let password_valid = self.hasher.verify_async(request.password, digest).await;

        let user = match (user, password_valid) {
            (Some(user), true) => user,
            (None, _) => {
                audit_log(&AuditEvent::LoginFailure {
                    email: request.email,
                    reason: "unknown_email".to_string(),
                });
                return Err(AuthError::BadCredentials);
            }
            (Some(_), false) => {
                audit_log(&AuditEvent::LoginFailure {
                    email: request.email,
                    reason: "password_mismatch".to_string(),
                });
                return Err(AuthError::BadCredentials);
            }
        };

        let auth = self.open_session(&user).await?;

        audit_log(&AuditEvent::LoginSuccess {
            user_id: user.id,
            email: user.email.clone(),
        });

        Ok(AuthResponse {
            auth,
            user: user.to_public(),
        })
    }

    /// Revoke the session holding this refresh token
    ///
    /// A missing or already revoked token is a successful no-op.
    pub async fn logout(&self, refresh_token: Option<&str>) -> Result<(), AuthError> {
        let Some(refresh_token) = refresh_token.filter(|t| !t.is_empty()) else {
            audit_log(&AuditEvent::Logout { user_id: None });
            return Ok(());
        };

        let removed = self.store(self.sessions.remove_token(refresh_token)).await?;
        audit_log(&AuditEvent::Logout {
            user_id: removed.map(|r| r.user_id),
        });

        Ok(())
    }

    /// Rotate a refresh token
    ///
    /// The presented token must verify, be unexpired, and be the live token
    /// of its user. The new token replaces it only if it is still live at
    /// write time, so of several concurrent refreshes with the same token
    /// exactly one wins.
    pub async fn refresh(&self, refresh_token: Option<&str>) -> Result<AuthResponse, AuthError> {
        let Some(presented) = refresh_token.filter(|t| !t.is_empty()) else {
            return Err(self.reject_refresh(None, "missing_token"));
        };

        let payload = self
            .tokens
            .validate_refresh_token(presented)
            .map_err(|e| self.reject_refresh(None, &format!("invalid_token: {e}")))?;

        let live = self.store(self.sessions.find_token(presented)).await?;
        if !live.is_some_and(|record| record.user_id == payload.id) {
            return Err(self.reject_refresh(Some(payload.id), "not_live"));
        }

        let Some(user) = self.store(self.users.find_by_id(payload.id)).await? else {
            return Err(self.reject_refresh(Some(payload.id), "unknown_user"));
        };

        let pair = self.tokens.generate_tokens(&user.session_payload())?;
        let swapped = self
            .store(
                self.sessions
                    .replace_token(user.id, presented, &pair.refresh_token),
            )
            .await?;
        if !swapped {
            return Err(self.reject_refresh(Some(user.id), "superseded"));
        }

        audit_log(&AuditEvent::TokenRefresh {
            user_id: user.id,
            email: user.email.clone(),
        });

        Ok(AuthResponse {
            auth: pair,
            user: user.to_public(),
        })
    }

    fn reject_refresh(&self, user_id: Option<Uuid>, reason: &str) -> AuthError {
        audit_log(&AuditEvent::RefreshRejected {
            user_id,
            reason: reason.to_string(),
        });
        AuthError::Unauthorized
    }

    /// List the public view of all accounts
    pub async fn list_users(&self) -> Result<Vec<UserPublic>, AuthError> {
        let users = self.store(self.users.list_users()).await?;
        Ok(users.iter().map(User::to_public).collect())
    }
}
