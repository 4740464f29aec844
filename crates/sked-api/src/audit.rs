//! Security audit logging for authentication events
//!
//! Every account lifecycle step (registration, activation, login, refresh,
//! logout) and every rejected credential is logged at INFO level with the
//! "audit" target, so it can be routed separately from application logs.
//!
//! Audit records always carry the precise failure reason, even where the
//! client only sees a collapsed error such as bad credentials.
//!
//! # Example
//!
//! ```ignore
//! use sked_api::audit::{AuditEvent, audit_log};
//!
//! audit_log(&AuditEvent::LoginSuccess {
//!     user_id: user.id,
//!     email: user.email.clone(),
//! });
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Security audit events for authentication and authorization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// New account created
    RegistrationSuccess { user_id: Uuid, email: String },

    /// Registration rejected
    RegistrationFailure { email: String, reason: String },

    /// Account email confirmed
    AccountActivated { user_id: Uuid, email: String },

    /// Activation link did not resolve to an account
    ActivationFailure { reason: String },

    /// Successful login
    LoginSuccess { user_id: Uuid, email: String },

    /// Failed login attempt
    LoginFailure { email: String, reason: String },

    /// Refresh token revoked
    Logout { user_id: Option<Uuid> },

    /// Refresh token rotated
    TokenRefresh { user_id: Uuid, email: String },

    /// Refresh token rejected
    RefreshRejected {
        user_id: Option<Uuid>,
        reason: String,
    },

    /// Invalid, expired, or missing bearer token on a protected route
    InvalidToken { path: String, reason: String },
}

impl AuditEvent {
    fn description(&self) -> &'static str {
        match self {
            Self::RegistrationSuccess { .. } => "Registration successful",
            Self::RegistrationFailure { .. } => "Registration failed",
            Self::AccountActivated { .. } => "Account activated",
            Self::ActivationFailure { .. } => "Activation failed",
            Self::LoginSuccess { .. } => "Login successful",
            Self::LoginFailure { .. } => "Login failed",
            Self::Logout { .. } => "User logout",
            Self::TokenRefresh { .. } => "Token refresh",
            Self::RefreshRejected { .. } => "Token refresh rejected",
            Self::InvalidToken { .. } => "Invalid token",
        }
    }
}

/// Log a security audit event with structured fields
///
/// The event is serialized to JSON for log aggregators. Example output:
///
/// ```json
/// {
///   "event_type": "login_failure",
///   "email": "user@example.com",
///   "reason": "password_mismatch"
/// }
/// ```
pub fn audit_log(event: &AuditEvent) {
    let timestamp = Utc::now();

    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    match event {
        AuditEvent::RegistrationSuccess { user_id, email }
        | AuditEvent::AccountActivated { user_id, email }
        | AuditEvent::LoginSuccess { user_id, email }
        | AuditEvent::TokenRefresh { user_id, email } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                email = %email,
                "{}",
                event.description()
            );
        }
        AuditEvent::RegistrationFailure { email, reason }
        | AuditEvent::LoginFailure { email, reason } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                email = %email,
                reason = %reason,
                "{}",
                event.description()
            );
        }
        AuditEvent::ActivationFailure { reason } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                reason = %reason,
                "{}",
                event.description()
            );
        }
        AuditEvent::Logout { user_id } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = ?user_id,
                "{}",
                event.description()
            );
        }
        AuditEvent::RefreshRejected { user_id, reason } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = ?user_id,
                reason = %reason,
                "{}",
                event.description()
            );
        }
        AuditEvent::InvalidToken { path, reason } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                path = %path,
                reason = %reason,
                "{}",
                event.description()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_event_serialization() {
        let event = AuditEvent::LoginSuccess {
            user_id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"login_success\""));
        assert!(json.contains("\"email\":\"test@example.com\""));
    }

    #[test]
    fn test_failure_reason_is_recorded() {
        let event = AuditEvent::LoginFailure {
            email: "test@example.com".to_string(),
            reason: "unknown_email".to_string(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"login_failure\""));
        assert!(json.contains("\"reason\":\"unknown_email\""));
    }

    #[test]
    fn test_audit_log_does_not_panic() {
        audit_log(&AuditEvent::Logout { user_id: None });
        audit_log(&AuditEvent::InvalidToken {
            path: "/api/users".to_string(),
            reason: "missing bearer".to_string(),
        });
    }
}
