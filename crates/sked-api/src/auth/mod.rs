//! Authentication and authorization module
//!
//! This module provides cookie-carried refresh tokens with rotation and
//! bearer access tokens:
//! - Token generation and validation
//! - Password hashing with Argon2
//! - Access guard middleware for protected routes
//! - Refresh token cookie helpers
//! - Authentication service orchestrating the account lifecycle

pub mod cookie;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;

pub use cookie::{CookiePolicy, REFRESH_COOKIE};
pub use jwt::{Claims, TokenError, TokenIssuer, TokenKind};
pub use middleware::{access_guard, bearer_token, GuardError};
pub use password::{PasswordError, PasswordHasher};
pub use service::{AuthError, AuthResponse, AuthService, LoginRequest, RegisterRequest};
