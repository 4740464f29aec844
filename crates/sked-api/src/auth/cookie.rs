//! Refresh token cookie
//!
//! The refresh token travels only in an httpOnly cookie named `refreshToken`;
//! its max-age matches the refresh token lifetime.

use axum::http::{header, HeaderMap, HeaderValue};

pub const REFRESH_COOKIE: &str = "refreshToken";

/// Cookie attributes shared by set and clear
#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    pub max_age_secs: u64,
    pub secure: bool,
}

impl CookiePolicy {
    fn render(&self, value: &str, max_age_secs: u64) -> String {
        let mut cookie = format!(
            "{REFRESH_COOKIE}={value}; Max-Age={max_age_secs}; Path=/; HttpOnly; SameSite=Lax"
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// `Set-Cookie` value carrying a refresh token
    pub fn set(&self, refresh_token: &str) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.render(refresh_token, self.max_age_secs)).ok()
    }

    /// `Set-Cookie` value expiring the refresh token
    pub fn clear(&self) -> HeaderValue {
        HeaderValue::from_str(&self.render("", 0))
            .unwrap_or_else(|_| HeaderValue::from_static("refreshToken=; Max-Age=0; Path=/"))
    }
}

/// Read the refresh token from the request's `Cookie` headers
pub fn refresh_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == REFRESH_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: CookiePolicy = CookiePolicy {
        max_age_secs: 2_592_000,
        secure: false,
    };

    #[test]
    fn test_set_cookie_attributes() {
        let value = POLICY.set("abc.def").unwrap();
        assert_eq!(
            value.to_str().unwrap(),
            "refreshToken=abc.def; Max-Age=2592000; Path=/; HttpOnly; SameSite=Lax"
        );

        let secure = CookiePolicy {
            secure: true,
            ..POLICY
        };
        assert!(secure.set("abc").unwrap().to_str().unwrap().ends_with("; Secure"));
    }

    #[test]
    fn test_clear_cookie() {
        let value = POLICY.clear();
        let value = value.to_str().unwrap();
        assert!(value.starts_with("refreshToken=;"));
        assert!(value.contains("Max-Age=0"));
    }

    #[test]
    fn test_read_refresh_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; refreshToken=abc.def.ghi; lang=en"),
        );
        assert_eq!(refresh_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_missing_or_empty_refresh_token() {
        assert!(refresh_token(&HeaderMap::new()).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("refreshToken="));
        assert!(refresh_token(&headers).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("otherToken=abc"));
        assert!(refresh_token(&headers).is_none());
    }
}
