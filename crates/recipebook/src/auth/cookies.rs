//! Session cookie transport.

use axum::http::{HeaderMap, HeaderName, header::COOKIE, header::SET_COOKIE};
use axum::response::AppendHeaders;

use super::claims::TokenPair;
use super::config::AuthConfig;

/// Cookie carrying the access token.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Cookie carrying the refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Cookies outlive their token by this much so the server, not the
/// browser, decides when a session has expired.
const COOKIE_GRACE_SECS: i64 = 60;

/// Pair of `Set-Cookie` headers.
pub type SessionHeaders = AppendHeaders<[(HeaderName, String); 2]>;

/// Builds `Set-Cookie` values for the session cookies.
#[derive(Debug, Clone, Copy)]
pub struct SessionCookies {
    secure: bool,
    access_max_age: i64,
    refresh_max_age: i64,
}

impl SessionCookies {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            secure: config.is_production(),
            access_max_age: config.access_token_ttl_secs.saturating_add(COOKIE_GRACE_SECS),
            refresh_max_age: config.refresh_token_ttl_secs.saturating_add(COOKIE_GRACE_SECS),
        }
    }

    /// Headers that install both tokens.
    pub fn issue(&self, pair: &TokenPair) -> SessionHeaders {
        AppendHeaders([
            (
                SET_COOKIE,
                self.build(ACCESS_TOKEN_COOKIE, &pair.access_token, self.access_max_age),
            ),
            (
                SET_COOKIE,
                self.build(
                    REFRESH_TOKEN_COOKIE,
                    &pair.refresh_token,
                    self.refresh_max_age,
                ),
            ),
        ])
    }

    /// Headers that make the browser drop both cookies.
    pub fn clear(&self) -> SessionHeaders {
        AppendHeaders([
            (SET_COOKIE, self.build(ACCESS_TOKEN_COOKIE, "", 0)),
            (SET_COOKIE, self.build(REFRESH_TOKEN_COOKIE, "", 0)),
        ])
    }

    fn build(&self, name: &str, value: &str, max_age: i64) -> String {
        let secure_flag = if self.secure { " Secure;" } else { "" };
        format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax;{secure_flag} Max-Age={max_age}")
    }
}

fn token_from_cookie_header<'a>(cookie_header: &'a str, cookie_name: &str) -> Option<&'a str> {
    cookie_header.split(';').map(str::trim).find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        if name.trim() == cookie_name {
            Some(value.trim())
        } else {
            None
        }
    })
}

/// Find a cookie value across all `Cookie` headers.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .find_map(|header| token_from_cookie_header(header, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::config::DeploymentMode;
    use axum::http::HeaderValue;
    use axum::response::IntoResponse;

    fn cookies(mode: DeploymentMode) -> SessionCookies {
        SessionCookies::from_config(&AuthConfig {
            mode,
            ..AuthConfig::default()
        })
    }

    fn set_cookie_values(headers: SessionHeaders) -> Vec<String> {
        let response = headers.into_response();
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_issue_sets_both_cookies() {
        let pair = TokenPair {
            access_token: "access.jwt.value".to_string(),
            refresh_token: "refresh.jwt.value".to_string(),
        };
        let values = set_cookie_values(cookies(DeploymentMode::Development).issue(&pair));

        assert_eq!(values.len(), 2);
        assert_eq!(
            values[0],
            "access_token=access.jwt.value; Path=/; HttpOnly; SameSite=Lax; Max-Age=660"
        );
        assert_eq!(
            values[1],
            "refresh_token=refresh.jwt.value; Path=/; HttpOnly; SameSite=Lax; Max-Age=604860"
        );
    }

    #[test]
    fn test_production_cookies_are_secure() {
        let pair = TokenPair {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
        };
        let values = set_cookie_values(cookies(DeploymentMode::Production).issue(&pair));
        assert!(values.iter().all(|v| v.contains("Secure;")));
        assert!(values.iter().all(|v| v.contains("HttpOnly")));
    }

    #[test]
    fn test_clear_expires_both_cookies() {
        let values = set_cookie_values(cookies(DeploymentMode::Development).clear());
        assert_eq!(values.len(), 2);
        assert!(values[0].starts_with("access_token=;"));
        assert!(values[1].starts_with("refresh_token=;"));
        assert!(values.iter().all(|v| v.ends_with("Max-Age=0")));
    }

    #[test]
    fn test_token_from_cookie_header() {
        assert_eq!(
            token_from_cookie_header("theme=dark; access_token=abc.def.ghi", "access_token"),
            Some("abc.def.ghi")
        );
        assert_eq!(
            token_from_cookie_header("access_token=  ", "access_token"),
            Some("")
        );
        assert_eq!(token_from_cookie_header("theme=dark", "access_token"), None);
        assert_eq!(
            token_from_cookie_header("refresh_token=x", "access_token"),
            None
        );
    }

    #[test]
    fn test_read_cookie_checks_every_header() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(COOKIE, HeaderValue::from_static("refresh_token=r1"));

        assert_eq!(read_cookie(&headers, REFRESH_TOKEN_COOKIE), Some("r1"));
        assert_eq!(read_cookie(&headers, ACCESS_TOKEN_COOKIE), None);
    }
}
