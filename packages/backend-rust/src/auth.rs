use axum::http::{header, HeaderMap};

use crate::config::Config;
use crate::response::AppError;

pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())?;

    auth_header
        .strip_prefix("Bearer ")
        .map(|value| value.to_string())
}

/// Shared-secret gate for the admin surface.
///
/// When no `ADMIN_PASSWORD` is configured the check passes — the admin
/// endpoints are open on a private single-user deployment.
pub fn check_admin(headers: &HeaderMap, config: &Config) -> Result<(), AppError> {
    let Some(expected) = config.admin_password.as_deref() else {
        return Ok(());
    };

    match extract_token(headers) {
        Some(token) if token == expected => Ok(()),
        Some(_) => Err(AppError::unauthorized("管理口令错误")),
        None => Err(AppError::unauthorized("未提供认证令牌")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::net::{IpAddr, Ipv4Addr};

    fn config_with_password(password: Option<&str>) -> Config {
        Config {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            log_level: "info".to_string(),
            admin_password: password.map(|value| value.to_string()),
            daily_new_words: 10,
        }
    }

    fn headers_with_bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn test_extract_token_requires_bearer_prefix() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_token(&headers), None);

        let headers = headers_with_bearer("secret");
        assert_eq!(extract_token(&headers).as_deref(), Some("secret"));
    }

    #[test]
    fn test_admin_open_when_no_password_configured() {
        let config = config_with_password(None);
        assert!(check_admin(&HeaderMap::new(), &config).is_ok());
    }

    #[test]
    fn test_admin_rejects_missing_and_wrong_token() {
        let config = config_with_password(Some("s3cret"));
        assert!(check_admin(&HeaderMap::new(), &config).is_err());
        assert!(check_admin(&headers_with_bearer("nope"), &config).is_err());
        assert!(check_admin(&headers_with_bearer("s3cret"), &config).is_ok());
    }
}
