use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64ct::{Base64, Encoding};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::{config::BasicAuthConfig, error::ErrorBody};

const CHALLENGE: &str = r#"Basic realm="Restricted""#;

/// Guards operator routes with a single configured username/password.
pub async fn require_basic_auth(
    State(creds): State<Arc<BasicAuthConfig>>,
    req: Request,
    next: Next,
) -> Response {
    let presented = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(decode_basic);

    match presented {
        Some((user, pass)) if matches(&creds, &user, &pass) => next.run(req).await,
        _ => {
            warn!(path = %req.uri().path(), "basic auth rejected");
            challenge()
        }
    }
}

fn decode_basic(value: &str) -> Option<(String, String)> {
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let raw = Base64::decode_vec(encoded.trim()).ok()?;
    let text = String::from_utf8(raw).ok()?;
    let (user, pass) = text.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

fn matches(creds: &BasicAuthConfig, user: &str, pass: &str) -> bool {
    let user_ok: bool = user.as_bytes().ct_eq(creds.username.as_bytes()).into();
    let pass_ok: bool = pass.as_bytes().ct_eq(creds.password.as_bytes()).into();
    user_ok & pass_ok
}

fn challenge() -> Response {
    let status = StatusCode::UNAUTHORIZED;
    let mut res = (status, Json(ErrorBody::new(status, "Unauthorized"))).into_response();
    res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static(CHALLENGE),
    );
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> BasicAuthConfig {
        BasicAuthConfig {
            username: "ops".into(),
            password: "s3cret".into(),
        }
    }

    #[test]
    fn decodes_basic_header() {
        let header = format!("Basic {}", Base64::encode_string(b"ops:s3cret"));
        assert_eq!(
            decode_basic(&header),
            Some(("ops".to_string(), "s3cret".to_string()))
        );
        assert_eq!(decode_basic("Bearer abc"), None);
        assert_eq!(decode_basic("Basic !!!"), None);
    }

    #[test]
    fn password_may_contain_colons() {
        let header = format!("basic {}", Base64::encode_string(b"ops:a:b"));
        assert_eq!(decode_basic(&header), Some(("ops".into(), "a:b".into())));
    }

    #[test]
    fn both_parts_must_match() {
        assert!(matches(&creds(), "ops", "s3cret"));
        assert!(!matches(&creds(), "ops", "s3cre"));
        assert!(!matches(&creds(), "admin", "s3cret"));
    }
}
