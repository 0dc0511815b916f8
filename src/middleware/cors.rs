use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer, ExposeHeaders};

use crate::config::{ConfigError, CorsConfig};

const DEFAULT_HEADERS: &[&str] = &["origin", "accept", "content-type", "x-requested-with"];

/// CORS for the API routes. Empty lists fall back to permissive defaults
/// (any origin; GET, POST and HEAD; the simple headers). `*` together with
/// credentials is answered by mirroring the request, since browsers refuse
/// a literal wildcard on credentialed requests.
pub fn cors_layer(cfg: &CorsConfig) -> Result<CorsLayer, ConfigError> {
    let mirror = cfg.allow_credentials;

    let origins = if cfg.allowed_origins.is_empty() || is_wildcard(&cfg.allowed_origins) {
        if mirror {
            AllowOrigin::mirror_request()
        } else {
            AllowOrigin::from(Any)
        }
    } else {
        AllowOrigin::list(values("CORS_ALLOWED_ORIGINS", &cfg.allowed_origins)?)
    };

    let methods = if cfg.allowed_methods.is_empty() {
        AllowMethods::list([Method::GET, Method::POST, Method::HEAD])
    } else if is_wildcard(&cfg.allowed_methods) {
        if mirror {
            AllowMethods::mirror_request()
        } else {
            AllowMethods::from(Any)
        }
    } else {
        let mut parsed = Vec::with_capacity(cfg.allowed_methods.len());
        for m in &cfg.allowed_methods {
            let method = Method::from_bytes(m.to_ascii_uppercase().as_bytes()).map_err(|_| {
                ConfigError::Invalid {
                    key: "CORS_ALLOWED_METHODS",
                    value: m.clone(),
                }
            })?;
            parsed.push(method);
        }
        AllowMethods::list(parsed)
    };

    let headers = if cfg.allowed_headers.is_empty() {
        AllowHeaders::list(DEFAULT_HEADERS.iter().copied().map(HeaderName::from_static))
    } else if is_wildcard(&cfg.allowed_headers) {
        if mirror {
            AllowHeaders::mirror_request()
        } else {
            AllowHeaders::from(Any)
        }
    } else {
        AllowHeaders::list(names("CORS_ALLOWED_HEADERS", &cfg.allowed_headers)?)
    };

    let mut layer = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(cfg.allow_credentials);

    if !cfg.exposed_headers.is_empty() {
        if is_wildcard(&cfg.exposed_headers) && mirror {
            return Err(ConfigError::Invalid {
                key: "CORS_EXPOSED_HEADERS",
                value: "*".into(),
            });
        }
        let exposed = if is_wildcard(&cfg.exposed_headers) {
            ExposeHeaders::from(Any)
        } else {
            ExposeHeaders::list(names("CORS_EXPOSED_HEADERS", &cfg.exposed_headers)?)
        };
        layer = layer.expose_headers(exposed);
    }
    if cfg.max_age_secs > 0 {
        layer = layer.max_age(Duration::from_secs(cfg.max_age_secs));
    }
    Ok(layer)
}

fn is_wildcard(list: &[String]) -> bool {
    list.iter().any(|v| v == "*")
}

fn values(key: &'static str, raw: &[String]) -> Result<Vec<HeaderValue>, ConfigError> {
    raw.iter()
        .map(|v| {
            HeaderValue::from_str(v).map_err(|_| ConfigError::Invalid {
                key,
                value: v.clone(),
            })
        })
        .collect()
}

fn names(key: &'static str, raw: &[String]) -> Result<Vec<HeaderName>, ConfigError> {
    raw.iter()
        .map(|v| {
            HeaderName::from_bytes(v.as_bytes()).map_err(|_| ConfigError::Invalid {
                key,
                value: v.clone(),
            })
        })
        .collect()
}
