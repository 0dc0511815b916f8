use std::{path::PathBuf, str::FromStr};

use serde::Deserialize;
use thiserror::Error;

/// Ten years.
pub const MAX_JWT_LIFETIME_HOURS: i64 = 87_600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value `{value}` for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub algorithm: String,
    pub secret: Option<String>,
    pub private_key_path: Option<PathBuf>,
    pub public_key_path: Option<PathBuf>,
    pub lifetime_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub exposed_headers: Vec<String>,
    pub allow_credentials: bool,
    pub max_age_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BasicAuthConfig {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub cors: CorsConfig,
    pub basic_auth: BasicAuthConfig,
    pub access_log: bool,
    pub debug_routes: bool,
    pub request_timeout_secs: u64,
    pub max_page_limit: i64,
}

impl AppConfig {
    /// Everything except the database; see [`DbConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt = JwtConfig {
            algorithm: var_or("JWT_ALGO", "HS512"),
            secret: var_opt("JWT_SECRET"),
            private_key_path: var_opt("JWT_PRIVATE_KEY_PATH").map(PathBuf::from),
            public_key_path: var_opt("JWT_PUBLIC_KEY_PATH").map(PathBuf::from),
            lifetime_hours: lifetime_hours(parsed_or("JWT_LIFETIME", 24)?)?,
        };
        let cors = CorsConfig {
            allowed_origins: list("CORS_ALLOWED_ORIGINS"),
            allowed_methods: list("CORS_ALLOWED_METHODS"),
            allowed_headers: list("CORS_ALLOWED_HEADERS"),
            exposed_headers: list("CORS_EXPOSED_HEADERS"),
            allow_credentials: flag("CORS_ALLOW_CREDENTIALS", false)?,
            max_age_secs: parsed_or("CORS_MAX_AGE", 0)?,
        };
        let basic_auth = BasicAuthConfig {
            username: var_opt("SERVER_BASICAUTH_USERNAME")
                .ok_or(ConfigError::Missing("SERVER_BASICAUTH_USERNAME"))?,
            password: var_opt("SERVER_BASICAUTH_PASSWORD")
                .ok_or(ConfigError::Missing("SERVER_BASICAUTH_PASSWORD"))?,
        };

        Ok(Self {
            host: var_or("APP_HOST", "0.0.0.0"),
            port: parsed_or("APP_PORT", 8080)?,
            jwt,
            cors,
            basic_auth,
            access_log: flag("ENABLE_ACCESS_LOG", true)?,
            debug_routes: flag("SERVER_DEBUG", false)?,
            request_timeout_secs: parsed_or("REQUEST_TIMEOUT_SECS", 30)?,
            max_page_limit: parsed_or("PAGINATION_MAX_LIMIT", 100)?,
        })
    }
}

impl DbConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: var_opt("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            max_connections: parsed_or("DB_MAX_CONNECTIONS", 10)?,
            min_connections: parsed_or("DB_MIN_CONNECTIONS", 0)?,
            acquire_timeout_secs: parsed_or("DB_ACQUIRE_TIMEOUT_SECS", 5)?,
            max_lifetime_secs: parsed_or("DB_MAX_LIFETIME_SECS", 1800)?,
            idle_timeout_secs: parsed_or("DB_IDLE_TIMEOUT_SECS", 600)?,
        })
    }
}

fn var_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn var_or(key: &str, default: &str) -> String {
    var_opt(key).unwrap_or_else(|| default.to_string())
}

fn parsed_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match var_opt(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

fn lifetime_hours(hours: i64) -> Result<i64, ConfigError> {
    if (1..=MAX_JWT_LIFETIME_HOURS).contains(&hours) {
        Ok(hours)
    } else {
        Err(ConfigError::Invalid {
            key: "JWT_LIFETIME",
            value: hours.to_string(),
        })
    }
}

fn flag(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match var_opt(key) {
        Some(value) => parse_bool(&value).ok_or(ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn list(key: &str) -> Vec<String> {
    split_list(&var_opt(key).unwrap_or_default())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bools_accept_common_spellings() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn jwt_lifetime_must_be_positive_and_bounded() {
        assert_eq!(lifetime_hours(1).unwrap(), 1);
        assert_eq!(lifetime_hours(MAX_JWT_LIFETIME_HOURS).unwrap(), 87_600);
        for bad in [0, -5, MAX_JWT_LIFETIME_HOURS + 1, i64::MAX] {
            assert!(matches!(
                lifetime_hours(bad),
                Err(ConfigError::Invalid { key: "JWT_LIFETIME", value }) if value == bad.to_string()
            ));
        }
    }

    #[test]
    fn lists_are_trimmed_and_skip_blanks() {
        assert_eq!(
            split_list("https://a.example, https://b.example,,"),
            vec!["https://a.example", "https://b.example"]
        );
        assert!(split_list("").is_empty());
    }
}
