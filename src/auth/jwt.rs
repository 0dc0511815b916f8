use std::{path::Path, str::FromStr};

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};
use uuid::Uuid;

use super::claims::Claims;
use crate::config::JwtConfig;

pub const MIN_SECRET_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token: {0}")]
    Invalid(&'static str),

    #[error("unsupported JWT algorithm `{0}`: must be one of HS256, HS384, HS512, ES256, ES384")]
    UnsupportedAlgorithm(String),

    #[error("secret must have at least {MIN_SECRET_LEN} characters")]
    WeakSecret,

    #[error("{0} is required for ES-class algorithms")]
    MissingKeyPath(&'static str),

    #[error("cannot read key file {path}: {source}")]
    KeyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid key material: {0}")]
    Key(#[source] jsonwebtoken::errors::Error),

    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("token lifetime of {0} hours is out of range")]
    Lifetime(i64),
}

/// The two signing families. Picked once from configuration; after that
/// both are driven through the same encode/decode keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    /// Shared secret signs and verifies.
    Hmac,
    /// Private key signs, public key verifies.
    Ecdsa,
}

impl KeyFamily {
    pub fn of(algorithm: Algorithm) -> Option<Self> {
        match algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Some(KeyFamily::Hmac),
            Algorithm::ES256 | Algorithm::ES384 => Some(KeyFamily::Ecdsa),
            _ => None,
        }
    }
}

/// Signed key material, loaded once at startup.
#[derive(Clone)]
pub struct SigningKeys {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    pub fn hmac(algorithm: Algorithm, secret: &str) -> Result<Self, TokenError> {
        if KeyFamily::of(algorithm) != Some(KeyFamily::Hmac) {
            return Err(TokenError::UnsupportedAlgorithm(format!("{algorithm:?}")));
        }
        if secret.chars().count() < MIN_SECRET_LEN {
            return Err(TokenError::WeakSecret);
        }
        Ok(Self {
            algorithm,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    pub fn ecdsa(
        algorithm: Algorithm,
        private_pem: &[u8],
        public_pem: &[u8],
    ) -> Result<Self, TokenError> {
        if KeyFamily::of(algorithm) != Some(KeyFamily::Ecdsa) {
            return Err(TokenError::UnsupportedAlgorithm(format!("{algorithm:?}")));
        }
        Ok(Self {
            algorithm,
            encoding: EncodingKey::from_ec_pem(private_pem).map_err(TokenError::Key)?,
            decoding: DecodingKey::from_ec_pem(public_pem).map_err(TokenError::Key)?,
        })
    }

    pub fn from_config(cfg: &JwtConfig) -> Result<Self, TokenError> {
        let algorithm = Algorithm::from_str(cfg.algorithm.trim())
            .map_err(|_| TokenError::UnsupportedAlgorithm(cfg.algorithm.clone()))?;
        match KeyFamily::of(algorithm) {
            Some(KeyFamily::Hmac) => Self::hmac(algorithm, cfg.secret.as_deref().unwrap_or("")),
            Some(KeyFamily::Ecdsa) => {
                let private = cfg
                    .private_key_path
                    .as_deref()
                    .ok_or(TokenError::MissingKeyPath("JWT_PRIVATE_KEY_PATH"))?;
                let public = cfg
                    .public_key_path
                    .as_deref()
                    .ok_or(TokenError::MissingKeyPath("JWT_PUBLIC_KEY_PATH"))?;
                Self::ecdsa(algorithm, &read_key(private)?, &read_key(public)?)
            }
            None => Err(TokenError::UnsupportedAlgorithm(cfg.algorithm.clone())),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

fn read_key(path: &Path) -> Result<Vec<u8>, TokenError> {
    std::fs::read(path).map_err(|source| TokenError::KeyFile {
        path: path.display().to_string(),
        source,
    })
}

/// Token and its expiry, as returned to the client after login.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

/// Issues and verifies bearer tokens. Stateless: a token is valid purely
/// by signature and timestamps.
#[derive(Clone)]
pub struct TokenService {
    keys: SigningKeys,
    lifetime_hours: i64,
    validation: Validation,
}

impl TokenService {
    pub fn new(keys: SigningKeys, lifetime_hours: i64) -> Self {
        let mut validation = Validation::new(keys.algorithm);
        // Time checks are done by `verify_at` so the clock can be injected.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "iat", "nbf", "exp"]);
        Self {
            keys,
            lifetime_hours,
            validation,
        }
    }

    /// Loads keys from configuration and proves they can sign and verify.
    pub fn from_config(cfg: &JwtConfig) -> Result<Self, TokenError> {
        let keys = SigningKeys::from_config(cfg)?;
        let service = Self::new(keys, cfg.lifetime_hours);
        let sample = service.issue(Uuid::nil())?;
        service.verify(&sample.token)?;
        info!(algorithm = ?service.algorithm(), lifetime_hours = cfg.lifetime_hours, "token service ready");
        Ok(service)
    }

    pub fn algorithm(&self) -> Algorithm {
        self.keys.algorithm
    }

    pub fn lifetime_hours(&self) -> i64 {
        self.lifetime_hours
    }

    pub fn issue(&self, subject: Uuid) -> Result<IssuedToken, TokenError> {
        self.issue_at(subject, self.lifetime_hours, OffsetDateTime::now_utc())
    }

    pub fn issue_at(
        &self,
        subject: Uuid,
        lifetime_hours: i64,
        now: OffsetDateTime,
    ) -> Result<IssuedToken, TokenError> {
        let lifetime = lifetime_hours
            .checked_mul(3600)
            .filter(|secs| *secs > 0)
            .map(Duration::seconds)
            .ok_or(TokenError::Lifetime(lifetime_hours))?;
        let iat = now.unix_timestamp();
        let expires_at = now
            .replace_nanosecond(0)
            .unwrap_or(now)
            .checked_add(lifetime)
            .ok_or(TokenError::Lifetime(lifetime_hours))?;
        let claims = Claims {
            sub: subject,
            iat,
            nbf: iat,
            exp: expires_at.unix_timestamp(),
        };
        let token = encode(&Header::new(self.keys.algorithm), &claims, &self.keys.encoding)
            .map_err(TokenError::Signing)?;
        debug!(user_id = %subject, exp = claims.exp, "jwt signed");
        Ok(IssuedToken { token, expires_at })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, OffsetDateTime::now_utc().unix_timestamp())
    }

    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.keys.decoding, &self.validation)
            .map_err(|e| {
                debug!(error = %e, "jwt rejected");
                TokenError::Invalid("malformed or bad signature")
            })?;
        let claims = data.claims;
        if !claims.is_active_at(now) {
            debug!(user_id = %claims.sub, now, nbf = claims.nbf, exp = claims.exp, "jwt outside validity window");
            return Err(TokenError::Invalid("expired or not yet valid"));
        }
        debug!(user_id = %claims.sub, "jwt verified");
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    fn hs_config(algorithm: &str, secret: &str) -> JwtConfig {
        JwtConfig {
            algorithm: algorithm.into(),
            secret: Some(secret.into()),
            private_key_path: None,
            public_key_path: None,
            lifetime_hours: 2,
        }
    }

    fn es_config() -> JwtConfig {
        JwtConfig {
            algorithm: "ES384".into(),
            secret: None,
            private_key_path: Some(fixture("ec384-private.pem")),
            public_key_path: Some(fixture("ec384-public.pem")),
            lifetime_hours: 2,
        }
    }

    #[test]
    fn hs512_sign_and_verify() {
        let svc = TokenService::from_config(&hs_config("HS512", "my-secret")).unwrap();
        let user_id = Uuid::new_v4();
        let issued = svc.issue(user_id).expect("issue");
        let claims = svc.verify(&issued.token).expect("verify");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iat, claims.nbf);
        assert_eq!(claims.exp - claims.iat, 2 * 3600);
        assert_eq!(issued.expires_at.unix_timestamp(), claims.exp);
    }

    #[test]
    fn es384_sign_and_verify() {
        let svc = TokenService::from_config(&es_config()).unwrap();
        assert_eq!(svc.algorithm(), Algorithm::ES384);
        let user_id = Uuid::new_v4();
        let issued = svc.issue(user_id).unwrap();
        assert_eq!(svc.verify(&issued.token).unwrap().sub, user_id);
    }

    #[test]
    fn short_secret_is_a_config_error() {
        let err = TokenService::from_config(&hs_config("HS512", "secret")).err().unwrap();
        assert!(matches!(err, TokenError::WeakSecret));
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        for algo in ["", "RS256", "none"] {
            let err = TokenService::from_config(&hs_config(algo, "my-secret")).err().unwrap();
            assert!(matches!(err, TokenError::UnsupportedAlgorithm(_)), "{algo}");
        }
    }

    #[test]
    fn missing_key_file_fails_at_startup() {
        let mut cfg = es_config();
        cfg.public_key_path = Some(fixture("does-not-exist.pem"));
        let err = TokenService::from_config(&cfg).err().unwrap();
        assert!(matches!(err, TokenError::KeyFile { .. }));

        cfg.public_key_path = None;
        let err = TokenService::from_config(&cfg).err().unwrap();
        assert!(matches!(err, TokenError::MissingKeyPath(_)));
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let svc = TokenService::from_config(&hs_config("HS256", "boundary-secret")).unwrap();
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let issued = svc.issue_at(Uuid::new_v4(), 1, now).unwrap();
        let exp = issued.expires_at.unix_timestamp();
        assert_eq!(exp, 1_700_000_000 + 3600);

        assert!(svc.verify_at(&issued.token, now.unix_timestamp()).is_ok());
        assert!(svc.verify_at(&issued.token, exp - 1).is_ok());
        assert!(matches!(
            svc.verify_at(&issued.token, exp),
            Err(TokenError::Invalid(_))
        ));
        assert!(matches!(
            svc.verify_at(&issued.token, now.unix_timestamp() - 1),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn foreign_or_tampered_tokens_are_invalid() {
        let svc = TokenService::from_config(&hs_config("HS512", "first-secret")).unwrap();
        let other = TokenService::from_config(&hs_config("HS512", "second-secret")).unwrap();
        let issued = other.issue(Uuid::new_v4()).unwrap();
        assert!(matches!(svc.verify(&issued.token), Err(TokenError::Invalid(_))));

        let mut tampered = svc.issue(Uuid::new_v4()).unwrap().token;
        tampered.push('x');
        assert!(matches!(svc.verify(&tampered), Err(TokenError::Invalid(_))));
        assert!(matches!(svc.verify("not.a.jwt"), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn hmac_token_is_rejected_by_ecdsa_service() {
        let hs = TokenService::from_config(&hs_config("HS384", "my-secret")).unwrap();
        let es = TokenService::from_config(&es_config()).unwrap();
        let issued = hs.issue(Uuid::new_v4()).unwrap();
        assert!(es.verify(&issued.token).is_err());
    }

    #[test]
    fn out_of_range_lifetime_is_an_error_not_a_panic() {
        let svc = TokenService::from_config(&hs_config("HS256", "my-secret")).unwrap();
        let now = OffsetDateTime::now_utc();
        for hours in [0, -1, i64::MAX, i64::MAX / 3600, 200_000_000] {
            assert!(matches!(
                svc.issue_at(Uuid::new_v4(), hours, now),
                Err(TokenError::Lifetime(h)) if h == hours
            ));
        }
        assert!(svc.issue_at(Uuid::new_v4(), 87_600, now).is_ok());
    }

    #[test]
    fn service_with_zero_lifetime_does_not_start() {
        let mut cfg = hs_config("HS256", "my-secret");
        cfg.lifetime_hours = 0;
        assert!(matches!(
            TokenService::from_config(&cfg),
            Err(TokenError::Lifetime(0))
        ));
    }
}
