use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use tracing::{error, warn};

lazy_static! {
    // Verified against when the stored hash is unreadable, so a corrupt row
    // costs the same as a wrong password.
    static ref DUMMY_HASH: Option<String> = hash_password("userhub-dummy-password").ok();
}

/// Argon2id with a fresh random salt per call.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Returns false for a wrong password and for an unparsable hash alike.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "stored password hash is malformed");
            burn_verify(plain);
            false
        }
    }
}

/// Spends one verification's worth of work without a real hash. Used when
/// the account does not exist, so unknown emails answer as slowly as
/// wrong passwords.
pub fn burn_verify(plain: &str) {
    if let Some(dummy) = DUMMY_HASH.as_deref() {
        if let Ok(parsed) = PasswordHash::new(dummy) {
            let _ = Argon2::default().verify_password(plain.as_bytes(), &parsed);
        }
    }
}
