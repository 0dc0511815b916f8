use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT payload. All timestamps are whole seconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // user ID
    pub iat: i64,  // issued at
    pub nbf: i64,  // not before
    pub exp: i64,  // expires at
}

impl Claims {
    /// Valid on the half-open window `[nbf, exp)`.
    pub fn is_active_at(&self, now: i64) -> bool {
        self.nbf <= now && now < self.exp
    }
}
