//! Bearer token verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};

/// Verifies a raw bearer token and yields its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

/// HS256 (shared secret) token validator.
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry lives in our own `issued_at`/`expires_at` claims, not in `exp`.
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.key, &self.validation)
            .map_err(|e| TokenValidationError::Malformed(e.to_string()))?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}
