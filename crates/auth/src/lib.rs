//! `releasehub-auth`: authentication/authorization boundary.
//!
//! This crate is decoupled from HTTP and storage: it verifies bearer tokens
//! and answers ownership questions, nothing more.

pub mod authorize;
pub mod claims;
pub mod validator;

pub use authorize::{AuthzError, authorize_owner};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use validator::{Hs256JwtValidator, JwtValidator};
