//! `releasehub-core`: shared identifiers and the domain error model.
//!
//! Nothing in here knows about HTTP or storage.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{ReleaseId, UserId};
