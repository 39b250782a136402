//! Releases domain module.
//!
//! The Release model and its rules, implemented as deterministic domain logic
//! (no IO, no HTTP, no storage).

pub mod release;

pub use release::{NAME_REQUIRED, NewRelease, Release, ReleaseChanges};
