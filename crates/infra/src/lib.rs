//! Infrastructure layer: persistence adapters for releases and the user
//! directory they reference.

pub mod store;

pub use store::{
    InMemoryReleaseStore, InMemoryUserDirectory, PopulatedRelease, PostgresReleaseStore,
    PostgresUserDirectory, ReleaseStore, StoreError, UserDirectory, UserSummary,
};
