use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use releasehub_infra::{
    InMemoryReleaseStore, InMemoryUserDirectory, PostgresReleaseStore, PostgresUserDirectory,
    ReleaseStore, UserDirectory,
};

use crate::config::StoreConfig;

/// Store handles shared by every request.
#[derive(Clone)]
pub struct AppServices {
    pub releases: Arc<dyn ReleaseStore>,
    pub users: Arc<dyn UserDirectory>,
}

impl AppServices {
    /// In-memory stores for tests/dev. Both handles share one user directory,
    /// so owners registered through `users` are populated on releases.
    pub fn in_memory() -> Self {
        let users = Arc::new(InMemoryUserDirectory::new());
        let releases = Arc::new(InMemoryReleaseStore::new(users.clone()));
        Self { releases, users }
    }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self {
            releases: Arc::new(PostgresReleaseStore::new(pool.clone())),
            users: Arc::new(PostgresUserDirectory::new(pool)),
        }
    }
}

pub async fn build_services(store: &StoreConfig) -> Result<AppServices, sqlx::Error> {
    match store {
        StoreConfig::InMemory => {
            tracing::info!("using in-memory stores");
            Ok(AppServices::in_memory())
        }
        StoreConfig::Postgres {
            database_url,
            max_connections,
        } => {
            let pool = PgPoolOptions::new()
                .max_connections(*max_connections)
                .connect(database_url)
                .await?;
            tracing::info!(max_connections, "connected to postgres");
            Ok(AppServices::postgres(pool))
        }
    }
}
