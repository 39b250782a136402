//! Postgres-backed release store and user directory.
//!
//! Expected tables (owned by the application's schema tooling, not created
//! here):
//!
//! ```sql
//! CREATE TABLE users (
//!     id            UUID PRIMARY KEY,
//!     display_name  TEXT NOT NULL
//! );
//!
//! CREATE TABLE releases (
//!     id       UUID PRIMARY KEY,
//!     name     TEXT NOT NULL,
//!     created  TIMESTAMPTZ NOT NULL,
//!     user_id  UUID NULL REFERENCES users (id)
//! );
//! ```
//!
//! Every token subject that creates a release must already have a `users`
//! row; otherwise the insert fails the `releases_user_id_fkey` constraint
//! and the caller gets "User does not exist".
//!
//! ## Error Mapping
//!
//! | SQLx error | Postgres code | StoreError |
//! |------------|---------------|------------|
//! | Database (unique violation) | `23505` | `Duplicate` (field from constraint name) |
//! | Database (foreign key violation) | `23503` | `UnknownReference` (field from constraint name) |
//! | Database (other) | any | `Backend` |
//! | PoolClosed / IO / decode | n/a | `Backend` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use releasehub_core::{ReleaseId, UserId};
use releasehub_releases::Release;

use super::{PopulatedRelease, ReleaseStore, StoreError, UserDirectory, UserSummary};

const SELECT_POPULATED: &str = r#"
    SELECT
        r.id,
        r.name,
        r.created,
        r.user_id,
        u.display_name
    FROM releases r
    LEFT JOIN users u ON u.id = r.user_id
"#;

/// Postgres-backed release store.
///
/// Uses the SQLx pool, which is `Send + Sync` and shared across requests.
#[derive(Debug, Clone)]
pub struct PostgresReleaseStore {
    pool: Arc<PgPool>,
}

impl PostgresReleaseStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn fetch_one_populated(&self, id: ReleaseId) -> Result<Option<PopulatedRelease>, StoreError> {
        let sql = format!("{SELECT_POPULATED} WHERE r.id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_release", e))?;

        row.map(|r| populated_from_row(&r)).transpose()
    }
}

#[async_trait]
impl ReleaseStore for PostgresReleaseStore {
    #[instrument(skip(self, release), fields(release_id = %release.id), err)]
    async fn insert(&self, release: Release) -> Result<PopulatedRelease, StoreError> {
        release.validate()?;

        sqlx::query("INSERT INTO releases (id, name, created, user_id) VALUES ($1, $2, $3, $4)")
            .bind(release.id.as_uuid())
            .bind(&release.name)
            .bind(release.created)
            .bind(release.user.map(Uuid::from))
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_release", e))?;

        self.fetch_one_populated(release.id)
            .await?
            .ok_or(StoreError::NotFound)
    }

    #[instrument(skip(self), fields(release_id = %id), err)]
    async fn find(&self, id: ReleaseId) -> Result<Option<PopulatedRelease>, StoreError> {
        self.fetch_one_populated(id).await
    }

    #[instrument(skip(self, release), fields(release_id = %release.id), err)]
    async fn save(&self, release: Release) -> Result<PopulatedRelease, StoreError> {
        release.validate()?;

        let result = sqlx::query("UPDATE releases SET name = $2, created = $3, user_id = $4 WHERE id = $1")
            .bind(release.id.as_uuid())
            .bind(&release.name)
            .bind(release.created)
            .bind(release.user.map(Uuid::from))
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_release", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        self.fetch_one_populated(release.id)
            .await?
            .ok_or(StoreError::NotFound)
    }

    #[instrument(skip(self), fields(release_id = %id), err)]
    async fn remove(&self, id: ReleaseId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM releases WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_release", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_newest_first(&self) -> Result<Vec<PopulatedRelease>, StoreError> {
        let sql = format!("{SELECT_POPULATED} ORDER BY r.created DESC, r.id DESC");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_releases", e))?;

        rows.iter().map(populated_from_row).collect()
    }
}

/// Postgres-backed user directory (read side of the `users` table).
#[derive(Debug, Clone)]
pub struct PostgresUserDirectory {
    pool: Arc<PgPool>,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn get(&self, id: UserId) -> Result<Option<UserSummary>, StoreError> {
        let row = sqlx::query("SELECT id, display_name FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user", e))?;

        row.map(|r| {
            let id: Uuid = r.try_get("id").map_err(|e| map_sqlx_error("decode_user", e))?;
            let display_name: String = r
                .try_get("display_name")
                .map_err(|e| map_sqlx_error("decode_user", e))?;
            Ok::<_, StoreError>(UserSummary {
                id: UserId::from_uuid(id),
                display_name,
            })
        })
        .transpose()
    }

    async fn upsert(&self, user: UserSummary) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, display_name) VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET display_name = EXCLUDED.display_name
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.display_name)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_user", e))?;
        Ok(())
    }
}

fn populated_from_row(row: &PgRow) -> Result<PopulatedRelease, StoreError> {
    let decode = |e| map_sqlx_error("decode_release", e);

    let id: Uuid = row.try_get("id").map_err(decode)?;
    let name: String = row.try_get("name").map_err(decode)?;
    let created: DateTime<Utc> = row.try_get("created").map_err(decode)?;
    let user_id: Option<Uuid> = row.try_get("user_id").map_err(decode)?;
    let display_name: Option<String> = row.try_get("display_name").map_err(decode)?;

    let user = user_id.map(UserId::from_uuid);
    let owner = match (user, display_name) {
        (Some(id), Some(display_name)) => Some(UserSummary { id, display_name }),
        _ => None,
    };

    Ok(PopulatedRelease {
        release: Release {
            id: ReleaseId::from_uuid(id),
            name,
            created,
            user,
        },
        owner,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            match db_err.code().as_deref() {
                Some("23505") => {
                    return StoreError::Duplicate {
                        field: field_from_constraint(db_err.constraint(), "_key"),
                    };
                }
                Some("23503") => {
                    return StoreError::UnknownReference {
                        field: field_from_constraint(db_err.constraint(), "_fkey"),
                    };
                }
                _ => {}
            }
            tracing::error!(operation, error = %db_err.message(), "database error");
            StoreError::Backend(format!("database error in {}: {}", operation, db_err.message()))
        }
        other => {
            tracing::error!(operation, error = %other, "sqlx error");
            StoreError::Backend(format!("sqlx error in {}: {}", operation, other))
        }
    }
}

/// `releases_name_key` → `name`, `releases_user_id_fkey` → `user_id`. Falls
/// back to `value` when the constraint name does not follow the default
/// Postgres naming.
fn field_from_constraint(constraint: Option<&str>, suffix: &str) -> String {
    constraint
        .and_then(|c| c.strip_suffix(suffix))
        .and_then(|c| c.split_once('_').map(|(_, field)| field.to_string()))
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| "value".to_string())
}
