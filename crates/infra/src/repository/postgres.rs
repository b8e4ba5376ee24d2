//! Postgres-backed repository.
//!
//! Every entity type gets a document table
//! (`id UUID PRIMARY KEY, version BIGINT, body JSONB, created_at, updated_at`).
//! The `version` column is authoritative; the copy inside `body` is
//! overwritten on load.
//!
//! ## Error Mapping
//!
//! | SQLx error | Code | RepositoryError |
//! |------------|------|-----------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | any | `Backend` |
//! | PoolClosed / Io / other | N/A | `Backend` |

use std::marker::PhantomData;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use stockroom_core::{Entity, ExpectedVersion};

use super::{stale, Repository, RepositoryError};

pub struct PgRepository<E> {
    pool: PgPool,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for PgRepository<E> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E> core::fmt::Debug for PgRepository<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PgRepository").finish_non_exhaustive()
    }
}

impl<E: Entity> PgRepository<E> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }

    fn decode(row: &PgRow) -> Result<E, RepositoryError> {
        let version: i64 = row
            .try_get("version")
            .map_err(|e| map_sqlx_error("decode", e))?;
        let body: JsonValue = row.try_get("body").map_err(|e| map_sqlx_error("decode", e))?;
        let mut entity: E = serde_json::from_value(body).map_err(|e| {
            RepositoryError::Serialization(format!("failed to decode {} row: {e}", E::TABLE))
        })?;
        entity.set_version(version as u64);
        Ok(entity)
    }

    fn encode(entity: &E) -> Result<JsonValue, RepositoryError> {
        serde_json::to_value(entity).map_err(|e| RepositoryError::Serialization(e.to_string()))
    }

    async fn current_version(&self, id: Uuid) -> Result<u64, RepositoryError> {
        let version: Option<i64> =
            sqlx::query_scalar(&format!("SELECT version FROM {} WHERE id = $1", E::TABLE))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("current_version", e))?;
        Ok(version.unwrap_or(0) as u64)
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for PgRepository<E> {
    #[instrument(skip(self), fields(table = E::TABLE), err)]
    async fn find_all(&self) -> Result<Vec<E>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT version, body FROM {} ORDER BY created_at ASC, id ASC",
            E::TABLE
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_all", e))?;

        rows.iter().map(Self::decode).collect()
    }

    #[instrument(skip(self), fields(table = E::TABLE, id = %id), err)]
    async fn find_by_id(&self, id: E::Id) -> Result<Option<E>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT version, body FROM {} WHERE id = $1", E::TABLE))
            .bind(Into::<Uuid>::into(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_id", e))?;

        row.as_ref().map(Self::decode).transpose()
    }

    #[instrument(skip(self, value), fields(table = E::TABLE), err)]
    async fn find_by_field(&self, field: &str, value: &JsonValue) -> Result<Vec<E>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT version, body FROM {} WHERE body -> $1 = $2 ORDER BY created_at ASC, id ASC",
            E::TABLE
        ))
        .bind(field)
        .bind(Json(value))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_field", e))?;

        rows.iter().map(Self::decode).collect()
    }

    #[instrument(
        skip(self, entity),
        fields(table = E::TABLE, id = %entity.id(), expected_version = ?expected),
        err
    )]
    async fn save(&self, mut entity: E, expected: ExpectedVersion) -> Result<E, RepositoryError> {
        let id: Uuid = entity.id().into();
        let timestamps = *entity.timestamps();

        match expected {
            ExpectedVersion::Exact(0) => {
                entity.set_version(1);
                let body = Self::encode(&entity)?;
                sqlx::query(&format!(
                    "INSERT INTO {} (id, version, body, created_at, updated_at) VALUES ($1, 1, $2, $3, $4)",
                    E::TABLE
                ))
                .bind(id)
                .bind(Json(&body))
                .bind(timestamps.created_at)
                .bind(timestamps.updated_at)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("insert", e))?;
            }
            ExpectedVersion::Exact(current) => {
                entity.set_version(current + 1);
                let body = Self::encode(&entity)?;
                let result = sqlx::query(&format!(
                    "UPDATE {} SET version = version + 1, body = $3, updated_at = $4 WHERE id = $1 AND version = $2",
                    E::TABLE
                ))
                .bind(id)
                .bind(current as i64)
                .bind(Json(&body))
                .bind(timestamps.updated_at)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("update", e))?;

                if result.rows_affected() == 0 {
                    let actual = self.current_version(id).await?;
                    return Err(stale(E::KIND, expected, actual));
                }
            }
            ExpectedVersion::Any => {
                let body = Self::encode(&entity)?;
                let version: i64 = sqlx::query_scalar(&format!(
                    "INSERT INTO {t} (id, version, body, created_at, updated_at) VALUES ($1, 1, $2, $3, $4) \
                     ON CONFLICT (id) DO UPDATE SET version = {t}.version + 1, body = EXCLUDED.body, \
                     updated_at = EXCLUDED.updated_at RETURNING version",
                    t = E::TABLE
                ))
                .bind(id)
                .bind(Json(&body))
                .bind(timestamps.created_at)
                .bind(timestamps.updated_at)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("upsert", e))?;
                entity.set_version(version as u64);
            }
        }

        Ok(entity)
    }

    #[instrument(skip(self), fields(table = E::TABLE, id = %id), err)]
    async fn delete(&self, id: E::Id) -> Result<bool, RepositoryError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", E::TABLE))
            .bind(Into::<Uuid>::into(id))
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", E::TABLE))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count", e))?;
        Ok(count as u64)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ping", e))?;
        Ok(())
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => RepositoryError::Conflict(msg),
                _ => RepositoryError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            RepositoryError::Backend(format!("connection pool closed in {operation}"))
        }
        other => RepositoryError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}
