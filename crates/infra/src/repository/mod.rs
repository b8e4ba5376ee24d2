//! Generic persistence for entities.
//!
//! One repository per entity type. `save` is insert-or-update: it checks the
//! expected version against what is stored, bumps the version and returns the
//! stored record.

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PgRepository;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

use stockroom_core::{Entity, ExpectedVersion};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Stale version or unique constraint clash.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// Driver/connection failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// All records, oldest first.
    async fn find_all(&self) -> Result<Vec<E>, RepositoryError>;

    async fn find_by_id(&self, id: E::Id) -> Result<Option<E>, RepositoryError>;

    /// Records whose top-level serialized `field` equals `value`.
    async fn find_by_field(&self, field: &str, value: &JsonValue) -> Result<Vec<E>, RepositoryError>;

    async fn save(&self, entity: E, expected: ExpectedVersion) -> Result<E, RepositoryError>;

    /// `false` when nothing was stored under `id`.
    async fn delete(&self, id: E::Id) -> Result<bool, RepositoryError>;

    async fn count(&self) -> Result<u64, RepositoryError>;

    /// Liveness check used by the health endpoint.
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

fn stale(kind: &str, expected: ExpectedVersion, actual: u64) -> RepositoryError {
    RepositoryError::Conflict(format!(
        "stale {kind}: expected version {expected:?}, found {actual}"
    ))
}
