//! Entity contract shared by every persisted record.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// A persisted record with identity and a version counter.
///
/// Repositories are generic over this trait: `TABLE` names the collection the
/// record lives in, and `version`/`set_version` carry optimistic concurrency.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Strongly-typed entity identifier.
    type Id: Copy
        + Eq
        + core::hash::Hash
        + core::fmt::Debug
        + core::fmt::Display
        + Send
        + Sync
        + Into<Uuid>
        + From<Uuid>
        + 'static;

    /// Collection/table name.
    const TABLE: &'static str;

    /// Human-readable record kind used in "not found" errors.
    const KIND: &'static str;

    fn id(&self) -> Self::Id;

    /// Stored version (0 until first save).
    fn version(&self) -> u64;

    fn set_version(&mut self, version: u64);

    fn timestamps(&self) -> &Timestamps;
}

/// Creation and last-modification instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Timestamps {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}
