use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use stockroom_core::{Entity, ExpectedVersion};

use super::{stale, Repository, RepositoryError};

/// In-memory repository.
///
/// Intended for tests/dev. Records are cloned in and out.
#[derive(Debug)]
pub struct InMemoryRepository<E: Entity> {
    records: RwLock<HashMap<Uuid, E>>,
}

impl<E: Entity> Default for InMemoryRepository<E> {
    fn default() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl<E: Entity> InMemoryRepository<E> {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<Uuid, E>>, RepositoryError> {
        self.records
            .read()
            .map_err(|_| RepositoryError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<Uuid, E>>, RepositoryError> {
        self.records
            .write()
            .map_err(|_| RepositoryError::Backend("lock poisoned".to_string()))
    }
}

fn oldest_first<E: Entity>(records: &mut [E]) {
    records.sort_by_key(|e| (e.timestamps().created_at, Into::<Uuid>::into(e.id())));
}

#[async_trait]
impl<E: Entity> Repository<E> for InMemoryRepository<E> {
    async fn find_all(&self) -> Result<Vec<E>, RepositoryError> {
        let mut all: Vec<E> = self.read()?.values().cloned().collect();
        oldest_first(&mut all);
        Ok(all)
    }

    async fn find_by_id(&self, id: E::Id) -> Result<Option<E>, RepositoryError> {
        let key: Uuid = id.into();
        Ok(self.read()?.get(&key).cloned())
    }

    async fn find_by_field(&self, field: &str, value: &JsonValue) -> Result<Vec<E>, RepositoryError> {
        let records = self.read()?;
        let mut matches = Vec::new();
        for record in records.values() {
            let doc = serde_json::to_value(record)
                .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
            if doc.get(field) == Some(value) {
                matches.push(record.clone());
            }
        }
        oldest_first(&mut matches);
        Ok(matches)
    }

    async fn save(&self, mut entity: E, expected: ExpectedVersion) -> Result<E, RepositoryError> {
        let mut records = self.write()?;
        let key: Uuid = entity.id().into();
        let current = records.get(&key).map(|e| e.version()).unwrap_or(0);
        if !expected.matches(current) {
            return Err(stale(E::KIND, expected, current));
        }
        entity.set_version(current + 1);
        records.insert(key, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: E::Id) -> Result<bool, RepositoryError> {
        let key: Uuid = id.into();
        Ok(self.write()?.remove(&key).is_some())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.read()?.len() as u64)
    }
}
