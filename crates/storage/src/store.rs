use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// A row type living in its own table, addressed by a deterministic string id.
pub trait Entity: Serialize + DeserializeOwned {
    /// Table the entity is stored in.
    const TABLE: &'static str;

    fn id(&self) -> &str;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to encode {table}/{id}: {source}")]
    Encode {
        table: &'static str,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode {table}/{id}: {source}")]
    Decode {
        table: &'static str,
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Keyed entity storage the mapper reads from and writes to.
///
/// The owner of the store (the indexing runtime) persists it; the mapper only
/// performs point reads and upserts during a single event.
pub trait EntityStore {
    /// Load an entity by id.
    fn load<E: Entity>(&self, id: &str) -> Result<Option<E>, StoreError>;

    /// Insert or replace an entity.
    fn save<E: Entity>(&mut self, entity: &E) -> Result<(), StoreError>;

    /// Whether an entity with this id exists.
    fn exists<E: Entity>(&self, id: &str) -> bool;
}

/// In-memory [`EntityStore`]: `table -> id -> JSON row`.
///
/// Rows are kept in their serialized form so the whole store can be dumped as
/// a snapshot and so every load exercises the same encoding a real backend would.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: BTreeMap<&'static str, BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows in the entity's table.
    pub fn count<E: Entity>(&self) -> usize {
        self.tables.get(E::TABLE).map_or(0, BTreeMap::len)
    }

    /// All rows of the entity's table, ordered by id.
    pub fn list<E: Entity>(&self) -> Result<Vec<E>, StoreError> {
        let Some(table) = self.tables.get(E::TABLE) else {
            return Ok(Vec::new());
        };
        table
            .iter()
            .map(|(id, row)| decode(E::TABLE, id, row))
            .collect()
    }

    /// The whole store as `{ table: { id: row } }`.
    pub fn snapshot(&self) -> Value {
        let tables = self
            .tables
            .iter()
            .map(|(name, rows)| {
                let rows = rows.iter().map(|(id, row)| (id.clone(), row.clone())).collect();
                (name.to_string(), Value::Object(rows))
            })
            .collect();
        Value::Object(tables)
    }
}

impl EntityStore for MemoryStore {
    fn load<E: Entity>(&self, id: &str) -> Result<Option<E>, StoreError> {
        self.tables
            .get(E::TABLE)
            .and_then(|table| table.get(id))
            .map(|row| decode(E::TABLE, id, row))
            .transpose()
    }

    fn save<E: Entity>(&mut self, entity: &E) -> Result<(), StoreError> {
        let row = serde_json::to_value(entity).map_err(|source| StoreError::Encode {
            table: E::TABLE,
            id: entity.id().to_string(),
            source,
        })?;
        self.tables
            .entry(E::TABLE)
            .or_default()
            .insert(entity.id().to_string(), row);
        Ok(())
    }

    fn exists<E: Entity>(&self, id: &str) -> bool {
        self.tables
            .get(E::TABLE)
            .is_some_and(|table| table.contains_key(id))
    }
}

fn decode<E: Entity>(table: &'static str, id: &str, row: &Value) -> Result<E, StoreError> {
    E::deserialize(row).map_err(|source| StoreError::Decode {
        table,
        id: id.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GlobalStats, User};
    use alloy::primitives::{U256, address};
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    #[test]
    fn test_load_missing_returns_none() {
        let store = MemoryStore::new();
        let user: Option<User> = store.load("0xabc").unwrap();
        assert!(user.is_none());
        assert_eq!(store.count::<User>(), 0);
    }

    #[test]
    fn test_save_then_load() {
        let mut store = MemoryStore::new();
        let mut user = User::new(address!("00000000000000000000000000000000000a11ce"), 5);
        user.total_spent = U256::from(1_650_000_000_000_000_000u128);
        store.save(&user).unwrap();

        let loaded: User = store.load(&user.id).unwrap().unwrap();
        assert_eq!(loaded, user);
        assert!(store.exists::<User>(&user.id));
        assert_eq!(store.count::<User>(), 1);
    }

    #[test]
    fn test_save_replaces_existing_row() {
        let mut store = MemoryStore::new();
        let mut stats = GlobalStats::default();
        store.save(&stats).unwrap();

        stats.total_mints = U256::from(2);
        stats.average_gas_used = BigDecimal::from_str("21000.5").unwrap();
        store.save(&stats).unwrap();

        assert_eq!(store.count::<GlobalStats>(), 1);
        let loaded: GlobalStats = store.load(GlobalStats::ID).unwrap().unwrap();
        assert_eq!(loaded.total_mints, U256::from(2));
        assert_eq!(loaded.average_gas_used, BigDecimal::from_str("21000.5").unwrap());
    }

    #[test]
    fn test_snapshot_shape() {
        let mut store = MemoryStore::new();
        store.save(&GlobalStats::default()).unwrap();

        let snapshot = store.snapshot();
        assert!(snapshot["global_stats"]["global"].is_object());
    }

    #[test]
    fn test_corrupt_row_is_a_decode_error() {
        let mut store = MemoryStore::new();
        store
            .tables
            .entry(User::TABLE)
            .or_default()
            .insert("bad".into(), Value::String("not a user".into()));

        let result: Result<Option<User>, _> = store.load("bad");
        assert!(matches!(result, Err(StoreError::Decode { .. })));
    }
}
