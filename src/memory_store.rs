//! InMemoryStore - BTreeMap-backed table store for local use and tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::ops::Bound;
use std::path::Path;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::domain::PanelError;
use crate::record::{Record, Value};
use crate::store::{
    ContinuationToken, KeySchemaElement, KeyType, MAX_BATCH_DELETE, ScanPage, StoreError,
    StoreResult, TableStore,
};

/// Contents of a seed file: `{ "key_schema": ["id"], "items": [ {...}, ... ] }`.
#[derive(Debug, Deserialize)]
pub struct TableSeed {
    pub key_schema: Vec<String>,
    #[serde(default)]
    pub items: Vec<Record>,
}

impl TableSeed {
    pub fn load(path: &Path) -> Result<Self, PanelError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

struct MemoryTable {
    key_schema: Vec<String>,
    items: BTreeMap<Vec<Value>, Record>, // Ordered by key values, so scans resume after deletes.
}

impl MemoryTable {
    fn key_of(&self, record: &Record) -> Option<Vec<Value>> {
        self.key_schema
            .iter()
            .map(|field| record.get(field).cloned())
            .collect()
    }
}

/// Table store held in memory, shared by cloning.
#[derive(Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<HashMap<String, MemoryTable>>>,
    page_size: usize,
}

impl InMemoryStore {
    pub fn new(page_size: usize) -> Self {
        Self {
            tables: Arc::new(RwLock::new(HashMap::new())),
            page_size: page_size.max(1),
        }
    }

    /// Create (or replace) `table` with the given key schema and rows.
    ///
    /// Rows missing one of the key fields are rejected.
    pub fn insert_table(
        &self,
        table: &str,
        key_schema: Vec<String>,
        items: Vec<Record>,
    ) -> Result<(), StoreError> {
        let mut memory_table = MemoryTable {
            key_schema,
            items: BTreeMap::new(),
        };
        for item in items {
            let key = memory_table.key_of(&item).ok_or_else(|| {
                StoreError::Validation(format!("item in {table} is missing a key field"))
            })?;
            memory_table.items.insert(key, item);
        }
        debug!(
            "Seeded table {} with {} items",
            table,
            memory_table.items.len()
        );
        self.write()?.insert(table.to_string(), memory_table);
        Ok(())
    }

    pub fn seed_table(&self, table: &str, seed: TableSeed) -> Result<(), StoreError> {
        self.insert_table(table, seed.key_schema, seed.items)
    }

    pub fn len(&self, table: &str) -> usize {
        self.tables
            .read()
            .ok()
            .and_then(|tables| tables.get(table).map(|t| t.items.len()))
            .unwrap_or(0)
    }

    fn read(
        &self,
    ) -> StoreResult<std::sync::RwLockReadGuard<'_, HashMap<String, MemoryTable>>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Request("lock poisoned".into()))
    }

    fn write(
        &self,
    ) -> StoreResult<std::sync::RwLockWriteGuard<'_, HashMap<String, MemoryTable>>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Request("lock poisoned".into()))
    }
}

#[async_trait]
impl TableStore for InMemoryStore {
    async fn describe_key_schema(&self, table: &str) -> StoreResult<Vec<KeySchemaElement>> {
        let tables = self.read()?;
        let memory_table = tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        Ok(memory_table
            .key_schema
            .iter()
            .enumerate()
            .map(|(idx, name)| KeySchemaElement {
                attribute_name: name.clone(),
                key_type: if idx == 0 { KeyType::Hash } else { KeyType::Range },
            })
            .collect())
    }

    async fn scan(&self, table: &str, start: Option<ContinuationToken>) -> StoreResult<ScanPage> {
        let tables = self.read()?;
        let memory_table = tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;

        let lower = match start {
            Some(ContinuationToken(last)) => {
                let key = memory_table.key_of(&last).ok_or_else(|| {
                    StoreError::Validation("continuation token does not match key schema".into())
                })?;
                Bound::Excluded(key)
            }
            None => Bound::Unbounded,
        };

        let mut page: Vec<(&Vec<Value>, &Record)> = memory_table
            .items
            .range((lower, Bound::Unbounded))
            .take(self.page_size + 1)
            .collect();
        let has_more = page.len() > self.page_size;
        page.truncate(self.page_size);

        let continuation = if has_more {
            page.last().map(|(key, _)| {
                ContinuationToken(
                    memory_table
                        .key_schema
                        .iter()
                        .cloned()
                        .zip(key.iter().cloned())
                        .collect(),
                )
            })
        } else {
            None
        };
        trace!(
            "Scan {} returned {} items, more: {}",
            table,
            page.len(),
            has_more
        );

        Ok(ScanPage {
            items: page.into_iter().map(|(_, item)| item.clone()).collect(),
            continuation,
        })
    }

    async fn batch_delete(&self, table: &str, key_field: &str, ids: &[Value]) -> StoreResult<()> {
        if ids.len() > MAX_BATCH_DELETE {
            return Err(StoreError::BatchTooLarge {
                size: ids.len(),
                limit: MAX_BATCH_DELETE,
            });
        }
        if key_field.is_empty() {
            return Err(StoreError::Validation("empty key field".into()));
        }

        let mut tables = self.write()?;
        let memory_table = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        if memory_table.key_schema.first().map(String::as_str) != Some(key_field) {
            return Err(StoreError::Validation(format!(
                "{key_field} is not the key of {table}"
            )));
        }
        // One value per id cannot address a row of a composite key.
        if memory_table.key_schema.len() > 1 {
            return Err(StoreError::Validation(format!(
                "{table} has a composite key ({}), a delete needs every key part",
                memory_table.key_schema.join(", ")
            )));
        }

        let ids: HashSet<&Value> = ids.iter().collect();
        let before = memory_table.items.len();
        memory_table
            .items
            .retain(|_, item| item.get(key_field).is_none_or(|v| !ids.contains(v)));
        debug!(
            "Deleted {} items from {}",
            before - memory_table.items.len(),
            table
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::record;
    use std::io::Write;

    fn store_with(n: i64, page_size: usize) -> InMemoryStore {
        let store = InMemoryStore::new(page_size);
        let items = (0..n)
            .map(|i| record([("id", Value::string(format!("k{i:03}"))), ("n", Value::from(i))]))
            .collect();
        store.insert_table("t", vec!["id".into()], items).unwrap();
        store
    }

    #[tokio::test]
    async fn test_scan_pages_until_exhausted() {
        let store = store_with(5, 2);
        let first = store.scan("t", None).await.unwrap();
        assert_eq!(first.items.len(), 2);
        let second = store.scan("t", first.continuation).await.unwrap();
        assert_eq!(second.items.len(), 2);
        let third = store.scan("t", second.continuation).await.unwrap();
        assert_eq!(third.items.len(), 1);
        assert!(third.continuation.is_none());
        assert_eq!(third.items[0]["id"], Value::string("k004"));
    }

    #[tokio::test]
    async fn test_scan_resumes_after_deleted_item() {
        let store = store_with(4, 2);
        let first = store.scan("t", None).await.unwrap();
        store
            .batch_delete("t", "id", &[Value::string("k001")])
            .await
            .unwrap();
        let second = store.scan("t", first.continuation).await.unwrap();
        let ids: Vec<String> = second.items.iter().map(|r| r["id"].to_string()).collect();
        assert_eq!(ids, vec!["k002", "k003"]);
    }

    #[tokio::test]
    async fn test_describe_key_schema() {
        let store = InMemoryStore::new(10);
        store
            .insert_table("t", vec!["pk".into(), "sk".into()], Vec::new())
            .unwrap();
        let schema = store.describe_key_schema("t").await.unwrap();
        assert_eq!(schema[0].attribute_name, "pk");
        assert_eq!(schema[0].key_type, KeyType::Hash);
        assert_eq!(schema[1].key_type, KeyType::Range);
        assert_eq!(
            store.describe_key_schema("missing").await,
            Err(StoreError::TableNotFound("missing".into()))
        );
    }

    #[tokio::test]
    async fn test_batch_delete_limits() {
        let store = store_with(30, 10);
        let ids: Vec<Value> = (0..26).map(|i| Value::string(format!("k{i:03}"))).collect();
        assert_eq!(
            store.batch_delete("t", "id", &ids).await,
            Err(StoreError::BatchTooLarge { size: 26, limit: 25 })
        );
        assert!(store.batch_delete("t", "", &ids[..1]).await.is_err());
        assert!(store.batch_delete("t", "n", &ids[..1]).await.is_err());
        store.batch_delete("t", "id", &ids[..25]).await.unwrap();
        assert_eq!(store.len("t"), 5);
    }

    #[tokio::test]
    async fn test_batch_delete_rejects_partial_composite_key() {
        let store = InMemoryStore::new(10);
        store
            .insert_table(
                "t",
                vec!["pk".into(), "sk".into()],
                vec![
                    record([("pk", Value::from("a")), ("sk", Value::number(1))]),
                    record([("pk", Value::from("a")), ("sk", Value::number(2))]),
                ],
            )
            .unwrap();
        assert!(matches!(
            store.batch_delete("t", "pk", &[Value::from("a")]).await,
            Err(StoreError::Validation(_))
        ));
        assert_eq!(store.len("t"), 2);
    }

    #[test]
    fn test_insert_rejects_item_without_key() {
        let store = InMemoryStore::new(10);
        let result = store.insert_table("t", vec!["id".into()], vec![record([("name", "x")])]);
        assert!(matches!(result, Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_seed_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"key_schema": ["id"], "items": [{{"id": 1, "name": "x"}}, {{"id": 2}}]}}"#
        )
        .unwrap();
        let seed = TableSeed::load(file.path()).unwrap();
        let store = InMemoryStore::new(10);
        store.seed_table("t", seed).unwrap();
        assert_eq!(store.len("t"), 2);
    }
}
