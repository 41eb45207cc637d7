use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, info};

use crate::chunk::split_to_chunks;
use crate::record::{Record, Value, field_names};
use crate::store::{MAX_BATCH_DELETE, TableStore};

/// In-memory view of one remote table.
///
/// Store failures never escape a repository: they are logged and turned into
/// an empty result, so callers only ever see fewer rows or fewer deleted ids.
pub struct Repository {
    table_name: String,
    primary_key: String,
    rows: Vec<Record>,
    store: Arc<dyn TableStore>,
}

impl Repository {
    pub fn new(table_name: impl Into<String>, store: Arc<dyn TableStore>) -> Self {
        Self {
            table_name: table_name.into(),
            primary_key: String::new(),
            rows: Vec::new(),
            store,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Name of the primary key field. Empty until `initialize` succeeds.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn size(&self) -> usize {
        self.rows.len()
    }

    /// Union of field names across all rows.
    pub fn column_names(&self) -> BTreeSet<String> {
        field_names(&self.rows)
    }

    /// Primary key values of all rows that carry one.
    pub fn keys(&self) -> BTreeSet<Value> {
        self.rows
            .iter()
            .filter_map(|row| row.get(&self.primary_key).cloned())
            .collect()
    }

    pub async fn initialize(&mut self) {
        match self.store.describe_key_schema(&self.table_name).await {
            Ok(schema) => {
                self.primary_key = schema
                    .first()
                    .map(|element| element.attribute_name.clone())
                    .unwrap_or_default();
                info!(
                    "Table {} uses primary key {:?}",
                    self.table_name, self.primary_key
                );
                self.refresh().await;
            }
            Err(e) => {
                error!("Unable to init repository {}: {}", self.table_name, e);
                self.primary_key.clear();
                self.rows.clear();
            }
        }
    }

    /// Replace the rows with a fresh full scan.
    ///
    /// The new rows are collected first and swapped in at the end, so the old
    /// rows stay intact while the scan is in flight.
    pub async fn refresh(&mut self) -> &[Record] {
        self.rows = self.scan_all().await;
        info!("Loaded {} rows from {}", self.rows.len(), self.table_name);
        &self.rows
    }

    async fn scan_all(&self) -> Vec<Record> {
        let mut items = Vec::new();
        let mut start = None;
        loop {
            match self.store.scan(&self.table_name, start.take()).await {
                Ok(page) => {
                    debug!("Scanned page of {} rows from {}", page.items.len(), self.table_name);
                    items.extend(page.items);
                    match page.continuation {
                        Some(token) => start = Some(token),
                        None => break,
                    }
                }
                Err(e) => {
                    error!(
                        "Unable to fetch the data from the table {}: {}",
                        self.table_name, e
                    );
                    break;
                }
            }
        }
        items
    }

    /// Delete `ids` in batches and return the ids the store confirmed.
    ///
    /// The table is refreshed afterwards even if some batches failed. An empty
    /// `ids` list is a no-op.
    pub async fn delete(&mut self, ids: &[Value]) -> Vec<Value> {
        if ids.is_empty() {
            return Vec::new();
        }

        let chunks = split_to_chunks(ids, MAX_BATCH_DELETE);
        let this = &*self;
        let results = join_all(chunks.into_iter().map(|chunk| this.delete_chunk(chunk))).await;
        let deleted: Vec<Value> = results.into_iter().flatten().collect();
        info!(
            "Deleted {} of {} rows from {}",
            deleted.len(),
            ids.len(),
            self.table_name
        );

        self.refresh().await;
        deleted
    }

    async fn delete_chunk(&self, chunk: Vec<Value>) -> Vec<Value> {
        match self
            .store
            .batch_delete(&self.table_name, &self.primary_key, &chunk)
            .await
        {
            Ok(()) => chunk,
            Err(e) => {
                error!(
                    "Unable to delete chunk from the table {}: {}",
                    self.table_name, e
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::memory_store::InMemoryStore;
    use crate::record::record;
    use crate::store::{
        ContinuationToken, KeySchemaElement, KeyType, ScanPage, StoreError, StoreResult,
    };
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Store that replays fixed scan pages and records every batch delete.
    #[derive(Default)]
    pub(crate) struct ScriptedStore {
        pub key_schema: Option<Vec<String>>,
        pub pages: Vec<Vec<Record>>,
        pub fail_scan_at: Option<usize>,
        pub fail_batches: HashSet<usize>,
        pub schema_down: Mutex<bool>,
        pub scan_calls: Mutex<usize>,
        pub batches: Mutex<Vec<Vec<Value>>>,
    }

    impl ScriptedStore {
        pub fn with_pages(key: &str, pages: Vec<Vec<Record>>) -> Self {
            Self {
                key_schema: Some(vec![key.to_string()]),
                pages,
                ..Default::default()
            }
        }

        pub fn batches(&self) -> Vec<Vec<Value>> {
            self.batches.lock().unwrap().clone()
        }

        pub fn scan_calls(&self) -> usize {
            *self.scan_calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl TableStore for ScriptedStore {
        async fn describe_key_schema(&self, table: &str) -> StoreResult<Vec<KeySchemaElement>> {
            if *self.schema_down.lock().unwrap() {
                return Err(StoreError::Request("schema unavailable".into()));
            }
            match &self.key_schema {
                Some(keys) => Ok(keys
                    .iter()
                    .map(|k| KeySchemaElement {
                        attribute_name: k.clone(),
                        key_type: KeyType::Hash,
                    })
                    .collect()),
                None => Err(StoreError::TableNotFound(table.to_string())),
            }
        }

        async fn scan(
            &self,
            _table: &str,
            start: Option<ContinuationToken>,
        ) -> StoreResult<ScanPage> {
            *self.scan_calls.lock().unwrap() += 1;
            let idx = match start {
                None => 0,
                Some(ContinuationToken(token)) => match &token["page"] {
                    Value::Number(n) => n.parse::<usize>().unwrap(),
                    other => panic!("unexpected token {other}"),
                },
            };
            if self.fail_scan_at == Some(idx) {
                return Err(StoreError::Request("scan failed".into()));
            }
            let continuation = (idx + 1 < self.pages.len())
                .then(|| ContinuationToken(record([("page", Value::number(idx + 1))])));
            Ok(ScanPage {
                items: self.pages.get(idx).cloned().unwrap_or_default(),
                continuation,
            })
        }

        async fn batch_delete(
            &self,
            _table: &str,
            _key_field: &str,
            ids: &[Value],
        ) -> StoreResult<()> {
            let mut batches = self.batches.lock().unwrap();
            let idx = batches.len();
            batches.push(ids.to_vec());
            if self.fail_batches.contains(&idx) {
                return Err(StoreError::Request("batch rejected".into()));
            }
            Ok(())
        }
    }

    fn ids(n: usize) -> Vec<Value> {
        (0..n).map(|i| Value::number(i)).collect()
    }

    #[tokio::test]
    async fn test_refresh_concatenates_pages_in_order() {
        let store = ScriptedStore::with_pages(
            "id",
            vec![
                vec![record([("id", Value::number(1)), ("name", Value::from("x"))])],
                vec![record([("id", Value::number(2)), ("name", Value::from("y"))])],
            ],
        );
        let store = Arc::new(store);
        let mut repo = Repository::new("alerts", store.clone());
        repo.initialize().await;

        assert_eq!(repo.primary_key(), "id");
        assert_eq!(
            repo.rows(),
            &[
                record([("id", Value::number(1)), ("name", Value::from("x"))]),
                record([("id", Value::number(2)), ("name", Value::from("y"))]),
            ]
        );
        assert_eq!(store.scan_calls(), 2);
        assert_eq!(repo.size(), 2);
    }

    #[tokio::test]
    async fn test_failed_reinitialize_resets_key_and_rows() {
        let store = Arc::new(ScriptedStore::with_pages(
            "id",
            vec![vec![record([("id", Value::number(1))])]],
        ));
        let mut repo = Repository::new("t", store.clone());
        repo.initialize().await;
        assert_eq!(repo.size(), 1);

        *store.schema_down.lock().unwrap() = true;
        repo.initialize().await;
        assert_eq!(repo.primary_key(), "");
        assert!(repo.rows().is_empty());
    }

    #[tokio::test]
    async fn test_delete_on_composite_key_removes_nothing() {
        let store = Arc::new(InMemoryStore::new(10));
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
        let mut repo = Repository::new("t", store.clone());
        repo.initialize().await;

        assert!(repo.delete(&[Value::from("a")]).await.is_empty());
        assert_eq!(repo.size(), 2);
        assert_eq!(store.len("t"), 2);
    }

    #[tokio::test]
    async fn test_scan_failure_keeps_accumulated_pages() {
        let mut store = ScriptedStore::with_pages(
            "id",
            vec![
                vec![record([("id", Value::number(1))])],
                vec![record([("id", Value::number(2))])],
                vec![record([("id", Value::number(3))])],
            ],
        );
        store.fail_scan_at = Some(1);
        let mut repo = Repository::new("t", Arc::new(store));
        repo.initialize().await;
        assert_eq!(repo.rows(), &[record([("id", Value::number(1))])]);
    }

    #[tokio::test]
    async fn test_initialize_failure_leaves_repository_empty() {
        let store = ScriptedStore {
            key_schema: None,
            pages: vec![vec![record([("id", Value::number(1))])]],
            ..Default::default()
        };
        let store = Arc::new(store);
        let mut repo = Repository::new("t", store.clone());
        repo.initialize().await;
        assert_eq!(repo.primary_key(), "");
        assert!(repo.rows().is_empty());
        assert_eq!(store.scan_calls(), 0);
    }

    #[tokio::test]
    async fn test_initialize_without_declared_key() {
        let store = ScriptedStore {
            key_schema: Some(Vec::new()),
            pages: vec![vec![record([("id", Value::number(1))])]],
            ..Default::default()
        };
        let mut repo = Repository::new("t", Arc::new(store));
        repo.initialize().await;
        assert_eq!(repo.primary_key(), "");
        assert_eq!(repo.size(), 1);
    }

    #[tokio::test]
    async fn test_delete_empty_is_noop() {
        let store = Arc::new(ScriptedStore::with_pages("id", vec![vec![record([("id", Value::number(1))])]]));
        let mut repo = Repository::new("t", store.clone());
        repo.initialize().await;
        let calls = store.scan_calls();

        assert!(repo.delete(&[]).await.is_empty());
        assert!(store.batches().is_empty());
        assert_eq!(store.scan_calls(), calls);
    }

    #[tokio::test]
    async fn test_delete_splits_into_batches_of_25() {
        let store = Arc::new(ScriptedStore::with_pages("id", vec![Vec::new()]));
        let mut repo = Repository::new("t", store.clone());
        repo.initialize().await;
        let calls = store.scan_calls();

        let input = ids(60);
        let deleted = repo.delete(&input).await;

        let batches = store.batches();
        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|b| b.len() <= MAX_BATCH_DELETE));
        assert_eq!(deleted, input);
        assert_eq!(store.scan_calls(), calls + 1);
    }

    #[tokio::test]
    async fn test_failed_batch_is_not_reported_and_refresh_still_runs() {
        let mut store = ScriptedStore::with_pages("id", vec![Vec::new()]);
        store.fail_batches.insert(0);
        let store = Arc::new(store);
        let mut repo = Repository::new("t", store.clone());
        repo.initialize().await;
        let calls = store.scan_calls();

        let input = ids(30);
        let deleted = repo.delete(&input).await;

        // Chunks are issued together, so the failing one may be either chunk.
        let batches = store.batches();
        assert_eq!(batches.len(), 2);
        let failed = &batches[0];
        let expected: Vec<Value> = input.iter().filter(|v| !failed.contains(v)).cloned().collect();
        assert_eq!(deleted, expected);
        assert_eq!(store.scan_calls(), calls + 1);
    }

    #[tokio::test]
    async fn test_column_names_and_keys() {
        let store = ScriptedStore::with_pages(
            "id",
            vec![vec![
                record([("id", Value::from("a")), ("name", Value::from("x"))]),
                record([("id", Value::from("b")), ("size", Value::number(3))]),
                record([("name", "orphan")]),
            ]],
        );
        let mut repo = Repository::new("t", Arc::new(store));
        repo.initialize().await;

        let columns: Vec<String> = repo.column_names().into_iter().collect();
        assert_eq!(columns, vec!["id", "name", "size"]);
        assert_eq!(
            repo.keys(),
            BTreeSet::from([Value::from("a"), Value::from("b")])
        );
    }
}
