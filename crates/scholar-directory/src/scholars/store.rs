use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::future::Future;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use super::domain::{sort_by_relevance, ScholarId, ScholarRecord};
use super::query::ScholarQuery;

/// One page of store results. `total` counts every match, not just `items`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<ScholarRecord>,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistinctField {
    Department,
    Position,
}

/// Document store holding scholar records.
///
/// Results of [`list_page`](ScholarStore::list_page) are sorted by descending relevance with ties
/// in storage order. Pages are 1-based.
pub trait ScholarStore: Send + Sync {
    fn list_page(
        &self,
        query: &ScholarQuery,
        page: usize,
        page_size: usize,
    ) -> impl Future<Output = Result<Page, StoreError>> + Send;

    fn get_by_id(
        &self,
        id: &ScholarId,
    ) -> impl Future<Output = Result<Option<ScholarRecord>, StoreError>> + Send;

    /// Records for `ids`; unknown ids are omitted.
    fn get_batch(
        &self,
        ids: &[ScholarId],
    ) -> impl Future<Output = Result<Vec<ScholarRecord>, StoreError>> + Send;

    /// Sorted distinct non-empty values of `field`.
    fn distinct(
        &self,
        field: DistinctField,
    ) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse dataset: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read-only store over a dataset loaded once into memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryScholarStore {
    records: Arc<Vec<ScholarRecord>>,
    by_id: Arc<HashMap<ScholarId, usize>>,
}

impl InMemoryScholarStore {
    /// Later duplicates of an id are ignored by lookups but still listed.
    pub fn from_records(records: Vec<ScholarRecord>) -> Self {
        let mut by_id = HashMap::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            by_id.entry(record.id.clone()).or_insert(index);
        }
        Self {
            records: Arc::new(records),
            by_id: Arc::new(by_id),
        }
    }

    /// Load a JSON array of scholar records.
    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Documents that do not read as a scholar record are logged and skipped; only an unreadable
    /// or non-array file fails the load.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let documents: Vec<serde_json::Value> = serde_json::from_reader(reader)?;
        let mut records = Vec::with_capacity(documents.len());
        for (index, document) in documents.into_iter().enumerate() {
            match serde_json::from_value::<ScholarRecord>(document) {
                Ok(record) => records.push(record),
                Err(err) => {
                    tracing::warn!(index, error = %err, "skipping unreadable scholar document")
                }
            }
        }
        Ok(Self::from_records(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ScholarRecord] {
        &self.records
    }

    fn lookup(&self, id: &ScholarId) -> Option<&ScholarRecord> {
        self.by_id.get(id).map(|index| &self.records[*index])
    }
}

impl ScholarStore for InMemoryScholarStore {
    async fn list_page(
        &self,
        query: &ScholarQuery,
        page: usize,
        page_size: usize,
    ) -> Result<Page, StoreError> {
        let mut matches: Vec<&ScholarRecord> = self
            .records
            .iter()
            .filter(|record| query.matches(record))
            .collect();
        sort_by_relevance(&mut matches);

        let total = matches.len();
        let page_size = page_size.max(1);
        let offset = page.saturating_sub(1).saturating_mul(page_size);
        let items = matches
            .into_iter()
            .skip(offset)
            .take(page_size)
            .cloned()
            .collect();

        Ok(Page { items, total })
    }

    async fn get_by_id(&self, id: &ScholarId) -> Result<Option<ScholarRecord>, StoreError> {
        Ok(self.lookup(id).cloned())
    }

    async fn get_batch(&self, ids: &[ScholarId]) -> Result<Vec<ScholarRecord>, StoreError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.lookup(id))
            .cloned()
            .collect())
    }

    async fn distinct(&self, field: DistinctField) -> Result<Vec<String>, StoreError> {
        let values: BTreeSet<&str> = self
            .records
            .iter()
            .filter_map(|record| match field {
                DistinctField::Department => record.department.as_deref(),
                DistinctField::Position => record.position.as_deref(),
            })
            .filter(|value| !value.is_empty())
            .collect();
        Ok(values.into_iter().map(str::to_string).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexOrder {
    Ascending,
    Descending,
}

/// Single-field index on the scholar collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub field: String,
    pub order: IndexOrder,
    #[serde(default)]
    pub unique: bool,
}

impl IndexSpec {
    fn new(field: &str, order: IndexOrder) -> Self {
        let suffix = match order {
            IndexOrder::Ascending => "asc",
            IndexOrder::Descending => "desc",
        };
        Self {
            name: format!("{field}_{suffix}"),
            field: field.to_string(),
            order,
            unique: false,
        }
    }

    fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Indexes backing the list query: relevance ordering plus every filterable field.
pub fn default_indexes() -> Vec<IndexSpec> {
    vec![
        IndexSpec::new("relevance_score", IndexOrder::Descending),
        IndexSpec::new("department", IndexOrder::Ascending),
        IndexSpec::new("position", IndexOrder::Ascending),
        IndexSpec::new("id", IndexOrder::Ascending).unique(),
        IndexSpec::new("should_email", IndexOrder::Ascending),
        IndexSpec::new("active_grants_count", IndexOrder::Ascending),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexOutcome {
    Created,
    AlreadyExists,
}

/// Index maintenance on the backing store. An index that already exists is reported through
/// [`IndexOutcome::AlreadyExists`], never as an error.
pub trait IndexProvisioner: Send + Sync {
    fn ensure_index(&self, spec: &IndexSpec) -> Result<IndexOutcome, StoreError>;
}

/// Ensure every index in `specs`, continuing past individual failures.
pub fn provision_indexes<P: IndexProvisioner + ?Sized>(
    provisioner: &P,
    specs: &[IndexSpec],
) -> Vec<(String, Result<IndexOutcome, StoreError>)> {
    specs
        .iter()
        .map(|spec| {
            let outcome = provisioner.ensure_index(spec);
            match &outcome {
                Ok(IndexOutcome::Created) => tracing::info!(index = %spec.name, "index created"),
                Ok(IndexOutcome::AlreadyExists) => {
                    tracing::info!(index = %spec.name, "index already exists")
                }
                Err(err) => tracing::error!(index = %spec.name, error = %err, "index creation failed"),
            }
            (spec.name.clone(), outcome)
        })
        .collect()
}

/// Index registry for the in-memory store. Tracks names only.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIndexRegistry {
    names: Arc<Mutex<BTreeSet<String>>>,
}

impl InMemoryIndexRegistry {
    pub fn names(&self) -> Vec<String> {
        let guard = self.names.lock().unwrap_or_else(PoisonError::into_inner);
        guard.iter().cloned().collect()
    }
}

impl IndexProvisioner for InMemoryIndexRegistry {
    fn ensure_index(&self, spec: &IndexSpec) -> Result<IndexOutcome, StoreError> {
        let mut guard = self
            .names
            .lock()
            .map_err(|_| StoreError::Unavailable("index registry poisoned".to_string()))?;
        if guard.insert(spec.name.clone()) {
            Ok(IndexOutcome::Created)
        } else {
            Ok(IndexOutcome::AlreadyExists)
        }
    }
}
