use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::scholars::departments::DepartmentCatalog;
use crate::scholars::domain::{Grant, Publication, ScholarId, ScholarRecord};
use crate::scholars::options::Clock;
use crate::scholars::query::ScholarQuery;
use crate::scholars::service::DirectoryService;
use crate::scholars::store::{
    DistinctField, InMemoryScholarStore, Page, ScholarStore, StoreError,
};
use crate::scholars::scholar_router;

pub(super) fn scholar(
    id: &str,
    name: &str,
    department: Option<&str>,
    position: Option<&str>,
    score: u32,
) -> ScholarRecord {
    ScholarRecord {
        id: ScholarId::from(id),
        name: name.to_string(),
        email: Some(format!("{}@ufl.edu", name.to_lowercase().replace(' ', "."))),
        department: department.map(str::to_string),
        position: position.map(str::to_string),
        relevance_score: score,
        should_email: "No".to_string(),
        ..ScholarRecord::default()
    }
}

/// Mixed fixture set: tied scores, missing departments and positions, sub-departments under the
/// same college, a department code the catalog does not know.
pub(super) fn fixtures() -> Vec<ScholarRecord> {
    let mut alice = scholar("s-01", "Alice Moreno", Some("EG-CS"), Some("Professor"), 80);
    alice.title = Some("Professor of Computer Science".to_string());
    alice.should_email = "Yes".to_string();
    alice.active_grants_count = 2;
    alice.active_grants = vec![Grant {
        title: Some("Verified Compilers".to_string()),
        funder_name: Some("NSF".to_string()),
        duration: Some("2023-2026".to_string()),
        status: Some("active".to_string()),
    }];
    alice.requirements = vec!["Rust".to_string(), "Formal Methods".to_string()];
    alice.reasoning = vec!["Leads a verification lab".to_string()];

    let mut bob = scholar("s-02", "Bob Tran", Some("LS-MATH"), Some("Lecturer"), 40);
    bob.title = Some("Lecturer in Algebra".to_string());
    bob.publications = vec![Publication {
        title: "Group Actions".to_string(),
        date: "2021-05-01".to_string(),
        summary: Some("Notes on finite groups.".to_string()),
    }];

    let mut carol = scholar("s-03", "Carol Jiang", Some("EG-ECE"), Some("Associate Professor"), 80);
    carol.should_email = " yes ".to_string();
    carol.active_grants_count = 5;
    carol.requirements = vec!["Machine Learning".to_string()];

    let mut dan = scholar("s-04", "Dan Okafor", Some("EG"), None, 65);
    dan.active_grants_count = 1;

    let mut erin = scholar("s-05", "Erin Walsh", None, Some("Professor"), 95);
    erin.title = Some("Distinguished Professor".to_string());

    let mut femi = scholar("s-06", "Femi Adeyemi", Some("ZZ-LAB"), Some("Research Scientist"), 10);
    femi.should_email = "Maybe".to_string();

    let mut gia = scholar("s-07", "Gia Russo", Some(" LS-PHYS "), Some("Professor"), 55);
    gia.active_grants_count = 3;
    gia.requirements = vec!["Optics".to_string(), "Machine learning for spectra".to_string()];

    let hana = scholar("s-08", "Hana Sato", Some("MD-PEDS-ONC"), Some("Lecturer"), 40);

    vec![alice, bob, carol, dan, erin, femi, gia, hana]
}

pub(super) fn catalog() -> Arc<DepartmentCatalog> {
    Arc::new(DepartmentCatalog::builtin())
}

/// Clock tests advance by hand.
#[derive(Debug, Clone)]
pub(super) struct TestClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl TestClock {
    pub(super) fn new() -> Self {
        let start = Utc
            .with_ymd_and_hms(2025, 3, 7, 9, 30, 0)
            .single()
            .expect("valid timestamp");
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub(super) fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().expect("clock mutex poisoned");
        *guard += by;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}

/// In-memory store that counts distinct-value lookups.
#[derive(Debug, Clone, Default)]
pub(super) struct CountingStore {
    pub(super) inner: InMemoryScholarStore,
    pub(super) distinct_calls: Arc<AtomicUsize>,
}

impl CountingStore {
    pub(super) fn new(records: Vec<ScholarRecord>) -> Self {
        Self {
            inner: InMemoryScholarStore::from_records(records),
            distinct_calls: Arc::default(),
        }
    }

    pub(super) fn distinct_calls(&self) -> usize {
        self.distinct_calls.load(Ordering::SeqCst)
    }
}

impl ScholarStore for CountingStore {
    async fn list_page(
        &self,
        query: &ScholarQuery,
        page: usize,
        page_size: usize,
    ) -> Result<Page, StoreError> {
        self.inner.list_page(query, page, page_size).await
    }

    async fn get_by_id(&self, id: &ScholarId) -> Result<Option<ScholarRecord>, StoreError> {
        self.inner.get_by_id(id).await
    }

    async fn get_batch(&self, ids: &[ScholarId]) -> Result<Vec<ScholarRecord>, StoreError> {
        self.inner.get_batch(ids).await
    }

    async fn distinct(&self, field: DistinctField) -> Result<Vec<String>, StoreError> {
        self.distinct_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.distinct(field).await
    }
}

pub(super) struct UnavailableStore;

impl ScholarStore for UnavailableStore {
    async fn list_page(
        &self,
        _query: &ScholarQuery,
        _page: usize,
        _page_size: usize,
    ) -> Result<Page, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn get_by_id(&self, _id: &ScholarId) -> Result<Option<ScholarRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn get_batch(&self, _ids: &[ScholarId]) -> Result<Vec<ScholarRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn distinct(&self, _field: DistinctField) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

pub(super) type TestService = DirectoryService<CountingStore, TestClock>;

pub(super) fn build_service() -> (TestService, CountingStore, TestClock) {
    let store = CountingStore::new(fixtures());
    let clock = TestClock::new();
    let service = DirectoryService::with_clock(
        Arc::new(store.clone()),
        catalog(),
        clock.clone(),
        Duration::hours(1),
    );
    (service, store, clock)
}

pub(super) fn unavailable_service() -> DirectoryService<UnavailableStore, TestClock> {
    DirectoryService::with_clock(
        Arc::new(UnavailableStore),
        catalog(),
        TestClock::new(),
        Duration::hours(1),
    )
}

pub(super) fn router() -> axum::Router {
    let (service, _, _) = build_service();
    scholar_router(Arc::new(service))
}

pub(super) async fn read_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body")
        .to_vec()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = read_body(response).await;
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn ids(values: &Value) -> Vec<String> {
    values
        .as_array()
        .expect("array payload")
        .iter()
        .map(|entry| entry["id"].as_str().expect("id field").to_string())
        .collect()
}
