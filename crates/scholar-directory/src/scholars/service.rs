use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::departments::DepartmentCatalog;
use super::domain::{ScholarId, ScholarRecord, ScholarSummary};
use super::options::{
    CachedFilters, Clock, FilterOptions, FilterOptionsCache, FilterValues, SystemClock,
};
use super::pagination::{total_pages, PAGE_SIZE};
use super::query::{ListParams, ScholarQuery};
use super::saved::{ExportError, ExportFormat, ExportPayload, SavedList};
use super::store::{DistinctField, ScholarStore, StoreError};

/// Body of the list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub data: Vec<ScholarSummary>,
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
}

/// Service composing the store, the department catalog and the filter-options cache.
pub struct DirectoryService<S, C = SystemClock> {
    store: Arc<S>,
    catalog: Arc<DepartmentCatalog>,
    clock: C,
    filters: Mutex<FilterOptionsCache<C>>,
    page_size: usize,
}

impl<S> DirectoryService<S, SystemClock>
where
    S: ScholarStore + 'static,
{
    pub fn new(store: Arc<S>, catalog: Arc<DepartmentCatalog>, cache_ttl: Duration) -> Self {
        Self::with_clock(store, catalog, SystemClock, cache_ttl)
    }
}

impl<S, C> DirectoryService<S, C>
where
    S: ScholarStore + 'static,
    C: Clock + Clone + 'static,
{
    pub fn with_clock(
        store: Arc<S>,
        catalog: Arc<DepartmentCatalog>,
        clock: C,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            store,
            catalog,
            filters: Mutex::new(FilterOptionsCache::new(clock.clone(), cache_ttl)),
            clock,
            page_size: PAGE_SIZE,
        }
    }

    pub fn catalog(&self) -> &DepartmentCatalog {
        &self.catalog
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    /// One page of summaries for the filters in `params`. A page past the end is clamped to the
    /// last page.
    pub async fn list(&self, params: &ListParams) -> Result<ListResponse, DirectoryServiceError> {
        let filters = params.to_filters(&self.catalog);
        let query = ScholarQuery::from_filters(&filters, &self.catalog);
        let requested = params.page();

        let mut page = requested;
        let mut result = self.store.list_page(&query, page, self.page_size).await?;
        let last_page = total_pages(result.total, self.page_size);
        if page > last_page {
            page = last_page;
            result = self.store.list_page(&query, page, self.page_size).await?;
        }

        tracing::debug!(
            requested,
            page,
            total = result.total,
            clauses = query.clauses().len(),
            "listed scholars"
        );

        Ok(ListResponse {
            data: result.items.iter().map(ScholarRecord::summary).collect(),
            total: result.total,
            page,
            total_pages: total_pages(result.total, self.page_size),
        })
    }

    pub async fn get(&self, id: &ScholarId) -> Result<ScholarRecord, DirectoryServiceError> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| DirectoryServiceError::NotFound(id.clone()))
    }

    pub async fn batch(
        &self,
        ids: &[ScholarId],
    ) -> Result<Vec<ScholarRecord>, DirectoryServiceError> {
        Ok(self.store.get_batch(ids).await?)
    }

    /// Distinct departments and positions, served from the cache while fresh. A failed refresh
    /// leaves the previous entry in place.
    pub async fn filters(&self) -> Result<Arc<CachedFilters>, DirectoryServiceError> {
        let fresh = self.cache().fresh();
        if let Some(cached) = fresh {
            return Ok(cached);
        }

        let departments = self.store.distinct(DistinctField::Department).await?;
        let positions = self.store.distinct(DistinctField::Position).await?;
        let options = FilterOptions::from_values(&departments, &positions, &self.catalog);
        tracing::info!(
            departments = departments.len(),
            positions = positions.len(),
            "refreshed filter options"
        );

        let cached = CachedFilters {
            values: FilterValues {
                departments,
                positions,
            },
            options,
        };
        Ok(self.cache().store(cached))
    }

    pub fn invalidate_filters(&self) {
        self.cache().invalidate();
    }

    /// Export the records behind `ids`. `None` when none of them resolve.
    pub async fn export(
        &self,
        ids: Vec<ScholarId>,
        format: ExportFormat,
    ) -> Result<Option<ExportPayload>, DirectoryServiceError> {
        let saved = SavedList::from(ids);
        let records = self.store.get_batch(saved.ids()).await?;
        let payload = saved.export(format, &records)?;
        if let Some(payload) = &payload {
            tracing::info!(
                format = format.extension(),
                requested = saved.len(),
                exported = payload.count,
                "exported saved scholars"
            );
        }
        Ok(payload)
    }

    fn cache(&self) -> MutexGuard<'_, FilterOptionsCache<C>> {
        self.filters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Error raised by the directory service.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryServiceError {
    #[error("scholar {0} not found")]
    NotFound(ScholarId),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Export(#[from] ExportError),
}
