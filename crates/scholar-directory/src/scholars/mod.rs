//! Scholar directory browsing: filter state, option derivation, query building, pagination,
//! saved lists and the HTTP endpoints over a [`ScholarStore`].
//!
//! Filter mutation, predicate evaluation and pagination are synchronous. The store boundary is
//! async, and [`FetchSequencer`] drops responses overtaken by a newer request.

pub mod departments;
pub mod domain;
pub mod fetch;
pub mod filters;
pub mod options;
pub mod pagination;
pub mod query;
pub mod router;
pub mod saved;
pub mod service;
pub mod session;
pub mod store;

#[cfg(test)]
mod tests;

pub use departments::{CatalogError, DepartmentCatalog, DepartmentRef};
pub use domain::{Grant, Publication, ScholarId, ScholarRecord, ScholarSummary};
pub use fetch::{DirectoryFetcher, FetchSequencer, FetchTicket};
pub use filters::{FilterDimension, FilterState, MultiSelect, ScoreRange, SelectionMode};
pub use options::{CachedFilters, Clock, FilterOptions, FilterOptionsCache, FilterValues, SystemClock};
pub use pagination::{PageInfo, Paginator, PAGE_SIZE};
pub use query::{predicate, Clause, ListParams, ScholarQuery};
pub use router::scholar_router;
pub use saved::{export_records, ExportError, ExportFormat, ExportPayload, SavedList, SharedSavedList};
pub use service::{DirectoryService, DirectoryServiceError, ListResponse};
pub use session::{BrowseSession, SessionPage};
pub use store::{
    default_indexes, provision_indexes, DatasetError, DistinctField, InMemoryIndexRegistry,
    InMemoryScholarStore, IndexOutcome, IndexProvisioner, IndexSpec, Page, ScholarStore,
    StoreError,
};
