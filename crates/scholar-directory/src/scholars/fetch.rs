use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::domain::ScholarRecord;
use super::options::FilterValues;
use super::pagination::PAGE_SIZE;
use super::query::ScholarQuery;
use super::saved::SharedSavedList;
use super::store::{DistinctField, Page, ScholarStore, StoreError};

/// Latest-request-wins guard for overlapping fetches.
///
/// Every request takes a ticket before it starts. When its response arrives, the response is
/// applied only if no newer ticket has been issued in the meantime. Superseded requests are not
/// cancelled; their results are dropped.
#[derive(Debug, Default)]
pub struct FetchSequencer {
    latest: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

impl FetchTicket {
    pub fn sequence(self) -> u64 {
        self.0
    }
}

impl FetchSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> FetchTicket {
        FetchTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// `Some(value)` when `ticket` is still the latest, `None` otherwise.
    pub fn accept<T>(&self, ticket: FetchTicket, value: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(value)
        } else {
            tracing::debug!(ticket = ticket.0, "discarding superseded fetch response");
            None
        }
    }

    /// Issue a ticket now, then await `fetch` and keep its output only if nothing newer started.
    pub fn run<'a, F, T>(&'a self, fetch: F) -> impl Future<Output = Option<T>> + 'a
    where
        F: Future<Output = T> + 'a,
        T: 'a,
    {
        let ticket = self.issue();
        async move {
            let value = fetch.await;
            self.accept(ticket, value)
        }
    }
}

/// Store reads issued on behalf of one browsing client.
///
/// Page, filter-value and saved-list reads each have their own sequencer, so a slow page cannot
/// overwrite a newer one while the other reads proceed independently. Tickets are taken when a
/// read is requested, not when its future is first polled.
pub struct DirectoryFetcher<S> {
    store: Arc<S>,
    pages: FetchSequencer,
    filters: FetchSequencer,
    saved: FetchSequencer,
}

impl<S: ScholarStore> DirectoryFetcher<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            pages: FetchSequencer::new(),
            filters: FetchSequencer::new(),
            saved: FetchSequencer::new(),
        }
    }

    /// One page of `query`, or `None` when a newer page request started meanwhile.
    pub fn page<'a>(
        &'a self,
        query: &'a ScholarQuery,
        page: usize,
    ) -> impl Future<Output = Result<Option<Page>, StoreError>> + 'a {
        let pending = self.pages.run(self.store.list_page(query, page, PAGE_SIZE));
        async move { pending.await.transpose() }
    }

    /// Distinct departments and positions.
    pub fn filter_values(
        &self,
    ) -> impl Future<Output = Result<Option<FilterValues>, StoreError>> + '_ {
        let ticket = self.filters.issue();
        async move {
            let departments = self.store.distinct(DistinctField::Department).await?;
            let positions = self.store.distinct(DistinctField::Position).await?;
            let values = FilterValues {
                departments,
                positions,
            };
            Ok(self.filters.accept(ticket, values))
        }
    }

    /// Records behind the saved list as it stands now, in saved order.
    pub fn saved(
        &self,
        saved: &SharedSavedList,
    ) -> impl Future<Output = Result<Option<Vec<ScholarRecord>>, StoreError>> + '_ {
        let ticket = self.saved.issue();
        let ids = saved.with(|list| list.ids().to_vec());
        async move {
            let records = self.store.get_batch(&ids).await?;
            Ok(self.saved.accept(ticket, records))
        }
    }
}
