use std::sync::Arc;

use super::departments::DepartmentCatalog;
use super::domain::{sort_by_relevance, ScholarRecord};
use super::filters::{FilterDimension, FilterState, SelectionMode};
use super::options::FilterOptions;
use super::pagination::{PageInfo, Paginator};
use super::query::predicate;
use super::saved::SavedList;

/// Client-side browsing over a loaded record set.
///
/// Keeps filter state, derived options and the paginator consistent: any filter change returns to
/// page 1, and any change in the number of matches clamps the current page.
#[derive(Debug, Clone)]
pub struct BrowseSession {
    records: Vec<ScholarRecord>,
    catalog: Arc<DepartmentCatalog>,
    options: FilterOptions,
    filters: FilterState,
    paginator: Paginator,
}

/// One rendered page of a [`BrowseSession`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPage<'a> {
    pub items: Vec<&'a ScholarRecord>,
    pub info: PageInfo,
}

impl BrowseSession {
    pub fn new(records: Vec<ScholarRecord>, catalog: Arc<DepartmentCatalog>) -> Self {
        let options = FilterOptions::from_records(&records, &catalog);
        let mut session = Self {
            records,
            catalog,
            options,
            filters: FilterState::new(),
            paginator: Paginator::default(),
        };
        session.refresh_total();
        session
    }

    pub fn records(&self) -> &[ScholarRecord] {
        &self.records
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    /// Swap in a new record set, e.g. after a fetch completes. Options are re-derived and the
    /// current page is clamped; filters are kept.
    pub fn replace_records(&mut self, records: Vec<ScholarRecord>) {
        self.options = FilterOptions::from_records(&records, &self.catalog);
        self.records = records;
        self.refresh_total();
    }

    /// Apply an arbitrary filter mutation, then return to page 1.
    pub fn update_filters(&mut self, change: impl FnOnce(&mut FilterState, &FilterOptions)) {
        change(&mut self.filters, &self.options);
        self.paginator.reset();
        self.refresh_total();
    }

    pub fn set_text_query(&mut self, query: &str) {
        self.update_filters(|filters, _| filters.set_text_query(query));
    }

    pub fn set_req_keyword(&mut self, keyword: &str) {
        self.update_filters(|filters, _| filters.set_req_keyword(keyword));
    }

    pub fn set_score_range(&mut self, min: Option<i64>, max: Option<i64>) {
        self.update_filters(|filters, _| filters.set_score_range(min, max));
    }

    pub fn set_grant_bounds(&mut self, min: Option<i64>, max: Option<i64>) {
        self.update_filters(|filters, _| {
            filters.set_min_grants(min);
            filters.set_max_grants(max);
        });
    }

    pub fn set_good_match_only(&mut self, enabled: bool) {
        self.update_filters(|filters, _| filters.set_good_match_only(enabled));
    }

    pub fn toggle(&mut self, dimension: FilterDimension, value: &str) {
        self.update_filters(|filters, options| filters.toggle(dimension, value, options));
    }

    pub fn set_mode(&mut self, dimension: FilterDimension, mode: SelectionMode) {
        self.update_filters(|filters, _| filters.set_mode(dimension, mode));
    }

    pub fn clear_dimension(&mut self, dimension: FilterDimension) {
        self.update_filters(|filters, _| filters.clear_dimension(dimension));
    }

    pub fn clear_all(&mut self) {
        self.update_filters(|filters, _| filters.clear_all());
    }

    /// Sub-department options for the current department selection.
    pub fn available_sub_departments(&self) -> Vec<String> {
        self.options.available_sub_departments(
            self.filters
                .selection(FilterDimension::Department)
                .values(),
        )
    }

    /// Every record passing the filters, by descending relevance.
    pub fn filtered(&self) -> Vec<&ScholarRecord> {
        filter_records(&self.records, &self.filters, &self.catalog)
    }

    pub fn current_page(&self) -> SessionPage<'_> {
        let items = self
            .filtered()
            .into_iter()
            .skip(self.paginator.offset())
            .take(self.paginator.page_size())
            .collect();
        SessionPage {
            items,
            info: self.paginator.info(),
        }
    }

    pub fn next_page(&mut self) {
        self.paginator.next_page();
    }

    pub fn prev_page(&mut self) {
        self.paginator.prev_page();
    }

    pub fn go_to(&mut self, page: usize) {
        self.paginator.go_to(page);
    }

    /// Save every filtered record, across all pages.
    pub fn add_all_filtered(&self, saved: &mut SavedList) {
        saved.add_all(self.filtered().into_iter().map(|record| record.id.clone()));
    }

    fn refresh_total(&mut self) {
        let total = filter_records(&self.records, &self.filters, &self.catalog).len();
        self.paginator.set_total(total);
    }
}

fn filter_records<'a>(
    records: &'a [ScholarRecord],
    filters: &FilterState,
    catalog: &DepartmentCatalog,
) -> Vec<&'a ScholarRecord> {
    let matches = predicate(filters, catalog);
    let mut selected: Vec<&ScholarRecord> =
        records.iter().filter(|&record| matches(record)).collect();
    sort_by_relevance(&mut selected);
    selected
}
