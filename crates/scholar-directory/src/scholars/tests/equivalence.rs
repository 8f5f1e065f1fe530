use super::common::*;
use crate::scholars::domain::ScholarRecord;
use crate::scholars::filters::{FilterDimension, FilterState, SelectionMode};
use crate::scholars::options::FilterOptions;
use crate::scholars::query::{predicate, ListParams, ScholarQuery};

fn client_side(records: &[ScholarRecord], filters: &FilterState) -> Vec<String> {
    let catalog = catalog();
    let matches = predicate(filters, &catalog);
    records
        .iter()
        .filter(|&record| matches(record))
        .map(|record| record.id.to_string())
        .collect()
}

fn server_side(records: &[ScholarRecord], filters: &FilterState) -> Vec<String> {
    let query = ScholarQuery::from_filters(filters, &catalog());
    records
        .iter()
        .filter(|record| query.matches(record))
        .map(|record| record.id.to_string())
        .collect()
}

fn filters_with(change: impl FnOnce(&mut FilterState)) -> FilterState {
    let mut filters = FilterState::new();
    change(&mut filters);
    filters
}

/// A spread of filter states touching every criterion, alone and combined.
fn scenarios() -> Vec<FilterState> {
    let catalog = catalog();
    let records = fixtures();
    let options = FilterOptions::from_records(&records, &catalog);
    let engineering = catalog.display_name("EG");
    let liberal_arts = catalog.display_name("LS");

    vec![
        FilterState::new(),
        filters_with(|f| f.set_text_query("PROFESSOR")),
        filters_with(|f| f.set_text_query("an")),
        filters_with(|f| f.set_score_range(Some(40), Some(80))),
        filters_with(|f| f.set_score_range(Some(0), Some(39))),
        filters_with(|f| f.set_min_grants(Some(2))),
        filters_with(|f| f.set_max_grants(Some(0))),
        filters_with(|f| f.set_good_match_only(true)),
        filters_with(|f| f.set_req_keyword("machine")),
        filters_with(|f| f.select_all(FilterDimension::Department, [engineering.clone()])),
        filters_with(|f| {
            f.select_all(FilterDimension::Department, [engineering.clone()]);
            f.set_mode(FilterDimension::Department, SelectionMode::Exclude);
        }),
        filters_with(|f| f.select_all(FilterDimension::Department, ["ZZ"])),
        filters_with(|f| f.select_all(FilterDimension::Department, ["EG - Not A College"])),
        filters_with(|f| f.select_all(FilterDimension::SubDepartment, ["EG-CS", "LS-PHYS"])),
        filters_with(|f| {
            f.select_all(FilterDimension::SubDepartment, ["MD-PEDS-ONC"]);
            f.set_mode(FilterDimension::SubDepartment, SelectionMode::Exclude);
        }),
        filters_with(|f| f.select_all(FilterDimension::Position, ["Professor", "Lecturer"])),
        filters_with(|f| {
            f.select_all(FilterDimension::Position, ["Professor"]);
            f.set_mode(FilterDimension::Position, SelectionMode::Exclude);
        }),
        filters_with(|f| {
            f.toggle(FilterDimension::Department, &engineering, &options);
            f.toggle(FilterDimension::Department, &liberal_arts, &options);
            f.toggle(FilterDimension::SubDepartment, "EG-ECE", &options);
            f.set_score_range(Some(50), None);
            f.set_text_query("o");
        }),
        filters_with(|f| {
            f.set_good_match_only(true);
            f.set_req_keyword("rust");
            f.set_min_grants(Some(1));
            f.set_max_grants(Some(2));
        }),
    ]
}

#[test]
fn predicate_and_query_select_the_same_records() {
    let records = fixtures();
    for (index, filters) in scenarios().iter().enumerate() {
        assert_eq!(
            client_side(&records, filters),
            server_side(&records, filters),
            "scenario {index} diverged: {filters:?}"
        );
    }
}

#[test]
fn query_params_round_trip_preserves_selection() {
    let catalog = catalog();
    let records = fixtures();
    for (index, filters) in scenarios().iter().enumerate() {
        let params = ListParams::from_filters(filters, 1, &catalog);
        let rebuilt = params.to_filters(&catalog);
        assert_eq!(
            client_side(&records, filters),
            client_side(&records, &rebuilt),
            "scenario {index} changed after round trip: {params:?}"
        );
    }
}

#[test]
fn empty_filters_accept_every_record() {
    let records = fixtures();
    let filters = FilterState::new();
    assert!(filters.is_unconstrained());
    assert_eq!(client_side(&records, &filters).len(), records.len());
    assert!(ScholarQuery::from_filters(&filters, &catalog()).is_empty());
}

#[test]
fn engineering_selection_matches_code_prefix() {
    let records = fixtures();
    let mut filters = FilterState::new();
    filters.select_all(
        FilterDimension::Department,
        [catalog().display_name("EG")],
    );
    assert_eq!(client_side(&records, &filters), vec!["s-01", "s-03", "s-04"]);
}
