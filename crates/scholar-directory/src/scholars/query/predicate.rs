use crate::scholars::departments::{main_code_of, DepartmentCatalog};
use crate::scholars::domain::ScholarRecord;
use crate::scholars::filters::{FilterDimension, FilterState, MultiSelect};

use super::selection_passes;

/// In-memory predicate for `filters`.
///
/// Department selections are compared against the record's display department name, sub-department
/// selections against the whole trimmed department string.
pub fn predicate<'a>(
    filters: &'a FilterState,
    catalog: &'a DepartmentCatalog,
) -> impl Fn(&ScholarRecord) -> bool + 'a {
    let text = filters.text_query().to_lowercase();
    let keyword = filters.req_keyword().to_lowercase();

    move |record: &ScholarRecord| {
        if !text.is_empty()
            && !record.name.to_lowercase().contains(&text)
            && !record
                .title
                .as_deref()
                .unwrap_or_default()
                .to_lowercase()
                .contains(&text)
        {
            return false;
        }

        let range = filters.score_range();
        if !range.is_default() && !range.contains(i64::from(record.relevance_score)) {
            return false;
        }

        let grants = i64::from(record.active_grants_count);
        if grants < filters.min_grants() {
            return false;
        }
        if filters.max_grants().is_some_and(|max| grants > max) {
            return false;
        }

        if filters.good_match_only() && !record.is_good_match() {
            return false;
        }

        if !keyword.is_empty()
            && !record
                .requirements
                .iter()
                .any(|requirement| requirement.to_lowercase().contains(&keyword))
        {
            return false;
        }

        let departments = filters.selection(FilterDimension::Department);
        if !departments.is_empty() {
            let display = catalog.display_name(&main_code_of(record.department.as_deref()));
            if !admits(departments, Some(&display)) {
                return false;
            }
        }

        admits(
            filters.selection(FilterDimension::SubDepartment),
            Some(record.full_department()),
        ) && admits(
            filters.selection(FilterDimension::Position),
            record.position.as_deref(),
        )
    }
}

fn admits(selection: &MultiSelect, value: Option<&str>) -> bool {
    if selection.is_empty() {
        return true;
    }
    let selected = value.is_some_and(|value| selection.contains(value));
    selection_passes(selection.mode(), selected)
}
