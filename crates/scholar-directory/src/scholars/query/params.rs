use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::scholars::departments::DepartmentCatalog;
use crate::scholars::filters::{FilterDimension, FilterState, SelectionMode};

/// Query-string surface of the scholar list endpoint.
///
/// Every field is kept as raw text: unparsable numbers fall back to the dimension default instead
/// of rejecting the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_score: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_score: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_grants: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_grants: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub req_search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_only: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dept_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_depts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_dept_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos_mode: Option<String>,
}

impl ListParams {
    /// Parameters from decoded query pairs. The first occurrence of a repeated key wins and
    /// unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut fields = Map::new();
        for (key, value) in pairs {
            fields
                .entry(key.into())
                .or_insert_with(|| Value::String(value.into()));
        }
        serde_json::from_value(Value::Object(fields)).unwrap_or_default()
    }

    /// 1-based page; anything missing, unparsable or below 1 reads as page 1.
    pub fn page(&self) -> usize {
        self.page
            .as_deref()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|page| *page >= 1)
            .unwrap_or(1)
    }

    /// Filter state described by these parameters. Department entries may be display names or
    /// bare main codes.
    pub fn to_filters(&self, catalog: &DepartmentCatalog) -> FilterState {
        let mut filters = FilterState::new();

        if let Some(search) = non_empty(&self.search) {
            filters.set_text_query(search);
        }
        filters.set_score_range(parse_int(&self.min_score), parse_int(&self.max_score));
        filters.set_min_grants(parse_int(&self.min_grants));
        filters.set_max_grants(parse_int(&self.max_grants));
        if let Some(keyword) = non_empty(&self.req_search) {
            filters.set_req_keyword(keyword);
        }
        filters.set_good_match_only(self.email_only.as_deref() == Some("true"));

        let departments = split_list(&self.depts)
            .into_iter()
            .map(|value| catalog.normalize_selection(&value));
        filters.select_all(FilterDimension::Department, departments);
        filters.set_mode(FilterDimension::Department, parse_mode(&self.dept_mode));

        filters.select_all(FilterDimension::SubDepartment, split_list(&self.sub_depts));
        filters.set_mode(FilterDimension::SubDepartment, parse_mode(&self.sub_dept_mode));

        filters.select_all(FilterDimension::Position, split_list(&self.positions));
        filters.set_mode(FilterDimension::Position, parse_mode(&self.pos_mode));

        filters
    }

    /// Parameters a client sends to request `page` under `filters`. Defaults are omitted and
    /// departments travel as main codes, since display names may contain commas.
    pub fn from_filters(filters: &FilterState, page: usize, catalog: &DepartmentCatalog) -> Self {
        let range = filters.score_range();
        let join = |dimension: FilterDimension| {
            let selection = filters.selection(dimension);
            (!selection.is_empty()).then(|| {
                selection
                    .values()
                    .iter()
                    .map(|value| match dimension {
                        FilterDimension::Department => catalog
                            .code_for_display(value)
                            .unwrap_or_else(|| value.clone()),
                        _ => value.clone(),
                    })
                    .collect::<Vec<_>>()
                    .join(",")
            })
        };
        let mode = |dimension: FilterDimension| {
            let selection = filters.selection(dimension);
            (selection.mode() == SelectionMode::Exclude)
                .then(|| SelectionMode::Exclude.as_str().to_string())
        };

        Self {
            page: (page > 1).then(|| page.to_string()),
            search: non_empty_owned(filters.text_query()),
            min_score: (!range.is_default()).then(|| range.min.to_string()),
            max_score: (!range.is_default()).then(|| range.max.to_string()),
            min_grants: (filters.min_grants() > 0).then(|| filters.min_grants().to_string()),
            max_grants: filters.max_grants().map(|max| max.to_string()),
            req_search: non_empty_owned(filters.req_keyword()),
            email_only: filters.good_match_only().then(|| "true".to_string()),
            depts: join(FilterDimension::Department),
            dept_mode: mode(FilterDimension::Department),
            sub_depts: join(FilterDimension::SubDepartment),
            sub_dept_mode: mode(FilterDimension::SubDepartment),
            positions: join(FilterDimension::Position),
            pos_mode: mode(FilterDimension::Position),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

fn non_empty_owned(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_int(value: &Option<String>) -> Option<i64> {
    value.as_deref().and_then(|raw| raw.trim().parse::<i64>().ok())
}

fn parse_mode(value: &Option<String>) -> SelectionMode {
    value
        .as_deref()
        .map(SelectionMode::parse_lenient)
        .unwrap_or_default()
}

fn split_list(value: &Option<String>) -> Vec<String> {
    value
        .as_deref()
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
