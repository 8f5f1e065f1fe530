//! Translation of a [`FilterState`] into something that selects scholar records.
//!
//! Two renditions exist and must accept exactly the same records:
//!
//! * [`predicate`] evaluates the filter state directly against in-memory records;
//! * [`ScholarQuery`] is a structured, serializable clause list handed to a
//!   [`ScholarStore`](super::store::ScholarStore), which evaluates it with
//!   [`ScholarQuery::matches`].
//!
//! Clauses are a conjunction. Neither rendition sorts; callers order results by descending
//! relevance with a stable sort.

pub mod params;
mod predicate;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::departments::{main_code_of, DepartmentCatalog};
use super::domain::ScholarRecord;
use super::filters::{FilterDimension, FilterState, SelectionMode};

pub use params::ListParams;
pub use predicate::predicate;

/// `should_email` value (case-insensitive) that marks a good match.
pub const GOOD_MATCH_FLAG: &str = "yes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
    Name,
    Title,
    ShouldEmail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    RelevanceScore,
    ActiveGrantsCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListField {
    Requirements,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyField {
    /// Main department code (the part before the first hyphen).
    DepartmentCode,
    /// Whole trimmed department string.
    Department,
    Position,
}

/// One criterion of a [`ScholarQuery`]. Text needles are stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Clause {
    /// Case-insensitive substring match on any of `fields`.
    TextContains {
        fields: Vec<TextField>,
        needle: String,
    },
    /// Inclusive bounds; a missing bound is open.
    Range {
        field: NumericField,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },
    /// Case-insensitive equality on a trimmed text field.
    Equals { field: TextField, value: String },
    /// At least one element contains `needle`, case-insensitive. Empty lists never match.
    AnyElementContains { field: ListField, needle: String },
    /// Membership test. Unlike the filter state, an empty `values` set is a real constraint here:
    /// include mode then matches nothing.
    In {
        field: KeyField,
        values: BTreeSet<String>,
        mode: SelectionMode,
    },
}

impl Clause {
    pub fn matches(&self, record: &ScholarRecord) -> bool {
        match self {
            Clause::TextContains { fields, needle } => fields.iter().any(|field| {
                text_value(record, *field)
                    .to_lowercase()
                    .contains(needle.as_str())
            }),
            Clause::Range { field, min, max } => {
                let value = numeric_value(record, *field);
                min.map_or(true, |min| value >= min) && max.map_or(true, |max| value <= max)
            }
            Clause::Equals { field, value } => text_value(record, *field)
                .trim()
                .eq_ignore_ascii_case(value),
            Clause::AnyElementContains { field, needle } => list_value(record, *field)
                .iter()
                .any(|element| element.to_lowercase().contains(needle.as_str())),
            Clause::In {
                field,
                values,
                mode,
            } => {
                let selected = key_value(record, *field)
                    .is_some_and(|value| values.contains(value.as_str()));
                selection_passes(*mode, selected)
            }
        }
    }
}

pub(crate) fn selection_passes(mode: SelectionMode, selected: bool) -> bool {
    match mode {
        SelectionMode::Include => selected,
        SelectionMode::Exclude => !selected,
    }
}

fn text_value(record: &ScholarRecord, field: TextField) -> &str {
    match field {
        TextField::Name => &record.name,
        TextField::Title => record.title.as_deref().unwrap_or_default(),
        TextField::ShouldEmail => &record.should_email,
    }
}

fn numeric_value(record: &ScholarRecord, field: NumericField) -> i64 {
    match field {
        NumericField::RelevanceScore => i64::from(record.relevance_score),
        NumericField::ActiveGrantsCount => i64::from(record.active_grants_count),
    }
}

fn list_value(record: &ScholarRecord, field: ListField) -> &[String] {
    match field {
        ListField::Requirements => &record.requirements,
    }
}

fn key_value(record: &ScholarRecord, field: KeyField) -> Option<String> {
    match field {
        KeyField::DepartmentCode => Some(main_code_of(record.department.as_deref())),
        KeyField::Department => Some(record.full_department().to_string()),
        KeyField::Position => record.position.clone(),
    }
}

/// Structured conjunction of clauses handed to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScholarQuery {
    clauses: Vec<Clause>,
}

impl ScholarQuery {
    /// Query accepting every record.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn from_clauses(clauses: Vec<Clause>) -> Self {
        Self { clauses }
    }

    /// Build the store query for `filters`. Department selections are display names and are
    /// resolved to main codes through `catalog`; names the catalog would never produce resolve to
    /// nothing, so they match no record.
    pub fn from_filters(filters: &FilterState, catalog: &DepartmentCatalog) -> Self {
        let mut clauses = Vec::new();

        let text = filters.text_query();
        if !text.is_empty() {
            clauses.push(Clause::TextContains {
                fields: vec![TextField::Name, TextField::Title],
                needle: text.to_lowercase(),
            });
        }

        let range = filters.score_range();
        if !range.is_default() {
            clauses.push(Clause::Range {
                field: NumericField::RelevanceScore,
                min: Some(range.min),
                max: Some(range.max),
            });
        }

        let min_grants = (filters.min_grants() > 0).then_some(filters.min_grants());
        if min_grants.is_some() || filters.max_grants().is_some() {
            clauses.push(Clause::Range {
                field: NumericField::ActiveGrantsCount,
                min: min_grants,
                max: filters.max_grants(),
            });
        }

        if filters.good_match_only() {
            clauses.push(Clause::Equals {
                field: TextField::ShouldEmail,
                value: GOOD_MATCH_FLAG.to_string(),
            });
        }

        let keyword = filters.req_keyword();
        if !keyword.is_empty() {
            clauses.push(Clause::AnyElementContains {
                field: ListField::Requirements,
                needle: keyword.to_lowercase(),
            });
        }

        let departments = filters.selection(FilterDimension::Department);
        if !departments.is_empty() {
            clauses.push(Clause::In {
                field: KeyField::DepartmentCode,
                values: departments
                    .values()
                    .iter()
                    .filter_map(|display| catalog.code_for_display(display))
                    .collect(),
                mode: departments.mode(),
            });
        }

        for (dimension, field) in [
            (FilterDimension::SubDepartment, KeyField::Department),
            (FilterDimension::Position, KeyField::Position),
        ] {
            let selection = filters.selection(dimension);
            if !selection.is_empty() {
                clauses.push(Clause::In {
                    field,
                    values: selection.values().clone(),
                    mode: selection.mode(),
                });
            }
        }

        Self { clauses }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, record: &ScholarRecord) -> bool {
        self.clauses.iter().all(|clause| clause.matches(record))
    }
}
