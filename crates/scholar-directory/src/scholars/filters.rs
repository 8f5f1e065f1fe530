use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::options::FilterOptions;

pub const DEFAULT_MIN_SCORE: i64 = 0;
pub const DEFAULT_MAX_SCORE: i64 = 100;

/// Multi-select dimensions exposed by the filter sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterDimension {
    Department,
    SubDepartment,
    Position,
}

impl FilterDimension {
    pub const ALL: [FilterDimension; 3] = [Self::Department, Self::SubDepartment, Self::Position];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Department => "Department",
            Self::SubDepartment => "Sub-department",
            Self::Position => "Position",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    #[default]
    Include,
    Exclude,
}

impl SelectionMode {
    /// Anything other than `exclude` selects include mode.
    pub fn parse_lenient(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("exclude") {
            Self::Exclude
        } else {
            Self::Include
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Include => "include",
            Self::Exclude => "exclude",
        }
    }
}

/// Selected values of one dimension plus its include/exclude mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiSelect {
    values: BTreeSet<String>,
    mode: SelectionMode,
}

impl MultiSelect {
    pub fn new<I, S>(values: I, mode: SelectionMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            mode,
        }
    }

    pub fn values(&self) -> &BTreeSet<String> {
        &self.values
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values.contains(value)
    }

    /// An empty selection places no constraint, whatever the mode.
    pub fn admits(&self, value: &str) -> bool {
        if self.values.is_empty() {
            return true;
        }
        match self.mode {
            SelectionMode::Include => self.values.contains(value),
            SelectionMode::Exclude => !self.values.contains(value),
        }
    }

    /// Flip membership; returns `true` when the value is now selected.
    fn toggle(&mut self, value: &str) -> bool {
        if self.values.remove(value) {
            false
        } else {
            self.values.insert(value.to_string());
            true
        }
    }

    fn retain_within(&mut self, allowed: &BTreeSet<String>) {
        self.values.retain(|value| allowed.contains(value));
    }
}

/// Inclusive relevance score bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub min: i64,
    pub max: i64,
}

impl Default for ScoreRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_SCORE,
            max: DEFAULT_MAX_SCORE,
        }
    }
}

impl ScoreRange {
    pub fn new(min: Option<i64>, max: Option<i64>) -> Self {
        Self {
            min: min.unwrap_or(DEFAULT_MIN_SCORE),
            max: max.unwrap_or(DEFAULT_MAX_SCORE),
        }
    }

    pub fn contains(&self, score: i64) -> bool {
        score >= self.min && score <= self.max
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Every active criterion of the scholar filter sidebar.
///
/// The sub-department selection is kept inside the set reachable from the selected departments:
/// deselecting a department prunes sub-departments no remaining department can reach, unless no
/// department remains selected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    text_query: String,
    req_keyword: String,
    score_range: ScoreRange,
    min_grants: i64,
    max_grants: Option<i64>,
    good_match_only: bool,
    departments: MultiSelect,
    sub_departments: MultiSelect,
    positions: MultiSelect,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text_query(&self) -> &str {
        &self.text_query
    }

    pub fn req_keyword(&self) -> &str {
        &self.req_keyword
    }

    pub fn score_range(&self) -> ScoreRange {
        self.score_range
    }

    pub fn min_grants(&self) -> i64 {
        self.min_grants
    }

    pub fn max_grants(&self) -> Option<i64> {
        self.max_grants
    }

    pub fn good_match_only(&self) -> bool {
        self.good_match_only
    }

    pub fn selection(&self, dimension: FilterDimension) -> &MultiSelect {
        match dimension {
            FilterDimension::Department => &self.departments,
            FilterDimension::SubDepartment => &self.sub_departments,
            FilterDimension::Position => &self.positions,
        }
    }

    fn selection_mut(&mut self, dimension: FilterDimension) -> &mut MultiSelect {
        match dimension {
            FilterDimension::Department => &mut self.departments,
            FilterDimension::SubDepartment => &mut self.sub_departments,
            FilterDimension::Position => &mut self.positions,
        }
    }

    pub fn set_text_query(&mut self, query: impl Into<String>) {
        self.text_query = query.into();
    }

    pub fn set_req_keyword(&mut self, keyword: impl Into<String>) {
        self.req_keyword = keyword.into();
    }

    pub fn set_score_range(&mut self, min: Option<i64>, max: Option<i64>) {
        self.score_range = ScoreRange::new(min, max);
    }

    pub fn set_min_grants(&mut self, min: Option<i64>) {
        self.min_grants = min.unwrap_or(0);
    }

    pub fn set_max_grants(&mut self, max: Option<i64>) {
        self.max_grants = max;
    }

    pub fn set_good_match_only(&mut self, enabled: bool) {
        self.good_match_only = enabled;
    }

    /// Flip `value` in the given dimension. Deselecting a department prunes sub-department
    /// selections that only it could reach.
    pub fn toggle(&mut self, dimension: FilterDimension, value: &str, options: &FilterOptions) {
        let selected = self.selection_mut(dimension).toggle(value);

        if dimension == FilterDimension::Department && !selected {
            self.prune_sub_departments(options);
        }
    }

    fn prune_sub_departments(&mut self, options: &FilterOptions) {
        if self.departments.is_empty() || self.sub_departments.is_empty() {
            return;
        }
        let reachable = options.reachable_sub_departments(self.departments.values());
        self.sub_departments.retain_within(&reachable);
    }

    pub fn set_mode(&mut self, dimension: FilterDimension, mode: SelectionMode) {
        self.selection_mut(dimension).mode = mode;
    }

    /// Replace a dimension's selection wholesale, keeping its mode.
    pub fn select_all<I, S>(&mut self, dimension: FilterDimension, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let selection = self.selection_mut(dimension);
        selection.values = values.into_iter().map(Into::into).collect();
    }

    /// Empty one dimension; clearing departments also clears sub-departments.
    pub fn clear_dimension(&mut self, dimension: FilterDimension) {
        self.selection_mut(dimension).values.clear();
        if dimension == FilterDimension::Department {
            self.sub_departments.values.clear();
        }
    }

    pub fn clear_all(&mut self) {
        *self = Self::default();
    }

    pub fn is_unconstrained(&self) -> bool {
        self.text_query.is_empty()
            && self.req_keyword.is_empty()
            && self.score_range.is_default()
            && self.min_grants <= 0
            && self.max_grants.is_none()
            && !self.good_match_only
            && FilterDimension::ALL
                .iter()
                .all(|dimension| self.selection(*dimension).is_empty())
    }
}
