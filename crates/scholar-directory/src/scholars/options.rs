use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::departments::{DepartmentCatalog, DepartmentRef};
use super::domain::ScholarRecord;

/// Raw distinct values as the store reports them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterValues {
    pub departments: Vec<String>,
    pub positions: Vec<String>,
}

/// Option lists for the filter sidebar plus the department to sub-department adjacency.
///
/// Every list is sorted by byte order of the display string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub departments: Vec<String>,
    pub positions: Vec<String>,
    /// Display department name to the full `MAIN-SUB` strings observed under it.
    pub sub_departments: BTreeMap<String, BTreeSet<String>>,
}

impl FilterOptions {
    pub fn from_records<'a, I>(records: I, catalog: &DepartmentCatalog) -> Self
    where
        I: IntoIterator<Item = &'a ScholarRecord>,
    {
        let mut builder = OptionsBuilder::default();
        for record in records {
            if let Some(department) = record.department.as_deref() {
                builder.department(department, catalog);
            }
            if let Some(position) = record.position.as_deref() {
                builder.position(position);
            }
        }
        builder.finish()
    }

    pub fn from_values<D, P, S, T>(departments: D, positions: P, catalog: &DepartmentCatalog) -> Self
    where
        D: IntoIterator<Item = S>,
        P: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let mut builder = OptionsBuilder::default();
        for department in departments {
            builder.department(department.as_ref(), catalog);
        }
        for position in positions {
            builder.position(position.as_ref());
        }
        builder.finish()
    }

    /// Union of sub-departments under `selected`, or under every department when nothing is
    /// selected. Sorted.
    pub fn available_sub_departments(&self, selected: &BTreeSet<String>) -> Vec<String> {
        if selected.is_empty() {
            let all: BTreeSet<&String> = self.sub_departments.values().flatten().collect();
            return all.into_iter().cloned().collect();
        }
        self.reachable_sub_departments(selected).into_iter().collect()
    }

    /// Sub-departments reachable from the given display departments. Unknown names reach nothing.
    pub fn reachable_sub_departments(&self, departments: &BTreeSet<String>) -> BTreeSet<String> {
        departments
            .iter()
            .filter_map(|department| self.sub_departments.get(department))
            .flatten()
            .cloned()
            .collect()
    }
}

#[derive(Default)]
struct OptionsBuilder {
    departments: BTreeSet<String>,
    positions: BTreeSet<String>,
    sub_departments: BTreeMap<String, BTreeSet<String>>,
}

impl OptionsBuilder {
    fn department(&mut self, raw: &str, catalog: &DepartmentCatalog) {
        let Some(parsed) = DepartmentRef::parse(raw) else {
            return;
        };
        let display = catalog.display_name(&parsed.main_code);
        let subs = self.sub_departments.entry(display.clone()).or_default();
        if let Some(sub) = parsed.sub_department() {
            subs.insert(sub);
        }
        self.departments.insert(display);
    }

    fn position(&mut self, raw: &str) {
        if !raw.is_empty() {
            self.positions.insert(raw.to_string());
        }
    }

    fn finish(self) -> FilterOptions {
        FilterOptions {
            departments: self.departments.into_iter().collect(),
            positions: self.positions.into_iter().collect(),
            sub_departments: self.sub_departments,
        }
    }
}

/// Source of "now" for anything time-boxed.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Distinct values and the options derived from them, as cached together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFilters {
    pub values: FilterValues,
    pub options: FilterOptions,
}

/// Time-boxed cache of the distinct-values lookup.
pub struct FilterOptionsCache<C = SystemClock> {
    clock: C,
    ttl: Duration,
    entry: Option<(DateTime<Utc>, Arc<CachedFilters>)>,
}

impl<C: Clock> FilterOptionsCache<C> {
    pub fn new(clock: C, ttl: Duration) -> Self {
        Self {
            clock,
            ttl,
            entry: None,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached value if it was stored less than `ttl` ago.
    pub fn fresh(&self) -> Option<Arc<CachedFilters>> {
        let (stored_at, cached) = self.entry.as_ref()?;
        (self.clock.now() - *stored_at < self.ttl).then(|| Arc::clone(cached))
    }

    pub fn store(&mut self, cached: CachedFilters) -> Arc<CachedFilters> {
        let cached = Arc::new(cached);
        self.entry = Some((self.clock.now(), Arc::clone(&cached)));
        cached
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scholars::domain::ScholarId;
    use std::sync::Mutex;

    fn catalog() -> DepartmentCatalog {
        DepartmentCatalog::new([("EG", "Engineering"), ("LS", "Liberal Arts")])
    }

    fn record(id: &str, department: Option<&str>, position: Option<&str>) -> ScholarRecord {
        ScholarRecord {
            id: ScholarId::from(id),
            department: department.map(str::to_string),
            position: position.map(str::to_string),
            ..ScholarRecord::default()
        }
    }

    #[test]
    fn derives_sorted_display_departments_and_positions() {
        let records = vec![
            record("1", Some("LS-MATH"), Some("Professor")),
            record("2", Some("EG-CS"), Some("Associate Professor")),
            record("3", Some("ZZ"), Some("Professor")),
            record("4", None, None),
            record("5", Some("EG-ECE"), Some("Lecturer")),
        ];

        let options = FilterOptions::from_records(&records, &catalog());

        assert_eq!(
            options.departments,
            vec!["EG - Engineering", "LS - Liberal Arts", "ZZ"]
        );
        assert_eq!(
            options.positions,
            vec!["Associate Professor", "Lecturer", "Professor"]
        );
        let eg: Vec<&String> = options.sub_departments["EG - Engineering"].iter().collect();
        assert_eq!(eg, vec!["EG-CS", "EG-ECE"]);
        assert!(options.sub_departments["ZZ"].is_empty());
    }

    #[test]
    fn unselected_departments_expose_every_sub_department() {
        let options =
            FilterOptions::from_values(["LS-MATH", "EG-ECE", "EG-CS", "LS-CS"], ["x"], &catalog());

        let all = options.available_sub_departments(&BTreeSet::new());
        assert_eq!(all, vec!["EG-CS", "EG-ECE", "LS-CS", "LS-MATH"]);

        let union: BTreeSet<String> = options.sub_departments.values().flatten().cloned().collect();
        assert_eq!(all, union.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn selected_departments_restrict_sub_departments() {
        let options =
            FilterOptions::from_values(["LS-MATH", "EG-ECE", "EG-CS", "LS-CS"], ["x"], &catalog());
        let selected: BTreeSet<String> = ["LS - Liberal Arts".to_string()].into();

        assert_eq!(
            options.available_sub_departments(&selected),
            vec!["LS-CS", "LS-MATH"]
        );

        let unknown: BTreeSet<String> = ["QQ".to_string()].into();
        assert!(options.available_sub_departments(&unknown).is_empty());
    }

    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn advance(&self, by: Duration) {
            let mut now = self.0.lock().expect("clock mutex poisoned");
            *now += by;
        }
    }

    impl Clock for Arc<ManualClock> {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().expect("clock mutex poisoned")
        }
    }

    fn cached(positions: &[&str]) -> CachedFilters {
        let values = FilterValues {
            departments: Vec::new(),
            positions: positions.iter().map(|p| p.to_string()).collect(),
        };
        let options = FilterOptions::from_values(&values.departments, &values.positions, &catalog());
        CachedFilters { values, options }
    }

    #[test]
    fn cache_serves_until_ttl_elapses() {
        let clock = Arc::new(ManualClock(Mutex::new(Utc::now())));
        let mut cache = FilterOptionsCache::new(Arc::clone(&clock), Duration::hours(1));
        assert!(cache.fresh().is_none());

        cache.store(cached(&["Professor"]));
        clock.advance(Duration::minutes(59));
        let served = cache.fresh().expect("still fresh");
        assert_eq!(served.values.positions, vec!["Professor"]);

        clock.advance(Duration::minutes(1));
        assert!(cache.fresh().is_none());

        let refreshed = cache.store(cached(&["Lecturer"]));
        assert_eq!(refreshed.values.positions, vec!["Lecturer"]);
        assert_eq!(cache.fresh(), Some(refreshed));
    }

    #[test]
    fn invalidate_drops_the_entry() {
        let clock = Arc::new(ManualClock(Mutex::new(Utc::now())));
        let mut cache = FilterOptionsCache::new(Arc::clone(&clock), Duration::seconds(10));

        cache.store(cached(&["Professor"]));
        assert!(cache.fresh().is_some());
        cache.invalidate();
        assert!(cache.fresh().is_none());
    }
}
