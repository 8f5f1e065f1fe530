use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{ScholarId, ScholarRecord};

pub const CSV_HEADERS: [&str; 13] = [
    "name",
    "email",
    "department",
    "position",
    "title",
    "relevance_score",
    "should_email",
    "active_grants_count",
    "active_grants_json",
    "expired_grants_json",
    "publications_json",
    "possible_requirements",
    "reasoning",
];

const LIST_SEPARATOR: &str = "; ";

/// Scholars the user has set aside, independent of filters and paging.
///
/// Ids keep their insertion order; every mutation is idempotent. Ids that no longer resolve to a
/// record are kept and simply skipped on export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ScholarId>", into = "Vec<ScholarId>")]
pub struct SavedList {
    order: Vec<ScholarId>,
    members: HashSet<ScholarId>,
}

impl From<Vec<ScholarId>> for SavedList {
    fn from(ids: Vec<ScholarId>) -> Self {
        let mut list = Self::default();
        list.add_all(ids);
        list
    }
}

impl From<SavedList> for Vec<ScholarId> {
    fn from(list: SavedList) -> Self {
        list.order
    }
}

impl SavedList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, id: ScholarId) {
        if self.members.insert(id.clone()) {
            self.order.push(id);
        }
    }

    pub fn remove(&mut self, id: &ScholarId) {
        if self.members.remove(id) {
            self.order.retain(|existing| existing != id);
        }
    }

    /// Add if absent, remove if present. Returns `true` when the id is now saved.
    pub fn toggle(&mut self, id: ScholarId) -> bool {
        if self.has(&id) {
            self.remove(&id);
            false
        } else {
            self.add(id);
            true
        }
    }

    pub fn add_all<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = ScholarId>,
    {
        for id in ids {
            self.add(id);
        }
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }

    pub fn has(&self, id: &ScholarId) -> bool {
        self.members.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn ids(&self) -> &[ScholarId] {
        &self.order
    }

    /// Saved records present in `records`, in the order `records` yields them.
    pub fn resolve<'a, I>(&self, records: I) -> Vec<&'a ScholarRecord>
    where
        I: IntoIterator<Item = &'a ScholarRecord>,
    {
        records
            .into_iter()
            .filter(|record| self.has(&record.id))
            .collect()
    }

    /// Serialize the saved records found in `records`. `None` when nothing resolves.
    pub fn export<'a, I>(
        &self,
        format: ExportFormat,
        records: I,
    ) -> Result<Option<ExportPayload>, ExportError>
    where
        I: IntoIterator<Item = &'a ScholarRecord>,
    {
        let resolved = self.resolve(records);
        export_records(format, &resolved)
    }
}

/// Serialize already-resolved records. `None` when `records` is empty.
pub fn export_records(
    format: ExportFormat,
    records: &[&ScholarRecord],
) -> Result<Option<ExportPayload>, ExportError> {
    if records.is_empty() {
        return Ok(None);
    }

    let body = match format {
        ExportFormat::Csv => write_csv(records)?,
        ExportFormat::Json => write_json(records)?,
    };

    Ok(Some(ExportPayload {
        format,
        count: records.len(),
        body,
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    pub fn content_type(self) -> mime::Mime {
        match self {
            Self::Csv => mime::TEXT_CSV_UTF_8,
            Self::Json => mime::APPLICATION_JSON,
        }
    }

    /// `scholars_list_<YYYY-MM-DD>.<ext>`
    pub fn file_name(self, date: NaiveDate) -> String {
        format!(
            "scholars_list_{}.{}",
            date.format("%Y-%m-%d"),
            self.extension()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPayload {
    pub format: ExportFormat,
    pub count: usize,
    pub body: Vec<u8>,
}

impl ExportPayload {
    pub fn file_name(&self, date: NaiveDate) -> String {
        self.format.file_name(date)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write CSV export: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to encode JSON export: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to flush export buffer: {0}")]
    Io(#[from] std::io::Error),
}

fn write_csv(records: &[&ScholarRecord]) -> Result<Vec<u8>, ExportError> {
    let mut header = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());
    header.write_record(CSV_HEADERS)?;
    let buffer = header.into_inner().map_err(|err| err.into_error())?;

    // Text cells arrive already quoted; the writer must not quote them again.
    let mut rows = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(buffer);
    for record in records {
        rows.write_record(csv_row(record)?)?;
    }

    Ok(rows.into_inner().map_err(|err| err.into_error())?)
}

/// Always wraps `value` in quotes, doubling embedded ones, even when it reads like a number.
fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn csv_row(record: &ScholarRecord) -> Result<[String; 13], serde_json::Error> {
    let text = |value: &Option<String>| quoted(value.as_deref().unwrap_or_default());

    Ok([
        quoted(&record.name),
        text(&record.email),
        text(&record.department),
        text(&record.position),
        text(&record.title),
        record.relevance_score.to_string(),
        quoted(&record.should_email),
        record.active_grants_count.to_string(),
        quoted(&serde_json::to_string(&record.active_grants)?),
        quoted(&serde_json::to_string(&record.expired_grants)?),
        quoted(&serde_json::to_string(&record.publications)?),
        quoted(&record.requirements.join(LIST_SEPARATOR)),
        quoted(&record.reasoning.join(LIST_SEPARATOR)),
    ])
}

/// Full records with `requirements` renamed to `possible_requirements`; that field and
/// `reasoning` come last.
pub fn export_value(record: &ScholarRecord) -> Result<Value, serde_json::Error> {
    let mut value = serde_json::to_value(record)?;
    if let Value::Object(fields) = &mut value {
        let requirements = fields.remove("requirements").unwrap_or(Value::Array(Vec::new()));
        let reasoning = fields.remove("reasoning").unwrap_or(Value::Array(Vec::new()));
        fields.insert("possible_requirements".to_string(), requirements);
        fields.insert("reasoning".to_string(), reasoning);
    }
    Ok(value)
}

fn write_json(records: &[&ScholarRecord]) -> Result<Vec<u8>, ExportError> {
    let values = records
        .iter()
        .map(|record| export_value(record))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(serde_json::to_vec_pretty(&values)?)
}

/// Saved list shared between UI handlers and fetch-completion callbacks. One writer at a time.
#[derive(Debug, Clone, Default)]
pub struct SharedSavedList {
    inner: Arc<Mutex<SavedList>>,
}

impl SharedSavedList {
    pub fn new(list: SavedList) -> Self {
        Self {
            inner: Arc::new(Mutex::new(list)),
        }
    }

    /// Run `f` with exclusive access. A poisoned lock is recovered; the list has no invariant a
    /// panicking writer could leave half-applied beyond a single push or retain.
    pub fn with<R>(&self, f: impl FnOnce(&mut SavedList) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn snapshot(&self) -> SavedList {
        self.with(|list| list.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scholars::domain::{Grant, Publication};

    fn scholar(id: &str, name: &str) -> ScholarRecord {
        ScholarRecord {
            id: ScholarId::from(id),
            name: name.to_string(),
            department: Some("EG-CS".to_string()),
            position: Some("Professor".to_string()),
            relevance_score: 80,
            should_email: "Yes".to_string(),
            active_grants_count: 1,
            ..ScholarRecord::default()
        }
    }

    #[test]
    fn adding_twice_keeps_one_entry() {
        let mut list = SavedList::new();
        list.add(ScholarId::from("x"));
        list.add(ScholarId::from("x"));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn removing_absent_id_is_a_no_op() {
        let mut list = SavedList::new();
        list.add(ScholarId::from("x"));
        list.remove(&ScholarId::from("y"));
        assert_eq!(list.len(), 1);
        assert!(list.has(&ScholarId::from("x")));
    }

    #[test]
    fn bulk_add_keeps_insertion_order_without_duplicates() {
        let mut list = SavedList::new();
        list.add(ScholarId::from("b"));
        list.add_all(["a", "b", "c"].map(ScholarId::from));
        let ids: Vec<&str> = list.ids().iter().map(ScholarId::as_str).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);

        assert!(!list.toggle(ScholarId::from("a")));
        assert!(list.toggle(ScholarId::from("a")));
        list.clear();
        assert!(list.is_empty());
    }

    #[test]
    fn persisted_form_is_a_json_array_of_ids() {
        let list: SavedList = serde_json::from_str(r#"["s-1","s-2","s-1"]"#).expect("parses");
        assert_eq!(list.len(), 2);
        assert_eq!(
            serde_json::to_string(&list).expect("serializes"),
            r#"["s-1","s-2"]"#
        );
    }

    #[test]
    fn csv_cells_double_embedded_quotes() {
        let records = vec![scholar("1", "Jane \"JJ\" Doe")];
        let mut list = SavedList::new();
        list.add(ScholarId::from("1"));

        let payload = list
            .export(ExportFormat::Csv, &records)
            .expect("export succeeds")
            .expect("one record resolves");
        let text = String::from_utf8(payload.body).expect("utf-8");
        let mut lines = text.lines();

        assert_eq!(lines.next(), Some(CSV_HEADERS.join(",").as_str()));
        let row = lines.next().expect("data row");
        assert!(row.starts_with("\"Jane \"\"JJ\"\" Doe\","));
        assert!(row.contains(",80,\"Yes\",1,"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn csv_quotes_text_that_reads_like_a_number() {
        let mut record = scholar("1", "2024");
        record.title = Some("3.5".to_string());
        let records = vec![record];
        let mut list = SavedList::new();
        list.add(ScholarId::from("1"));

        let payload = list
            .export(ExportFormat::Csv, &records)
            .expect("export succeeds")
            .expect("one record resolves");
        let text = String::from_utf8(payload.body).expect("utf-8");
        let row = text.lines().nth(1).expect("data row");

        assert!(row.starts_with("\"2024\",\"\",\"EG-CS\",\"Professor\",\"3.5\",80,\"Yes\",1,"));
    }

    #[test]
    fn csv_embeds_arrays_as_json_and_joins_tags() {
        let mut record = scholar("1", "Ada");
        record.active_grants = vec![Grant {
            title: Some("Compilers".to_string()),
            ..Grant::default()
        }];
        record.publications = vec![Publication {
            title: "On Engines".to_string(),
            date: "1843".to_string(),
            summary: None,
        }];
        record.requirements = vec!["Rust".to_string(), "SQL".to_string()];
        let records = vec![record];
        let mut list = SavedList::new();
        list.add(ScholarId::from("1"));

        let payload = list
            .export(ExportFormat::Csv, &records)
            .expect("export succeeds")
            .expect("one record resolves");

        let mut reader = csv::Reader::from_reader(payload.body.as_slice());
        let row = reader
            .records()
            .next()
            .expect("row present")
            .expect("row parses");
        assert_eq!(&row[8], r#"[{"title":"Compilers"}]"#);
        assert_eq!(&row[9], "[]");
        assert_eq!(&row[10], r#"[{"title":"On Engines","date":"1843"}]"#);
        assert_eq!(&row[11], "Rust; SQL");
        assert_eq!(&row[1], "");
    }

    #[test]
    fn json_export_renames_requirements() {
        let mut record = scholar("1", "Ada");
        record.requirements = vec!["Rust".to_string()];
        record.reasoning = vec!["Strong systems background".to_string()];
        let records = vec![record];
        let list = SavedList::from(vec![ScholarId::from("1"), ScholarId::from("gone")]);

        let payload = list
            .export(ExportFormat::Json, &records)
            .expect("export succeeds")
            .expect("one record resolves");
        assert_eq!(payload.count, 1);

        let exported: Value = serde_json::from_slice(&payload.body).expect("valid json");
        let first = &exported[0];
        assert!(first.get("requirements").is_none());
        assert_eq!(first["possible_requirements"], serde_json::json!(["Rust"]));
        assert_eq!(
            first["reasoning"],
            serde_json::json!(["Strong systems background"])
        );
    }

    #[test]
    fn nothing_resolved_means_no_export() {
        let records = vec![scholar("1", "Ada")];
        let list = SavedList::from(vec![ScholarId::from("missing")]);
        assert!(list
            .export(ExportFormat::Csv, &records)
            .expect("export runs")
            .is_none());
        assert!(SavedList::new()
            .export(ExportFormat::Json, &records)
            .expect("export runs")
            .is_none());
    }

    #[test]
    fn file_names_carry_iso_date() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).expect("valid date");
        assert_eq!(
            ExportFormat::Csv.file_name(date),
            "scholars_list_2025-03-07.csv"
        );
        assert_eq!(
            ExportFormat::Json.file_name(date),
            "scholars_list_2025-03-07.json"
        );
        assert_eq!(ExportFormat::parse("JSON"), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::parse("xml"), None);
    }

    #[test]
    fn shared_list_serializes_writers() {
        let shared = SharedSavedList::default();
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    shared.with(|list| list.add(ScholarId::from(format!("s-{n}"))));
                    shared.with(|list| list.add(ScholarId::from("common")));
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("writer thread finishes");
        }
        assert_eq!(shared.snapshot().len(), 5);
    }
}
