use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

const BUILTIN_DEPARTMENTS: &[(&str, &str)] = &[
    ("AG", "College of Agricultural and Life Sciences"),
    ("BA", "Warrington College of Business"),
    ("CJC", "College of Journalism and Communications"),
    ("COTA", "College of the Arts"),
    ("DCP", "College of Design, Construction and Planning"),
    ("DN", "College of Dentistry"),
    ("ED", "College of Education"),
    ("EG", "Herbert Wertheim College of Engineering"),
    ("HH", "College of Health and Human Performance"),
    ("JAX", "College of Medicine – Jacksonville"),
    ("JX", "College of Medicine – Jacksonville"),
    ("LB", "George A. Smathers Libraries"),
    ("LS", "College of Liberal Arts and Sciences"),
    ("LW", "Levin College of Law"),
    ("MD", "College of Medicine"),
    ("NH", "Florida Museum of Natural History"),
    ("NR", "College of Nursing"),
    ("PH", "College of Pharmacy"),
    ("PHHP", "College of Public Health and Health Professions"),
    ("VM", "College of Veterinary Medicine"),
    ("SR", "College of Veterinary Medicine"),
    ("HA", "Health Affairs"),
    ("HP", "Health Professions"),
    ("HS", "Health Science Center"),
    ("RE", "Office of Research"),
    ("SH", "Student Health Care Center"),
    ("SL", "Student Life"),
    ("PR", "Office of the President"),
    ("PV", "Office of the Provost"),
    ("TT", "Treasurer's Office"),
    ("GR", "Graduate School"),
    ("IP", "UF Innovate"),
    ("IT", "Information Technology"),
];

const DISPLAY_SEPARATOR: &str = " - ";

/// Department code to human-readable college name table.
///
/// Injected wherever department strings are turned into display names so a deployment can swap
/// the table without touching the filter logic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepartmentCatalog {
    names: BTreeMap<String, String>,
}

impl DepartmentCatalog {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            names: entries
                .into_iter()
                .map(|(code, name)| (code.into(), name.into()))
                .collect(),
        }
    }

    /// Table shipped with the service.
    pub fn builtin() -> Self {
        Self::new(BUILTIN_DEPARTMENTS.iter().copied())
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Read a `code,name` CSV with a header row.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut names = BTreeMap::new();

        for (index, row) in csv_reader.deserialize::<CatalogRow>().enumerate() {
            let row = row?;
            if row.code.is_empty() {
                return Err(CatalogError::EmptyCode { row: index + 1 });
            }
            names.insert(row.code, row.name);
        }

        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name_for(&self, code: &str) -> Option<&str> {
        self.names.get(code).map(String::as_str)
    }

    /// `"CODE - Name"` when the code is mapped, the bare code otherwise.
    pub fn display_name(&self, code: &str) -> String {
        match self.name_for(code) {
            Some(name) => format!("{code}{DISPLAY_SEPARATOR}{name}"),
            None => code.to_string(),
        }
    }

    /// Inverse of [`display_name`](Self::display_name). Returns `None` when `display` is not a
    /// name this catalog would ever produce.
    pub fn code_for_display(&self, display: &str) -> Option<String> {
        let code = display
            .split_once(DISPLAY_SEPARATOR)
            .map(|(code, _)| code)
            .unwrap_or(display);

        (self.display_name(code) == display).then(|| code.to_string())
    }

    /// Accept either a display name or a bare main code and return the display name.
    pub fn normalize_selection(&self, value: &str) -> String {
        let value = value.trim();
        if self.code_for_display(value).is_some() {
            return value.to_string();
        }
        self.display_name(value)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    code: String,
    name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read department map: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid department map CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("department map row {row} has an empty code")]
    EmptyCode { row: usize },
}

/// Department string split into its main code and optional sub-code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentRef {
    pub main_code: String,
    pub sub_code: Option<String>,
}

impl DepartmentRef {
    /// Split on the first hyphen. Returns `None` when there is no main code.
    pub fn parse(raw: &str) -> Option<Self> {
        let (main, sub) = match raw.split_once('-') {
            Some((main, sub)) => (main.trim(), Some(sub.trim())),
            None => (raw.trim(), None),
        };

        if main.is_empty() {
            return None;
        }

        Some(Self {
            main_code: main.to_string(),
            sub_code: sub.filter(|sub| !sub.is_empty()).map(str::to_string),
        })
    }

    /// `"MAIN-SUB"` when a sub-code is present.
    pub fn sub_department(&self) -> Option<String> {
        self.sub_code
            .as_ref()
            .map(|sub| format!("{}-{}", self.main_code, sub))
    }
}

/// Main code of an optional department string; empty when absent or blank.
pub(crate) fn main_code_of(department: Option<&str>) -> String {
    department
        .and_then(DepartmentRef::parse)
        .map(|parsed| parsed.main_code)
        .unwrap_or_default()
}
