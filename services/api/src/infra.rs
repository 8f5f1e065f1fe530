use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use scholar_directory::config::DirectoryConfig;
use scholar_directory::error::AppError;
use scholar_directory::scholars::{DepartmentCatalog, InMemoryScholarStore};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Department table from `APP_DEPARTMENT_MAP` when configured, the built-in one otherwise.
pub(crate) fn load_catalog(config: &DirectoryConfig) -> Result<DepartmentCatalog, AppError> {
    match &config.department_map {
        Some(path) => {
            let catalog = DepartmentCatalog::from_path(path)?;
            info!(path = %path.display(), departments = catalog.len(), "loaded department map");
            Ok(catalog)
        }
        None => Ok(DepartmentCatalog::builtin()),
    }
}

pub(crate) fn load_store(path: &Path) -> Result<InMemoryScholarStore, AppError> {
    let store = InMemoryScholarStore::from_json_path(path)?;
    info!(path = %path.display(), scholars = store.len(), "loaded scholar dataset");
    Ok(store)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
