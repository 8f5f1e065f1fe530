use crate::infra::{load_store, parse_date};
use chrono::{Local, NaiveDate};
use clap::{Args, ValueEnum};
use scholar_directory::config::AppConfig;
use scholar_directory::error::AppError;
use scholar_directory::scholars::{
    default_indexes, export_records, provision_indexes, DirectoryFetcher, ExportFormat,
    InMemoryIndexRegistry, IndexOutcome, SavedList, SharedSavedList,
};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for ExportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Json => ExportFormat::Json,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    /// JSON array of saved scholar ids
    #[arg(long)]
    pub(crate) ids: PathBuf,
    /// Output format
    #[arg(long, value_enum, default_value_t = FormatArg::Csv)]
    pub(crate) format: FormatArg,
    /// Directory the export file is written to
    #[arg(long, default_value = ".")]
    pub(crate) out: PathBuf,
    /// Override the configured scholar dataset
    #[arg(long)]
    pub(crate) data: Option<PathBuf>,
    /// Date used in the file name (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) date: Option<NaiveDate>,
}

pub(crate) async fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let data_path = args.data.unwrap_or(config.directory.data_path);
    let fetcher = DirectoryFetcher::new(Arc::new(load_store(&data_path)?));
    let saved = SharedSavedList::new(read_saved_list(&args.ids)?);

    let format = ExportFormat::from(args.format);
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());

    let records = fetcher.saved(&saved).await?.unwrap_or_default();
    let resolved: Vec<_> = records.iter().collect();

    match export_records(format, &resolved)? {
        Some(payload) => {
            std::fs::create_dir_all(&args.out)?;
            let path = args.out.join(payload.file_name(date));
            std::fs::write(&path, &payload.body)?;
            println!(
                "Exported {} of {} saved scholars to {}",
                payload.count,
                saved.snapshot().len(),
                path.display()
            );
        }
        None => println!("None of the saved scholars were found; nothing exported."),
    }

    Ok(())
}

fn read_saved_list(path: &Path) -> Result<SavedList, AppError> {
    let reader = BufReader::new(File::open(path)?);
    let saved = serde_json::from_reader(reader).map_err(std::io::Error::from)?;
    Ok(saved)
}

pub(crate) fn run_indexes() -> Result<(), AppError> {
    let registry = InMemoryIndexRegistry::default();
    let specs = default_indexes();

    println!("Creating indexes...");
    for (name, outcome) in provision_indexes(&registry, &specs) {
        match outcome {
            Ok(IndexOutcome::Created) => println!("  created {name}"),
            Ok(IndexOutcome::AlreadyExists) => println!("  {name} (already exists)"),
            Err(err) => println!("  failed {name}: {err}"),
        }
    }
    println!("Indexes: {}", registry.names().join(", "));

    Ok(())
}
