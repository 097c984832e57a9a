use chrono::{DateTime, Local, NaiveDate};

use crate::data::classify::classify;
use crate::data::enrich::enrich_on;
use crate::data::loader::decode_table;
use crate::data::model::{StockTable, SyncedFileEntry};
use crate::data::region::RegionTag;
use crate::error::{IngestError, SourceError};
use crate::source::{RemoteFile, SnapshotSource};

// ---------------------------------------------------------------------------
// Sync report
// ---------------------------------------------------------------------------

/// A file that contributed no records, and why.
#[derive(Debug)]
pub struct FileWarning {
    pub filename: String,
    pub error: IngestError,
}

/// Everything one sync produced. Replaces the previous sync wholesale.
#[derive(Debug)]
pub struct SyncReport {
    /// One entry per listed file, including files that failed.
    pub entries: Vec<SyncedFileEntry>,
    pub dataset: StockTable,
    pub warnings: Vec<FileWarning>,
    pub synced_at: DateTime<Local>,
}

impl SyncReport {
    pub fn record_count(&self) -> usize {
        self.dataset.len()
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// List, classify, fetch, decode and enrich every file in `folder`.
///
/// Only the listing can fail the sync. A file that cannot be fetched or
/// decoded is skipped and reported in [`SyncReport::warnings`].
pub fn sync<S>(source: &S, folder: Option<&str>) -> Result<SyncReport, SourceError>
where
    S: SnapshotSource + ?Sized,
{
    let synced_at = Local::now();
    let files = source.list(folder)?;
    if files.is_empty() {
        log::warn!("No Excel or CSV files found in the specified location");
    }

    let mut entries = Vec::with_capacity(files.len());
    let mut tables = Vec::new();
    let mut warnings = Vec::new();

    for file in &files {
        log::info!("Processing: {}", file.name);
        let meta = classify(&file.name);

        match ingest_file(source, file, meta.region, meta.date, synced_at.date_naive()) {
            Ok(table) => tables.push(table),
            Err(error) => {
                log::warn!("Skipping {}: {error}", file.name);
                warnings.push(FileWarning {
                    filename: file.name.clone(),
                    error,
                });
            }
        }

        entries.push(SyncedFileEntry {
            id: file.id.clone(),
            filename: meta.filename,
            date: meta.date,
            region: meta.region,
            modified_time: file.modified_time.clone(),
            synced_at,
        });
    }

    let dataset = StockTable::concat(tables);
    if dataset.is_empty() && !entries.is_empty() {
        log::warn!("Files synced but no stock data could be extracted. Check file format.");
    } else {
        log::info!(
            "Synced {} files with {} stock records",
            entries.len(),
            dataset.len()
        );
    }

    Ok(SyncReport {
        entries,
        dataset,
        warnings,
        synced_at,
    })
}

fn ingest_file<S>(
    source: &S,
    file: &RemoteFile,
    region: RegionTag,
    date: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<StockTable, IngestError>
where
    S: SnapshotSource + ?Sized,
{
    let bytes = source.fetch(&file.id, &file.mime_type)?;
    let raw = decode_table(&bytes, &file.name)?;
    enrich_on(&raw, region, date, today).ok_or(IngestError::NoRows)
}
