use chrono::{DateTime, Local};

use crate::data::filter::{apply_filters, ViewFilter};
use crate::data::model::{StockTable, SyncedFileEntry};
use crate::sync::SyncReport;

// ---------------------------------------------------------------------------
// Session store
// ---------------------------------------------------------------------------

/// Session-scoped state owned by the host application.
///
/// A sync replaces everything at once; there is no incremental merge.
#[derive(Debug, Default)]
pub struct SessionStore {
    /// Merged dataset from the last successful sync.
    pub dataset: StockTable,

    /// One entry per file seen by the last sync.
    pub synced_files: Vec<SyncedFileEntry>,

    /// When the last sync finished (None until the first sync).
    pub last_sync: Option<DateTime<Local>>,
}

impl SessionStore {
    /// Ingest a sync report, replacing the previous dataset and file list.
    pub fn apply_sync(&mut self, report: SyncReport) {
        log::info!(
            "Loaded {} stock records from {} files",
            report.dataset.len(),
            report.entries.len()
        );
        self.dataset = report.dataset;
        self.synced_files = report.entries;
        self.last_sync = Some(report.synced_at);
    }

    /// Clear all synced data.
    pub fn reset(&mut self) {
        *self = SessionStore::default();
    }

    pub fn has_data(&self) -> bool {
        !self.dataset.is_empty()
    }

    /// The dataset narrowed to a view.
    pub fn view(&self, filter: &ViewFilter) -> StockTable {
        apply_filters(&self.dataset, filter)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::NaiveDate;

    use super::*;
    use crate::data::filter::RegionFilter;
    use crate::data::model::{Column, StockRecord};
    use crate::data::region::RegionTag;

    fn report(regions: &[RegionTag]) -> SyncReport {
        let date = NaiveDate::from_ymd_opt(2025, 3, 11).unwrap();
        let records = regions.iter().map(|r| StockRecord::new(*r, date)).collect();
        SyncReport {
            entries: Vec::new(),
            dataset: StockTable::new(records, BTreeSet::from([Column::Region, Column::FileDate])),
            warnings: Vec::new(),
            synced_at: Local::now(),
        }
    }

    #[test]
    fn test_apply_sync_replaces_previous_data() {
        let mut store = SessionStore::default();
        assert!(!store.has_data());

        store.apply_sync(report(&[RegionTag::Us, RegionTag::Japan]));
        assert_eq!(store.dataset.len(), 2);
        assert!(store.last_sync.is_some());

        store.apply_sync(report(&[RegionTag::Uk]));
        assert_eq!(store.dataset.len(), 1);
        assert_eq!(store.dataset.records[0].region, RegionTag::Uk);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut store = SessionStore::default();
        store.apply_sync(report(&[RegionTag::Us]));
        store.reset();
        assert!(!store.has_data());
        assert!(store.synced_files.is_empty());
        assert!(store.last_sync.is_none());
    }

    #[test]
    fn test_view_does_not_mutate_dataset() {
        let mut store = SessionStore::default();
        store.apply_sync(report(&[RegionTag::Us, RegionTag::Japan]));
        let filter = ViewFilter {
            region: RegionFilter::Only(RegionTag::Japan),
            ..ViewFilter::default()
        };
        assert_eq!(store.view(&filter).len(), 1);
        assert_eq!(store.dataset.len(), 2);
    }
}
