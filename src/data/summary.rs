//! Aggregations behind the dashboard, search, sector and file views.

use std::collections::BTreeMap;

use super::model::{StockRecord, StockTable, SyncedFileEntry};
use super::region::RegionTag;

// ---------------------------------------------------------------------------
// Dataset overview
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overview {
    pub total_stocks: usize,
    pub regions: usize,
    pub sectors: usize,
}

pub fn overview(table: &StockTable) -> Overview {
    Overview {
        total_stocks: table.len(),
        regions: table.regions().len(),
        sectors: table.sectors().len(),
    }
}

/// Rows per current decile, ascending. Rows without a decile are left out.
pub fn decile_distribution(table: &StockTable) -> BTreeMap<i32, usize> {
    let mut counts = BTreeMap::new();
    for decile in table.records.iter().filter_map(|r| r.current_decile) {
        *counts.entry(decile).or_insert(0) += 1;
    }
    counts
}

pub fn region_distribution(table: &StockTable) -> BTreeMap<RegionTag, usize> {
    let mut counts = BTreeMap::new();
    for record in &table.records {
        *counts.entry(record.region).or_insert(0) += 1;
    }
    counts
}

/// Stock count per (region, sector). Rows without a sector are left out.
pub fn sector_region_counts(table: &StockTable) -> BTreeMap<(RegionTag, String), usize> {
    let mut counts = BTreeMap::new();
    for record in &table.records {
        if let Some(sector) = &record.sector {
            *counts.entry((record.region, sector.clone())).or_insert(0) += 1;
        }
    }
    counts
}

/// Mean current decile per (region, sector).
pub fn average_decile_by_sector(table: &StockTable) -> BTreeMap<(RegionTag, String), f64> {
    let mut sums: BTreeMap<(RegionTag, String), (i64, usize)> = BTreeMap::new();
    for record in &table.records {
        if let (Some(sector), Some(decile)) = (&record.sector, record.current_decile) {
            let slot = sums.entry((record.region, sector.clone())).or_default();
            slot.0 += i64::from(decile);
            slot.1 += 1;
        }
    }
    sums.into_iter()
        .map(|(key, (sum, n))| (key, sum as f64 / n as f64))
        .collect()
}

// ---------------------------------------------------------------------------
// Per-group summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroupSummary {
    pub count: usize,
    pub avg_decile: Option<f64>,
    /// Rows currently in decile 1 or 2.
    pub top_two: usize,
    /// Rows with a positive decile change.
    pub improving: usize,
    pub avg_score: Option<f64>,
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

pub fn group_summary<'a, I>(records: I) -> GroupSummary
where
    I: IntoIterator<Item = &'a StockRecord>,
    I::IntoIter: Clone,
{
    let records = records.into_iter();
    GroupSummary {
        count: records.clone().count(),
        avg_decile: mean(records.clone().filter_map(|r| r.current_decile).map(f64::from)),
        top_two: records
            .clone()
            .filter(|r| r.current_decile.is_some_and(|d| d <= 2))
            .count(),
        improving: records
            .clone()
            .filter(|r| r.decile_change.is_some_and(|d| d > 0))
            .count(),
        avg_score: mean(records.filter_map(|r| r.score)),
    }
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Records grouped by region, groups in order of first appearance.
pub fn group_by_region(table: &StockTable) -> Vec<(RegionTag, Vec<&StockRecord>)> {
    let mut groups: Vec<(RegionTag, Vec<&StockRecord>)> = Vec::new();
    for record in &table.records {
        match groups.iter_mut().find(|(region, _)| *region == record.region) {
            Some((_, rows)) => rows.push(record),
            None => groups.push((record.region, vec![record])),
        }
    }
    groups
}

/// Distinct tickers per region (first-seen order), at most `limit` each,
/// with the full distinct count.
pub fn tickers_by_region(table: &StockTable, limit: usize) -> Vec<(RegionTag, Vec<String>, usize)> {
    group_by_region(table)
        .into_iter()
        .map(|(region, rows)| {
            let mut distinct: Vec<String> = Vec::new();
            for ticker in rows.iter().filter_map(|r| r.ticker.as_ref()) {
                if !distinct.contains(ticker) {
                    distinct.push(ticker.clone());
                }
            }
            let total = distinct.len();
            distinct.truncate(limit);
            (region, distinct, total)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Synced files
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileSummary {
    pub total: usize,
    pub classified: usize,
    pub unclassified: usize,
}

pub fn file_summary(entries: &[SyncedFileEntry]) -> FileSummary {
    let classified = entries.iter().filter(|e| e.region.is_classified()).count();
    FileSummary {
        total: entries.len(),
        classified,
        unclassified: entries.len() - classified,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Local, NaiveDate};

    use super::*;
    use crate::data::model::Column;

    fn rec(region: RegionTag, ticker: &str, sector: &str, decile: i32, change: i32) -> StockRecord {
        let mut r = StockRecord::new(region, NaiveDate::from_ymd_opt(2025, 3, 11).unwrap());
        r.ticker = Some(ticker.into());
        r.sector = Some(sector.into());
        r.current_decile = Some(decile);
        r.decile_change = Some(change);
        r
    }

    fn sample() -> StockTable {
        let mut a = rec(RegionTag::Us, "A", "Energy", 1, 2);
        a.score = Some(80.0);
        let mut b = rec(RegionTag::Us, "B", "Energy", 3, -1);
        b.score = Some(60.0);
        let c = rec(RegionTag::Japan, "C", "Utilities", 2, 0);
        let d = rec(RegionTag::Us, "A", "Energy", 1, 0);
        StockTable::new(vec![a, b, c, d], Column::ALL.into_iter().collect())
    }

    #[test]
    fn test_overview_counts() {
        assert_eq!(
            overview(&sample()),
            Overview {
                total_stocks: 4,
                regions: 2,
                sectors: 2
            }
        );
        assert_eq!(overview(&StockTable::default()), Overview::default());
    }

    #[test]
    fn test_distributions() {
        let table = sample();
        assert_eq!(
            decile_distribution(&table).into_iter().collect::<Vec<_>>(),
            vec![(1, 2), (2, 1), (3, 1)]
        );
        assert_eq!(region_distribution(&table)[&RegionTag::Us], 3);
        assert_eq!(
            sector_region_counts(&table)[&(RegionTag::Us, "Energy".to_string())],
            3
        );
        let avg = average_decile_by_sector(&table);
        assert!((avg[&(RegionTag::Us, "Energy".to_string())] - 5.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_group_summary() {
        let table = sample();
        let summary = group_summary(&table.records);
        assert_eq!(summary.count, 4);
        assert_eq!(summary.top_two, 3);
        assert_eq!(summary.improving, 1);
        assert_eq!(summary.avg_decile, Some(7.0 / 4.0));
        assert_eq!(summary.avg_score, Some(70.0));

        let empty = group_summary(&Vec::<StockRecord>::new());
        assert_eq!(empty.count, 0);
        assert_eq!(empty.avg_decile, None);
    }

    #[test]
    fn test_group_by_region_keeps_first_appearance_order() {
        let table = sample();
        let groups = group_by_region(&table);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, RegionTag::Us);
        assert_eq!(groups[0].1.len(), 3);
        assert_eq!(groups[1].0, RegionTag::Japan);
    }

    #[test]
    fn test_tickers_by_region_dedupes_and_truncates() {
        let tickers = tickers_by_region(&sample(), 1);
        assert_eq!(tickers[0], (RegionTag::Us, vec!["A".to_string()], 2));
        assert_eq!(tickers[1], (RegionTag::Japan, vec!["C".to_string()], 1));
    }

    #[test]
    fn test_file_summary() {
        let entry = |region| SyncedFileEntry {
            id: "x".into(),
            filename: "x.csv".into(),
            date: None,
            region,
            modified_time: None,
            synced_at: Local::now(),
        };
        let entries = vec![
            entry(RegionTag::Us),
            entry(RegionTag::Unclassified),
            entry(RegionTag::China),
        ];
        assert_eq!(
            file_summary(&entries),
            FileSummary {
                total: 3,
                classified: 2,
                unclassified: 1
            }
        );
    }
}
