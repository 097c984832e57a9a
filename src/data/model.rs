use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;

use super::region::RegionTag;

// ---------------------------------------------------------------------------
// CellValue – a single cell in a decoded source table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell as produced by the tabular decoders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => Ok(()),
        }
    }
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Interpret the cell as a real number. Numeric text is accepted.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) if v.is_finite() => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// Interpret the cell as a whole number (decile or decile change).
    ///
    /// Integral floats such as `3.0` are accepted since spreadsheets often
    /// store every number as a float.
    pub fn as_whole(&self) -> Option<i32> {
        match self {
            CellValue::Integer(i) => i32::try_from(*i).ok(),
            _ => {
                let v = self.as_f64()?;
                (v.fract() == 0.0 && v.abs() <= i32::MAX as f64).then_some(v as i32)
            }
        }
    }

    /// Interpret the cell as non-empty text. Numeric tickers (e.g. Tokyo
    /// listing codes) come back as their decimal rendering.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            other => Some(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// RawTable – decoder output, headers as found in the file
// ---------------------------------------------------------------------------

/// A decoded table with its original headers, before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    /// Row-major cells; every row has `columns.len()` entries.
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>) -> Self {
        RawTable {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding with nulls or truncating to the column count.
    pub fn push_row(&mut self, mut row: Vec<CellValue>) {
        row.resize(self.columns.len(), CellValue::Null);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Column – the canonical schema
// ---------------------------------------------------------------------------

/// Canonical column names every downstream view relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    Ticker,
    CompanyName,
    Sector,
    CurrentDecile,
    PreviousDecile,
    DecileChange,
    Score,
    MarketCap,
    Region,
    FileDate,
}

impl Column {
    pub const ALL: [Column; 10] = [
        Column::Ticker,
        Column::CompanyName,
        Column::Sector,
        Column::CurrentDecile,
        Column::PreviousDecile,
        Column::DecileChange,
        Column::Score,
        Column::MarketCap,
        Column::Region,
        Column::FileDate,
    ];

    pub const fn header(self) -> &'static str {
        match self {
            Column::Ticker => "Ticker",
            Column::CompanyName => "Company Name",
            Column::Sector => "Sector",
            Column::CurrentDecile => "Current Decile",
            Column::PreviousDecile => "Previous Decile",
            Column::DecileChange => "Decile Change",
            Column::Score => "Score",
            Column::MarketCap => "Market Cap (Bn)",
            Column::Region => "Region",
            Column::FileDate => "File Date",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

// ---------------------------------------------------------------------------
// FileMetadata / SyncedFileEntry
// ---------------------------------------------------------------------------

/// What the filename alone tells us about a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMetadata {
    pub filename: String,
    pub date: Option<NaiveDate>,
    pub region: RegionTag,
}

/// Bookkeeping for one file seen during a sync.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncedFileEntry {
    pub id: String,
    pub filename: String,
    pub date: Option<NaiveDate>,
    pub region: RegionTag,
    /// Modification time as reported by the source, verbatim.
    pub modified_time: Option<String>,
    pub synced_at: DateTime<Local>,
}

// ---------------------------------------------------------------------------
// StockRecord – one row of the merged dataset
// ---------------------------------------------------------------------------

/// One stock in one snapshot, in canonical shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockRecord {
    pub ticker: Option<String>,
    pub company_name: Option<String>,
    pub sector: Option<String>,
    pub current_decile: Option<i32>,
    pub previous_decile: Option<i32>,
    pub decile_change: Option<i32>,
    pub score: Option<f64>,
    pub market_cap_bn: Option<f64>,
    pub region: RegionTag,
    pub file_date: NaiveDate,
    /// Source columns with no canonical synonym: header → cell.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, CellValue>,
}

impl StockRecord {
    /// An otherwise empty record stamped with region and date.
    pub fn new(region: RegionTag, file_date: NaiveDate) -> Self {
        StockRecord {
            ticker: None,
            company_name: None,
            sector: None,
            current_decile: None,
            previous_decile: None,
            decile_change: None,
            score: None,
            market_cap_bn: None,
            region,
            file_date,
            extra: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// StockTable – enriched records plus the set of columns present
// ---------------------------------------------------------------------------

/// An enriched table, or the merged dataset of many of them.
///
/// `columns` records which canonical columns at least one source supplied
/// (or that were derived), the way a concatenated DataFrame would carry
/// them. Filtering keeps `columns` unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StockTable {
    pub records: Vec<StockRecord>,
    pub columns: BTreeSet<Column>,
}

impl StockTable {
    pub fn new(records: Vec<StockRecord>, columns: BTreeSet<Column>) -> Self {
        StockTable { records, columns }
    }

    /// Concatenate tables; the column set is the union.
    pub fn concat<I>(tables: I) -> Self
    where
        I: IntoIterator<Item = StockTable>,
    {
        let mut merged = StockTable::default();
        for table in tables {
            merged.records.extend(table.records);
            merged.columns.extend(table.columns);
        }
        merged
    }

    /// Same columns, different rows.
    pub fn with_records(&self, records: Vec<StockRecord>) -> Self {
        StockTable {
            records,
            columns: self.columns.clone(),
        }
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct sectors, sorted.
    pub fn sectors(&self) -> BTreeSet<String> {
        self.records
            .iter()
            .filter_map(|r| r.sector.clone())
            .collect()
    }

    /// Distinct regions, sorted in enumeration order.
    pub fn regions(&self) -> BTreeSet<RegionTag> {
        self.records.iter().map(|r| r.region).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_as_whole_accepts_integral_floats_and_text() {
        assert_eq!(CellValue::Integer(4).as_whole(), Some(4));
        assert_eq!(CellValue::Float(3.0).as_whole(), Some(3));
        assert_eq!(CellValue::String(" 7 ".into()).as_whole(), Some(7));
        assert_eq!(CellValue::String("-2".into()).as_whole(), Some(-2));
    }

    #[test]
    fn test_as_whole_rejects_fractions_and_text() {
        assert_eq!(CellValue::Float(2.5).as_whole(), None);
        assert_eq!(CellValue::String("n/a".into()).as_whole(), None);
        assert_eq!(CellValue::Null.as_whole(), None);
        assert_eq!(CellValue::Float(f64::NAN).as_whole(), None);
    }

    #[test]
    fn test_as_text_trims_and_renders_numbers() {
        assert_eq!(CellValue::String("  AAPL ".into()).as_text(), Some("AAPL".into()));
        assert_eq!(CellValue::String("   ".into()).as_text(), None);
        assert_eq!(CellValue::Integer(7203).as_text(), Some("7203".into()));
        assert_eq!(CellValue::Null.as_text(), None);
    }

    #[test]
    fn test_push_row_pads_and_truncates() {
        let mut table = RawTable::new(vec!["a".into(), "b".into()]);
        table.push_row(vec![CellValue::Integer(1)]);
        table.push_row(vec![
            CellValue::Integer(1),
            CellValue::Integer(2),
            CellValue::Integer(3),
        ]);
        assert_eq!(table.rows[0], vec![CellValue::Integer(1), CellValue::Null]);
        assert_eq!(table.rows[1].len(), 2);
    }

    #[test]
    fn test_concat_unions_columns() {
        let mut a = StockRecord::new(RegionTag::Us, day(2025, 3, 11));
        a.sector = Some("Energy".into());
        let b = StockRecord::new(RegionTag::Japan, day(2026, 1, 8));

        let merged = StockTable::concat([
            StockTable::new(vec![a], BTreeSet::from([Column::Sector, Column::Region])),
            StockTable::new(vec![b], BTreeSet::from([Column::Ticker, Column::Region])),
        ]);

        assert_eq!(merged.len(), 2);
        assert!(merged.has_column(Column::Sector));
        assert!(merged.has_column(Column::Ticker));
        assert_eq!(merged.sectors().len(), 1);
        assert_eq!(
            merged.regions().into_iter().collect::<Vec<_>>(),
            vec![RegionTag::Us, RegionTag::Japan]
        );
    }
}
