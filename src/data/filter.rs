use std::fmt;
use std::str::FromStr;

use chrono::{Months, NaiveDate};

use super::model::{Column, StockRecord, StockTable};
use super::region::{ParseRegionError, RegionTag};

pub const ALL_REGIONS: &str = "All Regions";
pub const ALL_SECTORS: &str = "All Sectors";

// ---------------------------------------------------------------------------
// Region
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RegionFilter {
    #[default]
    All,
    Only(RegionTag),
}

impl RegionFilter {
    pub fn matches(&self, record: &StockRecord) -> bool {
        match self {
            RegionFilter::All => true,
            RegionFilter::Only(region) => record.region == *region,
        }
    }
}

impl FromStr for RegionFilter {
    type Err = ParseRegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case(ALL_REGIONS) {
            return Ok(RegionFilter::All);
        }
        s.parse().map(RegionFilter::Only)
    }
}

impl fmt::Display for RegionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionFilter::All => f.write_str(ALL_REGIONS),
            RegionFilter::Only(region) => write!(f, "{region}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SectorFilter {
    #[default]
    All,
    Only(String),
}

impl SectorFilter {
    pub fn matches(&self, record: &StockRecord) -> bool {
        match self {
            SectorFilter::All => true,
            SectorFilter::Only(sector) => record.sector.as_deref() == Some(sector.as_str()),
        }
    }
}

impl From<&str> for SectorFilter {
    fn from(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case(ALL_SECTORS) {
            SectorFilter::All
        } else {
            SectorFilter::Only(s.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Date range
// ---------------------------------------------------------------------------

/// Inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Look-back windows offered to the user, ending today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    ThreeMonths,
    SixMonths,
    NineMonths,
    TwelveMonths,
    Custom(DateRange),
}

impl Period {
    pub fn date_range(&self, today: NaiveDate) -> DateRange {
        let months = match self {
            Period::ThreeMonths => 3,
            Period::SixMonths => 6,
            Period::NineMonths => 9,
            Period::TwelveMonths => 12,
            Period::Custom(range) => return *range,
        };
        let start = today
            .checked_sub_months(Months::new(months))
            .unwrap_or(NaiveDate::MIN);
        DateRange::new(start, today)
    }
}

// ---------------------------------------------------------------------------
// Decile movement
// ---------------------------------------------------------------------------

/// Named decile-movement criteria.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecileCriteria {
    #[default]
    AllMovements,
    EnteringTopTwo,
    EnteringBottomTwo,
    MovingThree,
    MovingFive,
}

impl DecileCriteria {
    pub const ALL: [DecileCriteria; 5] = [
        DecileCriteria::AllMovements,
        DecileCriteria::EnteringTopTwo,
        DecileCriteria::EnteringBottomTwo,
        DecileCriteria::MovingThree,
        DecileCriteria::MovingFive,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            DecileCriteria::AllMovements => "All Decile Movements",
            DecileCriteria::EnteringTopTwo => "Entering Top 2 Deciles",
            DecileCriteria::EnteringBottomTwo => "Entering Bottom 2 Deciles",
            DecileCriteria::MovingThree => "Moving +3 Deciles",
            DecileCriteria::MovingFive => "Moving +5 Deciles",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            DecileCriteria::AllMovements => "Every stock regardless of movement",
            DecileCriteria::EnteringTopTwo => "Stocks moving into decile 1 or 2 from decile 3+",
            DecileCriteria::EnteringBottomTwo => "Stocks moving into decile 9 or 10 from decile 8-",
            DecileCriteria::MovingThree => "Decile change of +3 or more",
            DecileCriteria::MovingFive => "Decile change of +5 or more",
        }
    }

    /// Columns the criterion reads.
    fn columns(self) -> &'static [Column] {
        match self {
            DecileCriteria::AllMovements => &[],
            DecileCriteria::EnteringTopTwo | DecileCriteria::EnteringBottomTwo => {
                &[Column::CurrentDecile, Column::PreviousDecile]
            }
            DecileCriteria::MovingThree | DecileCriteria::MovingFive => &[Column::DecileChange],
        }
    }

    /// Row test. A row missing a value the criterion needs does not match.
    pub fn matches(self, record: &StockRecord) -> bool {
        let (current, previous, change) = (
            record.current_decile,
            record.previous_decile,
            record.decile_change,
        );
        match self {
            DecileCriteria::AllMovements => true,
            DecileCriteria::EnteringTopTwo => {
                matches!((current, previous), (Some(c), Some(p)) if c <= 2 && p > 2)
            }
            DecileCriteria::EnteringBottomTwo => {
                matches!((current, previous), (Some(c), Some(p)) if c >= 9 && p < 9)
            }
            DecileCriteria::MovingThree => change.is_some_and(|d| d >= 3),
            DecileCriteria::MovingFive => change.is_some_and(|d| d >= 5),
        }
    }

    /// Whether the criterion constrains rows of `table` at all. A table
    /// missing one of the criterion's columns is passed through.
    fn applies_to(self, table: &StockTable) -> bool {
        let needed = self.columns();
        !needed.is_empty() && needed.iter().all(|c| table.has_column(*c))
    }
}

impl fmt::Display for DecileCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown decile criteria: {0:?}")]
pub struct ParseCriteriaError(pub String);

impl FromStr for DecileCriteria {
    type Err = ParseCriteriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DecileCriteria::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseCriteriaError(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Free-text search
// ---------------------------------------------------------------------------

/// Case-insensitive substring test against ticker or company name.
/// A record with neither field never matches.
pub fn matches_search(record: &StockRecord, needle_lower: &str) -> bool {
    [&record.ticker, &record.company_name]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(needle_lower))
}

// ---------------------------------------------------------------------------
// Individual filters over a table
// ---------------------------------------------------------------------------

fn retain<F>(table: &StockTable, keep: F) -> StockTable
where
    F: Fn(&StockRecord) -> bool,
{
    table.with_records(table.records.iter().filter(|r| keep(r)).cloned().collect())
}

pub fn filter_by_region(table: &StockTable, region: &RegionFilter) -> StockTable {
    if *region == RegionFilter::All || !table.has_column(Column::Region) {
        return table.clone();
    }
    retain(table, |r| region.matches(r))
}

pub fn filter_by_sector(table: &StockTable, sector: &SectorFilter) -> StockTable {
    if *sector == SectorFilter::All || !table.has_column(Column::Sector) {
        return table.clone();
    }
    retain(table, |r| sector.matches(r))
}

pub fn filter_by_date_range(table: &StockTable, range: &DateRange) -> StockTable {
    if !table.has_column(Column::FileDate) {
        return table.clone();
    }
    retain(table, |r| range.contains(r.file_date))
}

pub fn filter_by_decile_criteria(table: &StockTable, criteria: DecileCriteria) -> StockTable {
    if !criteria.applies_to(table) {
        return table.clone();
    }
    retain(table, |r| criteria.matches(r))
}

pub fn filter_by_search(table: &StockTable, term: &str) -> StockTable {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return table.clone();
    }
    retain(table, |r| matches_search(r, &needle))
}

// ---------------------------------------------------------------------------
// Combined view filter
// ---------------------------------------------------------------------------

/// Every filter a view can set. The default passes everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewFilter {
    pub region: RegionFilter,
    pub sector: SectorFilter,
    pub date_range: Option<DateRange>,
    pub criteria: DecileCriteria,
    pub search: String,
}

/// Indices of records passing every active filter.
///
/// Each filter is a per-row test (column presence is a property of the
/// table, not the row), so the order they are combined in does not matter.
pub fn filtered_indices(table: &StockTable, filter: &ViewFilter) -> Vec<usize> {
    let by_region = filter.region != RegionFilter::All && table.has_column(Column::Region);
    let by_sector = filter.sector != SectorFilter::All && table.has_column(Column::Sector);
    let by_date = filter
        .date_range
        .filter(|_| table.has_column(Column::FileDate));
    let by_criteria = filter.criteria.applies_to(table);
    let needle = filter.search.trim().to_lowercase();

    table
        .records
        .iter()
        .enumerate()
        .filter(|(_, r)| {
            (!by_region || filter.region.matches(r))
                && (!by_sector || filter.sector.matches(r))
                && by_date.map_or(true, |range| range.contains(r.file_date))
                && (!by_criteria || filter.criteria.matches(*r))
                && (needle.is_empty() || matches_search(r, &needle))
        })
        .map(|(i, _)| i)
        .collect()
}

/// Apply a [`ViewFilter`], keeping the table's column set.
pub fn apply_filters(table: &StockTable, filter: &ViewFilter) -> StockTable {
    let records = filtered_indices(table, filter)
        .into_iter()
        .map(|i| table.records[i].clone())
        .collect();
    table.with_records(records)
}
