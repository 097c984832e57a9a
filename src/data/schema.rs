use std::collections::{BTreeMap, BTreeSet};

use super::model::Column;

// ---------------------------------------------------------------------------
// Synonym table
// ---------------------------------------------------------------------------

/// Known header spellings, lowercase, mapped to their canonical column.
const SYNONYMS: &[(&str, Column)] = &[
    ("ticker", Column::Ticker),
    ("symbol", Column::Ticker),
    ("stock", Column::Ticker),
    ("stock code", Column::Ticker),
    ("code", Column::Ticker),
    ("company", Column::CompanyName),
    ("company name", Column::CompanyName),
    ("name", Column::CompanyName),
    ("company_name", Column::CompanyName),
    ("sector", Column::Sector),
    ("industry", Column::Sector),
    ("gics sector", Column::Sector),
    ("current decile", Column::CurrentDecile),
    ("current_decile", Column::CurrentDecile),
    ("decile", Column::CurrentDecile),
    ("curr decile", Column::CurrentDecile),
    ("previous decile", Column::PreviousDecile),
    ("previous_decile", Column::PreviousDecile),
    ("prev decile", Column::PreviousDecile),
    ("prior decile", Column::PreviousDecile),
    ("decile change", Column::DecileChange),
    ("decile_change", Column::DecileChange),
    ("change", Column::DecileChange),
    ("score", Column::Score),
    ("total score", Column::Score),
    ("composite score", Column::Score),
    ("market cap", Column::MarketCap),
    ("market_cap", Column::MarketCap),
    ("marketcap", Column::MarketCap),
    ("mkt cap", Column::MarketCap),
    ("market cap (bn)", Column::MarketCap),
];

/// Canonical column for a raw header, if it is a known synonym.
///
/// Lookup trims surrounding whitespace and ignores case.
pub fn canonical_for(header: &str) -> Option<Column> {
    let key = header.trim().to_lowercase();
    SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == key)
        .map(|&(_, column)| column)
}

// ---------------------------------------------------------------------------
// RenameMap
// ---------------------------------------------------------------------------

/// How one raw header is renamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub raw: String,
    /// The header after normalization (canonical name or `raw` unchanged).
    pub renamed: String,
    /// Canonical column claimed by this header, if any.
    pub column: Option<Column>,
}

/// Rename plan for one source table, one entry per raw header in column
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameMap {
    entries: Vec<Rename>,
}

impl RenameMap {
    pub fn entries(&self) -> &[Rename] {
        &self.entries
    }

    /// Normalized header for a raw header. Headers with no synonym map to
    /// themselves; `None` only for headers not in the table.
    pub fn get(&self, raw: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.raw == raw)
            .map(|e| e.renamed.as_str())
    }

    /// Canonical columns claimed by this table.
    pub fn columns(&self) -> BTreeSet<Column> {
        self.entries.iter().filter_map(|e| e.column).collect()
    }

    pub fn has(&self, column: Column) -> bool {
        self.entries.iter().any(|e| e.column == Some(column))
    }

    /// Headers after renaming, in column order.
    pub fn renamed_headers(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.renamed.clone()).collect()
    }

    /// Plain `raw → renamed` mapping.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|e| (e.raw.clone(), e.renamed.clone()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Build the rename plan for a table's raw headers.
///
/// Headers with no known synonym pass through unchanged. When two headers
/// resolve to the same canonical column the first one (in column order)
/// claims it; later ones keep their raw text and no canonical column.
pub fn normalize<S: AsRef<str>>(raw_columns: &[S]) -> RenameMap {
    let mut claimed = BTreeSet::new();
    let entries = raw_columns
        .iter()
        .map(|raw| {
            let raw = raw.as_ref();
            let column = match canonical_for(raw) {
                Some(column) if !claimed.insert(column) => {
                    log::warn!(
                        "Header {raw:?} also maps to {column:?}; keeping the earlier column"
                    );
                    None
                }
                other => other,
            };
            Rename {
                raw: raw.to_string(),
                renamed: column.map_or_else(|| raw.to_string(), |c| c.header().to_string()),
                column,
            }
        })
        .collect();
    RenameMap { entries }
}
