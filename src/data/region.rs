use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RegionTag – coarse geography assigned to a whole snapshot file
// ---------------------------------------------------------------------------

/// Region / market-index bucket of a snapshot file.
///
/// Every file maps to exactly one tag; `Unclassified` is the fallback when
/// no filename rule matches.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum RegionTag {
    #[serde(rename = "US")]
    Us,
    #[serde(rename = "Europe")]
    Europe,
    #[serde(rename = "UK")]
    Uk,
    #[serde(rename = "APAC Ex Japan")]
    ApacExJapan,
    #[serde(rename = "Japan")]
    Japan,
    #[serde(rename = "China")]
    China,
    #[serde(rename = "Global")]
    Global,
    #[serde(rename = "Global Ex US")]
    GlobalExUs,
    #[default]
    #[serde(rename = "Unclassified")]
    Unclassified,
}

impl RegionTag {
    /// All tags in enumeration order. This is also the order the keyword
    /// table is consulted in.
    pub const ALL: [RegionTag; 9] = [
        RegionTag::Us,
        RegionTag::Europe,
        RegionTag::Uk,
        RegionTag::ApacExJapan,
        RegionTag::Japan,
        RegionTag::China,
        RegionTag::Global,
        RegionTag::GlobalExUs,
        RegionTag::Unclassified,
    ];

    /// Display label, identical to the serialized form.
    pub const fn label(self) -> &'static str {
        match self {
            RegionTag::Us => "US",
            RegionTag::Europe => "Europe",
            RegionTag::Uk => "UK",
            RegionTag::ApacExJapan => "APAC Ex Japan",
            RegionTag::Japan => "Japan",
            RegionTag::China => "China",
            RegionTag::Global => "Global",
            RegionTag::GlobalExUs => "Global Ex US",
            RegionTag::Unclassified => "Unclassified",
        }
    }

    pub fn is_classified(self) -> bool {
        self != RegionTag::Unclassified
    }
}

impl fmt::Display for RegionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown region: {0:?}")]
pub struct ParseRegionError(pub String);

impl FromStr for RegionTag {
    type Err = ParseRegionError;

    /// Parses a label case-insensitively (`"apac ex japan"` → `ApacExJapan`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        RegionTag::ALL
            .into_iter()
            .find(|tag| tag.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseRegionError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip_through_from_str() {
        for tag in RegionTag::ALL {
            assert_eq!(tag.label().parse::<RegionTag>(), Ok(tag));
        }
    }

    #[test]
    fn test_from_str_ignores_case_and_padding() {
        assert_eq!(" global ex us ".parse::<RegionTag>(), Ok(RegionTag::GlobalExUs));
        assert_eq!("uk".parse::<RegionTag>(), Ok(RegionTag::Uk));
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        assert!("Antarctica".parse::<RegionTag>().is_err());
    }

    #[test]
    fn test_serializes_as_label() {
        let json = serde_json::to_string(&RegionTag::ApacExJapan).unwrap();
        assert_eq!(json, "\"APAC Ex Japan\"");
    }

    #[test]
    fn test_default_is_unclassified() {
        assert_eq!(RegionTag::default(), RegionTag::Unclassified);
        assert!(!RegionTag::default().is_classified());
    }
}
