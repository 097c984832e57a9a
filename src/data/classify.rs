//! Filename classifier: region tag and observation date from a display name.
//!
//! Both extractions are ordered rule lists evaluated first-match-wins.
//! Neither can fail; the fallbacks are `None` and `RegionTag::Unclassified`.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use super::model::FileMetadata;
use super::region::RegionTag;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Classify a snapshot by its display name.
pub fn classify(filename: &str) -> FileMetadata {
    FileMetadata {
        filename: filename.to_string(),
        date: extract_date(filename),
        region: extract_region(filename),
    }
}

// ---------------------------------------------------------------------------
// Date extraction
// ---------------------------------------------------------------------------

static MONTH_DAY_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z]+)\s+(\d{1,2})\s+(\d{4})").expect("month-day-year pattern")
});

static DASHED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").expect("dashed date pattern"));

static COMPACT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})(\d{2})(\d{2})").expect("compact date pattern"));

const MONTHS: &[(&str, u32)] = &[
    ("jan", 1),
    ("january", 1),
    ("feb", 2),
    ("february", 2),
    ("mar", 3),
    ("march", 3),
    ("apr", 4),
    ("april", 4),
    ("may", 5),
    ("jun", 6),
    ("june", 6),
    ("jul", 7),
    ("july", 7),
    ("aug", 8),
    ("august", 8),
    ("sep", 9),
    ("sept", 9),
    ("september", 9),
    ("oct", 10),
    ("october", 10),
    ("nov", 11),
    ("november", 11),
    ("dec", 12),
    ("december", 12),
];

type DateRule = fn(&str) -> Option<NaiveDate>;

/// Tried in order; the first rule producing a valid calendar date wins.
const DATE_RULES: &[(&str, DateRule)] = &[
    ("month-day-year", month_day_year),
    ("yyyy-mm-dd", dashed),
    ("yyyymmdd", compact),
];

/// Extract the observation date from a filename, if any rule yields a
/// valid calendar date.
pub fn extract_date(filename: &str) -> Option<NaiveDate> {
    DATE_RULES.iter().find_map(|(name, rule)| {
        let date = rule(filename)?;
        log::trace!("{filename:?}: date {date} via {name} rule");
        Some(date)
    })
}

fn month_number(name: &str) -> Option<u32> {
    MONTHS
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
        .map(|&(_, month)| month)
}

fn month_day_year(filename: &str) -> Option<NaiveDate> {
    MONTH_DAY_YEAR_RE.captures_iter(filename).find_map(|caps| {
        let month = month_number(&caps[1])?;
        let day: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    })
}

fn numeric_ymd(re: &Regex, filename: &str) -> Option<NaiveDate> {
    re.captures_iter(filename).find_map(|caps| {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    })
}

fn dashed(filename: &str) -> Option<NaiveDate> {
    numeric_ymd(&DASHED_RE, filename)
}

fn compact(filename: &str) -> Option<NaiveDate> {
    numeric_ymd(&COMPACT_RE, filename)
}

// ---------------------------------------------------------------------------
// Region extraction
// ---------------------------------------------------------------------------

/// A region and the phrases that identify it.
struct RegionRule {
    region: RegionTag,
    phrases: &'static [&'static str],
}

/// Compound phrases checked before the keyword table, as plain substrings.
/// "global ex us" would otherwise be claimed by the US or Global keywords.
const PRIORITY_RULES: &[RegionRule] = &[
    RegionRule {
        region: RegionTag::GlobalExUs,
        phrases: &["global ex us", "global ex-us"],
    },
    RegionRule {
        region: RegionTag::ApacExJapan,
        phrases: &["apac ex jpy", "apac ex japan"],
    },
    RegionRule {
        region: RegionTag::Us,
        phrases: &["s&p500", "s&p 500", "sp500"],
    },
];

/// General keyword table, consulted in enumeration order with word-boundary
/// matching.
const KEYWORD_RULES: &[RegionRule] = &[
    RegionRule {
        region: RegionTag::Us,
        phrases: &[
            "s&p500", "s&p 500", "sp500", "us", "usa", "nasdaq", "russell", "dow", "american",
        ],
    },
    RegionRule {
        region: RegionTag::Europe,
        phrases: &[
            "europe",
            "european",
            "eu",
            "stoxx",
            "euro stoxx",
            "ftse developed europe",
            "msci europe",
        ],
    },
    RegionRule {
        region: RegionTag::Uk,
        phrases: &[
            "uk",
            "united kingdom",
            "ftse",
            "ftse100",
            "ftse 100",
            "ftse250",
            "british",
            "london",
        ],
    },
    RegionRule {
        region: RegionTag::ApacExJapan,
        phrases: &[
            "apac ex jpy",
            "apac ex japan",
            "apac",
            "asia pacific",
            "asia",
            "asian",
            "pacific",
            "emerging asia",
            "asean",
        ],
    },
    RegionRule {
        region: RegionTag::Japan,
        phrases: &["japan", "japanese", "nikkei", "topix", "tokyo"],
    },
    RegionRule {
        region: RegionTag::China,
        phrases: &[
            "china", "chinese", "shanghai", "shenzhen", "hang seng", "hsi", "csi", "a-shares",
            "h-shares",
        ],
    },
    RegionRule {
        region: RegionTag::Global,
        phrases: &[
            "global",
            "world",
            "msci world",
            "acwi",
            "all country",
            "worldwide",
        ],
    },
    RegionRule {
        region: RegionTag::GlobalExUs,
        phrases: &[
            "global ex us",
            "global ex-us",
            "world ex us",
            "international",
            "eafe",
            "ex-us",
            "non-us",
        ],
    },
];

/// One alternation per keyword rule: `\b(?:kw1|kw2|...)\b`.
static KEYWORD_PATTERNS: LazyLock<Vec<(RegionTag, Regex)>> = LazyLock::new(|| {
    KEYWORD_RULES
        .iter()
        .map(|rule| {
            let alternation = rule
                .phrases
                .iter()
                .map(|p| regex::escape(p))
                .collect::<Vec<_>>()
                .join("|");
            let re = Regex::new(&format!(r"\b(?:{alternation})\b")).expect("keyword pattern");
            (rule.region, re)
        })
        .collect()
});

/// Lowercase, treat underscores as spaces and collapse whitespace runs so
/// `"GLOBAL_Ex  US"` reads like `"global ex us"`.
fn fold_name(filename: &str) -> String {
    filename
        .to_lowercase()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Region of a filename. Total: always returns exactly one tag.
pub fn extract_region(filename: &str) -> RegionTag {
    let folded = fold_name(filename);

    let priority = PRIORITY_RULES
        .iter()
        .find(|rule| rule.phrases.iter().any(|p| folded.contains(p)))
        .map(|rule| rule.region);

    priority
        .or_else(|| {
            KEYWORD_PATTERNS
                .iter()
                .find(|(_, re)| re.is_match(&folded))
                .map(|(region, _)| *region)
        })
        .unwrap_or(RegionTag::Unclassified)
}
