//! Writes a folder of synthetic decile snapshots, one file per region and
//! date, using the naming conventions and header spellings seen in real
//! exports.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Local, Months, NaiveDate};
use clap::Parser;
use parquet::arrow::ArrowWriter;
use serde_json::{Map, Value};

#[derive(Parser)]
#[command(name = "generate_sample")]
#[command(about = "Write synthetic decile snapshot files")]
struct Args {
    /// Output directory (created if missing)
    #[arg(long, default_value = "sample_snapshots")]
    out: PathBuf,

    /// Stocks per region
    #[arg(long, default_value_t = 30)]
    stocks: usize,

    /// Number of monthly snapshots per region, ending today
    #[arg(long, default_value_t = 4)]
    snapshots: u32,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform integer in `lo..=hi`.
    fn range(&mut self, lo: i64, hi: i64) -> i64 {
        lo + (self.next_u64() % (hi - lo + 1) as u64) as i64
    }
}

// ---------------------------------------------------------------------------
// Layouts
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Format {
    Csv,
    Parquet,
    Json,
}

impl Format {
    fn extension(self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Parquet => "parquet",
            Format::Json => "json",
        }
    }
}

/// Header spellings, in column order.
struct Headers {
    /// Ticker, company, sector, current decile, previous decile.
    leading: [&'static str; 5],
    /// Omitted when None; readers derive it.
    change: Option<&'static str>,
    /// Score, market cap.
    trailing: [&'static str; 2],
}

const LONG_HEADERS: Headers = Headers {
    leading: ["Ticker", "Company Name", "Sector", "Current Decile", "Previous Decile"],
    change: Some("Decile Change"),
    trailing: ["Score", "Market Cap"],
};

const SHORT_HEADERS: Headers = Headers {
    leading: ["Symbol", "Name", "GICS Sector", "Decile", "Prior Decile"],
    change: None,
    trailing: ["Total Score", "Mkt Cap"],
};

struct RegionLayout {
    prefix: &'static str,
    format: Format,
    headers: &'static Headers,
    file_name: fn(NaiveDate) -> String,
}

const LAYOUTS: &[RegionLayout] = &[
    RegionLayout {
        prefix: "US",
        format: Format::Csv,
        headers: &LONG_HEADERS,
        file_name: |d| format!("S&P500 {}", d.format("%B %-d %Y")),
    },
    RegionLayout {
        prefix: "EU",
        format: Format::Csv,
        headers: &SHORT_HEADERS,
        file_name: |d| format!("Europe_{}", d.format("%Y-%m-%d")),
    },
    RegionLayout {
        prefix: "UK",
        format: Format::Parquet,
        headers: &LONG_HEADERS,
        file_name: |d| format!("FTSE 100 {}", d.format("%Y%m%d")),
    },
    RegionLayout {
        prefix: "AP",
        format: Format::Csv,
        headers: &LONG_HEADERS,
        file_name: |d| format!("APAC ex JPY {}", d.format("%b %d %Y")),
    },
    RegionLayout {
        prefix: "JP",
        format: Format::Parquet,
        headers: &SHORT_HEADERS,
        file_name: |d| format!("Japan {}", d.format("%b %d %Y")),
    },
    RegionLayout {
        prefix: "CN",
        format: Format::Csv,
        headers: &SHORT_HEADERS,
        file_name: |d| format!("China A-Shares {}", d.format("%Y-%m-%d")),
    },
    RegionLayout {
        prefix: "GL",
        format: Format::Json,
        headers: &LONG_HEADERS,
        file_name: |d| format!("MSCI World {}", d.format("%Y%m%d")),
    },
    RegionLayout {
        prefix: "GX",
        format: Format::Csv,
        headers: &LONG_HEADERS,
        file_name: |d| format!("GLOBAL_Ex_US_{}", d.format("%Y-%m-%d")),
    },
];

const SECTORS: &[&str] = &[
    "Communication Services",
    "Consumer Discretionary",
    "Consumer Staples",
    "Energy",
    "Financials",
    "Health Care",
    "Industrials",
    "Information Technology",
    "Materials",
    "Real Estate",
    "Utilities",
];

const NAME_PARTS: &[&str] = &[
    "Apex", "Borealis", "Cobalt", "Delta", "Ember", "Fulcrum", "Granite", "Harbor", "Ion",
    "Juniper", "Kestrel", "Lumen", "Meridian", "Nimbus", "Orion", "Pioneer",
];

const NAME_SUFFIXES: &[&str] = &["Holdings", "Group", "Industries", "Corp", "Partners"];

// ---------------------------------------------------------------------------
// Snapshot rows
// ---------------------------------------------------------------------------

struct Stock {
    ticker: String,
    company: String,
    sector: &'static str,
    decile: i64,
    market_cap: f64,
}

struct Row {
    ticker: String,
    company: String,
    sector: &'static str,
    current: i64,
    previous: i64,
    score: f64,
    market_cap: f64,
}

fn universe(prefix: &str, count: usize, rng: &mut SimpleRng) -> Vec<Stock> {
    (0..count)
        .map(|i| Stock {
            ticker: format!("{prefix}{:03}", i + 1),
            company: format!(
                "{} {}",
                NAME_PARTS[rng.range(0, NAME_PARTS.len() as i64 - 1) as usize],
                NAME_SUFFIXES[rng.range(0, NAME_SUFFIXES.len() as i64 - 1) as usize]
            ),
            sector: SECTORS[rng.range(0, SECTORS.len() as i64 - 1) as usize],
            decile: rng.range(1, 10),
            market_cap: (rng.next_f64() * 300.0 * 100.0).round() / 100.0 + 0.5,
        })
        .collect()
}

/// Move every stock one step and return the rows of the new snapshot.
fn step(stocks: &mut [Stock], rng: &mut SimpleRng) -> Vec<Row> {
    stocks
        .iter_mut()
        .map(|stock| {
            let previous = stock.decile;
            // Mostly small moves, occasionally a big jump.
            let delta = if rng.next_f64() < 0.1 {
                rng.range(-6, 6)
            } else {
                rng.range(-2, 2)
            };
            stock.decile = (previous + delta).clamp(1, 10);
            let drift = 0.9 + rng.next_f64() * 0.2;
            stock.market_cap = (stock.market_cap * drift * 100.0).round() / 100.0;
            let score = ((11 - stock.decile) as f64 * 9.0 + rng.next_f64() * 9.0) * 10.0;
            Row {
                ticker: stock.ticker.clone(),
                company: stock.company.clone(),
                sector: stock.sector,
                current: stock.decile,
                previous,
                score: score.round() / 10.0,
                market_cap: stock.market_cap,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

fn header_row(headers: &Headers) -> Vec<&'static str> {
    let mut names = headers.leading.to_vec();
    names.extend(headers.change);
    names.extend(headers.trailing);
    names
}

fn change(row: &Row) -> i64 {
    row.current - row.previous
}

fn write_csv(path: &Path, headers: &Headers, rows: &[Row]) -> Result<()> {
    let mut out = csv::Writer::from_path(path)?;
    out.write_record(header_row(headers))?;
    for row in rows {
        let mut record = vec![
            row.ticker.clone(),
            row.company.clone(),
            row.sector.to_string(),
            row.current.to_string(),
            row.previous.to_string(),
        ];
        if headers.change.is_some() {
            record.push(change(row).to_string());
        }
        record.push(row.score.to_string());
        record.push(row.market_cap.to_string());
        out.write_record(&record)?;
    }
    out.flush()?;
    Ok(())
}

fn write_json(path: &Path, headers: &Headers, rows: &[Row]) -> Result<()> {
    let names = header_row(headers);
    let objects: Vec<Value> = rows
        .iter()
        .map(|row| {
            let mut values = vec![
                Value::from(row.ticker.as_str()),
                Value::from(row.company.as_str()),
                Value::from(row.sector),
                Value::from(row.current),
                Value::from(row.previous),
            ];
            if headers.change.is_some() {
                values.push(Value::from(change(row)));
            }
            values.push(Value::from(row.score));
            values.push(Value::from(row.market_cap));
            let object: Map<String, Value> = names
                .iter()
                .map(|n| n.to_string())
                .zip(values)
                .collect();
            Value::Object(object)
        })
        .collect();
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &objects)?;
    Ok(())
}

fn write_parquet(path: &Path, headers: &Headers, rows: &[Row]) -> Result<()> {
    let text = |f: fn(&Row) -> &str| -> ArrayRef {
        Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
    };
    let whole = |f: fn(&Row) -> i64| -> ArrayRef {
        Arc::new(Int64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
    };
    let real = |f: fn(&Row) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
    };

    let mut arrays = vec![
        text(|r| r.ticker.as_str()),
        text(|r| r.company.as_str()),
        text(|r| r.sector),
        whole(|r| r.current),
        whole(|r| r.previous),
    ];
    if headers.change.is_some() {
        arrays.push(whole(change));
    }
    arrays.push(real(|r| r.score));
    arrays.push(real(|r| r.market_cap));

    let fields: Vec<Field> = header_row(headers)
        .into_iter()
        .zip(&arrays)
        .map(|(name, array)| Field::new(name, array.data_type().clone(), false))
        .collect();
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), arrays)?;

    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn snapshot_dates(today: NaiveDate, count: u32) -> Vec<NaiveDate> {
    (0..count)
        .rev()
        .filter_map(|k| today.checked_sub_months(Months::new(k)))
        .collect()
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);

    fs::create_dir_all(&args.out)
        .with_context(|| format!("Failed to create {}", args.out.display()))?;

    let dates = snapshot_dates(Local::now().date_naive(), args.snapshots);
    let mut written = 0usize;
    for layout in LAYOUTS {
        let mut stocks = universe(layout.prefix, args.stocks, &mut rng);
        for &date in &dates {
            let rows = step(&mut stocks, &mut rng);
            let name = format!("{}.{}", (layout.file_name)(date), layout.format.extension());
            let path = args.out.join(&name);
            let result = match layout.format {
                Format::Csv => write_csv(&path, layout.headers, &rows),
                Format::Parquet => write_parquet(&path, layout.headers, &rows),
                Format::Json => write_json(&path, layout.headers, &rows),
            };
            result.with_context(|| format!("Failed to write {}", path.display()))?;
            log::debug!("Wrote {name} ({} rows)", rows.len());
            written += 1;
        }
    }

    println!(
        "Wrote {written} snapshots ({} stocks each) to {}",
        args.stocks,
        args.out.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use decile_tracker::data::classify::classify;
    use decile_tracker::data::region::RegionTag;

    #[test]
    fn test_file_names_classify_to_distinct_regions() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 11).unwrap();
        let regions: Vec<RegionTag> = LAYOUTS
            .iter()
            .map(|l| {
                let meta = classify(&format!("{}.{}", (l.file_name)(date), l.format.extension()));
                assert_eq!(meta.date, Some(date), "{}", (l.file_name)(date));
                meta.region
            })
            .collect();
        assert_eq!(regions, RegionTag::ALL[..8].to_vec());
    }

    #[test]
    fn test_step_keeps_deciles_in_range() {
        let mut rng = SimpleRng::new(7);
        let mut stocks = universe("T", 50, &mut rng);
        for _ in 0..20 {
            for row in step(&mut stocks, &mut rng) {
                assert!((1..=10).contains(&row.current));
                assert!((1..=10).contains(&row.previous));
            }
        }
    }
}
