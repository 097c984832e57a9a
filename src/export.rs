//! Writing a filtered view back out: CSV or Parquet files, or a printable
//! grid for the terminal.

use std::io::Write;
use std::sync::Arc;

use arrow::array::{ArrayRef, Date32Array, Float64Array, Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use chrono::{DateTime, NaiveDate, Utc};
use parquet::arrow::ArrowWriter;

use crate::data::model::{Column, StockRecord};

/// Columns written by [`write_csv`], in order.
pub const EXPORT_COLUMNS: [Column; 10] = [
    Column::Ticker,
    Column::CompanyName,
    Column::Region,
    Column::Sector,
    Column::CurrentDecile,
    Column::PreviousDecile,
    Column::DecileChange,
    Column::Score,
    Column::MarketCap,
    Column::FileDate,
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    #[default]
    Csv,
    Parquet,
}

impl ExportFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Parquet => "parquet",
        }
    }
}

pub fn default_export_name(today: NaiveDate, format: ExportFormat) -> String {
    format!(
        "decile_export_{}.{}",
        today.format("%Y%m%d"),
        format.extension()
    )
}

/// Text for one canonical cell; absent values are empty.
pub fn cell_text(record: &StockRecord, column: Column) -> String {
    fn opt<T: ToString>(v: &Option<T>) -> String {
        v.as_ref().map(T::to_string).unwrap_or_default()
    }
    match column {
        Column::Ticker => opt(&record.ticker),
        Column::CompanyName => opt(&record.company_name),
        Column::Sector => opt(&record.sector),
        Column::CurrentDecile => opt(&record.current_decile),
        Column::PreviousDecile => opt(&record.previous_decile),
        Column::DecileChange => opt(&record.decile_change),
        Column::Score => opt(&record.score),
        Column::MarketCap => opt(&record.market_cap_bn),
        Column::Region => record.region.to_string(),
        Column::FileDate => record.file_date.format("%Y-%m-%d").to_string(),
    }
}

/// Write records as CSV with a header row.
pub fn write_csv<'a, W, I>(writer: W, records: I) -> csv::Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a StockRecord>,
{
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(EXPORT_COLUMNS.iter().map(|c| c.header()))?;
    for record in records {
        out.write_record(EXPORT_COLUMNS.iter().map(|c| cell_text(record, *c)))?;
    }
    out.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Arrow
// ---------------------------------------------------------------------------

fn days_since_epoch(date: NaiveDate) -> i32 {
    date.signed_duration_since(DateTime::<Utc>::UNIX_EPOCH.date_naive())
        .num_days() as i32
}

/// Typed Arrow batch in [`EXPORT_COLUMNS`] order.
pub fn to_record_batch(records: &[&StockRecord]) -> Result<RecordBatch, ArrowError> {
    let text = |f: fn(&StockRecord) -> Option<String>| -> ArrayRef {
        Arc::new(records.iter().map(|r| f(r)).collect::<StringArray>())
    };
    let whole = |f: fn(&StockRecord) -> Option<i32>| -> ArrayRef {
        Arc::new(records.iter().map(|r| f(r)).collect::<Int32Array>())
    };
    let real = |f: fn(&StockRecord) -> Option<f64>| -> ArrayRef {
        Arc::new(records.iter().map(|r| f(r)).collect::<Float64Array>())
    };

    let arrays: Vec<ArrayRef> = EXPORT_COLUMNS
        .iter()
        .map(|column| match column {
            Column::Ticker => text(|r| r.ticker.clone()),
            Column::CompanyName => text(|r| r.company_name.clone()),
            Column::Region => text(|r| Some(r.region.to_string())),
            Column::Sector => text(|r| r.sector.clone()),
            Column::CurrentDecile => whole(|r| r.current_decile),
            Column::PreviousDecile => whole(|r| r.previous_decile),
            Column::DecileChange => whole(|r| r.decile_change),
            Column::Score => real(|r| r.score),
            Column::MarketCap => real(|r| r.market_cap_bn),
            Column::FileDate => Arc::new(Date32Array::from(
                records
                    .iter()
                    .map(|r| days_since_epoch(r.file_date))
                    .collect::<Vec<_>>(),
            )),
        })
        .collect();

    let fields: Vec<Field> = EXPORT_COLUMNS
        .iter()
        .map(|&column| {
            let nullable = !matches!(column, Column::Region | Column::FileDate);
            Field::new(column.header(), arrow_type(column), nullable)
        })
        .collect();

    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
}

/// Write records as a single-batch Parquet file.
pub fn write_parquet<W>(writer: W, records: &[&StockRecord]) -> parquet::errors::Result<()>
where
    W: Write + Send,
{
    let batch = to_record_batch(records)?;
    let mut out = ArrowWriter::try_new(writer, batch.schema(), None)?;
    out.write(&batch)?;
    out.close()?;
    Ok(())
}

/// Records rendered as a bordered text grid.
pub fn pretty_table(records: &[&StockRecord]) -> Result<String, ArrowError> {
    let batch = to_record_batch(records)?;
    Ok(pretty_format_batches(&[batch])?.to_string())
}

/// Arrow type written for a column.
pub fn arrow_type(column: Column) -> DataType {
    match column {
        Column::CurrentDecile | Column::PreviousDecile | Column::DecileChange => DataType::Int32,
        Column::Score | Column::MarketCap => DataType::Float64,
        Column::FileDate => DataType::Date32,
        _ => DataType::Utf8,
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    use super::*;
    use crate::data::region::RegionTag;

    fn samsung() -> StockRecord {
        let mut r = StockRecord::new(RegionTag::ApacExJapan, NaiveDate::from_ymd_opt(2025, 12, 10).unwrap());
        r.ticker = Some("005930".into());
        r.company_name = Some("Samsung Electronics, Co".into());
        r.current_decile = Some(1);
        r.score = Some(88.5);
        r
    }

    #[test]
    fn test_default_export_name() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 8).unwrap();
        assert_eq!(
            default_export_name(today, ExportFormat::Csv),
            "decile_export_20260108.csv"
        );
        assert_eq!(
            default_export_name(today, ExportFormat::Parquet),
            "decile_export_20260108.parquet"
        );
    }

    #[test]
    fn test_record_batch_types_follow_columns() {
        let r = samsung();
        let batch = to_record_batch(&[&r]).unwrap();
        assert_eq!(batch.num_rows(), 1);
        assert_eq!(batch.num_columns(), EXPORT_COLUMNS.len());
        for (field, column) in batch.schema().fields().iter().zip(EXPORT_COLUMNS) {
            assert_eq!(field.name(), column.header());
            assert_eq!(field.data_type(), &arrow_type(column));
        }
    }

    #[test]
    fn test_write_parquet_is_readable() {
        let r = samsung();
        let mut buf = Vec::new();
        write_parquet(&mut buf, &[&r, &r]).unwrap();

        let reader = ParquetRecordBatchReaderBuilder::try_new(Bytes::from(buf))
            .unwrap()
            .build()
            .unwrap();
        let rows: usize = reader.map(|b| b.unwrap().num_rows()).sum();
        assert_eq!(rows, 2);
    }

    #[test]
    fn test_pretty_table_shows_headers_and_values() {
        let r = samsung();
        let grid = pretty_table(&[&r]).unwrap();
        assert!(grid.contains("Ticker"));
        assert!(grid.contains("005930"));
        assert!(grid.contains("2025-12-10"));
    }

    #[test]
    fn test_write_csv_quotes_and_blanks() {
        let r = samsung();

        let mut buf = Vec::new();
        write_csv(&mut buf, [&r]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Ticker,Company Name,Region,Sector,Current Decile,Previous Decile,Decile Change,Score,Market Cap (Bn),File Date")
        );
        assert_eq!(
            lines.next(),
            Some("005930,\"Samsung Electronics, Co\",APAC Ex Japan,,1,,,88.5,,2025-12-10")
        );
        assert_eq!(lines.next(), None);
    }
}
