use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use arrow::util::display::array_value_to_string;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, RawTable};
use crate::error::{DecodeError, DecodeResult};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Decode a snapshot into a table, or `None` if it cannot be read.
///
/// The failure is logged; use [`decode_table`] to get the reason.
pub fn decode(bytes: &[u8], filename: &str) -> Option<RawTable> {
    match decode_table(bytes, filename) {
        Ok(table) => Some(table),
        Err(e) => {
            log::warn!("Could not read file {filename}: {e}");
            None
        }
    }
}

/// Decode a snapshot into a table.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.tsv` – header row plus data rows
/// * `.json`         – `[{ "Ticker": "F", "Decile": 2, ... }, ...]`
/// * `.parquet`      – one column per field, any scalar type
///
/// Excel workbooks are recognised but reported as unsupported.
pub fn decode_table(bytes: &[u8], filename: &str) -> DecodeResult<RawTable> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" | "txt" => decode_delimited(bytes, b','),
        "tsv" => decode_delimited(bytes, b'\t'),
        "json" => decode_json(bytes),
        "parquet" | "pq" => decode_parquet(bytes),
        other => Err(DecodeError::UnsupportedFormat(format!(".{other}"))),
    }
}

// ---------------------------------------------------------------------------
// CSV / TSV
// ---------------------------------------------------------------------------

/// Ragged rows are padded with nulls rather than rejected; spreadsheet
/// exports often drop trailing empty cells.
fn decode_delimited(bytes: &[u8], delimiter: u8) -> DecodeResult<RawTable> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(DecodeError::Layout("missing header row".into()));
    }

    let mut table = RawTable::new(headers);
    for result in reader.records() {
        let record = result?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        table.push_row(record.iter().map(guess_cell_type).collect());
    }
    Ok(table)
}

/// Numbers, booleans, or text. Digit strings with a leading zero stay text
/// so codes like `005930` survive.
pub(crate) fn guess_cell_type(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() {
        return CellValue::Null;
    }
    let zero_padded = s.len() > 1 && s.starts_with('0') && s.as_bytes()[1].is_ascii_digit();
    if zero_padded {
        return CellValue::String(s.to_string());
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    CellValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`df.to_json(orient='records')`). Columns are the
/// union of keys in first-seen order.
fn decode_json(bytes: &[u8]) -> DecodeResult<RawTable> {
    let root: JsonValue = serde_json::from_slice(bytes)?;
    let records = root
        .as_array()
        .ok_or_else(|| DecodeError::Layout("expected top-level JSON array".into()))?;

    let mut columns: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| DecodeError::Layout(format!("row {i} is not a JSON object")))?;
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let mut table = RawTable::new(columns);
    for rec in records.iter().filter_map(JsonValue::as_object) {
        let row = table
            .columns
            .iter()
            .map(|col| rec.get(col).map_or(CellValue::Null, json_to_cell))
            .collect();
        table.push_row(row);
    }
    Ok(table)
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn decode_parquet(bytes: &[u8]) -> DecodeResult<RawTable> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(Bytes::copy_from_slice(bytes))?;
    let columns = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build()?;

    let mut table = RawTable::new(columns);
    for batch in reader {
        let batch = batch?;
        for row in 0..batch.num_rows() {
            table.push_row(batch.columns().iter().map(|col| cell_at(col, row)).collect());
        }
    }
    Ok(table)
}

/// Extract a single cell from an Arrow column at a given row.
fn cell_at(col: &ArrayRef, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    let typed = match col.data_type() {
        DataType::Utf8 => col
            .as_string_opt::<i32>()
            .map(|a| CellValue::String(a.value(row).to_string())),
        DataType::LargeUtf8 => col
            .as_string_opt::<i64>()
            .map(|a| CellValue::String(a.value(row).to_string())),
        DataType::Int32 => col
            .as_primitive_opt::<Int32Type>()
            .map(|a| CellValue::Integer(a.value(row).into())),
        DataType::Int64 => col
            .as_primitive_opt::<Int64Type>()
            .map(|a| CellValue::Integer(a.value(row))),
        DataType::Float32 => col
            .as_primitive_opt::<Float32Type>()
            .map(|a| CellValue::Float(a.value(row).into())),
        DataType::Float64 => col
            .as_primitive_opt::<Float64Type>()
            .map(|a| CellValue::Float(a.value(row))),
        DataType::Boolean => col.as_boolean_opt().map(|a| CellValue::Bool(a.value(row))),
        _ => None,
    };
    // Anything else (dates, small ints, decimals) goes through its display
    // form so the usual numeric guessing applies.
    typed.unwrap_or_else(|| {
        array_value_to_string(col.as_ref(), row)
            .map(|s| guess_cell_type(&s))
            .unwrap_or(CellValue::Null)
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::String(s.to_string())
    }

    #[test]
    fn test_csv_with_bom_and_ragged_rows() {
        let bytes = b"\xEF\xBB\xBFSymbol,Name,Decile\nF,Ford Motor Co,2\nGM,General Motors\n,,\n";
        let table = decode_table(bytes, "US Mar 11 2025.csv").unwrap();
        assert_eq!(table.columns, vec!["Symbol", "Name", "Decile"]);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.rows[0],
            vec![text("F"), text("Ford Motor Co"), CellValue::Integer(2)]
        );
        assert_eq!(table.rows[1][2], CellValue::Null);
    }

    #[test]
    fn test_tsv_uses_tabs() {
        let table = decode_table(b"Ticker\tScore\nA\t1.5\n", "x.tsv").unwrap();
        assert_eq!(table.rows[0], vec![text("A"), CellValue::Float(1.5)]);
    }

    #[test]
    fn test_json_records_union_columns() {
        let bytes = br#"[{"Ticker": "A", "Decile": 3}, {"Ticker": "B", "Sector": "Energy"}]"#;
        let table = decode_table(bytes, "snap.json").unwrap();
        assert_eq!(table.columns.len(), 3);
        let sector = table.columns.iter().position(|c| c == "Sector").unwrap();
        assert_eq!(table.rows[0][sector], CellValue::Null);
        assert_eq!(table.rows[1][sector], text("Energy"));
    }

    #[test]
    fn test_json_rejects_non_array() {
        assert!(matches!(
            decode_table(br#"{"Ticker": "A"}"#, "x.json"),
            Err(DecodeError::Layout(_))
        ));
    }

    #[test]
    fn test_excel_is_unsupported() {
        assert!(matches!(
            decode_table(b"PK\x03\x04", "Japan Jan 08 2026.xlsx"),
            Err(DecodeError::UnsupportedFormat(_))
        ));
        assert!(decode(b"PK\x03\x04", "Japan Jan 08 2026.xlsx").is_none());
    }

    #[test]
    fn test_parquet_round_trip_of_scalar_columns() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("Ticker", DataType::Utf8, false),
            Field::new("Decile", DataType::Int64, true),
            Field::new("Score", DataType::Float64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["A", "B"])),
                Arc::new(Int64Array::from(vec![Some(1), None])),
                Arc::new(Float64Array::from(vec![0.5, 0.25])),
            ],
        )
        .unwrap();
        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = decode_table(&buf, "World 2025-01-31.parquet").unwrap();
        assert_eq!(table.columns, vec!["Ticker", "Decile", "Score"]);
        assert_eq!(
            table.rows[0],
            vec![text("A"), CellValue::Integer(1), CellValue::Float(0.5)]
        );
        assert_eq!(table.rows[1][1], CellValue::Null);
    }

    #[test]
    fn test_guess_cell_type() {
        assert_eq!(guess_cell_type(" 7 "), CellValue::Integer(7));
        assert_eq!(guess_cell_type("1e3"), CellValue::Float(1000.0));
        assert_eq!(guess_cell_type(""), CellValue::Null);
        assert_eq!(guess_cell_type("true"), CellValue::Bool(true));
        assert_eq!(guess_cell_type("Energy"), text("Energy"));
        assert_eq!(guess_cell_type("005930"), text("005930"));
        assert_eq!(guess_cell_type("0.25"), CellValue::Float(0.25));
        assert_eq!(guess_cell_type("0"), CellValue::Integer(0));
    }
}
