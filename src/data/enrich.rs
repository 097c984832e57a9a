use chrono::{Local, NaiveDate};

use super::model::{CellValue, Column, RawTable, StockRecord, StockTable};
use super::region::RegionTag;
use super::schema::normalize;

/// Turn a decoded table into region/date-tagged stock records.
///
/// Returns `None` for an empty table. Undated files are stamped with
/// today's date so they land in the most recent time window.
pub fn enrich(table: &RawTable, region: RegionTag, date: Option<NaiveDate>) -> Option<StockTable> {
    enrich_on(table, region, date, Local::now().date_naive())
}

/// [`enrich`] with an explicit "today" for the undated fallback.
pub fn enrich_on(
    table: &RawTable,
    region: RegionTag,
    date: Option<NaiveDate>,
    today: NaiveDate,
) -> Option<StockTable> {
    if table.is_empty() {
        return None;
    }

    let renames = normalize(&table.columns);
    let file_date = date.unwrap_or(today);

    let mut columns = renames.columns();
    columns.insert(Column::Region);
    columns.insert(Column::FileDate);

    let derive_change = !renames.has(Column::DecileChange)
        && renames.has(Column::CurrentDecile)
        && renames.has(Column::PreviousDecile);
    if derive_change {
        columns.insert(Column::DecileChange);
    }

    let records = table
        .rows
        .iter()
        .map(|row| {
            let mut record = StockRecord::new(region, file_date);
            for (rename, cell) in renames.entries().iter().zip(row) {
                match rename.column {
                    Some(column) => assign(&mut record, column, cell),
                    None => {
                        record.extra.insert(rename.renamed.clone(), cell.clone());
                    }
                }
            }
            if derive_change {
                record.decile_change = record
                    .current_decile
                    .zip(record.previous_decile)
                    .and_then(|(current, previous)| current.checked_sub(previous));
            }
            record
        })
        .collect::<Vec<_>>();

    log::debug!(
        "Enriched {} rows as {region} / {file_date} with columns {:?}",
        records.len(),
        columns
    );
    Some(StockTable::new(records, columns))
}

fn assign(record: &mut StockRecord, column: Column, cell: &CellValue) {
    match column {
        Column::Ticker => record.ticker = cell.as_text(),
        Column::CompanyName => record.company_name = cell.as_text(),
        Column::Sector => record.sector = cell.as_text(),
        Column::CurrentDecile => record.current_decile = whole(cell, column),
        Column::PreviousDecile => record.previous_decile = whole(cell, column),
        Column::DecileChange => record.decile_change = whole(cell, column),
        Column::Score => record.score = real(cell, column),
        Column::MarketCap => record.market_cap_bn = real(cell, column),
        // Never produced by the synonym table; file metadata owns these.
        Column::Region | Column::FileDate => {}
    }
}

fn whole(cell: &CellValue, column: Column) -> Option<i32> {
    let value = cell.as_whole();
    if value.is_none() && !cell.is_null() {
        log::debug!("{column}: {cell:?} is not a whole number");
    }
    value
}

fn real(cell: &CellValue, column: Column) -> Option<f64> {
    let value = cell.as_f64();
    if value.is_none() && !cell.is_null() {
        log::debug!("{column}: {cell:?} is not a number");
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn text(s: &str) -> CellValue {
        CellValue::String(s.to_string())
    }

    fn table(columns: &[&str], rows: Vec<Vec<CellValue>>) -> RawTable {
        let mut t = RawTable::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            t.push_row(row);
        }
        t
    }

    #[test]
    fn test_empty_table_yields_none() {
        let t = table(&["Ticker"], vec![]);
        assert!(enrich(&t, RegionTag::Us, None).is_none());
    }

    #[test]
    fn test_derives_decile_change_when_absent() {
        let t = table(
            &["Symbol", "Decile", "Prior Decile"],
            vec![vec![text("F"), CellValue::Integer(2), CellValue::Integer(5)]],
        );
        let out = enrich(&t, RegionTag::Us, Some(day(2025, 3, 11))).unwrap();
        let rec = &out.records[0];
        assert_eq!(rec.ticker.as_deref(), Some("F"));
        assert_eq!(rec.current_decile, Some(2));
        assert_eq!(rec.previous_decile, Some(5));
        assert_eq!(rec.decile_change, Some(-3));
        assert!(out.has_column(Column::DecileChange));
    }

    #[test]
    fn test_explicit_change_column_is_kept() {
        let t = table(
            &["Ticker", "Current Decile", "Previous Decile", "Change"],
            vec![vec![
                text("X"),
                CellValue::Integer(2),
                CellValue::Integer(5),
                CellValue::Integer(7),
            ]],
        );
        let out = enrich(&t, RegionTag::Us, None).unwrap();
        assert_eq!(out.records[0].decile_change, Some(7));
    }

    #[test]
    fn test_missing_previous_decile_leaves_change_absent() {
        let t = table(
            &["Ticker", "Decile"],
            vec![vec![text("X"), CellValue::Integer(4)]],
        );
        let out = enrich(&t, RegionTag::Uk, None).unwrap();
        assert_eq!(out.records[0].decile_change, None);
        assert!(!out.has_column(Column::DecileChange));
    }

    #[test]
    fn test_blank_decile_cell_leaves_change_absent_for_that_row() {
        let t = table(
            &["Ticker", "Decile", "Prev Decile"],
            vec![
                vec![text("A"), CellValue::Null, CellValue::Integer(3)],
                vec![text("B"), CellValue::Float(1.0), CellValue::Integer(3)],
            ],
        );
        let out = enrich(&t, RegionTag::Uk, None).unwrap();
        assert_eq!(out.records[0].decile_change, None);
        assert_eq!(out.records[1].decile_change, Some(-2));
    }

    #[test]
    fn test_out_of_range_deciles_do_not_overflow_change() {
        let t = table(
            &["Ticker", "Decile", "Prior Decile"],
            vec![
                vec![text("X"), CellValue::Integer(i32::MAX.into()), CellValue::Integer(-1)],
                vec![text("Y"), CellValue::Integer(i32::MIN.into()), CellValue::Integer(1)],
            ],
        );
        let out = enrich(&t, RegionTag::Us, None).unwrap();
        assert_eq!(out.records[0].current_decile, Some(i32::MAX));
        assert_eq!(out.records[0].decile_change, None);
        assert_eq!(out.records[1].decile_change, None);
    }

    #[test]
    fn test_stamps_region_and_date() {
        let t = table(&["Ticker"], vec![vec![text("A")], vec![text("B")]]);
        let out = enrich(&t, RegionTag::China, Some(day(2025, 6, 30))).unwrap();
        assert!(out
            .records
            .iter()
            .all(|r| r.region == RegionTag::China && r.file_date == day(2025, 6, 30)));
        assert!(out.has_column(Column::Region));
        assert!(out.has_column(Column::FileDate));
    }

    #[test]
    fn test_undated_file_uses_today() {
        let t = table(&["Ticker"], vec![vec![text("A")]]);
        let today = day(2026, 10, 15);
        let out = enrich_on(&t, RegionTag::Japan, None, today).unwrap();
        assert_eq!(out.records[0].file_date, today);
    }

    #[test]
    fn test_unknown_columns_are_carried_as_extra() {
        let t = table(
            &["Ticker", "Analyst"],
            vec![vec![text("A"), text("jdoe")]],
        );
        let out = enrich(&t, RegionTag::Us, None).unwrap();
        assert_eq!(out.records[0].extra.get("Analyst"), Some(&text("jdoe")));
    }

    #[test]
    fn test_numeric_fields_parse_from_text() {
        let t = table(
            &["Ticker", "Total Score", "Mkt Cap"],
            vec![vec![text("A"), text("71.5"), text("n/a")]],
        );
        let out = enrich(&t, RegionTag::Us, None).unwrap();
        assert_eq!(out.records[0].score, Some(71.5));
        assert_eq!(out.records[0].market_cap_bn, None);
    }
}
