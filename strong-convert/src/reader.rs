//! Delimited input reader

use crate::record::{RawRecord, REQUIRED_COLUMNS};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use strong_common::{Error, Result};
use tracing::debug;

/// Read every data row of the export at `path`
pub fn read_records(path: &Path, delimiter: u8) -> Result<Vec<RawRecord>> {
    let file = File::open(path)?;
    read_from(file, delimiter)
}

/// Read every data row from `reader`
///
/// The header row names the columns. Rows shorter than the header leave the
/// trailing columns absent; cells beyond the header are ignored.
pub fn read_from<R: Read>(reader: R, delimiter: u8) -> Result<Vec<RawRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if i == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect();

    for required in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == required) {
            return Err(Error::MissingColumn(required.to_string()));
        }
    }

    let mut records = Vec::new();
    for (index, result) in csv_reader.records().enumerate() {
        let row = result?;
        let line = row.position().map(|p| p.line()).unwrap_or_default();
        let mut record = RawRecord::new(index + 1, line);
        for (column, value) in headers.iter().zip(row.iter()) {
            record.fields.insert(column.clone(), value.to_string());
        }
        records.push(record);
    }

    debug!("Read {} data rows ({} columns)", records.len(), headers.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{COL_DATE, COL_EXERCISE_NAME, COL_NOTES, COL_WEIGHT};

    #[test]
    fn test_reads_semicolon_rows_with_positions() {
        let input = "Date;Exercise Name;Weight;Notes\n\
                     2023-01-01 09:00:00;Squat;100;\n\
                     2023-01-01 09:00:00;\"Bench; Flat\";80;paused\n";

        let records = read_from(input.as_bytes(), b';').unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].row, 1);
        assert_eq!(records[0].line, 2);
        assert_eq!(records[0].get(COL_NOTES), Some(""));
        assert_eq!(records[1].row, 2);
        assert_eq!(records[1].get(COL_EXERCISE_NAME), Some("Bench; Flat"));
        assert_eq!(records[1].get(COL_WEIGHT), Some("80"));
    }

    #[test]
    fn test_short_rows_leave_columns_absent() {
        let input = "Date;Exercise Name;Weight;Notes\n2023-01-01 09:00:00;Squat\n";
        let records = read_from(input.as_bytes(), b';').unwrap();
        assert_eq!(records[0].get(COL_DATE), Some("2023-01-01 09:00:00"));
        assert_eq!(records[0].get(COL_WEIGHT), None);
        assert_eq!(records[0].get(COL_NOTES), None);
    }

    #[test]
    fn test_strips_byte_order_mark() {
        let input = "\u{feff}Date;Exercise Name\n2023-01-01 09:00:00;Squat\n";
        let records = read_from(input.as_bytes(), b';').unwrap();
        assert_eq!(records[0].get(COL_DATE), Some("2023-01-01 09:00:00"));
    }

    #[test]
    fn test_missing_required_column() {
        let input = "Date;Workout Name\n2023-01-01 09:00:00;Day 1\n";
        match read_from(input.as_bytes(), b';') {
            Err(Error::MissingColumn(column)) => assert_eq!(column, "Exercise Name"),
            other => panic!("expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_delimiter() {
        let input = "Date,Exercise Name\n2023-01-01 09:00:00,Squat\n";
        let records = read_from(input.as_bytes(), b',').unwrap();
        assert_eq!(records[0].get(COL_EXERCISE_NAME), Some("Squat"));
    }
}
