use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use thiserror::Error;

use super::model::{CellValue, Table};

/// Worksheet name used for a single exported table.
pub const DEFAULT_SHEET_NAME: &str = "Filtered Data";

/// Excel worksheet bounds.
const XLSX_MAX_ROWS: usize = 1_048_576;
const XLSX_MAX_COLS: usize = 16_384;

/// Days between the Excel epoch (1899-12-30) and the Unix epoch.
const EXCEL_UNIX_EPOCH_DAYS: f64 = 25_569.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("Excel export failed: {0}")]
    Xlsx(#[from] XlsxError),
    #[error("CSV buffer could not be flushed: {0}")]
    Buffer(#[source] std::io::Error),
    #[error("table has {0} columns, more than a worksheet can hold")]
    TooManyColumns(usize),
    #[error("table has {0} rows, more than a worksheet can hold")]
    TooManyRows(usize),
    #[error("unsupported export extension: .{0}")]
    UnsupportedFormat(String),
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" => Ok(ExportFormat::Xlsx),
            _ => Err(ExportError::UnsupportedFormat(ext.to_string())),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn default_file_name(self) -> &'static str {
        match self {
            ExportFormat::Csv => "filtered_data.csv",
            ExportFormat::Xlsx => "filtered_data.xlsx",
        }
    }

    pub fn serialize(self, table: &Table) -> Result<Vec<u8>, ExportError> {
        match self {
            ExportFormat::Csv => to_csv(table),
            ExportFormat::Xlsx => to_xlsx(table, DEFAULT_SHEET_NAME),
        }
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Comma-delimited text with a header row and no index column.
/// Cells use their canonical rendering; nulls become empty fields.
pub fn to_csv(table: &Table) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if table.width() > 0 {
        writer.write_record(table.columns())?;
        for row in table.rows() {
            writer.write_record(row.iter().map(|cell| cell.render().into_owned()))?;
        }
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::Buffer(e.into_error()))
}

// ---------------------------------------------------------------------------
// XLSX
// ---------------------------------------------------------------------------

/// A workbook with one sheet holding `table`.
pub fn to_xlsx(table: &Table, sheet_name: &str) -> Result<Vec<u8>, ExportError> {
    to_xlsx_sheets(&[(sheet_name, table)])
}

/// A workbook with one sheet per `(name, table)` pair, in order.
///
/// Each sheet gets a bold header row followed by typed cells: numbers and
/// booleans stay native, dates are date-formatted serials, nulls are blank.
pub fn to_xlsx_sheets(sheets: &[(&str, &Table)]) -> Result<Vec<u8>, ExportError> {
    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");
    let mut workbook = Workbook::new();

    for (name, table) in sheets {
        if table.width() > XLSX_MAX_COLS {
            return Err(ExportError::TooManyColumns(table.width()));
        }
        if table.len() + 1 > XLSX_MAX_ROWS {
            return Err(ExportError::TooManyRows(table.len()));
        }

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*name)?;

        for (col, column_name) in table.columns().iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, column_name, &header_format)?;
        }
        for (row, cells) in table.rows().iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                write_cell(worksheet, row as u32 + 1, col as u16, cell, &date_format)?;
            }
        }
        log::debug!("Wrote sheet {name:?} with {} rows", table.len());
    }

    Ok(workbook.save_to_buffer()?)
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &CellValue,
    date_format: &Format,
) -> Result<(), XlsxError> {
    match cell {
        CellValue::Null => {}
        CellValue::Text(s) => {
            worksheet.write_string(row, col, s)?;
        }
        CellValue::Integer(i) => {
            worksheet.write_number(row, col, *i as f64)?;
        }
        CellValue::Float(v) if v.is_finite() => {
            worksheet.write_number(row, col, *v)?;
        }
        CellValue::Float(_) => {
            worksheet.write_string(row, col, &*cell.render())?;
        }
        CellValue::Bool(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        CellValue::Date(d) => {
            worksheet.write_number_with_format(row, col, excel_serial(d), date_format)?;
        }
    }
    Ok(())
}

fn excel_serial(d: &NaiveDateTime) -> f64 {
    EXCEL_UNIX_EPOCH_DAYS + d.and_utc().timestamp_millis() as f64 / MILLIS_PER_DAY
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Serialize `table` in the format named by `path`'s extension and write it.
pub fn write_file(table: &Table, path: &Path) -> Result<(), ExportError> {
    write_file_as(table, path, ExportFormat::from_path(path)?)
}

/// Write `table` to `path` as `format`, whatever the path's extension.
pub fn write_file_as(table: &Table, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
    let bytes = format.serialize(table)?;
    std::fs::write(path, &bytes).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!(
        "Exported {} rows as {} to {}",
        table.len(),
        format.extension(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> Table {
        Table::new(
            vec!["name".into(), "qty".into(), "note".into()],
            vec![
                vec!["apple, red".into(), CellValue::Integer(3), CellValue::Null],
                vec!["pear".into(), CellValue::Float(1.5), "say \"hi\"".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn csv_has_header_no_index_and_quotes_fields() {
        let bytes = to_csv(&sample()).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "name,qty,note\n\"apple, red\",3,\npear,1.5,\"say \"\"hi\"\"\"\n"
        );
    }

    #[test]
    fn csv_of_empty_result_is_header_only() {
        let table = Table::new(vec!["fruit".into()], Vec::new()).unwrap();
        assert_eq!(to_csv(&table).unwrap(), b"fruit\n");
    }

    #[test]
    fn xlsx_buffer_is_a_zip_package() {
        let bytes = to_xlsx(&sample(), DEFAULT_SHEET_NAME).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn rejects_invalid_sheet_names() {
        let err = to_xlsx(&sample(), "bad/name").unwrap_err();
        assert!(matches!(err, ExportError::Xlsx(_)), "{err}");
    }

    #[test]
    fn excel_serial_matches_known_dates() {
        let unix = NaiveDate::from_ymd_opt(1970, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(excel_serial(&unix), 25_569.0);

        let noon = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(excel_serial(&noon), 45_292.5);
    }

    #[test]
    fn explicit_format_ignores_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.dat");
        write_file_as(&sample(), &path, ExportFormat::Xlsx).unwrap();
        assert_eq!(&std::fs::read(&path).unwrap()[..2], b"PK");
        assert!(matches!(
            write_file(&sample(), &path),
            Err(ExportError::UnsupportedFormat(ext)) if ext == "dat"
        ));
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(
            ExportFormat::from_path(Path::new("out.CSV")).unwrap(),
            ExportFormat::Csv
        );
        assert_eq!(
            ExportFormat::from_path(Path::new("out.xlsx")).unwrap(),
            ExportFormat::Xlsx
        );
        assert!(matches!(
            ExportFormat::from_path(Path::new("out.ods")),
            Err(ExportError::UnsupportedFormat(_))
        ));
    }
}
