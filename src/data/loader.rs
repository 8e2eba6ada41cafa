use std::collections::HashSet;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    ArrowTemporalType, DataType, Date32Type, Date64Type, Float32Type, Float64Type, Int16Type,
    Int32Type, Int64Type, Int8Type, TimeUnit, TimestampMicrosecondType,
    TimestampMillisecondType, TimestampNanosecondType, TimestampSecondType, UInt16Type,
    UInt32Type, UInt64Type, UInt8Type,
};
use arrow::util::display::array_value_to_string;
use bytes::Bytes;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::model::{CellValue, Row, Table, TableError};

// ---------------------------------------------------------------------------
// Errors & formats
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid workbook: {0}")]
    Excel(#[from] calamine::Error),
    #[error("invalid Parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("invalid Arrow data: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("sheet `{0}` not found in workbook")]
    SheetNotFound(String),
    #[error("workbook contains no sheets")]
    NoSheets,
    #[error("no columns to parse from file")]
    NoColumns,
    #[error("{0}")]
    Malformed(String),
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Input formats, detected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    /// Anything calamine opens: `.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`.
    Excel,
    Parquet,
    /// Records-oriented JSON: `[{ "col": value, ... }, ...]`.
    Json,
}

impl SourceFormat {
    /// Every extension [`SourceFormat::from_extension`] accepts.
    pub const EXTENSIONS: &'static [&'static str] = &[
        "csv", "xlsx", "xlsm", "xlsb", "xls", "ods", "parquet", "pq", "json",
    ];

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(SourceFormat::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(SourceFormat::Excel),
            "parquet" | "pq" => Some(SourceFormat::Parquet),
            "json" => Some(SourceFormat::Json),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::from_extension(ext).ok_or_else(|| LoadError::UnsupportedFormat(ext.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// The raw bytes of one opened file plus its detected format.
///
/// Kept around for the whole session so a different workbook sheet can be
/// loaded without reading the file again.
#[derive(Debug, Clone)]
pub struct SourceFile {
    name: String,
    format: SourceFormat,
    bytes: Vec<u8>,
}

impl SourceFile {
    pub fn open(path: &Path) -> Result<Self, LoadError> {
        let format = SourceFormat::from_path(path)?;
        let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        log::debug!("Read {} bytes from {}", bytes.len(), path.display());
        Ok(Self {
            name,
            format,
            bytes,
        })
    }

    /// Wrap an uploaded byte buffer; `name` supplies the extension.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, LoadError> {
        let name = name.into();
        let format = SourceFormat::from_path(Path::new(&name))?;
        Ok(Self {
            name,
            format,
            bytes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    /// Sheet names in workbook order. Empty for non-workbook formats.
    pub fn sheet_names(&self) -> Result<Vec<String>, LoadError> {
        match self.format {
            SourceFormat::Excel => {
                let workbook = open_workbook_auto_from_rs(Cursor::new(self.bytes.as_slice()))?;
                Ok(workbook.sheet_names().to_owned())
            }
            _ => Ok(Vec::new()),
        }
    }

    /// Parse the file into a [`Table`].
    ///
    /// `sheet` picks a workbook sheet (first sheet when `None`) and is
    /// ignored by the other formats.
    pub fn load(&self, sheet: Option<&str>) -> Result<Table, LoadError> {
        let table = match self.format {
            SourceFormat::Csv => load_csv(&self.bytes)?,
            SourceFormat::Excel => load_excel(&self.bytes, sheet)?,
            SourceFormat::Parquet => load_parquet(&self.bytes)?,
            SourceFormat::Json => load_json(&self.bytes)?,
        };
        log::info!(
            "Loaded {} with {} rows and columns {:?}",
            self.name,
            table.len(),
            table.columns()
        );
        Ok(table)
    }
}

// ---------------------------------------------------------------------------
// Header normalization
// ---------------------------------------------------------------------------

/// Make raw header names usable as unique column names.
///
/// Blank headers become `Unnamed: {index}`; repeats get `.1`, `.2`, ...
fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(raw.len());
    let mut out = Vec::with_capacity(raw.len());

    for (i, name) in raw.into_iter().enumerate() {
        let base = if name.trim().is_empty() {
            format!("Unnamed: {i}")
        } else {
            name
        };
        let mut candidate = base.clone();
        let mut n = 1;
        while seen.contains(&candidate) {
            candidate = format!("{base}.{n}");
            n += 1;
        }
        if candidate != base {
            log::warn!("Renamed duplicate column {base:?} to {candidate:?}");
        }
        seen.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one record per row.
/// Short records are padded with nulls; long ones are rejected.
fn load_csv(bytes: &[u8]) -> Result<Table, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers.is_empty() {
        return Err(LoadError::NoColumns);
    }

    let columns = normalize_headers(headers);
    let width = columns.len();
    let mut rows = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result?;
        if record.len() > width {
            return Err(LoadError::Malformed(format!(
                "CSV row {}: expected {width} fields, found {}",
                row_no + 1,
                record.len()
            )));
        }
        let mut row: Row = record.iter().map(infer_cell).collect();
        row.resize(width, CellValue::Null);
        rows.push(row);
    }

    Ok(Table::new(columns, rows)?)
}

/// Guess the type of one CSV field.
///
/// Only the empty field is missing; words like `None`, `nan` or `NA` stay
/// text so they can be searched for.
fn infer_cell(s: &str) -> CellValue {
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    // `f64::from_str` also accepts "nan"/"inf"; require a digit.
    if s.bytes().any(|b| b.is_ascii_digit()) {
        if let Ok(f) = s.parse::<f64>() {
            return CellValue::Float(f);
        }
    }
    if s.eq_ignore_ascii_case("true") {
        return CellValue::Bool(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return CellValue::Bool(false);
    }
    CellValue::Text(s.to_string())
}

// ---------------------------------------------------------------------------
// Excel loader
// ---------------------------------------------------------------------------

/// The first row of the sheet's used range is the header.
fn load_excel(bytes: &[u8], sheet: Option<&str>) -> Result<Table, LoadError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let sheet_names = workbook.sheet_names().to_owned();

    let sheet_name = match sheet {
        Some(wanted) => sheet_names
            .iter()
            .find(|name| name.as_str() == wanted)
            .cloned()
            .ok_or_else(|| LoadError::SheetNotFound(wanted.to_string()))?,
        None => sheet_names.first().cloned().ok_or(LoadError::NoSheets)?,
    };
    log::debug!("Reading sheet {sheet_name:?} of {sheet_names:?}");

    let range = workbook.worksheet_range(&sheet_name)?;
    let mut rows_iter = range.rows();
    let header = rows_iter.next().ok_or(LoadError::NoColumns)?;
    let columns = normalize_headers(header.iter().map(excel_header).collect());

    let rows: Vec<Row> = rows_iter
        .map(|row| row.iter().map(excel_cell).collect())
        .collect();

    Ok(Table::new(columns, rows)?)
}

fn excel_header(cell: &Data) -> String {
    excel_cell(cell).render().into_owned()
}

/// Largest magnitude below which every whole `f64` is an exact `i64`.
const EXACT_INT_LIMIT: f64 = 9_007_199_254_740_992.0;

fn excel_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Null,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Integer(*i),
        // Workbooks store every number as a double; whole ones read as `12345`.
        Data::Float(f) if f.fract() == 0.0 && f.abs() < EXACT_INT_LIMIT => {
            CellValue::Integer(*f as i64)
        }
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(d) if !dt.is_duration() => CellValue::Date(d),
            _ => CellValue::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file; every column becomes a table column.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(bytes: &[u8]) -> Result<Table, LoadError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(Bytes::copy_from_slice(bytes))?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    if headers.is_empty() {
        return Err(LoadError::NoColumns);
    }
    let columns = normalize_headers(headers);
    let reader = builder.build()?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result?;
        for row in 0..batch.num_rows() {
            let cells = batch
                .columns()
                .iter()
                .map(|col| arrow_cell(col, row))
                .collect::<Result<Row, LoadError>>()?;
            rows.push(cells);
        }
    }

    Ok(Table::new(columns, rows)?)
}

/// Extract a single cell from an Arrow column at a given row.
fn arrow_cell(col: &ArrayRef, row: usize) -> Result<CellValue, LoadError> {
    if col.is_null(row) {
        return Ok(CellValue::Null);
    }
    let value = match col.data_type() {
        DataType::Utf8 => CellValue::Text(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => CellValue::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Boolean => CellValue::Bool(col.as_boolean().value(row)),
        DataType::Int8 => CellValue::Integer(col.as_primitive::<Int8Type>().value(row).into()),
        DataType::Int16 => CellValue::Integer(col.as_primitive::<Int16Type>().value(row).into()),
        DataType::Int32 => CellValue::Integer(col.as_primitive::<Int32Type>().value(row).into()),
        DataType::Int64 => CellValue::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => CellValue::Integer(col.as_primitive::<UInt8Type>().value(row).into()),
        DataType::UInt16 => CellValue::Integer(col.as_primitive::<UInt16Type>().value(row).into()),
        DataType::UInt32 => CellValue::Integer(col.as_primitive::<UInt32Type>().value(row).into()),
        DataType::UInt64 => {
            let v = col.as_primitive::<UInt64Type>().value(row);
            i64::try_from(v).map_or(CellValue::Float(v as f64), CellValue::Integer)
        }
        DataType::Float32 => CellValue::Float(col.as_primitive::<Float32Type>().value(row).into()),
        DataType::Float64 => CellValue::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Date32 => temporal_cell::<Date32Type>(col, row)?,
        DataType::Date64 => temporal_cell::<Date64Type>(col, row)?,
        DataType::Timestamp(TimeUnit::Second, _) => temporal_cell::<TimestampSecondType>(col, row)?,
        DataType::Timestamp(TimeUnit::Millisecond, _) => {
            temporal_cell::<TimestampMillisecondType>(col, row)?
        }
        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            temporal_cell::<TimestampMicrosecondType>(col, row)?
        }
        DataType::Timestamp(TimeUnit::Nanosecond, _) => {
            temporal_cell::<TimestampNanosecondType>(col, row)?
        }
        _ => CellValue::Text(array_value_to_string(col, row)?),
    };
    Ok(value)
}

fn temporal_cell<T>(col: &ArrayRef, row: usize) -> Result<CellValue, LoadError>
where
    T: ArrowTemporalType,
    i64: From<T::Native>,
{
    match col.as_primitive::<T>().value_as_datetime(row) {
        Some(d) => Ok(CellValue::Date(d)),
        None => Ok(CellValue::Text(array_value_to_string(col, row)?)),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "fruit": "apple pie", "price": 3.5 },
///   { "fruit": "grape soda", "price": null }
/// ]
/// ```
///
/// Columns are the union of keys in first-seen order; absent keys are null.
fn load_json(bytes: &[u8]) -> Result<Table, LoadError> {
    let root: JsonValue = serde_json::from_slice(bytes)?;
    let records = root
        .as_array()
        .ok_or_else(|| LoadError::Malformed("expected a top-level JSON array".into()))?;

    let mut objects = Vec::with_capacity(records.len());
    let mut keys: Vec<String> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| LoadError::Malformed(format!("record {i} is not a JSON object")))?;
        for key in obj.keys() {
            if seen.insert(key.as_str()) {
                keys.push(key.clone());
            }
        }
        objects.push(obj);
    }
    if keys.is_empty() {
        return Err(LoadError::NoColumns);
    }

    let rows: Vec<Row> = objects
        .iter()
        .map(|obj| {
            keys.iter()
                .map(|k| obj.get(k).map_or(CellValue::Null, json_cell))
                .collect()
        })
        .collect();

    Ok(Table::new(normalize_headers(keys), rows)?)
}

fn json_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::Text(other.to_string()),
    }
}
