use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDateTime;
use thiserror::Error;

/// Text layout used when a [`CellValue::Date`] is rendered.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// CellValue – a single cell of a table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring the dtypes a CSV or spreadsheet
/// column commonly carries.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDateTime),
    /// Missing value. Renders as the empty string, never as `None`/`nan`.
    Null,
}

impl CellValue {
    /// Canonical text form of the value.
    ///
    /// Keyword matching and CSV export both go through this, so two cells
    /// render identically exactly when they match the same keywords.
    pub fn render(&self) -> Cow<'_, str> {
        match self {
            CellValue::Text(s) => Cow::Borrowed(s),
            CellValue::Integer(i) => Cow::Owned(i.to_string()),
            CellValue::Float(v) => Cow::Owned(render_float(*v)),
            CellValue::Bool(true) => Cow::Borrowed("true"),
            CellValue::Bool(false) => Cow::Borrowed("false"),
            CellValue::Date(d) => Cow::Owned(d.format(DATE_FORMAT).to_string()),
            CellValue::Null => Cow::Borrowed(""),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Try to interpret the value as an `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

/// Shortest round-trip decimal, always with a fractional part (`3.0`, `2.5`).
fn render_float(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let s = v.to_string();
    if s.contains('.') {
        s
    } else {
        format!("{s}.0")
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Integer(i)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(CellValue::Null, Into::into)
    }
}

// ---------------------------------------------------------------------------
// Table – named columns, ordered rows
// ---------------------------------------------------------------------------

/// One row: a cell per declared column, in column order.
pub type Row = Vec<CellValue>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("duplicate column name `{0}`")]
    DuplicateColumn(String),
    #[error("row {row} has {found} cells but the table declares {expected} columns")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// An in-memory rectangular dataset.
///
/// Column names are unique and every row has exactly one cell per column;
/// both are checked by [`Table::new`], so a constructed `Table` always holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

/// The first few distinct rendered values of a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleValues {
    pub values: Vec<String>,
    /// More distinct values exist beyond `values`.
    pub truncated: bool,
}

impl fmt::Display for SampleValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.values.join(", "))?;
        if self.truncated {
            f.write_str("...")?;
        }
        Ok(())
    }
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Result<Self, TableError> {
        let mut seen = HashSet::with_capacity(columns.len());
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(TableError::DuplicateColumn(name.clone()));
            }
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(TableError::RowWidth {
                    row: i,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[CellValue]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&CellValue> {
        self.rows.get(row)?.get(column)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterate the cells of one column, top to bottom.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &CellValue> + '_ {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    /// A new table holding the rows at `indices`, in the given order.
    /// Out-of-range indices are skipped.
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        let rows = indices
            .iter()
            .filter_map(|&i| self.rows.get(i).cloned())
            .collect();
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// The first `n` rows.
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// First `limit` distinct rendered values of a column, in row order.
    pub fn sample_values(&self, column: usize, limit: usize) -> SampleValues {
        let mut seen = HashSet::new();
        let mut values = Vec::new();
        let mut truncated = false;
        for cell in self.column(column) {
            let text = cell.render();
            if seen.contains(text.as_ref()) {
                continue;
            }
            if values.len() == limit {
                truncated = true;
                break;
            }
            seen.insert(text.to_string());
            values.push(text.into_owned());
        }
        SampleValues { values, truncated }
    }
}
