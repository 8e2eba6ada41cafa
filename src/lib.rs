//! Keyword row filtering for CSV, Excel, Parquet and JSON tables.
//!
//! ```
//! use keyword_filter::{filter_rows, CellValue, Keywords, MatchMode, Table};
//!
//! let table = Table::new(
//!     vec!["fruit".to_string()],
//!     vec![vec![CellValue::from("apple pie")], vec![CellValue::from("grape soda")]],
//! )
//! .unwrap();
//! let keywords = Keywords::parse("APPLE").unwrap();
//! let result = filter_rows(&table, "fruit", &keywords, MatchMode::Any).unwrap();
//! assert_eq!(result.stats.matched_count, 1);
//! ```

pub mod data;

pub use data::export::{to_csv, to_xlsx, write_file, write_file_as, ExportError, ExportFormat};
pub use data::filter::{
    filter_rows, FilterError, FilterResult, FilterStats, KeywordMatcher, Keywords, MatchMode,
};
pub use data::loader::{LoadError, SourceFile, SourceFormat};
pub use data::model::{CellValue, Table, TableError};
