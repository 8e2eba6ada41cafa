//! Data layer: core types, loading, filtering and export.
//!
//! Architecture:
//! ```text
//!  .csv / .xlsx / .xls / .parquet / .json
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse bytes (+ chosen sheet) → Table
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  column + keywords + mode → FilterResult
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  export   │  Table → CSV bytes / XLSX workbook bytes
//!   └──────────┘
//! ```

pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
