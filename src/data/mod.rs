//! Data layer: typed tables, validation, aggregation.
//!
//! Architecture:
//! ```text
//!  .csv / .tsv / .parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse bytes → RawTable (column types fixed here)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ validate  │  identifier + sample rules → CountMatrix
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ aggregate │  Mean / Median / StdDev per row → SummaryTable
//!   └──────────┘
//!        │
//!        ▼
//!   SummaryTable::to_csv_bytes → storage
//! ```

pub mod aggregate;
pub mod histogram;
pub mod loader;
pub mod model;
pub mod validate;

pub use aggregate::summarize;
pub use loader::{load_file_as, parse_bytes, parse_bytes_with, TableFormat, TextColumns};
pub use model::{Column, ColumnKind, CountMatrix, RawTable, Statistic, SummaryRow, SummaryTable};
pub use validate::{validate, DEFAULT_IDENTIFIER_COLUMN};
