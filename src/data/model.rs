use std::collections::HashSet;
use std::fmt;

use bytes::Bytes;

use super::loader::{parse_bytes_with, TableFormat, TextColumns};
use crate::error::TableError;

// ---------------------------------------------------------------------------
// Column – one typed column of an uploaded table
// ---------------------------------------------------------------------------

/// A column whose type was fixed at ingestion time.
///
/// `None` cells are nulls (empty CSV cells, `NA` markers, Parquet nulls, NaN).
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Text(Vec<Option<String>>),
    Numeric(Vec<Option<f64>>),
}

/// The declared type of a [`Column`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Numeric,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Text => write!(f, "text"),
            ColumnKind::Numeric => write!(f, "numeric"),
        }
    }
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Text(v) => v.len(),
            Column::Numeric(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::Text(_) => ColumnKind::Text,
            Column::Numeric(_) => ColumnKind::Numeric,
        }
    }

    /// Numeric view of the column, `None` for text columns.
    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match self {
            Column::Numeric(v) => Some(v),
            Column::Text(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// RawTable – an uploaded table before validation
// ---------------------------------------------------------------------------

/// Ordered, column-major table exactly as it was ingested.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    names: Vec<String>,
    columns: Vec<Column>,
    n_rows: usize,
}

impl RawTable {
    /// Assemble a table, checking header names are unique and every column
    /// has the same length.
    pub fn new(names: Vec<String>, columns: Vec<Column>) -> Result<Self, TableError> {
        if names.len() != columns.len() {
            return Err(TableError::ColumnLength {
                column: "<header>".to_string(),
                expected: names.len(),
                found: columns.len(),
            });
        }
        let repeated = {
            let mut seen = HashSet::with_capacity(names.len());
            names.iter().find(|n| !seen.insert(n.as_str())).cloned()
        };
        if let Some(name) = repeated {
            return Err(TableError::DuplicateColumn(name));
        }
        let n_rows = columns.first().map_or(0, Column::len);
        for (name, col) in names.iter().zip(&columns) {
            if col.len() != n_rows {
                return Err(TableError::ColumnLength {
                    column: name.clone(),
                    expected: n_rows,
                    found: col.len(),
                });
            }
        }
        Ok(RawTable {
            names,
            columns,
            n_rows,
        })
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| &self.columns[idx])
    }

    /// Iterate `(name, column)` pairs in table order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(String::as_str).zip(&self.columns)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.names.len()
    }
}

// ---------------------------------------------------------------------------
// CountMatrix – a validated dataset
// ---------------------------------------------------------------------------

/// A dataset that passed validation: unique non-null identifiers and
/// non-negative, finite sample columns.
///
/// Only the validator constructs one, so holding a `CountMatrix` is proof the
/// rules were checked.
#[derive(Debug, Clone, PartialEq)]
pub struct CountMatrix {
    identifier_column: String,
    identifiers: Vec<String>,
    sample_names: Vec<String>,
    /// Column-major sample values, `samples[col][row]`.
    samples: Vec<Vec<f64>>,
}

impl CountMatrix {
    pub(crate) fn new(
        identifier_column: String,
        identifiers: Vec<String>,
        sample_names: Vec<String>,
        samples: Vec<Vec<f64>>,
    ) -> Self {
        debug_assert_eq!(sample_names.len(), samples.len());
        debug_assert!(samples.iter().all(|c| c.len() == identifiers.len()));
        CountMatrix {
            identifier_column,
            identifiers,
            sample_names,
            samples,
        }
    }

    pub fn identifier_column(&self) -> &str {
        &self.identifier_column
    }

    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn sample_names(&self) -> &[String] {
        &self.sample_names
    }

    pub fn n_rows(&self) -> usize {
        self.identifiers.len()
    }

    /// Sample values of one row, in sample-column order.
    pub fn row(&self, idx: usize) -> Vec<f64> {
        self.samples.iter().map(|col| col[idx]).collect()
    }
}

// ---------------------------------------------------------------------------
// Summary – aggregator output
// ---------------------------------------------------------------------------

/// One of the per-row statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    Mean,
    Median,
    StdDev,
}

impl Statistic {
    pub const ALL: [Statistic; 3] = [Statistic::Mean, Statistic::Median, Statistic::StdDev];

    /// Column header used in the processed CSV.
    pub fn header(self) -> &'static str {
        match self {
            Statistic::Mean => "Mean",
            Statistic::Median => "Median",
            Statistic::StdDev => "StdDev",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// One output row: identifier, statistics, then the untouched samples.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub identifier: String,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; undefined (`None`) for a single sample.
    pub std_dev: Option<f64>,
    pub samples: Vec<f64>,
}

impl SummaryRow {
    pub fn statistic(&self, stat: Statistic) -> Option<f64> {
        match stat {
            Statistic::Mean => Some(self.mean),
            Statistic::Median => Some(self.median),
            Statistic::StdDev => self.std_dev,
        }
    }
}

/// The processed dataset. Column order is
/// `[identifier, Mean, Median, StdDev, samples...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTable {
    pub identifier_column: String,
    pub sample_names: Vec<String>,
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    pub fn headers(&self) -> Vec<String> {
        let mut headers = Vec::with_capacity(4 + self.sample_names.len());
        headers.push(self.identifier_column.clone());
        headers.extend(Statistic::ALL.iter().map(|s| s.header().to_string()));
        headers.extend(self.sample_names.iter().cloned());
        headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All defined values of one statistic, in row order.
    pub fn statistic_values(&self, stat: Statistic) -> Vec<f64> {
        self.rows.iter().filter_map(|r| r.statistic(stat)).collect()
    }

    /// Serialize as CSV. An undefined standard deviation becomes an empty cell.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, TableError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(self.headers())?;
        for row in &self.rows {
            let mut record = Vec::with_capacity(4 + row.samples.len());
            record.push(row.identifier.clone());
            record.push(row.mean.to_string());
            record.push(row.median.to_string());
            record.push(row.std_dev.map(|v| v.to_string()).unwrap_or_default());
            record.extend(row.samples.iter().map(f64::to_string));
            writer.write_record(&record)?;
        }
        writer
            .into_inner()
            .map_err(|e| TableError::Write(e.error().to_string()))
    }

    /// Parse a processed CSV produced by [`SummaryTable::to_csv_bytes`].
    pub fn from_csv_bytes(data: impl Into<Bytes>) -> Result<Self, TableError> {
        let raw = parse_bytes_with(data.into(), TableFormat::Csv, TextColumns::First)?;
        Self::from_raw(&raw)
    }

    /// Rebuild a summary from a processed table read back from storage.
    ///
    /// The first column is the identifier, followed by `Mean`, `Median`,
    /// `StdDev`; every further column is a sample.
    pub fn from_raw(table: &RawTable) -> Result<Self, TableError> {
        let names = table.column_names();
        if names.len() < 4 {
            return Err(TableError::NotSummary(format!(
                "expected at least 4 columns, found {}",
                names.len()
            )));
        }
        for (name, stat) in names[1..4].iter().zip(Statistic::ALL) {
            if name != stat.header() {
                return Err(TableError::NotSummary(format!(
                    "expected column '{}', found '{name}'",
                    stat.header()
                )));
            }
        }

        let cols: Vec<&Column> = table.columns().map(|(_, c)| c).collect();
        let identifiers = identifier_cells(cols[0]);
        let mean = numeric_column(&cols, names, 1)?;
        let median = numeric_column(&cols, names, 2)?;
        let std_dev = numeric_column(&cols, names, 3)?;
        let samples = (4..names.len())
            .map(|idx| numeric_column(&cols, names, idx))
            .collect::<Result<Vec<_>, _>>()?;

        let rows = (0..table.n_rows())
            .map(|i| SummaryRow {
                identifier: identifiers[i].clone(),
                mean: mean[i].unwrap_or(f64::NAN),
                median: median[i].unwrap_or(f64::NAN),
                std_dev: std_dev[i],
                samples: samples.iter().map(|c| c[i].unwrap_or(f64::NAN)).collect(),
            })
            .collect();

        Ok(SummaryTable {
            identifier_column: names[0].clone(),
            sample_names: names[4..].to_vec(),
            rows,
        })
    }
}

fn numeric_column<'a>(
    cols: &[&'a Column],
    names: &[String],
    idx: usize,
) -> Result<&'a [Option<f64>], TableError> {
    cols[idx].as_numeric().ok_or_else(|| {
        TableError::NotSummary(format!("column '{}' is not numeric", names[idx]))
    })
}

/// Render any column as display strings; nulls become empty strings.
fn identifier_cells(col: &Column) -> Vec<String> {
    match col {
        Column::Text(v) => v.iter().map(|c| c.clone().unwrap_or_default()).collect(),
        Column::Numeric(v) => v
            .iter()
            .map(|c| c.map(|x| x.to_string()).unwrap_or_default())
            .collect(),
    }
}
