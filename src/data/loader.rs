use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::model::{Column, RawTable};
use crate::error::TableError;

/// Cell contents treated as missing values, matching common dataframe readers.
const NULL_MARKERS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "None", "<NA>", "#N/A",
];

// ---------------------------------------------------------------------------
// Format dispatch
// ---------------------------------------------------------------------------

/// On-disk layout of an uploaded table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Tsv,
    Parquet,
}

impl TableFormat {
    /// Guess the format from a file name or storage key. Unknown extensions
    /// fall back to CSV, the format the dashboard uploads.
    pub fn from_key(key: &str) -> Self {
        let ext = Path::new(key)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "parquet" | "pq" => TableFormat::Parquet,
            "tsv" | "tab" => TableFormat::Tsv,
            _ => TableFormat::Csv,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            TableFormat::Csv => "csv",
            TableFormat::Tsv => "tsv",
            TableFormat::Parquet => "parquet",
        }
    }
}

/// Columns whose cells stay raw text instead of going through numeric
/// inference. Identifiers such as `00123` or `1e3` must survive ingestion
/// unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextColumns<'a> {
    /// Every column is typed from its contents.
    #[default]
    Infer,
    /// The column with this header.
    Named(&'a str),
    /// The leftmost column, whatever its header.
    First,
}

impl TextColumns<'_> {
    fn keeps(self, idx: usize, name: &str) -> bool {
        match self {
            TextColumns::Infer => false,
            TextColumns::Named(column) => column == name,
            TextColumns::First => idx == 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a table from a local file whose name does not carry the format
/// (task temp files, for example).
pub fn load_file_as(
    path: &Path,
    format: TableFormat,
    text: TextColumns<'_>,
) -> Result<RawTable, TableError> {
    let data = std::fs::read(path).map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_bytes_with(Bytes::from(data), format, text)
}

/// Parse an in-memory table, inferring the type of every column.
pub fn parse_bytes(data: Bytes, format: TableFormat) -> Result<RawTable, TableError> {
    parse_bytes_with(data, format, TextColumns::Infer)
}

/// Parse an in-memory table, keeping the `text` columns as raw strings.
pub fn parse_bytes_with(
    data: Bytes,
    format: TableFormat,
    text: TextColumns<'_>,
) -> Result<RawTable, TableError> {
    match format {
        TableFormat::Csv => parse_delimited(&data, b',', text),
        TableFormat::Tsv => parse_delimited(&data, b'\t', text),
        TableFormat::Parquet => parse_parquet(data, text),
    }
}

// ---------------------------------------------------------------------------
// CSV / TSV loader
// ---------------------------------------------------------------------------

/// Header row with column names, one record per gene. Column types are
/// inferred once here: a column is numeric when every non-null cell parses as
/// a float, text otherwise. A fully empty column counts as numeric.
///
/// Only header names are trimmed; cells keep their surrounding whitespace.
fn parse_delimited(
    data: &[u8],
    delimiter: u8,
    text: TextColumns<'_>,
) -> Result<RawTable, TableError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::Headers)
        .from_reader(data);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(TableError::NoHeader);
    }

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for result in reader.records() {
        let record = result?;
        for (col, value) in cells.iter_mut().zip(record.iter()) {
            col.push(if is_null_marker(value) {
                None
            } else {
                Some(value.to_string())
            });
        }
    }

    let columns = cells
        .into_iter()
        .enumerate()
        .map(|(idx, col)| {
            if text.keeps(idx, &headers[idx]) {
                Column::Text(col)
            } else {
                infer_column(col)
            }
        })
        .collect();
    RawTable::new(headers, columns)
}

fn is_null_marker(s: &str) -> bool {
    NULL_MARKERS.contains(&s.trim())
}

fn infer_column(cells: Vec<Option<String>>) -> Column {
    let parsed: Option<Vec<Option<f64>>> = cells
        .iter()
        .map(|cell| match cell {
            None => Some(None),
            Some(s) => s.trim().parse::<f64>().ok().map(Some),
        })
        .collect();

    match parsed {
        Some(values) => Column::Numeric(values),
        None => Column::Text(cells),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet count matrix.
///
/// Integer and float columns become numeric (NaN is read as null), string
/// columns become text, anything else is rendered to text through Arrow's
/// cast kernel. Works with files written by Pandas and Polars.
fn parse_parquet(data: Bytes, text: TextColumns<'_>) -> Result<RawTable, TableError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(data)?;
    let names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build()?;

    let mut columns: Vec<Option<Column>> = vec![None; names.len()];

    for batch_result in reader {
        let batch = batch_result?;
        for (idx, slot) in columns.iter_mut().enumerate() {
            let chunk = arrow_to_column(batch.column(idx), text.keeps(idx, &names[idx]))?;
            if let Some(existing) = slot.as_mut() {
                if !append_chunk(existing, chunk) {
                    return Err(TableError::InconsistentColumn(names[idx].clone()));
                }
            } else {
                *slot = Some(chunk);
            }
        }
    }

    let columns = columns
        .into_iter()
        .map(|c| c.unwrap_or(Column::Numeric(Vec::new())))
        .collect();
    RawTable::new(names, columns)
}

/// Append the rows of a later record batch; `false` when the types differ.
fn append_chunk(existing: &mut Column, chunk: Column) -> bool {
    match (existing, chunk) {
        (Column::Numeric(acc), Column::Numeric(more)) => acc.extend(more),
        (Column::Text(acc), Column::Text(more)) => acc.extend(more),
        _ => return false,
    }
    true
}

/// Convert one Arrow array into a typed column. `as_text` renders numbers
/// through Arrow's cast instead of reading them as floats.
fn arrow_to_column(col: &Arc<dyn Array>, as_text: bool) -> Result<Column, TableError> {
    let data_type = col.data_type();

    if data_type.is_numeric() && !as_text {
        let floats = cast(col, &DataType::Float64)?;
        let arr = floats.as_primitive::<Float64Type>();
        let values = (0..arr.len())
            .map(|i| {
                if arr.is_null(i) || arr.value(i).is_nan() {
                    None
                } else {
                    Some(arr.value(i))
                }
            })
            .collect();
        return Ok(Column::Numeric(values));
    }

    if matches!(data_type, DataType::Null) && !as_text {
        return Ok(Column::Numeric(vec![None; col.len()]));
    }

    let strings = cast(col, &DataType::Utf8)?;
    let arr = strings.as_string::<i32>();
    let values = (0..arr.len())
        .map(|i| {
            if arr.is_null(i) || is_null_marker(arr.value(i)) {
                None
            } else {
                Some(arr.value(i).to_string())
            }
        })
        .collect();
    Ok(Column::Text(values))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;
    use crate::data::model::ColumnKind;

    fn csv(text: &str) -> RawTable {
        parse_bytes(Bytes::from(text.to_string()), TableFormat::Csv).unwrap()
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(TableFormat::from_key("a/b/counts.parquet"), TableFormat::Parquet);
        assert_eq!(TableFormat::from_key("counts.PQ"), TableFormat::Parquet);
        assert_eq!(TableFormat::from_key("counts.tsv"), TableFormat::Tsv);
        assert_eq!(TableFormat::from_key("counts.csv"), TableFormat::Csv);
        assert_eq!(TableFormat::from_key("no_extension"), TableFormat::Csv);
    }

    #[test]
    fn csv_columns_are_typed_once() {
        let table = csv("SYMBOL,s1,s2\nA,10,30\nB,20,x\n");
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.column("SYMBOL").unwrap().kind(), ColumnKind::Text);
        assert_eq!(table.column("s1").unwrap().kind(), ColumnKind::Numeric);
        assert_eq!(table.column("s2").unwrap().kind(), ColumnKind::Text);
    }

    #[test]
    fn csv_null_markers_become_nulls() {
        let table = csv("SYMBOL,s1\nA,NA\n,3\n");
        assert_eq!(
            table.column("s1").unwrap(),
            &Column::Numeric(vec![None, Some(3.0)])
        );
        assert_eq!(
            table.column("SYMBOL").unwrap(),
            &Column::Text(vec![Some("A".into()), None])
        );
    }

    #[test]
    fn ragged_csv_is_an_error() {
        let err = parse_bytes(Bytes::from_static(b"SYMBOL,s1\nA,1,2\n"), TableFormat::Csv)
            .unwrap_err();
        assert!(matches!(err, TableError::Csv(_)));
    }

    #[test]
    fn empty_input_has_no_header() {
        let err = parse_bytes(Bytes::new(), TableFormat::Csv).unwrap_err();
        assert!(matches!(err, TableError::NoHeader));
    }

    #[test]
    fn tsv_uses_tabs() {
        let table = parse_bytes(
            Bytes::from_static(b"SYMBOL\ts1\nA\t1.5\n"),
            TableFormat::Tsv,
        )
        .unwrap();
        assert_eq!(table.column_names(), ["SYMBOL", "s1"]);
        assert_eq!(table.column("s1").unwrap(), &Column::Numeric(vec![Some(1.5)]));
    }

    #[test]
    fn parquet_maps_arrow_types() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("SYMBOL", DataType::Utf8, true),
            Field::new("s1", DataType::Int64, false),
            Field::new("s2", DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec![Some("A"), None])),
                Arc::new(Int64Array::from(vec![10, 20])),
                Arc::new(Float64Array::from(vec![Some(f64::NAN), Some(4.0)])),
            ],
        )
        .unwrap();

        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = parse_bytes(Bytes::from(buf), TableFormat::Parquet).unwrap();
        assert_eq!(
            table.column("SYMBOL").unwrap(),
            &Column::Text(vec![Some("A".into()), None])
        );
        assert_eq!(
            table.column("s1").unwrap(),
            &Column::Numeric(vec![Some(10.0), Some(20.0)])
        );
        assert_eq!(
            table.column("s2").unwrap(),
            &Column::Numeric(vec![None, Some(4.0)])
        );
    }

    #[test]
    fn cells_keep_their_whitespace() {
        let table = parse_bytes_with(
            Bytes::from_static(b" SYMBOL , s1\nA, 3\n A,4\n"),
            TableFormat::Csv,
            TextColumns::Named("SYMBOL"),
        )
        .unwrap();
        assert_eq!(table.column_names(), ["SYMBOL", "s1"]);
        assert_eq!(
            table.column("SYMBOL").unwrap(),
            &Column::Text(vec![Some("A".into()), Some(" A".into())])
        );
        assert_eq!(
            table.column("s1").unwrap(),
            &Column::Numeric(vec![Some(3.0), Some(4.0)])
        );
    }

    #[test]
    fn named_text_column_is_not_inferred() {
        let data = Bytes::from_static(b"SYMBOL,s1\n00123,1\n123.0,2\n1e3,3\n");

        let kept = parse_bytes_with(data.clone(), TableFormat::Csv, TextColumns::Named("SYMBOL"))
            .unwrap();
        assert_eq!(
            kept.column("SYMBOL").unwrap(),
            &Column::Text(vec![
                Some("00123".into()),
                Some("123.0".into()),
                Some("1e3".into()),
            ])
        );
        assert_eq!(kept.column("s1").unwrap().kind(), ColumnKind::Numeric);

        let inferred = parse_bytes(data, TableFormat::Csv).unwrap();
        assert_eq!(inferred.column("SYMBOL").unwrap().kind(), ColumnKind::Numeric);
    }

    #[test]
    fn first_column_can_stay_text() {
        let table = parse_bytes_with(
            Bytes::from_static(b"gene_id,Mean\n007,1\n"),
            TableFormat::Csv,
            TextColumns::First,
        )
        .unwrap();
        assert_eq!(
            table.column("gene_id").unwrap(),
            &Column::Text(vec![Some("007".into())])
        );
    }

    #[test]
    fn repeated_header_is_rejected() {
        let err = parse_bytes(Bytes::from_static(b"SYMBOL,s1,SYMBOL\nA,1,B\n"), TableFormat::Csv)
            .unwrap_err();
        assert!(matches!(err, TableError::DuplicateColumn(ref name) if name == "SYMBOL"));
    }

    #[test]
    fn parquet_integer_identifiers_can_stay_text() {
        let batch = RecordBatch::try_from_iter(vec![
            ("SYMBOL", Arc::new(Int64Array::from(vec![123, 7])) as Arc<dyn Array>),
            ("s1", Arc::new(Int64Array::from(vec![1, 2])) as Arc<dyn Array>),
        ])
        .unwrap();
        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table =
            parse_bytes_with(Bytes::from(buf), TableFormat::Parquet, TextColumns::Named("SYMBOL"))
                .unwrap();
        assert_eq!(
            table.column("SYMBOL").unwrap(),
            &Column::Text(vec![Some("123".into()), Some("7".into())])
        );
        assert_eq!(
            table.column("s1").unwrap(),
            &Column::Numeric(vec![Some(1.0), Some(2.0)])
        );
    }
}
