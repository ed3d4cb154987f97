use std::collections::HashSet;

use super::model::{Column, CountMatrix, RawTable};
use crate::error::{IdentifierFault, SampleFault, ValidationError};

/// Identifier column used when nothing else is configured.
pub const DEFAULT_IDENTIFIER_COLUMN: &str = "SYMBOL";

/// Check an ingested table and turn it into a [`CountMatrix`].
///
/// Rules run in order and the first violation wins:
/// 1. the identifier column exists,
/// 2. identifiers are non-null and unique,
/// 3. every other column is numeric, non-null, finite and `>= 0`.
///
/// Row numbers in errors are zero-based data-row indices.
pub fn validate(table: &RawTable, identifier_column: &str) -> Result<CountMatrix, ValidationError> {
    let Some(id_col) = table.column(identifier_column) else {
        log::error!("{identifier_column} column is missing from the dataset");
        return Err(ValidationError::MissingColumn {
            column: identifier_column.to_string(),
        });
    };

    log::info!("Validating {identifier_column} column...");
    let identifiers = validate_identifiers(id_col).map_err(|fault| {
        log::error!("Validation error: {identifier_column} column {fault}");
        ValidationError::InvalidIdentifier {
            column: identifier_column.to_string(),
            fault,
        }
    })?;

    log::info!("Validating sample columns...");
    let (sample_names, samples) =
        validate_samples(table, identifier_column).map_err(|fault| {
            log::error!("Validation error: {fault}");
            ValidationError::InvalidSampleData { fault }
        })?;

    Ok(CountMatrix::new(
        identifier_column.to_string(),
        identifiers,
        sample_names,
        samples,
    ))
}

/// Identifiers are compared exactly as ingested. Loaders keep the identifier
/// column as text (see [`TextColumns`](super::loader::TextColumns)); a numeric
/// column built elsewhere is rendered through `f64` formatting.
fn validate_identifiers(col: &Column) -> Result<Vec<String>, IdentifierFault> {
    let values: Vec<Option<String>> = match col {
        Column::Text(v) => v.clone(),
        Column::Numeric(v) => v.iter().map(|c| c.map(|x| x.to_string())).collect(),
    };

    if let Some(row) = values.iter().position(Option::is_none) {
        return Err(IdentifierFault::Null { row });
    }
    let identifiers: Vec<String> = values.into_iter().flatten().collect();

    let mut seen = HashSet::with_capacity(identifiers.len());
    for (row, id) in identifiers.iter().enumerate() {
        if !seen.insert(id.as_str()) {
            return Err(IdentifierFault::Duplicate {
                value: id.clone(),
                row,
            });
        }
    }
    Ok(identifiers)
}

fn validate_samples(
    table: &RawTable,
    identifier_column: &str,
) -> Result<(Vec<String>, Vec<Vec<f64>>), SampleFault> {
    let mut names = Vec::new();
    let mut samples = Vec::new();

    for (name, col) in table.columns() {
        if name == identifier_column {
            continue;
        }
        let cells = col.as_numeric().ok_or_else(|| SampleFault::NotNumeric {
            column: name.to_string(),
        })?;

        let mut values = Vec::with_capacity(cells.len());
        for (row, cell) in cells.iter().enumerate() {
            let value = cell.ok_or_else(|| SampleFault::Null {
                column: name.to_string(),
                row,
            })?;
            if !value.is_finite() {
                return Err(SampleFault::NotFinite {
                    column: name.to_string(),
                    row,
                });
            }
            if value < 0.0 {
                return Err(SampleFault::Negative {
                    column: name.to_string(),
                    row,
                    value,
                });
            }
            values.push(value);
        }
        names.push(name.to_string());
        samples.push(values);
    }

    if names.is_empty() {
        return Err(SampleFault::NoSampleColumns);
    }
    Ok((names, samples))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: Vec<(&str, Column)>) -> RawTable {
        let (names, cols): (Vec<_>, Vec<_>) = columns
            .into_iter()
            .map(|(n, c)| (n.to_string(), c))
            .unzip();
        RawTable::new(names, cols).unwrap()
    }

    fn text(values: &[Option<&str>]) -> Column {
        Column::Text(values.iter().map(|v| v.map(str::to_string)).collect())
    }

    fn numeric(values: &[Option<f64>]) -> Column {
        Column::Numeric(values.to_vec())
    }

    #[test]
    fn accepts_a_well_formed_matrix() {
        let t = table(vec![
            ("SYMBOL", text(&[Some("A"), Some("B")])),
            ("s1", numeric(&[Some(10.0), Some(20.0)])),
            ("s2", numeric(&[Some(30.0), Some(0.0)])),
        ]);
        let m = validate(&t, "SYMBOL").unwrap();
        assert_eq!(m.identifiers(), ["A", "B"]);
        assert_eq!(m.sample_names(), ["s1", "s2"]);
        assert_eq!(m.row(1), vec![20.0, 0.0]);
    }

    #[test]
    fn identifier_may_sit_anywhere() {
        let t = table(vec![
            ("s1", numeric(&[Some(1.0)])),
            ("SYMBOL", text(&[Some("A")])),
            ("s2", numeric(&[Some(2.0)])),
        ]);
        let m = validate(&t, "SYMBOL").unwrap();
        assert_eq!(m.sample_names(), ["s1", "s2"]);
    }

    #[test]
    fn missing_identifier_column() {
        let t = table(vec![("gene", text(&[Some("A")])), ("s1", numeric(&[Some(1.0)]))]);
        assert_eq!(
            validate(&t, "SYMBOL").unwrap_err(),
            ValidationError::MissingColumn {
                column: "SYMBOL".into()
            }
        );
    }

    #[test]
    fn null_identifier() {
        let t = table(vec![
            ("SYMBOL", text(&[Some("A"), None])),
            ("s1", numeric(&[Some(1.0), Some(2.0)])),
        ]);
        assert!(matches!(
            validate(&t, "SYMBOL").unwrap_err(),
            ValidationError::InvalidIdentifier {
                fault: IdentifierFault::Null { row: 1 },
                ..
            }
        ));
    }

    #[test]
    fn duplicate_identifier() {
        let t = table(vec![
            ("SYMBOL", text(&[Some("A"), Some("B"), Some("A")])),
            ("s1", numeric(&[Some(1.0), Some(2.0), Some(3.0)])),
        ]);
        let err = validate(&t, "SYMBOL").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidIdentifier {
                column: "SYMBOL".into(),
                fault: IdentifierFault::Duplicate {
                    value: "A".into(),
                    row: 2
                },
            }
        );
    }

    #[test]
    fn identifier_checked_before_samples() {
        // both rules are broken; the identifier rule must be reported
        let t = table(vec![
            ("SYMBOL", text(&[Some("A"), Some("A")])),
            ("s1", numeric(&[Some(-1.0), Some(2.0)])),
        ]);
        assert!(matches!(
            validate(&t, "SYMBOL").unwrap_err(),
            ValidationError::InvalidIdentifier { .. }
        ));
    }

    #[test]
    fn negative_sample() {
        let t = table(vec![
            ("SYMBOL", text(&[Some("A"), Some("B")])),
            ("s1", numeric(&[Some(1.0), Some(-0.5)])),
        ]);
        assert!(matches!(
            validate(&t, "SYMBOL").unwrap_err(),
            ValidationError::InvalidSampleData {
                fault: SampleFault::Negative { row: 1, .. }
            }
        ));
    }

    #[test]
    fn null_sample() {
        let t = table(vec![
            ("SYMBOL", text(&[Some("A")])),
            ("s1", numeric(&[None])),
        ]);
        assert!(matches!(
            validate(&t, "SYMBOL").unwrap_err(),
            ValidationError::InvalidSampleData {
                fault: SampleFault::Null { .. }
            }
        ));
    }

    #[test]
    fn text_sample_column() {
        let t = table(vec![
            ("SYMBOL", text(&[Some("A")])),
            ("s1", text(&[Some("high")])),
        ]);
        assert!(matches!(
            validate(&t, "SYMBOL").unwrap_err(),
            ValidationError::InvalidSampleData {
                fault: SampleFault::NotNumeric { .. }
            }
        ));
    }

    #[test]
    fn infinite_sample() {
        let t = table(vec![
            ("SYMBOL", text(&[Some("A")])),
            ("s1", numeric(&[Some(f64::INFINITY)])),
        ]);
        assert!(matches!(
            validate(&t, "SYMBOL").unwrap_err(),
            ValidationError::InvalidSampleData {
                fault: SampleFault::NotFinite { .. }
            }
        ));
    }

    #[test]
    fn no_sample_columns() {
        let t = table(vec![("SYMBOL", text(&[Some("A")]))]);
        assert!(matches!(
            validate(&t, "SYMBOL").unwrap_err(),
            ValidationError::InvalidSampleData {
                fault: SampleFault::NoSampleColumns
            }
        ));
    }

    #[test]
    fn numeric_identifiers_are_rendered_as_text() {
        let t = table(vec![
            ("SYMBOL", numeric(&[Some(7157.0), Some(672.0)])),
            ("s1", numeric(&[Some(1.0), Some(2.0)])),
        ]);
        let m = validate(&t, "SYMBOL").unwrap();
        assert_eq!(m.identifiers(), ["7157", "672"]);
    }

    fn parsed(csv: &'static str) -> RawTable {
        use crate::data::loader::{parse_bytes_with, TableFormat, TextColumns};
        parse_bytes_with(
            bytes::Bytes::from_static(csv.as_bytes()),
            TableFormat::Csv,
            TextColumns::Named("SYMBOL"),
        )
        .unwrap()
    }

    #[test]
    fn whitespace_makes_identifiers_distinct() {
        let m = validate(&parsed("SYMBOL,s1,s2\nA,1,2\n A,3,4\n"), "SYMBOL").unwrap();
        assert_eq!(m.identifiers(), ["A", " A"]);
    }

    #[test]
    fn numeric_looking_identifiers_stay_verbatim() {
        let m = validate(&parsed("SYMBOL,s1\n00123,1\n123.0,2\n1e3,3\n"), "SYMBOL").unwrap();
        assert_eq!(m.identifiers(), ["00123", "123.0", "1e3"]);

        let summary = crate::data::summarize(&m);
        let ids: Vec<&str> = summary.rows.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, ["00123", "123.0", "1e3"]);
    }

    #[test]
    fn exact_repeats_are_still_duplicates() {
        let err = validate(&parsed("SYMBOL,s1\n00123,1\n00123,2\n"), "SYMBOL").unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidIdentifier {
                fault: IdentifierFault::Duplicate { ref value, row: 1 },
                ..
            } if value == "00123"
        ));
    }
}
