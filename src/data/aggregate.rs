use super::model::{CountMatrix, SummaryRow, SummaryTable};

/// Compute per-row Mean, Median and StdDev over the sample columns.
///
/// StdDev is the *sample* standard deviation (denominator `n - 1`), so it is
/// undefined for a matrix with a single sample column. Output rows keep the
/// input order and carry the original sample values unchanged.
pub fn summarize(matrix: &CountMatrix) -> SummaryTable {
    log::info!(
        "Calculating Mean, Median, and StdDev for {} rows over {} samples...",
        matrix.n_rows(),
        matrix.sample_names().len()
    );

    let rows = matrix
        .identifiers()
        .iter()
        .enumerate()
        .map(|(idx, identifier)| {
            let samples = matrix.row(idx);
            SummaryRow {
                identifier: identifier.clone(),
                mean: mean(&samples).unwrap_or(f64::NAN),
                median: median(&samples).unwrap_or(f64::NAN),
                std_dev: sample_std_dev(&samples),
                samples,
            }
        })
        .collect();

    log::info!("RNA-Seq data processing completed successfully.");

    SummaryTable {
        identifier_column: matrix.identifier_column().to_string(),
        sample_names: matrix.sample_names().to_vec(),
        rows,
    }
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median; the average of the two middle values for even lengths.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Sample standard deviation (Bessel-corrected), `None` for fewer than two
/// values.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((sum_sq / (values.len() - 1) as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Column, RawTable};
    use crate::data::validate::validate;

    const EPS: f64 = 1e-9;

    fn matrix(ids: &[&str], samples: &[(&str, &[f64])]) -> CountMatrix {
        let mut names = vec!["SYMBOL".to_string()];
        let mut cols = vec![Column::Text(
            ids.iter().map(|s| Some(s.to_string())).collect(),
        )];
        for (name, values) in samples {
            names.push(name.to_string());
            cols.push(Column::Numeric(values.iter().copied().map(Some).collect()));
        }
        validate(&RawTable::new(names, cols).unwrap(), "SYMBOL").unwrap()
    }

    #[test]
    fn two_gene_example() {
        let m = matrix(&["A", "B"], &[("s1", &[10.0, 20.0]), ("s2", &[30.0, 40.0])]);
        let s = summarize(&m);

        assert_eq!(s.headers(), ["SYMBOL", "Mean", "Median", "StdDev", "s1", "s2"]);
        assert_eq!(s.len(), 2);

        let a = &s.rows[0];
        assert_eq!(a.identifier, "A");
        assert!((a.mean - 20.0).abs() < EPS);
        assert!((a.median - 20.0).abs() < EPS);
        assert!((a.std_dev.unwrap() - 200f64.sqrt()).abs() < EPS);
        assert_eq!(a.samples, vec![10.0, 30.0]);

        let b = &s.rows[1];
        assert_eq!(b.identifier, "B");
        assert!((b.mean - 30.0).abs() < EPS);
        assert!((b.median - 30.0).abs() < EPS);
        assert!((b.std_dev.unwrap() - 14.142135623730951).abs() < EPS);
    }

    #[test]
    fn std_dev_uses_n_minus_one() {
        // population sd of [2,4,4,4,5,5,7,9] is 2, the sample sd is sqrt(32/7)
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((sample_std_dev(&v).unwrap() - (32.0f64 / 7.0).sqrt()).abs() < EPS);
    }

    #[test]
    fn single_sample_has_undefined_std_dev() {
        assert_eq!(sample_std_dev(&[3.0]), None);
        let m = matrix(&["A"], &[("s1", &[3.0])]);
        let s = summarize(&m);
        assert_eq!(s.rows[0].std_dev, None);
        assert_eq!(s.rows[0].mean, 3.0);
        assert_eq!(s.rows[0].median, 3.0);
    }

    #[test]
    fn median_of_odd_and_even_rows() {
        assert_eq!(median(&[5.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn mean_matches_average_per_row() {
        let m = matrix(
            &["A", "B", "C"],
            &[
                ("s1", &[0.0, 1.5, 1000.0]),
                ("s2", &[0.0, 2.5, 0.0]),
                ("s3", &[0.0, 7.0, 3.0]),
            ],
        );
        let s = summarize(&m);
        for (idx, row) in s.rows.iter().enumerate() {
            let values = m.row(idx);
            let expected = values.iter().sum::<f64>() / values.len() as f64;
            assert!((row.mean - expected).abs() < EPS);
            assert!(row.std_dev.unwrap().is_finite());
        }
    }

    #[test]
    fn empty_matrix_summarizes_to_empty_table() {
        let m = matrix(&[], &[("s1", &[]), ("s2", &[])]);
        let s = summarize(&m);
        assert!(s.is_empty());
        assert_eq!(s.sample_names, vec!["s1", "s2"]);
    }
}
