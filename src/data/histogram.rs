/// One histogram bin covering `[start, end)`; the last bin also holds `end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

impl Bin {
    pub fn center(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    pub fn width(&self) -> f64 {
        self.end - self.start
    }
}

/// Fixed-width histogram over the finite values it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub bins: Vec<Bin>,
    /// Values left out by the right-tail cutoff.
    pub clipped: usize,
}

impl Histogram {
    /// Bin the values at or below the `percentile` cutoff (`0..=100`) into
    /// `n_bins` equal-width bins. Non-finite values are ignored.
    pub fn with_cutoff(values: &[f64], n_bins: usize, percentile: f64) -> Self {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let Some(cutoff) = self::percentile(&finite, percentile) else {
            return Histogram {
                bins: Vec::new(),
                clipped: 0,
            };
        };
        let kept: Vec<f64> = finite.iter().copied().filter(|&v| v <= cutoff).collect();
        let mut hist = Histogram::new(&kept, n_bins);
        hist.clipped = finite.len() - kept.len();
        hist
    }

    /// Bin all finite values into `n_bins` equal-width bins spanning their
    /// range. A constant input gets a unit-wide range centred on the value.
    pub fn new(values: &[f64], n_bins: usize) -> Self {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() || n_bins == 0 {
            return Histogram {
                bins: Vec::new(),
                clipped: 0,
            };
        }

        let mut lo = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let mut hi = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if (hi - lo).abs() < f64::EPSILON {
            lo -= 0.5;
            hi += 0.5;
        }
        let width = (hi - lo) / n_bins as f64;

        let mut bins: Vec<Bin> = (0..n_bins)
            .map(|i| Bin {
                start: lo + i as f64 * width,
                end: lo + (i + 1) as f64 * width,
                count: 0,
            })
            .collect();

        for v in finite {
            let idx = (((v - lo) / width) as usize).min(n_bins - 1);
            bins[idx].count += 1;
        }

        Histogram { bins, clipped: 0 }
    }

    pub fn total(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }
}

/// Percentile with linear interpolation between closest ranks.
pub fn percentile(values: &[f64], pct: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates() {
        let v: Vec<f64> = (1..=5).map(f64::from).collect();
        assert_eq!(percentile(&v, 50.0), Some(3.0));
        assert_eq!(percentile(&v, 100.0), Some(5.0));
        assert!((percentile(&v, 95.0).unwrap() - 4.8).abs() < 1e-12);
        assert_eq!(percentile(&[], 95.0), None);
    }

    #[test]
    fn every_value_lands_in_a_bin() {
        let v: Vec<f64> = (0..100).map(f64::from).collect();
        let h = Histogram::new(&v, 30);
        assert_eq!(h.bins.len(), 30);
        assert_eq!(h.total(), 100);
        assert!((h.bins.last().unwrap().end - 99.0).abs() < 1e-9);
    }

    #[test]
    fn constant_values_get_one_populated_bin() {
        let h = Histogram::new(&[2.0, 2.0, 2.0], 4);
        assert_eq!(h.total(), 3);
        assert_eq!(h.bins.iter().filter(|b| b.count > 0).count(), 1);
    }

    #[test]
    fn cutoff_drops_the_right_tail() {
        let mut v: Vec<f64> = (0..99).map(f64::from).collect();
        v.push(1e9);
        let h = Histogram::with_cutoff(&v, 30, 95.0);
        assert!(h.clipped >= 1);
        assert_eq!(h.total() + h.clipped, 100);
        assert!(h.bins.last().unwrap().end < 1e9);
    }

    #[test]
    fn empty_input_is_an_empty_histogram() {
        assert!(Histogram::with_cutoff(&[f64::NAN], 30, 95.0).bins.is_empty());
    }
}
