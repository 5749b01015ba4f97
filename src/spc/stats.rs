//! Small numeric helpers shared by limit and capability computation.
//!
//! Callers guarantee non-empty, finite input; subgroups are validated at
//! the chart boundary before anything here runs.

/// Arithmetic mean.
pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator). Zero for fewer than
/// two values.
pub(crate) fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// Range (max - min).
pub(crate) fn range(values: &[f64]) -> f64 {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
    }
    max - min
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert!((mean(&[1.0, 2.0, 3.0]) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_sample_std_dev() {
        // Textbook: {2, 4, 4, 4, 5, 5, 7, 9} has sample sd ~ 2.138
        let sd = sample_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((sd - 2.138).abs() < 0.001);
    }

    #[test]
    fn test_sample_std_dev_constant() {
        assert_eq!(sample_std_dev(&[5.0, 5.0, 5.0]), 0.0);
    }

    #[test]
    fn test_range() {
        assert!((range(&[1.0, 5.0, 3.0]) - 4.0).abs() < f64::EPSILON);
        assert_eq!(range(&[10.0, 10.0]), 0.0);
    }
}
