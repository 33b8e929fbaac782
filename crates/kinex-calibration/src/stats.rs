//! Descriptive statistics over angle samples
//!
//! All functions take unsorted slices and return `None` for empty input.

/// Arithmetic mean
pub fn mean(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f32>() / values.len() as f32)
}

/// Population standard deviation
pub fn std_dev(values: &[f32]) -> Option<f32> {
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f32>() / values.len() as f32;
    Some(var.sqrt())
}

fn sorted(values: &[f32]) -> Vec<f32> {
    let mut out: Vec<f32> = values.iter().copied().filter(|v| v.is_finite()).collect();
    out.sort_by(|a, b| a.total_cmp(b));
    out
}

/// Linear-interpolated quantile of sorted data, `q` in [0, 1]
fn quantile_sorted(sorted: &[f32], q: f32) -> Option<f32> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f32;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f32;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Median
pub fn median(values: &[f32]) -> Option<f32> {
    quantile_sorted(&sorted(values), 0.5)
}

/// First and third quartile
pub fn quartiles(values: &[f32]) -> Option<(f32, f32)> {
    let s = sorted(values);
    Some((quantile_sorted(&s, 0.25)?, quantile_sorted(&s, 0.75)?))
}

/// Median after discarding values outside the Tukey fence
/// `[Q1 − 1.5·IQR, Q3 + 1.5·IQR]`.
///
/// Falls back to the plain median if the fence removes everything.
pub fn robust_median(values: &[f32]) -> Option<f32> {
    let s = sorted(values);
    let q1 = quantile_sorted(&s, 0.25)?;
    let q3 = quantile_sorted(&s, 0.75)?;
    let iqr = q3 - q1;
    let (lo, hi) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

    let kept: Vec<f32> = s.iter().copied().filter(|v| *v >= lo && *v <= hi).collect();
    if kept.is_empty() {
        return quantile_sorted(&s, 0.5);
    }
    quantile_sorted(&kept, 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty() {
        assert_eq!(mean(&[]), None);
        assert_eq!(std_dev(&[]), None);
        assert_eq!(median(&[]), None);
        assert_eq!(robust_median(&[]), None);
    }

    #[test]
    fn test_basic_stats() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&v), Some(5.0));
        assert_eq!(std_dev(&v), Some(2.0));
        assert_eq!(median(&v), Some(4.5));
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
    }

    #[test]
    fn test_quartiles() {
        let (q1, q3) = quartiles(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(q1, 2.0);
        assert_eq!(q3, 4.0);
    }

    #[test]
    fn test_robust_median_drops_spike() {
        let v = [170.0, 171.0, 169.0, 170.5, 169.5, 170.0, 10.0];
        assert!((robust_median(&v).unwrap() - 170.0).abs() < 0.01);
        // The mean is dragged down by the spike
        assert!(mean(&v).unwrap() < 150.0);
    }

    #[test]
    fn test_robust_median_constant() {
        assert_eq!(robust_median(&[42.0; 5]), Some(42.0));
    }

    proptest! {
        #[test]
        fn prop_robust_median_ignores_outliers(
            n in 12usize..40,
            center in 20.0f32..160.0,
            outlier_signs in prop::collection::vec(any::<bool>(), 0..10),
        ) {
            // Evenly spread clean samples, so the fence never trims one of them
            let good: Vec<f32> = (0..n)
                .map(|i| center - 1.0 + 2.0 * i as f32 / (n - 1) as f32)
                .collect();
            // At most a quarter of the clean sample count
            let k = outlier_signs.len().min(good.len() / 4);
            let mut data = good.clone();
            for &high in &outlier_signs[..k] {
                data.push(if high { 1000.0 } else { -1000.0 });
            }

            let clean = median(&good).unwrap();
            let robust = robust_median(&data).unwrap();
            prop_assert!((robust - clean).abs() < 1e-3, "robust={} clean={}", robust, clean);
        }

        #[test]
        fn prop_std_dev_non_negative(values in prop::collection::vec(0.0f32..180.0, 1..50)) {
            prop_assert!(std_dev(&values).unwrap() >= 0.0);
        }
    }
}
