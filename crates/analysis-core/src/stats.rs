//! Small statistics helpers shared by the indicator calculators.
//!
//! Every helper returns `None` instead of a sentinel when the statistic is not
//! computable, so callers keep "undefined" distinct from zero.

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Sample standard deviation (n - 1 denominator). `None` below two observations.
pub fn sample_std_dev(data: &[f64]) -> Option<f64> {
    if data.len() < 2 {
        return None;
    }
    let m = mean(data)?;
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Apply `f` over every trailing window of `window` values.
///
/// The output has one entry per input entry. Entry `i` is `None` while
/// `i < window - 1` or when any value inside `values[i + 1 - window..=i]` is
/// undefined; otherwise it is `f(window_values)`. Only values at indices `<= i`
/// are ever read.
pub fn rolling<F>(values: &[Option<f64>], window: usize, f: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    let mut out = vec![None; values.len()];
    if window == 0 {
        return out;
    }

    let mut buf = Vec::with_capacity(window);
    for i in window.saturating_sub(1)..values.len() {
        buf.clear();
        buf.extend(values[i + 1 - window..=i].iter().map_while(|v| *v));
        if buf.len() == window {
            out[i] = f(&buf);
        }
    }
    out
}

/// Trailing mean over a series without gaps.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let wrapped: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
    rolling(&wrapped, window, mean)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert!((mean(&[1.0, 2.0, 3.0]).unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_sample_std_dev() {
        assert_eq!(sample_std_dev(&[5.0]), None);
        // Sample variance of 2,4,4,4,5,5,7,9 is 32/7
        let sd = sample_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((sd - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_rolling_leading_values_undefined() {
        let out = rolling_mean(&[1.0, 2.0, 3.0, 4.0], 3);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert!((out[2].unwrap() - 2.0).abs() < 1e-12);
        assert!((out[3].unwrap() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_rolling_gap_poisons_window() {
        let values = vec![Some(1.0), None, Some(3.0), Some(4.0), Some(5.0)];
        let out = rolling(&values, 2, mean);
        assert_eq!(out[1], None);
        assert_eq!(out[2], None);
        assert!((out[3].unwrap() - 3.5).abs() < 1e-12);
        assert!((out[4].unwrap() - 4.5).abs() < 1e-12);
    }

    #[test]
    fn test_rolling_window_longer_than_series() {
        let out = rolling_mean(&[1.0, 2.0], 5);
        assert_eq!(out, vec![None, None]);
    }

    #[test]
    fn test_rolling_zero_window() {
        assert_eq!(rolling_mean(&[1.0, 2.0], 0), vec![None, None]);
    }
}
