//! Moving-average smoothing for per-timestep series.

/// Uniform moving average over `window` values.
///
/// The core is a "valid" convolution, one value per full window, so the
/// result is `window - 1` shorter than the input. With `append_to_len` the
/// result is padded back to the input length: the value at index `i` is the
/// mean of `values[i - look_back..]`, the last few points through the end of
/// the series.
pub fn moving_average(
    values: &[f64],
    window: usize,
    append_to_len: bool,
    look_back: usize,
) -> Vec<f64> {
    let window = window.max(1);
    let n = values.len();

    let mut filtered = Vec::with_capacity(n);
    if n >= window {
        let mut sum: f64 = values[..window].iter().sum();
        filtered.push(sum / window as f64);
        for i in window..n {
            sum += values[i] - values[i - window];
            filtered.push(sum / window as f64);
        }
    }

    if append_to_len {
        for i in filtered.len()..n {
            let tail = &values[i.saturating_sub(look_back)..];
            filtered.push(tail.iter().sum::<f64>() / tail.len() as f64);
        }
    }

    filtered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn test_valid_mode_length() {
        let v: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        let out = moving_average(&v, 3, false, 2);
        assert_eq!(out.len(), 8);
        assert!(close(&out[..2], &[2.0, 3.0]));
    }

    #[test]
    fn test_padded_to_input_length() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        let out = moving_average(&v, 3, true, 2);
        // valid part: [2, 3, 4]; padding at i=3 -> mean(v[1..]) , i=4 -> mean(v[2..])
        assert!(close(&out, &[2.0, 3.0, 4.0, 3.5, 4.0]));
    }

    #[test]
    fn test_window_longer_than_series() {
        let v = [2.0, 4.0];
        let out = moving_average(&v, 10, true, 2);
        assert!(close(&out, &[3.0, 3.0]));
        assert!(moving_average(&v, 10, false, 2).is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(moving_average(&[], 10, true, 2).is_empty());
    }

    #[test]
    fn test_constant_series_unchanged() {
        let v = vec![0.25; 30];
        let out = moving_average(&v, 10, true, 2);
        assert_eq!(out.len(), 30);
        assert!(out.iter().all(|x| (x - 0.25).abs() < 1e-12));
    }
}
