// src/measures/signal.rs
//! Small numeric helpers shared by the measures.
use ndarray::{Array1, ArrayView1};

/// Discrete derivative: central differences inside, one-sided at both ends.
pub fn gradient(values: ArrayView1<'_, f64>) -> Array1<f64> {
    let n = values.len();
    if n < 2 {
        return Array1::zeros(n);
    }
    Array1::from_shape_fn(n, |i| match i {
        0 => values[1] - values[0],
        i if i == n - 1 => values[n - 1] - values[n - 2],
        i => (values[i + 1] - values[i - 1]) / 2.0,
    })
}

/// Trapezoidal integral with unit spacing.
pub fn trapezoid(values: ArrayView1<'_, f64>) -> f64 {
    values
        .windows(2)
        .into_iter()
        .map(|pair| (pair[0] + pair[1]) / 2.0)
        .sum()
}

/// Indices of local maxima, optionally only those above `height`.
///
/// A flat-topped maximum is reported once, at the middle of its plateau
/// (rounded down). The first and last samples are never peaks.
pub fn find_peaks(values: ArrayView1<'_, f64>, height: Option<f64>) -> Vec<usize> {
    let n = values.len();
    let mut peaks = Vec::new();
    let mut i = 1;
    while i + 1 < n {
        if values[i - 1] < values[i] {
            let mut ahead = i + 1;
            while ahead + 1 < n && values[ahead] == values[i] {
                ahead += 1;
            }
            if values[ahead] < values[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    match height {
        Some(height) => peaks.into_iter().filter(|&p| values[p] > height).collect(),
        None => peaks,
    }
}

/// Index of the first maximum.
pub fn argmax(values: ArrayView1<'_, f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, top)) if v <= top => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

pub fn mean(values: ArrayView1<'_, f64>) -> Option<f64> {
    values.mean()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn gradient_matches_central_differences() {
        let g = gradient(array![1.0, 2.0, 4.0, 7.0].view());
        assert_eq!(g, array![1.0, 1.5, 2.5, 3.0]);
        assert_eq!(gradient(array![5.0].view()), array![0.0]);
    }

    #[test]
    fn trapezoid_integrates_unit_spacing() {
        assert_eq!(trapezoid(array![0.0, 2.0, 2.0].view()), 3.0);
        assert_eq!(trapezoid(array![4.0].view()), 0.0);
    }

    #[test]
    fn peaks_with_plateaus_and_height() {
        let trace = array![0.0, 3.0, 0.0, 1.0, 5.0, 5.0, 5.0, 1.0, 2.0];
        assert_eq!(find_peaks(trace.view(), None), vec![1, 5]);
        assert_eq!(find_peaks(trace.view(), Some(4.0)), vec![5]);
        assert!(find_peaks(array![1.0, 2.0, 3.0].view(), None).is_empty());
    }

    #[test]
    fn argmax_returns_first_maximum() {
        assert_eq!(argmax(array![1.0, 4.0, 4.0, 2.0].view()), Some(1));
        assert_eq!(argmax(Array1::<f64>::zeros(0).view()), None);
    }
}
