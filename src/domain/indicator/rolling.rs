//! Rolling max/min over a trailing window, minimum one observation.

pub fn rolling_max(series: &[f64], window: usize) -> Vec<f64> {
    rolling_fold(series, window, f64::max)
}

pub fn rolling_min(series: &[f64], window: usize) -> Vec<f64> {
    rolling_fold(series, window, f64::min)
}

fn rolling_fold(series: &[f64], window: usize, pick: fn(f64, f64) -> f64) -> Vec<f64> {
    let window = window.max(1);
    (0..series.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            series[start..=i]
                .iter()
                .copied()
                .fold(f64::NAN, pick)
        })
        .collect()
}
