//! Simple moving average. NaN until `period` observations are available.

pub fn sma(series: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        return vec![f64::NAN; series.len()];
    }

    let mut out = Vec::with_capacity(series.len());
    let mut sum = 0.0;

    for (i, &x) in series.iter().enumerate() {
        sum += x;
        if i >= period {
            sum -= series[i - period];
        }
        if i + 1 >= period {
            out.push(sum / period as f64);
        } else {
            out.push(f64::NAN);
        }
    }

    out
}
