// src/report/summary.rs

use super::SlideResult;

/// Column statistics across slides for one class.
///
/// `std` is the sample standard deviation (n − 1) and is `None` with fewer
/// than two slides; everything is `None` with no slides at all.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClassStats {
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// One `ClassStats` per tissue class, in column order.
pub fn summarize(results: &[SlideResult]) -> [ClassStats; 6] {
    let mut out = [ClassStats::default(); 6];
    for (col, stats) in out.iter_mut().enumerate() {
        let values: Vec<f64> = results.iter().map(|r| r.percentages.0[col]).collect();
        *stats = column_stats(&values);
    }
    out
}

fn column_stats(values: &[f64]) -> ClassStats {
    if values.is_empty() {
        return ClassStats::default();
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = (values.len() > 1).then(|| {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        var.sqrt()
    });
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    ClassStats {
        mean: Some(mean),
        std,
        min: Some(min),
        max: Some(max),
    }
}
