//! Held-out evaluation metrics

use serde::{Deserialize, Serialize};

/// Metrics reported once after fitting
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FitMetrics {
    pub mean_absolute_error: f64,
    pub r_squared: f64,
    pub train_samples: usize,
    pub test_samples: usize,
}

impl FitMetrics {
    pub fn evaluate(actual: &[f64], predicted: &[f64], train_samples: usize) -> Self {
        Self {
            mean_absolute_error: mean_absolute_error(actual, predicted),
            r_squared: r2_score(actual, predicted),
            train_samples,
            test_samples: actual.len(),
        }
    }
}

pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    debug_assert_eq!(actual.len(), predicted.len());
    if actual.is_empty() {
        return 0.0;
    }
    let total: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum();
    total / actual.len() as f64
}

/// Coefficient of determination
///
/// A constant `actual` has no variance to explain: the score is 1.0 for a
/// perfect prediction and 0.0 otherwise.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    debug_assert_eq!(actual.len(), predicted.len());
    if actual.is_empty() {
        return 0.0;
    }

    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}
