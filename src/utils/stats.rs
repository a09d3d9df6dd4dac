//! Summary statistics for training diagnostics
//!
//! Accumulation happens in `f64` so that long episode windows and large
//! batches do not lose precision.

/// Mean of the values, or `NaN` when there are none
pub fn safe_mean<I>(values: I) -> f64
where
    I: IntoIterator,
    I::Item: Into<f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0_f64, 0_usize), |(sum, count), v| (sum + v.into(), count + 1));

    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Mean and population standard deviation of `values`
///
/// Returns `(0.0, 0.0)` for an empty slice.
pub fn mean_std(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    (mean as f32, var.sqrt() as f32)
}

/// Fraction of the variance in `targets` explained by `predictions`
///
/// `1 - Var[targets - predictions] / Var[targets]`: 1 is a perfect fit,
/// 0 is no better than predicting the mean, negative is worse. `NaN` when
/// the targets have zero variance.
pub fn explained_variance(predictions: &[f32], targets: &[f32]) -> f64 {
    assert_eq!(
        predictions.len(),
        targets.len(),
        "predictions and targets must have the same length"
    );

    let (_, target_std) = mean_std(targets);
    let var_y = (target_std as f64).powi(2);
    if var_y == 0.0 {
        return f64::NAN;
    }

    let residuals: Vec<f32> = targets
        .iter()
        .zip(predictions)
        .map(|(&y, &p)| y - p)
        .collect();
    let (_, residual_std) = mean_std(&residuals);

    1.0 - (residual_std as f64).powi(2) / var_y
}
