//! Utility functions for isim

use std::cmp::Ordering;

use ndarray::ArrayView1;

use crate::error::{Error, Result};

/// Indices that sort `values` ascending.
///
/// The sort is stable, so equal values keep their original index order.
/// NaN values, whatever their sign bit, are placed after every number.
pub fn argsort(values: &ArrayView1<f64>) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_by(|&a, &b| {
        let (x, y) = (values[a], values[b]);
        match (x.is_nan(), y.is_nan()) {
            (false, false) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (x_nan, y_nan) => x_nan.cmp(&y_nan),
        }
    });
    indices
}

/// Index of the first minimum, ignoring NaN.
///
/// Returns `None` for an empty array and `Some(0)` when every value is NaN.
pub fn argmin(values: &ArrayView1<f64>) -> Option<usize> {
    first_extreme(values, |candidate, best| candidate < best)
}

/// Index of the first maximum, ignoring NaN.
///
/// Returns `None` for an empty array and `Some(0)` when every value is NaN.
pub fn argmax(values: &ArrayView1<f64>) -> Option<usize> {
    first_extreme(values, |candidate, best| candidate > best)
}

fn first_extreme(values: &ArrayView1<f64>, better: impl Fn(f64, f64) -> bool) -> Option<usize> {
    if values.is_empty() {
        return None;
    }

    let mut best: Option<(usize, f64)> = None;
    for (idx, &value) in values.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, best_value)) if !better(value, best_value) => {}
            _ => best = Some((idx, value)),
        }
    }

    Some(best.map(|(idx, _)| idx).unwrap_or(0))
}

/// Number of objects covered by `percentage` percent of `n_objects`, rounded down.
pub fn percentage_count(n_objects: usize, percentage: f64) -> usize {
    (n_objects as f64 * percentage / 100.0).floor() as usize
}

/// Reject percentages outside `(0, 100]`.
pub fn validate_percentage(percentage: f64) -> Result<()> {
    if !(percentage > 0.0 && percentage <= 100.0) {
        return Err(Error::Config(format!(
            "percentage must be in (0, 100], got {}",
            percentage
        )));
    }
    Ok(())
}
