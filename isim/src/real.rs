//! iSIM for real-valued fingerprints.
//!
//! Real-valued features (scaled to `[0, 1]`) have no match/mismatch counters.
//! Instead, the sum of all pairwise inner products is recovered from the column
//! sums `S` and column sums of squares `Q`:
//!
//! ```text
//! Σ_{i<j} x_i · x_j = ½ Σ_col (S² − Q)
//! ```
//!
//! which gives RR, JT and SM in O(n·m). Complementary similarity uses the same
//! identity on `S − x_i` and `Q − x_i²`.

use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;

use crate::comp::check_fingerprints;
use crate::error::{Error, Result};
use crate::similarity::SimilarityIndex;
use crate::utils::{argmax, argmin};

/// Column sums and column sums of squares of a real-valued set.
struct MomentSums {
    sum: Array1<f64>,
    sq_sum: Array1<f64>,
}

impl MomentSums {
    fn new(data: &ArrayView2<f64>) -> Self {
        Self {
            sum: data.sum_axis(Axis(0)),
            sq_sum: data.mapv(|x| x * x).sum_axis(Axis(0)),
        }
    }

    fn flipped(data: &ArrayView2<f64>) -> Self {
        Self::new(&data.mapv(|x| 1.0 - x).view())
    }

    /// Sum of the pairwise inner products and total squared norm.
    fn inner_products(&self) -> (f64, f64) {
        let total_sq: f64 = self.sq_sum.sum();
        let sq_of_sum: f64 = self.sum.iter().map(|s| s * s).sum();
        (0.5 * (sq_of_sum - total_sq), total_sq)
    }

    /// Same as `inner_products`, with `row` left out.
    fn inner_products_without(&self, row: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
        let sq_of_sum: f64 = self
            .sum
            .iter()
            .zip(row.clone())
            .map(|(s, x)| (s - x) * (s - x))
            .sum();
        let total_sq: f64 = self.sq_sum.iter().zip(row).map(|(q, x)| q - x * x).sum();
        (0.5 * (sq_of_sum - total_sq), total_sq)
    }
}

fn unsupported(index: SimilarityIndex) -> Error {
    Error::UnsupportedIndex(format!(
        "{} has no real-valued form, use RR, JT or SM",
        index
    ))
}

/// Average of `2·inner/(m·n·(n−1))`, shared by RR and SM.
fn pair_average(inner: f64, m: usize, n: usize) -> f64 {
    let n = n as f64;
    2.0 * inner / (m as f64 * n * (n - 1.0))
}

/// Calculate the iSIM of a set of real-valued fingerprints.
///
/// Only RR, JT and SM are defined for real values.
pub fn calculate_isim_real(data: &ArrayView2<f64>, index: SimilarityIndex) -> Result<f64> {
    check_fingerprints(data)?;
    let n = data.nrows();
    let m = data.ncols();
    let moments = MomentSums::new(data);
    let (ij, total_sq) = moments.inner_products();

    match index {
        SimilarityIndex::RusselRao => Ok(pair_average(ij, m, n)),
        SimilarityIndex::JaccardTanimoto => {
            let inners = (n as f64 - 1.0) * total_sq;
            Ok(ij / (inners - ij))
        }
        SimilarityIndex::SokalMichener => {
            let (flip_ij, _) = MomentSums::flipped(data).inner_products();
            Ok(pair_average(ij + flip_ij, m, n))
        }
        other => Err(unsupported(other)),
    }
}

/// Similarity of two real-valued fingerprints.
pub fn pair_similarity_real(
    x: &ArrayView1<f64>,
    y: &ArrayView1<f64>,
    index: SimilarityIndex,
) -> Result<f64> {
    if x.len() != y.len() {
        return Err(Error::DimensionMismatch {
            expected: x.len(),
            got: y.len(),
        });
    }
    let m = x.len() as f64;
    let xy = x.dot(y);

    match index {
        SimilarityIndex::RusselRao => Ok(xy / m),
        SimilarityIndex::JaccardTanimoto => Ok(xy / (x.dot(x) + y.dot(y) - xy)),
        SimilarityIndex::SokalMichener => {
            let flipped: f64 = x.iter().zip(y).map(|(a, b)| (1.0 - a) * (1.0 - b)).sum();
            Ok((xy + flipped) / m)
        }
        other => Err(unsupported(other)),
    }
}

/// Calculate the complementary similarity of every real-valued object.
///
/// Entry `i` equals [`calculate_isim_real`] of the set without row `i`.
pub fn calculate_comp_sim_real(
    data: &ArrayView2<f64>,
    index: SimilarityIndex,
) -> Result<Array1<f64>> {
    check_fingerprints(data)?;
    if !matches!(
        index,
        SimilarityIndex::RusselRao | SimilarityIndex::JaccardTanimoto | SimilarityIndex::SokalMichener
    ) {
        return Err(unsupported(index));
    }

    let m = data.ncols();
    let remaining = data.nrows() - 1;
    let moments = MomentSums::new(data);
    let flip_moments = match index {
        SimilarityIndex::SokalMichener => Some(MomentSums::flipped(data)),
        _ => None,
    };

    let comp_sims: Vec<f64> = (0..data.nrows())
        .into_par_iter()
        .map(|i| {
            let row = data.row(i);
            let (ij, total_sq) = moments.inner_products_without(row.iter().copied());
            match (&flip_moments, index) {
                (Some(flip), _) => {
                    let (flip_ij, _) =
                        flip.inner_products_without(row.iter().map(|&x| 1.0 - x));
                    pair_average(ij + flip_ij, m, remaining)
                }
                (None, SimilarityIndex::JaccardTanimoto) => {
                    ij / ((remaining as f64 - 1.0) * total_sq - ij)
                }
                _ => pair_average(ij, m, remaining),
            }
        })
        .collect();

    Ok(Array1::from_vec(comp_sims))
}

/// Index of the real-valued medoid (lowest complementary similarity).
pub fn calculate_medoid_real(data: &ArrayView2<f64>, index: SimilarityIndex) -> Result<usize> {
    let comp_sims = calculate_comp_sim_real(data, index)?;
    argmin(&comp_sims.view()).ok_or(Error::EmptyInput)
}

/// Index of the real-valued outlier (highest complementary similarity).
pub fn calculate_outlier_real(data: &ArrayView2<f64>, index: SimilarityIndex) -> Result<usize> {
    let comp_sims = calculate_comp_sim_real(data, index)?;
    argmax(&comp_sims.view()).ok_or(Error::EmptyInput)
}
