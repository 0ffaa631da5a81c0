//! Complementary similarity of binary fingerprints.
//!
//! The complementary similarity of object `i` is the iSIM of the set with `i`
//! left out. It is computed from the global column sum minus row `i`, so the
//! whole vector costs one pass over the data plus one counter evaluation per
//! object.

use ndarray::{Array1, ArrayView2};
use rayon::prelude::*;

use crate::counters::ColumnSum;
use crate::error::{Error, Result};
use crate::similarity::{isim_columns, SimilarityIndex};
use crate::utils::{argmax, argmin};

pub(crate) fn check_fingerprints(data: &ArrayView2<f64>) -> Result<()> {
    if data.nrows() == 0 {
        return Err(Error::EmptyInput);
    }
    if data.ncols() == 0 {
        return Err(Error::Shape("fingerprints have zero width".into()));
    }
    Ok(())
}

/// Calculate the complementary similarity of every object.
///
/// # Arguments
///
/// * `data` - Binary fingerprints, shape `[n, m]`
/// * `index` - Similarity index
///
/// # Returns
///
/// Array of length `n`; entry `i` is the iSIM of all objects except `i`.
/// Sets of fewer than three objects produce NaN entries.
pub fn calculate_comp_sim(data: &ArrayView2<f64>, index: SimilarityIndex) -> Result<Array1<f64>> {
    check_fingerprints(data)?;

    let total = ColumnSum::from_matrix(data);
    let remaining = data.nrows() - 1;

    let comp_sims: Vec<f64> = (0..data.nrows())
        .into_par_iter()
        .map(|i| isim_columns(total.minus(data.row(i)), remaining, index))
        .collect();

    Ok(Array1::from_vec(comp_sims))
}

/// Index of the medoid: the object with the lowest complementary similarity.
pub fn calculate_medoid(data: &ArrayView2<f64>, index: SimilarityIndex) -> Result<usize> {
    let comp_sims = calculate_comp_sim(data, index)?;
    argmin(&comp_sims.view()).ok_or(Error::EmptyInput)
}

/// Index of the outlier: the object with the highest complementary similarity.
pub fn calculate_outlier(data: &ArrayView2<f64>, index: SimilarityIndex) -> Result<usize> {
    let comp_sims = calculate_comp_sim(data, index)?;
    argmax(&comp_sims.view()).ok_or(Error::EmptyInput)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::calculate_isim;
    use ndarray::{array, Array2, Axis};

    fn sample() -> Array2<f64> {
        array![
            [1.0, 1.0, 0.0, 1.0, 0.0, 1.0],
            [1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
            [0.0, 1.0, 1.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0, 1.0, 0.0],
            [1.0, 1.0, 0.0, 1.0, 0.0, 0.0],
        ]
    }

    #[test]
    fn test_comp_sim_matches_leave_one_out() {
        let data = sample();
        for index in SimilarityIndex::ALL {
            let comp = calculate_comp_sim(&data.view(), index).unwrap();
            for i in 0..data.nrows() {
                let reduced = data.select(
                    Axis(0),
                    &(0..data.nrows()).filter(|&r| r != i).collect::<Vec<_>>(),
                );
                let expected = calculate_isim(&reduced, None, index).unwrap();
                assert!(
                    (comp[i] - expected).abs() < 1e-9,
                    "{} row {}: {} vs {}",
                    index,
                    i,
                    comp[i],
                    expected
                );
            }
        }
    }

    #[test]
    fn test_medoid_and_outlier() {
        let data = sample();
        let view = data.view();
        // row 3 shares the fewest bits with the rest
        assert_eq!(calculate_outlier(&view, SimilarityIndex::RusselRao).unwrap(), 3);
        let medoid = calculate_medoid(&view, SimilarityIndex::RusselRao).unwrap();
        assert_ne!(medoid, 3);
    }

    #[test]
    fn test_empty_input() {
        let data = Array2::<f64>::zeros((0, 4));
        assert_eq!(
            calculate_comp_sim(&data.view(), SimilarityIndex::RusselRao),
            Err(Error::EmptyInput)
        );
    }
}
