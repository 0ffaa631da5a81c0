//! Counting engine for n-ary similarity.
//!
//! Every similarity in this crate is a function of five counters derived from a
//! column sum (the elementwise sum of a set of fingerprints) and the number of
//! objects it condenses. For a column with `c` ones out of `n` objects:
//!
//! - 1-similarity pairs: `c·(c−1)/2`
//! - 0-similarity pairs: `(n−c)·(n−c−1)/2`
//! - dissimilar pairs: `(n−c)·c`
//!
//! Summed over all columns these give `a`, `d` and `total_dis`.
//!
//! The column sum is additive over disjoint sets, which is what lets the
//! clustering and selection algorithms update their state in O(m) per step.
//! [`ColumnSum`] is that condensed representation.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, CowArray, Ix1};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Match/mismatch counters of a set of fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Counters {
    /// Pairs matching on 1, summed over columns
    pub a: f64,
    /// Pairs matching on 0, summed over columns
    pub d: f64,
    /// `a + d`
    pub total_sim: f64,
    /// Mismatching pairs, summed over columns
    pub total_dis: f64,
    /// Total comparisons, `total_sim + total_dis`
    pub p: f64,
}

impl Counters {
    /// Compute counters from a column sum of `n_objects` fingerprints.
    ///
    /// # Arguments
    ///
    /// * `col_sum` - Column-wise sum, length `m`
    /// * `n_objects` - Number of fingerprints condensed in `col_sum`
    /// * `k` - Soft exponent; every per-column counter is raised to `1/k`
    ///   before summation. `k = 1` gives the exact counters.
    pub fn from_column_sum(col_sum: &ArrayView1<f64>, n_objects: usize, k: u32) -> Result<Self> {
        validate_exponent(k)?;
        Ok(Self::from_columns(col_sum.iter().copied(), n_objects, k))
    }

    /// Counters over an arbitrary stream of column values.
    ///
    /// `k` must already be validated (non-zero).
    pub(crate) fn from_columns<I>(columns: I, n_objects: usize, k: u32) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let n = n_objects as f64;
        let exponent = 1.0 / k as f64;
        let soften = |x: f64| if k == 1 { x } else { x.powf(exponent) };

        let mut a = 0.0;
        let mut d = 0.0;
        let mut total_dis = 0.0;
        for c in columns {
            let off = n - c;
            a += soften(c * (c - 1.0) / 2.0);
            d += soften(off * (off - 1.0) / 2.0);
            total_dis += soften(off * c);
        }

        let total_sim = a + d;
        Self {
            a,
            d,
            total_sim,
            total_dis,
            p: total_sim + total_dis,
        }
    }
}

pub(crate) fn validate_exponent(k: u32) -> Result<()> {
    if k == 0 {
        return Err(Error::Config("soft exponent k must be at least 1".into()));
    }
    Ok(())
}

/// Fingerprint input accepted by the counting engine.
#[derive(Debug, Clone, Copy)]
pub enum Fingerprints<'a> {
    /// One fingerprint per row, shape `[n, m]`
    Matrix(ArrayView2<'a, f64>),
    /// Column-wise sum of `n` fingerprints, length `m`. The object count must
    /// be passed alongside.
    ColumnSum(ArrayView1<'a, f64>),
}

impl<'a> From<ArrayView2<'a, f64>> for Fingerprints<'a> {
    fn from(view: ArrayView2<'a, f64>) -> Self {
        Fingerprints::Matrix(view)
    }
}

impl<'a> From<&'a Array2<f64>> for Fingerprints<'a> {
    fn from(arr: &'a Array2<f64>) -> Self {
        Fingerprints::Matrix(arr.view())
    }
}

impl<'a> From<ArrayView1<'a, f64>> for Fingerprints<'a> {
    fn from(view: ArrayView1<'a, f64>) -> Self {
        Fingerprints::ColumnSum(view)
    }
}

impl<'a> From<&'a Array1<f64>> for Fingerprints<'a> {
    fn from(arr: &'a Array1<f64>) -> Self {
        Fingerprints::ColumnSum(arr.view())
    }
}

impl<'a> From<&'a ColumnSum> for Fingerprints<'a> {
    fn from(sum: &'a ColumnSum) -> Self {
        Fingerprints::ColumnSum(sum.values())
    }
}

/// Reduce any accepted input to a column sum and an object count.
///
/// For a matrix, an explicit `n_objects` that disagrees with the row count is
/// overridden by the row count and a warning is logged. For a column sum the
/// object count is mandatory.
pub fn resolve<'a>(
    data: Fingerprints<'a>,
    n_objects: Option<usize>,
) -> Result<(CowArray<'a, f64, Ix1>, usize)> {
    match data {
        Fingerprints::Matrix(matrix) => {
            if matrix.ncols() == 0 {
                return Err(Error::Shape("fingerprints have zero width".into()));
            }
            let rows = matrix.nrows();
            if let Some(specified) = n_objects.filter(|&n| n != 0 && n != rows) {
                tracing::warn!(
                    specified,
                    rows,
                    "specified number of objects differs from the number of rows, using {} objects",
                    rows
                );
            }
            Ok((CowArray::from(matrix.sum_axis(Axis(0))), rows))
        }
        Fingerprints::ColumnSum(col_sum) => {
            if col_sum.is_empty() {
                return Err(Error::Shape("column sum has zero width".into()));
            }
            match n_objects {
                Some(n) if n != 0 => Ok((CowArray::from(col_sum), n)),
                _ => Err(Error::MissingObjectCount),
            }
        }
    }
}

/// Calculate the 1-similarity, 0-similarity and dissimilarity counters.
///
/// # Arguments
///
/// * `data` - A fingerprint matrix or a column sum
/// * `n_objects` - Object count; required for a column sum, optional for a matrix
/// * `k` - Soft exponent (`1` for exact counters)
pub fn calculate_counters<'a>(
    data: impl Into<Fingerprints<'a>>,
    n_objects: Option<usize>,
    k: u32,
) -> Result<Counters> {
    let (col_sum, n_objects) = resolve(data.into(), n_objects)?;
    Counters::from_column_sum(&col_sum.view(), n_objects, k)
}

/// Build a fingerprint matrix from rows, rejecting ragged input.
pub fn fingerprints_from_rows<T>(rows: &[Vec<T>]) -> Result<Array2<f64>>
where
    T: Copy + Into<f64>,
{
    let width = rows.first().map(|r| r.len()).unwrap_or(0);
    if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
        return Err(Error::Shape(format!(
            "row {} has {} columns, expected {}",
            idx,
            row.len(),
            width
        )));
    }

    let flat: Vec<f64> = rows.iter().flatten().map(|&x| x.into()).collect();
    Array2::from_shape_vec((rows.len(), width), flat).map_err(|e| Error::Shape(e.to_string()))
}

/// Condensed representation of a set of fingerprints: their column sum and
/// how many fingerprints it contains.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSum {
    values: Array1<f64>,
    n_objects: usize,
}

impl ColumnSum {
    /// Column sum of an empty set of `m`-wide fingerprints.
    pub fn zeros(width: usize) -> Self {
        Self {
            values: Array1::zeros(width),
            n_objects: 0,
        }
    }

    /// Wrap an existing column sum.
    pub fn new(values: Array1<f64>, n_objects: usize) -> Self {
        Self { values, n_objects }
    }

    /// Condensed form of a single fingerprint.
    pub fn from_row(row: &ArrayView1<f64>) -> Self {
        Self {
            values: row.to_owned(),
            n_objects: 1,
        }
    }

    /// Condensed form of every row of `data`.
    pub fn from_matrix(data: &ArrayView2<f64>) -> Self {
        Self {
            values: data.sum_axis(Axis(0)),
            n_objects: data.nrows(),
        }
    }

    /// Condensed form of the selected rows of `data`.
    pub fn from_indices(data: &ArrayView2<f64>, indices: &[usize]) -> Result<Self> {
        let mut sum = Self::zeros(data.ncols());
        for &idx in indices {
            if idx >= data.nrows() {
                return Err(Error::Config(format!(
                    "index {} out of range for {} fingerprints",
                    idx,
                    data.nrows()
                )));
            }
            sum.add(&data.row(idx))?;
        }
        Ok(sum)
    }

    /// Column values.
    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.values.view()
    }

    /// Number of condensed fingerprints.
    pub fn n_objects(&self) -> usize {
        self.n_objects
    }

    /// Fingerprint width `m`.
    pub fn width(&self) -> usize {
        self.values.len()
    }

    /// Add one fingerprint to the set.
    pub fn add(&mut self, row: &ArrayView1<f64>) -> Result<()> {
        self.check_width(row.len())?;
        self.values += row;
        self.n_objects += 1;
        Ok(())
    }

    /// Remove one fingerprint from the set.
    pub fn remove(&mut self, row: &ArrayView1<f64>) -> Result<()> {
        self.check_width(row.len())?;
        if self.n_objects == 0 {
            return Err(Error::EmptyInput);
        }
        self.values -= row;
        self.n_objects -= 1;
        Ok(())
    }

    /// Condensed form of the union of two disjoint sets.
    pub fn merged(&self, other: &ColumnSum) -> Result<ColumnSum> {
        self.check_width(other.width())?;
        Ok(ColumnSum {
            values: &self.values + &other.values,
            n_objects: self.n_objects + other.n_objects,
        })
    }

    /// Counters of the condensed set.
    pub fn counters(&self, k: u32) -> Result<Counters> {
        Counters::from_column_sum(&self.values.view(), self.n_objects, k)
    }

    /// Column values of this set with `row` added, without mutating it.
    pub(crate) fn plus<'s>(&'s self, row: ArrayView1<'s, f64>) -> impl Iterator<Item = f64> + 's {
        self.values.iter().zip(row).map(|(&s, &x)| s + x)
    }

    /// Column values of this set with `row` removed, without mutating it.
    pub(crate) fn minus<'s>(&'s self, row: ArrayView1<'s, f64>) -> impl Iterator<Item = f64> + 's {
        self.values.iter().zip(row).map(|(&s, &x)| s - x)
    }

    fn check_width(&self, got: usize) -> Result<()> {
        if got != self.width() {
            return Err(Error::DimensionMismatch {
                expected: self.width(),
                got,
            });
        }
        Ok(())
    }
}
