//! n-ary similarity indices and instant similarity (iSIM).
//!
//! iSIM of a set equals the average of all pairwise similarities under the
//! chosen index, computed in O(n·m) from the set's column sum.

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::counters::{resolve, validate_exponent, Counters, Fingerprints};
use crate::error::{Error, Result};

/// Supported n-ary similarity indices.
///
/// Serialized and parsed by their usual abbreviation (`"RR"`, `"JT"`, ...).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum SimilarityIndex {
    #[serde(rename = "AC")]
    AustinColwell,
    #[serde(rename = "BUB")]
    BaroniUrbaniBuser,
    #[serde(rename = "Fai")]
    Faith,
    #[serde(rename = "Gle")]
    Gleason,
    #[serde(rename = "Ja")]
    Jaccard,
    #[serde(rename = "JT")]
    JaccardTanimoto,
    #[serde(rename = "RT")]
    RogersTanimoto,
    #[default]
    #[serde(rename = "RR")]
    RusselRao,
    #[serde(rename = "SM")]
    SokalMichener,
    #[serde(rename = "SS1")]
    SokalSneath1,
    #[serde(rename = "SS2")]
    SokalSneath2,
}

impl SimilarityIndex {
    /// Every supported index.
    pub const ALL: [SimilarityIndex; 11] = [
        SimilarityIndex::AustinColwell,
        SimilarityIndex::BaroniUrbaniBuser,
        SimilarityIndex::Faith,
        SimilarityIndex::Gleason,
        SimilarityIndex::Jaccard,
        SimilarityIndex::JaccardTanimoto,
        SimilarityIndex::RogersTanimoto,
        SimilarityIndex::RusselRao,
        SimilarityIndex::SokalMichener,
        SimilarityIndex::SokalSneath1,
        SimilarityIndex::SokalSneath2,
    ];

    /// Short name of the index.
    pub fn abbreviation(self) -> &'static str {
        match self {
            SimilarityIndex::AustinColwell => "AC",
            SimilarityIndex::BaroniUrbaniBuser => "BUB",
            SimilarityIndex::Faith => "Fai",
            SimilarityIndex::Gleason => "Gle",
            SimilarityIndex::Jaccard => "Ja",
            SimilarityIndex::JaccardTanimoto => "JT",
            SimilarityIndex::RogersTanimoto => "RT",
            SimilarityIndex::RusselRao => "RR",
            SimilarityIndex::SokalMichener => "SM",
            SimilarityIndex::SokalSneath1 => "SS1",
            SimilarityIndex::SokalSneath2 => "SS2",
        }
    }

    /// Evaluate the index on a set of counters.
    ///
    /// Degenerate counters (for example a set of one object) divide by zero
    /// and yield NaN.
    pub fn score(self, c: &Counters) -> f64 {
        match self {
            SimilarityIndex::AustinColwell => (2.0 / PI) * (c.total_sim / c.p).sqrt().asin(),
            SimilarityIndex::BaroniUrbaniBuser => {
                let root = (c.a * c.d).sqrt();
                (root + c.a) / (root + c.a + c.total_dis)
            }
            SimilarityIndex::Faith => (c.a + 0.5 * c.d) / c.p,
            SimilarityIndex::Gleason => 2.0 * c.a / (2.0 * c.a + c.total_dis),
            SimilarityIndex::Jaccard => 3.0 * c.a / (3.0 * c.a + c.total_dis),
            SimilarityIndex::JaccardTanimoto => c.a / (c.a + c.total_dis),
            SimilarityIndex::RogersTanimoto => c.total_sim / (c.p + c.total_dis),
            SimilarityIndex::RusselRao => c.a / c.p,
            SimilarityIndex::SokalMichener => c.total_sim / c.p,
            SimilarityIndex::SokalSneath1 => c.a / (c.a + 2.0 * c.total_dis),
            SimilarityIndex::SokalSneath2 => 2.0 * c.total_sim / (c.p + c.total_sim),
        }
    }
}

impl fmt::Display for SimilarityIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

impl FromStr for SimilarityIndex {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SimilarityIndex::ALL
            .into_iter()
            .find(|index| index.abbreviation() == s)
            .ok_or_else(|| Error::UnsupportedIndex(s.to_string()))
    }
}

/// Every index evaluated on the same counters.
pub fn similarity_dict(counters: &Counters) -> BTreeMap<SimilarityIndex, f64> {
    SimilarityIndex::ALL
        .into_iter()
        .map(|index| (index, index.score(counters)))
        .collect()
}

/// iSIM over a stream of column values of a set of `n_objects` fingerprints.
///
/// RR, JT and SM only accumulate the counters they need; every other index
/// goes through the full counter set.
pub(crate) fn isim_columns<I>(columns: I, n_objects: usize, index: SimilarityIndex) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let n = n_objects as f64;
    match index {
        SimilarityIndex::RusselRao => {
            let mut a = 0.0;
            let mut m = 0usize;
            for c in columns {
                a += c * (c - 1.0) / 2.0;
                m += 1;
            }
            a / (n * (n - 1.0) * m as f64 / 2.0)
        }
        SimilarityIndex::JaccardTanimoto => {
            let mut a = 0.0;
            let mut total_dis = 0.0;
            for c in columns {
                a += c * (c - 1.0) / 2.0;
                total_dis += (n - c) * c;
            }
            a / (a + total_dis)
        }
        SimilarityIndex::SokalMichener => {
            let mut a = 0.0;
            let mut d = 0.0;
            let mut m = 0usize;
            for c in columns {
                let off = n - c;
                a += c * (c - 1.0) / 2.0;
                d += off * (off - 1.0) / 2.0;
                m += 1;
            }
            (a + d) / (n * (n - 1.0) * m as f64 / 2.0)
        }
        other => other.score(&Counters::from_columns(columns, n_objects, 1)),
    }
}

/// iSIM with a soft exponent. `k = 1` takes the fast path.
pub(crate) fn isim_columns_soft<I>(
    columns: I,
    n_objects: usize,
    index: SimilarityIndex,
    k: u32,
) -> f64
where
    I: IntoIterator<Item = f64>,
{
    if k == 1 {
        isim_columns(columns, n_objects, index)
    } else {
        index.score(&Counters::from_columns(columns, n_objects, k))
    }
}

/// Calculate the iSIM of a set of binary fingerprints.
///
/// # Arguments
///
/// * `data` - A fingerprint matrix or a column sum
/// * `n_objects` - Object count; required for a column sum, optional for a matrix
/// * `index` - Similarity index
///
/// # Returns
///
/// The average pairwise similarity of the set under `index`
pub fn calculate_isim<'a>(
    data: impl Into<Fingerprints<'a>>,
    n_objects: Option<usize>,
    index: SimilarityIndex,
) -> Result<f64> {
    let (col_sum, n_objects) = resolve(data.into(), n_objects)?;
    Ok(isim_columns(col_sum.iter().copied(), n_objects, index))
}

/// Calculate the iSIM of a set with soft counters raised to `1/k`.
///
/// `k = 1` gives the same value as [`calculate_isim`]; `k = 0` is rejected.
pub fn calculate_isim_soft<'a>(
    data: impl Into<Fingerprints<'a>>,
    n_objects: Option<usize>,
    index: SimilarityIndex,
    k: u32,
) -> Result<f64> {
    validate_exponent(k)?;
    let (col_sum, n_objects) = resolve(data.into(), n_objects)?;
    Ok(isim_columns_soft(col_sum.iter().copied(), n_objects, index, k))
}

/// Calculate every similarity index from the (optionally soft) counters.
pub fn gen_sim_dict<'a>(
    data: impl Into<Fingerprints<'a>>,
    n_objects: Option<usize>,
    k: u32,
) -> Result<BTreeMap<SimilarityIndex, f64>> {
    validate_exponent(k)?;
    let (col_sum, n_objects) = resolve(data.into(), n_objects)?;
    let counters = Counters::from_column_sum(&col_sum.view(), n_objects, k)?;
    Ok(similarity_dict(&counters))
}
