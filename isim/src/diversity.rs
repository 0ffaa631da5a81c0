//! Greedy diversity selection.
//!
//! Forward selection grows a subset one object at a time, always adding the
//! candidate that leaves the subset least similar. Reverse selection starts
//! from the full set and repeatedly drops the member whose removal leaves the
//! remaining set least similar. Both keep the subset in condensed form and
//! update it in place, so each step costs O(candidates · m).
//!
//! The max-min ("b-max") variant ignores the condensed sum and scores each
//! candidate by its highest pairwise similarity to the current subset.
//!
//! Candidates are scanned in ascending index order and the first strict
//! minimum wins. NaN scores rank above every number.

use ndarray::ArrayView2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::comp::{calculate_medoid, calculate_outlier, check_fingerprints};
use crate::counters::{validate_exponent, ColumnSum};
use crate::error::{Error, Result};
use crate::similarity::{isim_columns, isim_columns_soft, SimilarityIndex};
use crate::utils::{percentage_count, validate_percentage};

/// Where forward selection starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Start {
    /// The medoid of the whole set
    #[default]
    Medoid,
    /// The outlier of the whole set
    Outlier,
    /// A uniformly drawn object, reproducible from `seed`
    Random { seed: u64 },
    /// Caller-chosen objects, kept in the given order
    Indices(Vec<usize>),
}

/// How forward selection scores candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionMethod {
    /// iSIM of the subset with the candidate added
    #[default]
    Isim,
    /// Same, with soft counters raised to `1/k`
    Power(u32),
    /// Highest pairwise similarity to the current subset (max-min)
    BMax,
}

/// Configuration for forward diversity selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiversityConfig {
    /// Percentage of the set to select, in `(0, 100]` (default: 10)
    pub percentage: f64,
    /// Starting point (default: medoid)
    #[serde(default)]
    pub start: Start,
    /// Similarity index (default: RR)
    #[serde(default)]
    pub index: SimilarityIndex,
    /// Candidate scoring (default: iSIM)
    #[serde(default)]
    pub method: SelectionMethod,
}

impl Default for DiversityConfig {
    fn default() -> Self {
        Self {
            percentage: 10.0,
            start: Start::default(),
            index: SimilarityIndex::default(),
            method: SelectionMethod::default(),
        }
    }
}

impl DiversityConfig {
    /// Configuration selecting `percentage` percent of the set.
    pub fn new(percentage: f64) -> Self {
        Self {
            percentage,
            ..Default::default()
        }
    }

    /// Set the starting point.
    pub fn start(mut self, start: Start) -> Self {
        self.start = start;
        self
    }

    /// Set the similarity index.
    pub fn index(mut self, index: SimilarityIndex) -> Self {
        self.index = index;
        self
    }

    /// Set the candidate scoring method.
    pub fn method(mut self, method: SelectionMethod) -> Self {
        self.method = method;
        self
    }
}

/// Running state of a selection: chosen indices in order, a membership mask
/// and the condensed sum of the members.
struct Selection<'a> {
    data: ArrayView2<'a, f64>,
    order: Vec<usize>,
    member: Vec<bool>,
    condensed: ColumnSum,
}

impl<'a> Selection<'a> {
    fn empty(data: ArrayView2<'a, f64>) -> Self {
        Self {
            member: vec![false; data.nrows()],
            condensed: ColumnSum::zeros(data.ncols()),
            order: Vec::new(),
            data,
        }
    }

    fn full(data: ArrayView2<'a, f64>) -> Self {
        Self {
            member: vec![true; data.nrows()],
            condensed: ColumnSum::from_matrix(&data),
            order: (0..data.nrows()).collect(),
            data,
        }
    }

    fn len(&self) -> usize {
        self.condensed.n_objects()
    }

    fn insert(&mut self, idx: usize) -> Result<()> {
        if idx >= self.member.len() {
            return Err(Error::Config(format!(
                "index {} out of range for {} fingerprints",
                idx,
                self.member.len()
            )));
        }
        if self.member[idx] {
            return Err(Error::Config(format!("index {} selected twice", idx)));
        }
        self.condensed.add(&self.data.row(idx))?;
        self.member[idx] = true;
        self.order.push(idx);
        Ok(())
    }

    fn remove(&mut self, idx: usize) -> Result<()> {
        self.condensed.remove(&self.data.row(idx))?;
        self.member[idx] = false;
        self.order.retain(|&i| i != idx);
        Ok(())
    }

    /// Indices on one side of the boundary, ascending.
    fn indices(&self, inside: bool) -> Vec<usize> {
        (0..self.member.len())
            .filter(|&i| self.member[i] == inside)
            .collect()
    }
}

/// First candidate with the strictly lowest score; NaN never wins over a number.
fn first_min(candidates: &[usize], scores: &[f64]) -> Option<usize> {
    let rank = |s: f64| if s.is_nan() { f64::INFINITY } else { s };
    let mut best: Option<(usize, f64)> = None;
    for (&idx, &score) in candidates.iter().zip(scores) {
        if best.map_or(true, |(_, b)| rank(score) < rank(b)) {
            best = Some((idx, score));
        }
    }
    best.map(|(idx, _)| idx)
}

fn next_by_isim(selection: &Selection, candidates: &[usize], index: SimilarityIndex, k: u32) -> Option<usize> {
    let n = selection.len() + 1;
    let scores: Vec<f64> = candidates
        .par_iter()
        .map(|&i| {
            isim_columns_soft(selection.condensed.plus(selection.data.row(i)), n, index, k)
        })
        .collect();
    first_min(candidates, &scores)
}

fn next_by_bmax(selection: &Selection, candidates: &[usize], index: SimilarityIndex) -> Option<usize> {
    let data = selection.data;
    let scores: Vec<f64> = candidates
        .par_iter()
        .map(|&i| {
            let candidate = data.row(i);
            selection
                .order
                .iter()
                .map(|&j| {
                    let member = data.row(j);
                    isim_columns(candidate.iter().zip(member).map(|(a, b)| a + b), 2, index)
                })
                .fold(f64::NEG_INFINITY, f64::max)
        })
        .collect();
    first_min(candidates, &scores)
}

/// Select a diverse subset by forward greedy growth.
///
/// # Arguments
///
/// * `data` - Binary fingerprints, shape `[n, m]`
/// * `config` - Target percentage, starting point, index and scoring method
///
/// # Returns
///
/// Selected indices in selection order, starting with the seed(s). Exactly
/// `⌊percentage·n/100⌋` indices unless the seed list is already longer.
pub fn diversity(data: &ArrayView2<f64>, config: &DiversityConfig) -> Result<Vec<usize>> {
    check_fingerprints(data)?;
    validate_percentage(config.percentage)?;
    if let SelectionMethod::Power(k) = config.method {
        validate_exponent(k)?;
    }

    let n = data.nrows();
    let index = config.index;
    let seeds = match &config.start {
        Start::Medoid => vec![calculate_medoid(data, index)?],
        Start::Outlier => vec![calculate_outlier(data, index)?],
        Start::Random { seed } => {
            let mut rng = ChaCha8Rng::seed_from_u64(*seed);
            vec![rng.gen_range(0..n)]
        }
        Start::Indices(indices) if indices.is_empty() => {
            return Err(Error::Config("start index list is empty".into()));
        }
        Start::Indices(indices) => indices.clone(),
    };

    let target = percentage_count(n, config.percentage);
    tracing::info!(
        n_objects = n,
        target,
        index = %index,
        method = ?config.method,
        "starting diversity selection"
    );

    let mut selection = Selection::empty(data.view());
    for &seed in &seeds {
        selection.insert(seed)?;
    }

    while selection.len() < target {
        let candidates = selection.indices(false);
        let next = match config.method {
            SelectionMethod::Isim => next_by_isim(&selection, &candidates, index, 1),
            SelectionMethod::Power(k) => next_by_isim(&selection, &candidates, index, k),
            SelectionMethod::BMax => next_by_bmax(&selection, &candidates, index),
        };
        let Some(next) = next else { break };
        tracing::debug!(selected = next, count = selection.len() + 1, "selected object");
        selection.insert(next)?;
    }

    Ok(selection.order)
}

/// Select a diverse subset by reverse greedy shrinking.
///
/// Starting from the full set, repeatedly removes the member whose removal
/// yields the lowest iSIM of the remainder, until `⌊percentage·n/100⌋`
/// members are left.
///
/// # Returns
///
/// The remaining indices, ascending.
pub fn reverse_diversity(
    data: &ArrayView2<f64>,
    percentage: f64,
    index: SimilarityIndex,
) -> Result<Vec<usize>> {
    check_fingerprints(data)?;
    validate_percentage(percentage)?;

    let target = percentage_count(data.nrows(), percentage);
    tracing::info!(
        n_objects = data.nrows(),
        target,
        index = %index,
        "starting reverse diversity selection"
    );

    let mut selection = Selection::full(data.view());
    while selection.len() > target {
        let members = selection.indices(true);
        let n = selection.len() - 1;
        let scores: Vec<f64> = members
            .par_iter()
            .map(|&i| isim_columns(selection.condensed.minus(selection.data.row(i)), n, index))
            .collect();
        let Some(removed) = first_min(&members, &scores) else {
            break;
        };
        tracing::debug!(removed, remaining = n, "removed object");
        selection.remove(removed)?;
    }

    Ok(selection.indices(true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn sample() -> Array2<f64> {
        array![
            [1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0],
            [1.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            [0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0],
            [0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0],
            [0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0],
            [1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0],
            [1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0],
        ]
    }

    fn assert_distinct(indices: &[usize], n: usize) {
        let mut sorted = indices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), indices.len(), "duplicates in {:?}", indices);
        assert!(indices.iter().all(|&i| i < n));
    }

    #[test]
    fn test_full_percentage_selects_everything() {
        let data = sample();
        for method in [
            SelectionMethod::Isim,
            SelectionMethod::Power(2),
            SelectionMethod::BMax,
        ] {
            let config = DiversityConfig::new(100.0).method(method);
            let selected = diversity(&data.view(), &config).unwrap();
            assert_eq!(selected.len(), 10);
            assert_distinct(&selected, 10);
        }
    }

    #[test]
    fn test_starts_from_medoid() {
        let data = sample();
        let medoid = calculate_medoid(&data.view(), SimilarityIndex::RusselRao).unwrap();
        let selected = diversity(&data.view(), &DiversityConfig::new(50.0)).unwrap();
        assert_eq!(selected.len(), 5);
        assert_eq!(selected[0], medoid);
        assert_distinct(&selected, 10);
    }

    #[test]
    fn test_second_pick_minimizes_pair_similarity() {
        let data = sample();
        let config = DiversityConfig::new(20.0).start(Start::Indices(vec![0]));
        let selected = diversity(&data.view(), &config).unwrap();
        assert_eq!(selected.len(), 2);

        // brute force: candidate whose pair with row 0 has the lowest RR
        let mut best = (usize::MAX, f64::INFINITY);
        for i in 1..10 {
            let sum = &data.row(0) + &data.row(i);
            let sim = isim_columns(sum.iter().copied(), 2, SimilarityIndex::RusselRao);
            if sim < best.1 {
                best = (i, sim);
            }
        }
        assert_eq!(selected[1], best.0);
    }

    #[test]
    fn test_random_start_is_deterministic() {
        let data = sample();
        let config = DiversityConfig::new(40.0).start(Start::Random { seed: 7 });
        let first = diversity(&data.view(), &config).unwrap();
        let second = diversity(&data.view(), &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_long_start_list_returned_unchanged() {
        let data = sample();
        let config = DiversityConfig::new(20.0).start(Start::Indices(vec![4, 1, 7]));
        let selected = diversity(&data.view(), &config).unwrap();
        assert_eq!(selected, vec![4, 1, 7]);
    }

    #[test]
    fn test_invalid_configuration() {
        let data = sample();
        let view = data.view();
        for config in [
            DiversityConfig::new(0.0),
            DiversityConfig::new(120.0),
            DiversityConfig::new(50.0).start(Start::Indices(vec![])),
            DiversityConfig::new(50.0).start(Start::Indices(vec![3, 3])),
            DiversityConfig::new(50.0).start(Start::Indices(vec![42])),
            DiversityConfig::new(50.0).method(SelectionMethod::Power(0)),
        ] {
            assert!(
                matches!(diversity(&view, &config), Err(Error::Config(_))),
                "{:?}",
                config
            );
        }
    }

    #[test]
    fn test_reverse_removes_most_redundant() {
        let data = sample();
        let view = data.view();
        let remaining = reverse_diversity(&view, 90.0, SimilarityIndex::RusselRao).unwrap();
        assert_eq!(remaining.len(), 9);

        let total = ColumnSum::from_matrix(&view);
        let scores: Vec<f64> = (0..10)
            .map(|i| isim_columns(total.minus(view.row(i)), 9, SimilarityIndex::RusselRao))
            .collect();
        let removed = (0..10).find(|i| !remaining.contains(i)).unwrap();
        let lowest = scores.iter().cloned().fold(f64::INFINITY, f64::min);
        assert_eq!(scores[removed], lowest);
        assert_eq!(scores.iter().position(|&s| s == lowest), Some(removed));
    }

    #[test]
    fn test_reverse_output_sorted_and_sized() {
        let data = sample();
        let remaining =
            reverse_diversity(&data.view(), 30.0, SimilarityIndex::JaccardTanimoto).unwrap();
        assert_eq!(remaining.len(), 3);
        assert!(remaining.windows(2).all(|w| w[0] < w[1]));
    }
}
