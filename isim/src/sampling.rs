//! Sampling driven by complementary similarity.
//!
//! Every strategy works on a precomputed complementary-similarity vector, so
//! the O(n·m) scoring pass happens once and the samplers themselves only sort
//! and bucket `n` scores. Low scores mark medoid-like objects, high scores
//! mark outliers.

use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::comp::calculate_comp_sim;
use crate::error::{Error, Result};
use crate::similarity::SimilarityIndex;
use crate::utils::{argsort, percentage_count, validate_percentage};

/// How to pick objects from the ranked scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SamplingStrategy {
    /// Lowest scores, ascending
    Medoid,
    /// Highest scores, in ascending score order
    Outlier,
    /// Half the quota from each tail, low tail first
    Extremes,
    /// Round-robin over contiguous blocks of the sorted order.
    /// `None` or `Some(0)` uses one stratum per sampled object.
    Stratified { strata: Option<usize> },
    /// Round-robin over equal-width bins of the score range.
    /// With `hard_cap = false` the last round is completed even past the quota.
    Quota { n_bins: usize, hard_cap: bool },
}

impl Default for SamplingStrategy {
    fn default() -> Self {
        SamplingStrategy::Stratified { strata: None }
    }
}

/// Configuration for sampling directly from fingerprints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Percentage of the set to sample, in `(0, 100]` (default: 10)
    pub percentage: f64,
    /// Index used for complementary similarity (default: JT)
    pub index: SimilarityIndex,
    /// Sampling strategy (default: stratified)
    #[serde(default)]
    pub strategy: SamplingStrategy,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            percentage: 10.0,
            index: SimilarityIndex::JaccardTanimoto,
            strategy: SamplingStrategy::default(),
        }
    }
}

impl SamplingConfig {
    pub fn new(percentage: f64, strategy: SamplingStrategy) -> Self {
        Self {
            percentage,
            strategy,
            ..Default::default()
        }
    }

    pub fn index(mut self, index: SimilarityIndex) -> Self {
        self.index = index;
        self
    }
}

/// Take element `0` of every group, then element `1` of every group, ...
///
/// With `hard_cap` the pass stops exactly at `quota`; without it the round in
/// progress is finished. Stops early once every group is exhausted.
fn round_robin(groups: &[Vec<usize>], quota: usize, hard_cap: bool) -> Vec<usize> {
    let mut sampled = Vec::with_capacity(quota);
    let mut depth = 0;
    'rounds: while sampled.len() < quota {
        let mut took_any = false;
        for group in groups {
            if let Some(&idx) = group.get(depth) {
                sampled.push(idx);
                took_any = true;
                if hard_cap && sampled.len() >= quota {
                    break 'rounds;
                }
            }
        }
        if !took_any {
            break;
        }
        depth += 1;
    }
    sampled
}

fn stratified(order: &[usize], quota: usize, strata: Option<usize>) -> Result<Vec<usize>> {
    let strata = match strata {
        Some(strata) if strata > 0 => strata,
        _ => quota,
    };
    if strata == 0 {
        return Err(Error::Config(
            "stratified sampling needs at least one stratum".into(),
        ));
    }
    if quota < strata {
        return Err(Error::Config(format!(
            "sample of {} is smaller than {} strata; raise the percentage or lower the strata",
            quota, strata
        )));
    }

    let base = order.len() / strata;
    let extra = order.len() % strata;
    let mut groups = Vec::with_capacity(strata);
    let mut start = 0;
    for s in 0..strata {
        let size = base + usize::from(s < extra);
        groups.push(order[start..start + size].to_vec());
        start += size;
    }

    Ok(round_robin(&groups, quota, true))
}

fn quota_bins(
    comp_sim: &ArrayView1<f64>,
    quota: usize,
    n_bins: usize,
    hard_cap: bool,
) -> Result<Vec<usize>> {
    if n_bins == 0 {
        return Err(Error::Config("quota sampling needs at least one bin".into()));
    }
    if quota < 1 || quota < n_bins {
        return Err(Error::Config(format!(
            "sample of {} is smaller than {} bins; raise the percentage or lower the bins",
            quota, n_bins
        )));
    }

    let (min, max) = comp_sim
        .iter()
        .filter(|v| !v.is_nan())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let step = (max - min) / n_bins as f64;
    let last_low = min + (n_bins - 1) as f64 * step;

    let bin_of = |v: f64| -> Option<usize> {
        if v >= last_low && v <= max {
            return Some(n_bins - 1);
        }
        (0..n_bins - 1).find(|&i| v >= min + i as f64 * step && v < min + (i + 1) as f64 * step)
    };

    // argsort first so every bin comes out sorted by score
    let mut bins = vec![Vec::new(); n_bins];
    for idx in argsort(comp_sim) {
        if let Some(b) = bin_of(comp_sim[idx]) {
            bins[b].push(idx);
        }
    }
    tracing::debug!(
        sizes = ?bins.iter().map(Vec::len).collect::<Vec<_>>(),
        "quota bins"
    );

    Ok(round_robin(&bins, quota, hard_cap))
}

/// Sample indices from a complementary-similarity vector.
///
/// # Arguments
///
/// * `comp_sim` - Complementary similarity of every object
/// * `percentage` - Share of the set to sample, in `(0, 100]`
/// * `strategy` - Which objects to take
///
/// # Returns
///
/// `⌊n·percentage/100⌋` distinct indices (extremes returns twice
/// `⌊n·percentage/200⌋`; quota without a hard cap may return a few more).
pub fn sample(
    comp_sim: &ArrayView1<f64>,
    percentage: f64,
    strategy: SamplingStrategy,
) -> Result<Vec<usize>> {
    if comp_sim.is_empty() {
        return Err(Error::EmptyInput);
    }
    validate_percentage(percentage)?;

    let n = comp_sim.len();
    let quota = percentage_count(n, percentage);

    let sampled = match strategy {
        SamplingStrategy::Medoid => argsort(comp_sim)[..quota].to_vec(),
        SamplingStrategy::Outlier => argsort(comp_sim)[n - quota..].to_vec(),
        SamplingStrategy::Extremes => {
            let half = percentage_count(n, percentage / 2.0);
            let order = argsort(comp_sim);
            let mut sampled = order[..half].to_vec();
            sampled.extend_from_slice(&order[n - half..]);
            sampled
        }
        SamplingStrategy::Stratified { strata } => stratified(&argsort(comp_sim), quota, strata)?,
        SamplingStrategy::Quota { n_bins, hard_cap } => {
            quota_bins(comp_sim, quota, n_bins, hard_cap)?
        }
    };

    tracing::debug!(n_objects = n, sampled = sampled.len(), ?strategy, "sampled");
    Ok(sampled)
}

/// Score `data` by complementary similarity and sample it.
pub fn sample_fingerprints(data: &ArrayView2<f64>, config: &SamplingConfig) -> Result<Vec<usize>> {
    let comp_sim = calculate_comp_sim(data, config.index)?;
    sample(&comp_sim.view(), config.percentage, config.strategy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};

    fn scores() -> Array1<f64> {
        // ascending order: 7, 2, 9, 0, 5, 3, 8, 1, 6, 4
        array![0.40, 0.80, 0.20, 0.60, 0.95, 0.50, 0.90, 0.10, 0.70, 0.30]
    }

    #[test]
    fn test_medoid_and_outlier_tails() {
        let s = scores();
        let view = s.view();
        assert_eq!(sample(&view, 30.0, SamplingStrategy::Medoid).unwrap(), vec![7, 2, 9]);
        assert_eq!(sample(&view, 30.0, SamplingStrategy::Outlier).unwrap(), vec![1, 6, 4]);
    }

    #[test]
    fn test_zero_count_tail_is_empty() {
        let s = scores();
        assert!(sample(&s.view(), 5.0, SamplingStrategy::Outlier)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_extremes_low_tail_first() {
        let s = scores();
        assert_eq!(
            sample(&s.view(), 40.0, SamplingStrategy::Extremes).unwrap(),
            vec![7, 2, 6, 4]
        );
    }

    #[test]
    fn test_stratified_round_robin() {
        let s = scores();
        // strata: [7, 2, 9, 0] [5, 3, 8] [1, 6, 4]
        let sampled = sample(
            &s.view(),
            50.0,
            SamplingStrategy::Stratified { strata: Some(3) },
        )
        .unwrap();
        assert_eq!(sampled, vec![7, 5, 1, 2, 3]);
    }

    #[test]
    fn test_stratified_default_one_per_stratum() {
        let s = scores();
        let sampled = sample(&s.view(), 50.0, SamplingStrategy::default()).unwrap();
        // five strata of two: first of each
        assert_eq!(sampled, vec![7, 9, 5, 8, 6]);
    }

    #[test]
    fn test_quota_bins() {
        let s = scores();
        // range 0.10..0.95, step 0.2125, bins:
        // [7, 2, 9] [0, 5] [3, 8] [1, 6, 4]
        let hard = sample(
            &s.view(),
            60.0,
            SamplingStrategy::Quota {
                n_bins: 4,
                hard_cap: true,
            },
        )
        .unwrap();
        assert_eq!(hard, vec![7, 0, 3, 1, 2, 5]);

        let soft = sample(
            &s.view(),
            60.0,
            SamplingStrategy::Quota {
                n_bins: 4,
                hard_cap: false,
            },
        )
        .unwrap();
        assert_eq!(soft, vec![7, 0, 3, 1, 2, 5, 8, 6]);
    }

    #[test]
    fn test_quota_below_bins_is_config_error() {
        let s = scores();
        let view = s.view();
        for strategy in [
            SamplingStrategy::Quota {
                n_bins: 5,
                hard_cap: true,
            },
            SamplingStrategy::Quota {
                n_bins: 0,
                hard_cap: true,
            },
            SamplingStrategy::Stratified { strata: Some(5) },
        ] {
            assert!(matches!(
                sample(&view, 30.0, strategy),
                Err(Error::Config(_))
            ));
        }
        assert!(matches!(
            sample(&view, 0.0, SamplingStrategy::Medoid),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_ties_keep_index_order() {
        let s = array![0.5, 0.5, 0.5, 0.5];
        assert_eq!(
            sample(&s.view(), 50.0, SamplingStrategy::Medoid).unwrap(),
            vec![0, 1]
        );
        assert_eq!(
            sample(&s.view(), 50.0, SamplingStrategy::Outlier).unwrap(),
            vec![2, 3]
        );
    }

    #[test]
    fn test_zero_strata_uses_default() {
        let s = scores();
        let view = s.view();
        assert_eq!(
            sample(&view, 50.0, SamplingStrategy::Stratified { strata: Some(0) }).unwrap(),
            sample(&view, 50.0, SamplingStrategy::Stratified { strata: None }).unwrap()
        );
    }

    #[test]
    fn test_degenerate_comp_sim_sorts_last() {
        // leaving out row 2 leaves two all-zero rows, whose JT is 0/0
        let data = array![[0.0, 0.0], [0.0, 0.0], [1.0, 1.0]];
        let comp = calculate_comp_sim(&data.view(), SimilarityIndex::JaccardTanimoto).unwrap();
        assert!(comp[2].is_nan());

        let view = comp.view();
        assert_eq!(argsort(&view), vec![0, 1, 2]);
        assert_eq!(sample(&view, 34.0, SamplingStrategy::Medoid).unwrap(), vec![0]);
        assert_eq!(
            sample(&view, 67.0, SamplingStrategy::Stratified { strata: Some(1) }).unwrap(),
            vec![0, 1]
        );
    }

    #[test]
    fn test_empty_scores() {
        let s = Array1::<f64>::zeros(0);
        assert_eq!(
            sample(&s.view(), 50.0, SamplingStrategy::Medoid),
            Err(Error::EmptyInput)
        );
    }
}
