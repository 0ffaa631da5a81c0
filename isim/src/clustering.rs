//! Agglomerative clustering driven by iSIM.
//!
//! Every fingerprint starts as its own cluster. At each step the pair of
//! clusters whose union has the highest iSIM is merged, until one cluster is
//! left. Clusters are held in condensed form ([`ColumnSum`]), so scoring a
//! candidate union costs O(m) regardless of cluster sizes.
//!
//! Two interchangeable strategies pick the pair:
//!
//! - [`ClusteringStrategy::FullRescan`] scores every pair of live clusters at
//!   every step: O(k²) per step, O(n³) overall.
//! - [`ClusteringStrategy::PairHeap`] scores each pair once, keeps the scores in
//!   a max-heap and discards entries of merged clusters lazily. It needs O(n²)
//!   memory but only scores the new cluster against the live ones per step.
//!
//! Both strategies produce the same merges. Ties go to the first pair in scan
//! order: live clusters are kept in creation order and pairs `(i, j)`, `i < j`,
//! are visited row by row. This order is an artifact of the scan, not a
//! property of the data; it is kept so results are reproducible.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ndarray::{Array2, ArrayView2};
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::comp::check_fingerprints;
use crate::counters::ColumnSum;
use crate::error::Result;
use crate::similarity::{isim_columns, SimilarityIndex};

/// How the best pair is found at each step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusteringStrategy {
    /// Score every pair of live clusters at every step
    #[default]
    FullRescan,
    /// Score each pair once and keep the scores in a heap
    PairHeap,
}

/// Configuration for [`hierarchical_clustering`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusteringConfig {
    /// Index used to score a candidate union (default: RR)
    pub index: SimilarityIndex,
    /// Pair search strategy (default: full rescan)
    #[serde(default)]
    pub strategy: ClusteringStrategy,
}

impl ClusteringConfig {
    /// Configuration scoring unions with `index`.
    pub fn new(index: SimilarityIndex) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    /// Set the pair search strategy.
    pub fn strategy(mut self, strategy: ClusteringStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// One merge event of the linkage tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Merge {
    /// Id of the merged cluster created first
    pub left: usize,
    /// Id of the merged cluster created last
    pub right: usize,
    /// Merge number, starting at 1
    pub step: usize,
    /// Number of fingerprints in the new cluster
    pub size: usize,
    /// iSIM of the new cluster
    pub similarity: f64,
}

/// Ordered merge events. Leaves have ids `0..n`, the cluster created by merge
/// `s` has id `n + s − 1`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Linkage {
    pub merges: Vec<Merge>,
}

impl Linkage {
    /// Number of merges.
    pub fn len(&self) -> usize {
        self.merges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.merges.is_empty()
    }

    /// Standard 4-column linkage matrix `[left, right, step, size]`.
    pub fn to_array(&self) -> Array2<f64> {
        let mut z = Array2::zeros((self.merges.len(), 4));
        for (mut row, merge) in z.rows_mut().into_iter().zip(&self.merges) {
            row[0] = merge.left as f64;
            row[1] = merge.right as f64;
            row[2] = merge.step as f64;
            row[3] = merge.size as f64;
        }
        z
    }
}

/// A node of the cluster tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterNode {
    /// Node id (leaves `0..n`, merges after)
    pub id: usize,
    /// Original row indices under this node
    pub members: Vec<usize>,
    /// Ids of the two merged children, `None` for leaves
    pub children: Option<(usize, usize)>,
}

impl ClusterNode {
    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// Output of [`hierarchical_clustering`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringResult {
    /// Member lists of the live clusters before the first merge and after
    /// every merge; the last entry holds a single cluster.
    pub steps: Vec<Vec<Vec<usize>>>,
    /// Every node, indexed by id.
    pub nodes: Vec<ClusterNode>,
    /// Merge events in order.
    pub linkage: Linkage,
}

impl ClusteringResult {
    /// The node containing every fingerprint.
    pub fn root(&self) -> Option<&ClusterNode> {
        self.nodes.last()
    }

    /// Member lists when exactly `n_clusters` clusters were live.
    pub fn clusters_at(&self, n_clusters: usize) -> Option<&[Vec<usize>]> {
        let n = self.steps.first()?.len();
        if n_clusters == 0 || n_clusters > n {
            return None;
        }
        self.steps.get(n - n_clusters).map(|s| s.as_slice())
    }
}

struct LiveCluster {
    id: usize,
    members: Vec<usize>,
    sum: ColumnSum,
}

/// Score used to rank candidate unions. NaN ranks below every number.
fn rank(similarity: f64) -> f64 {
    if similarity.is_nan() {
        f64::NEG_INFINITY
    } else {
        similarity
    }
}

fn union_similarity(left: &LiveCluster, right: &LiveCluster, index: SimilarityIndex) -> f64 {
    isim_columns(
        left.sum.plus(right.sum.values()),
        left.sum.n_objects() + right.sum.n_objects(),
        index,
    )
}

/// First best pair `(i, j, similarity)` in scan order over live positions.
fn best_pair_rescan(live: &[LiveCluster], index: SimilarityIndex) -> (usize, usize, f64) {
    let row_best: Vec<Option<(usize, f64)>> = (0..live.len())
        .into_par_iter()
        .map(|i| {
            let mut best: Option<(usize, f64)> = None;
            for j in (i + 1)..live.len() {
                let sim = union_similarity(&live[i], &live[j], index);
                if best.map_or(true, |(_, b)| rank(sim) > rank(b)) {
                    best = Some((j, sim));
                }
            }
            best
        })
        .collect();

    let mut best: Option<(usize, usize, f64)> = None;
    for (i, row) in row_best.into_iter().enumerate() {
        if let Some((j, sim)) = row {
            if best.map_or(true, |(_, _, b)| rank(sim) > rank(b)) {
                best = Some((i, j, sim));
            }
        }
    }
    // live.len() >= 2, so at least one pair exists
    best.unwrap_or((0, 1, f64::NAN))
}

type HeapEntry = (OrderedFloat<f64>, Reverse<(usize, usize)>, OrderedFloat<f64>);

/// Scores of candidate unions keyed by cluster ids. Entries whose clusters
/// have been merged are skipped on pop.
struct PairHeap {
    heap: BinaryHeap<HeapEntry>,
    alive: Vec<bool>,
}

impl PairHeap {
    fn new(live: &[LiveCluster], index: SimilarityIndex) -> Self {
        let entries: Vec<HeapEntry> = (0..live.len())
            .into_par_iter()
            .flat_map_iter(|i| {
                ((i + 1)..live.len()).map(move |j| {
                    let sim = union_similarity(&live[i], &live[j], index);
                    entry(live[i].id, live[j].id, sim)
                })
            })
            .collect();

        let mut alive = vec![false; 2 * live.len()];
        for cluster in live {
            alive[cluster.id] = true;
        }

        Self {
            heap: BinaryHeap::from(entries),
            alive,
        }
    }

    /// Best live pair as `(left_id, right_id, similarity)`.
    fn pop(&mut self) -> Option<(usize, usize, f64)> {
        while let Some((_, Reverse((left, right)), sim)) = self.heap.pop() {
            if self.alive[left] && self.alive[right] {
                return Some((left, right, sim.into_inner()));
            }
        }
        None
    }

    fn merged(
        &mut self,
        left: usize,
        right: usize,
        new: &LiveCluster,
        live: &[LiveCluster],
        index: SimilarityIndex,
    ) {
        self.alive[left] = false;
        self.alive[right] = false;
        let entries: Vec<HeapEntry> = live
            .par_iter()
            .map(|other| entry(other.id, new.id, union_similarity(other, new, index)))
            .collect();
        self.heap.extend(entries);
        self.alive[new.id] = true;
    }
}

fn entry(left: usize, right: usize, sim: f64) -> HeapEntry {
    (
        OrderedFloat(rank(sim)),
        Reverse((left, right)),
        OrderedFloat(sim),
    )
}

fn snapshot(live: &[LiveCluster]) -> Vec<Vec<usize>> {
    live.iter().map(|c| c.members.clone()).collect()
}

/// Cluster fingerprints by greedily merging the most similar pair.
///
/// # Arguments
///
/// * `data` - Fingerprints, shape `[n, m]`
/// * `config` - Index and pair search strategy
///
/// # Returns
///
/// The per-step member lists, the cluster tree and `n − 1` merge events.
pub fn hierarchical_clustering(
    data: &ArrayView2<f64>,
    config: &ClusteringConfig,
) -> Result<ClusteringResult> {
    check_fingerprints(data)?;
    let n = data.nrows();
    let index = config.index;

    tracing::info!(
        n_objects = n,
        width = data.ncols(),
        index = %index,
        strategy = ?config.strategy,
        "starting hierarchical clustering"
    );

    let mut live: Vec<LiveCluster> = data
        .rows()
        .into_iter()
        .enumerate()
        .map(|(i, row)| LiveCluster {
            id: i,
            members: vec![i],
            sum: ColumnSum::from_row(&row),
        })
        .collect();

    let mut nodes: Vec<ClusterNode> = (0..n)
        .map(|i| ClusterNode {
            id: i,
            members: vec![i],
            children: None,
        })
        .collect();

    let mut steps = vec![snapshot(&live)];
    let mut merges = Vec::with_capacity(n.saturating_sub(1));
    let mut heap = match config.strategy {
        ClusteringStrategy::PairHeap => Some(PairHeap::new(&live, index)),
        ClusteringStrategy::FullRescan => None,
    };

    while live.len() > 1 {
        let (i, j, similarity) = match heap.as_mut() {
            Some(heap) => {
                let (left, right, sim) = heap.pop().unwrap_or((live[0].id, live[1].id, f64::NAN));
                // live is sorted by id
                let i = live.partition_point(|c| c.id < left);
                let j = live.partition_point(|c| c.id < right);
                (i, j, sim)
            }
            None => best_pair_rescan(&live, index),
        };

        let right = live.remove(j);
        let left = live.remove(i);
        let new_id = nodes.len();

        let mut members = left.members;
        members.extend_from_slice(&right.members);
        let merged = LiveCluster {
            id: new_id,
            members: members.clone(),
            sum: left.sum.merged(&right.sum)?,
        };

        let merge = Merge {
            left: left.id,
            right: right.id,
            step: merges.len() + 1,
            size: members.len(),
            similarity,
        };
        tracing::debug!(
            step = merge.step,
            left = merge.left,
            right = merge.right,
            size = merge.size,
            similarity,
            "merged clusters"
        );

        if let Some(heap) = heap.as_mut() {
            heap.merged(left.id, right.id, &merged, &live, index);
        }

        nodes.push(ClusterNode {
            id: new_id,
            members,
            children: Some((left.id, right.id)),
        });
        merges.push(merge);
        live.push(merged);
        steps.push(snapshot(&live));
    }

    Ok(ClusteringResult {
        steps,
        nodes,
        linkage: Linkage { merges },
    })
}
