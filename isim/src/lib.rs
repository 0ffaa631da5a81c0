//! iSIM: instant similarity of fingerprint sets
//!
//! This crate computes the average pairwise similarity of a set of binary or
//! real-valued fingerprints in O(n·m) from the set's column sum, and builds
//! three set algorithms on that primitive: agglomerative clustering, greedy
//! diversity selection and complementary-similarity sampling.

pub mod clustering;
pub mod comp;
pub mod counters;
pub mod diversity;
pub mod error;
pub mod real;
pub mod sampling;
pub mod similarity;
pub mod utils;

pub use clustering::{
    hierarchical_clustering, ClusterNode, ClusteringConfig, ClusteringResult, ClusteringStrategy,
    Linkage, Merge,
};
pub use comp::{calculate_comp_sim, calculate_medoid, calculate_outlier};
pub use counters::{calculate_counters, fingerprints_from_rows, ColumnSum, Counters, Fingerprints};
pub use diversity::{diversity, reverse_diversity, DiversityConfig, SelectionMethod, Start};
pub use error::{Error, Result};
pub use real::{
    calculate_comp_sim_real, calculate_isim_real, calculate_medoid_real, calculate_outlier_real,
    pair_similarity_real,
};
pub use sampling::{sample, sample_fingerprints, SamplingConfig, SamplingStrategy};
pub use similarity::{
    calculate_isim, calculate_isim_soft, gen_sim_dict, similarity_dict, SimilarityIndex,
};
