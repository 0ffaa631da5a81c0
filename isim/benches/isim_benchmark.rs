//! Benchmarks for isim
use criterion::{criterion_group, criterion_main, Criterion};
use isim::{
    calculate_comp_sim, calculate_isim, diversity, hierarchical_clustering, ClusteringConfig,
    ClusteringStrategy, DiversityConfig, SimilarityIndex,
};
use ndarray::Array2;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use std::hint::black_box;

fn random_fingerprints(n: usize, m: usize) -> Array2<f64> {
    let noise: Array2<f64> = Array2::random((n, m), Uniform::new(0.0, 1.0));
    noise.mapv(|x| if x < 0.5 { 0.0 } else { 1.0 })
}

fn benchmark_isim(c: &mut Criterion) {
    let data = random_fingerprints(10_000, 1024);

    for index in [
        SimilarityIndex::RusselRao,
        SimilarityIndex::JaccardTanimoto,
        SimilarityIndex::BaroniUrbaniBuser,
    ] {
        c.bench_function(&format!("isim_{}_10000x1024", index), |b| {
            b.iter(|| calculate_isim(black_box(&data), None, index).unwrap())
        });
    }
}

fn benchmark_comp_sim(c: &mut Criterion) {
    let data = random_fingerprints(5_000, 1024);

    c.bench_function("comp_sim_JT_5000x1024", |b| {
        b.iter(|| calculate_comp_sim(black_box(&data.view()), SimilarityIndex::JaccardTanimoto))
    });
}

fn benchmark_diversity(c: &mut Criterion) {
    let data = random_fingerprints(2_000, 512);
    let config = DiversityConfig::new(5.0);

    c.bench_function("diversity_5pct_2000x512", |b| {
        b.iter(|| diversity(black_box(&data.view()), &config))
    });
}

fn benchmark_clustering(c: &mut Criterion) {
    let data = random_fingerprints(150, 256);
    let mut group = c.benchmark_group("clustering_150x256");
    group.sample_size(10);

    for strategy in [ClusteringStrategy::FullRescan, ClusteringStrategy::PairHeap] {
        let config = ClusteringConfig::new(SimilarityIndex::RusselRao).strategy(strategy);
        group.bench_function(format!("{:?}", strategy), |b| {
            b.iter(|| hierarchical_clustering(black_box(&data.view()), &config))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_isim,
    benchmark_comp_sim,
    benchmark_diversity,
    benchmark_clustering
);
criterion_main!(benches);
