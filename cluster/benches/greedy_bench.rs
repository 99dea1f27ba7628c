use criterion::{Criterion, black_box, criterion_group, criterion_main};
use ndarray::Array2;
use tempfile::tempdir;
use tracegroup_chunkstore::Backend;
use tracegroup_cluster::{ClusterConfig, GreedyClusterer, InMemoryBlocks, cluster_in_memory, run};
use tracegroup_similarity::cosine_pairwise;
use tracegroup_vocab::VocabularySnapshot;

/// Pseudo-random 0/1 rows with a few shared templates.
fn random_membership(rows: usize, dim: usize, seed: u64) -> Array2<f32> {
    let mut state = seed;
    let templates: Vec<Vec<bool>> = (0..8)
        .map(|_| {
            (0..dim)
                .map(|_| {
                    state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                    (state >> 33) % 5 == 0
                })
                .collect()
        })
        .collect();
    let mut m = Array2::zeros((rows, dim));
    for r in 0..rows {
        let t = &templates[r % templates.len()];
        for c in 0..dim {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let flip = (state >> 33) % 17 == 0;
            if t[c] != flip {
                m[[r, c]] = 1.0;
            }
        }
        m[[r, r % dim]] = 1.0;
    }
    m
}

fn frames(dim: usize) -> Vec<String> {
    (0..dim).map(|i| format!("pkg.Class{}.method{}", i / 10, i)).collect()
}

fn traces(m: &Array2<f32>, frames: &[String]) -> Vec<Vec<String>> {
    m.rows()
        .into_iter()
        .map(|row| {
            row.iter()
                .zip(frames)
                .filter(|(v, _)| **v != 0.0)
                .map(|(_, f)| f.clone())
                .collect()
        })
        .collect()
}

fn bench_cosine(c: &mut Criterion) {
    let m = random_membership(500, 256, 1);
    c.bench_function("cosine_pairwise_500x256", |b| {
        b.iter(|| black_box(cosine_pairwise(m.view(), m.view()).unwrap()));
    });
}

fn bench_greedy(c: &mut Criterion) {
    let m = random_membership(1000, 128, 2);
    let scores = cosine_pairwise(m.view(), m.view()).unwrap();
    let whole = InMemoryBlocks::new(scores.clone()).unwrap();
    let chunked = InMemoryBlocks::with_chunk_size(scores, 100).unwrap();
    let clusterer = GreedyClusterer::new(0.8);

    c.bench_function("greedy_scan_1000_one_block", |b| {
        b.iter(|| black_box(clusterer.cluster(&whole).unwrap()));
    });
    c.bench_function("greedy_scan_1000_100_blocks", |b| {
        b.iter(|| black_box(clusterer.cluster(&chunked).unwrap()));
    });
}

fn bench_pipeline(c: &mut Criterion) {
    let dim = 128;
    let frames = frames(dim);
    let snap = VocabularySnapshot::from_frames(&frames);
    let traces = traces(&random_membership(600, dim, 3), &frames);
    let ids: Vec<String> = (0..traces.len()).map(|i| i.to_string()).collect();
    let dir = tempdir().unwrap();

    let mut cfg = ClusterConfig {
        chunk_size: 200,
        ..Default::default()
    };
    cfg.storage.temp_root = dir.path().to_path_buf();

    c.bench_function("in_memory_600", |b| {
        b.iter(|| black_box(cluster_in_memory(&cfg, &snap, &ids, &traces).unwrap()));
    });
    for backend in [Backend::Memory, Backend::Redb] {
        cfg.storage.backend = backend;
        c.bench_function(&format!("chunked_600_{backend:?}"), |b| {
            b.iter(|| black_box(run(&cfg, snap.clone(), [(ids.clone(), traces.clone())]).unwrap()));
        });
    }
}

criterion_group!(benches, bench_cosine, bench_greedy, bench_pipeline);
criterion_main!(benches);
