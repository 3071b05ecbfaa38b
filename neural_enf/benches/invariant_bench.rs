//! Criterion benchmarks for batched invariants and field evaluation.

use burn::backend::NdArray;
use burn::prelude::*;
use burn::tensor::Distribution;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use enf_core::{InvariantKind, Pose2};
use neural_enf::invariant::Invariant;
use neural_enf::latents::AutodecoderConfig;
use neural_enf::nn::{EmbeddingKind, EquivariantCrossAttentionEnfConfig};
use neural_enf::training::{batch_coordinates, coordinate_grid};

type BenchBackend = NdArray;

fn random_poses(batch: usize, num: usize) -> Tensor<BenchBackend, 3> {
    let device = Default::default();
    let positions = Tensor::random([batch, num, 2], Distribution::Uniform(-1.0, 1.0), &device);
    let angles: Tensor<BenchBackend, 3> =
        Tensor::random([batch, num, 1], Distribution::Uniform(0.0, 6.28), &device);
    Tensor::cat(vec![positions, angles.clone().cos(), angles.sin()], 2)
}

fn bench_scalar_invariant(c: &mut Criterion) {
    let pose = Pose2::from_parts(0.2, -0.1, 0.7).to_embedding();
    let mut out = [0.0f32; 3];

    c.bench_function("scalar_ponita_2d", |b| {
        b.iter(|| {
            InvariantKind::Ponita2d
                .evaluate(black_box(&pose), black_box(&pose), &mut out)
                .ok();
            black_box(out)
        })
    });
}

fn bench_batched_invariants(c: &mut Criterion) {
    let mut group = c.benchmark_group("batched_invariant");
    let device = Default::default();
    let poses = random_poses(8, 25);

    for side in [8, 16, 32] {
        let coords = batch_coordinates(coordinate_grid::<BenchBackend>(side, side, &device), 8);
        let pairs = (8 * side * side * 25) as u64;
        group.throughput(Throughput::Elements(pairs));

        for kind in [InvariantKind::PonitaPos2d, InvariantKind::NormRelativePosition(2)] {
            let latents = if kind == InvariantKind::PonitaPos2d {
                poses.clone()
            } else {
                poses.clone().narrow(2, 0, 2)
            };
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", kind), side * side),
                &coords,
                |b, coords| b.iter(|| black_box(kind.compute_unchecked(coords.clone(), latents.clone()))),
            );
        }
    }

    group.finish();
}

fn bench_field_forward(c: &mut Criterion) {
    let mut group = c.benchmark_group("enf_forward");
    let device = Default::default();

    let latents = AutodecoderConfig::new(4, 25, 32)
        .init::<BenchBackend>(&device)
        .and_then(|ad| ad.forward(Tensor::arange(0..4, &device)));
    let Ok(latents) = latents else {
        return;
    };

    for top_k in [4, 0] {
        let enf = EquivariantCrossAttentionEnfConfig {
            num_hidden: 64,
            num_heads: 3,
            num_self_att_layers: 2,
            num_out: 1,
            latent_dim: 32,
            self_attn_invariant: InvariantKind::Ponita2d,
            cross_attn_invariant: InvariantKind::PonitaPos2d,
            embedding_type: EmbeddingKind::Rff,
            embedding_freq_multiplier: [0.2, 3.0],
            condition_value_transform: true,
            top_k_latent_sampling: top_k,
        }
        .init::<BenchBackend>(&device);
        let Ok(enf) = enf else {
            continue;
        };

        let coords = batch_coordinates(coordinate_grid::<BenchBackend>(28, 28, &device), 4);
        group.throughput(Throughput::Elements((4 * 28 * 28) as u64));
        group.bench_function(BenchmarkId::new("top_k", top_k), |b| {
            b.iter(|| black_box(enf.forward(coords.clone(), &latents).ok()))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_scalar_invariant,
    bench_batched_invariants,
    bench_field_forward,
);
criterion_main!(benches);
