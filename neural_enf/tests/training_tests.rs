//! End-to-end fitting through the model factory.

use burn::backend::{Autodiff, NdArray};
use burn::prelude::*;

use neural_enf::prelude::*;

type TestBackend = Autodiff<NdArray>;

const SIDE: usize = 6;

fn small_nef() -> NefConfig {
    NefConfig::new(1)
        .with_num_hidden(16)
        .with_num_heads(2)
        .with_num_self_att_layers(1)
        .with_latent_dim(8)
        .with_num_latents(4)
}

/// Blobs at different offsets, one per signal: `[batch, SIDE², 1]`.
fn blobs(
    centers: &[(f32, f32)],
    device: &<TestBackend as Backend>::Device,
) -> (Tensor<TestBackend, 3>, Tensor<TestBackend, 3>) {
    let grid = coordinate_grid::<TestBackend>(SIDE, SIDE, device);
    let coords = batch_coordinates(grid, centers.len());

    let pixels: Vec<f32> = coords.to_data().to_vec().unwrap();
    let values: Vec<f32> = pixels
        .chunks(2)
        .enumerate()
        .map(|(i, xy)| {
            let (cx, cy) = centers[i / (SIDE * SIDE)];
            let d2 = (xy[0] - cx).powi(2) + (xy[1] - cy).powi(2);
            (-4.0 * d2).exp()
        })
        .collect();
    let targets = Tensor::from_data(
        TensorData::new(values, [centers.len(), SIDE * SIDE, 1]),
        device,
    );

    (coords, targets)
}

#[test]
fn test_autodecoding_fit() {
    let _ = env_logger::builder().is_test(true).try_init();
    let device = Default::default();

    let config = ExperimentConfig::new(small_nef(), DatasetConfig::new(2, 1).with_batch_size(2))
        .with_fit(
            FitConfig::new()
                .with_learning_rate_enf(5e-3)
                .with_learning_rate_latents(5e-3)
                .with_log_interval(10),
        );

    let ModelBundle::Standard { enf, train, val } = get_model::<TestBackend>(&config, &device).unwrap()
    else {
        panic!("expected a standard bundle");
    };
    assert_eq!(val.num_signals(), 1);

    let (coords, targets) = blobs(&[(0.3, 0.3), (-0.4, 0.1)], &device);
    let indices = Tensor::<TestBackend, 1, Int>::from_data([0, 1], &device);
    let mut fitter = adam_fitter(enf, train, config.fit.clone());
    let mut tracker = MetricsTracker::new(5);

    let first = fitter
        .step(indices.clone(), coords.clone(), targets.clone())
        .unwrap();
    tracker.add(&first);
    for _ in 0..40 {
        let metrics = fitter
            .step(indices.clone(), coords.clone(), targets.clone())
            .unwrap();
        tracker.add(&metrics);
    }

    assert_eq!(tracker.total_steps(), 41);
    assert!(tracker.average_loss() < first.loss);
}

#[test]
fn test_validation_latents_fit_against_trained_field() {
    let device = Default::default();
    let config = ExperimentConfig::new(small_nef(), DatasetConfig::new(1, 1));

    let ModelBundle::Standard { enf, val, .. } = get_model::<TestBackend>(&config, &device).unwrap()
    else {
        panic!("expected a standard bundle");
    };

    let (coords, targets) = blobs(&[(0.0, -0.2)], &device);
    let indices = Tensor::<TestBackend, 1, Int>::from_data([0], &device);
    let mut optimizer = burn::optim::AdamConfig::new()
        .init::<TestBackend, PositionOrientationFeatureAutodecoder<TestBackend>>();

    let (val, loss) = fit_latents(
        &enf,
        val,
        &mut optimizer,
        1e-2,
        indices.clone(),
        coords.clone(),
        targets.clone(),
        5,
    )
    .unwrap();
    assert!(loss.is_finite());

    let latents = val.forward(indices).unwrap();
    let eval = evaluate(&enf, &latents, coords, targets).unwrap();
    assert!(eval.is_finite());
}

#[test]
fn test_meta_learning_step() {
    let device = Default::default();
    let config = ExperimentConfig::new(small_nef(), DatasetConfig::new(0, 0).with_batch_size(2))
        .with_meta(Some(MetaConfig::new().with_num_inner_steps(2).with_inner_learning_rate(0.1)));

    let ModelBundle::Meta { enf, inner, outer } = get_model::<TestBackend>(&config, &device).unwrap()
    else {
        panic!("expected a meta bundle");
    };

    let meta = config.meta.clone().unwrap_or_default();
    let mut fitter = adam_meta_fitter(enf, inner, outer, config.fit.clone(), meta).unwrap();
    let (coords, targets) = blobs(&[(0.3, 0.3), (-0.4, 0.1)], &device);

    for _ in 0..3 {
        let metrics = fitter.step(coords.clone(), targets.clone()).unwrap();
        assert!(metrics.loss.is_finite());
        assert!(metrics.psnr().is_finite());
    }
    assert_eq!(fitter.steps(), 3);
}

#[test]
fn test_config_file_to_model() {
    let device = Default::default();
    let dir = std::env::temp_dir().join(format!("neural_enf_train_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("experiment.json");

    let config = ExperimentConfig::new(
        small_nef().with_invariant_type("norm_rel_pos".into()),
        DatasetConfig::new(3, 2),
    );
    config.save(&path).unwrap();

    let loaded = ExperimentConfig::from_file(&path).unwrap();
    let bundle = get_model::<TestBackend>(&loaded, &device).unwrap();
    assert_eq!(
        bundle.enf().cross_attn_invariant(),
        InvariantKind::NormRelativePosition(2)
    );

    std::fs::remove_dir_all(&dir).ok();
}
