use std::path::Path;

use chrono::Utc;
use log::info;
use ndarray::{Array2, Axis};
use rand::Rng;
use thiserror::Error;

use crate::db::ModelMetadata;
use crate::inference::argmax;
use crate::model::network::DenseNetwork;

pub const EPOCHS: u32 = 5;
pub const LEARNING_RATE: f32 = 0.01;
pub const TRAIN_SAMPLES: usize = 1000;
pub const TEST_SAMPLES: usize = 200;
pub const MODEL_NAME: &str = "Random Data Classifier v2";

#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("failed to write model artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize model artifact: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Uniformly random feature rows with uniformly random class labels. There
/// is no signal to learn here; training is a smoke test, not a modeling run.
pub fn generate_random_data(
    samples: usize,
    features: usize,
    classes: usize,
    rng: &mut impl Rng,
) -> (Array2<f32>, Vec<usize>) {
    let inputs = Array2::from_shape_fn((samples, features), |_| rng.random::<f32>());
    let labels = (0..samples).map(|_| rng.random_range(0..classes)).collect();
    (inputs, labels)
}

/// Column-wise standardization: fit mean and standard deviation on the
/// training split, apply to both splits.
pub fn standardize(train: &mut Array2<f32>, test: &mut Array2<f32>) {
    for column in 0..train.ncols() {
        let fitted = train.column(column);
        let mean = fitted.mean().unwrap_or(0.0);
        let variance = fitted.mapv(|v| (v - mean).powi(2)).mean().unwrap_or(0.0);
        let std = variance.sqrt().max(1e-6);
        train.column_mut(column).mapv_inplace(|v| (v - mean) / std);
        test.column_mut(column).mapv_inplace(|v| (v - mean) / std);
    }
}

/// Plain per-example SGD over the whole set, a fixed number of epochs.
pub fn train(
    network: &mut DenseNetwork,
    inputs: &Array2<f32>,
    labels: &[usize],
    epochs: u32,
    learning_rate: f32,
) {
    for epoch in 1..=epochs {
        let mut total_loss = 0.0;
        for (row, &label) in inputs.axis_iter(Axis(0)).zip(labels) {
            total_loss += network.train_example(row, label, learning_rate);
        }
        info!(
            "epoch {}/{}: mean loss {:.4}",
            epoch,
            epochs,
            total_loss / inputs.nrows() as f32
        );
    }
}

/// Fraction of examples whose argmax matches the label.
pub fn evaluate(network: &DenseNetwork, inputs: &Array2<f32>, labels: &[usize]) -> f64 {
    let mut correct = 0usize;
    for (row, &label) in inputs.axis_iter(Axis(0)).zip(labels) {
        let output = network.forward(row);
        if argmax(&output.to_vec()) == label {
            correct += 1;
        }
    }
    correct as f64 / inputs.nrows() as f64
}

pub fn save_artifact(network: &DenseNetwork, path: &Path) -> Result<(), TrainingError> {
    let raw = serde_json::to_string(network)?;
    std::fs::write(path, raw)?;
    Ok(())
}

pub fn metadata_for(accuracy: f64, model_file: &str) -> ModelMetadata {
    ModelMetadata {
        model_name: MODEL_NAME.to_string(),
        accuracy,
        epochs: EPOCHS,
        date: Utc::now(),
        model_file: model_file.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelHolder;
    use ndarray::Array3;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn random_data_has_the_requested_shape() {
        let mut rng = StdRng::seed_from_u64(3);
        let (inputs, labels) = generate_random_data(50, 16, 10, &mut rng);
        assert_eq!(inputs.dim(), (50, 16));
        assert_eq!(labels.len(), 50);
        assert!(labels.iter().all(|&label| label < 10));
    }

    #[test]
    fn standardize_centers_and_scales_the_training_split() {
        let mut rng = StdRng::seed_from_u64(5);
        let (mut train_x, _) = generate_random_data(200, 4, 10, &mut rng);
        let (mut test_x, _) = generate_random_data(40, 4, 10, &mut rng);
        standardize(&mut train_x, &mut test_x);

        for column in 0..train_x.ncols() {
            let col = train_x.column(column);
            let mean = col.mean().unwrap();
            let variance = col.mapv(|v| (v - mean).powi(2)).mean().unwrap();
            assert!(mean.abs() < 1e-4);
            assert!((variance - 1.0).abs() < 1e-2);
        }
    }

    #[test]
    fn evaluate_returns_a_fraction() {
        let mut rng = StdRng::seed_from_u64(9);
        let (inputs, labels) = generate_random_data(30, 8, 4, &mut rng);
        let network = DenseNetwork::new(&[8, 12, 4], &mut rng);
        let accuracy = evaluate(&network, &inputs, &labels);
        assert!((0.0..=1.0).contains(&accuracy));
    }

    #[test]
    fn training_runs_end_to_end_on_random_data() {
        let mut rng = StdRng::seed_from_u64(21);
        let (mut train_x, train_y) = generate_random_data(60, 8, 4, &mut rng);
        let (mut test_x, test_y) = generate_random_data(20, 8, 4, &mut rng);
        standardize(&mut train_x, &mut test_x);

        let mut network = DenseNetwork::new(&[8, 12, 4], &mut rng);
        train(&mut network, &train_x, &train_y, 2, 0.05);
        let accuracy = evaluate(&network, &test_x, &test_y);
        assert!((0.0..=1.0).contains(&accuracy));
    }

    #[test]
    fn a_saved_artifact_reloads_to_an_identical_network() {
        let mut rng = StdRng::seed_from_u64(13);
        let network = DenseNetwork::new(&[784, 16, 10], &mut rng);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mnist_model.json");
        save_artifact(&network, &path).unwrap();

        let holder = ModelHolder::load(&path).unwrap();
        let tensor = Array3::from_elem((1, 28, 28), 0.25);
        let reloaded = holder.predict(&tensor).unwrap();

        let flat: ndarray::Array1<f32> = tensor.iter().copied().collect();
        let original = network.forward(flat.view()).to_vec();
        assert_eq!(reloaded, original);
    }

    #[test]
    fn metadata_carries_the_training_provenance() {
        let record = metadata_for(0.495, "mnist_model.json");
        assert_eq!(record.model_name, MODEL_NAME);
        assert_eq!(record.epochs, EPOCHS);
        assert_eq!(record.model_file, "mnist_model.json");
        assert_eq!(record.accuracy, 0.495);
    }
}
