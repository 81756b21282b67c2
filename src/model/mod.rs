pub mod network;

use std::path::Path;

use ndarray::Array3;
use thiserror::Error;

use network::DenseNetwork;

/// Side length of the normalized input image.
pub const INPUT_SIDE: usize = 28;
/// Number of classes the digit classifier distinguishes.
pub const NUM_CLASSES: usize = 10;

/// Startup-time failure: the artifact is missing or unreadable. Fatal; the
/// server must not start accepting traffic without a model.
#[derive(Error, Debug)]
pub enum ArtifactLoadError {
    #[error("failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("input tensor shape {got:?} does not match expected {expected:?}")]
    ShapeMismatch {
        expected: [usize; 3],
        got: Vec<usize>,
    },
}

/// Owns the one in-memory trained network for the process lifetime.
///
/// Loaded exactly once at startup, immutable afterwards. `predict` borrows
/// the network read-only, so a single holder can be shared across workers
/// without a mutex.
#[derive(Debug)]
pub struct ModelHolder {
    network: DenseNetwork,
}

impl ModelHolder {
    pub fn load(path: &Path) -> Result<Self, ArtifactLoadError> {
        let raw = std::fs::read_to_string(path)?;
        let network: DenseNetwork = serde_json::from_str(&raw)?;
        log::info!(
            "Loaded model artifact from {} ({} inputs, {} classes)",
            path.display(),
            network.input_len(),
            network.output_len()
        );
        Ok(Self::from_network(network))
    }

    pub fn from_network(network: DenseNetwork) -> Self {
        Self { network }
    }

    pub fn expected_shape(&self) -> [usize; 3] {
        [1, INPUT_SIDE, INPUT_SIDE]
    }

    /// Runs the forward pass on one normalized example. Fails only when the
    /// tensor shape disagrees with the network; content validation is the
    /// pipeline's job.
    pub fn predict(&self, tensor: &Array3<f32>) -> Result<Vec<f32>, InferenceError> {
        let expected = self.expected_shape();
        if tensor.shape() != expected || self.network.input_len() != INPUT_SIDE * INPUT_SIDE {
            return Err(InferenceError::ShapeMismatch {
                expected,
                got: tensor.shape().to_vec(),
            });
        }

        let flat: ndarray::Array1<f32> = tensor.iter().copied().collect();
        Ok(self.network.forward(flat.view()).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn random_holder() -> ModelHolder {
        let mut rng = StdRng::seed_from_u64(11);
        ModelHolder::from_network(DenseNetwork::new(
            &[INPUT_SIDE * INPUT_SIDE, 32, NUM_CLASSES],
            &mut rng,
        ))
    }

    #[test]
    fn predict_returns_one_score_per_class() {
        let holder = random_holder();
        let tensor = Array3::from_elem((1, INPUT_SIDE, INPUT_SIDE), 0.5);
        let output = holder.predict(&tensor).unwrap();
        assert_eq!(output.len(), NUM_CLASSES);
    }

    #[test]
    fn predict_rejects_wrong_shape() {
        let holder = random_holder();
        let tensor = Array3::zeros((1, 27, 27));
        let err = holder.predict(&tensor).unwrap_err();
        assert!(matches!(err, InferenceError::ShapeMismatch { .. }));
    }

    #[test]
    fn load_fails_on_missing_file() {
        let err = ModelHolder::load(Path::new("/nonexistent/mnist_model.json")).unwrap_err();
        assert!(matches!(err, ArtifactLoadError::Io(_)));
    }

    #[test]
    fn load_fails_on_corrupt_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mnist_model.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = ModelHolder::load(&path).unwrap_err();
        assert!(matches!(err, ArtifactLoadError::Parse(_)));
    }
}
