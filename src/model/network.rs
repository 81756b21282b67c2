use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One fully connected layer. Weights are stored as (outputs, inputs) so the
/// forward pass is a plain matrix-vector product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    pub(crate) weights: Array2<f32>,
    pub(crate) biases: Array1<f32>,
}

impl DenseLayer {
    fn new(inputs: usize, outputs: usize, rng: &mut impl Rng) -> Self {
        // He-style scaling for the ReLU layers.
        let scale = (2.0 / inputs as f32).sqrt();
        let weights =
            Array2::from_shape_fn((outputs, inputs), |_| (rng.random::<f32>() * 2.0 - 1.0) * scale);
        let biases = Array1::zeros(outputs);
        Self { weights, biases }
    }

    fn affine(&self, input: &Array1<f32>) -> Array1<f32> {
        self.weights.dot(input) + &self.biases
    }
}

/// A small multi-layer perceptron: ReLU hidden layers, softmax output.
/// This is both the artifact the trainer saves and the network the server
/// runs, serialized as JSON via serde.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseNetwork {
    layers: Vec<DenseLayer>,
}

impl DenseNetwork {
    /// Builds a randomly initialized network from consecutive layer sizes,
    /// e.g. `[784, 128, 64, 10]`.
    pub fn new(layer_sizes: &[usize], rng: &mut impl Rng) -> Self {
        assert!(
            layer_sizes.len() >= 2,
            "a network needs at least an input and an output size"
        );
        let layers = layer_sizes
            .windows(2)
            .map(|pair| DenseLayer::new(pair[0], pair[1], rng))
            .collect();
        Self { layers }
    }

    pub fn input_len(&self) -> usize {
        self.layers[0].weights.ncols()
    }

    pub fn output_len(&self) -> usize {
        self.layers[self.layers.len() - 1].biases.len()
    }

    /// Forward pass over one example; returns class probabilities.
    pub fn forward(&self, input: ArrayView1<f32>) -> Array1<f32> {
        let last = self.layers.len() - 1;
        let mut activation = input.to_owned();
        for (index, layer) in self.layers.iter().enumerate() {
            let z = layer.affine(&activation);
            activation = if index == last { softmax(&z) } else { relu(&z) };
        }
        activation
    }

    /// One SGD step on a single labelled example; returns the cross-entropy
    /// loss before the update. Only the trainer calls this.
    pub fn train_example(
        &mut self,
        input: ArrayView1<f32>,
        label: usize,
        learning_rate: f32,
    ) -> f32 {
        let last = self.layers.len() - 1;
        let mut activations = vec![input.to_owned()];
        let mut pre_activations = Vec::with_capacity(self.layers.len());
        for (index, layer) in self.layers.iter().enumerate() {
            let z = layer.affine(&activations[index]);
            let a = if index == last { softmax(&z) } else { relu(&z) };
            pre_activations.push(z);
            activations.push(a);
        }

        let probabilities = &activations[self.layers.len()];
        let loss = -probabilities[label].max(1e-12).ln();

        // Softmax with cross-entropy: the output delta is probs - onehot.
        let mut delta = probabilities.clone();
        delta[label] -= 1.0;

        for index in (0..self.layers.len()).rev() {
            let weight_grad = outer(&delta, &activations[index]);
            let next_delta = if index > 0 {
                let back = self.layers[index].weights.t().dot(&delta);
                let mask = pre_activations[index - 1].mapv(|z| if z > 0.0 { 1.0 } else { 0.0 });
                Some(back * &mask)
            } else {
                None
            };

            let layer = &mut self.layers[index];
            layer.weights.scaled_add(-learning_rate, &weight_grad);
            layer.biases.scaled_add(-learning_rate, &delta);

            if let Some(next) = next_delta {
                delta = next;
            }
        }

        loss
    }
}

fn relu(z: &Array1<f32>) -> Array1<f32> {
    z.mapv(|v| v.max(0.0))
}

fn softmax(z: &Array1<f32>) -> Array1<f32> {
    let max = z.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
    let exp = z.mapv(|v| (v - max).exp());
    let sum = exp.sum();
    exp / sum
}

fn outer(column: &Array1<f32>, row: &Array1<f32>) -> Array2<f32> {
    let column = column.view().insert_axis(Axis(1));
    let row = row.view().insert_axis(Axis(0));
    column.dot(&row)
}

#[cfg(test)]
impl DenseNetwork {
    /// Single-layer network with zero weights and the given biases, so the
    /// output probabilities peak wherever the biases do.
    pub(crate) fn with_output_biases(inputs: usize, biases: Vec<f32>) -> Self {
        let outputs = biases.len();
        let layer = DenseLayer {
            weights: Array2::zeros((outputs, inputs)),
            biases: Array1::from(biases),
        };
        Self {
            layers: vec![layer],
        }
    }
}
