use ndarray::{Array1, Array2, ArrayView2, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::activations::Activation;

/// A fully connected (dense) layer.
///
/// Weights and biases are initialized uniformly in
/// `[-1/sqrt(in_features), 1/sqrt(in_features)]`. The layer caches its last
/// inputs and pre-activations so gradients can be computed in a subsequent
/// backward pass.
#[derive(Serialize, Deserialize, Clone)]
pub struct DenseLayer {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    pub activation: Activation,
    #[serde(skip)]
    pre_activation_output: Option<Array2<f32>>,
    #[serde(skip)]
    inputs: Option<Array2<f32>>,
}

/// Gradients of a dense layer's parameters.
pub struct DenseGradients {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
}

impl DenseLayer {
    /// Create a new dense layer with the given input size, output size, and
    /// activation function, drawing initial parameters from `rng`.
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        let bound = 1.0 / (input_size as f32).sqrt();
        let weights =
            Array2::random_using((input_size, output_size), Uniform::new(-bound, bound), rng);
        let biases = Array1::random_using(output_size, Uniform::new(-bound, bound), rng);
        DenseLayer {
            weights,
            biases,
            activation,
            pre_activation_output: None,
            inputs: None,
        }
    }

    /// Perform a forward pass for a batch of input vectors.
    pub fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Array2<f32> {
        self.inputs = Some(inputs.to_owned());
        let mut outputs = inputs.dot(&self.weights) + &self.biases.clone().insert_axis(Axis(0));
        self.pre_activation_output = Some(outputs.clone());
        self.activation.apply_batch(&mut outputs);
        outputs
    }

    /// Compute parameter gradients and the error propagated to this layer's
    /// inputs, given the error at its outputs.
    pub fn backward_batch(&self, output_errors: ArrayView2<f32>) -> (Array2<f32>, DenseGradients) {
        let pre_activation_output = self
            .pre_activation_output
            .as_ref()
            .expect("forward_batch() must be called before backward_batch()");
        let inputs = self
            .inputs
            .as_ref()
            .expect("forward_batch() must be called before backward_batch()");

        let activation_deriv = self.activation.derivative_batch(pre_activation_output.view());
        let adjusted_error = output_errors.to_owned() * &activation_deriv;
        let gradients = DenseGradients {
            weights: inputs.t().dot(&adjusted_error),
            biases: adjusted_error.sum_axis(Axis(0)),
        };
        let input_errors = adjusted_error.dot(&self.weights.t());
        (input_errors, gradients)
    }

    /// Copy parameters wholesale from another layer of identical shape.
    pub fn sync_from(&mut self, other: &DenseLayer) {
        self.weights.assign(&other.weights);
        self.biases.assign(&other.biases);
    }

    pub fn input_size(&self) -> usize {
        self.weights.shape()[0]
    }

    pub fn output_size(&self) -> usize {
        self.weights.shape()[1]
    }
}
