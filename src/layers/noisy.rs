use ndarray::{Array1, Array2, ArrayView2, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::activations::Activation;

/// Forward-pass mode of the noisy layers.
///
/// In `Training` mode the effective weights are `mu + sigma * epsilon`; in
/// `Inference` mode the layer is deterministic and forwards with `mu` only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkMode {
    Training,
    Inference,
}

/// An affine layer with learnable-scale Gaussian weight noise.
///
/// Each weight and bias entry has a trainable mean (`mu`) and noise scale
/// (`sigma`), plus a persistent standard-normal noise sample (`epsilon`) of
/// matching shape. The noise is not trained; it is redrawn on demand with
/// [`NoisyLinear::reset_noise`].
#[derive(Serialize, Deserialize, Clone)]
pub struct NoisyLinear {
    pub weight_mu: Array2<f32>,
    pub weight_sigma: Array2<f32>,
    pub bias_mu: Array1<f32>,
    pub bias_sigma: Array1<f32>,
    weight_epsilon: Array2<f32>,
    bias_epsilon: Array1<f32>,
    pub activation: Activation,
    mode: NetworkMode,
    #[serde(skip)]
    pre_activation_output: Option<Array2<f32>>,
    #[serde(skip)]
    inputs: Option<Array2<f32>>,
    #[serde(skip)]
    effective_weights: Option<Array2<f32>>,
}

/// Gradients of a noisy layer's trainable parameters.
///
/// `weight_mu`/`bias_mu` carry the gradient of the effective parameters;
/// `weight_sigma`/`bias_sigma` carry that gradient scaled by the noise
/// sample, since `d(effective)/d(sigma) = epsilon`.
pub struct NoisyGradients {
    pub weight_mu: Array2<f32>,
    pub weight_sigma: Array2<f32>,
    pub bias_mu: Array1<f32>,
    pub bias_sigma: Array1<f32>,
}

impl NoisyLinear {
    /// Create a new noisy layer.
    ///
    /// Means are drawn uniformly in `[-1/sqrt(in), 1/sqrt(in)]`; sigmas are
    /// filled with `sigma_init / sqrt(in)` for weights and
    /// `sigma_init / sqrt(out)` for biases. An initial noise sample is drawn
    /// immediately so the layer is usable without an explicit reset.
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        sigma_init: f32,
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        let bound = 1.0 / (input_size as f32).sqrt();
        let weight_mu =
            Array2::random_using((input_size, output_size), Uniform::new(-bound, bound), rng);
        let bias_mu = Array1::random_using(output_size, Uniform::new(-bound, bound), rng);
        let weight_sigma = Array2::from_elem(
            (input_size, output_size),
            sigma_init / (input_size as f32).sqrt(),
        );
        let bias_sigma =
            Array1::from_elem(output_size, sigma_init / (output_size as f32).sqrt());

        let mut layer = NoisyLinear {
            weight_mu,
            weight_sigma,
            bias_mu,
            bias_sigma,
            weight_epsilon: Array2::zeros((input_size, output_size)),
            bias_epsilon: Array1::zeros(output_size),
            activation,
            mode: NetworkMode::Training,
            pre_activation_output: None,
            inputs: None,
            effective_weights: None,
        };
        layer.reset_noise(rng);
        layer
    }

    /// Redraw the noise sample from the standard normal distribution.
    pub fn reset_noise<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.weight_epsilon = Array2::random_using(self.weight_mu.dim(), StandardNormal, rng);
        self.bias_epsilon = Array1::random_using(self.bias_mu.dim(), StandardNormal, rng);
    }

    pub fn set_mode(&mut self, mode: NetworkMode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> NetworkMode {
        self.mode
    }

    /// Perform a forward pass for a batch of input vectors.
    ///
    /// The effective weights used here are cached so the backward pass
    /// propagates errors through the same perturbed parameters.
    pub fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let (weights, biases) = match self.mode {
            NetworkMode::Training => (
                &self.weight_mu + &(&self.weight_sigma * &self.weight_epsilon),
                &self.bias_mu + &(&self.bias_sigma * &self.bias_epsilon),
            ),
            NetworkMode::Inference => (self.weight_mu.clone(), self.bias_mu.clone()),
        };

        self.inputs = Some(inputs.to_owned());
        let mut outputs = inputs.dot(&weights) + &biases.insert_axis(Axis(0));
        self.pre_activation_output = Some(outputs.clone());
        self.activation.apply_batch(&mut outputs);
        self.effective_weights = Some(weights);
        outputs
    }

    /// Compute parameter gradients and the error propagated to this layer's
    /// inputs, given the error at its outputs.
    ///
    /// Only meaningful after a training-mode forward pass; the sigma
    /// gradients assume the effective weights were `mu + sigma * epsilon`.
    pub fn backward_batch(&self, output_errors: ArrayView2<f32>) -> (Array2<f32>, NoisyGradients) {
        let pre_activation_output = self
            .pre_activation_output
            .as_ref()
            .expect("forward_batch() must be called before backward_batch()");
        let inputs = self
            .inputs
            .as_ref()
            .expect("forward_batch() must be called before backward_batch()");
        let effective_weights = self
            .effective_weights
            .as_ref()
            .expect("forward_batch() must be called before backward_batch()");

        let activation_deriv = self.activation.derivative_batch(pre_activation_output.view());
        let adjusted_error = output_errors.to_owned() * &activation_deriv;
        let weight_grad = inputs.t().dot(&adjusted_error);
        let bias_grad = adjusted_error.sum_axis(Axis(0));

        let gradients = NoisyGradients {
            weight_sigma: &weight_grad * &self.weight_epsilon,
            bias_sigma: &bias_grad * &self.bias_epsilon,
            weight_mu: weight_grad,
            bias_mu: bias_grad,
        };
        let input_errors = adjusted_error.dot(&effective_weights.t());
        (input_errors, gradients)
    }

    /// Copy all parameters (means, sigmas, and the current noise sample)
    /// wholesale from another layer of identical shape.
    pub fn sync_from(&mut self, other: &NoisyLinear) {
        self.weight_mu.assign(&other.weight_mu);
        self.weight_sigma.assign(&other.weight_sigma);
        self.bias_mu.assign(&other.bias_mu);
        self.bias_sigma.assign(&other.bias_sigma);
        self.weight_epsilon.assign(&other.weight_epsilon);
        self.bias_epsilon.assign(&other.bias_epsilon);
    }

    pub fn input_size(&self) -> usize {
        self.weight_mu.shape()[0]
    }

    pub fn output_size(&self) -> usize {
        self.weight_mu.shape()[1]
    }
}
