use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::activations::Activation;
use crate::layers::{DenseGradients, DenseLayer, NetworkMode, NoisyGradients, NoisyLinear};
use crate::optimizer::{Optimizer, ParameterLayout};

/// Dueling Q-network with noisy exploration layers.
///
/// Maps a state vector to one Q-value per action. The trunk is a plain
/// affine layer followed by two noisy layers, all rectified; two noisy heads
/// on the final hidden representation produce a scalar state value and
/// per-action advantages, recombined as
/// `Q(s,a) = V(s) + (A(s,a) - mean_a' A(s,a'))`. The mean subtraction keeps
/// the value/advantage decomposition identifiable.
#[derive(Serialize, Deserialize, Clone)]
pub struct DuelingQNetwork {
    fc1: DenseLayer,
    fc2: NoisyLinear,
    fc3: NoisyLinear,
    value_head: NoisyLinear,
    advantage_head: NoisyLinear,
}

/// Gradients for every trainable parameter of the network, in layer order.
pub struct NetworkGradients {
    pub fc1: DenseGradients,
    pub fc2: NoisyGradients,
    pub fc3: NoisyGradients,
    pub value: NoisyGradients,
    pub advantage: NoisyGradients,
}

impl DuelingQNetwork {
    /// Construct a network for `state_size` inputs and `action_size` actions
    /// with the given hidden layer widths.
    pub fn new<R: Rng + ?Sized>(
        state_size: usize,
        action_size: usize,
        hidden_sizes: &[usize; 3],
        sigma_init: f32,
        rng: &mut R,
    ) -> Self {
        let [h1, h2, h3] = *hidden_sizes;
        DuelingQNetwork {
            fc1: DenseLayer::new(state_size, h1, Activation::Relu, rng),
            fc2: NoisyLinear::new(h1, h2, sigma_init, Activation::Relu, rng),
            fc3: NoisyLinear::new(h2, h3, sigma_init, Activation::Relu, rng),
            value_head: NoisyLinear::new(h3, 1, sigma_init, Activation::Linear, rng),
            advantage_head: NoisyLinear::new(h3, action_size, sigma_init, Activation::Linear, rng),
        }
    }

    /// Forward pass for a single state vector, promoted to a batch of one.
    pub fn forward(&mut self, input: ArrayView1<f32>) -> Array1<f32> {
        let input = input.insert_axis(Axis(0));
        let output = self.forward_batch(input.view());
        let shape = output.shape()[1];
        output
            .into_shape((shape,))
            .expect("failed to remove batch axis")
    }

    /// Forward pass for a pre-batched matrix of states, one row per state.
    pub fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let (q_values, _, _) = self.forward_batch_parts(inputs);
        q_values
    }

    /// Forward pass also returning the value and advantage streams.
    pub(crate) fn forward_batch_parts(
        &mut self,
        inputs: ArrayView2<f32>,
    ) -> (Array2<f32>, Array2<f32>, Array2<f32>) {
        let h1 = self.fc1.forward_batch(inputs);
        let h2 = self.fc2.forward_batch(h1.view());
        let h3 = self.fc3.forward_batch(h2.view());
        let value = self.value_head.forward_batch(h3.view());
        let advantage = self.advantage_head.forward_batch(h3.view());

        let advantage_mean = advantage
            .mean_axis(Axis(1))
            .expect("advantage stream has at least one action")
            .insert_axis(Axis(1));
        let q_values = &advantage - &advantage_mean + &value;
        (q_values, value, advantage)
    }

    /// Backpropagate the error at the Q-value outputs through the dueling
    /// combine and both streams, producing gradients for every parameter.
    ///
    /// Per row, the combine contributes `dV = sum_a dQ_a` and
    /// `dA = dQ - mean_a dQ`; the two streams' input errors sum at the shared
    /// hidden representation.
    pub fn backward_batch(&mut self, dq: ArrayView2<f32>) -> NetworkGradients {
        let dvalue = dq.sum_axis(Axis(1)).insert_axis(Axis(1));
        let dq_mean = dq
            .mean_axis(Axis(1))
            .expect("Q-value error has at least one action")
            .insert_axis(Axis(1));
        let dadvantage = &dq - &dq_mean;

        let (value_input_errors, value) = self.value_head.backward_batch(dvalue.view());
        let (advantage_input_errors, advantage) =
            self.advantage_head.backward_batch(dadvantage.view());
        let dh3 = value_input_errors + advantage_input_errors;

        let (dh2, fc3) = self.fc3.backward_batch(dh3.view());
        let (dh1, fc2) = self.fc2.backward_batch(dh2.view());
        let (_dinput, fc1) = self.fc1.backward_batch(dh1.view());

        NetworkGradients {
            fc1,
            fc2,
            fc3,
            value,
            advantage,
        }
    }

    /// Apply one optimizer step over all parameters in fixed slot order.
    pub fn apply_gradients<O: Optimizer>(
        &mut self,
        gradients: &NetworkGradients,
        optimizer: &mut O,
        learning_rate: f32,
    ) {
        optimizer.update_weights(0, &mut self.fc1.weights, &gradients.fc1.weights, learning_rate);
        optimizer.update_biases(0, &mut self.fc1.biases, &gradients.fc1.biases, learning_rate);

        let noisy = [
            (&mut self.fc2, &gradients.fc2),
            (&mut self.fc3, &gradients.fc3),
            (&mut self.value_head, &gradients.value),
            (&mut self.advantage_head, &gradients.advantage),
        ];
        for (i, (layer, grads)) in noisy.into_iter().enumerate() {
            let slot = 1 + i * 2;
            optimizer.update_weights(slot, &mut layer.weight_mu, &grads.weight_mu, learning_rate);
            optimizer.update_weights(
                slot + 1,
                &mut layer.weight_sigma,
                &grads.weight_sigma,
                learning_rate,
            );
            optimizer.update_biases(slot, &mut layer.bias_mu, &grads.bias_mu, learning_rate);
            optimizer.update_biases(
                slot + 1,
                &mut layer.bias_sigma,
                &grads.bias_sigma,
                learning_rate,
            );
        }
        optimizer.end_step();
    }

    /// Shapes of all trainable parameters, matching the slot order used by
    /// [`DuelingQNetwork::apply_gradients`].
    pub fn parameter_layout(&self) -> ParameterLayout {
        let mut layout = ParameterLayout::default();
        layout.weight_shapes.push(self.fc1.weights.dim());
        layout.bias_shapes.push(self.fc1.biases.len());
        for layer in [&self.fc2, &self.fc3, &self.value_head, &self.advantage_head] {
            layout.weight_shapes.push(layer.weight_mu.dim());
            layout.weight_shapes.push(layer.weight_sigma.dim());
            layout.bias_shapes.push(layer.bias_mu.len());
            layout.bias_shapes.push(layer.bias_sigma.len());
        }
        layout
    }

    /// Redraw the noise sample on every noisy layer.
    pub fn reset_noise<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.fc2.reset_noise(rng);
        self.fc3.reset_noise(rng);
        self.value_head.reset_noise(rng);
        self.advantage_head.reset_noise(rng);
    }

    /// Switch every noisy layer between stochastic and deterministic forward.
    pub fn set_mode(&mut self, mode: NetworkMode) {
        self.fc2.set_mode(mode);
        self.fc3.set_mode(mode);
        self.value_head.set_mode(mode);
        self.advantage_head.set_mode(mode);
    }

    pub fn mode(&self) -> NetworkMode {
        self.fc2.mode()
    }

    /// Copy every parameter wholesale from another network of identical
    /// architecture. Used to refresh the target network; the target itself
    /// never receives gradients.
    pub fn sync_from(&mut self, other: &DuelingQNetwork) {
        self.fc1.sync_from(&other.fc1);
        self.fc2.sync_from(&other.fc2);
        self.fc3.sync_from(&other.fc3);
        self.value_head.sync_from(&other.value_head);
        self.advantage_head.sync_from(&other.advantage_head);
    }

    pub fn state_size(&self) -> usize {
        self.fc1.input_size()
    }

    pub fn action_size(&self) -> usize {
        self.advantage_head.output_size()
    }

    pub fn hidden_sizes(&self) -> [usize; 3] {
        [
            self.fc1.output_size(),
            self.fc2.output_size(),
            self.fc3.output_size(),
        ]
    }
}
