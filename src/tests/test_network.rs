use ndarray::{array, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::layers::NetworkMode;
use crate::network::DuelingQNetwork;
use crate::optimizer::{OptimizerWrapper, SGD};

fn network(seed: u64) -> (DuelingQNetwork, StdRng) {
    let mut rng = StdRng::seed_from_u64(seed);
    let network = DuelingQNetwork::new(4, 3, &[16, 16, 16], 0.5, &mut rng);
    (network, rng)
}

#[test]
fn test_forward_shapes() {
    let (mut network, _) = network(1);
    let single = network.forward(array![0.1, -0.2, 0.3, 0.4].view());
    assert_eq!(single.len(), 3);

    let batch = array![[0.1, -0.2, 0.3, 0.4], [1.0, 0.0, -1.0, 0.5]];
    let output = network.forward_batch(batch.view());
    assert_eq!(output.dim(), (2, 3));
}

#[test]
fn test_dueling_identity() {
    // By construction mean_a(Q(s,a) - V(s)) == mean_a(A(s,a) - mean A) == 0,
    // i.e. the action-mean of the Q-values equals the value stream.
    let (mut network, _) = network(2);
    let batch = array![[0.5, -0.5, 1.0, 0.0], [0.0, 0.0, 0.0, 0.0]];
    let (q_values, value, _advantage) = network.forward_batch_parts(batch.view());
    for row in 0..2 {
        let q_mean = q_values.row(row).mean().unwrap();
        assert!(
            (q_mean - value[[row, 0]]).abs() < 1e-5,
            "mean Q {} deviates from V {}",
            q_mean,
            value[[row, 0]]
        );
    }
}

#[test]
fn test_sync_idempotence() {
    let (mut online, mut rng) = network(3);
    let mut target = DuelingQNetwork::new(4, 3, &[16, 16, 16], 0.5, &mut rng);

    target.sync_from(&online);
    online.set_mode(NetworkMode::Inference);
    target.set_mode(NetworkMode::Inference);

    let input = array![0.1, 0.2, 0.3, 0.4];
    let after_first = target.forward(input.view());
    target.sync_from(&online);
    let after_second = target.forward(input.view());
    assert_eq!(after_first, after_second);
    assert_eq!(online.forward(input.view()), after_second);
}

#[test]
fn test_inference_forward_is_deterministic() {
    let (mut network, mut rng) = network(4);
    network.set_mode(NetworkMode::Inference);
    let input = array![0.3, -0.1, 0.0, 0.9];
    let first = network.forward(input.view());
    network.reset_noise(&mut rng);
    let second = network.forward(input.view());
    assert_eq!(first, second);
}

#[test]
fn test_training_forward_changes_with_noise() {
    let (mut network, mut rng) = network(5);
    network.set_mode(NetworkMode::Training);
    let input = array![0.3, -0.1, 0.0, 0.9];
    let first = network.forward(input.view());
    network.reset_noise(&mut rng);
    let second = network.forward(input.view());
    assert_ne!(first, second);
}

#[test]
fn test_gradient_step_reduces_error() {
    let (mut network, _) = network(6);
    let mut optimizer = OptimizerWrapper::SGD(SGD::new());
    let inputs = array![[0.5, -0.5, 1.0, 0.0]];
    let target = array![[1.0, -1.0, 0.5]];

    let mse = |q: &Array2<f32>| {
        (q - &target).mapv(|e| e * e).mean().unwrap()
    };

    // Fixed noise throughout: the effective network is a constant function
    // of its parameters, so plain gradient descent must make progress.
    let initial = mse(&network.forward_batch(inputs.view()));
    for _ in 0..200 {
        let q = network.forward_batch(inputs.view());
        let dq = (&q - &target) * (2.0 / 3.0);
        let gradients = network.backward_batch(dq.view());
        network.apply_gradients(&gradients, &mut optimizer, 0.01);
    }
    let trained = mse(&network.forward_batch(inputs.view()));
    assert!(
        trained < initial * 0.5,
        "error did not drop: {} -> {}",
        initial,
        trained
    );
}

#[test]
fn test_parameter_layout_slot_counts() {
    let (network, _) = network(7);
    let layout = network.parameter_layout();
    // One dense layer plus four noisy layers with mu and sigma each.
    assert_eq!(layout.weight_shapes.len(), 9);
    assert_eq!(layout.bias_shapes.len(), 9);
    assert_eq!(layout.weight_shapes[0], (4, 16));
    assert_eq!(*layout.weight_shapes.last().unwrap(), (16, 3));
}

#[test]
fn test_serde_round_trip_preserves_inference_outputs() {
    let (mut network, _) = network(8);
    let bytes = bincode::serialize(&network).unwrap();
    let mut restored: DuelingQNetwork = bincode::deserialize(&bytes).unwrap();

    network.set_mode(NetworkMode::Inference);
    restored.set_mode(NetworkMode::Inference);
    let input = array![0.2, 0.4, -0.6, 0.8];
    assert_eq!(network.forward(input.view()), restored.forward(input.view()));
}
