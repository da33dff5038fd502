use ndarray::array;

use crate::optimizer::{Adam, Optimizer, OptimizerWrapper, ParameterLayout, RMSProp, SGD};

fn layout() -> ParameterLayout {
    ParameterLayout {
        weight_shapes: vec![(2, 2), (2, 2)],
        bias_shapes: vec![2, 2],
    }
}

#[test]
fn test_sgd_update_weights() {
    let mut sgd = SGD::new();
    let mut weights = array![[1.0, 1.0], [1.0, 1.0]];
    let gradients = array![[0.1, 0.2], [0.3, 0.4]];

    sgd.update_weights(0, &mut weights, &gradients, 0.01);

    let expected = array![[0.999, 0.998], [0.997, 0.996]];
    assert_eq!(weights, expected);
}

#[test]
fn test_sgd_update_biases() {
    let mut sgd = SGD::new();
    let mut biases = array![1.0, 1.0];
    let gradients = array![0.1, 0.2];

    sgd.update_biases(0, &mut biases, &gradients, 0.01);

    assert_eq!(biases, array![0.999, 0.998]);
}

#[test]
fn test_adam_new() {
    let adam = Adam::new(&layout(), 0.9, 0.999, 1e-8);
    assert_eq!(adam.beta1, 0.9);
    assert_eq!(adam.beta2, 0.999);
    assert_eq!(adam.epsilon, 1e-8);
    assert_eq!(adam.t, 1);
}

#[test]
fn test_adam_moves_against_gradient() {
    let mut adam = Adam::default_for(&layout());
    let mut weights = array![[1.0, 1.0], [1.0, 1.0]];
    let gradients = array![[0.5, -0.5], [0.5, -0.5]];

    adam.update_weights(0, &mut weights, &gradients, 0.1);

    // Positive gradient decreases the weight, negative increases it.
    assert!(weights[[0, 0]] < 1.0);
    assert!(weights[[0, 1]] > 1.0);
}

#[test]
fn test_adam_end_step_advances_counter() {
    let mut adam = Adam::default_for(&layout());
    assert_eq!(adam.t, 1);
    adam.end_step();
    adam.end_step();
    assert_eq!(adam.t, 3);
}

#[test]
fn test_adam_slots_are_independent() {
    let mut adam = Adam::default_for(&layout());
    let mut weights = array![[1.0, 1.0], [1.0, 1.0]];
    let gradients = array![[0.5, 0.5], [0.5, 0.5]];
    let zeros = array![[0.0, 0.0], [0.0, 0.0]];

    // Slot 1 accumulates no momentum from slot 0's updates.
    adam.update_weights(0, &mut weights, &gradients, 0.1);
    let mut untouched = array![[1.0, 1.0], [1.0, 1.0]];
    adam.update_weights(1, &mut untouched, &zeros, 0.1);
    assert_eq!(untouched, array![[1.0, 1.0], [1.0, 1.0]]);
}

#[test]
fn test_rmsprop_moves_against_gradient() {
    let mut rmsprop = RMSProp::default_for(&layout());
    let mut weights = array![[1.0, 1.0], [1.0, 1.0]];
    let gradients = array![[0.5, -0.5], [0.5, -0.5]];

    rmsprop.update_weights(0, &mut weights, &gradients, 0.1);

    assert!(weights[[0, 0]] < 1.0);
    assert!(weights[[0, 1]] > 1.0);
}

#[test]
fn test_wrapper_dispatch_and_serde() {
    let mut wrapper = OptimizerWrapper::Adam(Adam::default_for(&layout()));
    let mut weights = array![[1.0, 1.0], [1.0, 1.0]];
    let gradients = array![[0.5, 0.5], [0.5, 0.5]];
    wrapper.update_weights(0, &mut weights, &gradients, 0.1);
    wrapper.end_step();
    assert!(weights[[0, 0]] < 1.0);

    // Optimizer state survives a serde round trip.
    let bytes = bincode::serialize(&wrapper).unwrap();
    let mut restored: OptimizerWrapper = bincode::deserialize(&bytes).unwrap();
    let mut a = weights.clone();
    let mut b = weights.clone();
    wrapper.update_weights(0, &mut a, &gradients, 0.1);
    restored.update_weights(0, &mut b, &gradients, 0.1);
    assert_eq!(a, b);
}
