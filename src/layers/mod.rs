//! Neural network layers for the dueling Q-network.
//!
//! Two layer kinds are provided: a plain affine [`DenseLayer`] used at the
//! network input, and [`NoisyLinear`], an affine transform whose effective
//! weights are perturbed by learnable-scale Gaussian noise for
//! parameter-space exploration.

pub mod dense;
pub mod noisy;

pub use dense::{DenseGradients, DenseLayer};
pub use noisy::{NetworkMode, NoisyGradients, NoisyLinear};
