//! # duelq - Noisy Dueling Double-DQN for Turn-Based Card Games
//!
//! duelq is the training core of a value-based reinforcement-learning agent
//! for card games with discrete, per-state legal action sets. It provides
//! replay-memory management, a dueling Q-network with noisy linear layers
//! for exploration, Double-DQN target computation, epsilon-greedy action
//! selection over legal actions, and a versioned checkpoint/restore
//! protocol that exactly reproduces a training run's state.
//!
//! The game engine, observation encoding, and outer training loop live
//! outside this crate; the agent only consumes [`types::EnvState`]
//! observations and transition tuples.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use duelq::agent::{DqnAgent, DqnConfig};
//!
//! // An agent for a game with 4-dimensional observations and 2 actions.
//! let config = DqnConfig {
//!     batch_size: 32,
//!     replay_memory_init_size: 100,
//!     ..DqnConfig::new(4, 2)
//! };
//! let mut agent = DqnAgent::new(config).unwrap();
//!
//! // Feed transitions from the environment with `agent.feed(...)`,
//! // collect actions with `agent.step(...)`, evaluate greedily with
//! // `agent.eval_step(...)`.
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - Activation functions for the network layers
//! - [`agent`] - The DQN agent: exploration policy, training cadence,
//!   checkpoint lifecycle
//! - [`checkpoint`] - Versioned checkpoint schema and (atomic) file IO
//! - [`error`] - Error types and result handling
//! - [`layers`] - Dense and noisy linear layers
//! - [`network`] - The dueling Q-network
//! - [`optimizer`] - SGD, Adam, and RMSProp with per-slot state
//! - [`replay`] - Transitions and the FIFO replay memory
//! - [`schedule`] - Precomputed linear epsilon schedule
//! - [`types`] - Environment-boundary types

pub mod activations;
pub mod agent;
pub mod checkpoint;
pub mod error;
pub mod layers;
pub mod network;
pub mod optimizer;
pub mod replay;
pub mod schedule;
pub mod types;

#[cfg(test)]
mod tests;
