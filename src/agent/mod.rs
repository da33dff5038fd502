//! # Reinforcement Learning Agent Module
//!
//! The [`DqnAgent`] implements Double DQN over a noisy dueling Q-network for
//! turn-based card games whose legal actions vary per state.
//!
//! ## Core Concepts
//!
//! - **Warm-up**: transitions are collected until the replay memory holds
//!   `replay_memory_init_size` entries; no gradient updates happen before.
//! - **Exploration**: an epsilon-greedy policy over legal actions, layered on
//!   noisy network layers whose Gaussian weight noise is redrawn for every
//!   decision.
//! - **Double DQN**: the online network selects the best next action, the
//!   periodically-synced target network evaluates it.
//! - **Legal-action masking**: illegal actions are forced to negative
//!   infinity before any argmax, so the live policy can never pick them.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use duelq::agent::{DqnAgent, DqnConfig};
//! use duelq::types::EnvState;
//! use ndarray::array;
//! use std::collections::BTreeMap;
//!
//! let config = DqnConfig {
//!     replay_memory_init_size: 100,
//!     ..DqnConfig::new(4, 2)
//! };
//! let mut agent = DqnAgent::new(config).unwrap();
//!
//! let mut legal_actions = BTreeMap::new();
//! legal_actions.insert(0, None);
//! legal_actions.insert(1, None);
//! let state = EnvState {
//!     obs: array![0.1, -0.2, 0.3, 0.0],
//!     legal_actions,
//!     raw_legal_actions: vec!["check".into(), "bet".into()],
//! };
//!
//! let action = agent.step(&state).unwrap();
//! assert!(action < 2);
//! ```

mod dqn;

pub use dqn::{DqnAgent, DqnConfig, OptimizerKind};
