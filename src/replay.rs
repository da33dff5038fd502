use std::collections::VecDeque;

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{DuelqError, Result};

/// One environment step, immutable once stored.
///
/// `legal_actions` is the set of legal action ids at `next_state`; it is what
/// a bootstrap target would be allowed to pick from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub state: Array1<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_state: Array1<f32>,
    pub done: bool,
    pub legal_actions: Vec<usize>,
}

/// A minibatch decomposed into per-field batched arrays.
pub struct SampledBatch {
    pub states: Array2<f32>,
    pub actions: Vec<usize>,
    pub rewards: Array1<f32>,
    pub next_states: Array2<f32>,
    pub dones: Vec<bool>,
    pub legal_actions: Vec<Vec<usize>>,
}

fn entropy_rng() -> StdRng {
    StdRng::from_entropy()
}

/// Fixed-capacity FIFO replay memory with uniform random sampling.
///
/// The memory owns its RNG; sampling never touches thread-local state. RNG
/// state is not serialized, so a restored memory continues with the same
/// sampling distribution but fresh draws.
#[derive(Clone, Serialize, Deserialize)]
pub struct ReplayMemory {
    capacity: usize,
    batch_size: usize,
    memory: VecDeque<Transition>,
    #[serde(skip, default = "entropy_rng")]
    rng: StdRng,
}

impl ReplayMemory {
    pub fn new(capacity: usize, batch_size: usize) -> Result<Self> {
        Self::with_rng(capacity, batch_size, entropy_rng())
    }

    /// Deterministic construction for tests and reproducible runs.
    pub fn with_seed(capacity: usize, batch_size: usize, seed: u64) -> Result<Self> {
        Self::with_rng(capacity, batch_size, StdRng::seed_from_u64(seed))
    }

    fn with_rng(capacity: usize, batch_size: usize, rng: StdRng) -> Result<Self> {
        if capacity == 0 {
            return Err(DuelqError::invalid_parameter(
                "replay_memory_size",
                "must be at least 1",
            ));
        }
        if batch_size == 0 {
            return Err(DuelqError::invalid_parameter(
                "batch_size",
                "must be at least 1",
            ));
        }
        if batch_size > capacity {
            return Err(DuelqError::invalid_parameter(
                "batch_size",
                "cannot exceed the replay memory capacity",
            ));
        }
        Ok(ReplayMemory {
            capacity,
            batch_size,
            memory: VecDeque::with_capacity(capacity),
            rng,
        })
    }

    /// Append a transition, evicting the oldest one when at capacity.
    pub fn save(&mut self, transition: Transition) {
        if self.memory.len() == self.capacity {
            self.memory.pop_front();
        }
        self.memory.push_back(transition);
    }

    /// Draw `batch_size` distinct transitions uniformly at random without
    /// replacement, decomposed into per-field batches.
    pub fn sample(&mut self) -> Result<SampledBatch> {
        if self.memory.len() < self.batch_size {
            return Err(DuelqError::InsufficientData {
                available: self.memory.len(),
                requested: self.batch_size,
            });
        }

        let indices = rand::seq::index::sample(&mut self.rng, self.memory.len(), self.batch_size);
        let state_size = self.memory[0].state.len();

        let mut states = Array2::zeros((self.batch_size, state_size));
        let mut next_states = Array2::zeros((self.batch_size, state_size));
        let mut actions = Vec::with_capacity(self.batch_size);
        let mut rewards = Array1::zeros(self.batch_size);
        let mut dones = Vec::with_capacity(self.batch_size);
        let mut legal_actions = Vec::with_capacity(self.batch_size);

        for (row, index) in indices.into_iter().enumerate() {
            let transition = &self.memory[index];
            states.row_mut(row).assign(&transition.state);
            next_states.row_mut(row).assign(&transition.next_state);
            actions.push(transition.action);
            rewards[row] = transition.reward;
            dones.push(transition.done);
            legal_actions.push(transition.legal_actions.clone());
        }

        Ok(SampledBatch {
            states,
            actions,
            rewards,
            next_states,
            dones,
            legal_actions,
        })
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Iterate over the stored transitions, oldest first.
    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.memory.iter()
    }
}
