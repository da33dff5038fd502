use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::checkpoint::{AgentCheckpoint, CHECKPOINT_VERSION};
use crate::error::{DuelqError, Result};
use crate::layers::NetworkMode;
use crate::network::DuelingQNetwork;
use crate::optimizer::{Adam, OptimizerWrapper, RMSProp, SGD};
use crate::replay::{ReplayMemory, Transition};
use crate::schedule::EpsilonSchedule;
use crate::types::EnvState;

/// Gradient-descent variant used for the Q-network update.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerKind {
    Sgd,
    Adam,
    RmsProp,
}

/// Hyperparameters of a [`DqnAgent`].
///
/// [`DqnConfig::new`] fills every field except the state/action sizes with
/// the defaults of the reference configuration; individual fields can be
/// overridden with struct-update syntax.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DqnConfig {
    pub state_size: usize,
    pub num_actions: usize,
    pub replay_memory_size: usize,
    pub replay_memory_init_size: usize,
    pub update_target_estimator_every: usize,
    pub discount_factor: f32,
    pub epsilon_start: f32,
    pub epsilon_end: f32,
    pub epsilon_decay_steps: usize,
    pub batch_size: usize,
    pub train_every: usize,
    pub hidden_sizes: [usize; 3],
    pub sigma_init: f32,
    pub learning_rate: f32,
    pub optimizer: OptimizerKind,
    /// Save a checkpoint every this many training steps; `None` never saves.
    pub save_every: Option<usize>,
    pub save_path: Option<PathBuf>,
    /// Seed for all random draws (exploration, noise, sampling, init).
    pub seed: Option<u64>,
}

impl DqnConfig {
    pub fn new(state_size: usize, num_actions: usize) -> Self {
        DqnConfig {
            state_size,
            num_actions,
            replay_memory_size: 20_000,
            replay_memory_init_size: 100,
            update_target_estimator_every: 1000,
            discount_factor: 0.99,
            epsilon_start: 1.0,
            epsilon_end: 0.1,
            epsilon_decay_steps: 20_000,
            batch_size: 32,
            train_every: 1,
            hidden_sizes: [64, 64, 64],
            sigma_init: 0.5,
            learning_rate: 5e-5,
            optimizer: OptimizerKind::Adam,
            save_every: None,
            save_path: None,
            seed: None,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.state_size == 0 {
            return Err(DuelqError::invalid_parameter("state_size", "must be at least 1"));
        }
        if self.num_actions == 0 {
            return Err(DuelqError::invalid_parameter("num_actions", "must be at least 1"));
        }
        if self.train_every == 0 {
            return Err(DuelqError::invalid_parameter("train_every", "must be at least 1"));
        }
        if self.update_target_estimator_every == 0 {
            return Err(DuelqError::invalid_parameter(
                "update_target_estimator_every",
                "must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.discount_factor) {
            return Err(DuelqError::invalid_parameter(
                "discount_factor",
                "must lie in [0, 1]",
            ));
        }
        if !(self.learning_rate > 0.0) {
            return Err(DuelqError::invalid_parameter(
                "learning_rate",
                "must be positive",
            ));
        }
        if self.sigma_init < 0.0 {
            return Err(DuelqError::invalid_parameter(
                "sigma_init",
                "must be non-negative",
            ));
        }
        if self.hidden_sizes.iter().any(|&h| h == 0) {
            return Err(DuelqError::invalid_parameter(
                "hidden_sizes",
                "every hidden layer needs at least one unit",
            ));
        }
        if let Some(0) = self.save_every {
            return Err(DuelqError::invalid_parameter(
                "save_every",
                "must be at least 1 when set",
            ));
        }
        Ok(())
    }
}

/// Double-DQN agent over a noisy dueling Q-network.
///
/// The agent exclusively owns its replay memory, the online and target
/// networks, and the optimizer; nothing is shared across agents. It consumes
/// [`EnvState`] observations produced by the game environment and never
/// mutates environment state.
pub struct DqnAgent {
    config: DqnConfig,
    /// Total environment steps fed so far.
    total_t: usize,
    /// Gradient steps performed so far.
    train_t: usize,
    epsilons: EpsilonSchedule,
    pub q_network: DuelingQNetwork,
    pub target_network: DuelingQNetwork,
    optimizer: OptimizerWrapper,
    memory: ReplayMemory,
    rng: StdRng,
}

impl DqnAgent {
    pub fn new(config: DqnConfig) -> Result<Self> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let memory_seed: u64 = rng.gen();
        let memory =
            ReplayMemory::with_seed(config.replay_memory_size, config.batch_size, memory_seed)?;
        let epsilons = EpsilonSchedule::linear(
            config.epsilon_start,
            config.epsilon_end,
            config.epsilon_decay_steps,
        )?;

        let q_network = DuelingQNetwork::new(
            config.state_size,
            config.num_actions,
            &config.hidden_sizes,
            config.sigma_init,
            &mut rng,
        );
        // Construct-then-sync rather than cloning the online network.
        let mut target_network = DuelingQNetwork::new(
            config.state_size,
            config.num_actions,
            &config.hidden_sizes,
            config.sigma_init,
            &mut rng,
        );
        target_network.sync_from(&q_network);

        let layout = q_network.parameter_layout();
        let optimizer = match config.optimizer {
            OptimizerKind::Sgd => OptimizerWrapper::SGD(SGD::new()),
            OptimizerKind::Adam => OptimizerWrapper::Adam(Adam::default_for(&layout)),
            OptimizerKind::RmsProp => OptimizerWrapper::RMSProp(RMSProp::default_for(&layout)),
        };

        Ok(DqnAgent {
            config,
            total_t: 0,
            train_t: 0,
            epsilons,
            q_network,
            target_network,
            optimizer,
            memory,
            rng,
        })
    }

    /// Store one environment transition and train when the cadence says so.
    ///
    /// During warm-up (fewer than `replay_memory_init_size` steps fed) the
    /// transition is stored and nothing else happens. Afterwards a gradient
    /// step runs every `train_every` environment steps; its loss is returned.
    /// A training step that finds too few transitions to sample is skipped,
    /// not an error.
    pub fn feed(
        &mut self,
        state: &EnvState,
        action: usize,
        reward: f32,
        next_state: &EnvState,
        done: bool,
    ) -> Result<Option<f32>> {
        if next_state.legal_actions.is_empty() {
            return Err(DuelqError::EmptyLegalActions);
        }
        self.check_obs(state.obs.view())?;
        self.check_obs(next_state.obs.view())?;
        if action >= self.config.num_actions {
            return Err(DuelqError::InvalidAction {
                action,
                max_actions: self.config.num_actions,
            });
        }
        let legal_actions = next_state.legal_action_ids();
        for &legal in &legal_actions {
            if legal >= self.config.num_actions {
                return Err(DuelqError::InvalidAction {
                    action: legal,
                    max_actions: self.config.num_actions,
                });
            }
        }

        self.memory.save(Transition {
            state: state.obs.clone(),
            action,
            reward,
            next_state: next_state.obs.clone(),
            done,
            legal_actions,
        });
        self.total_t += 1;

        if self.total_t >= self.config.replay_memory_init_size
            && (self.total_t - self.config.replay_memory_init_size) % self.config.train_every == 0
        {
            match self.train() {
                Ok(loss) => Ok(Some(loss)),
                Err(DuelqError::InsufficientData { .. }) => Ok(None),
                Err(err) => Err(err),
            }
        } else {
            Ok(None)
        }
    }

    /// Select an action for data collection.
    ///
    /// Fresh weight noise is drawn, then with probability `epsilon[total_t]`
    /// a uniformly random legal action is taken; otherwise the legal action
    /// with the highest noise-perturbed Q-value.
    pub fn step(&mut self, state: &EnvState) -> Result<usize> {
        self.q_network.set_mode(NetworkMode::Training);
        self.q_network.reset_noise(&mut self.rng);
        let masked_q = self.predict(state)?;
        let legal_actions = state.legal_action_ids();

        let epsilon = self.epsilons.value_at(self.total_t);
        if self.rng.gen::<f32>() < epsilon {
            Ok(legal_actions[self.rng.gen_range(0..legal_actions.len())])
        } else {
            Ok(self.choose_best(&masked_q, &legal_actions))
        }
    }

    /// Select an action for evaluation: deterministic mean weights, no
    /// exploration. Also returns the Q-value of every legal action keyed by
    /// its raw label, for caller introspection.
    pub fn eval_step(&mut self, state: &EnvState) -> Result<(usize, BTreeMap<String, f32>)> {
        self.q_network.set_mode(NetworkMode::Inference);
        let masked_q = self.predict(state)?;
        let legal_actions = state.legal_action_ids();
        if state.raw_legal_actions.len() != legal_actions.len() {
            return Err(DuelqError::dimension_mismatch(
                format!("{} raw legal action labels", legal_actions.len()),
                format!("{}", state.raw_legal_actions.len()),
            ));
        }

        let action = self.choose_best(&masked_q, &legal_actions);
        let values = legal_actions
            .iter()
            .zip(&state.raw_legal_actions)
            .map(|(&legal, label)| (label.clone(), masked_q[legal]))
            .collect();
        Ok((action, values))
    }

    /// Q-values with illegal actions masked to negative infinity.
    fn predict(&mut self, state: &EnvState) -> Result<Array1<f32>> {
        self.check_obs(state.obs.view())?;
        if state.legal_actions.is_empty() {
            return Err(DuelqError::EmptyLegalActions);
        }
        for &legal in state.legal_actions.keys() {
            if legal >= self.config.num_actions {
                return Err(DuelqError::InvalidAction {
                    action: legal,
                    max_actions: self.config.num_actions,
                });
            }
        }

        let q_values = self.q_network.forward(state.obs.view());
        let mut masked_q = Array1::from_elem(self.config.num_actions, f32::NEG_INFINITY);
        for &legal in state.legal_actions.keys() {
            masked_q[legal] = q_values[legal];
        }
        Ok(masked_q)
    }

    /// Highest-valued legal action, with a uniform-random legal fallback if
    /// no masked Q-value is finite (floating-point drift, never an error).
    fn choose_best(&mut self, masked_q: &Array1<f32>, legal_actions: &[usize]) -> usize {
        let best = legal_actions
            .iter()
            .copied()
            .filter(|&action| masked_q[action].is_finite())
            .max_by(|&a, &b| {
                masked_q[a]
                    .partial_cmp(&masked_q[b])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        match best {
            Some(action) => action,
            None => legal_actions[self.rng.gen_range(0..legal_actions.len())],
        }
    }

    /// Run one Double-DQN gradient step on a sampled minibatch.
    pub fn train(&mut self) -> Result<f32> {
        let batch = self.memory.sample()?;
        let batch_size = self.config.batch_size;

        self.q_network.set_mode(NetworkMode::Training);
        self.target_network.set_mode(NetworkMode::Training);
        self.q_network.reset_noise(&mut self.rng);
        self.target_network.reset_noise(&mut self.rng);

        // Select best next actions with the online network. The argmax is
        // deliberately not restricted to the stored legal actions; masking
        // applies to live action selection only.
        let next_q_online = self.q_network.forward_batch(batch.next_states.view());
        let best_actions: Vec<usize> = next_q_online
            .rows()
            .into_iter()
            .map(Self::argmax_row)
            .collect();

        // Evaluate those actions with the target network.
        let next_q_target = self.target_network.forward_batch(batch.next_states.view());
        let mut targets = Array1::zeros(batch_size);
        for i in 0..batch_size {
            let bootstrap = if batch.dones[i] {
                0.0
            } else {
                self.config.discount_factor * next_q_target[[i, best_actions[i]]]
            };
            targets[i] = batch.rewards[i] + bootstrap;
        }

        let q_values = self.q_network.forward_batch(batch.states.view());
        let mut dq = Array2::zeros((batch_size, self.config.num_actions));
        let mut loss = 0.0;
        for i in 0..batch_size {
            let error = q_values[[i, batch.actions[i]]] - targets[i];
            loss += error * error;
            dq[[i, batch.actions[i]]] = 2.0 * error / batch_size as f32;
        }
        loss /= batch_size as f32;

        if !loss.is_finite() {
            // A single bad batch must not kill the outer loop; skip the
            // gradient step and move on.
            log::warn!(
                "skipping gradient step at step {}: non-finite loss {}",
                self.total_t,
                loss
            );
            return Ok(loss);
        }

        let gradients = self.q_network.backward_batch(dq.view());
        self.q_network
            .apply_gradients(&gradients, &mut self.optimizer, self.config.learning_rate);
        self.train_t += 1;
        log::debug!("step {}, rl-loss: {}", self.total_t, loss);

        if self.total_t % self.config.update_target_estimator_every == 0 {
            self.target_network.sync_from(&self.q_network);
            log::info!("copied model parameters to target network at step {}", self.total_t);
        }

        if let Some(save_every) = self.config.save_every {
            if self.train_t % save_every == 0 {
                if let Some(path) = self.config.save_path.clone() {
                    self.save_checkpoint(path)?;
                }
            }
        }

        Ok(loss)
    }

    fn argmax_row(row: ArrayView1<f32>) -> usize {
        row.iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(index, _)| index)
            .unwrap_or(0)
    }

    fn check_obs(&self, obs: ArrayView1<f32>) -> Result<()> {
        if obs.len() != self.config.state_size {
            return Err(DuelqError::dimension_mismatch(
                format!("state vector of length {}", self.config.state_size),
                format!("length {}", obs.len()),
            ));
        }
        Ok(())
    }

    /// Snapshot everything needed to resume training later.
    pub fn checkpoint(&self) -> AgentCheckpoint {
        AgentCheckpoint {
            version: CHECKPOINT_VERSION,
            config: self.config.clone(),
            total_t: self.total_t,
            train_t: self.train_t,
            epsilons: self.epsilons.clone(),
            q_network: self.q_network.clone(),
            target_network: self.target_network.clone(),
            optimizer: self.optimizer.clone(),
            memory: self.memory.clone(),
        }
    }

    /// Rebuild an agent from a checkpoint snapshot.
    ///
    /// The restored agent continues as if uninterrupted, apart from fresh
    /// random draws: RNG state is deliberately not part of the checkpoint.
    pub fn from_checkpoint(checkpoint: AgentCheckpoint) -> Result<Self> {
        checkpoint.validate()?;
        log::info!("restoring agent from checkpoint at step {}", checkpoint.total_t);
        let AgentCheckpoint {
            config,
            total_t,
            train_t,
            epsilons,
            q_network,
            target_network,
            optimizer,
            memory,
            ..
        } = checkpoint;
        Ok(DqnAgent {
            config,
            total_t,
            train_t,
            epsilons,
            q_network,
            target_network,
            optimizer,
            memory,
            rng: StdRng::from_entropy(),
        })
    }

    /// Serialize a checkpoint to disk (written fully before being exposed).
    pub fn save_checkpoint<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.checkpoint().save(path)
    }

    /// Load an agent from a checkpoint file.
    pub fn load_checkpoint<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_checkpoint(AgentCheckpoint::load(path)?)
    }

    pub fn config(&self) -> &DqnConfig {
        &self.config
    }

    pub fn total_t(&self) -> usize {
        self.total_t
    }

    pub fn train_t(&self) -> usize {
        self.train_t
    }

    pub fn memory(&self) -> &ReplayMemory {
        &self.memory
    }

    pub fn epsilons(&self) -> &EpsilonSchedule {
        &self.epsilons
    }
}
