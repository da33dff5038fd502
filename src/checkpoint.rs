use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::agent::DqnConfig;
use crate::error::{DuelqError, Result};
use crate::network::DuelingQNetwork;
use crate::optimizer::OptimizerWrapper;
use crate::replay::ReplayMemory;
use crate::schedule::EpsilonSchedule;

/// Schema version written into every checkpoint; bumped on layout changes.
pub const CHECKPOINT_VERSION: u32 = 1;

/// A complete, typed snapshot of a training run.
///
/// Everything needed to reconstruct the agent is carried explicitly:
/// hyperparameters, both networks, optimizer state, the full replay memory,
/// the epsilon schedule, and the step counters. Restoring yields an agent
/// whose behavior is indistinguishable from the original aside from fresh
/// random draws.
#[derive(Clone, Serialize, Deserialize)]
pub struct AgentCheckpoint {
    pub version: u32,
    pub config: DqnConfig,
    pub total_t: usize,
    pub train_t: usize,
    pub epsilons: EpsilonSchedule,
    pub q_network: DuelingQNetwork,
    pub target_network: DuelingQNetwork,
    pub optimizer: OptimizerWrapper,
    pub memory: ReplayMemory,
}

impl AgentCheckpoint {
    /// Reject checkpoints produced by an incompatible configuration before
    /// any of their contents are used.
    pub fn validate(&self) -> Result<()> {
        if self.version != CHECKPOINT_VERSION {
            return Err(DuelqError::CheckpointMismatch {
                field: "version".to_string(),
                reason: format!(
                    "checkpoint version {} is not supported (expected {})",
                    self.version, CHECKPOINT_VERSION
                ),
            });
        }
        self.config.validate()?;

        for (name, network) in [
            ("q_network", &self.q_network),
            ("target_network", &self.target_network),
        ] {
            if network.state_size() != self.config.state_size
                || network.action_size() != self.config.num_actions
            {
                return Err(DuelqError::CheckpointMismatch {
                    field: name.to_string(),
                    reason: format!(
                        "network maps {} -> {} but the configuration says {} -> {}",
                        network.state_size(),
                        network.action_size(),
                        self.config.state_size,
                        self.config.num_actions
                    ),
                });
            }
            if network.hidden_sizes() != self.config.hidden_sizes {
                return Err(DuelqError::CheckpointMismatch {
                    field: name.to_string(),
                    reason: "hidden layer widths disagree with the configuration".to_string(),
                });
            }
        }

        if self.memory.capacity() != self.config.replay_memory_size
            || self.memory.batch_size() != self.config.batch_size
        {
            return Err(DuelqError::CheckpointMismatch {
                field: "memory".to_string(),
                reason: "replay memory capacity or batch size disagrees with the configuration"
                    .to_string(),
            });
        }

        if self.epsilons.decay_steps() != self.config.epsilon_decay_steps {
            return Err(DuelqError::CheckpointMismatch {
                field: "epsilons".to_string(),
                reason: "epsilon schedule length disagrees with the configuration".to_string(),
            });
        }

        Ok(())
    }

    /// Write the checkpoint as a single bincode blob.
    ///
    /// The bytes go to a sibling temporary file first and are renamed into
    /// place, so a partially written checkpoint is never exposed under the
    /// target path.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = bincode::serialize(self)?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = std::path::PathBuf::from(tmp);
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, path)?;
        log::info!("saved agent checkpoint to {}", path.display());
        Ok(())
    }

    /// Read and validate a checkpoint blob.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        let checkpoint: AgentCheckpoint = bincode::deserialize(&bytes)?;
        checkpoint.validate()?;
        Ok(checkpoint)
    }
}
