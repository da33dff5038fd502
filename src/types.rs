use std::collections::BTreeMap;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Observation the game environment hands to the agent for one decision.
///
/// The agent reads nothing about the game beyond this struct: the encoded
/// observation vector, the ordered legal-action map (action id to optional
/// per-action metadata, which the agent ignores), and the raw human-readable
/// labels aligned with the legal actions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvState {
    pub obs: Array1<f32>,
    pub legal_actions: BTreeMap<usize, Option<Vec<f32>>>,
    pub raw_legal_actions: Vec<String>,
}

impl EnvState {
    /// Legal action ids in ascending order.
    pub fn legal_action_ids(&self) -> Vec<usize> {
        self.legal_actions.keys().copied().collect()
    }
}
