use serde::{Deserialize, Serialize};

use crate::error::{DuelqError, Result};

/// Precomputed linear exploration schedule.
///
/// Holds `decay_steps` values interpolated from `start` to `end`, both
/// endpoints included. Lookup saturates at the final value, so the schedule
/// can be indexed with any step count without going out of bounds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpsilonSchedule {
    start: f32,
    end: f32,
    decay_steps: usize,
    values: Vec<f32>,
}

impl EpsilonSchedule {
    pub fn linear(start: f32, end: f32, decay_steps: usize) -> Result<Self> {
        if decay_steps == 0 {
            return Err(DuelqError::invalid_parameter(
                "epsilon_decay_steps",
                "must be at least 1",
            ));
        }
        for (name, value) in [("epsilon_start", start), ("epsilon_end", end)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(DuelqError::InvalidParameter {
                    name: name.to_string(),
                    reason: format!("{} is not a probability", value),
                });
            }
        }

        let values = if decay_steps == 1 {
            vec![start]
        } else {
            let step = (end - start) / (decay_steps - 1) as f32;
            (0..decay_steps).map(|i| start + step * i as f32).collect()
        };

        Ok(EpsilonSchedule {
            start,
            end,
            decay_steps,
            values,
        })
    }

    /// Epsilon for the given environment step, saturating at the last value.
    pub fn value_at(&self, total_t: usize) -> f32 {
        self.values[total_t.min(self.decay_steps - 1)]
    }

    pub fn start(&self) -> f32 {
        self.start
    }

    pub fn end(&self) -> f32 {
        self.end
    }

    pub fn decay_steps(&self) -> usize {
        self.decay_steps
    }
}
