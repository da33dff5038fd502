use std::collections::BTreeMap;

use ndarray::{array, Array1};

use crate::agent::{DqnAgent, DqnConfig};
use crate::error::DuelqError;
use crate::types::EnvState;

fn env_state(obs: Array1<f32>, legal: &[usize]) -> EnvState {
    EnvState {
        obs,
        legal_actions: legal.iter().map(|&a| (a, None)).collect::<BTreeMap<_, _>>(),
        raw_legal_actions: legal.iter().map(|a| format!("action-{}", a)).collect(),
    }
}

fn small_config() -> DqnConfig {
    DqnConfig {
        replay_memory_size: 100,
        replay_memory_init_size: 10,
        batch_size: 4,
        hidden_sizes: [8, 8, 8],
        epsilon_decay_steps: 50,
        seed: Some(17),
        ..DqnConfig::new(4, 2)
    }
}

#[test]
fn test_config_validation() {
    assert!(DqnAgent::new(DqnConfig::new(0, 2)).is_err());
    assert!(DqnAgent::new(DqnConfig::new(4, 0)).is_err());
    assert!(DqnAgent::new(DqnConfig {
        batch_size: 200,
        replay_memory_size: 100,
        ..DqnConfig::new(4, 2)
    })
    .is_err());
    assert!(DqnAgent::new(DqnConfig {
        epsilon_decay_steps: 0,
        ..DqnConfig::new(4, 2)
    })
    .is_err());
    assert!(DqnAgent::new(DqnConfig {
        train_every: 0,
        ..DqnConfig::new(4, 2)
    })
    .is_err());
}

#[test]
fn test_warm_up_then_first_training_step() {
    let mut agent = DqnAgent::new(small_config()).unwrap();
    let state = env_state(array![0.1, 0.2, 0.3, 0.4], &[0, 1]);
    let next = env_state(array![0.2, 0.3, 0.4, 0.5], &[0, 1]);

    for i in 0..9 {
        let loss = agent.feed(&state, i % 2, 0.5, &next, false).unwrap();
        assert!(loss.is_none(), "trained during warm-up at step {}", i);
    }
    assert_eq!(agent.train_t(), 0);
    assert_eq!(agent.total_t(), 9);

    let loss = agent.feed(&state, 1, 1.0, &next, true).unwrap();
    let loss = loss.expect("first training step after warm-up");
    assert!(loss.is_finite());
    assert!(loss >= 0.0);
    assert_eq!(agent.train_t(), 1);
    assert_eq!(agent.total_t(), 10);
}

#[test]
fn test_feed_rejects_empty_legal_actions() {
    let mut agent = DqnAgent::new(small_config()).unwrap();
    let state = env_state(array![0.1, 0.2, 0.3, 0.4], &[0, 1]);
    let next = env_state(array![0.2, 0.3, 0.4, 0.5], &[]);
    match agent.feed(&state, 0, 0.0, &next, false) {
        Err(DuelqError::EmptyLegalActions) => {}
        other => panic!("expected EmptyLegalActions, got ok={}", other.is_ok()),
    }
}

#[test]
fn test_feed_rejects_wrong_dimensions() {
    let mut agent = DqnAgent::new(small_config()).unwrap();
    let state = env_state(array![0.1, 0.2], &[0, 1]);
    let next = env_state(array![0.2, 0.3, 0.4, 0.5], &[0, 1]);
    assert!(matches!(
        agent.feed(&state, 0, 0.0, &next, false),
        Err(DuelqError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_step_only_picks_legal_actions() {
    let config = DqnConfig {
        num_actions: 4,
        ..small_config()
    };
    let mut agent = DqnAgent::new(config).unwrap();
    let state = env_state(array![0.1, -0.2, 0.3, 0.0], &[0, 2]);
    for _ in 0..200 {
        let action = agent.step(&state).unwrap();
        assert!(action == 0 || action == 2);
    }
}

#[test]
fn test_eval_step_masks_and_reports_values() {
    let config = DqnConfig {
        num_actions: 4,
        ..small_config()
    };
    let mut agent = DqnAgent::new(config).unwrap();
    let state = env_state(array![0.1, -0.2, 0.3, 0.0], &[0, 2]);

    for _ in 0..50 {
        let (action, values) = agent.eval_step(&state).unwrap();
        assert!(action == 0 || action == 2);
        assert_eq!(values.len(), 2);
        assert!(values.contains_key("action-0"));
        assert!(values.contains_key("action-2"));
        assert!(values.values().all(|v| v.is_finite()));
    }
}

#[test]
fn test_eval_step_is_deterministic() {
    let mut agent = DqnAgent::new(small_config()).unwrap();
    let state = env_state(array![0.4, 0.3, 0.2, 0.1], &[0, 1]);
    let (first_action, first_values) = agent.eval_step(&state).unwrap();
    let (second_action, second_values) = agent.eval_step(&state).unwrap();
    assert_eq!(first_action, second_action);
    assert_eq!(first_values, second_values);
}

#[test]
fn test_checkpoint_round_trip_in_memory() {
    let mut agent = DqnAgent::new(small_config()).unwrap();
    let state = env_state(array![0.1, 0.2, 0.3, 0.4], &[0, 1]);
    let next = env_state(array![0.2, 0.3, 0.4, 0.5], &[0, 1]);
    for i in 0..15 {
        agent.feed(&state, i % 2, 0.1 * i as f32, &next, i % 5 == 4).unwrap();
    }

    let mut restored = DqnAgent::from_checkpoint(agent.checkpoint()).unwrap();

    assert_eq!(restored.total_t(), agent.total_t());
    assert_eq!(restored.train_t(), agent.train_t());
    assert_eq!(restored.memory().len(), agent.memory().len());

    let original_memory: Vec<_> = agent.memory().transitions().cloned().collect();
    let restored_memory: Vec<_> = restored.memory().transitions().cloned().collect();
    assert_eq!(original_memory, restored_memory);

    // Deterministic (noise-free) Q-values must match exactly.
    let (_, original_values) = agent.eval_step(&state).unwrap();
    let (_, restored_values) = restored.eval_step(&state).unwrap();
    assert_eq!(original_values, restored_values);
}

#[test]
fn test_checkpoint_version_mismatch_is_fatal() {
    let agent = DqnAgent::new(small_config()).unwrap();
    let mut checkpoint = agent.checkpoint();
    checkpoint.version += 1;
    assert!(matches!(
        DqnAgent::from_checkpoint(checkpoint),
        Err(DuelqError::CheckpointMismatch { .. })
    ));
}

#[test]
fn test_checkpoint_config_mismatch_is_fatal() {
    let agent = DqnAgent::new(small_config()).unwrap();
    let mut checkpoint = agent.checkpoint();
    checkpoint.config.num_actions = 3;
    assert!(matches!(
        DqnAgent::from_checkpoint(checkpoint),
        Err(DuelqError::CheckpointMismatch { .. })
    ));
}

#[test]
fn test_epsilon_saturates_beyond_decay() {
    let mut agent = DqnAgent::new(small_config()).unwrap();
    let state = env_state(array![0.1, 0.2, 0.3, 0.4], &[0, 1]);
    let next = env_state(array![0.2, 0.3, 0.4, 0.5], &[0, 1]);
    // Drive total_t far beyond the 50-step schedule; nothing may panic and
    // the schedule must report its final value.
    for i in 0..120 {
        agent.feed(&state, i % 2, 0.0, &next, false).unwrap();
    }
    let saturated = agent.epsilons().value_at(agent.total_t());
    assert!((saturated - 0.1).abs() < 1e-5);
    assert_eq!(saturated, agent.epsilons().value_at(49));
}
