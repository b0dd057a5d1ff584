//! Property tests for the closed-form queue formulas.

use bufferfit_core::{ModelConfig, QueueModel};
use proptest::prelude::*;

/// Model whose one-user load equals `load`.
fn model_with_load(load: f64) -> QueueModel {
    QueueModel::new(ModelConfig {
        mean_interval: 1.0,
        mean_length: load,
        processor_speed: 1.0,
        ..ModelConfig::default()
    })
    .unwrap()
}

proptest! {
    #[test]
    fn test_state_probabilities_sum_to_one(
        load in 0.001f64..0.9,
        queue in 0u32..150,
    ) {
        let model = model_with_load(load);
        let total: f64 = (0..=queue)
            .map(|k| model.probability_k_elems_in_queue(1, k, queue).unwrap())
            .sum();
        prop_assert!((total - 1.0).abs() < 1e-9, "sum was {}", total);
    }

    #[test]
    fn test_overloaded_probabilities_sum_to_one(
        load in 1.01f64..3.0,
        queue in 0u32..40,
    ) {
        let model = model_with_load(load);
        let total: f64 = (0..=queue)
            .map(|k| model.probability_k_elems_in_queue(1, k, queue).unwrap())
            .sum();
        prop_assert!((total - 1.0).abs() < 1e-9, "sum was {}", total);
    }

    #[test]
    fn test_loss_non_increasing_in_buffer(
        load in 0.001f64..0.95,
        queue in 1u32..120,
    ) {
        let model = model_with_load(load);
        let smaller = model.loss(1, queue).unwrap();
        let larger = model.loss(1, queue + 1).unwrap();
        prop_assert!(larger <= smaller, "loss rose from {} to {}", smaller, larger);
    }

    #[test]
    fn test_mean_calls_within_capacity(
        load in 0.001f64..3.0,
        queue in 0u32..60,
    ) {
        prop_assume!((load - 1.0).abs() > 1e-3);
        let model = model_with_load(load);
        let mean = model.mean_calls_in_system(1, queue).unwrap();
        prop_assert!(mean >= 0.0);
        prop_assert!(mean <= f64::from(queue));
    }

    #[test]
    fn test_evaluation_is_pure(
        users in 1u32..200,
        buffer in 1u32..100,
    ) {
        let model = QueueModel::new(ModelConfig::default()).unwrap();
        prop_assert_eq!(model.evaluate(users, buffer), model.evaluate(users, buffer));
    }

    #[test]
    fn test_single_queue_delay_is_per_user(
        users in 1u32..200,
        buffer in 1u32..100,
    ) {
        let model = QueueModel::new(ModelConfig::default()).unwrap();
        let multiple = model.multiplied_system_delay_multiple_queues(users, buffer).unwrap();
        let single = model.multiplied_system_delay_single_queue(users, buffer).unwrap();
        prop_assert_eq!(single, multiple / f64::from(users));
    }

    #[test]
    fn test_empty_state_matches_direct_substitution(
        users in 1u32..200,
        queue in 0u32..100,
    ) {
        let model = QueueModel::new(ModelConfig::default()).unwrap();
        let r = model.total_load(users);
        let expected = (1.0 - r) / (1.0 - r.powf(f64::from(queue) + 1.0));
        prop_assert_eq!(model.probability_k_elems_in_queue(users, 0, queue).unwrap(), expected);
    }
}
