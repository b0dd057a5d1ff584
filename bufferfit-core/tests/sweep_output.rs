//! Console output of the default sweeps, checked against reference output.

use bufferfit_core::report::write_sweep;
use bufferfit_core::{
    BufferfitError, ModelConfig, ModelError, OutputFormat, QueueModel, SweepConfig, Termination,
    Topology,
};

const MULTIPLE_QUEUES_REFERENCE: &str = include_str!("fixtures/multiple_queues.txt");
const SINGLE_QUEUE_REFERENCE: &str = include_str!("fixtures/single_queue.txt");

fn render(model: &QueueModel, config: &SweepConfig, topology: Topology) -> (String, Termination) {
    let mut out = Vec::new();
    let termination = write_sweep(&mut out, model, config, topology, OutputFormat::Text).unwrap();
    (String::from_utf8(out).unwrap(), termination)
}

#[test]
fn test_multiple_queues_output_matches_reference() {
    let model = QueueModel::new(ModelConfig::default()).unwrap();
    let (output, termination) = render(&model, &SweepConfig::default(), Topology::MultipleQueues);

    assert_eq!(output, MULTIPLE_QUEUES_REFERENCE);
    assert_eq!(termination, Termination::NoFeasibleBuffer { users: 6 });
}

#[test]
fn test_single_queue_output_matches_reference() {
    let model = QueueModel::new(ModelConfig::default()).unwrap();
    let (output, termination) = render(&model, &SweepConfig::default(), Topology::SingleQueue);

    // Compare line by line so a mismatch names the first differing line.
    for (index, (actual, expected)) in output
        .lines()
        .zip(SINGLE_QUEUE_REFERENCE.lines())
        .enumerate()
    {
        assert_eq!(actual, expected, "line {}", index + 1);
    }
    assert_eq!(output, SINGLE_QUEUE_REFERENCE);
    assert_eq!(termination, Termination::NoFeasibleBuffer { users: 194 });
}

#[test]
fn test_single_queue_output_bounds() {
    let model = QueueModel::new(ModelConfig::default()).unwrap();
    let (output, termination) = render(&model, &SweepConfig::default(), Topology::SingleQueue);
    let lines: Vec<&str> = output.lines().collect();

    assert_eq!(lines.len(), 1 + 2 * 17463);
    assert_eq!(lines[0], "Running for single queue");
    assert_eq!(lines[1], "System fits requirements for 1 users and buffer 2");
    assert_eq!(
        lines[2],
        "Loss 1.728877439878287e-05, delay_single 0.995850622406639"
    );
    assert_eq!(
        &lines[lines.len() - 2..],
        [
            "System fits requirements for 193 users and buffer 26",
            "Loss 0.0006793510012012007, delay_single 4.994147536291912",
        ]
    );
    assert_eq!(termination, Termination::NoFeasibleBuffer { users: 194 });
}

#[test]
fn test_degenerate_load_keeps_earlier_output() {
    let model = QueueModel::new(ModelConfig {
        mean_interval: 2.0,
        mean_length: 600.0,
        processor_speed: 600.0,
        max_loss: 0.5,
        multiplication_max: 100.0,
    })
    .unwrap();
    let config = SweepConfig {
        max_buffer: 3,
        ..SweepConfig::default()
    };

    let mut out = Vec::new();
    let result = write_sweep(
        &mut out,
        &model,
        &config,
        Topology::SingleQueue,
        OutputFormat::Text,
    );

    assert!(matches!(
        result,
        Err(BufferfitError::Model(ModelError::DegenerateLoad { users: 2, .. }))
    ));
    let output = String::from_utf8(out).unwrap();
    assert!(output.starts_with("Running for single queue\n"));
    assert!(output.contains("for 1 users and buffer 1\n"));
    assert!(!output.contains("for 2 users"));
}
