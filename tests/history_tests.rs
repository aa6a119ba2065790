// tests/history_tests.rs

use spin_histories::core::MAX_HISTORY_DEPTH;
use spin_histories::histories::{BasisLabel, EventLabel};
use spin_histories::{
    Angle, Axis, CounterSampler, EngineConfig, Event, History, HistoryBuilder, HistoryEngine, HistoryError,
    HistoryRecord, NodeId, NodeKind, Orientation, Outcome, Spin,
};

const TOLERANCE: f64 = 1e-9;

fn ports(history: &History, node: NodeId) -> Result<Vec<NodeId>, HistoryError> {
    Ok(history.children(node)?.to_vec())
}

#[test]
fn test_unknown_node_is_reported() {
    let history = History::single_analyzer(Spin::Half, Axis::Z);
    let err = history.with_analyzer(NodeId(42), Axis::X);
    assert!(matches!(err, Err(HistoryError::UnknownNode { .. })));
}

#[test]
fn test_cycle_device_refuses_at_depth_bound() -> Result<(), HistoryError> {
    let mut builder = HistoryBuilder::new(Spin::Half);
    let mut tip = builder.root();
    for _ in 0..MAX_HISTORY_DEPTH {
        tip = builder.magnet(tip, Axis::Y, 0.2)?;
    }
    let history = builder.build();
    assert_eq!(history.max_depth(), MAX_HISTORY_DEPTH);
    let err = history.cycle_device(tip);
    assert!(matches!(err, Err(HistoryError::DepthExceeded { .. })));
    Ok(())
}

#[test]
fn test_edit_sequence_tracks_expected_probabilities() -> Result<(), HistoryError> {
    let engine = HistoryEngine::new();
    let start = History::single_analyzer(Spin::Half, Axis::Z);
    let up = ports(&start, start.root())?[0];

    // z analyzer, then an x analyzer behind the up port.
    let history = start.with_analyzer(up, Axis::Z)?.cycle_basis(up)?;
    let inner = ports(&history, up)?;
    assert_eq!(history.event(inner[0])?.map(|e| e.axis()), Some(Axis::X));
    let result = engine.run(&history)?;
    for leaf in &inner {
        assert!((result.probability(*leaf).unwrap_or_default() - 0.25).abs() < TOLERANCE);
    }

    // Tilting the inner analyzer back to the z pole makes it agree with the first.
    let tilted = history.with_angle(up, Angle::Theta, 0.0)?.with_angle(up, Angle::Phi, 0.0)?;
    let result = engine.run(&tilted)?;
    assert!((result.probability(inner[0]).unwrap_or_default() - 0.5).abs() < TOLERANCE);
    assert!(result.probability(inner[1]).unwrap_or_default().abs() < TOLERANCE);
    Ok(())
}

#[test]
fn test_counter_edit_compacts_the_arena() -> Result<(), HistoryError> {
    let history = History::single_analyzer(Spin::Half, Axis::X);
    let up = ports(&history, history.root())?[0];
    let grown = history.with_analyzer(up, Axis::Y)?;
    assert_eq!(grown.len(), 5);

    let pruned = grown.with_counter(up)?;
    assert_eq!(pruned.len(), 3);
    assert_eq!(pruned.kind(up)?, NodeKind::Counter);
    assert_eq!(pruned, history);
    Ok(())
}

#[test]
fn test_spin_one_transparent_keeps_first_remaining_port() -> Result<(), HistoryError> {
    let history = History::single_analyzer(Spin::One, Axis::Z);
    let root = history.root();
    let zero = ports(&history, root)?[1];
    let transparent = history.make_transparent(zero)?;

    let remaining = ports(&transparent, root)?;
    assert_eq!(remaining.len(), 1);
    assert_eq!(transparent.event(remaining[0])?, Some(&Event::Identity { axis: Axis::Z }));
    assert_eq!(transparent.kind(root)?, NodeKind::Source);

    let engine = HistoryEngine::with_config(EngineConfig::default().with_spin(Spin::One))?;
    let result = engine.run(&transparent)?;
    assert!((result.probability(remaining[0]).unwrap_or_default() - 1.0).abs() < TOLERANCE);

    let restored = transparent.restore_analyzer(root, Outcome::Down)?;
    assert!(restored.is_analyzer(root)?);
    assert_eq!(restored.leaves().len(), 3);
    Ok(())
}

#[test]
fn test_record_angles_override_named_basis() -> Result<(), HistoryError> {
    let port = |event| HistoryRecord { theta: Some(0.0), ..HistoryRecord::leaf(BasisLabel::X, event) };
    let record = HistoryRecord::root(vec![port(EventLabel::SpinUp), port(EventLabel::SpinDown)]);
    let history = History::from_record(&record)?;

    // theta overridden to 0, phi kept at x's canonical 0: the z pole.
    let first = ports(&history, history.root())?[0];
    assert_eq!(history.event(first)?.map(|e| e.axis()), Some(Axis::N(Orientation::new(0.0, 0.0))));

    // An overridden basis is written back out as n with both angles.
    let written = history.to_record();
    assert_eq!(written.children[0].basis, Some(BasisLabel::N));
    assert_eq!(written.children[0].theta, Some(0.0));
    assert_eq!(written.children[0].phi, Some(0.0));
    Ok(())
}

#[test]
fn test_unknown_event_name_is_a_serialization_error() {
    let json = r#"{ "children": [ { "basis": "z", "event": "spinSideways" } ] }"#;
    assert!(matches!(History::from_json(json), Err(HistoryError::Serialization { .. })));
}

#[test]
fn test_spin_one_record_requires_spin_one_engine() -> Result<(), HistoryError> {
    let json = r#"{
        "spin": "one",
        "children": [
            { "basis": "z", "event": "spinUp" },
            { "basis": "z", "event": "spinZero" },
            { "basis": "z", "event": "spinDown" }
        ]
    }"#;
    let history = History::from_json(json)?;
    assert_eq!(history.spin(), Spin::One);
    assert!(matches!(HistoryEngine::new().run(&history), Err(HistoryError::Structural { .. })));

    let engine = HistoryEngine::with_config(EngineConfig::default().with_spin(Spin::One))?;
    let annotated = engine.compute_probabilities(&history.to_record())?;
    let total: f64 = annotated.children.iter().filter_map(|c| c.probability).sum();
    assert!((total - 1.0).abs() < TOLERANCE);
    Ok(())
}

#[test]
fn test_spin_zero_port_rejected_for_spin_half_record() {
    let json = r#"{ "children": [ { "basis": "z", "event": "spinZero" } ] }"#;
    assert!(matches!(History::from_json(json), Err(HistoryError::Structural { .. })));
}

#[test]
fn test_sampler_counts_follow_probabilities() -> Result<(), HistoryError> {
    let history = History::single_analyzer(Spin::Half, Axis::Z);
    let root = history.root();
    let leaves = ports(&history, root)?;
    let history = history.with_ignored(leaves[1], true)?;
    let result = HistoryEngine::new().run(&history)?;

    let mut sampler = CounterSampler::seeded_from(&result);
    let counted = sampler.record(&history, &result, 200)?;
    assert_eq!(counted.get(leaves[0])?.count(), 200);
    assert_eq!(counted.get(leaves[1])?.count(), 0);
    // The input tree is untouched.
    assert_eq!(history.get(leaves[0])?.count(), 0);

    // Counts survive the record.
    let record = counted.to_record();
    assert_eq!(record.children[0].count, Some(200));
    assert_eq!(History::from_record(&record)?.get(leaves[0])?.count(), 200);
    Ok(())
}

#[test]
fn test_sampler_spreads_over_even_split() -> Result<(), HistoryError> {
    let history = History::single_analyzer(Spin::Half, Axis::X);
    let result = HistoryEngine::new().run(&history)?;
    let mut sampler = CounterSampler::new(2024);
    let counted = sampler.record(&history, &result, 1000)?;

    let counts: Vec<u64> = history.leaves().into_iter().map(|l| counted.get(l).map(|n| n.count())).collect::<Result<_, _>>()?;
    assert_eq!(counts.iter().sum::<u64>(), 1000);
    // Both counters fire; an even split stays well away from the extremes.
    assert!(counts.iter().all(|c| *c > 350 && *c < 650), "{:?}", counts);
    Ok(())
}
