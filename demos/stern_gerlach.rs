//! Example building the classic three-analyzer Stern-Gerlach experiment and
//! the magnet variant, then sampling counters.

use spin_histories::{
    Axis, CounterSampler, History, HistoryBuilder, HistoryEngine, HistoryError, Spin, validate_result,
};
use std::f64::consts::PI;

fn main() -> Result<(), HistoryError> {
    println!("--- spin_histories Example: Sequential Stern-Gerlach Analyzers ---");

    // --- Build History Tree ---
    // 1. z analyzer on the source; keep only the up beam.
    // 2. x analyzer on z-up.
    // 3. z analyzer on x-up. Classically z-down should be gone by now.
    let mut builder = HistoryBuilder::new(Spin::Half);
    let root = builder.root();
    let z_ports = builder.analyzer(root, Axis::Z)?;
    let x_ports = builder.analyzer(z_ports[0], Axis::X)?;
    builder.analyzer(x_ports[0], Axis::Z)?;
    builder.ignore(z_ports[1])?;
    let history = builder.build();

    println!("\nHistory Tree:\n{}", history);

    let engine = HistoryEngine::new();
    let result = engine.run(&history)?;
    validate_result(&engine, &history, &result, None)?;
    println!("{}", result);
    println!("Expected: 0.25 on each of the last analyzer's ports, 0.5 on x-down.");

    // --- Magnet Variant ---
    // Replace everything behind z-up with a magnet turning the spin about y
    // by a quarter turn, followed by a single x analyzer.
    let magnet = history.with_magnet(z_ports[0], Axis::Y, PI / 4.0)?;
    let field = magnet.children(z_ports[0])?[0];
    let magnet = magnet.with_analyzer(field, Axis::X)?;
    println!("\nMagnet Variant:\n{}", magnet);
    let magnet_result = engine.run(&magnet)?;
    println!("{}", magnet_result);
    println!("Expected: z-up rotated onto x-up, so x-up is certain.");

    // --- Persisted Form ---
    let json = magnet.to_json()?;
    println!("\nJSON:\n{}", json);
    let reloaded = History::from_json(&json)?;
    let annotated = engine.compute_probabilities(&reloaded.to_record())?;
    println!("Annotated leaves: {}", annotated.leaf_count());

    // --- Counters ---
    let mut sampler = CounterSampler::seeded_from(&result);
    let counted = sampler.record(&history, &result, 1000)?;
    println!("\nCounts after 1000 particles:");
    for leaf in counted.leaves() {
        println!("  {}: {}", leaf, counted.get(leaf)?.count());
    }

    Ok(())
}
