//! Demo: scores a handful of ideas against an in-memory calibration store and
//! shows the curve switching from fallback constants to calibrated bounds.

use std::sync::Arc;

use idea_scorer::{
    init_tracing, score::inputs::RawParams, CalibrationStore, MemoryStore, ScoreEngine,
    WeightVector,
};

fn main() {
    init_tracing();

    let store = Arc::new(MemoryStore::default());
    let engine = ScoreEngine::new(Arc::new(WeightVector::default()), store.clone());

    let sample = RawParams::new(5000, 4, 0.7, 3, 2);
    println!("cold start:        {}", engine.compute_score(&sample));
    println!("fixed-weight raw:  {:.4}", engine.fixed_weight_raw_score(&sample));

    // Warm up the history with a grid of synthetic ideas.
    for reach in [0, 50, 800, 5_000, 40_000] {
        for impact in 1..=5 {
            for effort in [1, 4, 7, 10] {
                for competition in [1, 3, 6, 10] {
                    let p = RawParams::new(reach, impact, 0.6, effort, competition);
                    let _ = engine.compute_score(&p);
                }
            }
        }
    }

    match engine.bounds() {
        Some((lo, hi)) => println!("bounds p5/p95:     {lo:.4} / {hi:.4}"),
        None => println!("bounds p5/p95:     none"),
    }
    let s = engine.score_adaptive(&sample);
    println!(
        "calibrated:        {} (center {:.4}, k {:.2}, history {})",
        s.display(),
        s.curve.center,
        s.curve.steepness,
        store.history().len()
    );
}
