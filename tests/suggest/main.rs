mod properties;
mod scenarios;

use std::sync::{Arc, Mutex};

use trial_ledger::distribution::Distribution;
use trial_ledger::space::SearchSpace;
use trial_ledger::strategy::StrategyContext;
use trial_ledger::{ParamValue, Result, SparseAssignment, SparseBatch};

/// Two always-active slots.
fn two_slot_space() -> SearchSpace {
    SearchSpace::builder()
        .slot("lr", Distribution::uniform(0.0, 1.0))
        .slot("layers", Distribution::int(1, 6))
        .build()
        .unwrap()
}

/// A model choice with one conditional slot per branch.
fn conditional_space() -> SearchSpace {
    SearchSpace::builder()
        .slot("model", Distribution::categorical(2))
        .conditional_slot("svm.c", Distribution::log_uniform(1e-3, 1e3), "model", 0)
        .conditional_slot("svm.kernel", Distribution::categorical(3), "model", 0)
        .conditional_slot("forest.depth", Distribution::int(2, 12), "model", 1)
        .build()
        .unwrap()
}

/// A strategy that returns `batch` unchanged and keeps every history it was
/// shown.
fn scripted(
    batch: SparseBatch,
) -> (
    impl Fn(&StrategyContext<'_>) -> Result<SparseBatch> + Send + Sync + 'static,
    Arc<Mutex<Vec<SparseBatch>>>,
) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let strategy = move |ctx: &StrategyContext<'_>| -> Result<SparseBatch> {
        log.lock().unwrap().push(ctx.history.to_vec());
        Ok(batch.clone())
    };
    (strategy, seen)
}

fn assignment(pairs: &[(usize, ParamValue)]) -> SparseAssignment {
    pairs.iter().cloned().collect()
}
