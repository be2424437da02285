//! Random strategy implementation.

use parking_lot::Mutex;

use super::{Strategy, StrategyContext};
use crate::distribution::Distribution;
use crate::error::{Error, Result};
use crate::param::ParamValue;
use crate::sparse::{SparseAssignment, SparseBatch};

/// A strategy that samples every candidate uniformly from the search space.
///
/// It ignores the history and walks the slots in declaration order, sampling
/// a slot only when its condition holds for the candidate being built, so
/// conditional slots appear exactly in the candidates whose parent took the
/// activating choice. It serves as a baseline and as the default strategy of
/// a [`Suggester`](crate::Suggester).
///
/// # Examples
///
/// ```
/// use trial_ledger::strategy::RandomStrategy;
///
/// // Create with default RNG
/// let strategy = RandomStrategy::new();
///
/// // Create with a fixed seed for reproducibility
/// let strategy = RandomStrategy::with_seed(42);
/// ```
pub struct RandomStrategy {
    rng: Mutex<fastrand::Rng>,
}

impl RandomStrategy {
    /// Creates a new random strategy with a default random seed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    /// Creates a new random strategy with a fixed seed for reproducibility.
    ///
    /// Using the same seed will produce the same sequence of candidates.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }
}

impl Default for RandomStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for RandomStrategy {
    fn strategize(&self, ctx: &StrategyContext<'_>) -> Result<SparseBatch> {
        let space = ctx.space;
        let mut batch = vec![SparseAssignment::new(); space.n_active()];
        let mut rng = self.rng.lock();
        // Value of every declared slot for the candidate being built.
        let mut current: Vec<Option<ParamValue>> = vec![None; space.slots().len()];

        for position in 0..ctx.n {
            current.fill(None);
            for (location, slot) in space.slots().iter().enumerate() {
                let Some(distribution) = slot.distribution() else {
                    continue;
                };
                if let Some(cond) = slot.condition() {
                    let taken = current[cond.parent]
                        .as_ref()
                        .and_then(ParamValue::as_categorical);
                    if taken != Some(cond.choice) {
                        continue;
                    }
                }
                let value = sample(&mut rng, distribution);
                let active = space.active_index(location).ok_or_else(|| {
                    Error::Strategy(format!("slot '{}' has no active index", slot.name()))
                })?;
                batch[active].push(position, value.clone());
                current[location] = Some(value);
            }
        }
        Ok(batch)
    }
}

/// Samples uniformly from `distribution`, respecting log scale and step size.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn sample(rng: &mut fastrand::Rng, distribution: &Distribution) -> ParamValue {
    match distribution {
        Distribution::Float(d) => {
            let value = if d.log_scale {
                log_uniform(rng, d.low, d.high).clamp(d.low, d.high)
            } else if let Some(step) = d.step {
                let n_steps = ((d.high - d.low) / step).floor() as i64;
                (d.low + (rng.i64(0..=n_steps) as f64) * step).clamp(d.low, d.high)
            } else {
                uniform(rng, d.low, d.high)
            };
            ParamValue::Float(value)
        }
        Distribution::Int(d) => {
            let value = if d.log_scale {
                // rounding can land just outside the bounds
                (log_uniform(rng, d.low as f64, d.high as f64).round() as i64).clamp(d.low, d.high)
            } else if let Some(step) = d.step {
                // the span of a full-width range does not fit in i64
                let step = step.unsigned_abs();
                let k = rng.u64(0..=d.high.abs_diff(d.low) / step);
                d.low.saturating_add_unsigned(k * step)
            } else {
                rng.i64(d.low..=d.high)
            };
            ParamValue::Int(value)
        }
        Distribution::Categorical(d) => ParamValue::Categorical(rng.usize(0..d.n_choices)),
    }
}

/// Uniform in `[low, high)`.
fn uniform(rng: &mut fastrand::Rng, low: f64, high: f64) -> f64 {
    low + rng.f64() * (high - low)
}

/// Uniform in log space; both bounds must be positive.
fn log_uniform(rng: &mut fastrand::Rng, low: f64, high: f64) -> f64 {
    uniform(rng, low.ln(), high.ln()).exp()
}
