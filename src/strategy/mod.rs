//! The strategy seam: the pluggable procedure that proposes new trials.
//!
//! A [`Strategy`] sees the recalled history of the trials the caller passed to
//! [`Suggester::suggest`](crate::Suggester::suggest), renumbered to local
//! positions `0..history_len`, together with their outcomes and statuses. It
//! returns a [`SparseBatch`] for `n` new trials over local positions `0..n`,
//! where every position must be defined by at least one slot.
//!
//! Strategies only get shared references; they cannot touch the store or its
//! allocator. Any auxiliary state a strategy keeps must be derivable from the
//! recalled history if it is to survive a restart.
//!
//! Closures with the right signature implement [`Strategy`] directly:
//!
//! ```
//! use trial_ledger::distribution::Distribution;
//! use trial_ledger::space::SearchSpace;
//! use trial_ledger::strategy::StrategyContext;
//! use trial_ledger::{ParamValue, Result, SparseAssignment, SparseBatch, Suggester};
//!
//! let space = SearchSpace::builder()
//!     .slot("x", Distribution::int(0, 100))
//!     .build()
//!     .unwrap();
//!
//! // Propose 0, 1, 2, ... continuing from however many trials were recalled.
//! let counting = |ctx: &StrategyContext<'_>| -> Result<SparseBatch> {
//!     let start = ctx.history_len() as i64;
//!     let x: SparseAssignment = (0..ctx.n)
//!         .map(|p| (p, ParamValue::Int(start + p as i64)))
//!         .collect();
//!     Ok(vec![x])
//! };
//!
//! let mut suggester = Suggester::builder()
//!     .space(space)
//!     .strategy(counting)
//!     .build()
//!     .unwrap();
//! let docs = suggester.suggest(&[], &[], &[], 2).unwrap();
//! assert_eq!(docs[1].value("x"), Some(&ParamValue::Int(1)));
//! ```

pub mod random;

pub use random::RandomStrategy;

use crate::error::Result;
use crate::space::SearchSpace;
use crate::sparse::{SparseAssignment, SparseBatch};
use crate::types::TrialStatus;

/// Everything a strategy gets to see for one `suggest` call.
#[derive(Clone, Copy, Debug)]
pub struct StrategyContext<'a> {
    /// The search space being explored.
    pub space: &'a SearchSpace,
    /// Recalled history, one assignment per active slot; position `i` is the
    /// `i`-th history document.
    pub history: &'a [SparseAssignment],
    /// Loss of each history trial, where known.
    pub outcomes: &'a [Option<f64>],
    /// Status of each history trial.
    pub statuses: &'a [TrialStatus],
    /// Number of new trials to propose.
    pub n: usize,
}

impl StrategyContext<'_> {
    /// Number of history trials.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.statuses.len()
    }

    /// Local positions of history trials that finished with status `ok` and a
    /// loss, paired with that loss.
    pub fn completed(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.statuses
            .iter()
            .zip(self.outcomes)
            .enumerate()
            .filter_map(|(i, (status, loss))| match (status, loss) {
                (TrialStatus::Ok, Some(loss)) => Some((i, *loss)),
                _ => None,
            })
    }
}

/// Trait for pluggable search strategies.
///
/// The trait requires `Send + Sync` so a
/// [`SharedSuggester`](crate::SharedSuggester) can be used from several
/// threads.
pub trait Strategy: Send + Sync {
    /// Proposes `ctx.n` new trials.
    ///
    /// # Errors
    ///
    /// Implementations return [`Error::Strategy`](crate::Error::Strategy)
    /// when they cannot propose a batch. Malformed batches are caught by the
    /// caller.
    fn strategize(&self, ctx: &StrategyContext<'_>) -> Result<SparseBatch>;
}

impl<F> Strategy for F
where
    F: Fn(&StrategyContext<'_>) -> Result<SparseBatch> + Send + Sync,
{
    fn strategize(&self, ctx: &StrategyContext<'_>) -> Result<SparseBatch> {
        self(ctx)
    }
}
