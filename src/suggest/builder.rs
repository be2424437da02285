use std::sync::Arc;

use super::{Phase, Suggester};
use crate::error::{Error, Result};
use crate::space::SearchSpace;
use crate::storage::{RecordLog, TrialStore};
use crate::strategy::{RandomStrategy, Strategy};

/// A builder for constructing a [`Suggester`] with a fluent API.
///
/// Only the search space is required. Without a strategy the suggester
/// samples with [`RandomStrategy`]; without a store it starts empty.
///
/// # Examples
///
/// ```
/// use trial_ledger::distribution::Distribution;
/// use trial_ledger::space::SearchSpace;
/// use trial_ledger::strategy::RandomStrategy;
/// use trial_ledger::Suggester;
///
/// let space = SearchSpace::builder()
///     .slot("x", Distribution::uniform(-5.0, 5.0))
///     .build()
///     .unwrap();
/// let suggester = Suggester::builder()
///     .space(space)
///     .strategy(RandomStrategy::with_seed(1))
///     .build()
///     .unwrap();
/// assert_eq!(suggester.store().n_slots(), 1);
/// ```
pub struct SuggesterBuilder {
    space: Option<SearchSpace>,
    strategy: Option<Arc<dyn Strategy>>,
    store: Option<TrialStore>,
    record_log: Option<Box<dyn RecordLog>>,
}

impl SuggesterBuilder {
    pub(super) fn new() -> Self {
        Self {
            space: None,
            strategy: None,
            store: None,
            record_log: None,
        }
    }

    /// Sets the search space.
    #[must_use]
    pub fn space(mut self, space: SearchSpace) -> Self {
        self.space = Some(space);
        self
    }

    /// Sets the strategy.
    #[must_use]
    pub fn strategy(mut self, strategy: impl Strategy + 'static) -> Self {
        self.strategy = Some(Arc::new(strategy));
        self
    }

    /// Resumes from a restored store instead of starting empty.
    #[must_use]
    pub fn store(mut self, store: TrialStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Logs every batch to `log` before committing it.
    #[must_use]
    pub fn record_log(mut self, log: impl RecordLog + 'static) -> Self {
        self.record_log = Some(Box::new(log));
        self
    }

    /// Builds the suggester.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if no search space was given, and
    /// [`Error::SchemaMismatch`] if a resumed store does not match it.
    pub fn build(self) -> Result<Suggester> {
        let space = self
            .space
            .ok_or_else(|| Error::InvalidArgument("a search space is required".into()))?;
        let store = match self.store {
            Some(store) => {
                store.check_compatible(&space)?;
                store
            }
            None => TrialStore::new(&space),
        };
        let strategy = self
            .strategy
            .unwrap_or_else(|| Arc::new(RandomStrategy::new()));
        Ok(Suggester {
            space,
            store,
            strategy,
            record_log: self.record_log,
            phase: Phase::Idle,
        })
    }
}
