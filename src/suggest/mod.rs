//! The suggest orchestrator.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::document::{self, Document};
use crate::error::{Error, Result};
use crate::space::SearchSpace;
use crate::storage::{RecordLog, TrialStore};
use crate::strategy::{Strategy, StrategyContext};
use crate::types::{GlobalId, TrialStatus};

mod builder;

pub use builder::SuggesterBuilder;

/// Where a [`Suggester`] is within one `suggest` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Between calls.
    Idle,
    /// Translating history documents into a local sparse batch.
    Recalling,
    /// Waiting for the strategy's proposal.
    Strategizing,
    /// Validating the proposal and planning its ids.
    Recording,
    /// Building the output documents and committing.
    Encoding,
}

/// Proposes new trials and remembers every trial it has proposed.
///
/// A suggester owns the search space, the [`TrialStore`] holding the sparse
/// history of its own proposals, and the [`Strategy`] that makes them. Each
/// [`suggest`](Self::suggest) call runs recall, strategy, record and encoding
/// in sequence, and either fully succeeds or leaves the store untouched.
///
/// # Examples
///
/// ```
/// use trial_ledger::distribution::Distribution;
/// use trial_ledger::space::SearchSpace;
/// use trial_ledger::strategy::RandomStrategy;
/// use trial_ledger::{Suggester, TrialStatus};
///
/// let space = SearchSpace::builder()
///     .slot("lr", Distribution::log_uniform(1e-5, 1e-1))
///     .slot("layers", Distribution::int(1, 4))
///     .build()
///     .unwrap();
/// let mut suggester = Suggester::new(space, RandomStrategy::with_seed(7));
///
/// let first = suggester.suggest(&[], &[], &[], 3).unwrap();
/// let losses = vec![Some(0.3), Some(0.1), None];
/// let statuses = vec![TrialStatus::Ok, TrialStatus::Ok, TrialStatus::Running];
/// let second = suggester.suggest(&first, &losses, &statuses, 2).unwrap();
///
/// assert_eq!(second[0].id().unwrap().get(), 3);
/// assert_eq!(suggester.store().next_id().get(), 5);
/// ```
pub struct Suggester {
    space: SearchSpace,
    store: TrialStore,
    strategy: Arc<dyn Strategy>,
    record_log: Option<Box<dyn RecordLog>>,
    phase: Phase,
}

impl Suggester {
    /// Creates a suggester with an empty store.
    #[must_use]
    pub fn new(space: SearchSpace, strategy: impl Strategy + 'static) -> Self {
        let store = TrialStore::new(&space);
        Self {
            space,
            store,
            strategy: Arc::new(strategy),
            record_log: None,
            phase: Phase::Idle,
        }
    }

    /// Returns a [`SuggesterBuilder`].
    #[must_use]
    pub fn builder() -> SuggesterBuilder {
        SuggesterBuilder::new()
    }

    /// The search space.
    #[must_use]
    pub fn space(&self) -> &SearchSpace {
        &self.space
    }

    /// The store of every trial proposed so far.
    #[must_use]
    pub fn store(&self) -> &TrialStore {
        &self.store
    }

    /// The current phase. Always [`Phase::Idle`] between calls.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Replaces the strategy. The store is kept.
    pub fn set_strategy(&mut self, strategy: impl Strategy + 'static) {
        self.strategy = Arc::new(strategy);
    }

    /// Consumes the suggester and returns its store.
    #[must_use]
    pub fn into_store(self) -> TrialStore {
        self.store
    }

    /// Proposes `n` new trials given the caller's view of earlier ones.
    ///
    /// `history` must be documents this suggester returned before (they carry
    /// their identity); `outcomes` and `statuses` are parallel to it. The
    /// returned documents carry fresh, ascending identities.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `n` is 0, the three history slices
    ///   differ in length, or the space has no active slots.
    /// - [`Error::InvalidDocument`] if a history document has no identity.
    /// - [`Error::DuplicateIdentity`] if two history documents share one.
    /// - [`Error::BatchSizeMismatch`] if the strategy's batch does not cover
    ///   positions `0..n` exactly.
    /// - [`Error::SchemaMismatch`] if the strategy's batch does not have one
    ///   assignment per active slot.
    /// - Errors from the strategy or the record log.
    ///
    /// The store and allocator are unchanged whenever an error is returned.
    pub fn suggest(
        &mut self,
        history: &[Document],
        outcomes: &[Option<f64>],
        statuses: &[TrialStatus],
        n: usize,
    ) -> Result<Vec<Document>> {
        let result = self.run(history, outcomes, statuses, n);
        self.enter(Phase::Idle);
        result
    }

    fn run(
        &mut self,
        history: &[Document],
        outcomes: &[Option<f64>],
        statuses: &[TrialStatus],
        n: usize,
    ) -> Result<Vec<Document>> {
        if n == 0 {
            return Err(Error::InvalidArgument("n must be positive".into()));
        }
        if outcomes.len() != history.len() || statuses.len() != history.len() {
            return Err(Error::InvalidArgument(format!(
                "{} history documents, {} outcomes, {} statuses",
                history.len(),
                outcomes.len(),
                statuses.len()
            )));
        }
        if self.space.n_active() == 0 {
            return Err(Error::InvalidArgument(
                "search space has no active slots".into(),
            ));
        }

        self.enter(Phase::Recalling);
        let ids = history
            .iter()
            .map(Document::require_id)
            .collect::<Result<Vec<GlobalId>>>()?;
        let recalled = self.store.recall(&ids)?;

        self.enter(Phase::Strategizing);
        let ctx = StrategyContext {
            space: &self.space,
            history: &recalled,
            outcomes,
            statuses,
            n,
        };
        let proposal = self.strategy.strategize(&ctx)?;

        self.enter(Phase::Recording);
        let pending = self.store.plan_record(&proposal, n)?;
        let new_ids = pending.ids();
        if new_ids.len() != n {
            return Err(Error::BatchSizeMismatch {
                expected: n,
                got: new_ids.len(),
            });
        }

        self.enter(Phase::Encoding);
        let mut docs = document::to_documents(&self.space, &proposal, n)?;
        for (doc, &id) in docs.iter_mut().zip(&new_ids) {
            doc.attach_id(id)?;
        }

        if let Some(log) = &self.record_log {
            log.append(&pending)?;
        }
        self.store.commit(pending)?;
        trace_info!(
            n,
            history = history.len(),
            next_id = self.store.next_id().get(),
            "suggest completed"
        );
        Ok(docs)
    }

    fn enter(&mut self, phase: Phase) {
        trace_debug!(?phase, "suggest phase");
        self.phase = phase;
    }
}

/// A [`Suggester`] behind a single lock, for callers on several threads.
///
/// Every call holds the lock for the whole recall, strategy, record and
/// encoding sequence, so concurrent calls never see or allocate overlapping
/// ids.
pub struct SharedSuggester {
    inner: Mutex<Suggester>,
}

impl SharedSuggester {
    /// Wraps a suggester.
    #[must_use]
    pub fn new(suggester: Suggester) -> Self {
        Self {
            inner: Mutex::new(suggester),
        }
    }

    /// Locked [`Suggester::suggest`].
    ///
    /// # Errors
    ///
    /// As for [`Suggester::suggest`].
    pub fn suggest(
        &self,
        history: &[Document],
        outcomes: &[Option<f64>],
        statuses: &[TrialStatus],
        n: usize,
    ) -> Result<Vec<Document>> {
        self.inner.lock().suggest(history, outcomes, statuses, n)
    }

    /// Runs `f` with read access to the store while holding the lock.
    pub fn with_store<R>(&self, f: impl FnOnce(&TrialStore) -> R) -> R {
        f(self.inner.lock().store())
    }

    /// Unwraps the suggester.
    #[must_use]
    pub fn into_inner(self) -> Suggester {
        self.inner.into_inner()
    }
}

impl From<Suggester> for SharedSuggester {
    fn from(suggester: Suggester) -> Self {
        Self::new(suggester)
    }
}
