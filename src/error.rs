use crate::types::GlobalId;

/// Errors returned by the ledger, the codec, and the suggest orchestrator.
///
/// None of these are retried by the crate. Every error raised inside
/// [`Suggester::suggest`](crate::Suggester::suggest) leaves the store and the
/// identity allocator exactly as they were before the call.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a trial identity (or the local position that would become
    /// one) appears more than once where uniqueness is required.
    #[error("duplicate identity: trial {id} is referenced more than once")]
    DuplicateIdentity {
        /// The repeated identity.
        id: GlobalId,
    },

    /// Returned when a document lacks its identity where one is required, or
    /// carries one where a fresh document is expected.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Returned when a batch does not cover local positions `0..expected`
    /// exactly.
    #[error("batch size mismatch: expected {expected} trials, got {got}")]
    BatchSizeMismatch {
        /// The batch size requested by the caller.
        expected: usize,
        /// The number of trials the batch actually describes.
        got: usize,
    },

    /// Returned when a store's slot layout disagrees with the search space.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Returned when an argument is rejected before any state is touched.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Returned when a strategy cannot propose a batch.
    #[error("strategy error: {0}")]
    Strategy(String),

    /// Returned when reading or writing persisted state fails.
    #[cfg(feature = "serde")]
    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = core::result::Result<T, Error>;
