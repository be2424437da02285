#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Sparse trial bookkeeping for resumable search over tree-structured
//! ("conditional") parameter spaces.
//!
//! In a conditional space not every trial defines every variable: a
//! `forest.depth` slot only exists for trials that picked the forest model.
//! This crate keeps, per variable, a sparse map from permanent trial
//! identities to values, and translates between that history and the dense,
//! locally-numbered batches a search strategy works with. A stateful strategy
//! can therefore be stopped and resumed at any time: the store is its memory.
//!
//! # Getting Started
//!
//! ```
//! use trial_ledger::prelude::*;
//!
//! let space = SearchSpace::builder()
//!     .slot("model", Distribution::categorical(2))
//!     .conditional_slot("svm.c", Distribution::log_uniform(1e-3, 1e3), "model", 0)
//!     .conditional_slot("forest.depth", Distribution::int(2, 12), "model", 1)
//!     .build()
//!     .unwrap();
//!
//! let mut suggester = Suggester::new(space, RandomStrategy::with_seed(3));
//! let docs = suggester.suggest(&[], &[], &[], 4).unwrap();
//!
//! for doc in &docs {
//!     // exactly one of the two branches is set
//!     assert!(doc.value("svm.c").is_some() != doc.value("forest.depth").is_some());
//! }
//! assert_eq!(suggester.store().next_id().get(), 4);
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`SearchSpace`](space::SearchSpace) | Ordered slots with distributions and activation conditions. |
//! | [`TrialStore`] | Per-slot append-only `(GlobalId, value)` history plus the [`IdAllocator`]. |
//! | [`SparseAssignment`] | One slot's `(local position, value)` pairs for one batch. |
//! | [`Document`](document::Document) | One trial in nested form, tagged with its [`GlobalId`]. |
//! | [`Strategy`](strategy::Strategy) | The pluggable procedure that proposes new trials. |
//! | [`Suggester`] | Runs recall, strategy, record and encoding for each `suggest` call. |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `serde` | `Serialize`/`Deserialize` on public types, [`TrialStore::save`]/[`TrialStore::load`] | on |
//! | `journal` | [`JournalLog`](storage::JournalLog) — JSONL record log with file locking (enables `serde`) | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at key points | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

mod allocator;
pub mod distribution;
pub mod document;
mod error;
pub mod outcome;
mod param;
pub mod space;
mod sparse;
pub mod storage;
pub mod strategy;
mod suggest;
mod types;

pub use allocator::IdAllocator;
pub use error::{Error, Result};
pub use param::ParamValue;
pub use sparse::{SparseAssignment, SparseBatch};
pub use storage::TrialStore;
pub use suggest::{Phase, SharedSuggester, Suggester, SuggesterBuilder};
pub use types::{GlobalId, TrialStatus};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use trial_ledger::prelude::*;
/// ```
pub mod prelude {
    pub use crate::distribution::Distribution;
    pub use crate::document::{Document, Node};
    pub use crate::error::{Error, Result};
    pub use crate::outcome::TrialResult;
    pub use crate::param::ParamValue;
    pub use crate::space::SearchSpace;
    pub use crate::sparse::{SparseAssignment, SparseBatch};
    #[cfg(feature = "journal")]
    pub use crate::storage::JournalLog;
    pub use crate::storage::{RecordLog, TrialStore};
    pub use crate::strategy::{RandomStrategy, Strategy, StrategyContext};
    pub use crate::suggest::{SharedSuggester, Suggester};
    pub use crate::types::{GlobalId, TrialStatus};
}
