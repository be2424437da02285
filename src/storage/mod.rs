//! The sparse trial-variable store.
//!
//! A [`TrialStore`] keeps one [`SlotStore`] per active slot of a
//! [`SearchSpace`] plus the [`IdAllocator`] that numbers its trials. Each slot
//! store is an append-only sequence of `(GlobalId, value)` entries; nothing is
//! ever reordered, edited, or removed.
//!
//! The store is translated to and from the locally-numbered form a strategy
//! works with by [`recall`](TrialStore::recall) and
//! [`record`](TrialStore::record).
//!
//! # Persistence
//!
//! | Backend | Description | Feature flag |
//! |---------|-------------|-------------|
//! | [`StoreSnapshot`] | Whole store and counter as one JSON document | `serde` |
//! | `JournalLog` | Append-only JSONL log of committed batches, with `fs2` file locking | `journal` |
//!
//! Both validate the persisted slot schema against the search space they are
//! restored with.

#[cfg(feature = "journal")]
mod journal;
#[cfg(feature = "serde")]
mod snapshot;
mod translate;

use std::collections::HashSet;

#[cfg(feature = "journal")]
pub use journal::JournalLog;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serde")]
pub use snapshot::{SNAPSHOT_VERSION, StoreSnapshot};
pub use translate::PendingRecord;

use crate::allocator::IdAllocator;
use crate::error::{Error, Result};
use crate::param::ParamValue;
use crate::space::{SearchSpace, SlotSchema};
use crate::types::GlobalId;

/// Append-only `(GlobalId, value)` entries of one slot.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SlotStore {
    ids: Vec<GlobalId>,
    values: Vec<ParamValue>,
}

impl SlotStore {
    /// Creates an empty slot store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    /// Appends parallel `ids` and `values` after all existing entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the sequences differ in length.
    /// Nothing is appended in that case.
    pub fn append(&mut self, ids: &[GlobalId], values: &[ParamValue]) -> Result<()> {
        if ids.len() != values.len() {
            return Err(Error::InvalidArgument(format!(
                "{} ids but {} values",
                ids.len(),
                values.len()
            )));
        }
        self.ids.extend_from_slice(ids);
        self.values.extend_from_slice(values);
        Ok(())
    }

    pub(crate) fn push(&mut self, id: GlobalId, value: ParamValue) {
        self.ids.push(id);
        self.values.push(value);
    }

    pub(crate) fn extend(&mut self, other: Self) {
        self.ids.extend(other.ids);
        self.values.extend(other.values);
    }

    /// Iterates entries in storage order.
    pub fn entries(&self) -> impl Iterator<Item = (GlobalId, &ParamValue)> {
        self.ids.iter().copied().zip(&self.values)
    }

    /// Stored ids, in storage order.
    #[must_use]
    pub fn ids(&self) -> &[GlobalId] {
        &self.ids
    }

    /// Stored values, parallel to [`ids`](Self::ids).
    #[must_use]
    pub fn values(&self) -> &[ParamValue] {
        &self.values
    }

    /// Returns the value recorded for `id`, if any.
    #[must_use]
    pub fn get(&self, id: GlobalId) -> Option<&ParamValue> {
        self.entries().find(|&(i, _)| i == id).map(|(_, v)| v)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if nothing has been recorded for this slot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Checks the parallel-length and unique-id invariants of data that did
    /// not come through `append`.
    fn check(&self, name: &str) -> Result<()> {
        if self.ids.len() != self.values.len() {
            return Err(Error::SchemaMismatch(format!(
                "slot '{name}' has {} ids but {} values",
                self.ids.len(),
                self.values.len()
            )));
        }
        let mut seen = HashSet::with_capacity(self.ids.len());
        if let Some(&id) = self.ids.iter().find(|&&id| !seen.insert(id)) {
            return Err(Error::DuplicateIdentity { id });
        }
        Ok(())
    }
}

/// Durable sink for record batches, written before they are committed.
///
/// [`Suggester`](crate::Suggester) calls [`append`](Self::append) once per
/// successful `suggest`, after encoding and before mutating its store. An
/// error aborts the call with the store unchanged.
pub trait RecordLog: Send + Sync {
    /// Persists one batch.
    ///
    /// # Errors
    ///
    /// Implementations report I/O and encoding failures; the batch is then
    /// not committed.
    fn append(&self, record: &PendingRecord) -> Result<()>;
}

/// Per-slot sparse history plus the allocator numbering it.
#[derive(Clone, Debug, PartialEq)]
pub struct TrialStore {
    schema: Vec<SlotSchema>,
    slots: Vec<SlotStore>,
    allocator: IdAllocator,
}

impl TrialStore {
    /// Creates an empty store with one slot per active slot of `space`.
    #[must_use]
    pub fn new(space: &SearchSpace) -> Self {
        let schema = space.schema();
        let slots = vec![SlotStore::new(); schema.len()];
        Self {
            schema,
            slots,
            allocator: IdAllocator::new(),
        }
    }

    /// Reassembles a store from persisted parts.
    ///
    /// Checks that there is one slot per schema entry, that every slot's
    /// sequences are parallel with unique ids, and that the allocator counter
    /// is past every stored id.
    pub(crate) fn from_parts(
        schema: Vec<SlotSchema>,
        slots: Vec<SlotStore>,
        allocator: IdAllocator,
    ) -> Result<Self> {
        if schema.len() != slots.len() {
            return Err(Error::SchemaMismatch(format!(
                "{} slots declared but {} stored",
                schema.len(),
                slots.len()
            )));
        }
        let next = allocator.peek();
        for (slot, desc) in slots.iter().zip(&schema) {
            slot.check(&desc.name)?;
            if let Some(&id) = slot.ids.iter().find(|&&id| id >= next) {
                return Err(Error::SchemaMismatch(format!(
                    "allocator counter {next} does not exceed stored id {id} in slot '{}'",
                    desc.name
                )));
            }
        }
        Ok(Self {
            schema,
            slots,
            allocator,
        })
    }

    /// The slot schema this store was created with.
    #[must_use]
    pub fn schema(&self) -> &[SlotSchema] {
        &self.schema
    }

    /// Checks that `space` has exactly this store's active slots.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMismatch`] naming the first difference.
    pub fn check_compatible(&self, space: &SearchSpace) -> Result<()> {
        space.check_schema(&self.schema)
    }

    /// Number of slots (the search space's active slots).
    #[must_use]
    pub fn n_slots(&self) -> usize {
        self.slots.len()
    }

    /// The store for the slot with the given active index.
    #[must_use]
    pub fn slot(&self, active_index: usize) -> Option<&SlotStore> {
        self.slots.get(active_index)
    }

    /// All slot stores, in active-index order.
    #[must_use]
    pub fn slots(&self) -> &[SlotStore] {
        &self.slots
    }

    /// The identity allocator.
    #[must_use]
    pub fn allocator(&self) -> &IdAllocator {
        &self.allocator
    }

    /// The id the next recorded batch will start at.
    #[must_use]
    pub fn next_id(&self) -> GlobalId {
        self.allocator.peek()
    }

    /// Total number of entries across all slots.
    #[must_use]
    pub fn total_entries(&self) -> usize {
        self.slots.iter().map(SlotStore::len).sum()
    }

    /// The largest id stored in any slot.
    #[must_use]
    pub fn max_id(&self) -> Option<GlobalId> {
        self.slots.iter().flat_map(|s| s.ids.iter().copied()).max()
    }
}
