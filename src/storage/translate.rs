//! Translation between global history and locally-numbered batches.

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{SlotStore, TrialStore};
use crate::error::{Error, Result};
use crate::param::ParamValue;
use crate::space::SlotSchema;
use crate::sparse::{SparseAssignment, SparseBatch};
use crate::types::GlobalId;

/// A validated batch of new entries that has not been applied yet.
///
/// Produced by [`TrialStore::plan_record`]; applied by
/// [`TrialStore::commit`]. Planning never touches the store, so a caller can
/// abandon a plan at any point without side effects.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PendingRecord {
    offset: GlobalId,
    n: usize,
    slots: Vec<SlotStore>,
}

impl PendingRecord {
    /// The first id of the batch (the allocator counter it was planned at).
    #[must_use]
    pub fn offset(&self) -> GlobalId {
        self.offset
    }

    /// Number of trials in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.n
    }

    /// Returns `true` for a batch of zero trials.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// The batch's ids in ascending order; local position `i` gets the `i`-th.
    #[must_use]
    pub fn ids(&self) -> Vec<GlobalId> {
        (0..self.n)
            .filter_map(|p| self.offset.at_position(p))
            .collect()
    }

    /// The per-slot entries that will be appended.
    #[must_use]
    pub fn slots(&self) -> &[SlotStore] {
        &self.slots
    }

    /// Rejects a record that could not have come from `plan_record` against a
    /// store with `n_slots` slots.
    fn check(&self, n_slots: usize) -> Result<()> {
        if self.slots.len() != n_slots {
            return Err(Error::SchemaMismatch(format!(
                "record has {} slots, store has {n_slots}",
                self.slots.len()
            )));
        }
        let end = self
            .offset
            .at_position(self.n)
            .ok_or_else(|| Error::InvalidArgument("record runs past the id space".into()))?;
        for slot in &self.slots {
            slot.check("record")?;
            if let Some(&id) = slot.ids().iter().find(|&&id| id < self.offset || id >= end) {
                return Err(Error::BatchSizeMismatch {
                    expected: self.n,
                    got: usize::try_from(id.get().saturating_sub(self.offset.get()))
                        .map_or(usize::MAX, |p| p.saturating_add(1)),
                });
            }
        }
        Ok(())
    }
}

impl TrialStore {
    /// Returns the stored values for `requested` ids, renumbered locally.
    ///
    /// The `i`-th requested id becomes local position `i`. Each slot's output
    /// follows that slot's storage order, restricted to the requested ids, not
    /// the order of `requested`. Ids unknown to a slot are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateIdentity`] if `requested` repeats an id.
    pub fn recall(&self, requested: &[GlobalId]) -> Result<SparseBatch> {
        if requested.is_empty() {
            return Ok(vec![SparseAssignment::new(); self.slots.len()]);
        }

        let mut local = HashMap::with_capacity(requested.len());
        for (position, &id) in requested.iter().enumerate() {
            if local.insert(id, position).is_some() {
                return Err(Error::DuplicateIdentity { id });
            }
        }

        Ok(self
            .slots
            .iter()
            .map(|slot| {
                slot.entries()
                    .filter_map(|(id, value)| local.get(&id).map(|&p| (p, value.clone())))
                    .collect()
            })
            .collect())
    }

    /// Validates a locally-numbered batch of `n` trials and computes the
    /// entries it would append, without modifying the store.
    ///
    /// Local position `p` maps to global id `offset + p`, where `offset` is
    /// the current allocator counter. The same position in different slots
    /// shares one id; that is how one trial's variables stay together.
    ///
    /// # Errors
    ///
    /// - [`Error::SchemaMismatch`] if `batch` does not have one assignment per
    ///   slot.
    /// - [`Error::BatchSizeMismatch`] if a position is `>= n`, or if some
    ///   position in `0..n` is referenced by no slot.
    /// - [`Error::DuplicateIdentity`] if one slot lists a position twice.
    /// - [`Error::InvalidArgument`] if a value is not finite, does not match
    ///   its slot's distribution, or `n` ids do not fit in the id space.
    pub fn plan_record(&self, batch: &[SparseAssignment], n: usize) -> Result<PendingRecord> {
        if batch.len() != self.slots.len() {
            return Err(Error::SchemaMismatch(format!(
                "batch has {} slot assignments, store has {} slots",
                batch.len(),
                self.slots.len()
            )));
        }
        let offset = self.allocator.peek();
        self.allocator.end_of_block(n)?;

        let mut covered = vec![false; n];
        let mut slots = Vec::with_capacity(batch.len());
        for (assignment, desc) in batch.iter().zip(&self.schema) {
            let mut seen = vec![false; n];
            let mut delta = SlotStore::with_capacity(assignment.len());
            for (position, value) in assignment.iter() {
                if position >= n {
                    return Err(Error::BatchSizeMismatch {
                        expected: n,
                        got: position.saturating_add(1),
                    });
                }
                check_value(desc, position, value)?;
                let id = offset.at_position(position).ok_or_else(|| {
                    Error::InvalidArgument(format!("position {position} overflows the id space"))
                })?;
                if core::mem::replace(&mut seen[position], true) {
                    return Err(Error::DuplicateIdentity { id });
                }
                covered[position] = true;
                delta.push(id, value.clone());
            }
            slots.push(delta);
        }

        let got = covered.iter().filter(|&&c| c).count();
        if got != n {
            return Err(Error::BatchSizeMismatch { expected: n, got });
        }
        Ok(PendingRecord { offset, n, slots })
    }

    /// Applies a planned batch: appends its entries and advances the
    /// allocator by its size. Returns the batch's ids in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the store has changed since the
    /// record was planned, or an error from the record's own validation. The
    /// store is unchanged on error.
    pub fn commit(&mut self, record: PendingRecord) -> Result<Vec<GlobalId>> {
        if record.offset != self.allocator.peek() {
            return Err(Error::InvalidArgument(format!(
                "record planned at id {} but the store is at {}",
                record.offset,
                self.allocator.peek()
            )));
        }
        record.check(self.slots.len())?;

        let ids = record.ids();
        let PendingRecord { n, slots, .. } = record;
        self.allocator.allocate_block(n)?;
        for (slot, delta) in self.slots.iter_mut().zip(slots) {
            slot.extend(delta);
        }
        trace_info!(first_id = ?ids.first(), n, "record committed");
        Ok(ids)
    }

    /// Plans and commits in one step. See [`plan_record`](Self::plan_record).
    ///
    /// # Errors
    ///
    /// As for [`plan_record`](Self::plan_record); the store is unchanged on
    /// error.
    pub fn record(&mut self, batch: &[SparseAssignment], n: usize) -> Result<Vec<GlobalId>> {
        let pending = self.plan_record(batch, n)?;
        self.commit(pending)
    }
}

/// Rejects a value that could not be persisted and read back, or that lies
/// outside the slot's declared domain.
fn check_value(desc: &SlotSchema, position: usize, value: &ParamValue) -> Result<()> {
    if value.as_float().is_some_and(|v| !v.is_finite()) {
        return Err(Error::InvalidArgument(format!(
            "slot '{}' got non-finite value {value} at position {position}",
            desc.name
        )));
    }
    if !desc.distribution.contains(value) {
        return Err(Error::InvalidArgument(format!(
            "slot '{}' got {value} at position {position}, outside its distribution",
            desc.name
        )));
    }
    Ok(())
}
