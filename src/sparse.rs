//! Locally-numbered sparse assignments.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::param::ParamValue;

/// The values one slot takes within one batch.
///
/// `positions` are local indices in `0..n` for a batch of `n` trials; a
/// position is missing when the slot is not defined for that trial. The two
/// sequences always have the same length.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SparseAssignment {
    positions: Vec<usize>,
    values: Vec<ParamValue>,
}

/// One [`SparseAssignment`] per active slot, in active-index order.
pub type SparseBatch = Vec<SparseAssignment>;

impl SparseAssignment {
    /// Creates an empty assignment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an assignment from parallel sequences.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the sequences differ in length.
    pub fn from_parts(positions: Vec<usize>, values: Vec<ParamValue>) -> Result<Self> {
        if positions.len() != values.len() {
            return Err(Error::InvalidArgument(format!(
                "{} positions but {} values",
                positions.len(),
                values.len()
            )));
        }
        Ok(Self { positions, values })
    }

    /// Appends one `(position, value)` pair.
    pub fn push(&mut self, position: usize, value: ParamValue) {
        self.positions.push(position);
        self.values.push(value);
    }

    /// Local positions, in entry order.
    #[must_use]
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Values, parallel to [`positions`](Self::positions).
    #[must_use]
    pub fn values(&self) -> &[ParamValue] {
        &self.values
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns `true` if the slot is defined for no trial in the batch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Iterates `(position, value)` pairs in entry order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &ParamValue)> {
        self.positions.iter().copied().zip(&self.values)
    }

    /// Returns the value at local `position`, if the slot is defined there.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&ParamValue> {
        self.iter().find(|&(p, _)| p == position).map(|(_, v)| v)
    }

    /// Splits into the parallel sequences.
    #[must_use]
    pub fn into_parts(self) -> (Vec<usize>, Vec<ParamValue>) {
        (self.positions, self.values)
    }
}

impl FromIterator<(usize, ParamValue)> for SparseAssignment {
    fn from_iter<I: IntoIterator<Item = (usize, ParamValue)>>(iter: I) -> Self {
        let (positions, values) = iter.into_iter().unzip();
        Self { positions, values }
    }
}
