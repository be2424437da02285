//! Block allocation of trial identities.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::GlobalId;

/// Issues contiguous blocks of fresh [`GlobalId`]s.
///
/// The counter only moves forward. It is persisted together with the store
/// it numbers, so a restored allocator never reissues an identity that is
/// already recorded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    /// Creates an allocator whose first block starts at id 0.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Restores an allocator from a checkpointed counter value.
    #[must_use]
    pub const fn starting_at(next: GlobalId) -> Self {
        Self { next: next.get() }
    }

    /// Returns the id the next block will start at, without advancing.
    #[must_use]
    pub const fn peek(&self) -> GlobalId {
        GlobalId::new(self.next)
    }

    /// Reserves `size` consecutive ids and returns the first one.
    ///
    /// A block of size 0 returns the current counter and leaves it unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the block would run past the end
    /// of the id space. The counter is not modified in that case.
    pub fn allocate_block(&mut self, size: usize) -> Result<GlobalId> {
        let start = self.next;
        self.next = self.end_of_block(size)?;
        Ok(GlobalId::new(start))
    }

    /// Returns the counter value after a block of `size` ids.
    pub(crate) fn end_of_block(&self, size: usize) -> Result<u64> {
        u64::try_from(size)
            .ok()
            .and_then(|size| self.next.checked_add(size))
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "cannot allocate {size} ids starting at {}",
                    self.next
                ))
            })
    }
}
