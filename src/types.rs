//! Core types for the ledger.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Permanent identity of one suggested trial.
///
/// Identities are issued by the [`IdAllocator`](crate::IdAllocator) in
/// strictly increasing order and are never reused for the lifetime of a
/// store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct GlobalId(u64);

impl GlobalId {
    /// Wraps a raw identity.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identity.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the identity that local `position` maps to when this id is the
    /// batch offset.
    pub(crate) fn at_position(self, position: usize) -> Option<Self> {
        let position = u64::try_from(position).ok()?;
        self.0.checked_add(position).map(Self)
    }
}

impl From<u64> for GlobalId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The state of a trial as reported by the experiment driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "lowercase"))]
pub enum TrialStatus {
    /// Computation has not started.
    New,
    /// Computation is in progress.
    Running,
    /// Computation was suspended before finishing.
    Suspended,
    /// Computation finished normally.
    Ok,
    /// Computation finished with an error.
    Fail,
}

impl TrialStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::New,
        Self::Running,
        Self::Suspended,
        Self::Ok,
        Self::Fail,
    ];

    /// Returns the lowercase name used in result documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Running => "running",
            Self::Suspended => "suspended",
            Self::Ok => "ok",
            Self::Fail => "fail",
        }
    }

    /// Returns `true` once the trial will not change any more.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Ok | Self::Fail)
    }
}

impl fmt::Display for TrialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrialStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown trial status '{s}'")))
    }
}
