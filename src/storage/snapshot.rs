use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{SlotStore, TrialStore};
use crate::allocator::IdAllocator;
use crate::error::{Error, Result};
use crate::space::{SearchSpace, SlotSchema};
use crate::types::GlobalId;

/// Current snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A serializable snapshot of a [`TrialStore`].
///
/// The slot entries and the allocator counter are saved together and must be
/// restored together: a counter from one snapshot paired with entries from
/// another could reissue recorded ids.
///
/// # Schema versioning
///
/// The `version` field enables future schema evolution without breaking
/// existing files. The current version is [`SNAPSHOT_VERSION`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Schema version for forward compatibility.
    pub version: u32,
    /// Name and distribution of every active slot, in active-index order.
    pub slots: Vec<SlotSchema>,
    /// The id the next batch will start at.
    pub next_id: GlobalId,
    /// Stored entries, one sequence per slot.
    pub entries: Vec<SlotStore>,
    /// Free-form caller metadata; see [`TrialStore::save_with_metadata`].
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl StoreSnapshot {
    /// Reads a snapshot file without validating it against a search space.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the file cannot be read or parsed.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let file =
            std::fs::File::open(path.as_ref()).map_err(|e| Error::Storage(e.to_string()))?;
        serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|e| Error::Storage(e.to_string()))
    }
}

impl TrialStore {
    /// Captures the store's entries and counter.
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        self.snapshot_with_metadata(HashMap::new())
    }

    /// Captures the store together with caller-supplied metadata, such as a
    /// strategy description or the experiment it belongs to.
    #[must_use]
    pub fn snapshot_with_metadata(&self, metadata: HashMap<String, String>) -> StoreSnapshot {
        StoreSnapshot {
            version: SNAPSHOT_VERSION,
            slots: self.schema.clone(),
            next_id: self.allocator.peek(),
            entries: self.slots.clone(),
            metadata,
        }
    }

    /// Rebuilds a store from a snapshot for the given search space.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMismatch`] if the snapshot's version is
    /// unknown, its slots differ from `space`'s active slots, or its entries
    /// are inconsistent with its counter; [`Error::DuplicateIdentity`] if a
    /// slot repeats an id.
    pub fn restore(snapshot: StoreSnapshot, space: &SearchSpace) -> Result<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::SchemaMismatch(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        space.check_schema(&snapshot.slots)?;
        Self::from_parts(
            snapshot.slots,
            snapshot.entries,
            IdAllocator::starting_at(snapshot.next_id),
        )
    }

    /// Saves the store to a JSON file.
    ///
    /// The file is written next to its destination and renamed into place,
    /// so an interrupted save never leaves a truncated snapshot behind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the file cannot be created, written, or
    /// renamed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.save_with_metadata(path, HashMap::new())
    }

    /// Like [`save`](Self::save), recording `metadata` in the file. Read it
    /// back with [`StoreSnapshot::read`].
    ///
    /// # Errors
    ///
    /// As for [`save`](Self::save).
    pub fn save_with_metadata(
        &self,
        path: impl AsRef<Path>,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        let path = path.as_ref();
        let parent = path.parent().unwrap_or(Path::new("."));
        let tmp_path = parent.join(format!(
            ".{}.tmp",
            path.file_name().unwrap_or_default().to_string_lossy()
        ));
        let file =
            std::fs::File::create(&tmp_path).map_err(|e| Error::Storage(e.to_string()))?;
        serde_json::to_writer_pretty(file, &self.snapshot_with_metadata(metadata))
            .map_err(|e| Error::Storage(e.to_string()))?;
        std::fs::rename(&tmp_path, path).map_err(|e| Error::Storage(e.to_string()))?;
        trace_info!(
            path = %path.display(),
            next_id = self.allocator.peek().get(),
            "store saved"
        );
        Ok(())
    }

    /// Loads a store saved with [`save`](Self::save) and validates it against
    /// `space`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the file cannot be read or parsed, and
    /// the errors of [`restore`](Self::restore) otherwise.
    pub fn load(path: impl AsRef<Path>, space: &SearchSpace) -> Result<Self> {
        let path = path.as_ref();
        let store = Self::restore(StoreSnapshot::read(path)?, space)?;
        trace_info!(
            path = %path.display(),
            next_id = store.allocator.peek().get(),
            "store loaded"
        );
        Ok(store)
    }
}
