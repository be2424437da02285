//! JSONL-based journal of committed record batches.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{PendingRecord, RecordLog, TrialStore};
use crate::error::{Error, Result};
use crate::space::{SearchSpace, SlotSchema};

const JOURNAL_VERSION: u32 = 1;

/// One line of the journal file.
#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum JournalLine {
    /// First line: the slot schema every following record is laid out in.
    Header {
        version: u32,
        slots: Vec<SlotSchema>,
    },
    Record(PendingRecord),
}

/// A [`RecordLog`] that appends every committed batch as a JSON line.
///
/// The first line of the file holds the slot schema; each further line is one
/// batch. Replaying the file in order rebuilds the store and its allocator
/// exactly, so a journal is enough to resume after a restart. Writes take an
/// exclusive file lock, reads a shared one.
///
/// # Examples
///
/// ```no_run
/// use trial_ledger::distribution::Distribution;
/// use trial_ledger::space::SearchSpace;
/// use trial_ledger::storage::JournalLog;
/// use trial_ledger::Suggester;
///
/// let space = SearchSpace::builder()
///     .slot("x", Distribution::uniform(0.0, 1.0))
///     .build()
///     .unwrap();
/// let (journal, store) = JournalLog::open("trials.jsonl", &space).unwrap();
/// let suggester = Suggester::builder()
///     .space(space)
///     .store(store)
///     .record_log(journal)
///     .build()
///     .unwrap();
/// ```
pub struct JournalLog {
    path: PathBuf,
    /// Serialise in-process writes so we only hold the file lock briefly.
    write_lock: Mutex<()>,
}

impl JournalLog {
    /// Opens (or creates) a journal for `space` and replays it.
    ///
    /// A missing or empty file is initialised with a header for `space` and
    /// yields an empty store. A last line that is unterminated or does not
    /// parse is what an interrupted append leaves behind; its record was
    /// never committed, so it is cut from the file before replay.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the file cannot be read, written, or
    /// parsed; [`Error::SchemaMismatch`] if its header disagrees with
    /// `space`; and the errors of [`TrialStore::commit`] if a record does not
    /// continue the replayed history.
    pub fn open(path: impl AsRef<Path>, space: &SearchSpace) -> Result<(Self, TrialStore)> {
        let journal = Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        };
        let replay = read_lines(&journal.path)?;
        if let Some(len) = replay.torn_at {
            journal.truncate(len)?;
        }
        let mut store = TrialStore::new(space);

        let mut lines = replay.lines.into_iter();
        match lines.next() {
            None => {
                journal.append_line(&JournalLine::Header {
                    version: JOURNAL_VERSION,
                    slots: space.schema(),
                })?;
            }
            Some(JournalLine::Header { version, slots }) => {
                if version != JOURNAL_VERSION {
                    return Err(Error::SchemaMismatch(format!(
                        "unsupported journal version {version}"
                    )));
                }
                space.check_schema(&slots)?;
            }
            Some(JournalLine::Record(_)) => {
                return Err(Error::Storage(format!(
                    "journal {} does not start with a header",
                    journal.path.display()
                )));
            }
        }

        for line in lines {
            match line {
                JournalLine::Record(record) => {
                    store.commit(record)?;
                }
                JournalLine::Header { .. } => {
                    return Err(Error::Storage(format!(
                        "journal {} has a second header",
                        journal.path.display()
                    )));
                }
            }
        }
        trace_info!(
            path = %journal.path.display(),
            next_id = store.next_id().get(),
            "journal replayed"
        );

        Ok((journal, store))
    }

    /// The journal file's path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn truncate(&self, len: u64) -> Result<()> {
        let _guard = self.write_lock.lock();

        let file = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .map_err(|e| Error::Storage(e.to_string()))?;
        file.lock_exclusive()
            .map_err(|e| Error::Storage(e.to_string()))?;
        file.set_len(len).map_err(|e| Error::Storage(e.to_string()))?;
        file.unlock().map_err(|e| Error::Storage(e.to_string()))?;

        trace_info!(path = %self.path.display(), len, "torn journal tail discarded");
        Ok(())
    }

    fn append_line(&self, line: &JournalLine) -> Result<()> {
        let _guard = self.write_lock.lock();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::Storage(e.to_string()))?;

        file.lock_exclusive()
            .map_err(|e| Error::Storage(e.to_string()))?;

        let line = serde_json::to_string(line).map_err(|e| Error::Storage(e.to_string()))?;

        writeln!(file, "{line}").map_err(|e| Error::Storage(e.to_string()))?;
        file.flush().map_err(|e| Error::Storage(e.to_string()))?;

        file.unlock().map_err(|e| Error::Storage(e.to_string()))?;

        Ok(())
    }
}

impl RecordLog for JournalLog {
    fn append(&self, record: &PendingRecord) -> Result<()> {
        self.append_line(&JournalLine::Record(record.clone()))
    }
}

/// Parsed contents of a journal file.
struct Replay {
    lines: Vec<JournalLine>,
    /// Byte length of the intact prefix, when the last line is torn.
    torn_at: Option<u64>,
}

/// Read all lines of a journal. A missing file reads as empty.
///
/// Blank lines are skipped. An unparsable line is an error unless it is the
/// last non-blank line, in which case it is reported through `torn_at`.
fn read_lines(path: &Path) -> Result<Replay> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Replay {
                lines: Vec::new(),
                torn_at: None,
            });
        }
        Err(e) => return Err(Error::Storage(e.to_string())),
    };

    file.lock_shared()
        .map_err(|e| Error::Storage(e.to_string()))?;

    let mut reader = BufReader::new(&file);
    let mut lines = Vec::new();
    let mut buf = String::new();
    let mut offset = 0u64;
    let mut torn_at = None;
    // start offset and parse error of the latest unparsable line
    let mut unparsed: Option<(u64, String)> = None;

    loop {
        buf.clear();
        let read = reader
            .read_line(&mut buf)
            .map_err(|e| Error::Storage(e.to_string()))?;
        if read == 0 {
            break;
        }
        let start = offset;
        offset += read as u64;

        let line = buf.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((_, err)) = unparsed.take() {
            return Err(Error::Storage(err));
        }
        if !buf.ends_with('\n') {
            // only the final line can lack its newline
            torn_at = Some(start);
            break;
        }
        match serde_json::from_str(line) {
            Ok(parsed) => lines.push(parsed),
            Err(e) => unparsed = Some((start, e.to_string())),
        }
    }
    if let Some((start, _)) = unparsed {
        torn_at = Some(start);
    }

    file.unlock().map_err(|e| Error::Storage(e.to_string()))?;

    Ok(Replay { lines, torn_at })
}
