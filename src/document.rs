//! Nested documents and the codec between them and sparse batches.
//!
//! A [`Document`] is one trial's configuration in nested form, keyed by the
//! segments of each slot's dotted name, plus an optional [`GlobalId`]. Which
//! phase a document is in is visible in its type: documents produced by
//! [`to_documents`] carry no identity, and [`Document::attach_id`] refuses to
//! overwrite one; [`from_document`] refuses a document without one.
//!
//! In JSON a document looks like
//!
//! ```json
//! { "id": 4, "params": { "model": { "Categorical": 1 }, "svm": { "c": null } } }
//! ```
//!
//! where `null` marks a slot that is unset for this trial.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::param::ParamValue;
use crate::space::SearchSpace;
use crate::sparse::{SparseAssignment, SparseBatch};
use crate::types::GlobalId;

/// A node of a document tree.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(untagged))]
pub enum Node {
    /// A slot's value.
    Value(ParamValue),
    /// An inner level of the dotted path.
    Map(BTreeMap<String, Node>),
    /// A slot that is not defined for this trial.
    Unset,
}

/// One trial's configuration in nested form.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Document {
    id: Option<GlobalId>,
    params: BTreeMap<String, Node>,
}

impl Document {
    /// Creates an empty document without identity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The document's identity, if it has been assigned one.
    #[must_use]
    pub fn id(&self) -> Option<GlobalId> {
        self.id
    }

    /// Returns the identity of a recorded document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDocument`] if the document has no identity.
    pub fn require_id(&self) -> Result<GlobalId> {
        self.id
            .ok_or_else(|| Error::InvalidDocument("document has no trial identity".into()))
    }

    /// Tags a fresh document with its identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDocument`] if the document already has one.
    pub fn attach_id(&mut self, id: GlobalId) -> Result<()> {
        if let Some(existing) = self.id {
            return Err(Error::InvalidDocument(format!(
                "document already carries identity {existing}"
            )));
        }
        self.id = Some(id);
        Ok(())
    }

    /// The top level of the document tree.
    #[must_use]
    pub fn params(&self) -> &BTreeMap<String, Node> {
        &self.params
    }

    /// Looks up the node at a dotted path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Node> {
        let mut segments = path.split('.');
        let mut node = self.params.get(segments.next()?)?;
        for segment in segments {
            match node {
                Node::Map(children) => node = children.get(segment)?,
                Node::Value(_) | Node::Unset => return None,
            }
        }
        Some(node)
    }

    /// Returns the value at a dotted path, or `None` if it is unset or absent.
    #[must_use]
    pub fn value(&self, path: &str) -> Option<&ParamValue> {
        match self.get(path)? {
            Node::Value(v) => Some(v),
            Node::Map(_) | Node::Unset => None,
        }
    }

    /// Sets the leaf at a dotted path, creating inner levels as needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDocument`] if the path is empty or runs
    /// through an existing leaf.
    pub fn insert(&mut self, path: &str, leaf: Node) -> Result<()> {
        let (parents, last) = match path.rsplit_once('.') {
            Some((parents, last)) => (Some(parents), last),
            None => (None, path),
        };
        if last.is_empty() {
            return Err(Error::InvalidDocument(format!("invalid path '{path}'")));
        }
        let mut level = &mut self.params;
        for segment in parents.into_iter().flat_map(|p| p.split('.')) {
            let child = level
                .entry(segment.to_owned())
                .or_insert_with(|| Node::Map(BTreeMap::new()));
            level = match child {
                Node::Map(children) => children,
                Node::Value(_) | Node::Unset => {
                    return Err(Error::InvalidDocument(format!(
                        "path '{path}' runs through the leaf '{segment}'"
                    )));
                }
            };
        }
        level.insert(last.to_owned(), leaf);
        Ok(())
    }

    /// Dotted paths of every leaf, in sorted order.
    #[must_use]
    pub fn leaf_paths(&self) -> Vec<String> {
        fn walk(prefix: &str, level: &BTreeMap<String, Node>, out: &mut Vec<String>) {
            for (key, node) in level {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                match node {
                    Node::Map(children) => walk(&path, children, out),
                    Node::Value(_) | Node::Unset => out.push(path),
                }
            }
        }
        let mut out = Vec::new();
        walk("", &self.params, &mut out);
        out
    }
}

/// Expands a sparse batch of `n` trials into `n` identity-free documents.
///
/// Document `p` holds, for every slot of `space`, the value assigned at local
/// position `p`, or [`Node::Unset`] if the slot has none there (structurally
/// inactive slots are always unset).
///
/// # Errors
///
/// Returns [`Error::SchemaMismatch`] if `batch` does not have one assignment
/// per active slot, and [`Error::BatchSizeMismatch`] if a position is `>= n`.
pub fn to_documents(
    space: &SearchSpace,
    batch: &[SparseAssignment],
    n: usize,
) -> Result<Vec<Document>> {
    if batch.len() != space.n_active() {
        return Err(Error::SchemaMismatch(format!(
            "batch has {} slot assignments, search space has {} active slots",
            batch.len(),
            space.n_active()
        )));
    }

    let mut docs = vec![Document::new(); n];
    for slot in space.slots() {
        for doc in &mut docs {
            doc.insert(slot.name(), Node::Unset)?;
        }
    }
    for (assignment, slot) in batch.iter().zip(space.active_slots()) {
        for (position, value) in assignment.iter() {
            let doc = docs.get_mut(position).ok_or(Error::BatchSizeMismatch {
                expected: n,
                got: position.saturating_add(1),
            })?;
            doc.insert(slot.name(), Node::Value(value.clone()))?;
        }
    }
    Ok(docs)
}

/// Reads a recorded document back into its identity and per-slot values.
///
/// The values are in active-index order; `None` marks a slot that is unset
/// for this trial.
///
/// # Errors
///
/// Returns [`Error::InvalidDocument`] if the document has no identity, lacks
/// a leaf for some slot of `space`, or has a leaf no slot declares.
pub fn from_document(
    space: &SearchSpace,
    doc: &Document,
) -> Result<(GlobalId, Vec<Option<ParamValue>>)> {
    let id = doc.require_id()?;

    if let Some(extra) = doc
        .leaf_paths()
        .into_iter()
        .find(|path| !space.slots().iter().any(|s| s.name() == path.as_str()))
    {
        return Err(Error::InvalidDocument(format!(
            "document {id} has undeclared field '{extra}'"
        )));
    }

    let values = space
        .active_slots()
        .map(|slot| match doc.get(slot.name()) {
            Some(Node::Value(v)) => Ok(Some(v.clone())),
            Some(Node::Unset) => Ok(None),
            Some(Node::Map(_)) | None => Err(Error::InvalidDocument(format!(
                "document {id} has no value for slot '{}'",
                slot.name()
            ))),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((id, values))
}

/// Reads recorded documents back into their ids and a sparse batch in which
/// document `i` is local position `i`.
///
/// # Errors
///
/// As for [`from_document`].
pub fn from_documents(
    space: &SearchSpace,
    docs: &[Document],
) -> Result<(Vec<GlobalId>, SparseBatch)> {
    let mut ids = Vec::with_capacity(docs.len());
    let mut batch = vec![SparseAssignment::new(); space.n_active()];
    for (position, doc) in docs.iter().enumerate() {
        let (id, values) = from_document(space, doc)?;
        ids.push(id);
        for (assignment, value) in batch.iter_mut().zip(values) {
            if let Some(value) = value {
                assignment.push(position, value);
            }
        }
    }
    Ok((ids, batch))
}
