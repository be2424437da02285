//! Tree-structured search spaces.
//!
//! A [`SearchSpace`] is an ordered list of slots, fixed once built. Each slot
//! has a dotted name (`"optimizer.lr"`) giving its place in a nested
//! [`Document`](crate::document::Document), an optional distribution, and an
//! optional activation condition on an earlier categorical slot.
//!
//! Slots declared without a distribution are *structurally inactive*: they
//! appear as unset in every document and take no room in the store. The
//! remaining slots are addressed by their *active index*, which is the index
//! used by [`SparseBatch`](crate::SparseBatch) and the store.
//!
//! ```
//! use trial_ledger::distribution::Distribution;
//! use trial_ledger::space::SearchSpace;
//!
//! let space = SearchSpace::builder()
//!     .slot("model", Distribution::categorical(2))
//!     .conditional_slot("svm.c", Distribution::log_uniform(1e-3, 1e3), "model", 0)
//!     .conditional_slot("forest.depth", Distribution::int(2, 12), "model", 1)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(space.n_active(), 3);
//! ```

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::distribution::Distribution;
use crate::error::{Error, Result};

/// Activation condition: the slot is defined only for trials whose `parent`
/// slot took categorical choice `choice`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Condition {
    /// Declaration index of the parent slot.
    pub parent: usize,
    /// The parent's choice that activates this slot.
    pub choice: usize,
}

/// One declared configuration variable.
#[derive(Clone, Debug, PartialEq)]
pub struct Slot {
    name: String,
    distribution: Option<Distribution>,
    condition: Option<Condition>,
}

impl Slot {
    /// The dotted document path of this slot.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The slot's distribution, or `None` for a structurally inactive slot.
    #[must_use]
    pub fn distribution(&self) -> Option<&Distribution> {
        self.distribution.as_ref()
    }

    /// The activation condition, if the slot is conditional.
    #[must_use]
    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    /// Returns `true` if the slot takes part in the store.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.distribution.is_some()
    }
}

/// Name and distribution of one active slot, as persisted with a store.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SlotSchema {
    /// Dotted document path.
    pub name: String,
    /// Declared distribution.
    pub distribution: Distribution,
}

/// An ordered, immutable list of slots.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchSpace {
    slots: Vec<Slot>,
    /// Declaration index of every active slot, in declaration order.
    active: Vec<usize>,
}

impl SearchSpace {
    /// Returns a [`SearchSpaceBuilder`].
    #[must_use]
    pub fn builder() -> SearchSpaceBuilder {
        SearchSpaceBuilder::default()
    }

    /// All declared slots, active or not.
    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Number of active slots.
    #[must_use]
    pub fn n_active(&self) -> usize {
        self.active.len()
    }

    /// Declaration indices of the active slots, in active-index order.
    #[must_use]
    pub fn active_locations(&self) -> &[usize] {
        &self.active
    }

    /// The slot with the given active index.
    #[must_use]
    pub fn active_slot(&self, active_index: usize) -> Option<&Slot> {
        self.active.get(active_index).map(|&i| &self.slots[i])
    }

    /// Iterates active slots in active-index order.
    pub fn active_slots(&self) -> impl Iterator<Item = &Slot> {
        self.active.iter().map(|&i| &self.slots[i])
    }

    /// Maps a declaration index to its active index.
    #[must_use]
    pub fn active_index(&self, location: usize) -> Option<usize> {
        self.active.binary_search(&location).ok()
    }

    /// The schema a store built for this space carries.
    #[must_use]
    pub fn schema(&self) -> Vec<SlotSchema> {
        self.active_slots()
            .filter_map(|slot| {
                slot.distribution.as_ref().map(|d| SlotSchema {
                    name: slot.name.clone(),
                    distribution: d.clone(),
                })
            })
            .collect()
    }

    /// Checks that `schema` describes exactly this space's active slots.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMismatch`] naming the first difference.
    pub fn check_schema(&self, schema: &[SlotSchema]) -> Result<()> {
        let expected = self.schema();
        if expected.len() != schema.len() {
            return Err(Error::SchemaMismatch(format!(
                "search space has {} active slots, store has {}",
                expected.len(),
                schema.len()
            )));
        }
        for (i, (want, got)) in expected.iter().zip(schema).enumerate() {
            if want.name != got.name {
                return Err(Error::SchemaMismatch(format!(
                    "slot {i} is '{}' in the search space but '{}' in the store",
                    want.name, got.name
                )));
            }
            if want.distribution != got.distribution {
                return Err(Error::SchemaMismatch(format!(
                    "slot '{}' changed distribution",
                    want.name
                )));
            }
        }
        Ok(())
    }
}

/// Builder for [`SearchSpace`].
#[derive(Debug, Default)]
pub struct SearchSpaceBuilder {
    slots: Vec<Slot>,
    /// Parent references by name, resolved in `build`.
    parents: Vec<Option<(String, usize)>>,
}

impl SearchSpaceBuilder {
    /// Declares an unconditional slot.
    #[must_use]
    pub fn slot(self, name: impl Into<String>, distribution: Distribution) -> Self {
        self.push(name.into(), Some(distribution), None)
    }

    /// Declares a slot that is defined only when slot `parent` took `choice`.
    ///
    /// The parent must be an active categorical slot declared earlier.
    #[must_use]
    pub fn conditional_slot(
        self,
        name: impl Into<String>,
        distribution: Distribution,
        parent: impl Into<String>,
        choice: usize,
    ) -> Self {
        self.push(name.into(), Some(distribution), Some((parent.into(), choice)))
    }

    /// Declares a slot that the template never samples.
    #[must_use]
    pub fn inactive_slot(self, name: impl Into<String>) -> Self {
        self.push(name.into(), None, None)
    }

    fn push(
        mut self,
        name: String,
        distribution: Option<Distribution>,
        parent: Option<(String, usize)>,
    ) -> Self {
        self.slots.push(Slot {
            name,
            distribution,
            condition: None,
        });
        self.parents.push(parent);
        self
    }

    /// Validates the declarations and builds the space.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if a name is empty, malformed,
    /// repeated, or nested under another slot's name; if a distribution is
    /// invalid; or if a condition does not refer to an earlier active
    /// categorical slot with that many choices.
    pub fn build(self) -> Result<SearchSpace> {
        let Self { mut slots, parents } = self;
        let mut by_name: HashMap<&str, usize> = HashMap::new();

        for (i, slot) in slots.iter().enumerate() {
            check_path(&slot.name)?;
            if by_name.insert(slot.name.as_str(), i).is_some() {
                return Err(Error::InvalidArgument(format!(
                    "slot '{}' declared twice",
                    slot.name
                )));
            }
            if let Some(d) = &slot.distribution {
                d.validate()?;
            }
        }

        for a in &slots {
            for b in &slots {
                if b.name.len() > a.name.len()
                    && b.name.starts_with(a.name.as_str())
                    && b.name.as_bytes()[a.name.len()] == b'.'
                {
                    return Err(Error::InvalidArgument(format!(
                        "slot '{}' is nested under slot '{}'",
                        b.name, a.name
                    )));
                }
            }
        }

        let mut conditions = Vec::with_capacity(slots.len());
        for (i, parent) in parents.into_iter().enumerate() {
            let Some((parent_name, choice)) = parent else {
                conditions.push(None);
                continue;
            };
            let parent = match by_name.get(parent_name.as_str()) {
                Some(&p) if p < i => p,
                _ => {
                    return Err(Error::InvalidArgument(format!(
                        "slot '{}' depends on '{parent_name}', which is not declared before it",
                        slots[i].name
                    )));
                }
            };
            match &slots[parent].distribution {
                Some(Distribution::Categorical(d)) if choice < d.n_choices => {}
                _ => {
                    return Err(Error::InvalidArgument(format!(
                        "slot '{}' depends on choice {choice} of '{parent_name}', \
                         which is not an active categorical slot with that choice",
                        slots[i].name
                    )));
                }
            }
            conditions.push(Some(Condition { parent, choice }));
        }

        for (slot, condition) in slots.iter_mut().zip(conditions) {
            slot.condition = condition;
        }
        let active = slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_active())
            .map(|(i, _)| i)
            .collect();
        Ok(SearchSpace { slots, active })
    }
}

fn check_path(name: &str) -> Result<()> {
    if name.is_empty() || name.split('.').any(str::is_empty) {
        return Err(Error::InvalidArgument(format!(
            "slot name '{name}' must be a dotted path of non-empty segments"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conditional_space() -> SearchSpace {
        SearchSpace::builder()
            .slot("model", Distribution::categorical(2))
            .inactive_slot("notes")
            .conditional_slot("svm.c", Distribution::log_uniform(1e-3, 1e3), "model", 0)
            .conditional_slot("forest.depth", Distribution::int(2, 12), "model", 1)
            .build()
            .unwrap()
    }

    #[test]
    fn inactive_slots_are_skipped_by_active_index() {
        let space = conditional_space();
        assert_eq!(space.slots().len(), 4);
        assert_eq!(space.active_locations(), &[0, 2, 3]);
        assert_eq!(space.active_index(2), Some(1));
        assert_eq!(space.active_index(1), None);
        assert_eq!(space.active_slot(2).unwrap().name(), "forest.depth");
    }

    #[test]
    fn conditions_resolve_to_declaration_index() {
        let space = conditional_space();
        let cond = space.slots()[3].condition().unwrap();
        assert_eq!(cond, &Condition { parent: 0, choice: 1 });
    }

    #[test]
    fn rejects_duplicate_and_nested_names() {
        let dup = SearchSpace::builder()
            .slot("x", Distribution::uniform(0.0, 1.0))
            .slot("x", Distribution::uniform(0.0, 1.0))
            .build();
        assert!(matches!(dup, Err(Error::InvalidArgument(_))));

        let nested = SearchSpace::builder()
            .slot("a", Distribution::uniform(0.0, 1.0))
            .slot("a.b", Distribution::uniform(0.0, 1.0))
            .build();
        assert!(matches!(nested, Err(Error::InvalidArgument(_))));

        let ok = SearchSpace::builder()
            .slot("a", Distribution::uniform(0.0, 1.0))
            .slot("ab", Distribution::uniform(0.0, 1.0))
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn rejects_malformed_paths() {
        for name in ["", ".x", "x.", "a..b"] {
            let res = SearchSpace::builder()
                .slot(name, Distribution::uniform(0.0, 1.0))
                .build();
            assert!(res.is_err(), "{name:?} should be rejected");
        }
    }

    #[test]
    fn rejects_bad_conditions() {
        let forward = SearchSpace::builder()
            .conditional_slot("x", Distribution::uniform(0.0, 1.0), "m", 0)
            .slot("m", Distribution::categorical(2))
            .build();
        assert!(forward.is_err());

        let out_of_range = SearchSpace::builder()
            .slot("m", Distribution::categorical(2))
            .conditional_slot("x", Distribution::uniform(0.0, 1.0), "m", 2)
            .build();
        assert!(out_of_range.is_err());

        let not_categorical = SearchSpace::builder()
            .slot("m", Distribution::int(0, 3))
            .conditional_slot("x", Distribution::uniform(0.0, 1.0), "m", 0)
            .build();
        assert!(not_categorical.is_err());
    }

    #[test]
    fn schema_check_detects_changes() {
        let space = conditional_space();
        assert!(space.check_schema(&space.schema()).is_ok());

        let mut renamed = space.schema();
        renamed[1].name = "svm.gamma".into();
        assert!(matches!(
            space.check_schema(&renamed),
            Err(Error::SchemaMismatch(_))
        ));

        let mut shorter = space.schema();
        shorter.pop();
        assert!(matches!(
            space.check_schema(&shorter),
            Err(Error::SchemaMismatch(_))
        ));

        let mut retyped = space.schema();
        retyped[0].distribution = Distribution::categorical(3);
        assert!(matches!(
            space.check_schema(&retyped),
            Err(Error::SchemaMismatch(_))
        ));
    }
}
