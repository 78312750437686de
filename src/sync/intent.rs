//! Synchronisation intents: the minimal delta between two axiom snapshots.

use std::collections::HashSet;
use std::hash::Hash;

use crate::axiom::{AxiomSet, GroupedAxiomSet, SemanticGroup};

/// The add/remove delta that turns a *current* set into a *target* set.
///
/// `to_add` and `to_remove` are disjoint. `unchanged` holds the values
/// present in both snapshots; it is informational and never turned into a
/// store operation.
#[derive(Debug, Clone)]
pub struct SynchronisationIntent<V> {
    to_add: HashSet<V>,
    to_remove: HashSet<V>,
    unchanged: HashSet<V>,
}

impl<V> SynchronisationIntent<V> {
    pub(crate) fn from_parts(
        to_add: HashSet<V>,
        to_remove: HashSet<V>,
        unchanged: HashSet<V>,
    ) -> Self {
        Self {
            to_add,
            to_remove,
            unchanged,
        }
    }

    pub fn to_add(&self) -> &HashSet<V> {
        &self.to_add
    }

    pub fn to_remove(&self) -> &HashSet<V> {
        &self.to_remove
    }

    pub fn unchanged(&self) -> &HashSet<V> {
        &self.unchanged
    }

    /// `true` when neither side requires an operation.
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Number of operations this intent expands into.
    pub fn operation_count(&self) -> usize {
        self.to_add.len() + self.to_remove.len()
    }
}

impl<V: Eq + Hash + Clone> SynchronisationIntent<V> {
    /// Remove `to_remove`, then add `to_add`. The singleton flag of
    /// `current` is left alone.
    pub fn apply_to(&self, current: &mut AxiomSet<V>) {
        current.remove_all(&self.to_remove);
        current.add_all(self.to_add.iter().cloned());
    }
}

impl<V> Default for SynchronisationIntent<V> {
    fn default() -> Self {
        Self {
            to_add: HashSet::new(),
            to_remove: HashSet::new(),
            unchanged: HashSet::new(),
        }
    }
}

impl<V: Eq + Hash> PartialEq for SynchronisationIntent<V> {
    fn eq(&self, other: &Self) -> bool {
        self.to_add == other.to_add
            && self.to_remove == other.to_remove
            && self.unchanged == other.unchanged
    }
}

impl<V: Eq + Hash> Eq for SynchronisationIntent<V> {}

// ---------------------------------------------------------------------------
// Grouped intent
// ---------------------------------------------------------------------------

/// Per-key delta between two [`GroupedAxiomSet`]s.
///
/// Every side is itself a grouped set, so each added or removed value is
/// tagged with the semantic key it lives under. Group flags on these sets
/// are always `false`.
#[derive(Debug, Clone)]
pub struct GroupedIntent<K, V> {
    to_add: GroupedAxiomSet<K, V>,
    to_remove: GroupedAxiomSet<K, V>,
    unchanged: GroupedAxiomSet<K, V>,
}

impl<K, V> GroupedIntent<K, V> {
    pub fn to_add(&self) -> &GroupedAxiomSet<K, V> {
        &self.to_add
    }

    pub fn to_remove(&self) -> &GroupedAxiomSet<K, V> {
        &self.to_remove
    }

    pub fn unchanged(&self) -> &GroupedAxiomSet<K, V> {
        &self.unchanged
    }

    /// `true` when no (key, value) pair needs adding or removing.
    pub fn is_empty(&self) -> bool {
        self.to_add.value_count() == 0 && self.to_remove.value_count() == 0
    }

    pub fn operation_count(&self) -> usize {
        self.to_add.value_count() + self.to_remove.value_count()
    }
}

impl<K: Eq + Hash, V: Eq + Hash> GroupedIntent<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            to_add: GroupedAxiomSet::new(),
            to_remove: GroupedAxiomSet::new(),
            unchanged: GroupedAxiomSet::new(),
        }
    }

    /// Record the flat delta computed for one key. Empty sides are skipped.
    pub(crate) fn record(&mut self, key: K, delta: SynchronisationIntent<V>)
    where
        K: Clone,
    {
        let SynchronisationIntent {
            to_add,
            to_remove,
            unchanged,
        } = delta;
        for (side, values) in [
            (&mut self.to_add, to_add),
            (&mut self.to_remove, to_remove),
            (&mut self.unchanged, unchanged),
        ] {
            if !values.is_empty() {
                side.add(SemanticGroup::with_values(key.clone(), values));
            }
        }
    }

    /// Every (key, value) pair to add.
    pub fn additions(&self) -> impl Iterator<Item = (&K, &V)> {
        self.to_add.pairs()
    }

    /// Every (key, value) pair to remove.
    pub fn removals(&self) -> impl Iterator<Item = (&K, &V)> {
        self.to_remove.pairs()
    }

    /// Remove every tagged removal, then add every tagged addition.
    ///
    /// A group emptied by removal is dropped. Additions under an existing
    /// key extend that group without touching its singleton flag.
    pub fn apply_to(&self, current: &mut GroupedAxiomSet<K, V>)
    where
        K: Clone,
        V: Clone,
    {
        for group in &self.to_remove {
            let emptied = match current.get_mut(group.key()) {
                Some(existing) => {
                    existing.values_mut().remove_all(group.values());
                    existing.values().is_empty()
                }
                None => false,
            };
            if emptied {
                current.remove_key(group.key());
            }
        }
        for group in &self.to_add {
            match current.get_mut(group.key()) {
                Some(existing) => {
                    existing.values_mut().add_all(group.values().iter().cloned());
                }
                None => {
                    current.add(group.clone());
                }
            }
        }
    }
}

impl<K: Eq + Hash, V: Eq + Hash> PartialEq for GroupedIntent<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.to_add == other.to_add
            && self.to_remove == other.to_remove
            && self.unchanged == other.unchanged
    }
}

impl<K: Eq + Hash, V: Eq + Hash> Eq for GroupedIntent<K, V> {}
