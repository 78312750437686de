//! Axiom containers.
//!
//! - [`AxiomSet`]: a deduplicated, order-irrelevant set of values with an
//!   advisory singleton flag.
//! - [`group::SemanticGroup`] / [`group::GroupedAxiomSet`]: values collected
//!   under a semantic key (e.g. all fillers of one property), with key-aware
//!   merge and removal.

pub mod group;

use std::collections::HashSet;
use std::collections::hash_set;
use std::hash::Hash;

pub use group::{GroupedAxiomSet, SemanticGroup};

/// A set of axiom values of one kind.
///
/// The singleton flag is metadata: setting it never truncates the set, and
/// [`AxiomSet::add`] does not enforce it. Only
/// [`GroupedAxiomSet::add`] acts on it. Two sets are equal when they hold the
/// same elements *and* agree on the flag.
#[derive(Debug, Clone)]
pub struct AxiomSet<V> {
    values: HashSet<V>,
    singleton: bool,
}

impl<V> AxiomSet<V> {
    /// Create an empty, non-singleton set.
    pub fn new() -> Self {
        Self {
            values: HashSet::new(),
            singleton: false,
        }
    }

    /// Create an empty set flagged singleton.
    pub fn singleton() -> Self {
        Self {
            values: HashSet::new(),
            singleton: true,
        }
    }

    /// Builder-style flag setter.
    pub fn with_singleton(mut self, singleton: bool) -> Self {
        self.singleton = singleton;
        self
    }

    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    /// Set the flag. Does not drop any element.
    pub fn set_singleton(&mut self, singleton: bool) {
        self.singleton = singleton;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> hash_set::Iter<'_, V> {
        self.values.iter()
    }

    /// Remove every element. The singleton flag is kept.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// An arbitrary element: the first in iteration order.
    pub fn first(&self) -> Option<&V> {
        self.values.iter().next()
    }

    /// `true` if the set is flagged singleton but holds more than one value.
    pub fn overflows_singleton(&self) -> bool {
        self.singleton && self.values.len() > 1
    }

    pub(crate) fn as_set(&self) -> &HashSet<V> {
        &self.values
    }
}

impl<V: Eq + Hash> AxiomSet<V> {
    /// Create a non-singleton set from an initial collection.
    pub fn from_values(values: impl IntoIterator<Item = V>) -> Self {
        Self {
            values: values.into_iter().collect(),
            singleton: false,
        }
    }

    /// Insert `value` if absent. Returns whether the set changed.
    pub fn add(&mut self, value: V) -> bool {
        self.values.insert(value)
    }

    /// Remove `value` if present. Returns whether the set changed.
    pub fn remove(&mut self, value: &V) -> bool {
        self.values.remove(value)
    }

    pub fn contains(&self, value: &V) -> bool {
        self.values.contains(value)
    }

    /// Insert every value; returns whether any insertion changed the set.
    pub fn add_all(&mut self, values: impl IntoIterator<Item = V>) -> bool {
        let mut changed = false;
        for v in values {
            changed |= self.values.insert(v);
        }
        changed
    }

    /// Remove every listed value; returns whether any removal changed the set.
    pub fn remove_all<'a>(&mut self, values: impl IntoIterator<Item = &'a V>) -> bool
    where
        V: 'a,
    {
        let mut changed = false;
        for v in values {
            changed |= self.values.remove(v);
        }
        changed
    }

    /// Element equality, ignoring the singleton flag.
    pub fn same_values(&self, other: &Self) -> bool {
        self.values == other.values
    }

    pub fn retain(&mut self, f: impl FnMut(&V) -> bool) {
        self.values.retain(f);
    }
}

impl<V> Default for AxiomSet<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Eq + Hash> PartialEq for AxiomSet<V> {
    fn eq(&self, other: &Self) -> bool {
        self.singleton == other.singleton && self.values == other.values
    }
}

impl<V: Eq + Hash> Eq for AxiomSet<V> {}

impl<V: Eq + Hash> FromIterator<V> for AxiomSet<V> {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self::from_values(iter)
    }
}

impl<V: Eq + Hash> Extend<V> for AxiomSet<V> {
    fn extend<I: IntoIterator<Item = V>>(&mut self, iter: I) {
        self.values.extend(iter);
    }
}

impl<V> IntoIterator for AxiomSet<V> {
    type Item = V;
    type IntoIter = hash_set::IntoIter<V>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl<'a, V> IntoIterator for &'a AxiomSet<V> {
    type Item = &'a V;
    type IntoIter = hash_set::Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl<V: std::fmt::Display> std::fmt::Display for AxiomSet<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("{")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{v}")?;
        }
        f.write_str("}")?;
        if self.singleton {
            f.write_str("(singleton)")?;
        }
        Ok(())
    }
}
