//! Semantic groups: axiom values collected under a shared key.
//!
//! A [`SemanticGroup`] is equal to another group with the same key, no matter
//! what values either holds. That is what lets [`GroupedAxiomSet::add`]
//! express "add a value under an existing key" as a set operation: the
//! incoming group *matches* the stored one and its values are merged in.

use std::hash::{Hash, Hasher};

use super::AxiomSet;

/// A semantic key paired with the values linked under it.
///
/// `PartialEq` and `Hash` look at `key` only. Use
/// [`SemanticGroup::same_content`] for a deep comparison.
#[derive(Debug, Clone)]
pub struct SemanticGroup<K, V> {
    key: K,
    values: AxiomSet<V>,
}

impl<K, V> SemanticGroup<K, V> {
    /// A group with no values yet (the key is tracked, the fillers are unknown).
    pub fn new(key: K) -> Self {
        Self {
            key,
            values: AxiomSet::new(),
        }
    }

    /// A group holding `values`.
    pub fn with_set(key: K, values: AxiomSet<V>) -> Self {
        Self { key, values }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn values(&self) -> &AxiomSet<V> {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut AxiomSet<V> {
        &mut self.values
    }

    pub fn into_parts(self) -> (K, AxiomSet<V>) {
        (self.key, self.values)
    }
}

impl<K, V: Eq + Hash> SemanticGroup<K, V> {
    /// A non-singleton group holding `values`.
    pub fn with_values(key: K, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            key,
            values: AxiomSet::from_values(values),
        }
    }

    /// A singleton group holding exactly `value`.
    pub fn single(key: K, value: V) -> Self {
        let mut values = AxiomSet::singleton();
        values.add(value);
        Self { key, values }
    }
}

impl<K: PartialEq, V: Eq + Hash> SemanticGroup<K, V> {
    /// Deep equality: same key, same values, same singleton flag.
    pub fn same_content(&self, other: &Self) -> bool {
        self.key == other.key && self.values == other.values
    }
}

impl<K: PartialEq, V> PartialEq for SemanticGroup<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<K: Eq, V> Eq for SemanticGroup<K, V> {}

impl<K: Hash, V> Hash for SemanticGroup<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<K: std::fmt::Display, V: std::fmt::Display> std::fmt::Display for SemanticGroup<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.key, self.values)
    }
}

// ---------------------------------------------------------------------------
// Grouped axiom set
// ---------------------------------------------------------------------------

/// A set of [`SemanticGroup`]s holding at most one group per key.
///
/// Groups are kept in insertion order and found by linear scan. `add` merges
/// into an existing group with the same key, so two groups with one key can
/// only appear through a bug; debug builds assert on it and
/// [`GroupedAxiomSet::normalize`] folds duplicates back together.
#[derive(Debug, Clone)]
pub struct GroupedAxiomSet<K, V> {
    groups: Vec<SemanticGroup<K, V>>,
    singleton: bool,
}

impl<K, V> GroupedAxiomSet<K, V> {
    pub fn new() -> Self {
        Self {
            groups: Vec::new(),
            singleton: false,
        }
    }

    /// Build a set from raw groups without merging duplicate keys.
    #[cfg(test)]
    pub(crate) fn from_groups_unchecked(groups: Vec<SemanticGroup<K, V>>) -> Self {
        Self {
            groups,
            singleton: false,
        }
    }

    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    pub fn set_singleton(&mut self, singleton: bool) {
        self.singleton = singleton;
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SemanticGroup<K, V>> {
        self.groups.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.groups.iter().map(|g| &g.key)
    }

    /// Number of (key, value) pairs across all groups.
    pub fn value_count(&self) -> usize {
        self.groups.iter().map(|g| g.values.len()).sum()
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }
}

impl<K: Eq + Hash, V: Eq + Hash> GroupedAxiomSet<K, V> {
    /// Add a group, merging it into an existing group with the same key.
    ///
    /// On a key match the stored group absorbs the incoming values. If the
    /// incoming values are flagged singleton, the stored values are cleared
    /// first. The stored flag always takes the incoming flag, so a
    /// non-singleton add into a singleton group appends without clearing.
    /// A group with no values still registers its key.
    ///
    /// Returns whether membership, any value, or a flag changed.
    pub fn add(&mut self, group: SemanticGroup<K, V>) -> bool {
        let consistent = self.is_consistent();
        debug_assert!(consistent, "grouped axiom set holds duplicate keys");
        if !consistent {
            self.normalize();
        }

        let Some(existing) = self.groups.iter_mut().find(|g| g.key == group.key) else {
            self.groups.push(group);
            return true;
        };

        let (_, incoming) = group.into_parts();
        let incoming_singleton = incoming.is_singleton();
        let mut changed = existing.values.is_singleton() != incoming_singleton;

        if incoming_singleton {
            changed |= !existing.values.same_values(&incoming);
            existing.values.clear();
            existing.values.add_all(incoming);
        } else {
            changed |= existing.values.add_all(incoming);
        }
        existing.values.set_singleton(incoming_singleton);
        changed
    }

    /// Remove the group that is deeply equal to `group`, as decided by
    /// [`SemanticGroup::same_content`].
    pub fn remove(&mut self, group: &SemanticGroup<K, V>) -> bool {
        let found = self.groups.iter().position(|g| g.same_content(group));
        match found {
            Some(idx) => {
                self.groups.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Remove the whole group stored under `key`, whatever its values.
    pub fn remove_key(&mut self, key: &K) -> bool {
        match self.groups.iter().position(|g| &g.key == key) {
            Some(idx) => {
                self.groups.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, key: &K) -> Option<&SemanticGroup<K, V>> {
        self.groups.iter().find(|g| &g.key == key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut SemanticGroup<K, V>> {
        self.groups.iter_mut().find(|g| &g.key == key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// The values under `key`, or a fresh empty set if the key is absent.
    pub fn lookup_values(&self, key: &K) -> AxiomSet<V>
    where
        V: Clone,
    {
        self.get(key)
            .map(|g| g.values.clone())
            .unwrap_or_default()
    }

    /// One value under `key`: the first in iteration order.
    ///
    /// Asking for a single value of a group that is not flagged singleton is
    /// a usage mistake; it is reported as a warning, not an error.
    pub fn lookup_single(&self, key: &K) -> Option<&V>
    where
        K: std::fmt::Debug,
    {
        let group = self.get(key)?;
        if !group.values.is_singleton() {
            tracing::warn!(
                key = ?key,
                count = group.values.len(),
                "single value requested from a non-singleton group"
            );
        }
        group.values.first()
    }

    /// `true` if no two groups share a key.
    pub fn is_consistent(&self) -> bool {
        let mut seen = std::collections::HashSet::with_capacity(self.groups.len());
        self.groups.iter().all(|g| seen.insert(&g.key))
    }

    /// Fold groups sharing a key into the first of them. Returns how many
    /// duplicates were merged away.
    pub fn normalize(&mut self) -> usize {
        let mut merged: Vec<SemanticGroup<K, V>> = Vec::with_capacity(self.groups.len());
        let mut folded = 0;
        for group in self.groups.drain(..) {
            match merged.iter_mut().find(|g| g.key == group.key) {
                Some(existing) => {
                    let (_, values) = group.into_parts();
                    existing.values.add_all(values);
                    folded += 1;
                }
                None => merged.push(group),
            }
        }
        self.groups = merged;
        folded
    }

    /// Every (key, value) pair, flattened.
    pub fn pairs(&self) -> impl Iterator<Item = (&K, &V)> {
        self.groups
            .iter()
            .flat_map(|g| g.values.iter().map(move |v| (&g.key, v)))
    }
}

impl<K, V> Default for GroupedAxiomSet<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, V: Eq + Hash> PartialEq for GroupedAxiomSet<K, V> {
    /// Order-independent deep equality, including every singleton flag.
    fn eq(&self, other: &Self) -> bool {
        self.singleton == other.singleton
            && self.groups.len() == other.groups.len()
            && self.groups.iter().all(|g| {
                other
                    .get(&g.key)
                    .is_some_and(|o| o.values == g.values)
            })
    }
}

impl<K: Eq + Hash, V: Eq + Hash> Eq for GroupedAxiomSet<K, V> {}

impl<K: Eq + Hash, V: Eq + Hash> FromIterator<SemanticGroup<K, V>> for GroupedAxiomSet<K, V> {
    fn from_iter<I: IntoIterator<Item = SemanticGroup<K, V>>>(iter: I) -> Self {
        let mut set = Self::new();
        for group in iter {
            set.add(group);
        }
        set
    }
}

impl<K, V> IntoIterator for GroupedAxiomSet<K, V> {
    type Item = SemanticGroup<K, V>;
    type IntoIter = std::vec::IntoIter<SemanticGroup<K, V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}

impl<'a, K, V> IntoIterator for &'a GroupedAxiomSet<K, V> {
    type Item = &'a SemanticGroup<K, V>;
    type IntoIter = std::slice::Iter<'a, SemanticGroup<K, V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

impl<K: std::fmt::Display, V: std::fmt::Display> std::fmt::Display for GroupedAxiomSet<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("{")?;
        for (i, g) in self.groups.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{g}")?;
        }
        f.write_str("}")?;
        if self.singleton {
            f.write_str("(singleton)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::capture_warnings;

    fn group(key: &'static str, values: &[&'static str]) -> SemanticGroup<&'static str, &'static str> {
        SemanticGroup::with_values(key, values.iter().copied())
    }

    #[test]
    fn group_equality_is_key_only() {
        let a = group("isIn", &["Kitchen"]);
        let b = group("isIn", &["Corridor", "Hall"]);
        assert_eq!(a, b);
        assert!(!a.same_content(&b));
        assert_ne!(a, group("hasDoor", &["Kitchen"]));
    }

    #[test]
    fn add_merges_values_under_existing_key() {
        let mut set = GroupedAxiomSet::new();
        assert!(set.add(group("K", &["a"])));
        assert!(set.add(group("K", &["b"])));
        assert_eq!(set.len(), 1);
        assert_eq!(set.lookup_values(&"K"), AxiomSet::from_values(["a", "b"]));
    }

    fn duplicated() -> GroupedAxiomSet<&'static str, &'static str> {
        GroupedAxiomSet::from_groups_unchecked(vec![group("K", &["a"]), group("K", &["b"])])
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "grouped axiom set holds duplicate keys")]
    fn add_asserts_on_duplicate_keys_in_debug() {
        duplicated().add(group("J", &["x"]));
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn add_merges_duplicate_keys_in_release() {
        let mut set = duplicated();
        assert!(set.add(group("J", &["x"])));
        assert!(set.is_consistent());
        assert_eq!(set.len(), 2);
        assert_eq!(set.lookup_values(&"K"), AxiomSet::from_values(["a", "b"]));
    }

    #[test]
    fn singleton_add_replaces_existing_values() {
        let mut set = GroupedAxiomSet::new();
        set.add(group("K", &["a"]));
        assert!(set.add(SemanticGroup::single("K", "b")));
        assert_eq!(set.len(), 1);
        let values = set.lookup_values(&"K");
        assert_eq!(values, AxiomSet::from_values(["b"]).with_singleton(true));
    }

    #[test]
    fn non_singleton_add_into_singleton_group_appends() {
        let mut set = GroupedAxiomSet::new();
        set.add(SemanticGroup::single("K", "a"));
        assert!(set.add(group("K", &["b"])));
        let values = set.lookup_values(&"K");
        assert!(values.same_values(&AxiomSet::from_values(["a", "b"])));
        assert!(!values.is_singleton());
    }

    #[test]
    fn repeated_add_reports_no_change() {
        let mut set = GroupedAxiomSet::new();
        set.add(SemanticGroup::single("K", "a"));
        assert!(!set.add(SemanticGroup::single("K", "a")));
        set.add(group("J", &["x", "y"]));
        assert!(!set.add(group("J", &["y"])));
    }

    #[test]
    fn empty_group_tracks_key() {
        let mut set: GroupedAxiomSet<&str, &str> = GroupedAxiomSet::new();
        assert!(set.add(SemanticGroup::new("K")));
        assert!(set.contains_key(&"K"));
        assert!(set.lookup_values(&"K").is_empty());
        assert!(!set.add(SemanticGroup::new("K")));
    }

    #[test]
    fn remove_key_drops_whole_group() {
        let mut set: GroupedAxiomSet<_, _> =
            [group("K", &["a", "b"]), group("K2", &["c"])].into_iter().collect();
        assert!(set.remove_key(&"K"));
        let expected: GroupedAxiomSet<_, _> = [group("K2", &["c"])].into_iter().collect();
        assert_eq!(set, expected);
        assert!(!set.remove_key(&"K"));
    }

    #[test]
    fn remove_group_requires_deep_equality() {
        let mut set: GroupedAxiomSet<_, _> = [group("K", &["a", "b"])].into_iter().collect();
        assert!(!set.remove(&group("K", &["a"])));
        assert!(set.remove(&group("K", &["b", "a"])));
        assert!(set.is_empty());
    }

    #[test]
    fn remove_group_compares_singleton_flag() {
        let mut set: GroupedAxiomSet<_, _> = [SemanticGroup::single("K", "a")].into_iter().collect();
        assert!(!set.remove(&group("K", &["a"])));
        assert!(set.remove(&SemanticGroup::single("K", "a")));
        assert!(set.is_empty());
    }

    #[test]
    fn lookup_on_missing_key_is_empty() {
        let set: GroupedAxiomSet<&str, &str> = GroupedAxiomSet::new();
        assert!(set.lookup_values(&"nope").is_empty());
        assert_eq!(set.lookup_single(&"nope"), None);
    }

    #[test]
    fn lookup_single_returns_value() {
        let mut set = GroupedAxiomSet::new();
        set.add(SemanticGroup::single("hasAge", 42));
        assert_eq!(set.lookup_single(&"hasAge"), Some(&42));
    }

    #[test]
    fn lookup_single_on_multi_valued_group_warns() {
        let set: GroupedAxiomSet<_, _> = [group("K", &["a", "b"])].into_iter().collect();
        let (value, logs) = capture_warnings(|| set.lookup_single(&"K").copied());
        assert!(matches!(value, Some("a" | "b")));
        assert!(logs.contains("single value requested from a non-singleton group"));
        assert!(logs.contains("count=2"));

        let set: GroupedAxiomSet<_, _> = [SemanticGroup::single("K", "a")].into_iter().collect();
        let (_, logs) = capture_warnings(|| set.lookup_single(&"K").copied());
        assert!(logs.is_empty());
    }

    #[test]
    fn equality_is_order_independent_and_deep() {
        let a: GroupedAxiomSet<_, _> =
            [group("K", &["a"]), group("J", &["b"])].into_iter().collect();
        let b: GroupedAxiomSet<_, _> =
            [group("J", &["b"]), group("K", &["a"])].into_iter().collect();
        assert_eq!(a, b);

        let c: GroupedAxiomSet<_, _> =
            [group("J", &["b"]), group("K", &["z"])].into_iter().collect();
        assert_ne!(a, c);
    }

    #[test]
    fn normalize_folds_duplicate_keys() {
        let mut set = GroupedAxiomSet {
            groups: vec![group("K", &["a"]), group("J", &["x"]), group("K", &["b"])],
            singleton: false,
        };
        assert!(!set.is_consistent());
        assert_eq!(set.normalize(), 1);
        assert!(set.is_consistent());
        assert_eq!(set.lookup_values(&"K"), AxiomSet::from_values(["a", "b"]));
    }

    #[test]
    fn pairs_flatten_groups() {
        let set: GroupedAxiomSet<_, _> =
            [group("K", &["a", "b"]), group("J", &[])].into_iter().collect();
        let mut pairs: Vec<_> = set.pairs().map(|(k, v)| (*k, *v)).collect();
        pairs.sort();
        assert_eq!(pairs, vec![("K", "a"), ("K", "b")]);
        assert_eq!(set.value_count(), 2);
    }
}
