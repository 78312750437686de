//! The reconciler: minimal add/remove deltas between axiom snapshots.
//!
//! Reconciliation is a pure function of two snapshots. `current` is what we
//! believe, `target` is what should become true. The result is `None` when
//! nothing differs, so callers can tell "nothing to do" apart from an empty
//! batch and skip the store entirely.
//!
//! Direction matters only for who plays `target`:
//!
//! - **read** ([`Reconcile::synchronise_from`]): the cache is current, the
//!   freshly queried store snapshot is target.
//! - **write** ([`Reconcile::synchronise_to`]): the store snapshot is
//!   current, the cache is target.

pub mod apply;
pub mod intent;

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use crate::axiom::{AxiomSet, GroupedAxiomSet};

pub use apply::{
    ApplyEffect, ApplyOrder, Change, ChangeKind, ChangeSink, IntoChanges, Link, MappingIntent,
    Outcome, apply_changes, apply_intent,
};
pub use intent::{GroupedIntent, SynchronisationIntent};

/// Something that can be diffed against another snapshot of itself.
pub trait Reconcile {
    type Intent;

    /// The delta turning `self` (current) into `target`, or `None` if the
    /// two hold the same values.
    fn reconcile(&self, target: &Self) -> Option<Self::Intent>;

    /// Copy the singleton flags of `cached` onto `self`, a fresh query
    /// result. Stores know nothing about singleton-ness, so a read would
    /// otherwise lose it.
    fn adopt_singleton_flags(&mut self, cached: &Self);

    /// Write direction: make the store (`queried`) look like `self`.
    fn synchronise_to(&self, queried: &Self) -> Option<Self::Intent> {
        queried.reconcile(self)
    }

    /// Read direction: make `self` look like the store (`queried`).
    fn synchronise_from(&self, queried: &Self) -> Option<Self::Intent> {
        self.reconcile(queried)
    }
}

/// Compute the intent that turns `current` into `target`.
pub fn compute_intent<S: Reconcile>(current: &S, target: &S) -> Option<S::Intent> {
    current.reconcile(target)
}

fn diff_values<V: Eq + Hash + Clone>(
    current: &HashSet<V>,
    target: &HashSet<V>,
) -> SynchronisationIntent<V> {
    let to_add = target.difference(current).cloned().collect();
    let to_remove = current.difference(target).cloned().collect();
    let unchanged = target.intersection(current).cloned().collect();
    SynchronisationIntent::from_parts(to_add, to_remove, unchanged)
}

fn warn_on_overflow<V>(set: &AxiomSet<V>, side: &'static str, key: Option<&dyn fmt::Debug>) {
    if set.overflows_singleton() {
        tracing::warn!(
            side,
            key = ?key,
            count = set.len(),
            "singleton axiom set holds more than one value"
        );
    }
}

impl<V: Eq + Hash + Clone> Reconcile for AxiomSet<V> {
    type Intent = SynchronisationIntent<V>;

    fn reconcile(&self, target: &Self) -> Option<Self::Intent> {
        warn_on_overflow(self, "current", None);
        warn_on_overflow(target, "target", None);

        let intent = diff_values(self.as_set(), target.as_set());
        tracing::debug!(
            to_add = intent.to_add().len(),
            to_remove = intent.to_remove().len(),
            unchanged = intent.unchanged().len(),
            "computed synchronisation intent"
        );
        (!intent.is_empty()).then_some(intent)
    }

    fn adopt_singleton_flags(&mut self, cached: &Self) {
        self.set_singleton(cached.is_singleton());
    }
}

impl<K, V> Reconcile for GroupedAxiomSet<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Eq + Hash + Clone,
{
    type Intent = GroupedIntent<K, V>;

    fn reconcile(&self, target: &Self) -> Option<Self::Intent> {
        if !(self.is_consistent() && target.is_consistent()) {
            tracing::debug!("grouped axiom set holds duplicate keys; merging before diff");
            let (mut current, mut wanted) = (self.clone(), target.clone());
            current.normalize();
            wanted.normalize();
            return current.reconcile(&wanted);
        }

        let empty = HashSet::new();
        let mut intent = GroupedIntent::new();

        let keys = self
            .keys()
            .chain(target.keys().filter(|k| !self.contains_key(k)));
        for key in keys {
            let current = self.get(key).map(|g| g.values());
            let wanted = target.get(key).map(|g| g.values());
            for (side, set) in [("current", current), ("target", wanted)] {
                if let Some(set) = set {
                    warn_on_overflow(set, side, Some(key as &dyn fmt::Debug));
                }
            }
            let delta = diff_values(
                current.map_or(&empty, |s| s.as_set()),
                wanted.map_or(&empty, |s| s.as_set()),
            );
            intent.record(key.clone(), delta);
        }

        tracing::debug!(
            keys = self.len().max(target.len()),
            to_add = intent.to_add().value_count(),
            to_remove = intent.to_remove().value_count(),
            "computed grouped synchronisation intent"
        );
        (!intent.is_empty()).then_some(intent)
    }

    fn adopt_singleton_flags(&mut self, cached: &Self) {
        self.set_singleton(cached.is_singleton());
        for group in cached.iter() {
            if let Some(fresh) = self.get_mut(group.key()) {
                fresh.values_mut().set_singleton(group.values().is_singleton());
            }
        }
    }
}
