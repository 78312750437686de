//! Per-facet caches and their read/write cycles.
//!
//! Each facet cache moves through `Unsynced -> Synced -> Dirty -> Synced`.
//! Local mutations make it dirty; a fully successful write or any
//! successful read makes it synced again. A read *replaces* the cache with
//! the freshly queried snapshot, it never aliases it.

use serde::{Deserialize, Serialize};

use crate::axiom::{AxiomSet, GroupedAxiomSet, SemanticGroup};
use crate::store::{Axiom, AxiomChange, Facet, KnowledgeStore};
use crate::sync::{ApplyOrder, IntoChanges, MappingIntent, Reconcile, apply_changes};
use crate::value::{Entity, Value};

/// Where a facet cache stands relative to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetState {
    /// Never read nor written.
    Unsynced,
    /// Equal to the last known store truth.
    Synced,
    /// Locally modified, or the last write partially failed.
    Dirty,
}

/// What a read did to one facet cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReadStatus {
    /// The store agreed with the cache.
    Unchanged,
    /// The cache was replaced; counts are values gained and lost.
    Updated { added: usize, removed: usize },
    /// The query failed; the cache was left untouched.
    Unavailable { reason: String },
}

fn resolve_order(own: Option<ApplyOrder>, facet: Facet, default: ApplyOrder) -> ApplyOrder {
    own.or(facet.preferred_order()).unwrap_or(default)
}

fn skipped(subject: &Entity, facet: Facet, error: &dyn std::fmt::Display) -> Vec<MappingIntent<Axiom>> {
    tracing::warn!(entity = %subject, facet = %facet, error = %error, "write skipped: query unavailable");
    vec![MappingIntent::skipped(format!("no target state: {error}"))]
}

fn submit<S: KnowledgeStore + ?Sized>(store: &S, changes: Vec<AxiomChange>) -> Vec<MappingIntent<Axiom>> {
    let mut sink = |change: &AxiomChange| store.apply(change);
    apply_changes(changes, &mut sink)
}

// ---------------------------------------------------------------------------
// Flat facet
// ---------------------------------------------------------------------------

/// Cached values of one ungrouped facet (types, super-classes, ...).
#[derive(Debug, Clone)]
pub struct FlatFacet {
    facet: Facet,
    cache: AxiomSet<Value>,
    state: FacetState,
    order: Option<ApplyOrder>,
}

impl FlatFacet {
    pub fn new(facet: Facet) -> Self {
        Self {
            facet,
            cache: AxiomSet::new(),
            state: FacetState::Unsynced,
            order: None,
        }
    }

    /// A facet expected to hold one canonical value.
    pub fn singleton(facet: Facet) -> Self {
        Self {
            cache: AxiomSet::singleton(),
            ..Self::new(facet)
        }
    }

    /// Override the submission order for this facet's writes.
    pub fn with_order(mut self, order: ApplyOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn facet(&self) -> Facet {
        self.facet
    }

    pub fn values(&self) -> &AxiomSet<Value> {
        &self.cache
    }

    pub fn state(&self) -> FacetState {
        self.state
    }

    pub fn add(&mut self, value: impl Into<Value>) -> bool {
        let changed = self.cache.add(value.into());
        self.touch(changed)
    }

    pub fn remove(&mut self, value: &Value) -> bool {
        let changed = self.cache.remove(value);
        self.touch(changed)
    }

    /// Drop every cached value; the next write retracts them all.
    pub fn clear(&mut self) {
        let changed = !self.cache.is_empty();
        self.cache.clear();
        self.touch(changed);
    }

    /// Mark the cache as holding one canonical value. Existing values stay.
    pub fn set_singleton(&mut self, singleton: bool) {
        self.cache.set_singleton(singleton);
    }

    /// The cached value, for facets holding one canonical value.
    pub fn single(&self) -> Option<&Value> {
        if !self.cache.is_singleton() {
            tracing::warn!(
                facet = %self.facet,
                count = self.cache.len(),
                "single value requested from a non-singleton facet"
            );
        }
        self.cache.first()
    }

    fn touch(&mut self, changed: bool) -> bool {
        if changed {
            self.state = FacetState::Dirty;
        }
        changed
    }

    /// Replace the cache with the store's view of `subject`.
    pub fn read<S: KnowledgeStore + ?Sized>(&mut self, subject: &Entity, store: &S) -> ReadStatus {
        let mut queried = match store.query_values(subject, self.facet) {
            Ok(queried) => queried,
            Err(e) => {
                tracing::warn!(entity = %subject, facet = %self.facet, error = %e, "read skipped: query unavailable");
                return ReadStatus::Unavailable {
                    reason: e.to_string(),
                };
            }
        };
        queried.adopt_singleton_flags(&self.cache);

        let status = match self.cache.synchronise_from(&queried) {
            Some(intent) => ReadStatus::Updated {
                added: intent.to_add().len(),
                removed: intent.to_remove().len(),
            },
            None => ReadStatus::Unchanged,
        };
        self.cache = queried;
        self.state = FacetState::Synced;
        status
    }

    /// Make the store's view of `subject` match the cache.
    ///
    /// Returns one record per attempted operation, nothing if the store
    /// already agreed, or a single skipped record if it could not be queried.
    pub fn write<S: KnowledgeStore + ?Sized>(
        &mut self,
        subject: &Entity,
        store: &S,
        default_order: ApplyOrder,
    ) -> Vec<MappingIntent<Axiom>> {
        let queried = match store.query_values(subject, self.facet) {
            Ok(queried) => queried,
            Err(e) => return skipped(subject, self.facet, &e),
        };
        let Some(intent) = self.cache.synchronise_to(&queried) else {
            self.state = FacetState::Synced;
            return Vec::new();
        };

        let order = resolve_order(self.order, self.facet, default_order);
        let facet = self.facet;
        let changes = intent
            .changes(order)
            .into_iter()
            .map(|change| change.map(|value| Axiom::new(subject.clone(), facet, value)))
            .collect();
        let trail = submit(store, changes);
        self.state = if trail.iter().any(MappingIntent::is_failure) {
            FacetState::Dirty
        } else {
            FacetState::Synced
        };
        trail
    }
}

// ---------------------------------------------------------------------------
// Grouped facet
// ---------------------------------------------------------------------------

/// Cached values of one grouped facet, keyed by property.
#[derive(Debug, Clone)]
pub struct GroupedFacet {
    facet: Facet,
    cache: GroupedAxiomSet<Entity, Value>,
    state: FacetState,
    order: Option<ApplyOrder>,
}

impl GroupedFacet {
    pub fn new(facet: Facet) -> Self {
        Self {
            facet,
            cache: GroupedAxiomSet::new(),
            state: FacetState::Unsynced,
            order: None,
        }
    }

    pub fn with_order(mut self, order: ApplyOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn facet(&self) -> Facet {
        self.facet
    }

    pub fn groups(&self) -> &GroupedAxiomSet<Entity, Value> {
        &self.cache
    }

    pub fn state(&self) -> FacetState {
        self.state
    }

    /// Link `value` under `key`. A singleton add replaces whatever the key
    /// held; a plain add appends.
    pub fn add_value(&mut self, key: Entity, value: impl Into<Value>, singleton: bool) -> bool {
        let group = if singleton {
            SemanticGroup::single(key, value.into())
        } else {
            SemanticGroup::with_values(key, [value.into()])
        };
        let changed = self.cache.add(group);
        self.touch(changed)
    }

    /// Declare interest in `key` before any value is known, so a later read
    /// fills it in. Does nothing if the key is already tracked.
    pub fn track_key(&mut self, key: Entity, singleton: bool) -> bool {
        if self.cache.contains_key(&key) {
            return false;
        }
        self.cache
            .add(SemanticGroup::with_set(key, AxiomSet::new().with_singleton(singleton)))
    }

    /// Unlink one value. The key stays tracked even if it becomes empty.
    pub fn remove_value(&mut self, key: &Entity, value: &Value) -> bool {
        let changed = self
            .cache
            .get_mut(key)
            .is_some_and(|group| group.values_mut().remove(value));
        self.touch(changed)
    }

    /// Stop tracking `key`; the next write retracts all its values.
    pub fn remove_key(&mut self, key: &Entity) -> bool {
        let changed = self.cache.remove_key(key);
        self.touch(changed)
    }

    /// Values under `key`; empty if the key is not tracked.
    pub fn values(&self, key: &Entity) -> AxiomSet<Value> {
        self.cache.lookup_values(key)
    }

    /// One value under `key`, for single-valued properties.
    pub fn single(&self, key: &Entity) -> Option<&Value> {
        self.cache.lookup_single(key)
    }

    fn touch(&mut self, changed: bool) -> bool {
        if changed {
            self.state = FacetState::Dirty;
        }
        changed
    }

    /// Replace the cache with the store's view of `subject`.
    ///
    /// Tracked keys with no values that the store knows nothing about are
    /// carried over, so declared interest survives the read.
    pub fn read<S: KnowledgeStore + ?Sized>(&mut self, subject: &Entity, store: &S) -> ReadStatus {
        let mut queried = match store.query_groups(subject, self.facet, None) {
            Ok(queried) => queried,
            Err(e) => {
                tracing::warn!(entity = %subject, facet = %self.facet, error = %e, "read skipped: query unavailable");
                return ReadStatus::Unavailable {
                    reason: e.to_string(),
                };
            }
        };
        queried.adopt_singleton_flags(&self.cache);

        let status = match self.cache.synchronise_from(&queried) {
            Some(intent) => ReadStatus::Updated {
                added: intent.to_add().value_count(),
                removed: intent.to_remove().value_count(),
            },
            None => ReadStatus::Unchanged,
        };
        for group in self.cache.iter() {
            if group.values().is_empty() && !queried.contains_key(group.key()) {
                queried.add(group.clone());
            }
        }
        self.cache = queried;
        self.state = FacetState::Synced;
        status
    }

    /// Make the store's view of `subject` match the cache, one operation
    /// per (property, value) pair.
    pub fn write<S: KnowledgeStore + ?Sized>(
        &mut self,
        subject: &Entity,
        store: &S,
        default_order: ApplyOrder,
    ) -> Vec<MappingIntent<Axiom>> {
        let queried = match store.query_groups(subject, self.facet, None) {
            Ok(queried) => queried,
            Err(e) => return skipped(subject, self.facet, &e),
        };
        let Some(intent) = self.cache.synchronise_to(&queried) else {
            self.state = FacetState::Synced;
            return Vec::new();
        };

        let order = resolve_order(self.order, self.facet, default_order);
        let facet = self.facet;
        let changes = intent
            .changes(order)
            .into_iter()
            .map(|change| {
                change.map(|link| Axiom::linked(subject.clone(), facet, link.key, link.value))
            })
            .collect();
        let trail = submit(store, changes);
        self.state = if trail.iter().any(MappingIntent::is_failure) {
            FacetState::Dirty
        } else {
            FacetState::Synced
        };
        trail
    }
}
