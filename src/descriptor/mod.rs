//! Entity descriptors: one cached facet per tracked kind of axiom.
//!
//! A [`Descriptor`] describes one named entity (a class, an individual or a
//! property) through the facets it chose to track. Reading replaces every
//! facet cache with the store's snapshot; writing pushes every facet cache
//! to the store and returns the audit trail.

pub mod facet;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::SyncConfig;
use crate::store::{Axiom, Facet, KnowledgeStore};
use crate::sync::MappingIntent;
use crate::value::{Entity, Value};

pub use facet::{FacetState, FlatFacet, GroupedFacet, ReadStatus};

/// A tracked facet: flat or grouped, depending on the facet kind.
#[derive(Debug, Clone)]
pub enum FacetSlot {
    Flat(FlatFacet),
    Grouped(GroupedFacet),
}

impl FacetSlot {
    pub fn state(&self) -> FacetState {
        match self {
            FacetSlot::Flat(f) => f.state(),
            FacetSlot::Grouped(g) => g.state(),
        }
    }

    fn read<S: KnowledgeStore + ?Sized>(&mut self, subject: &Entity, store: &S) -> ReadStatus {
        match self {
            FacetSlot::Flat(f) => f.read(subject, store),
            FacetSlot::Grouped(g) => g.read(subject, store),
        }
    }

    fn write<S: KnowledgeStore + ?Sized>(
        &mut self,
        subject: &Entity,
        store: &S,
        config: &SyncConfig,
    ) -> Vec<MappingIntent<Axiom>> {
        match self {
            FacetSlot::Flat(f) => f.write(subject, store, config.default_order),
            FacetSlot::Grouped(g) => g.write(subject, store, config.default_order),
        }
    }

    /// Every named entity the facet currently refers to.
    fn entities(&self) -> Vec<&Entity> {
        match self {
            FacetSlot::Flat(f) => f.values().iter().filter_map(Value::as_entity).collect(),
            FacetSlot::Grouped(g) => g
                .groups()
                .pairs()
                .filter_map(|(_, value)| value.as_entity())
                .collect(),
        }
    }
}

/// Outcome of reading one facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadReport {
    pub facet: Facet,
    pub status: ReadStatus,
}

/// Outcome of [`Descriptor::write_inconsistency_safe`].
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Every write record, facet by facet.
    pub writes: Vec<MappingIntent<Axiom>>,
    /// Whether the store reasoned between writing and reading.
    pub reasoned: bool,
    pub reads: Vec<ReadReport>,
}

impl SyncReport {
    pub fn has_failures(&self) -> bool {
        self.writes.iter().any(MappingIntent::is_failure)
    }
}

/// The cached axioms of one entity, one slot per tracked facet.
#[derive(Debug, Clone)]
pub struct Descriptor {
    subject: Entity,
    facets: BTreeMap<Facet, FacetSlot>,
}

impl Descriptor {
    pub fn new(subject: Entity) -> Self {
        Self {
            subject,
            facets: BTreeMap::new(),
        }
    }

    /// Track `facet` with an empty cache.
    pub fn with_facet(mut self, facet: Facet) -> Self {
        let slot = if facet.is_grouped() {
            FacetSlot::Grouped(GroupedFacet::new(facet))
        } else {
            FacetSlot::Flat(FlatFacet::new(facet))
        };
        self.facets.insert(facet, slot);
        self
    }

    /// Track an ungrouped `facet` expected to hold one canonical value.
    /// Grouped facets are tracked normally; their single-valued keys are
    /// declared with [`GroupedFacet::track_key`].
    pub fn with_singleton_facet(mut self, facet: Facet) -> Self {
        if facet.is_grouped() {
            return self.with_facet(facet);
        }
        self.facets
            .insert(facet, FacetSlot::Flat(FlatFacet::singleton(facet)));
        self
    }

    /// Track a preconfigured slot.
    pub fn with_slot(mut self, slot: FacetSlot) -> Self {
        let facet = match &slot {
            FacetSlot::Flat(f) => f.facet(),
            FacetSlot::Grouped(g) => g.facet(),
        };
        self.facets.insert(facet, slot);
        self
    }

    pub fn subject(&self) -> &Entity {
        &self.subject
    }

    /// Tracked facets, in facet order.
    pub fn facets(&self) -> impl Iterator<Item = Facet> + '_ {
        self.facets.keys().copied()
    }

    pub fn flat(&self, facet: Facet) -> Option<&FlatFacet> {
        match self.facets.get(&facet)? {
            FacetSlot::Flat(f) => Some(f),
            FacetSlot::Grouped(_) => None,
        }
    }

    pub fn flat_mut(&mut self, facet: Facet) -> Option<&mut FlatFacet> {
        match self.facets.get_mut(&facet)? {
            FacetSlot::Flat(f) => Some(f),
            FacetSlot::Grouped(_) => None,
        }
    }

    pub fn grouped(&self, facet: Facet) -> Option<&GroupedFacet> {
        match self.facets.get(&facet)? {
            FacetSlot::Grouped(g) => Some(g),
            FacetSlot::Flat(_) => None,
        }
    }

    pub fn grouped_mut(&mut self, facet: Facet) -> Option<&mut GroupedFacet> {
        match self.facets.get_mut(&facet)? {
            FacetSlot::Grouped(g) => Some(g),
            FacetSlot::Flat(_) => None,
        }
    }

    pub fn state(&self, facet: Facet) -> Option<FacetState> {
        self.facets.get(&facet).map(FacetSlot::state)
    }

    /// Whether any facet holds local changes not yet in the store.
    pub fn is_dirty(&self) -> bool {
        self.facets
            .values()
            .any(|slot| slot.state() == FacetState::Dirty)
    }

    /// Replace every facet cache with the store's snapshot.
    ///
    /// A facet whose query fails keeps its cache; the others still read.
    pub fn read<S: KnowledgeStore + ?Sized>(&mut self, store: &S) -> Vec<ReadReport> {
        let subject = &self.subject;
        let reports: Vec<ReadReport> = self
            .facets
            .iter_mut()
            .map(|(facet, slot)| ReadReport {
                facet: *facet,
                status: slot.read(subject, store),
            })
            .collect();
        tracing::debug!(entity = %subject, facets = reports.len(), "descriptor read");
        reports
    }

    /// Push every facet cache to the store. Records are concatenated in
    /// facet order.
    pub fn write<S: KnowledgeStore + ?Sized>(
        &mut self,
        store: &S,
        config: &SyncConfig,
    ) -> Vec<MappingIntent<Axiom>> {
        let subject = &self.subject;
        let trail: Vec<MappingIntent<Axiom>> = self
            .facets
            .values_mut()
            .flat_map(|slot| slot.write(subject, store, config))
            .collect();
        tracing::debug!(entity = %subject, records = trail.len(), "descriptor written");
        trail
    }

    /// Write, optionally reason, then read back every facet.
    ///
    /// Reading after the write replaces the caches with what the store
    /// actually holds, including facts the reasoner inferred and without
    /// changes that failed.
    pub fn write_inconsistency_safe<S: KnowledgeStore + ?Sized>(
        &mut self,
        store: &S,
        config: &SyncConfig,
    ) -> SyncReport {
        let writes = self.write(store, config);
        let reasoned = config.reason_after_write
            && match store.reason() {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(entity = %self.subject, error = %e, "reasoning after write failed");
                    false
                }
            };
        let reads = self.read(store);
        SyncReport {
            writes,
            reasoned,
            reads,
        }
    }

    /// Build a peer for every named entity `facet` refers to (super-classes,
    /// linked individuals, ...), in entity order.
    pub fn build_peers<D>(&self, facet: Facet, factory: impl FnMut(&Entity) -> D) -> Vec<D> {
        let Some(slot) = self.facets.get(&facet) else {
            return Vec::new();
        };
        let mut entities = slot.entities();
        entities.sort();
        entities.dedup();
        entities.into_iter().map(factory).collect()
    }
}
