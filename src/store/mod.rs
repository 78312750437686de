//! The knowledge store boundary.
//!
//! A [`KnowledgeStore`] answers complete, deduplicated snapshot queries about
//! one entity and facet, and accepts atomic, idempotent add/remove
//! operations. [`MemoryStore`] is the bundled in-memory implementation with
//! a small closure-based reasoner.

pub mod mem;
pub mod reasoner;

use serde::{Deserialize, Serialize};

use crate::axiom::{AxiomSet, GroupedAxiomSet};
use crate::error::{QueryError, StoreError};
use crate::sync::{ApplyEffect, ApplyOrder, Change};
use crate::value::{Entity, Value};

pub use mem::MemoryStore;
pub use reasoner::Reasoner;

/// A semantic facet of an entity: which kind of axiom a cached set holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    /// Classes an individual belongs to.
    Type,
    /// Individuals of a class.
    Instance,
    SuperClass,
    SubClass,
    EquivalentClass,
    DisjointClass,
    /// Restrictions defining a class.
    Definition,
    SameIndividual,
    DisjointIndividual,
    SuperProperty,
    SubProperty,
    EquivalentProperty,
    DisjointProperty,
    InverseProperty,
    Domain,
    Range,
    /// Individuals linked through object properties, grouped by property.
    ObjectLink,
    /// Literals linked through data properties, grouped by property.
    DataLink,
}

impl Facet {
    /// Every facet, in declaration order.
    pub const ALL: [Facet; 18] = [
        Facet::Type,
        Facet::Instance,
        Facet::SuperClass,
        Facet::SubClass,
        Facet::EquivalentClass,
        Facet::DisjointClass,
        Facet::Definition,
        Facet::SameIndividual,
        Facet::DisjointIndividual,
        Facet::SuperProperty,
        Facet::SubProperty,
        Facet::EquivalentProperty,
        Facet::DisjointProperty,
        Facet::InverseProperty,
        Facet::Domain,
        Facet::Range,
        Facet::ObjectLink,
        Facet::DataLink,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Facet::Type => "type",
            Facet::Instance => "instance",
            Facet::SuperClass => "super_class",
            Facet::SubClass => "sub_class",
            Facet::EquivalentClass => "equivalent_class",
            Facet::DisjointClass => "disjoint_class",
            Facet::Definition => "definition",
            Facet::SameIndividual => "same_individual",
            Facet::DisjointIndividual => "disjoint_individual",
            Facet::SuperProperty => "super_property",
            Facet::SubProperty => "sub_property",
            Facet::EquivalentProperty => "equivalent_property",
            Facet::DisjointProperty => "disjoint_property",
            Facet::InverseProperty => "inverse_property",
            Facet::Domain => "domain",
            Facet::Range => "range",
            Facet::ObjectLink => "object_link",
            Facet::DataLink => "data_link",
        }
    }

    /// Whether values of this facet live under a semantic key.
    pub fn is_grouped(self) -> bool {
        matches!(self, Facet::ObjectLink | Facet::DataLink)
    }

    /// Whether `a facet b` implies `b facet a`.
    pub fn is_symmetric(self) -> bool {
        matches!(
            self,
            Facet::EquivalentClass
                | Facet::DisjointClass
                | Facet::SameIndividual
                | Facet::DisjointIndividual
                | Facet::EquivalentProperty
                | Facet::DisjointProperty
                | Facet::InverseProperty
        )
    }

    /// The facet this one is stored as, and whether subject and value swap.
    ///
    /// `C instance x` is stored as `x type C`, and sub-class/sub-property
    /// axioms as their super-facet counterparts.
    pub fn canonical(self) -> (Facet, bool) {
        match self {
            Facet::Instance => (Facet::Type, true),
            Facet::SubClass => (Facet::SuperClass, true),
            Facet::SubProperty => (Facet::SuperProperty, true),
            other => (other, false),
        }
    }

    /// Order this facet dictates for its writes, if any.
    ///
    /// Definition, super-class and super-property facets replace a single
    /// logical slot, so the old value is retracted before the new one is
    /// asserted.
    pub fn preferred_order(self) -> Option<ApplyOrder> {
        match self {
            Facet::Definition | Facet::SuperClass | Facet::SuperProperty => {
                Some(ApplyOrder::RemoveFirst)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for Facet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One fact: `subject facet [key] value`.
///
/// `key` is set exactly when the facet is grouped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Axiom {
    pub subject: Entity,
    pub facet: Facet,
    pub key: Option<Entity>,
    pub value: Value,
}

impl Axiom {
    /// A fact of an ungrouped facet.
    pub fn new(subject: Entity, facet: Facet, value: impl Into<Value>) -> Self {
        Self {
            subject,
            facet,
            key: None,
            value: value.into(),
        }
    }

    /// A fact of a grouped facet, linked under `key`.
    pub fn linked(subject: Entity, facet: Facet, key: Entity, value: impl Into<Value>) -> Self {
        Self {
            subject,
            facet,
            key: Some(key),
            value: value.into(),
        }
    }
}

impl std::fmt::Display for Axiom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{} {} {} {}", self.subject, self.facet, key, self.value),
            None => write!(f, "{} {} {}", self.subject, self.facet, self.value),
        }
    }
}

/// An atomic add or remove of one [`Axiom`].
pub type AxiomChange = Change<Axiom>;

/// External oracle holding ground truth, possibly with inferred facts.
pub trait KnowledgeStore {
    /// Complete snapshot of an ungrouped facet of `subject`. No facts is an
    /// empty set, not an error.
    fn query_values(&self, subject: &Entity, facet: Facet) -> Result<AxiomSet<Value>, QueryError>;

    /// Complete snapshot of a grouped facet of `subject`, optionally
    /// restricted to one key.
    fn query_groups(
        &self,
        subject: &Entity,
        facet: Facet,
        key: Option<&Entity>,
    ) -> Result<GroupedAxiomSet<Entity, Value>, QueryError>;

    /// Apply one atomic change. Re-applying a change that already holds
    /// succeeds with [`ApplyEffect::NoOp`].
    fn apply(&self, change: &AxiomChange) -> Result<ApplyEffect, StoreError>;

    /// Bring inferred facts up to date. Stores without a reasoner do nothing.
    fn reason(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
