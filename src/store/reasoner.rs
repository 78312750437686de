//! Forward-chaining closure over asserted axioms.
//!
//! The reasoner derives the facts an OWL reasoner would report for the
//! subset of the language [`MemoryStore`](super::MemoryStore) models:
//!
//! - sub-class and sub-property hierarchies are transitive, and equivalence
//!   implies mutual subsumption
//! - individuals inherit every super-class of their types
//! - symmetric facets (equivalence, disjointness, same-as, inverse) hold in
//!   both directions
//! - links propagate to super-properties, inverse properties produce the
//!   reverse link, and domain/range declarations type the linked individuals
//!
//! Rules are applied until no new fact appears.

use std::collections::{HashMap, HashSet, VecDeque};

use super::{Axiom, Facet};
use crate::value::{Entity, Value};

/// Stateless closure computer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reasoner;

/// Direct parent edges and their transitive closure for one hierarchy.
#[derive(Debug, Default)]
struct Hierarchy {
    parents_of: HashMap<Entity, Vec<Entity>>,
}

impl Hierarchy {
    fn link(&mut self, child: &Entity, parent: &Entity) {
        let parents = self.parents_of.entry(child.clone()).or_default();
        if !parents.contains(parent) {
            parents.push(parent.clone());
        }
    }

    /// Every entity reachable upward from `start`, excluding `start`.
    fn ancestors(&self, start: &Entity) -> Vec<Entity> {
        let mut found = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        visited.insert(start.clone());

        if let Some(parents) = self.parents_of.get(start) {
            for parent in parents {
                if visited.insert(parent.clone()) {
                    queue.push_back(parent.clone());
                }
            }
        }
        while let Some(current) = queue.pop_front() {
            if let Some(parents) = self.parents_of.get(&current) {
                for parent in parents {
                    if visited.insert(parent.clone()) {
                        queue.push_back(parent.clone());
                    }
                }
            }
            found.push(current);
        }
        found
    }
}

/// Indexes rebuilt on every round.
#[derive(Debug, Default)]
struct Indexes {
    classes: Hierarchy,
    properties: Hierarchy,
    inverses: HashMap<Entity, Vec<Entity>>,
    domains: HashMap<Entity, Vec<Entity>>,
    ranges: HashMap<Entity, Vec<Entity>>,
}

impl Indexes {
    fn build(facts: &HashSet<Axiom>) -> Self {
        let mut idx = Indexes::default();
        for fact in facts {
            let Some(object) = fact.value.as_entity() else {
                continue;
            };
            let subject = &fact.subject;
            match fact.facet {
                Facet::SuperClass => idx.classes.link(subject, object),
                Facet::EquivalentClass => {
                    idx.classes.link(subject, object);
                    idx.classes.link(object, subject);
                }
                Facet::SuperProperty => idx.properties.link(subject, object),
                Facet::EquivalentProperty => {
                    idx.properties.link(subject, object);
                    idx.properties.link(object, subject);
                }
                Facet::InverseProperty => {
                    idx.inverses.entry(subject.clone()).or_default().push(object.clone());
                    idx.inverses.entry(object.clone()).or_default().push(subject.clone());
                }
                Facet::Domain => idx.domains.entry(subject.clone()).or_default().push(object.clone()),
                Facet::Range => idx.ranges.entry(subject.clone()).or_default().push(object.clone()),
                _ => {}
            }
        }
        idx
    }
}

impl Reasoner {
    pub fn new() -> Self {
        Self
    }

    /// Facts entailed by `asserted` that are not themselves asserted.
    pub fn infer<'a>(&self, asserted: impl IntoIterator<Item = &'a Axiom>) -> HashSet<Axiom> {
        let asserted: HashSet<Axiom> = asserted.into_iter().cloned().collect();
        let mut facts = asserted.clone();
        let mut rounds = 0usize;

        loop {
            rounds += 1;
            let derived: Vec<Axiom> = derive(&facts)
                .into_iter()
                .filter(|a| !facts.contains(a))
                .collect();
            if derived.is_empty() {
                break;
            }
            facts.extend(derived);
        }

        let inferred: HashSet<Axiom> = facts.difference(&asserted).cloned().collect();
        tracing::debug!(
            asserted = asserted.len(),
            inferred = inferred.len(),
            rounds,
            "reasoner reached fixpoint"
        );
        inferred
    }
}

/// One round of every rule over `facts`.
fn derive(facts: &HashSet<Axiom>) -> Vec<Axiom> {
    let idx = Indexes::build(facts);
    let mut out = Vec::new();

    for class in idx.classes.parents_of.keys() {
        for ancestor in idx.classes.ancestors(class) {
            out.push(Axiom::new(class.clone(), Facet::SuperClass, ancestor));
        }
    }
    for property in idx.properties.parents_of.keys() {
        for ancestor in idx.properties.ancestors(property) {
            out.push(Axiom::new(property.clone(), Facet::SuperProperty, ancestor));
        }
    }

    for fact in facts {
        if fact.facet.is_symmetric() {
            if let Some(object) = fact.value.as_entity() {
                if object != &fact.subject {
                    out.push(Axiom::new(object.clone(), fact.facet, fact.subject.clone()));
                }
            }
            continue;
        }

        match (fact.facet, &fact.key) {
            (Facet::Type, None) => {
                if let Some(class) = fact.value.as_entity() {
                    for ancestor in idx.classes.ancestors(class) {
                        out.push(Axiom::new(fact.subject.clone(), Facet::Type, ancestor));
                    }
                }
            }
            (Facet::ObjectLink | Facet::DataLink, Some(property)) => {
                for ancestor in idx.properties.ancestors(property) {
                    out.push(Axiom::linked(
                        fact.subject.clone(),
                        fact.facet,
                        ancestor,
                        fact.value.clone(),
                    ));
                }
                for class in idx.domains.get(property).into_iter().flatten() {
                    out.push(Axiom::new(fact.subject.clone(), Facet::Type, class.clone()));
                }
                if fact.facet == Facet::ObjectLink {
                    if let Some(target) = fact.value.as_entity() {
                        for inverse in idx.inverses.get(property).into_iter().flatten() {
                            out.push(Axiom::linked(
                                target.clone(),
                                Facet::ObjectLink,
                                inverse.clone(),
                                Value::Entity(fact.subject.clone()),
                            ));
                        }
                        for class in idx.ranges.get(property).into_iter().flatten() {
                            out.push(Axiom::new(target.clone(), Facet::Type, class.clone()));
                        }
                    }
                }
            }
            _ => {}
        }
    }
    out
}
