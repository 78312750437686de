//! In-memory knowledge store backed by DashMap.
//!
//! Asserted facts are kept per canonical subject. Inferred facts are the
//! closure computed by the last [`KnowledgeStore::reason`] call (or after
//! every applied change when built with [`MemoryStore::with_auto_reason`]).
//! Queries see both. All data is lost on drop.

use std::collections::HashSet;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;

use super::{Axiom, AxiomChange, Facet, KnowledgeStore, Reasoner};
use crate::axiom::{AxiomSet, GroupedAxiomSet, SemanticGroup};
use crate::error::{QueryError, StoreError};
use crate::sync::{ApplyEffect, ChangeKind};
use crate::value::{Entity, Value};

/// Concurrent in-memory store with a closure-based reasoner.
#[derive(Debug, Default)]
pub struct MemoryStore {
    asserted: DashMap<Entity, HashSet<Axiom>>,
    inferred: DashMap<Entity, HashSet<Axiom>>,
    reasoner: Reasoner,
    auto_reason: bool,
    /// Canonical axioms whose changes are refused, with the refusal reason.
    failing: DashMap<Axiom, String>,
    unavailable: AtomicBool,
    history: RwLock<Vec<AxiomChange>>,
}

impl MemoryStore {
    /// Create an empty store that only reasons when asked.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute inferred facts after every applied change.
    pub fn with_auto_reason(mut self) -> Self {
        self.auto_reason = true;
        self
    }

    /// Assert `axiom` through [`KnowledgeStore::apply`].
    pub fn assert(&self, axiom: Axiom) -> Result<ApplyEffect, StoreError> {
        self.apply(&AxiomChange::add(axiom))
    }

    /// Refuse every future change touching `axiom`.
    pub fn fail_on(&self, axiom: Axiom, reason: impl Into<String>) -> Result<(), StoreError> {
        let canonical = canonicalize(axiom)?;
        self.failing.insert(canonical, reason.into());
        Ok(())
    }

    /// Make every query and change fail until [`MemoryStore::make_available`].
    pub fn make_unavailable(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }

    pub fn make_available(&self) {
        self.unavailable.store(false, Ordering::SeqCst);
    }

    /// Changes that actually modified the store, in application order.
    pub fn history(&self) -> Vec<AxiomChange> {
        self.history.read().expect("history lock poisoned").clone()
    }

    /// Whether `axiom` holds, asserted or inferred. A symmetric fact also
    /// holds when only its mirror was stated.
    pub fn contains(&self, axiom: &Axiom) -> bool {
        let Ok(canonical) = canonicalize(axiom.clone()) else {
            return false;
        };
        let holds = |fact: &Axiom| {
            [&self.asserted, &self.inferred].into_iter().any(|map| {
                map.get(&fact.subject)
                    .is_some_and(|facts| facts.contains(fact))
            })
        };
        holds(&canonical) || (canonical.facet.is_symmetric() && holds(&mirror(&canonical)))
    }

    pub fn is_asserted(&self, axiom: &Axiom) -> bool {
        canonicalize(axiom.clone()).is_ok_and(|canonical| {
            self.asserted
                .get(&canonical.subject)
                .is_some_and(|facts| facts.contains(&canonical))
        })
    }

    /// Number of asserted facts.
    pub fn asserted_count(&self) -> usize {
        self.asserted.iter().map(|entry| entry.value().len()).sum()
    }

    /// Number of facts the last reasoning pass added.
    pub fn inferred_count(&self) -> usize {
        self.inferred.iter().map(|entry| entry.value().len()).sum()
    }

    fn check_available(&self, subject: &Entity, facet: Facet) -> Result<(), QueryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(QueryError::Unavailable {
                entity: subject.to_string(),
                facet: facet.to_string(),
                message: "store is unavailable".into(),
            });
        }
        Ok(())
    }

    /// Every asserted or inferred fact with the given canonical facet.
    fn facts_with(&self, facet: Facet, mut visit: impl FnMut(&Axiom)) {
        for map in [&self.asserted, &self.inferred] {
            for entry in map.iter() {
                for fact in entry.value().iter().filter(|a| a.facet == facet) {
                    visit(fact);
                }
            }
        }
    }

    /// Facts about `subject` with the given canonical facet.
    fn facts_about(&self, subject: &Entity, facet: Facet, mut visit: impl FnMut(&Axiom)) {
        for map in [&self.asserted, &self.inferred] {
            if let Some(facts) = map.get(subject) {
                for fact in facts.iter().filter(|a| a.facet == facet) {
                    visit(fact);
                }
            }
        }
    }

    fn insert(&self, axiom: Axiom) -> bool {
        if axiom.facet.is_symmetric() && self.is_asserted(&mirror(&axiom)) {
            return false;
        }
        self.asserted
            .entry(axiom.subject.clone())
            .or_default()
            .insert(axiom)
    }

    fn retract(&self, axiom: &Axiom) -> bool {
        let mut removed = self.retract_exact(axiom);
        if axiom.facet.is_symmetric() {
            removed |= self.retract_exact(&mirror(axiom));
        }
        removed
    }

    fn retract_exact(&self, axiom: &Axiom) -> bool {
        match self.asserted.get_mut(&axiom.subject) {
            Some(mut facts) => facts.remove(axiom),
            None => false,
        }
    }

    fn record(&self, change: AxiomChange) {
        self.history
            .write()
            .expect("history lock poisoned")
            .push(change);
    }
}

impl KnowledgeStore for MemoryStore {
    fn query_values(&self, subject: &Entity, facet: Facet) -> Result<AxiomSet<Value>, QueryError> {
        self.check_available(subject, facet)?;
        if facet.is_grouped() {
            return Err(QueryError::WrongShape {
                facet: facet.to_string(),
                shape: "flat set".into(),
            });
        }

        let (canonical, swapped) = facet.canonical();
        let pointing_at = Value::Entity(subject.clone());
        let mut values = AxiomSet::new();

        if !swapped {
            self.facts_about(subject, canonical, |fact| {
                values.add(fact.value.clone());
            });
        }
        if swapped || canonical.is_symmetric() {
            self.facts_with(canonical, |fact| {
                if fact.value == pointing_at && &fact.subject != subject {
                    values.add(Value::Entity(fact.subject.clone()));
                }
            });
        }

        tracing::trace!(entity = %subject, facet = %facet, count = values.len(), "queried values");
        Ok(values)
    }

    fn query_groups(
        &self,
        subject: &Entity,
        facet: Facet,
        key: Option<&Entity>,
    ) -> Result<GroupedAxiomSet<Entity, Value>, QueryError> {
        self.check_available(subject, facet)?;
        if !facet.is_grouped() {
            return Err(QueryError::WrongShape {
                facet: facet.to_string(),
                shape: "grouped set".into(),
            });
        }

        let mut groups = GroupedAxiomSet::new();
        self.facts_about(subject, facet, |fact| {
            let Some(fact_key) = &fact.key else {
                return;
            };
            if key.is_some_and(|k| k != fact_key) {
                return;
            }
            groups.add(SemanticGroup::with_values(
                fact_key.clone(),
                [fact.value.clone()],
            ));
        });

        tracing::trace!(entity = %subject, facet = %facet, keys = groups.len(), "queried groups");
        Ok(groups)
    }

    fn apply(&self, change: &AxiomChange) -> Result<ApplyEffect, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::OperationFailed {
                change: change.to_string(),
                reason: "store is unavailable".into(),
            });
        }
        let canonical = canonicalize(change.value.clone())?;
        if let Some(reason) = self.failing.get(&canonical) {
            return Err(StoreError::OperationFailed {
                change: change.to_string(),
                reason: reason.value().clone(),
            });
        }

        let changed = match change.kind {
            ChangeKind::Add => self.insert(canonical),
            ChangeKind::Remove => self.retract(&canonical),
        };
        if !changed {
            return Ok(ApplyEffect::NoOp);
        }

        self.record(change.clone());
        if self.auto_reason {
            self.reason()?;
        }
        Ok(ApplyEffect::Applied)
    }

    fn reason(&self) -> Result<(), StoreError> {
        let asserted: Vec<Axiom> = self
            .asserted
            .iter()
            .flat_map(|entry| entry.value().iter().cloned().collect::<Vec<_>>())
            .collect();
        let inferred = self.reasoner.infer(&asserted);

        self.inferred.clear();
        for fact in inferred {
            self.inferred
                .entry(fact.subject.clone())
                .or_default()
                .insert(fact);
        }
        tracing::debug!(
            asserted = asserted.len(),
            inferred = self.inferred_count(),
            "reasoner synchronised"
        );
        Ok(())
    }
}

/// `b facet a` for a symmetric `a facet b`.
fn mirror(axiom: &Axiom) -> Axiom {
    match axiom.value.as_entity() {
        Some(object) => Axiom::new(object.clone(), axiom.facet, axiom.subject.clone()),
        None => axiom.clone(),
    }
}

/// Rewrite `axiom` into its stored form, rejecting shapes the store cannot
/// hold.
fn canonicalize(axiom: Axiom) -> Result<Axiom, StoreError> {
    if axiom.facet.is_grouped() != axiom.key.is_some() {
        return Err(StoreError::Rejected {
            reason: format!("{axiom}: grouped facets need a key, other facets must not have one"),
        });
    }
    match (axiom.facet, &axiom.value) {
        (Facet::ObjectLink, Value::Entity(_)) | (Facet::DataLink, Value::Literal(_)) => {}
        (Facet::ObjectLink, _) => {
            return Err(StoreError::Rejected {
                reason: format!("{axiom}: object links must target a named individual"),
            });
        }
        (Facet::DataLink, _) => {
            return Err(StoreError::Rejected {
                reason: format!("{axiom}: data links must target a literal"),
            });
        }
        _ => {}
    }

    let (facet, swapped) = axiom.facet.canonical();
    if !swapped {
        return Ok(axiom);
    }
    match axiom.value {
        Value::Entity(object) => Ok(Axiom::new(object, facet, axiom.subject)),
        other => Err(StoreError::Rejected {
            reason: format!(
                "{} {} {other}: the value must be a named entity",
                axiom.subject, axiom.facet
            ),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Literal;

    fn e(name: &str) -> Entity {
        Entity::named(name)
    }

    fn values(names: &[&str]) -> AxiomSet<Value> {
        names.iter().map(|n| Value::named(*n)).collect()
    }

    #[test]
    fn add_then_query() {
        let store = MemoryStore::new();
        store.assert(Axiom::new(e("k1"), Facet::Type, e("Kitchen"))).unwrap();
        let types = store.query_values(&e("k1"), Facet::Type).unwrap();
        assert_eq!(types, values(&["Kitchen"]));
    }

    #[test]
    fn apply_is_idempotent() {
        let store = MemoryStore::new();
        let axiom = Axiom::new(e("k1"), Facet::Type, e("Kitchen"));
        assert_eq!(store.assert(axiom.clone()).unwrap(), ApplyEffect::Applied);
        assert_eq!(store.assert(axiom.clone()).unwrap(), ApplyEffect::NoOp);
        let remove = AxiomChange::remove(axiom);
        assert_eq!(store.apply(&remove).unwrap(), ApplyEffect::Applied);
        assert_eq!(store.apply(&remove).unwrap(), ApplyEffect::NoOp);
        assert_eq!(store.history().len(), 2);
    }

    #[test]
    fn inverse_facets_share_storage() {
        let store = MemoryStore::new();
        store.assert(Axiom::new(e("Kitchen"), Facet::Instance, e("k1"))).unwrap();
        assert!(store.is_asserted(&Axiom::new(e("k1"), Facet::Type, e("Kitchen"))));
        assert_eq!(store.query_values(&e("k1"), Facet::Type).unwrap(), values(&["Kitchen"]));
        assert_eq!(store.query_values(&e("Kitchen"), Facet::Instance).unwrap(), values(&["k1"]));
        assert_eq!(
            store.assert(Axiom::new(e("k1"), Facet::Type, e("Kitchen"))).unwrap(),
            ApplyEffect::NoOp
        );
    }

    #[test]
    fn symmetric_facets_answer_both_directions() {
        let store = MemoryStore::new();
        store.assert(Axiom::new(e("A"), Facet::DisjointClass, e("B"))).unwrap();
        assert_eq!(store.query_values(&e("B"), Facet::DisjointClass).unwrap(), values(&["A"]));
        assert_eq!(
            store.assert(Axiom::new(e("B"), Facet::DisjointClass, e("A"))).unwrap(),
            ApplyEffect::NoOp
        );
        let remove = AxiomChange::remove(Axiom::new(e("B"), Facet::DisjointClass, e("A")));
        assert_eq!(store.apply(&remove).unwrap(), ApplyEffect::Applied);
        assert!(store.query_values(&e("A"), Facet::DisjointClass).unwrap().is_empty());
    }

    #[test]
    fn symmetric_mirror_is_contained_before_reasoning() {
        let store = MemoryStore::new();
        store.assert(Axiom::new(e("A"), Facet::SameIndividual, e("B"))).unwrap();
        assert_eq!(store.inferred_count(), 0);
        assert!(store.contains(&Axiom::new(e("B"), Facet::SameIndividual, e("A"))));
        assert!(store.contains(&Axiom::new(e("A"), Facet::SameIndividual, e("B"))));
        assert!(!store.contains(&Axiom::new(e("B"), Facet::SameIndividual, e("C"))));
        assert!(!store.contains(&Axiom::new(e("B"), Facet::Type, e("A"))));
    }

    #[test]
    fn groups_are_keyed_by_property() {
        let store = MemoryStore::new();
        let robot = e("robot");
        store
            .assert(Axiom::linked(robot.clone(), Facet::DataLink, e("hasAge"), Literal::integer(3)))
            .unwrap();
        store
            .assert(Axiom::linked(robot.clone(), Facet::DataLink, e("hasName"), Literal::string("r2")))
            .unwrap();
        store
            .assert(Axiom::linked(robot.clone(), Facet::DataLink, e("hasName"), Literal::string("rob")))
            .unwrap();

        let all = store.query_groups(&robot, Facet::DataLink, None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all.lookup_values(&e("hasName")).len(), 2);

        let one = store.query_groups(&robot, Facet::DataLink, Some(&e("hasAge"))).unwrap();
        assert_eq!(one.len(), 1);
        assert!(one.contains_key(&e("hasAge")));
    }

    #[test]
    fn malformed_changes_are_rejected() {
        let store = MemoryStore::new();
        let literal_link = Axiom::linked(e("robot"), Facet::ObjectLink, e("isIn"), Literal::integer(1));
        assert!(matches!(store.assert(literal_link), Err(StoreError::Rejected { .. })));
        let missing_key = Axiom::new(e("robot"), Facet::ObjectLink, e("k1"));
        assert!(matches!(store.assert(missing_key), Err(StoreError::Rejected { .. })));
        let literal_instance = Axiom::new(e("Kitchen"), Facet::Instance, Literal::string("k1"));
        assert!(matches!(store.assert(literal_instance), Err(StoreError::Rejected { .. })));
    }

    #[test]
    fn wrong_query_shape_is_an_error() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.query_values(&e("robot"), Facet::ObjectLink),
            Err(QueryError::WrongShape { .. })
        ));
        assert!(matches!(
            store.query_groups(&e("robot"), Facet::Type, None),
            Err(QueryError::WrongShape { .. })
        ));
    }

    #[test]
    fn failure_injection() {
        let store = MemoryStore::new();
        let axiom = Axiom::new(e("k1"), Facet::Type, e("Kitchen"));
        store.fail_on(axiom.clone(), "read-only").unwrap();
        match store.assert(axiom) {
            Err(StoreError::OperationFailed { reason, .. }) => assert_eq!(reason, "read-only"),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(store.history().is_empty());
    }

    #[test]
    fn unavailable_store_refuses_queries() {
        let store = MemoryStore::new();
        store.make_unavailable();
        assert!(matches!(
            store.query_values(&e("k1"), Facet::Type),
            Err(QueryError::Unavailable { .. })
        ));
        store.make_available();
        assert!(store.query_values(&e("k1"), Facet::Type).unwrap().is_empty());
    }

    #[test]
    fn reasoning_adds_inferred_facts_to_queries() {
        let store = MemoryStore::new();
        store.assert(Axiom::new(e("k1"), Facet::Type, e("Kitchen"))).unwrap();
        store.assert(Axiom::new(e("Kitchen"), Facet::SuperClass, e("Room"))).unwrap();
        assert_eq!(store.query_values(&e("k1"), Facet::Type).unwrap().len(), 1);

        store.reason().unwrap();
        assert_eq!(
            store.query_values(&e("k1"), Facet::Type).unwrap(),
            values(&["Kitchen", "Room"])
        );
        assert_eq!(store.query_values(&e("Room"), Facet::SubClass).unwrap(), values(&["Kitchen"]));
        assert!(store.contains(&Axiom::new(e("Room"), Facet::Instance, e("k1"))));
        assert!(!store.is_asserted(&Axiom::new(e("k1"), Facet::Type, e("Room"))));
    }

    #[test]
    fn auto_reason_keeps_closure_current() {
        let store = MemoryStore::new().with_auto_reason();
        store.assert(Axiom::new(e("Kitchen"), Facet::SuperClass, e("Room"))).unwrap();
        store.assert(Axiom::new(e("k1"), Facet::Type, e("Kitchen"))).unwrap();
        assert!(store.contains(&Axiom::new(e("k1"), Facet::Type, e("Room"))));

        store
            .apply(&AxiomChange::remove(Axiom::new(e("Kitchen"), Facet::SuperClass, e("Room"))))
            .unwrap();
        assert!(!store.contains(&Axiom::new(e("k1"), Facet::Type, e("Room"))));
    }
}
