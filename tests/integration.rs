//! End-to-end tests for axiom synchronization.
//!
//! These tests drive the reconciler and change applier against the
//! in-memory reasoning store, then exercise whole descriptor cycles.

use axiom_sync::audit;
use axiom_sync::axiom::{AxiomSet, GroupedAxiomSet, SemanticGroup};
use axiom_sync::config::SyncConfig;
use axiom_sync::descriptor::{Descriptor, FacetState, ReadStatus};
use axiom_sync::error::StoreError;
use axiom_sync::store::{Axiom, AxiomChange, Facet, KnowledgeStore, MemoryStore};
use axiom_sync::sync::{
    ApplyEffect, ApplyOrder, Change, ChangeKind, Link, MappingIntent, Outcome, apply_intent,
    compute_intent,
};
use axiom_sync::value::{Entity, Literal, Value};

fn e(name: &str) -> Entity {
    Entity::named(name)
}

fn v(name: &str) -> Value {
    Value::named(name)
}

/// Sink applying flat `Type` changes about `subject` to `store`.
fn type_sink<'a>(
    store: &'a MemoryStore,
    subject: &'a Entity,
) -> impl FnMut(&Change<Value>) -> Result<ApplyEffect, StoreError> + 'a {
    move |change| {
        let axiom = change
            .clone()
            .map(|value| Axiom::new(subject.clone(), Facet::Type, value));
        store.apply(&axiom)
    }
}

#[test]
fn flat_intent_replaces_one_value() {
    let current = AxiomSet::from_values([v("X"), v("Y")]);
    let target = AxiomSet::from_values([v("Y"), v("Z")]);

    let intent = compute_intent(&current, &target).unwrap();
    assert_eq!(intent.to_add().len(), 1);
    assert!(intent.to_add().contains(&v("Z")));
    assert_eq!(intent.to_remove().len(), 1);
    assert!(intent.to_remove().contains(&v("X")));

    let mut replayed = current.clone();
    intent.apply_to(&mut replayed);
    assert_eq!(replayed, target);
}

#[test]
fn grouped_intent_adds_per_key() {
    let current: GroupedAxiomSet<_, _> = [SemanticGroup::with_values(e("P1"), [v("v1")])]
        .into_iter()
        .collect();
    let target: GroupedAxiomSet<_, _> = [
        SemanticGroup::with_values(e("P1"), [v("v1"), v("v2")]),
        SemanticGroup::with_values(e("P2"), [v("v3")]),
    ]
    .into_iter()
    .collect();

    let intent = compute_intent(&current, &target).unwrap();
    let mut adds: Vec<(Entity, Value)> = intent
        .additions()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    adds.sort();
    assert_eq!(adds, vec![(e("P1"), v("v2")), (e("P2"), v("v3"))]);
    assert_eq!(intent.removals().count(), 0);
}

#[test]
fn failing_operation_does_not_abort_batch() {
    let store = MemoryStore::new();
    let robot = e("robot");
    store
        .fail_on(Axiom::new(robot.clone(), Facet::Type, e("Broken")), "refused by policy")
        .unwrap();

    let current = AxiomSet::new();
    let target = AxiomSet::from_values([v("Agent"), v("Broken"), v("Robot")]);
    let intent = compute_intent(&current, &target);

    let mut sink = type_sink(&store, &robot);
    let trail = apply_intent(intent.as_ref(), ApplyOrder::AddFirst, &mut sink);

    assert_eq!(trail.len(), 3);
    let failed: Vec<&MappingIntent<Value>> = trail.iter().filter(|m| m.is_failure()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].change().map(|c| &c.value), Some(&v("Broken")));
    assert!(
        trail
            .iter()
            .filter(|m| !m.is_failure())
            .all(|m| m.outcome() == &Outcome::Applied)
    );
    assert_eq!(store.asserted_count(), 2);
}

#[test]
fn reapplying_an_intent_reports_no_ops() {
    let store = MemoryStore::new();
    let robot = e("robot");
    store.assert(Axiom::new(robot.clone(), Facet::Type, e("Old"))).unwrap();

    let current = store.query_values(&robot, Facet::Type).unwrap();
    let target = AxiomSet::from_values([v("New")]);
    let intent = compute_intent(&current, &target).unwrap();

    let mut sink = type_sink(&store, &robot);
    let first = apply_intent(Some(&intent), ApplyOrder::RemoveFirst, &mut sink);
    let second = apply_intent(Some(&intent), ApplyOrder::RemoveFirst, &mut sink);

    assert!(first.iter().all(|m| m.outcome() == &Outcome::Applied));
    assert_eq!(second.len(), first.len());
    assert!(second.iter().all(|m| m.outcome() == &Outcome::NoOp));
    assert_eq!(store.query_values(&robot, Facet::Type).unwrap(), target);
}

#[test]
fn grouped_changes_reach_the_store_per_pair() {
    let store = MemoryStore::new();
    let robot = e("robot");

    let current = GroupedAxiomSet::new();
    let target: GroupedAxiomSet<_, _> = [
        SemanticGroup::with_values(e("hasName"), [Value::from(Literal::string("r2"))]),
        SemanticGroup::single(e("hasAge"), Value::from(Literal::integer(3))),
    ]
    .into_iter()
    .collect();
    let intent = compute_intent(&current, &target);

    let mut sink = |change: &Change<Link<Entity, Value>>| -> Result<ApplyEffect, StoreError> {
        let axiom = change.clone().map(|link| {
            Axiom::linked(robot.clone(), Facet::DataLink, link.key, link.value)
        });
        store.apply(&axiom)
    };
    let trail = apply_intent(intent.as_ref(), ApplyOrder::AddFirst, &mut sink);
    assert_eq!(trail.len(), 2);

    let stored = store.query_groups(&robot, Facet::DataLink, None).unwrap();
    assert!(compute_intent(&stored, &target).is_none());
}

#[test]
fn descriptor_round_trip_through_store() {
    let store = MemoryStore::new();
    let config = SyncConfig::default();

    let mut writer = Descriptor::new(e("robot"))
        .with_facet(Facet::Type)
        .with_facet(Facet::ObjectLink)
        .with_facet(Facet::DataLink);
    writer.flat_mut(Facet::Type).unwrap().add(e("Robot"));
    {
        let links = writer.grouped_mut(Facet::ObjectLink).unwrap();
        links.add_value(e("isIn"), e("kitchen"), true);
        links.add_value(e("owns"), e("cup"), false);
        links.add_value(e("owns"), e("plate"), false);
    }
    writer
        .grouped_mut(Facet::DataLink)
        .unwrap()
        .add_value(e("hasAge"), Literal::integer(3), true);

    let trail = writer.write(&store, &config);
    assert_eq!(trail.len(), 5);
    assert!(audit::summarize(&trail).is_clean());

    let mut reader = Descriptor::new(e("robot"))
        .with_facet(Facet::Type)
        .with_facet(Facet::ObjectLink)
        .with_facet(Facet::DataLink);
    reader.read(&store);

    assert_eq!(
        reader.flat(Facet::Type).unwrap().values(),
        writer.flat(Facet::Type).unwrap().values()
    );
    let owns = reader.grouped(Facet::ObjectLink).unwrap().values(&e("owns"));
    assert_eq!(owns, AxiomSet::from_values([v("cup"), v("plate")]));
    assert_eq!(
        reader.grouped(Facet::DataLink).unwrap().groups().value_count(),
        1
    );
}

#[test]
fn moving_an_individual_replaces_its_room() {
    let store = MemoryStore::new();
    let config = SyncConfig::default();
    let robot = e("robot");
    store
        .assert(Axiom::linked(robot.clone(), Facet::ObjectLink, e("isIn"), e("kitchen")))
        .unwrap();

    let mut d = Descriptor::new(robot.clone()).with_facet(Facet::ObjectLink);
    d.read(&store);
    d.grouped_mut(Facet::ObjectLink)
        .unwrap()
        .add_value(e("isIn"), e("corridor"), true);
    let trail = d.write(&store, &config);

    let kinds: Vec<ChangeKind> = trail.iter().filter_map(|m| m.change().map(|c| c.kind)).collect();
    assert_eq!(kinds, vec![ChangeKind::Add, ChangeKind::Remove]);
    let rooms = store.query_groups(&robot, Facet::ObjectLink, Some(&e("isIn"))).unwrap();
    assert_eq!(rooms.lookup_values(&e("isIn")), AxiomSet::from_values([v("corridor")]));
}

#[test]
fn inferred_facts_flow_into_caches() {
    let store = MemoryStore::new().with_auto_reason();
    let config = SyncConfig::default();

    let mut kitchen = Descriptor::new(e("Kitchen")).with_singleton_facet(Facet::SuperClass);
    kitchen.flat_mut(Facet::SuperClass).unwrap().add(e("Room"));
    kitchen.write(&store, &config);
    store
        .assert(Axiom::new(e("Room"), Facet::SuperClass, e("Location")))
        .unwrap();
    store
        .assert(Axiom::linked(e("robot"), Facet::ObjectLink, e("isIn"), e("k1")))
        .unwrap();
    store.assert(Axiom::new(e("k1"), Facet::Type, e("Kitchen"))).unwrap();

    let mut k1 = Descriptor::new(e("k1")).with_facet(Facet::Type);
    k1.read(&store);
    assert_eq!(
        k1.flat(Facet::Type).unwrap().values(),
        &AxiomSet::from_values([v("Kitchen"), v("Room"), v("Location")])
    );

    let mut location = Descriptor::new(e("Location")).with_facet(Facet::SubClass);
    location.read(&store);
    assert_eq!(
        location.flat(Facet::SubClass).unwrap().values(),
        &AxiomSet::from_values([v("Kitchen"), v("Room")])
    );
}

#[test]
fn unavailable_store_skips_without_touching_caches() {
    let store = MemoryStore::new();
    let config = SyncConfig::default();
    let mut d = Descriptor::new(e("robot"))
        .with_facet(Facet::Type)
        .with_facet(Facet::ObjectLink);
    d.flat_mut(Facet::Type).unwrap().add(e("Robot"));

    store.make_unavailable();
    let trail = d.write(&store, &config);
    assert_eq!(trail.len(), 2);
    assert!(
        trail
            .iter()
            .all(|m| matches!(m.outcome(), Outcome::Skipped { .. }))
    );
    assert_eq!(d.state(Facet::Type), Some(FacetState::Dirty));

    let reports = d.read(&store);
    assert!(
        reports
            .iter()
            .all(|r| matches!(r.status, ReadStatus::Unavailable { .. }))
    );
    assert_eq!(d.flat(Facet::Type).unwrap().values().len(), 1);

    store.make_available();
    let trail = d.write(&store, &config);
    assert_eq!(trail.len(), 1);
    assert_eq!(d.state(Facet::Type), Some(FacetState::Synced));
}

#[test]
fn partial_failure_is_repaired_by_reading_back() {
    let store = MemoryStore::new();
    let config = SyncConfig::default();
    let robot = e("robot");
    store
        .fail_on(Axiom::new(robot.clone(), Facet::Type, e("Forbidden")), "read-only class")
        .unwrap();

    let mut d = Descriptor::new(robot.clone()).with_facet(Facet::Type);
    {
        let types = d.flat_mut(Facet::Type).unwrap();
        types.add(e("Robot"));
        types.add(e("Forbidden"));
    }
    let report = d.write_inconsistency_safe(&store, &config);

    assert!(report.has_failures());
    assert!(!report.reasoned);
    assert_eq!(
        d.flat(Facet::Type).unwrap().values(),
        &AxiomSet::from_values([v("Robot")])
    );
    assert_eq!(d.state(Facet::Type), Some(FacetState::Synced));
}

#[test]
fn audit_trail_exports_to_json() {
    let store = MemoryStore::new();
    let mut d = Descriptor::new(e("robot")).with_facet(Facet::Type);
    d.flat_mut(Facet::Type).unwrap().add(e("Robot"));
    let trail = d.write(&store, &SyncConfig::default());

    let json = audit::to_json(&trail).unwrap();
    assert!(json.contains("\"status\": \"applied\""));
    assert!(json.contains("robot type Robot"));
}

#[test]
fn history_records_only_effective_changes() {
    let store = MemoryStore::new();
    let axiom = Axiom::new(e("robot"), Facet::Type, e("Robot"));
    store.assert(axiom.clone()).unwrap();
    store.assert(axiom.clone()).unwrap();
    store.apply(&AxiomChange::remove(axiom.clone())).unwrap();

    let history = store.history();
    assert_eq!(
        history,
        vec![AxiomChange::add(axiom.clone()), AxiomChange::remove(axiom)]
    );
}
