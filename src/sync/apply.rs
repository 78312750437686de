//! Change application: turning intents into ordered store operations.
//!
//! The applier is order-preserving and never aborts a batch. Each attempted
//! operation yields exactly one [`MappingIntent`], so a caller can see which
//! parts of a partially failed batch landed and compensate if needed.

use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

use super::intent::{GroupedIntent, SynchronisationIntent};

/// Whether a change asserts or retracts a fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Add,
    Remove,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Add => f.write_str("+"),
            ChangeKind::Remove => f.write_str("-"),
        }
    }
}

/// One atomic store operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Change<T> {
    pub kind: ChangeKind,
    pub value: T,
}

impl<T> Change<T> {
    pub fn add(value: T) -> Self {
        Self {
            kind: ChangeKind::Add,
            value,
        }
    }

    pub fn remove(value: T) -> Self {
        Self {
            kind: ChangeKind::Remove,
            value,
        }
    }

    /// Same kind, transformed value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Change<U> {
        Change {
            kind: self.kind,
            value: f(self.value),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Change<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.value)
    }
}

/// A value tagged with the semantic key it is linked under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link<K, V> {
    pub key: K,
    pub value: V,
}

impl<K: fmt::Display, V: fmt::Display> fmt::Display for Link<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.key, self.value)
    }
}

/// Which side of an intent is submitted first.
///
/// Facets that model a single logical slot (replacing a super-class) use
/// `RemoveFirst` so the store never sees two conflicting values at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOrder {
    #[default]
    AddFirst,
    RemoveFirst,
}

/// What a successful store operation actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyEffect {
    /// The store changed.
    Applied,
    /// The fact was already in the requested state.
    NoOp,
}

/// Result of one attempted operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Applied,
    NoOp,
    Failed { reason: String },
    Skipped { reason: String },
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

impl From<ApplyEffect> for Outcome {
    fn from(effect: ApplyEffect) -> Self {
        match effect {
            ApplyEffect::Applied => Outcome::Applied,
            ApplyEffect::NoOp => Outcome::NoOp,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Applied => f.write_str("applied"),
            Outcome::NoOp => f.write_str("no-op"),
            Outcome::Failed { reason } => write!(f, "failed: {reason}"),
            Outcome::Skipped { reason } => write!(f, "skipped: {reason}"),
        }
    }
}

/// Immutable audit record of one attempted store mutation.
///
/// `change` is `None` only for a skipped cycle, where no operation was
/// ever formed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingIntent<T> {
    /// Milliseconds since the UNIX epoch when the operation was attempted.
    timestamp: u64,
    change: Option<Change<T>>,
    outcome: Outcome,
}

impl<T> MappingIntent<T> {
    pub fn new(change: Change<T>, outcome: Outcome) -> Self {
        Self {
            timestamp: now_millis(),
            change: Some(change),
            outcome,
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            timestamp: now_millis(),
            change: None,
            outcome: Outcome::Skipped {
                reason: reason.into(),
            },
        }
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn change(&self) -> Option<&Change<T>> {
        self.change.as_ref()
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn is_failure(&self) -> bool {
        self.outcome.is_failure()
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// ---------------------------------------------------------------------------
// Intent expansion
// ---------------------------------------------------------------------------

/// An intent that expands into atomic changes.
pub trait IntoChanges {
    type Item;

    /// The changes this intent stands for, in submission order.
    fn changes(&self, order: ApplyOrder) -> Vec<Change<Self::Item>>;
}

fn ordered<T>(adds: Vec<Change<T>>, removes: Vec<Change<T>>, order: ApplyOrder) -> Vec<Change<T>> {
    let (mut first, second) = match order {
        ApplyOrder::AddFirst => (adds, removes),
        ApplyOrder::RemoveFirst => (removes, adds),
    };
    first.extend(second);
    first
}

impl<V: Clone> IntoChanges for SynchronisationIntent<V> {
    type Item = V;

    fn changes(&self, order: ApplyOrder) -> Vec<Change<V>> {
        let adds = self.to_add().iter().cloned().map(Change::add).collect();
        let removes = self.to_remove().iter().cloned().map(Change::remove).collect();
        ordered(adds, removes, order)
    }
}

/// One change per (key, value) pair, never one per group.
impl<K, V> IntoChanges for GroupedIntent<K, V>
where
    K: Eq + Hash + Clone,
    V: Eq + Hash + Clone,
{
    type Item = Link<K, V>;

    fn changes(&self, order: ApplyOrder) -> Vec<Change<Link<K, V>>> {
        let link = |(key, value): (&K, &V)| Link {
            key: key.clone(),
            value: value.clone(),
        };
        let adds = self.additions().map(link).map(Change::add).collect();
        let removes = self.removals().map(link).map(Change::remove).collect();
        ordered(adds, removes, order)
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Receiver of atomic changes, typically a thin adapter over a store.
pub trait ChangeSink<T> {
    fn submit(&mut self, change: &Change<T>) -> Result<ApplyEffect, StoreError>;
}

impl<T, F> ChangeSink<T> for F
where
    F: FnMut(&Change<T>) -> Result<ApplyEffect, StoreError>,
{
    fn submit(&mut self, change: &Change<T>) -> Result<ApplyEffect, StoreError> {
        self(change)
    }
}

/// Submit `changes` one at a time, in order, recording every outcome.
///
/// A failing change is logged and recorded; the remaining changes are still
/// submitted.
pub fn apply_changes<T, S>(changes: Vec<Change<T>>, sink: &mut S) -> Vec<MappingIntent<T>>
where
    T: fmt::Debug,
    S: ChangeSink<T> + ?Sized,
{
    let mut trail = Vec::with_capacity(changes.len());
    let (mut applied, mut no_op, mut failed) = (0usize, 0usize, 0usize);

    for change in changes {
        let outcome = match sink.submit(&change) {
            Ok(effect) => {
                match effect {
                    ApplyEffect::Applied => applied += 1,
                    ApplyEffect::NoOp => no_op += 1,
                }
                Outcome::from(effect)
            }
            Err(e) => {
                failed += 1;
                tracing::error!(kind = ?change.kind, value = ?change.value, error = %e, "store operation failed");
                Outcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        trail.push(MappingIntent::new(change, outcome));
    }

    if !trail.is_empty() {
        tracing::info!(applied, no_op, failed, "applied change batch");
    }
    trail
}

/// Expand `intent` in `order` and submit it to `sink`.
///
/// `None` means the target state could not be obtained: nothing is
/// submitted and the trail holds a single skipped record.
///
/// [`compute_intent`](crate::sync::compute_intent) also returns `None`, but
/// there it means the two snapshots already agree. Branch on that result
/// before calling this function; passing its `None` through would audit an
/// up-to-date store as a skipped write.
///
/// ```
/// use axiom_sync::error::StoreError;
/// use axiom_sync::sync::{ApplyEffect, ApplyOrder, Change};
/// use axiom_sync::{AxiomSet, apply_intent, compute_intent};
///
/// let cache = AxiomSet::from_values(["a"]);
/// let store = cache.clone();
/// let mut sink = |_: &Change<&str>| -> Result<ApplyEffect, StoreError> { Ok(ApplyEffect::Applied) };
///
/// let trail = match compute_intent(&store, &cache) {
///     Some(intent) => apply_intent(Some(&intent), ApplyOrder::AddFirst, &mut sink),
///     None => Vec::new(),
/// };
/// assert!(trail.is_empty());
/// ```
pub fn apply_intent<I, S>(intent: Option<&I>, order: ApplyOrder, sink: &mut S) -> Vec<MappingIntent<I::Item>>
where
    I: IntoChanges,
    I::Item: fmt::Debug,
    S: ChangeSink<I::Item> + ?Sized,
{
    match intent {
        Some(intent) => apply_changes(intent.changes(order), sink),
        None => vec![MappingIntent::skipped("no target state")],
    }
}
