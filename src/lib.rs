// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # axiom-sync
//!
//! Keeps strongly typed, in-memory caches of an entity's axioms synchronized
//! with a knowledge store that may infer facts of its own.
//!
//! ## Architecture
//!
//! - **Axiom containers** (`axiom`): deduplicated sets with an advisory
//!   singleton flag, and grouped sets keyed by semantic key
//! - **Reconciler** (`sync`): minimal add/remove intents between two snapshots
//! - **Change applier** (`sync::apply`): ordered, non-aborting execution with
//!   one audit record per operation
//! - **Stores** (`store`): the store boundary and an in-memory reasoning store
//! - **Descriptors** (`descriptor`): per-facet caches with read/write cycles
//!
//! ## Library usage
//!
//! ```
//! use axiom_sync::config::SyncConfig;
//! use axiom_sync::descriptor::Descriptor;
//! use axiom_sync::store::{Facet, MemoryStore};
//! use axiom_sync::value::Entity;
//!
//! let store = MemoryStore::new();
//! let mut robot = Descriptor::new(Entity::named("robot")).with_facet(Facet::Type);
//! robot.flat_mut(Facet::Type).unwrap().add(Entity::named("Robot"));
//!
//! let trail = robot.write(&store, &SyncConfig::default());
//! assert_eq!(trail.len(), 1);
//! ```

pub mod audit;
pub mod axiom;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod store;
pub mod sync;
pub mod value;

#[cfg(test)]
mod testing;

pub use axiom::{AxiomSet, GroupedAxiomSet, SemanticGroup};
pub use error::{SyncError, SyncResult};
pub use sync::{apply_intent, compute_intent};
