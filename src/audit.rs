//! Export of write audit trails.
//!
//! A trail is the ordered list of [`MappingIntent`]s a write returned. These
//! types flatten it into label-resolved rows suitable for JSON export and
//! summarise it into outcome counts.

use serde::{Deserialize, Serialize};

use crate::error::{AuditError, SyncResult};
use crate::store::Axiom;
use crate::sync::{ChangeKind, MappingIntent, Outcome};

/// One exported record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Milliseconds since the UNIX epoch.
    pub timestamp: u64,
    /// `None` for a skipped cycle.
    pub kind: Option<ChangeKind>,
    /// Human-readable rendering of the change.
    pub change: Option<String>,
    /// Structured axiom, when there was one.
    pub axiom: Option<Axiom>,
    pub outcome: Outcome,
}

impl From<&MappingIntent<Axiom>> for AuditEntry {
    fn from(record: &MappingIntent<Axiom>) -> Self {
        Self {
            timestamp: record.timestamp(),
            kind: record.change().map(|c| c.kind),
            change: record.change().map(|c| c.to_string()),
            axiom: record.change().map(|c| c.value.clone()),
            outcome: record.outcome().clone(),
        }
    }
}

/// Outcome counts of a trail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub applied: usize,
    pub no_op: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl AuditSummary {
    pub fn total(&self) -> usize {
        self.applied + self.no_op + self.failed + self.skipped
    }

    /// Whether every attempted operation landed or was already in place.
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }
}

impl std::fmt::Display for AuditSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} applied, {} no-op, {} failed, {} skipped",
            self.applied, self.no_op, self.failed, self.skipped
        )
    }
}

/// Count outcomes in `trail`.
pub fn summarize<T>(trail: &[MappingIntent<T>]) -> AuditSummary {
    let mut summary = AuditSummary::default();
    for record in trail {
        match record.outcome() {
            Outcome::Applied => summary.applied += 1,
            Outcome::NoOp => summary.no_op += 1,
            Outcome::Failed { .. } => summary.failed += 1,
            Outcome::Skipped { .. } => summary.skipped += 1,
        }
    }
    summary
}

/// Flatten `trail` into export rows, preserving order.
pub fn entries(trail: &[MappingIntent<Axiom>]) -> Vec<AuditEntry> {
    trail.iter().map(AuditEntry::from).collect()
}

/// Render `trail` as pretty-printed JSON.
pub fn to_json(trail: &[MappingIntent<Axiom>]) -> SyncResult<String> {
    serde_json::to_string_pretty(&entries(trail)).map_err(|e| {
        AuditError::Serialize {
            message: e.to_string(),
        }
        .into()
    })
}
