//! Rich diagnostic error types for the axiom synchronization engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives.
//! Note that the reconciler itself never fails: these errors describe the
//! collaborators around it (store queries, store mutations, configuration).

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for axiom-sync.
#[derive(Debug, Error, Diagnostic)]
pub enum SyncError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Audit(#[from] AuditError),
}

// ---------------------------------------------------------------------------
// Query errors
// ---------------------------------------------------------------------------

/// The store could not produce a target snapshot.
///
/// A facet that hits this error abandons its synchronization cycle; other
/// facets of the same descriptor are unaffected.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum QueryError {
    #[error("query unavailable for {entity} ({facet}): {message}")]
    #[diagnostic(
        code(axiom_sync::query::unavailable),
        help(
            "The knowledge store could not answer the query. The cached axioms \
             were left untouched and no change was submitted. Retry once the \
             store is reachable, then re-read the descriptor."
        )
    )]
    Unavailable {
        entity: String,
        facet: String,
        message: String,
    },

    #[error("facet {facet} cannot be queried as {shape}")]
    #[diagnostic(
        code(axiom_sync::query::wrong_shape),
        help(
            "Grouped facets (object and data links) are queried as grouped sets; \
             every other facet is queried as a flat set."
        )
    )]
    WrongShape { facet: String, shape: String },
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

/// A single atomic store mutation failed.
///
/// These are recorded in the returned audit trail, never propagated out of
/// a batch.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum StoreError {
    #[error("operation failed: {change}: {reason}")]
    #[diagnostic(
        code(axiom_sync::store::operation_failed),
        help(
            "The store refused or could not perform this change. The rest of \
             the batch was still attempted; inspect the returned mapping \
             intents and re-read the descriptor to resynchronize."
        )
    )]
    OperationFailed { change: String, reason: String },

    #[error("change rejected: {reason}")]
    #[diagnostic(
        code(axiom_sync::store::rejected),
        help(
            "The change is not expressible in this store (for example a literal \
             used where a named entity is required). Fix the cached value."
        )
    )]
    Rejected { reason: String },

    #[error("reasoner failed: {message}")]
    #[diagnostic(
        code(axiom_sync::store::reasoner),
        help("The store's reasoner could not complete. Asserted axioms are unaffected.")
    )]
    Reasoner { message: String },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read sync config: {path}")]
    #[diagnostic(
        code(axiom_sync::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sync config: {path}: {message}")]
    #[diagnostic(
        code(axiom_sync::config::parse),
        help("Check the TOML syntax. Unknown apply orders must be `add_first` or `remove_first`.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write sync config: {path}")]
    #[diagnostic(
        code(axiom_sync::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Audit errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum AuditError {
    #[error("failed to serialize audit trail: {message}")]
    #[diagnostic(
        code(axiom_sync::audit::serialize),
        help("A recorded value could not be rendered as JSON.")
    )]
    Serialize { message: String },
}

/// Convenience alias for functions returning axiom-sync results.
pub type SyncResult<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_error_converts_to_sync_error() {
        let err = QueryError::Unavailable {
            entity: "Robot".into(),
            facet: "type".into(),
            message: "connection reset".into(),
        };
        let sync: SyncError = err.into();
        assert!(matches!(sync, SyncError::Query(QueryError::Unavailable { .. })));
    }

    #[test]
    fn store_error_converts_to_sync_error() {
        let err = StoreError::Rejected {
            reason: "literal subject".into(),
        };
        let sync: SyncError = err.into();
        assert!(matches!(sync, SyncError::Store(StoreError::Rejected { .. })));
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = StoreError::OperationFailed {
            change: "+ Robot type Agent".into(),
            reason: "read-only ontology".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("Robot"));
        assert!(msg.contains("read-only"));
    }
}
