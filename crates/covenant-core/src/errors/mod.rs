//! Error taxonomy for the engine.
//!
//! `CovenantError` is the single error surfaced to callers. Storage failures
//! are wrapped as `UpstreamStore` so callers can tell them apart from
//! validation and lifecycle errors.

mod storage_error;

use std::fmt;

pub use storage_error::StorageError;

/// Result alias used across the workspace.
pub type CovenantResult<T> = Result<T, CovenantError>;

/// The kind of record an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Metric,
    Pattern,
    Anomaly,
    Prediction,
    Alert,
    Contract,
    Obligation,
    Dependency,
    Escalation,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Pattern => "pattern",
            Self::Anomaly => "anomaly",
            Self::Prediction => "renewal prediction",
            Self::Alert => "alert",
            Self::Contract => "contract",
            Self::Obligation => "obligation",
            Self::Dependency => "dependency",
            Self::Escalation => "escalation",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CovenantError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: String },

    #[error("invalid transition for {entity} {id}: {from} -> {to}")]
    InvalidTransition {
        entity: EntityKind,
        id: String,
        from: String,
        to: String,
    },

    #[error("dependency {obligation_id} -> {depends_on_id} would create a cycle: {path}")]
    Cycle {
        obligation_id: String,
        depends_on_id: String,
        path: String,
    },

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("concurrent modification of {entity} {id}: {reason}")]
    ConcurrencyConflict {
        entity: EntityKind,
        id: String,
        reason: String,
    },

    #[error("upstream store error: {0}")]
    UpstreamStore(#[from] StorageError),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("dashboard section `{section}` failed: {source}")]
    DashboardSection {
        section: &'static str,
        #[source]
        source: Box<CovenantError>,
    },

    #[error("background task failed: {0}")]
    TaskFailed(String),
}

impl CovenantError {
    pub fn not_found(entity: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn conflict(entity: EntityKind, id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConcurrencyConflict {
            entity,
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// True for errors a caller may retry without changing its input.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConcurrencyConflict { .. } => true,
            Self::UpstreamStore(e) => e.is_transient(),
            _ => false,
        }
    }
}
