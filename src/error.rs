// 🚨 Error Taxonomy
// Every failure below the reconciler ends up as Unavailable/Stale.
// Only a failed save, or an untrusted state file that cannot be moved aside,
// is allowed to abort a run.

use crate::organization::RecordError;
use std::path::PathBuf;

// ============================================================================
// FETCH
// ============================================================================

/// Transport failure while retrieving the registry page
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("could not read response body: {0}")]
    Body(String),

    /// Binary was built without a live transport
    #[error("no page transport available: {0}")]
    Unsupported(String),
}

// ============================================================================
// EXTRACTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    /// Markup was fetched but no strategy produced a valid entry
    #[error("no extraction strategy matched ({tried} tried)")]
    Empty { tried: usize },
}

// ============================================================================
// STORE
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Persisted file exists but cannot be trusted
    #[error("persisted state at {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An untrusted file could not be moved aside; saving would destroy it
    #[error("could not move untrusted state {path} aside: {source}")]
    Quarantine {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Refused to persist a state that breaks the record invariants
    #[error("refusing to save invalid registry state: {0}")]
    Invalid(#[from] RecordError),

    #[error("could not serialize registry state: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_corrupt(&self) -> bool {
        matches!(self, StoreError::Corrupt { .. })
    }
}

// ============================================================================
// RENDER
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template not found: {0}")]
    TemplateMissing(PathBuf),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config value for `{field}`: {message}")]
    Invalid { field: &'static str, message: String },
}
