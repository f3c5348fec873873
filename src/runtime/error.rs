//! Error types for the state engine
//!
//! Domain errors use thiserror; the CLI converts them with anyhow at its
//! boundary. None of these errors is allowed to interrupt a conversation:
//! callers log them and carry on with the state unchanged.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::interpreter::{EvalError, ExprError, ValueKind};

/// Rejected state or action configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// State record without a name
    #[error("state at position {0} has no name")]
    MissingName(usize),

    /// Name with leading or trailing whitespace
    #[error("state name '{0}' has surrounding whitespace")]
    PaddedName(String),

    /// Two states share a name
    #[error("duplicate state name '{0}'")]
    DuplicateName(String),

    /// Action record without a keyword
    #[error("action at position {index} of state '{state}' has no keyword")]
    MissingKeyword {
        /// Owning state
        state: String,
        /// Position of the action within the state
        index: usize,
    },

    /// Keyword cannot be written as a marker
    #[error("keyword '{keyword}' of state '{state}' cannot appear inside a marker")]
    InvalidKeyword {
        /// Owning state
        state: String,
        /// Offending keyword
        keyword: String,
    },

    /// Two actions of one state share a keyword
    #[error("duplicate keyword '{keyword}' in state '{state}'")]
    DuplicateKeyword {
        /// Owning state
        state: String,
        /// Repeated keyword
        keyword: String,
    },

    /// An expression failed to parse or validate
    #[error("{field} of state '{state}': {source}")]
    Expression {
        /// Owning state
        state: String,
        /// Which expression (`initial`, `render`, `transition 'kw'`)
        field: String,
        /// Underlying parse/validation failure
        #[source]
        source: ExprError,
    },
}

/// Failure while evaluating a state's initializer, renderer or transition
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    /// The expression itself failed
    #[error("{0}")]
    Eval(#[from] EvalError),

    /// The initializer produced `null`
    #[error("initializer produced null")]
    NullInitial,

    /// The renderer did not produce text
    #[error("renderer produced a {0} instead of text")]
    RenderNotText(ValueKind),

    /// The result holds a `NaN` or infinite number, which cannot be stored
    #[error("result contains a non-finite number")]
    NotStorable,

    /// A transition changed the kind of the value
    #[error("transition turned a {from} into a {to}")]
    KindChanged {
        /// Kind before the transition
        from: ValueKind,
        /// Kind the transition returned
        to: ValueKind,
    },
}

/// Convenience result alias for state evaluation
pub type StateResult<T> = std::result::Result<T, StateError>;

/// Registry lifecycle errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// No state with this name
    #[error("state '{0}' not found")]
    UnknownState(String),

    /// The supplied configuration is invalid
    #[error("invalid state configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Convenience result alias for registry operations
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Storage-specific errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Path not found
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Atomic write failed
    #[error("Atomic write failed for {path}: {detail}")]
    AtomicWriteFailed {
        /// Path where write failed
        path: PathBuf,
        /// Error details
        detail: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result alias for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Errors reported by the session driver
#[derive(Debug, Error)]
pub enum DriverError {
    /// The driver task has stopped and no longer accepts commands
    #[error("session driver has stopped")]
    Stopped,

    /// The lifecycle operation failed
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
