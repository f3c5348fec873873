//! Turn records and deterministic identifiers
//!
//! Every dispatch of a generated message is one turn. Turn IDs are computed
//! from the session, the logical clock and the message text using Blake3, so
//! replaying the same conversation yields the same IDs.

use blake3::Hasher;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random SessionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a turn, deterministically computed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct TurnId(String);

impl TurnId {
    /// Derive the ID of the turn at `clock` dispatching `text`.
    pub fn compute(session: SessionId, clock: LogicalClock, text: &str) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(session.0.as_bytes());
        hasher.update(&clock.0.to_le_bytes());
        hasher.update(text.as_bytes());
        let hash = hasher.finalize();
        Self(hash.to_hex()[..32].to_string())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logical clock value for turn ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LogicalClock(pub u64);

impl LogicalClock {
    /// Create a new logical clock at zero
    pub fn zero() -> Self {
        Self(0)
    }

    /// Increment the clock
    pub fn increment(&mut self) {
        self.0 += 1;
    }
}

/// A transition that changed a state's value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedTransition {
    /// State name
    pub state: String,
    /// Action keyword
    pub keyword: String,
    /// Value before the transition
    pub before: serde_json::Value,
    /// Value after the transition
    pub after: serde_json::Value,
}

/// A transition that was rejected; the state's value is unchanged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionFailure {
    /// State name
    pub state: String,
    /// Action keyword
    pub keyword: String,
    /// Rendered error
    pub error: String,
}

/// Complete record of one dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    /// Turn ID
    pub turn_id: TurnId,
    /// Session that produced the turn
    pub session: SessionId,
    /// Logical clock
    pub clock: LogicalClock,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Number of well-formed markers in the text
    pub markers: usize,
    /// Markers that matched no action of an active state
    pub ignored: usize,
    /// Transitions applied, in application order
    pub applied: Vec<AppliedTransition>,
    /// Transitions rejected, in application order
    pub failures: Vec<TransitionFailure>,
}

impl TurnRecord {
    /// Whether the turn left every value unchanged.
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}
