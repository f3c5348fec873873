//! State engine and session plumbing
//!
//! This module holds the state/action model, the registry, prompt synthesis,
//! marker dispatch and the session object that ties them to a settings store
//! and a context injector.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// Submodules
pub mod context;
pub mod control;
pub mod dispatch;
pub mod error;
pub mod journal;
pub mod pattern;
pub mod prompt;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod storage;
pub mod turn;

/// Configuration for a stateful session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Root directory for session storage (default: .stateful/)
    pub root: PathBuf,

    /// Context slot the synthesized text is installed into
    pub slot_id: String,

    /// Milliseconds between periodic context refreshes
    pub refresh_interval_ms: u64,

    /// Placement of the injected text
    pub position: PromptPosition,

    /// Depth/priority within the placement
    pub priority: i32,

    /// Record every dispatch in the turn journal
    pub journal: bool,

    /// Default tracing level of the CLI is DEBUG instead of INFO
    pub debug: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".stateful"),
            slot_id: "ST-STATEFUL-CONTEXT".to_string(),
            refresh_interval_ms: 1000,
            position: PromptPosition::InChat,
            priority: 0,
            journal: true,
            debug: false,
        }
    }
}

impl SessionConfig {
    /// Refresh period, never shorter than one millisecond
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(1))
    }

    /// Initialize storage directories and write this configuration
    pub fn init(&self) -> anyhow::Result<()> {
        storage::init_storage(&self.root)?;
        storage::write_config(self)?;
        Ok(())
    }

    /// Load the configuration stored under `root`
    pub fn load(root: PathBuf) -> anyhow::Result<Self> {
        storage::load_config(&root)
    }
}

// Re-export commonly used types
pub use context::{ContextInjector, PromptPosition, SharedContext};
pub use control::{ActionDetail, StateDetail, StateSummary};
pub use dispatch::{DispatchOutcome, dispatch};
pub use error::{ConfigError, RegistryError, StateError, StorageError};
pub use prompt::{PROTOCOL_PREAMBLE, synthesize};
pub use registry::{Registry, RegistryConfig};
pub use scheduler::{Lifecycle, SessionDriver, SessionHandle};
pub use session::Session;
pub use state::{Action, ActionConfig, State, StateConfig};
pub use storage::{FileStore, MemoryStore, SettingsStore};
pub use turn::{TurnId, TurnRecord};
