//! Filesystem layout, atomic writes and settings stores
//!
//! Manages the `.stateful/` directory structure and provides the
//! [`SettingsStore`] seam through which sessions load and save their
//! registry document.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::RwLock;

use super::SessionConfig;
use super::error::{StorageError, StorageResult};
use super::registry::RegistryConfig;

/// Storage manager for session persistence
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Create a new storage manager
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Get the root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the config file path
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Get the registry document path
    pub fn states_path(&self) -> PathBuf {
        self.root.join("states.json")
    }

    /// Get the turn journal path
    pub fn journal_path(&self) -> PathBuf {
        self.root.join("turns.jsonl")
    }

    /// Write data atomically to a file
    ///
    /// Creates a temporary file, writes the data, syncs, then renames
    pub fn write_atomic(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        let temp_path = path.with_extension("tmp");
        let failed = |detail: String| StorageError::AtomicWriteFailed {
            path: path.to_path_buf(),
            detail,
        };

        let mut file = File::create(&temp_path)
            .map_err(|e| failed(format!("create {:?}: {}", temp_path, e)))?;
        file.write_all(data)
            .map_err(|e| failed(format!("write: {}", e)))?;
        file.sync_all().map_err(|e| failed(format!("sync: {}", e)))?;
        drop(file);

        fs::rename(&temp_path, path)
            .map_err(|e| failed(format!("rename {:?}: {}", temp_path, e)))?;

        // Sync parent directory so the rename is durable
        if let Some(parent) = path.parent() {
            let dir = OpenOptions::new().read(true).open(parent)?;
            dir.sync_all()?;
        }

        Ok(())
    }

    /// Read a file
    pub fn read_file(&self, path: &Path) -> StorageResult<Vec<u8>> {
        if !path.exists() {
            return Err(StorageError::PathNotFound(path.to_path_buf()));
        }
        Ok(fs::read(path)?)
    }

    /// Create a directory and all parent directories
    pub fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {:?}", path))
    }
}

/// Host-provided persistence for the registry document
pub trait SettingsStore {
    /// Load the persisted document, or `None` when nothing has been saved.
    fn load(&self) -> StorageResult<Option<RegistryConfig>>;

    /// Persist the document, replacing any previous one.
    fn save(&self, config: &RegistryConfig) -> StorageResult<()>;
}

/// Registry document stored as pretty JSON under the storage root
#[derive(Debug, Clone)]
pub struct FileStore {
    storage: Storage,
}

impl FileStore {
    /// Store rooted at `root`
    pub fn new(root: PathBuf) -> Self {
        Self {
            storage: Storage::new(root),
        }
    }

    /// Path of the registry document
    pub fn path(&self) -> PathBuf {
        self.storage.states_path()
    }
}

impl SettingsStore for FileStore {
    fn load(&self) -> StorageResult<Option<RegistryConfig>> {
        let path = self.storage.states_path();
        if !path.exists() {
            return Ok(None);
        }
        let data = self.storage.read_file(&path)?;
        let config = serde_json::from_slice(&data)?;
        Ok(Some(config))
    }

    fn save(&self, config: &RegistryConfig) -> StorageResult<()> {
        fs::create_dir_all(self.storage.root())?;
        let data = serde_json::to_vec_pretty(config)?;
        self.storage.write_atomic(&self.storage.states_path(), &data)
    }
}

/// In-memory store; clones share the same document
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    document: Arc<RwLock<Option<RegistryConfig>>>,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `config`
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            document: Arc::new(RwLock::new(Some(config))),
        }
    }

    /// Copy of the current document
    pub fn snapshot(&self) -> Option<RegistryConfig> {
        self.document.read().clone()
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> StorageResult<Option<RegistryConfig>> {
        Ok(self.document.read().clone())
    }

    fn save(&self, config: &RegistryConfig) -> StorageResult<()> {
        *self.document.write() = Some(config.clone());
        Ok(())
    }
}

/// Initialize the storage directory for a new session
pub fn init_storage(root: &Path) -> Result<()> {
    let storage = Storage::new(root.to_path_buf());
    storage.create_dir_all(root)
}

/// Write session configuration
pub fn write_config(config: &SessionConfig) -> Result<()> {
    let storage = Storage::new(config.root.clone());
    let config_path = storage.config_path();

    let json = serde_json::to_vec_pretty(config).context("Failed to serialize config")?;

    storage
        .write_atomic(&config_path, &json)
        .with_context(|| format!("Failed to write config: {:?}", config_path))?;

    Ok(())
}

/// Load session configuration
pub fn load_config(root: &Path) -> Result<SessionConfig> {
    let storage = Storage::new(root.to_path_buf());
    let config_path = storage.config_path();

    let data = storage
        .read_file(&config_path)
        .with_context(|| format!("Failed to read config: {:?}", config_path))?;
    let config: SessionConfig =
        serde_json::from_slice(&data).context("Failed to deserialize config")?;

    Ok(config)
}
