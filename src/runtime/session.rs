//! Session-scoped engine context
//!
//! A [`Session`] owns the registry for one conversation together with the
//! settings store it persists to. Every engine operation goes through it;
//! there is no process-wide registry.

use tracing::{debug, error, info, warn};

use super::SessionConfig;
use super::context::ContextInjector;
use super::control::{StateDetail, StateSummary};
use super::dispatch::dispatch;
use super::error::{RegistryError, RegistryResult};
use super::journal::TurnJournal;
use super::prompt::synthesize;
use super::registry::Registry;
use super::state::StateConfig;
use super::storage::{FileStore, SettingsStore, Storage};
use super::turn::{LogicalClock, SessionId, TurnId, TurnRecord};

/// Engine state for one conversation
pub struct Session<S: SettingsStore> {
    id: SessionId,
    registry: Registry,
    store: S,
    selected: Option<String>,
    clock: LogicalClock,
    journal: Option<TurnJournal>,
}

impl Session<FileStore> {
    /// Open the file-backed session described by `config`.
    pub fn open(config: &SessionConfig) -> Self {
        let session = Self::load(FileStore::new(config.root.clone()));
        if config.journal {
            let journal = TurnJournal::new(Storage::new(config.root.clone()).journal_path());
            session.with_journal(journal)
        } else {
            session
        }
    }
}

impl<S: SettingsStore> Session<S> {
    /// Load the registry from `store`, falling back to the seed configuration
    /// when nothing usable is persisted.
    pub fn load(store: S) -> Self {
        let registry = load_registry(&store);
        let selected = registry.get_index(0).map(|state| state.name().to_string());
        let id = SessionId::new();
        info!(session = %id, states = registry.len(), "session loaded");
        Self {
            id,
            registry,
            store,
            selected,
            clock: LogicalClock::zero(),
            journal: None,
        }
    }

    /// Record every dispatch in `journal`, repairing a torn tail first.
    pub fn with_journal(mut self, journal: TurnJournal) -> Self {
        if let Err(err) = journal.validate_and_repair() {
            warn!(path = ?journal.path(), error = %err, "could not validate turn journal");
        }
        self.journal = Some(journal);
        self
    }

    /// Session identifier
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Logical clock of the last dispatched turn
    pub fn clock(&self) -> LogicalClock {
        self.clock
    }

    /// Read-only registry access
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The settings store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The turn journal, when enabled
    pub fn journal(&self) -> Option<&TurnJournal> {
        self.journal.as_ref()
    }

    /// Compose the context text for the active states.
    pub fn synthesize(&mut self) -> String {
        synthesize(&mut self.registry)
    }

    /// Synthesize and install the text through `injector`.
    pub fn refresh<I: ContextInjector + ?Sized>(
        &mut self,
        injector: &mut I,
        config: &SessionConfig,
    ) -> String {
        let text = self.synthesize();
        injector.set_context(&config.slot_id, &text, config.position, config.priority);
        text
    }

    /// Apply the markers of one generated message.
    pub fn dispatch(&mut self, text: &str) -> TurnRecord {
        self.clock.increment();
        let outcome = dispatch(&mut self.registry, text);
        let record = TurnRecord {
            turn_id: TurnId::compute(self.id, self.clock, text),
            session: self.id,
            clock: self.clock,
            timestamp: chrono::Utc::now(),
            markers: outcome.markers,
            ignored: outcome.ignored,
            applied: outcome.applied,
            failures: outcome.failures,
        };
        debug!(
            turn = %record.turn_id,
            applied = record.applied.len(),
            failed = record.failures.len(),
            "dispatched turn"
        );

        if !record.is_noop() {
            self.persist();
        }
        if let Some(journal) = &self.journal {
            if let Err(err) = journal.append(&record) {
                error!(path = ?journal.path(), error = %err, "failed to journal turn");
            }
        }
        record
    }

    /// Add a new state. Names must be unique.
    pub fn create(&mut self, config: StateConfig) -> RegistryResult<()> {
        let result = self.registry.create(config).map(|_| ());
        match &result {
            Ok(()) => self.persist(),
            Err(err) => warn!(error = %err, "create rejected"),
        }
        result
    }

    /// Activate the named state. Activating an active state is a no-op.
    pub fn activate(&mut self, name: &str) -> RegistryResult<()> {
        let result = self.registry.activate(name);
        self.after_toggle(name, result)
    }

    /// Deactivate the named state. Deactivating an inactive state is a no-op.
    pub fn deactivate(&mut self, name: &str) -> RegistryResult<()> {
        let result = self.registry.deactivate(name);
        self.after_toggle(name, result)
    }

    fn after_toggle(&mut self, name: &str, result: RegistryResult<bool>) -> RegistryResult<()> {
        match result {
            Ok(true) => {
                self.persist();
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(err) => {
                warn!(state = %name, error = %err, "activation change ignored");
                Err(err)
            }
        }
    }

    /// Remove the named state.
    pub fn remove(&mut self, name: &str) -> RegistryResult<()> {
        if let Err(err) = self.registry.remove(name) {
            warn!(state = %name, error = %err, "remove ignored");
            return Err(err);
        }
        if self.selected.as_deref() == Some(name) {
            self.selected = self
                .registry
                .get_index(0)
                .map(|state| state.name().to_string());
        }
        self.persist();
        Ok(())
    }

    /// Replace every state with the seed configuration.
    pub fn reset(&mut self) {
        info!(session = %self.id, "resetting states to seed configuration");
        self.registry = Registry::seed();
        self.selected = self
            .registry
            .get_index(0)
            .map(|state| state.name().to_string());
        self.persist();
    }

    /// Select the named state for the detail view.
    pub fn select_for_editing(&mut self, name: &str) -> RegistryResult<StateDetail> {
        let state = self
            .registry
            .get(name)
            .ok_or_else(|| RegistryError::UnknownState(name.to_string()))?;
        let detail = StateDetail::of(state);
        self.selected = Some(name.to_string());
        Ok(detail)
    }

    /// Detail view of the selected state
    pub fn selected(&self) -> Option<StateDetail> {
        let name = self.selected.as_deref()?;
        self.registry.get(name).map(StateDetail::of)
    }

    /// List view of every state
    pub fn list(&self) -> Vec<StateSummary> {
        self.registry
            .iter()
            .enumerate()
            .map(|(index, state)| StateSummary::of(index, state))
            .collect()
    }

    fn persist(&self) {
        if let Err(err) = self.store.save(&self.registry.to_config()) {
            error!(session = %self.id, error = %err, "failed to persist states");
        }
    }
}

fn load_registry<S: SettingsStore>(store: &S) -> Registry {
    match store.load() {
        Ok(Some(config)) if !config.states.is_empty() => match Registry::from_config(config) {
            Ok(registry) => registry,
            Err(err) => {
                warn!(error = %err, "rejected persisted states, using seed configuration");
                Registry::seed()
            }
        },
        Ok(_) => {
            debug!("no persisted states, using seed configuration");
            Registry::seed()
        }
        Err(err) => {
            warn!(error = %err, "could not load persisted states, using seed configuration");
            Registry::seed()
        }
    }
}
