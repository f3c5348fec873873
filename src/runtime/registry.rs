//! Ordered collection of states
//!
//! The registry owns the session's states in display order and enforces name
//! uniqueness. Lookups are by name (the persistence key) or by position.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::{ConfigError, RegistryError, RegistryResult};
use super::state::{State, StateConfig};

/// Persisted registry document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// State records in registry order
    #[serde(default)]
    pub states: Vec<StateConfig>,
}

impl RegistryConfig {
    /// Configuration used when nothing usable is persisted.
    pub fn seed() -> Self {
        Self {
            states: vec![StateConfig::simple_counter()],
        }
    }
}

/// Ordered, name-unique collection of validated states
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    states: Vec<State>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry built from the seed configuration.
    pub fn seed() -> Self {
        // The seed always validates (see `seed_holds_the_counter`).
        Self::from_config(RegistryConfig::seed()).unwrap_or_default()
    }

    /// Validate every record. Any invalid record rejects the whole document.
    pub fn from_config(config: RegistryConfig) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for (position, state_config) in config.states.into_iter().enumerate() {
            let state = State::from_config(state_config, position)?;
            if registry.contains(state.name()) {
                return Err(ConfigError::DuplicateName(state.name().to_string()));
            }
            registry.states.push(state);
        }
        Ok(registry)
    }

    /// Serialize back into the persisted document.
    pub fn to_config(&self) -> RegistryConfig {
        RegistryConfig {
            states: self.states.iter().map(State::to_config).collect(),
        }
    }

    /// Number of states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether the registry holds no states.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Whether a state with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Position of the named state.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.states.iter().position(|state| state.name() == name)
    }

    /// Look up a state by name.
    pub fn get(&self, name: &str) -> Option<&State> {
        self.states.iter().find(|state| state.name() == name)
    }

    /// Mutable lookup by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut State> {
        self.states.iter_mut().find(|state| state.name() == name)
    }

    /// Look up a state by position.
    pub fn get_index(&self, index: usize) -> Option<&State> {
        self.states.get(index)
    }

    /// Iterate in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &State> {
        self.states.iter()
    }

    /// Iterate mutably in registry order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut State> {
        self.states.iter_mut()
    }

    /// Names in registry order.
    pub fn names(&self) -> Vec<String> {
        self.states.iter().map(|state| state.name().to_string()).collect()
    }

    /// Validate and append a new state. Names must be unique.
    pub fn create(&mut self, config: StateConfig) -> RegistryResult<&State> {
        let state = State::from_config(config, self.states.len())?;
        if self.contains(state.name()) {
            return Err(ConfigError::DuplicateName(state.name().to_string()).into());
        }
        info!(state = %state.name(), "created state");
        self.states.push(state);
        let index = self.states.len() - 1;
        Ok(&self.states[index])
    }

    /// Activate the named state. Returns whether the flag changed.
    pub fn activate(&mut self, name: &str) -> RegistryResult<bool> {
        self.set_active(name, true)
    }

    /// Deactivate the named state. Returns whether the flag changed.
    pub fn deactivate(&mut self, name: &str) -> RegistryResult<bool> {
        self.set_active(name, false)
    }

    fn set_active(&mut self, name: &str, active: bool) -> RegistryResult<bool> {
        let state = self
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownState(name.to_string()))?;
        let changed = state.set_active(active);
        if changed {
            info!(state = %name, active, "changed activation");
        }
        Ok(changed)
    }

    /// Remove the named state and return it.
    pub fn remove(&mut self, name: &str) -> RegistryResult<State> {
        let index = self
            .position(name)
            .ok_or_else(|| RegistryError::UnknownState(name.to_string()))?;
        info!(state = %name, "removed state");
        Ok(self.states.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_holds_the_counter() {
        let registry = Registry::seed();
        assert_eq!(registry.names(), vec!["Simple Counter".to_string()]);
        assert_eq!(registry.to_config(), RegistryConfig::seed());
    }

    #[test]
    fn create_rejects_duplicate_names() {
        let mut registry = Registry::seed();
        let err = registry.create(StateConfig::simple_counter()).unwrap_err();
        assert_eq!(
            err,
            RegistryError::Config(ConfigError::DuplicateName("Simple Counter".into()))
        );
        assert_eq!(registry.len(), 1);

        registry.create(StateConfig::template("Fuel")).unwrap();
        assert_eq!(registry.position("Fuel"), Some(1));
    }

    #[test]
    fn from_config_rejects_duplicates() {
        let config = RegistryConfig {
            states: vec![StateConfig::simple_counter(), StateConfig::simple_counter()],
        };
        assert_eq!(
            Registry::from_config(config),
            Err(ConfigError::DuplicateName("Simple Counter".into()))
        );
    }

    #[test]
    fn activation_is_idempotent() {
        let mut registry = Registry::seed();
        assert_eq!(registry.activate("Simple Counter"), Ok(true));
        assert_eq!(registry.activate("Simple Counter"), Ok(false));
        assert!(registry.get("Simple Counter").unwrap().is_active());
        assert_eq!(registry.deactivate("Simple Counter"), Ok(true));
        assert_eq!(registry.deactivate("Simple Counter"), Ok(false));
    }

    #[test]
    fn unknown_names_are_reported() {
        let mut registry = Registry::seed();
        assert_eq!(
            registry.activate("Fuel"),
            Err(RegistryError::UnknownState("Fuel".into()))
        );
        assert!(registry.remove("Fuel").is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_preserves_order() {
        let mut registry = Registry::seed();
        registry.create(StateConfig::template("A")).unwrap();
        registry.create(StateConfig::template("B")).unwrap();
        registry.remove("A").unwrap();
        assert_eq!(registry.names(), vec!["Simple Counter".to_string(), "B".to_string()]);
        assert_eq!(registry.get_index(1).map(State::name), Some("B"));
    }
}
