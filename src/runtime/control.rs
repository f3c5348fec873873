//! Read-only views for the UI surface
//!
//! The settings panel shows a list of states and a detail view of the
//! selected one. These structures are what the panel (or the CLI) renders;
//! every control delegates back to the session's lifecycle operations.

use serde::{Deserialize, Serialize};

use super::state::State;

/// One row of the state list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSummary {
    /// Position in the registry
    pub index: usize,
    /// State name
    pub name: String,
    /// Activation flag
    pub active: bool,
    /// Current value, `None` while unset
    pub value: Option<serde_json::Value>,
}

impl StateSummary {
    pub(crate) fn of(index: usize, state: &State) -> Self {
        Self {
            index,
            name: state.name().to_string(),
            active: state.is_active(),
            value: state.peek_value().map(|value| value.to_json()),
        }
    }
}

/// One action in the detail view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDetail {
    /// Marker keyword
    pub keyword: String,
    /// Invocation guidance
    pub prompt: String,
    /// Transition source
    pub transition: String,
}

/// Detail view of the selected state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDetail {
    /// State name
    pub name: String,
    /// Static description
    pub prompt: String,
    /// Activation flag
    pub active: bool,
    /// Current value, `None` while unset
    pub value: Option<serde_json::Value>,
    /// Initializer source
    pub initial: String,
    /// Renderer source
    pub render: String,
    /// Actions in declaration order
    pub actions: Vec<ActionDetail>,
}

impl StateDetail {
    pub(crate) fn of(state: &State) -> Self {
        Self {
            name: state.name().to_string(),
            prompt: state.prompt().to_string(),
            active: state.is_active(),
            value: state.peek_value().map(|value| value.to_json()),
            initial: state.initial_source().to_string(),
            render: state.render_source().to_string(),
            actions: state
                .actions()
                .iter()
                .map(|action| ActionDetail {
                    keyword: action.keyword().to_string(),
                    prompt: action.prompt().to_string(),
                    transition: action.transition_source().to_string(),
                })
                .collect(),
        }
    }

    /// Status line shown next to the activation controls
    pub fn status_line(&self) -> &'static str {
        if self.active {
            "Currently Active"
        } else {
            "Currently Disabled"
        }
    }
}
