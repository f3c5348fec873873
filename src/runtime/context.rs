//! Context injection seam
//!
//! The host places synthesized text into the AI's input at a fixed position.
//! [`SharedContext`] is an in-memory host used by the CLI and tests.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// Where injected text lands in the AI's input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromptPosition {
    /// Appended to the system prompt
    InPrompt,
    /// Inserted among chat messages at the configured depth
    #[default]
    InChat,
    /// Placed before the system prompt
    BeforePrompt,
}

/// Host mechanism that installs text into the AI's context
pub trait ContextInjector {
    /// Replace the text held in `slot_id`.
    fn set_context(&mut self, slot_id: &str, text: &str, position: PromptPosition, priority: i32);
}

/// Text currently installed in one slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSlot {
    /// Installed text
    pub text: String,
    /// Placement
    pub position: PromptPosition,
    /// Depth/priority within the placement
    pub priority: i32,
    /// How many times the slot was written
    pub writes: u64,
}

/// In-memory injector; clones observe the same slots
#[derive(Debug, Clone, Default)]
pub struct SharedContext {
    slots: Arc<RwLock<HashMap<String, ContextSlot>>>,
}

impl SharedContext {
    /// Empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the named slot
    pub fn slot(&self, slot_id: &str) -> Option<ContextSlot> {
        self.slots.read().get(slot_id).cloned()
    }

    /// Installed text of the named slot
    pub fn text(&self, slot_id: &str) -> Option<String> {
        self.slots.read().get(slot_id).map(|slot| slot.text.clone())
    }
}

impl ContextInjector for SharedContext {
    fn set_context(&mut self, slot_id: &str, text: &str, position: PromptPosition, priority: i32) {
        let mut slots = self.slots.write();
        let slot = slots.entry(slot_id.to_string()).or_insert_with(|| ContextSlot {
            text: String::new(),
            position,
            priority,
            writes: 0,
        });
        slot.text = text.to_string();
        slot.position = position;
        slot.priority = priority;
        slot.writes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_replace_slot_text() {
        let mut context = SharedContext::new();
        let observer = context.clone();
        context.set_context("SLOT", "first", PromptPosition::InChat, 0);
        context.set_context("SLOT", "second", PromptPosition::InPrompt, 2);

        let slot = observer.slot("SLOT").unwrap();
        assert_eq!(slot.text, "second");
        assert_eq!(slot.position, PromptPosition::InPrompt);
        assert_eq!(slot.priority, 2);
        assert_eq!(slot.writes, 2);
        assert!(observer.text("OTHER").is_none());
    }
}
