//! Prompt synthesis
//!
//! Builds the text block injected into the AI's context: the protocol
//! preamble followed by one tagged block per active state.

use std::fmt::Write;

use tracing::warn;

use super::registry::Registry;

/// Fixed explanation of the marker protocol, emitted before any state.
pub const PROTOCOL_PREAMBLE: &str = r#"<StateInstructions>
State:
For this chat, you are given variables about the scenario as State. At any time while responding, you can use an action to modify the State. You can Invoke an Action by surrounding it in a comment: <!-- [keyword] -->
For example, if your State was about monitoring fuel levels, after the user drives around you update the state to lower fuel levels with the "decrementFuel" Action:
```
You use up some gas while driving<!-- decrementFuel -->.
```
</StateInstructions>
"#;

/// Compose the context text for every active state, in registry order.
///
/// Apart from materializing unset values through their initializers, this
/// never mutates the registry, so repeated calls produce identical text.
pub fn synthesize(registry: &mut Registry) -> String {
    let mut prompt = String::from(PROTOCOL_PREAMBLE);

    for state in registry.iter_mut().filter(|state| state.is_active()) {
        if let Err(err) = state.value() {
            warn!(state = %state.name(), error = %err, "skipping state with failed initializer");
            continue;
        }

        let description = match state.describe() {
            Ok(text) => Some(text),
            Err(err) => {
                warn!(state = %state.name(), error = %err, "state description unavailable");
                None
            }
        };

        let _ = writeln!(prompt, "<{}>", state.name());
        prompt.push_str(state.prompt());
        if let Some(description) = description {
            prompt.push(' ');
            prompt.push_str(&description);
        }
        if !state.actions().is_empty() {
            prompt.push_str("\n\nActions:");
            for action in state.actions() {
                let _ = write!(
                    prompt,
                    "\nkeyword: \"{}\", when to use: {}",
                    action.keyword(),
                    action.prompt()
                );
            }
        }
        let _ = writeln!(prompt, "</{}>", state.name());
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::state::StateConfig;

    #[test]
    fn inactive_registry_yields_only_the_preamble() {
        let mut registry = Registry::seed();
        assert_eq!(synthesize(&mut registry), PROTOCOL_PREAMBLE);
        assert!(registry.get("Simple Counter").unwrap().peek_value().is_none());
    }

    #[test]
    fn active_state_block_layout() {
        let mut registry = Registry::seed();
        registry.activate("Simple Counter").unwrap();
        let text = synthesize(&mut registry);
        let block = text.strip_prefix(PROTOCOL_PREAMBLE).unwrap();
        assert_eq!(
            block,
            "<Simple Counter>\n\
             This is a number counter. You increment and decrement the value. \
             The number is 6. Good! A good amount of numbers! {{char}} is happy.\n\
             \n\
             Actions:\n\
             keyword: \"increment\", when to use: Invoke 'increment' whenever asked.\n\
             keyword: \"decrement\", when to use: Invoke 'decrement' whenever asked.\
             </Simple Counter>\n"
        );
    }

    #[test]
    fn state_without_actions_omits_the_action_list() {
        let mut registry = Registry::new();
        let mut config = StateConfig::template("Mood");
        config.active = true;
        registry.create(config).unwrap();
        let text = synthesize(&mut registry);
        assert!(text.contains("<Mood>\nexplain what this state is for The number is 1."));
        assert!(!text.contains("Actions:"));
    }

    #[test]
    fn failing_renderer_keeps_prompt_and_actions() {
        let mut registry = Registry::new();
        let mut config = StateConfig::simple_counter();
        config.active = true;
        config.render = "(concat \"x\" (/ value 0))".to_string();
        registry.create(config).unwrap();
        let text = synthesize(&mut registry);
        assert!(text.contains("You increment and decrement the value.\n\nActions:"));
    }

    #[test]
    fn failing_initializer_skips_the_state() {
        let mut registry = Registry::new();
        for (name, initial) in [("Broken", "(/ 1 0)"), ("Empty", "null")] {
            let mut config = StateConfig::simple_counter();
            config.name = name.to_string();
            config.active = true;
            config.initial = initial.to_string();
            registry.create(config).unwrap();
        }
        let mut healthy = StateConfig::template("Mood");
        healthy.active = true;
        registry.create(healthy).unwrap();

        let text = synthesize(&mut registry);
        assert!(!text.contains("<Broken>"));
        assert!(!text.contains("<Empty>"));
        assert!(text.contains("<Mood>"));
        assert!(registry.get("Broken").unwrap().peek_value().is_none());
    }
}
