//! State and action model
//!
//! A [`StateConfig`] is the persisted, serializable record; a [`State`] is its
//! validated form with compiled expressions. Conversion in both directions is
//! lossless because compiled expressions keep their source text.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::interpreter::{Expression, Scope, Value};

use super::error::{ConfigError, StateError, StateResult};
use super::pattern::is_valid_keyword;

/// Persisted form of an action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionConfig {
    /// Token the AI emits inside a marker
    pub keyword: String,
    /// Guidance on when to invoke the action
    #[serde(default)]
    pub prompt: String,
    /// Expression over `value` producing the new value
    pub transition: String,
}

/// Persisted form of a state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateConfig {
    /// Unique name
    pub name: String,
    /// Current value; `None` until first materialized
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    /// Whether the state takes part in synthesis and dispatch
    #[serde(default)]
    pub active: bool,
    /// Static description shown to the AI
    #[serde(default)]
    pub prompt: String,
    /// Expression producing the starting value
    pub initial: String,
    /// Expression over `value` producing the description
    pub render: String,
    /// Actions in declaration order
    #[serde(default)]
    pub actions: Vec<ActionConfig>,
}

const COUNTER_INITIAL: &str = "6";

const COUNTER_RENDER: &str = r#"(concat "The number is " value ". "
  (cond ((< value 0) "Negative number values are neat. They also seem to make {{char}} hungry.")
        ((= value 0) "{{char}} is a bit sad. No more number, just zero...")
        ((<= value 5) "{{char}} is dismayed by these low numbers.")
        (else "Good! A good amount of numbers! {{char}} is happy.")))"#;

impl StateConfig {
    /// Blank state offered by the "new state" control.
    pub fn template(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(serde_json::Value::from(1)),
            active: false,
            prompt: "explain what this state is for".to_string(),
            initial: COUNTER_INITIAL.to_string(),
            render: COUNTER_RENDER.to_string(),
            actions: Vec::new(),
        }
    }

    /// The demonstration counter shipped as the seed configuration.
    pub fn simple_counter() -> Self {
        Self {
            name: "Simple Counter".to_string(),
            value: None,
            active: false,
            prompt: "This is a number counter. You increment and decrement the value.".to_string(),
            initial: COUNTER_INITIAL.to_string(),
            render: COUNTER_RENDER.to_string(),
            actions: vec![
                ActionConfig {
                    keyword: "increment".to_string(),
                    prompt: "Invoke 'increment' whenever asked.".to_string(),
                    transition: "(+ value 1)".to_string(),
                },
                ActionConfig {
                    keyword: "decrement".to_string(),
                    prompt: "Invoke 'decrement' whenever asked.".to_string(),
                    transition: "(- value 1)".to_string(),
                },
            ],
        }
    }
}

/// Validated action with a compiled transition
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    keyword: String,
    prompt: String,
    transition: Expression,
}

impl Action {
    /// Marker keyword.
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Invocation guidance.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Transition source text.
    pub fn transition_source(&self) -> &str {
        self.transition.source()
    }

    fn to_config(&self) -> ActionConfig {
        ActionConfig {
            keyword: self.keyword.clone(),
            prompt: self.prompt.clone(),
            transition: self.transition.source().to_string(),
        }
    }
}

/// A named, independently activatable unit of mutable data
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    name: String,
    value: Option<Value>,
    active: bool,
    prompt: String,
    initial: Expression,
    render: Expression,
    actions: Vec<Action>,
}

impl State {
    /// Validate a configuration record and compile its expressions.
    ///
    /// `position` is only used to identify nameless records in errors.
    pub fn from_config(config: StateConfig, position: usize) -> Result<Self, ConfigError> {
        let name = config.name;
        if name.trim().is_empty() {
            return Err(ConfigError::MissingName(position));
        }
        if name.trim() != name {
            return Err(ConfigError::PaddedName(name));
        }

        let compile = |field: String, source: String, scope: Scope| {
            Expression::compile(source, scope).map_err(|source| ConfigError::Expression {
                state: name.clone(),
                field,
                source,
            })
        };

        let initial = compile("initial".to_string(), config.initial, Scope::Empty)?;
        let render = compile("render".to_string(), config.render, Scope::StateValue)?;

        let mut actions: Vec<Action> = Vec::with_capacity(config.actions.len());
        for (index, action) in config.actions.into_iter().enumerate() {
            let keyword = action.keyword;
            if keyword.trim().is_empty() {
                return Err(ConfigError::MissingKeyword {
                    state: name.clone(),
                    index,
                });
            }
            if !is_valid_keyword(&keyword) {
                return Err(ConfigError::InvalidKeyword {
                    state: name.clone(),
                    keyword,
                });
            }
            if actions.iter().any(|existing| existing.keyword == keyword) {
                return Err(ConfigError::DuplicateKeyword {
                    state: name.clone(),
                    keyword,
                });
            }
            let transition = compile(
                format!("transition '{}'", keyword),
                action.transition,
                Scope::StateValue,
            )?;
            actions.push(Action {
                keyword,
                prompt: action.prompt,
                transition,
            });
        }

        // A persisted null is the same as never initialized.
        let value = config
            .value
            .as_ref()
            .map(Value::from_json)
            .filter(|value| *value != Value::Null);

        Ok(Self {
            name,
            value,
            active: config.active,
            prompt: config.prompt,
            initial,
            render,
            actions,
        })
    }

    /// Convert back into the persisted record.
    pub fn to_config(&self) -> StateConfig {
        StateConfig {
            name: self.name.clone(),
            value: self.value.as_ref().map(Value::to_json),
            active: self.active,
            prompt: self.prompt.clone(),
            initial: self.initial.source().to_string(),
            render: self.render.source().to_string(),
            actions: self.actions.iter().map(Action::to_config).collect(),
        }
    }

    /// Unique name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Static description.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Whether the state is active.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Set the activation flag, returning whether it changed.
    pub fn set_active(&mut self, active: bool) -> bool {
        let changed = self.active != active;
        self.active = active;
        changed
    }

    /// Current value without materializing it.
    pub fn peek_value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Actions in declaration order.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Initializer source text.
    pub fn initial_source(&self) -> &str {
        self.initial.source()
    }

    /// Renderer source text.
    pub fn render_source(&self) -> &str {
        self.render.source()
    }

    /// Current value, running the initializer the first time it is needed.
    pub fn value(&mut self) -> StateResult<&Value> {
        if self.value.is_none() {
            debug!(state = %self.name, "initializing state value");
            let initial = self.initial.eval_initial()?;
            if initial == Value::Null {
                return Err(StateError::NullInitial);
            }
            if !initial.is_storable() {
                return Err(StateError::NotStorable);
            }
            self.value = Some(initial);
        }
        // Materialized above.
        self.value.as_ref().ok_or(StateError::NullInitial)
    }

    /// Render the description of the current value.
    pub fn describe(&mut self) -> StateResult<String> {
        let value = self.value()?.clone();
        match self.render.eval_with(&value)? {
            Value::String(text) => Ok(text),
            other => Err(StateError::RenderNotText(other.kind())),
        }
    }

    /// Apply the transition of the action at `index` and return the
    /// `(before, after)` pair. On failure the value is left unchanged.
    pub fn apply(&mut self, index: usize) -> StateResult<(Value, Value)> {
        let before = self.value()?.clone();
        let Some(action) = self.actions.get(index) else {
            return Ok((before.clone(), before));
        };
        let after = action.transition.eval_with(&before)?;
        if after.kind() != before.kind() {
            return Err(StateError::KindChanged {
                from: before.kind(),
                to: after.kind(),
            });
        }
        if !after.is_storable() {
            return Err(StateError::NotStorable);
        }
        self.value = Some(after.clone());
        Ok((before, after))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_counter_compiles_and_initializes_lazily() {
        let mut state = State::from_config(StateConfig::simple_counter(), 0).unwrap();
        assert!(state.peek_value().is_none());
        assert_eq!(state.value().unwrap(), &Value::Integer(6));
        assert_eq!(
            state.describe().unwrap(),
            "The number is 6. Good! A good amount of numbers! {{char}} is happy."
        );
    }

    #[test]
    fn counter_bands_cover_every_region() {
        let cases = [
            (-2, "Negative number values are neat."),
            (0, "No more number, just zero..."),
            (3, "dismayed by these low numbers."),
            (5, "dismayed by these low numbers."),
            (6, "Good! A good amount of numbers!"),
        ];
        for (number, expected) in cases {
            let mut config = StateConfig::simple_counter();
            config.value = Some(serde_json::Value::from(number));
            let mut state = State::from_config(config, 0).unwrap();
            let text = state.describe().unwrap();
            assert!(text.contains(expected), "{} -> {}", number, text);
        }
    }

    #[test]
    fn config_round_trips() {
        let mut config = StateConfig::simple_counter();
        config.value = Some(serde_json::Value::from(9));
        config.active = true;
        let state = State::from_config(config.clone(), 0).unwrap();
        assert_eq!(state.to_config(), config);
    }

    #[test]
    fn rejects_invalid_records() {
        let mut nameless = StateConfig::simple_counter();
        nameless.name = "  ".to_string();
        assert_eq!(
            State::from_config(nameless, 3),
            Err(ConfigError::MissingName(3))
        );

        let mut duplicate = StateConfig::simple_counter();
        duplicate.actions[1].keyword = "increment".to_string();
        assert!(matches!(
            State::from_config(duplicate, 0),
            Err(ConfigError::DuplicateKeyword { .. })
        ));

        let mut spaced = StateConfig::simple_counter();
        spaced.actions[0].keyword = "go up".to_string();
        assert!(matches!(
            State::from_config(spaced, 0),
            Err(ConfigError::InvalidKeyword { .. })
        ));

        let mut padded = StateConfig::simple_counter();
        padded.name = " Simple Counter ".to_string();
        assert_eq!(
            State::from_config(padded, 0),
            Err(ConfigError::PaddedName(" Simple Counter ".to_string()))
        );

        for blank in ["", "   "] {
            let mut keywordless = StateConfig::simple_counter();
            keywordless.actions[1].keyword = blank.to_string();
            assert_eq!(
                State::from_config(keywordless, 0),
                Err(ConfigError::MissingKeyword {
                    state: "Simple Counter".to_string(),
                    index: 1,
                })
            );
        }

        let mut broken = StateConfig::simple_counter();
        broken.render = "(cond ((< value 0) \"neg\"))".to_string();
        assert!(matches!(
            State::from_config(broken, 0),
            Err(ConfigError::Expression { .. })
        ));
    }

    #[test]
    fn failed_transition_leaves_value_unchanged() {
        let mut config = StateConfig::simple_counter();
        config.value = Some(serde_json::Value::from(2));
        config.actions.push(ActionConfig {
            keyword: "stringify".to_string(),
            prompt: String::new(),
            transition: "(concat value)".to_string(),
        });
        config.actions.push(ActionConfig {
            keyword: "explode".to_string(),
            prompt: String::new(),
            transition: "(/ value 0)".to_string(),
        });
        let mut state = State::from_config(config, 0).unwrap();

        assert!(matches!(state.apply(2), Err(StateError::KindChanged { .. })));
        assert!(matches!(state.apply(3), Err(StateError::Eval(_))));
        assert_eq!(state.peek_value(), Some(&Value::Integer(2)));

        assert_eq!(
            state.apply(0).unwrap(),
            (Value::Integer(2), Value::Integer(3))
        );
    }

    #[test]
    fn render_must_produce_text() {
        let mut config = StateConfig::simple_counter();
        config.render = "(+ value 1)".to_string();
        let mut state = State::from_config(config, 0).unwrap();
        assert_eq!(
            state.describe(),
            Err(StateError::RenderNotText(crate::interpreter::ValueKind::Number))
        );
    }

    #[test]
    fn non_finite_transition_is_rejected() {
        let mut config = StateConfig::template("Big");
        config.value = Some(serde_json::json!(1e308));
        config.actions.push(ActionConfig {
            keyword: "grow".to_string(),
            prompt: String::new(),
            transition: "(* value 10)".to_string(),
        });
        let mut state = State::from_config(config, 0).unwrap();

        assert_eq!(state.apply(0), Err(StateError::NotStorable));
        assert_eq!(state.peek_value(), Some(&Value::Float(1e308)));
        assert_eq!(state.to_config().value, Some(serde_json::json!(1e308)));
    }

    #[test]
    fn failing_initializers_leave_the_value_unset() {
        let mut null_initial = StateConfig::simple_counter();
        null_initial.initial = "null".to_string();
        let mut state = State::from_config(null_initial, 0).unwrap();
        assert_eq!(state.value(), Err(StateError::NullInitial));
        assert!(state.peek_value().is_none());

        let mut dividing = StateConfig::simple_counter();
        dividing.initial = "(/ 1 0)".to_string();
        let mut state = State::from_config(dividing, 0).unwrap();
        assert_eq!(
            state.value(),
            Err(StateError::Eval(crate::interpreter::EvalError::DivisionByZero))
        );
        assert!(matches!(state.apply(0), Err(StateError::Eval(_))));
        assert!(state.describe().is_err());
        assert!(state.peek_value().is_none());
    }
}
