//! Action dispatch
//!
//! Applies the transitions named by the markers in a generated message.
//!
//! Order of application: states in registry order, then actions in
//! declaration order, then marker occurrences left to right. Each occurrence
//! applies the transition once, so `<!-- increment -->` written twice adds two.
//! A keyword shared by several active states is applied to each of them.
//! Markers for unknown keywords or inactive states are ignored.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::pattern::scan_markers;
use super::registry::Registry;
use super::turn::{AppliedTransition, TransitionFailure};

/// Result of one dispatch pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchOutcome {
    /// Number of well-formed markers found
    pub markers: usize,
    /// Markers that matched no action of an active state
    pub ignored: usize,
    /// Transitions applied
    pub applied: Vec<AppliedTransition>,
    /// Transitions rejected
    pub failures: Vec<TransitionFailure>,
}

impl DispatchOutcome {
    /// Whether any state value changed.
    pub fn changed(&self) -> bool {
        !self.applied.is_empty()
    }
}

/// Scan `text` and apply every matching transition to `registry` in place.
pub fn dispatch(registry: &mut Registry, text: &str) -> DispatchOutcome {
    let markers = scan_markers(text);
    let mut outcome = DispatchOutcome {
        markers: markers.len(),
        ..DispatchOutcome::default()
    };
    if markers.is_empty() {
        return outcome;
    }

    let mut matched: HashSet<usize> = HashSet::new();

    for state in registry.iter_mut().filter(|state| state.is_active()) {
        for index in 0..state.actions().len() {
            let keyword = state.actions()[index].keyword().to_string();
            let occurrences: Vec<usize> = markers
                .iter()
                .enumerate()
                .filter(|(_, marker)| marker.keyword == keyword)
                .map(|(position, _)| position)
                .collect();

            for position in occurrences {
                matched.insert(position);
                match state.apply(index) {
                    Ok((before, after)) => {
                        debug!(state = %state.name(), %keyword, %before, %after, "applied transition");
                        outcome.applied.push(AppliedTransition {
                            state: state.name().to_string(),
                            keyword: keyword.clone(),
                            before: before.to_json(),
                            after: after.to_json(),
                        });
                    }
                    Err(err) => {
                        warn!(state = %state.name(), %keyword, error = %err, "transition rejected");
                        outcome.failures.push(TransitionFailure {
                            state: state.name().to_string(),
                            keyword: keyword.clone(),
                            error: err.to_string(),
                        });
                    }
                }
            }
        }
    }

    outcome.ignored = markers.len() - matched.len();
    if outcome.ignored > 0 {
        debug!(ignored = outcome.ignored, "ignored markers without an active action");
    }
    outcome
}
