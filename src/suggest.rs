//! Suggestion generation.
//!
//! Compares the decision model's predicted states against the caller's
//! reported current states and emits one discrete action per mismatch.

use crate::appliance::Appliance;
use crate::error::CoreError;
use std::collections::BTreeMap;

/// Caller-supplied current appliance states. May be partial; appliances left
/// out are treated as OFF.
pub type CurrentStates = BTreeMap<String, i64>;

/// Validates the caller's state map: every key must name one of the six
/// appliances and every value must be exactly 0 or 1. Violations report all
/// offending keys at once.
pub fn validate_current_states(current: &CurrentStates) -> Result<(), CoreError> {
    let unknown: Vec<&str> = current
        .keys()
        .map(String::as_str)
        .filter(|name| Appliance::from_name(name).is_none())
        .collect();
    if !unknown.is_empty() {
        return Err(CoreError::invalid_input(
            "current_states",
            format!("unknown appliance(s): {}", unknown.join(", ")),
        ));
    }

    let non_binary: Vec<&str> = current
        .iter()
        .filter(|&(_, &value)| value != 0 && value != 1)
        .map(|(name, _)| name.as_str())
        .collect();
    if !non_binary.is_empty() {
        return Err(CoreError::invalid_input(
            "current_states",
            format!(
                "state must be 0 (OFF) or 1 (ON) for: {}",
                non_binary.join(", ")
            ),
        ));
    }

    Ok(())
}

/// Emits "Turn ON <name>" / "Turn OFF <name>" for every controllable
/// appliance whose predicted state differs from the reported one.
///
/// Fridge never takes part in the model comparison; a caller explicitly
/// reporting it OFF gets a fixed "Turn ON Fridge" appended regardless of the
/// prediction.
pub fn generate_suggestions(
    predicted: &[bool; 5],
    current: &CurrentStates,
) -> Result<Vec<String>, CoreError> {
    validate_current_states(current)?;

    let mut suggestions = Vec::new();
    for (appliance, &predicted_on) in Appliance::CONTROLLABLE.iter().zip(predicted) {
        let current_on = current.get(appliance.name()).copied().unwrap_or(0) == 1;
        if current_on && !predicted_on {
            suggestions.push(format!("Turn OFF {appliance}"));
        } else if !current_on && predicted_on {
            suggestions.push(format!("Turn ON {appliance}"));
        }
    }

    if current.get(Appliance::Fridge.name()) == Some(&0) {
        suggestions.push(format!("Turn ON {}", Appliance::Fridge));
    }

    Ok(suggestions)
}
