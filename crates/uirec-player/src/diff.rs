//! Which recorded UI-state fields differ from the live session, and in what
//! order they must be applied.

use serde_json::Value;

use uirec_core::ui_state::{is_commit_driven, ACTIVE_SELECTION, ACTIVE_VISUALIZER};
use uirec_core::UiState;

/// Fields of `target` that would change the `live` state.
///
/// Commit-driven fields are never part of the delta. Arrays on both sides
/// compare as sets, so a reordered selection is not a change.
pub fn diff_ui_state(target: &UiState, live: &UiState) -> UiState {
    target
        .iter()
        .filter(|(field, _)| !is_commit_driven(field))
        .filter(|(field, value)| match live.get(field.as_str()) {
            Some(current) => !same_value(value, current),
            None => true,
        })
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect()
}

fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(a), Value::Array(b)) => {
            a.iter().all(|x| b.contains(x)) && b.iter().all(|x| a.contains(x))
        }
        _ => a == b,
    }
}

/// How a delta is pushed into the session.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyPlan {
    /// Nothing changed.
    Nothing,
    /// One field, set directly. `settle` is false for a lone selection change.
    Single { fields: UiState, settle: bool },
    /// Several fields: visualizer first, then `fields`, then a deferred
    /// selection once the widgets have mounted.
    Batch {
        visualizer: Option<Value>,
        fields: UiState,
        selection: Option<Value>,
    },
}

/// Split a delta into the ordered steps that apply it.
pub fn plan_apply(delta: &UiState) -> ApplyPlan {
    match delta.len() {
        0 => ApplyPlan::Nothing,
        1 => ApplyPlan::Single {
            settle: !delta.contains_key(ACTIVE_SELECTION),
            fields: delta.clone(),
        },
        _ => {
            let mut fields = delta.clone();
            let visualizer = take_non_empty(&mut fields, ACTIVE_VISUALIZER);
            let selection = take_non_empty(&mut fields, ACTIVE_SELECTION);
            ApplyPlan::Batch {
                visualizer,
                fields,
                selection,
            }
        }
    }
}

/// Remove `field` from `fields` only when it holds something to apply.
fn take_non_empty(fields: &mut UiState, field: &str) -> Option<Value> {
    match fields.get(field) {
        Some(value) if is_non_empty(value) => fields.remove(field),
        _ => None,
    }
}

fn is_non_empty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
