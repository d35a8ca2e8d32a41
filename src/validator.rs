//! Static checks over a parsed `TaskDefinition`.
//!
//! Every check accumulates into one ordered list of messages rather than failing fast, so a task
//! author sees every problem in a single pass.

use std::collections::HashSet;

use crate::ast::{Action, TaskDefinition};
use crate::error::ValidationError;

/// Runs every static check against `task`, returning `Ok(())` or the full list of violations.
pub fn validate(task: &TaskDefinition) -> Result<(), ValidationError> {
    let mut messages = Vec::new();

    if task.steps.is_empty() {
        messages.push("task must declare at least one step".to_string());
    }

    let mut extracted: HashSet<String> = HashSet::new();
    for step in &task.steps {
        let new = check_actions(&step.actions, &task.inputs, &extracted, 0, &mut messages);
        extracted.extend(new);
    }

    if let Some(handler) = &task.on_timeout {
        check_actions(&handler.actions, &task.inputs, &extracted, 0, &mut messages);
    }
    if let Some(handler) = &task.on_error {
        check_actions(&handler.actions, &task.inputs, &extracted, 0, &mut messages);
    }

    if messages.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { messages })
    }
}

/// Walks `actions` depth-first, checking output/extract ordering, parameter references, and
/// `if` nesting. Returns the set of variable names newly extracted within this list (including
/// ones surfaced from nested `if` branches), for the caller to fold into its own running set.
fn check_actions(
    actions: &[Action],
    inputs: &[String],
    entry_extracted: &HashSet<String>,
    depth: usize,
    messages: &mut Vec<String>,
) -> HashSet<String> {
    let mut local = entry_extracted.clone();

    for action in actions {
        match action {
            Action::Extract { variable_name, .. } => {
                local.insert(variable_name.clone());
            }
            Action::Output { variable_name } => {
                if !local.contains(variable_name) {
                    messages.push(format!(
                        "output `{variable_name}` has no preceding extract of the same name"
                    ));
                }
            }
            Action::Type { value, .. } | Action::Select { value, .. } => {
                if value.is_param && !inputs.iter().any(|i| i == &value.value) {
                    messages.push(format!(
                        "parameter `{}` is not a declared task input",
                        value.value
                    ));
                }
            }
            Action::IfScreenShows { condition, then_actions, else_actions } => {
                if depth > 0 {
                    messages.push(format!(
                        "nested `if screen shows \"{condition}\"` is not allowed"
                    ));
                    continue;
                }
                let then_new = check_actions(then_actions, inputs, &local, depth + 1, messages);
                let else_new = match else_actions {
                    Some(actions) => check_actions(actions, inputs, &local, depth + 1, messages),
                    None => HashSet::new(),
                };
                local.extend(then_new);
                local.extend(else_new);
            }
            _ => {}
        }
    }

    local.difference(entry_extracted).cloned().collect()
}
