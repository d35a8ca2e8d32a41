//! `ExecutionContext`: the per-run state an in-flight `execute()` call owns exclusively.
//! Created when a task starts, discarded when it returns — never shared across concurrent
//! runs, since the engine only ever runs one task at a time.

use std::collections::HashMap;

use crate::ast::ValueRef;
use crate::error::EngineError;

pub struct ExecutionContext {
    pub task_name: String,
    /// Keyed by lowercased parameter name — parameters compare case-insensitively.
    pub parameters: HashMap<String, String>,
    /// Keyed by the exact identifier as written in `extract` (case-sensitive).
    pub extracted_values: HashMap<String, String>,
    pub declared_outputs: Vec<String>,
    pub current_step_index: usize,
    pub current_step_name: String,
    pub screenshot_paths: Vec<String>,
    pub total_tokens_used: u64,
}

impl ExecutionContext {
    pub fn new(task_name: String, parameters: HashMap<String, String>) -> Self {
        Self {
            task_name,
            parameters,
            extracted_values: HashMap::new(),
            declared_outputs: Vec::new(),
            current_step_index: 0,
            current_step_name: String::new(),
            screenshot_paths: Vec::new(),
            total_tokens_used: 0,
        }
    }

    /// Resolves a `Type`/`Select` value: literals pass through verbatim; parameter references
    /// check `parameters` first (case-insensitively), then fall back to `extracted_values`
    /// (case-sensitively) — parameters win on collision, a deliberate choice since a parameter
    /// is an explicit caller input and should never be silently shadowed by a same-named extract.
    pub fn resolve_value(&self, value: &ValueRef) -> Result<String, EngineError> {
        if !value.is_param {
            return Ok(value.value.clone());
        }
        let lowered = value.value.to_lowercase();
        if let Some(v) = self.parameters.get(&lowered) {
            return Ok(v.clone());
        }
        if let Some(v) = self.extracted_values.get(&value.value) {
            return Ok(v.clone());
        }
        Err(EngineError::MissingInput(value.value.clone()))
    }

    pub fn record_extract(&mut self, name: &str, value: String) {
        self.extracted_values.insert(name.to_string(), value);
    }

    pub fn record_output(&mut self, name: &str) {
        if !self.declared_outputs.iter().any(|n| n == name) {
            self.declared_outputs.push(name.to_string());
        }
    }

    pub fn record_screenshot(&mut self, path: String) {
        if !path.is_empty() {
            self.screenshot_paths.push(path);
        }
    }

    pub fn last_screenshot(&self) -> Option<String> {
        self.screenshot_paths.last().cloned()
    }

    pub fn record_tokens(&mut self, input_tokens: u32, output_tokens: u32) {
        self.total_tokens_used += u64::from(input_tokens) + u64::from(output_tokens);
    }

    /// Builds the result's `outputs` map: each declared output name looked up in
    /// `extracted_values`, in declaration order; entries with no matching extract are omitted
    /// (this is how an `if`-branch-only extract that didn't run stays silently absent).
    pub fn outputs(&self) -> HashMap<String, String> {
        self.declared_outputs
            .iter()
            .filter_map(|name| self.extracted_values.get(name).map(|v| (name.clone(), v.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with_params(pairs: &[(&str, &str)]) -> ExecutionContext {
        let params = pairs.iter().map(|(k, v)| (k.to_lowercase(), v.to_string())).collect();
        ExecutionContext::new("t".to_string(), params)
    }

    #[test]
    fn literal_value_passes_through() {
        let ctx = ctx_with_params(&[]);
        assert_eq!(ctx.resolve_value(&ValueRef::literal("hi")).unwrap(), "hi");
    }

    #[test]
    fn parameter_lookup_is_case_insensitive_extract_is_not() {
        let mut ctx = ctx_with_params(&[("Name", "Ada")]);
        assert_eq!(ctx.resolve_value(&ValueRef::param("name")).unwrap(), "Ada");
        assert_eq!(ctx.resolve_value(&ValueRef::param("NAME")).unwrap(), "Ada");

        ctx.record_extract("Total", "42".to_string());
        assert_eq!(ctx.resolve_value(&ValueRef::param("Total")).unwrap(), "42");
        assert!(ctx.resolve_value(&ValueRef::param("total")).is_err());
    }

    #[test]
    fn parameters_win_over_extracted_values_on_collision() {
        let mut ctx = ctx_with_params(&[("total", "param-value")]);
        ctx.record_extract("total", "extracted-value".to_string());
        assert_eq!(ctx.resolve_value(&ValueRef::param("total")).unwrap(), "param-value");
    }

    #[test]
    fn missing_parameter_is_missing_input() {
        let ctx = ctx_with_params(&[]);
        let err = ctx.resolve_value(&ValueRef::param("nope")).unwrap_err();
        assert!(matches!(err, EngineError::MissingInput(name) if name == "nope"));
    }

    #[test]
    fn outputs_omit_undeclared_or_unextracted_names() {
        let mut ctx = ctx_with_params(&[]);
        ctx.record_extract("a", "1".to_string());
        ctx.record_output("a");
        ctx.record_output("b"); // declared but never extracted (e.g. the untaken if-branch)
        let outputs = ctx.outputs();
        assert_eq!(outputs.get("a"), Some(&"1".to_string()));
        assert_eq!(outputs.get("b"), None);
    }

    #[test]
    fn record_output_is_idempotent() {
        let mut ctx = ctx_with_params(&[]);
        ctx.record_extract("a", "1".to_string());
        ctx.record_output("a");
        ctx.record_output("a");
        assert_eq!(ctx.declared_outputs, vec!["a".to_string()]);
    }
}
