//! Tool schema definitions for the decision oracle.
//!
//! Each candidate action becomes one [`genai::chat::Tool`] named after the
//! action **id**, never its display name, so two agents sharing a name can
//! still be told apart in the model's tool calls.
//!
//! Registry schemas arrive either as OpenAI-style tool definitions
//! (`{"type": "function", "function": {"parameters": ...}}`) or as a bare
//! JSON schema; both are accepted.

use genai::chat::Tool;
use serde_json::{Value, json};

use crate::orchestration::CandidateAction;

/// Define one tool per candidate action, in catalog order.
pub fn define_tools(catalog: &[CandidateAction]) -> Vec<Tool> {
    catalog
        .iter()
        .map(|action| {
            Tool::new(action.id.clone())
                .with_description(tool_description(action))
                .with_schema(parameters_schema(&action.parameter_schema))
        })
        .collect()
}

/// The JSON schema of the call arguments.
pub fn parameters_schema(schema: &Value) -> Value {
    if let Some(function) = schema.get("function") {
        return function
            .get("parameters")
            .cloned()
            .unwrap_or_else(empty_object_schema);
    }
    if schema.get("type").is_some() || schema.get("properties").is_some() {
        return schema.clone();
    }
    empty_object_schema()
}

/// Prefer the catalog description, fall back to the schema's own.
fn tool_description(action: &CandidateAction) -> String {
    if !action.description.trim().is_empty() {
        return format!("{}: {}", action.display_name, action.description);
    }
    action
        .parameter_schema
        .pointer("/function/description")
        .and_then(Value::as_str)
        .map(|d| format!("{}: {}", action.display_name, d))
        .unwrap_or_else(|| action.display_name.clone())
}

fn empty_object_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}
