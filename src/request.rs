//! Inbound run request.
//!
//! The registry sends one JSON document per run:
//!
//! ```json
//! {
//!   "message": "Translate this and summarise it",
//!   "agents": [
//!     {"agent_id": "a1", "agent_name": "Translator", "agent_description": "...",
//!      "agent_input_schema": {"type": "function", "function": {"name": "a1", "parameters": {}}}},
//!     {"agent_id": "f1", "agent_name": "Translate+Summarise", "agent_description": "...",
//!      "agent_input_schema": {}, "flow": ["a1", "a2"]}
//!   ],
//!   "configs": {"llm": {"system_prompt": "..."}},
//!   "files": [{"id": "file-1", "name": "notes.txt"}]
//! }
//! ```
//!
//! A descriptor carrying `flow` is a flow, anything else a single worker.

use serde::Deserialize;
use serde_json::Value;

use crate::agent::system_prompt::build_system_prompt;
use crate::error::{CatalogError, RequestError};
use crate::orchestration::{CandidateAction, Catalog, Message};

#[derive(Debug, Clone, Deserialize)]
pub struct RunRequest {
    pub message: String,
    #[serde(default)]
    pub agents: Vec<AgentDescriptor>,
    #[serde(default)]
    pub configs: RequestConfigs,
    #[serde(default)]
    pub files: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentDescriptor {
    pub agent_id: String,
    pub agent_name: String,
    #[serde(default)]
    pub agent_description: String,
    #[serde(default)]
    pub agent_input_schema: Value,
    #[serde(default)]
    pub flow: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestConfigs {
    #[serde(default)]
    pub llm: LlmOverrides,
}

/// Per-request overrides of the decision model settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LlmOverrides {
    pub system_prompt: Option<String>,
    pub model: Option<String>,
}

impl RunRequest {
    pub fn from_json(text: &str) -> Result<Self, RequestError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Build the validated catalog, preserving descriptor order.
    pub fn catalog(&self) -> Result<Catalog, CatalogError> {
        let actions = self
            .agents
            .iter()
            .map(|d| match &d.flow {
                Some(members) => CandidateAction::flow(
                    d.agent_id.clone(),
                    d.agent_name.clone(),
                    d.agent_description.clone(),
                    d.agent_input_schema.clone(),
                    members.clone(),
                ),
                None => CandidateAction::worker(
                    d.agent_id.clone(),
                    d.agent_name.clone(),
                    d.agent_description.clone(),
                    d.agent_input_schema.clone(),
                ),
            })
            .collect();
        Catalog::new(actions)
    }

    /// Seed conversation: system prompt followed by the user's message.
    ///
    /// The request's own system prompt wins over `default_system_prompt`.
    pub fn seed(&self, default_system_prompt: &str) -> Vec<Message> {
        let base = self
            .configs
            .llm
            .system_prompt
            .as_deref()
            .unwrap_or(default_system_prompt);
        let user = match self.files.as_deref() {
            Some(files) if !files.is_empty() => attach_files(&self.message, files),
            _ => self.message.clone(),
        };
        vec![Message::system(build_system_prompt(base)), Message::user(user)]
    }

    pub fn model_override(&self) -> Option<&str> {
        self.configs.llm.model.as_deref()
    }
}

/// Render file descriptors into the user's message as opaque JSON text.
pub fn attach_files(message: &str, files: &[Value]) -> String {
    let rendered = serde_json::to_string(files).unwrap_or_else(|_| "[]".to_string());
    format!("{message}\n\nFILES:\n{rendered}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::ActionKind;
    use serde_json::json;

    const REQUEST: &str = r#"{
        "message": "Make it sound friendly",
        "agents": [
            {"agent_id": "a1", "agent_name": "Tone Shifter", "agent_description": "Rewrites tone",
             "agent_input_schema": {"type": "function", "function": {"name": "a1", "parameters": {"type": "object"}}}},
            {"agent_id": "f1", "agent_name": "Rewrite Flow", "agent_description": "Two passes",
             "agent_input_schema": {}, "flow": ["a1", "a1"]}
        ],
        "configs": {"llm": {"system_prompt": "Be helpful."}},
        "files": [{"id": "file-1", "name": "draft.txt"}]
    }"#;

    #[test]
    fn descriptors_become_workers_and_flows() {
        let request = RunRequest::from_json(REQUEST).unwrap();
        let catalog = request.catalog().unwrap();

        let worker = catalog.get("a1").unwrap();
        assert_eq!(worker.kind, ActionKind::Worker);
        assert_eq!(worker.display_name, "Tone Shifter");
        assert_eq!(worker.parameter_schema["function"]["name"], "a1");

        let flow = catalog.get("f1").unwrap();
        assert_eq!(flow.member_ids().unwrap(), ["a1".to_string(), "a1".to_string()]);
    }

    #[test]
    fn seed_uses_request_prompt_and_attaches_files() {
        let request = RunRequest::from_json(REQUEST).unwrap();
        let seed = request.seed("default prompt");

        assert_eq!(seed.len(), 2);
        match &seed[0] {
            Message::System { content } => {
                assert!(content.starts_with("Be helpful."));
                assert!(!content.contains("default prompt"));
            }
            other => panic!("Expected system message, got: {other:?}"),
        }
        match &seed[1] {
            Message::User { content } => {
                assert!(content.starts_with("Make it sound friendly\n\nFILES:\n"));
                assert!(content.contains("draft.txt"));
            }
            other => panic!("Expected user message, got: {other:?}"),
        }
    }

    #[test]
    fn seed_falls_back_to_default_prompt_without_files() {
        let request = RunRequest::from_json(r#"{"message": "hi"}"#).unwrap();
        let seed = request.seed("default prompt");
        assert!(matches!(&seed[0], Message::System { content } if content.starts_with("default prompt")));
        assert_eq!(seed[1], Message::user("hi"));
        assert!(request.catalog().unwrap().actions().is_empty());
    }

    #[test]
    fn empty_flow_is_rejected() {
        let request = RunRequest::from_json(
            r#"{"message": "x", "agents": [{"agent_id": "f", "agent_name": "F", "flow": []}]}"#,
        )
        .unwrap();
        assert_eq!(request.catalog().unwrap_err(), CatalogError::EmptyFlow("f".into()));
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = RunRequest::from_json(r#"{"agents": []}"#).unwrap_err();
        assert!(matches!(err, RequestError::Malformed(_)));
    }

    #[test]
    fn attach_files_renders_json_array() {
        let text = attach_files("see attached", &[json!({"id": "f"})]);
        assert_eq!(text, "see attached\n\nFILES:\n[{\"id\":\"f\"}]");
    }
}
