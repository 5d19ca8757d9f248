//! Data model shared by the orchestrator, the decision oracle and the
//! remote dispatcher.
//!
//! Everything here is plain in-memory data owned by a single run. All types
//! derive [`serde::Serialize`] so they can be recorded in traces and run logs.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::trace::TraceEntry;
use crate::error::{CatalogError, RunError};

/// Identifier of a worker or a flow, as assigned by the registry.
pub type ActionId = String;

/// Whether a candidate action is a single worker or an ordered group of them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionKind {
    /// A single remote worker, invoked directly.
    Worker,
    /// An ordered group of workers, unrolled member by member.
    Flow { member_ids: Vec<ActionId> },
}

/// One entry of the catalog offered to the decision oracle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateAction {
    pub id: ActionId,
    pub display_name: String,
    pub description: String,
    /// Opaque tool definition handed to the decision process.
    pub parameter_schema: Value,
    #[serde(flatten)]
    pub kind: ActionKind,
}

impl CandidateAction {
    pub fn worker(
        id: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
        parameter_schema: Value,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            description: description.into(),
            parameter_schema,
            kind: ActionKind::Worker,
        }
    }

    pub fn flow(
        id: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
        parameter_schema: Value,
        member_ids: Vec<ActionId>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            description: description.into(),
            parameter_schema,
            kind: ActionKind::Flow { member_ids },
        }
    }

    pub fn is_flow(&self) -> bool {
        matches!(self.kind, ActionKind::Flow { .. })
    }

    /// Ordered member ids for a flow, `None` for a worker.
    pub fn member_ids(&self) -> Option<&[ActionId]> {
        match &self.kind {
            ActionKind::Flow { member_ids } => Some(member_ids),
            ActionKind::Worker => None,
        }
    }
}

/// The validated set of workers and flows available to one run.
///
/// Ids are unique and every flow has at least one member. Member ids are not
/// checked against the catalog here: an unknown member fails its flow with
/// [`RunError::UnknownAction`] once the flow is expanded, before any member
/// is dispatched.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Catalog {
    actions: Vec<CandidateAction>,
}

impl Catalog {
    pub fn new(actions: Vec<CandidateAction>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for action in &actions {
            if !seen.insert(action.id.as_str()) {
                return Err(CatalogError::DuplicateId(action.id.clone()));
            }
            if let Some(members) = action.member_ids() {
                if members.is_empty() {
                    return Err(CatalogError::EmptyFlow(action.id.clone()));
                }
            }
        }
        Ok(Self { actions })
    }

    pub fn actions(&self) -> &[CandidateAction] {
        &self.actions
    }

    pub fn get(&self, id: &str) -> Option<&CandidateAction> {
        self.actions.iter().find(|a| a.id == id)
    }

    /// Split the catalog into `(flows, workers)`, each in catalog order.
    pub fn partition(&self) -> (Vec<CandidateAction>, Vec<CandidateAction>) {
        self.actions.iter().cloned().partition(CandidateAction::is_flow)
    }

    /// Look up a flow.
    pub fn resolve_flow(&self, id: &str) -> Result<&CandidateAction, RunError> {
        match self.get(id) {
            Some(action) if action.is_flow() => Ok(action),
            _ => Err(RunError::UnknownAction { id: id.to_string() }),
        }
    }

    /// Ordered member ids of the flow `id`.
    pub fn flow_members(&self, id: &str) -> Result<&[ActionId], RunError> {
        self.resolve_flow(id)?
            .member_ids()
            .ok_or_else(|| RunError::UnknownAction { id: id.to_string() })
    }

    /// Look up a single worker.
    pub fn resolve_worker(&self, id: &str) -> Result<&CandidateAction, RunError> {
        match self.get(id) {
            Some(action) if !action.is_flow() => Ok(action),
            _ => Err(RunError::UnknownAction { id: id.to_string() }),
        }
    }
}

/// An action chosen by the decision oracle together with its call arguments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// Correlates the assistant tool call with the tool result that answers it.
    pub call_id: String,
    pub action_id: ActionId,
    pub args: Value,
}

/// One message of the running conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<Choice>,
    },
    Tool {
        call_id: String,
        name: String,
        content: String,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
        }
    }

    /// Assistant turn that requested exactly one action.
    pub fn tool_call(choice: Choice) -> Self {
        Message::Assistant {
            content: None,
            tool_calls: vec![choice],
        }
    }

    /// Tool result answering the call `call_id`.
    pub fn tool_result(call_id: impl Into<String>, name: impl Into<String>, content: String) -> Self {
        Message::Tool {
            call_id: call_id.into(),
            name: name.into(),
            content,
        }
    }
}

/// Messages plus the queue of flow members still to run.
///
/// A non-empty `agents_queue` means the run is inside a flow.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ConversationState {
    messages: Vec<Message>,
    agents_queue: VecDeque<ActionId>,
}

impl ConversationState {
    pub fn new(seed: Vec<Message>) -> Self {
        Self {
            messages: seed,
            agents_queue: VecDeque::new(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn queue(&self) -> &VecDeque<ActionId> {
        &self.agents_queue
    }

    /// Replace the (empty) queue with a flow's members, keeping their order.
    pub fn enqueue_flow(&mut self, members: &[ActionId]) {
        debug_assert!(self.agents_queue.is_empty());
        self.agents_queue.extend(members.iter().cloned());
    }

    pub fn next_in_flow(&self) -> Option<&ActionId> {
        self.agents_queue.front()
    }

    pub fn pop_next(&mut self) -> Option<ActionId> {
        self.agents_queue.pop_front()
    }
}

/// Outcome of a single remote worker invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub success: bool,
    pub output: Value,
    pub elapsed_seconds: f64,
}

/// Caller-facing result of one run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunResult {
    pub trace: Vec<TraceEntry>,
    pub response: String,
    pub is_success: bool,
}
