//! Decision oracle backed by a chat model through the `genai` client.
//!
//! Each decision is one streamed chat completion with the candidate actions
//! bound as tools. Streamed text is not shown anywhere; only the captured
//! final text and tool calls are used:
//!
//! - captured tool calls become proposals (the adapter keeps the last one);
//! - captured text becomes the plain reply.
//!
//! Forced mode binds only the target's tool and appends a system instruction
//! requiring that call. Whether the model complied is checked by the
//! [`crate::orchestration::DecisionAdapter`], not here.

use async_trait::async_trait;
use futures::StreamExt;
use genai::Client;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest, ChatStreamEvent, ToolCall, ToolResponse};
use uuid::Uuid;

use super::tools::define_tools;
use crate::error::OracleError;
use crate::orchestration::{
    CandidateAction, ChoiceMode, Choice, DecisionOracle, Message, OracleRequest, OracleResponse,
};

pub struct GenaiOracle {
    client: Client,
    model: String,
}

impl GenaiOracle {
    /// Create an oracle for `model`. The provider is inferred from the model
    /// name by `genai` (non-prefixed names default to Ollama).
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: Client::default(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl DecisionOracle for GenaiOracle {
    async fn propose(&self, request: OracleRequest<'_>) -> Result<OracleResponse, OracleError> {
        let chat_req = build_chat_request(&request);

        let chat_options = ChatOptions::default()
            .with_capture_content(true)
            .with_capture_tool_calls(true);

        let stream_res = self
            .client
            .exec_chat_stream(&self.model, chat_req, Some(&chat_options))
            .await
            .map_err(|e| OracleError::Transport(format!("LLM stream error: {e}")))?;

        let mut stream = stream_res.stream;
        let mut captured_text: Option<String> = None;
        let mut captured_tool_calls: Vec<ToolCall> = Vec::new();
        let mut ended = false;

        while let Some(event) = stream.next().await {
            match event {
                Ok(ChatStreamEvent::End(end)) => {
                    ended = true;
                    if let Some(text) = end.captured_first_text() {
                        captured_text = Some(text.to_string());
                    }
                    if let Some(calls) = end.captured_tool_calls() {
                        captured_tool_calls = calls.into_iter().cloned().collect();
                    }
                }
                Ok(_) => {
                    // Start, Chunk, ReasoningChunk, ToolCallChunk -- only the captured end matters.
                }
                Err(e) => {
                    tracing::warn!(model = %self.model, "LLM stream error: {e}");
                    // Continue -- the End event may still arrive.
                }
            }
        }

        if !ended {
            return Err(OracleError::Transport(
                "LLM stream ended without a final response".to_string(),
            ));
        }

        Ok(OracleResponse {
            proposals: captured_tool_calls.into_iter().map(choice_from_call).collect(),
            plain_reply: captured_text,
        })
    }
}

/// Convert history and catalog into a genai chat request.
fn build_chat_request(request: &OracleRequest<'_>) -> ChatRequest {
    let mut chat_req = ChatRequest::default();
    for message in request.history {
        chat_req = chat_req.append_message(to_chat_message(message));
    }

    let bound: Vec<CandidateAction> = match request.mode {
        ChoiceMode::Free => request.catalog.to_vec(),
        ChoiceMode::Forced { target } => {
            chat_req = chat_req.append_message(ChatMessage::system(format!(
                "Call the `{target}` tool now, with arguments taken from the conversation. \
                 Respond with that single tool call only."
            )));
            request
                .catalog
                .iter()
                .filter(|a| &a.id == target)
                .cloned()
                .collect()
        }
    };

    if !bound.is_empty() {
        chat_req = chat_req.with_tools(define_tools(&bound));
    }
    chat_req
}

fn to_chat_message(message: &Message) -> ChatMessage {
    match message {
        Message::System { content } => ChatMessage::system(content),
        Message::User { content } => ChatMessage::user(content),
        Message::Assistant {
            content,
            tool_calls,
        } if tool_calls.is_empty() => ChatMessage::assistant(content.clone().unwrap_or_default()),
        Message::Assistant { tool_calls, .. } => {
            let calls: Vec<ToolCall> = tool_calls
                .iter()
                .map(|c| ToolCall {
                    call_id: c.call_id.clone(),
                    fn_name: c.action_id.clone(),
                    fn_arguments: c.args.clone(),
                    thought_signatures: None,
                })
                .collect();
            ChatMessage::from(calls)
        }
        Message::Tool {
            call_id, content, ..
        } => ToolResponse::new(call_id.clone(), content.clone()).into(),
    }
}

fn choice_from_call(call: ToolCall) -> Choice {
    let call_id = if call.call_id.is_empty() {
        format!("call_{}", Uuid::new_v4().simple())
    } else {
        call.call_id
    };
    Choice {
        call_id,
        action_id: call.fn_name,
        args: call.fn_arguments,
    }
}
