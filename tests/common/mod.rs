//! Scripted collaborators shared by the orchestration integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use maestro::error::OracleError;
use maestro::orchestration::{
    CandidateAction, Choice, ChoiceMode, DecisionOracle, DispatchResult, OracleRequest,
    OracleResponse, RemoteDispatcher,
};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// What the oracle was asked on one consultation.
#[derive(Clone, Debug, PartialEq)]
pub struct Consultation {
    pub mode: ChoiceMode,
    pub catalog: Vec<String>,
    pub history_len: usize,
}

/// Oracle that plays back a fixed list of responses in order.
///
/// Running past the end of the script is reported as a transport error so a
/// test that consults the oracle more often than expected fails loudly.
pub struct ScriptedOracle {
    script: Mutex<VecDeque<Result<OracleResponse, OracleError>>>,
    seen: Mutex<Vec<Consultation>>,
}

impl ScriptedOracle {
    pub fn new(script: Vec<Result<OracleResponse, OracleError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn consultations(&self) -> Vec<Consultation> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl DecisionOracle for ScriptedOracle {
    async fn propose(&self, request: OracleRequest<'_>) -> Result<OracleResponse, OracleError> {
        self.seen.lock().unwrap().push(Consultation {
            mode: request.mode.clone(),
            catalog: request.catalog.iter().map(|a| a.id.clone()).collect(),
            history_len: request.history.len(),
        });
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(OracleError::Transport("script exhausted".to_string())))
    }
}

/// Dispatcher answering from a per-worker table, echoing the args otherwise.
#[derive(Default)]
pub struct ScriptedDispatcher {
    answers: HashMap<String, DispatchResult>,
    calls: Mutex<Vec<(String, Value)>>,
    cancel_on_call: Option<CancellationToken>,
}

impl ScriptedDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, worker_id: &str, success: bool, output: Value) -> Self {
        self.answers.insert(
            worker_id.to_string(),
            DispatchResult {
                success,
                output,
                elapsed_seconds: 0.5,
            },
        );
        self
    }

    /// Cancel `token` on the first call and never answer.
    pub fn hang_and_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel_on_call = Some(token);
        self
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteDispatcher for ScriptedDispatcher {
    async fn dispatch(&self, worker_id: &str, args: &Value) -> DispatchResult {
        self.calls
            .lock()
            .unwrap()
            .push((worker_id.to_string(), args.clone()));
        if let Some(token) = &self.cancel_on_call {
            token.cancel();
            std::future::pending::<()>().await;
        }
        self.answers.get(worker_id).cloned().unwrap_or(DispatchResult {
            success: true,
            output: json!({ "echo": args }),
            elapsed_seconds: 0.5,
        })
    }
}

/// A free-mode answer that picks no flow.
pub fn no_flow() -> Result<OracleResponse, OracleError> {
    Ok(OracleResponse::reply("no flow"))
}

pub fn call(call_id: &str, action_id: &str, args: Value) -> Choice {
    Choice {
        call_id: call_id.to_string(),
        action_id: action_id.to_string(),
        args,
    }
}

pub fn worker(id: &str, name: &str) -> CandidateAction {
    CandidateAction::worker(id, name, format!("{name} worker"), json!({"type": "object"}))
}

pub fn flow(id: &str, name: &str, members: &[&str]) -> CandidateAction {
    CandidateAction::flow(
        id,
        name,
        format!("{name} flow"),
        json!({}),
        members.iter().map(|m| m.to_string()).collect(),
    )
}

pub fn forced(target: &str) -> ChoiceMode {
    ChoiceMode::Forced {
        target: target.to_string(),
    }
}
