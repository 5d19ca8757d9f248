//! The orchestration control loop.
//!
//! A run is an explicit four-state machine:
//!
//! ```text
//!            +-----------------------------+
//!            v                             |
//!  SELECT --(flow chosen)--> EXPAND_FLOW --+
//!    |  \
//!    |   +--(worker chosen / queue head)--> DISPATCH --(success)--> SELECT
//!    |                                         |
//!    +--(no choice)--> TERMINATED <--(failure)-+
//! ```
//!
//! Flow scope is derived from the pending queue alone: while it is non-empty,
//! `SELECT` skips the top-level decision, asks the oracle (forced mode) only
//! for the queue head's arguments, and the dispatch is recorded under the
//! flow's trace entry instead of at top level.
//!
//! Exactly one external call is outstanding at any time. Every await is raced
//! against the run's [`CancellationToken`].

use std::future::Future;
use std::sync::Arc;

use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use super::dispatcher::RemoteDispatcher;
use super::oracle::{ChoiceMode, DecisionAdapter, DecisionOracle};
use super::trace::{FLOW_FIELD, TraceEntry, TraceRecorder};
use super::types::{ActionId, CandidateAction, Catalog, Choice, ConversationState, Message, RunResult};
use crate::error::RunError;

/// Per-run limits and policies.
#[derive(Clone, Debug)]
pub struct RunOptions {
    /// Maximum number of `SELECT` rounds before the run is aborted.
    pub max_rounds: usize,
    /// Keep the trace recorded so far when a run is cancelled.
    pub partial_trace_on_cancel: bool,
    /// Name recorded on top-level decision entries for single workers.
    pub decision_name: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_rounds: 25,
            partial_trace_on_cancel: true,
            decision_name: "orchestrator".to_string(),
        }
    }
}

/// States of a run. `Terminated` carries the final reply of a successful run;
/// failures leave the machine through `Err`.
#[derive(Debug)]
enum Step {
    Select,
    ExpandFlow { flow_id: ActionId, call_id: String },
    Dispatch { choice: Choice, in_flow: bool },
    Terminated(String),
}

/// Mutable state of one run. Never shared between runs.
struct Run<'a> {
    catalog: &'a Catalog,
    flows: Vec<CandidateAction>,
    workers: Vec<CandidateAction>,
    state: ConversationState,
    trace: TraceRecorder,
    rounds: usize,
}

/// Drives runs against a shared oracle and dispatcher.
///
/// Cheap to clone; one instance can serve any number of concurrent runs since
/// all per-run state lives inside [`Orchestrator::run`].
#[derive(Clone)]
pub struct Orchestrator {
    adapter: DecisionAdapter,
    dispatcher: Arc<dyn RemoteDispatcher>,
    options: RunOptions,
}

impl Orchestrator {
    pub fn new(
        oracle: Arc<dyn DecisionOracle>,
        dispatcher: Arc<dyn RemoteDispatcher>,
        options: RunOptions,
    ) -> Self {
        Self {
            adapter: DecisionAdapter::new(oracle),
            dispatcher,
            options,
        }
    }

    /// Execute one run to completion and wrap the outcome in a [`RunResult`].
    ///
    /// Never fails: every [`RunError`] becomes a failed envelope whose trace
    /// holds what was recorded before the failure.
    pub async fn run(
        &self,
        catalog: &Catalog,
        seed: Vec<Message>,
        cancel: &CancellationToken,
    ) -> RunResult {
        let (flows, workers) = catalog.partition();
        tracing::info!(
            flows = flows.len(),
            workers = workers.len(),
            "Starting orchestration run"
        );

        let mut run = Run {
            catalog,
            flows,
            workers,
            state: ConversationState::new(seed),
            trace: TraceRecorder::new(),
            rounds: 0,
        };

        match self.drive(&mut run, cancel).await {
            Ok(response) => {
                tracing::info!(
                    rounds = run.rounds,
                    entries = run.trace.entries().len(),
                    "Run finished successfully"
                );
                RunResult {
                    trace: run.trace.into_entries(),
                    response,
                    is_success: true,
                }
            }
            Err(err) => {
                let trace = match err {
                    RunError::Cancelled if !self.options.partial_trace_on_cancel => Vec::new(),
                    _ => run.trace.into_entries(),
                };
                let response = err.to_response();
                match err {
                    RunError::Cancelled => tracing::warn!(rounds = run.rounds, "Run cancelled"),
                    _ => tracing::error!(rounds = run.rounds, kind = err.kind(), "{err}"),
                }
                RunResult {
                    trace,
                    response,
                    is_success: false,
                }
            }
        }
    }

    async fn drive(&self, run: &mut Run<'_>, cancel: &CancellationToken) -> Result<String, RunError> {
        let mut step = Step::Select;
        loop {
            if cancel.is_cancelled() {
                return Err(RunError::Cancelled);
            }
            step = match step {
                Step::Select => self.select(run, cancel).await?,
                Step::ExpandFlow { flow_id, call_id } => self.expand_flow(run, &flow_id, call_id)?,
                Step::Dispatch { choice, in_flow } => {
                    self.dispatch(run, choice, in_flow, cancel).await?
                }
                Step::Terminated(response) => return Ok(response),
            };
        }
    }

    async fn select(&self, run: &mut Run<'_>, cancel: &CancellationToken) -> Result<Step, RunError> {
        run.rounds += 1;
        if run.rounds > self.options.max_rounds {
            return Err(RunError::RoundLimitExceeded {
                limit: self.options.max_rounds,
            });
        }

        if let Some(head) = run.state.next_in_flow().cloned() {
            return self.select_flow_member(run, head, cancel).await;
        }

        let input = last_message_json(&run.state);

        // The flows catalog is always consulted first, even when it is empty.
        tracing::debug!(round = run.rounds, "Consulting oracle for a flow");
        let decision = cancellable(
            cancel,
            self.adapter
                .decide(run.state.messages(), &run.flows, ChoiceMode::Free),
        )
        .await??;

        if let Some(choice) = decision.choice.clone() {
            let flow = run.catalog.resolve_flow(&choice.action_id)?;
            tracing::info!(flow = %flow.display_name, id = %flow.id, "Flow selected");
            run.trace.add_top_level(
                TraceEntry::new(
                    flow.display_name.clone(),
                    input,
                    decision.to_trace_output(),
                    true,
                )
                .with_id(flow.id.clone()),
            );
            let flow_id = flow.id.clone();
            let call_id = choice.call_id.clone();
            run.state.push(Message::tool_call(choice));
            return Ok(Step::ExpandFlow { flow_id, call_id });
        }

        tracing::debug!(round = run.rounds, "Consulting oracle for a single agent");
        let decision = cancellable(
            cancel,
            self.adapter
                .decide(run.state.messages(), &run.workers, ChoiceMode::Free),
        )
        .await??;

        match decision.choice.clone() {
            Some(choice) => {
                let worker = run.catalog.resolve_worker(&choice.action_id)?;
                tracing::info!(agent = %worker.display_name, id = %worker.id, "Agent selected");
                run.trace.add_top_level(TraceEntry::new(
                    self.options.decision_name.clone(),
                    input,
                    decision.to_trace_output(),
                    true,
                ));
                run.state.push(Message::tool_call(choice.clone()));
                Ok(Step::Dispatch {
                    choice,
                    in_flow: false,
                })
            }
            None => Ok(Step::Terminated(decision.plain_reply.unwrap_or_default())),
        }
    }

    /// Inside a flow: the member is fixed, the oracle only supplies its args.
    ///
    /// Every member still queued is resolved before the oracle is asked, so an
    /// unknown member fails the flow up front, before its first dispatch.
    async fn select_flow_member(
        &self,
        run: &mut Run<'_>,
        head: ActionId,
        cancel: &CancellationToken,
    ) -> Result<Step, RunError> {
        let remaining = run
            .state
            .queue()
            .iter()
            .map(|id| run.catalog.resolve_worker(id).cloned())
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(round = run.rounds, member = %head, "Resolving arguments for flow member");
        let choice = cancellable(
            cancel,
            self.adapter
                .decide_forced(run.state.messages(), &remaining, &head),
        )
        .await??;

        run.state.push(Message::tool_call(choice.clone()));
        Ok(Step::Dispatch {
            choice,
            in_flow: true,
        })
    }

    fn expand_flow(&self, run: &mut Run<'_>, flow_id: &str, call_id: String) -> Result<Step, RunError> {
        let members = run.catalog.flow_members(flow_id)?;
        tracing::info!(flow = %flow_id, members = members.len(), "Expanding flow");

        run.state.enqueue_flow(members);
        // Answer the flow's tool call so the history stays well-formed.
        let ack = json!({ "flow": flow_id, "members": members, "status": "started" });
        run.state
            .push(Message::tool_result(call_id, flow_id, ack.to_string()));
        Ok(Step::Select)
    }

    async fn dispatch(
        &self,
        run: &mut Run<'_>,
        choice: Choice,
        in_flow: bool,
        cancel: &CancellationToken,
    ) -> Result<Step, RunError> {
        if in_flow {
            run.state.pop_next();
        }
        let worker = run.catalog.resolve_worker(&choice.action_id)?;
        let name = worker.display_name.clone();

        tracing::info!(agent = %name, id = %choice.action_id, args = %choice.args, "Executing agent");
        let result = cancellable(
            cancel,
            self.dispatcher.dispatch(&choice.action_id, &choice.args),
        )
        .await?;

        let entry = TraceEntry::new(
            name.clone(),
            choice.args.clone(),
            result.output.clone(),
            result.success,
        )
        .with_id(choice.action_id.clone())
        .with_elapsed(result.elapsed_seconds);
        if in_flow {
            run.trace.add_nested(FLOW_FIELD, entry)?;
        } else {
            run.trace.add_top_level(entry);
        }

        if !result.success {
            tracing::error!(agent = %name, id = %choice.action_id, "Agent failed");
            return Err(RunError::RemoteExecution {
                id: choice.action_id,
                name,
                output: output_text(&result.output),
            });
        }

        tracing::info!(
            agent = %name,
            id = %choice.action_id,
            "Agent executed successfully in {:.2} seconds",
            result.elapsed_seconds
        );
        run.state.push(Message::tool_result(
            choice.call_id,
            choice.action_id,
            result.output.to_string(),
        ));
        Ok(Step::Select)
    }
}

/// Await `fut` unless the run is cancelled first.
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Result<T, RunError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RunError::Cancelled),
        out = fut => Ok(out),
    }
}

fn last_message_json(state: &ConversationState) -> Value {
    state
        .last_message()
        .and_then(|m| serde_json::to_value(m).ok())
        .unwrap_or(Value::Null)
}

/// Plain strings stay unquoted in error messages.
fn output_text(output: &Value) -> String {
    match output {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
