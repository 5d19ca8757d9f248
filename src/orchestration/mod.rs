//! Orchestration core.
//!
//! Provides the [`orchestrator::Orchestrator`] control loop together with the
//! contracts of its two external collaborators ([`oracle::DecisionOracle`] and
//! [`dispatcher::RemoteDispatcher`]), the [`trace::TraceRecorder`] and the
//! shared [`types`]. Nothing in here performs I/O directly.

pub mod dispatcher;
pub mod oracle;
pub mod orchestrator;
pub mod trace;
pub mod types;

pub use dispatcher::RemoteDispatcher;
pub use oracle::{ChoiceMode, Decision, DecisionAdapter, DecisionOracle, OracleRequest, OracleResponse};
pub use orchestrator::{Orchestrator, RunOptions};
pub use trace::{FLOW_FIELD, TraceEntry, TraceRecorder};
pub use types::{
    ActionId, ActionKind, CandidateAction, Catalog, Choice, ConversationState, DispatchResult,
    Message, RunResult,
};
