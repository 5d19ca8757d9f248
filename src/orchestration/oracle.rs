//! Decision oracle contract and the adapter that enforces it.
//!
//! A [`DecisionOracle`] is the external decision process (a language model in
//! production, a scripted stub in tests). It returns raw proposals; the
//! [`DecisionAdapter`] reduces them to at most one [`Choice`]:
//!
//! - when several actions are proposed in one turn, only the **last** one is
//!   honored;
//! - in [`ChoiceMode::Forced`] exactly one choice naming the forced target must
//!   come back, anything else is a [`RunError::ForcedChoiceViolation`].
//!
//! The adapter knows nothing about flows or workers; the orchestrator decides
//! which catalog subset and which mode to use.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};

use super::types::{ActionId, CandidateAction, Choice, Message};
use crate::error::{OracleError, RunError};

/// How the oracle may answer.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ChoiceMode {
    /// Any action from the catalog, or none at all (a plain reply).
    Free,
    /// Exactly one call to `target`.
    Forced { target: ActionId },
}

/// Everything the oracle gets to see for one decision.
#[derive(Clone, Debug, Serialize)]
pub struct OracleRequest<'a> {
    pub history: &'a [Message],
    pub catalog: &'a [CandidateAction],
    pub mode: &'a ChoiceMode,
}

/// Raw answer of the decision process.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct OracleResponse {
    /// Proposed actions, in the order the decision process emitted them.
    pub proposals: Vec<Choice>,
    pub plain_reply: Option<String>,
}

impl OracleResponse {
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            proposals: Vec::new(),
            plain_reply: Some(text.into()),
        }
    }

    pub fn call(choice: Choice) -> Self {
        Self {
            proposals: vec![choice],
            plain_reply: None,
        }
    }
}

#[async_trait]
pub trait DecisionOracle: Send + Sync {
    async fn propose(&self, request: OracleRequest<'_>) -> Result<OracleResponse, OracleError>;
}

/// A reduced oracle answer: at most one honored choice.
#[derive(Clone, Debug, PartialEq)]
pub struct Decision {
    pub choice: Option<Choice>,
    pub plain_reply: Option<String>,
}

impl Decision {
    /// Trace payload for this decision. Discarded proposals never appear.
    pub fn to_trace_output(&self) -> Value {
        json!({
            "choice": self.choice,
            "plain_reply": self.plain_reply,
        })
    }
}

/// Applies the tie-break and forced-choice rules on top of a raw oracle.
#[derive(Clone)]
pub struct DecisionAdapter {
    oracle: Arc<dyn DecisionOracle>,
}

impl DecisionAdapter {
    pub fn new(oracle: Arc<dyn DecisionOracle>) -> Self {
        Self { oracle }
    }

    pub async fn decide(
        &self,
        history: &[Message],
        catalog: &[CandidateAction],
        mode: ChoiceMode,
    ) -> Result<Decision, RunError> {
        let (choice, plain_reply) = self.consult(history, catalog, &mode).await?;
        let choice = match &mode {
            ChoiceMode::Free => choice,
            ChoiceMode::Forced { target } => Some(forced_choice(target, choice)?),
        };
        Ok(Decision { choice, plain_reply })
    }

    /// Forced mode where only the choice matters: the plain reply is dropped.
    pub async fn decide_forced(
        &self,
        history: &[Message],
        catalog: &[CandidateAction],
        target: &str,
    ) -> Result<Choice, RunError> {
        let mode = ChoiceMode::Forced {
            target: target.to_string(),
        };
        let (choice, _) = self.consult(history, catalog, &mode).await?;
        forced_choice(target, choice)
    }

    /// One oracle round trip reduced to the last proposal.
    async fn consult(
        &self,
        history: &[Message],
        catalog: &[CandidateAction],
        mode: &ChoiceMode,
    ) -> Result<(Option<Choice>, Option<String>), RunError> {
        let response = self
            .oracle
            .propose(OracleRequest {
                history,
                catalog,
                mode,
            })
            .await?;

        let proposed = response.proposals.len();
        let choice = response.proposals.into_iter().last();
        if proposed > 1 {
            tracing::debug!(
                proposed,
                honored = choice.as_ref().map(|c| c.action_id.as_str()).unwrap_or_default(),
                "Multiple actions proposed, keeping the last"
            );
        }
        Ok((choice, response.plain_reply))
    }
}

/// A forced answer must be exactly one call to `target`.
fn forced_choice(target: &str, choice: Option<Choice>) -> Result<Choice, RunError> {
    match choice {
        None => Err(RunError::ForcedChoiceViolation {
            expected: target.to_string(),
            detail: "no action was chosen".to_string(),
        }),
        Some(c) if c.action_id != target => Err(RunError::ForcedChoiceViolation {
            expected: target.to_string(),
            detail: format!("'{}' was chosen instead", c.action_id),
        }),
        Some(c) => Ok(c),
    }
}
