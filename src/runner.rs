//! Request-level entry point.
//!
//! [`Runner`] turns one raw run request into a [`RunResult`]: it decodes the
//! request, builds the catalog and conversation seed, picks the decision
//! model, drives the [`Orchestrator`] and writes the JSONL run log. The
//! dispatcher (and its connection pool) is shared by every run executed
//! through the same runner.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::agent::genai_oracle::GenaiOracle;
use crate::agent::logging::RunLogger;
use crate::config::AppConfig;
use crate::exec::HttpDispatcher;
use crate::orchestration::{DecisionOracle, Orchestrator, RemoteDispatcher, RunOptions, RunResult};
use crate::request::RunRequest;

/// Builds the decision oracle for a model name.
pub type OracleFactory = Arc<dyn Fn(&str) -> Arc<dyn DecisionOracle> + Send + Sync>;

#[derive(Clone)]
pub struct Runner {
    config: AppConfig,
    dispatcher: Arc<dyn RemoteDispatcher>,
    oracle_factory: OracleFactory,
}

impl Runner {
    pub fn new(
        config: AppConfig,
        dispatcher: Arc<dyn RemoteDispatcher>,
        oracle_factory: OracleFactory,
    ) -> Self {
        Self {
            config,
            dispatcher,
            oracle_factory,
        }
    }

    /// Production wiring: HTTP dispatcher and a `genai` backed oracle.
    pub fn from_config(config: AppConfig) -> Self {
        let dispatcher = Arc::new(HttpDispatcher::from_config(&config));
        let factory: OracleFactory =
            Arc::new(|model: &str| Arc::new(GenaiOracle::new(model)) as Arc<dyn DecisionOracle>);
        Self::new(config, dispatcher, factory)
    }

    /// Execute one request. Never fails; problems are reported in the envelope.
    pub async fn execute(&self, request_json: &str, cancel: &CancellationToken) -> RunResult {
        let run_id = Uuid::new_v4().to_string();
        let mut logger = match RunLogger::new(&self.config.log_dir, &run_id) {
            Ok(logger) => Some(logger),
            Err(e) => {
                tracing::warn!(run_id = %run_id, "Run log unavailable: {e:#}");
                None
            }
        };

        let prepared = RunRequest::from_json(request_json)
            .and_then(|request| Ok((request.catalog()?, request)));
        let (catalog, request) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::error!(run_id = %run_id, "Rejected run request: {e}");
                let response = format!("An error occurred: RequestError - {e}");
                log_or_warn(&mut logger, |l| l.log_error(&response));
                return RunResult {
                    trace: Vec::new(),
                    response,
                    is_success: false,
                };
            }
        };

        let model = request
            .model_override()
            .unwrap_or(&self.config.model)
            .to_string();
        let (flows, workers) = catalog.partition();
        tracing::info!(run_id = %run_id, model = %model, "Running orchestration");
        log_or_warn(&mut logger, |l| {
            l.log_run_start(&model, flows.len(), workers.len(), &request.message)
        });

        let orchestrator = Orchestrator::new(
            (self.oracle_factory)(&model),
            self.dispatcher.clone(),
            RunOptions {
                max_rounds: self.config.max_rounds,
                partial_trace_on_cancel: self.config.partial_trace_on_cancel,
                ..RunOptions::default()
            },
        );
        let result = orchestrator
            .run(&catalog, request.seed(&self.config.system_prompt), cancel)
            .await;

        log_or_warn(&mut logger, |l| l.log_run_end(&result));
        result
    }
}

/// Run-log failures never fail the run.
fn log_or_warn(
    logger: &mut Option<RunLogger>,
    write: impl FnOnce(&mut RunLogger) -> anyhow::Result<()>,
) {
    if let Some(l) = logger.as_mut() {
        if let Err(e) = write(&mut *l) {
            tracing::warn!(path = %l.log_path().display(), "Failed to write run log: {e:#}");
        }
    }
}
