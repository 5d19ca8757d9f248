//! HTTP implementation of the remote dispatcher.
//!
//! The HTTP path below is this crate's own deployment contract with the agent
//! router; routers that speak a session or websocket protocol need a
//! different [`RemoteDispatcher`] implementation.
//!
//! One request per dispatch: `POST {router_url}/agents/{worker_id}/invoke`
//! with the call arguments as the JSON body. The router answers with the
//! worker's envelope:
//!
//! ```json
//! {"is_success": true, "response": {...}, "execution_time": 1.42}
//! ```
//!
//! (`success` / `output` / `elapsed_seconds` are accepted as well.)
//!
//! Transport errors, timeouts, non-2xx statuses and undecodable bodies are all
//! reported as `success = false` with an `{"error": ...}` payload. There is no
//! retry.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::AppConfig;
use crate::orchestration::{DispatchResult, RemoteDispatcher};

/// Envelope returned by the router for one worker call.
#[derive(Debug, Deserialize)]
struct WorkerEnvelope {
    #[serde(alias = "is_success")]
    success: bool,
    #[serde(default, alias = "response")]
    output: Value,
    #[serde(default, alias = "execution_time")]
    elapsed_seconds: Option<f64>,
}

/// Dispatches worker calls through the agent router.
///
/// Holds a single pooled [`reqwest::Client`]; share one instance across all
/// concurrent runs.
#[derive(Clone)]
pub struct HttpDispatcher {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpDispatcher {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            timeout,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.router_url.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.dispatch_timeout_secs),
        )
    }

    pub fn invoke_url(&self, worker_id: &str) -> String {
        format!("{}/agents/{}/invoke", self.base_url, worker_id)
    }

    async fn call(&self, worker_id: &str, args: &Value) -> Result<WorkerEnvelope, String> {
        let mut request = self
            .http
            .post(self.invoke_url(worker_id))
            .json(args)
            .timeout(self.timeout);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-KEY", key);
        }

        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                format!("timed out after {}s", self.timeout.as_secs())
            } else {
                format!("request failed: {e}")
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(format!("router returned HTTP {status}: {body}"));
        }

        resp.json::<WorkerEnvelope>()
            .await
            .map_err(|e| format!("invalid worker response: {e}"))
    }
}

#[async_trait]
impl RemoteDispatcher for HttpDispatcher {
    async fn dispatch(&self, worker_id: &str, args: &Value) -> DispatchResult {
        let start = Instant::now();
        match self.call(worker_id, args).await {
            Ok(envelope) => DispatchResult {
                success: envelope.success,
                output: envelope.output,
                elapsed_seconds: envelope
                    .elapsed_seconds
                    .unwrap_or_else(|| start.elapsed().as_secs_f64()),
            },
            Err(message) => {
                tracing::warn!(worker = %worker_id, "Dispatch failed: {message}");
                DispatchResult {
                    success: false,
                    output: json!({ "error": message }),
                    elapsed_seconds: start.elapsed().as_secs_f64(),
                }
            }
        }
    }
}
