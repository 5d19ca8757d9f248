use super::schema::{AppConfig, PartialConfig};
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "llama3.2";
pub const DEFAULT_ROUTER_URL: &str = "http://localhost:8080";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an orchestrator. Complete the user's task by \
    delegating work to the available agents and flows. Call one of them when it can do the \
    work; when nothing more needs to be done, answer the user directly.";

impl PartialConfig {
    /// Merge self with a lower-priority fallback.
    /// Self's non-None values take precedence.
    pub fn with_fallback(self, fallback: PartialConfig) -> PartialConfig {
        PartialConfig {
            model: self.model.or(fallback.model),
            system_prompt: self.system_prompt.or(fallback.system_prompt),
            log_dir: self.log_dir.or(fallback.log_dir),
            router_url: self.router_url.or(fallback.router_url),
            api_key: self.api_key.or(fallback.api_key),
            dispatch_timeout_secs: self.dispatch_timeout_secs.or(fallback.dispatch_timeout_secs),
            max_rounds: self.max_rounds.or(fallback.max_rounds),
            partial_trace_on_cancel: self
                .partial_trace_on_cancel
                .or(fallback.partial_trace_on_cancel),
        }
    }

    /// Convert to AppConfig, filling any remaining gaps with defaults.
    pub fn finalize(self) -> AppConfig {
        AppConfig {
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            system_prompt: self
                .system_prompt
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            log_dir: self.log_dir.unwrap_or_else(default_log_dir),
            router_url: self
                .router_url
                .unwrap_or_else(|| DEFAULT_ROUTER_URL.to_string()),
            api_key: self.api_key,
            dispatch_timeout_secs: self.dispatch_timeout_secs.unwrap_or(120),
            max_rounds: self.max_rounds.unwrap_or(25),
            partial_trace_on_cancel: self.partial_trace_on_cancel.unwrap_or(true),
        }
    }
}

/// `{platform data dir}/runs`, or `./.maestro-logs` when no home is known.
fn default_log_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "maestro")
        .map(|dirs| dirs.data_dir().join("runs"))
        .unwrap_or_else(|| PathBuf::from("./.maestro-logs"))
}
