use serde::Deserialize;
use std::path::PathBuf;

/// The TOML file structure for maestro.toml.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    pub general: Option<GeneralConfig>,
    pub router: Option<RouterConfig>,
    pub run: Option<RunConfig>,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub log_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RouterConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub dispatch_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct RunConfig {
    pub max_rounds: Option<usize>,
    /// Keep the partial trace in the envelope of a cancelled run.
    pub partial_trace_on_cancel: Option<bool>,
}

impl ConfigFile {
    /// Flatten the sectioned file into a mergeable [`PartialConfig`].
    pub fn into_partial(self) -> PartialConfig {
        let general = self.general;
        let router = self.router;
        let run = self.run;
        PartialConfig {
            model: general.as_ref().and_then(|g| g.model.clone()),
            system_prompt: general.as_ref().and_then(|g| g.system_prompt.clone()),
            log_dir: general.and_then(|g| g.log_dir).map(PathBuf::from),
            router_url: router.as_ref().and_then(|r| r.url.clone()),
            api_key: router.as_ref().and_then(|r| r.api_key.clone()),
            dispatch_timeout_secs: router.and_then(|r| r.dispatch_timeout_secs),
            max_rounds: run.as_ref().and_then(|r| r.max_rounds),
            partial_trace_on_cancel: run.and_then(|r| r.partial_trace_on_cancel),
        }
    }
}

/// Fully-resolved runtime configuration. All fields have values.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model: String,
    pub system_prompt: String,
    pub log_dir: PathBuf,
    pub router_url: String,
    pub api_key: Option<String>,
    pub dispatch_timeout_secs: u64,
    pub max_rounds: usize,
    pub partial_trace_on_cancel: bool,
}

/// Partial config used during merge. All fields are Option so that
/// missing fields don't override lower-priority values.
#[derive(Debug, Clone, Default)]
pub struct PartialConfig {
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub log_dir: Option<PathBuf>,
    pub router_url: Option<String>,
    pub api_key: Option<String>,
    pub dispatch_timeout_secs: Option<u64>,
    pub max_rounds: Option<usize>,
    pub partial_trace_on_cancel: Option<bool>,
}
