pub mod merge;
pub mod schema;

pub use schema::*;

use crate::cli::{Cli, Commands};
use crate::error::ConfigError;
use anyhow::Context;
use std::path::Path;

/// Load configuration by merging global, explicit-file, environment and CLI sources.
/// Precedence: CLI > environment > `--config` file > global config > defaults.
///
/// A missing global config is handled gracefully (defaults apply); an explicit
/// `--config` file must exist and parse.
pub fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    // Layer 1: Global config (~/.config/maestro/maestro.toml or platform equivalent)
    let global = load_global_config();

    // Layer 2: Explicit config file passed on the command line
    let explicit = match cli_config_path(cli) {
        Some(path) => load_explicit_config(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => PartialConfig::default(),
    };

    // Layer 3: Environment
    let env = env_to_partial(|key| std::env::var(key).ok());

    // Layer 4: CLI args (converted to PartialConfig)
    let cli_partial = cli_to_partial(cli);

    let config = cli_partial
        .with_fallback(env)
        .with_fallback(explicit)
        .with_fallback(global)
        .finalize();

    Ok(config)
}

/// Load global config from the platform-specific config directory.
/// Returns empty PartialConfig if file not found.
fn load_global_config() -> PartialConfig {
    let path = global_config_path();
    match path {
        Some(p) => load_toml_file(&p).unwrap_or_default(),
        None => {
            tracing::debug!("Could not determine global config directory");
            PartialConfig::default()
        }
    }
}

/// Load and parse a TOML config file into a PartialConfig.
/// Returns None on file-not-found; parse errors are logged and ignored.
fn load_toml_file(path: &Path) -> Option<PartialConfig> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match parse_config(path, &contents) {
            Ok(partial) => {
                tracing::info!("Loaded config from {}", path.display());
                Some(partial)
            }
            Err(e) => {
                tracing::warn!("Config parse error: {}", e);
                None
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            None
        }
        Err(e) => {
            tracing::warn!("Failed to read config at {}: {}", path.display(), e);
            None
        }
    }
}

/// Load a config file the user asked for explicitly. Unlike the global file,
/// failures here are errors.
pub fn load_explicit_config(path: &Path) -> Result<PartialConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let partial = parse_config(path, &contents)?;
    tracing::info!("Loaded config from {}", path.display());
    Ok(partial)
}

fn parse_config(path: &Path, contents: &str) -> Result<PartialConfig, ConfigError> {
    toml::from_str::<ConfigFile>(contents)
        .map(ConfigFile::into_partial)
        .map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Resolve the platform-specific global config path.
/// Linux: ~/.config/maestro/maestro.toml
/// macOS: ~/Library/Application Support/maestro/maestro.toml
fn global_config_path() -> Option<std::path::PathBuf> {
    directories::ProjectDirs::from("", "", "maestro")
        .map(|dirs| dirs.config_dir().join("maestro.toml"))
}

fn cli_config_path(cli: &Cli) -> Option<&Path> {
    match &cli.command {
        Commands::Run { config, .. } => config.as_deref(),
        Commands::Catalog { .. } => None,
    }
}

/// Read `MAESTRO_*` variables through `lookup`.
pub fn env_to_partial(lookup: impl Fn(&str) -> Option<String>) -> PartialConfig {
    PartialConfig {
        model: lookup("MAESTRO_MODEL"),
        router_url: lookup("MAESTRO_ROUTER_URL"),
        api_key: lookup("MAESTRO_API_KEY"),
        log_dir: lookup("MAESTRO_LOG_DIR").map(std::path::PathBuf::from),
        ..Default::default()
    }
}

/// Convert CLI arguments to a PartialConfig for merging.
fn cli_to_partial(cli: &Cli) -> PartialConfig {
    match &cli.command {
        Commands::Run {
            model,
            router_url,
            timeout,
            max_rounds,
            ..
        } => PartialConfig {
            model: model.clone(),
            router_url: router_url.clone(),
            dispatch_timeout_secs: *timeout,
            max_rounds: *max_rounds,
            ..Default::default()
        },
        Commands::Catalog { .. } => PartialConfig::default(),
    }
}
