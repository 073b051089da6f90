//! Configuration loader
//!
//! Loads launch client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `SMARTLAUNCH_CLIENT_ID` is unset, falls back to a config file
//! 3. Probes multiple paths for config files
//! 4. Uses built-in defaults when no file exists anywhere
//!
//! ## Environment Variables
//! - `SMARTLAUNCH_CLIENT_ID`: Registered client id (required for env loading)
//! - `SMARTLAUNCH_REDIRECT_URI`: Redirect URI registered with the EHR
//! - `SMARTLAUNCH_SCOPES`: Space-separated scopes
//! - `SMARTLAUNCH_HTTP_TIMEOUT_SECS`: Per-request timeout
//! - `SMARTLAUNCH_HTTP_MAX_ATTEMPTS`: Attempts for idempotent requests
//! - `SMARTLAUNCH_HTTP_BASE_BACKOFF_MS`: Initial retry backoff
//! - `SMARTLAUNCH_CONFIG`: Explicit config file path
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./smartlaunch.{toml,json}` and `./config.{toml,json}`
//! 2. The same names in the parent and grandparent directories
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use smartlaunch_domain::{ClientConfig, Config, HttpConfig, Result, SmartError};

const ENV_CLIENT_ID: &str = "SMARTLAUNCH_CLIENT_ID";
const ENV_REDIRECT_URI: &str = "SMARTLAUNCH_REDIRECT_URI";
const ENV_SCOPES: &str = "SMARTLAUNCH_SCOPES";
const ENV_HTTP_TIMEOUT_SECS: &str = "SMARTLAUNCH_HTTP_TIMEOUT_SECS";
const ENV_HTTP_MAX_ATTEMPTS: &str = "SMARTLAUNCH_HTTP_MAX_ATTEMPTS";
const ENV_HTTP_BASE_BACKOFF_MS: &str = "SMARTLAUNCH_HTTP_BASE_BACKOFF_MS";
const ENV_CONFIG_PATH: &str = "SMARTLAUNCH_CONFIG";

const CONFIG_FILE_NAMES: [&str; 4] =
    ["smartlaunch.toml", "smartlaunch.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `SmartError::Config` if an environment value or the selected
/// file is invalid.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            let explicit = std::env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from);
            if explicit.is_none() && probe_config_paths().is_none() {
                tracing::info!("No config file found, using defaults");
                return Ok(Config::default());
            }
            load_from_file(explicit)
        }
    }
}

/// Load configuration from environment variables
///
/// Only `SMARTLAUNCH_CLIENT_ID` is required; every other value falls back to
/// its default.
///
/// # Errors
/// Returns `SmartError::Config` if the client id is missing or a numeric
/// value does not parse.
pub fn load_from_env() -> Result<Config> {
    let client_id = env_var(ENV_CLIENT_ID)?;
    let defaults = Config::default();

    let redirect_uri = std::env::var(ENV_REDIRECT_URI).unwrap_or(defaults.client.redirect_uri);
    let scopes = std::env::var(ENV_SCOPES)
        .ok()
        .map(|s| s.split_whitespace().map(str::to_string).collect::<Vec<_>>())
        .filter(|scopes| !scopes.is_empty())
        .unwrap_or(defaults.client.scopes);

    let http = HttpConfig {
        timeout_secs: env_parse(ENV_HTTP_TIMEOUT_SECS, defaults.http.timeout_secs)?,
        max_attempts: env_parse(ENV_HTTP_MAX_ATTEMPTS, defaults.http.max_attempts)?,
        base_backoff_ms: env_parse(ENV_HTTP_BASE_BACKOFF_MS, defaults.http.base_backoff_ms)?,
    };

    let config = Config { client: ClientConfig { client_id, redirect_uri, scopes }, http };
    validate(&config)?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `SmartError::Config` if the file is missing, unreadable, or
/// invalid.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(SmartError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            SmartError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| SmartError::Config(format!("Failed to read config file: {}", e)))?;

    let config = parse_config(&contents, &config_path)?;
    validate(&config)?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| SmartError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| SmartError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(SmartError::Config(format!("Unsupported config format: {}", extension))),
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.client.client_id.trim().is_empty() {
        return Err(SmartError::Config("client_id must not be empty".to_string()));
    }
    url::Url::parse(&config.client.redirect_uri).map_err(|e| {
        SmartError::Config(format!("Invalid redirect_uri {}: {}", config.client.redirect_uri, e))
    })?;
    if config.http.max_attempts == 0 {
        return Err(SmartError::Config("http.max_attempts must be at least 1".to_string()));
    }
    Ok(())
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
        }
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| SmartError::Config(format!("Missing required environment variable: {}", key)))
}

/// Parse an optional environment variable, falling back to `default` when
/// unset.
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| SmartError::Config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}
