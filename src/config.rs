//! Configuration for medroute.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (MEDROUTE_HOME, MEDROUTE_TOOLS_ENDPOINT,
//!    MEDROUTE_TOOLS_TOKEN)
//! 2. Config file (.medroute/config.yaml, discovered upward from the
//!    current directory)
//! 3. Defaults (~/.medroute, mock collaborators, policies enabled)

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::guardrails::default_unsafe_patterns;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub home: Option<String>,
    #[serde(default)]
    pub guardrails: Option<GuardrailsConfig>,
    #[serde(default)]
    pub tools: Option<ToolsConfig>,
    #[serde(default)]
    pub timeouts: Option<TimeoutsConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuardrailsConfig {
    /// Toggle PHI/PII redaction (detection and persistence-side)
    pub phi_redaction: Option<bool>,
    /// Override the harmful-intent pattern list
    pub unsafe_patterns: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolsConfig {
    /// "mock" or "http"
    pub mode: Option<String>,
    pub endpoint: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeoutsConfig {
    pub specialist_seconds: Option<u64>,
    pub tool_seconds: Option<u64>,
}

/// How external collaborators are reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolMode {
    /// Canned in-process responses
    Mock,
    /// Remote tool server over HTTP
    Http { endpoint: String, token: String },
}

/// Resolved configuration with absolute paths and defaults applied.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to medroute home (audit state)
    pub home: PathBuf,

    /// Whether PHI redaction policies are active
    pub phi_redaction: bool,

    /// Harmful-intent patterns for the guardrail enforcer
    pub unsafe_patterns: Vec<String>,

    /// Collaborator transport
    pub tool_mode: ToolMode,

    /// Bound on one specialist invocation
    pub specialist_timeout: Duration,

    /// Bound on one external tool call
    pub tool_timeout: Duration,

    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".medroute").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".medroute");

    let config_file = find_config_file();
    let file = config_file
        .as_deref()
        .map(load_config_file)
        .transpose()?;

    let home = if let Ok(env_home) = std::env::var("MEDROUTE_HOME") {
        PathBuf::from(env_home)
    } else if let Some(home) = file.as_ref().and_then(|f| f.home.clone()) {
        PathBuf::from(home)
    } else {
        default_home
    };

    let guardrails = file.as_ref().and_then(|f| f.guardrails.clone()).unwrap_or_default();
    let tools = file.as_ref().and_then(|f| f.tools.clone()).unwrap_or_default();
    let timeouts = file.as_ref().and_then(|f| f.timeouts.clone()).unwrap_or_default();

    // Env vars switch the tool transport on without a config file.
    let endpoint = std::env::var("MEDROUTE_TOOLS_ENDPOINT")
        .ok()
        .or(tools.endpoint);
    let token = std::env::var("MEDROUTE_TOOLS_TOKEN").ok().or(tools.token);

    let tool_mode = match (tools.mode.as_deref(), endpoint) {
        (Some("mock"), _) | (None, None) => ToolMode::Mock,
        (_, Some(endpoint)) => ToolMode::Http {
            endpoint,
            token: token.unwrap_or_default(),
        },
        (Some(other), None) => {
            anyhow::bail!("Tool mode '{}' requires an endpoint", other)
        }
    };

    Ok(ResolvedConfig {
        home,
        phi_redaction: guardrails.phi_redaction.unwrap_or(true),
        unsafe_patterns: guardrails
            .unsafe_patterns
            .unwrap_or_else(default_unsafe_patterns),
        tool_mode,
        specialist_timeout: Duration::from_secs(timeouts.specialist_seconds.unwrap_or(60)),
        tool_timeout: Duration::from_secs(timeouts.tool_seconds.unwrap_or(30)),
        config_file,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Get the audit directory ($MEDROUTE_HOME/audit)
pub fn audit_dir() -> Result<PathBuf> {
    Ok(config()?.home.join("audit"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".medroute");
        std::fs::create_dir_all(&dir).unwrap();

        let config_path = dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
home: /var/lib/medroute
guardrails:
  phi_redaction: false
  unsafe_patterns:
    - overdose
tools:
  mode: http
  endpoint: http://tools.internal:9000
  token: secret
timeouts:
  specialist_seconds: 15
"#
        )
        .unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.home.as_deref(), Some("/var/lib/medroute"));
        assert_eq!(config.guardrails.unwrap().phi_redaction, Some(false));
        assert_eq!(
            config.tools.unwrap().endpoint.as_deref(),
            Some("http://tools.internal:9000")
        );
        assert_eq!(config.timeouts.unwrap().specialist_seconds, Some(15));
    }

    #[test]
    fn test_defaults_applied() {
        let config = ResolvedConfig {
            home: PathBuf::from("/tmp/medroute"),
            phi_redaction: true,
            unsafe_patterns: default_unsafe_patterns(),
            tool_mode: ToolMode::Mock,
            specialist_timeout: Duration::from_secs(60),
            tool_timeout: Duration::from_secs(30),
            config_file: None,
        };

        assert!(config.phi_redaction);
        assert_eq!(config.tool_mode, ToolMode::Mock);
        assert!(!config.unsafe_patterns.is_empty());
    }
}
