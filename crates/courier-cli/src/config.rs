use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourierConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub schema_agent: SchemaAgentConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

// ── Completion engine ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_engine_base_url")]
    pub base_url: String,
    #[serde(default = "default_engine_model")]
    pub model: String,
    #[serde(default = "default_engine_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_engine_timeout")]
    pub timeout_secs: u64,
}

fn default_engine_base_url() -> String {
    courier_core::ollama::DEFAULT_OLLAMA_URL.to_string()
}

fn default_engine_model() -> String {
    courier_core::ollama::DEFAULT_MODEL.to_string()
}

fn default_engine_max_tokens() -> u32 {
    4096
}

fn default_engine_timeout() -> u64 {
    120
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: default_engine_base_url(),
            model: default_engine_model(),
            max_tokens: default_engine_max_tokens(),
            timeout_secs: default_engine_timeout(),
        }
    }
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ── Orchestrator ────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_orchestrator_port")]
    pub port: u16,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_reference_markers")]
    pub reference_markers: Vec<String>,
    #[serde(default = "default_schema_agent_url")]
    pub schema_agent_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub auth_token: String,
}

impl std::fmt::Debug for OrchestratorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestratorConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("system_prompt", &self.system_prompt)
            .field("temperature", &self.temperature)
            .field("reference_markers", &self.reference_markers)
            .field("schema_agent_url", &self.schema_agent_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("auth_token", &mask_secret(&self.auth_token))
            .finish()
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_orchestrator_port() -> u16 {
    8000
}

fn default_system_prompt() -> String {
    courier_core::router::DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_reference_markers() -> Vec<String> {
    courier_core::references::DEFAULT_REFERENCE_MARKERS
        .iter()
        .map(|m| m.to_string())
        .collect()
}

fn default_schema_agent_url() -> String {
    "http://localhost:8002".to_string()
}

fn default_request_timeout() -> u64 {
    300
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_orchestrator_port(),
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
            reference_markers: default_reference_markers(),
            schema_agent_url: default_schema_agent_url(),
            request_timeout_secs: default_request_timeout(),
            auth_token: String::new(),
        }
    }
}

impl OrchestratorConfig {
    pub fn routing(&self) -> courier_core::OrchestratorConfig {
        courier_core::OrchestratorConfig {
            system_prompt: self.system_prompt.clone(),
            temperature: self.temperature,
            reference_markers: self.reference_markers.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ── Schema agent ────────────────────────────────────────────────

/// Which engine answers schema-inference requests
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SchemaEngine {
    /// The configured completion engine
    #[default]
    Model,
    /// The deterministic rule-based inferencer; no model needed
    Rules,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SchemaAgentConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_schema_agent_port")]
    pub port: u16,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub engine: SchemaEngine,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<String>,
    #[serde(default)]
    pub auth_token: String,
}

impl std::fmt::Debug for SchemaAgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaAgentConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("temperature", &self.temperature)
            .field("engine", &self.engine)
            .field("base_dir", &self.base_dir)
            .field("auth_token", &mask_secret(&self.auth_token))
            .finish()
    }
}

fn default_schema_agent_port() -> u16 {
    8002
}

impl Default for SchemaAgentConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_schema_agent_port(),
            temperature: default_temperature(),
            engine: SchemaEngine::default(),
            base_dir: None,
            auth_token: String::new(),
        }
    }
}

impl SchemaAgentConfig {
    pub fn inference(&self) -> courier_core::SchemaAgentConfig {
        courier_core::SchemaAgentConfig {
            temperature: self.temperature,
            ..Default::default()
        }
    }
}

// ── Chat REPL ───────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_chat_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub auth_token: String,
}

impl std::fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatConfig")
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .field("auth_token", &mask_secret(&self.auth_token))
            .finish()
    }
}

fn default_chat_endpoint() -> String {
    "http://localhost:8000".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: default_chat_endpoint(),
            timeout_secs: default_request_timeout(),
            auth_token: String::new(),
        }
    }
}

impl ChatConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Mask a secret string for safe display in Debug output / logs.
/// Shows first 3 and last 4 chars for keys longer than 7 chars, otherwise "***".
fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 7 {
        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "***".to_string()
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".courier")
}

pub const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

impl CourierConfig {
    /// Load from `custom_path`, or from `~/.courier/config.toml`.
    ///
    /// A missing default file yields the built-in defaults; a missing custom
    /// file is an error.
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        let path = match custom_path {
            Some(path) => path.clone(),
            None => {
                let path = config_dir().join("config.toml");
                if !path.exists() {
                    info!("No config at {}, using defaults", path.display());
                    return Ok(Self::default());
                }
                path
            }
        };
        Self::load_from(&path)
    }

    fn load_from(path: &Path) -> Result<Self> {
        // Refuse group/world-readable configs: they may hold auth tokens
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = std::fs::metadata(path) {
                let mode = metadata.permissions().mode();
                if mode & 0o077 != 0 {
                    return Err(anyhow::anyhow!(
                        "Config file {:?} has overly permissive permissions ({:o}). \
                         It may contain secrets. Fix with: chmod 600 {:?}",
                        path,
                        mode & 0o777,
                        path
                    ));
                }
            }
        }

        let content = std::fs::read_to_string(path).with_context(|| {
            format!(
                "Failed to read config at {}. Run `courier init` first.",
                path.display()
            )
        })?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    /// Parse config text after expanding allowlisted `${VAR}` references
    pub fn parse(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);
        let config: Self = toml::from_str(&expanded)?;

        for (section, token) in [
            ("orchestrator", &config.orchestrator.auth_token),
            ("schema_agent", &config.schema_agent.auth_token),
            ("chat", &config.chat.auth_token),
        ] {
            if !token.is_empty() && !content.contains("${") {
                warn!(
                    "[{}] auth_token is hardcoded in config file. For security, use environment variables: auth_token = \"${{COURIER_A2A_TOKEN}}\"",
                    section
                );
            }
        }

        Ok(config)
    }
}

/// Allowlist of environment variable names that may be expanded in config files.
/// This prevents an attacker who can modify the config from reading arbitrary env vars.
const ALLOWED_ENV_VARS: &[&str] = &["COURIER_A2A_TOKEN", "OLLAMA_HOST", "HOME", "USER"];

fn expand_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let mut pos = 0;
    while pos < result.len() {
        let Some(start) = result[pos..].find("${") else {
            break;
        };
        let abs_start = pos + start;
        let Some(end) = result[abs_start..].find('}') else {
            break;
        };
        let var_name = result[abs_start + 2..abs_start + end].to_string();

        if !ALLOWED_ENV_VARS.contains(&var_name.as_str()) {
            warn!(
                "Skipping expansion of unrecognized env var '{}' in config (not in allowlist)",
                var_name
            );
            // Leave the ${VAR} unexpanded so it's obvious
            pos = abs_start + end + 1;
            continue;
        }

        let value = std::env::var(&var_name).unwrap_or_default();
        let value_len = value.len();
        result = format!(
            "{}{}{}",
            &result[..abs_start],
            value,
            &result[abs_start + end + 1..]
        );
        pos = abs_start + value_len; // Skip past the expanded value
    }
    result
}
