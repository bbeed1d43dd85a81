use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AgentGraphError, Result};

/// Top-level agentgraph configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Treat any import issue as a failure in the CLI.
    #[serde(default)]
    pub fail_on_issues: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub hide_secrets: bool,
    #[serde(default)]
    pub skip_links: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepModeSetting {
    #[default]
    Run,
    Step,
    Breakpoints,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub step_mode: StepModeSetting,
    /// Event kinds to pause on when `step_mode = "breakpoints"`.
    #[serde(default)]
    pub breakpoints: Vec<String>,
    #[serde(default = "default_control_buffer")]
    pub control_buffer: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            step_mode: StepModeSetting::default(),
            breakpoints: Vec::new(),
            control_buffer: default_control_buffer(),
        }
    }
}

fn default_control_buffer() -> usize {
    16
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "agentgraph=info,warn".to_string()
}

impl AppConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                AgentGraphError::ConfigNotFound(path.display().to_string())
            }
            _ => AgentGraphError::Io(e),
        })?;

        let expanded = expand_env_vars(&content);

        toml::from_str(&expanded).map_err(|e| AgentGraphError::Config(e.to_string()))
    }

    /// Load `path` if it exists, defaults otherwise. Parse errors still fail.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| AgentGraphError::Config(e.to_string()))
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                // Unset variables stay literal.
                Err(_) => result.push_str(&format!("${{{}}}", var_name)),
            }
        } else {
            result.push(c);
        }
    }
    result
}
