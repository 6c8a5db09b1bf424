//! Configuration loading: YAML file with environment overrides.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Application settings with defaults that work against a local Ollama.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Chat model used for planning and step judging.
    pub chat_model: String,
    /// Base URL of the Ollama server.
    pub ollama_base_url: String,
    /// Sampling temperature; zero for consistency.
    pub llm_temperature: f32,
    /// Timeout for one inference call.
    pub llm_timeout_ms: u64,
    /// Timeout for one browser HTTP request.
    pub browser_timeout_ms: u64,
    /// Link-following depth of the pre-task crawl.
    pub crawl_depth: usize,
    /// Directory screenshots and the result record are written under.
    pub artifacts_dir: PathBuf,
    /// Context snippets requested from the knowledge base per task.
    pub context_k: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chat_model: "llama3.2".to_string(),
            ollama_base_url: "http://localhost:11434".to_string(),
            llm_temperature: 0.0,
            llm_timeout_ms: 60_000,
            browser_timeout_ms: 30_000,
            crawl_depth: 2,
            artifacts_dir: PathBuf::from("screenshots"),
            context_k: 5,
        }
    }
}

impl Settings {
    /// Load settings from an explicit path, `./config/config.yaml`, or
    /// the user config directory, falling back to defaults when no file
    /// exists. Environment variables override file values last.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let path = match config_path {
            Some(path) => path.clone(),
            None => {
                let local = PathBuf::from("config/config.yaml");
                if local.exists() {
                    local
                } else {
                    let mut fallback =
                        dirs::config_dir().context("failed to resolve config directory")?;
                    fallback.push("webagent");
                    fallback.push("config.yaml");
                    fallback
                }
            }
        };

        let mut settings = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            let parsed: Settings =
                serde_yaml::from_str(&content).context("failed to parse config file")?;
            info!(path = %path.display(), "loaded configuration");
            parsed
        } else {
            warn!(path = %path.display(), "config file not found, using defaults");
            Settings::default()
        };

        settings.apply_env_overrides();
        Ok(settings)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(model) = env::var("WEBAGENT_CHAT_MODEL") {
            self.chat_model = model;
        }
        if let Ok(base_url) = env::var("WEBAGENT_OLLAMA_BASE_URL") {
            self.ollama_base_url = base_url;
        }
        if let Ok(dir) = env::var("WEBAGENT_ARTIFACTS_DIR") {
            self.artifacts_dir = PathBuf::from(dir);
        }
        if let Ok(timeout) = env::var("WEBAGENT_BROWSER_TIMEOUT_MS") {
            match timeout.parse() {
                Ok(parsed) => self.browser_timeout_ms = parsed,
                Err(_) => warn!(value = %timeout, "ignoring invalid WEBAGENT_BROWSER_TIMEOUT_MS"),
            }
        }
    }
}
