//! Configuration management for the job agent

use crate::error::{JobAgentError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub llm: LlmConfig,
    pub paths: PathConfig,
    pub prompts: PromptConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub generation_model: String,
    pub embedding_model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    /// Per-request deadline; `None` blocks until the service answers
    pub request_timeout_secs: Option<u64>,
    pub embedding_backend: EmbeddingBackend,
    pub model2vec_model: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    Gemini,
    Model2Vec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub catalogue: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Fail a stage instead of substituting "" for a placeholder with no value
    pub strict_placeholders: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub color_output: bool,
    pub pretty_json: bool,
    pub timestamped_runs: bool,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = PathBuf::from("data");

        Self {
            llm: LlmConfig {
                base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                generation_model: "gemini-2.5-flash".to_string(),
                embedding_model: "models/text-embedding-004".to_string(),
                api_key_env: "GOOGLE_API_KEY".to_string(),
                request_timeout_secs: None,
                embedding_backend: EmbeddingBackend::Gemini,
                model2vec_model: "minishlab/potion-base-8M".to_string(),
            },
            paths: PathConfig {
                input_dir: data_dir.join("input"),
                output_dir: data_dir.join("output"),
                catalogue: PathBuf::from("templates").join("system_prompts.yaml"),
            },
            prompts: PromptConfig {
                strict_placeholders: false,
            },
            output: OutputConfig {
                color_output: true,
                pretty_json: true,
                timestamped_runs: true,
            },
        }
    }
}

impl Config {
    /// Load from the default location, writing defaults on first use
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| JobAgentError::Configuration(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| JobAgentError::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("job-agent")
            .join("config.toml")
    }

    /// Ensure the data directories exist
    pub fn validate(&self) -> Result<()> {
        std::fs::create_dir_all(&self.paths.input_dir)?;
        std::fs::create_dir_all(&self.paths.output_dir)?;
        Ok(())
    }

    /// Read the model API key from the environment (after `.env` is loaded)
    pub fn api_key(&self) -> Result<String> {
        match std::env::var(&self.llm.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(JobAgentError::Configuration(format!(
                "{} is missing. Please add it to your .env file.",
                self.llm.api_key_env
            ))),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.llm.request_timeout_secs.map(Duration::from_secs)
    }

    /// Resolve a user-supplied document path, falling back to the input directory
    pub fn resolve_input(&self, file: &Path) -> PathBuf {
        if file.exists() || file.is_absolute() {
            file.to_path_buf()
        } else {
            self.paths.input_dir.join(file)
        }
    }
}
