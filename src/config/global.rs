//! Global configuration.
//!
//! Loaded from ~/.config/flow/flow.yml or .flow.yml

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::refine::RefineConfig;

/// Global configuration for Flow.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Thresholds for flagging and accepting edits.
    pub refine: RefineConfig,

    /// Highlight-mode presentation.
    pub highlight: HighlightConfig,

    /// Inference service settings.
    pub models: ModelsConfig,

    /// Sentence-level parallelism.
    pub concurrency: ConcurrencyConfig,
}

impl Config {
    /// Load configuration with fallback chain.
    ///
    /// Search order:
    /// 1. Explicit path if provided
    /// 2. .flow.yml in current directory
    /// 3. ~/.config/flow/flow.yml
    /// 4. Defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // Explicit path takes precedence
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project config
        let project_config = PathBuf::from(".flow.yml");
        if project_config.exists() {
            match Self::load_from_file(&project_config) {
                Ok(config) => {
                    log::info!("Loaded config from .flow.yml");
                    return Ok(config);
                }
                Err(e) => {
                    log::warn!("Failed to load .flow.yml: {}", e);
                }
            }
        }

        // Try user config
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("flow").join("flow.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", user_config.display());
                        return Ok(config);
                    }
                    Err(e) => {
                        log::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.refine.validate().context("refine section")?;
        if self.concurrency.max_sentences == 0 {
            eyre::bail!("concurrency.max-sentences must be > 0");
        }
        if self.highlight.top_suggestions == 0 {
            eyre::bail!("highlight.top-suggestions must be > 0");
        }
        if self.models.timeout_ms == 0 {
            eyre::bail!("models.timeout-ms must be > 0");
        }
        Ok(())
    }
}

/// Highlight-mode presentation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// Suggestions shown per flagged word.
    #[serde(rename = "top-suggestions")]
    pub top_suggestions: usize,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self { top_suggestions: 3 }
    }
}

/// Inference service settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Base URL of the inference server.
    pub endpoint: String,

    /// Timeout per inference call in milliseconds.
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Masked language model identifier.
    #[serde(rename = "masked-lm")]
    pub masked_lm: String,

    /// Sentence embedding model identifier.
    pub embedding: String,

    /// Entailment model identifier.
    pub entailment: String,

    /// POS/morphology tagger identifier.
    pub tagger: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8765".to_string(),
            timeout_ms: 60_000,
            masked_lm: "roberta-base".to_string(),
            embedding: "all-MiniLM-L6-v2".to_string(),
            entailment: "roberta-large-mnli".to_string(),
            tagger: "en_core_web_sm".to_string(),
        }
    }
}

/// Sentence-level parallelism.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Sentences refined concurrently in automatic and highlight modes.
    #[serde(rename = "max-sentences")]
    pub max_sentences: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self { max_sentences: 1 }
    }
}
