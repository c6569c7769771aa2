//! Configuration management for the dispute triage pipeline

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub artifacts: ArtifactsConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub duplicates: DuplicatesConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming dispute submissions
    pub dispute_subject: String,
    /// Subject for outgoing classified dispute records
    pub record_subject: String,
    /// Subject for incoming duplicate-scan requests
    pub scan_subject: String,
    /// Subject for outgoing duplicate candidate pairs
    pub duplicate_subject: String,
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    /// Directory containing model.onnx, tokenizer.json, pca.json and
    /// classifier.json
    pub dir: String,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_onnx_threads() -> usize {
    1
}

/// Generative-language service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the chat-completions API
    pub base_url: String,
    /// Model identifier sent with each request
    pub model: String,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    /// Retry budget for a single prompt
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base backoff delay in milliseconds, doubled per attempt
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// Completion token cap per prompt
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_max_tokens() -> u32 {
    80
}

/// Duplicate detector configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DuplicatesConfig {
    /// Maximum gap between two charges considered duplicates, in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: i64,
}

fn default_window_secs() -> i64 {
    300
}

impl Default for DuplicatesConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
        }
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Number of disputes classified in parallel
    pub workers: usize,
    /// Per-dispute processing timeout in milliseconds. Sized above the
    /// worst-case LLM retry ladder so the client timeout fires first.
    pub timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                dispute_subject: "disputes.submitted".to_string(),
                record_subject: "disputes.classified".to_string(),
                scan_subject: "transactions.scan".to_string(),
                duplicate_subject: "transactions.duplicates".to_string(),
            },
            artifacts: ArtifactsConfig {
                dir: "artifacts".to_string(),
                onnx_threads: 1,
            },
            llm: LlmConfig {
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-3.5-turbo".to_string(),
                api_key_env: default_api_key_env(),
                timeout_secs: default_llm_timeout_secs(),
                max_attempts: default_max_attempts(),
                backoff_ms: default_backoff_ms(),
                max_tokens: default_max_tokens(),
            },
            duplicates: DuplicatesConfig::default(),
            pipeline: PipelineConfig {
                workers: 4,
                timeout_ms: 120_000,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.nats.url, "nats://localhost:4222");
        assert_eq!(config.duplicates.window_secs, 300);
        assert_eq!(config.llm.max_attempts, 3);
        assert_eq!(config.llm.timeout_secs, 30);
        assert_eq!(config.pipeline.workers, 4);
    }

    #[test]
    fn test_llm_defaults_apply() {
        // Only required fields; serde defaults fill the rest.
        let toml = r#"
            base_url = "http://localhost:8080/v1"
            model = "test-model"
        "#;
        let llm: LlmConfig = Config::builder()
            .add_source(File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(llm.backoff_ms, 500);
        assert_eq!(llm.max_tokens, 80);
    }
}
