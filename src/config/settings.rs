//! Application settings and configuration
//!
//! Settings come from environment variables (and a `.env` file when
//! present) with defaults suitable for local development.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Application environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    #[value(alias = "dev")]
    Development,
    #[value(alias = "stage")]
    Staging,
    #[value(alias = "prod")]
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => anyhow::bail!(
                "Invalid environment: {}. Expected: development, staging, or production",
                s
            ),
        }
    }
}

/// Retry budget applied to remote model and knowledge-base calls
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.base_delay_ms))
    }
}

/// Main application settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    // App settings
    pub app_name: String,
    pub app_version: String,
    pub environment: Environment,
    pub log_level: String,

    // Server settings
    pub host: String,
    pub port: u16,

    // Graph persistence
    pub graph_file: PathBuf,
    pub database_url: String,
    pub persist_to_database: bool,

    // AWS settings
    pub aws_region: String,
    pub bedrock_endpoint_url: Option<String>,
    pub knowledge_base_id: String,
    pub enrichment_model_id: String,

    // Ollama
    pub ollama_base_url: String,

    // Gemini
    #[serde(skip_serializing)]
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: Option<String>,

    // Outbound HTTP
    pub request_timeout_seconds: u64,

    // Retry policy for remote calls
    pub retry: RetrySettings,
}

impl Settings {
    /// Load settings from environment variables with defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let settings = Self {
            app_name: env_or_default("APP_NAME", &defaults.app_name),
            app_version: defaults.app_version,
            environment: env_or_default("ENVIRONMENT", "development")
                .parse()
                .unwrap_or_default(),
            log_level: env_or_default("LOG_LEVEL", "info"),

            host: env_or_default("HOST", &defaults.host),
            port: env_or_default("PORT", "5000")
                .parse()
                .context("Invalid PORT value")?,

            graph_file: env::var("GRAPH_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.graph_file),
            database_url: env_or_default("DATABASE_URL", &defaults.database_url),
            persist_to_database: env_or_default("PERSIST_TO_DATABASE", "false")
                .parse()
                .unwrap_or(false),

            aws_region: env::var("AWS_DEFAULT_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .unwrap_or(defaults.aws_region),
            bedrock_endpoint_url: env::var("BEDROCK_ENDPOINT_URL").ok(),
            knowledge_base_id: env_or_default("KNOWLEDGE_BASE_ID", &defaults.knowledge_base_id),
            enrichment_model_id: env_or_default(
                "ENRICHMENT_MODEL_ID",
                &defaults.enrichment_model_id,
            ),

            ollama_base_url: env_or_default("OLLAMA_API_URL", &defaults.ollama_base_url),

            gemini_api_key: env::var("GOOGLE_AI_API_KEY").ok(),
            gemini_model: env_or_default("GEMINI_MODEL", &defaults.gemini_model),
            gemini_base_url: env::var("GEMINI_BASE_URL").ok(),

            request_timeout_seconds: env_or_default("REQUEST_TIMEOUT_SECONDS", "30")
                .parse()
                .unwrap_or(30),

            retry: RetrySettings {
                max_retries: env_or_default("RETRY_MAX_RETRIES", "3")
                    .parse()
                    .unwrap_or(3),
                base_delay_ms: env_or_default("RETRY_BASE_DELAY_MS", "1000")
                    .parse()
                    .unwrap_or(1000),
            },
        };

        settings.validate()?;

        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("Port cannot be 0");
        }

        if self.retry.base_delay_ms == 0 {
            anyhow::bail!("Retry base delay must be > 0");
        }

        if self.request_timeout_seconds == 0 {
            anyhow::bail!("Request timeout must be > 0");
        }

        if self.gemini_api_key.is_none() {
            tracing::debug!("GOOGLE_AI_API_KEY not set; Gemini provider disabled");
        }

        Ok(())
    }

    /// Get the server address string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "neurograph".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: Environment::Development,
            log_level: "info".to_string(),
            host: "0.0.0.0".to_string(),
            port: 5000,
            graph_file: PathBuf::from("knowledge_graph.json"),
            database_url: "sqlite://knowledge_graph.db".to_string(),
            persist_to_database: false,
            aws_region: "us-east-1".to_string(),
            bedrock_endpoint_url: None,
            knowledge_base_id: "aif-c01-knowledge-base-quick-start-4uy41".to_string(),
            enrichment_model_id: "amazon.titan-text-express-v1".to_string(),
            ollama_base_url: "http://localhost:11434/api".to_string(),
            gemini_api_key: None,
            gemini_model: "gemini-pro".to_string(),
            gemini_base_url: None,
            request_timeout_seconds: 30,
            retry: RetrySettings::default(),
        }
    }
}

/// Helper function to get environment variable with default
fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
