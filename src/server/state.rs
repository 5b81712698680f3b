//! Application state container
//!
//! Shared state handed to every handler through Axum's state extraction.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::{
    build_aws_config, create_agent_runtime_client, create_bedrock_client,
    create_bedrock_runtime_client, Settings,
};
use crate::db;
use crate::error::ApiError;
use crate::retry::{presets, Executor};
use crate::services::{
    BedrockService, GeminiConfig, GeminiService, GraphService, KnowledgeBaseService,
    OllamaService, TextGenerator,
};

/// Text-generation providers reachable through the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Bedrock,
    Ollama,
    Gemini,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Bedrock => write!(f, "bedrock"),
            Provider::Ollama => write!(f, "ollama"),
            Provider::Gemini => write!(f, "gemini"),
        }
    }
}

impl FromStr for Provider {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bedrock" => Ok(Provider::Bedrock),
            "ollama" => Ok(Provider::Ollama),
            "gemini" => Ok(Provider::Gemini),
            _ => Err(ApiError::InvalidRequest(format!(
                "Unknown provider: {}. Expected: bedrock, ollama, or gemini",
                s
            ))),
        }
    }
}

/// Remote services; any of them may be absent
#[derive(Clone, Default)]
pub struct Providers {
    pub bedrock: Option<Arc<BedrockService>>,
    pub knowledge_base: Option<Arc<KnowledgeBaseService>>,
    pub ollama: Option<Arc<OllamaService>>,
    pub gemini: Option<Arc<GeminiService>>,
}

impl Providers {
    /// The text generator behind `provider`
    pub fn generator(&self, provider: Provider) -> Result<Arc<dyn TextGenerator>, ApiError> {
        let generator: Option<Arc<dyn TextGenerator>> = match provider {
            Provider::Bedrock => self.bedrock.clone().map(|s| s as Arc<dyn TextGenerator>),
            Provider::Ollama => self.ollama.clone().map(|s| s as Arc<dyn TextGenerator>),
            Provider::Gemini => self.gemini.clone().map(|s| s as Arc<dyn TextGenerator>),
        };

        generator.ok_or_else(|| not_configured(provider))
    }

    pub fn knowledge_base(&self) -> Result<&KnowledgeBaseService, ApiError> {
        self.knowledge_base
            .as_deref()
            .ok_or_else(|| ApiError::InvalidRequest("Knowledge base is not configured".to_string()))
    }
}

pub(crate) fn not_configured(provider: Provider) -> ApiError {
    ApiError::InvalidRequest(format!("Provider {} is not configured", provider))
}

/// Shared application state
///
/// Cheaply cloneable; everything heavy sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,

    /// The knowledge graph and its persistence
    pub graph: Arc<GraphService>,

    pub providers: Providers,

    /// Cancelled on shutdown so remote calls stop retrying
    pub shutdown: CancellationToken,

    /// Application start time (for uptime calculation)
    pub start_time: Instant,
}

impl AppState {
    /// Open the graph store and create every remote service client
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        let settings = Arc::new(settings);
        let shutdown = CancellationToken::new();

        let persistence = db::open(&settings).await?;
        let graph = Arc::new(GraphService::open(persistence.graph).await?);

        let executor = Executor::new(settings.retry.policy()).with_cancellation(shutdown.clone());

        tracing::debug!(
            region = %settings.aws_region,
            bedrock_endpoint = ?settings.bedrock_endpoint_url,
            "Initializing AWS SDK clients"
        );
        let sdk_config = build_aws_config(&settings).await;

        let bedrock = BedrockService::new(
            create_bedrock_runtime_client(&settings, &sdk_config),
            create_bedrock_client(&sdk_config),
            executor.clone(),
            settings.enrichment_model_id.clone(),
        );

        let knowledge_base = KnowledgeBaseService::new(
            create_agent_runtime_client(&sdk_config),
            settings.knowledge_base_id.clone(),
            executor.clone(),
        );

        let mut ollama = OllamaService::new(
            settings.ollama_base_url.clone(),
            settings.request_timeout(),
            executor.clone(),
        )?
        .with_listing_policy(presets::ollama_listing());
        if let Some(store) = &persistence.responses {
            ollama = ollama.with_response_log(store.clone());
        }

        let gemini = match &settings.gemini_api_key {
            Some(key) => {
                let mut config = GeminiConfig::new(key.clone(), settings.gemini_model.clone())
                    .with_timeout(settings.request_timeout_seconds);
                if let Some(base_url) = &settings.gemini_base_url {
                    config = config.with_base_url(base_url.clone());
                }
                let mut service = GeminiService::new(config, executor.clone())?;
                if let Some(store) = &persistence.responses {
                    service = service.with_response_log(store.clone());
                }
                Some(Arc::new(service))
            }
            None => {
                tracing::info!("GOOGLE_AI_API_KEY not set, Gemini provider disabled");
                None
            }
        };

        let providers = Providers {
            bedrock: Some(Arc::new(bedrock)),
            knowledge_base: Some(Arc::new(knowledge_base)),
            ollama: Some(Arc::new(ollama)),
            gemini,
        };

        tracing::info!("Application state initialized successfully");

        Ok(Self::from_parts(settings, graph, providers, shutdown))
    }

    pub fn from_parts(
        settings: Arc<Settings>,
        graph: Arc<GraphService>,
        providers: Providers,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            settings,
            graph,
            providers,
            shutdown,
            start_time: Instant::now(),
        }
    }

    /// Get the application uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
