//! AWS SDK configuration
//!
//! Builds the shared SDK configuration and the three Bedrock clients this
//! crate uses: the runtime (model invocation), the control plane (model
//! listing) and the agent runtime (knowledge-base retrieval). The SDK
//! configuration is loaded once and handed to every client constructor.

use aws_config::{meta::region::RegionProviderChain, BehaviorVersion, Region, SdkConfig};
use aws_sdk_bedrock::Client as BedrockClient;
use aws_sdk_bedrockagentruntime::Client as AgentRuntimeClient;
use aws_sdk_bedrockruntime::Client as BedrockRuntimeClient;

use crate::config::Settings;

/// AWS configuration builder
///
/// Creates AWS SDK configuration with support for:
/// - The region from settings, falling back to the default provider chain
/// - Credential providers (environment, profile, instance metadata)
/// - A custom Bedrock runtime endpoint for local testing
pub struct AwsConfigBuilder<'a> {
    settings: &'a Settings,
}

impl<'a> AwsConfigBuilder<'a> {
    /// Create a new AWS configuration builder
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Build the base AWS SDK configuration
    ///
    /// This runs the region and credential provider chains, so callers
    /// should build it once and share it between clients.
    pub async fn build_sdk_config(&self) -> SdkConfig {
        let region_provider =
            RegionProviderChain::first_try(Region::new(self.settings.aws_region.clone()))
                .or_default_provider();

        aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await
    }

    /// Create a Bedrock Runtime client with optional custom endpoint
    ///
    /// If `BEDROCK_ENDPOINT_URL` is set in settings, the client will use
    /// that endpoint (useful for testing with mocks).
    pub fn build_runtime_client(&self, sdk_config: &SdkConfig) -> BedrockRuntimeClient {
        if let Some(endpoint_url) = &self.settings.bedrock_endpoint_url {
            tracing::info!(endpoint = %endpoint_url, "Using custom Bedrock endpoint");

            let bedrock_config = aws_sdk_bedrockruntime::config::Builder::from(sdk_config)
                .endpoint_url(endpoint_url)
                .build();

            BedrockRuntimeClient::from_conf(bedrock_config)
        } else {
            BedrockRuntimeClient::new(sdk_config)
        }
    }
}

/// Build AWS SDK config from settings (convenience function)
pub async fn build_aws_config(settings: &Settings) -> SdkConfig {
    AwsConfigBuilder::new(settings).build_sdk_config().await
}

/// Create a Bedrock Runtime client from a loaded SDK config
pub fn create_bedrock_runtime_client(
    settings: &Settings,
    sdk_config: &SdkConfig,
) -> BedrockRuntimeClient {
    AwsConfigBuilder::new(settings).build_runtime_client(sdk_config)
}

/// Create a Bedrock control-plane client (model listing)
pub fn create_bedrock_client(sdk_config: &SdkConfig) -> BedrockClient {
    BedrockClient::new(sdk_config)
}

/// Create a Bedrock Agent Runtime client (knowledge-base retrieval)
pub fn create_agent_runtime_client(sdk_config: &SdkConfig) -> AgentRuntimeClient {
    AgentRuntimeClient::new(sdk_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_sdk_config() {
        let settings = Settings::default();
        let config = build_aws_config(&settings).await;

        assert_eq!(config.region().unwrap().as_ref(), "us-east-1");
    }

    #[tokio::test]
    async fn test_clients_share_one_config() {
        let mut settings = Settings::default();
        settings.aws_region = "eu-west-1".to_string();
        let config = build_aws_config(&settings).await;

        let runtime = create_bedrock_runtime_client(&settings, &config);
        let control = create_bedrock_client(&config);
        let agent = create_agent_runtime_client(&config);

        assert_eq!(runtime.config().region().unwrap().as_ref(), "eu-west-1");
        assert_eq!(control.config().region().unwrap().as_ref(), "eu-west-1");
        assert_eq!(agent.config().region().unwrap().as_ref(), "eu-west-1");
    }

    #[tokio::test]
    async fn test_custom_runtime_endpoint() {
        let mut settings = Settings::default();
        settings.bedrock_endpoint_url = Some("http://localhost:4566".to_string());
        let config = build_aws_config(&settings).await;

        let _client = create_bedrock_runtime_client(&settings, &config);
    }
}
