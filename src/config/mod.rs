//! Configuration management module
//!
//! This module handles loading and validating application configuration
//! from environment variables and .env files.

pub mod aws;
pub mod settings;

pub use aws::{
    build_aws_config, create_agent_runtime_client, create_bedrock_client,
    create_bedrock_runtime_client, AwsConfigBuilder,
};
pub use settings::{Environment, RetrySettings, Settings};
