//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Architecture name recorded with every stored model response
pub const ARCHITECTURE_NAME: &str = "Neurosymbolic Knowledge Graph";

/// A model response kept in the `versioned_responses` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub architecture_name: String,
    pub provider: String,
    pub model: String,
    pub user_text: String,
    pub front_content: String,
    pub back_content: String,
    pub system_prompt: String,
    pub created_at: DateTime<Utc>,
}

impl ResponseRecord {
    /// Record a prompt/response exchange with a provider
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        user_text: impl Into<String>,
        system_prompt: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        let system_prompt = system_prompt.into();
        Self {
            architecture_name: ARCHITECTURE_NAME.to_string(),
            provider: provider.into(),
            model: model.into(),
            user_text: user_text.into(),
            front_content: system_prompt.clone(),
            back_content: response.into(),
            system_prompt,
            created_at: Utc::now(),
        }
    }
}
