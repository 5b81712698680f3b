//! Node enrichment through a text-generation provider

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::graph::Attributes;
use crate::retry::RemoteResult;

/// Attribute that receives the enriched text
pub const ENRICHED_ATTRIBUTE: &str = "enriched";

/// A provider that turns a prompt into text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text with `model`, or the provider's default model when `None`
    async fn generate(
        &self,
        model: Option<&str>,
        prompt: &str,
        system_prompt: &str,
    ) -> RemoteResult<String>;

    /// Display name, e.g. "Bedrock"
    fn provider(&self) -> &str;
}

/// Prompt asking for background on a philosopher
pub fn enrichment_prompt(node: &str, attributes: &Attributes) -> String {
    let school = attributes
        .get("school")
        .and_then(Value::as_str)
        .unwrap_or("philosophy");

    format!(
        "Provide additional information about the philosopher {node}, known for {school}. \
         Include key ideas, major works, and historical context."
    )
}

/// Enriched text: the provider's answer followed by what the graph already knows
pub fn format_enrichment(
    provider: &str,
    generated: &str,
    attributes: &Attributes,
    connections: &[String],
) -> String {
    format!(
        "Additional information from {provider}:\n{generated}\n\nOriginal Attributes: {}\nConnections: {}",
        Value::Object(attributes.clone()),
        Value::from(connections.to_vec()),
    )
}

/// Builds enriched node descriptions with one text generator
#[derive(Clone)]
pub struct Enricher {
    generator: Arc<dyn TextGenerator>,
}

impl Enricher {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub fn provider(&self) -> &str {
        self.generator.provider()
    }

    /// Ask the provider about `node` and format the answer
    pub async fn enrich(
        &self,
        node: &str,
        attributes: &Attributes,
        connections: &[String],
        model: Option<&str>,
    ) -> RemoteResult<String> {
        let prompt = enrichment_prompt(node, attributes);

        tracing::info!(
            node = %node,
            provider = %self.provider(),
            "Enriching node"
        );

        let generated = self.generator.generate(model, &prompt, "").await?;
        Ok(format_enrichment(
            self.provider(),
            &generated,
            attributes,
            connections,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RemoteError;
    use std::sync::Mutex;

    /// Generator that echoes a canned answer and remembers the prompts it saw
    struct CannedGenerator {
        answer: Result<String, RemoteError>,
        prompts: Mutex<Vec<(Option<String>, String)>>,
    }

    impl CannedGenerator {
        fn answering(answer: &str) -> Self {
            Self {
                answer: Ok(answer.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for CannedGenerator {
        async fn generate(
            &self,
            model: Option<&str>,
            prompt: &str,
            _system_prompt: &str,
        ) -> RemoteResult<String> {
            self.prompts
                .lock()
                .unwrap()
                .push((model.map(str::to_string), prompt.to_string()));
            self.answer.clone()
        }

        fn provider(&self) -> &str {
            "Canned"
        }
    }

    fn attributes(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect()
    }

    #[test]
    fn test_prompt_uses_school() {
        let attrs = attributes(&[("school", "Rationalism")]);
        assert_eq!(
            enrichment_prompt("Descartes", &attrs),
            "Provide additional information about the philosopher Descartes, known for Rationalism. \
             Include key ideas, major works, and historical context."
        );
    }

    #[test]
    fn test_prompt_defaults_to_philosophy() {
        let prompt = enrichment_prompt("Socrates", &Attributes::new());
        assert!(prompt.contains("known for philosophy."));
    }

    #[tokio::test]
    async fn test_enrich_formats_answer() {
        let generator = Arc::new(CannedGenerator::answering("Cogito, ergo sum."));
        let enricher = Enricher::new(generator.clone());
        let attrs = attributes(&[("label", "René Descartes (1596-1650)"), ("school", "Rationalism")]);
        let connections = vec!["Spinoza".to_string(), "Leibniz".to_string()];

        let text = enricher
            .enrich("Descartes", &attrs, &connections, Some("amazon.titan-text-express-v1"))
            .await
            .unwrap();

        assert!(text.starts_with("Additional information from Canned:\nCogito, ergo sum.\n\n"));
        assert!(text.contains("Original Attributes: {"));
        assert!(text.contains("\"school\":\"Rationalism\""));
        assert!(text.ends_with("Connections: [\"Spinoza\",\"Leibniz\"]"));

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].0.as_deref(), Some("amazon.titan-text-express-v1"));
        assert!(prompts[0].1.contains("philosopher Descartes"));
    }

    #[tokio::test]
    async fn test_enrich_propagates_remote_error() {
        let generator = Arc::new(CannedGenerator {
            answer: Err(RemoteError::fatal("AccessDeniedException")),
            prompts: Mutex::new(Vec::new()),
        });
        let enricher = Enricher::new(generator);

        let err = enricher
            .enrich("Kant", &Attributes::new(), &[], None)
            .await
            .unwrap_err();
        assert_eq!(err.message, "AccessDeniedException");
    }
}
