//! Knowledge-base search over the Bedrock agent runtime `Retrieve` API
//!
//! Retrieved passages are read as whitespace separated triples
//! `source relation target ...`; passages shorter than that are skipped.

use aws_sdk_bedrockagentruntime::types::{
    KnowledgeBaseQuery, KnowledgeBaseRetrievalConfiguration, KnowledgeBaseRetrievalResult,
    KnowledgeBaseVectorSearchConfiguration, RetrievalResultContent,
};
use aws_sdk_bedrockagentruntime::Client as AgentRuntimeClient;
use serde::{Deserialize, Serialize};

use super::bedrock::{classify_bedrock_error, BedrockError};
use super::log_attempts;
use crate::retry::{Executor, RemoteResult};

/// Default number of results requested from the knowledge base
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// One relation read from a retrieved passage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBaseRecord {
    pub relation: String,
    pub source: String,
    pub target: String,
    /// Position of the passage in the service's result list
    pub rank: usize,
}

/// Turn retrieved passages into relation records, in service order
pub fn parse_records<'a, I>(passages: I, max_results: usize) -> Vec<KnowledgeBaseRecord>
where
    I: IntoIterator<Item = &'a str>,
{
    passages
        .into_iter()
        .enumerate()
        .filter_map(|(rank, text)| {
            let parts: Vec<&str> = text.split_whitespace().collect();
            match parts.as_slice() {
                [source, relation, target, ..] => Some(KnowledgeBaseRecord {
                    relation: relation.to_string(),
                    source: source.to_string(),
                    target: target.to_string(),
                    rank,
                }),
                _ => None,
            }
        })
        .take(max_results)
        .collect()
}

/// Semantic search against one Bedrock knowledge base
#[derive(Clone)]
pub struct KnowledgeBaseService {
    client: AgentRuntimeClient,
    knowledge_base_id: String,
    executor: Executor,
}

impl KnowledgeBaseService {
    pub fn new(
        client: AgentRuntimeClient,
        knowledge_base_id: impl Into<String>,
        executor: Executor,
    ) -> Self {
        Self {
            client,
            knowledge_base_id: knowledge_base_id.into(),
            executor,
        }
    }

    pub fn knowledge_base_id(&self) -> &str {
        &self.knowledge_base_id
    }

    /// Search the knowledge base and return up to `max_results` records
    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> RemoteResult<Vec<KnowledgeBaseRecord>> {
        let retrieval_query = KnowledgeBaseQuery::builder()
            .text(query)
            .build();

        let vector_search = KnowledgeBaseVectorSearchConfiguration::builder()
            .number_of_results(i32::try_from(max_results).unwrap_or(i32::MAX))
            .build();
        let configuration = KnowledgeBaseRetrievalConfiguration::builder()
            .vector_search_configuration(vector_search)
            .build();

        tracing::info!(
            knowledge_base_id = %self.knowledge_base_id,
            query = %query,
            max_results,
            "Querying knowledge base"
        );

        let policy = self.executor.policy();
        let output = self
            .executor
            .execute_observed(
                || {
                    let request = self
                        .client
                        .retrieve()
                        .knowledge_base_id(&self.knowledge_base_id)
                        .retrieval_query(retrieval_query.clone())
                        .retrieval_configuration(configuration.clone());
                    async move {
                        request
                            .send()
                            .await
                            .map_err(|e| BedrockError::from_sdk("Retrieve", e))
                    }
                },
                classify_bedrock_error,
                log_attempts("knowledge_base", "Retrieve", policy),
            )
            .await?;

        let results =
            Option::<&[KnowledgeBaseRetrievalResult]>::from(output.retrieval_results())
                .unwrap_or_default();
        let records = parse_records(results.iter().map(passage_text), max_results);

        tracing::info!(
            results = results.len(),
            records = records.len(),
            "Knowledge base query completed"
        );

        Ok(records)
    }
}

fn passage_text(result: &KnowledgeBaseRetrievalResult) -> &str {
    Option::<&RetrievalResultContent>::from(result.content())
        .and_then(|content| Option::<&str>::from(content.text()))
        .unwrap_or_default()
}
