//! Embedding client for generating text embeddings.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::EmbeddingError;
use crate::models::{EmbeddingConfig, EmbeddingStage};
use crate::utils::retry::{RetryConfig, RetryResult, with_retry};

/// Provider of text vectors.
///
/// Implementations must return exactly one vector per input text, in input order.
#[async_trait]
pub trait VectorizationClient: Send + Sync {
    /// Vectorize `texts` for the given stage. Fails as a unit.
    async fn get_vectors(
        &self,
        texts: &[String],
        stage: EmbeddingStage,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Maximum number of concurrent calls this provider accepts.
    fn concurrency_limit(&self) -> usize;
}

/// Instruction type understood by the embedding server.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
enum InstructionType {
    Document,
    Query,
}

impl From<EmbeddingStage> for InstructionType {
    fn from(stage: EmbeddingStage) -> Self {
        match stage {
            EmbeddingStage::Index => InstructionType::Document,
            EmbeddingStage::Query => InstructionType::Query,
        }
    }
}

/// Request body for the /embed endpoint.
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    truncate: Option<bool>,
    instruction_type: InstructionType,
}

/// Response from the /embed endpoint.
#[derive(Debug, Deserialize)]
struct EmbedResponse(Vec<Vec<f32>>);

/// Health response from the /health endpoint.
#[derive(Debug, Deserialize, Serialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub model_id: Option<String>,
}

impl HealthResponse {
    fn healthy() -> Self {
        Self {
            status: Some("healthy".to_string()),
            model_id: None,
        }
    }
}

/// HTTP client for a text-embeddings server.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingClient {
    client: Client,
    base_url: String,
    concurrency_limit: usize,
    retry: RetryConfig,
}

impl HttpEmbeddingClient {
    /// Create a new embedding client with the given configuration.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            concurrency_limit: config.concurrency_limit,
            retry: RetryConfig::new(config.max_attempts.max(1)),
        })
    }

    /// Check if the embedding server is healthy and ready.
    pub async fn health_check(&self) -> Result<HealthResponse, EmbeddingError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EmbeddingError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EmbeddingError::ServerError(format!(
                "health check failed with status: {}",
                response.status()
            )));
        }

        // Server may return an empty or non-JSON body on health check
        let text = response.text().await.unwrap_or_default();
        if text.is_empty() {
            return Ok(HealthResponse::healthy());
        }

        match serde_json::from_str(&text) {
            Ok(health) => Ok(health),
            Err(_) if text.contains("healthy") => Ok(HealthResponse::healthy()),
            Err(e) => Err(EmbeddingError::InvalidResponse(e.to_string())),
        }
    }

    /// Send one /embed request without retrying.
    async fn embed_once(
        &self,
        texts: &[String],
        instruction_type: InstructionType,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/embed", self.base_url);
        let request = EmbedRequest {
            inputs: texts,
            truncate: Some(true),
            instruction_type,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout
                } else if e.is_connect() {
                    EmbeddingError::ConnectionError(e.to_string())
                } else {
                    EmbeddingError::RequestError(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ServerError(format!(
                "status {}: {}",
                status, body
            )));
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        Ok(embed_response.0)
    }

    /// Get the base URL of the embedding server.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl VectorizationClient for HttpEmbeddingClient {
    async fn get_vectors(
        &self,
        texts: &[String],
        stage: EmbeddingStage,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let instruction_type = InstructionType::from(stage);
        let result = with_retry(&self.retry, || self.embed_once(texts, instruction_type)).await;
        if let RetryResult::Failed { attempts, .. } = &result {
            debug!(attempts, inputs = texts.len(), "embedding request failed");
        }
        result.into_result()
    }

    fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }
}
