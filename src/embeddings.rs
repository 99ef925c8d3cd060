// src/embeddings.rs
// Maps intent text to the semantic query vector. The engine treats this as
// an opaque dependency behind a trait so tests can swap it out.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::EngineConfig;

/// Anything that can turn free text into a fixed-dimension vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Client for an OpenAI-compatible embeddings endpoint.
pub struct EmbeddingClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl EmbeddingClient {
    pub fn new(cfg: &EngineConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.embeddings_timeout))
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.embeddings_base_url.clone(),
            api_key: cfg.embeddings_api_key.clone(),
            model: cfg.embedding_model.clone(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for EmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = json!({
            "model": self.model,
            "input": text,
        });

        debug!("Requesting embedding for {} chars with model {}", text.len(), self.model);

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "<no body>".into());
            return Err(anyhow!("embeddings API error ({}): {}", status, error_text));
        }

        let result: EmbeddingResponse = response.json().await?;
        let first = result
            .data
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("no embedding data in API response"))?;

        Ok(first.embedding)
    }
}

// Internal structs for deserializing the API response.
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}
