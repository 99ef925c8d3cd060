// src/store/qdrant.rs
// Implements VenueStore for Qdrant over its REST API.

use async_trait::async_trait;
use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::store::filter::{build_venue_filter, id_value};
use crate::store::VenueStore;
use crate::types::{Candidate, GeoPoint, QueryContext};

pub struct QdrantVenueStore {
    pub client: Client,
    pub base_url: String,
    pub collection: String,
    /// Similarity-stage over-fetch factor. Hard filters run after the
    /// similarity ranking and can eliminate many hits; fetching only
    /// `limit` would under-fill the final result.
    pub overfetch_multiplier: usize,
}

impl QdrantVenueStore {
    pub fn new<S: Into<String>>(
        client: Client,
        base_url: S,
        collection: S,
        overfetch_multiplier: usize,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            collection: collection.into(),
            overfetch_multiplier,
        }
    }

    /// Ensures the venue collection exists with the right vector config and
    /// the payload indexes the query filters rely on. Safe to call multiple
    /// times; only creates what is missing.
    pub async fn ensure_collection(&self, embedding_dim: usize) -> Result<()> {
        let url = format!("{}/collections/{}", self.base_url, self.collection);
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            let req_body = json!({
                "vectors": {
                    "size": embedding_dim,
                    "distance": "Cosine"
                }
            });
            let resp = self.client.put(&url).json(&req_body).send().await?;
            let status = resp.status();
            let err_body = resp.text().await.unwrap_or_default();
            if !(status.is_success() || status.as_u16() == 409 || err_body.contains("already exists")) {
                return Err(anyhow!("Failed to create Qdrant collection: {}", err_body));
            }
        }

        // Payload indexes for the filterable fields. Qdrant answers 4xx if
        // one already exists; anything else is worth a warning, but never
        // fails the bootstrap.
        for (field, schema) in [
            ("location", json!("geo")),
            ("city", json!({ "type": "text", "tokenizer": "word", "lowercase": true })),
            ("price_tier", json!("integer")),
        ] {
            let index_url = format!("{}/collections/{}/index", self.base_url, self.collection);
            let result = self
                .client
                .put(&index_url)
                .json(&json!({ "field_name": field, "field_schema": schema }))
                .send()
                .await;
            match result {
                Ok(resp) if resp.status().is_server_error() => {
                    warn!("Index creation for '{}' returned {}", field, resp.status());
                }
                Ok(_) => {}
                Err(e) => warn!("Index creation for '{}' failed: {}", field, e),
            }
        }

        Ok(())
    }

    fn map_send_error(e: reqwest::Error) -> EngineError {
        EngineError::StoreUnavailable(format!("Qdrant request failed: {e}"))
    }

    async fn check_response(resp: reqwest::Response) -> Result<Value, EngineError> {
        let status = resp.status();
        if status.is_success() {
            return resp
                .json()
                .await
                .map_err(|e| EngineError::StoreUnavailable(format!("bad Qdrant response: {e}")));
        }

        let body = resp.text().await.unwrap_or_default();
        if status.is_server_error() {
            Err(EngineError::StoreUnavailable(format!(
                "Qdrant returned {status}: {body}"
            )))
        } else {
            // 4xx means the query itself was rejected.
            Err(EngineError::MalformedQuery(format!(
                "Qdrant rejected query ({status}): {body}"
            )))
        }
    }
}

#[async_trait]
impl VenueStore for QdrantVenueStore {
    async fn search(
        &self,
        embedding: &[f32],
        ctx: &QueryContext,
        limit: usize,
    ) -> Result<Vec<Candidate>, EngineError> {
        let url = format!("{}/collections/{}/points/search", self.base_url, self.collection);

        let req_body = json!({
            "vector": embedding,
            "limit": limit * self.overfetch_multiplier.max(1),
            "with_payload": true,
            "filter": build_venue_filter(ctx)
        });

        debug!(
            "Qdrant search: radius {} km, {} exclusions, fetching up to {}",
            ctx.radius_km,
            ctx.exclude_ids.len(),
            limit * self.overfetch_multiplier.max(1)
        );

        let resp = self
            .client
            .post(&url)
            .json(&req_body)
            .send()
            .await
            .map_err(Self::map_send_error)?;
        let resp_json = Self::check_response(resp).await?;

        let mut results = Vec::new();
        if let Some(points) = resp_json.get("result").and_then(|r| r.as_array()) {
            for point in points {
                match parse_candidate(point) {
                    Some(candidate) => results.push(candidate),
                    None => warn!("Skipping unparseable Qdrant point: {}", point),
                }
            }
        }

        // Qdrant already ranks by score; keep it explicit and stable anyway.
        results.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);
        Ok(results)
    }

    async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<Candidate>, EngineError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/collections/{}/points", self.base_url, self.collection);
        let id_values: Vec<Value> = ids.iter().map(|id| id_value(id)).collect();
        let req_body = json!({
            "ids": id_values,
            "with_payload": true
        });

        let resp = self
            .client
            .post(&url)
            .json(&req_body)
            .send()
            .await
            .map_err(Self::map_send_error)?;
        let resp_json = Self::check_response(resp).await?;

        let mut results = Vec::new();
        if let Some(points) = resp_json.get("result").and_then(|r| r.as_array()) {
            for point in points {
                match parse_candidate(point) {
                    Some(candidate) => results.push(candidate),
                    None => warn!("Skipping unparseable Qdrant point: {}", point),
                }
            }
        }
        Ok(results)
    }
}

/// Parses one Qdrant point (search hit or retrieved record) into a
/// Candidate. Retrieved records carry no score; relevance defaults to 0.
pub fn parse_candidate(point: &Value) -> Option<Candidate> {
    let payload = point.get("payload")?;

    let id = match point.get("id")? {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return None,
    };

    let location = payload.get("location")?;
    let location = GeoPoint::new(
        location.get("lat")?.as_f64()?,
        location.get("lon")?.as_f64()?,
    );

    let relevance_score = point
        .get("score")
        .and_then(|s| s.as_f64())
        .map(|s| s.clamp(0.0, 1.0) as f32)
        .unwrap_or(0.0);

    let weekly_schedule = payload
        .get("weekly_schedule")
        .and_then(|v| serde_json::from_value(v.clone()).ok());

    Some(Candidate {
        id,
        title: payload.get("title")?.as_str()?.to_string(),
        location,
        categories: payload
            .get("categories")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|c| c.as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default(),
        rating: payload.get("rating").and_then(|v| v.as_f64()).map(|f| f as f32),
        review_count: payload
            .get("review_count")
            .and_then(|v| v.as_u64())
            .map(|n| n as u32),
        price_tier: payload
            .get("price_tier")
            .and_then(|v| v.as_u64())
            .map(|n| n as u8),
        weekly_schedule,
        relevance_score,
        details: payload.get("details").cloned().unwrap_or(Value::Null),
    })
}
