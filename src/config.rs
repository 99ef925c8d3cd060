// src/config.rs
// All tunables load from the environment with sane defaults; nothing is
// hardcoded at call sites.

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    // ── Qdrant Configuration
    pub qdrant_url: String,
    pub qdrant_collection: String,
    pub qdrant_embedding_dim: usize,

    // ── Embeddings API
    pub embeddings_base_url: String,
    pub embeddings_api_key: String,
    pub embedding_model: String,

    // ── Result policy
    /// Fixed per-query result count. A policy constant, not caller input:
    /// "more results" widens the radius instead of raising this.
    pub result_limit: usize,
    /// Similarity-stage over-fetch factor applied before hard filters.
    pub overfetch_multiplier: usize,

    // ── Search geometry
    pub default_radius_km: f64,
    /// How much `more()` widens the radius when the caller gives no value.
    pub radius_widen_km: f64,
    /// Distance at or beyond which the distance score bottoms out at 0.
    pub max_distance_km: f64,

    // ── Ranking weights (composite weights must sum to 1.0)
    pub weight_relevance: f64,
    pub weight_quality: f64,
    pub weight_distance: f64,
    pub weight_rating: f64,
    pub weight_review_confidence: f64,
    /// Review count at which the confidence term saturates toward 1.
    pub review_saturation: u32,

    // ── Enrichment
    pub enrich_concurrency: usize,

    // ── Timeouts (seconds)
    pub store_timeout: u64,
    pub embeddings_timeout: u64,

    // ── Logging
    pub log_level: String,
}

fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            // Trim whitespace and strip inline comments before parsing
            let clean_val = val.split('#').next().unwrap_or("").trim();
            match clean_val.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    eprintln!("Config: {} = '{}' (parse failed, using default)", key, val);
                    default
                }
            }
        }
        Err(_) => default,
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        // Load .env first if present; plain env vars and defaults otherwise.
        let _ = dotenvy::dotenv();

        Self {
            qdrant_url: env_var_or("TABLESCOUT_QDRANT_URL", "http://localhost:6333".to_string()),
            qdrant_collection: env_var_or("TABLESCOUT_QDRANT_COLLECTION", "venues".to_string()),
            qdrant_embedding_dim: env_var_or("TABLESCOUT_QDRANT_EMBEDDING_DIM", 1536),
            embeddings_base_url: env_var_or(
                "TABLESCOUT_EMBEDDINGS_BASE_URL",
                "https://api.openai.com".to_string(),
            ),
            embeddings_api_key: env_var_or("TABLESCOUT_EMBEDDINGS_API_KEY", String::new()),
            embedding_model: env_var_or(
                "TABLESCOUT_EMBEDDING_MODEL",
                "text-embedding-3-small".to_string(),
            ),
            result_limit: env_var_or("TABLESCOUT_RESULT_LIMIT", 5),
            overfetch_multiplier: env_var_or("TABLESCOUT_OVERFETCH_MULTIPLIER", 15),
            default_radius_km: env_var_or("TABLESCOUT_DEFAULT_RADIUS_KM", 5.0),
            radius_widen_km: env_var_or("TABLESCOUT_RADIUS_WIDEN_KM", 5.0),
            max_distance_km: env_var_or("TABLESCOUT_MAX_DISTANCE_KM", 35.0),
            weight_relevance: env_var_or("TABLESCOUT_WEIGHT_RELEVANCE", 0.5),
            weight_quality: env_var_or("TABLESCOUT_WEIGHT_QUALITY", 0.3),
            weight_distance: env_var_or("TABLESCOUT_WEIGHT_DISTANCE", 0.2),
            weight_rating: env_var_or("TABLESCOUT_WEIGHT_RATING", 0.3),
            weight_review_confidence: env_var_or("TABLESCOUT_WEIGHT_REVIEW_CONFIDENCE", 0.7),
            review_saturation: env_var_or("TABLESCOUT_REVIEW_SATURATION", 501),
            enrich_concurrency: env_var_or("TABLESCOUT_ENRICH_CONCURRENCY", 10),
            store_timeout: env_var_or("TABLESCOUT_STORE_TIMEOUT", 10),
            embeddings_timeout: env_var_or("TABLESCOUT_EMBEDDINGS_TIMEOUT", 30),
            log_level: env_var_or("TABLESCOUT_LOG_LEVEL", "info".to_string()),
        }
    }

    /// Qdrant client configuration as a tuple.
    pub fn qdrant_config(&self) -> (String, String, usize) {
        (
            self.qdrant_url.clone(),
            self.qdrant_collection.clone(),
            self.qdrant_embedding_dim,
        )
    }

    /// How many similarity hits to pull before hard filters are applied.
    pub fn overfetch_limit(&self) -> usize {
        self.result_limit * self.overfetch_multiplier
    }
}

// Global config instance - loaded once at startup
pub static CONFIG: Lazy<EngineConfig> = Lazy::new(EngineConfig::from_env);
