// src/scoring.rs

//! Composite ranking: relevance, quality, and distance normalized to [0,1]
//! and combined with configurable weights. Every component is retained on
//! the result so rankings stay explainable in logs and tests.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::types::Candidate;

/// Weights and normalization bounds for scoring. Values are configuration,
/// not constants, so ranking experiments don't touch code.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub weight_relevance: f64,
    pub weight_quality: f64,
    pub weight_distance: f64,
    /// Within the quality term: share of the normalized star rating.
    pub weight_rating: f64,
    /// Within the quality term: share of the review-count confidence.
    pub weight_review_confidence: f64,
    /// Review count at which confidence saturates to 1.
    pub review_saturation: u32,
    /// Distance at or beyond which the distance score is 0.
    pub max_distance_km: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weight_relevance: 0.5,
            weight_quality: 0.3,
            weight_distance: 0.2,
            weight_rating: 0.3,
            weight_review_confidence: 0.7,
            review_saturation: 501,
            max_distance_km: 35.0,
        }
    }
}

impl ScoringConfig {
    pub fn from_engine_config(cfg: &EngineConfig) -> Self {
        Self {
            weight_relevance: cfg.weight_relevance,
            weight_quality: cfg.weight_quality,
            weight_distance: cfg.weight_distance,
            weight_rating: cfg.weight_rating,
            weight_review_confidence: cfg.weight_review_confidence,
            review_saturation: cfg.review_saturation,
            max_distance_km: cfg.max_distance_km,
        }
    }
}

/// All scoring components for one candidate, kept alongside the composite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub relevancy: f64,
    pub quality: f64,
    pub distance: f64,
    pub composite: f64,
}

/// Venue quality in [0,1]: normalized star rating blended with a
/// logarithmically-saturating review-count confidence. A missing rating or
/// count contributes 0 to its term; wholly absent data scores 0.
pub fn quality_score(rating: Option<f32>, review_count: Option<u32>, cfg: &ScoringConfig) -> f64 {
    let rating_term = rating.map(|r| (r as f64 / 5.0).clamp(0.0, 1.0)).unwrap_or(0.0);
    let confidence_term = review_count
        .map(|c| {
            let saturation = (1.0 + cfg.review_saturation as f64).ln();
            ((1.0 + c as f64).ln() / saturation).min(1.0)
        })
        .unwrap_or(0.0);

    cfg.weight_rating * rating_term + cfg.weight_review_confidence * confidence_term
}

/// Proximity in [0,1]: 1 at the search origin, falling off as the square
/// root of normalized distance, 0 at `max_distance_km` and beyond.
pub fn distance_score(distance_km: f64, cfg: &ScoringConfig) -> f64 {
    let capped = distance_km.min(cfg.max_distance_km).max(0.0);
    1.0 - (capped / cfg.max_distance_km).sqrt()
}

/// Scores one candidate at a known distance from the search origin.
/// The store's relevance score is used as-is (already in [0,1]).
pub fn score(candidate: &Candidate, distance_km: f64, cfg: &ScoringConfig) -> ScoreComponents {
    let relevancy = (candidate.relevance_score as f64).clamp(0.0, 1.0);
    let quality = quality_score(candidate.rating, candidate.review_count, cfg);
    let distance = distance_score(distance_km, cfg);
    let composite = cfg.weight_relevance * relevancy
        + cfg.weight_quality * quality
        + cfg.weight_distance * distance;

    ScoreComponents {
        relevancy,
        quality,
        distance,
        composite,
    }
}
