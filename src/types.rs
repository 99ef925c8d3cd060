// src/types.rs
// Core value objects shared across the engine.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineError;
use crate::hours::WeeklySchedule;
use crate::scoring::ScoreComponents;

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// True when both components are inside their valid WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// One venue record as returned by the searchable store.
///
/// `relevance_score` is the store's similarity score, already normalized to
/// [0,1]; the engine uses it as-is. `details` carries descriptive payload
/// fields (address, contact, media) the engine never interprets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub title: String,
    pub location: GeoPoint,
    #[serde(default)]
    pub categories: Vec<String>,
    /// 0–5 star rating when the venue has one.
    pub rating: Option<f32>,
    pub review_count: Option<u32>,
    /// Ordinal price tier, 1 (cheapest) through 5.
    pub price_tier: Option<u8>,
    pub weekly_schedule: Option<WeeklySchedule>,
    pub relevance_score: f32,
    #[serde(default)]
    pub details: Value,
}

/// A candidate plus everything the enrichment pipeline computed for it.
///
/// Write-once for a given query context; recomputed only when the search
/// origin or local time changes (i.e. on a fresh query).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedCandidate {
    pub candidate: Candidate,
    pub distance_km: f64,
    pub distance_label: String,
    pub is_open: bool,
    /// Set when open-status had to fall back to UTC or the schedule data
    /// was unusable; `is_open` is then a conservative `false`.
    pub degraded: bool,
    pub scores: ScoreComponents,
}

impl EnrichedCandidate {
    pub fn id(&self) -> &str {
        &self.candidate.id
    }
}

/// One search invocation, validated at construction.
///
/// The result count is intentionally absent: it is a server-side policy
/// constant (`CONFIG.result_limit`). Callers wanting more results widen
/// `radius_km` (see `RecommendationEngine::more`).
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub intent_text: String,
    /// Center of the search. May differ from the user's device position
    /// (e.g. a city center); every distance in this query is measured
    /// from here and nowhere else.
    pub search_origin: GeoPoint,
    pub radius_km: f64,
    pub city_filter: Option<String>,
    /// Inclusive (min, max) price-tier bounds.
    pub price_range: Option<(u8, u8)>,
    pub exclude_ids: HashSet<String>,
    pub sort_by_price: bool,
}

impl QueryContext {
    pub fn new(intent_text: impl Into<String>, search_origin: GeoPoint, radius_km: f64) -> Self {
        Self {
            intent_text: intent_text.into(),
            search_origin,
            radius_km,
            city_filter: None,
            price_range: None,
            exclude_ids: HashSet::new(),
            sort_by_price: false,
        }
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city_filter = Some(city.into());
        self
    }

    pub fn with_price_range(mut self, min: u8, max: u8) -> Self {
        self.price_range = Some((min, max));
        self
    }

    pub fn with_excluded(mut self, ids: HashSet<String>) -> Self {
        self.exclude_ids = ids;
        self
    }

    pub fn sorted_by_price(mut self) -> Self {
        self.sort_by_price = true;
        self
    }

    /// Rejects contexts the store must never see. The engine trusts nothing
    /// chosen by an upstream decision layer until it has passed here.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.intent_text.trim().is_empty() {
            return Err(EngineError::MalformedQuery("intent text is empty".into()));
        }
        if !self.search_origin.is_valid() {
            return Err(EngineError::MalformedQuery(format!(
                "search origin out of range: ({}, {})",
                self.search_origin.lat, self.search_origin.lng
            )));
        }
        if !(self.radius_km > 0.0) {
            return Err(EngineError::MalformedQuery(format!(
                "radius must be positive, got {}",
                self.radius_km
            )));
        }
        if let Some((min, max)) = self.price_range {
            if min < 1 || max > 5 || min > max {
                return Err(EngineError::MalformedQuery(format!(
                    "price range ({min}, {max}) is not an ordered pair within 1..=5"
                )));
            }
        }
        Ok(())
    }
}
