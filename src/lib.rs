// src/lib.rs

//! tablescout — venue retrieval & ranking engine.
//!
//! Turns a free-text intent plus a geographic search origin into an
//! ordered, deduplicated, time-aware candidate list, and caches enough
//! per-session state to answer follow-ups (detail lookup, "show more",
//! re-filtering) without re-querying the store. Orchestration, NL
//! understanding, transport, and ingestion live outside this crate.

pub mod config;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod geo;
pub mod hours;
pub mod logging;
pub mod scoring;
pub mod session;
pub mod store;
pub mod types;

pub use config::{EngineConfig, CONFIG};
pub use embeddings::{EmbeddingClient, EmbeddingProvider};
pub use engine::{resolve_radius, RecommendationEngine};
pub use error::EngineError;
pub use geo::{haversine_km, DistanceBuckets};
pub use hours::{is_open_at, DayHours, TimeRange, WeeklySchedule};
pub use scoring::{ScoreComponents, ScoringConfig};
pub use session::{InMemorySessionStore, SessionStore};
pub use store::{QdrantVenueStore, VenueStore};
pub use types::{Candidate, EnrichedCandidate, GeoPoint, QueryContext};
