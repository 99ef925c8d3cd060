// src/store/mod.rs

//! The searchable venue store seam. All retrieval goes through the
//! `VenueStore` trait — no direct HTTP calls in engine logic.

pub mod filter;
pub mod qdrant;

use async_trait::async_trait;

use crate::error::EngineError;
use crate::types::{Candidate, QueryContext};

/// Backing store for venue documents: similarity search plus the direct
/// fetch-by-id path used when the session cache misses.
#[async_trait]
pub trait VenueStore: Send + Sync {
    /// Runs one semantic + geospatial + attribute-filtered query and
    /// returns at most `limit` candidates sorted by relevance descending.
    /// An empty result is success, distinct from the store being down.
    async fn search(
        &self,
        embedding: &[f32],
        ctx: &QueryContext,
        limit: usize,
    ) -> Result<Vec<Candidate>, EngineError>;

    /// Retrieves specific venues by id. Missing ids are simply absent from
    /// the result; the returned candidates carry no relevance score.
    async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<Candidate>, EngineError>;
}

pub use qdrant::QdrantVenueStore;
