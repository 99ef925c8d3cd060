// src/engine.rs
// The retrieval & ranking pipeline: embed intent, query the store, enrich
// candidates in parallel, score, sort, cache per session.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tracing::{info, warn};

use crate::config::CONFIG;
use crate::embeddings::EmbeddingProvider;
use crate::error::EngineError;
use crate::geo::distance::{haversine_km, DistanceBuckets};
use crate::geo::timezone::resolve_or_utc;
use crate::hours::is_open_at;
use crate::scoring::{quality_score, score, ScoreComponents, ScoringConfig};
use crate::session::SessionStore;
use crate::store::VenueStore;
use crate::types::{Candidate, EnrichedCandidate, GeoPoint, QueryContext};

/// Single documented precedence for choosing a radius: explicit caller
/// value, then the session's last-used value, then the global default.
/// Every call site goes through here; none picks its own order.
pub fn resolve_radius(explicit: Option<f64>, session_default: Option<f64>, config_default: f64) -> f64 {
    explicit.or(session_default).unwrap_or(config_default)
}

/// The venue retrieval & ranking engine.
///
/// The engine never infers intent: it only executes validated
/// `QueryContext` values handed to it by the orchestration layer. The
/// result count per query is a fixed policy (`CONFIG.result_limit`);
/// "more results" widens the search radius, never the limit.
pub struct RecommendationEngine {
    store: Arc<dyn VenueStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    sessions: Arc<dyn SessionStore>,
    scoring: ScoringConfig,
    buckets: DistanceBuckets,
    result_limit: usize,
    enrich_concurrency: usize,
    default_radius_km: f64,
    radius_widen_km: f64,
}

impl RecommendationEngine {
    pub fn new(
        store: Arc<dyn VenueStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            store,
            embedder,
            sessions,
            scoring: ScoringConfig::from_engine_config(&CONFIG),
            buckets: DistanceBuckets::default(),
            result_limit: CONFIG.result_limit,
            enrich_concurrency: CONFIG.enrich_concurrency,
            default_radius_km: CONFIG.default_radius_km,
            radius_widen_km: CONFIG.radius_widen_km,
        }
    }

    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn with_buckets(mut self, buckets: DistanceBuckets) -> Self {
        self.buckets = buckets;
        self
    }

    pub fn with_result_limit(mut self, limit: usize) -> Self {
        self.result_limit = limit;
        self
    }

    pub fn with_enrich_concurrency(mut self, cap: usize) -> Self {
        self.enrich_concurrency = cap;
        self
    }

    /// Primary entry point: one search invocation for a session.
    pub async fn search(
        &self,
        session_id: &str,
        ctx: QueryContext,
    ) -> Result<Vec<EnrichedCandidate>, EngineError> {
        self.search_with_deadline(session_id, ctx, None).await
    }

    /// As `search`, but inheriting a caller deadline for the enrichment
    /// stage. Candidates whose enrichment did not finish in time come back
    /// degraded instead of failing the request.
    pub async fn search_with_deadline(
        &self,
        session_id: &str,
        ctx: QueryContext,
        enrich_deadline: Option<Duration>,
    ) -> Result<Vec<EnrichedCandidate>, EngineError> {
        ctx.validate()?;
        let start = std::time::Instant::now();

        let embedding = self
            .embedder
            .embed(&ctx.intent_text)
            .await
            .map_err(|e| EngineError::Embedding(e.to_string()))?;

        let raw = self.store.search(&embedding, &ctx, self.result_limit).await?;
        info!(
            "Store returned {} candidates in {:?} (radius {} km)",
            raw.len(),
            start.elapsed(),
            ctx.radius_km
        );

        let mut enriched = self.enrich_all(&ctx, raw, enrich_deadline).await;
        sort_results(&mut enriched, ctx.sort_by_price);

        for entry in &enriched {
            self.sessions.put(session_id, entry.clone()).await;
        }
        self.sessions.set_last_context(session_id, ctx).await;

        info!(
            "Search for session {} done in {:?}: {} ranked results",
            session_id,
            start.elapsed(),
            enriched.len()
        );
        Ok(enriched)
    }

    /// Convenience entry that builds the context from loose parameters,
    /// applying the radius precedence (explicit > session > config).
    pub async fn search_intent(
        &self,
        session_id: &str,
        intent_text: &str,
        origin: GeoPoint,
        radius_km: Option<f64>,
    ) -> Result<Vec<EnrichedCandidate>, EngineError> {
        let session_radius = self
            .sessions
            .last_context(session_id)
            .await
            .map(|c| c.radius_km);
        let radius = resolve_radius(radius_km, session_radius, self.default_radius_km);
        self.search(session_id, QueryContext::new(intent_text, origin, radius))
            .await
    }

    /// Detail lookup: cache-first, store-fallback. Returned in the order
    /// requested; ids unknown to both cache and store are simply absent.
    pub async fn get_by_id(
        &self,
        session_id: &str,
        ids: &[String],
    ) -> Result<Vec<EnrichedCandidate>, EngineError> {
        let mut hits: Vec<(usize, EnrichedCandidate)> = Vec::new();
        let mut misses: Vec<(usize, String)> = Vec::new();

        for (pos, id) in ids.iter().enumerate() {
            match self.sessions.get(session_id, id).await {
                Some(entry) => hits.push((pos, (*entry).clone())),
                None => misses.push((pos, id.clone())),
            }
        }

        if !misses.is_empty() {
            let miss_ids: Vec<String> = misses.iter().map(|(_, id)| id.clone()).collect();
            info!("Cache miss for {} ids, fetching from store", miss_ids.len());
            let fetched = self.store.fetch_by_ids(&miss_ids).await?;

            // Without a prior search there is no origin to measure from;
            // those entries come back degraded, with no distance signal
            // in their composite.
            let origin = self
                .sessions
                .last_context(session_id)
                .await
                .map(|c| c.search_origin);

            for candidate in fetched {
                let pos = misses
                    .iter()
                    .find(|(_, id)| *id == candidate.id)
                    .map(|(pos, _)| *pos);
                let Some(pos) = pos else { continue };

                let entry = match origin {
                    Some(origin) => self.enrich_candidate(origin, candidate),
                    None => self.enrich_without_origin(candidate),
                };
                self.sessions.put(session_id, entry.clone()).await;
                hits.push((pos, entry));
            }
        }

        hits.sort_by_key(|(pos, _)| *pos);
        Ok(hits.into_iter().map(|(_, entry)| entry).collect())
    }

    /// Pagination: re-issues the session's last search with every id the
    /// session has already seen excluded and the radius widened. The result
    /// limit stays fixed by policy.
    pub async fn more(
        &self,
        session_id: &str,
        expand_radius_km: Option<f64>,
    ) -> Result<Vec<EnrichedCandidate>, EngineError> {
        let Some(last) = self.sessions.last_context(session_id).await else {
            return Err(EngineError::MalformedQuery(format!(
                "session {session_id} has no prior search to expand"
            )));
        };

        let widen = expand_radius_km.unwrap_or(self.radius_widen_km);
        let exclude: HashSet<String> = self.sessions.known_ids(session_id).await;
        info!(
            "Expanding session {}: radius {} -> {} km, {} ids excluded",
            session_id,
            last.radius_km,
            last.radius_km + widen,
            exclude.len()
        );

        let mut ctx = last;
        ctx.radius_km += widen;
        ctx.exclude_ids = exclude;
        self.search(session_id, ctx).await
    }

    /// Re-applies presentation filters over the session's cached results.
    /// Served entirely from the cache — no store round-trip, no
    /// re-embedding. Venue city comes from the opaque `details` payload
    /// (`details.city`, stored lowercased at ingest), matched
    /// case-insensitively as substring or equality.
    pub async fn refilter(
        &self,
        session_id: &str,
        price_range: Option<(u8, u8)>,
        city: Option<&str>,
        open_only: bool,
    ) -> Result<Vec<EnrichedCandidate>, EngineError> {
        if let Some((min, max)) = price_range {
            if min < 1 || max > 5 || min > max {
                return Err(EngineError::MalformedQuery(format!(
                    "price range ({min}, {max}) is not an ordered pair within 1..=5"
                )));
            }
        }
        let city = city.map(|c| c.to_lowercase());

        let mut kept = Vec::new();
        for id in self.sessions.known_ids(session_id).await {
            let Some(entry) = self.sessions.get(session_id, &id).await else {
                continue;
            };
            if open_only && !entry.is_open {
                continue;
            }
            if let Some((min, max)) = price_range {
                match entry.candidate.price_tier {
                    Some(p) if p >= min && p <= max => {}
                    _ => continue,
                }
            }
            if let Some(city) = &city {
                let venue_city = entry
                    .candidate
                    .details
                    .get("city")
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                if !venue_city.to_lowercase().contains(city.as_str()) {
                    continue;
                }
            }
            kept.push((*entry).clone());
        }

        sort_results(&mut kept, false);
        info!(
            "Refilter for session {} kept {} cached results",
            session_id,
            kept.len()
        );
        Ok(kept)
    }

    /// Enriches candidates with bounded parallelism, preserving input order
    /// (composite-score ties fall back to it). On deadline expiry the
    /// remaining candidates are emitted degraded rather than dropped.
    async fn enrich_all(
        &self,
        ctx: &QueryContext,
        candidates: Vec<Candidate>,
        deadline: Option<Duration>,
    ) -> Vec<EnrichedCandidate> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let cap = self.enrich_concurrency.min(candidates.len()).max(1);
        let origin = ctx.search_origin;
        let pending = candidates.clone();

        let mut stream = futures::stream::iter(candidates.into_iter().map(|candidate| {
            let scoring = &self.scoring;
            let buckets = &self.buckets;
            async move { enrich_one(origin, candidate, scoring, buckets) }
        }))
        .buffered(cap);

        let deadline_at = deadline.map(|d| tokio::time::Instant::now() + d);
        let mut out = Vec::new();

        loop {
            let next = match deadline_at {
                Some(at) => match tokio::time::timeout_at(at, stream.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        warn!(
                            "Enrichment deadline hit after {} of {} candidates",
                            out.len(),
                            pending.len()
                        );
                        break;
                    }
                },
                None => stream.next().await,
            };
            match next {
                Some(entry) => out.push(entry),
                None => break,
            }
        }

        if out.len() < pending.len() {
            let done: HashSet<String> = out.iter().map(|e| e.id().to_string()).collect();
            for candidate in pending {
                if !done.contains(&candidate.id) {
                    out.push(degrade(origin, candidate, &self.scoring, &self.buckets));
                }
            }
        }

        out
    }

    fn enrich_candidate(&self, origin: GeoPoint, candidate: Candidate) -> EnrichedCandidate {
        enrich_one(origin, candidate, &self.scoring, &self.buckets)
    }

    /// Without a prior search there is no origin to measure from, so the
    /// distance component contributes 0 to the composite — the same rule
    /// missing rating/review data follows for quality — and the label
    /// makes no proximity claim.
    fn enrich_without_origin(&self, candidate: Candidate) -> EnrichedCandidate {
        let relevancy = (candidate.relevance_score as f64).clamp(0.0, 1.0);
        let quality = quality_score(candidate.rating, candidate.review_count, &self.scoring);
        let composite =
            self.scoring.weight_relevance * relevancy + self.scoring.weight_quality * quality;

        EnrichedCandidate {
            candidate,
            distance_km: 0.0,
            distance_label: "distance unknown".to_string(),
            is_open: false,
            degraded: true,
            scores: ScoreComponents {
                relevancy,
                quality,
                distance: 0.0,
                composite,
            },
        }
    }
}

/// Computes all derived fields for one candidate. Distance is measured from
/// the query's search origin — never from any other location signal.
fn enrich_one(
    origin: GeoPoint,
    candidate: Candidate,
    scoring: &ScoringConfig,
    buckets: &DistanceBuckets,
) -> EnrichedCandidate {
    let distance_km = haversine_km(origin, candidate.location);
    let distance_label = buckets.label(distance_km).to_string();

    let clock = resolve_or_utc(candidate.location);
    let is_open = is_open_at(candidate.weekly_schedule.as_ref(), clock.weekday, clock.time);
    let degraded = clock.utc_fallback || candidate.weekly_schedule.is_none();

    let scores = score(&candidate, distance_km, scoring);

    EnrichedCandidate {
        candidate,
        distance_km,
        distance_label,
        is_open,
        degraded,
        scores,
    }
}

/// Degraded enrichment: distance and scores still computed (both cheap),
/// open-status conservatively false with the low-confidence flag set.
fn degrade(
    origin: GeoPoint,
    candidate: Candidate,
    scoring: &ScoringConfig,
    buckets: &DistanceBuckets,
) -> EnrichedCandidate {
    let distance_km = haversine_km(origin, candidate.location);
    let distance_label = buckets.label(distance_km).to_string();
    let scores = score(&candidate, distance_km, scoring);

    EnrichedCandidate {
        candidate,
        distance_km,
        distance_label,
        is_open: false,
        degraded: true,
        scores,
    }
}

/// Final presentation order: open venues first, then composite score
/// descending; the sort is stable so ties keep input order. With
/// `sort_by_price`, a lower price tier wins before the composite does.
pub fn sort_results(results: &mut [EnrichedCandidate], sort_by_price: bool) {
    results.sort_by(|a, b| {
        b.is_open
            .cmp(&a.is_open)
            .then_with(|| {
                if sort_by_price {
                    let pa = a.candidate.price_tier.unwrap_or(u8::MAX);
                    let pb = b.candidate.price_tier.unwrap_or(u8::MAX);
                    pa.cmp(&pb)
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .then_with(|| {
                b.scores
                    .composite
                    .partial_cmp(&a.scores.composite)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });
}
