// tests/engine_test.rs
// End-to-end pipeline tests against mock store and embedder.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveTime, Weekday};

use tablescout::{
    Candidate, DayHours, EmbeddingProvider, EngineError, GeoPoint, InMemorySessionStore,
    QueryContext, RecommendationEngine, SessionStore, TimeRange, VenueStore, WeeklySchedule,
};

const ORIGIN: GeoPoint = GeoPoint {
    lat: 40.73,
    lng: -73.99,
};

struct MockEmbedder;

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        Ok(vec![0.1, 0.2, 0.3, 0.4])
    }
}

/// In-memory store: applies the geofence, price, and exclusion filters the
/// real store would, ranks by the baked-in relevance, and counts calls so
/// tests can assert on the cache-first path.
struct MockStore {
    docs: Vec<Candidate>,
    search_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl MockStore {
    fn new(docs: Vec<Candidate>) -> Self {
        Self {
            docs,
            search_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl VenueStore for MockStore {
    async fn search(
        &self,
        _embedding: &[f32],
        ctx: &QueryContext,
        limit: usize,
    ) -> Result<Vec<Candidate>, EngineError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);

        let mut hits: Vec<Candidate> = self
            .docs
            .iter()
            .filter(|c| tablescout::haversine_km(ctx.search_origin, c.location) <= ctx.radius_km)
            .filter(|c| !ctx.exclude_ids.contains(&c.id))
            .filter(|c| match ctx.price_range {
                Some((min, max)) => c
                    .price_tier
                    .map(|p| p >= min && p <= max)
                    .unwrap_or(false),
                None => true,
            })
            .cloned()
            .collect();

        hits.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<Candidate>, EngineError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .docs
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }
}

fn venue(id: &str, lat_offset: f64, relevance: f32) -> Candidate {
    Candidate {
        id: id.to_string(),
        title: format!("Venue {id}"),
        // ~111 km per degree of latitude, so 0.009 ≈ 1 km.
        location: GeoPoint::new(ORIGIN.lat + lat_offset, ORIGIN.lng),
        categories: vec!["restaurant".to_string()],
        rating: Some(4.0),
        review_count: Some(100),
        price_tier: Some(2),
        weekly_schedule: None,
        relevance_score: relevance,
        details: serde_json::Value::Null,
    }
}

fn always_open() -> WeeklySchedule {
    let all_day = TimeRange::new(
        NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
    );
    WeeklySchedule {
        days: [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ]
        .into_iter()
        .map(|day| DayHours {
            day,
            ranges: vec![all_day],
        })
        .collect(),
    }
}

fn build_engine(docs: Vec<Candidate>) -> (RecommendationEngine, Arc<MockStore>, Arc<InMemorySessionStore>) {
    let store = Arc::new(MockStore::new(docs));
    let sessions = Arc::new(InMemorySessionStore::new());
    let engine = RecommendationEngine::new(store.clone(), Arc::new(MockEmbedder), sessions.clone())
        .with_result_limit(5);
    (engine, store, sessions)
}

#[tokio::test]
async fn relevance_and_proximity_outrank_rating() {
    // The classic scenario: relevance 0.9 at 1 km vs relevance 0.6 at
    // 20 km with a better star rating. The first must win under default
    // weights.
    let mut near = venue("near", 0.009, 0.9);
    near.rating = Some(4.0);
    near.review_count = Some(50);
    let mut far = venue("far", 0.18, 0.6);
    far.rating = Some(5.0);
    far.review_count = Some(5);

    let (engine, _, _) = build_engine(vec![far, near]);
    let ctx = QueryContext::new("vegan", ORIGIN, 25.0);
    let results = engine.search("s1", ctx).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id(), "near");
    assert!(results[0].scores.composite > results[1].scores.composite);
}

#[tokio::test]
async fn filtered_set_smaller_than_limit_returns_what_exists() {
    // Five docs, but only three are inside the radius: exactly three come
    // back, not padded, not an error.
    let docs = vec![
        venue("a", 0.005, 0.9),
        venue("b", 0.010, 0.8),
        venue("c", 0.015, 0.7),
        venue("x", 0.9, 0.95), // ~100 km out
        venue("y", 1.0, 0.94),
    ];
    let (engine, _, _) = build_engine(docs);
    let results = engine
        .search("s1", QueryContext::new("ramen", ORIGIN, 5.0))
        .await
        .unwrap();
    assert_eq!(results.len(), 3);
}

#[tokio::test]
async fn more_never_repeats_surfaced_ids_and_widens_radius() {
    // Seven near docs: the first page fills the limit of 5, `more` must
    // surface only the remaining two.
    let docs: Vec<Candidate> = (0..7)
        .map(|i| venue(&format!("v{i}"), 0.001 * (i as f64 + 1.0), 0.9 - 0.05 * i as f32))
        .collect();
    let (engine, _, sessions) = build_engine(docs);

    let first = engine
        .search("s1", QueryContext::new("tacos", ORIGIN, 5.0))
        .await
        .unwrap();
    assert_eq!(first.len(), 5);
    let first_ids: HashSet<String> = first.iter().map(|e| e.id().to_string()).collect();

    let second = engine.more("s1", None).await.unwrap();
    assert_eq!(second.len(), 2);
    for entry in &second {
        assert!(!first_ids.contains(entry.id()), "repeated id {}", entry.id());
    }

    let last_ctx = sessions.last_context("s1").await.unwrap();
    assert!(last_ctx.radius_km > 5.0);

    // A third page has nothing left and says so with an empty success.
    let third = engine.more("s1", Some(10.0)).await.unwrap();
    assert!(third.is_empty());
}

#[tokio::test]
async fn more_without_prior_search_is_a_caller_bug() {
    let (engine, _, _) = build_engine(vec![]);
    let err = engine.more("fresh-session", None).await.unwrap_err();
    assert!(matches!(err, EngineError::MalformedQuery(_)));
}

#[tokio::test]
async fn get_by_id_is_cache_first() {
    let (engine, store, _) = build_engine(vec![venue("a", 0.005, 0.9), venue("b", 0.5, 0.8)]);

    engine
        .search("s1", QueryContext::new("pizza", ORIGIN, 5.0))
        .await
        .unwrap();
    assert_eq!(store.fetch_calls.load(Ordering::SeqCst), 0);

    // "a" was surfaced and cached; no store round-trip.
    let cached = engine.get_by_id("s1", &["a".to_string()]).await.unwrap();
    assert_eq!(cached.len(), 1);
    assert_eq!(store.fetch_calls.load(Ordering::SeqCst), 0);

    // "b" was outside the radius, so it misses the cache and falls back to
    // fetch-by-id, enriched against the session's last origin.
    let fetched = engine.get_by_id("s1", &["b".to_string()]).await.unwrap();
    assert_eq!(fetched.len(), 1);
    assert_eq!(store.fetch_calls.load(Ordering::SeqCst), 1);
    assert!(fetched[0].distance_km > 10.0);

    // Now "b" is cached too.
    engine.get_by_id("s1", &["b".to_string()]).await.unwrap();
    assert_eq!(store.fetch_calls.load(Ordering::SeqCst), 1);

    // Unknown everywhere: absent from the result, not an error.
    let none = engine.get_by_id("s1", &["ghost".to_string()]).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn get_by_id_without_prior_search_carries_no_distance_signal() {
    // A fresh session has no search origin: the fetched venue's distance
    // component must contribute nothing, and the label must not claim
    // proximity.
    let (engine, store, _) = build_engine(vec![venue("solo", 0.2, 0.7)]);
    let results = engine
        .get_by_id("fresh-session", &["solo".to_string()])
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(store.fetch_calls.load(Ordering::SeqCst), 1);

    let entry = &results[0];
    assert!(entry.degraded);
    assert_eq!(entry.scores.distance, 0.0);
    assert_eq!(entry.distance_label, "distance unknown");
    let recomposed = 0.5 * entry.scores.relevancy + 0.3 * entry.scores.quality;
    assert!((entry.scores.composite - recomposed).abs() < 1e-9);
}

#[tokio::test]
async fn refilter_serves_from_cache_without_store_calls() {
    let mut cheap = venue("cheap", 0.005, 0.9);
    cheap.price_tier = Some(1);
    cheap.details = serde_json::json!({ "city": "brooklyn" });
    let mut fancy = venue("fancy", 0.006, 0.8);
    fancy.price_tier = Some(4);
    fancy.details = serde_json::json!({ "city": "manhattan" });

    let (engine, store, _) = build_engine(vec![cheap, fancy]);
    engine
        .search("s1", QueryContext::new("dinner", ORIGIN, 5.0))
        .await
        .unwrap();
    assert_eq!(store.search_calls.load(Ordering::SeqCst), 1);

    let budget = engine.refilter("s1", Some((1, 2)), None, false).await.unwrap();
    assert_eq!(budget.len(), 1);
    assert_eq!(budget[0].id(), "cheap");

    // City match is case-insensitive.
    let manhattan = engine
        .refilter("s1", None, Some("Manhattan"), false)
        .await
        .unwrap();
    assert_eq!(manhattan.len(), 1);
    assert_eq!(manhattan[0].id(), "fancy");

    // Everything above was answered from the session cache.
    assert_eq!(store.search_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.fetch_calls.load(Ordering::SeqCst), 0);

    let err = engine
        .refilter("s1", Some((4, 2)), None, false)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::MalformedQuery(_)));
}

#[tokio::test]
async fn refilter_open_only_drops_closed_venues() {
    let mut open = venue("open", 0.005, 0.6);
    open.weekly_schedule = Some(always_open());
    let closed = venue("closed", 0.006, 0.9);

    let (engine, store, _) = build_engine(vec![open, closed]);
    engine
        .search("s1", QueryContext::new("lunch", ORIGIN, 5.0))
        .await
        .unwrap();

    let open_now = engine.refilter("s1", None, None, true).await.unwrap();
    assert_eq!(open_now.len(), 1);
    assert_eq!(open_now[0].id(), "open");
    assert_eq!(store.search_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn open_venues_rank_above_closed_ones() {
    let mut open = venue("open", 0.010, 0.5);
    open.weekly_schedule = Some(always_open());
    let closed = venue("closed", 0.005, 0.9); // better score, no schedule

    let (engine, _, _) = build_engine(vec![closed, open]);
    let results = engine
        .search("s1", QueryContext::new("late night", ORIGIN, 5.0))
        .await
        .unwrap();

    assert_eq!(results[0].id(), "open");
    assert!(results[0].is_open);
    assert!(!results[1].is_open);
}

#[tokio::test]
async fn missing_schedule_degrades_that_candidate_only() {
    let mut with_hours = venue("hours", 0.005, 0.8);
    with_hours.weekly_schedule = Some(always_open());
    let without = venue("no-hours", 0.006, 0.7);

    let (engine, _, _) = build_engine(vec![with_hours, without]);
    let results = engine
        .search("s1", QueryContext::new("brunch", ORIGIN, 5.0))
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    let degraded = results.iter().find(|e| e.id() == "no-hours").unwrap();
    assert!(degraded.degraded);
    assert!(!degraded.is_open);
    let healthy = results.iter().find(|e| e.id() == "hours").unwrap();
    assert!(!healthy.degraded);
}

#[tokio::test]
async fn price_filter_narrows_results() {
    let mut cheap = venue("cheap", 0.005, 0.7);
    cheap.price_tier = Some(1);
    let mut fancy = venue("fancy", 0.006, 0.9);
    fancy.price_tier = Some(4);

    let (engine, _, _) = build_engine(vec![cheap, fancy]);
    let ctx = QueryContext::new("dinner", ORIGIN, 5.0).with_price_range(1, 2);
    let results = engine.search("s1", ctx).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id(), "cheap");
}

#[tokio::test]
async fn invalid_context_rejected_before_any_io() {
    let (engine, store, _) = build_engine(vec![venue("a", 0.005, 0.9)]);
    let err = engine
        .search("s1", QueryContext::new("", ORIGIN, 5.0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::MalformedQuery(_)));
    assert_eq!(store.search_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn score_components_travel_with_every_result() {
    let (engine, _, _) = build_engine(vec![venue("a", 0.009, 0.9)]);
    let results = engine
        .search("s1", QueryContext::new("vegan", ORIGIN, 5.0))
        .await
        .unwrap();

    let s = &results[0].scores;
    assert!((s.relevancy - 0.9).abs() < 1e-6);
    assert!(s.quality > 0.0);
    assert!(s.distance > 0.0);
    let recomposed = 0.5 * s.relevancy + 0.3 * s.quality + 0.2 * s.distance;
    assert!((s.composite - recomposed).abs() < 1e-9);
}
