// src/store/filter.rs

//! Qdrant filter builders for venue queries.

use serde_json::{json, Value};

use crate::types::QueryContext;

/// Point ids are numeric when they parse as one, string otherwise.
pub fn id_value(id: &str) -> Value {
    match id.parse::<u64>() {
        Ok(n) => json!(n),
        Err(_) => json!(id),
    }
}

/// Builds the filter block for one query: geofence around the search
/// origin, optional city and price-tier predicates, and exclusion of ids
/// already surfaced this session.
pub fn build_venue_filter(ctx: &QueryContext) -> Value {
    let mut must = vec![json!({
        "key": "location",
        "geo_radius": {
            "center": { "lat": ctx.search_origin.lat, "lon": ctx.search_origin.lng },
            "radius": ctx.radius_km * 1000.0
        }
    })];

    if let Some(city) = &ctx.city_filter {
        // The ingest pipeline stores `city` lowercased; lowercasing the
        // query side makes the match case-insensitive.
        must.push(json!({
            "key": "city",
            "match": { "text": city.to_lowercase() }
        }));
    }

    if let Some((min, max)) = ctx.price_range {
        must.push(json!({
            "key": "price_tier",
            "range": { "gte": min, "lte": max }
        }));
    }

    if ctx.exclude_ids.is_empty() {
        json!({ "must": must })
    } else {
        // Sorted so identical queries produce identical request bodies.
        let mut ids: Vec<&String> = ctx.exclude_ids.iter().collect();
        ids.sort();
        let ids: Vec<Value> = ids.iter().map(|id| id_value(id)).collect();
        json!({
            "must": must,
            "must_not": [{ "has_id": ids }]
        })
    }
}
