// src/geo/mod.rs

pub mod distance;
pub mod timezone;

pub use distance::{haversine_km, DistanceBuckets};
pub use timezone::{resolve_local_time, resolve_or_utc, LocalClock};
