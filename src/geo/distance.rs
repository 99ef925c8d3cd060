// src/geo/distance.rs
// Great-circle distance and the human travel-time bucketing.

use crate::types::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine great-circle distance between two coordinates, in kilometers.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Maps distance ranges onto a small set of travel-time labels.
///
/// The table is presentation tuning, not business logic, so it is a value
/// callers can replace wholesale. Each entry is an inclusive upper bound in
/// km with its label; distances past the last bound get `beyond`.
#[derive(Debug, Clone)]
pub struct DistanceBuckets {
    pub bounds: Vec<(f64, String)>,
    pub beyond: String,
}

impl Default for DistanceBuckets {
    fn default() -> Self {
        Self {
            bounds: vec![
                (2.0, "a few minutes".to_string()),
                (5.0, "10-15 min".to_string()),
                (15.0, "15-30 min".to_string()),
            ],
            beyond: "30+ min".to_string(),
        }
    }
}

impl DistanceBuckets {
    pub fn label(&self, distance_km: f64) -> &str {
        for (bound, label) in &self.bounds {
            if distance_km <= *bound {
                return label;
            }
        }
        &self.beyond
    }
}
