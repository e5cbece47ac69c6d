//! Distance and bearing between geographic points on a spherical earth.
//!
//! Accurate to well under a metre over the few-kilometre spans a survey
//! mission covers, which is all the mission core asks of it.

use asv_proto::GeoPoint;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in metres.
pub fn distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Initial compass bearing from `a` towards `b`, degrees in [0, 360).
pub fn bearing_deg(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlon = (b.lon - a.lon).to_radians();
    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    y.atan2(x).to_degrees().rem_euclid(360.0)
}

/// Distance and bearing in one call, the shape a geodesic inverse returns.
pub fn inverse(a: GeoPoint, b: GeoPoint) -> (f64, f64) {
    (bearing_deg(a, b), distance_m(a, b))
}

/// Point a fraction `f` of the way from `a` to `b`.
///
/// Linear in lat/lon; fine for the short legs a transit is sampled into.
pub fn interpolate(a: GeoPoint, b: GeoPoint, f: f64) -> GeoPoint {
    GeoPoint {
        lat: a.lat + (b.lat - a.lat) * f,
        lon: a.lon + (b.lon - a.lon) * f,
    }
}
