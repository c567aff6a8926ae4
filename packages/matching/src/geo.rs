//! Great-circle distance.

use carbonflow_marketplace_models::Location;

/// Mean Earth radius used for all distances, in km.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two points, in km.
///
/// Inputs are not range-checked: out-of-range coordinates give a number,
/// not an error. Validate with [`Location::validate`] first.
#[must_use]
pub fn distance_km(a: Location, b: Location) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push `h` a hair past 1 for antipodal points.
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}
