use crate::types::{GeoPoint, Geofence};

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance between two points, haversine formula.
///
/// Symmetric, and zero exactly when `a == b`.
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Boundary-inclusive containment: a point exactly on the radius is inside.
pub fn is_inside(point: GeoPoint, fence: &Geofence) -> bool {
    distance_meters(point, fence.center) <= fence.radius_meters
}
