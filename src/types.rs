use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default geofence radius when none is given at registration.
pub const DEFAULT_RADIUS_METERS: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Finite and within [-90, 90] x [-180, 180].
    pub fn is_valid(self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A registered gym: a circular region around a center point.
///
/// Immutable once created; ids are assigned by the registry and never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Geofence {
    pub id: String,
    pub name: String,
    pub center: GeoPoint,
    pub radius_meters: f64,
}

/// One observed position sample from a location provider.
#[derive(Debug, Clone)]
pub struct LocationFix {
    pub coordinates: GeoPoint,
    pub timestamp: DateTime<Utc>,
    /// Informative only, never used for qualification.
    pub accuracy_meters: Option<f64>,
}

impl LocationFix {
    pub const fn new(coordinates: GeoPoint, timestamp: DateTime<Utc>) -> Self {
        Self {
            coordinates,
            timestamp,
            accuracy_meters: None,
        }
    }
}

/// In-progress presence inside one geofence. Exists only while the tracker
/// believes the user is currently inside; at most one per geofence id.
#[derive(Debug, Clone)]
pub struct VisitSession {
    pub geofence_id: String,
    pub entered_at: DateTime<Utc>,
}

/// A committed, qualified workout. Duration is floored to whole minutes and
/// is always >= the configured minimum; shorter sessions are discarded at
/// exit time and never recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutVisit {
    pub geofence_id: String,
    pub entered_at: DateTime<Utc>,
    pub exited_at: DateTime<Utc>,
    pub duration_minutes: i64,
}

/// Qualification policy for the tracker.
#[derive(Debug, Clone, Copy)]
pub struct TrackerConfig {
    /// Minimum whole-minute duration for a session to count as a workout.
    pub min_duration_minutes: i64,
    /// How many qualified visits per rolling week the user aims for.
    pub weekly_visit_target: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_duration_minutes: 30,
            weekly_visit_target: 3,
        }
    }
}
