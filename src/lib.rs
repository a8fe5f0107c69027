pub mod cli;
pub mod error;
pub mod geo;
pub mod gpx;
pub mod provider;
pub mod registry;
pub mod store;
pub mod tracker;
pub mod types;
pub mod utils;

pub use error::{Error, Result};
pub use registry::GeofenceRegistry;
pub use tracker::VisitTracker;
pub use types::{GeoPoint, Geofence, LocationFix, TrackerConfig, WorkoutVisit};
