use crate::error::{Error, Result};
use crate::types::{DEFAULT_RADIUS_METERS, GeoPoint, Geofence};

/// In-memory set of registered gym locations.
///
/// Insertion order is preserved and ids are never reused, even after a
/// removal. Persisting the set across runs is the caller's concern (see
/// `store::load_registry` / `store::save_registry`).
#[derive(Debug, Default)]
pub struct GeofenceRegistry {
    fences: Vec<Geofence>,
    next_id: u64,
}

impl GeofenceRegistry {
    pub fn new() -> Self {
        Self {
            fences: Vec::new(),
            next_id: 1,
        }
    }

    /// Rebuild a registry from a persisted snapshot. The id counter resumes
    /// past the highest id seen so removed ids stay retired.
    pub fn from_fences(fences: Vec<Geofence>) -> Self {
        let next_id = fences
            .iter()
            .filter_map(|f| f.id.strip_prefix("gym-").and_then(|s| s.parse::<u64>().ok()))
            .max()
            .map_or(1, |max| max + 1);

        Self {
            fences,
            next_id,
        }
    }

    /// Register a new gym and return the created record.
    pub fn add(
        &mut self,
        name: &str,
        center: GeoPoint,
        radius_meters: Option<f64>,
    ) -> Result<Geofence> {
        if name.trim().is_empty() {
            return Err(Error::InvalidGeofence("name must not be empty".to_owned()));
        }
        if !center.is_valid() {
            return Err(Error::InvalidGeofence(format!(
                "coordinates out of range: ({}, {})",
                center.latitude, center.longitude
            )));
        }

        let radius_meters = radius_meters.unwrap_or(DEFAULT_RADIUS_METERS);
        if !radius_meters.is_finite() || radius_meters <= 0.0 {
            return Err(Error::InvalidGeofence(format!(
                "radius must be a positive number of meters, got {radius_meters}"
            )));
        }

        let fence = Geofence {
            id: format!("gym-{}", self.next_id),
            name: name.trim().to_owned(),
            center,
            radius_meters,
        };
        self.next_id += 1;

        tracing::debug!(id = %fence.id, name = %fence.name, radius = radius_meters, "gym registered");
        self.fences.push(fence.clone());
        Ok(fence)
    }

    /// Remove by id. Idempotent: missing ids return `false`, not an error.
    /// Already-committed visits referencing the id are unaffected.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.fences.len();
        self.fences.retain(|f| f.id != id);
        self.fences.len() != before
    }

    pub fn get(&self, id: &str) -> Option<&Geofence> {
        self.fences.iter().find(|f| f.id == id)
    }

    /// Snapshot copy, in insertion order.
    pub fn list(&self) -> Vec<Geofence> {
        self.fences.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Geofence> {
        self.fences.iter()
    }

    pub fn len(&self) -> usize {
        self.fences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fences.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_assigns_fresh_ids_in_order() {
        let mut reg = GeofenceRegistry::new();
        let a = reg.add("Downtown Fitness", GeoPoint::new(37.7749, -122.4194), None).unwrap();
        let b = reg.add("Uptown Health Club", GeoPoint::new(37.7833, -122.4167), Some(50.0)).unwrap();

        assert_eq!(a.id, "gym-1");
        assert_eq!(b.id, "gym-2");
        assert_eq!(a.radius_meters, DEFAULT_RADIUS_METERS);
        assert_eq!(b.radius_meters, 50.0);

        let ids: Vec<_> = reg.list().into_iter().map(|f| f.id).collect();
        assert_eq!(ids, ["gym-1", "gym-2"]);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut reg = GeofenceRegistry::new();
        let gym = reg.add("Westside Gym", GeoPoint::new(37.7694, -122.4862), None).unwrap();

        assert!(reg.remove(&gym.id));
        assert!(!reg.remove(&gym.id));
        assert!(reg.is_empty());
    }

    #[test]
    fn ids_are_not_reused_after_removal() {
        let mut reg = GeofenceRegistry::new();
        let a = reg.add("A", GeoPoint::new(0.0, 0.0), None).unwrap();
        reg.remove(&a.id);
        let b = reg.add("B", GeoPoint::new(0.0, 0.0), None).unwrap();

        assert_ne!(a.id, b.id);
    }

    #[test]
    fn rejects_invalid_input() {
        let mut reg = GeofenceRegistry::new();

        assert!(reg.add("  ", GeoPoint::new(0.0, 0.0), None).is_err());
        assert!(reg.add("G", GeoPoint::new(91.0, 0.0), None).is_err());
        assert!(reg.add("G", GeoPoint::new(0.0, f64::NAN), None).is_err());
        assert!(reg.add("G", GeoPoint::new(0.0, 0.0), Some(0.0)).is_err());
        assert!(reg.add("G", GeoPoint::new(0.0, 0.0), Some(-5.0)).is_err());
        assert!(reg.is_empty());
    }

    #[test]
    fn from_fences_resumes_id_counter() {
        let mut reg = GeofenceRegistry::new();
        reg.add("A", GeoPoint::new(0.0, 0.0), None).unwrap();
        reg.add("B", GeoPoint::new(1.0, 1.0), None).unwrap();

        let mut restored = GeofenceRegistry::from_fences(reg.list());
        let c = restored.add("C", GeoPoint::new(2.0, 2.0), None).unwrap();
        assert_eq!(c.id, "gym-3");
    }
}
