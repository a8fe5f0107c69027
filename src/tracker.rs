use crate::error::{Error, Result};
use crate::geo;
use crate::registry::GeofenceRegistry;
use crate::store::VisitStore;
use crate::types::{LocationFix, TrackerConfig, VisitSession, WorkoutVisit};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Per-geofence enter/exit state machine plus the append-only workout log.
///
/// Drive it with a single sequential stream of fixes; `on_location_fix` and
/// `stop_tracking` must not be called concurrently for one instance. Queries
/// hand out owned snapshots so readers never observe a half-updated log.
pub struct VisitTracker {
    registry: GeofenceRegistry,
    store: Box<dyn VisitStore>,
    config: TrackerConfig,
    sessions: HashMap<String, VisitSession>,
    visits: Vec<WorkoutVisit>,
    last_fix_at: Option<DateTime<Utc>>,
}

impl VisitTracker {
    /// Builds a tracker over an injected registry and store. Previously
    /// committed visits are loaded from the store once, here.
    pub fn new(
        registry: GeofenceRegistry,
        mut store: Box<dyn VisitStore>,
        config: TrackerConfig,
    ) -> Result<Self> {
        let visits = store.load()?;
        tracing::debug!(visits = visits.len(), gyms = registry.len(), "tracker ready");

        Ok(Self {
            registry,
            store,
            config,
            sessions: HashMap::new(),
            visits,
            last_fix_at: None,
        })
    }

    pub fn registry(&self) -> &GeofenceRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut GeofenceRegistry {
        &mut self.registry
    }

    pub const fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Classify one fix against every registered geofence and advance the
    /// session state machines.
    ///
    /// Entering a fence opens a session; leaving one closes it and commits a
    /// `WorkoutVisit` when the floored minute count reaches the minimum,
    /// otherwise the session is discarded silently. A fix inside several
    /// overlapping fences advances each of them independently. Repeated
    /// identical classifications are no-ops.
    ///
    /// Malformed fixes (non-finite or out-of-range coordinates, timestamp
    /// earlier than the previous fix) are rejected without touching any
    /// state. A store failure while committing propagates after the
    /// in-memory append; the visit is recorded, durability unconfirmed.
    pub fn on_location_fix(&mut self, fix: &LocationFix) -> Result<()> {
        if !fix.coordinates.is_valid() {
            return Err(Error::InvalidFix(format!(
                "coordinates out of range: ({}, {})",
                fix.coordinates.latitude, fix.coordinates.longitude
            )));
        }
        if let Some(last) = self.last_fix_at
            && fix.timestamp < last
        {
            return Err(Error::InvalidFix(format!(
                "timestamp regression: {} is earlier than previous fix {last}",
                fix.timestamp
            )));
        }
        self.last_fix_at = Some(fix.timestamp);

        for fence in self.registry.list() {
            let inside = geo::is_inside(fix.coordinates, &fence);

            if inside && !self.sessions.contains_key(&fence.id) {
                tracing::debug!(gym = %fence.name, at = %fix.timestamp, "entered geofence");
                self.sessions.insert(
                    fence.id.clone(),
                    VisitSession {
                        geofence_id: fence.id,
                        entered_at: fix.timestamp,
                    },
                );
            } else if !inside
                && let Some(session) = self.sessions.remove(&fence.id)
            {
                tracing::debug!(gym = %fence.name, at = %fix.timestamp, "exited geofence");
                self.close_session(session, fix.timestamp)?;
            }
        }

        Ok(())
    }

    /// Force-close every active session as of now. Without this, turning
    /// tracking off while still inside a gym would silently drop a
    /// qualifying visit.
    pub fn stop_tracking(&mut self) -> Result<()> {
        self.stop_tracking_at(Utc::now())
    }

    /// Same as [`stop_tracking`](Self::stop_tracking) with an explicit clock,
    /// for replay and tests.
    pub fn stop_tracking_at(&mut self, now: DateTime<Utc>) -> Result<()> {
        let mut sessions: Vec<VisitSession> =
            std::mem::take(&mut self.sessions).into_values().collect();
        // Keep the log chronological by entry time.
        sessions.sort_by_key(|s| s.entered_at);
        self.last_fix_at = None;

        for session in sessions {
            self.close_session(session, now)?;
        }
        Ok(())
    }

    fn close_session(&mut self, session: VisitSession, exited_at: DateTime<Utc>) -> Result<()> {
        let duration_minutes = (exited_at - session.entered_at).num_minutes();

        if duration_minutes < self.config.min_duration_minutes {
            tracing::debug!(
                gym = %session.geofence_id,
                minutes = duration_minutes,
                "visit below minimum duration, discarded"
            );
            return Ok(());
        }

        let visit = WorkoutVisit {
            geofence_id: session.geofence_id,
            entered_at: session.entered_at,
            exited_at,
            duration_minutes,
        };
        tracing::info!(
            gym = %visit.geofence_id,
            minutes = visit.duration_minutes,
            "workout committed"
        );

        self.visits.push(visit);
        self.store.save(&self.visits)
    }

    /// `entered_at` of every committed visit, in commit order.
    pub fn workout_dates(&self) -> Vec<DateTime<Utc>> {
        self.visits.iter().map(|v| v.entered_at).collect()
    }

    /// Committed visits whose entry falls in the rolling week
    /// `[now - 7d, now]`, both ends inclusive.
    pub fn weekly_visits(&self, now: DateTime<Utc>) -> Vec<WorkoutVisit> {
        let window_start = now - Duration::days(7);
        self.visits
            .iter()
            .filter(|v| v.entered_at >= window_start && v.entered_at <= now)
            .cloned()
            .collect()
    }

    pub fn weekly_visit_count(&self, now: DateTime<Utc>) -> usize {
        self.weekly_visits(now).len()
    }

    pub fn weekly_target_met(&self, now: DateTime<Utc>) -> bool {
        self.weekly_visit_count(now) >= self.config.weekly_visit_target as usize
    }

    pub fn total_visit_count(&self) -> usize {
        self.visits.len()
    }

    pub fn visits(&self) -> &[WorkoutVisit] {
        &self.visits
    }

    pub fn active_sessions(&self) -> impl Iterator<Item = &VisitSession> {
        self.sessions.values()
    }
}
