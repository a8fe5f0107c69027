use crate::dlog;
use crate::gpx::parse_gpx_fixes;
use crate::tracker::VisitTracker;
use crate::types::{GeoPoint, LocationFix};
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Anything that can drive a stream of fixes through a tracker.
///
/// Implementations own the cadence and the shutdown point; the tracker only
/// ever sees fixes or their absence.
pub trait LocationProvider {
    fn run(&mut self, tracker: &mut VisitTracker) -> Result<()>;
}

/// Replays recorded GPX tracks: a single `.gpx` file or a directory of them.
///
/// Fixes from all files are merged and fed in timestamp order, then open
/// sessions are force-closed at the final fix's timestamp (replays are
/// historical, so the wall clock would inflate durations).
pub struct GpxReplayProvider {
    path: PathBuf,
}

impl GpxReplayProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }

    fn collect_files(&self) -> Result<Vec<PathBuf>> {
        if self.path.is_file() {
            return Ok(vec![self.path.clone()]);
        }
        if !self.path.is_dir() {
            bail!("replay path is neither a file nor a directory: {}", self.path.display());
        }

        let mut files: Vec<PathBuf> = WalkDir::new(&self.path)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().is_file() && is_gpx(e.path()))
            .map(|e| e.path().to_path_buf())
            .collect();
        files.sort();

        if files.is_empty() {
            bail!("no .gpx files under {}", self.path.display());
        }
        Ok(files)
    }
}

fn is_gpx(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s.eq_ignore_ascii_case("gpx"))
}

impl LocationProvider for GpxReplayProvider {
    fn run(&mut self, tracker: &mut VisitTracker) -> Result<()> {
        let files = self.collect_files()?;

        let mut fixes: Vec<LocationFix> = Vec::new();
        for file in &files {
            let mut parsed = parse_gpx_fixes(file)
                .with_context(|| format!("parsing GPX track: {}", file.display()))?;
            dlog!("gpx_file path={} fixes={}", file.display(), parsed.len());
            fixes.append(&mut parsed);
        }

        if fixes.is_empty() {
            bail!("GPX files contained no timestamped track points");
        }
        fixes.sort_by_key(|f| f.timestamp);

        tracing::info!(files = files.len(), fixes = fixes.len(), "replaying GPX fixes");
        let last_at = fixes[fixes.len() - 1].timestamp;
        for fix in &fixes {
            tracker.on_location_fix(fix)?;
        }
        tracker.stop_tracking_at(last_at)?;

        Ok(())
    }
}

/// Randomized location stream for demos: each tick the user is near one of
/// the registered gyms with probability `at_gym_probability`, otherwise far
/// from all of them. Deterministic under a fixed `seed` and `end_at`.
pub struct SimulatedProvider {
    pub ticks: u32,
    pub interval: Duration,
    pub at_gym_probability: f64,
    pub seed: Option<u64>,
    /// Timestamp of the final tick; defaults to now.
    pub end_at: Option<DateTime<Utc>>,
}

impl SimulatedProvider {
    pub fn new(ticks: u32, interval: Duration) -> Self {
        Self {
            ticks,
            interval,
            at_gym_probability: 0.7,
            seed: None,
            end_at: None,
        }
    }
}

impl LocationProvider for SimulatedProvider {
    fn run(&mut self, tracker: &mut VisitTracker) -> Result<()> {
        let gyms = tracker.registry().list();
        if gyms.is_empty() {
            bail!("no gyms registered; nothing to simulate");
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let end = self.end_at.unwrap_or_else(Utc::now);
        let start = end - self.interval * i32::try_from(self.ticks).unwrap_or(i32::MAX);

        tracing::info!(ticks = self.ticks, gyms = gyms.len(), "simulating location stream");

        for i in 0..self.ticks {
            let at = start + self.interval * i32::try_from(i + 1).unwrap_or(i32::MAX);

            let point = if rng.gen_range(0.0..1.0) < self.at_gym_probability {
                let gym = &gyms[rng.gen_range(0..gyms.len())];
                GeoPoint::new(
                    gym.center.latitude + rng.gen_range(-0.000_05..0.000_05),
                    gym.center.longitude + rng.gen_range(-0.000_05..0.000_05),
                )
            } else {
                // Half a degree off the first gym clears any realistic radius.
                GeoPoint::new(
                    (gyms[0].center.latitude + 0.5 + rng.gen_range(0.0..0.1)).clamp(-89.0, 89.0),
                    (gyms[0].center.longitude + 0.5 + rng.gen_range(0.0..0.1)).clamp(-179.0, 179.0),
                )
            };

            let mut fix = LocationFix::new(point, at);
            fix.accuracy_meters = Some(10.0);
            tracker.on_location_fix(&fix)?;
        }

        tracker.stop_tracking_at(end)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::GeofenceRegistry;
    use crate::store::MemoryStore;
    use crate::types::TrackerConfig;
    use chrono::TimeZone;
    use std::fs;

    const DOWNTOWN: GeoPoint = GeoPoint::new(40.7128, -74.0060);

    fn tracker_with_gym() -> VisitTracker {
        let mut registry = GeofenceRegistry::new();
        registry.add("Downtown", DOWNTOWN, Some(100.0)).unwrap();
        VisitTracker::new(registry, Box::new(MemoryStore::new()), TrackerConfig::default())
            .unwrap()
    }

    fn trkpt(lat: f64, lon: f64, time: &str) -> String {
        format!(r#"<trkpt lat="{lat}" lon="{lon}"><time>{time}</time></trkpt>"#)
    }

    #[test]
    fn replay_commits_a_qualifying_visit() {
        let dir = tempfile::tempdir().unwrap();
        let track = format!(
            "<gpx><trk><trkseg>{}{}{}</trkseg></trk></gpx>",
            trkpt(40.7128, -74.0060, "2024-06-03T12:00:00Z"),
            trkpt(40.7128, -74.0060, "2024-06-03T12:35:00Z"),
            trkpt(41.0, -75.0, "2024-06-03T12:35:30Z"),
        );
        fs::write(dir.path().join("morning.gpx"), track).unwrap();

        let mut tracker = tracker_with_gym();
        GpxReplayProvider::new(dir.path()).run(&mut tracker).unwrap();

        assert_eq!(tracker.total_visit_count(), 1);
        assert_eq!(tracker.visits()[0].duration_minutes, 35);
        assert_eq!(tracker.active_sessions().count(), 0);
    }

    #[test]
    fn replay_of_empty_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = tracker_with_gym();
        assert!(GpxReplayProvider::new(dir.path()).run(&mut tracker).is_err());
    }

    #[test]
    fn seeded_simulation_is_deterministic() {
        let end = Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap();

        let run = || {
            let mut tracker = tracker_with_gym();
            let mut provider = SimulatedProvider::new(240, Duration::seconds(30));
            provider.seed = Some(42);
            provider.end_at = Some(end);
            provider.run(&mut tracker).unwrap();
            (tracker.total_visit_count(), tracker.workout_dates())
        };

        let (count_a, dates_a) = run();
        let (count_b, dates_b) = run();
        assert_eq!(count_a, count_b);
        assert_eq!(dates_a, dates_b);
    }
}
