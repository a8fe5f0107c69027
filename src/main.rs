#![deny(
    warnings,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo
)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::Result;
use chrono::{Duration, Utc};
use clap::Parser;
use gymfence::provider::{GpxReplayProvider, LocationProvider, SimulatedProvider};
use gymfence::store::{SqliteStore, load_registry, save_registry};
use gymfence::types::GeoPoint;
use gymfence::{TrackerConfig, VisitTracker, cli, utils};
use std::path::Path;

#[macro_use]
extern crate gymfence;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    utils::init_logging(cli.verbose, cli.quiet);

    if cli.min_minutes <= 0 {
        anyhow::bail!("--min-minutes must be positive");
    }
    let config = TrackerConfig {
        min_duration_minutes: cli.min_minutes,
        weekly_visit_target: cli.weekly_target,
    };

    let gyms_path = cli.data_dir.join("gyms.json");
    let visits_path = cli.data_dir.join("visits.sqlite3");

    match cli.cmd {
        Some(cli::Cmd::Gym {
            cmd,
        }) => run_gym(&gyms_path, &cmd),
        Some(cli::Cmd::Replay {
            path,
        }) => {
            dlog!("mode=replay path={}", path.display());
            let mut provider = GpxReplayProvider::new(path);
            run_provider(&gyms_path, &visits_path, config, &mut provider)
        }
        Some(cli::Cmd::Simulate {
            ticks,
            interval_secs,
            at_gym_probability,
            seed,
        }) => {
            dlog!("mode=simulate ticks={ticks} interval_secs={interval_secs}");
            let mut provider =
                SimulatedProvider::new(ticks, Duration::seconds(i64::from(interval_secs)));
            provider.at_gym_probability = at_gym_probability;
            provider.seed = seed;
            run_provider(&gyms_path, &visits_path, config, &mut provider)
        }
        None => report(&gyms_path, &visits_path, config),
    }
}

fn run_gym(gyms_path: &Path, cmd: &cli::GymCmd) -> Result<()> {
    let mut registry = load_registry(gyms_path)?;

    match cmd {
        cli::GymCmd::Add {
            name,
            lat,
            lon,
            radius,
        } => {
            let fence = registry.add(name, GeoPoint::new(*lat, *lon), Some(*radius))?;
            save_registry(gyms_path, &registry)?;
            println!("{}\t{}\t{},{}\t{}m", fence.id, fence.name, *lat, *lon, *radius);
        }
        cli::GymCmd::Remove {
            id,
        } => {
            if registry.remove(id) {
                save_registry(gyms_path, &registry)?;
                println!("removed {id}");
            } else {
                println!("no gym with id {id}");
            }
        }
        cli::GymCmd::List => {
            if registry.is_empty() {
                println!("no gyms registered (use `gymfence gym add`)");
            }
            for fence in registry.iter() {
                println!(
                    "{}\t{}\t{},{}\t{}m",
                    fence.id,
                    fence.name,
                    fence.center.latitude,
                    fence.center.longitude,
                    fence.radius_meters
                );
            }
        }
    }

    Ok(())
}

fn open_tracker(gyms_path: &Path, visits_path: &Path, config: TrackerConfig) -> Result<VisitTracker> {
    let registry = load_registry(gyms_path)?;
    let store = SqliteStore::open(visits_path)?;
    let tracker = VisitTracker::new(registry, Box::new(store), config)?;
    Ok(tracker)
}

fn run_provider(
    gyms_path: &Path,
    visits_path: &Path,
    config: TrackerConfig,
    provider: &mut dyn LocationProvider,
) -> Result<()> {
    let mut tracker = open_tracker(gyms_path, visits_path, config)?;
    let before = tracker.total_visit_count();

    provider.run(&mut tracker)?;

    let committed = tracker.total_visit_count() - before;
    println!("committed {committed} workout(s), {} on record", tracker.total_visit_count());
    print_report(&tracker);
    Ok(())
}

fn report(gyms_path: &Path, visits_path: &Path, config: TrackerConfig) -> Result<()> {
    let tracker = open_tracker(gyms_path, visits_path, config)?;
    print_report(&tracker);
    Ok(())
}

fn print_report(tracker: &VisitTracker) {
    let now = Utc::now();
    let weekly = tracker.weekly_visit_count(now);
    let target = tracker.config().weekly_visit_target;
    let status = if tracker.weekly_target_met(now) {
        "met"
    } else {
        "not met"
    };

    println!(
        "workouts: {} total, {weekly}/{target} in the last 7 days (target {status})",
        tracker.total_visit_count()
    );

    for (i, visit) in tracker.visits().iter().enumerate() {
        let gym_name = tracker
            .registry()
            .get(&visit.geofence_id)
            .map_or_else(|| visit.geofence_id.clone(), |f| f.name.clone());
        let dur = utils::format_duration(Duration::minutes(visit.duration_minutes));

        println!("{}\t{}\t{dur}\t{gym_name}", i + 1, visit.entered_at.to_rfc3339());
    }
}
