use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

const DEFAULT_DATA_DIR: &str = ".";

#[derive(Parser, Debug)]
#[command(
    name = "gymfence",
    about = "Track gym visits by geofencing a stream of location fixes (GPX replay or simulation)"
)]
pub struct Cli {
    /// Directory holding gyms.json and visits.sqlite3.
    #[arg(long, value_name = "DIR", default_value = DEFAULT_DATA_DIR, global = true)]
    pub data_dir: PathBuf,

    /// Minimum session length, in minutes, for a visit to count as a workout.
    #[arg(long, default_value_t = 30, global = true)]
    pub min_minutes: i64,

    /// Weekly qualified-visit target.
    #[arg(long, default_value_t = 3, global = true)]
    pub weekly_target: u32,

    /// Increase log verbosity (-v, -vv). Defaults to INFO.
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Decrease log verbosity (-q, -qq). Defaults to INFO.
    #[arg(short = 'q', long, action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Without a subcommand, prints the workout report.
    #[command(subcommand)]
    pub cmd: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Manage registered gym locations.
    Gym {
        #[command(subcommand)]
        cmd: GymCmd,
    },

    /// Replay a recorded GPX track (file or directory of .gpx files).
    Replay {
        /// Path to a .gpx file or a directory to scan for them.
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Feed a randomized location stream through the tracker.
    Simulate {
        /// Number of simulated fixes.
        #[arg(long, default_value_t = 240)]
        ticks: u32,

        /// Seconds between simulated fixes.
        #[arg(long, default_value_t = 30)]
        interval_secs: u32,

        /// Chance per tick of being at a gym, 0.0..=1.0.
        #[arg(long, default_value_t = 0.7)]
        at_gym_probability: f64,

        /// RNG seed for a reproducible stream.
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
pub enum GymCmd {
    /// Register a new gym location.
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        lat: f64,

        #[arg(long)]
        lon: f64,

        /// Geofence radius in meters.
        #[arg(long, default_value_t = 100.0)]
        radius: f64,
    },

    /// Remove a registered gym by id. Committed workouts are kept.
    Remove {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// List registered gyms.
    List,
}
