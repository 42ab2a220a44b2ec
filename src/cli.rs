use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use planti::models::{ActivityType, ScheduleType, MAX_FREQUENCY_DAYS};

#[derive(Parser)]
#[command(name = "planti")]
#[command(version)]
#[command(about = "A CLI to keep track of my plants and when they need care")]
pub struct Cli {
    /// Storage file (defaults to the user data directory)
    #[arg(long = "data-file", env = "PLANTI_DATA_FILE", global = true)]
    pub data_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List plants, most overdue watering first
    List {
        /// Filter by name, scientific name or location
        #[arg(long = "search")]
        search: Option<String>,
        /// Group by location
        #[arg(long)]
        grouped: bool,
        /// Only print IDs and names
        #[arg(long)]
        ids: bool,
    },
    /// Show one plant with its care log, schedules and photos
    Show {
        #[arg(long)]
        id: String,
    },
    /// Add a new plant
    Add(AddArgs),
    /// Update an existing plant
    Update(UpdateArgs),
    /// Remove a plant and all its data
    Remove {
        #[arg(long)]
        id: String,
    },
    /// Hide a plant from the list without deleting it
    Archive {
        #[arg(long)]
        id: String,
    },
    /// Record a watering right now
    Water {
        #[arg(long)]
        id: String,
    },
    /// Record any care activity
    Care(CareArgs),
    /// Remove an entry from a plant's care log
    Uncare {
        #[arg(long)]
        id: String,
        #[arg(long = "activity-id")]
        activity_id: String,
    },
    /// Manage recurring care reminders
    #[command(subcommand)]
    Schedule(ScheduleCommand),
    /// Manage plant photos
    #[command(subcommand)]
    Photo(PhotoCommand),
    /// Show or change the watering alert thresholds
    Thresholds {
        /// Days without water before a warning
        #[arg(long = "warning-days")]
        warning_days: Option<u32>,
        /// Days without water before danger
        #[arg(long = "danger-days")]
        danger_days: Option<u32>,
    },
    /// Write a backup of all stored data
    Export {
        /// Output file, `-` for stdout (defaults to planti-backup-YYYYMMDD.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Restore a backup written by `export`
    Import {
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Plant name, anything that helps you identify it
    #[arg(short = 'n', long = "name")]
    pub name: String,
    #[arg(short = 's', long = "scientific-name")]
    pub scientific_name: Option<String>,
    /// Location or room
    #[arg(short = 'l', long = "location")]
    pub location: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    #[arg(long)]
    pub id: String,
    #[arg(short = 'n', long = "name")]
    pub name: Option<String>,
    /// Empty string clears it
    #[arg(short = 's', long = "scientific-name")]
    pub scientific_name: Option<String>,
    /// Empty string clears it
    #[arg(short = 'l', long = "location")]
    pub location: Option<String>,
    /// Empty string clears it
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args, Debug)]
pub struct CareArgs {
    #[arg(long)]
    pub id: String,
    /// watered, medicated, fertilized, misted, wiped, moved, repotted or pruned
    #[arg(short = 't', long = "type")]
    pub kind: ActivityType,
    /// Details such as pot size, product used or new spot
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ScheduleCommand {
    /// Add a reminder that repeats every N days
    Add {
        #[arg(long)]
        id: String,
        /// watering, medication, fertilization, misting, wiping, moving, repotting or pruning
        #[arg(short = 't', long = "type")]
        kind: ScheduleType,
        /// Frequency in days
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_FREQUENCY_DAYS)))]
        every: u32,
    },
    Enable {
        #[arg(long)]
        id: String,
        #[arg(long = "schedule-id")]
        schedule_id: String,
    },
    Disable {
        #[arg(long)]
        id: String,
        #[arg(long = "schedule-id")]
        schedule_id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum PhotoCommand {
    /// Attach a photo by URL or from an image file
    Add {
        #[arg(long)]
        id: String,
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        url: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    Remove {
        #[arg(long)]
        id: String,
        #[arg(long)]
        url: String,
    },
}
