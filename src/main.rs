use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use cli::{Cli, Commands, PhotoCommand, ScheduleCommand};
use planti::backup::backup_file_name;
use planti::config::Config;
use planti::models::{ActivityType, NewPlant, Plant, PlantPatch, PlantStatusThresholds};
use planti::photos::PhotoSession;
use planti::presenter::{group_by_location, main_list, matches_search};
use planti::status::{days_since_last_watered, needs_care, plant_status};
use planti::storage::FileStorage;
use planti::PlantStore;

type Store = PlantStore<FileStorage>;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::resolve(cli.data_file);
    tracing::debug!("Using storage file {}", config.storage_path.display());

    let mut store = PlantStore::open(FileStorage::open(&config.storage_path));

    match cli.command {
        Commands::List {
            search,
            grouped,
            ids,
        } => list_plants(&store, search.as_deref(), grouped, ids),
        Commands::Show { id } => match store.get_plant(&id) {
            Some(plant) => print_plant(plant, store.thresholds(), store.now()),
            None => println!("No plant found with ID {}", id),
        },
        Commands::Add(args) => {
            let plant = store.add_plant(NewPlant {
                name: args.name,
                scientific_name: args.scientific_name,
                location: args.location,
                notes: args.notes,
            });
            println!("Plant added, ID: {}", plant.id);
        }
        Commands::Update(args) => {
            let patch = PlantPatch {
                name: args.name,
                scientific_name: args.scientific_name,
                location: args.location,
                notes: args.notes,
                ..Default::default()
            };
            if patch.is_empty() {
                println!("No changes given to update");
            } else if store.update_plant(&args.id, patch) {
                println!("Plant ID {} updated", args.id);
            } else {
                println!("No plant found with ID {}", args.id);
            }
        }
        Commands::Remove { id } => {
            if store.delete_plant(&id) {
                println!("Plant ID {} removed", id);
            } else {
                println!("No plant found with ID {}", id);
            }
        }
        Commands::Archive { id } => {
            if store.archive_plant(&id) {
                println!("Plant ID {} archived", id);
            } else {
                println!("No plant found with ID {}", id);
            }
        }
        Commands::Water { id } => log_care(&mut store, &id, ActivityType::Watered, None),
        Commands::Care(args) => log_care(&mut store, &args.id, args.kind, args.notes),
        Commands::Uncare { id, activity_id } => {
            if store.remove_care_activity(&id, &activity_id) {
                println!("Activity {} removed", activity_id);
            } else {
                println!("No activity {} found on plant {}", activity_id, id);
            }
        }
        Commands::Schedule(command) => run_schedule(&mut store, command),
        Commands::Photo(command) => run_photo(&mut store, command)?,
        Commands::Thresholds {
            warning_days,
            danger_days,
        } => {
            let current = store.thresholds();
            if warning_days.is_some() || danger_days.is_some() {
                store.update_thresholds(PlantStatusThresholds {
                    warning_days: warning_days.unwrap_or(current.warning_days),
                    danger_days: danger_days.unwrap_or(current.danger_days),
                });
            }
            let thresholds = store.thresholds();
            println!(
                "Warning after: {} days\nDanger after: {} days",
                thresholds.warning_days, thresholds.danger_days
            );
        }
        Commands::Export { output } => export(&store, output)?,
        Commands::Import { file } => {
            let document = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            match store.import_backup(&document) {
                Ok(written) => println!(
                    "Imported {} keys, {} plants loaded",
                    written,
                    store.plants().len()
                ),
                Err(e) => {
                    tracing::error!("Import failed: {}", e);
                    bail!(e);
                }
            }
        }
    }

    Ok(())
}

fn list_plants(store: &Store, search: Option<&str>, grouped: bool, ids: bool) {
    let now = store.now();
    let thresholds = store.thresholds();
    let plants: Vec<&Plant> = main_list(store.plants())
        .into_iter()
        .filter(|p| search.map_or(true, |q| matches_search(p, q)))
        .collect();

    if plants.is_empty() {
        println!("No plants found");
        return;
    }

    if ids {
        for plant in plants {
            println!("{}, '{}'", plant.id, plant.name);
        }
        return;
    }

    if grouped {
        for group in group_by_location(&plants, &thresholds, now) {
            let marker = if group.all_normal { "+" } else { "-" };
            println!("{} {} ({})", marker, group.location, group.plants.len());
            if !group.all_normal {
                for plant in group.plants {
                    println!("    {}", summary_line(plant, thresholds, now));
                }
            }
        }
    } else {
        for plant in plants {
            println!("{}", summary_line(plant, thresholds, now));
        }
    }
}

fn summary_line(plant: &Plant, thresholds: PlantStatusThresholds, now: DateTime<Utc>) -> String {
    let watered = match days_since_last_watered(plant, now) {
        Some(days) => format!("watered {} days ago", days),
        None => "never watered".to_string(),
    };
    let care = if needs_care(plant, now) {
        ", needs care"
    } else {
        ""
    };
    format!(
        "[{}] '{}' ({}{}) ID: {}",
        plant_status(plant, &thresholds, now),
        plant.name,
        watered,
        care,
        plant.id
    )
}

fn print_plant(plant: &Plant, thresholds: PlantStatusThresholds, now: DateTime<Utc>) {
    println!(
        "Name: '{}'\nScientific name: '{}'\nLocation: '{}'\nNotes: {}\nStatus: {}\nNeeds care: {}\nID: '{}'",
        plant.name,
        plant.scientific_name.as_deref().unwrap_or(""),
        plant.location.as_deref().unwrap_or(""),
        plant.notes.as_deref().unwrap_or(""),
        plant_status(plant, &thresholds, now),
        if needs_care(plant, now) { "yes" } else { "no" },
        plant.id,
    );
    if plant.archived {
        println!("Archived: yes");
    }

    if plant.care_log.is_empty() {
        println!("Care log: none");
    } else {
        println!("Care log:");
        for activity in &plant.care_log {
            println!(
                "  {} {} ({}){}",
                activity.date.to_rfc3339(),
                activity.kind,
                activity.id,
                activity
                    .notes
                    .as_deref()
                    .map(|n| format!(": '{}'", n))
                    .unwrap_or_default()
            );
        }
    }

    if !plant.schedules.is_empty() {
        println!("Schedules:");
        for schedule in &plant.schedules {
            println!(
                "  {} every {} days, next due {}{} ({})",
                schedule.kind,
                schedule.frequency,
                schedule.next_due.to_rfc3339(),
                if schedule.enabled { "" } else { " [disabled]" },
                schedule.id
            );
        }
    }

    if !plant.image_urls.is_empty() {
        println!("Photos:");
        for url in &plant.image_urls {
            println!("  {}", url);
        }
    }
}

fn log_care(store: &mut Store, id: &str, kind: ActivityType, notes: Option<String>) {
    match store.add_care_activity(id, kind, notes) {
        Some(activity) => println!("Recorded {} for plant {} ({})", kind, id, activity.id),
        None => println!("No plant found with ID {}", id),
    }
}

fn run_schedule(store: &mut Store, command: ScheduleCommand) {
    match command {
        ScheduleCommand::Add { id, kind, every } => match store.add_schedule(&id, kind, every) {
            Some(schedule) => println!(
                "Schedule {} added, next due {}",
                schedule.id,
                schedule.next_due.to_rfc3339()
            ),
            None => println!("No plant found with ID {}", id),
        },
        ScheduleCommand::Enable { id, schedule_id } => {
            toggle_schedule(store, &id, &schedule_id, true)
        }
        ScheduleCommand::Disable { id, schedule_id } => {
            toggle_schedule(store, &id, &schedule_id, false)
        }
    }
}

fn toggle_schedule(store: &mut Store, id: &str, schedule_id: &str, enabled: bool) {
    if store.set_schedule_enabled(id, schedule_id, enabled) {
        let state = if enabled { "enabled" } else { "disabled" };
        println!("Schedule {} {}", schedule_id, state);
    } else {
        println!("No schedule {} found on plant {}", schedule_id, id);
    }
}

fn run_photo(store: &mut Store, command: PhotoCommand) -> Result<()> {
    match command {
        PhotoCommand::Add { id, url, file } => {
            let mut session = PhotoSession::new();
            let url = match (url, file) {
                (Some(url), None) => url,
                (None, Some(file)) => session.attach(&file)?,
                _ => bail!("Give either --url or --file"),
            };
            if store.add_photo(&id, &url) {
                println!("Photo {} added to plant {}", url, id);
                if let Some(path) = session.resolve(&url) {
                    println!("Attached from {}", path.display());
                }
                if PhotoSession::is_session_reference(&url) {
                    println!("Note: file references only last for this session");
                }
            } else {
                println!("No plant found with ID {}", id);
            }
        }
        PhotoCommand::Remove { id, url } => {
            if store.remove_photo(&id, &url) {
                println!("Photo {} removed from plant {}", url, id);
            } else {
                println!("No photo {} found on plant {}", url, id);
            }
        }
    }
    Ok(())
}

fn export(store: &Store, output: Option<PathBuf>) -> Result<()> {
    let document = serde_json::to_string_pretty(&store.export_backup()?)?;
    let path = output.unwrap_or_else(|| PathBuf::from(backup_file_name(Utc::now().date_naive())));
    if path.as_os_str() == "-" {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", document)?;
    } else {
        fs::write(&path, document).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Backup written to {}", path.display());
    }
    Ok(())
}
