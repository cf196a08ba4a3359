//! localstore CLI - inspect and edit an exercise database

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use localstore::config::{self, LocalStoreConfig};
use localstore::ui::{self, Icons};
use localstore::{Error, Exercise, ExerciseStore, StoreOptions, UpsertOutcome};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "localstore")]
#[command(version)]
#[command(about = "Exercise database over a single SQLite file")]
#[command(long_about = r#"
localstore keeps exercise records (problem, answer, summary and generated
class text) in one SQLite file, keyed by a unique name.

Example usage:
  localstore put exercise.json
  localstore search "integral"
  localstore rename E12X34_old E12X34_new
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the database file (defaults to $HOME/meguadb.sqlite)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the database location, metadata and record count
    Info,

    /// Print every exercise
    List {
        /// Print a summary table instead of the problem text
        #[arg(short, long)]
        table: bool,
    },

    /// Print one exercise
    Show {
        name: String,

        /// Print the stored record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Find exercises whose text matches a regular expression
    Search {
        pattern: String,

        /// Print the matches as JSON
        #[arg(long)]
        json: bool,
    },

    /// Insert or update exercises from a JSON file (`-` for stdin)
    Put {
        file: PathBuf,
    },

    /// Change the unique name of an exercise
    Rename {
        old: String,
        new: String,
    },

    /// Delete an exercise
    Remove {
        name: String,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(err) = run(cli) {
        match err.downcast_ref::<Error>() {
            Some(Error::SchemaMigrationUnsupported { .. }) => {
                ui::error(&err.to_string());
                ui::warn("Migrate the old file by hand or discard it; a fresh database was created.");
                std::process::exit(2);
            }
            _ => {
                ui::error(&format!("{:#}", err));
                std::process::exit(1);
            }
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let file_config = config::load_config(cli.config.as_deref())?.unwrap_or_default();
    let store = open_store(&cli, &file_config)?;

    match cli.command {
        Commands::Info => {
            let meta = store.metadata()?;
            let path = store
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            let count = store.count()?.to_string();

            ui::header(&format!("{} Exercise database", Icons::DATABASE));
            println!(
                "{}",
                ui::stats_table(&[
                    ("Path", path.as_str()),
                    ("Schema version", meta.version.as_str()),
                    ("Natural language", meta.natural_language.as_str()),
                    ("Markup language", meta.markup_language.as_str()),
                    ("Exercises", count.as_str()),
                ])
            );
        }

        Commands::List { table } => {
            if table {
                let all = store.iter()?.collect::<localstore::Result<Vec<_>>>()?;
                if all.is_empty() {
                    println!("{} No exercises stored.", Icons::EMPTY);
                } else {
                    println!("{}", ui::exercise_table(&all));
                }
            } else {
                println!("----------------------");
                println!("List of all exercises:");
                println!("----------------------");
                for exercise in store.iter()? {
                    println!("{}", exercise?);
                }
            }
        }

        Commands::Show { name, json } => match store.lookup(&name)? {
            Some(exercise) if json => println!("{}", serde_json::to_string_pretty(&exercise)?),
            Some(exercise) => {
                println!("{}", ui::exercise_header(&exercise));
                ui::section("Summary");
                println!("{}", exercise.exercise.summary_text);
                ui::section("Problem");
                println!("{}", exercise.exercise.problem_text);
                ui::section("Answer");
                println!("{}", exercise.exercise.answer_text);
            }
            None => anyhow::bail!("exercise '{}' not found", name),
        },

        Commands::Search { pattern, json } => {
            let results = store.search(&pattern)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else if results.is_empty() {
                println!("{} No exercises match '{}'.", Icons::CROSS, pattern);
            } else {
                println!("{} {} exercises match '{}':", Icons::SEARCH, results.len(), pattern);
                for exercise in &results {
                    println!("- {} {}", exercise.unique_name(), ui::muted(&exercise.exercise.suggestive_name));
                }
            }
        }

        Commands::Put { file } => {
            for exercise in read_exercises(&file)? {
                let (stored, outcome) = store.upsert_with_status(&exercise)?;
                let (icon, action) = match outcome {
                    UpsertOutcome::Inserted => (Icons::NEW, "inserted"),
                    UpsertOutcome::Updated => (Icons::MOD, "changed"),
                };
                println!("{} {} ({})", icon, ui::exercise_header(&stored), ui::dim(action));
            }
        }

        Commands::Rename { old, new } => {
            if store.rename(&old, &new)? {
                ui::success(&format!("Renamed '{}' to '{}'", old, new));
            } else {
                anyhow::bail!("exercise '{}' not found", old);
            }
        }

        Commands::Remove { name } => {
            if store.delete(&name)? {
                println!("{} Removed '{}'", Icons::DEL, name);
            } else {
                ui::warn(&format!("Exercise '{}' was not stored", name));
            }
        }
    }

    Ok(())
}

/// Flags override the config file, which overrides the defaults
fn open_store(cli: &Cli, file_config: &LocalStoreConfig) -> anyhow::Result<ExerciseStore> {
    let mut options = file_config.apply(StoreOptions::default());
    options.verbose = cli.verbose;

    let database = cli
        .database
        .clone()
        .or_else(|| file_config.database.as_ref().map(PathBuf::from));
    tracing::debug!("Opening exercise store (explicit path: {:?})", database);

    Ok(ExerciseStore::open(database.as_deref(), options)?)
}

/// Accepts one record mapping or an array of them
fn read_exercises(file: &Path) -> anyhow::Result<Vec<Exercise>> {
    let contents = if file == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(file)?
    };

    let value: serde_json::Value = serde_json::from_str(&contents)?;
    let exercises = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };
    Ok(exercises)
}
