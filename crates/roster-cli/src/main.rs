use anyhow::Result;
use clap::{Parser, Subcommand};
use roster_core::{CommandExtractor, GateState, ModelGate};
use roster_hw::StillImageCamera;
use roster_store::{archive, PlayerStore};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod session;

use config::Config;
use error::RosterError;
use session::{CaptureSession, Registration};

#[derive(Parser)]
#[command(name = "roster", about = "Player registration with face descriptors")]
struct Cli {
    /// Player database (overrides ROSTER_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a player ID is already registered
    Lookup {
        /// National ID
        id: String,
    },
    /// Register a player, or update an existing registration
    Register {
        /// National ID
        id: String,
        /// Registration year
        #[arg(short, long)]
        year: Option<i32>,
        /// Photo of the player's face (optional when updating a player with a photo on file)
        #[arg(short, long)]
        photo: Option<PathBuf>,
    },
    /// Store a new face photo for a player
    Photo {
        /// National ID
        id: String,
        /// Photo of the player's face
        #[arg(short, long)]
        photo: PathBuf,
    },
    /// Check a photo against a registered player
    Verify {
        /// National ID
        id: String,
        /// Photo to check
        #[arg(short, long)]
        photo: PathBuf,
    },
    /// Find the registered player in a photo
    Identify {
        /// Photo to check
        #[arg(short, long)]
        photo: PathBuf,
    },
    /// List registered players
    List,
    /// Export all players to a dated JSON file
    Export {
        /// Output directory (overrides ROSTER_EXPORT_DIR)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Replace all players with the contents of a JSON file
    Import {
        /// File produced by `export`
        file: PathBuf,
    },
    /// Show database and face model status
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            match e.downcast_ref::<RosterError>() {
                Some(err) => eprintln!("{}", err.notice()),
                None => eprintln!("error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

/// Load the face models. Only commands that take photos pay for this.
async fn face_models(config: &Config) -> Result<ModelGate<CommandExtractor>, RosterError> {
    let gate = ModelGate::new();
    gate.initialize(CommandExtractor::new(&config.extractor_program))
        .await?;
    Ok(gate)
}

async fn run(command: Commands, config: &Config) -> Result<()> {
    let store = PlayerStore::open(&config.db_path);

    match command {
        Commands::Lookup { id } => {
            let registration = Registration::begin(&store, &id).await?;
            match registration.existing() {
                Some(player) => {
                    println!(
                        "Player {} is already registered (year: {}, photo: {}). Registering again updates it.",
                        player.id,
                        player.year.map_or("-".to_string(), |y| y.to_string()),
                        if player.facial_descriptor.is_some() { "yes" } else { "no" },
                    );
                }
                None => println!("Player {} is not registered yet.", registration.player_id()),
            }
        }
        Commands::Register { id, year, photo } => {
            let mut registration = Registration::begin(&store, &id).await?;
            match photo {
                Some(photo) => {
                    let gate = face_models(config).await?;
                    registration
                        .capture(&StillImageCamera::new(photo), &gate)
                        .await?;
                }
                None if registration.has_photo() => {
                    println!("Keeping the photo on file for player {}.", registration.player_id())
                }
                None => {}
            }
            let verb = if registration.is_update() { "updated" } else { "registered" };
            let outcome = registration.submit(&store, year).await?;
            println!("Player {} {verb} successfully.", outcome.record().id);
        }
        Commands::Photo { id, photo } => {
            let id = session::validate_id(&id)?;
            let gate = face_models(config).await?;
            let mut session = CaptureSession::open(&id, &StillImageCamera::new(photo))?;
            session.take_photo(&gate).await?;
            let player = session.save_photo(&store).await?;
            println!("Face saved for player {}.", player.id);
        }
        Commands::Verify { id, photo } => {
            let id = session::validate_id(&id)?;
            let gate = face_models(config).await?;
            let outcome =
                session::verify(&store, &id, &StillImageCamera::new(photo), &gate).await?;
            if outcome.matched {
                println!("Match: photo is player {id} (distance {:.3}).", outcome.distance);
            } else {
                println!("No match: photo is not player {id} (distance {:.3}).", outcome.distance);
            }
        }
        Commands::Identify { photo } => {
            let gate = face_models(config).await?;
            let result = session::identify(
                &store,
                &StillImageCamera::new(photo),
                &gate,
                config.match_threshold,
            )
            .await?;
            match (&result.player_id, result.distance) {
                (Some(id), Some(d)) => println!("Player {id} (distance {d:.3})."),
                (_, Some(d)) => println!("No registered player matches (closest distance {d:.3})."),
                _ => println!("No registered players with photos."),
            }
        }
        Commands::List => {
            let players = store.get_all().await.map_err(RosterError::from)?;
            for p in &players {
                println!(
                    "{:<12} {:>6} {}",
                    p.id,
                    p.year.map_or("-".to_string(), |y| y.to_string()),
                    if p.facial_descriptor.is_some() { "photo" } else { "no photo" }
                );
            }
            println!("{} player(s)", players.len());
        }
        Commands::Export { out } => {
            let dir = out.unwrap_or_else(|| config.export_dir.clone());
            let path = archive::export_to_dir(&store, &dir, chrono::Utc::now())
                .await
                .map_err(RosterError::from)?;
            println!("Exported players to {}.", path.display());
        }
        Commands::Import { file } => {
            let count = archive::import_file(&store, &file)
                .await
                .map_err(RosterError::from)?;
            println!("Imported {count} player(s); previous data replaced.");
        }
        Commands::Status => {
            println!("database: {}", config.db_path.display());
            let count = store.count().await.map_err(RosterError::from)?;
            println!("players:  {count}");

            let gate = ModelGate::new();
            let load = gate
                .initialize(CommandExtractor::new(&config.extractor_program))
                .await;
            match (gate.state(), load) {
                (GateState::Ready, _) => println!("face models: ready"),
                (GateState::Uninitialized, Err(e)) => println!("face models: not ready ({e})"),
                (GateState::Uninitialized, Ok(())) => println!("face models: not ready"),
            }
        }
    }

    Ok(())
}
