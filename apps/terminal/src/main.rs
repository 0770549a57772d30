use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use client_core::{Game, GameOptions, GamePhase, GuessReport, HttpGameApi, InitStatus};
use storage::{MemoryStore, SessionStore, Storage};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::{load_settings, prepare_database_url, Settings};

const SUGGESTION_LIMIT: usize = 8;

#[derive(Parser, Debug)]
#[command(name = "worldle", about = "Guess the hidden country from its silhouette")]
struct Args {
    /// Config file; defaults to ./worldle.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    database_url: Option<String>,
    #[arg(long)]
    guess_limit: Option<usize>,
    #[arg(long)]
    resource_dir: Option<PathBuf>,
    /// Keep the session token in memory only.
    #[arg(long)]
    ephemeral: bool,
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(v) = &self.api_url {
            settings.api_url = v.clone();
        }
        if let Some(v) = &self.database_url {
            settings.database_url = v.clone();
        }
        if let Some(v) = self.guess_limit {
            settings.guess_limit = v;
        }
        if let Some(v) = &self.resource_dir {
            settings.resource_dir = v.clone();
        }
        settings
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let settings = args.apply(load_settings(args.config.as_deref()));
    settings.validate()?;

    let store: Arc<dyn SessionStore> = if args.ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        let database_url = prepare_database_url(&settings.database_url)?;
        let storage = Storage::new(&database_url).await.map_err(|error| {
            error!(
                %database_url,
                %error,
                "failed to open SQLite database; verify parent directory exists and permissions are correct"
            );
            error
        })?;
        storage.health_check().await?;
        Arc::new(storage)
    };

    let api = match settings.http_timeout() {
        Some(timeout) => HttpGameApi::with_timeout(&settings.api_url, timeout)?,
        None => HttpGameApi::new(&settings.api_url)?,
    };
    info!(api_url = %api.base_url(), "worldle starting");
    let game = Game::new(
        Arc::new(api),
        store,
        GameOptions {
            guess_limit: settings.guess_limit,
            resource_dir: settings.resource_dir.clone(),
        },
    );

    if let InitStatus::Failed(reason) = game.initialize().await {
        println!("Could not start a game ({reason}). Check the service and run again.");
        return Ok(());
    }

    let result = play(&game).await;
    game.close().await;
    result
}

async fn play(game: &Game) -> Result<()> {
    let snapshot = game.snapshot().await;
    println!("{}", render::intro(&snapshot));
    let catalog = snapshot.territories.unwrap_or_default();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut reveal_pending = false;
    while game.phase().await == GamePhase::Playing {
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input == ":quit" {
            break;
        }

        let country = if reveal_pending {
            // The orchestrator only retries the answer reveal from here on.
            input
        } else if input.is_empty() {
            continue;
        } else if let Some(prefix) = input.strip_prefix(":list") {
            let hints = catalog.suggestions(prefix, SUGGESTION_LIMIT);
            if hints.is_empty() {
                println!("No territories start with '{}'.", prefix.trim());
            } else {
                println!("{}", hints.join(", "));
            }
            continue;
        } else if let Some(country) = catalog.resolve(input) {
            country
        } else {
            let hints = catalog.suggestions(input, SUGGESTION_LIMIT);
            if hints.is_empty() {
                println!("'{input}' is not a known territory.");
            } else {
                println!(
                    "'{input}' is not a known territory. Did you mean: {}?",
                    hints.join(", ")
                );
            }
            continue;
        };

        match game.submit_guess(country).await {
            Ok(GuessReport::Continue { guess, remaining }) => {
                println!("{}", render::guess_row(attempts(game).await, &guess));
                println!("{remaining} guesses left.");
            }
            Ok(GuessReport::GameOver {
                guess,
                ending,
                outcome,
            }) => {
                if let Some(guess) = guess {
                    println!("{}", render::guess_row(attempts(game).await, &guess));
                }
                println!("{}", render::outcome(ending, &outcome));
            }
            Ok(GuessReport::RevealPending { guess, .. }) => {
                if let Some(guess) = guess {
                    println!("{}", render::guess_row(attempts(game).await, &guess));
                }
                reveal_pending = true;
                println!("The game is over but the answer could not be loaded. Press enter to retry.");
            }
            Ok(GuessReport::Ignored) => break,
            Err(err) => println!("{err}"),
        }
    }

    Ok(())
}

async fn attempts(game: &Game) -> usize {
    game.snapshot().await.history.len()
}
