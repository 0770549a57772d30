use std::{path::PathBuf, sync::Arc};

use shared::domain::{GameOutcome, Guess, SessionToken, TerritoryCatalog};
use storage::SessionStore;
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

pub mod error;
pub mod orchestrator;
pub mod session;
pub mod silhouette;
pub mod state;
pub mod transport;

pub use error::{GuessError, InitError, SilhouetteError};
pub use orchestrator::{end_of_game, GuessOrchestrator, GuessPlan, GuessReport, Recorded};
pub use session::{InitStatus, SessionController};
pub use silhouette::SilhouetteResource;
pub use state::{GameEnding, GamePhase, GameState, SessionState, DEFAULT_GUESS_LIMIT};
pub use transport::{GameApi, GuessVerdict, HttpGameApi, SilhouettePayload};

#[derive(Debug, Clone)]
pub struct GameOptions {
    pub guess_limit: usize,
    /// Directory that receives the silhouette image file.
    pub resource_dir: PathBuf,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            guess_limit: DEFAULT_GUESS_LIMIT,
            resource_dir: std::env::temp_dir(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum GameEvent {
    SessionReady {
        token: SessionToken,
        silhouette_path: PathBuf,
        territories: usize,
    },
    InitializationFailed(String),
    GuessRecorded(Guess),
    GuessFailed(String),
    GameOver {
        ending: GameEnding,
        outcome: GameOutcome,
    },
}

/// Read-only view handed to front ends.
#[derive(Debug, Clone)]
pub struct GameSnapshot {
    pub phase: GamePhase,
    pub token: Option<SessionToken>,
    pub silhouette_path: Option<PathBuf>,
    pub territories: Option<TerritoryCatalog>,
    pub history: Vec<Guess>,
    pub outcome: Option<GameOutcome>,
    pub ending: Option<GameEnding>,
    pub guess_limit: usize,
}

/// One game instance: a session controller and a guess orchestrator sharing
/// a single owned [`GameState`].
///
/// `state` is only held for local reads and writes, never across a request
/// to the service. `guess_slot` admits one submission at a time.
pub struct Game {
    controller: SessionController,
    orchestrator: GuessOrchestrator,
    state: Mutex<GameState>,
    guess_slot: Mutex<()>,
    events: broadcast::Sender<GameEvent>,
}

impl Game {
    pub fn new(
        api: Arc<dyn GameApi>,
        store: Arc<dyn SessionStore>,
        options: GameOptions,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            controller: SessionController::new(Arc::clone(&api), store, options.resource_dir),
            orchestrator: GuessOrchestrator::new(api, options.guess_limit),
            state: Mutex::new(GameState::default()),
            guess_slot: Mutex::new(()),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    pub fn guess_limit(&self) -> usize {
        self.orchestrator.limit()
    }

    /// Safe to call from every startup hook; only the first call does work.
    pub async fn initialize(&self) -> InitStatus {
        if self.controller.has_started() {
            return InitStatus::AlreadyStarted;
        }
        // Built off to the side so readers and guesses see AWAITING_SESSION
        // until the whole session is in place.
        let mut session = SessionState::default();
        let status = self.controller.initialize(&mut session).await;
        if status == InitStatus::AlreadyStarted {
            return status;
        }
        let mut state = self.state.lock().await;
        state.session = session;
        match &status {
            InitStatus::Ready => {
                if let (Some(token), Some(silhouette), Some(catalog)) = (
                    state.session.token(),
                    state.session.silhouette(),
                    state.session.territories(),
                ) {
                    let _ = self.events.send(GameEvent::SessionReady {
                        token: token.clone(),
                        silhouette_path: silhouette.path().to_path_buf(),
                        territories: catalog.len(),
                    });
                }
            }
            InitStatus::Failed(reason) => {
                let _ = self
                    .events
                    .send(GameEvent::InitializationFailed(reason.clone()));
            }
            InitStatus::AlreadyStarted => {}
        }
        status
    }

    /// Submits one guess. A second call while one is in flight is rejected
    /// with [`GuessError::Busy`] so history order matches submission order.
    pub async fn submit_guess(&self, country: &str) -> Result<GuessReport, GuessError> {
        let Ok(_slot) = self.guess_slot.try_lock() else {
            debug!("guess: rejected, another guess is in flight country={country}");
            return Err(GuessError::Busy);
        };

        let result = self.run_guess(country).await;
        match &result {
            Ok(GuessReport::Continue { guess, .. }) => {
                let _ = self.events.send(GameEvent::GuessRecorded(guess.clone()));
            }
            Ok(GuessReport::GameOver {
                guess,
                ending,
                outcome,
            }) => {
                if let Some(guess) = guess {
                    let _ = self.events.send(GameEvent::GuessRecorded(guess.clone()));
                }
                let _ = self.events.send(GameEvent::GameOver {
                    ending: *ending,
                    outcome: outcome.clone(),
                });
            }
            Ok(GuessReport::RevealPending { guess, error, .. }) => {
                if let Some(guess) = guess {
                    let _ = self.events.send(GameEvent::GuessRecorded(guess.clone()));
                }
                let _ = self.events.send(GameEvent::GuessFailed(error.clone()));
            }
            Ok(GuessReport::Ignored) => {}
            Err(err) => {
                let _ = self.events.send(GameEvent::GuessFailed(err.to_string()));
            }
        }
        result
    }

    async fn run_guess(&self, country: &str) -> Result<GuessReport, GuessError> {
        let plan = {
            let state = self.state.lock().await;
            self.orchestrator.plan(&state.session, &state.play, country)?
        };

        let (guess, ending) = match plan {
            GuessPlan::Ignore => return Ok(GuessReport::Ignored),
            GuessPlan::Reveal(ending) => (None, ending),
            GuessPlan::Send(token) => {
                let response = self.orchestrator.evaluate(&token, country).await?;
                let mut state = self.state.lock().await;
                match self.orchestrator.record(&mut state.play, country, response) {
                    Recorded::Continue(report) => return Ok(report),
                    Recorded::Ended { guess, ending } => (Some(guess), ending),
                }
            }
        };

        let revealed = self.orchestrator.reveal(ending).await;
        let mut state = self.state.lock().await;
        let GameState { session, play } = &mut *state;
        let report = self.orchestrator.settle(play, ending, guess, revealed);
        if let GuessReport::GameOver { ending, .. } = &report {
            self.controller.conclude(session, *ending).await;
        }
        Ok(report)
    }

    pub async fn phase(&self) -> GamePhase {
        self.state.lock().await.phase()
    }

    pub async fn snapshot(&self) -> GameSnapshot {
        let state = self.state.lock().await;
        GameSnapshot {
            phase: state.phase(),
            token: state.session.token().cloned(),
            silhouette_path: state
                .session
                .silhouette()
                .map(|resource| resource.path().to_path_buf()),
            territories: state.session.territories().cloned(),
            history: state.play.history().to_vec(),
            outcome: state.play.outcome().cloned(),
            ending: state.play.ending(),
            guess_limit: self.orchestrator.limit(),
        }
    }

    /// Frees local resources when the front end goes away.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        self.controller.release_silhouette(&mut state.session);
    }
}

#[cfg(test)]
#[path = "tests/mock_service.rs"]
pub(crate) mod mock_service;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
