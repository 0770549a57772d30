use std::sync::Arc;

use shared::{
    domain::{GameOutcome, Guess, SessionToken},
    protocol::GuessResponse,
};
use tracing::{debug, error, info, warn};

use crate::{
    error::GuessError,
    state::{GameEnding, PlayState, SessionState},
    transport::{GameApi, GuessVerdict},
};

#[derive(Debug, Clone, PartialEq)]
pub enum GuessReport {
    /// The game was already over; nothing changed.
    Ignored,
    Continue { guess: Guess, remaining: usize },
    GameOver {
        guess: Option<Guess>,
        ending: GameEnding,
        outcome: GameOutcome,
    },
    /// The game has ended but the answer could not be fetched yet. The next
    /// submission retries the reveal instead of sending a guess.
    RevealPending {
        guess: Option<Guess>,
        ending: GameEnding,
        error: String,
    },
}

/// Decides whether a freshly evaluated guess ends the game.
///
/// `recorded_before` is the history length before this guess was appended and
/// `limit` counts total guesses, so the `limit`-th guess always ends the game.
pub fn end_of_game(recorded_before: usize, is_correct: bool, limit: usize) -> Option<GameEnding> {
    if is_correct {
        Some(GameEnding::Solved)
    } else if recorded_before + 1 >= limit {
        Some(GameEnding::LimitReached)
    } else {
        None
    }
}

/// First step of a submission, decided from the current state alone.
#[derive(Debug, Clone, PartialEq)]
pub enum GuessPlan {
    Ignore,
    /// The game already ended; only the answer still has to be fetched.
    Reveal(GameEnding),
    Send(SessionToken),
}

/// Runs guesses against the service.
///
/// A submission is split into steps so a caller holding shared state can
/// drop its lock around the remote calls: [`plan`](Self::plan), then
/// [`evaluate`](Self::evaluate), [`record`](Self::record), and for a
/// finished game [`reveal`](Self::reveal) followed by
/// [`settle`](Self::settle). [`submit_guess`](Self::submit_guess) chains them
/// for a caller that owns the state outright.
pub struct GuessOrchestrator {
    api: Arc<dyn GameApi>,
    limit: usize,
}

impl GuessOrchestrator {
    pub fn new(api: Arc<dyn GameApi>, limit: usize) -> Self {
        Self {
            api,
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub async fn submit_guess(
        &self,
        session: &SessionState,
        play: &mut PlayState,
        country: &str,
    ) -> Result<GuessReport, GuessError> {
        let token = match self.plan(session, play, country)? {
            GuessPlan::Ignore => return Ok(GuessReport::Ignored),
            GuessPlan::Reveal(ending) => {
                let revealed = self.reveal(ending).await;
                return Ok(self.settle(play, ending, None, revealed));
            }
            GuessPlan::Send(token) => token,
        };

        let response = self.evaluate(&token, country).await?;
        match self.record(play, country, response) {
            Recorded::Continue(report) => Ok(report),
            Recorded::Ended { guess, ending } => {
                let revealed = self.reveal(ending).await;
                Ok(self.settle(play, ending, Some(guess), revealed))
            }
        }
    }

    pub fn plan(
        &self,
        session: &SessionState,
        play: &PlayState,
        country: &str,
    ) -> Result<GuessPlan, GuessError> {
        if play.is_game_over() {
            debug!("guess: ignored after game over country={country}");
            return Ok(GuessPlan::Ignore);
        }
        if let Some(ending) = play.pending_end() {
            debug!("guess: retrying answer reveal instead of submitting country={country}");
            return Ok(GuessPlan::Reveal(ending));
        }
        match session.token().filter(|_| session.is_ready()) {
            Some(token) => Ok(GuessPlan::Send(token.clone())),
            None => Err(GuessError::SessionNotReady),
        }
    }

    /// Sends the guess. Touches no local state.
    pub async fn evaluate(
        &self,
        token: &SessionToken,
        country: &str,
    ) -> Result<GuessResponse, GuessError> {
        let verdict = self
            .api
            .submit_guess(token, country)
            .await
            .map_err(|err| {
                error!("guess: request failed country={country}: {err:#}");
                GuessError::Transport {
                    message: format!("{err:#}"),
                }
            })?;

        match verdict {
            GuessVerdict::Evaluated(response) => Ok(response),
            GuessVerdict::Rejected { status, body } => {
                warn!("guess: rejected country={country} status={status} body={body}");
                Err(GuessError::Rejected {
                    country: country.to_string(),
                    status,
                    body,
                })
            }
        }
    }

    /// Appends an evaluated guess and marks the end of the game when it is
    /// the winning or the last allowed one.
    pub fn record(&self, play: &mut PlayState, country: &str, response: GuessResponse) -> Recorded {
        let recorded_before = play.history().len();
        let is_correct = response.is_correct;
        let guess = response.into_guess(country);
        play.record(guess.clone());
        info!(
            "guess: recorded country={} distance={} direction={} attempt={}/{}",
            guess.country,
            guess.distance,
            guess.direction,
            recorded_before + 1,
            self.limit
        );

        match end_of_game(recorded_before, is_correct, self.limit) {
            None => Recorded::Continue(GuessReport::Continue {
                remaining: self.limit.saturating_sub(play.history().len()),
                guess,
            }),
            Some(ending) => {
                play.begin_end(ending);
                Recorded::Ended { guess, ending }
            }
        }
    }

    /// Fetches the answer. Touches no local state.
    pub async fn reveal(&self, ending: GameEnding) -> Result<GameOutcome, String> {
        self.api.fetch_answer().await.map_err(|err| {
            error!("guess: answer reveal failed ending={ending:?}: {err:#}");
            format!("{err:#}")
        })
    }

    pub fn settle(
        &self,
        play: &mut PlayState,
        ending: GameEnding,
        guess: Option<Guess>,
        revealed: Result<GameOutcome, String>,
    ) -> GuessReport {
        match revealed {
            Ok(outcome) => {
                info!("guess: game over ending={ending:?} answer={}", outcome.answer);
                play.finish(outcome.clone());
                GuessReport::GameOver {
                    guess,
                    ending,
                    outcome,
                }
            }
            Err(error) => GuessReport::RevealPending {
                guess,
                ending,
                error,
            },
        }
    }
}

/// Result of [`GuessOrchestrator::record`].
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Continue(GuessReport),
    Ended { guess: Guess, ending: GameEnding },
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;
