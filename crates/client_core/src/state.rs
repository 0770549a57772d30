//! Owned game state, split by which component may mutate it.
//!
//! [`SessionState`] is written only by the session controller and
//! [`PlayState`] only by the guess orchestrator; everyone else reads.

use shared::domain::{GameOutcome, Guess, SessionToken, TerritoryCatalog};
use tracing::warn;

use crate::silhouette::SilhouetteResource;

pub const DEFAULT_GUESS_LIMIT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    AwaitingSession,
    Playing,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEnding {
    Solved,
    LimitReached,
}

#[derive(Debug, Default)]
pub struct SessionState {
    token: Option<SessionToken>,
    silhouette: Option<SilhouetteResource>,
    territories: Option<TerritoryCatalog>,
}

impl SessionState {
    pub fn token(&self) -> Option<&SessionToken> {
        self.token.as_ref()
    }

    pub fn silhouette(&self) -> Option<&SilhouetteResource> {
        self.silhouette.as_ref()
    }

    pub fn territories(&self) -> Option<&TerritoryCatalog> {
        self.territories.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.token.is_some() && self.silhouette.is_some() && self.territories.is_some()
    }

    pub(crate) fn set_token(&mut self, token: SessionToken) {
        self.token = Some(token);
    }

    pub(crate) fn set_territories(&mut self, catalog: TerritoryCatalog) {
        self.territories = Some(catalog);
    }

    pub(crate) fn clear_territories(&mut self) {
        self.territories = None;
    }

    /// Installs a new silhouette, releasing the one it supersedes.
    pub(crate) fn replace_silhouette(&mut self, resource: SilhouetteResource) {
        if let Some(previous) = self.silhouette.replace(resource) {
            if let Err(err) = previous.release() {
                warn!("session: failed to release superseded silhouette: {err}");
            }
        }
    }

    pub(crate) fn take_silhouette(&mut self) -> Option<SilhouetteResource> {
        self.silhouette.take()
    }
}

#[derive(Debug, Default)]
pub struct PlayState {
    history: Vec<Guess>,
    pending_end: Option<GameEnding>,
    ending: Option<GameEnding>,
    outcome: Option<GameOutcome>,
}

impl PlayState {
    pub fn history(&self) -> &[Guess] {
        &self.history
    }

    pub fn outcome(&self) -> Option<&GameOutcome> {
        self.outcome.as_ref()
    }

    pub fn ending(&self) -> Option<GameEnding> {
        self.ending
    }

    /// Game over is exactly "the outcome is known".
    pub fn is_game_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// End detected but the answer has not been retrieved yet.
    pub fn pending_end(&self) -> Option<GameEnding> {
        self.pending_end
    }

    pub(crate) fn record(&mut self, guess: Guess) {
        self.history.push(guess);
    }

    pub(crate) fn begin_end(&mut self, ending: GameEnding) {
        self.pending_end = Some(ending);
    }

    pub(crate) fn finish(&mut self, outcome: GameOutcome) {
        if self.outcome.is_some() {
            return;
        }
        self.ending = self.pending_end.take();
        self.outcome = Some(outcome);
    }
}

#[derive(Debug, Default)]
pub struct GameState {
    pub session: SessionState,
    pub play: PlayState,
}

impl GameState {
    pub fn phase(&self) -> GamePhase {
        if self.play.is_game_over() {
            GamePhase::GameOver
        } else if self.session.is_ready() {
            GamePhase::Playing
        } else {
            GamePhase::AwaitingSession
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_awaits_session() {
        let state = GameState::default();
        assert_eq!(state.phase(), GamePhase::AwaitingSession);
        assert!(state.play.history().is_empty());
        assert!(state.play.outcome().is_none());
    }

    #[test]
    fn outcome_is_recorded_once_with_its_ending() {
        let mut play = PlayState::default();
        play.begin_end(GameEnding::Solved);
        assert!(!play.is_game_over());

        play.finish(GameOutcome {
            answer: "FRANCE".into(),
            answer_map_url: "a1".into(),
        });
        play.finish(GameOutcome {
            answer: "SPAIN".into(),
            answer_map_url: "a2".into(),
        });

        assert!(play.is_game_over());
        assert_eq!(play.ending(), Some(GameEnding::Solved));
        assert_eq!(play.pending_end(), None);
        assert_eq!(play.outcome().map(|o| o.answer.as_str()), Some("FRANCE"));
    }
}
