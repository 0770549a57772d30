use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use super::*;
use crate::{
    silhouette::SilhouetteResource, state::DEFAULT_GUESS_LIMIT, transport::SilhouettePayload,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use proptest::prelude::*;
use shared::{
    domain::{Direction, SessionToken, TerritoryCatalog},
    protocol::GuessResponse,
};

#[derive(Default)]
struct ScriptedApi {
    verdicts: Mutex<VecDeque<Result<GuessVerdict, String>>>,
    answer_failures: AtomicUsize,
    answer_calls: AtomicUsize,
    guesses: Mutex<Vec<String>>,
}

impl ScriptedApi {
    fn evaluations(correct: &[bool]) -> Self {
        let api = Self::default();
        for (idx, is_correct) in correct.iter().enumerate() {
            api.push(Ok(evaluated(100.0 * (idx as f64 + 1.0), *is_correct)));
        }
        api
    }

    fn push(&self, verdict: Result<GuessVerdict, String>) {
        self.verdicts.lock().expect("verdicts").push_back(verdict);
    }

    fn guesses_sent(&self) -> usize {
        self.guesses.lock().expect("guesses").len()
    }
}

fn evaluated(distance: f64, is_correct: bool) -> GuessVerdict {
    GuessVerdict::Evaluated(GuessResponse {
        distance,
        direction: Direction::NorthEast,
        url: format!("map-{distance}"),
        is_correct,
    })
}

#[async_trait]
impl GameApi for ScriptedApi {
    async fn negotiate_session(&self, _resume: Option<&SessionToken>) -> Result<SessionToken> {
        SessionToken::new("abc").ok_or_else(|| anyhow!("blank"))
    }

    async fn fetch_silhouette(&self) -> Result<SilhouettePayload> {
        Ok(SilhouettePayload {
            bytes: b"img".to_vec(),
            content_type: Some("image/png".into()),
        })
    }

    async fn fetch_territories(&self) -> Result<TerritoryCatalog> {
        Ok(TerritoryCatalog::new(vec!["FRANCE".into()]))
    }

    async fn submit_guess(&self, _session: &SessionToken, country: &str) -> Result<GuessVerdict> {
        self.guesses.lock().expect("guesses").push(country.to_string());
        match self.verdicts.lock().expect("verdicts").pop_front() {
            Some(Ok(verdict)) => Ok(verdict),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("no scripted verdict")),
        }
    }

    async fn fetch_answer(&self) -> Result<GameOutcome> {
        self.answer_calls.fetch_add(1, Ordering::SeqCst);
        let remaining_failures = self.answer_failures.load(Ordering::SeqCst);
        if remaining_failures > 0 {
            self.answer_failures
                .store(remaining_failures - 1, Ordering::SeqCst);
            return Err(anyhow!("answer service down"));
        }
        Ok(GameOutcome {
            answer: "PERU".into(),
            answer_map_url: "answer-map".into(),
        })
    }
}

fn ready_session(dir: &tempfile::TempDir) -> SessionState {
    let mut session = SessionState::default();
    session.set_token(SessionToken::new("abc").expect("token"));
    session.replace_silhouette(
        SilhouetteResource::materialize(
            dir.path(),
            SilhouettePayload {
                bytes: b"img".to_vec(),
                content_type: None,
            },
        )
        .expect("silhouette"),
    );
    session.set_territories(TerritoryCatalog::new(vec!["FRANCE".into()]));
    session
}

#[test]
fn limit_counts_total_guesses() {
    assert_eq!(end_of_game(0, false, 6), None);
    assert_eq!(end_of_game(4, false, 6), None);
    assert_eq!(end_of_game(5, false, 6), Some(GameEnding::LimitReached));
    assert_eq!(end_of_game(5, true, 6), Some(GameEnding::Solved));
    assert_eq!(end_of_game(0, false, 1), Some(GameEnding::LimitReached));
}

proptest! {
    #[test]
    fn history_never_exceeds_limit(
        limit in 1usize..10,
        outcomes in proptest::collection::vec(any::<bool>(), 0..20),
    ) {
        let mut history = 0usize;
        let mut over = false;
        for is_correct in outcomes {
            if over {
                break;
            }
            let before = history;
            history += 1;
            over = end_of_game(before, is_correct, limit).is_some();
        }
        prop_assert!(history <= limit);
        if history == limit {
            prop_assert!(over);
        }
    }
}

#[tokio::test]
async fn incorrect_guess_is_recorded_and_play_continues() {
    let dir = tempfile::tempdir().expect("tempdir");
    let api = Arc::new(ScriptedApi::evaluations(&[false]));
    let orchestrator = GuessOrchestrator::new(api.clone(), DEFAULT_GUESS_LIMIT);
    let session = ready_session(&dir);
    let mut play = PlayState::default();

    let report = orchestrator
        .submit_guess(&session, &mut play, "FRANCE")
        .await
        .expect("guess");

    match report {
        GuessReport::Continue { guess, remaining } => {
            assert_eq!(guess.country, "FRANCE");
            assert_eq!(remaining, 5);
        }
        other => panic!("unexpected report: {other:?}"),
    }
    assert_eq!(play.history().len(), 1);
    assert!(!play.is_game_over());
    assert_eq!(api.answer_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn correct_guess_reveals_answer() {
    let dir = tempfile::tempdir().expect("tempdir");
    let api = Arc::new(ScriptedApi::evaluations(&[false, true]));
    let orchestrator = GuessOrchestrator::new(api.clone(), DEFAULT_GUESS_LIMIT);
    let session = ready_session(&dir);
    let mut play = PlayState::default();

    orchestrator
        .submit_guess(&session, &mut play, "FRANCE")
        .await
        .expect("first");
    let report = orchestrator
        .submit_guess(&session, &mut play, "PERU")
        .await
        .expect("second");

    assert!(matches!(
        report,
        GuessReport::GameOver {
            ending: GameEnding::Solved,
            ..
        }
    ));
    assert!(play.is_game_over());
    assert_eq!(play.ending(), Some(GameEnding::Solved));
    assert_eq!(play.outcome().map(|o| o.answer.as_str()), Some("PERU"));
    assert_eq!(api.answer_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn sixth_incorrect_guess_ends_the_game() {
    let dir = tempfile::tempdir().expect("tempdir");
    let api = Arc::new(ScriptedApi::evaluations(&[false; 7]));
    let orchestrator = GuessOrchestrator::new(api.clone(), DEFAULT_GUESS_LIMIT);
    let session = ready_session(&dir);
    let mut play = PlayState::default();

    for attempt in 1..=5 {
        let report = orchestrator
            .submit_guess(&session, &mut play, "FRANCE")
            .await
            .expect("guess");
        assert!(
            matches!(report, GuessReport::Continue { .. }),
            "attempt {attempt}: {report:?}"
        );
    }

    let report = orchestrator
        .submit_guess(&session, &mut play, "FRANCE")
        .await
        .expect("sixth");
    assert!(matches!(
        report,
        GuessReport::GameOver {
            ending: GameEnding::LimitReached,
            ..
        }
    ));
    assert_eq!(play.history().len(), 6);

    let report = orchestrator
        .submit_guess(&session, &mut play, "FRANCE")
        .await
        .expect("after game over");
    assert_eq!(report, GuessReport::Ignored);
    assert_eq!(play.history().len(), 6);
    assert_eq!(api.guesses_sent(), 6);
}

#[tokio::test]
async fn rejected_guess_leaves_history_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let api = Arc::new(ScriptedApi::default());
    api.push(Ok(GuessVerdict::Rejected {
        status: 400,
        body: "no coordinates found".into(),
    }));
    let orchestrator = GuessOrchestrator::new(api.clone(), DEFAULT_GUESS_LIMIT);
    let session = ready_session(&dir);
    let mut play = PlayState::default();

    let err = orchestrator
        .submit_guess(&session, &mut play, "Atlantis")
        .await
        .expect_err("rejected");

    assert!(matches!(err, GuessError::Rejected { status: 400, .. }));
    assert!(err.to_string().contains("\"Atlantis\""));
    assert!(play.history().is_empty());
}

#[tokio::test]
async fn transport_failure_carries_underlying_message() {
    let dir = tempfile::tempdir().expect("tempdir");
    let api = Arc::new(ScriptedApi::default());
    api.push(Err("connection reset".into()));
    let orchestrator = GuessOrchestrator::new(api.clone(), DEFAULT_GUESS_LIMIT);
    let session = ready_session(&dir);
    let mut play = PlayState::default();

    let err = orchestrator
        .submit_guess(&session, &mut play, "FRANCE")
        .await
        .expect_err("transport");

    assert_eq!(
        err.to_string(),
        "Failed to submit guess. Error: connection reset"
    );
    assert!(play.history().is_empty());
}

#[tokio::test]
async fn guess_before_session_ready_is_refused() {
    let api = Arc::new(ScriptedApi::evaluations(&[false]));
    let orchestrator = GuessOrchestrator::new(api.clone(), DEFAULT_GUESS_LIMIT);
    let session = SessionState::default();
    let mut play = PlayState::default();

    let err = orchestrator
        .submit_guess(&session, &mut play, "FRANCE")
        .await
        .expect_err("not ready");

    assert!(matches!(err, GuessError::SessionNotReady));
    assert_eq!(api.guesses_sent(), 0);
}

#[tokio::test]
async fn failed_reveal_is_retried_without_another_guess() {
    let dir = tempfile::tempdir().expect("tempdir");
    let api = Arc::new(ScriptedApi::evaluations(&[true]));
    api.answer_failures.store(1, Ordering::SeqCst);
    let orchestrator = GuessOrchestrator::new(api.clone(), DEFAULT_GUESS_LIMIT);
    let session = ready_session(&dir);
    let mut play = PlayState::default();

    let report = orchestrator
        .submit_guess(&session, &mut play, "PERU")
        .await
        .expect("guess");
    assert!(matches!(
        report,
        GuessReport::RevealPending {
            ending: GameEnding::Solved,
            guess: Some(_),
            ..
        }
    ));
    assert!(!play.is_game_over());
    assert_eq!(play.pending_end(), Some(GameEnding::Solved));

    let report = orchestrator
        .submit_guess(&session, &mut play, "FRANCE")
        .await
        .expect("retry");
    assert!(matches!(
        report,
        GuessReport::GameOver {
            guess: None,
            ending: GameEnding::Solved,
            ..
        }
    ));
    assert!(play.is_game_over());
    assert_eq!(play.history().len(), 1);
    assert_eq!(api.guesses_sent(), 1);
    assert_eq!(api.answer_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn zero_limit_is_clamped_to_one() {
    let orchestrator = GuessOrchestrator::new(Arc::new(ScriptedApi::default()), 0);
    assert_eq!(orchestrator.limit(), 1);
}
