use serde::{Deserialize, Serialize};

use crate::domain::{Direction, GameOutcome, Guess, SessionToken};

pub const NEW_GAME_PATH: &str = "api/newgame";
pub const SILHOUETTE_PATH: &str = "api/silhouette";
pub const TERRITORIES_PATH: &str = "api/territories";
pub const GUESS_PATH: &str = "api/guess";
pub const ANSWER_PATH: &str = "api/answer";

/// Media types requested for the silhouette image.
pub const SILHOUETTE_ACCEPT: &str = "image/png,image/*";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGameQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGameResponse {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessRequest {
    pub session_id: String,
    pub guess: String,
}

impl GuessRequest {
    pub fn new(session: &SessionToken, guess: impl Into<String>) -> Self {
        Self {
            session_id: session.as_str().to_string(),
            guess: guess.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessResponse {
    pub distance: f64,
    pub direction: Direction,
    pub url: String,
    #[serde(default)]
    pub is_correct: bool,
}

impl GuessResponse {
    pub fn into_guess(self, country: impl Into<String>) -> Guess {
        Guess {
            country: country.into(),
            distance: self.distance,
            direction: self.direction,
            maps_url: self.url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: String,
    pub url: String,
}

impl From<AnswerResponse> for GameOutcome {
    fn from(value: AnswerResponse) -> Self {
        Self {
            answer: value.answer,
            answer_map_url: value.url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_game_query_omits_missing_session() {
        let encoded = serde_json::to_value(NewGameQuery::default()).expect("encode");
        assert_eq!(encoded, serde_json::json!({}));

        let encoded = serde_json::to_value(NewGameQuery {
            session_id: Some("abc".into()),
        })
        .expect("encode");
        assert_eq!(encoded, serde_json::json!({ "sessionId": "abc" }));
    }

    #[test]
    fn guess_response_maps_into_guess_record() {
        let response: GuessResponse = serde_json::from_value(serde_json::json!({
            "distance": 120,
            "direction": "NE",
            "url": "m1",
            "isCorrect": false
        }))
        .expect("decode");

        let guess = response.into_guess("France");
        assert_eq!(
            guess,
            Guess {
                country: "France".into(),
                distance: 120.0,
                direction: Direction::NorthEast,
                maps_url: "m1".into(),
            }
        );
    }

    #[test]
    fn guess_request_uses_camel_case_keys() {
        let token = SessionToken::new("abc").expect("token");
        let encoded = serde_json::to_value(GuessRequest::new(&token, "Peru")).expect("encode");
        assert_eq!(
            encoded,
            serde_json::json!({ "sessionId": "abc", "guess": "Peru" })
        );
    }
}
