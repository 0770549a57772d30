//! Plain-text rendering of game state for the terminal.

use client_core::{GameEnding, GameSnapshot};
use shared::domain::{GameOutcome, Guess};

pub fn guess_row(attempt: usize, guess: &Guess) -> String {
    format!(
        "{attempt}. {:<28} {:>7.0} km  {} {:<3} {}",
        guess.country,
        guess.distance,
        guess.direction.arrow(),
        guess.direction.code(),
        guess.maps_url
    )
}

pub fn guess_table(history: &[Guess]) -> String {
    history
        .iter()
        .enumerate()
        .map(|(idx, guess)| guess_row(idx + 1, guess))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn intro(snapshot: &GameSnapshot) -> String {
    let mut lines = vec!["Worldle: name the country from its silhouette.".to_string()];
    if let Some(path) = &snapshot.silhouette_path {
        lines.push(format!("Silhouette: {}", path.display()));
    }
    if let Some(catalog) = &snapshot.territories {
        lines.push(format!("{} territories to choose from.", catalog.len()));
    }
    lines.push(format!(
        "You have {} guesses. Type a country, ':list <prefix>' for hints, ':quit' to leave.",
        snapshot.guess_limit
    ));
    if !snapshot.history.is_empty() {
        lines.push("Guesses so far:".to_string());
        lines.push(guess_table(&snapshot.history));
    }
    lines.join("\n")
}

pub fn outcome(ending: GameEnding, outcome: &GameOutcome) -> String {
    let headline = match ending {
        GameEnding::Solved => "You got it!",
        GameEnding::LimitReached => "Out of guesses.",
    };
    format!(
        "{headline} The answer was {}.\nMap: {}",
        outcome.answer, outcome.answer_map_url
    )
}
