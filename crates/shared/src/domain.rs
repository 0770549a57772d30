use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Opaque identity of one game, issued by the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Returns `None` for blank tokens; the service never issues one.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compass bearing from a guess to the hidden answer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    /// Anything else the service sends, kept verbatim.
    Other(String),
}

impl Direction {
    pub fn code(&self) -> &str {
        match self {
            Self::North => "N",
            Self::NorthEast => "NE",
            Self::East => "E",
            Self::SouthEast => "SE",
            Self::South => "S",
            Self::SouthWest => "SW",
            Self::West => "W",
            Self::NorthWest => "NW",
            Self::Other(raw) => raw,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            Self::North => "↑",
            Self::NorthEast => "↗",
            Self::East => "→",
            Self::SouthEast => "↘",
            Self::South => "↓",
            Self::SouthWest => "↙",
            Self::West => "←",
            Self::NorthWest => "↖",
            Self::Other(_) => "·",
        }
    }
}

impl FromStr for Direction {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', '_', ' '], "");
        Ok(match normalized.as_str() {
            "N" | "NORTH" => Self::North,
            "NE" | "NORTHEAST" => Self::NorthEast,
            "E" | "EAST" => Self::East,
            "SE" | "SOUTHEAST" => Self::SouthEast,
            "S" | "SOUTH" => Self::South,
            "SW" | "SOUTHWEST" => Self::SouthWest,
            "W" | "WEST" => Self::West,
            "NW" | "NORTHWEST" => Self::NorthWest,
            _ => Self::Other(s.to_string()),
        })
    }
}

impl From<String> for Direction {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(direction) => direction,
            Err(never) => match never {},
        }
    }
}

impl From<Direction> for String {
    fn from(value: Direction) -> Self {
        value.code().to_string()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One evaluated guess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guess {
    pub country: String,
    pub distance: f64,
    pub direction: Direction,
    pub maps_url: String,
}

/// Revealed answer once the game has ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOutcome {
    pub answer: String,
    pub answer_map_url: String,
}

/// Valid guessable territory names in service order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TerritoryCatalog(Vec<String>);

impl TerritoryCatalog {
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Case-insensitive exact lookup, returning the catalog's spelling.
    pub fn resolve(&self, input: &str) -> Option<&str> {
        let needle = input.trim();
        self.0
            .iter()
            .find(|name| name.eq_ignore_ascii_case(needle))
            .map(String::as_str)
    }

    pub fn suggestions(&self, prefix: &str, limit: usize) -> Vec<&str> {
        let prefix = prefix.trim().to_ascii_lowercase();
        if prefix.is_empty() {
            return Vec::new();
        }
        self.0
            .iter()
            .filter(|name| name.to_ascii_lowercase().starts_with(&prefix))
            .take(limit)
            .map(String::as_str)
            .collect()
    }
}
