//! Matchmaking mode tag.

use serde::{Deserialize, Serialize};

use crate::DomainError;

/// Mode a player queues for. Only players of the same mode are paired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum GameMode {
    #[default]
    Quick,
    Ranked,
}

impl GameMode {
    pub const ALL: [GameMode; 2] = [GameMode::Quick, GameMode::Ranked];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Quick => "quick",
            GameMode::Ranked => "ranked",
        }
    }
}

impl std::fmt::Display for GameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GameMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quick" => Ok(GameMode::Quick),
            "ranked" => Ok(GameMode::Ranked),
            other => Err(DomainError::parse(format!("Unknown game mode: {}", other))),
        }
    }
}
