//! The two seats of a session.

use serde::{Deserialize, Serialize};

use crate::DomainError;

/// One of the two slots in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Seat {
    /// The player who opened the waiting room
    Host,
    /// The player who claimed it
    Opponent,
}

impl Seat {
    pub fn other(self) -> Seat {
        match self {
            Seat::Host => Seat::Opponent,
            Seat::Opponent => Seat::Host,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Seat::Host => "host",
            Seat::Opponent => "opponent",
        }
    }
}

impl std::fmt::Display for Seat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Seat {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "host" => Ok(Seat::Host),
            "opponent" => Ok(Seat::Opponent),
            other => Err(DomainError::parse(format!("Unknown seat: {}", other))),
        }
    }
}
