//! Turn decider - the sub-protocol that fixes who acts first.
//!
//! ```text
//! Pending --assign--> AwaitingChoice --resolve--> Resolved
//!                          ^    |
//!                          +----+ reassign (stuck repair / admin reset)
//! ```
//!
//! The decider calls a parity (`odd`/`even`) and a six-sided die is rolled.
//! The decider acts first when the die matches the call; otherwise the other
//! seat does.

use serde::{Deserialize, Serialize};

use crate::{DomainError, Seat};

/// Faces on the turn-decider die.
pub const DIE_FACES: u8 = 6;

/// Parity call made by the decider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TurnChoice {
    Odd,
    Even,
}

impl TurnChoice {
    pub fn matches(self, die: u8) -> bool {
        match self {
            TurnChoice::Odd => die % 2 == 1,
            TurnChoice::Even => die % 2 == 0,
        }
    }
}

impl std::fmt::Display for TurnChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnChoice::Odd => f.write_str("odd"),
            TurnChoice::Even => f.write_str("even"),
        }
    }
}

impl std::str::FromStr for TurnChoice {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "odd" => Ok(TurnChoice::Odd),
            "even" => Ok(TurnChoice::Even),
            other => Err(DomainError::parse(format!("Unknown turn choice: {}", other))),
        }
    }
}

/// Derived phase of the turn decider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TurnDeciderPhase {
    /// No decider assigned yet
    Pending,
    /// Decider assigned, waiting for their call
    AwaitingChoice,
    /// Call and die recorded
    Resolved,
}

/// Turn decider substructure of a session record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnDecider {
    pub decider_slot: Option<Seat>,
    pub choice: Option<TurnChoice>,
    pub dice_result: Option<u8>,
    pub is_rolling: bool,
}

impl TurnDecider {
    pub fn phase(&self) -> TurnDeciderPhase {
        match (self.decider_slot, self.dice_result) {
            (None, _) => TurnDeciderPhase::Pending,
            (Some(_), None) => TurnDeciderPhase::AwaitingChoice,
            (Some(_), Some(_)) => TurnDeciderPhase::Resolved,
        }
    }

    /// Assign the decider seat. Only valid while pending.
    pub fn assign(&mut self, seat: Seat) -> Result<(), DomainError> {
        if self.phase() != TurnDeciderPhase::Pending {
            return Err(DomainError::invalid_state_transition(
                "turn decider already has a decider",
            ));
        }
        self.decider_slot = Some(seat);
        Ok(())
    }

    pub fn start_rolling(&mut self) -> Result<(), DomainError> {
        if self.phase() != TurnDeciderPhase::AwaitingChoice {
            return Err(DomainError::invalid_state_transition(
                "turn decider is not awaiting a choice",
            ));
        }
        self.is_rolling = true;
        Ok(())
    }

    /// Record the call and the die. Happens exactly once per decider instance.
    pub fn resolve(&mut self, choice: TurnChoice, die: u8) -> Result<(), DomainError> {
        if !(1..=DIE_FACES).contains(&die) {
            return Err(DomainError::validation(format!(
                "die result {} outside 1..={}",
                die, DIE_FACES
            )));
        }
        match self.phase() {
            TurnDeciderPhase::AwaitingChoice => {}
            TurnDeciderPhase::Pending => {
                return Err(DomainError::invalid_state_transition(
                    "turn decider has no decider yet",
                ))
            }
            TurnDeciderPhase::Resolved => {
                return Err(DomainError::invalid_state_transition(
                    "dice result already recorded",
                ))
            }
        }
        self.choice = Some(choice);
        self.dice_result = Some(die);
        self.is_rolling = false;
        Ok(())
    }

    /// Clear partial state and hand the decision to `seat`.
    pub fn reassign(&mut self, seat: Seat) {
        *self = TurnDecider {
            decider_slot: Some(seat),
            ..TurnDecider::default()
        };
    }

    /// Seat that acts first, once resolved.
    pub fn first_mover(&self) -> Option<Seat> {
        let decider = self.decider_slot?;
        let choice = self.choice?;
        let die = self.dice_result?;
        Some(if choice.matches(die) {
            decider
        } else {
            decider.other()
        })
    }
}
