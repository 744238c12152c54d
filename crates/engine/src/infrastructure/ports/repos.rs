//! Session Directory port - the single source of truth for session existence and phase.
//!
//! Every write is conditional. Updates and deletes carry the [`Version`] the
//! caller read; a mismatch yields [`RepoError::Conflict`] and nothing is written.
//! Versions are storage metadata returned beside the record, never a field of it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dicebound_domain::{GameMode, PlayerId, Session, SessionId, SessionStatus, WaitingRoomEntry};

use super::error::RepoError;

/// Monotonic per-record write counter used for compare-and-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(u64);

impl Version {
    pub const INITIAL: Version = Version(1);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// A record together with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub record: T,
    pub version: Version,
}

impl<T> Versioned<T> {
    pub fn new(record: T, version: Version) -> Self {
        Self { record, version }
    }
}

/// Filters for listing sessions. `None` means "any".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionQuery {
    pub status: Option<SessionStatus>,
    pub game_mode: Option<GameMode>,
    /// Only sessions created strictly before this instant
    pub created_before: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

impl SessionQuery {
    pub fn with_status(status: SessionStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn created_before(cutoff: DateTime<Utc>) -> Self {
        Self {
            created_before: Some(cutoff),
            ..Self::default()
        }
    }

    pub fn matches(&self, session: &Session) -> bool {
        self.status.is_none_or(|s| s == session.status)
            && self.game_mode.is_none_or(|m| m == session.game_mode)
            && self.created_before.is_none_or(|c| session.created_at < c)
    }
}

/// Exclusivity rule for [`SessionDirectory::open_room`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenRoomScope {
    /// Refuse if any open room exists for the mode (queue find-or-create).
    Mode,
    /// Refuse only if this host already has an open room for the mode (direct create).
    Host,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionDirectory: Send + Sync {
    // Sessions
    async fn get_session(&self, id: SessionId) -> Result<Option<Versioned<Session>>, RepoError>;
    /// Newest first.
    async fn list_sessions(&self, query: SessionQuery) -> Result<Vec<Versioned<Session>>, RepoError>;
    /// The non-terminal session `player_id` is seated in, newest first.
    async fn find_live_session_for_player(
        &self,
        player_id: &PlayerId,
    ) -> Result<Option<Versioned<Session>>, RepoError>;
    async fn update_session(&self, session: &Session, expected: Version) -> Result<Version, RepoError>;
    async fn delete_session(&self, id: SessionId, expected: Version) -> Result<(), RepoError>;

    // Waiting rooms
    async fn get_room(&self, id: SessionId) -> Result<Option<Versioned<WaitingRoomEntry>>, RepoError>;
    /// Open rooms for `game_mode`, oldest first.
    async fn find_open_rooms(
        &self,
        game_mode: GameMode,
    ) -> Result<Vec<Versioned<WaitingRoomEntry>>, RepoError>;
    async fn list_rooms_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Versioned<WaitingRoomEntry>>, RepoError>;
    async fn delete_room(&self, id: SessionId, expected: Version) -> Result<(), RepoError>;

    /// Insert an open room and its waiting session in one step.
    ///
    /// Fails with [`RepoError::Conflict`] when `scope` finds a competing open room;
    /// in that case neither record is written.
    async fn open_room(
        &self,
        room: &WaitingRoomEntry,
        session: &Session,
        scope: OpenRoomScope,
    ) -> Result<(), RepoError>;

    /// Write a claimed room and its filled session in one step.
    ///
    /// Both versions must match; otherwise nothing is written and the first
    /// mismatch comes back as [`RepoError::Conflict`] or [`RepoError::NotFound`].
    /// Returns the new session version.
    async fn claim_room(
        &self,
        room: &WaitingRoomEntry,
        room_expected: Version,
        session: &Session,
        session_expected: Version,
    ) -> Result<Version, RepoError>;
}
