//! In-memory session directory for development and testing.
//!
//! Both tables sit behind one lock, so `open_room` is trivially atomic. Data
//! does not survive a restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use dicebound_domain::{GameMode, PlayerId, Session, SessionId, WaitingRoomEntry};

use crate::infrastructure::ports::{
    OpenRoomScope, RepoError, SessionDirectory, SessionQuery, Version, Versioned,
};

#[derive(Default)]
struct Tables {
    sessions: HashMap<SessionId, Versioned<Session>>,
    rooms: HashMap<SessionId, Versioned<WaitingRoomEntry>>,
}

#[derive(Default)]
pub struct MemorySessionDirectory {
    tables: RwLock<Tables>,
}

impl MemorySessionDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cas_check<T>(
    map: &HashMap<SessionId, Versioned<T>>,
    entity_type: &'static str,
    id: SessionId,
    expected: Version,
) -> Result<(), RepoError> {
    match map.get(&id) {
        None => Err(RepoError::not_found(entity_type, id)),
        Some(current) if current.version != expected => Err(RepoError::conflict(entity_type, id)),
        Some(_) => Ok(()),
    }
}

/// Compare-and-set on one map entry.
fn cas_update<T: Clone>(
    map: &mut HashMap<SessionId, Versioned<T>>,
    entity_type: &'static str,
    id: SessionId,
    record: &T,
    expected: Version,
) -> Result<Version, RepoError> {
    cas_check(map, entity_type, id, expected)?;
    let next = expected.next();
    map.insert(id, Versioned::new(record.clone(), next));
    Ok(next)
}

fn cas_delete<T>(
    map: &mut HashMap<SessionId, Versioned<T>>,
    entity_type: &'static str,
    id: SessionId,
    expected: Version,
) -> Result<(), RepoError> {
    cas_check(map, entity_type, id, expected)?;
    map.remove(&id);
    Ok(())
}

#[async_trait]
impl SessionDirectory for MemorySessionDirectory {
    async fn get_session(&self, id: SessionId) -> Result<Option<Versioned<Session>>, RepoError> {
        Ok(self.tables.read().await.sessions.get(&id).cloned())
    }

    async fn list_sessions(&self, query: SessionQuery) -> Result<Vec<Versioned<Session>>, RepoError> {
        let tables = self.tables.read().await;
        let mut found: Vec<_> = tables
            .sessions
            .values()
            .filter(|v| query.matches(&v.record))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.record.created_at.cmp(&a.record.created_at));
        if let Some(limit) = query.limit {
            found.truncate(limit as usize);
        }
        Ok(found)
    }

    async fn find_live_session_for_player(
        &self,
        player_id: &PlayerId,
    ) -> Result<Option<Versioned<Session>>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .values()
            .filter(|v| !v.record.status.is_terminal() && v.record.seat_of(player_id).is_some())
            .max_by_key(|v| v.record.created_at)
            .cloned())
    }

    async fn update_session(&self, session: &Session, expected: Version) -> Result<Version, RepoError> {
        let mut tables = self.tables.write().await;
        cas_update(&mut tables.sessions, "Session", session.id, session, expected)
    }

    async fn delete_session(&self, id: SessionId, expected: Version) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        cas_delete(&mut tables.sessions, "Session", id, expected)
    }

    async fn get_room(&self, id: SessionId) -> Result<Option<Versioned<WaitingRoomEntry>>, RepoError> {
        Ok(self.tables.read().await.rooms.get(&id).cloned())
    }

    async fn find_open_rooms(
        &self,
        game_mode: GameMode,
    ) -> Result<Vec<Versioned<WaitingRoomEntry>>, RepoError> {
        let tables = self.tables.read().await;
        let mut open: Vec<_> = tables
            .rooms
            .values()
            .filter(|v| v.record.is_open() && v.record.game_mode == game_mode)
            .cloned()
            .collect();
        open.sort_by_key(|v| v.record.created_at);
        Ok(open)
    }

    async fn list_rooms_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Versioned<WaitingRoomEntry>>, RepoError> {
        let tables = self.tables.read().await;
        let mut stale: Vec<_> = tables
            .rooms
            .values()
            .filter(|v| v.record.created_at < cutoff)
            .cloned()
            .collect();
        stale.sort_by_key(|v| v.record.created_at);
        Ok(stale)
    }

    async fn delete_room(&self, id: SessionId, expected: Version) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        cas_delete(&mut tables.rooms, "WaitingRoom", id, expected)
    }

    async fn open_room(
        &self,
        room: &WaitingRoomEntry,
        session: &Session,
        scope: OpenRoomScope,
    ) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;

        let competing = tables.rooms.values().any(|v| {
            v.record.is_open()
                && v.record.game_mode == room.game_mode
                && match scope {
                    OpenRoomScope::Mode => true,
                    OpenRoomScope::Host => v.record.host_id == room.host_id,
                }
        });
        if competing
            || tables.rooms.contains_key(&room.room_id)
            || tables.sessions.contains_key(&session.id)
        {
            return Err(RepoError::conflict("WaitingRoom", room.room_id));
        }

        tables
            .rooms
            .insert(room.room_id, Versioned::new(room.clone(), Version::INITIAL));
        tables
            .sessions
            .insert(session.id, Versioned::new(session.clone(), Version::INITIAL));
        Ok(())
    }

    async fn claim_room(
        &self,
        room: &WaitingRoomEntry,
        room_expected: Version,
        session: &Session,
        session_expected: Version,
    ) -> Result<Version, RepoError> {
        let mut tables = self.tables.write().await;
        cas_check(&tables.rooms, "WaitingRoom", room.room_id, room_expected)?;
        cas_check(&tables.sessions, "Session", session.id, session_expected)?;

        cas_update(&mut tables.rooms, "WaitingRoom", room.room_id, room, room_expected)?;
        cas_update(&mut tables.sessions, "Session", session.id, session, session_expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicebound_domain::PlayerSlot;

    fn open(host: &str, mode: GameMode, now: DateTime<Utc>) -> (WaitingRoomEntry, Session) {
        let id = SessionId::new();
        let slot = PlayerSlot::new(PlayerId::new(host).unwrap(), host);
        let room = WaitingRoomEntry::open(id, slot.player_id.clone(), mode, now);
        (room, Session::open(id, mode, slot, now))
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict() {
        let dir = MemorySessionDirectory::new();
        let (room, session) = open("alice", GameMode::Quick, Utc::now());
        dir.open_room(&room, &session, OpenRoomScope::Mode).await.unwrap();

        let v2 = dir.update_session(&session, Version::INITIAL).await.unwrap();
        assert_eq!(v2, Version::INITIAL.next());

        let err = dir.update_session(&session, Version::INITIAL).await.unwrap_err();
        assert!(err.is_conflict());
        assert!(dir.delete_session(session.id, Version::INITIAL).await.unwrap_err().is_conflict());
        dir.delete_session(session.id, v2).await.unwrap();
        assert!(dir.delete_session(session.id, v2).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn open_room_scopes() {
        let dir = MemorySessionDirectory::new();
        let now = Utc::now();
        let (room, session) = open("alice", GameMode::Quick, now);
        dir.open_room(&room, &session, OpenRoomScope::Mode).await.unwrap();

        // Another quick room is refused for the queue, allowed for a different host.
        let (room_b, session_b) = open("bob", GameMode::Quick, now);
        assert!(dir
            .open_room(&room_b, &session_b, OpenRoomScope::Mode)
            .await
            .unwrap_err()
            .is_conflict());
        dir.open_room(&room_b, &session_b, OpenRoomScope::Host).await.unwrap();

        // Same host, same mode: refused under either scope.
        let (room_c, session_c) = open("alice", GameMode::Quick, now);
        assert!(dir
            .open_room(&room_c, &session_c, OpenRoomScope::Host)
            .await
            .is_err());
        assert!(dir.get_session(session_c.id).await.unwrap().is_none());

        // Ranked is independent.
        let (room_d, session_d) = open("alice", GameMode::Ranked, now);
        dir.open_room(&room_d, &session_d, OpenRoomScope::Mode).await.unwrap();
        assert_eq!(dir.find_open_rooms(GameMode::Quick).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn claim_room_writes_both_or_neither() {
        let dir = MemorySessionDirectory::new();
        let now = Utc::now();
        let (room, session) = open("alice", GameMode::Quick, now);
        dir.open_room(&room, &session, OpenRoomScope::Mode).await.unwrap();

        let bob = PlayerId::new("bob").unwrap();
        let mut claimed = room.clone();
        claimed.claim(&bob).unwrap();
        let mut filled = session.clone();
        filled.fill_opponent(PlayerSlot::new(bob.clone(), "bob"), now).unwrap();

        // Someone else moved the session first: the room must stay open.
        dir.update_session(&session, Version::INITIAL).await.unwrap();
        let err = dir
            .claim_room(&claimed, Version::INITIAL, &filled, Version::INITIAL)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        let stored = dir.get_room(room.room_id).await.unwrap().unwrap();
        assert!(stored.record.is_open());
        assert_eq!(stored.version, Version::INITIAL);

        let v = dir
            .claim_room(&claimed, Version::INITIAL, &filled, Version::INITIAL.next())
            .await
            .unwrap();
        assert_eq!(v, Version::INITIAL.next().next());
        assert!(!dir.get_room(room.room_id).await.unwrap().unwrap().record.is_open());
        let stored = dir.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(
            stored.record.slots.opponent.as_ref().map(|s| &s.player_id),
            Some(&bob)
        );
    }

    #[tokio::test]
    async fn live_session_lookup_ignores_terminal_sessions() {
        let dir = MemorySessionDirectory::new();
        let now = Utc::now();
        let (room, mut session) = open("alice", GameMode::Quick, now);
        dir.open_room(&room, &session, OpenRoomScope::Mode).await.unwrap();

        let alice = PlayerId::new("alice").unwrap();
        assert!(dir.find_live_session_for_player(&alice).await.unwrap().is_some());

        session.abandon(now).unwrap();
        dir.update_session(&session, Version::INITIAL).await.unwrap();
        assert!(dir.find_live_session_for_player(&alice).await.unwrap().is_none());
    }
}
