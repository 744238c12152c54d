//! SQLite-backed session directory.
//!
//! Each table stores the full record as JSON plus the columns needed to
//! filter on, and a `version` column used for compare-and-set. The JSON is
//! exactly the record; versions never leak into it.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use dicebound_domain::{GameMode, PlayerId, RoomStatus, Session, SessionId, SessionStatus, WaitingRoomEntry};

use crate::infrastructure::ports::{
    OpenRoomScope, RepoError, SessionDirectory, SessionQuery, Version, Versioned,
};

pub struct SqliteSessionDirectory {
    pool: SqlitePool,
}

/// Fixed-width UTC timestamps so text comparison matches time order.
fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn to_json<T: serde::Serialize>(record: &T) -> Result<String, RepoError> {
    serde_json::to_string(record).map_err(RepoError::serialization)
}

fn decode<T: serde::de::DeserializeOwned>(row: &SqliteRow) -> Result<Versioned<T>, RepoError> {
    let json: String = row
        .try_get("record")
        .map_err(|e| RepoError::database("decode", e))?;
    let version: i64 = row
        .try_get("version")
        .map_err(|e| RepoError::database("decode", e))?;
    let record = serde_json::from_str(&json).map_err(RepoError::serialization)?;
    Ok(Versioned::new(record, Version::new(version.max(0) as u64)))
}

fn version_param(version: Version) -> i64 {
    i64::try_from(version.get()).unwrap_or(i64::MAX)
}

impl SqliteSessionDirectory {
    pub async fn new(db_path: &str) -> Result<Self, RepoError> {
        let pool = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", db_path))
            .await
            .map_err(|e| RepoError::database("connect", e))?;

        for statement in [
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                game_mode TEXT NOT NULL,
                host_id TEXT,
                opponent_id TEXT,
                created_at TEXT NOT NULL,
                record TEXT NOT NULL,
                version INTEGER NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_sessions_status ON sessions (status, created_at)",
            "CREATE INDEX IF NOT EXISTS idx_sessions_host ON sessions (host_id)",
            "CREATE INDEX IF NOT EXISTS idx_sessions_opponent ON sessions (opponent_id)",
            r#"
            CREATE TABLE IF NOT EXISTS waiting_rooms (
                room_id TEXT PRIMARY KEY,
                host_id TEXT NOT NULL,
                game_mode TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                record TEXT NOT NULL,
                version INTEGER NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_rooms_open ON waiting_rooms (status, game_mode, created_at)",
        ] {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| RepoError::database("migrate", e))?;
        }

        Ok(Self { pool })
    }

    /// A zero-row conditional write means the record is gone or moved on.
    async fn missing_or_conflict(
        &self,
        table: &'static str,
        key: &'static str,
        entity_type: &'static str,
        id: SessionId,
    ) -> RepoError {
        let sql = format!("SELECT 1 FROM {} WHERE {} = ?", table, key);
        match sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
        {
            Ok(Some(_)) => RepoError::conflict(entity_type, id),
            Ok(None) => RepoError::not_found(entity_type, id),
            Err(e) => RepoError::database("cas_check", e),
        }
    }
}

/// Conditional session write; returns the number of rows touched.
async fn write_session(
    conn: &mut SqliteConnection,
    session: &Session,
    expected: Version,
) -> Result<u64, RepoError> {
    let result = sqlx::query(
        r#"
        UPDATE sessions
        SET status = ?, game_mode = ?, host_id = ?, opponent_id = ?, record = ?,
            version = version + 1
        WHERE id = ? AND version = ?
        "#,
    )
    .bind(session.status.as_str())
    .bind(session.game_mode.as_str())
    .bind(slot_id(session, false))
    .bind(slot_id(session, true))
    .bind(to_json(session)?)
    .bind(session.id.to_string())
    .bind(version_param(expected))
    .execute(conn)
    .await
    .map_err(|e| RepoError::database("update_session", e))?;
    Ok(result.rows_affected())
}

async fn write_room(
    conn: &mut SqliteConnection,
    room: &WaitingRoomEntry,
    expected: Version,
) -> Result<u64, RepoError> {
    let result = sqlx::query(
        r#"
        UPDATE waiting_rooms
        SET status = ?, record = ?, version = version + 1
        WHERE room_id = ? AND version = ?
        "#,
    )
    .bind(room.status.as_str())
    .bind(to_json(room)?)
    .bind(room.room_id.to_string())
    .bind(version_param(expected))
    .execute(conn)
    .await
    .map_err(|e| RepoError::database("claim_room", e))?;
    Ok(result.rows_affected())
}

fn slot_id(session: &Session, opponent: bool) -> Option<String> {
    let slot = if opponent {
        session.slots.opponent.as_ref()
    } else {
        session.slots.host.as_ref()
    };
    slot.map(|s| s.player_id.to_string())
}

#[async_trait]
impl SessionDirectory for SqliteSessionDirectory {
    async fn get_session(&self, id: SessionId) -> Result<Option<Versioned<Session>>, RepoError> {
        let row = sqlx::query("SELECT record, version FROM sessions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("get_session", e))?;
        row.as_ref().map(decode).transpose()
    }

    async fn list_sessions(&self, query: SessionQuery) -> Result<Vec<Versioned<Session>>, RepoError> {
        let rows = sqlx::query(
            r#"
            SELECT record, version FROM sessions
            WHERE (?1 IS NULL OR status = ?1)
              AND (?2 IS NULL OR game_mode = ?2)
              AND (?3 IS NULL OR created_at < ?3)
            ORDER BY created_at DESC
            LIMIT ?4
            "#,
        )
        .bind(query.status.map(|s| s.as_str()))
        .bind(query.game_mode.map(|m| m.as_str()))
        .bind(query.created_before.map(ts))
        .bind(query.limit.map_or(-1, i64::from))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("list_sessions", e))?;

        rows.iter().map(decode).collect()
    }

    async fn find_live_session_for_player(
        &self,
        player_id: &PlayerId,
    ) -> Result<Option<Versioned<Session>>, RepoError> {
        let row = sqlx::query(
            r#"
            SELECT record, version FROM sessions
            WHERE (host_id = ?1 OR opponent_id = ?1)
              AND status NOT IN (?2, ?3)
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(player_id.as_str())
        .bind(SessionStatus::Completed.as_str())
        .bind(SessionStatus::Abandoned.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::database("find_live_session_for_player", e))?;
        row.as_ref().map(decode).transpose()
    }

    async fn update_session(&self, session: &Session, expected: Version) -> Result<Version, RepoError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| RepoError::database("update_session", e))?;

        if write_session(&mut conn, session, expected).await? == 0 {
            return Err(self
                .missing_or_conflict("sessions", "id", "Session", session.id)
                .await);
        }
        Ok(expected.next())
    }

    async fn delete_session(&self, id: SessionId, expected: Version) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ? AND version = ?")
            .bind(id.to_string())
            .bind(version_param(expected))
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::database("delete_session", e))?;

        if result.rows_affected() == 0 {
            return Err(self.missing_or_conflict("sessions", "id", "Session", id).await);
        }
        Ok(())
    }

    async fn get_room(&self, id: SessionId) -> Result<Option<Versioned<WaitingRoomEntry>>, RepoError> {
        let row = sqlx::query("SELECT record, version FROM waiting_rooms WHERE room_id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("get_room", e))?;
        row.as_ref().map(decode).transpose()
    }

    async fn find_open_rooms(
        &self,
        game_mode: GameMode,
    ) -> Result<Vec<Versioned<WaitingRoomEntry>>, RepoError> {
        let rows = sqlx::query(
            r#"
            SELECT record, version FROM waiting_rooms
            WHERE status = ? AND game_mode = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(RoomStatus::Open.as_str())
        .bind(game_mode.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("find_open_rooms", e))?;
        rows.iter().map(decode).collect()
    }

    async fn list_rooms_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Versioned<WaitingRoomEntry>>, RepoError> {
        let rows = sqlx::query(
            "SELECT record, version FROM waiting_rooms WHERE created_at < ? ORDER BY created_at ASC",
        )
        .bind(ts(cutoff))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("list_rooms_created_before", e))?;
        rows.iter().map(decode).collect()
    }

    async fn delete_room(&self, id: SessionId, expected: Version) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM waiting_rooms WHERE room_id = ? AND version = ?")
            .bind(id.to_string())
            .bind(version_param(expected))
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::database("delete_room", e))?;

        if result.rows_affected() == 0 {
            return Err(self
                .missing_or_conflict("waiting_rooms", "room_id", "WaitingRoom", id)
                .await);
        }
        Ok(())
    }

    async fn open_room(
        &self,
        room: &WaitingRoomEntry,
        session: &Session,
        scope: OpenRoomScope,
    ) -> Result<(), RepoError> {
        let host_filter = match scope {
            OpenRoomScope::Mode => None,
            OpenRoomScope::Host => Some(room.host_id.as_str()),
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::database("open_room", e))?;

        // Insert-if-no-competitor in one statement; SQLite holds the write
        // lock for its whole duration.
        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO waiting_rooms
                (room_id, host_id, game_mode, status, created_at, record, version)
            SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7
            WHERE NOT EXISTS (
                SELECT 1 FROM waiting_rooms
                WHERE status = ?4 AND game_mode = ?3
                  AND (?8 IS NULL OR host_id = ?8)
            )
            "#,
        )
        .bind(room.room_id.to_string())
        .bind(room.host_id.as_str())
        .bind(room.game_mode.as_str())
        .bind(RoomStatus::Open.as_str())
        .bind(ts(room.created_at))
        .bind(to_json(room)?)
        .bind(version_param(Version::INITIAL))
        .bind(host_filter)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepoError::database("open_room", e))?;

        if inserted.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| RepoError::database("open_room", e))?;
            return Err(RepoError::conflict("WaitingRoom", room.room_id));
        }

        let session_inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO sessions
                (id, status, game_mode, host_id, opponent_id, created_at, record, version)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(session.id.to_string())
        .bind(session.status.as_str())
        .bind(session.game_mode.as_str())
        .bind(slot_id(session, false))
        .bind(slot_id(session, true))
        .bind(ts(session.created_at))
        .bind(to_json(session)?)
        .bind(version_param(Version::INITIAL))
        .execute(&mut *tx)
        .await
        .map_err(|e| RepoError::database("open_room", e))?;

        if session_inserted.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| RepoError::database("open_room", e))?;
            return Err(RepoError::conflict("Session", session.id));
        }

        tx.commit()
            .await
            .map_err(|e| RepoError::database("open_room", e))
    }

    async fn claim_room(
        &self,
        room: &WaitingRoomEntry,
        room_expected: Version,
        session: &Session,
        session_expected: Version,
    ) -> Result<Version, RepoError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::database("claim_room", e))?;

        if write_room(&mut tx, room, room_expected).await? == 0 {
            tx.rollback()
                .await
                .map_err(|e| RepoError::database("claim_room", e))?;
            return Err(self
                .missing_or_conflict("waiting_rooms", "room_id", "WaitingRoom", room.room_id)
                .await);
        }

        if write_session(&mut tx, session, session_expected).await? == 0 {
            tx.rollback()
                .await
                .map_err(|e| RepoError::database("claim_room", e))?;
            return Err(self
                .missing_or_conflict("sessions", "id", "Session", session.id)
                .await);
        }

        tx.commit()
            .await
            .map_err(|e| RepoError::database("claim_room", e))?;
        Ok(session_expected.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use dicebound_domain::PlayerSlot;
    use tempfile::TempDir;

    async fn directory() -> (TempDir, SqliteSessionDirectory) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        let repo = SqliteSessionDirectory::new(path.to_str().unwrap())
            .await
            .unwrap();
        (dir, repo)
    }

    fn open(host: &str, mode: GameMode, now: DateTime<Utc>) -> (WaitingRoomEntry, Session) {
        let id = SessionId::new();
        let slot = PlayerSlot::new(PlayerId::new(host).unwrap(), host);
        let room = WaitingRoomEntry::open(id, slot.player_id.clone(), mode, now);
        (room, Session::open(id, mode, slot, now))
    }

    #[tokio::test]
    async fn record_round_trips_without_hidden_fields() {
        let (_tmp, repo) = directory().await;
        let (room, session) = open("alice", GameMode::Quick, Utc::now());
        repo.open_room(&room, &session, OpenRoomScope::Mode).await.unwrap();

        let loaded = repo.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(loaded.record, session);
        assert_eq!(loaded.version, Version::INITIAL);

        let raw: String = sqlx::query_scalar("SELECT record FROM sessions WHERE id = ?")
            .bind(session.id.to_string())
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(json.get("version").is_none());
        assert_eq!(json.as_object().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn claim_is_compare_and_set() {
        let (_tmp, repo) = directory().await;
        let (room, session) = open("alice", GameMode::Quick, Utc::now());
        repo.open_room(&room, &session, OpenRoomScope::Mode).await.unwrap();

        let mut first = room.clone();
        first.claim(&PlayerId::new("bob").unwrap()).unwrap();
        let mut second = room.clone();
        second.claim(&PlayerId::new("carol").unwrap()).unwrap();

        let now = Utc::now();
        let mut with_bob = session.clone();
        with_bob
            .fill_opponent(PlayerSlot::new(PlayerId::new("bob").unwrap(), "bob"), now)
            .unwrap();
        let mut with_carol = session.clone();
        with_carol
            .fill_opponent(PlayerSlot::new(PlayerId::new("carol").unwrap(), "carol"), now)
            .unwrap();

        let v = repo
            .claim_room(&first, Version::INITIAL, &with_bob, Version::INITIAL)
            .await
            .unwrap();
        assert_eq!(v, Version::INITIAL.next());
        let err = repo
            .claim_room(&second, Version::INITIAL, &with_carol, Version::INITIAL)
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        assert!(repo.find_open_rooms(GameMode::Quick).await.unwrap().is_empty());
        let stored = repo.get_room(room.room_id).await.unwrap().unwrap();
        assert_eq!(stored.record.status, RoomStatus::Claimed);
        let seated = repo.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(seated.record, with_bob);
    }

    #[tokio::test]
    async fn failed_session_write_rolls_back_the_claim() {
        let (_tmp, repo) = directory().await;
        let now = Utc::now();
        let (room, session) = open("alice", GameMode::Quick, now);
        repo.open_room(&room, &session, OpenRoomScope::Mode).await.unwrap();

        let bob = PlayerId::new("bob").unwrap();
        let mut claimed = room.clone();
        claimed.claim(&bob).unwrap();
        let mut filled = session.clone();
        filled.fill_opponent(PlayerSlot::new(bob, "bob"), now).unwrap();

        // The session moved on underneath the claim.
        repo.update_session(&session, Version::INITIAL).await.unwrap();
        let err = repo
            .claim_room(&claimed, Version::INITIAL, &filled, Version::INITIAL)
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let stored = repo.get_room(room.room_id).await.unwrap().unwrap();
        assert_eq!(stored.record.status, RoomStatus::Open);
        assert_eq!(stored.version, Version::INITIAL);
        assert_eq!(repo.find_open_rooms(GameMode::Quick).await.unwrap().len(), 1);

        // Session gone entirely: not found, room still untouched.
        repo.delete_session(session.id, Version::INITIAL.next()).await.unwrap();
        let err = repo
            .claim_room(&claimed, Version::INITIAL, &filled, Version::INITIAL.next())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        let stored = repo.get_room(room.room_id).await.unwrap().unwrap();
        assert_eq!(stored.record.status, RoomStatus::Open);
    }

    #[tokio::test]
    async fn open_room_refuses_second_open_room_for_mode() {
        let (_tmp, repo) = directory().await;
        let now = Utc::now();
        let (room, session) = open("alice", GameMode::Quick, now);
        repo.open_room(&room, &session, OpenRoomScope::Mode).await.unwrap();

        let (room_b, session_b) = open("bob", GameMode::Quick, now);
        let err = repo
            .open_room(&room_b, &session_b, OpenRoomScope::Mode)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(repo.get_session(session_b.id).await.unwrap().is_none());

        repo.open_room(&room_b, &session_b, OpenRoomScope::Host).await.unwrap();
        assert_eq!(repo.find_open_rooms(GameMode::Quick).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn list_and_age_queries() {
        let (_tmp, repo) = directory().await;
        let now = Utc::now();
        let (old_room, old_session) = open("alice", GameMode::Quick, now - Duration::hours(2));
        let (new_room, new_session) = open("bob", GameMode::Ranked, now);
        repo.open_room(&old_room, &old_session, OpenRoomScope::Mode).await.unwrap();
        repo.open_room(&new_room, &new_session, OpenRoomScope::Mode).await.unwrap();

        let all = repo.list_sessions(SessionQuery::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].record.id, new_session.id);

        let ranked = repo
            .list_sessions(SessionQuery {
                game_mode: Some(GameMode::Ranked),
                ..SessionQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(ranked.len(), 1);

        let limited = repo
            .list_sessions(SessionQuery {
                limit: Some(1),
                ..SessionQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);

        let stale = repo
            .list_rooms_created_before(now - Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].record.room_id, old_room.room_id);

        let cutoff = SessionQuery::created_before(now - Duration::hours(1));
        assert_eq!(repo.list_sessions(cutoff).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn live_lookup_and_delete() {
        let (_tmp, repo) = directory().await;
        let now = Utc::now();
        let (room, mut session) = open("alice", GameMode::Quick, now);
        repo.open_room(&room, &session, OpenRoomScope::Mode).await.unwrap();

        session
            .fill_opponent(PlayerSlot::new(PlayerId::new("bob").unwrap(), "Bob"), now)
            .unwrap();
        let v2 = repo.update_session(&session, Version::INITIAL).await.unwrap();

        let bob = PlayerId::new("bob").unwrap();
        let found = repo.find_live_session_for_player(&bob).await.unwrap().unwrap();
        assert_eq!(found.record.id, session.id);
        assert_eq!(found.version, v2);

        assert!(repo
            .delete_session(session.id, Version::INITIAL)
            .await
            .unwrap_err()
            .is_conflict());
        repo.delete_session(session.id, v2).await.unwrap();
        assert!(repo
            .delete_session(session.id, v2)
            .await
            .unwrap_err()
            .is_not_found());
        assert!(repo.find_live_session_for_player(&bob).await.unwrap().is_none());
    }
}
