//! Lifecycle reaper.
//!
//! A single recurring background task that removes waiting rooms and matches
//! past their age thresholds, then repairs stalled turn deciders. Age is
//! measured from `created_at`; activity heartbeats never extend a record's
//! life. Failures on individual records are logged and skipped.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dicebound_domain::{SessionId, SessionStatus, WaitingRoomEntry};
use tokio_util::sync::CancellationToken;

use crate::infrastructure::ports::{
    ClockPort, RepoError, SessionDirectory, SessionQuery, Version, Versioned,
};
use crate::infrastructure::settings::ReaperConfig;
use crate::use_cases::matchmaking::ignore_missing;
use crate::use_cases::turn_decider::TurnDeciderService;

/// Counts from one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub rooms_deleted: usize,
    pub sessions_deleted: usize,
    pub sessions_abandoned: usize,
    pub decider_repairs: usize,
    pub failures: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub struct LifecycleReaper {
    directory: Arc<dyn SessionDirectory>,
    turn_decider: Arc<TurnDeciderService>,
    clock: Arc<dyn ClockPort>,
    config: ReaperConfig,
}

impl LifecycleReaper {
    pub fn new(
        directory: Arc<dyn SessionDirectory>,
        turn_decider: Arc<TurnDeciderService>,
        clock: Arc<dyn ClockPort>,
        config: ReaperConfig,
    ) -> Self {
        Self {
            directory,
            turn_decider,
            clock,
            config,
        }
    }

    pub fn config(&self) -> ReaperConfig {
        self.config
    }

    /// Run sweeps every `config.interval` until cancelled. Sweeps never overlap.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            waiting_room_ttl_secs = self.config.waiting_room_ttl.as_secs(),
            match_ttl_secs = self.config.match_ttl.as_secs(),
            "Lifecycle reaper started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let report = self.sweep_once(self.clock.now()).await;
                    if report.is_empty() {
                        tracing::trace!("Reaper sweep found nothing to do");
                    } else {
                        tracing::info!(
                            rooms_deleted = report.rooms_deleted,
                            sessions_deleted = report.sessions_deleted,
                            sessions_abandoned = report.sessions_abandoned,
                            decider_repairs = report.decider_repairs,
                            failures = report.failures,
                            "Reaper sweep finished"
                        );
                    }
                }
            }
        }

        tracing::info!("Lifecycle reaper stopped");
    }

    /// One full pass: waiting rooms, then matches, then stuck deciders.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();
        self.sweep_rooms(now, &mut report).await;
        self.sweep_matches(now, &mut report).await;

        match self.turn_decider.repair_stuck(now).await {
            Ok(repaired) => report.decider_repairs = repaired.len(),
            Err(e) => {
                tracing::warn!(error = %e, "Turn decider repair pass failed");
                report.failures += 1;
            }
        }
        report
    }

    async fn sweep_rooms(&self, now: DateTime<Utc>, report: &mut SweepReport) {
        let Some(cutoff) = cutoff(now, self.config.waiting_room_ttl) else {
            return;
        };
        let rooms = match self.directory.list_rooms_created_before(cutoff).await {
            Ok(rooms) => rooms,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to list stale waiting rooms");
                report.failures += 1;
                return;
            }
        };

        for Versioned { record, version } in rooms {
            let room_id = record.room_id;
            match self.reap_room(&record, version).await {
                Ok(session_deleted) => {
                    report.rooms_deleted += 1;
                    if session_deleted {
                        report.sessions_deleted += 1;
                    }
                    tracing::debug!(room_id = %room_id, session_deleted, "Reaped waiting room");
                }
                Err(e) if e.is_not_found() || e.is_conflict() => {
                    tracing::debug!(room_id = %room_id, error = %e, "Waiting room changed during sweep");
                }
                Err(e) => {
                    tracing::warn!(room_id = %room_id, error = %e, "Failed to reap waiting room");
                    report.failures += 1;
                }
            }
        }
    }

    /// Delete the room and, if nobody ever claimed it, its waiting session.
    async fn reap_room(&self, room: &WaitingRoomEntry, version: Version) -> Result<bool, RepoError> {
        self.directory.delete_room(room.room_id, version).await?;

        let Some(session) = self.directory.get_session(room.room_id).await? else {
            return Ok(false);
        };
        if session.record.status != SessionStatus::Waiting {
            return Ok(false);
        }
        self.directory
            .delete_session(room.room_id, session.version)
            .await?;
        Ok(true)
    }

    async fn sweep_matches(&self, now: DateTime<Utc>, report: &mut SweepReport) {
        let Some(cutoff) = cutoff(now, self.config.match_ttl) else {
            return;
        };
        let sessions = match self
            .directory
            .list_sessions(SessionQuery::created_before(cutoff))
            .await
        {
            Ok(sessions) => sessions,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to list stale sessions");
                report.failures += 1;
                return;
            }
        };

        for Versioned { record, version } in sessions {
            let id = record.id;
            let result = match record.status {
                SessionStatus::Completed => continue,
                SessionStatus::Waiting | SessionStatus::Abandoned => {
                    self.delete_session(id, version).await.map(|_| {
                        report.sessions_deleted += 1;
                    })
                }
                SessionStatus::Ready | SessionStatus::TurnDecider | SessionStatus::Active => {
                    let mut session = record;
                    match session.abandon(now) {
                        Ok(()) => self
                            .directory
                            .update_session(&session, version)
                            .await
                            .map(|_| {
                                report.sessions_abandoned += 1;
                                tracing::info!(session_id = %id, "Marked stale session abandoned");
                            }),
                        Err(e) => {
                            tracing::warn!(session_id = %id, error = %e, "Cannot abandon session");
                            report.failures += 1;
                            continue;
                        }
                    }
                }
            };

            match result {
                Ok(()) => {}
                Err(e) if e.is_not_found() || e.is_conflict() => {
                    tracing::debug!(session_id = %id, error = %e, "Session changed during sweep");
                }
                Err(e) => {
                    tracing::warn!(session_id = %id, error = %e, "Failed to reap session");
                    report.failures += 1;
                }
            }
        }
    }

    async fn delete_session(&self, id: SessionId, version: Version) -> Result<(), RepoError> {
        self.directory.delete_session(id, version).await?;
        // A leftover room for the same id would point at nothing.
        if let Some(room) = self.directory.get_room(id).await? {
            ignore_missing(self.directory.delete_room(id, room.version).await)?;
        }
        Ok(())
    }
}

fn cutoff(now: DateTime<Utc>, ttl: std::time::Duration) -> Option<DateTime<Utc>> {
    let ttl = Duration::from_std(ttl).ok()?;
    now.checked_sub_signed(ttl)
}
