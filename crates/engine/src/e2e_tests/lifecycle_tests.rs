//! Server-side cleanup with no client cooperation.

use chrono::Duration;
use dicebound_domain::{GameMode, Seat, SessionId, SessionStatus, TurnDeciderPhase};

use super::*;
use crate::infrastructure::ports::{ClockPort, SessionDirectory};
use crate::test_fixtures::slot;

#[tokio::test]
async fn idle_ready_session_is_repaired_into_awaiting_choice() {
    let ctx = E2ETestContext::offline();
    let joined = ctx.join(&slot("alice"), GameMode::Quick).await;
    ctx.join(&slot("bob"), GameMode::Quick).await;
    let before = ctx.session(joined.session_id).await.unwrap();

    ctx.advance(Duration::seconds(31));
    let report = ctx.app.use_cases.reaper.sweep_once(ctx.clock.now()).await;
    assert_eq!(report.decider_repairs, 1);

    let after = ctx.session(joined.session_id).await.unwrap();
    assert_eq!(after.status, SessionStatus::TurnDecider);
    assert_eq!(after.turn_decider.phase(), TurnDeciderPhase::AwaitingChoice);
    assert_eq!(after.turn_decider.decider_slot, Some(Seat::Host));
    assert_eq!(after.slots, before.slots);
}

#[tokio::test]
async fn abandoned_waiting_room_is_reaped_within_one_sweep() {
    let ctx = E2ETestContext::offline();
    // Alice queues and closes the tab; no leave call ever arrives.
    let joined = ctx.join(&slot("alice"), GameMode::Quick).await;
    let id = SessionId::from_uuid(joined.session_id);

    ctx.advance(Duration::minutes(30) + Duration::seconds(1));
    let report = ctx.app.use_cases.reaper.sweep_once(ctx.clock.now()).await;
    assert_eq!(report.rooms_deleted, 1);
    assert!(ctx.app.directory.get_room(id).await.unwrap().is_none());
    assert!(ctx.session(joined.session_id).await.is_none());

    // Bob now opens a fresh room rather than landing in the dead one.
    let bob = ctx.join(&slot("bob"), GameMode::Quick).await;
    assert_ne!(bob.session_id, joined.session_id);
    assert_eq!(bob.status, SessionStatus::Waiting);
}

#[tokio::test]
async fn stale_live_match_is_abandoned_and_later_removed() {
    let ctx = E2ETestContext::offline();
    let joined = ctx.join(&slot("alice"), GameMode::Quick).await;
    ctx.join(&slot("bob"), GameMode::Quick).await;

    ctx.advance(Duration::minutes(91));
    ctx.app.use_cases.reaper.sweep_once(ctx.clock.now()).await;
    let session = ctx.session(joined.session_id).await.unwrap();
    assert_eq!(session.status, SessionStatus::Abandoned);

    ctx.advance(Duration::minutes(1));
    ctx.app.use_cases.reaper.sweep_once(ctx.clock.now()).await;
    assert!(ctx.session(joined.session_id).await.is_none());
}

#[tokio::test]
async fn leave_on_a_reaped_session_is_a_no_op() {
    let ctx = E2ETestContext::offline();
    let joined = ctx.join(&slot("alice"), GameMode::Quick).await;
    ctx.advance(Duration::hours(1));
    ctx.app.use_cases.reaper.sweep_once(ctx.clock.now()).await;

    let resp = ctx
        .app
        .use_cases
        .matchmaking
        .leave
        .execute(&slot("alice"), Some(SessionId::from_uuid(joined.session_id)))
        .await
        .unwrap();
    assert!(resp.ok);
}
