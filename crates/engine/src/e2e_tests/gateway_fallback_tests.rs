//! Remote failures degrade to the local path without hammering the remote.

use chrono::Duration;
use dicebound_domain::{GameMode, SessionStatus};

use super::*;
use crate::test_fixtures::slot;

fn past_window() -> Duration {
    Duration::from_std(RETRY_DELAY).unwrap() + Duration::seconds(1)
}

#[tokio::test]
async fn fourth_join_after_three_failures_stays_local() {
    let ctx = E2ETestContext::with_broken_remote();

    // Three consecutive join attempts, each one reaching the remote and
    // getting HTTP 500. Each still succeeds locally.
    for (i, player) in ["alice", "bob", "carol"].iter().enumerate() {
        if i > 0 {
            ctx.advance(past_window());
        }
        let resp = ctx.join(&slot(player), GameMode::Ranked).await;
        assert!(matches!(resp.status, SessionStatus::Waiting | SessionStatus::Ready));
        assert_eq!(ctx.remote.calls(), i + 1);
    }
    assert!(ctx.app.gateway.snapshot().unavailable_until.is_some());

    ctx.advance(Duration::seconds(1));
    let fourth = ctx.join(&slot("dave"), GameMode::Ranked).await;
    assert_eq!(ctx.remote.calls(), 3, "fourth call must not touch the network");
    assert!(ctx.session(fourth.session_id).await.is_some());
}

#[tokio::test]
async fn one_remote_attempt_per_retry_window() {
    let ctx = E2ETestContext::with_broken_remote();

    for i in 0..10 {
        ctx.join(&slot(&format!("player{i}")), GameMode::Quick).await;
        ctx.advance(Duration::seconds(5));
    }
    assert_eq!(ctx.remote.calls(), 1);

    ctx.advance(past_window());
    ctx.join(&slot("late"), GameMode::Quick).await;
    assert_eq!(ctx.remote.calls(), 2);
}

#[tokio::test]
async fn corrected_endpoint_is_retried_immediately() {
    let ctx = E2ETestContext::with_broken_remote();
    ctx.join(&slot("alice"), GameMode::Quick).await;
    assert_eq!(ctx.remote.calls(), 1);

    ctx.app
        .gateway
        .config()
        .apply_update(dicebound_shared::GatewayConfigUpdate {
            endpoint_base: Some("http://fixed.match.test".to_string()),
            retry_delay_secs: None,
        });
    ctx.join(&slot("bob"), GameMode::Quick).await;
    assert_eq!(ctx.remote.calls(), 2);
}
