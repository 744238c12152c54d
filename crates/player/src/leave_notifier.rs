//! Best-effort leave delivery.
//!
//! The notifier fires `DELETE /queue/leave` on a spawned task and never waits
//! for it. The page may be gone before the request leaves the machine.

use std::sync::Arc;
use std::time::Duration;

use dicebound_domain::{PlayerSlot, SessionId};
use dicebound_shared::{DISPLAY_NAME_HEADER, PLAYER_ID_HEADER};
use reqwest::Client;

use crate::session_binder::{BinderAction, LifecycleEvent, SessionBinder};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("engine returned HTTP {0}")]
    Status(u16),
}

#[cfg_attr(test, mockall::automock)]
pub trait LeaveNotifier: Send + Sync {
    /// Start a leave for `session_id` without waiting for the outcome.
    fn notify_leave(&self, session_id: SessionId);
}

/// Feed `event` to the binder and hand any resulting leave to `notifier`.
pub fn dispatch(
    binder: &mut SessionBinder,
    event: LifecycleEvent,
    notifier: &dyn LeaveNotifier,
) -> BinderAction {
    let action = binder.handle(event);
    if let BinderAction::SendLeave(session_id) = action {
        notifier.notify_leave(session_id);
    }
    action
}

/// Leave notifier speaking HTTP to the engine.
#[derive(Clone)]
pub struct HttpLeaveNotifier {
    client: Client,
    base_url: String,
    player: Arc<PlayerSlot>,
}

impl HttpLeaveNotifier {
    pub fn new(base_url: impl Into<String>, player: PlayerSlot) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(3))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            player: Arc::new(player),
        }
    }

    /// Send the leave and wait for the engine to answer.
    pub async fn send_leave(&self, session_id: SessionId) -> Result<(), NotifyError> {
        let response = self
            .client
            .delete(format!("{}/queue/leave", self.base_url))
            .query(&[("sessionId", session_id.to_string())])
            .header(PLAYER_ID_HEADER, self.player.player_id.as_str())
            .header(DISPLAY_NAME_HEADER, self.player.display_name.as_str())
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        Ok(())
    }
}

impl LeaveNotifier for HttpLeaveNotifier {
    fn notify_leave(&self, session_id: SessionId) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(session_id = %session_id, "No runtime available; leave dropped");
            return;
        };
        let notifier = self.clone();
        runtime.spawn(async move {
            if let Err(e) = notifier.send_leave(session_id).await {
                tracing::debug!(session_id = %session_id, error = %e, "Best-effort leave failed");
            }
        });
    }
}
