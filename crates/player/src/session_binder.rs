//! Client session binder.
//!
//! Maps page lifecycle events onto at most one `leave` per bound session.
//! A player coming back to a page bound to a live match is sent to the
//! lobby; a refresh mid-match counts as leaving it.
//!
//! ```text
//! Unbound --bind--> Bound --Hidden/NavigatedAway/Unloading--> LeaveSent
//!                     |                                          |
//!                     +--Visible (live match)--> RedirectToLobby-+
//! ```

use dicebound_domain::{SessionId, SessionStatus};

/// Page lifecycle signals fed in by the host shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Tab hidden or window minimised
    Hidden,
    /// Tab visible again
    Visible,
    /// User left the active session view inside the app
    NavigatedAway,
    /// Page is being torn down
    Unloading,
}

/// What the host shell should do in response to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinderAction {
    None,
    /// Fire one best-effort leave for this session
    SendLeave(SessionId),
    /// Move the player to a neutral view instead of resuming
    RedirectToLobby,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Binding {
    session_id: SessionId,
    status: SessionStatus,
    leave_sent: bool,
}

/// Tracks the session the local player is bound to.
#[derive(Debug, Clone)]
pub struct SessionBinder {
    enabled: bool,
    binding: Option<Binding>,
}

impl Default for SessionBinder {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SessionBinder {
    /// A disabled binder ignores every event.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            binding: None,
        }
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn bound_session(&self) -> Option<SessionId> {
        self.binding.map(|b| b.session_id)
    }

    /// Bind to `session_id`. Rebinding to a different session resets the
    /// at-most-once guard.
    pub fn bind(&mut self, session_id: SessionId, status: SessionStatus) {
        match &mut self.binding {
            Some(b) if b.session_id == session_id => b.status = status,
            _ => {
                self.binding = Some(Binding {
                    session_id,
                    status,
                    leave_sent: false,
                })
            }
        }
    }

    /// Record a status change observed for the bound session.
    pub fn update_status(&mut self, status: SessionStatus) {
        if let Some(b) = &mut self.binding {
            b.status = status;
        }
    }

    pub fn unbind(&mut self) {
        self.binding = None;
    }

    pub fn handle(&mut self, event: LifecycleEvent) -> BinderAction {
        if !self.enabled {
            return BinderAction::None;
        }
        let Some(binding) = &mut self.binding else {
            return BinderAction::None;
        };

        match event {
            LifecycleEvent::Hidden | LifecycleEvent::NavigatedAway | LifecycleEvent::Unloading => {
                if binding.leave_sent || binding.status.is_terminal() {
                    return BinderAction::None;
                }
                binding.leave_sent = true;
                tracing::debug!(
                    session_id = %binding.session_id,
                    event = ?event,
                    "Sending best-effort leave"
                );
                BinderAction::SendLeave(binding.session_id)
            }
            LifecycleEvent::Visible => {
                if binding.status.is_live() {
                    self.binding = None;
                    BinderAction::RedirectToLobby
                } else {
                    BinderAction::None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leave_is_sent_once_per_binding() {
        let mut binder = SessionBinder::default();
        let id = SessionId::new();
        binder.bind(id, SessionStatus::Waiting);

        assert_eq!(binder.handle(LifecycleEvent::Hidden), BinderAction::SendLeave(id));
        assert_eq!(binder.handle(LifecycleEvent::Unloading), BinderAction::None);
        assert_eq!(binder.handle(LifecycleEvent::NavigatedAway), BinderAction::None);

        let next = SessionId::new();
        binder.bind(next, SessionStatus::Waiting);
        assert_eq!(binder.handle(LifecycleEvent::Unloading), BinderAction::SendLeave(next));
    }

    #[test]
    fn returning_to_a_live_match_redirects() {
        let mut binder = SessionBinder::default();
        let id = SessionId::new();
        binder.bind(id, SessionStatus::Ready);
        binder.update_status(SessionStatus::Active);

        assert_eq!(binder.handle(LifecycleEvent::Visible), BinderAction::RedirectToLobby);
        assert_eq!(binder.bound_session(), None);
    }

    #[test]
    fn returning_to_the_queue_does_nothing() {
        let mut binder = SessionBinder::default();
        binder.bind(SessionId::new(), SessionStatus::Waiting);
        assert_eq!(binder.handle(LifecycleEvent::Visible), BinderAction::None);
    }

    #[test]
    fn finished_matches_need_no_leave() {
        let mut binder = SessionBinder::default();
        binder.bind(SessionId::new(), SessionStatus::Completed);
        assert_eq!(binder.handle(LifecycleEvent::Unloading), BinderAction::None);
    }

    #[test]
    fn disabled_binder_is_inert() {
        let mut binder = SessionBinder::disabled();
        binder.bind(SessionId::new(), SessionStatus::Active);
        for event in [
            LifecycleEvent::Hidden,
            LifecycleEvent::Visible,
            LifecycleEvent::NavigatedAway,
            LifecycleEvent::Unloading,
        ] {
            assert_eq!(binder.handle(event), BinderAction::None);
        }
    }

    #[test]
    fn unbound_binder_ignores_events() {
        let mut binder = SessionBinder::default();
        assert_eq!(binder.handle(LifecycleEvent::Hidden), BinderAction::None);
    }
}
