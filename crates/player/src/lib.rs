//! Dicebound Player - client-side session binding.
//!
//! Watches the host page's lifecycle and tells the engine when the local
//! player walks away from a session. Delivery is best effort; the engine's
//! reaper cleans up regardless.

pub mod leave_notifier;
pub mod session_binder;

pub use leave_notifier::{dispatch, HttpLeaveNotifier, LeaveNotifier, NotifyError};
pub use session_binder::{BinderAction, LifecycleEvent, SessionBinder};
