//! API layer - HTTP entry points.

mod auth;
mod error;
pub mod http;

pub use auth::Caller;
pub use error::ApiError;
