//! Caller identity from request headers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use dicebound_domain::{PlayerId, PlayerSlot};
use dicebound_shared::{DISPLAY_NAME_HEADER, PLAYER_ID_HEADER};

use super::ApiError;

/// The authenticated player making the request.
///
/// The display name defaults to the player id when the header is absent.
#[derive(Debug, Clone)]
pub struct Caller(pub PlayerSlot);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let raw_id = header(PLAYER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("Missing {} header", PLAYER_ID_HEADER)))?;
        let player_id = PlayerId::new(raw_id).map_err(|e| ApiError::Unauthorized(e.to_string()))?;
        if player_id.is_bot() {
            return Err(ApiError::Unauthorized(
                "Synthetic player ids cannot make requests".to_string(),
            ));
        }

        let display_name = header(DISPLAY_NAME_HEADER)
            .map(str::to_string)
            .unwrap_or_else(|| player_id.to_string());
        Ok(Caller(PlayerSlot::new(player_id, display_name)))
    }
}
