//! Request bodies and query strings.

use serde::{Deserialize, Serialize};

use dicebound_domain::{GameMode, SessionStatus, TurnChoice};

/// Body of `POST /queue/join`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinQueueRequest {
    pub game_mode: GameMode,
}

/// Body of `POST /matches`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMatchRequest {
    pub game_mode: GameMode,
}

/// Query string of `GET /matches`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchListQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SessionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_mode: Option<GameMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Body of `POST /matches/{id}/turn-decider/choice`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnChoiceRequest {
    pub choice: TurnChoice,
}

/// Body of `PUT /admin/gateway-config`. Omitted fields keep their value;
/// an empty `endpointBase` disables the remote path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfigUpdate {
    #[serde(default)]
    pub endpoint_base: Option<String>,
    #[serde(default)]
    pub retry_delay_secs: Option<u64>,
}
