//! Dicebound Shared - wire types for the queue and matches surface.
//!
//! The engine's HTTP layer, the client for the remote authoritative match
//! service, and the player all speak these shapes.
//!
//! # Design Principles
//!
//! 1. **No business logic** - pure data types and conversions
//! 2. **Raw ids on the wire** - `uuid::Uuid` for sessions, `String` for players
//! 3. **camelCase JSON** - matches the persisted record field names

pub mod requests;
pub mod responses;

/// Header carrying the authenticated player id.
pub const PLAYER_ID_HEADER: &str = "x-player-id";

/// Optional header carrying the player's display name.
pub const DISPLAY_NAME_HEADER: &str = "x-display-name";

pub use requests::{
    CreateMatchRequest, GatewayConfigUpdate, JoinQueueRequest, MatchListQuery, TurnChoiceRequest,
};
pub use responses::{
    AddBotResponse, ErrorBody, ErrorCode, GatewaySnapshot, JoinQueueResponse, LeaveQueueResponse,
    MatchSummary, QueueStatusResponse, SessionDto, SlotDto, SlotsDto, TurnDeciderDto,
};
