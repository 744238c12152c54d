//! HTTP client for the remote authoritative match service.
//!
//! Speaks the same wire protocol as this engine's own request surface. The
//! endpoint is passed per call so configuration changes apply immediately.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use dicebound_domain::{GameMode, PlayerSlot, SessionId};
use dicebound_shared::{
    AddBotResponse, JoinQueueRequest, JoinQueueResponse, QueueStatusResponse, DISPLAY_NAME_HEADER,
    PLAYER_ID_HEADER,
};

use crate::infrastructure::ports::{MatchServicePort, RemoteError};

/// Client for the remote match service
#[derive(Clone)]
pub struct HttpMatchServiceClient {
    client: Client,
}

impl HttpMatchServiceClient {
    /// No client-side timeouts. The gateway applies the call budget from the
    /// live configuration, which may grow or shrink at runtime.
    pub fn new() -> Self {
        let client = Client::builder()
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }

    fn authed(&self, builder: RequestBuilder, caller: &PlayerSlot) -> RequestBuilder {
        builder
            .header(PLAYER_ID_HEADER, caller.player_id.as_str())
            .header(DISPLAY_NAME_HEADER, caller.display_name.as_str())
    }
}

impl Default for HttpMatchServiceClient {
    fn default() -> Self {
        Self::new()
    }
}

fn url(endpoint: &str, path: &str) -> String {
    format!("{}{}", endpoint.trim_end_matches('/'), path)
}

async fn send(builder: RequestBuilder) -> Result<Response, RemoteError> {
    let response = builder
        .send()
        .await
        .map_err(|e| RemoteError::Transport(e.to_string()))?;

    if !response.status().is_success() {
        return Err(RemoteError::Status(response.status().as_u16()));
    }
    Ok(response)
}

async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, RemoteError> {
    send(builder)
        .await?
        .json()
        .await
        .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl MatchServicePort for HttpMatchServiceClient {
    async fn join(
        &self,
        endpoint: &str,
        caller: &PlayerSlot,
        game_mode: GameMode,
    ) -> Result<JoinQueueResponse, RemoteError> {
        let request = self
            .authed(self.client.post(url(endpoint, "/queue/join")), caller)
            .json(&JoinQueueRequest { game_mode });
        send_json(request).await
    }

    async fn leave(&self, endpoint: &str, caller: &PlayerSlot) -> Result<(), RemoteError> {
        let request = self.authed(self.client.delete(url(endpoint, "/queue/leave")), caller);
        send(request).await.map(|_| ())
    }

    async fn status(
        &self,
        endpoint: &str,
        caller: &PlayerSlot,
    ) -> Result<QueueStatusResponse, RemoteError> {
        let request = self.authed(self.client.get(url(endpoint, "/queue/status")), caller);
        send_json(request).await
    }

    async fn add_bot(
        &self,
        endpoint: &str,
        caller: &PlayerSlot,
        match_id: SessionId,
    ) -> Result<AddBotResponse, RemoteError> {
        let path = format!("/matches/{}/add-bot", match_id);
        let request = self.authed(self.client.post(url(endpoint, &path)), caller);
        send_json(request).await
    }
}
