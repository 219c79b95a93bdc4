use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::backend::{DeleteHandle, DeleteStatus, RemoteBackend};
use crate::error::CleanerError;
use crate::jobs::WorkItem;
use crate::width::truncate_to_width;

/// A room as listed by the admin API.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Room {
    pub id: String,
    pub name: Option<String>,
    pub canonical_alias: Option<String>,
}

impl Room {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            canonical_alias: None,
        }
    }
}

impl WorkItem for Room {
    fn id(&self) -> &str {
        &self.id
    }

    /// `name (alias)`, the name, the alias, or the room id, in that order.
    fn label(&self, max_width: usize) -> String {
        let name = self.name.as_deref().filter(|n| !n.is_empty());
        let alias = self.canonical_alias.as_deref().filter(|a| !a.is_empty());

        match (name, alias) {
            (Some(name), Some(alias)) => {
                let (name, name_width) = truncate_to_width(name, max_width);
                // " (" and ")" take three columns
                let room_left = max_width.saturating_sub(name_width + 3);
                if room_left == 0 {
                    return name;
                }
                let (alias, _) = truncate_to_width(alias, room_left);
                format!("{} ({})", name, alias)
            }
            (Some(name), None) => truncate_to_width(name, max_width).0,
            (None, Some(alias)) => truncate_to_width(alias, max_width).0,
            (None, None) => truncate_to_width(&self.id, max_width).0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct JoinedRoomsResponse {
    joined_rooms: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RoomsResponse {
    rooms: Vec<RoomsResponseRoom>,
}

#[derive(Debug, Deserialize)]
struct RoomsResponseRoom {
    room_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    canonical_alias: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeleteRoomResponse {
    delete_id: String,
}

#[derive(Debug, Deserialize)]
struct DeleteStatusResponse {
    status: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

/// Synapse admin API client deleting every room a user is not joined to.
pub struct SynapseAdmin {
    client: Client,
    server: Url,
    access_token: String,
    user: String,
}

impl SynapseAdmin {
    pub fn new(
        server: &str,
        access_token: impl Into<String>,
        user: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CleanerError> {
        let server = Url::parse(server)
            .map_err(|e| CleanerError::Transport(format!("invalid server URL {}: {}", server, e)))?;
        if server.cannot_be_a_base() {
            return Err(CleanerError::Transport(format!(
                "invalid server URL {}",
                server
            )));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            server,
            access_token: access_token.into(),
            user: user.into(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, CleanerError> {
        let mut url = self.server.clone();
        url.path_segments_mut()
            .map_err(|_| CleanerError::Transport(format!("invalid server URL {}", self.server)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, CleanerError> {
        let response = request.bearer_auth(&self.access_token).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error)
                .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
            return Err(CleanerError::RemoteRejected {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl RemoteBackend for SynapseAdmin {
    type Item = Room;

    async fn list_all(&self) -> Result<Vec<Room>, CleanerError> {
        let mut url = self.endpoint(&["_synapse", "admin", "v1", "rooms"])?;
        url.set_query(Some("limit=100000"));
        debug!("Fetching all rooms from {}", url);

        let payload: RoomsResponse = self.send_json(self.client.get(url)).await?;
        let rooms: Vec<Room> = payload
            .rooms
            .into_iter()
            .map(|room| Room {
                id: room.room_id,
                name: room.name,
                canonical_alias: room.canonical_alias,
            })
            .collect();

        info!("The server has {} rooms", rooms.len());
        Ok(rooms)
    }

    async fn list_keep(&self) -> Result<Vec<String>, CleanerError> {
        let url = self.endpoint(&["_synapse", "admin", "v1", "users", &self.user, "joined_rooms"])?;
        debug!("Fetching rooms joined by {}", self.user);

        let payload: JoinedRoomsResponse = self.send_json(self.client.get(url)).await?;
        info!("{} belongs to {} rooms", self.user, payload.joined_rooms.len());
        Ok(payload.joined_rooms)
    }

    async fn submit_delete(&self, room: &Room) -> Result<DeleteHandle, CleanerError> {
        let url = self.endpoint(&["_synapse", "admin", "v2", "rooms", &room.id])?;
        let request = self
            .client
            .delete(url)
            .json(&serde_json::json!({ "purge": true }));

        let payload: DeleteRoomResponse = self.send_json(request).await?;
        Ok(DeleteHandle(payload.delete_id))
    }

    async fn poll_status(&self, handle: &DeleteHandle) -> Result<DeleteStatus, CleanerError> {
        let url = self.endpoint(&["_synapse", "admin", "v2", "rooms", "delete_status", &handle.0])?;

        let payload: DeleteStatusResponse = self.send_json(self.client.get(url)).await?;
        Ok(match payload.status.as_str() {
            "complete" => DeleteStatus::Complete,
            "failed" => DeleteStatus::Failed {
                reason: payload.error.unwrap_or_default(),
            },
            _ => DeleteStatus::Pending,
        })
    }

    fn noun(&self) -> &'static str {
        "rooms"
    }

    fn completion_hint(&self) -> Option<&'static str> {
        Some(
            "If you are using PostgreSQL you probably want to run `vacuum full` \
             on the Synapse database to return the free space to the OS.",
        )
    }
}
