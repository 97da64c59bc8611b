use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::AuthService;
use crate::room_manager::RoomManager;
use crate::websocket::connection::{ConnectionId, ConnectionManager};
use wordzy_types::{
    AuthenticatedPayload, ClientMessage, GameError, JoinRoomPayload, Player, ServerMessage,
};

#[derive(Clone)]
pub struct MessageHandler {
    connection_id: ConnectionId,
    connection_manager: Arc<ConnectionManager>,
    room_manager: Arc<RoomManager>,
    auth_service: Arc<AuthService>,
}

impl MessageHandler {
    pub fn new(
        connection_id: ConnectionId,
        connection_manager: Arc<ConnectionManager>,
        room_manager: Arc<RoomManager>,
        auth_service: Arc<AuthService>,
    ) -> Self {
        Self {
            connection_id,
            connection_manager,
            room_manager,
            auth_service,
        }
    }

    /// Handle one client frame. Rejections go back to this client only.
    pub async fn handle_message(&self, message: ClientMessage) -> Result<(), String> {
        self.connection_manager
            .update_activity(self.connection_id)
            .await;

        match self.dispatch(message).await {
            Ok(()) => Ok(()),
            Err(e) => self.reject(e).await,
        }
    }

    async fn dispatch(&self, message: ClientMessage) -> Result<(), GameError> {
        match message {
            ClientMessage::Authenticate(payload) => {
                self.handle_authenticate(payload.token, payload.player_id)
                    .await
            }
            ClientMessage::JoinRoom(payload) => self.handle_join_room(payload).await,
            ClientMessage::StartGame(payload) => {
                let player = self.require_player(&payload.player_id).await?;
                self.room_manager
                    .start(&payload.room_id, &player.player_id)
                    .await
            }
            ClientMessage::SubmitWord(payload) => {
                let player = self.require_player(&payload.player_id).await?;
                self.room_manager
                    .submit_guess(&payload.room_id, &player.player_id, &payload.word)
                    .await
            }
            ClientMessage::StartAgain(payload) => {
                let player = self.require_player(&payload.player_id).await?;
                self.room_manager
                    .restart(&payload.room_id, &player.player_id)
                    .await
            }
            ClientMessage::LeaveRoom(payload) => {
                let player = self.require_player(&payload.player_id).await?;
                self.room_manager
                    .leave(&payload.room_id, &player.player_id)
                    .await
            }
            ClientMessage::DisbandRoom(payload) => {
                let player = self.require_player(&payload.player_id).await?;
                self.room_manager
                    .disband(&payload.room_id, &player.player_id)
                    .await
            }
            // Activity was already recorded.
            ClientMessage::Heartbeat => Ok(()),
        }
    }

    pub async fn handle_disconnect(&self) {
        info!("Handling disconnect for connection {}", self.connection_id);

        // Only the player's live connection leaving counts as a disconnect.
        if let Some(player_id) = self
            .connection_manager
            .remove_connection(self.connection_id)
            .await
        {
            self.room_manager.disconnect(&player_id).await;
        }
    }

    async fn handle_authenticate(
        &self,
        token: String,
        claimed_player_id: Option<String>,
    ) -> Result<(), GameError> {
        info!("Authenticating connection {}", self.connection_id);

        let player = self.auth_service.validate_token(&token).await?;
        if let Some(claimed) = claimed_player_id {
            if claimed != player.player_id {
                return Err(GameError::authentication(
                    "player id does not match token",
                ));
            }
        }

        let binding = self
            .connection_manager
            .authenticate_connection(self.connection_id, player.clone())
            .await
            .map_err(GameError::authentication)?;
        if let Some(previous) = binding.superseded {
            info!(
                "Player {} moved from connection {} to {}",
                player.player_id, previous, self.connection_id
            );
        }
        if let Some(released) = binding.released {
            info!(
                "Connection {} switched from {} to {}",
                self.connection_id, released, player.player_id
            );
            self.room_manager.disconnect(&released).await;
        }

        self.send_message(ServerMessage::Authenticated(AuthenticatedPayload {
            player_id: player.player_id,
            username: player.username,
        }))
        .await
        .map_err(GameError::authentication)
    }

    async fn handle_join_room(&self, payload: JoinRoomPayload) -> Result<(), GameError> {
        let mut player = self.require_player(&payload.player_id).await?;
        if let Some(username) = payload.username.map(|u| u.trim().to_string()) {
            if !username.is_empty() {
                player.username = username;
            }
        }

        self.room_manager
            .join(&payload.room_id, player)
            .await
            .map(|_| ())
    }

    /// The connection's verified identity, which the payload must name.
    async fn require_player(&self, claimed_player_id: &str) -> Result<Player, GameError> {
        let player = self
            .connection_manager
            .get_player(self.connection_id)
            .await
            .ok_or_else(|| GameError::authentication("authenticate first"))?;

        if player.player_id != claimed_player_id {
            return Err(GameError::authentication(
                "player id does not match authenticated identity",
            ));
        }
        Ok(player)
    }

    async fn reject(&self, error: GameError) -> Result<(), String> {
        warn!("Rejected request from {}: {}", self.connection_id, error);
        self.send_error(&error.to_string()).await
    }

    async fn send_message(&self, message: ServerMessage) -> Result<(), String> {
        self.connection_manager
            .send_to_connection(self.connection_id, message)
            .await
    }

    pub async fn send_error(&self, error_message: &str) -> Result<(), String> {
        self.send_message(ServerMessage::error(error_message)).await
    }
}
