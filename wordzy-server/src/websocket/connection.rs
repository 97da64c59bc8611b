use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;
use wordzy_types::{Player, PlayerId, ServerMessage};

use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub player: Option<Player>,
    pub connected_at: Instant,
    pub last_activity: Instant,
    pub sender: mpsc::UnboundedSender<ServerMessage>,
}

impl Connection {
    pub fn new(id: ConnectionId) -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let now = Instant::now();

        let connection = Self {
            id,
            player: None,
            connected_at: now,
            last_activity: now,
            sender,
        };

        (connection, receiver)
    }

    pub fn is_authenticated(&self) -> bool {
        self.player.is_some()
    }

    pub fn player_id(&self) -> Option<&PlayerId> {
        self.player.as_ref().map(|p| &p.player_id)
    }

    pub fn update_activity(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn send_message(&self, message: ServerMessage) -> Result<(), String> {
        self.sender
            .send(message)
            .map_err(|_| "Connection closed".to_string())
    }

    pub fn is_inactive(&self, timeout: Duration) -> bool {
        self.last_activity.elapsed() > timeout
    }
}

/// What changed when a connection was (re)authenticated.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Binding {
    /// The player's previous connection, which no longer speaks for them.
    pub superseded: Option<ConnectionId>,
    /// A different player this connection was the live connection for.
    pub released: Option<PlayerId>,
}

/// Live sockets and which player each one speaks for. A player is reachable
/// through at most one connection; the most recent authentication wins.
pub struct ConnectionManager {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
    player_to_connection: RwLock<HashMap<PlayerId, ConnectionId>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            player_to_connection: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create_connection(
        &self,
        id: ConnectionId,
    ) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (conn, receiver) = Connection::new(id);

        {
            let mut connections = self.connections.write().await;
            connections.insert(id, conn);
        }

        receiver
    }

    /// Drop a connection. Returns the player it was the live connection for,
    /// if any; a connection that has been superseded returns `None`.
    pub async fn remove_connection(&self, id: ConnectionId) -> Option<PlayerId> {
        let player_id = {
            let mut connections = self.connections.write().await;
            connections
                .remove(&id)
                .and_then(|conn| conn.player.map(|p| p.player_id))
        }?;

        let mut player_to_connection = self.player_to_connection.write().await;
        if player_to_connection.get(&player_id) == Some(&id) {
            player_to_connection.remove(&player_id);
            Some(player_id)
        } else {
            None
        }
    }

    pub async fn get_connection(&self, id: ConnectionId) -> Option<Connection> {
        let connections = self.connections.read().await;
        connections.get(&id).cloned()
    }

    pub async fn get_player(&self, id: ConnectionId) -> Option<Player> {
        let connections = self.connections.read().await;
        connections.get(&id).and_then(|conn| conn.player.clone())
    }

    pub async fn get_connection_by_player(&self, player_id: &str) -> Option<Connection> {
        let player_to_connection = self.player_to_connection.read().await;
        if let Some(connection_id) = player_to_connection.get(player_id) {
            let connections = self.connections.read().await;
            connections.get(connection_id).cloned()
        } else {
            None
        }
    }

    /// Bind a verified identity to a connection. An older connection bound
    /// to the same player loses the binding, and so does an identity this
    /// connection spoke for before.
    pub async fn authenticate_connection(
        &self,
        id: ConnectionId,
        player: Player,
    ) -> Result<Binding, String> {
        let player_id = player.player_id.clone();

        let old_identity = {
            let mut connections = self.connections.write().await;
            let connection = connections
                .get_mut(&id)
                .ok_or_else(|| "Connection not found".to_string())?;
            connection
                .player
                .replace(player)
                .map(|p| p.player_id)
                .filter(|old| *old != player_id)
        };

        let mut binding = Binding::default();
        {
            let mut player_to_connection = self.player_to_connection.write().await;
            if let Some(old) = old_identity {
                if player_to_connection.get(&old) == Some(&id) {
                    player_to_connection.remove(&old);
                    binding.released = Some(old);
                }
            }
            binding.superseded = player_to_connection
                .insert(player_id.clone(), id)
                .filter(|previous| *previous != id);
        }

        if let Some(superseded) = binding.superseded {
            let mut connections = self.connections.write().await;
            if let Some(connection) = connections.get_mut(&superseded) {
                if connection.player_id() == Some(&player_id) {
                    connection.player = None;
                }
            }
        }

        Ok(binding)
    }

    pub async fn update_activity(&self, id: ConnectionId) {
        let mut connections = self.connections.write().await;
        if let Some(connection) = connections.get_mut(&id) {
            connection.update_activity();
        }
    }

    pub async fn send_to_connection(
        &self,
        id: ConnectionId,
        message: ServerMessage,
    ) -> Result<(), String> {
        let connections = self.connections.read().await;
        if let Some(connection) = connections.get(&id) {
            connection.send_message(message)
        } else {
            Err("Connection not found".to_string())
        }
    }

    pub async fn send_to_player_connection(
        &self,
        player_id: &str,
        message: ServerMessage,
    ) -> Result<(), String> {
        let connection_id = {
            let player_to_connection = self.player_to_connection.read().await;
            player_to_connection.get(player_id).copied()
        };

        if let Some(connection_id) = connection_id {
            self.send_to_connection(connection_id, message).await
        } else {
            Err("Player not connected".to_string())
        }
    }

    /// Drop connections idle for longer than `timeout`. Returns the players
    /// who lost their live connection, so their rooms can be told.
    pub async fn cleanup_inactive_connections(&self, timeout: Duration) -> Vec<PlayerId> {
        let inactive_connections: Vec<ConnectionId> = {
            let connections = self.connections.read().await;
            connections
                .values()
                .filter(|conn| conn.is_inactive(timeout))
                .map(|conn| conn.id)
                .collect()
        };

        let mut dropped_players = Vec::new();
        for connection_id in inactive_connections {
            tracing::info!("Removing inactive connection: {}", connection_id);
            if let Some(player_id) = self.remove_connection(connection_id).await {
                dropped_players.push(player_id);
            }
        }
        dropped_players
    }

    pub async fn connection_count(&self) -> usize {
        let connections = self.connections.read().await;
        connections.len()
    }

    pub async fn player_connection_count(&self) -> usize {
        let player_connections = self.player_to_connection.read().await;
        player_connections.len()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ConnectionManager {
    async fn send_to_player(&self, player_id: &str, message: ServerMessage) -> bool {
        match self.send_to_player_connection(player_id, message).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("Dropping message for {}: {}", player_id, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn player(id: &str) -> Player {
        Player::new(id, id.to_uppercase())
    }

    #[tokio::test]
    async fn test_connection_creation_and_removal() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();

        let _receiver = manager.create_connection(conn_id).await;
        assert_eq!(manager.connection_count().await, 1);

        assert_eq!(manager.remove_connection(conn_id).await, None);
        assert_eq!(manager.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_rapid_connect_disconnect_cycles() {
        let manager = ConnectionManager::new();
        let mut connections = Vec::new();

        for _ in 0..100 {
            let conn_id = ConnectionId::new();
            let _receiver = manager.create_connection(conn_id).await;
            connections.push(conn_id);
        }

        assert_eq!(manager.connection_count().await, 100);

        for conn_id in connections {
            manager.remove_connection(conn_id).await;
        }

        assert_eq!(manager.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_newer_connection_takes_over_player() {
        let manager = ConnectionManager::new();
        let old_conn = ConnectionId::new();
        let new_conn = ConnectionId::new();

        let mut old_rx = manager.create_connection(old_conn).await;
        let mut new_rx = manager.create_connection(new_conn).await;

        let binding = manager
            .authenticate_connection(old_conn, player("alice"))
            .await
            .unwrap();
        assert_eq!(binding, Binding::default());
        let binding = manager
            .authenticate_connection(new_conn, player("alice"))
            .await
            .unwrap();
        assert_eq!(binding.superseded, Some(old_conn));
        assert_eq!(binding.released, None);
        assert_eq!(manager.player_connection_count().await, 1);

        // The old socket can no longer act as alice.
        assert_eq!(manager.get_player(old_conn).await, None);
        assert!(!manager.get_connection(old_conn).await.unwrap().is_authenticated());
        assert_eq!(
            manager.get_player(new_conn).await.map(|p| p.player_id),
            Some("alice".to_string())
        );

        assert!(manager.send_to_player("alice", ServerMessage::error("hi")).await);
        assert!(new_rx.try_recv().is_ok());
        assert!(old_rx.try_recv().is_err());

        // The superseded socket closing does not count as the player leaving.
        assert_eq!(manager.remove_connection(old_conn).await, None);
        assert_eq!(manager.player_connection_count().await, 1);
        assert_eq!(
            manager.remove_connection(new_conn).await,
            Some("alice".to_string())
        );
        assert_eq!(manager.player_connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_reauthenticating_as_another_player_releases_old_identity() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();
        let mut rx = manager.create_connection(conn_id).await;

        manager
            .authenticate_connection(conn_id, player("alice"))
            .await
            .unwrap();
        let binding = manager
            .authenticate_connection(conn_id, player("bob"))
            .await
            .unwrap();
        assert_eq!(binding.released, Some("alice".to_string()));
        assert_eq!(binding.superseded, None);
        assert_eq!(manager.player_connection_count().await, 1);

        // Messages for alice no longer reach this socket.
        assert!(!manager.send_to_player("alice", ServerMessage::error("hi")).await);
        assert!(rx.try_recv().is_err());
        assert!(manager.send_to_player("bob", ServerMessage::error("hi")).await);
        assert!(rx.try_recv().is_ok());

        assert_eq!(
            manager.remove_connection(conn_id).await,
            Some("bob".to_string())
        );
        assert_eq!(manager.player_connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_reauthenticating_same_player_changes_nothing() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();
        let _rx = manager.create_connection(conn_id).await;

        manager
            .authenticate_connection(conn_id, player("alice"))
            .await
            .unwrap();
        let binding = manager
            .authenticate_connection(conn_id, player("alice"))
            .await
            .unwrap();
        assert_eq!(binding, Binding::default());
        assert_eq!(manager.player_connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_activity_tracking_and_timeout() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();

        let _receiver = manager.create_connection(conn_id).await;
        manager
            .authenticate_connection(conn_id, player("bob"))
            .await
            .unwrap();

        let short_timeout = Duration::from_millis(10);
        assert!(manager.cleanup_inactive_connections(short_timeout).await.is_empty());
        assert_eq!(manager.connection_count().await, 1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let dropped = manager.cleanup_inactive_connections(short_timeout).await;
        assert_eq!(dropped, vec!["bob".to_string()]);
        assert_eq!(manager.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_message_sending_to_nonexistent_connection() {
        let manager = ConnectionManager::new();
        let result = manager
            .send_to_connection(ConnectionId::new(), ServerMessage::error("test"))
            .await;

        assert_eq!(result.unwrap_err(), "Connection not found");
        assert!(!manager.send_to_player("ghost", ServerMessage::error("test")).await);
    }

    #[tokio::test]
    async fn test_message_sending_after_connection_close() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();

        let receiver = manager.create_connection(conn_id).await;
        drop(receiver);

        let result = manager
            .send_to_connection(conn_id, ServerMessage::error("test"))
            .await;
        assert_eq!(result.unwrap_err(), "Connection closed");
    }

    #[tokio::test]
    async fn test_concurrent_connection_operations() {
        let manager = std::sync::Arc::new(ConnectionManager::new());
        let mut handles = Vec::new();

        for i in 0..50 {
            let manager_clone = manager.clone();
            let handle = tokio::spawn(async move {
                let conn_id = ConnectionId::new();
                let _receiver = manager_clone.create_connection(conn_id).await;

                tokio::time::sleep(Duration::from_millis(1)).await;

                manager_clone
                    .authenticate_connection(conn_id, player(&format!("player_{}", i)))
                    .await
                    .unwrap();
                manager_clone.remove_connection(conn_id).await;
            });
            handles.push(handle);
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(manager.connection_count().await, 0);
        assert_eq!(manager.player_connection_count().await, 0);
    }
}
