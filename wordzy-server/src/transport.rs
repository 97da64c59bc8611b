use async_trait::async_trait;
use wordzy_core::{Outbound, Transition};
use wordzy_types::{PlayerId, ServerMessage};

/// Delivery seam between the room manager and whatever holds the sockets.
///
/// Sends must not block: implementations queue the message and return.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Queue a message for one player. Returns false if the player has no live
    /// connection; the message is dropped in that case.
    async fn send_to_player(&self, player_id: &str, message: ServerMessage) -> bool;

    async fn send_to_players(&self, player_ids: &[PlayerId], message: ServerMessage) {
        for player_id in player_ids {
            self.send_to_player(player_id, message.clone()).await;
        }
    }
}

/// Deliver a committed transition in order. Room scoped messages go to
/// `members`, the room's membership after the transition.
pub async fn dispatch(transport: &dyn Transport, members: &[PlayerId], transition: &Transition) {
    for outbound in &transition.messages {
        match outbound {
            Outbound::To(player_id, message) => {
                transport.send_to_player(player_id, message.clone()).await;
            }
            Outbound::Room(message) => {
                transport.send_to_players(members, message.clone()).await;
            }
            Outbound::RoomExcept(excluded, message) => {
                for player_id in members.iter().filter(|id| *id != excluded) {
                    transport.send_to_player(player_id, message.clone()).await;
                }
            }
        }
    }
}
