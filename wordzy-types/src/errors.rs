use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::RoomId;

/// Everything a client can do wrong. Reported only to that client as an `error` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, thiserror::Error)]
#[ts(export)]
pub enum GameError {
    #[error("Authentication failed: {reason}")]
    AuthenticationFailure { reason: String },
    #[error("Room {room_id} not found")]
    RoomNotFound { room_id: RoomId },
    #[error("Room {room_id} is full ({capacity} players max)")]
    RoomFull { room_id: RoomId, capacity: u32 },
    #[error("Only the room owner can do that")]
    NotOwner,
    #[error("Invalid guess: {reason}")]
    InvalidGuess { reason: String },
    #[error("A game is already in progress")]
    GameAlreadyActive,
    #[error("Need at least {required} players to start (have {present})")]
    InsufficientPlayers { required: u32, present: u32 },
    #[error("You are not a member of room {room_id}")]
    NotInRoom { room_id: RoomId },
    #[error("Cannot do that while the room is {current}")]
    InvalidRoomState { current: String },
    #[error("Too many messages, slow down")]
    RateLimitExceeded,
}

impl GameError {
    pub fn invalid_guess(reason: impl Into<String>) -> Self {
        GameError::InvalidGuess {
            reason: reason.into(),
        }
    }

    pub fn authentication(reason: impl Into<String>) -> Self {
        GameError::AuthenticationFailure {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_are_human_readable() {
        let err = GameError::RoomFull {
            room_id: "AB3CD".to_string(),
            capacity: 7,
        };
        assert_eq!(err.to_string(), "Room AB3CD is full (7 players max)");

        let err = GameError::InsufficientPlayers {
            required: 2,
            present: 1,
        };
        assert_eq!(
            err.to_string(),
            "Need at least 2 players to start (have 1)"
        );

        assert_eq!(
            GameError::invalid_guess("guess must be 5 letters").to_string(),
            "Invalid guess: guess must be 5 letters"
        );
    }
}
