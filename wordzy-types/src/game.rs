use crate::{PlayerId, RoomId, SessionId};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::user::Player;

pub const WORD_LENGTH: usize = 5;
pub const MAX_GUESSES: usize = 6;
pub const ROOM_CODE_LENGTH: usize = 5;

/// Authoritative room capacity. The lobby footer's "10 players" is not enforced anywhere.
pub const DEFAULT_ROOM_CAPACITY: usize = 7;
pub const MIN_PLAYERS_TO_START: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum LetterStatus {
    Correct, // right letter, right position
    Present, // right letter, wrong position
    Absent,
}

impl LetterStatus {
    /// Numeric code used on the wire: 2 correct, 1 present, 0 absent.
    pub fn code(self) -> u8 {
        match self {
            LetterStatus::Correct => 2,
            LetterStatus::Present => 1,
            LetterStatus::Absent => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum RoomStatus {
    Waiting,
    Active,
    Finished,
}

/// Wire view of a player's round outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PlayerStatusKind {
    Active,
    Solved,
    Failed,
}

/// Room snapshot sent with membership events and by `GET /rooms/:id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub owner: Option<PlayerId>,
    pub players: Vec<Player>,
    pub status: RoomStatus,
    pub capacity: u32,
}

/// Round description broadcast with `game-started`. Never carries the target word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GameState {
    pub session_id: SessionId,
    pub room_id: RoomId,
    pub players: Vec<Player>,
    /// Milliseconds.
    pub time_limit: u64,
    pub word_length: u32,
    pub max_guesses: u32,
    pub started_at: String, // RFC 3339
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub player_id: PlayerId,
    pub username: String,
    pub status: PlayerStatusKind,
    pub is_solved: bool,
    pub solve_attempts: Option<u32>,
    pub solve_time_ms: Option<u64>,
    /// `m:ss` of the solve time, or of the moment the player failed.
    pub time_formatted: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PlayerStatusView {
    pub player_id: PlayerId,
    pub username: String,
    pub status: PlayerStatusKind,
    pub guesses: u32,
    pub is_solved: bool,
    pub solve_attempts: Option<u32>,
    pub time_formatted: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_codes() {
        assert_eq!(LetterStatus::Correct.code(), 2);
        assert_eq!(LetterStatus::Present.code(), 1);
        assert_eq!(LetterStatus::Absent.code(), 0);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&RoomStatus::Finished).unwrap(),
            "\"finished\""
        );
        assert_eq!(
            serde_json::to_string(&PlayerStatusKind::Solved).unwrap(),
            "\"solved\""
        );
    }
}
