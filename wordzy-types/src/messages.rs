use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{GameState, LeaderboardEntry, PlayerId, PlayerStatusView, RoomId, RoomSnapshot};

// Frames look like `{"event": "submit-word", "data": {...}}`, matching the
// event names the browser client listens for.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
#[ts(export)]
pub enum ClientMessage {
    Authenticate(AuthenticatePayload),
    JoinRoom(JoinRoomPayload),
    StartGame(RoomActionPayload),
    SubmitWord(SubmitWordPayload),
    StartAgain(RoomActionPayload),
    LeaveRoom(RoomActionPayload),
    DisbandRoom(RoomActionPayload),
    Heartbeat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AuthenticatePayload {
    pub token: String,
    pub player_id: Option<PlayerId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct JoinRoomPayload {
    pub room_id: RoomId,
    pub player_id: PlayerId,
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RoomActionPayload {
    pub room_id: RoomId,
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SubmitWordPayload {
    pub room_id: RoomId,
    pub player_id: PlayerId,
    pub word: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
#[ts(export)]
pub enum ServerMessage {
    Authenticated(AuthenticatedPayload),
    RoomJoined(RoomPayload),
    PlayerJoined(RoomPayload),
    PlayerLeft(RoomPayload),
    PlayerDisconnected(RoomPayload),
    OwnerChanged(OwnerChangedPayload),
    RoomDisbanded(RoomDisbandedPayload),
    GameStarted(GameStartedPayload),
    /// Private to the submitter.
    WordFeedback(WordFeedbackPayload),
    /// Seen by everyone else; carries no letters.
    PlayerGuess(PlayerEventPayload),
    WordSolved(PlayerEventPayload),
    PlayerFailed(PlayerEventPayload),
    LeaderboardUpdate(LeaderboardUpdatePayload),
    TimerUpdate(TimerUpdatePayload),
    GameEnded(GameEndedPayload),
    Error(ErrorPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AuthenticatedPayload {
    pub player_id: PlayerId,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RoomPayload {
    pub room: RoomSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OwnerChangedPayload {
    pub new_owner_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RoomDisbandedPayload {
    pub room_id: RoomId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GameStartedPayload {
    pub game_state: GameState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WordFeedbackPayload {
    pub word: String,
    /// One code per letter: 2 correct, 1 present, 0 absent.
    pub feedback: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PlayerEventPayload {
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LeaderboardUpdatePayload {
    pub leaderboard: Vec<LeaderboardEntry>,
    pub player_statuses: Vec<PlayerStatusView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TimerUpdatePayload {
    /// Milliseconds left in the round.
    pub time_left: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GameEndedPayload {
    pub leaderboard: Vec<LeaderboardEntry>,
    pub target_word: String,
    pub can_restart: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ErrorPayload {
    pub message: String,
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error(ErrorPayload {
            message: message.into(),
        })
    }

    /// Event name as it appears on the wire.
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMessage::Authenticated(_) => "authenticated",
            ServerMessage::RoomJoined(_) => "room-joined",
            ServerMessage::PlayerJoined(_) => "player-joined",
            ServerMessage::PlayerLeft(_) => "player-left",
            ServerMessage::PlayerDisconnected(_) => "player-disconnected",
            ServerMessage::OwnerChanged(_) => "owner-changed",
            ServerMessage::RoomDisbanded(_) => "room-disbanded",
            ServerMessage::GameStarted(_) => "game-started",
            ServerMessage::WordFeedback(_) => "word-feedback",
            ServerMessage::PlayerGuess(_) => "player-guess",
            ServerMessage::WordSolved(_) => "word-solved",
            ServerMessage::PlayerFailed(_) => "player-failed",
            ServerMessage::LeaderboardUpdate(_) => "leaderboard-update",
            ServerMessage::TimerUpdate(_) => "timer-update",
            ServerMessage::GameEnded(_) => "game-ended",
            ServerMessage::Error(_) => "error",
        }
    }
}
