use wordzy_types::{PlayerId, ServerMessage, SessionId};

/// Who should receive an outbound message. Room scoped targets resolve to the
/// room's members at dispatch time.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    To(PlayerId, ServerMessage),
    Room(ServerMessage),
    RoomExcept(PlayerId, ServerMessage),
}

impl Outbound {
    pub fn message(&self) -> &ServerMessage {
        match self {
            Outbound::To(_, message) | Outbound::Room(message) | Outbound::RoomExcept(_, message) => {
                message
            }
        }
    }
}

/// What the room timer should do after a transition commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerAction {
    #[default]
    None,
    /// Start ticking for this session, replacing any running timer.
    Start(SessionId),
    Cancel,
}

/// Result of applying one command to a room, in commit order.
#[derive(Debug, Clone, Default)]
pub struct Transition {
    pub messages: Vec<Outbound>,
    pub timer: TimerAction,
    /// The room has no reason to exist any more and should be dropped.
    pub disbanded: bool,
}

impl Transition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to(&mut self, player_id: impl Into<PlayerId>, message: ServerMessage) {
        self.messages.push(Outbound::To(player_id.into(), message));
    }

    pub fn room(&mut self, message: ServerMessage) {
        self.messages.push(Outbound::Room(message));
    }

    pub fn room_except(&mut self, player_id: impl Into<PlayerId>, message: ServerMessage) {
        self.messages
            .push(Outbound::RoomExcept(player_id.into(), message));
    }

    /// Wire names of every message, in order. Handy for asserting on sequences.
    pub fn event_names(&self) -> Vec<&'static str> {
        self.messages.iter().map(|m| m.message().event_name()).collect()
    }
}
