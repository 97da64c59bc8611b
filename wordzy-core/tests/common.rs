#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use wordzy_core::{Outbound, Room, RoomCommand, RoomSettings, RoundEnv, Transition, WordList};
use wordzy_types::{GameError, LeaderboardEntry, Player, ServerMessage, SessionId};

/// Single-word list so every round's target is known up front.
pub const TARGET: &str = "CRANE";

pub fn create_test_player(id: &str) -> Player {
    Player::new(id, format!("{}-name", id))
}

/// A room plus the clock, words and rng its transitions run against.
pub struct TestRoom {
    pub room: Room,
    pub words: WordList,
    pub rng: StdRng,
    pub now: DateTime<Utc>,
}

impl TestRoom {
    /// Room owned by the first id, with the rest joined in order.
    pub fn with_players(ids: &[&str]) -> Self {
        Self::with_settings(ids, RoomSettings::default())
    }

    pub fn with_settings(ids: &[&str], settings: RoomSettings) -> Self {
        let now = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let room = Room::new(
            "TEST2".to_string(),
            create_test_player(ids[0]),
            settings,
            now,
        );
        let mut test_room = Self {
            room,
            words: WordList::from_word_list(TARGET),
            rng: StdRng::seed_from_u64(99),
            now,
        };
        for id in &ids[1..] {
            test_room.join(id).unwrap();
        }
        test_room
    }

    pub fn apply(&mut self, command: RoomCommand) -> Result<Transition, GameError> {
        let mut env = RoundEnv {
            now: self.now,
            words: &self.words,
            rng: &mut self.rng,
        };
        self.room.apply(command, &mut env)
    }

    pub fn advance_ms(&mut self, ms: i64) {
        self.now += Duration::milliseconds(ms);
    }

    pub fn join(&mut self, id: &str) -> Result<Transition, GameError> {
        self.apply(RoomCommand::Join {
            player: create_test_player(id),
        })
    }

    pub fn start(&mut self, id: &str) -> Result<Transition, GameError> {
        self.apply(RoomCommand::Start {
            player_id: id.to_string(),
        })
    }

    pub fn restart(&mut self, id: &str) -> Result<Transition, GameError> {
        self.apply(RoomCommand::Restart {
            player_id: id.to_string(),
        })
    }

    pub fn guess(&mut self, id: &str, word: &str) -> Result<Transition, GameError> {
        self.apply(RoomCommand::SubmitGuess {
            player_id: id.to_string(),
            word: word.to_string(),
        })
    }

    pub fn tick(&mut self, session_id: SessionId) -> Transition {
        self.apply(RoomCommand::Tick { session_id })
            .expect("ticks never fail")
    }

    pub fn session_id(&self) -> SessionId {
        self.room
            .active_session_id()
            .expect("room should have an active round")
    }
}

/// Submit `misses` wrong guesses then the target.
pub fn solve_in(room: &mut TestRoom, id: &str, misses: usize) -> Transition {
    for _ in 0..misses {
        room.guess(id, "SLATE").unwrap();
    }
    room.guess(id, TARGET).unwrap()
}

pub fn find_game_ended(transition: &Transition) -> Option<(Vec<LeaderboardEntry>, String, bool)> {
    transition.messages.iter().find_map(|outbound| match outbound.message() {
        ServerMessage::GameEnded(payload) => Some((
            payload.leaderboard.clone(),
            payload.target_word.clone(),
            payload.can_restart,
        )),
        _ => None,
    })
}

/// Messages addressed to exactly this player.
pub fn messages_to<'a>(transition: &'a Transition, id: &str) -> Vec<&'a ServerMessage> {
    transition
        .messages
        .iter()
        .filter_map(|outbound| match outbound {
            Outbound::To(target, message) if target == id => Some(message),
            _ => None,
        })
        .collect()
}
