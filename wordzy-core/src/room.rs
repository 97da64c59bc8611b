use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, RngCore};
use wordzy_types::*;

use crate::{
    FeedbackEvaluator, GameSession, GuessOutcome, TimerAction, Transition, WordList,
    normalize_guess,
};

// No I, O, 0 or 1 so codes survive being read aloud.
const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub fn generate_room_code<R: Rng + ?Sized>(rng: &mut R) -> RoomId {
    (0..ROOM_CODE_LENGTH)
        .map(|_| ROOM_CODE_ALPHABET[rng.random_range(0..ROOM_CODE_ALPHABET.len())] as char)
        .collect()
}

pub fn is_valid_room_code(code: &str) -> bool {
    code.len() == ROOM_CODE_LENGTH && code.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b))
}

#[derive(Debug, Clone)]
pub struct RoomSettings {
    pub capacity: usize,
    pub min_players: usize,
    pub time_limit_ms: u64,
    /// How many past targets a room avoids repeating.
    pub recent_window: usize,
    pub require_dictionary: bool,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_ROOM_CAPACITY,
            min_players: MIN_PLAYERS_TO_START,
            time_limit_ms: 300_000,
            recent_window: 10,
            require_dictionary: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveReason {
    Left,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoomCommand {
    Join { player: Player },
    Leave { player_id: PlayerId, reason: LeaveReason },
    Start { player_id: PlayerId },
    Restart { player_id: PlayerId },
    SubmitGuess { player_id: PlayerId, word: String },
    Tick { session_id: SessionId },
    /// `None` when the server tears the room down on its own (idle sweep).
    Disband { requested_by: Option<PlayerId> },
}

/// Everything a transition needs from outside the room.
pub struct RoundEnv<'a> {
    pub now: DateTime<Utc>,
    pub words: &'a WordList,
    pub rng: &'a mut dyn RngCore,
}

/// A room and its current round. All mutation goes through [`Room::apply`].
#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    owner_id: Option<PlayerId>,
    members: Vec<Player>, // join order
    status: RoomStatus,
    settings: RoomSettings,
    session: Option<GameSession>,
    recent_words: VecDeque<String>,
    pub created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

impl Room {
    /// The creator is the first member and the owner.
    pub fn new(id: RoomId, owner: Player, settings: RoomSettings, now: DateTime<Utc>) -> Self {
        Self {
            id,
            owner_id: Some(owner.player_id.clone()),
            members: vec![owner],
            status: RoomStatus::Waiting,
            settings,
            session: None,
            recent_words: VecDeque::new(),
            created_at: now,
            last_activity: now,
        }
    }

    pub fn owner_id(&self) -> Option<&PlayerId> {
        self.owner_id.as_ref()
    }

    pub fn members(&self) -> &[Player] {
        &self.members
    }

    pub fn member_ids(&self) -> Vec<PlayerId> {
        self.members.iter().map(|p| p.player_id.clone()).collect()
    }

    pub fn is_member(&self, player_id: &str) -> bool {
        self.members.iter().any(|p| p.player_id == player_id)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn settings(&self) -> &RoomSettings {
        &self.settings
    }

    pub fn session(&self) -> Option<&GameSession> {
        self.session.as_ref()
    }

    /// Id of the round currently being played, if any.
    pub fn active_session_id(&self) -> Option<SessionId> {
        self.session
            .as_ref()
            .filter(|s| s.is_active() && self.status == RoomStatus::Active)
            .map(|s| s.id)
    }

    pub fn recent_words(&self) -> &VecDeque<String> {
        &self.recent_words
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn is_idle(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        now - self.last_activity > timeout
    }

    pub fn can_restart(&self) -> bool {
        self.owner_id
            .as_deref()
            .is_some_and(|owner| self.is_member(owner))
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            id: self.id.clone(),
            owner: self.owner_id.clone(),
            players: self.members.clone(),
            status: self.status,
            capacity: self.settings.capacity as u32,
        }
    }

    /// Run one command against the room. On error nothing has changed.
    pub fn apply(
        &mut self,
        command: RoomCommand,
        env: &mut RoundEnv<'_>,
    ) -> Result<Transition, GameError> {
        let now = env.now;
        let counts_as_activity = !matches!(command, RoomCommand::Tick { .. });

        let transition = match command {
            RoomCommand::Join { player } => self.join(player),
            RoomCommand::Leave { player_id, reason } => self.leave(&player_id, reason, now),
            RoomCommand::Start { player_id } => self.start(&player_id, env),
            RoomCommand::Restart { player_id } => self.restart(&player_id, env),
            RoomCommand::SubmitGuess { player_id, word } => self.submit_guess(&player_id, &word, env),
            RoomCommand::Tick { session_id } => Ok(self.tick(session_id, now)),
            RoomCommand::Disband { requested_by } => self.disband(requested_by.as_deref(), now),
        }?;

        if counts_as_activity {
            self.last_activity = now;
        }
        Ok(transition)
    }

    fn require_member(&self, player_id: &str) -> Result<(), GameError> {
        if self.is_member(player_id) {
            Ok(())
        } else {
            Err(GameError::NotInRoom {
                room_id: self.id.clone(),
            })
        }
    }

    fn require_owner(&self, player_id: &str) -> Result<(), GameError> {
        self.require_member(player_id)?;
        if self.owner_id.as_deref() == Some(player_id) {
            Ok(())
        } else {
            Err(GameError::NotOwner)
        }
    }

    fn leaderboard_update(session: &GameSession) -> ServerMessage {
        ServerMessage::LeaderboardUpdate(LeaderboardUpdatePayload {
            leaderboard: session.leaderboard(),
            player_statuses: session.player_statuses(),
        })
    }

    fn join(&mut self, player: Player) -> Result<Transition, GameError> {
        let mut transition = Transition::new();
        let player_id = player.player_id.clone();

        if !self.is_member(&player_id) {
            if self.members.len() >= self.settings.capacity {
                return Err(GameError::RoomFull {
                    room_id: self.id.clone(),
                    capacity: self.settings.capacity as u32,
                });
            }
            self.members.push(player);
            tracing::info!("Player {} joined room {}", player_id, self.id);

            let room = self.snapshot();
            transition.to(
                player_id.clone(),
                ServerMessage::RoomJoined(RoomPayload { room: room.clone() }),
            );
            transition.room_except(player_id.clone(), ServerMessage::PlayerJoined(RoomPayload { room }));
        } else {
            transition.to(
                player_id.clone(),
                ServerMessage::RoomJoined(RoomPayload {
                    room: self.snapshot(),
                }),
            );
        }

        // Bring a returning player back to where they were.
        if let Some(session) = self.session.as_ref().filter(|s| s.is_active()) {
            if let Some(state) = session.player(&player_id) {
                transition.to(
                    player_id.clone(),
                    ServerMessage::GameStarted(GameStartedPayload {
                        game_state: session.to_game_state(),
                    }),
                );
                for (word, feedback) in state.guesses().iter().zip(state.feedbacks()) {
                    transition.to(
                        player_id.clone(),
                        ServerMessage::WordFeedback(WordFeedbackPayload {
                            word: word.clone(),
                            feedback: FeedbackEvaluator::codes(feedback),
                        }),
                    );
                }
            }
            transition.to(player_id, Self::leaderboard_update(session));
        }

        Ok(transition)
    }

    fn leave(
        &mut self,
        player_id: &str,
        reason: LeaveReason,
        now: DateTime<Utc>,
    ) -> Result<Transition, GameError> {
        self.require_member(player_id)?;
        let mut transition = Transition::new();

        self.members.retain(|p| p.player_id != player_id);
        tracing::info!("Player {} left room {} ({:?})", player_id, self.id, reason);

        if self.members.is_empty() {
            self.owner_id = None;
            self.close_session(now);
            transition.timer = TimerAction::Cancel;
            transition.disbanded = true;
            return Ok(transition);
        }

        let new_owner = if self.owner_id.as_deref() == Some(player_id) {
            let next = self.members[0].player_id.clone();
            self.owner_id = Some(next.clone());
            Some(next)
        } else {
            None
        };

        let room = self.snapshot();
        transition.room(match reason {
            LeaveReason::Left => ServerMessage::PlayerLeft(RoomPayload { room }),
            LeaveReason::Disconnected => ServerMessage::PlayerDisconnected(RoomPayload { room }),
        });
        if let Some(new_owner_id) = new_owner {
            tracing::info!("Room {} ownership passed to {}", self.id, new_owner_id);
            transition.room(ServerMessage::OwnerChanged(OwnerChangedPayload { new_owner_id }));
        }

        Ok(transition)
    }

    fn start(&mut self, player_id: &str, env: &mut RoundEnv<'_>) -> Result<Transition, GameError> {
        self.require_owner(player_id)?;
        match self.status {
            RoomStatus::Waiting => self.begin_round(env),
            RoomStatus::Active => Err(GameError::GameAlreadyActive),
            RoomStatus::Finished => Err(GameError::InvalidRoomState {
                current: "finished".to_string(),
            }),
        }
    }

    fn restart(&mut self, player_id: &str, env: &mut RoundEnv<'_>) -> Result<Transition, GameError> {
        self.require_owner(player_id)?;
        match self.status {
            RoomStatus::Finished => self.begin_round(env),
            RoomStatus::Active => Err(GameError::GameAlreadyActive),
            RoomStatus::Waiting => Err(GameError::InvalidRoomState {
                current: "waiting".to_string(),
            }),
        }
    }

    fn begin_round(&mut self, env: &mut RoundEnv<'_>) -> Result<Transition, GameError> {
        if self.members.len() < self.settings.min_players {
            return Err(GameError::InsufficientPlayers {
                required: self.settings.min_players as u32,
                present: self.members.len() as u32,
            });
        }

        let Some(target) = env.words.pick_target(&mut *env.rng, &self.recent_words) else {
            tracing::error!("Room {} cannot start: word list is empty", self.id);
            return Err(GameError::InvalidRoomState {
                current: "without words".to_string(),
            });
        };

        self.recent_words.push_back(target.clone());
        while self.recent_words.len() > self.settings.recent_window {
            self.recent_words.pop_front();
        }

        let session = GameSession::new(
            self.id.clone(),
            target,
            self.members.clone(),
            self.settings.time_limit_ms,
            env.now,
        );
        let session_id = session.id;
        tracing::info!(
            "Room {} started round {} with {} players",
            self.id,
            session_id,
            self.members.len()
        );

        let mut transition = Transition::new();
        transition.room(ServerMessage::GameStarted(GameStartedPayload {
            game_state: session.to_game_state(),
        }));
        transition.room(Self::leaderboard_update(&session));
        transition.timer = TimerAction::Start(session_id);

        self.session = Some(session);
        self.status = RoomStatus::Active;
        Ok(transition)
    }

    fn submit_guess(
        &mut self,
        player_id: &str,
        word: &str,
        env: &mut RoundEnv<'_>,
    ) -> Result<Transition, GameError> {
        self.require_member(player_id)?;
        if self.status != RoomStatus::Active {
            return Err(GameError::invalid_guess("no round in progress"));
        }
        let word = normalize_guess(word)?;
        if self.settings.require_dictionary && !env.words.contains(&word) {
            return Err(GameError::invalid_guess(format!("{} is not in the word list", word)));
        }

        let session = self
            .session
            .as_mut()
            .ok_or_else(|| GameError::invalid_guess("no round in progress"))?;
        let (feedback, outcome) = session.submit_guess(player_id, word.clone(), env.now)?;

        let mut transition = Transition::new();
        transition.to(
            player_id,
            ServerMessage::WordFeedback(WordFeedbackPayload {
                word,
                feedback: FeedbackEvaluator::codes(&feedback),
            }),
        );
        let event = PlayerEventPayload {
            player_id: player_id.to_string(),
        };
        transition.room_except(player_id, ServerMessage::PlayerGuess(event.clone()));
        match outcome {
            GuessOutcome::Solved => transition.room(ServerMessage::WordSolved(event)),
            GuessOutcome::Failed => transition.room(ServerMessage::PlayerFailed(event)),
            GuessOutcome::Continue => {}
        }
        transition.room(Self::leaderboard_update(session));

        if session.all_finished() {
            self.end_round(&mut transition, env.now);
        }
        Ok(transition)
    }

    fn tick(&mut self, session_id: SessionId, now: DateTime<Utc>) -> Transition {
        let mut transition = Transition::new();
        if self.active_session_id() != Some(session_id) {
            tracing::debug!("Room {} ignoring stale tick for {}", self.id, session_id);
            return transition;
        }
        let Some(session) = self.session.as_ref() else {
            return transition;
        };

        let time_left = session.remaining_ms(now);
        transition.room(ServerMessage::TimerUpdate(TimerUpdatePayload { time_left }));
        if time_left == 0 {
            self.end_round(&mut transition, now);
        }
        transition
    }

    fn end_round(&mut self, transition: &mut Transition, now: DateTime<Utc>) {
        let can_restart = self.can_restart();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let forced = session.finish(now);
        tracing::info!(
            "Room {} round {} ended ({} still guessing were failed)",
            self.id,
            session.id,
            forced.len()
        );

        transition.room(ServerMessage::GameEnded(GameEndedPayload {
            leaderboard: session.leaderboard(),
            target_word: session.target_word().to_string(),
            can_restart,
        }));
        transition.timer = TimerAction::Cancel;
        self.status = RoomStatus::Finished;
    }

    fn disband(
        &mut self,
        requested_by: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Transition, GameError> {
        if let Some(player_id) = requested_by {
            self.require_owner(player_id)?;
        }
        tracing::info!("Room {} disbanded", self.id);

        let mut transition = Transition::new();
        transition.room(ServerMessage::RoomDisbanded(RoomDisbandedPayload {
            room_id: self.id.clone(),
        }));
        transition.timer = TimerAction::Cancel;
        transition.disbanded = true;
        self.close_session(now);
        Ok(transition)
    }

    fn close_session(&mut self, now: DateTime<Utc>) {
        if let Some(session) = self.session.as_mut() {
            if session.is_active() {
                session.finish(now);
            }
        }
        self.status = RoomStatus::Finished;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn room_with(players: &[&str]) -> Room {
        let mut room = Room::new(
            "ABCDE".to_string(),
            Player::new(players[0], players[0]),
            RoomSettings::default(),
            Utc::now(),
        );
        for id in &players[1..] {
            room.members.push(Player::new(*id, *id));
        }
        room
    }

    #[test]
    fn test_room_codes_use_safe_alphabet() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let code = generate_room_code(&mut rng);
            assert_eq!(code.len(), ROOM_CODE_LENGTH);
            assert!(is_valid_room_code(&code), "{code}");
            assert!(!code.contains(['O', '0', 'I', '1']));
        }
        assert!(!is_valid_room_code("abcde"));
        assert!(!is_valid_room_code("ABCD"));
    }

    #[test]
    fn test_creator_is_owner_and_member() {
        let room = room_with(&["alice"]);
        assert_eq!(room.owner_id().map(String::as_str), Some("alice"));
        assert!(room.is_member("alice"));
        assert_eq!(room.status(), RoomStatus::Waiting);
        assert!(room.can_restart());

        let snapshot = room.snapshot();
        assert_eq!(snapshot.capacity, 7);
        assert_eq!(snapshot.players.len(), 1);
    }

    #[test]
    fn test_join_sends_room_joined_and_player_joined() {
        let mut room = room_with(&["alice"]);
        let words = WordList::from_word_list("CRANE");
        let mut rng = StdRng::seed_from_u64(1);
        let mut env = RoundEnv {
            now: Utc::now(),
            words: &words,
            rng: &mut rng,
        };

        let transition = room
            .apply(
                RoomCommand::Join {
                    player: Player::new("bob", "Bob"),
                },
                &mut env,
            )
            .unwrap();
        assert_eq!(transition.event_names(), vec!["room-joined", "player-joined"]);

        // Joining twice changes nothing.
        let again = room
            .apply(
                RoomCommand::Join {
                    player: Player::new("bob", "Bob"),
                },
                &mut env,
            )
            .unwrap();
        assert_eq!(again.event_names(), vec!["room-joined"]);
        assert_eq!(room.members().len(), 2);
    }

    #[test]
    fn test_non_owner_cannot_start_or_disband() {
        let mut room = room_with(&["alice", "bob"]);
        let words = WordList::from_word_list("CRANE");
        let mut rng = StdRng::seed_from_u64(1);
        let mut env = RoundEnv {
            now: Utc::now(),
            words: &words,
            rng: &mut rng,
        };

        let err = room
            .apply(
                RoomCommand::Start {
                    player_id: "bob".into(),
                },
                &mut env,
            )
            .unwrap_err();
        assert_eq!(err, GameError::NotOwner);

        let err = room
            .apply(
                RoomCommand::Disband {
                    requested_by: Some("bob".into()),
                },
                &mut env,
            )
            .unwrap_err();
        assert_eq!(err, GameError::NotOwner);

        let err = room
            .apply(
                RoomCommand::Start {
                    player_id: "mallory".into(),
                },
                &mut env,
            )
            .unwrap_err();
        assert!(matches!(err, GameError::NotInRoom { .. }));
    }

    #[test]
    fn test_rejected_command_does_not_count_as_activity() {
        let created = Utc::now();
        let mut room = Room::new(
            "ABCDE".into(),
            Player::new("alice", "Alice"),
            RoomSettings::default(),
            created,
        );
        let words = WordList::from_word_list("CRANE");
        let mut rng = StdRng::seed_from_u64(1);
        let mut env = RoundEnv {
            now: created + Duration::minutes(10),
            words: &words,
            rng: &mut rng,
        };

        let err = room
            .apply(
                RoomCommand::Start {
                    player_id: "alice".into(),
                },
                &mut env,
            )
            .unwrap_err();
        assert!(matches!(err, GameError::InsufficientPlayers { .. }));
        assert_eq!(room.last_activity(), created);

        room.apply(
            RoomCommand::Join {
                player: Player::new("bob", "Bob"),
            },
            &mut env,
        )
        .unwrap();
        assert_eq!(room.last_activity(), created + Duration::minutes(10));
    }

    #[test]
    fn test_recent_words_window_is_bounded() {
        let mut settings = RoomSettings::default();
        settings.recent_window = 2;
        let mut room = Room::new("ABCDE".into(), Player::new("a", "A"), settings, Utc::now());
        room.members.push(Player::new("b", "B"));

        let words = WordList::from_word_list("CRANE\nSLATE\nTRAIN");
        let mut rng = StdRng::seed_from_u64(3);
        let mut env = RoundEnv {
            now: Utc::now(),
            words: &words,
            rng: &mut rng,
        };

        room.apply(RoomCommand::Start { player_id: "a".into() }, &mut env)
            .unwrap();
        for _ in 0..4 {
            let session_id = room.active_session_id().unwrap();
            env.now += Duration::seconds(301);
            room.apply(RoomCommand::Tick { session_id }, &mut env).unwrap();
            room.apply(RoomCommand::Restart { player_id: "a".into() }, &mut env)
                .unwrap();

            let recent = room.recent_words();
            assert!(recent.len() <= 2);
            if recent.len() == 2 {
                assert_ne!(recent[0], recent[1]);
            }
        }
    }
}
