use chrono::{DateTime, Utc};
use uuid::Uuid;
use wordzy_types::{
    GameError, GameState, LeaderboardEntry, LetterStatus, MAX_GUESSES, Player, PlayerId,
    PlayerStatusView, RoomId, SessionId, WORD_LENGTH,
};

use crate::{FeedbackEvaluator, GuessOutcome, PlayerSession, ranking};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Ended,
}

/// One round of play. The target word never leaves this struct except in
/// the `game-ended` payload.
#[derive(Debug, Clone)]
pub struct GameSession {
    pub id: SessionId,
    pub room_id: RoomId,
    pub time_limit_ms: u64,
    pub started_at: DateTime<Utc>,
    pub status: SessionStatus,
    target_word: String,
    players: Vec<PlayerSession>,
    next_fail_order: u64,
}

impl GameSession {
    /// `players` must already be in join order.
    pub fn new(
        room_id: RoomId,
        target_word: String,
        players: Vec<Player>,
        time_limit_ms: u64,
        started_at: DateTime<Utc>,
    ) -> Self {
        let players = players
            .into_iter()
            .enumerate()
            .map(|(index, player)| PlayerSession::new(player, index))
            .collect();

        Self {
            id: Uuid::new_v4(),
            room_id,
            time_limit_ms,
            started_at,
            status: SessionStatus::Active,
            target_word: target_word.to_ascii_uppercase(),
            players,
            next_fail_order: 0,
        }
    }

    pub fn target_word(&self) -> &str {
        &self.target_word
    }

    pub fn players(&self) -> &[PlayerSession] {
        &self.players
    }

    pub fn player(&self, player_id: &str) -> Option<&PlayerSession> {
        self.players.iter().find(|p| p.player_id() == player_id)
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        (now - self.started_at).num_milliseconds().max(0) as u64
    }

    pub fn remaining_ms(&self, now: DateTime<Utc>) -> u64 {
        self.time_limit_ms.saturating_sub(self.elapsed_ms(now))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.remaining_ms(now) == 0
    }

    /// True once nobody is still guessing.
    pub fn all_finished(&self) -> bool {
        self.players.iter().all(|p| !p.is_active())
    }

    /// Evaluate and record a normalized guess for one player.
    pub fn submit_guess(
        &mut self,
        player_id: &str,
        word: String,
        now: DateTime<Utc>,
    ) -> Result<(Vec<LetterStatus>, GuessOutcome), GameError> {
        if !self.is_active() {
            return Err(GameError::invalid_guess("the round is over"));
        }
        let elapsed_ms = self.elapsed_ms(now);
        let fail_order = self.next_fail_order;
        let feedback = FeedbackEvaluator::evaluate(&word, &self.target_word);

        let player = self
            .players
            .iter_mut()
            .find(|p| p.player_id() == player_id)
            .ok_or_else(|| GameError::invalid_guess("you are not playing this round"))?;

        let outcome = player.record_guess(word, feedback.clone(), elapsed_ms, fail_order)?;
        if outcome == GuessOutcome::Failed {
            self.next_fail_order += 1;
        }

        Ok((feedback, outcome))
    }

    /// Close the round. Everyone still guessing fails together. Returns the
    /// ids of the players that were forced out.
    pub fn finish(&mut self, now: DateTime<Utc>) -> Vec<PlayerId> {
        let elapsed_ms = self.elapsed_ms(now).min(self.time_limit_ms);
        let order = self.next_fail_order;

        let forced: Vec<PlayerId> = self
            .players
            .iter_mut()
            .filter_map(|p| {
                p.force_fail(elapsed_ms, order)
                    .then(|| p.player_id().clone())
            })
            .collect();

        if !forced.is_empty() {
            self.next_fail_order += 1;
        }
        self.status = SessionStatus::Ended;
        forced
    }

    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        ranking::rank_players(&self.players)
    }

    pub fn player_statuses(&self) -> Vec<PlayerStatusView> {
        ranking::player_statuses(&self.players)
    }

    pub fn to_game_state(&self) -> GameState {
        GameState {
            session_id: self.id,
            room_id: self.room_id.clone(),
            players: self.players.iter().map(|p| p.player().clone()).collect(),
            time_limit: self.time_limit_ms,
            word_length: WORD_LENGTH as u32,
            max_guesses: MAX_GUESSES as u32,
            started_at: self.started_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use wordzy_types::PlayerStatusKind;

    fn session(start: DateTime<Utc>) -> GameSession {
        GameSession::new(
            "ROOM1".to_string(),
            "crane".to_string(),
            vec![Player::new("p1", "Alice"), Player::new("p2", "Bob")],
            60_000,
            start,
        )
    }

    #[test]
    fn test_new_session_is_active_with_players_in_order() {
        let start = Utc::now();
        let session = session(start);

        assert!(session.is_active());
        assert_eq!(session.target_word(), "CRANE");
        assert_eq!(session.players()[0].player_id(), "p1");
        assert_eq!(session.players()[1].join_index(), 1);

        let state = session.to_game_state();
        assert_eq!(state.session_id, session.id);
        assert_eq!(state.time_limit, 60_000);
        assert_eq!(state.word_length, 5);
        assert_eq!(state.max_guesses, 6);
    }

    #[test]
    fn test_remaining_time_never_negative() {
        let start = Utc::now();
        let session = session(start);

        assert_eq!(session.remaining_ms(start + Duration::seconds(15)), 45_000);
        assert_eq!(session.remaining_ms(start + Duration::seconds(90)), 0);
        assert!(session.is_expired(start + Duration::seconds(60)));
        assert_eq!(session.elapsed_ms(start - Duration::seconds(1)), 0);
    }

    #[test]
    fn test_guess_solves_with_elapsed_time() {
        let start = Utc::now();
        let mut session = session(start);

        let (feedback, outcome) = session
            .submit_guess("p1", "CRANE".to_string(), start + Duration::milliseconds(7_250))
            .unwrap();
        assert_eq!(outcome, GuessOutcome::Solved);
        assert!(FeedbackEvaluator::is_solved(&feedback));
        assert!(!session.all_finished());

        let leaderboard = session.leaderboard();
        assert_eq!(leaderboard[0].player_id, "p1");
        assert_eq!(leaderboard[0].solve_time_ms, Some(7_250));
        assert_eq!(leaderboard[0].time_formatted.as_deref(), Some("0:07"));
    }

    #[test]
    fn test_unknown_player_cannot_guess() {
        let mut session = session(Utc::now());
        let err = session
            .submit_guess("p9", "CRANE".to_string(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, GameError::InvalidGuess { .. }));
    }

    #[test]
    fn test_finish_fails_remaining_players_together() {
        let start = Utc::now();
        let mut session = session(start);

        let forced = session.finish(start + Duration::seconds(120));
        assert_eq!(forced, vec!["p1".to_string(), "p2".to_string()]);
        assert!(!session.is_active());
        assert!(session.all_finished());

        let leaderboard = session.leaderboard();
        assert!(leaderboard
            .iter()
            .all(|entry| entry.status == PlayerStatusKind::Failed));
        // Forced failures are capped at the time limit.
        assert_eq!(leaderboard[0].time_formatted.as_deref(), Some("1:00"));

        let err = session
            .submit_guess("p1", "CRANE".to_string(), start)
            .unwrap_err();
        assert!(matches!(err, GameError::InvalidGuess { .. }));
    }
}
