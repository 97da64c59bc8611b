use wordzy_types::{GameError, LetterStatus, MAX_GUESSES, Player, PlayerId, PlayerStatusKind};

use crate::FeedbackEvaluator;

/// Where a player stands in the current round. Only `Active` ever changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerStatus {
    Active,
    Solved { attempts: u32, time_ms: u64 },
    /// `order` is the round-wide sequence of failures; players failed together
    /// at round end share one value.
    Failed { elapsed_ms: u64, order: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessOutcome {
    Continue,
    Solved,
    Failed,
}

/// One player's board within one round.
#[derive(Debug, Clone)]
pub struct PlayerSession {
    player: Player,
    join_index: usize,
    guesses: Vec<String>,
    feedbacks: Vec<Vec<LetterStatus>>,
    status: PlayerStatus,
}

impl PlayerSession {
    pub fn new(player: Player, join_index: usize) -> Self {
        Self {
            player,
            join_index,
            guesses: Vec::new(),
            feedbacks: Vec::new(),
            status: PlayerStatus::Active,
        }
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn player_id(&self) -> &PlayerId {
        &self.player.player_id
    }

    pub fn username(&self) -> &str {
        &self.player.username
    }

    pub fn join_index(&self) -> usize {
        self.join_index
    }

    pub fn guesses(&self) -> &[String] {
        &self.guesses
    }

    pub fn feedbacks(&self) -> &[Vec<LetterStatus>] {
        &self.feedbacks
    }

    pub fn status(&self) -> &PlayerStatus {
        &self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == PlayerStatus::Active
    }

    pub fn attempts(&self) -> u32 {
        self.guesses.len() as u32
    }

    pub fn status_kind(&self) -> PlayerStatusKind {
        match self.status {
            PlayerStatus::Active => PlayerStatusKind::Active,
            PlayerStatus::Solved { .. } => PlayerStatusKind::Solved,
            PlayerStatus::Failed { .. } => PlayerStatusKind::Failed,
        }
    }

    /// Append an evaluated guess. `fail_order` is only used if this guess
    /// exhausts the board.
    pub fn record_guess(
        &mut self,
        word: String,
        feedback: Vec<LetterStatus>,
        elapsed_ms: u64,
        fail_order: u64,
    ) -> Result<GuessOutcome, GameError> {
        if !self.is_active() {
            return Err(GameError::invalid_guess(
                "you have already finished this round",
            ));
        }
        if self.guesses.len() >= MAX_GUESSES {
            return Err(GameError::invalid_guess("no guesses left"));
        }

        let solved = FeedbackEvaluator::is_solved(&feedback);
        self.guesses.push(word);
        self.feedbacks.push(feedback);

        if solved {
            self.status = PlayerStatus::Solved {
                attempts: self.attempts(),
                time_ms: elapsed_ms,
            };
            Ok(GuessOutcome::Solved)
        } else if self.guesses.len() == MAX_GUESSES {
            self.status = PlayerStatus::Failed {
                elapsed_ms,
                order: fail_order,
            };
            Ok(GuessOutcome::Failed)
        } else {
            Ok(GuessOutcome::Continue)
        }
    }

    /// Fail a player who is still guessing when the round closes.
    /// Returns false if the player had already finished.
    pub fn force_fail(&mut self, elapsed_ms: u64, order: u64) -> bool {
        if !self.is_active() {
            return false;
        }
        self.status = PlayerStatus::Failed { elapsed_ms, order };
        true
    }
}
