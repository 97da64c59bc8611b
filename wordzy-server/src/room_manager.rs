use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use wordzy_core::{
    LeaveReason, Room, RoomCommand, RoomSettings, RoundEnv, TimerAction, Transition, WordList,
    generate_room_code,
};
use wordzy_types::{GameError, Player, PlayerId, RoomId, RoomSnapshot, SessionId};

use crate::transport::{Transport, dispatch};

struct RoomEntry {
    room: Room,
    timer: Option<JoinHandle<()>>,
    /// Set once the room is dropped from the registry; late lockers bail out.
    closed: bool,
}

impl RoomEntry {
    fn cancel_timer(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
    }
}

type SharedEntry = Arc<Mutex<RoomEntry>>;

/// Owns every room. Each room is mutated only while its own mutex is held,
/// and a transition's messages are queued before the lock is released.
pub struct RoomManager {
    rooms: DashMap<RoomId, SharedEntry>,
    player_rooms: DashMap<PlayerId, RoomId>,
    transport: Arc<dyn Transport>,
    words: Arc<WordList>,
    settings: RoomSettings,
    tick_interval: Duration,
}

impl RoomManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        words: Arc<WordList>,
        settings: RoomSettings,
        tick_interval: Duration,
    ) -> Self {
        Self {
            rooms: DashMap::new(),
            player_rooms: DashMap::new(),
            transport,
            words,
            settings,
            tick_interval,
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// The room a player currently belongs to.
    pub fn room_of(&self, player_id: &str) -> Option<RoomId> {
        self.player_rooms.get(player_id).map(|r| r.value().clone())
    }

    pub async fn create_room(&self, owner: Player) -> Result<RoomId, GameError> {
        self.leave_current_room(&owner.player_id, None).await;

        let owner_id = owner.player_id.clone();
        let room_id = loop {
            let code = generate_room_code(&mut rand::rng());
            match self.rooms.entry(code.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(vacant) => {
                    let room = Room::new(code.clone(), owner, self.settings.clone(), Utc::now());
                    vacant.insert(Arc::new(Mutex::new(RoomEntry {
                        room,
                        timer: None,
                        closed: false,
                    })));
                    break code;
                }
            }
        };

        self.player_rooms.insert(owner_id.clone(), room_id.clone());
        info!("Room {} created by {}", room_id, owner_id);
        Ok(room_id)
    }

    pub async fn join(&self, room_id: &str, player: Player) -> Result<RoomSnapshot, GameError> {
        let room_id = normalize_room_id(room_id);
        let player_id = player.player_id.clone();

        // The old room is only left once the new one has accepted the player.
        let snapshot = self.execute(&room_id, RoomCommand::Join { player }).await?;
        self.leave_current_room(&player_id, Some(&room_id)).await;
        self.player_rooms.insert(player_id, room_id);
        Ok(snapshot)
    }

    pub async fn leave(&self, room_id: &str, player_id: &str) -> Result<(), GameError> {
        self.remove_member(&normalize_room_id(room_id), player_id, LeaveReason::Left)
            .await
    }

    /// The player's transport went away. Their round state is kept so a
    /// rejoin can pick it up.
    pub async fn disconnect(&self, player_id: &str) {
        let Some(room_id) = self.room_of(player_id) else {
            return;
        };
        if let Err(e) = self
            .remove_member(&room_id, player_id, LeaveReason::Disconnected)
            .await
        {
            debug!("Disconnect of {} from {}: {}", player_id, room_id, e);
        }
    }

    pub async fn start(&self, room_id: &str, player_id: &str) -> Result<(), GameError> {
        let command = RoomCommand::Start {
            player_id: player_id.to_string(),
        };
        self.execute(&normalize_room_id(room_id), command).await.map(|_| ())
    }

    pub async fn restart(&self, room_id: &str, player_id: &str) -> Result<(), GameError> {
        let command = RoomCommand::Restart {
            player_id: player_id.to_string(),
        };
        self.execute(&normalize_room_id(room_id), command).await.map(|_| ())
    }

    pub async fn submit_guess(
        &self,
        room_id: &str,
        player_id: &str,
        word: &str,
    ) -> Result<(), GameError> {
        let command = RoomCommand::SubmitGuess {
            player_id: player_id.to_string(),
            word: word.to_string(),
        };
        self.execute(&normalize_room_id(room_id), command).await.map(|_| ())
    }

    pub async fn disband(&self, room_id: &str, player_id: &str) -> Result<(), GameError> {
        let command = RoomCommand::Disband {
            requested_by: Some(player_id.to_string()),
        };
        self.execute(&normalize_room_id(room_id), command).await.map(|_| ())
    }

    pub async fn snapshot(&self, room_id: &str) -> Option<RoomSnapshot> {
        let entry = self.entry(&normalize_room_id(room_id))?;
        let guard = entry.lock().await;
        (!guard.closed).then(|| guard.room.snapshot())
    }

    /// Disband rooms nobody has touched for `timeout`. Returns how many went.
    pub async fn cleanup_idle_rooms(&self, timeout: Duration) -> usize {
        let timeout =
            chrono::Duration::from_std(timeout).unwrap_or_else(|_| chrono::Duration::weeks(52));
        let entries: Vec<(RoomId, SharedEntry)> = self
            .rooms
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        let mut removed = 0;
        for (room_id, entry) in entries {
            let mut guard = entry.lock().await;
            if guard.closed || !guard.room.is_idle(Utc::now(), timeout) {
                continue;
            }
            info!("Room {} idle for too long, disbanding", room_id);
            let command = RoomCommand::Disband { requested_by: None };
            match self.apply_locked(&entry, &mut guard, command).await {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to disband idle room {}: {}", room_id, e),
            }
        }
        removed
    }

    fn entry(&self, room_id: &str) -> Option<SharedEntry> {
        // Clone the Arc out so no shard lock is held across an await.
        self.rooms.get(room_id).map(|e| e.value().clone())
    }

    async fn remove_member(
        &self,
        room_id: &str,
        player_id: &str,
        reason: LeaveReason,
    ) -> Result<(), GameError> {
        let command = RoomCommand::Leave {
            player_id: player_id.to_string(),
            reason,
        };
        self.execute(room_id, command).await?;
        self.player_rooms
            .remove_if(player_id, |_, current| current == room_id);
        Ok(())
    }

    // One room per player: joining or creating elsewhere leaves the old room.
    async fn leave_current_room(&self, player_id: &str, keep: Option<&str>) {
        if let Some(current) = self.room_of(player_id) {
            if Some(current.as_str()) != keep {
                if let Err(e) = self.remove_member(&current, player_id, LeaveReason::Left).await {
                    debug!("Could not leave {} for {}: {}", current, player_id, e);
                }
            }
        }
    }

    async fn execute(&self, room_id: &str, command: RoomCommand) -> Result<RoomSnapshot, GameError> {
        let entry = self.entry(room_id).ok_or_else(|| GameError::RoomNotFound {
            room_id: room_id.to_string(),
        })?;
        let mut guard = entry.lock().await;
        if guard.closed {
            return Err(GameError::RoomNotFound {
                room_id: room_id.to_string(),
            });
        }

        self.apply_locked(&entry, &mut guard, command).await?;
        Ok(guard.room.snapshot())
    }

    // Runs with the room's mutex held.
    async fn apply_locked(
        &self,
        entry: &SharedEntry,
        guard: &mut RoomEntry,
        command: RoomCommand,
    ) -> Result<(), GameError> {
        let transition = apply_command(&mut guard.room, command, &self.words)?;
        let members = guard.room.member_ids();
        dispatch(self.transport.as_ref(), &members, &transition).await;

        match transition.timer {
            TimerAction::None => {}
            TimerAction::Cancel => guard.cancel_timer(),
            TimerAction::Start(session_id) => {
                guard.cancel_timer();
                guard.timer = Some(spawn_round_timer(
                    entry.clone(),
                    self.transport.clone(),
                    self.words.clone(),
                    session_id,
                    self.tick_interval,
                ));
            }
        }

        if transition.disbanded {
            guard.closed = true;
            guard.cancel_timer();
            let room_id = guard.room.id.clone();
            self.rooms.remove(&room_id);
            for member in &members {
                self.player_rooms
                    .remove_if(member, |_, current| *current == room_id);
            }
            info!("Room {} removed", room_id);
        }

        Ok(())
    }
}

fn normalize_room_id(room_id: &str) -> RoomId {
    room_id.trim().to_ascii_uppercase()
}

fn apply_command(
    room: &mut Room,
    command: RoomCommand,
    words: &WordList,
) -> Result<Transition, GameError> {
    // ThreadRng is not Send; keep it out of any await.
    let mut rng = rand::rng();
    let mut env = RoundEnv {
        now: Utc::now(),
        words,
        rng: &mut rng,
    };
    room.apply(command, &mut env)
}

/// Tick the round every `interval` until it ends or is superseded.
fn spawn_round_timer(
    entry: SharedEntry,
    transport: Arc<dyn Transport>,
    words: Arc<WordList>,
    session_id: SessionId,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let mut guard = entry.lock().await;
            if guard.closed || guard.room.active_session_id() != Some(session_id) {
                debug!("Timer for round {} stopping", session_id);
                break;
            }

            let transition = match apply_command(
                &mut guard.room,
                RoomCommand::Tick { session_id },
                &words,
            ) {
                Ok(transition) => transition,
                Err(e) => {
                    warn!("Tick for round {} failed: {}", session_id, e);
                    break;
                }
            };
            let members = guard.room.member_ids();
            dispatch(transport.as_ref(), &members, &transition).await;

            if transition.timer == TimerAction::Cancel {
                // Our own handle; dropping it detaches instead of aborting.
                guard.timer = None;
                break;
            }
        }
    })
}
