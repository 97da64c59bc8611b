use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::PlayerId;

/// Identity handed out by the external identity service. Opaque to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Player {
    pub player_id: PlayerId,
    pub username: String,
}

impl Player {
    pub fn new(player_id: impl Into<PlayerId>, username: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            username: username.into(),
        }
    }
}
