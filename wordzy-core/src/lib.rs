pub mod feedback;
pub mod game_session;
pub mod player_session;
pub mod ranking;
pub mod room;
pub mod transition;
pub mod word_list;

// Re-export main components
pub use feedback::*;
pub use game_session::*;
pub use player_session::*;
pub use ranking::{format_time, player_statuses, rank_players};
pub use room::*;
pub use transition::*;
pub use word_list::*;
