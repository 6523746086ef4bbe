pub mod board;
pub mod play;

pub use board::{show_leaderboard, show_player_stats, show_recent_games};
pub use play::play;
