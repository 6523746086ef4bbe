//! Dice Duel core - persistence gateway for the dice duel game
//!
//! Stores players and completed games in SQLite, serves the leaderboard and
//! recent-games feed, and pushes live change events to every subscriber.

pub mod config;
pub mod error;
pub mod gateway;
pub mod realtime;
pub mod storage;
pub mod types;

pub use config::GatewayConfig;
pub use error::{DuelError, Result};
pub use gateway::GameGateway;
pub use realtime::{ChangeEvent, ChangeFeed, FeedEvent, LiveBoard, Subscription};
pub use types::{
    rank_players, roll_total, Game, GameStatus, Player, Winner, DICE_MAX, DICE_MIN, TOTAL_ROLLS,
};
