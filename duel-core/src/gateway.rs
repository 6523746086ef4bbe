use crate::config::GatewayConfig;
use crate::error::{DuelError, Result};
use crate::realtime::watcher::{self, WatchState};
use crate::realtime::{ChangeEvent, ChangeFeed, LiveBoard, Subscription};
use crate::storage::{change_log, game_store, player_store, ChangeLogStore};
use crate::storage::{GameStore, PlayerStore, Storage};
use crate::types::{roll_total, Game, GameStatus, Player, Winner, DICE_MAX, DICE_MIN, TOTAL_ROLLS};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// How long other gateways have to pick up a logged change.
const CHANGE_LOG_RETENTION_HOURS: i64 = 24;

/// Storage and live updates for players and completed games.
///
/// Several gateways, in one process or many, may share a database file.
/// Each one publishes its own writes immediately and replays the writes of
/// the others from the change log.
pub struct GameGateway {
    storage: Arc<Storage>,
    feed: ChangeFeed,
    config: GatewayConfig,
    origin: String,
    watcher: Option<JoinHandle<()>>,
}

impl GameGateway {
    pub async fn new(config: GatewayConfig) -> Result<Self> {
        config.validate()?;

        let storage = Arc::new(Storage::new(&config.db_path).await?);
        let feed = ChangeFeed::new(config.event_buffer);
        let origin = Uuid::new_v4().to_string();

        let change_log = ChangeLogStore::new(&storage);
        let pruned = change_log
            .prune_before(Utc::now() - Duration::hours(CHANGE_LOG_RETENTION_HOURS))
            .await?;
        if pruned > 0 {
            tracing::debug!("Pruned {} old change log entries", pruned);
        }

        let watcher = match config.change_poll_interval() {
            Some(interval) => {
                let state = WatchState::new(origin.clone(), change_log.latest_seq().await?);
                Some(watcher::spawn_watcher(
                    Arc::clone(&storage),
                    feed.clone(),
                    state,
                    interval,
                ))
            }
            None => None,
        };

        tracing::info!("Opened game gateway at {}", config.db_path.display());
        Ok(Self {
            storage,
            feed,
            config,
            origin,
            watcher,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Look a player up by name, creating a zero-stats player on first use.
    pub async fn create_or_get_player(&self, name: &str) -> Result<Player> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DuelError::InvalidName("name cannot be empty".to_string()));
        }

        let player_store = PlayerStore::new(&self.storage);
        if let Some(existing) = player_store.find_by_name(name).await? {
            tracing::debug!("Found existing player '{}' ({})", name, existing.id);
            return Ok(existing);
        }

        let now = Utc::now();
        let player = Player {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            total_games: 0,
            total_points: 0,
            best_score: 0,
            created_at: now,
            updated_at: now,
        };
        player_store.insert_player(&player).await?;

        tracing::info!("Created player '{}' with ID: {}", name, player.id);
        Ok(player)
    }

    pub async fn get_player(&self, player_id: &str) -> Result<Player> {
        PlayerStore::new(&self.storage)
            .find_by_id(player_id)
            .await?
            .ok_or_else(|| DuelError::PlayerNotFound {
                id: player_id.to_string(),
            })
    }

    pub async fn find_player_by_name(&self, name: &str) -> Result<Option<Player>> {
        PlayerStore::new(&self.storage).find_by_name(name.trim()).await
    }

    /// Persist a completed match and fold it into the player's statistics.
    ///
    /// Totals and winner are recomputed from the rolls rather than trusted.
    /// The game row, the stats update and the change log entries commit
    /// together; events go out only after the commit.
    pub async fn save_game(
        &self,
        player_id: &str,
        player_rolls: &[u8],
        computer_rolls: &[u8],
        won: bool,
    ) -> Result<Game> {
        validate_rolls("player", player_rolls)?;
        validate_rolls("computer", computer_rolls)?;

        let player_score = roll_total(player_rolls);
        let computer_score = roll_total(computer_rolls);
        let winner = Winner::from_totals(player_score, computer_score);
        if won != (winner == Winner::Player) {
            tracing::warn!(
                "Reported outcome (won={}) disagrees with rolls ({} vs {}), storing {}",
                won,
                player_score,
                computer_score,
                winner
            );
        }

        let now = Utc::now();
        let game = Game {
            id: Uuid::new_v4().to_string(),
            player_id: player_id.to_string(),
            player_score,
            computer_score,
            player_rolls: player_rolls.to_vec(),
            computer_rolls: computer_rolls.to_vec(),
            status: GameStatus::Completed,
            winner,
            created_at: now,
            completed_at: Some(now),
            player: None,
        };

        let (saved, changes) = {
            let mut conn = self.storage.get_connection().await;
            let tx = conn.transaction()?;

            // Nothing is written for an unknown player
            let updated = player_store::apply_game(&tx, player_id, player_score, now)?
                .ok_or_else(|| DuelError::PlayerNotFound {
                    id: player_id.to_string(),
                })?;
            game_store::insert_game_row(&tx, &game)?;

            let saved = Game {
                player: Some(updated.clone()),
                ..game
            };
            let changes = [
                ChangeEvent::player_updated(&updated)?,
                ChangeEvent::game_inserted(&saved)?,
            ];
            for change in &changes {
                change_log::append(&tx, &self.origin, change)?;
            }

            tx.commit()?;
            (saved, changes)
        };

        tracing::info!(
            "Saved game {} for player {}: {} vs {} ({})",
            saved.id,
            player_id,
            player_score,
            computer_score,
            winner
        );
        for change in changes {
            self.feed.publish(change);
        }

        Ok(saved)
    }

    /// Count one more game, add its points and raise the best score.
    ///
    /// A missing player is logged and skipped.
    pub async fn update_player_stats(
        &self,
        player_id: &str,
        score: u32,
        won: bool,
    ) -> Result<Option<Player>> {
        tracing::debug!(
            "Updating stats for player {}: score={}, won={}",
            player_id,
            score,
            won
        );

        let updated = {
            let mut conn = self.storage.get_connection().await;
            let tx = conn.transaction()?;

            let Some(player) = player_store::apply_game(&tx, player_id, score, Utc::now())? else {
                tracing::error!("Player {} not found for stats update", player_id);
                return Ok(None);
            };
            let change = ChangeEvent::player_updated(&player)?;
            change_log::append(&tx, &self.origin, &change)?;

            tx.commit()?;
            (player, change)
        };

        let (player, change) = updated;
        self.feed.publish(change);
        Ok(Some(player))
    }

    /// Players ranked by best score, then total points.
    pub async fn get_leaderboard(&self, limit: usize) -> Result<Vec<Player>> {
        let players = PlayerStore::new(&self.storage).top_players(limit).await?;
        tracing::debug!("Leaderboard fetched: {} players", players.len());
        Ok(players)
    }

    /// Leaderboard position of a player and the number of ranked players.
    pub async fn player_rank(&self, player: &Player) -> Result<(usize, usize)> {
        let player_store = PlayerStore::new(&self.storage);
        let rank = player_store.rank_of(player).await?;
        let total = player_store.player_count().await?;
        Ok((rank, total))
    }

    /// Completed games, newest first, each with its player attached.
    pub async fn get_recent_games(&self, limit: usize) -> Result<Vec<Game>> {
        let games = GameStore::new(&self.storage).recent_completed(limit).await?;
        tracing::debug!("Recent games fetched: {} games", games.len());
        Ok(games)
    }

    pub async fn get_game(&self, game_id: &str) -> Result<Game> {
        GameStore::new(&self.storage)
            .load_game(game_id)
            .await?
            .ok_or_else(|| DuelError::GameNotFound {
                id: game_id.to_string(),
            })
    }

    /// Subscribe to game inserts and player updates.
    pub fn subscribe(&self) -> Subscription {
        self.feed.subscribe()
    }

    /// Initial leaderboard and recent games, using the configured limits.
    pub async fn load_board(&self) -> Result<LiveBoard> {
        let players = self.get_leaderboard(self.config.leaderboard_limit).await?;
        let games = self.get_recent_games(self.config.recent_games_limit).await?;
        Ok(LiveBoard::new(players, games, self.config.recent_games_limit))
    }
}

impl Drop for GameGateway {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}

fn validate_rolls(side: &str, rolls: &[u8]) -> Result<()> {
    if rolls.len() != TOTAL_ROLLS {
        return Err(DuelError::invalid_rolls(format!(
            "{} has {} rolls, expected {}",
            side,
            rolls.len(),
            TOTAL_ROLLS
        )));
    }

    if let Some(bad) = rolls.iter().find(|&&r| !(DICE_MIN..=DICE_MAX).contains(&r)) {
        return Err(DuelError::invalid_rolls(format!(
            "{} roll {} is outside {}..={}",
            side, bad, DICE_MIN, DICE_MAX
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::FeedEvent;
    use std::time::Duration as StdDuration;
    use tempfile::tempdir;

    async fn gateway(dir: &tempfile::TempDir) -> GameGateway {
        GameGateway::new(GatewayConfig::in_data_dir(dir.path()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_or_get_player_is_idempotent() {
        let temp_dir = tempdir().unwrap();
        let gateway = gateway(&temp_dir).await;

        let first = gateway.create_or_get_player("ada").await.unwrap();
        let second = gateway.create_or_get_player("ada").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.total_games, 0);
        assert_eq!(first.total_points, 0);
        assert_eq!(first.best_score, 0);
    }

    #[tokio::test]
    async fn test_blank_name_is_rejected() {
        let temp_dir = tempdir().unwrap();
        let gateway = gateway(&temp_dir).await;

        let err = gateway.create_or_get_player("   ").await.unwrap_err();
        assert!(matches!(err, DuelError::InvalidName(_)));
    }

    #[tokio::test]
    async fn test_save_game_updates_stats() {
        let temp_dir = tempdir().unwrap();
        let gateway = gateway(&temp_dir).await;
        let player = gateway.create_or_get_player("ada").await.unwrap();

        let game = gateway
            .save_game(&player.id, &[3, 5, 2, 6, 4], &[1, 1, 1, 1, 1], true)
            .await
            .unwrap();
        assert_eq!(game.player_score, 20);
        assert_eq!(game.computer_score, 5);
        assert_eq!(game.winner, Winner::Player);
        assert_eq!(game.status, GameStatus::Completed);

        gateway
            .save_game(&player.id, &[1, 2, 1, 2, 1], &[6, 6, 6, 6, 6], false)
            .await
            .unwrap();

        let stored = gateway.get_game(&game.id).await.unwrap();
        assert_eq!(stored.player_rolls, vec![3, 5, 2, 6, 4]);
        assert_eq!(stored.player_name(), "ada");
        assert!(matches!(
            gateway.get_game("missing").await,
            Err(DuelError::GameNotFound { .. })
        ));

        let player = gateway.get_player(&player.id).await.unwrap();
        assert_eq!(player.total_games, 2);
        assert_eq!(player.total_points, 27);
        assert_eq!(player.best_score, 20);
    }

    #[tokio::test]
    async fn test_save_game_rejects_bad_input() {
        let temp_dir = tempdir().unwrap();
        let gateway = gateway(&temp_dir).await;
        let player = gateway.create_or_get_player("ada").await.unwrap();

        let short = gateway
            .save_game(&player.id, &[1, 2, 3], &[1, 1, 1, 1, 1], false)
            .await;
        assert!(matches!(short, Err(DuelError::InvalidRolls(_))));

        let out_of_range = gateway
            .save_game(&player.id, &[1, 2, 3, 4, 7], &[1, 1, 1, 1, 1], true)
            .await;
        assert!(matches!(out_of_range, Err(DuelError::InvalidRolls(_))));

        let unknown = gateway
            .save_game("nobody", &[1, 2, 3, 4, 5], &[1, 1, 1, 1, 1], true)
            .await;
        assert!(matches!(unknown, Err(DuelError::PlayerNotFound { .. })));

        assert!(gateway.get_recent_games(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_stats_for_missing_player_is_skipped() {
        let temp_dir = tempdir().unwrap();
        let gateway = gateway(&temp_dir).await;

        let updated = gateway.update_player_stats("ghost", 12, true).await.unwrap();
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn test_leaderboard_order() {
        let temp_dir = tempdir().unwrap();
        let gateway = gateway(&temp_dir).await;

        let ada = gateway.create_or_get_player("ada").await.unwrap();
        let bob = gateway.create_or_get_player("bob").await.unwrap();
        let cy = gateway.create_or_get_player("cy").await.unwrap();

        // ada and bob share a best score of 20; bob has more points
        gateway
            .save_game(&ada.id, &[4, 4, 4, 4, 4], &[1, 1, 1, 1, 1], true)
            .await
            .unwrap();
        gateway
            .save_game(&bob.id, &[4, 4, 4, 4, 4], &[1, 1, 1, 1, 1], true)
            .await
            .unwrap();
        gateway
            .save_game(&bob.id, &[1, 1, 1, 1, 1], &[2, 2, 2, 2, 2], false)
            .await
            .unwrap();
        gateway
            .save_game(&cy.id, &[6, 6, 6, 6, 6], &[6, 6, 6, 6, 6], false)
            .await
            .unwrap();

        let board = gateway.get_leaderboard(10).await.unwrap();
        let names: Vec<&str> = board.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["cy", "bob", "ada"]);

        let top = gateway.get_leaderboard(1).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].name, "cy");

        assert_eq!(gateway.player_rank(&board[1]).await.unwrap(), (2, 3));
        assert_eq!(gateway.player_rank(&board[2]).await.unwrap(), (3, 3));
    }

    #[tokio::test]
    async fn test_recent_games_newest_first_with_player() {
        let temp_dir = tempdir().unwrap();
        let gateway = gateway(&temp_dir).await;
        let player = gateway.create_or_get_player("ada").await.unwrap();

        let mut ids = Vec::new();
        for face in 1..=3u8 {
            let game = gateway
                .save_game(&player.id, &[face; 5], &[2; 5], face > 2)
                .await
                .unwrap();
            ids.push(game.id);
        }

        let recent = gateway.get_recent_games(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, ids[2]);
        assert_eq!(recent[1].id, ids[1]);
        assert_eq!(recent[0].player_name(), "ada");
        assert_eq!(recent[0].player_rolls, vec![3; 5]);
        assert_eq!(recent[1].winner, Winner::Tie);
    }

    #[tokio::test]
    async fn test_save_game_pushes_events() {
        let temp_dir = tempdir().unwrap();
        let gateway = gateway(&temp_dir).await;
        let player = gateway.create_or_get_player("ada").await.unwrap();
        let mut sub = gateway.subscribe();

        let saved = gateway
            .save_game(&player.id, &[6, 6, 6, 6, 6], &[1, 2, 3, 4, 5], true)
            .await
            .unwrap();

        match sub.next().await {
            Some(FeedEvent::PlayerUpdated(updated)) => {
                assert_eq!(updated.id, player.id);
                assert_eq!(updated.best_score, 30);
            }
            other => panic!("expected player update, got {:?}", other),
        }

        match sub.next().await {
            Some(FeedEvent::GameInserted(game)) => {
                assert_eq!(game.id, saved.id);
                assert_eq!(game.player_name(), "ada");
            }
            other => panic!("expected game insert, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let temp_dir = tempdir().unwrap();
        let player_id = {
            let gateway = gateway(&temp_dir).await;
            let player = gateway.create_or_get_player("ada").await.unwrap();
            gateway
                .save_game(&player.id, &[2; 5], &[3; 5], false)
                .await
                .unwrap();
            player.id
        };

        let gateway = gateway(&temp_dir).await;
        let player = gateway.create_or_get_player("ada").await.unwrap();
        assert_eq!(player.id, player_id);
        assert_eq!(player.total_games, 1);

        let board = gateway.load_board().await.unwrap();
        assert_eq!(board.recent_games().len(), 1);
        assert_eq!(board.rank_of(&player_id), Some(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_saves_all_count() {
        let temp_dir = tempdir().unwrap();
        let gateway = Arc::new(gateway(&temp_dir).await);
        let player = gateway.create_or_get_player("ada").await.unwrap();

        let mut handles = Vec::new();
        for i in 0..40u8 {
            let gateway = Arc::clone(&gateway);
            let player_id = player.id.clone();
            let face = i % 6 + 1;
            handles.push(tokio::spawn(async move {
                gateway
                    .save_game(&player_id, &[face; 5], &[1; 5], face > 1)
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // faces cycle 1..=6, so totals are 5..=30 in steps of 5
        let expected_points: u64 = (0..40u64).map(|i| (i % 6 + 1) * 5).sum();
        let player = gateway.get_player(&player.id).await.unwrap();
        assert_eq!(player.total_games, 40);
        assert_eq!(player.total_points, expected_points);
        assert_eq!(player.best_score, 30);
        assert_eq!(gateway.get_recent_games(100).await.unwrap().len(), 40);
    }

    #[tokio::test]
    async fn test_update_player_stats_accumulates() {
        let temp_dir = tempdir().unwrap();
        let gateway = gateway(&temp_dir).await;
        let player = gateway.create_or_get_player("ada").await.unwrap();
        let mut sub = gateway.subscribe();

        gateway.update_player_stats(&player.id, 12, false).await.unwrap();
        let updated = gateway
            .update_player_stats(&player.id, 9, false)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.total_games, 2);
        assert_eq!(updated.total_points, 21);
        assert_eq!(updated.best_score, 12);
        assert!(matches!(sub.next().await, Some(FeedEvent::PlayerUpdated(_))));
    }

    #[tokio::test]
    async fn test_gateways_sharing_a_database_see_each_other() {
        let temp_dir = tempdir().unwrap();
        let config = GatewayConfig {
            change_poll_ms: 20,
            ..GatewayConfig::in_data_dir(temp_dir.path())
        };
        let first = GameGateway::new(config.clone()).await.unwrap();
        let second = GameGateway::new(config).await.unwrap();

        let mut first_sub = first.subscribe();
        let mut second_sub = second.subscribe();

        let player = first.create_or_get_player("ada").await.unwrap();
        let saved = first
            .save_game(&player.id, &[6; 5], &[1; 5], true)
            .await
            .unwrap();

        let wait = StdDuration::from_secs(5);
        match tokio::time::timeout(wait, second_sub.next()).await.unwrap() {
            Some(FeedEvent::PlayerUpdated(updated)) => assert_eq!(updated.best_score, 30),
            other => panic!("expected player update, got {:?}", other),
        }
        match tokio::time::timeout(wait, second_sub.next()).await.unwrap() {
            Some(FeedEvent::GameInserted(game)) => {
                assert_eq!(game.id, saved.id);
                assert_eq!(game.player_name(), "ada");
            }
            other => panic!("expected game insert, got {:?}", other),
        }

        // The writer sees its own save once, not again from the log
        assert!(matches!(first_sub.next().await, Some(FeedEvent::PlayerUpdated(_))));
        assert!(matches!(first_sub.next().await, Some(FeedEvent::GameInserted(_))));
        tokio::time::sleep(StdDuration::from_millis(100)).await;
        assert!(first_sub.try_next().is_none());
    }

    #[tokio::test]
    async fn test_local_only_gateway_skips_watcher() {
        let temp_dir = tempdir().unwrap();
        let config = GatewayConfig {
            change_poll_ms: 0,
            ..GatewayConfig::in_data_dir(temp_dir.path())
        };
        let gateway = GameGateway::new(config).await.unwrap();
        assert!(gateway.watcher.is_none());
    }
}
