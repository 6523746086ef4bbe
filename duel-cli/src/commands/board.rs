use comfy_table::{presets::UTF8_FULL, Table};
use duel_core::{GameGateway, Game, Player, Winner};
use duel_game::scoring::win_percentage;

pub fn leaderboard_table(players: &[Player], highlight: Option<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Player", "Best", "Points", "Games", "Avg"]);

    for (idx, player) in players.iter().enumerate() {
        let name = if highlight == Some(player.id.as_str()) {
            format!("{} (you)", player.name)
        } else {
            player.name.clone()
        };

        table.add_row(vec![
            (idx + 1).to_string(),
            name,
            player.best_score.to_string(),
            player.total_points.to_string(),
            player.total_games.to_string(),
            format!("{:.1}", player.average_score()),
        ]);
    }

    table
}

pub fn recent_games_table(games: &[Game]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Player", "Result", "Score", "Rolls", "Finished"]);

    for game in games {
        let outcome = match game.winner {
            Winner::Player => "WON",
            Winner::Computer => "LOST",
            Winner::Tie => "TIE",
        };
        let finished = game
            .completed_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            game.player_name().to_string(),
            outcome.to_string(),
            format!("{} vs {}", game.player_score, game.computer_score),
            format!("{:?} vs {:?}", game.player_rolls, game.computer_rolls),
            finished,
        ]);
    }

    table
}

pub async fn show_leaderboard(gateway: &GameGateway, limit: usize) -> anyhow::Result<()> {
    let players = gateway.get_leaderboard(limit).await?;

    if players.is_empty() {
        println!("No players yet.");
        return Ok(());
    }

    println!("Leaderboard:");
    println!("{}", leaderboard_table(&players, None));
    Ok(())
}

pub async fn show_recent_games(gateway: &GameGateway, limit: usize) -> anyhow::Result<()> {
    let games = gateway.get_recent_games(limit).await?;

    if games.is_empty() {
        println!("No completed games yet.");
        return Ok(());
    }

    println!("Recent games:");
    println!("{}", recent_games_table(&games));
    Ok(())
}

pub async fn show_player_stats(gateway: &GameGateway, name: &str) -> anyhow::Result<()> {
    let Some(player) = gateway.find_player_by_name(name).await? else {
        println!("No player named '{}'.", name);
        return Ok(());
    };

    let (rank, total) = gateway.player_rank(&player).await?;

    println!("Player: {}", player.name);
    println!("═══════════════════════════════════");
    println!("Games played: {}", player.total_games);
    println!("Total points: {}", player.total_points);
    println!("Best score: {}", player.best_score);
    println!("Average score: {:.1}", player.average_score());
    println!("Rank: {}/{}", rank, total);
    println!(
        "Member since: {}",
        player.created_at.format("%Y-%m-%d %H:%M UTC")
    );

    Ok(())
}

/// One-line summary of a finished match for notifications.
pub fn game_summary(game: &Game) -> String {
    let verdict = match game.winner {
        Winner::Player => "WON",
        Winner::Computer => "LOST",
        Winner::Tie => "TIED",
    };
    format!(
        "{} {} {} vs {} ({}% of points)",
        game.player_name(),
        verdict,
        game.player_score,
        game.computer_score,
        win_percentage(game.player_score, game.computer_score)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use duel_core::GameStatus;

    fn player(id: &str, best: u32) -> Player {
        Player {
            id: id.to_string(),
            name: format!("player-{}", id),
            total_games: 2,
            total_points: 30,
            best_score: best,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_leaderboard_table_marks_current_player() {
        let players = vec![player("a", 20), player("b", 18)];
        let rendered = leaderboard_table(&players, Some("b")).to_string();

        assert!(rendered.contains("player-a"));
        assert!(rendered.contains("player-b (you)"));
        assert!(rendered.contains("15.0"));
    }

    #[test]
    fn test_game_summary() {
        let game = Game {
            id: "g".to_string(),
            player_id: "a".to_string(),
            player_score: 20,
            computer_score: 5,
            player_rolls: vec![3, 5, 2, 6, 4],
            computer_rolls: vec![1, 1, 1, 1, 1],
            status: GameStatus::Completed,
            winner: Winner::Player,
            created_at: Utc::now(),
            completed_at: Some(Utc::now()),
            player: Some(player("a", 20)),
        };

        assert_eq!(game_summary(&game), "player-a WON 20 vs 5 (80% of points)");
        assert!(recent_games_table(&[game]).to_string().contains("20 vs 5"));
    }
}
