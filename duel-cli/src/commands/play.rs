use crate::commands::board::{game_summary, leaderboard_table, recent_games_table};
use anyhow::Context;
use dialoguer::{Confirm, Input, Select};
use duel_core::{FeedEvent, GameGateway, LiveBoard, Subscription};
use duel_game::messages::{motivational_quote, progress_message, result_message};
use duel_game::{
    DiceRoller, GameSession, PacingConfig, RollEvent, RoundOutcome, SaveHandle, SeededRoller,
    SessionTally, Side, ThreadRoller,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;

const MENU: [&str; 5] = [
    "Roll dice",
    "Leaderboard",
    "Recent games",
    "Toggle fast rolls",
    "Quit",
];

pub async fn play(
    gateway: Arc<GameGateway>,
    name: Option<String>,
    seed: Option<u64>,
    pacing: PacingConfig,
) -> anyhow::Result<()> {
    let name = match name {
        Some(name) => name,
        None => Input::<String>::new()
            .with_prompt("Your name")
            .interact_text()
            .context("Failed to read player name")?,
    };

    let board = match gateway.load_board().await {
        Ok(board) => board,
        Err(e) => {
            tracing::warn!("Could not load leaderboard: {}", e);
            println!("Error loading data, starting with an empty board.");
            LiveBoard::default()
        }
    };
    let board = Arc::new(Mutex::new(board));

    let roller: Box<dyn DiceRoller> = match seed {
        Some(seed) => Box::new(SeededRoller::new(seed)),
        None => Box::new(ThreadRoller),
    };

    let mut session = match GameSession::start(Arc::clone(&gateway), &name, roller, pacing).await
    {
        Ok(session) => session,
        Err(e) => {
            println!("Error setting up player.");
            return Err(e.into());
        }
    };
    board.lock().upsert_player(session.player().clone());

    let listener = spawn_board_listener(
        gateway.subscribe(),
        Arc::clone(&board),
        session.player().id.clone(),
    );

    println!("Welcome, {}!", session.player().name);
    println!("{}", motivational_quote(session.roller()));

    let mut pending_saves = Vec::new();
    let result = run_menu(&mut session, &board, &mut pending_saves).await;

    // Let in-flight saves land before the runtime shuts down
    for save in pending_saves {
        let _ = save.await;
    }
    listener.abort();

    let tally = session.tally();
    if tally.played() > 0 {
        println!("Thanks for playing! {}", tally_line(tally));
    }

    result
}

async fn run_menu(
    session: &mut GameSession<GameGateway>,
    board: &Arc<Mutex<LiveBoard>>,
    pending_saves: &mut Vec<JoinHandle<()>>,
) -> anyhow::Result<()> {
    loop {
        let fresh = board
            .lock()
            .players()
            .iter()
            .find(|p| p.id == session.player().id)
            .cloned();
        if let Some(player) = fresh {
            session.refresh_player(&player);
        }

        let choice = Select::new()
            .with_prompt(format!(
                "{} | rolls {}/5",
                session.player().name,
                session.sequencer().player_rolls().len()
            ))
            .items(&MENU)
            .default(0)
            .interact()
            .context("Menu selection failed")?;

        match choice {
            0 => {
                if !session.sequencer().can_roll() {
                    println!("Wait for your turn.");
                    continue;
                }
                if !play_round(session, pending_saves).await? {
                    return Ok(());
                }
            }
            1 => {
                let guard = board.lock();
                if guard.players().is_empty() {
                    println!("No players yet.");
                } else {
                    println!(
                        "{}",
                        leaderboard_table(guard.players(), Some(session.player().id.as_str()))
                    );
                }
            }
            2 => {
                let guard = board.lock();
                if guard.recent_games().is_empty() {
                    println!("No completed games yet.");
                } else {
                    println!("{}", recent_games_table(guard.recent_games()));
                }
            }
            3 => {
                let pacing = toggled_pacing(session.pacing());
                println!(
                    "Fast rolls {}.",
                    if pacing.is_instant() { "on" } else { "off" }
                );
                session.set_pacing(pacing);
            }
            _ => return Ok(()),
        }
    }
}

/// Play one round. Returns `false` when the player is done for the session.
async fn play_round(
    session: &mut GameSession<GameGateway>,
    pending_saves: &mut Vec<JoinHandle<()>>,
) -> anyhow::Result<bool> {
    let outcome = match session.play_round().await {
        Ok(outcome) => outcome,
        Err(e) => {
            println!("Round failed: {}. Starting a new match.", e);
            return Ok(true);
        }
    };
    match outcome {
        RoundOutcome::Continue { player, computer } => {
            print_roll(session, player);
            print_roll(session, computer);
            Ok(true)
        }
        RoundOutcome::Finished {
            player,
            computer,
            result,
            save,
        } => {
            print_roll(session, player);
            print_roll(session, computer);

            println!();
            println!(
                "You: {} ({:?})  Computer: {} ({:?})",
                result.player_total,
                result.player_rolls,
                result.opponent_total,
                result.opponent_rolls
            );
            println!("{}", result_message(session.roller(), &result));
            println!("SESSION: {}", tally_line(session.tally()));

            pending_saves.retain(|handle| !handle.is_finished());
            pending_saves.push(report_save(save));

            let again = Confirm::new()
                .with_prompt("Play again?")
                .default(true)
                .interact()
                .context("Failed to read answer")?;
            if again {
                session.try_again();
            }
            Ok(again)
        }
    }
}

fn print_roll(session: &mut GameSession<GameGateway>, event: RollEvent) {
    match event.side {
        Side::Player => println!(
            "{}",
            progress_message(session.roller(), event.roll_number, event.face, event.total)
        ),
        Side::Computer => println!(
            "Computer rolled {} (total {})",
            event.face, event.total
        ),
    }
}

fn report_save(save: SaveHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        match save.outcome().await {
            Ok(_) => println!("Game saved!"),
            Err(e) => println!("Error saving game: {}", e),
        }
    })
}

fn toggled_pacing(current: &PacingConfig) -> PacingConfig {
    if current.is_instant() {
        PacingConfig::default()
    } else {
        PacingConfig::instant()
    }
}

fn tally_line(tally: SessionTally) -> String {
    format!("W:{} L:{} T:{}", tally.wins, tally.losses, tally.ties)
}

fn spawn_board_listener(
    mut subscription: Subscription,
    board: Arc<Mutex<LiveBoard>>,
    own_id: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = subscription.next().await {
            if let FeedEvent::GameInserted(game) = &event {
                if game.player_id != own_id {
                    println!("New game: {}", game_summary(game));
                }
            }
            board.lock().apply(&event);
        }
        tracing::debug!("Change feed closed, board listener stopping");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use duel_core::GatewayConfig;
    use tempfile::TempDir;

    #[test]
    fn test_toggled_pacing() {
        assert!(toggled_pacing(&PacingConfig::default()).is_instant());
        assert!(!toggled_pacing(&PacingConfig::instant()).is_instant());
    }

    #[test]
    fn test_tally_line() {
        let tally = SessionTally {
            wins: 2,
            losses: 1,
            ties: 0,
        };
        assert_eq!(tally_line(tally), "W:2 L:1 T:0");
    }

    #[tokio::test]
    async fn test_board_listener_applies_saved_games() {
        let temp_dir = TempDir::new().unwrap();
        let gateway = Arc::new(
            GameGateway::new(GatewayConfig::in_data_dir(temp_dir.path()))
                .await
                .unwrap(),
        );

        let other = gateway.create_or_get_player("other").await.unwrap();
        let board = Arc::new(Mutex::new(gateway.load_board().await.unwrap()));
        let listener = spawn_board_listener(
            gateway.subscribe(),
            Arc::clone(&board),
            "someone-else".to_string(),
        );

        gateway
            .save_game(&other.id, &[6, 6, 6, 6, 6], &[1, 1, 1, 1, 1], true)
            .await
            .unwrap();

        for _ in 0..50 {
            if !board.lock().recent_games().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        {
            let guard = board.lock();
            assert_eq!(guard.recent_games().len(), 1);
            assert_eq!(guard.players()[0].best_score, 30);
        }
        listener.abort();
    }
}
