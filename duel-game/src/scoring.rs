use duel_core::{roll_total, Winner, DICE_MAX, DICE_MIN, TOTAL_ROLLS};

pub fn calculate_score(rolls: &[u8]) -> u32 {
    roll_total(rolls)
}

pub fn determine_winner(player_score: u32, computer_score: u32) -> Winner {
    Winner::from_totals(player_score, computer_score)
}

pub fn is_game_complete(rolls: &[u8]) -> bool {
    rolls.len() >= TOTAL_ROLLS
}

pub fn is_valid_roll(roll: u8) -> bool {
    (DICE_MIN..=DICE_MAX).contains(&roll)
}

/// Highest total one side can reach in a match.
pub fn max_score() -> u32 {
    u32::from(DICE_MAX) * TOTAL_ROLLS as u32
}

/// Player's share of the combined points, rounded to a whole percent.
pub fn win_percentage(player_score: u32, computer_score: u32) -> u32 {
    let total = player_score + computer_score;
    if total == 0 {
        return 0;
    }
    (f64::from(player_score) / f64::from(total) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_calculate_score() {
        assert_eq!(calculate_score(&[]), 0);
        assert_eq!(calculate_score(&[3, 5, 2, 6, 4]), 20);
        assert_eq!(calculate_score(&[1, 1, 1, 1, 1]), 5);
    }

    #[test]
    fn test_determine_winner() {
        assert_eq!(determine_winner(20, 5), Winner::Player);
        assert_eq!(determine_winner(14, 15), Winner::Computer);
        assert_eq!(determine_winner(15, 15), Winner::Tie);
    }

    #[test]
    fn test_roll_helpers() {
        assert!(is_valid_roll(1));
        assert!(is_valid_roll(6));
        assert!(!is_valid_roll(0));
        assert!(!is_valid_roll(7));

        assert!(!is_game_complete(&[1, 2, 3, 4]));
        assert!(is_game_complete(&[1, 2, 3, 4, 5]));
        assert_eq!(max_score(), 30);
    }

    #[test]
    fn test_win_percentage() {
        assert_eq!(win_percentage(0, 0), 0);
        assert_eq!(win_percentage(20, 5), 80);
        assert_eq!(win_percentage(10, 20), 33);
        assert_eq!(win_percentage(15, 15), 50);
    }

    proptest! {
        #[test]
        fn winner_matches_strict_comparison(
            player in prop::collection::vec(1u8..=6, 5),
            computer in prop::collection::vec(1u8..=6, 5),
        ) {
            let player_total = calculate_score(&player);
            let computer_total = calculate_score(&computer);
            prop_assert_eq!(player_total, player.iter().map(|&r| r as u32).sum::<u32>());

            let winner = determine_winner(player_total, computer_total);
            prop_assert_eq!(winner == Winner::Player, player_total > computer_total);
            prop_assert_eq!(winner == Winner::Tie, player_total == computer_total);
        }
    }
}
