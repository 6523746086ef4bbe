//! Player-facing commentary for rolls and results.

use crate::dice::DiceRoller;
use crate::result::GameResult;
use duel_core::Winner;

fn choose(roller: &mut dyn DiceRoller, options: Vec<String>) -> String {
    let idx = roller.pick(options.len());
    options.into_iter().nth(idx).unwrap_or_default()
}

/// Closing line for a finished match, graded by who won and by how much.
pub fn result_message(roller: &mut dyn DiceRoller, result: &GameResult) -> String {
    let (player, computer) = (result.player_total, result.opponent_total);
    let gap = result.margin();

    let options = match result.winner {
        Winner::Tie => vec![
            format!("Dead even at {} each, perfectly matched!", player),
            format!("{} vs {}, what are the odds!", player, computer),
            format!("Tie game at {} apiece. Nobody blinked.", player),
            format!("Equal scores {}:{}, fair and square.", player, computer),
        ],
        Winner::Player if gap <= 1 => vec![
            format!("Close victory, {} vs {}! Well played.", player, computer),
            format!("Won by {}! That was tight.", gap),
            format!("{} vs {}, edged it at the line.", player, computer),
            "Narrow win! Steady hands.".to_string(),
        ],
        Winner::Player => vec![
            format!("{} vs {}! A dominant performance.", player, computer),
            format!("Crushing victory, {} vs {}!", player, computer),
            format!("{} vs {}, outstanding dice work.", player, computer),
            "Big win! You're getting good at this.".to_string(),
        ],
        Winner::Computer if gap <= 1 => vec![
            format!("Close one! {} vs {}, almost had it.", computer, player),
            format!("{} vs {}, that was really close.", computer, player),
            format!("Lost by {}. Next time for sure.", gap),
            "Narrow defeat, great effort though.".to_string(),
        ],
        Winner::Computer if gap <= 3 => vec![
            format!("{} vs {}, good game.", computer, player),
            format!("Lost {} vs {}, better luck next round.", computer, player),
            format!("Computer takes it {} vs {}, a fair match.", computer, player),
            format!("{} point difference, you'll get it next time.", gap),
        ],
        Winner::Computer => vec![
            format!("{} vs {}, a tough round but don't give up.", computer, player),
            format!("Computer dominated {} vs {}, that's how you learn.", computer, player),
            format!("Big loss, but every game makes you better. {} vs {}", computer, player),
            format!("{} point gap, room to improve. Keep playing!", gap),
        ],
    };

    choose(roller, options)
}

/// Running commentary after the player's `roll_number`-th die (1-based).
pub fn progress_message(
    roller: &mut dyn DiceRoller,
    roll_number: usize,
    current_roll: u8,
    current_sum: u32,
) -> String {
    let options = match roll_number {
        1 => vec![
            format!("First roll: {}! Off to a good start.", current_roll),
            format!("{} to begin with. Nice!", current_roll),
            format!("Roll #1: {}... looking good.", current_roll),
        ],
        2 => vec![
            format!("Second roll: {}! Total {}, building momentum.", current_roll, current_sum),
            format!("{} on the second! {} so far.", current_roll, current_sum),
            format!("Roll #2: {}... steady progress.", current_roll),
        ],
        3 => vec![
            format!("Third roll: {}! Halfway there with {}.", current_roll, current_sum),
            format!("{} on the third, sum {}. Doing great.", current_roll, current_sum),
            format!("Midway through: {}... you're in control.", current_roll),
        ],
        4 => vec![
            format!("Fourth roll: {}! {} with one to go.", current_roll, current_sum),
            format!("{} on the fourth! One more to go.", current_roll),
            format!("Roll #4: {}... total {}, final roll coming.", current_roll, current_sum),
        ],
        5 => vec![
            format!("Final roll: {}! Total score: {}.", current_roll, current_sum),
            format!("Complete! {} to finish, final total {}.", current_roll, current_sum),
            format!("Fifth roll: {}! Your final score is {}.", current_roll, current_sum),
        ],
        n => vec![format!("Roll {}: {}! Total: {}", n, current_roll, current_sum)],
    };

    choose(roller, options)
}

const QUOTES: &[&str] = &[
    "Every roll is a new chance!",
    "Luck favors the persistent.",
    "You've got this!",
    "Fair play makes victory sweeter.",
    "Each game is a coin toss, as it should be.",
    "Your skills are improving.",
    "Random is fair, and fair is fun.",
    "May the odds be ever in everyone's favor.",
    "Win or lose, you played fairly.",
];

pub fn motivational_quote(roller: &mut dyn DiceRoller) -> &'static str {
    QUOTES[roller.pick(QUOTES.len())]
}
