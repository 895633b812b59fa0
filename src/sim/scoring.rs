//! Alliance score aggregation and the terminal match outcome

use super::state::{Alliance, FieldRepresentation};

/// Total points `color` holds right now: every goal anywhere on the field
/// (free, robot-held, or platform-resting) plus both platform balance
/// bonuses.
pub fn alliance_score(color: Alliance, field: &FieldRepresentation) -> i32 {
    let goals: i32 = field.scoreable_goals().map(|g| g.current_score(color)).sum();
    goals + field.red_platform.current_score(color) + field.blue_platform.current_score(color)
}

/// Zero-sum outcome at the end of an episode, from `agent_color`'s side:
/// +1 for a win, -1 for a loss, 0 for a drawn match.
pub fn terminal_reward(agent_color: Alliance, field: &FieldRepresentation) -> f32 {
    let red = alliance_score(Alliance::Red, field);
    let blue = alliance_score(Alliance::Blue, field);

    let red_reward = match red.cmp(&blue) {
        std::cmp::Ordering::Greater => 1.0,
        std::cmp::Ordering::Less => -1.0,
        std::cmp::Ordering::Equal => 0.0,
    };

    match agent_color {
        Alliance::Red => red_reward,
        Alliance::Blue => -red_reward,
        Alliance::Neutral => 0.0,
    }
}
