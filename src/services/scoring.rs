//! Authoritative score computation: per-answer points at ingestion time and
//! per-team aggregation when a round concludes.

use indexmap::IndexMap;

use crate::store::{
    fold_name,
    models::{AnswerRow, Team},
};

/// Points for a single answer.
///
/// A correct answer earns `base_points` plus a speed bonus that scales
/// linearly with the time left on the round clock, rounded to the nearest
/// point. Time remaining is clamped to the round length so a skewed client
/// clock can never mint extra points. Wrong (or absent) answers earn zero.
pub fn answer_score(
    base_points: u32,
    speed_weight: u32,
    round_ms: u64,
    is_correct: bool,
    time_remaining_ms: u64,
) -> u32 {
    if !is_correct {
        return 0;
    }
    if round_ms == 0 {
        return base_points;
    }
    let remaining = time_remaining_ms.min(round_ms);
    let bonus = (speed_weight as f64 * remaining as f64 / round_ms as f64).round() as u32;
    base_points + bonus
}

/// Per-team result of one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoundTally {
    /// Sum of team A's answer scores for the round.
    pub team_a: u32,
    /// Sum of team B's answer scores for the round.
    pub team_b: u32,
}

/// Aggregate one question's answers into team round scores by summing.
/// A team nobody answered for simply stays at zero.
pub fn tally_round(answers: &[AnswerRow]) -> RoundTally {
    answers.iter().fold(RoundTally::default(), |mut tally, row| {
        match row.team {
            Team::A => tally.team_a += row.score,
            Team::B => tally.team_b += row.score,
        }
        tally
    })
}

/// One row of the per-player leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerScore {
    /// Display name as first submitted.
    pub name: String,
    /// Team the player scored for.
    pub team: Team,
    /// Total points across every answered question.
    pub score: u32,
}

/// Rank players by their total points across the whole ledger, best first,
/// ties broken by name so the ordering is stable.
pub fn leaderboard(answers: &[AnswerRow], limit: usize) -> Vec<PlayerScore> {
    let mut by_player: IndexMap<String, PlayerScore> = IndexMap::new();
    for row in answers {
        let entry = by_player
            .entry(fold_name(&row.player_name))
            .or_insert_with(|| PlayerScore {
                name: row.player_name.clone(),
                team: row.team,
                score: 0,
            });
        entry.score += row.score;
    }

    let mut ranked: Vec<PlayerScore> = by_player.into_values().collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(name: &str, team: Team, question_index: usize, score: u32) -> AnswerRow {
        AnswerRow {
            session_code: "AB3XK".into(),
            player_name: name.into(),
            team,
            question_index,
            choice: "x".into(),
            is_correct: score > 0,
            time_remaining_ms: 0,
            score,
        }
    }

    #[test]
    fn correct_answer_with_most_of_the_clock_left() {
        // 50 base + round(50 * 8000 / 10000) = 90.
        assert_eq!(answer_score(50, 50, 10_000, true, 8_000), 90);
    }

    #[test]
    fn wrong_answer_scores_zero_regardless_of_speed() {
        assert_eq!(answer_score(50, 50, 10_000, false, 10_000), 0);
    }

    #[test]
    fn buzzer_beater_still_gets_base_points() {
        assert_eq!(answer_score(50, 50, 10_000, true, 0), 50);
    }

    #[test]
    fn remaining_time_is_clamped_to_the_round_length() {
        assert_eq!(answer_score(50, 50, 10_000, true, 60_000), 100);
    }

    #[test]
    fn bonus_rounds_to_nearest_point() {
        // 50 * 1100 / 10000 = 5.5 -> 6.
        assert_eq!(answer_score(50, 50, 10_000, true, 1_100), 56);
        // 50 * 1080 / 10000 = 5.4 -> 5.
        assert_eq!(answer_score(50, 50, 10_000, true, 1_080), 55);
    }

    #[test]
    fn round_tally_sums_per_team() {
        let answers = vec![
            answer("Ana", Team::A, 0, 90),
            answer("Alice", Team::A, 0, 55),
            answer("Bob", Team::B, 0, 70),
        ];
        let tally = tally_round(&answers);
        assert_eq!(tally.team_a, 145);
        assert_eq!(tally.team_b, 70);
    }

    #[test]
    fn silent_team_tallies_zero_not_an_error() {
        let answers = vec![answer("Ana", Team::A, 0, 90)];
        let tally = tally_round(&answers);
        assert_eq!(tally.team_a, 90);
        assert_eq!(tally.team_b, 0);

        assert_eq!(tally_round(&[]), RoundTally::default());
    }

    #[test]
    fn leaderboard_sums_across_questions_and_ranks() {
        let answers = vec![
            answer("Ana", Team::A, 0, 90),
            answer("ana", Team::A, 1, 60),
            answer("Bob", Team::B, 0, 100),
            answer("Cleo", Team::B, 1, 100),
        ];
        let board = leaderboard(&answers, 10);
        assert_eq!(board[0].name, "Ana");
        assert_eq!(board[0].score, 150);
        // Bob and Cleo tie at 100; names break the tie.
        assert_eq!(board[1].name, "Bob");
        assert_eq!(board[2].name, "Cleo");

        let top_one = leaderboard(&answers, 1);
        assert_eq!(top_one.len(), 1);
    }
}
