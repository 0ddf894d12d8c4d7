// Elo rating math for head-to-head matches.
//
// One global K; the rating service applies the delta to both sides.

use serde::{Deserialize, Serialize};

/// K-factor applied to every ranked match.
pub const K_FACTOR: f64 = 34.0;

/// Match outcome from perspective of one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Draw,
    Loss,
}

impl Outcome {
    pub fn score(self) -> f64 {
        match self {
            Outcome::Win => 1.0,
            Outcome::Draw => 0.5,
            Outcome::Loss => 0.0,
        }
    }

    /// The same result seen from the other side.
    pub fn flip(self) -> Self {
        match self {
            Outcome::Win => Outcome::Loss,
            Outcome::Loss => Outcome::Win,
            Outcome::Draw => Outcome::Draw,
        }
    }

    /// (wins, draws, losses) counter increments.
    pub fn increments(self) -> (i64, i64, i64) {
        match self {
            Outcome::Win => (1, 0, 0),
            Outcome::Draw => (0, 1, 0),
            Outcome::Loss => (0, 0, 1),
        }
    }
}

/// Calculate expected score for player A against player B.
pub fn expected_score(rating_a: f64, rating_b: f64) -> f64 {
    1.0 / (1.0 + 10.0_f64.powf((rating_b - rating_a) / 400.0))
}

/// Round to the nearest integer, halves toward positive infinity (-8.5 becomes -8).
pub fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

/// Rating change for the home side. The away side receives the negation.
pub fn rating_delta(rating_home: f64, rating_away: f64, home_outcome: Outcome) -> i64 {
    let expected = expected_score(rating_home, rating_away);
    round_half_up(K_FACTOR * (home_outcome.score() - expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_score_equal_ratings() {
        let e = expected_score(1000.0, 1000.0);
        assert!((e - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_expected_score_higher_rated() {
        let e = expected_score(1300.0, 1000.0);
        assert!(e > 0.8);
        assert!(e < 1.0);
    }

    #[test]
    fn test_expected_score_lower_rated() {
        let e = expected_score(700.0, 1000.0);
        assert!(e < 0.2);
        assert!(e > 0.0);
    }

    #[test]
    fn test_delta_win_equal() {
        // 34 * (1 - 0.5) = 17
        assert_eq!(rating_delta(1000.0, 1000.0, Outcome::Win), 17);
    }

    #[test]
    fn test_delta_loss_equal() {
        assert_eq!(rating_delta(1000.0, 1000.0, Outcome::Loss), -17);
    }

    #[test]
    fn test_delta_draw_equal() {
        assert_eq!(rating_delta(1000.0, 1000.0, Outcome::Draw), 0);
    }

    #[test]
    fn test_draw_against_stronger_gains() {
        let d = rating_delta(1000.0, 1200.0, Outcome::Draw);
        assert!(d > 0);
    }

    #[test]
    fn test_upset_win_pays_more() {
        let underdog = rating_delta(900.0, 1300.0, Outcome::Win);
        let favourite = rating_delta(1300.0, 900.0, Outcome::Win);
        assert!(underdog > favourite);
        assert!(underdog <= K_FACTOR as i64);
    }

    #[test]
    fn test_outcome_flip_and_increments() {
        assert_eq!(Outcome::Win.flip(), Outcome::Loss);
        assert_eq!(Outcome::Draw.flip(), Outcome::Draw);
        assert_eq!(Outcome::Loss.increments(), (0, 0, 1));
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(8.5), 9);
        assert_eq!(round_half_up(-8.5), -8);
        assert_eq!(round_half_up(-0.5), 0);
        assert_eq!(round_half_up(-8.51), -9);
        assert_eq!(round_half_up(16.49), 16);
    }

    #[test]
    fn test_zero_sum() {
        for (h, a) in [(1000.0, 1000.0), (1234.5, 987.0), (800.0, 1600.0)] {
            for outcome in [Outcome::Win, Outcome::Draw, Outcome::Loss] {
                let home = rating_delta(h, a, outcome);
                let away = -home;
                assert_eq!(home + away, 0);
            }
        }
    }
}
