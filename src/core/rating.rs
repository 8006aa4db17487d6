// src/core/rating.rs

use crate::config::{DIFFICULTY_MIN_ATTEMPTS, NEUTRAL_RATING};

/// User rating from attempt/correct counts, in [0,100].
///
/// A user with no attempts sits at the neutral default rather than an
/// extreme, so a freshly added subject starts in the middle of the
/// difficulty scale.
pub fn rating(attempts: i64, correct: i64) -> f64 {
    if attempts == 0 {
        return NEUTRAL_RATING;
    }
    (correct as f64 / attempts as f64 * 100.0).round()
}

/// Incremental mean update: fold the n-th sample into a running average
/// without rescanning history.
pub fn incremental_mean(old_avg: f64, n: i64, sample: f64) -> f64 {
    debug_assert!(n >= 1);
    (old_avg * (n - 1) as f64 + sample) / n as f64
}

/// Question difficulty as its wrong-answer rate, in [0,100].
///
/// Deliberately unsmoothed; callers only consult it once the attempt count
/// crosses `config::DIFFICULTY_MIN_ATTEMPTS`, so early noise never shows.
pub fn difficulty_rating(attempts: i64, correct: i64) -> f64 {
    if attempts == 0 {
        return NEUTRAL_RATING;
    }
    (attempts - correct) as f64 / attempts as f64 * 100.0
}

/// Difficulty after folding in one more attempt. Below the minimum attempt
/// count the previous rating is kept untouched; from the threshold attempt
/// onward it tracks the wrong-answer rate.
pub fn next_difficulty(previous: f64, attempts: i64, correct: i64) -> f64 {
    if attempts >= DIFFICULTY_MIN_ATTEMPTS {
        difficulty_rating(attempts, correct)
    } else {
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_defaults_to_neutral_without_attempts() {
        assert_eq!(rating(0, 0), 50.0);
        // Correct count is irrelevant when nothing was attempted.
        assert_eq!(rating(0, 7), 50.0);
    }

    #[test]
    fn rating_extremes() {
        assert_eq!(rating(12, 12), 100.0);
        assert_eq!(rating(12, 0), 0.0);
    }

    #[test]
    fn rating_rounds_to_nearest_integer() {
        // 2/3 = 66.66... -> 67
        assert_eq!(rating(3, 2), 67.0);
        // 1/3 = 33.33... -> 33
        assert_eq!(rating(3, 1), 33.0);
    }

    #[test]
    fn incremental_mean_matches_full_recompute() {
        let samples = [12.0, 30.0, 45.0, 8.0, 61.0];
        let mut avg = 0.0;
        for (i, s) in samples.iter().enumerate() {
            avg = incremental_mean(avg, (i + 1) as i64, *s);
        }
        let full: f64 = samples.iter().sum::<f64>() / samples.len() as f64;
        assert!((avg - full).abs() < 1e-9);
    }

    #[test]
    fn incremental_mean_first_sample_is_the_sample() {
        assert_eq!(incremental_mean(0.0, 1, 42.5), 42.5);
    }

    #[test]
    fn difficulty_is_wrong_answer_rate() {
        assert_eq!(difficulty_rating(10, 7), 30.0);
        assert_eq!(difficulty_rating(10, 0), 100.0);
        assert_eq!(difficulty_rating(10, 10), 0.0);
    }

    #[test]
    fn difficulty_holds_until_tenth_attempt() {
        // Ninth attempt: stays at the served value regardless of outcomes.
        assert_eq!(next_difficulty(50.0, 9, 9), 50.0);
        // Tenth attempt: recomputed from the wrong-answer rate.
        assert_eq!(next_difficulty(50.0, 10, 7), 30.0);
        // And it keeps updating afterwards.
        assert_eq!(next_difficulty(30.0, 20, 10), 50.0);
    }
}
