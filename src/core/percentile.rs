// src/core/percentile.rs

use sqlx::PgConnection;

use crate::error::AppError;

/// Percentile rank from population counts: the fraction of the reference
/// population strictly below the value, in [0,100]. An empty population
/// yields 0 rather than dividing by zero.
pub fn percentile_from_counts(below: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    below as f64 / total as f64 * 100.0
}

/// Inclusive difficulty band around a percentile, clamped to [0,100].
pub fn band(percentile: f64, tolerance: f64) -> (f64, f64) {
    let lo = (percentile - tolerance).max(0.0);
    let hi = (percentile + tolerance).min(100.0);
    (lo, hi)
}

/// Percentile of a rating among all users' per-subject ratings for one
/// subject. Recounted from scratch on every call; the store does the scan.
pub async fn subject_rating_percentile(
    conn: &mut PgConnection,
    subject_code: &str,
    value: f64,
) -> Result<f64, AppError> {
    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM user_subjects WHERE subject_code = $1")
            .bind(subject_code)
            .fetch_one(&mut *conn)
            .await?;

    let below: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_subjects WHERE subject_code = $1 AND rating < $2",
    )
    .bind(subject_code)
    .bind(value)
    .fetch_one(&mut *conn)
    .await?;

    Ok(percentile_from_counts(below, total))
}

/// Percentile of a cumulative rating among all users.
pub async fn cumulative_rating_percentile(
    conn: &mut PgConnection,
    value: f64,
) -> Result<f64, AppError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&mut *conn)
        .await?;

    let below: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE cumulative_rating < $1")
        .bind(value)
        .fetch_one(&mut *conn)
        .await?;

    Ok(percentile_from_counts(below, total))
}

/// Percentile of a difficulty rating among all questions of one subject.
pub async fn question_difficulty_percentile(
    conn: &mut PgConnection,
    subject_code: &str,
    value: f64,
) -> Result<f64, AppError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE subject_code = $1")
        .bind(subject_code)
        .fetch_one(&mut *conn)
        .await?;

    let below: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM questions WHERE subject_code = $1 AND difficulty_rating < $2",
    )
    .bind(subject_code)
    .bind(value)
    .fetch_one(&mut *conn)
    .await?;

    Ok(percentile_from_counts(below, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_population_is_zero() {
        assert_eq!(percentile_from_counts(0, 0), 0.0);
    }

    #[test]
    fn percentile_is_fraction_strictly_below() {
        assert_eq!(percentile_from_counts(0, 4), 0.0);
        assert_eq!(percentile_from_counts(2, 4), 50.0);
        assert_eq!(percentile_from_counts(4, 4), 100.0);
    }

    #[test]
    fn percentile_is_monotonic_in_below_count() {
        // For v1 < v2 against the same population, count(x < v1) <= count(x < v2),
        // so monotonicity in `below` is what the contract reduces to.
        let total = 10;
        let mut last = -1.0;
        for below in 0..=total {
            let p = percentile_from_counts(below, total);
            assert!(p >= last);
            last = p;
        }
    }

    #[test]
    fn band_is_inclusive_and_clamped() {
        assert_eq!(band(50.0, 10.0), (40.0, 60.0));
        assert_eq!(band(3.0, 10.0), (0.0, 13.0));
        assert_eq!(band(97.0, 10.0), (87.0, 100.0));
        assert_eq!(band(0.0, 100.0), (0.0, 100.0));
    }
}
