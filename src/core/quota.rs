// src/core/quota.rs

use chrono::{DateTime, NaiveTime, Utc};
use sqlx::PgConnection;

use crate::error::AppError;
use crate::models::user::User;

/// UTC midnight of the day containing `now`. Attempts at or after this
/// instant count against the day's quota.
pub fn start_of_day_utc(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Number of attempts the user has recorded since UTC midnight.
pub async fn attempts_today(conn: &mut PgConnection, user_id: i64) -> Result<i64, AppError> {
    let since = start_of_day_utc(Utc::now());
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM attempts WHERE user_id = $1 AND created_at >= $2")
            .bind(user_id)
            .bind(since)
            .fetch_one(&mut *conn)
            .await?;
    Ok(count)
}

/// Rejects with QuotaExceeded once a non-premium user has used up the
/// daily free attempt limit. Premium users are uncapped.
pub async fn check_daily_quota(
    conn: &mut PgConnection,
    user: &User,
    limit: i64,
) -> Result<(), AppError> {
    if user.premium_valid {
        return Ok(());
    }
    let used = attempts_today(conn, user.id).await?;
    if used >= limit {
        return Err(AppError::QuotaExceeded(format!(
            "Daily free limit of {limit} attempts reached"
        )));
    }
    Ok(())
}

pub async fn selected_subject_count(
    conn: &mut PgConnection,
    user_id: i64,
) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_subjects WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// Rejects with QuotaExceeded when a non-premium user already holds the
/// free-tier subject allowance and tries to add one more.
pub fn check_subject_capacity(user: &User, current: i64, limit: i64) -> Result<(), AppError> {
    if user.premium_valid {
        return Ok(());
    }
    if current >= limit {
        return Err(AppError::QuotaExceeded(format!(
            "Free tier is limited to {limit} subjects"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn user(premium: bool) -> User {
        User {
            id: 1,
            username: "tester".into(),
            email: "tester@example.com".into(),
            password: String::new(),
            role: "user".into(),
            is_verified: true,
            verification_code: None,
            verification_expires_at: None,
            premium_valid: premium,
            premium_plan: None,
            premium_till: None,
            grader_valid: false,
            grader_till: None,
            grader_weekly_limit: 0,
            cumulative_rating: 50.0,
            cumulative_percentile: 50.0,
            created_at: None,
        }
    }

    #[test]
    fn day_starts_at_utc_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 17, 45, 12).unwrap();
        let start = start_of_day_utc(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap());
    }

    #[test]
    fn midnight_is_its_own_day_start() {
        let midnight = Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap();
        assert_eq!(start_of_day_utc(midnight), midnight);
    }

    #[test]
    fn subject_capacity_blocks_free_tier_at_limit() {
        assert!(check_subject_capacity(&user(false), 2, 3).is_ok());
        assert!(matches!(
            check_subject_capacity(&user(false), 3, 3),
            Err(AppError::QuotaExceeded(_))
        ));
    }

    #[test]
    fn subject_capacity_ignores_limit_for_premium() {
        assert!(check_subject_capacity(&user(true), 30, 3).is_ok());
    }
}
