use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::Serialize;
use sqlx::Row;
use thiserror::Error;

use beici_algo::{advance, clamp_stage, masters, Feedback};

use crate::db::DatabaseProxy;

/// The app serves one person; identity is still threaded through every call
/// so the store and the tests never assume it.
pub const DEFAULT_USER_ID: &str = "default_user";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    Learning,
    Mastered,
}

impl ProgressStatus {
    pub fn as_db(self) -> &'static str {
        match self {
            ProgressStatus::Learning => "LEARNING",
            ProgressStatus::Mastered => "MASTERED",
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            ProgressStatus::Learning => "learning",
            ProgressStatus::Mastered => "mastered",
        }
    }

    pub fn from_db(raw: &str) -> Self {
        if raw == "MASTERED" {
            ProgressStatus::Mastered
        } else {
            ProgressStatus::Learning
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub id: String,
    pub stage: i32,
    pub next_review_time: String,
    pub status: &'static str,
}

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("word not found")]
    WordNotFound,
    #[error("progress not found")]
    ProgressNotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub fn parse_feedback(raw: &str) -> Option<Feedback> {
    match raw {
        "remember" => Some(Feedback::Remember),
        "fuzzy" => Some(Feedback::Fuzzy),
        "forgot" => Some(Feedback::Forgot),
        _ => None,
    }
}

/// First feedback for a word the user just met.
///
/// Progress creation is a single upsert keyed on (userId, wordId), so a
/// double submit for the same word cannot create two records; the conflict
/// arm reschedules and accumulates the wrong count instead.
pub async fn submit_new_word(
    proxy: &DatabaseProxy,
    user_id: &str,
    word_id: &str,
    feedback: Feedback,
    now: DateTime<Utc>,
) -> Result<ProgressSummary, ReviewError> {
    let pool = proxy.pool();

    let word_exists: Option<String> =
        sqlx::query_scalar(r#"SELECT "id" FROM "words" WHERE "id" = $1"#)
            .bind(word_id)
            .fetch_optional(pool)
            .await?;
    if word_exists.is_none() {
        return Err(ReviewError::WordNotFound);
    }

    // New words always schedule from the bottom of the ladder
    let schedule = advance(0, feedback, now);
    let wrong_increment: i32 = if feedback == Feedback::Forgot { 1 } else { 0 };

    let row = sqlx::query(
        r#"
        INSERT INTO "user_progress"
          ("id","userId","wordId","stage","status","nextReviewTime","wrongCount","lastReviewedAt")
        VALUES ($1,$2,$3,$4,'LEARNING',$5,$6,$7)
        ON CONFLICT ("userId","wordId") DO UPDATE SET
          "stage" = EXCLUDED."stage",
          "nextReviewTime" = EXCLUDED."nextReviewTime",
          "wrongCount" = "user_progress"."wrongCount" + $6,
          "lastReviewedAt" = EXCLUDED."lastReviewedAt"
        RETURNING "id", "stage", "nextReviewTime", "status"::text AS "status"
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(word_id)
    .bind(schedule.next_stage as i32)
    .bind(schedule.next_review_at.naive_utc())
    .bind(wrong_increment)
    .bind(now.naive_utc())
    .fetch_one(pool)
    .await?;

    map_summary_row(&row)
}

/// Feedback for a word already under review.
///
/// The stored stage is clamped into the ladder range before scheduling.
/// Status is one-way: LEARNING flips to MASTERED only when the resulting
/// stage reaches the top through a Remember; a mastered record never
/// reverts, whatever later feedback says.
pub async fn submit_feedback(
    proxy: &DatabaseProxy,
    user_id: &str,
    progress_id: &str,
    feedback: Feedback,
    now: DateTime<Utc>,
) -> Result<ProgressSummary, ReviewError> {
    let pool = proxy.pool();

    let current = sqlx::query(
        r#"SELECT "stage", "status"::text AS "status" FROM "user_progress" WHERE "id" = $1 AND "userId" = $2"#,
    )
    .bind(progress_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    let Some(current) = current else {
        return Err(ReviewError::ProgressNotFound);
    };

    let stored_stage: i32 = current.try_get("stage")?;
    let status = ProgressStatus::from_db(current.try_get::<String, _>("status")?.as_str());

    let schedule = advance(clamp_stage(stored_stage), feedback, now);
    let wrong_increment: i32 = if feedback == Feedback::Forgot { 1 } else { 0 };

    let next_status = resolve_status(status, schedule.next_stage, feedback);

    // One statement: the wrong-count increment happens in SQL, so a double
    // submit cannot lose an update.
    let row = sqlx::query(
        r#"
        UPDATE "user_progress"
        SET "stage" = $1,
            "nextReviewTime" = $2,
            "lastReviewedAt" = $3,
            "wrongCount" = "wrongCount" + $4,
            "status" = $5::"ProgressStatus"
        WHERE "id" = $6 AND "userId" = $7
        RETURNING "id", "stage", "nextReviewTime", "status"::text AS "status"
        "#,
    )
    .bind(schedule.next_stage as i32)
    .bind(schedule.next_review_at.naive_utc())
    .bind(now.naive_utc())
    .bind(wrong_increment)
    .bind(next_status.as_db())
    .bind(progress_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => map_summary_row(&row),
        None => Err(ReviewError::ProgressNotFound),
    }
}

/// Status transition for one feedback submission. MASTERED is terminal:
/// later feedback can still move the stage and count wrong answers, but
/// never reinstates the word into the learning queue.
fn resolve_status(current: ProgressStatus, next_stage: u8, feedback: Feedback) -> ProgressStatus {
    match current {
        ProgressStatus::Mastered => ProgressStatus::Mastered,
        ProgressStatus::Learning if masters(next_stage, feedback) => ProgressStatus::Mastered,
        ProgressStatus::Learning => ProgressStatus::Learning,
    }
}

fn map_summary_row(row: &sqlx::postgres::PgRow) -> Result<ProgressSummary, ReviewError> {
    let next_review: NaiveDateTime = row.try_get("nextReviewTime")?;
    let status: String = row.try_get("status")?;

    Ok(ProgressSummary {
        id: row.try_get("id")?,
        stage: row.try_get("stage")?,
        next_review_time: format_naive_iso(next_review),
        status: ProgressStatus::from_db(&status).as_wire(),
    })
}

fn format_naive_iso(value: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(value, Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_feedback_wire_values() {
        assert_eq!(parse_feedback("remember"), Some(Feedback::Remember));
        assert_eq!(parse_feedback("fuzzy"), Some(Feedback::Fuzzy));
        assert_eq!(parse_feedback("forgot"), Some(Feedback::Forgot));
        assert_eq!(parse_feedback("green"), None);
        assert_eq!(parse_feedback(""), None);
    }

    #[test]
    fn test_learning_masters_only_on_remember_at_top() {
        assert_eq!(
            resolve_status(ProgressStatus::Learning, 8, Feedback::Remember),
            ProgressStatus::Mastered
        );
        assert_eq!(
            resolve_status(ProgressStatus::Learning, 8, Feedback::Fuzzy),
            ProgressStatus::Learning
        );
        assert_eq!(
            resolve_status(ProgressStatus::Learning, 1, Feedback::Forgot),
            ProgressStatus::Learning
        );
        assert_eq!(
            resolve_status(ProgressStatus::Learning, 7, Feedback::Remember),
            ProgressStatus::Learning
        );
    }

    #[test]
    fn test_mastered_is_terminal() {
        for feedback in [Feedback::Remember, Feedback::Fuzzy, Feedback::Forgot] {
            for next_stage in [1u8, 8u8] {
                assert_eq!(
                    resolve_status(ProgressStatus::Mastered, next_stage, feedback),
                    ProgressStatus::Mastered
                );
            }
        }
    }

    #[test]
    fn test_status_round_trip() {
        assert_eq!(ProgressStatus::from_db("MASTERED"), ProgressStatus::Mastered);
        assert_eq!(ProgressStatus::from_db("LEARNING"), ProgressStatus::Learning);
        assert_eq!(ProgressStatus::Learning.as_wire(), "learning");
        assert_eq!(ProgressStatus::Mastered.as_db(), "MASTERED");
    }
}
