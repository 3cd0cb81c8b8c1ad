use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, NaiveTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::response::json_error;
use crate::services::review::DEFAULT_USER_ID;
use crate::state::AppState;

use super::{map_word_row, WordPayload, WORD_COLUMNS};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TodayResponse {
    new_words: Vec<NewWordEntry>,
    stats: TodayStats,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewWordEntry {
    word_id: String,
    word: WordPayload,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TodayStats {
    new_count: usize,
    learning_count: i64,
}

pub async fn today_words(State(state): State<AppState>, _req: Request<Body>) -> Response {
    let Some(proxy) = state.db_proxy() else {
        return json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "服务不可用",
        )
        .into_response();
    };

    let quota = state.config().daily_new_words;
    match build_today(proxy.pool(), DEFAULT_USER_ID, quota, Utc::now()).await {
        Ok(payload) => Json(payload).into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "today feed query failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "服务器内部错误",
            )
            .into_response()
        }
    }
}

async fn build_today(
    pool: &PgPool,
    user_id: &str,
    daily_quota: i64,
    now: DateTime<Utc>,
) -> Result<TodayResponse, sqlx::Error> {
    let today_start = now.date_naive().and_time(NaiveTime::MIN);

    // Words whose progress was touched today while still at the bottom of
    // the ladder count against the daily quota
    let new_words_today: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM "user_progress"
        WHERE "userId" = $1 AND "lastReviewedAt" >= $2 AND "stage" <= 1
        "#,
    )
    .bind(user_id)
    .bind(today_start)
    .fetch_one(pool)
    .await?;

    let needed = (daily_quota - new_words_today).max(0);
    let mut new_words: Vec<WordPayload> = Vec::new();

    if needed > 0 {
        // Custom words first, stock words fill the rest
        new_words = select_unlearned_words(pool, user_id, true, needed).await?;
        let remaining = needed - new_words.len() as i64;
        if remaining > 0 {
            new_words.extend(select_unlearned_words(pool, user_id, false, remaining).await?);
        }
    }

    let learning_count: i64 = sqlx::query_scalar(
        r#"SELECT COUNT(*) FROM "user_progress" WHERE "userId" = $1 AND "status" = 'LEARNING'"#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(TodayResponse {
        stats: TodayStats {
            new_count: new_words.len(),
            learning_count,
        },
        new_words: new_words
            .into_iter()
            .map(|word| NewWordEntry {
                word_id: word.id.clone(),
                word,
            })
            .collect(),
    })
}

async fn select_unlearned_words(
    pool: &PgPool,
    user_id: &str,
    custom: bool,
    limit: i64,
) -> Result<Vec<WordPayload>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {WORD_COLUMNS}
        FROM "words" w
        WHERE w."isCustom" = $2
          AND NOT EXISTS (
            SELECT 1 FROM "user_progress" p
            WHERE p."wordId" = w."id" AND p."userId" = $1
          )
        ORDER BY w."createdAt" ASC
        LIMIT $3
        "#
    );

    let rows = sqlx::query(&sql)
        .bind(user_id)
        .bind(custom)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(map_word_row).collect())
}
