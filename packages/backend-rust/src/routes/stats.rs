use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::{PgPool, Row};

use crate::response::json_error;
use crate::services::review::DEFAULT_USER_ID;
use crate::state::AppState;

use super::{map_word_row, WordPayload, WORD_COLUMNS};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    heatmap: Vec<HeatmapEntry>,
    stats: StatsTotals,
    top_wrong_words: Vec<TopWrongWord>,
}

#[derive(Serialize)]
struct HeatmapEntry {
    date: String,
    count: i64,
}

#[derive(Serialize)]
struct StatsTotals {
    learning: i64,
    mastered: i64,
    total: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TopWrongWord {
    word: WordPayload,
    wrong_count: i32,
}

pub async fn heatmap(State(state): State<AppState>, _req: Request<Body>) -> Response {
    let Some(proxy) = state.db_proxy() else {
        return json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "服务不可用",
        )
        .into_response();
    };

    match build_stats(proxy.pool(), DEFAULT_USER_ID, Utc::now()).await {
        Ok(payload) => Json(payload).into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "stats query failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "服务器内部错误",
            )
            .into_response()
        }
    }
}

async fn build_stats(
    pool: &PgPool,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<StatsResponse, sqlx::Error> {
    let one_year_ago = (now - Duration::days(365)).naive_utc();

    let rows = sqlx::query(
        r#"
        SELECT to_char("lastReviewedAt", 'YYYY-MM-DD') AS "day", COUNT(*) AS "count"
        FROM "user_progress"
        WHERE "userId" = $1 AND "lastReviewedAt" >= $2
        GROUP BY "day"
        ORDER BY "day" ASC
        "#,
    )
    .bind(user_id)
    .bind(one_year_ago)
    .fetch_all(pool)
    .await?;

    let heatmap = rows
        .iter()
        .map(|row| HeatmapEntry {
            date: row.try_get("day").unwrap_or_default(),
            count: row.try_get::<i64, _>("count").unwrap_or(0),
        })
        .collect();

    let learning = count_by_status(pool, user_id, "LEARNING").await?;
    let mastered = count_by_status(pool, user_id, "MASTERED").await?;

    let sql = format!(
        r#"
        SELECT p."wrongCount", {WORD_COLUMNS}
        FROM "user_progress" p
        JOIN "words" w ON w."id" = p."wordId"
        WHERE p."userId" = $1 AND p."wrongCount" > 0
        ORDER BY p."wrongCount" DESC
        LIMIT 10
        "#
    );
    let top_rows = sqlx::query(&sql).bind(user_id).fetch_all(pool).await?;

    let top_wrong_words = top_rows
        .iter()
        .map(|row| TopWrongWord {
            word: map_word_row(row),
            wrong_count: row.try_get("wrongCount").unwrap_or(0),
        })
        .collect();

    Ok(StatsResponse {
        heatmap,
        stats: StatsTotals {
            learning,
            mastered,
            total: learning + mastered,
        },
        top_wrong_words,
    })
}

async fn count_by_status(
    pool: &PgPool,
    user_id: &str,
    status: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM "user_progress"
        WHERE "userId" = $1 AND "status" = $2::"ProgressStatus"
        "#,
    )
    .bind(user_id)
    .bind(status)
    .fetch_one(pool)
    .await
}
