use std::collections::HashMap;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};

use beici_algo::{ReviewCandidate, ReviewSelector};

use crate::response::json_error;
use crate::services::review::{self, parse_feedback, ProgressSummary, ReviewError, DEFAULT_USER_ID};
use crate::state::AppState;

use super::{get_query_param, map_word_row, split_body, WordPayload, WORD_COLUMNS};

const DEFAULT_QUEUE_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewRequest {
    word_id: Option<String>,
    progress_id: Option<String>,
    feedback: String,
    is_new_word: Option<bool>,
}

#[derive(Serialize)]
struct ReviewResponse {
    success: bool,
    progress: ProgressSummary,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReviewListResponse {
    reviews: Vec<ReviewItem>,
    stats: ReviewListStats,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReviewItem {
    progress_id: String,
    word: WordPayload,
    stage: i16,
    wrong_count: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReviewListStats {
    total: usize,
    all_learning: usize,
}

pub async fn submit_review(State(state): State<AppState>, req: Request<Body>) -> Response {
    let (_parts, body_bytes) = match split_body(req).await {
        Ok(value) => value,
        Err(res) => return res,
    };

    let payload: ReviewRequest = match serde_json::from_slice(&body_bytes) {
        Ok(payload) => payload,
        Err(_) => {
            return json_error(
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "请求参数不合法",
            )
            .into_response();
        }
    };

    let Some(feedback) = parse_feedback(&payload.feedback) else {
        return json_error(
            StatusCode::BAD_REQUEST,
            "INVALID_FEEDBACK",
            "无效的反馈类型",
        )
        .into_response();
    };

    // Validate the target before touching the store
    let is_new_word = payload.is_new_word.unwrap_or(false);
    let target = match (is_new_word, payload.word_id, payload.progress_id) {
        (true, Some(word_id), _) => ReviewTarget::NewWord(word_id),
        (_, _, Some(progress_id)) => ReviewTarget::Existing(progress_id),
        _ => {
            return json_error(
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "缺少 wordId 或 progressId",
            )
            .into_response();
        }
    };

    let Some(proxy) = state.db_proxy() else {
        return json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "服务不可用",
        )
        .into_response();
    };

    let now = Utc::now();
    let result = match target {
        ReviewTarget::NewWord(word_id) => {
            review::submit_new_word(proxy.as_ref(), DEFAULT_USER_ID, &word_id, feedback, now).await
        }
        ReviewTarget::Existing(progress_id) => {
            review::submit_feedback(proxy.as_ref(), DEFAULT_USER_ID, &progress_id, feedback, now)
                .await
        }
    };

    match result {
        Ok(progress) => Json(ReviewResponse {
            success: true,
            progress,
        })
        .into_response(),
        Err(ReviewError::WordNotFound) => {
            json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "单词不存在").into_response()
        }
        Err(ReviewError::ProgressNotFound) => {
            json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "进度记录不存在").into_response()
        }
        Err(err) => {
            tracing::warn!(error = %err, "review submit failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "服务器内部错误",
            )
            .into_response()
        }
    }
}

pub async fn review_list(State(state): State<AppState>, req: Request<Body>) -> Response {
    let query_string = req.uri().query().unwrap_or("");
    let limit = get_query_param(query_string, "limit")
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_QUEUE_LIMIT);
    let exclude = get_query_param(query_string, "exclude").filter(|value| !value.is_empty());

    let Some(proxy) = state.db_proxy() else {
        return json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "服务不可用",
        )
        .into_response();
    };

    let now = Utc::now();
    let records = match select_learning_records(proxy.pool(), DEFAULT_USER_ID).await {
        Ok(records) => records,
        Err(err) => {
            tracing::warn!(error = %err, "review list query failed");
            return json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "服务器内部错误",
            )
            .into_response();
        }
    };

    let all_learning = records.len();
    let candidates: Vec<ReviewCandidate> = records
        .iter()
        .map(|record| record.candidate.clone())
        .collect();

    let mut selector = ReviewSelector::new();
    let queue = selector.select(&candidates, now, exclude.as_deref(), limit);

    // The candidate id is the word id; map the ranked queue back onto the
    // loaded rows
    let mut by_word_id: HashMap<String, LearningRecord> = records
        .into_iter()
        .map(|record| (record.candidate.id.clone(), record))
        .collect();

    let reviews: Vec<ReviewItem> = queue
        .iter()
        .filter_map(|candidate| by_word_id.remove(&candidate.id))
        .map(|record| ReviewItem {
            progress_id: record.progress_id,
            stage: record.candidate.stage,
            wrong_count: record.candidate.wrong_count,
            word: record.word,
        })
        .collect();

    Json(ReviewListResponse {
        stats: ReviewListStats {
            total: reviews.len(),
            all_learning,
        },
        reviews,
    })
    .into_response()
}

enum ReviewTarget {
    NewWord(String),
    Existing(String),
}

struct LearningRecord {
    progress_id: String,
    candidate: ReviewCandidate,
    word: WordPayload,
}

async fn select_learning_records(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<LearningRecord>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT
          p."id" AS "progressId",
          p."stage",
          p."wrongCount",
          p."nextReviewTime",
          {WORD_COLUMNS}
        FROM "user_progress" p
        JOIN "words" w ON w."id" = p."wordId"
        WHERE p."userId" = $1 AND p."status" = 'LEARNING'
        "#
    );

    let rows = sqlx::query(&sql).bind(user_id).fetch_all(pool).await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in &rows {
        let word = map_word_row(row);
        let stage: i32 = row.try_get("stage")?;
        let wrong_count: i32 = row.try_get("wrongCount")?;
        let next_review: NaiveDateTime = row.try_get("nextReviewTime")?;

        records.push(LearningRecord {
            progress_id: row.try_get("progressId")?,
            candidate: ReviewCandidate {
                id: word.id.clone(),
                stage: stage as i16,
                wrong_count,
                next_review_at: DateTime::<Utc>::from_naive_utc_and_offset(next_review, Utc),
            },
            word,
        });
    }

    Ok(records)
}
