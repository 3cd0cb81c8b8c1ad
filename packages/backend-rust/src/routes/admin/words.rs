use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, QueryBuilder};

use crate::auth::check_admin;
use crate::response::{json_error, AppError};
use crate::routes::{get_query_param, map_word_row, split_body, WordPayload, WORD_COLUMNS};
use crate::services::enrichment::{
    self, enrich_words_batch, EnrichedWord, ParsedWord, Sentence,
};
use crate::state::AppState;

const MAX_PAGE_SIZE: i64 = 100;

#[derive(Serialize)]
struct WordListResponse {
    words: Vec<WordPayload>,
    pagination: Pagination,
}

#[derive(Serialize)]
struct Pagination {
    page: i64,
    limit: i64,
    total: i64,
    pages: i64,
}

#[derive(Serialize)]
struct WordResponse {
    word: WordPayload,
}

#[derive(Serialize)]
struct DeleteResponse {
    success: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateWordRequest {
    spelling: String,
    phonetic: Option<String>,
    meanings: Option<Vec<String>>,
    collocations: Option<Vec<String>>,
    sentences: Option<Vec<Sentence>>,
    is_custom: Option<bool>,
    audio_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateWordRequest {
    id: String,
    spelling: Option<String>,
    phonetic: Option<String>,
    meanings: Option<Vec<String>>,
    collocations: Option<Vec<String>>,
    sentences: Option<Vec<Sentence>>,
    is_custom: Option<bool>,
    audio_url: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct BatchImportRequest {
    words: String,
}

#[derive(Serialize)]
struct BatchImportResponse {
    total: usize,
    success: usize,
    failed: usize,
    skipped: usize,
    details: BatchDetails,
}

#[derive(Serialize, Default)]
struct BatchDetails {
    success: Vec<String>,
    failed: Vec<FailedWord>,
    skipped: Vec<String>,
}

#[derive(Serialize)]
struct FailedWord {
    word: String,
    reason: String,
}

pub async fn list_words(State(state): State<AppState>, req: Request<Body>) -> Response {
    if let Err(err) = check_admin(req.headers(), state.config().as_ref()) {
        return err.into_response();
    }

    let query_string = req.uri().query().unwrap_or("");
    let search = get_query_param(query_string, "search").unwrap_or_default();
    let page = get_query_param(query_string, "page")
        .and_then(|value| value.parse::<i64>().ok())
        .filter(|value| *value >= 1)
        .unwrap_or(1);
    let limit = get_query_param(query_string, "limit")
        .and_then(|value| value.parse::<i64>().ok())
        .filter(|value| *value >= 1)
        .unwrap_or(20)
        .min(MAX_PAGE_SIZE);

    let Some(proxy) = state.db_proxy() else {
        return json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "服务不可用",
        )
        .into_response();
    };

    let (words, total) = match select_words_page(proxy.pool(), &search, page, limit).await {
        Ok(result) => result,
        Err(err) => {
            tracing::warn!(error = %err, "words list query failed");
            return json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "服务器内部错误",
            )
            .into_response();
        }
    };

    Json(WordListResponse {
        words,
        pagination: Pagination {
            page,
            limit,
            total,
            pages: (total + limit - 1) / limit,
        },
    })
    .into_response()
}

pub async fn create_word(State(state): State<AppState>, req: Request<Body>) -> Response {
    let (parts, body_bytes) = match split_body(req).await {
        Ok(value) => value,
        Err(res) => return res,
    };

    if let Err(err) = check_admin(&parts.headers, state.config().as_ref()) {
        return err.into_response();
    }

    let payload: CreateWordRequest = match serde_json::from_slice(&body_bytes) {
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

    let spelling = payload.spelling.trim().to_lowercase();
    if spelling.is_empty() {
        return json_error(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "单词拼写不能为空",
        )
        .into_response();
    }

    let Some(proxy) = state.db_proxy() else {
        return json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "服务不可用",
        )
        .into_response();
    };

    let word = WordPayload {
        id: uuid::Uuid::new_v4().to_string(),
        spelling,
        phonetic: payload.phonetic.unwrap_or_default(),
        meanings: payload.meanings.unwrap_or_default(),
        collocations: payload.collocations.unwrap_or_default(),
        sentences: payload.sentences.unwrap_or_default(),
        is_custom: payload.is_custom.unwrap_or(true),
        audio_url: payload.audio_url,
        created_at: crate::routes::format_naive_iso(Utc::now().naive_utc()),
    };

    match insert_word(proxy.pool(), &word).await {
        Ok(()) => (StatusCode::CREATED, Json(WordResponse { word })).into_response(),
        Err(err) if is_unique_violation(&err) => {
            AppError::conflict("单词已存在").into_response()
        }
        Err(err) => {
            tracing::warn!(error = %err, "word insert failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "服务器内部错误",
            )
            .into_response()
        }
    }
}

pub async fn update_word(State(state): State<AppState>, req: Request<Body>) -> Response {
    let (parts, body_bytes) = match split_body(req).await {
        Ok(value) => value,
        Err(res) => return res,
    };

    if let Err(err) = check_admin(&parts.headers, state.config().as_ref()) {
        return err.into_response();
    }

    let payload: UpdateWordRequest = match serde_json::from_slice(&body_bytes) {
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

    if payload.id.trim().is_empty() {
        return json_error(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "缺少单词 ID",
        )
        .into_response();
    }

    if let Some(spelling) = payload.spelling.as_ref() {
        if spelling.trim().is_empty() {
            return json_error(
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "单词拼写不能为空",
            )
            .into_response();
        }
    }

    let Some(proxy) = state.db_proxy() else {
        return json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "服务不可用",
        )
        .into_response();
    };

    let existing = match select_word_by_id(proxy.pool(), &payload.id).await {
        Ok(Some(word)) => word,
        Ok(None) => {
            return json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "单词不存在").into_response();
        }
        Err(err) => {
            tracing::warn!(error = %err, "word lookup failed");
            return json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "服务器内部错误",
            )
            .into_response();
        }
    };

    let updated = WordPayload {
        spelling: payload
            .spelling
            .as_ref()
            .map(|s| s.trim().to_lowercase())
            .unwrap_or_else(|| existing.spelling.clone()),
        phonetic: payload.phonetic.unwrap_or_else(|| existing.phonetic.clone()),
        meanings: payload
            .meanings
            .unwrap_or_else(|| existing.meanings.clone()),
        collocations: payload
            .collocations
            .unwrap_or_else(|| existing.collocations.clone()),
        sentences: payload
            .sentences
            .unwrap_or_else(|| existing.sentences.clone()),
        is_custom: payload.is_custom.unwrap_or(existing.is_custom),
        audio_url: match payload.audio_url {
            Some(value) => value,
            None => existing.audio_url.clone(),
        },
        ..existing
    };

    match apply_word_update(proxy.pool(), &updated).await {
        Ok(()) => Json(WordResponse { word: updated }).into_response(),
        Err(err) if is_unique_violation(&err) => {
            AppError::conflict("单词已存在").into_response()
        }
        Err(err) => {
            tracing::warn!(error = %err, "word update failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "服务器内部错误",
            )
            .into_response()
        }
    }
}

pub async fn delete_word(State(state): State<AppState>, req: Request<Body>) -> Response {
    if let Err(err) = check_admin(req.headers(), state.config().as_ref()) {
        return err.into_response();
    }

    let query_string = req.uri().query().unwrap_or("");
    let word_id = get_query_param(query_string, "id").unwrap_or_default();
    if word_id.is_empty() {
        return json_error(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "缺少单词 ID",
        )
        .into_response();
    }

    let Some(proxy) = state.db_proxy() else {
        return json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "服务不可用",
        )
        .into_response();
    };

    match delete_word_record(proxy.pool(), &word_id).await {
        Ok(true) => Json(DeleteResponse { success: true }).into_response(),
        Ok(false) => json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "单词不存在").into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "word delete failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "服务器内部错误",
            )
            .into_response()
        }
    }
}

/// Batch import: parse `word meaning` lines, skip words already in the
/// catalog, enrich the remaining batch with one LLM call, insert the
/// results. An enrichment failure fails the whole pending batch — no
/// partial credit, no retry.
pub async fn batch_import(State(state): State<AppState>, req: Request<Body>) -> Response {
    let (parts, body_bytes) = match split_body(req).await {
        Ok(value) => value,
        Err(res) => return res,
    };

    if let Err(err) = check_admin(&parts.headers, state.config().as_ref()) {
        return err.into_response();
    }

    let payload: BatchImportRequest = match serde_json::from_slice(&body_bytes) {
        Ok(payload) => payload,
        Err(_) => {
            return json_error(
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "words 文本不能为空",
            )
            .into_response();
        }
    };

    let parsed = enrichment::parse_batch_input(&payload.words);
    if parsed.is_empty() {
        return json_error(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "未找到有效的单词输入",
        )
        .into_response();
    }

    let Some(proxy) = state.db_proxy() else {
        return json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "服务不可用",
        )
        .into_response();
    };

    let total = parsed.len();
    let mut details = BatchDetails::default();

    let existing = match select_existing_spellings(proxy.pool(), &parsed).await {
        Ok(existing) => existing,
        Err(err) => {
            tracing::warn!(error = %err, "existing words lookup failed");
            return json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "服务器内部错误",
            )
            .into_response();
        }
    };

    let mut pending: Vec<ParsedWord> = Vec::new();
    for word in parsed {
        if existing.contains(&word.word) {
            details.skipped.push(word.word);
        } else {
            pending.push(word);
        }
    }

    if pending.is_empty() {
        return Json(batch_response(total, details)).into_response();
    }

    let enriched = match enrich_words_batch(state.llm().as_ref(), &pending).await {
        Ok(enriched) => enriched,
        Err(err) => {
            // The whole pending batch fails as a unit
            let reason = err.to_string();
            tracing::warn!(error = %reason, "batch enrichment failed");
            for word in pending {
                details.failed.push(FailedWord {
                    word: word.word,
                    reason: reason.clone(),
                });
            }
            return Json(batch_response(total, details)).into_response();
        }
    };

    for item in enriched {
        match insert_enriched_word(proxy.pool(), &item).await {
            Ok(()) => details.success.push(item.word),
            Err(err) => {
                tracing::warn!(error = %err, word = %item.word, "enriched word insert failed");
                details.failed.push(FailedWord {
                    word: item.word,
                    reason: err.to_string(),
                });
            }
        }
    }

    Json(batch_response(total, details)).into_response()
}

fn batch_response(total: usize, details: BatchDetails) -> BatchImportResponse {
    BatchImportResponse {
        total,
        success: details.success.len(),
        failed: details.failed.len(),
        skipped: details.skipped.len(),
        details,
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

async fn select_words_page(
    pool: &PgPool,
    search: &str,
    page: i64,
    limit: i64,
) -> Result<(Vec<WordPayload>, i64), sqlx::Error> {
    let pattern = if search.trim().is_empty() {
        None
    } else {
        Some(format!("%{}%", escape_like(&search.trim().to_lowercase())))
    };

    let mut count_qb = QueryBuilder::<sqlx::Postgres>::new(r#"SELECT COUNT(*) FROM "words" w"#);
    if let Some(ref pattern) = pattern {
        count_qb.push(r#" WHERE lower(w."spelling") LIKE "#);
        count_qb.push_bind(pattern.clone());
        count_qb.push(r#" ESCAPE '\'"#);
    }
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::<sqlx::Postgres>::new(format!(
        r#"SELECT {WORD_COLUMNS} FROM "words" w"#
    ));
    if let Some(ref pattern) = pattern {
        qb.push(r#" WHERE lower(w."spelling") LIKE "#);
        qb.push_bind(pattern.clone());
        qb.push(r#" ESCAPE '\'"#);
    }
    qb.push(r#" ORDER BY w."createdAt" DESC LIMIT "#);
    qb.push_bind(limit);
    qb.push(" OFFSET ");
    qb.push_bind((page - 1) * limit);

    let rows = qb.build().fetch_all(pool).await?;
    Ok((rows.iter().map(map_word_row).collect(), total))
}

async fn select_word_by_id(
    pool: &PgPool,
    word_id: &str,
) -> Result<Option<WordPayload>, sqlx::Error> {
    let sql = format!(r#"SELECT {WORD_COLUMNS} FROM "words" w WHERE w."id" = $1 LIMIT 1"#);
    let row = sqlx::query(&sql).bind(word_id).fetch_optional(pool).await?;
    Ok(row.as_ref().map(map_word_row))
}

async fn insert_word(pool: &PgPool, word: &WordPayload) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "words"
          ("id","spelling","phonetic","meanings","collocations","sentences","isCustom","audioUrl","createdAt")
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
        "#,
    )
    .bind(&word.id)
    .bind(&word.spelling)
    .bind(&word.phonetic)
    .bind(&word.meanings)
    .bind(&word.collocations)
    .bind(sqlx::types::Json(&word.sentences))
    .bind(word.is_custom)
    .bind(&word.audio_url)
    .bind(Utc::now().naive_utc())
    .execute(pool)
    .await?;
    Ok(())
}

async fn insert_enriched_word(pool: &PgPool, item: &EnrichedWord) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "words"
          ("id","spelling","phonetic","meanings","collocations","sentences","isCustom","createdAt")
        VALUES ($1,$2,$3,$4,$5,$6,TRUE,$7)
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&item.word)
    .bind(&item.phonetic)
    .bind(vec![item.meaning.clone()])
    .bind(&item.collocations)
    .bind(sqlx::types::Json(&item.sentences))
    .bind(Utc::now().naive_utc())
    .execute(pool)
    .await?;
    Ok(())
}

async fn apply_word_update(pool: &PgPool, word: &WordPayload) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE "words"
        SET "spelling" = $1,
            "phonetic" = $2,
            "meanings" = $3,
            "collocations" = $4,
            "sentences" = $5,
            "isCustom" = $6,
            "audioUrl" = $7
        WHERE "id" = $8
        "#,
    )
    .bind(&word.spelling)
    .bind(&word.phonetic)
    .bind(&word.meanings)
    .bind(&word.collocations)
    .bind(sqlx::types::Json(&word.sentences))
    .bind(word.is_custom)
    .bind(&word.audio_url)
    .bind(&word.id)
    .execute(pool)
    .await?;
    Ok(())
}

async fn delete_word_record(pool: &PgPool, word_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM "words" WHERE "id" = $1"#)
        .bind(word_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

async fn select_existing_spellings(
    pool: &PgPool,
    parsed: &[ParsedWord],
) -> Result<std::collections::HashSet<String>, sqlx::Error> {
    let spellings: Vec<String> = parsed.iter().map(|w| w.word.clone()).collect();
    let existing: Vec<String> =
        sqlx::query_scalar(r#"SELECT "spelling" FROM "words" WHERE "spelling" = ANY($1)"#)
            .bind(&spellings)
            .fetch_all(pool)
            .await?;
    Ok(existing.into_iter().collect())
}

fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '%' | '_' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            other => out.push(other),
        }
    }
    out
}
