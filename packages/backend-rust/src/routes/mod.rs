mod admin;
mod health;
mod review;
mod stats;
mod today;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::Serialize;
use sqlx::Row;

use crate::response::json_error;
use crate::services::enrichment::Sentence;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/words/today",
            get(today::today_words).fallback(fallback_handler),
        )
        .route(
            "/api/words/review",
            post(review::submit_review).fallback(fallback_handler),
        )
        .route(
            "/api/words/review-list",
            get(review::review_list).fallback(fallback_handler),
        )
        .route(
            "/api/stats/heatmap",
            get(stats::heatmap).fallback(fallback_handler),
        )
        .route(
            "/api/admin/words",
            get(admin::words::list_words)
                .post(admin::words::create_word)
                .put(admin::words::update_word)
                .delete(admin::words::delete_word)
                .fallback(fallback_handler),
        )
        .route(
            "/api/admin/words/batch",
            post(admin::words::batch_import).fallback(fallback_handler),
        )
        .route(
            "/api/admin/quote",
            get(admin::quotes::get_quotes)
                .put(admin::quotes::update_quotes)
                .fallback(fallback_handler),
        )
        .nest("/health", health::router())
        .nest("/api/health", health::router())
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "接口不存在").into_response()
}

// ============================================================================
// Shared word payload
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WordPayload {
    pub id: String,
    pub spelling: String,
    pub phonetic: String,
    pub meanings: Vec<String>,
    pub collocations: Vec<String>,
    pub sentences: Vec<Sentence>,
    pub is_custom: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    pub created_at: String,
}

pub(crate) fn map_word_row(row: &sqlx::postgres::PgRow) -> WordPayload {
    let created_at: NaiveDateTime = row
        .try_get("createdAt")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let sentences: Vec<Sentence> = row
        .try_get::<sqlx::types::Json<Vec<Sentence>>, _>("sentences")
        .map(|json| json.0)
        .unwrap_or_default();

    WordPayload {
        id: row.try_get("id").unwrap_or_default(),
        spelling: row.try_get("spelling").unwrap_or_default(),
        phonetic: row.try_get("phonetic").unwrap_or_default(),
        meanings: row
            .try_get::<Vec<String>, _>("meanings")
            .unwrap_or_default(),
        collocations: row
            .try_get::<Vec<String>, _>("collocations")
            .unwrap_or_default(),
        sentences,
        is_custom: row.try_get("isCustom").unwrap_or(false),
        audio_url: row.try_get::<Option<String>, _>("audioUrl").ok().flatten(),
        created_at: format_naive_iso(created_at),
    }
}

pub(crate) const WORD_COLUMNS: &str = r#"w."id", w."spelling", w."phonetic", w."meanings", w."collocations", w."sentences", w."isCustom", w."audioUrl", w."createdAt""#;

pub(crate) fn format_naive_iso(value: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(value, Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ============================================================================
// Request plumbing helpers
// ============================================================================

pub(crate) fn get_query_param(query: &str, key: &str) -> Option<String> {
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let mut iter = pair.splitn(2, '=');
        let k = iter.next().unwrap_or("");
        if k != key {
            continue;
        }
        let value = iter.next().unwrap_or("");
        return Some(percent_decode(value));
    }
    None
}

fn percent_decode(input: &str) -> String {
    let mut out: Vec<u8> = Vec::with_capacity(input.len());
    let mut bytes = input.as_bytes().iter().copied();
    while let Some(b) = bytes.next() {
        match b {
            b'+' => out.push(b' '),
            b'%' => {
                let hi = bytes.next();
                let lo = bytes.next();
                if let (Some(hi), Some(lo)) = (hi, lo) {
                    if let (Some(hi), Some(lo)) = (from_hex(hi), from_hex(lo)) {
                        out.push(hi * 16 + lo);
                        continue;
                    }
                }
                out.push(b'%');
                if let Some(hi) = hi {
                    out.push(hi);
                }
                if let Some(lo) = lo {
                    out.push(lo);
                }
            }
            other => out.push(other),
        }
    }
    String::from_utf8_lossy(&out).to_string()
}

fn from_hex(value: u8) -> Option<u8> {
    match value {
        b'0'..=b'9' => Some(value - b'0'),
        b'a'..=b'f' => Some(value - b'a' + 10),
        b'A'..=b'F' => Some(value - b'A' + 10),
        _ => None,
    }
}

pub(crate) async fn split_body(
    req: Request<Body>,
) -> Result<(axum::http::request::Parts, bytes::Bytes), Response> {
    let (parts, body) = req.into_parts();
    let body_bytes = match axum::body::to_bytes(body, 1024 * 1024).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return Err(
                json_error(StatusCode::BAD_REQUEST, "BAD_REQUEST", "无效请求").into_response(),
            );
        }
    };
    Ok((parts, body_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_query_param_decodes() {
        assert_eq!(
            get_query_param("search=%E5%8D%95%E8%AF%8D&page=2", "search").as_deref(),
            Some("单词")
        );
        assert_eq!(get_query_param("a=1&b=2", "b").as_deref(), Some("2"));
        assert_eq!(get_query_param("a=1", "c"), None);
        assert_eq!(get_query_param("q=hello+world", "q").as_deref(), Some("hello world"));
    }
}
