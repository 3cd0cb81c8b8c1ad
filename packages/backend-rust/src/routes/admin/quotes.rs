use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::response::json_error;
use crate::routes::split_body;
use crate::state::AppState;

const QUOTES_CONFIG_KEY: &str = "daily_quotes";

const DEFAULT_QUOTES: &[&str] = &[
    "每学会一个单词，就离目标更近一步",
    "一点一滴的积累，终将汇成星辰大海",
    "慢慢来，比较快",
    "今天也要加油哦",
    "学累了就休息一下，不要太辛苦",
    "每一次坚持都是对未来的投资",
    "温故而知新",
    "坚持复习，别让遗忘曲线赢",
];

#[derive(Serialize)]
struct QuotesResponse {
    quotes: Vec<String>,
}

#[derive(Serialize)]
struct UpdateQuotesResponse {
    success: bool,
    quotes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateQuotesRequest {
    quotes: Vec<String>,
}

pub async fn get_quotes(State(state): State<AppState>, _req: Request<Body>) -> Response {
    let Some(proxy) = state.db_proxy() else {
        return json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "服务不可用",
        )
        .into_response();
    };

    match select_quotes(proxy.pool()).await {
        Ok(Some(quotes)) => Json(QuotesResponse { quotes }).into_response(),
        Ok(None) => Json(QuotesResponse {
            quotes: DEFAULT_QUOTES.iter().map(|s| s.to_string()).collect(),
        })
        .into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "quotes query failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "服务器内部错误",
            )
            .into_response()
        }
    }
}

pub async fn update_quotes(State(state): State<AppState>, req: Request<Body>) -> Response {
    let (parts, body_bytes) = match split_body(req).await {
        Ok(value) => value,
        Err(res) => return res,
    };

    if let Err(err) = crate::auth::check_admin(&parts.headers, state.config().as_ref()) {
        return err.into_response();
    }

    let payload: UpdateQuotesRequest = match serde_json::from_slice(&body_bytes) {
        Ok(payload) => payload,
        Err(_) => {
            return json_error(
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "quotes 必须是字符串数组",
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

    if let Err(err) = upsert_quotes(proxy.pool(), &payload.quotes).await {
        tracing::warn!(error = %err, "quotes update failed");
        return json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "服务器内部错误",
        )
        .into_response();
    }

    Json(UpdateQuotesResponse {
        success: true,
        quotes: payload.quotes,
    })
    .into_response()
}

async fn select_quotes(pool: &PgPool) -> Result<Option<Vec<String>>, sqlx::Error> {
    let value: Option<serde_json::Value> =
        sqlx::query_scalar(r#"SELECT "value" FROM "configs" WHERE "key" = $1"#)
            .bind(QUOTES_CONFIG_KEY)
            .fetch_optional(pool)
            .await?
            .flatten();

    Ok(value.and_then(|raw| serde_json::from_value::<Vec<String>>(raw).ok()))
}

async fn upsert_quotes(pool: &PgPool, quotes: &[String]) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "configs" ("key", "value", "updatedAt")
        VALUES ($1, $2, $3)
        ON CONFLICT ("key") DO UPDATE SET
          "value" = EXCLUDED."value",
          "updatedAt" = EXCLUDED."updatedAt"
        "#,
    )
    .bind(QUOTES_CONFIG_KEY)
    .bind(serde_json::json!(quotes))
    .bind(Utc::now().naive_utc())
    .execute(pool)
    .await?;
    Ok(())
}
