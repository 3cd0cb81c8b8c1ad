#![allow(dead_code)]

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod response;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::state::AppState;

pub async fn create_app() -> axum::Router {
    let config = Config::from_env();
    let db_proxy = db::DatabaseProxy::from_env().await.ok();
    let state = AppState::new(config, db_proxy);

    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
