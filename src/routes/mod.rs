// Route exports
pub mod matches;
pub mod watcher;

use crate::core::{Matcher, RetrievalMode};
use crate::models::{ErrorResponse, WatcherConfig};
use crate::services::{NotifiedStore, PoolLoader};
use actix_web::{web, HttpResponse};
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub pools: Arc<PoolLoader>,
    pub notified: Arc<NotifiedStore>,
    pub matcher: Matcher,
    pub default_mode: RetrievalMode,
    pub watcher: WatcherConfig,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(matches::configure)
            .configure(watcher::configure),
    );
}

pub(crate) fn bad_request(error: &str, message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: error.to_string(),
        message: message.into(),
        status_code: 400,
    })
}

pub(crate) fn internal_error(error: &str, message: impl Into<String>) -> HttpResponse {
    HttpResponse::InternalServerError().json(ErrorResponse {
        error: error.to_string(),
        message: message.into(),
        status_code: 500,
    })
}
