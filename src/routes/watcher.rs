use super::{bad_request, internal_error, AppState};
use crate::models::WatcherRunRequest;
use crate::services::{
    resolve_scope, run_auto_hunt_cycle, watcher_config_for, LogSink, WatcherContext, WebhookSink,
};
use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/watcher/run", web::post().to(run_watcher));
}

/// Run one auto-hunt cycle
///
/// POST /api/v1/watcher/run
///
/// Request body:
/// ```json
/// {
///   "profile": { "id": "u1", "city": "Lahore" },
///   "institutionId": "fast-lhr",
///   "config": { "min_score": 60, "channels": ["email"] }
/// }
/// ```
///
/// Without an explicit config the scope's stored override applies, then the
/// service default. New matches go to the log sink and any configured partner
/// webhooks; the notified set is updated afterwards.
async fn run_watcher(
    state: web::Data<AppState>,
    req: web::Json<WatcherRunRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return bad_request("Validation failed", errors.to_string());
    }

    let req = req.into_inner();
    let scope = resolve_scope(req.institution_id.as_deref(), &req.profile);
    let config = match req.config {
        Some(config) => config,
        None => watcher_config_for(state.notified.as_ref(), &scope, &state.watcher).await,
    };

    let webhooks = match WebhookSink::new(config.partner_webhooks.clone()) {
        Ok(sink) => sink,
        Err(e) => return bad_request("Invalid watcher config", e.to_string()),
    };
    let sink = (LogSink, webhooks);

    let ctx = WatcherContext {
        matcher: &state.matcher,
        source: state.pools.source(),
        store: state.notified.as_ref(),
        sink: &sink,
    };

    match run_auto_hunt_cycle(&req.profile, &scope, config, &ctx).await {
        Ok(outcome) => {
            tracing::info!(
                "Watcher cycle for {}/{}: {} new of {} matches",
                outcome.scope,
                outcome.profile_key,
                outcome.new_matches.len(),
                outcome.result.matches.len()
            );
            HttpResponse::Ok().json(outcome)
        }
        Err(e) => {
            tracing::error!("Watcher cycle failed for scope {}: {}", scope, e);
            internal_error("Watcher cycle failed", e.to_string())
        }
    }
}
