use super::{bad_request, internal_error, AppState};
use crate::core::{normalize_profile, rank_rooms_with, red_flags, score_pair, PipelineOptions, RetrievalMode, RoomFilters};
use crate::models::{
    ErrorResponse, HealthResponse, PairScoreRequest, PairScoreResponse, RawProfile,
    RoomSuggestRequest, RoomSuggestResponse, TopMatchesRequest, TopMatchesResponse,
};
use crate::services::{profile_key, resolve_scope};
use actix_web::{web, HttpResponse, Responder};
use serde_json::json;
use validator::Validate;

/// Configure matching and room routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/matches/top", web::post().to(top_matches))
        .route("/pairs/score", web::post().to(pair_score))
        .route("/rooms/suggest", web::post().to(suggest_rooms));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = state.notified.health_check().await;
    let status = if store_healthy { "healthy" } else { "degraded" };
    let (cached_profiles, cached_listings) = state.pools.cached_sizes().await;

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        default_mode: state.default_mode.to_string(),
        cached_profiles,
        cached_listings,
        redis_enabled: state.pools.cache().stats().redis_enabled,
        timestamp: chrono::Utc::now(),
    })
}

/// Top matches endpoint
///
/// POST /api/v1/matches/top
///
/// Request body:
/// ```json
/// {
///   "profile": { "city": "Lahore", "budget_pkr": 20000 },
///   "k": 5,
///   "mode": "degraded",
///   "matchConfig": { "weights": { ... }, "anchor_buckets": [[2, 1.0]] },
///   "scope": "fast-lhr"
/// }
/// ```
///
/// Notified ids are read for the seeker but never written here.
async fn top_matches(
    state: web::Data<AppState>,
    req: web::Json<TopMatchesRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for top_matches request: {:?}", errors);
        return bad_request("Validation failed", errors.to_string());
    }

    let req = req.into_inner();
    let mode = req
        .mode
        .as_deref()
        .map(RetrievalMode::parse)
        .unwrap_or(state.default_mode);
    let scope = resolve_scope(req.scope.as_deref(), &req.profile);
    let key = profile_key(&req.profile);

    let profiles = match state.pools.profiles().await {
        Ok(profiles) => profiles,
        Err(e) => {
            tracing::error!("Failed to load profile pool: {}", e);
            return internal_error("Failed to load profiles", e.to_string());
        }
    };
    let listings = match state.pools.listings().await {
        Ok(listings) => listings,
        Err(e) => {
            tracing::error!("Failed to load listing pool: {}", e);
            return internal_error("Failed to load listings", e.to_string());
        }
    };

    let notified_match_ids = match state.notified.fetch_notified_matches(&scope, &key).await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::warn!("Failed to fetch notified matches for {}/{}, treating all as new: {}", scope, key, e);
            Default::default()
        }
    };

    let matcher = state
        .matcher
        .with_overrides(req.match_config, req.retrieval_config);
    let options = PipelineOptions {
        mode,
        top_k: req.k,
        notified_match_ids,
    };
    let result = matcher.run_pipeline(&req.profile, &profiles, &listings, &options);

    tracing::info!(
        "Returning {} matches and {} rooms for {}/{} (mode: {}, pool: {})",
        result.matches.len(),
        result.rooms.len(),
        scope,
        key,
        result.mode,
        profiles.len()
    );

    HttpResponse::Ok().json(TopMatchesResponse {
        mode: result.mode,
        matches: result.matches,
        rooms: result.rooms,
        trace: result.trace,
        newly_observed_ids: result.newly_observed_ids,
        scope,
        profile_key: key,
    })
}

/// Pair score endpoint
///
/// POST /api/v1/pairs/score
///
/// Scores `aId` (as seeker) against `bId`; 404 when either is unknown.
async fn pair_score(
    state: web::Data<AppState>,
    req: web::Json<PairScoreRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return bad_request("Validation failed", errors.to_string());
    }

    let lookup = async {
        let a = state.pools.profile(&req.a_id).await?;
        let b = state.pools.profile(&req.b_id).await?;
        Ok::<_, crate::services::StoreError>(a.zip(b))
    };

    let (a, b) = match lookup.await {
        Ok(Some(pair)) => pair,
        Ok(None) => {
            return HttpResponse::NotFound().json(ErrorResponse {
                error: "Not found".to_string(),
                message: "profile not found".to_string(),
                status_code: 404,
            });
        }
        Err(e) => {
            tracing::error!("Failed to fetch profiles {} / {}: {}", req.a_id, req.b_id, e);
            return internal_error("Failed to fetch profiles", e.to_string());
        }
    };

    let score = score_pair(&a, &b, state.matcher.match_config());
    let conflicts = red_flags(&a, &b);

    tracing::debug!("Pair {} / {} scored {}", req.a_id, req.b_id, score.total);

    HttpResponse::Ok().json(PairScoreResponse {
        a_id: req.a_id.clone(),
        b_id: req.b_id.clone(),
        score: score.total,
        reasons: score.reasons,
        subscores: score.subscores,
        conflicts,
    })
}

/// Room suggestion endpoint
///
/// POST /api/v1/rooms/suggest
///
/// Request body:
/// ```json
/// {
///   "city": "Lahore",
///   "perPersonBudget": 20000,
///   "neededAmenities": ["wifi", "ac"],
///   "k": 5
/// }
/// ```
async fn suggest_rooms(
    state: web::Data<AppState>,
    req: web::Json<RoomSuggestRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return bad_request("Validation failed", errors.to_string());
    }

    let listings = match state.pools.listings().await {
        Ok(listings) => listings,
        Err(e) => {
            tracing::error!("Failed to load listing pool: {}", e);
            return internal_error("Failed to load listings", e.to_string());
        }
    };

    let query = normalize_profile(&RawProfile {
        city: Some(req.city.clone()),
        budget_pkr: Some(json!(req.per_person_budget)),
        ..Default::default()
    });
    let filters = RoomFilters::with_amenities(&req.needed_amenities);
    let rooms = rank_rooms_with(&query, &listings, req.k, &filters);

    tracing::info!(
        "Suggesting {} of {} listings in {}",
        rooms.len(),
        listings.len(),
        req.city
    );

    HttpResponse::Ok().json(RoomSuggestResponse {
        total_results: rooms.len(),
        rooms,
    })
}
