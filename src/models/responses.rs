use crate::core::{RetrievalMode, Trace};
use crate::models::domain::{Conflict, RankedRoom, ScoredMatch, SubScores};
use serde::{Deserialize, Serialize};

/// Response for the top matches endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopMatchesResponse {
    pub mode: RetrievalMode,
    pub matches: Vec<ScoredMatch>,
    pub rooms: Vec<RankedRoom>,
    pub trace: Trace,
    pub newly_observed_ids: Vec<String>,
    pub scope: String,
    pub profile_key: String,
}

/// Response for the pair scoring endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairScoreResponse {
    pub a_id: String,
    pub b_id: String,
    pub score: u32,
    pub reasons: Vec<String>,
    pub subscores: SubScores,
    pub conflicts: Vec<Conflict>,
}

/// Response for the room suggestion endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSuggestResponse {
    pub rooms: Vec<RankedRoom>,
    pub total_results: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub default_mode: String,
    pub cached_profiles: Option<usize>,
    pub cached_listings: Option<usize>,
    pub redis_enabled: bool,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
