use crate::models::{MatchScoreConfig, RawProfile, RetrievalConfig, WatcherConfig};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request for the top matches of a seeker profile
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TopMatchesRequest {
    pub profile: RawProfile,
    #[validate(range(min = 1, max = 50))]
    #[serde(default = "default_k")]
    pub k: usize,
    /// "online" or "degraded"; anything else means degraded
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default, alias = "match_config", rename = "matchConfig")]
    pub match_config: Option<MatchScoreConfig>,
    #[serde(default, alias = "retrieval_config", rename = "retrievalConfig")]
    pub retrieval_config: Option<RetrievalConfig>,
    #[validate(length(min = 1))]
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_k() -> usize {
    5
}

/// Request to score two stored profiles against each other
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PairScoreRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "a_id", rename = "aId")]
    pub a_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "b_id", rename = "bId")]
    pub b_id: String,
}

/// Request for room suggestions without a full profile
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RoomSuggestRequest {
    #[validate(length(min = 1))]
    pub city: String,
    #[validate(range(min = 1))]
    #[serde(alias = "per_person_budget", rename = "perPersonBudget")]
    pub per_person_budget: i64,
    #[serde(default, alias = "needed_amenities", rename = "neededAmenities")]
    pub needed_amenities: Vec<String>,
    #[validate(range(min = 1, max = 50))]
    #[serde(default = "default_k")]
    pub k: usize,
}

/// Request to run one auto-hunt cycle
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WatcherRunRequest {
    pub profile: RawProfile,
    #[validate(length(min = 1))]
    #[serde(default, alias = "institution_id", rename = "institutionId")]
    pub institution_id: Option<String>,
    #[serde(default)]
    pub config: Option<WatcherConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_top_matches_defaults() {
        let req: TopMatchesRequest =
            serde_json::from_value(json!({"profile": {"city": "Lahore"}})).unwrap();
        assert_eq!(req.k, 5);
        assert!(req.mode.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_top_matches_k_bounds() {
        let req: TopMatchesRequest =
            serde_json::from_value(json!({"profile": {}, "k": 0})).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_pair_request_accepts_both_casings() {
        let camel: PairScoreRequest =
            serde_json::from_value(json!({"aId": "a", "bId": "b"})).unwrap();
        let snake: PairScoreRequest =
            serde_json::from_value(json!({"a_id": "a", "b_id": "b"})).unwrap();
        assert_eq!(camel.a_id, snake.a_id);

        let empty: PairScoreRequest =
            serde_json::from_value(json!({"aId": "", "bId": "b"})).unwrap();
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_room_suggest_budget_must_be_positive() {
        let req: RoomSuggestRequest = serde_json::from_value(
            json!({"city": "Lahore", "perPersonBudget": 0, "neededAmenities": ["wifi"]}),
        )
        .unwrap();
        assert!(req.validate().is_err());
    }
}
