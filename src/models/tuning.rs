use serde::{Deserialize, Serialize};

/// Points per scoring criterion
///
/// Canonical values sum to 100. A criterion missing from an override is
/// worth 0; totals are never renormalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default)]
    pub city: u32,
    #[serde(default)]
    pub budget: u32,
    #[serde(default)]
    pub sleep: u32,
    #[serde(default)]
    pub cleanliness: u32,
    #[serde(default)]
    pub noise: u32,
    #[serde(default)]
    pub study: u32,
    #[serde(default)]
    pub smoking: u32,
    #[serde(default)]
    pub guests: u32,
    #[serde(default)]
    pub role: u32,
    #[serde(default)]
    pub anchor: u32,
}

impl ScoringWeights {
    /// Saturates instead of wrapping on oversized caller weights
    pub fn sum(&self) -> u32 {
        [
            self.city,
            self.budget,
            self.sleep,
            self.cleanliness,
            self.noise,
            self.study,
            self.smoking,
            self.guests,
            self.role,
            self.anchor,
        ]
        .into_iter()
        .fold(0, u32::saturating_add)
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            city: 10,
            budget: 20,
            sleep: 12,
            cleanliness: 12,
            noise: 8,
            study: 8,
            smoking: 8,
            guests: 7,
            role: 5,
            anchor: 10,
        }
    }
}

/// Anchor distance band: candidates within `max_km` earn `multiplier`
/// of the anchor weight. Also accepts the `[max_km, multiplier]` array form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorBucket {
    pub max_km: f64,
    pub multiplier: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AnchorBucket {
    pub fn new(max_km: f64, multiplier: f64) -> Self {
        Self {
            max_km,
            multiplier,
            reason: None,
        }
    }

    fn labelled(max_km: f64, multiplier: f64, reason: &str) -> Self {
        Self {
            max_km,
            multiplier,
            reason: Some(reason.to_string()),
        }
    }

    /// Reason recorded when this bucket is selected
    pub fn reason(&self) -> String {
        match &self.reason {
            Some(reason) => reason.clone(),
            None => format!("Anchors within {} km", self.max_km),
        }
    }
}

pub fn default_anchor_buckets() -> Vec<AnchorBucket> {
    vec![
        AnchorBucket::labelled(2.0, 1.0, "Same anchor location"),
        AnchorBucket::labelled(5.0, 0.8, "Anchors very close (<5 km)"),
        AnchorBucket::labelled(20.0, 0.5, "Anchors in same area (<20 km)"),
    ]
}

/// Immutable scorer configuration snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchScoreConfig {
    #[serde(default)]
    pub weights: ScoringWeights,
    #[serde(default = "default_anchor_buckets")]
    pub anchor_buckets: Vec<AnchorBucket>,
}

impl MatchScoreConfig {
    pub fn new(weights: ScoringWeights, anchor_buckets: Vec<AnchorBucket>) -> Self {
        Self {
            weights,
            anchor_buckets,
        }
        .normalized()
    }

    /// Buckets sorted ascending by threshold, non-finite thresholds dropped
    pub fn normalized(mut self) -> Self {
        self.anchor_buckets.retain(|b| b.max_km.is_finite() && b.multiplier.is_finite());
        self.anchor_buckets
            .sort_by(|a, b| a.max_km.total_cmp(&b.max_km));
        self
    }
}

impl Default for MatchScoreConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            anchor_buckets: default_anchor_buckets(),
        }
    }
}

/// Step in the retrieval anchor-proximity bonus table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorBonusStep {
    pub max_km: f64,
    pub bonus: f64,
}

fn default_anchor_bonus_steps() -> Vec<AnchorBonusStep> {
    vec![
        AnchorBonusStep { max_km: 5.0, bonus: 1.0 },
        AnchorBonusStep { max_km: 20.0, bonus: 0.5 },
    ]
}

/// Immutable retrieval configuration snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Max relative budget difference for "close" budgets
    #[serde(default = "default_budget_tol")]
    pub budget_tol: f64,
    /// Candidates whose anchor is farther than this are excluded in pass 1
    #[serde(default = "default_anchor_dist_km")]
    pub anchor_dist_km: f64,
    #[serde(default = "default_top_n_degraded")]
    pub top_n_degraded: usize,
    #[serde(default = "default_city_boost")]
    pub city_boost: f64,
    #[serde(default = "default_role_bonus")]
    pub role_bonus: f64,
    #[serde(default = "default_anchor_bonus_steps")]
    pub anchor_bonus_steps: Vec<AnchorBonusStep>,
}

fn default_budget_tol() -> f64 { 0.40 }
fn default_anchor_dist_km() -> f64 { 20.0 }
fn default_top_n_degraded() -> usize { 120 }
fn default_city_boost() -> f64 { 1.0 }
fn default_role_bonus() -> f64 { 0.5 }

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            budget_tol: default_budget_tol(),
            anchor_dist_km: default_anchor_dist_km(),
            top_n_degraded: default_top_n_degraded(),
            city_boost: default_city_boost(),
            role_bonus: default_role_bonus(),
            anchor_bonus_steps: default_anchor_bonus_steps(),
        }
    }
}

/// Auto-hunt settings for one seeker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Suggested seconds between cycles; scheduling is the caller's concern
    #[serde(default = "default_cadence_sec")]
    pub cadence_sec: u64,
    /// Matches below this score are never notified
    #[serde(default = "default_min_score")]
    pub min_score: u32,
    #[serde(default = "default_watcher_top_k")]
    pub top_k: usize,
    #[serde(default = "default_channels")]
    pub channels: Vec<String>,
    #[serde(default)]
    pub partner_webhooks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_config: Option<MatchScoreConfig>,
}

fn default_cadence_sec() -> u64 { 900 }
fn default_min_score() -> u32 { 55 }
fn default_watcher_top_k() -> usize { 5 }
fn default_channels() -> Vec<String> { vec!["email".to_string()] }

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            cadence_sec: default_cadence_sec(),
            min_score: default_min_score(),
            top_k: default_watcher_top_k(),
            channels: default_channels(),
            partner_webhooks: Vec::new(),
            match_config: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_100() {
        assert_eq!(ScoringWeights::default().sum(), 100);
    }

    #[test]
    fn test_oversized_weights_saturate() {
        let weights = ScoringWeights {
            city: u32::MAX,
            budget: 1,
            ..ScoringWeights::default()
        };
        assert_eq!(weights.sum(), u32::MAX);
    }

    #[test]
    fn test_partial_weight_override_zeroes_missing() {
        let config: MatchScoreConfig =
            serde_json::from_str(r#"{"weights": {"city": 50}}"#).unwrap();
        assert_eq!(config.weights.city, 50);
        assert_eq!(config.weights.budget, 0);
        assert_eq!(config.anchor_buckets.len(), 3);
    }

    #[test]
    fn test_bucket_array_form_and_sorting() {
        let config: MatchScoreConfig =
            serde_json::from_str(r#"{"anchor_buckets": [[10, 0.3], [1, 1.0]]}"#).unwrap();
        let config = config.normalized();

        assert_eq!(config.anchor_buckets[0].max_km, 1.0);
        assert_eq!(config.anchor_buckets[1].multiplier, 0.3);
        assert_eq!(config.anchor_buckets[1].reason(), "Anchors within 10 km");
        assert_eq!(config.weights, ScoringWeights::default());
    }

    #[test]
    fn test_retrieval_defaults() {
        let config: RetrievalConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, RetrievalConfig::default());
        assert_eq!(config.top_n_degraded, 120);
    }

    #[test]
    fn test_watcher_defaults() {
        let config: WatcherConfig = serde_json::from_str(r#"{"min_score": 70}"#).unwrap();
        assert_eq!(config.min_score, 70);
        assert_eq!(config.cadence_sec, 900);
        assert_eq!(config.channels, vec!["email".to_string()]);
        assert!(config.match_config.is_none());
    }
}
