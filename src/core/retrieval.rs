use crate::core::distance::geo_distance;
use crate::core::normalize::normalize_city;
use crate::models::{Profile, RetrievalConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Which retrieval path a request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    Online,
    #[default]
    Degraded,
}

impl RetrievalMode {
    /// Case-insensitive; anything unrecognised means degraded
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "online" => RetrievalMode::Online,
            _ => RetrievalMode::Degraded,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RetrievalMode::Online => "online",
            RetrievalMode::Degraded => "degraded",
        }
    }
}

impl fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the candidate list was produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalMeta {
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

pub const METHOD_DEGRADED: &str = "degraded_keyword";
pub const METHOD_EMBEDDING: &str = "embedding_search";
pub const FALLBACK_BROADENED: &str = "broadened_city_or_budget";
pub const FALLBACK_POOL_ANY: &str = "pool_any";

/// Enhanced (nearest-neighbour) candidate search used in online mode
///
/// Returns candidate ids, best first. Errors are reported as text and make
/// retrieval fall back to the heuristic path.
pub trait CandidateSearch: Send + Sync {
    fn search(&self, query: &Profile, pool: &[Profile], k: usize) -> Result<Vec<String>, String>;
}

/// Default search backend: always unavailable
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSearchIndex;

impl CandidateSearch for NoSearchIndex {
    fn search(&self, _query: &Profile, _pool: &[Profile], _k: usize) -> Result<Vec<String>, String> {
        Err("no search index configured".to_string())
    }
}

/// Relative budget difference; 1.0 when either budget is missing
#[inline]
pub fn pct_diff(a: Option<i64>, b: Option<i64>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) if a > 0 && b > 0 => (a - b).abs() as f64 / a.max(b) as f64,
        _ => 1.0,
    }
}

/// Missing budget on either side counts as close
#[inline]
pub fn budget_close(a: Option<i64>, b: Option<i64>, tol: f64) -> bool {
    match (a, b) {
        (Some(a), Some(b)) if a > 0 && b > 0 => pct_diff(Some(a), Some(b)) <= tol,
        _ => true,
    }
}

/// Bounded candidate retrieval over a profile pool
pub struct CandidateRetrieval<'a> {
    config: &'a RetrievalConfig,
    search: &'a dyn CandidateSearch,
}

/// Per-candidate facts computed once against the query
struct Assessed<'p> {
    profile: &'p Profile,
    city_match: bool,
    role_match: bool,
    anchor_km: Option<f64>,
    budget_close: bool,
}

impl<'a> CandidateRetrieval<'a> {
    pub fn new(config: &'a RetrievalConfig, search: &'a dyn CandidateSearch) -> Self {
        Self { config, search }
    }

    /// Select up to `min(top_n, top_n_degraded)` candidates for `query`.
    ///
    /// The degraded path always produces a result: strict filter, then
    /// city-or-budget broadening, then the head of the raw pool.
    pub fn retrieve(
        &self,
        query: &Profile,
        pool: &[Profile],
        top_n: usize,
        mode: RetrievalMode,
    ) -> (Vec<Profile>, RetrievalMeta) {
        let mut meta = RetrievalMeta {
            method: METHOD_DEGRADED.to_string(),
            fallback: None,
        };

        // The seeker is never its own candidate
        let pool: Vec<&Profile> = pool
            .iter()
            .filter(|p| query.id.is_none() || p.id != query.id)
            .collect();

        if mode == RetrievalMode::Online {
            let owned: Vec<Profile> = pool.iter().map(|p| (*p).clone()).collect();
            match self.search.search(query, &owned, top_n) {
                Ok(ids) => {
                    // Keep the backend's ranking; unknown or repeated ids are skipped
                    let mut seen = HashSet::new();
                    let found: Vec<Profile> = ids
                        .iter()
                        .filter(|id| seen.insert(id.as_str()))
                        .filter_map(|id| owned.iter().find(|p| p.id.as_deref() == Some(id.as_str())))
                        .take(top_n)
                        .cloned()
                        .collect();
                    meta.method = METHOD_EMBEDDING.to_string();
                    tracing::debug!("Embedding search returned {} candidates", found.len());
                    return (found, meta);
                }
                Err(e) => {
                    tracing::warn!("Candidate search unavailable, using heuristic path: {}", e);
                    meta.fallback = Some(format!("search_error:{}", e));
                }
            }
        }

        let q_city = normalize_city(&query.city);
        let q_anchor = query.anchor_location.as_ref().map(|a| a.coordinates());

        let assessed: Vec<Assessed> = pool
            .iter()
            .map(|p| Assessed {
                profile: p,
                city_match: !q_city.is_empty() && normalize_city(&p.city) == q_city,
                role_match: query.role.is_some() && p.role == query.role,
                anchor_km: match (&q_anchor, &p.anchor_location) {
                    (Some(q), Some(a)) => Some(geo_distance(q, &a.coordinates()).km()),
                    _ => None,
                },
                budget_close: budget_close(query.budget_pkr, p.budget_pkr, self.config.budget_tol),
            })
            .collect();

        // Pass 1: city + budget + role + anchor radius
        let mut survivors: Vec<&Assessed> = assessed
            .iter()
            .filter(|c| c.city_match && c.budget_close)
            .filter(|c| query.role.is_none() || c.role_match)
            .filter(|c| c.anchor_km.map_or(true, |d| d <= self.config.anchor_dist_km))
            .collect();

        if survivors.is_empty() {
            survivors = assessed
                .iter()
                .filter(|c| c.city_match || c.budget_close)
                .collect();
            if !survivors.is_empty() {
                meta.fallback = Some(FALLBACK_BROADENED.to_string());
            }
        }

        if survivors.is_empty() {
            meta.fallback = Some(FALLBACK_POOL_ANY.to_string());
            survivors = assessed.iter().take(self.config.top_n_degraded).collect();
        }

        // Stable sort: equal keys keep pool order
        survivors.sort_by(|a, b| {
            self.rank_bonus(b)
                .total_cmp(&self.rank_bonus(a))
                .then_with(|| {
                    pct_diff(query.budget_pkr, a.profile.budget_pkr)
                        .total_cmp(&pct_diff(query.budget_pkr, b.profile.budget_pkr))
                })
        });

        let limit = top_n.min(self.config.top_n_degraded);
        let candidates: Vec<Profile> = survivors
            .into_iter()
            .take(limit)
            .map(|c| c.profile.clone())
            .collect();

        tracing::debug!(
            "Retrieved {} candidates (fallback: {:?})",
            candidates.len(),
            meta.fallback
        );

        (candidates, meta)
    }

    /// City + role + anchor-proximity bonus (primary sort key, descending)
    fn rank_bonus(&self, c: &Assessed) -> f64 {
        let city = if c.city_match { self.config.city_boost } else { 0.0 };
        let role = if c.role_match { self.config.role_bonus } else { 0.0 };
        let anchor = c
            .anchor_km
            .and_then(|d| {
                self.config
                    .anchor_bonus_steps
                    .iter()
                    .find(|step| d <= step.max_km)
                    .map(|step| step.bonus)
            })
            .unwrap_or(0.0);
        city + role + anchor
    }
}
