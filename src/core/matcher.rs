use crate::core::{
    commute::enrich_with_commute,
    conflicts::red_flags,
    normalize::normalize_profile,
    retrieval::{CandidateRetrieval, CandidateSearch, NoSearchIndex, RetrievalMeta, RetrievalMode},
    rooms::{rank_rooms, PIPELINE_ROOM_COUNT},
    scoring::score_pair,
    tips::wingman_tips,
};
use crate::models::{
    Listing, MatchScoreConfig, NotificationStatus, Profile, RankedRoom, RawProfile,
    RetrievalConfig, ScoredMatch,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Minimum number of candidates requested from retrieval
const MIN_RETRIEVAL_POOL: usize = 100;

/// One named stage of a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    pub agent: String,
    pub inputs: Value,
    pub outputs: Value,
}

/// Ordered record of what each stage saw and produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub trace_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub mode: RetrievalMode,
    pub steps: Vec<TraceStep>,
}

impl Trace {
    pub fn new(mode: RetrievalMode) -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            created_at: Utc::now(),
            mode,
            steps: Vec::new(),
        }
    }

    pub fn add_step(&mut self, agent: &str, inputs: Value, outputs: Value) {
        self.steps.push(TraceStep {
            agent: agent.to_string(),
            inputs,
            outputs,
        });
    }

    /// Agent names in execution order
    pub fn agents(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.agent.as_str()).collect()
    }
}

/// Per-run inputs beyond the pools themselves
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub mode: RetrievalMode,
    pub top_k: usize,
    /// Candidate ids already notified for this seeker; read only
    pub notified_match_ids: HashSet<String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            mode: RetrievalMode::Degraded,
            top_k: 5,
            notified_match_ids: HashSet::new(),
        }
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub mode: RetrievalMode,
    pub matches: Vec<ScoredMatch>,
    pub rooms: Vec<RankedRoom>,
    pub trace: Trace,
    /// Surfaced candidate ids not yet in the notified set. The caller decides
    /// whether to persist them.
    pub newly_observed_ids: Vec<String>,
}

/// Matching pipeline orchestrator
///
/// # Pipeline Stages
/// 1. Profile normalization
/// 2. Candidate retrieval (strict, broadened, then any)
/// 3. Pair scoring and red flags
/// 4. Top-k truncation and notification status
/// 5. Room ranking and commute enrichment
///
/// Holds immutable configuration snapshots; a run never mutates them.
#[derive(Clone)]
pub struct Matcher {
    match_config: MatchScoreConfig,
    retrieval_config: RetrievalConfig,
    search: Arc<dyn CandidateSearch>,
}

impl Matcher {
    pub fn new(match_config: MatchScoreConfig, retrieval_config: RetrievalConfig) -> Self {
        Self {
            match_config: match_config.normalized(),
            retrieval_config,
            search: Arc::new(NoSearchIndex),
        }
    }

    pub fn with_default_config() -> Self {
        Self::new(MatchScoreConfig::default(), RetrievalConfig::default())
    }

    /// Use a nearest-neighbour backend for online retrieval
    pub fn with_search(mut self, search: Arc<dyn CandidateSearch>) -> Self {
        self.search = search;
        self
    }

    pub fn match_config(&self) -> &MatchScoreConfig {
        &self.match_config
    }

    pub fn retrieval_config(&self) -> &RetrievalConfig {
        &self.retrieval_config
    }

    /// Copy of this matcher with per-request configuration overrides
    pub fn with_overrides(
        &self,
        match_config: Option<MatchScoreConfig>,
        retrieval_config: Option<RetrievalConfig>,
    ) -> Self {
        Self {
            match_config: match_config
                .map(MatchScoreConfig::normalized)
                .unwrap_or_else(|| self.match_config.clone()),
            retrieval_config: retrieval_config.unwrap_or_else(|| self.retrieval_config.clone()),
            search: Arc::clone(&self.search),
        }
    }

    /// Run the full matching pipeline for one seeker.
    ///
    /// Pure given its inputs apart from the trace id and timestamp: the
    /// notified set is only read, and newly observed ids are returned.
    pub fn run_pipeline(
        &self,
        input: &RawProfile,
        candidates: &[Profile],
        listings: &[Listing],
        options: &PipelineOptions,
    ) -> PipelineResult {
        let mut trace = Trace::new(options.mode);

        // Step 1: normalize
        let query = normalize_profile(input);
        trace.add_step(
            "ProfileReader",
            json!({ "fields": input.present_fields() }),
            json!({ "normalized": true }),
        );

        // Step 2: retrieval
        let retrieval = CandidateRetrieval::new(&self.retrieval_config, self.search.as_ref());
        let pool_size = (options.top_k * 10).max(MIN_RETRIEVAL_POOL);
        let (pool, meta) = retrieval.retrieve(&query, candidates, pool_size, options.mode);
        trace.add_step(
            "CandidateRetrieval",
            json!({ "method": meta.method }),
            retrieval_outputs(pool.len(), &meta),
        );

        tracing::debug!(
            "Retrieval returned {} of {} candidates via {}",
            pool.len(),
            candidates.len(),
            meta.method
        );

        // Step 3: score and flag
        let mut matches: Vec<ScoredMatch> = pool
            .iter()
            .map(|candidate| self.score_candidate(&query, candidate, &options.notified_match_ids))
            .collect();

        // Step 4: rank (stable), truncate
        matches.sort_by(|a, b| b.score.cmp(&a.score));
        matches.truncate(options.top_k);

        let query_label = query.id.clone().unwrap_or_else(|| "A?".to_string());
        for m in &matches {
            trace.add_step(
                "MatchScorer",
                json!({
                    "pair": format!(
                        "{} vs {}",
                        query_label,
                        m.other_profile_id.as_deref().unwrap_or("?")
                    )
                }),
                json!({
                    "score": m.score,
                    "flags": m.conflicts.iter().map(|c| c.kind).collect::<Vec<_>>(),
                }),
            );
        }

        // Step 5: rooms
        let mut rooms = rank_rooms(&query, listings, PIPELINE_ROOM_COUNT);
        trace.add_step(
            "RoomHunter",
            json!({ "city": query.city, "budget": query.budget_pkr }),
            json!({ "count": rooms.len() }),
        );

        if let Some(user_loc) = query.location_hint() {
            let enriched = enrich_with_commute(&user_loc, &mut rooms);
            trace.add_step(
                "MapsPlanner",
                json!({ "user_loc": { "lat": user_loc.lat, "lng": user_loc.lng } }),
                json!({ "rooms_enriched": enriched }),
            );
        }

        // Step 6: notification gating (read only)
        let newly_observed_ids: Vec<String> = matches
            .iter()
            .filter(|m| m.is_new)
            .filter_map(|m| m.other_profile_id.clone())
            .collect();
        let previously_notified = matches
            .iter()
            .filter(|m| m.notification_status == NotificationStatus::Notified)
            .count();
        trace.add_step(
            "MatchNotifier",
            json!({ "known_ids": options.notified_match_ids.len() }),
            json!({
                "surfaced": matches.len(),
                "new": newly_observed_ids.len(),
                "previously_notified": previously_notified,
                "new_ids": newly_observed_ids,
            }),
        );

        tracing::debug!(
            "Pipeline {} surfaced {} matches ({} new) and {} rooms",
            trace.trace_id,
            matches.len(),
            newly_observed_ids.len(),
            rooms.len()
        );

        PipelineResult {
            mode: options.mode,
            matches,
            rooms,
            trace,
            newly_observed_ids,
        }
    }

    fn score_candidate(
        &self,
        query: &Profile,
        candidate: &Profile,
        notified: &HashSet<String>,
    ) -> ScoredMatch {
        let pair = score_pair(query, candidate, &self.match_config);
        let conflicts = red_flags(query, candidate);
        let tips = wingman_tips(query, candidate, &pair.subscores, &conflicts);

        let (is_new, notification_status) = match candidate.id.as_deref() {
            Some(id) if notified.contains(id) => (false, NotificationStatus::Notified),
            Some(_) => (true, NotificationStatus::New),
            None => (false, NotificationStatus::Unknown),
        };

        ScoredMatch {
            other_profile_id: candidate.id.clone(),
            other_name: candidate.name.clone(),
            score: pair.total,
            reasons: pair.reasons,
            conflicts,
            subscores: pair.subscores,
            city: candidate.city.clone(),
            budget_pkr: candidate.budget_pkr,
            is_new,
            notification_status,
            tips,
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_default_config()
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matcher")
            .field("match_config", &self.match_config)
            .field("retrieval_config", &self.retrieval_config)
            .finish_non_exhaustive()
    }
}

fn retrieval_outputs(count: usize, meta: &RetrievalMeta) -> Value {
    let mut outputs = Map::new();
    outputs.insert("count".to_string(), json!(count));
    if let Some(fallback) = &meta.fallback {
        outputs.insert("fallback".to_string(), json!(fallback));
    }
    Value::Object(outputs)
}
