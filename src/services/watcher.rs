use crate::core::{Matcher, PipelineOptions, PipelineResult, RetrievalMode};
use crate::models::{RawProfile, ScoredMatch, WatcherConfig};
use crate::services::notify::{DispatchReport, NotificationPayload, NotificationSink};
use crate::services::store::{DocumentSource, NotifiedStore, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

/// Scope used when no institution is given
pub const DEFAULT_SCOPE: &str = "default";

/// Hex characters kept from the anonymous key digest
const ANON_KEY_LEN: usize = 16;

/// Stable identifier for watcher state: id, profile_id, email, then phone,
/// else a digest of the profile's fields
pub fn profile_key(profile: &RawProfile) -> String {
    let explicit = [
        &profile.id,
        &profile.profile_id,
        &profile.email,
        &profile.phone,
        &profile.phone_number,
    ]
        .into_iter()
        .flatten()
        .find(|v| !v.is_empty());
    if let Some(key) = explicit {
        return key.clone();
    }

    // BTreeMap keeps the serialized form independent of field order
    let fields: BTreeMap<String, Value> = match serde_json::to_value(profile) {
        Ok(Value::Object(map)) => map.into_iter().collect(),
        _ => BTreeMap::new(),
    };
    let canonical = serde_json::to_string(&fields).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("anon-{}", &digest[..ANON_KEY_LEN])
}

/// First non-blank of the explicit institution id, then the profile's own
/// institution_id, campus and organization; else the default scope
pub fn resolve_scope(institution_id: Option<&str>, profile: &RawProfile) -> String {
    [
        institution_id,
        profile.institution_id.as_deref(),
        profile.campus.as_deref(),
        profile.organization.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .find(|s| !s.is_empty())
    .unwrap_or(DEFAULT_SCOPE)
    .to_string()
}

/// Watcher settings for a scope: the stored override when one exists,
/// otherwise `fallback`. A failing store read also yields `fallback`.
pub async fn watcher_config_for(
    store: &NotifiedStore,
    scope: &str,
    fallback: &WatcherConfig,
) -> WatcherConfig {
    match store.fetch_watcher_config(scope).await {
        Ok(Some(config)) => {
            tracing::debug!("Using stored watcher config for scope {}", scope);
            config
        }
        Ok(None) => fallback.clone(),
        Err(e) => {
            tracing::warn!("Failed to fetch watcher config for {}, using defaults: {}", scope, e);
            fallback.clone()
        }
    }
}

/// Outcome of one auto-hunt cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoHuntOutcome {
    pub config: WatcherConfig,
    pub result: PipelineResult,
    pub new_matches: Vec<ScoredMatch>,
    pub notifications: DispatchReport,
    pub scope: String,
    pub profile_key: String,
}

/// Collaborators one cycle runs against
pub struct WatcherContext<'a, S: NotificationSink> {
    pub matcher: &'a Matcher,
    pub source: &'a DocumentSource,
    pub store: &'a NotifiedStore,
    pub sink: &'a S,
}

/// Run one auto-hunt cycle for a seeker.
///
/// Cycles always ask for online retrieval; without a search index this
/// falls back to the keyword path and records why in the trace.
///
/// Matches are announced only when new to this seeker and scoring at least
/// `min_score`. After a dispatch the stored set becomes the sorted union of
/// the previous ids and the announced ones. Scheduling the next cycle is the
/// caller's concern.
pub async fn run_auto_hunt_cycle<S: NotificationSink>(
    profile: &RawProfile,
    scope: &str,
    config: WatcherConfig,
    ctx: &WatcherContext<'_, S>,
) -> Result<AutoHuntOutcome, StoreError> {
    let profiles = ctx.source.fetch_all_profiles().await?;
    let listings = ctx.source.fetch_all_listings().await?;

    let key = profile_key(profile);
    let previously_notified = ctx.store.fetch_notified_matches(scope, &key).await?;

    let matcher = ctx.matcher.with_overrides(config.match_config.clone(), None);
    let options = PipelineOptions {
        mode: RetrievalMode::Online,
        top_k: config.top_k,
        notified_match_ids: previously_notified.clone(),
    };
    let result = matcher.run_pipeline(profile, &profiles, &listings, &options);

    let new_matches: Vec<ScoredMatch> = result
        .matches
        .iter()
        .filter(|m| m.is_new && m.score >= config.min_score)
        .cloned()
        .collect();

    let mut notifications = DispatchReport::new();
    if !new_matches.is_empty() {
        let payload = NotificationPayload::new(
            scope,
            &key,
            profile.name.clone(),
            profile.email.clone(),
            new_matches.clone(),
            result.rooms.clone(),
            result.trace.trace_id,
        );
        notifications = ctx.sink.dispatch(&payload, &config.channels).await;

        let updated: Vec<String> = previously_notified
            .into_iter()
            .chain(new_matches.iter().filter_map(|m| m.other_profile_id.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        ctx.store.store_notified_matches(scope, &key, &updated).await?;

        tracing::info!(
            "Auto-hunt {}/{} notified {} new matches",
            scope,
            key,
            new_matches.len()
        );
    } else {
        tracing::debug!("Auto-hunt {}/{} found nothing new", scope, key);
    }

    Ok(AutoHuntOutcome {
        config,
        result,
        new_matches,
        notifications,
        scope: scope.to_string(),
        profile_key: key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::local::LocalJsonStore;
    use crate::services::notify::LogSink;
    use crate::services::store::MemoryNotifiedStore;
    use serde_json::json;
    use tempfile::TempDir;

    fn raw(value: Value) -> RawProfile {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_profile_key_precedence() {
        assert_eq!(profile_key(&raw(json!({"id": "u1", "email": "a@b.c"}))), "u1");
        assert_eq!(profile_key(&raw(json!({"email": "a@b.c", "phone": "123"}))), "a@b.c");
        assert_eq!(profile_key(&raw(json!({"phone_number": "0300"}))), "0300");
        assert_eq!(
            profile_key(&raw(json!({"profile_id": "pid-9", "email": "a@b.c"}))),
            "pid-9"
        );
        assert_eq!(profile_key(&raw(json!({"id": "", "profile_id": 42}))), "42");
    }

    #[test]
    fn test_anonymous_key_is_stable() {
        let a = profile_key(&raw(json!({"city": "Lahore", "budget": 20000})));
        let b = profile_key(&raw(json!({"budget": 20000, "city": "Lahore"})));
        let c = profile_key(&raw(json!({"city": "Karachi", "budget": 20000})));

        assert!(a.starts_with("anon-"));
        assert_eq!(a.len(), "anon-".len() + 16);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_resolve_scope() {
        let blank = RawProfile::default();
        assert_eq!(resolve_scope(Some("fast-lhr"), &blank), "fast-lhr");
        assert_eq!(resolve_scope(Some("  "), &blank), "default");
        assert_eq!(resolve_scope(None, &blank), "default");
    }

    #[test]
    fn test_resolve_scope_profile_fallbacks() {
        let full = raw(json!({"institution_id": "lums", "campus": "main", "organization": "acme"}));
        assert_eq!(resolve_scope(Some("fast-lhr"), &full), "fast-lhr");
        assert_eq!(resolve_scope(None, &full), "lums");

        let campus = raw(json!({"institution_id": " ", "campus": "main", "organization": "acme"}));
        assert_eq!(resolve_scope(Some(""), &campus), "main");

        let org = raw(json!({"organization": "acme"}));
        assert_eq!(resolve_scope(None, &org), "acme");
    }

    #[tokio::test]
    async fn test_watcher_config_for_scope() {
        let store = NotifiedStore::Memory(MemoryNotifiedStore::new());
        let fallback = WatcherConfig::default();
        let stored: WatcherConfig = serde_json::from_value(json!({"min_score": 80})).unwrap();
        store.store_watcher_config("lums", &stored).await.unwrap();

        let lums = watcher_config_for(&store, "lums", &fallback).await;
        assert_eq!(lums.min_score, 80);
        assert_eq!(lums.top_k, 5);
        assert_eq!(lums.channels, vec!["email".to_string()]);

        assert_eq!(watcher_config_for(&store, "default", &fallback).await, fallback);
    }

    #[tokio::test]
    async fn test_cycle_notifies_once() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("profiles.json"),
            json!([
                {"id": "p1", "name": "Ali", "city": "Lahore", "budget_pkr": 20000,
                 "role": "student", "sleep_schedule": "night_owl", "cleanliness": "high",
                 "noise_tolerance": "low", "smoking": "no", "guests_freq": "rare"},
                {"id": "p2", "name": "Bilal", "city": "Lahore", "budget_pkr": 90000}
            ])
            .to_string(),
        )
        .unwrap();

        let matcher = Matcher::default();
        let source = DocumentSource::Local(LocalJsonStore::new(dir.path()));
        let store = NotifiedStore::Memory(MemoryNotifiedStore::new());
        let ctx = WatcherContext {
            matcher: &matcher,
            source: &source,
            store: &store,
            sink: &LogSink,
        };

        let me = raw(json!({
            "id": "me", "name": "Ayesha", "city": "Lahore", "budget_pkr": 20000,
            "role": "student", "sleep_schedule": "night owl", "cleanliness": "tidy",
            "noise_tolerance": "quiet", "smoking": false, "guests_freq": "never"
        }));

        let first = run_auto_hunt_cycle(&me, "default", WatcherConfig::default(), &ctx)
            .await
            .unwrap();
        assert_eq!(first.profile_key, "me");
        assert_eq!(first.result.mode, RetrievalMode::Online);
        assert_eq!(first.new_matches.len(), 1);
        assert_eq!(first.new_matches[0].other_profile_id.as_deref(), Some("p1"));
        assert_eq!(first.notifications["email"]["status"], "logged");

        let stored = store.fetch_notified_matches("default", "me").await.unwrap();
        assert!(stored.contains("p1"));
        assert!(!stored.contains("p2"));

        let second = run_auto_hunt_cycle(&me, "default", WatcherConfig::default(), &ctx)
            .await
            .unwrap();
        assert!(second.new_matches.is_empty());
        assert!(second.notifications.is_empty());
    }
}
