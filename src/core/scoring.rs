use crate::core::distance::geo_distance;
use crate::models::{AnchorBucket, MatchScoreConfig, Profile, SubScores};

/// Absolute floor of the budget window, PKR
const BUDGET_WINDOW_MIN_PKR: i64 = 2000;

/// Result of scoring one profile pair
#[derive(Debug, Clone, PartialEq)]
pub struct PairScore {
    pub total: u32,
    pub reasons: Vec<String>,
    pub subscores: SubScores,
}

/// Budget window is computed from `a`'s budget only: ±20% of `a`, at least
/// PKR 2000. Swapping the arguments can change the outcome.
#[inline]
pub fn budgets_align(a: i64, b: i64) -> bool {
    let window = BUDGET_WINDOW_MIN_PKR.max((0.2 * a as f64) as i64);
    (a - b).abs() <= window
}

fn same<T: PartialEq>(a: &Option<T>, b: &Option<T>) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x == y)
}

fn study_habits_match(a: &str, b: &str) -> bool {
    (a.contains("library") && b.contains("library")) || (a.contains("home") && b.contains("home"))
}

/// First bucket whose threshold covers the distance
fn select_bucket(buckets: &[AnchorBucket], distance_km: f64) -> Option<&AnchorBucket> {
    buckets.iter().find(|bucket| distance_km <= bucket.max_km)
}

/// Weighted compatibility of `a` (the seeker) with `b`
///
/// Criteria are evaluated in a fixed order: city, budget, sleep,
/// cleanliness, noise, study, smoking, guests, role, anchor. Reasons follow
/// that order. A criterion whose fields are missing on either side
/// contributes nothing.
pub fn score_pair(a: &Profile, b: &Profile, config: &MatchScoreConfig) -> PairScore {
    let w = &config.weights;
    let mut s = SubScores::default();
    let mut reasons = Vec::new();

    if !a.city.is_empty() && a.city == b.city {
        s.city = w.city;
        reasons.push("Same city".to_string());
    }

    if let (Some(ab), Some(bb)) = (a.budget_pkr, b.budget_pkr) {
        if budgets_align(ab, bb) {
            s.budget = w.budget;
            reasons.push("Budgets align (±20%)".to_string());
        }
    }

    if same(&a.sleep_schedule, &b.sleep_schedule) {
        s.sleep = w.sleep;
        reasons.push("Similar sleep schedule".to_string());
    }

    if same(&a.cleanliness, &b.cleanliness) {
        s.cleanliness = w.cleanliness;
        reasons.push("Same cleanliness preference".to_string());
    }

    if same(&a.noise_tolerance, &b.noise_tolerance) {
        s.noise = w.noise;
        reasons.push("Noise tolerance looks compatible".to_string());
    }

    if let (Some(sa), Some(sb)) = (a.study_habits.as_deref(), b.study_habits.as_deref()) {
        if study_habits_match(sa, sb) {
            s.study = w.study;
            reasons.push("Study habits match".to_string());
        }
    }

    if same(&a.smoking, &b.smoking) {
        s.smoking = w.smoking;
        reasons.push("Smoking preference aligned".to_string());
    }

    if same(&a.guests_freq, &b.guests_freq) {
        s.guests = w.guests;
        reasons.push("Similar guest frequency".to_string());
    }

    if let (Some(ra), Some(rb)) = (a.role, b.role) {
        if ra == rb {
            s.role = w.role;
            reasons.push(format!("Both are {}s", ra.as_str()));
        }
    }

    if let (Some(anchor_a), Some(anchor_b)) = (&a.anchor_location, &b.anchor_location) {
        let distance = geo_distance(&anchor_a.coordinates(), &anchor_b.coordinates());
        match select_bucket(&config.anchor_buckets, distance.km()) {
            Some(bucket) => {
                s.anchor = (w.anchor as f64 * bucket.multiplier).round().max(0.0) as u32;
                reasons.push(bucket.reason());
            }
            None => reasons.push("Anchors far apart".to_string()),
        }
    }

    PairScore {
        total: s.total(),
        reasons,
        subscores: s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnchorLocation, GuestsFreq, Level, Role, ScoringWeights, SleepSchedule, Smoking};

    fn create_test_profile(id: &str) -> Profile {
        Profile {
            id: Some(id.to_string()),
            name: Some(format!("User {}", id)),
            role: Some(Role::Student),
            city: "Lahore".to_string(),
            budget_pkr: Some(20000),
            sleep_schedule: Some(SleepSchedule::NightOwl),
            cleanliness: Some(Level::High),
            noise_tolerance: Some(Level::Low),
            study_habits: Some("library evenings".to_string()),
            food_pref: None,
            smoking: Some(Smoking::No),
            guests_freq: Some(GuestsFreq::Rare),
            gender_pref: None,
            languages: vec!["ur".to_string(), "en".to_string()],
            anchor_location: Some(AnchorLocation::new("FAST, Lahore", 31.4815, 74.3030)),
            geo: None,
            email: None,
            phone: None,
            raw_text: String::new(),
        }
    }

    /// Point `km` kilometres due north of `lat`
    fn north_of(lat: f64, km: f64) -> f64 {
        lat + km / 111.195
    }

    fn with_anchor_at(km: f64) -> (Profile, Profile) {
        let a = create_test_profile("a");
        let mut b = create_test_profile("b");
        b.anchor_location = Some(AnchorLocation::new("FAST, Lahore", north_of(31.4815, km), 74.3030));
        (a, b)
    }

    #[test]
    fn test_identical_profiles_score_full_weight() {
        let config = MatchScoreConfig::default();
        let a = create_test_profile("a");
        let b = create_test_profile("b");

        let result = score_pair(&a, &b, &config);

        assert_eq!(result.total, 100);
        assert_eq!(result.reasons.first().map(String::as_str), Some("Same city"));
        assert_eq!(result.reasons.last().map(String::as_str), Some("Same anchor location"));
        assert!(result.reasons.contains(&"Both are students".to_string()));
    }

    #[test]
    fn test_budget_window_edges() {
        assert!(budgets_align(20000, 24000));
        assert!(!budgets_align(20000, 25000));
        // Window floor of 2000 for small budgets
        assert!(budgets_align(5000, 7000));
        assert!(!budgets_align(5000, 7001));
    }

    #[test]
    fn test_budget_window_is_directional() {
        // 20% of 10000 is 2000; 20% of 13000 is 2600
        assert!(!budgets_align(10000, 12600));
        assert!(budgets_align(13000, 10400));
        assert!(!budgets_align(10400, 13000));
    }

    #[test]
    fn test_anchor_buckets() {
        let config = MatchScoreConfig::default();

        let (a, b) = with_anchor_at(1.9);
        assert_eq!(score_pair(&a, &b, &config).subscores.anchor, 10);

        let (a, b) = with_anchor_at(4.9);
        let r = score_pair(&a, &b, &config);
        assert_eq!(r.subscores.anchor, 8);
        assert!(r.reasons.contains(&"Anchors very close (<5 km)".to_string()));

        let (a, b) = with_anchor_at(19.0);
        assert_eq!(score_pair(&a, &b, &config).subscores.anchor, 5);

        let (a, b) = with_anchor_at(21.0);
        let r = score_pair(&a, &b, &config);
        assert_eq!(r.subscores.anchor, 0);
        assert_eq!(r.reasons.last().map(String::as_str), Some("Anchors far apart"));
    }

    #[test]
    fn test_malformed_anchor_counts_as_far() {
        let config = MatchScoreConfig::default();
        let a = create_test_profile("a");
        let mut b = create_test_profile("b");
        b.anchor_location = Some(AnchorLocation {
            label: Some("Somewhere".to_string()),
            lat: None,
            lng: Some(74.3),
        });

        let r = score_pair(&a, &b, &config);
        assert_eq!(r.subscores.anchor, 0);
        assert!(r.reasons.contains(&"Anchors far apart".to_string()));
    }

    #[test]
    fn test_empty_buckets_never_award_anchor() {
        let config = MatchScoreConfig::new(ScoringWeights::default(), vec![]);
        let (a, b) = with_anchor_at(0.0);
        let r = score_pair(&a, &b, &config);
        assert_eq!(r.subscores.anchor, 0);
        assert_eq!(r.total, 90);
    }

    #[test]
    fn test_missing_fields_contribute_nothing() {
        let config = MatchScoreConfig::default();
        let a = create_test_profile("a");
        let mut b = create_test_profile("b");
        b.sleep_schedule = None;
        b.smoking = None;
        b.role = None;
        b.anchor_location = None;

        let r = score_pair(&a, &b, &config);
        assert_eq!(r.subscores.sleep, 0);
        assert_eq!(r.subscores.smoking, 0);
        assert_eq!(r.subscores.role, 0);
        assert_eq!(r.subscores.anchor, 0);
        assert!(!r.reasons.iter().any(|reason| reason.contains("Anchors")));
    }

    #[test]
    fn test_study_habits_substring_rule() {
        let config = MatchScoreConfig::default();
        let mut a = create_test_profile("a");
        let mut b = create_test_profile("b");
        a.study_habits = Some("at home, quiet".to_string());
        b.study_habits = Some("home mostly".to_string());
        assert_eq!(score_pair(&a, &b, &config).subscores.study, 8);

        b.study_habits = Some("library".to_string());
        assert_eq!(score_pair(&a, &b, &config).subscores.study, 0);
    }

    #[test]
    fn test_custom_weights_not_renormalized() {
        let weights = ScoringWeights {
            city: 70,
            ..ScoringWeights::default()
        };
        let config = MatchScoreConfig::new(weights, crate::models::default_anchor_buckets());
        let a = create_test_profile("a");
        let b = create_test_profile("b");

        let r = score_pair(&a, &b, &config);
        assert_eq!(r.total, weights.sum());
        assert_eq!(r.total, 160);
    }

    #[test]
    fn test_oversized_weights_still_score() {
        let weights = ScoringWeights {
            city: u32::MAX,
            budget: u32::MAX,
            ..ScoringWeights::default()
        };
        let config = MatchScoreConfig::new(weights, crate::models::default_anchor_buckets());
        let a = create_test_profile("a");
        let b = create_test_profile("b");

        let r = score_pair(&a, &b, &config);
        assert_eq!(r.total, u32::MAX);
        assert!(r.total <= weights.sum());
    }

    #[test]
    fn test_empty_city_never_matches() {
        let config = MatchScoreConfig::default();
        let mut a = create_test_profile("a");
        let mut b = create_test_profile("b");
        a.city.clear();
        b.city.clear();
        assert_eq!(score_pair(&a, &b, &config).subscores.city, 0);
    }
}
