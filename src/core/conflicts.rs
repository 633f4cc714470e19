use crate::core::distance::geo_distance;
use crate::models::{AnchorLocation, Conflict, ConflictKind, Level, Profile, Severity, SleepSchedule};

/// Rough one-way commute cost, PKR per km
pub const COMMUTE_COST_PER_KM: f64 = 40.0;

/// Relative budget difference above which budgets are flagged
const BUDGET_GAP_THRESHOLD: f64 = 0.35;

/// Anchor distance tiers, km: (notice, heavy, too far) lower bounds
const COMMUTE_NOTICE_KM: f64 = 10.0;
const COMMUTE_HEAVY_KM: f64 = 25.0;
const COMMUTE_TOO_FAR_KM: f64 = 50.0;

/// Commute severity derived from anchor separation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommuteTier {
    Fine,
    Notice,
    Heavy,
    TooFar,
}

impl CommuteTier {
    /// Exactly one tier for every non-negative distance: (0,10] fine,
    /// (10,25] notice, (25,50] heavy, beyond that too far.
    pub fn for_distance(km: f64) -> Self {
        if km > COMMUTE_TOO_FAR_KM {
            CommuteTier::TooFar
        } else if km > COMMUTE_HEAVY_KM {
            CommuteTier::Heavy
        } else if km > COMMUTE_NOTICE_KM {
            CommuteTier::Notice
        } else {
            CommuteTier::Fine
        }
    }
}

/// Two-way daily commute estimate in PKR
#[inline]
pub fn commute_cost_pkr(distance_km: f64) -> i64 {
    (distance_km.max(0.0) * 2.0 * COMMUTE_COST_PER_KM).round() as i64
}

/// Relative budget difference, `None` unless both budgets are positive
fn budget_gap(a: Option<i64>, b: Option<i64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) if a > 0 && b > 0 => Some((a - b).abs() as f64 / a.max(b) as f64),
        _ => None,
    }
}

/// Text before the first comma, lower-cased
fn anchor_city(label: &str) -> String {
    label.split(',').next().unwrap_or_default().trim().to_lowercase()
}

fn level_pair_is(a: Option<Level>, b: Option<Level>, x: Level, y: Level) -> bool {
    matches!((a, b), (Some(p), Some(q)) if (p == x && q == y) || (p == y && q == x))
}

fn anchor_flags(a: &AnchorLocation, b: &AnchorLocation, flags: &mut Vec<Conflict>) {
    if let (Some(label_a), Some(label_b)) = (a.label.as_deref(), b.label.as_deref()) {
        if anchor_city(label_a) != anchor_city(label_b) {
            flags.push(Conflict::new(
                ConflictKind::AnchorCityMismatch,
                Severity::High,
                format!("Different anchor cities: {} vs {}", label_a, label_b),
            ));
            return;
        }
    }

    // Unusable coordinates read as the sentinel distance and land in the far tier
    let d = geo_distance(&a.coordinates(), &b.coordinates()).km();

    let (label_a, label_b) = (a.display_label(), b.display_label());
    let km = d as i64;
    let cost = commute_cost_pkr(d);

    let conflict = match CommuteTier::for_distance(d) {
        CommuteTier::Fine => return,
        CommuteTier::Notice => Conflict::new(
            ConflictKind::AnchorCommuteNotice,
            Severity::Low,
            format!(
                "Commute between {} and {} is ~{} km (≈PKR {} / day)",
                label_a, label_b, km, cost
            ),
        ),
        CommuteTier::Heavy => Conflict::new(
            ConflictKind::AnchorCommuteHeavy,
            Severity::Medium,
            format!(
                "Lengthy commute: {} ↔ {} ~{} km (≈PKR {} / day)",
                label_a, label_b, km, cost
            ),
        ),
        CommuteTier::TooFar => Conflict::new(
            ConflictKind::AnchorTooFar,
            Severity::High,
            format!(
                "Anchors {} and {} are {} km apart (≈PKR {} / day)",
                label_a, label_b, km, cost
            ),
        ),
    };
    flags.push(conflict);
}

/// Qualitative conflicts between two profiles
///
/// Rules are independent and may co-fire. No deduplication happens here.
pub fn red_flags(a: &Profile, b: &Profile) -> Vec<Conflict> {
    let mut flags = Vec::new();

    if let (Some(sa), Some(sb)) = (a.smoking, b.smoking) {
        if sa != sb {
            flags.push(Conflict::new(
                ConflictKind::SmokingClash,
                Severity::High,
                "One smokes, the other does not",
            ));
        }
    }

    let early = [a.sleep_schedule, b.sleep_schedule]
        .iter()
        .any(|s| *s == Some(SleepSchedule::EarlyBird));
    let hosting = [a.guests_freq, b.guests_freq]
        .iter()
        .any(|g| g.is_some_and(|g| g.is_frequent()));
    if early && hosting {
        flags.push(Conflict::new(
            ConflictKind::SleepVsGuests,
            Severity::Medium,
            "Early riser with frequent hosting",
        ));
    }

    if level_pair_is(a.noise_tolerance, b.noise_tolerance, Level::Low, Level::High) {
        flags.push(Conflict::new(
            ConflictKind::NoiseMismatch,
            Severity::Medium,
            "Low noise tolerance vs high noise preference",
        ));
    }

    if level_pair_is(a.cleanliness, b.cleanliness, Level::High, Level::Low) {
        flags.push(Conflict::new(
            ConflictKind::CleanlinessMismatch,
            Severity::Medium,
            "High vs low cleanliness preference",
        ));
    }

    let study_text = [a.study_habits.as_deref(), b.study_habits.as_deref()]
        .into_iter()
        .flatten()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" / ");
    if (study_text.contains("late") && study_text.contains("early"))
        || (study_text.contains("group") && study_text.contains("quiet"))
    {
        flags.push(Conflict::new(
            ConflictKind::StudyRoutineClash,
            Severity::Low,
            "Different study routines",
        ));
    }

    if let (Some(ra), Some(rb)) = (a.role, b.role) {
        if ra != rb {
            flags.push(Conflict::new(
                ConflictKind::RoleLifestyleGap,
                Severity::Medium,
                format!("Different routines: {} vs {}", ra.label(), rb.label()),
            ));
        }
    }

    if let Some(gap) = budget_gap(a.budget_pkr, b.budget_pkr) {
        if gap > BUDGET_GAP_THRESHOLD {
            flags.push(Conflict::new(
                ConflictKind::BudgetGap,
                Severity::Low,
                format!("Budget gap ~{}%", (gap * 100.0) as i64),
            ));
        }
    }

    if let (Some(anchor_a), Some(anchor_b)) = (&a.anchor_location, &b.anchor_location) {
        anchor_flags(anchor_a, anchor_b, &mut flags);
    }

    flags
}
