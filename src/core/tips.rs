use crate::models::{Conflict, ConflictKind, Profile, Role, SubScores};

const FALLBACK_TIP: &str = "Looks compatible - align on groceries, utilities split, and quiet hours early.";

/// Practical suggestions for a scored pair.
///
/// Positive nudges come from awarded criteria, then role context, then one
/// suggestion per conflict in detection order. Never empty.
pub fn wingman_tips(
    query: &Profile,
    candidate: &Profile,
    subscores: &SubScores,
    conflicts: &[Conflict],
) -> Vec<String> {
    let mut tips: Vec<String> = Vec::new();

    if subscores.city > 0 {
        tips.push("You're in the same city - logistics are easy.".to_string());
    }
    if subscores.budget > 0 {
        tips.push("Budgets align - split rent fairly and track utilities.".to_string());
    }

    match (query.role, candidate.role) {
        (Some(Role::Student), Some(Role::Student)) => {
            tips.push("Plan shared study hours or library sessions.".to_string())
        }
        (Some(Role::Professional), Some(Role::Professional)) => {
            tips.push("Share commute costs or coordinate office timings.".to_string())
        }
        (Some(_), Some(_)) => {
            tips.push("Respect different routines: classes vs office work.".to_string())
        }
        _ => {}
    }

    if subscores.anchor > 0 {
        tips.push("Easy commute - you're both anchored in the same area.".to_string());
    }

    tips.extend(conflicts.iter().map(|c| conflict_tip(c.kind)));

    if tips.is_empty() {
        tips.push(FALLBACK_TIP.to_string());
    }
    tips
}

fn conflict_tip(kind: ConflictKind) -> String {
    match kind {
        ConflictKind::SleepVsGuests => "Set quiet hours (10pm-7am) and keep hosting to weekends.".to_string(),
        ConflictKind::CleanlinessMismatch => "Use a weekly cleaning rota and a shared supplies list.".to_string(),
        ConflictKind::SmokingClash => "Keep indoor smoke-free; designate an outdoor smoking spot.".to_string(),
        ConflictKind::AnchorTooFar => {
            "Anchors are far apart - consider transport or relocation options.".to_string()
        }
        ConflictKind::AnchorCityMismatch => {
            "Different anchor cities - this may not be practical long-term.".to_string()
        }
        other => format!("Address potential issue: {}", other.as_str()),
    }
}
