use crate::models::{
    AnchorLocation, GeoPoint, GuestsFreq, Level, Profile, RawProfile, Role, SleepSchedule, Smoking,
};
use serde_json::Value;

/// Languages assumed when a profile lists none
const DEFAULT_LANGUAGES: &[&str] = &["ur", "en"];

/// City aliases (lower-case) → canonical city
const CITY_ALIASES: &[(&str, &str)] = &[
    ("lhr", "lahore"),
    ("لاہور", "lahore"),
    ("khi", "karachi"),
    ("کراچی", "karachi"),
    ("isb", "islamabad"),
    ("اسلام آباد", "islamabad"),
    ("pindi", "rawalpindi"),
    ("راولپنڈی", "rawalpindi"),
];

/// Lower-case, trim, and resolve aliases. Empty input stays empty.
pub fn normalize_city(city: &str) -> String {
    let lowered = city.trim().to_lowercase();
    CITY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(lowered)
}

/// Parse a PKR amount: integers, floats (truncated), booleans, and strings
/// such as "18000", "18,000", "18 000" or "18k".
pub fn parse_pkr(value: &Value) -> Option<i64> {
    match value {
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => {
            let lowered = s.trim().to_lowercase();
            let (digits, multiplier) = match lowered.strip_suffix('k') {
                Some(head) => (head.trim_end(), 1000),
                None => (lowered.as_str(), 1),
            };
            let cleaned: String = digits
                .chars()
                .filter(|c| !matches!(c, ',' | '_' | ' '))
                .collect();

            if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            // Out-of-range amounts are unparseable rather than wrapped
            cleaned.parse::<i64>().ok().and_then(|n| n.checked_mul(multiplier))
        }
        _ => None,
    }
}

fn token(value: Option<&str>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

pub fn parse_sleep_schedule(value: Option<&str>) -> Option<SleepSchedule> {
    match token(value)?.as_str() {
        "early riser" | "early_bird" | "early bird" | "early" | "morning" => Some(SleepSchedule::EarlyBird),
        "night owl" | "night_owl" | "late" | "late night" => Some(SleepSchedule::NightOwl),
        "flex" | "flexible" => Some(SleepSchedule::Flex),
        _ => None,
    }
}

pub fn parse_cleanliness(value: Option<&str>) -> Option<Level> {
    match token(value)?.as_str() {
        "high" | "neat" | "tidy" => Some(Level::High),
        "medium" | "moderate" | "avg" | "average" => Some(Level::Medium),
        "low" | "messy" | "chill" => Some(Level::Low),
        _ => None,
    }
}

pub fn parse_noise_tolerance(value: Option<&str>) -> Option<Level> {
    match token(value)?.as_str() {
        "low" | "quiet" => Some(Level::Low),
        "medium" | "moderate" => Some(Level::Medium),
        "high" | "loud" | "party" => Some(Level::High),
        _ => None,
    }
}

pub fn parse_guests_freq(value: Option<&str>) -> Option<GuestsFreq> {
    match token(value)?.as_str() {
        "never" | "rare" => Some(GuestsFreq::Rare),
        "sometimes" | "weekly" => Some(GuestsFreq::Sometimes),
        "often" | "frequent" | "always" => Some(GuestsFreq::Often),
        "daily" => Some(GuestsFreq::Daily),
        _ => None,
    }
}

pub fn parse_role(value: Option<&str>) -> Option<Role> {
    match token(value)?.as_str() {
        "student" | "undergrad" | "bs" => Some(Role::Student),
        "professional" | "job" | "office" => Some(Role::Professional),
        _ => None,
    }
}

pub fn parse_smoking(value: Option<&Value>) -> Option<Smoking> {
    match value? {
        Value::Bool(true) => Some(Smoking::Yes),
        Value::Bool(false) => Some(Smoking::No),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "y" | "yes" | "true" => Some(Smoking::Yes),
            "n" | "no" | "false" => Some(Smoking::No),
            _ => None,
        },
        _ => None,
    }
}

fn pick_budget(raw: &RawProfile) -> Option<i64> {
    [
        &raw.budget_pkr,
        &raw.budget,
        &raw.budget_pkr_upper,
        &raw.monthly_budget,
        &raw.rent_budget,
        &raw.expected_budget,
    ]
    .into_iter()
    .find_map(|v| v.as_ref().filter(|v| !v.is_null()))
    .and_then(parse_pkr)
    .filter(|b| *b > 0)
}

fn structured<T: serde::de::DeserializeOwned>(value: Option<&Value>) -> Option<T> {
    match value {
        Some(v @ Value::Object(_)) => serde_json::from_value(v.clone()).ok(),
        _ => None,
    }
}

/// Map a raw record onto the canonical profile vocabulary.
///
/// Never fails: unknown spellings become `None`, unparseable budgets are
/// dropped, and malformed coordinates are kept as missing halves.
pub fn normalize_profile(raw: &RawProfile) -> Profile {
    let languages = match &raw.languages {
        Some(langs) if !langs.is_empty() => langs.clone(),
        _ => DEFAULT_LANGUAGES.iter().map(|l| l.to_string()).collect(),
    };

    Profile {
        id: raw.id.clone(),
        name: raw.name.clone(),
        role: parse_role(raw.role.as_deref()),
        city: raw.city.as_deref().map(str::trim).unwrap_or_default().to_string(),
        budget_pkr: pick_budget(raw),
        sleep_schedule: parse_sleep_schedule(raw.sleep_schedule.as_deref()),
        cleanliness: parse_cleanliness(raw.cleanliness.as_deref()),
        noise_tolerance: parse_noise_tolerance(raw.noise_tolerance.as_deref()),
        study_habits: raw.study_habits.clone(),
        food_pref: raw.food_pref.clone(),
        smoking: parse_smoking(raw.smoking.as_ref()),
        guests_freq: parse_guests_freq(raw.guests_freq.as_deref()),
        gender_pref: raw.gender_pref.clone(),
        languages,
        anchor_location: structured::<AnchorLocation>(raw.anchor_location.as_ref()),
        geo: structured::<GeoPoint>(raw.geo.as_ref()),
        email: raw.email.clone(),
        phone: raw.phone.clone().or_else(|| raw.phone_number.clone()),
        raw_text: raw
            .raw_text
            .clone()
            .or_else(|| raw.raw_profile_text.clone())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawProfile {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_city_aliases() {
        assert_eq!(normalize_city(" LHR "), "lahore");
        assert_eq!(normalize_city("Karachi"), "karachi");
        assert_eq!(normalize_city("Multan"), "multan");
        assert_eq!(normalize_city(""), "");
    }

    #[test]
    fn test_parse_pkr_variants() {
        assert_eq!(parse_pkr(&json!(18000)), Some(18000));
        assert_eq!(parse_pkr(&json!(18000.9)), Some(18000));
        assert_eq!(parse_pkr(&json!("18,000")), Some(18000));
        assert_eq!(parse_pkr(&json!("18 000")), Some(18000));
        assert_eq!(parse_pkr(&json!("18k")), Some(18000));
        assert_eq!(parse_pkr(&json!("18 K")), Some(18000));
        assert_eq!(parse_pkr(&json!("about 18k")), None);
        assert_eq!(parse_pkr(&json!(null)), None);
    }

    #[test]
    fn test_parse_pkr_out_of_range() {
        assert_eq!(parse_pkr(&json!("9223372036854775807k")), None);
        assert_eq!(parse_pkr(&json!("99999999999999999999")), None);
        assert_eq!(parse_pkr(&json!("9223372036854775807")), Some(i64::MAX));
        assert_eq!(parse_pkr(&json!(1e300)), Some(i64::MAX));

        let p = normalize_profile(&raw(json!({"budget": "9223372036854775807k"})));
        assert_eq!(p.budget_pkr, None);
    }

    #[test]
    fn test_enum_spellings() {
        assert_eq!(parse_sleep_schedule(Some("Early Riser")), Some(SleepSchedule::EarlyBird));
        assert_eq!(parse_sleep_schedule(Some("late")), Some(SleepSchedule::NightOwl));
        assert_eq!(parse_cleanliness(Some("tidy")), Some(Level::High));
        assert_eq!(parse_noise_tolerance(Some("quiet")), Some(Level::Low));
        assert_eq!(parse_guests_freq(Some("frequent")), Some(GuestsFreq::Often));
        assert_eq!(parse_role(Some("undergrad")), Some(Role::Student));
        assert_eq!(parse_role(Some("astronaut")), None);
        assert_eq!(parse_smoking(Some(&json!(true))), Some(Smoking::Yes));
        assert_eq!(parse_smoking(Some(&json!("N"))), Some(Smoking::No));
        assert_eq!(parse_smoking(Some(&json!("sometimes"))), None);
    }

    #[test]
    fn test_normalize_profile_budget_keys() {
        let p = normalize_profile(&raw(json!({"id": "p1", "budget_PKR": "25k"})));
        assert_eq!(p.budget_pkr, Some(25000));

        let p = normalize_profile(&raw(json!({"budget": 0})));
        assert_eq!(p.budget_pkr, None);
    }

    #[test]
    fn test_normalize_profile_defaults() {
        let p = normalize_profile(&raw(json!({"id": 7, "city": " Lahore "})));
        assert_eq!(p.id.as_deref(), Some("7"));
        assert_eq!(p.city, "Lahore");
        assert_eq!(p.languages, vec!["ur", "en"]);
        assert!(p.anchor_location.is_none());
        assert!(p.sleep_schedule.is_none());
    }

    #[test]
    fn test_normalize_profile_locations() {
        let p = normalize_profile(&raw(json!({
            "anchor_location": {"label": "LUMS, Lahore", "lat": 31.47, "lng": "74.41"},
            "geo": {"lat": 31.5, "lng": 74.3},
        })));

        let anchor = p.anchor_location.unwrap();
        assert_eq!(anchor.coordinates().valid(), Some((31.47, 74.41)));
        assert_eq!(p.geo.unwrap().source, "unknown");
    }

    #[test]
    fn test_non_object_anchor_dropped() {
        let p = normalize_profile(&raw(json!({"anchor_location": "somewhere"})));
        assert!(p.anchor_location.is_none());
    }

    #[test]
    fn test_profile_deserializes_through_normalization() {
        let p: Profile = serde_json::from_value(json!({
            "id": "p2",
            "sleep_schedule": "night owl",
            "smoking": "no",
        }))
        .unwrap();
        assert_eq!(p.sleep_schedule, Some(SleepSchedule::NightOwl));
        assert_eq!(p.smoking, Some(Smoking::No));

        let round_trip: Profile = serde_json::from_value(serde_json::to_value(&p).unwrap()).unwrap();
        assert_eq!(round_trip, p);
    }
}
