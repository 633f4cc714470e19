use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Latitude/longitude pair as it arrived from a record.
///
/// Either half may be missing; distance computations treat an incomplete pair
/// as "unavailable" rather than failing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Coordinates {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat: Some(lat),
            lng: Some(lng),
        }
    }

    /// Both halves present and finite
    pub fn valid(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => Some((lat, lng)),
            _ => None,
        }
    }
}

/// Residence (or listing) position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lng: Option<f64>,
    #[serde(default = "default_geo_source", deserialize_with = "lenient_source")]
    pub source: String,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat: Some(lat),
            lng: Some(lng),
            source: default_geo_source(),
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

fn default_geo_source() -> String {
    "unknown".to_string()
}

/// Fixed reference point (campus, office) used for commute reasoning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorLocation {
    #[serde(default, deserialize_with = "lenient_string")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lng: Option<f64>,
}

impl AnchorLocation {
    pub fn new(label: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            label: Some(label.into()),
            lat: Some(lat),
            lng: Some(lng),
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lng: self.lng,
        }
    }

    /// Label for human-readable details, never empty
    pub fn display_label(&self) -> &str {
        match self.label.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => label,
            _ => "their anchor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepSchedule {
    EarlyBird,
    NightOwl,
    Flex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuestsFreq {
    Rare,
    Sometimes,
    Often,
    Daily,
}

impl GuestsFreq {
    /// Hosting often enough to disturb an early sleeper
    pub fn is_frequent(self) -> bool {
        matches!(self, GuestsFreq::Often | GuestsFreq::Daily)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Smoking {
    Yes,
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Professional,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Professional => "professional",
        }
    }

    /// Human-friendly form used in conflict details
    pub fn label(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Professional => "working professional",
        }
    }
}

/// Normalized roommate-seeker profile
///
/// Every enum field is either a canonical token or `None`; raw spellings are
/// mapped during deserialization (see `core::normalize`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawProfile")]
pub struct Profile {
    pub id: Option<String>,
    pub name: Option<String>,
    pub role: Option<Role>,
    pub city: String,
    pub budget_pkr: Option<i64>,
    pub sleep_schedule: Option<SleepSchedule>,
    pub cleanliness: Option<Level>,
    pub noise_tolerance: Option<Level>,
    pub study_habits: Option<String>,
    pub food_pref: Option<String>,
    pub smoking: Option<Smoking>,
    pub guests_freq: Option<GuestsFreq>,
    pub gender_pref: Option<String>,
    pub languages: Vec<String>,
    pub anchor_location: Option<AnchorLocation>,
    pub geo: Option<GeoPoint>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub raw_text: String,
}

impl Profile {
    /// Geo position if known, else the anchor. Used wherever the seeker's
    /// own location stands in for city matching.
    pub fn location_hint(&self) -> Option<Coordinates> {
        self.geo
            .as_ref()
            .map(GeoPoint::coordinates)
            .or_else(|| self.anchor_location.as_ref().map(AnchorLocation::coordinates))
    }
}

impl From<RawProfile> for Profile {
    fn from(raw: RawProfile) -> Self {
        crate::core::normalize::normalize_profile(&raw)
    }
}

/// Profile as submitted by a client or stored by a collaborator, before
/// normalization. Scalars are accepted loosely (numbers, strings, booleans).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawProfile {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_pkr: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<Value>,
    #[serde(default, rename = "budget_PKR", skip_serializing_if = "Option::is_none")]
    pub budget_pkr_upper: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_budget: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rent_budget: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_budget: Option<Value>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub sleep_schedule: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub cleanliness: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub noise_tolerance: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub study_habits: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub food_pref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoking: Option<Value>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub guests_freq: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub gender_pref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub languages: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_location: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo: Option<Value>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub institution_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub campus: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub raw_profile_text: Option<String>,
}

impl RawProfile {
    /// Names of the fields carried by this record, in declaration order
    pub fn present_fields(&self) -> Vec<&'static str> {
        let present = [
            ("id", self.id.is_some()),
            ("profile_id", self.profile_id.is_some()),
            ("name", self.name.is_some()),
            ("role", self.role.is_some()),
            ("city", self.city.is_some()),
            ("budget_pkr", self.budget_pkr.is_some()),
            ("budget", self.budget.is_some()),
            ("budget_PKR", self.budget_pkr_upper.is_some()),
            ("monthly_budget", self.monthly_budget.is_some()),
            ("rent_budget", self.rent_budget.is_some()),
            ("expected_budget", self.expected_budget.is_some()),
            ("sleep_schedule", self.sleep_schedule.is_some()),
            ("cleanliness", self.cleanliness.is_some()),
            ("noise_tolerance", self.noise_tolerance.is_some()),
            ("study_habits", self.study_habits.is_some()),
            ("food_pref", self.food_pref.is_some()),
            ("smoking", self.smoking.is_some()),
            ("guests_freq", self.guests_freq.is_some()),
            ("gender_pref", self.gender_pref.is_some()),
            ("languages", self.languages.is_some()),
            ("anchor_location", self.anchor_location.is_some()),
            ("geo", self.geo.is_some()),
            ("email", self.email.is_some()),
            ("phone", self.phone.is_some()),
            ("phone_number", self.phone_number.is_some()),
            ("institution_id", self.institution_id.is_some()),
            ("campus", self.campus.is_some()),
            ("organization", self.organization.is_some()),
            ("raw_text", self.raw_text.is_some()),
            ("raw_profile_text", self.raw_profile_text.is_some()),
        ];

        present
            .into_iter()
            .filter_map(|(name, set)| set.then_some(name))
            .collect()
    }
}

/// Rental unit offered to seekers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawListing")]
pub struct Listing {
    pub listing_id: Option<String>,
    pub city: Option<String>,
    pub area: Option<String>,
    pub monthly_rent_pkr: i64,
    pub amenities: Vec<String>,
    pub availability: Option<String>,
    pub rooms_available: Option<i64>,
    pub reserved_by: Vec<String>,
    pub geo: Option<GeoPoint>,
}

/// Status strings meaning "not open"
const UNAVAILABLE_STATUSES: &[&str] = &["unavailable", "occupied", "closed", "false", "0", "no"];

impl Listing {
    /// Open status and, when the count is known, at least one free room
    pub fn is_available(&self) -> bool {
        let status = self
            .availability
            .as_deref()
            .unwrap_or("available")
            .trim()
            .to_lowercase();

        if UNAVAILABLE_STATUSES.contains(&status.as_str()) {
            return false;
        }

        !matches!(self.rooms_available, Some(rooms) if rooms <= 0)
    }
}

/// Listing record with every rent/status spelling the stores are known to use
#[derive(Debug, Clone, Default, Deserialize)]
struct RawListing {
    #[serde(default, deserialize_with = "lenient_string")]
    listing_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    city: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    area: Option<String>,
    #[serde(default, rename = "monthly_rent_PKR")]
    monthly_rent_pkr_upper: Option<Value>,
    #[serde(default)]
    monthly_rent_pkr: Option<Value>,
    #[serde(default)]
    rent_pkr: Option<Value>,
    #[serde(default)]
    rent: Option<Value>,
    #[serde(default)]
    price_pkr: Option<Value>,
    #[serde(default)]
    price: Option<Value>,
    #[serde(default)]
    amenities: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_string")]
    availability: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    status: Option<String>,
    #[serde(default)]
    rooms_available: Option<Value>,
    #[serde(default)]
    reserved_by: Option<Vec<String>>,
    #[serde(default)]
    geo: Option<Value>,
}

impl From<RawListing> for Listing {
    fn from(raw: RawListing) -> Self {
        use crate::core::normalize::parse_pkr;

        let rent = [
            &raw.monthly_rent_pkr_upper,
            &raw.monthly_rent_pkr,
            &raw.rent_pkr,
            &raw.rent,
            &raw.price_pkr,
            &raw.price,
        ]
        .into_iter()
        .find_map(|v| v.as_ref().filter(|v| !v.is_null()))
        .and_then(parse_pkr)
        .unwrap_or(0);

        let availability = raw
            .availability
            .filter(|s| !s.trim().is_empty())
            .or(raw.status);

        Listing {
            listing_id: raw.listing_id.or(raw.id),
            city: raw.city,
            area: raw.area,
            monthly_rent_pkr: rent,
            amenities: raw.amenities.unwrap_or_default(),
            availability,
            rooms_available: raw.rooms_available.as_ref().and_then(parse_pkr),
            reserved_by: raw.reserved_by.unwrap_or_default(),
            geo: raw.geo.and_then(|v| serde_json::from_value(v).ok()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    SmokingClash,
    SleepVsGuests,
    NoiseMismatch,
    CleanlinessMismatch,
    StudyRoutineClash,
    RoleLifestyleGap,
    BudgetGap,
    AnchorCityMismatch,
    AnchorCommuteNotice,
    AnchorCommuteHeavy,
    AnchorTooFar,
}

impl ConflictKind {
    /// Wire token, as serialized in the `type` field
    pub fn as_str(self) -> &'static str {
        match self {
            ConflictKind::SmokingClash => "smoking_clash",
            ConflictKind::SleepVsGuests => "sleep_vs_guests",
            ConflictKind::NoiseMismatch => "noise_mismatch",
            ConflictKind::CleanlinessMismatch => "cleanliness_mismatch",
            ConflictKind::StudyRoutineClash => "study_routine_clash",
            ConflictKind::RoleLifestyleGap => "role_lifestyle_gap",
            ConflictKind::BudgetGap => "budget_gap",
            ConflictKind::AnchorCityMismatch => "anchor_city_mismatch",
            ConflictKind::AnchorCommuteNotice => "anchor_commute_notice",
            ConflictKind::AnchorCommuteHeavy => "anchor_commute_heavy",
            ConflictKind::AnchorTooFar => "anchor_too_far",
        }
    }
}

/// Qualitative lifestyle or commute concern for a profile pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    #[serde(rename = "type")]
    pub kind: ConflictKind,
    pub severity: Severity,
    pub details: String,
}

impl Conflict {
    pub fn new(kind: ConflictKind, severity: Severity, details: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            details: details.into(),
        }
    }
}

/// Per-criterion points awarded by the scorer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubScores {
    pub city: u32,
    pub budget: u32,
    pub sleep: u32,
    pub cleanliness: u32,
    pub noise: u32,
    pub study: u32,
    pub smoking: u32,
    pub guests: u32,
    pub role: u32,
    pub anchor: u32,
}

impl SubScores {
    pub fn total(&self) -> u32 {
        self.entries()
            .into_iter()
            .fold(0, |acc, (_, points)| acc.saturating_add(points))
    }

    /// Criterion name → points, in evaluation order
    pub fn entries(&self) -> [(&'static str, u32); 10] {
        [
            ("city", self.city),
            ("budget", self.budget),
            ("sleep", self.sleep),
            ("cleanliness", self.cleanliness),
            ("noise", self.noise),
            ("study", self.study),
            ("smoking", self.smoking),
            ("guests", self.guests),
            ("role", self.role),
            ("anchor", self.anchor),
        ]
    }

    pub fn to_map(&self) -> BTreeMap<String, u32> {
        self.entries()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    New,
    Notified,
    Unknown,
}

/// One surfaced (query, candidate) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMatch {
    pub other_profile_id: Option<String>,
    pub other_name: Option<String>,
    pub score: u32,
    pub reasons: Vec<String>,
    pub conflicts: Vec<Conflict>,
    pub subscores: SubScores,
    pub city: String,
    pub budget_pkr: Option<i64>,
    pub is_new: bool,
    pub notification_status: NotificationStatus,
    /// Practical suggestions for the pair, never empty for pipeline output
    #[serde(default)]
    pub tips: Vec<String>,
}

/// Listing annotated by the room ranker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRoom {
    pub listing_id: String,
    pub city: Option<String>,
    pub area: Option<String>,
    #[serde(rename = "monthly_rent_PKR")]
    pub monthly_rent_pkr: i64,
    pub amenities: Vec<String>,
    pub why_match: String,
    pub rooms_available: i64,
    pub reserved_by: Vec<String>,
    pub geo: Option<GeoPoint>,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_minutes: Option<u32>,
}

/// Accept any JSON scalar as a string; objects, arrays and blanks become `None`
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Numbers or numeric strings; anything else is treated as missing
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite()))
}

fn lenient_source<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.unwrap_or_else(default_geo_source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coordinates_accept_numeric_strings() {
        let anchor: AnchorLocation =
            serde_json::from_value(json!({"label": "FAST", "lat": "31.48", "lng": 74.30})).unwrap();
        assert_eq!(anchor.coordinates().valid(), Some((31.48, 74.30)));
    }

    #[test]
    fn test_coordinates_reject_garbage() {
        let anchor: AnchorLocation =
            serde_json::from_value(json!({"label": "FAST", "lat": "north", "lng": null})).unwrap();
        assert_eq!(anchor.lat, None);
        assert!(anchor.coordinates().valid().is_none());
    }

    #[test]
    fn test_listing_rent_key_priority() {
        let listing: Listing = serde_json::from_value(json!({
            "id": "L1",
            "monthly_rent_PKR": 30000,
            "price": 99999,
            "status": "available"
        }))
        .unwrap();

        assert_eq!(listing.listing_id.as_deref(), Some("L1"));
        assert_eq!(listing.monthly_rent_pkr, 30000);
        assert!(listing.is_available());
    }

    #[test]
    fn test_listing_availability() {
        let occupied: Listing =
            serde_json::from_value(json!({"availability": "Occupied"})).unwrap();
        assert!(!occupied.is_available());

        let full: Listing = serde_json::from_value(json!({"rooms_available": 0})).unwrap();
        assert!(!full.is_available());

        let open: Listing = serde_json::from_value(json!({"rooms_available": "2"})).unwrap();
        assert!(open.is_available());
    }

    #[test]
    fn test_conflict_serializes_type_tag() {
        let conflict = Conflict::new(ConflictKind::SmokingClash, Severity::High, "x");
        let value = serde_json::to_value(&conflict).unwrap();
        assert_eq!(value["type"], "smoking_clash");
        assert_eq!(value["severity"], "high");
    }

    #[test]
    fn test_conflict_kind_token_matches_serde() {
        for kind in [ConflictKind::SmokingClash, ConflictKind::AnchorCommuteHeavy, ConflictKind::BudgetGap] {
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.as_str());
        }
    }

    #[test]
    fn test_subscores_total() {
        let s = SubScores {
            city: 10,
            anchor: 5,
            ..Default::default()
        };
        assert_eq!(s.total(), 15);
        assert_eq!(s.to_map()["anchor"], 5);

        let s = SubScores {
            city: u32::MAX,
            budget: 20,
            ..Default::default()
        };
        assert_eq!(s.total(), u32::MAX);
    }
}
