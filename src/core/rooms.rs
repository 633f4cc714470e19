use crate::core::distance::{geo_distance, round_km};
use crate::models::{Listing, Profile, RankedRoom};
use std::collections::HashSet;

/// Number of rooms the pipeline surfaces
pub const PIPELINE_ROOM_COUNT: usize = 3;

/// Optional room filters supplied by the caller
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomFilters {
    /// Amenities the seeker wants; matched case-insensitively
    pub required_amenities: Vec<String>,
}

impl RoomFilters {
    pub fn with_amenities<I, S>(amenities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            required_amenities: amenities
                .into_iter()
                .map(|a| a.as_ref().trim().to_lowercase())
                .filter(|a| !a.is_empty())
                .collect(),
        }
    }

    fn required(&self) -> HashSet<String> {
        self.required_amenities
            .iter()
            .map(|a| a.trim().to_lowercase())
            .collect()
    }
}

fn city_key(city: Option<&str>) -> String {
    city.unwrap_or_default().trim().to_lowercase()
}

/// Rent ceiling for a budget: twice the budget, or budget + 5000 when larger
#[inline]
pub fn rent_ceiling(budget: i64) -> i64 {
    budget.saturating_mul(2).max(budget.saturating_add(5000))
}

/// Rank listings for `query` with no extra filters
pub fn rank_rooms(query: &Profile, listings: &[Listing], k: usize) -> Vec<RankedRoom> {
    rank_rooms_with(query, listings, k, &RoomFilters::default())
}

/// Filter, score and return the top `k` listings.
///
/// Score is `10 × amenity overlap − |rent − 2 × budget| / 1000`, minus half
/// the distance in km when the seeker has a location. Rent is compared
/// against twice the budget because rooms are assumed to be shared by two.
pub fn rank_rooms_with(
    query: &Profile,
    listings: &[Listing],
    k: usize,
    filters: &RoomFilters,
) -> Vec<RankedRoom> {
    let q_city = city_key(Some(&query.city));
    let q_budget = query.budget_pkr.unwrap_or(0);
    let q_loc = query.location_hint();
    let required = filters.required();

    let mut scored: Vec<RankedRoom> = listings
        .iter()
        .filter(|listing| listing.is_available())
        // A known location stands in for the city match
        .filter(|listing| {
            q_loc.is_some() || q_city.is_empty() || city_key(listing.city.as_deref()) == q_city
        })
        .filter(|listing| q_budget <= 0 || listing.monthly_rent_pkr <= rent_ceiling(q_budget))
        .map(|listing| {
            let rent = listing.monthly_rent_pkr;
            let overlap = listing
                .amenities
                .iter()
                .map(|a| a.trim().to_lowercase())
                .filter(|a| required.contains(a))
                .collect::<HashSet<_>>()
                .len();

            let price_diff = if q_budget > 0 {
                rent.saturating_sub(q_budget.saturating_mul(2)).saturating_abs()
            } else {
                0
            };
            let mut score = overlap as f64 * 10.0 - price_diff as f64 / 1000.0;

            let mut distance_km = None;
            if let (Some(loc), Some(geo)) = (&q_loc, &listing.geo) {
                let d = geo_distance(loc, &geo.coordinates()).km();
                score -= d / 2.0;
                distance_km = Some(round_km(d));
            }

            RankedRoom {
                listing_id: listing.listing_id.clone().unwrap_or_else(|| "-".to_string()),
                city: listing.city.clone(),
                area: listing.area.clone(),
                monthly_rent_pkr: rent,
                amenities: listing.amenities.clone(),
                why_match: format!(
                    "{}, {} - {} amenity overlap; rent delta {}",
                    listing.city.as_deref().unwrap_or("-"),
                    listing.area.as_deref().unwrap_or("-"),
                    overlap,
                    price_diff
                ),
                rooms_available: listing.rooms_available.unwrap_or(1),
                reserved_by: listing.reserved_by.clone(),
                geo: listing.geo.clone(),
                score,
                distance_km,
                eta_minutes: None,
            }
        })
        .collect();

    // Stable: ties keep listing order
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnchorLocation, GeoPoint};

    fn create_query(city: &str, budget: Option<i64>) -> Profile {
        Profile {
            id: Some("q".to_string()),
            name: None,
            role: None,
            city: city.to_string(),
            budget_pkr: budget,
            sleep_schedule: None,
            cleanliness: None,
            noise_tolerance: None,
            study_habits: None,
            food_pref: None,
            smoking: None,
            guests_freq: None,
            gender_pref: None,
            languages: vec![],
            anchor_location: None,
            geo: None,
            email: None,
            phone: None,
            raw_text: String::new(),
        }
    }

    fn create_listing(id: &str, city: &str, rent: i64) -> Listing {
        Listing {
            listing_id: Some(id.to_string()),
            city: Some(city.to_string()),
            area: Some("Gulberg".to_string()),
            monthly_rent_pkr: rent,
            amenities: vec!["WiFi".to_string(), "AC".to_string()],
            availability: None,
            rooms_available: None,
            reserved_by: vec![],
            geo: None,
        }
    }

    fn ids(rooms: &[RankedRoom]) -> Vec<&str> {
        rooms.iter().map(|r| r.listing_id.as_str()).collect()
    }

    #[test]
    fn test_availability_filter() {
        let query = create_query("Lahore", None);
        let mut closed = create_listing("closed", "Lahore", 30000);
        closed.availability = Some(" Occupied ".to_string());
        let mut full = create_listing("full", "Lahore", 30000);
        full.rooms_available = Some(0);
        let open = create_listing("open", "Lahore", 30000);

        let rooms = rank_rooms(&query, &[closed, full, open], 5);
        assert_eq!(ids(&rooms), vec!["open"]);
    }

    #[test]
    fn test_city_filter_case_insensitive() {
        let query = create_query("lahore", None);
        let rooms = rank_rooms(
            &query,
            &[
                create_listing("1", " LAHORE ", 30000),
                create_listing("2", "Karachi", 30000),
            ],
            5,
        );
        assert_eq!(ids(&rooms), vec!["1"]);
    }

    #[test]
    fn test_location_skips_city_filter() {
        let mut query = create_query("Lahore", None);
        query.anchor_location = Some(AnchorLocation::new("Campus", 31.5, 74.3));

        let mut near = create_listing("near", "Karachi", 30000);
        near.geo = Some(GeoPoint::new(31.51, 74.3));
        let mut far = create_listing("far", "Lahore", 30000);
        far.geo = Some(GeoPoint::new(31.9, 74.3));

        let rooms = rank_rooms(&query, &[far, near], 5);
        assert_eq!(ids(&rooms), vec!["near", "far"]);
        assert_eq!(rooms[0].distance_km, Some(1.1));
        assert!(rooms[0].eta_minutes.is_none());
    }

    #[test]
    fn test_budget_guard() {
        let query = create_query("Lahore", Some(10000));
        // ceiling = max(20000, 15000)
        let rooms = rank_rooms(
            &query,
            &[
                create_listing("ok", "Lahore", 20000),
                create_listing("over", "Lahore", 20001),
            ],
            5,
        );
        assert_eq!(ids(&rooms), vec!["ok"]);

        // small budgets: budget + 5000 dominates
        assert_eq!(rent_ceiling(3000), 8000);
    }

    #[test]
    fn test_huge_budget_saturates() {
        assert_eq!(rent_ceiling(i64::MAX / 2 + 1), i64::MAX);
        assert_eq!(rent_ceiling(i64::MAX), i64::MAX);

        let query = create_query("Lahore", Some(i64::MAX));
        let rooms = rank_rooms(&query, &[create_listing("1", "Lahore", 30000)], 5);
        assert_eq!(ids(&rooms), vec!["1"]);
        assert!(rooms[0].score.is_finite());
        assert!(rooms[0].why_match.ends_with(&format!("rent delta {}", i64::MAX - 30000)));
    }

    #[test]
    fn test_score_and_why_match() {
        let query = create_query("Lahore", Some(15000));
        let filters = RoomFilters::with_amenities(["wifi", "Parking"]);

        let rooms = rank_rooms_with(
            &query,
            &[
                create_listing("a", "Lahore", 28000),
                create_listing("b", "Lahore", 30000),
            ],
            5,
            &filters,
        );

        assert_eq!(ids(&rooms), vec!["b", "a"]);
        assert_eq!(rooms[0].score, 10.0);
        assert_eq!(rooms[1].score, 8.0);
        assert_eq!(rooms[1].why_match, "Lahore, Gulberg - 1 amenity overlap; rent delta 2000");
        assert_eq!(rooms[0].rooms_available, 1);
    }

    #[test]
    fn test_ties_keep_listing_order_and_truncate() {
        let query = create_query("Lahore", None);
        let listings: Vec<Listing> = (0..5)
            .map(|i| create_listing(&i.to_string(), "Lahore", 25000))
            .collect();

        let rooms = rank_rooms(&query, &listings, PIPELINE_ROOM_COUNT);
        assert_eq!(ids(&rooms), vec!["0", "1", "2"]);
        assert!(rooms.iter().all(|r| r.score == 0.0));
    }

    #[test]
    fn test_malformed_listing_geo_is_penalized() {
        let mut query = create_query("Lahore", None);
        query.geo = Some(GeoPoint::new(31.5, 74.3));

        let mut broken = create_listing("broken", "Lahore", 25000);
        broken.geo = Some(GeoPoint {
            lat: None,
            lng: Some(74.3),
            source: "unknown".to_string(),
        });
        let plain = create_listing("plain", "Lahore", 25000);

        let rooms = rank_rooms(&query, &[broken, plain], 5);
        assert_eq!(ids(&rooms), vec!["plain", "broken"]);
        assert_eq!(rooms[1].distance_km, Some(9999.0));
    }

    #[test]
    fn test_missing_listing_id() {
        let query = create_query("Lahore", None);
        let mut listing = create_listing("x", "Lahore", 25000);
        listing.listing_id = None;
        let rooms = rank_rooms(&query, &[listing], 1);
        assert_eq!(rooms[0].listing_id, "-");
    }
}
