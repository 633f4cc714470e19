use crate::core::distance::{geo_distance, round_km, Distance, UNAVAILABLE_DISTANCE_KM};
use crate::models::{Coordinates, RankedRoom};

/// Assumed average city travel speed
const COMMUTE_SPEED_KMH: f64 = 30.0;

/// Straight-line travel time in whole minutes (rounded down)
#[inline]
pub fn eta_minutes(distance_km: f64) -> u32 {
    (distance_km / COMMUTE_SPEED_KMH * 60.0).floor().max(0.0) as u32
}

/// Annotate rooms that carry a geo point with distance and ETA from `user_loc`.
///
/// Rooms without geo are left untouched. When either point is unusable the
/// room keeps the sentinel distance and gets no ETA.
pub fn enrich_with_commute(user_loc: &Coordinates, rooms: &mut [RankedRoom]) -> usize {
    let mut enriched = 0;
    for room in rooms.iter_mut() {
        let Some(geo) = &room.geo else {
            continue;
        };

        match geo_distance(user_loc, &geo.coordinates()) {
            Distance::Km(d) => {
                room.distance_km = Some(round_km(d));
                room.eta_minutes = Some(eta_minutes(d));
            }
            Distance::Unavailable => {
                room.distance_km = Some(UNAVAILABLE_DISTANCE_KM);
                room.eta_minutes = None;
            }
        }
        enriched += 1;
    }
    enriched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeoPoint;

    fn create_room(id: &str, geo: Option<GeoPoint>) -> RankedRoom {
        RankedRoom {
            listing_id: id.to_string(),
            city: Some("Lahore".to_string()),
            area: None,
            monthly_rent_pkr: 25000,
            amenities: vec![],
            why_match: String::new(),
            rooms_available: 1,
            reserved_by: vec![],
            geo,
            score: 0.0,
            distance_km: None,
            eta_minutes: None,
        }
    }

    #[test]
    fn test_eta_rounds_down() {
        assert_eq!(eta_minutes(0.0), 0);
        assert_eq!(eta_minutes(15.0), 30);
        assert_eq!(eta_minutes(10.9), 21);
    }

    #[test]
    fn test_enrich_sets_distance_and_eta() {
        let user = Coordinates::new(31.5, 74.3);
        let mut rooms = vec![
            // ~11.1 km due north
            create_room("a", Some(GeoPoint::new(31.6, 74.3))),
            create_room("b", None),
        ];

        let count = enrich_with_commute(&user, &mut rooms);

        assert_eq!(count, 1);
        assert_eq!(rooms[0].distance_km, Some(11.1));
        assert_eq!(rooms[0].eta_minutes, Some(22));
        assert_eq!(rooms[1].distance_km, None);
        assert_eq!(rooms[1].eta_minutes, None);
    }

    #[test]
    fn test_unusable_point_keeps_sentinel() {
        let user = Coordinates {
            lat: Some(31.5),
            lng: None,
        };
        let mut rooms = vec![create_room("a", Some(GeoPoint::new(31.6, 74.3)))];

        enrich_with_commute(&user, &mut rooms);

        assert_eq!(rooms[0].distance_km, Some(9999.0));
        assert_eq!(rooms[0].eta_minutes, None);
    }
}
