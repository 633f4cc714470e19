use crate::models::Coordinates;

/// Earth's radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Distance reported when either point is unusable ("arbitrarily far")
pub const UNAVAILABLE_DISTANCE_KM: f64 = 9999.0;

/// Outcome of a distance lookup between two possibly-malformed points
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distance {
    Km(f64),
    Unavailable,
}

impl Distance {
    /// Kilometers, with the sentinel standing in for unusable points
    pub fn km(self) -> f64 {
        match self {
            Distance::Km(km) => km,
            Distance::Unavailable => UNAVAILABLE_DISTANCE_KM,
        }
    }

    pub fn known(self) -> Option<f64> {
        match self {
            Distance::Km(km) => Some(km),
            Distance::Unavailable => None,
        }
    }
}

/// Calculate the Haversine distance between two points in kilometers
///
/// # Arguments
/// * `lat1` - Latitude of first point in degrees
/// * `lon1` - Longitude of first point in degrees
/// * `lat2` - Latitude of second point in degrees
/// * `lon2` - Longitude of second point in degrees
///
/// # Returns
/// Distance in kilometers
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Great-circle distance between two coordinate records
///
/// Returns `Distance::Unavailable` when either side is missing a half or
/// carries a non-finite value.
#[inline]
pub fn geo_distance(a: &Coordinates, b: &Coordinates) -> Distance {
    match (a.valid(), b.valid()) {
        (Some((lat1, lon1)), Some((lat2, lon2))) => {
            Distance::Km(haversine_distance(lat1, lon1, lat2, lon2))
        }
        _ => Distance::Unavailable,
    }
}

/// `geo_distance` collapsed to kilometers (sentinel 9999 for bad input)
#[inline]
pub fn geo_distance_km(a: &Coordinates, b: &Coordinates) -> f64 {
    geo_distance(a, b).km()
}

/// Round to one decimal place for output
#[inline]
pub fn round_km(km: f64) -> f64 {
    (km * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_distance() {
        // Lahore to Islamabad (approximately 270 km)
        let distance = haversine_distance(31.5204, 74.3587, 33.6844, 73.0479);
        assert!((distance - 270.0).abs() < 15.0, "Distance should be ~270km, got {}", distance);
    }

    #[test]
    fn test_missing_half_is_sentinel() {
        let ok = Coordinates::new(31.5, 74.3);
        let missing = Coordinates {
            lat: Some(31.5),
            lng: None,
        };

        assert_eq!(geo_distance(&ok, &missing), Distance::Unavailable);
        assert_eq!(geo_distance_km(&missing, &ok), 9999.0);
        assert_eq!(geo_distance_km(&Coordinates::default(), &Coordinates::default()), 9999.0);
    }

    #[test]
    fn test_non_finite_is_sentinel() {
        let ok = Coordinates::new(31.5, 74.3);
        let nan = Coordinates {
            lat: Some(f64::NAN),
            lng: Some(74.3),
        };
        assert_eq!(geo_distance_km(&ok, &nan), 9999.0);
    }

    #[test]
    fn test_reflexive_and_symmetric() {
        let a = Coordinates::new(31.5204, 74.3587);
        let b = Coordinates::new(24.8607, 67.0011);

        assert_eq!(geo_distance_km(&a, &a), 0.0);
        assert_eq!(geo_distance_km(&a, &b), geo_distance_km(&b, &a));
    }

    #[test]
    fn test_round_km() {
        assert_eq!(round_km(12.345), 12.3);
        assert_eq!(round_km(12.36), 12.4);
    }
}
