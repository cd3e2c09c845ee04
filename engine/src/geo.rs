//! Great-circle geometry on a spherical Earth.

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Haversine distance between two points, in meters.
///
/// Symmetric and non-negative; identical points are zero apart.
///
/// # Examples
///
/// ```
/// use geoguard_engine::geo::distance_meters;
///
/// // One degree of latitude is roughly 111 km.
/// let d = distance_meters(0.0, 0.0, 1.0, 0.0);
/// assert!((d - 111_195.0).abs() < 1.0);
/// ```
#[must_use]
pub fn distance_meters(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push `a` a hair outside [0, 1] for antipodal points.
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Initial bearing from the first point towards the second, in `[0, 360)`.
#[must_use]
pub fn bearing_degrees(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();

    normalize_degrees(y.atan2(x).to_degrees())
}

/// Absolute difference between two bearings, wrapped into `[0, 360)`.
///
/// A reversal reads as 180; the pattern check treats anything strictly
/// between 90 and 270 as a sharp turn.
#[must_use]
pub fn bearing_change(from: f64, to: f64) -> f64 {
    normalize_degrees((to - from).abs())
}

/// Finite latitude within ±90 and finite longitude within ±180.
#[must_use]
pub fn is_valid_coordinate(lat: f64, lng: f64) -> bool {
    lat.is_finite() && lng.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)
}

fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoguard_testing::fixtures::{LONDON, NEW_YORK, SAN_FRANCISCO};
    use geoguard_testing::properties::coordinate;
    use proptest::prelude::*;

    #[test]
    fn test_known_city_distances() {
        let sf_ny = distance_meters(SAN_FRANCISCO.0, SAN_FRANCISCO.1, NEW_YORK.0, NEW_YORK.1);
        assert!((4_100_000.0..4_170_000.0).contains(&sf_ny), "got {sf_ny}");

        let ny_london = distance_meters(NEW_YORK.0, NEW_YORK.1, LONDON.0, LONDON.1);
        assert!((5_520_000.0..5_620_000.0).contains(&ny_london), "got {ny_london}");
    }

    #[test]
    fn test_cardinal_bearings() {
        assert!((bearing_degrees(0.0, 0.0, 1.0, 0.0) - 0.0).abs() < 1e-9);
        assert!((bearing_degrees(0.0, 0.0, 0.0, 1.0) - 90.0).abs() < 1e-9);
        assert!((bearing_degrees(1.0, 0.0, 0.0, 0.0) - 180.0).abs() < 1e-9);
        assert!((bearing_degrees(0.0, 1.0, 0.0, 0.0) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_bearing_change_wraps() {
        assert!((bearing_change(0.0, 180.0) - 180.0).abs() < f64::EPSILON);
        assert!((bearing_change(350.0, 10.0) - 340.0).abs() < f64::EPSILON);
        assert!((bearing_change(10.0, 10.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_coordinate_validity() {
        assert!(is_valid_coordinate(90.0, -180.0));
        assert!(!is_valid_coordinate(90.1, 0.0));
        assert!(!is_valid_coordinate(0.0, 180.5));
        assert!(!is_valid_coordinate(f64::NAN, 0.0));
        assert!(!is_valid_coordinate(0.0, f64::INFINITY));
    }

    proptest! {
        #[test]
        fn prop_distance_is_symmetric(a in coordinate(), b in coordinate()) {
            let ab = distance_meters(a.0, a.1, b.0, b.1);
            let ba = distance_meters(b.0, b.1, a.0, a.1);
            prop_assert!((ab - ba).abs() < 1e-6);
            prop_assert!(ab >= 0.0);
        }

        #[test]
        fn prop_distance_to_self_is_zero(a in coordinate()) {
            prop_assert!(distance_meters(a.0, a.1, a.0, a.1).abs() < 1e-6);
        }

        #[test]
        fn prop_bearing_in_range(a in coordinate(), b in coordinate()) {
            let bearing = bearing_degrees(a.0, a.1, b.0, b.1);
            prop_assert!((0.0..360.0).contains(&bearing));
        }
    }
}
