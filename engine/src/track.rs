//! Track interpolation.
//!
//! We only care about the direction an aircraft was moving in at the moment
//! of a ground transition, so this is deliberately a two-point bearing and
//! not a regression over the whole trace.
//!

use crate::Position;

/// Compass bearing (0 = north, clockwise) of the segment between the last
/// two points.  Earlier points are ignored.  `None` with fewer than two
/// points.
///
pub fn interpolate_track(positions: &[Position]) -> Option<f64> {
    let n = positions.len();
    if n < 2 {
        return None;
    }
    let (from, to) = (&positions[n - 2], &positions[n - 1]);
    Some(bearing(
        from.longitude,
        from.latitude,
        to.longitude,
        to.latitude,
    ))
}

/// Bearing of the vector (lon0, lat0) -> (lon1, lat1) in compass convention.
///
pub fn bearing(lon0: f64, lat0: f64, lon1: f64, lat1: f64) -> f64 {
    let deg = (lat1 - lat0).atan2(lon1 - lon0).to_degrees();
    (450. - deg).rem_euclid(360.)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use rstest::rstest;

    fn at(lon: f64, lat: f64) -> Position {
        Position {
            timestamp: Utc::now(),
            longitude: lon,
            latitude: lat,
            altitude: 0.,
            vertical_rate: None,
            track: None,
            onground: None,
        }
    }

    #[rstest]
    #[case((0., 0.), (0., 1.), 0.)] // north
    #[case((0., 0.), (-1., 0.), 270.)] // west
    #[case((0., 0.), (1., -1.), 135.)] // southeast
    #[case((0., 0.), (-1., 1.), 315.)] // northwest
    fn test_bearing(#[case] from: (f64, f64), #[case] to: (f64, f64), #[case] expected: f64) {
        let track = interpolate_track(&[at(from.0, from.1), at(to.0, to.1)]).unwrap();
        assert!((track - expected).abs() < 1e-9);
    }

    #[test]
    fn test_only_last_two_points_count() {
        let full = [at(42., -12.), at(7., 33.), at(0., 0.), at(0., 1.)];
        let tail = [at(0., 0.), at(0., 1.)];

        assert_eq!(interpolate_track(&tail), interpolate_track(&full));
    }

    #[test]
    fn test_too_few_points() {
        assert_eq!(None, interpolate_track(&[]));
        assert_eq!(None, interpolate_track(&[at(0., 0.)]));
    }
}
