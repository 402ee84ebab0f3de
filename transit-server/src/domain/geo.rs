//! Great-circle distance.

/// Mean Earth radius in metres.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in metres between two points given in degrees.
pub fn distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_for_same_point() {
        assert_eq!(distance_m(44.8, 20.4, 44.8, 20.4), 0.0);
    }

    #[test]
    fn one_degree_of_latitude() {
        // 2 * pi * R / 360
        let d = distance_m(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_194.9).abs() < 1.0, "got {d}");
    }

    #[test]
    fn belgrade_to_novi_sad() {
        // Roughly 70 km apart.
        let d = distance_m(44.8125, 20.4612, 45.2671, 19.8335);
        assert!((68_000.0..72_000.0).contains(&d), "got {d}");
    }
}
