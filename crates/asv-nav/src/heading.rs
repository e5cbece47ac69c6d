//! Compass bearing to mathematical yaw.
//!
//! Bearing: 0° = north, clockwise positive. Yaw: 0° = east,
//! counter-clockwise positive. Both are reported in degrees on [0, 360).

/// Reduce any finite angle onto [0, 360).
pub fn normalize_deg(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if a >= 360.0 { 0.0 } else { a }
}

/// `yaw = normalize(90 - normalize(bearing))`.
///
/// Bearings outside [0, 360) are reduced first, so 450° behaves as 90°
/// and -90° as 270°.
pub fn heading_to_yaw(bearing_deg: f64) -> f64 {
    normalize_deg(90.0 - normalize_deg(bearing_deg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cardinal_points() {
        assert_eq!(heading_to_yaw(0.0), 90.0);
        assert_eq!(heading_to_yaw(90.0), 0.0);
        assert_eq!(heading_to_yaw(180.0), 270.0);
        assert_eq!(heading_to_yaw(270.0), 180.0);
    }

    #[test]
    fn bearings_past_a_full_turn_are_reduced() {
        assert_eq!(heading_to_yaw(450.0), heading_to_yaw(90.0));
        assert_eq!(heading_to_yaw(720.0), 90.0);
        assert_eq!(heading_to_yaw(360.0), 90.0);
    }

    #[test]
    fn negative_bearings() {
        assert_eq!(heading_to_yaw(-90.0), 180.0);
        assert_eq!(heading_to_yaw(-10.0), 100.0);
    }

    #[test]
    fn output_stays_in_range() {
        let mut b = -1000.0;
        while b < 1000.0 {
            let y = heading_to_yaw(b);
            assert!((0.0..360.0).contains(&y), "bearing {b} gave yaw {y}");
            b += 7.3;
        }
    }

    #[test]
    fn matches_plain_formula_inside_range() {
        for b in [0.5, 45.0, 89.9, 135.0, 200.0, 359.0] {
            assert!((heading_to_yaw(b) - normalize_deg(90.0 - b)).abs() < 1e-12);
        }
    }
}
