//! River cross-section: three nested smoothstep reductions toward the water level.

use crate::seed::{det_pow, smoothstep};

/// Cross-section of one river site, in blocks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CarveShape {
    /// Half-width of the valley taper.
    pub valley_width: f64,
    /// Valley floor height above the water level.
    pub valley_depth: f64,
    /// Half-width of the bank step.
    pub bank_width: f64,
    /// Bank floor depth below the water level.
    pub bank_depth: f64,
    /// Half-width of the bed.
    pub bed_width: f64,
    /// Bed floor depth below the water level.
    pub bed_depth: f64,
    /// Exponent on the valley falloff. Above 1 narrows the valley, below 1 widens it.
    pub sharpness: f64,
}

#[inline]
fn pull_down(height: f64, floor: f64, f: f64) -> f64 {
    height - f * (height - floor).max(0.0)
}

/// Carve `height` at `distance` from the centre line toward `water_level`.
///
/// Returns the carved height and the river mask (0 at the centre, 1 outside
/// the bank). Both are non-increasing as `distance` shrinks, and nothing is
/// ever raised.
pub fn carve_profile(
    height: f64,
    distance: f64,
    water_level: f64,
    shape: &CarveShape,
) -> (f64, f64) {
    let d = distance.max(0.0);
    if d >= shape.valley_width {
        return (height, 1.0);
    }

    let fv = 1.0 - d / shape.valley_width;
    let mut h = pull_down(
        height,
        water_level + shape.valley_depth,
        det_pow(fv, shape.sharpness),
    );

    if d < shape.bank_width {
        let span = (shape.bank_width - shape.bed_width).max(f64::EPSILON);
        let fb = smoothstep((shape.bank_width - d) / span);
        h = pull_down(h, water_level - shape.bank_depth, fb);
    }

    if d < shape.bed_width {
        let f = smoothstep((shape.bed_width - d) / shape.bed_width);
        h = pull_down(h, water_level - shape.bed_depth, f);
    }

    let mask = 1.0 - smoothstep((shape.bank_width - d) / shape.bank_width);
    (h, mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn shape() -> CarveShape {
        CarveShape {
            valley_width: 30.0,
            valley_depth: 4.0,
            bank_width: 14.0,
            bank_depth: 1.0,
            bed_width: 7.0,
            bed_depth: 3.0,
            sharpness: 1.0,
        }
    }

    #[test]
    fn test_outside_valley_untouched() {
        assert_eq!(carve_profile(90.0, 30.0, 60.0, &shape()), (90.0, 1.0));
        assert_eq!(carve_profile(90.0, 100.0, 60.0, &shape()), (90.0, 1.0));
    }

    #[test]
    fn test_centre_reaches_bed_floor() {
        let (h, mask) = carve_profile(90.0, 0.0, 60.0, &shape());
        assert!((h - 57.0).abs() < 1e-9, "centre height {h}");
        assert_eq!(mask, 0.0);
    }

    #[test]
    fn test_never_raises_low_ground() {
        let (h, _) = carve_profile(40.0, 2.0, 60.0, &shape());
        assert!(h <= 40.0);
    }

    #[test]
    fn test_bank_edge_mask_is_one() {
        let (_, mask) = carve_profile(90.0, 14.0, 60.0, &shape());
        assert_eq!(mask, 1.0);
        let (_, inner) = carve_profile(90.0, 10.0, 60.0, &shape());
        assert!(inner < 1.0);
    }

    proptest! {
        #[test]
        fn prop_moving_inward_never_raises(
            height in -20.0..200.0f64,
            water in 40.0..90.0f64,
            sharpness in 0.25..2.0f64,
            near in 0.0..40.0f64,
            step in 0.0..40.0f64,
        ) {
            let s = CarveShape { sharpness, ..shape() };
            let far = near + step;
            let (h_near, m_near) = carve_profile(height, near, water, &s);
            let (h_far, m_far) = carve_profile(height, far, water, &s);
            prop_assert!(h_near <= h_far + 1e-9, "height rose: {} -> {}", h_far, h_near);
            prop_assert!(m_near <= m_far + 1e-12, "mask rose: {} -> {}", m_far, m_near);
            prop_assert!(h_near <= height + 1e-9);
        }
    }
}
