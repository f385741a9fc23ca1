use serde::{Deserialize, Serialize};

pub const DEFAULT_SLIDER_DIVISIONS: u32 = 6;

/// Recommended slider bounds for one item. Presentation only: the split
/// model accepts values between steps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SliderSpec {
    pub min: f64,
    pub max: f64,
    /// `None` when the price is too small for a whole-unit step.
    pub step: Option<f64>,
}

/// Bounds never invert: below one unit the range collapses onto
/// `[max, max]`, and items priced at or below zero get `[0, 0]`.
pub fn slider_spec(total_price: f64, divisions: u32) -> SliderSpec {
    let divisions = divisions.max(1) as f64;
    let max = total_price.max(0.0);
    let step = (max / divisions).floor();
    SliderSpec {
        min: 1.0_f64.min(max),
        max,
        step: if step >= 1.0 { Some(step) } else { None },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_is_floor_of_sixth() {
        let s = slider_spec(300.0, DEFAULT_SLIDER_DIVISIONS);
        assert_eq!(s.step, Some(50.0));
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 300.0);
        assert_eq!(slider_spec(100.0, 6).step, Some(16.0));
    }

    #[test]
    fn tiny_price_is_continuous() {
        assert_eq!(slider_spec(5.0, 6).step, None);
        assert_eq!(slider_spec(5.0, 0).step, Some(5.0));
    }

    #[test]
    fn sub_unit_and_non_positive_prices_never_invert() {
        for price in [0.5, 0.0, -50.0, f64::NAN] {
            let s = slider_spec(price, DEFAULT_SLIDER_DIVISIONS);
            assert!(s.min <= s.max, "{} -> {:?}", price, s);
            assert_eq!(s.step, None);
        }
        assert_eq!(slider_spec(0.5, 6), SliderSpec { min: 0.5, max: 0.5, step: None });
        assert_eq!(slider_spec(-50.0, 6), SliderSpec { min: 0.0, max: 0.0, step: None });
    }
}
