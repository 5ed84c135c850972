//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Convert a count to f64 while allowing precision loss in a single location.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Convert an unsigned counter to f64 while allowing precision loss in a single location.
#[must_use]
pub fn u64_to_f64(value: u64) -> f64 {
    cast::<u64, f64>(value).unwrap_or(0.0)
}

/// Ratio of `part` to `whole`, returning 0.0 when `whole` is zero.
#[must_use]
pub fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    usize_to_f64(part) / usize_to_f64(whole)
}

/// Round a f64 and clamp it to the u64 range, returning 0 for non-finite or negative values.
#[must_use]
pub fn round_f64_to_u64(value: f64) -> u64 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    let max = cast::<u64, f64>(u64::MAX).unwrap_or(f64::MAX);
    cast::<f64, u64>(value.min(max).round()).unwrap_or(0)
}

/// Convert a fraction in `[0, 1]` to a whole percentage, rounding half away from zero.
#[must_use]
pub fn percent(fraction: f64) -> u32 {
    let rounded = round_f64_to_u64(fraction * 100.0);
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

/// Round to a single decimal place, returning 0.0 for non-finite values.
#[must_use]
pub fn round_one_decimal(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_handles_zero_denominator() {
        assert!(ratio(3, 0).abs() < f64::EPSILON);
        assert!((ratio(3, 30) - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn rounders_cover_ranges() {
        assert_eq!(round_f64_to_u64(1.6), 2);
        assert_eq!(round_f64_to_u64(f64::NAN), 0);
        assert_eq!(round_f64_to_u64(-4.0), 0);
        assert_eq!(percent(0.333), 33);
        assert_eq!(percent(0.005), 1);
    }

    #[test]
    fn one_decimal_rounding() {
        assert!((round_one_decimal(2.345) - 2.3).abs() < 1e-9);
        assert!((round_one_decimal(f64::INFINITY)).abs() < f64::EPSILON);
    }
}
