// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Float canonicalization for deterministic comparison and hashing.
//!
//! Geometry coming out of an editor carries floating point noise (a plane that
//! was rotated back and forth rarely lands on the exact same bits). Fingerprints
//! therefore hash a projection of each float onto a fixed number of significant
//! decimal digits instead of the raw bits.

/// A float projected onto a fixed number of significant decimal digits.
///
/// Two values that round to the same digits produce equal `Canonical`s.
/// Do NOT use this to mutate stored geometry; it is a projection for hashing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Canonical {
    /// Finite value equal to `mantissa * 10^exponent`, trailing zeros stripped.
    Finite {
        /// Signed significand.
        mantissa: i64,
        /// Power of ten applied to the significand.
        exponent: i32,
    },
    /// NaN (0), positive infinity (1), or negative infinity (2).
    NonFinite(u8),
}

impl Canonical {
    /// Fixed-width little-endian encoding used as hash input.
    pub fn to_le_bytes(self) -> [u8; 13] {
        let mut out = [0u8; 13];
        match self {
            Self::Finite { mantissa, exponent } => {
                out[0] = 0;
                out[1..9].copy_from_slice(&mantissa.to_le_bytes());
                out[9..13].copy_from_slice(&exponent.to_le_bytes());
            }
            Self::NonFinite(tag) => {
                out[0] = 1;
                out[1] = tag;
            }
        }
        out
    }
}

/// Largest digit count that still fits an f64 significand without noise.
const MAX_DIGITS: u32 = 15;

/// Round `x` to `digits` significant decimal digits.
///
/// `digits` is clamped to `1..=15`. Negative zero folds to zero. Non-finite
/// inputs map to [`Canonical::NonFinite`] instead of panicking so that hashing a
/// malformed scene stays total.
pub fn canonicalize_f64(x: f64, digits: u32) -> Canonical {
    if x.is_nan() {
        return Canonical::NonFinite(0);
    }
    if x.is_infinite() {
        return Canonical::NonFinite(if x > 0.0 { 1 } else { 2 });
    }
    if x == 0.0 {
        return Canonical::Finite {
            mantissa: 0,
            exponent: 0,
        };
    }

    let digits = digits.clamp(1, MAX_DIGITS) as i32;
    let magnitude = x.abs().log10().floor() as i32;
    let mut exponent = magnitude - (digits - 1);
    let mut mantissa = scale(x, exponent).round() as i64;

    // log10 near a power of ten, or a round-up like 9.999996 -> 10.00000,
    // can leave one digit too many.
    let limit = 10u64.pow(digits as u32);
    if mantissa.unsigned_abs() >= limit {
        mantissa = (mantissa as f64 / 10.0).round() as i64;
        exponent += 1;
    }
    if mantissa == 0 {
        return Canonical::Finite {
            mantissa: 0,
            exponent: 0,
        };
    }
    while mantissa % 10 == 0 {
        mantissa /= 10;
        exponent += 1;
    }
    Canonical::Finite { mantissa, exponent }
}

/// `x / 10^exponent` without overflowing or underflowing the power of ten.
///
/// Subnormal inputs need powers past `10^308`, so large negative exponents are
/// applied in two halves.
fn scale(x: f64, exponent: i32) -> f64 {
    if exponent >= 0 {
        return x / 10f64.powi(exponent);
    }
    let up = -exponent;
    if up <= 300 {
        x * 10f64.powi(up)
    } else {
        let half = up / 2;
        x * 10f64.powi(half) * 10f64.powi(up - half)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finite(mantissa: i64, exponent: i32) -> Canonical {
        Canonical::Finite { mantissa, exponent }
    }

    #[test]
    fn test_negative_zero() {
        assert_eq!(canonicalize_f64(-0.0, 6), canonicalize_f64(0.0, 6));
    }

    #[test]
    fn test_rounds_to_significant_digits() {
        assert_eq!(canonicalize_f64(1.234_567_9, 6), finite(123457, -5));
        assert_eq!(canonicalize_f64(-1.234_567_9, 6), finite(-123457, -5));
        assert_eq!(canonicalize_f64(123_456_789.0, 6), finite(123457, 3));
    }

    #[test]
    fn test_trailing_zeros_stripped() {
        assert_eq!(canonicalize_f64(64.0, 6), finite(64, 0));
        assert_eq!(canonicalize_f64(1000.0, 6), finite(1, 3));
        assert_eq!(canonicalize_f64(0.5, 6), finite(5, -1));
    }

    #[test]
    fn test_round_up_carry() {
        assert_eq!(canonicalize_f64(9.999_999_9, 6), finite(1, 1));
        assert_eq!(canonicalize_f64(99.999_999, 6), canonicalize_f64(100.0, 6));
    }

    #[test]
    fn test_noise_below_precision_is_absorbed() {
        assert_eq!(
            canonicalize_f64(64.0, 6),
            canonicalize_f64(64.000_000_1, 6)
        );
        assert_eq!(canonicalize_f64(0.707_106_78, 6), canonicalize_f64(0.707_106_9, 6));
    }

    #[test]
    fn test_changes_above_precision_survive() {
        assert_ne!(canonicalize_f64(64.0, 6), canonicalize_f64(64.01, 6));
        assert_ne!(canonicalize_f64(64.0, 6), canonicalize_f64(-64.0, 6));
    }

    #[test]
    fn test_digits_are_clamped() {
        assert_eq!(canonicalize_f64(1.5, 0), canonicalize_f64(1.5, 1));
        assert_eq!(canonicalize_f64(1.5, 40), canonicalize_f64(1.5, 15));
    }

    #[test]
    fn test_non_finite_does_not_panic() {
        assert_eq!(canonicalize_f64(f64::NAN, 6), Canonical::NonFinite(0));
        assert_eq!(canonicalize_f64(f64::INFINITY, 6), Canonical::NonFinite(1));
        assert_eq!(
            canonicalize_f64(f64::NEG_INFINITY, 6),
            Canonical::NonFinite(2)
        );
    }

    #[test]
    fn test_subnormals_keep_their_digits() {
        assert_eq!(canonicalize_f64(1e-310, 6), finite(1, -310));
        assert_ne!(canonicalize_f64(1e-310, 6), canonicalize_f64(1.5e-310, 6));
        assert_ne!(canonicalize_f64(1e-310, 15), canonicalize_f64(1.5e-310, 15));

        let Canonical::Finite { mantissa, exponent } = canonicalize_f64(5e-324, 6) else {
            panic!("smallest subnormal is finite");
        };
        assert!(mantissa > 0 && mantissa < 1_000_000);
        assert!(exponent < -320);
    }

    #[test]
    fn test_negative_subnormal_mirrors_positive() {
        for digits in [1, 6, 15] {
            let positive = canonicalize_f64(1e-320, digits);
            let negative = canonicalize_f64(-1e-320, digits);
            match (positive, negative) {
                (
                    Canonical::Finite { mantissa: p, exponent: pe },
                    Canonical::Finite { mantissa: n, exponent: ne },
                ) => {
                    assert_eq!(p, -n);
                    assert_eq!(pe, ne);
                    assert!(p.unsigned_abs() < 10u64.pow(digits));
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_largest_finite_values() {
        assert_eq!(canonicalize_f64(f64::MAX, 6), finite(179769, 303));
        assert_eq!(canonicalize_f64(-f64::MAX, 6), finite(-179769, 303));
    }

    #[test]
    fn test_byte_encoding_distinguishes_tags() {
        let zero = canonicalize_f64(0.0, 6).to_le_bytes();
        let nan = Canonical::NonFinite(0).to_le_bytes();
        assert_ne!(zero, nan);
    }
}
