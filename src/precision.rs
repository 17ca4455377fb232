//! Diagnostics that measure how closely two values of the same format agree.
//! These are used by the solver to decide when iterative refinement has
//! converged.

use super::bits::BitSeq;
use super::error::Result;
use super::float::{ExpRange, FloatValue, WideExp};
use core::cmp::Ordering;
use tracing::warn;

/// Returns the number of bits needed to express the difference between two
/// mantissas read as unsigned integers: `floor(log2(|a - b|)) + 1`, or zero
/// if they are equal.
fn mantissa_error(a: &BitSeq, b: &BitSeq) -> usize {
    let diff = match a.magnitude_compare(b) {
        Ordering::Equal => return 0,
        Ordering::Greater => a.subtract(b),
        Ordering::Less => b.subtract(a),
    };
    diff.significant_bits()
}

impl FloatValue {
    /// Returns true if `self` is within `2^(e - k - 1)` of `other`, where `e`
    /// is the exponent of `other`. In other words, the two values agree to
    /// `k` bits relative to `other`.
    pub fn matches_within_precision(
        &self,
        other: &Self,
        k: usize,
    ) -> Result<bool> {
        self.get_format().check_same(&other.get_format())?;
        let format = self.get_format();
        let exp_len = format.get_exponent_len();

        // Any shift past 2^E leaves the exponent range.
        let limit = 1usize.checked_shl(exp_len as u32).unwrap_or(usize::MAX);
        let shift = k.saturating_add(1).min(limit);
        let wide = WideExp::from_field(format, other.get_exponent());
        let exponent = match wide.sub_small(shift).classify() {
            ExpRange::InRange(e) => e,
            _ => {
                warn!(
                    k,
                    "value too small to check precision properly, using the \
                     smallest exponent as the threshold"
                );
                BitSeq::from_u64(exp_len, 1)
            }
        };
        let mantissa = BitSeq::zeros(format.get_mantissa_len());
        let max_error = Self::from_parts(format, false, exponent, mantissa);

        let diff = self.sub(other)?.abs();
        diff.is_le(&max_error)
    }

    /// Estimates how many leading mantissa bits of `self` agree with `other`,
    /// assuming both are the same number computed at slightly different
    /// precisions. Returns the mantissa length for identical values, zero if
    /// `other` is much larger, and a negative score if `self` is much
    /// larger. A NaN or infinity that does not match the other value scores
    /// `-i64::MAX`.
    pub fn matching_mantissa_bits(&self, other: &Self) -> Result<i64> {
        self.get_format().check_same(&other.get_format())?;
        let m = self.get_mantissa_len();

        match (self.is_nan(), other.is_nan()) {
            (true, true) => return Ok(m as i64),
            (false, false) => {}
            _ => {
                warn!("matching mantissa bits of NaN against a number");
                return Ok(-i64::MAX);
            }
        }
        match (self.is_inf(), other.is_inf()) {
            (true, true) if self.get_sign() == other.get_sign() => {
                return Ok(m as i64);
            }
            (false, false) => {}
            _ => {
                warn!("matching mantissa bits of infinity against a number");
                return Ok(-i64::MAX);
            }
        }

        let ord = self.get_exponent().magnitude_compare(other.get_exponent());
        let error_bits = match ord {
            Ordering::Equal => {
                mantissa_error(self.get_mantissa(), other.get_mantissa())
            }
            _ => {
                let (hi, lo) = match ord {
                    Ordering::Greater => (self, other),
                    _ => (other, self),
                };
                let gap = hi
                    .get_exponent()
                    .subtract(lo.get_exponent())
                    .to_u64_saturating()
                    .min(i64::MAX as u64 / 2);

                if gap == 1 {
                    // Move the lower value to the exponent of the higher one.
                    let hi_bits = hi.get_significand();
                    let lo_bits = BitSeq::from_bools(&[false, true])
                        .concat(&lo.get_mantissa().slice(0, m - 1));
                    mantissa_error(&hi_bits, &lo_bits)
                } else if ord == Ordering::Less {
                    return Ok(0);
                } else {
                    // Penalize by the exponent gap, and one more bit if the
                    // mantissa pushes the value further away.
                    let mut penalty = gap;
                    let scan = (gap as usize).min(m);
                    if (0..scan).any(|i| self.get_mantissa().get(i)) {
                        penalty += 1;
                    }
                    return Ok(-(penalty as i64));
                }
            }
        };
        Ok(m as i64 - error_bits as i64)
    }

    /// Returns |other - self|.
    pub fn absolute_error(&self, other: &Self) -> Result<Self> {
        Ok(other.sub(self)?.abs())
    }

    /// Returns |other - self| / |other|.
    pub fn relative_error(&self, other: &Self) -> Result<Self> {
        self.absolute_error(other)?.div(&other.abs())
    }

    /// Returns |other - self| computed with native doubles.
    pub fn absolute_error_f64(&self, other: f64) -> f64 {
        (other - self.as_f64()).abs()
    }

    /// Returns |other - self| / |other| computed with native doubles.
    pub fn relative_error_f64(&self, other: f64) -> f64 {
        self.absolute_error_f64(other) / other.abs()
    }
}

#[cfg(test)]
use super::float::{FP16, FP32, FP64};

#[test]
fn test_matches_within_precision() {
    let one = FloatValue::from_f64(FP32, 1.0);
    let close = FloatValue::from_f64(FP32, 1.0 + 2f64.powi(-10));
    assert!(close.matches_within_precision(&one, 8).unwrap());
    assert!(close.matches_within_precision(&one, 9).unwrap());
    assert!(!close.matches_within_precision(&one, 10).unwrap());
    assert!(one.matches_within_precision(&one, 23).unwrap());

    let neg = FloatValue::from_f64(FP32, -1.0);
    assert!(!neg.matches_within_precision(&one, 1).unwrap());

    let nan = FloatValue::nan(FP32);
    assert!(!nan.matches_within_precision(&one, 1).unwrap());
}

#[test]
fn test_matches_within_precision_underflow() {
    // The threshold exponent would go below the range. The smallest exponent
    // is used instead.
    let small = FloatValue::from_f64(FP16, 2f64.powi(-14));
    assert!(small.matches_within_precision(&small, 5).unwrap());
    let other = FloatValue::from_f64(FP16, 2f64.powi(-12));
    assert!(!other.matches_within_precision(&small, 5).unwrap());
}

#[test]
fn test_matches_within_precision_huge_k() {
    // The threshold falls back to the smallest exponent.
    let one = FloatValue::from_f64(FP32, 1.0);
    assert!(one.matches_within_precision(&one, usize::MAX).unwrap());
    let near = FloatValue::from_f64(FP32, 1.0 + 2f64.powi(-23));
    assert!(!near.matches_within_precision(&one, usize::MAX).unwrap());
    let far = FloatValue::from_f64(FP64, 3.0);
    let one = FloatValue::from_f64(FP64, 1.0);
    assert!(!far.matches_within_precision(&one, 1 << 20).unwrap());
}

#[test]
fn test_matching_mantissa_bits() {
    let v = |x: f64| FloatValue::from_f64(FP32, x);

    let one = v(1.0);
    assert_eq!(one.matching_mantissa_bits(&one).unwrap(), 23);

    // The last three mantissa bits differ.
    let close = v(1.0 + 2f64.powi(-20));
    assert_eq!(close.matching_mantissa_bits(&one).unwrap(), 19);
    assert_eq!(one.matching_mantissa_bits(&close).unwrap(), 19);

    // Neighbors across a power of two.
    let below = v(2.0 - 2f64.powi(-23));
    let two = v(2.0);
    assert_eq!(below.matching_mantissa_bits(&two).unwrap(), 22);
    assert_eq!(two.matching_mantissa_bits(&below).unwrap(), 22);

    // Far apart.
    assert_eq!(one.matching_mantissa_bits(&v(8.0)).unwrap(), 0);
    assert_eq!(v(8.0).matching_mantissa_bits(&one).unwrap(), -3);
    assert_eq!(v(12.0).matching_mantissa_bits(&one).unwrap(), -4);
}

#[test]
fn test_matching_mantissa_bits_special() {
    let nan = FloatValue::nan(FP32);
    let inf = FloatValue::inf(FP32, false);
    let one = FloatValue::one(FP32, false);
    assert_eq!(nan.matching_mantissa_bits(&nan).unwrap(), 23);
    assert_eq!(nan.matching_mantissa_bits(&one).unwrap(), -i64::MAX);
    assert_eq!(one.matching_mantissa_bits(&nan).unwrap(), -i64::MAX);
    assert_eq!(inf.matching_mantissa_bits(&inf).unwrap(), 23);
    assert_eq!(inf.matching_mantissa_bits(&-&inf).unwrap(), -i64::MAX);
    assert_eq!(one.matching_mantissa_bits(&inf).unwrap(), -i64::MAX);

    let other = FloatValue::one(FP16, false);
    assert!(one.matching_mantissa_bits(&other).is_err());
}

#[test]
fn test_error_measures() {
    let a = FloatValue::from_f64(FP32, 1.5);
    let b = FloatValue::from_f64(FP32, -2.0);
    assert_eq!(a.absolute_error(&b).unwrap().as_f64(), 3.5);
    assert_eq!(a.relative_error(&b).unwrap().as_f64(), 1.75);
    assert_eq!(a.absolute_error_f64(1.0), 0.5);
    assert_eq!(a.relative_error_f64(-3.0), 1.5);
}
