use super::bits::BitSeq;
use super::float::{round_fraction, Category, ExpRange, WideExp};
use super::float::{FloatValue, Format, FP32};
use super::utils::mask;
use core::cmp::Ordering;

const F64_MANTISSA: usize = 52;
const F64_BIAS: i64 = 1023;

/// Returns the power of two `2^k` as a native double, or zero if it is below
/// the subnormal range.
fn pow2(k: i64) -> f64 {
    debug_assert!(k <= F64_BIAS);
    if k >= 1 - F64_BIAS {
        f64::from_bits(((k + F64_BIAS) as u64) << F64_MANTISSA)
    } else if k >= 1 - F64_BIAS - F64_MANTISSA as i64 {
        f64::from_bits(1u64 << (k + F64_BIAS - 1 + F64_MANTISSA as i64))
    } else {
        0.0
    }
}

impl FloatValue {
    /// Creates a new value of `format` from a native double. This is the
    /// same as [`FloatValue::from_f64`].
    pub fn new(format: Format, val: f64) -> Self {
        Self::from_f64(format, val)
    }

    /// Loads a native double. The exponent is exact, and the mantissa is
    /// truncated (not rounded) to the mantissa length of `format`. Values
    /// that are too large for the exponent field become infinity, and values
    /// that are too small become zero.
    pub fn from_f64(format: Format, val: f64) -> Self {
        let sign = val.is_sign_negative();
        if val.is_nan() {
            return Self::nan_with_sign(format, sign);
        }
        if val.is_infinite() {
            return Self::inf(format, sign);
        }
        if val == 0.0 {
            return Self::zero(format, sign);
        }

        let bits = val.to_bits();
        let biased_exp = ((bits >> F64_MANTISSA) & mask(11)) as i64;
        let mut fraction = bits & mask(F64_MANTISSA);
        let mut exp = biased_exp - F64_BIAS;

        if biased_exp == 0 {
            // Denormal input. Move the leading one to the implicit position.
            let msb = 63 - fraction.leading_zeros() as i64;
            fraction = (fraction << (F64_MANTISSA as i64 - msb))
                & mask(F64_MANTISSA);
            exp = msb + 1 - F64_BIAS - F64_MANTISSA as i64;
        }

        let wide = WideExp::from_i64(format, exp).add(&WideExp::bias(format));
        let exponent = match wide.classify() {
            ExpRange::Underflow => return Self::zero(format, sign),
            ExpRange::Overflow => return Self::inf(format, sign),
            ExpRange::InRange(e) => e,
        };
        let mantissa = BitSeq::from_u64(F64_MANTISSA, fraction)
            .resized(format.get_mantissa_len());

        Self::from_parts(format, sign, exponent, mantissa)
    }

    /// Loads a native float. See `from_f64`.
    pub fn from_f32(format: Format, val: f32) -> Self {
        Self::from_f64(format, val as f64)
    }

    /// Returns the value as a native double. Values with a wider mantissa are
    /// rounded to nearest-even, and values outside of the double range
    /// overflow to infinity or round into the denormal range.
    pub fn as_f64(&self) -> f64 {
        let sign = self.get_sign();
        match self.get_category() {
            Category::Zero => {
                if sign {
                    -0.0
                } else {
                    0.0
                }
            }
            Category::Infinity => {
                if sign {
                    f64::NEG_INFINITY
                } else {
                    f64::INFINITY
                }
            }
            Category::NaN => {
                if sign {
                    -f64::NAN
                } else {
                    f64::NAN
                }
            }
            Category::Normal => self.normal_as_f64(),
        }
    }

    fn normal_as_f64(&self) -> f64 {
        let format = self.get_format();
        let (fraction, carry) =
            round_fraction(self.get_mantissa(), F64_MANTISSA);
        let wide = WideExp::from_field(format, self.get_exponent())
            .sub(&WideExp::bias(format));
        let mut exp = wide.to_i64_saturating();
        if carry {
            exp = exp.saturating_add(1);
        }
        let fraction = fraction.to_u64_saturating();
        let sign_bit = (self.get_sign() as u64) << 63;

        if exp > F64_BIAS {
            return f64::from_bits(sign_bit | (mask(11) << F64_MANTISSA));
        }
        if exp > -F64_BIAS {
            let biased = ((exp + F64_BIAS) as u64) << F64_MANTISSA;
            return f64::from_bits(sign_bit | biased | fraction);
        }

        // Below the normal double range. Scale in two steps so that only the
        // last multiplication rounds.
        let significand =
            f64::from_bits(((F64_BIAS as u64) << F64_MANTISSA) | fraction);
        let res = significand * pow2(1 - F64_BIAS) * pow2(exp + F64_BIAS - 1);
        if self.get_sign() {
            -res
        } else {
            res
        }
    }

    /// Returns the value as a native float, by casting to the single
    /// precision layout first.
    pub fn as_f32(&self) -> f32 {
        self.cast_to(FP32).as_f64() as f32
    }

    /// Returns a copy of the value in the layout `to`. See `cast`.
    pub fn cast_to(&self, to: Format) -> Self {
        let mut res = self.clone();
        res.cast(to);
        res
    }

    /// Converts the value in place to the layout `to`. NaN and infinity keep
    /// their kind. For normal numbers the exponent is converted first, and
    /// saturates to infinity or zero if it does not fit. The mantissa is then
    /// zero padded or rounded to nearest-even, and a rounding carry is
    /// propagated into the exponent.
    pub fn cast(&mut self, to: Format) {
        if self.get_format() == to {
            return;
        }
        let sign = self.get_sign();
        *self = match self.get_category() {
            Category::NaN => Self::nan_with_sign(to, sign),
            Category::Infinity => Self::inf(to, sign),
            Category::Zero => Self::zero(to, sign),
            Category::Normal => self.cast_normal(to),
        }
    }

    fn cast_normal(&self, to: Format) -> Self {
        let sign = self.get_sign();
        let from_len = self.get_exponent_len();
        let to_len = to.get_exponent_len();
        let old = self.get_exponent();
        let lead = BitSeq::from_bools(&[old.get(0)]);

        // Changing the width of the exponent changes the bias. The leading
        // bit stays in place, and the bits after it are filled with (or must
        // be) the complement of the leading bit.
        let complement = |k: usize| {
            if old.get(0) {
                BitSeq::zeros(k)
            } else {
                BitSeq::ones(k)
            }
        };
        let mut exponent = match to_len.cmp(&from_len) {
            Ordering::Equal => old.clone(),
            Ordering::Greater => {
                let k = to_len - from_len;
                lead.concat(&complement(k)).concat(&old.slice(1, from_len))
            }
            Ordering::Less => {
                let k = from_len - to_len;
                if old.slice(1, k + 1) != complement(k) {
                    if old.get(0) {
                        return Self::inf(to, sign);
                    }
                    return Self::zero(to, sign);
                }
                let e = lead.concat(&old.slice(k + 1, from_len));
                if e.is_all_one() {
                    return Self::inf(to, sign);
                }
                e
            }
        };

        let (mantissa, carry) =
            round_fraction(self.get_mantissa(), to.get_mantissa_len());
        if carry {
            let wrapped = exponent.increment();
            if wrapped || exponent.is_all_one() {
                return Self::inf(to, sign);
            }
        }

        Self::from_parts(to, sign, exponent, mantissa)
    }
}

#[test]
fn test_round_trip_native() {
    use super::float::FP64;
    use super::utils;

    let pi = 355. / 113.;
    let a = FloatValue::from_f64(FP64, pi);
    assert_eq!(pi, a.as_f64());

    let f = f32::from_bits(0x41700000);
    let a = FloatValue::from_f32(FP32, f);
    assert_eq!(f, a.as_f32());

    for v in [0.0, -0.0, f64::INFINITY, f64::NEG_INFINITY] {
        let r = FloatValue::from_f64(FP64, v).as_f64();
        assert_eq!(r.to_bits(), v.to_bits());
        let r = FloatValue::from_f64(FP32, v).as_f64();
        assert_eq!(r.to_bits(), v.to_bits());
    }
    assert!(FloatValue::from_f64(FP64, f64::NAN).as_f64().is_nan());
    assert!(FloatValue::from_f64(FP32, -f64::NAN).is_nan());
    assert!(FloatValue::from_f64(FP32, -f64::NAN).is_negative());

    let mut lfsr = utils::Lfsr::new();
    for _ in 0..5000 {
        let v = f64::from_bits(lfsr.get64());
        if !v.is_normal() {
            continue;
        }
        let a = FloatValue::from_f64(FP64, v);
        assert_eq!(a.as_f64().to_bits(), v.to_bits());
        // Going through the representation again gives the same bits.
        let b = FloatValue::from_f64(FP64, a.as_f64());
        assert_eq!(a.bit_string(), b.bit_string());
    }
}

#[test]
fn test_load_store_all_f32() {
    // Try to load and store normals, infinities and NaNs.
    for i in 0..(1u64 << 16) {
        let in_f = f32::from_bits((i << 16) as u32);
        if in_f.is_subnormal() {
            continue;
        }
        let fp_f = FloatValue::from_f32(FP32, in_f);
        let out_f = fp_f.as_f32();
        assert_eq!(in_f.is_nan(), out_f.is_nan());
        assert_eq!(in_f.is_infinite(), out_f.is_infinite());
        assert!(in_f.is_nan() || (in_f.to_bits() == out_f.to_bits()));
    }
}

#[test]
fn test_cast_round_trip() {
    use super::float::FP64;
    use super::utils;

    // float -> double -> float keeps the bit pattern.
    let mut lfsr = utils::Lfsr::new_with_seed(7);
    for _ in 0..5000 {
        let f = f32::from_bits(lfsr.get64() as u32);
        if !f.is_normal() {
            continue;
        }
        let a = FloatValue::from_f32(FP32, f);
        let wide = a.cast_to(FP64);
        assert_eq!(wide.as_f64(), f as f64);
        let back = wide.cast_to(FP32);
        assert_eq!(back.bit_string(), a.bit_string());
    }

    // Casting propagates inf/nan.
    let a = FloatValue::from_f32(FP32, f32::NEG_INFINITY);
    let b = a.cast_to(FP64);
    assert!(b.is_inf());
    assert!(b.is_negative());
    assert!(FloatValue::nan(FP32).cast_to(FP64).is_nan());
    assert!(FloatValue::zero(FP32, true).cast_to(FP64).is_negative());
}

#[test]
fn test_cast_down_matches_hardware() {
    use super::float::FP64;
    use super::utils;

    let values = [0.3, 0.1, 14151241515., 14151215., 0.0000000001, 1e9];
    for v in values.iter().chain(utils::get_special_test_values().iter()) {
        let expected = *v as f32;
        if expected.is_subnormal() {
            continue;
        }
        let res = FloatValue::from_f64(FP64, *v).cast_to(FP32).as_f32();
        assert_eq!(v.is_nan(), res.is_nan());
        assert!(v.is_nan() || res.to_bits() == expected.to_bits());
    }

    // The rounding carry moves into the exponent.
    let v = 2.0 - f64::EPSILON;
    let res = FloatValue::from_f64(FP64, v).cast_to(FP32);
    assert_eq!(res.as_f64(), 2.0);

    // And can overflow the exponent.
    let v = (2.0 - f64::EPSILON) * 2f64.powi(127);
    let res = FloatValue::from_f64(FP64, v).cast_to(FP32);
    assert!(res.is_inf());
    assert_eq!(v as f32, f32::INFINITY);
}

#[test]
fn test_cast_saturation() {
    use super::float::FP64;

    let big = FloatValue::from_f64(FP64, 2.0 * f32::MAX as f64);
    let res = big.cast_to(FP32);
    assert!(res.is_inf());
    assert!(!res.is_negative());

    let small = FloatValue::from_f64(FP64, -1e-45);
    let res = small.cast_to(FP32);
    assert!(res.is_zero());
    assert!(res.is_negative());

    // The largest exponent of the narrow format is still in range.
    let max = FloatValue::from_f64(FP64, f32::MAX as f64).cast_to(FP32);
    assert_eq!(max.as_f32(), f32::MAX);
}

#[test]
fn test_from_f64_truncates() {
    use super::float::FP64;

    // Constructing a float truncates the mantissa.
    let direct = FloatValue::from_f64(FP32, 0.1);
    assert_eq!(direct.as_f32().to_bits(), 0x3dcccccc);
    // Casting from a wider format rounds to nearest.
    let cast = FloatValue::from_f64(FP64, 0.1).cast_to(FP32);
    assert_eq!(cast.as_f32().to_bits(), 0x3dcccccd);
    assert_eq!(cast.as_f32(), 0.1f32);
    assert!(direct.is_lt(&cast).unwrap());

    // Too large for the exponent field.
    let res = FloatValue::from_f64(FP32, -1e300);
    assert!(res.is_inf() && res.is_negative());
    // Too small for the exponent field.
    let res = FloatValue::from_f64(FP32, 1e-300);
    assert!(res.is_zero() && !res.is_negative());
}

#[test]
fn test_narrow_formats() {
    // Cast every normal value of a tiny format to wider exponents and back.
    let tiny = Format::new(3, 3).unwrap();
    let wide = Format::new(3, 5).unwrap();
    let wider = Format::new(10, 6).unwrap();
    for bits in 0..(1u64 << 7) {
        let exponent = BitSeq::from_u64(3, bits >> 3);
        let mantissa = BitSeq::from_u64(3, bits & 7);
        let v = FloatValue::from_fields(tiny, false, exponent, mantissa)
            .unwrap();
        // Skip the special values and the normals that share their exponent.
        if !v.is_normal() || v.get_exponent().is_all_one() {
            continue;
        }
        for to in [wide, wider] {
            let w = v.cast_to(to);
            assert_eq!(w.as_f64(), v.as_f64());
            assert_eq!(w.cast_to(tiny).bit_string(), v.bit_string());
        }
    }

    // The smallest stored exponent is a normal number, not a denormal.
    let v = FloatValue::from_f64(tiny, 0.125 * 1.5);
    assert_eq!(v.bit_string(), "0000100");
    assert_eq!(v.as_f64(), 0.1875);
    assert_eq!(FloatValue::from_f64(tiny, 15.0).as_f64(), 15.0);
    assert!(FloatValue::from_f64(tiny, 16.0).is_inf());
}

#[test]
fn test_denormal_inputs() {
    use super::float::FP64;

    // 1.5 * 2^-1023 is a denormal double, and a normal number with a zero
    // exponent field in the simulated layout.
    let v = 1.5 * f64::MIN_POSITIVE / 2.0;
    assert!(v.is_subnormal());
    let a = FloatValue::from_f64(FP64, v);
    assert!(a.is_normal());
    assert!(a.get_exponent().is_all_zero());
    assert_eq!(a.as_f64(), v);

    // Below the exponent range of the layout.
    assert!(FloatValue::from_f64(FP64, f64::MIN_POSITIVE / 4.0).is_zero());
}
