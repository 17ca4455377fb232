extern crate alloc;
use super::bits::{BitSeq, LossFraction};
use super::error::{Error, Field, Result};
use alloc::format;
use core::cmp::Ordering;

/// Describes the layout of a simulated float: the number of stored mantissa
/// bits (without the implicit leading one) and the number of exponent bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Format {
    mantissa: usize,
    exponent: usize,
}

impl Format {
    /// Creates a new format. The mantissa must have at least one bit and the
    /// exponent at least two.
    pub fn new(mantissa: usize, exponent: usize) -> Result<Self> {
        if mantissa < 1 {
            return Err(Error::InvalidConfiguration(format!(
                "mantissa length must be at least 1, got {}",
                mantissa
            )));
        }
        if exponent < 2 {
            return Err(Error::InvalidConfiguration(format!(
                "exponent length must be at least 2, got {}",
                exponent
            )));
        }
        Ok(Self::new_unchecked(mantissa, exponent))
    }

    const fn new_unchecked(mantissa: usize, exponent: usize) -> Self {
        Format { mantissa, exponent }
    }

    /// Returns the number of stored mantissa bits.
    pub fn get_mantissa_len(&self) -> usize {
        self.mantissa
    }

    /// Returns the length of the exponent in bits, which defines the valid
    /// range.
    pub fn get_exponent_len(&self) -> usize {
        self.exponent
    }

    /// Returns the number of significant bits (mantissa + 1).
    pub fn get_precision(&self) -> usize {
        self.mantissa + 1
    }

    /// Returns the exponent bias `2^(E-1) - 1` as an exponent field.
    pub(crate) fn bias_bits(&self) -> BitSeq {
        BitSeq::ones(self.exponent - 1).zero_extend(1)
    }

    /// Fails with a mismatch error that names the first field that differs.
    pub(crate) fn check_same(&self, other: &Format) -> Result<()> {
        if self.mantissa != other.mantissa {
            return Err(Error::mismatch(
                Field::Mantissa,
                self.mantissa,
                other.mantissa,
            ));
        }
        if self.exponent != other.exponent {
            return Err(Error::mismatch(
                Field::Exponent,
                self.exponent,
                other.exponent,
            ));
        }
        Ok(())
    }
}

/// Predefined half precision layout with 10 mantissa and 5 exponent bits.
pub const FP16: Format = Format::new_unchecked(10, 5);
/// Predefined single precision layout with 23 mantissa and 8 exponent bits.
pub const FP32: Format = Format::new_unchecked(23, 8);
/// Predefined double precision layout with 52 mantissa and 11 exponent bits.
pub const FP64: Format = Format::new_unchecked(52, 11);
/// Predefined quad precision layout with 112 mantissa and 15 exponent bits.
pub const FP128: Format = Format::new_unchecked(112, 15);

/// Declare the different categories of the floating point number. The
/// category is derived from the bit pattern once per operand, before the
/// arithmetic kernel dispatches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Infinity,
    NaN,
    Normal,
    Zero,
}

/// A floating point number with a runtime-configurable layout. The number is
/// stored the way the hardware would store it: a sign bit, a biased exponent
/// field and a mantissa field without the implicit leading one.
/// There are no subnormals. Every bit pattern that is not zero, infinity or
/// the canonical NaN is a normal number, including a zero exponent field
/// with a non-zero mantissa.
#[derive(Debug, Clone)]
pub struct FloatValue {
    format: Format,
    // True means negative.
    sign: bool,
    exponent: BitSeq,
    mantissa: BitSeq,
}

impl FloatValue {
    /// Creates a float from raw fields. The field lengths must match the
    /// format.
    pub fn from_fields(
        format: Format,
        sign: bool,
        exponent: BitSeq,
        mantissa: BitSeq,
    ) -> Result<Self> {
        let mut res = Self::zero(format, sign);
        res.set_exponent(exponent)?;
        res.set_mantissa(mantissa)?;
        Ok(res)
    }

    pub(crate) fn from_parts(
        format: Format,
        sign: bool,
        exponent: BitSeq,
        mantissa: BitSeq,
    ) -> Self {
        debug_assert_eq!(exponent.len(), format.exponent);
        debug_assert_eq!(mantissa.len(), format.mantissa);
        FloatValue {
            format,
            sign,
            exponent,
            mantissa,
        }
    }

    /// Returns a new zero float.
    pub fn zero(format: Format, sign: bool) -> Self {
        FloatValue {
            format,
            sign,
            exponent: BitSeq::zeros(format.exponent),
            mantissa: BitSeq::zeros(format.mantissa),
        }
    }

    /// Returns a new infinity float.
    pub fn inf(format: Format, sign: bool) -> Self {
        FloatValue {
            format,
            sign,
            exponent: BitSeq::ones(format.exponent),
            mantissa: BitSeq::zeros(format.mantissa),
        }
    }

    /// Returns the canonical NaN. This is also the value of a float that was
    /// never assigned.
    pub fn nan(format: Format) -> Self {
        Self::nan_with_sign(format, false)
    }

    pub(crate) fn nan_with_sign(format: Format, sign: bool) -> Self {
        let mut mantissa = BitSeq::zeros(format.mantissa);
        mantissa.set(0, true);
        FloatValue {
            format,
            sign,
            exponent: BitSeq::ones(format.exponent),
            mantissa,
        }
    }

    /// Returns a new float with the value one.
    pub fn one(format: Format, sign: bool) -> Self {
        FloatValue {
            format,
            sign,
            exponent: format.bias_bits(),
            mantissa: BitSeq::zeros(format.mantissa),
        }
    }

    pub fn get_format(&self) -> Format {
        self.format
    }
    pub fn get_mantissa_len(&self) -> usize {
        self.format.mantissa
    }
    pub fn get_exponent_len(&self) -> usize {
        self.format.exponent
    }
    /// Returns the total number of bits: sign, exponent and mantissa.
    pub fn get_bit_len(&self) -> usize {
        1 + self.format.exponent + self.format.mantissa
    }

    /// Returns the sign of the float. True means negative.
    pub fn get_sign(&self) -> bool {
        self.sign
    }
    /// Returns true if the Float is negative
    pub fn is_negative(&self) -> bool {
        self.sign
    }
    pub fn is_positive(&self) -> bool {
        !self.sign
    }

    /// Returns the biased exponent field.
    pub fn get_exponent(&self) -> &BitSeq {
        &self.exponent
    }

    /// Returns the mantissa field, without the implicit leading one.
    pub fn get_mantissa(&self) -> &BitSeq {
        &self.mantissa
    }

    /// Classifies the bit pattern.
    pub fn get_category(&self) -> Category {
        if self.exponent.is_all_one() {
            if self.mantissa.is_all_zero() {
                return Category::Infinity;
            }
            let m = self.format.mantissa;
            if self.mantissa.get(0) && self.mantissa.slice(1, m).is_all_zero() {
                return Category::NaN;
            }
        } else if self.exponent.is_all_zero() && self.mantissa.is_all_zero() {
            return Category::Zero;
        }
        Category::Normal
    }

    /// Returns true if the Float is +-inf.
    pub fn is_inf(&self) -> bool {
        self.get_category() == Category::Infinity
    }
    /// Returns true if the Float is a NaN.
    pub fn is_nan(&self) -> bool {
        self.get_category() == Category::NaN
    }
    /// Returns true if the Float is +-zero.
    pub fn is_zero(&self) -> bool {
        self.get_category() == Category::Zero
    }
    /// Returns true if this number is normal (not Zero, Nan, Inf).
    pub fn is_normal(&self) -> bool {
        self.get_category() == Category::Normal
    }

    /// Turns the value into zero, keeping the sign.
    pub fn set_zero(&mut self) {
        *self = Self::zero(self.format, self.sign);
    }
    /// Turns the value into infinity, keeping the sign.
    pub fn set_inf(&mut self) {
        *self = Self::inf(self.format, self.sign);
    }
    /// Turns the value into NaN. The sign is kept but carries no meaning.
    pub fn set_nan(&mut self) {
        *self = Self::nan_with_sign(self.format, self.sign);
    }
    /// Update the sign of the float to `sign`. True means negative.
    pub fn set_sign(&mut self, sign: bool) {
        self.sign = sign;
    }

    /// Replaces the mantissa field. The new field must have exactly the
    /// mantissa length of the format.
    pub fn set_mantissa(&mut self, mantissa: BitSeq) -> Result<()> {
        if mantissa.len() != self.format.mantissa {
            return Err(Error::mismatch(
                Field::Mantissa,
                self.format.mantissa,
                mantissa.len(),
            ));
        }
        self.mantissa = mantissa;
        Ok(())
    }

    /// Replaces the exponent field. The new field must have exactly the
    /// exponent length of the format.
    pub fn set_exponent(&mut self, exponent: BitSeq) -> Result<()> {
        if exponent.len() != self.format.exponent {
            return Err(Error::mismatch(
                Field::Exponent,
                self.format.exponent,
                exponent.len(),
            ));
        }
        self.exponent = exponent;
        Ok(())
    }

    /// Returns the absolute value.
    pub fn abs(&self) -> Self {
        let mut res = self.clone();
        res.sign = false;
        res
    }

    /// Returns the sign, exponent and mantissa bits as a string of 0s and 1s.
    pub fn bit_string(&self) -> alloc::string::String {
        let sign = if self.sign { "1" } else { "0" };
        format!("{}{}{}", sign, self.exponent, self.mantissa)
    }

    /// Prints the number using the internal representation.
    #[cfg(feature = "std")]
    pub fn dump(&self) {
        use std::println;
        let sign = if self.sign { "-" } else { "+" };
        match self.get_category() {
            Category::NaN => println!("[{}NaN]", sign),
            Category::Infinity => println!("[{}Inf]", sign),
            Category::Zero => println!("[{}0.0]", sign),
            Category::Normal => println!(
                "FP[{} E={} M={}]",
                sign, self.exponent, self.mantissa
            ),
        }
    }

    /// Returns the significand with the implicit leading one.
    pub(crate) fn get_significand(&self) -> BitSeq {
        BitSeq::from_bools(&[true]).concat(&self.mantissa)
    }

    /// Assembles a normal result from a wide exponent and a fraction that is
    /// longer than the mantissa. The fraction is rounded to nearest-even and
    /// out-of-range exponents saturate to zero or infinity.
    pub(crate) fn normalize(
        format: Format,
        sign: bool,
        exp: WideExp,
        fraction: &BitSeq,
    ) -> Self {
        let (mantissa, carry) = round_fraction(fraction, format.mantissa);
        let exp = if carry { exp.add_small(1) } else { exp };
        match exp.classify() {
            ExpRange::Underflow => Self::zero(format, sign),
            ExpRange::Overflow => Self::inf(format, sign),
            ExpRange::InRange(exponent) => {
                Self::from_parts(format, sign, exponent, mantissa)
            }
        }
    }
}

/// Returns true if we need to round away from zero (increment the mantissa),
/// using round-to-nearest with ties to even.
fn need_round_away_from_zero(loss: LossFraction, odd: bool) -> bool {
    if loss.is_mt_half() {
        return true;
    }
    loss.is_exactly_half() && odd
}

/// Rounds the fraction bits `frac` to `len` bits, using the first dropped bit
/// as the guard bit and the rest as the sticky bit. Returns the new fraction,
/// and true if rounding overflowed the fraction (it is then all zeros, and
/// the exponent needs to grow by one).
pub(crate) fn round_fraction(frac: &BitSeq, len: usize) -> (BitSeq, bool) {
    if frac.len() <= len {
        return (frac.resized(len), false);
    }
    let loss = frac.loss_from(len);
    let mut res = frac.slice(0, len);
    if need_round_away_from_zero(loss, res.last()) {
        let carry = res.increment();
        return (res, carry);
    }
    (res, false)
}

#[test]
fn test_round_fraction() {
    fn bits(s: &str) -> BitSeq {
        let v: alloc::vec::Vec<bool> = s.chars().map(|c| c == '1').collect();
        BitSeq::from_bools(&v)
    }
    // Below half.
    assert_eq!(round_fraction(&bits("101001"), 3), (bits("101"), false));
    // Above half.
    assert_eq!(round_fraction(&bits("101101"), 3), (bits("110"), false));
    // Ties go to even.
    assert_eq!(round_fraction(&bits("101100"), 3), (bits("110"), false));
    assert_eq!(round_fraction(&bits("100100"), 3), (bits("100"), false));
    // Overflow.
    assert_eq!(round_fraction(&bits("1111"), 3), (bits("000"), true));
    // Widening pads.
    assert_eq!(round_fraction(&bits("11"), 4), (bits("1100"), false));
}

/// The classification of a wide exponent against the stored exponent range.
#[derive(Debug)]
pub(crate) enum ExpRange {
    Underflow,
    InRange(BitSeq),
    Overflow,
}

/// A biased exponent held in a two's complement field that is wider than the
/// stored exponent, so that sums, differences and normalization shifts can
/// leave the representable range without wrapping around.
#[derive(Debug, Clone)]
pub(crate) struct WideExp {
    bits: BitSeq,
    field: usize,
}

impl WideExp {
    // Wide enough for any native double exponent, and for the shifts of the
    // products and quotients of the widest significands.
    fn width(format: Format) -> usize {
        let shifts = 2 * format.mantissa + 8;
        let headroom = (usize::BITS - shifts.leading_zeros()) as usize;
        format.exponent.max(12) + headroom + 2
    }

    /// Widens a stored exponent field.
    pub fn from_field(format: Format, field: &BitSeq) -> Self {
        let width = Self::width(format);
        WideExp {
            bits: field.zero_extend(width - field.len()),
            field: format.exponent,
        }
    }

    /// Returns the wide form of a signed biased exponent.
    pub fn from_i64(format: Format, val: i64) -> Self {
        WideExp {
            bits: BitSeq::from_i64(Self::width(format), val),
            field: format.exponent,
        }
    }

    pub fn bias(format: Format) -> Self {
        Self::from_field(format, &format.bias_bits())
    }

    pub fn add(&self, other: &Self) -> Self {
        WideExp {
            bits: self.bits.add(&other.bits).0,
            field: self.field,
        }
    }

    pub fn sub(&self, other: &Self) -> Self {
        WideExp {
            bits: self.bits.subtract(&other.bits),
            field: self.field,
        }
    }

    pub fn add_small(&self, n: usize) -> Self {
        let n = BitSeq::from_u64(self.bits.len(), n as u64);
        WideExp {
            bits: self.bits.add(&n).0,
            field: self.field,
        }
    }

    pub fn sub_small(&self, n: usize) -> Self {
        let n = BitSeq::from_u64(self.bits.len(), n as u64);
        WideExp {
            bits: self.bits.subtract(&n),
            field: self.field,
        }
    }

    pub fn to_i64_saturating(&self) -> i64 {
        self.bits.to_i64_saturating()
    }

    /// Checks whether the exponent fits the stored field. The all-ones
    /// pattern is reserved for infinity and NaN, and counts as overflow.
    pub fn classify(&self) -> ExpRange {
        if self.bits.get(0) {
            return ExpRange::Underflow;
        }
        let width = self.bits.len();
        let limit = BitSeq::ones(self.field).zero_extend(width - self.field);
        if self.bits.magnitude_compare(&limit) != Ordering::Less {
            return ExpRange::Overflow;
        }
        ExpRange::InRange(self.bits.slice(width - self.field, width))
    }
}

#[test]
fn test_wide_exponent() {
    let fmt = Format::new(3, 4).unwrap();
    let bias = WideExp::bias(fmt);
    assert_eq!(bias.to_i64_saturating(), 7);
    assert!(matches!(bias.sub_small(8).classify(), ExpRange::Underflow));
    assert!(matches!(bias.add_small(8).classify(), ExpRange::Overflow));
    assert!(matches!(bias.add_small(7).classify(), ExpRange::InRange(_)));
    if let ExpRange::InRange(e) = bias.add(&bias).classify() {
        assert_eq!(e.to_u64_saturating(), 14);
    } else {
        panic!("expected an in-range exponent");
    }
    let minus = WideExp::from_i64(fmt, -1074);
    assert_eq!(minus.add(&bias).to_i64_saturating(), -1067);
}

impl FloatValue {
    /// Compares the exponent fields and then the mantissa fields, MSB first.
    /// The sign is ignored.
    pub(crate) fn compare_magnitude(&self, other: &Self) -> Ordering {
        match self.exponent.magnitude_compare(&other.exponent) {
            Ordering::Equal => self.mantissa.magnitude_compare(&other.mantissa),
            ord => ord,
        }
    }

    /// Compares two floats of the same format. Returns None if either of the
    /// values is NaN. Values of opposite signs are ordered by their sign
    /// alone, so -0 is less than +0.
    pub fn try_partial_cmp(&self, other: &Self) -> Result<Option<Ordering>> {
        self.format.check_same(&other.format)?;
        if self.is_nan() || other.is_nan() {
            return Ok(None);
        }
        if self.sign != other.sign {
            return Ok(Some(if self.sign {
                Ordering::Less
            } else {
                Ordering::Greater
            }));
        }
        let ord = self.compare_magnitude(other);
        Ok(Some(if self.sign { ord.reverse() } else { ord }))
    }

    pub fn is_eq(&self, other: &Self) -> Result<bool> {
        Ok(self.try_partial_cmp(other)? == Some(Ordering::Equal))
    }
    pub fn is_ne(&self, other: &Self) -> Result<bool> {
        Ok(!self.is_eq(other)?)
    }
    pub fn is_lt(&self, other: &Self) -> Result<bool> {
        Ok(self.try_partial_cmp(other)? == Some(Ordering::Less))
    }
    pub fn is_le(&self, other: &Self) -> Result<bool> {
        Ok(matches!(
            self.try_partial_cmp(other)?,
            Some(Ordering::Less | Ordering::Equal)
        ))
    }
    pub fn is_gt(&self, other: &Self) -> Result<bool> {
        Ok(self.try_partial_cmp(other)? == Some(Ordering::Greater))
    }
    pub fn is_ge(&self, other: &Self) -> Result<bool> {
        Ok(matches!(
            self.try_partial_cmp(other)?,
            Some(Ordering::Greater | Ordering::Equal)
        ))
    }
}

#[test]
fn test_format_validation() {
    assert!(Format::new(1, 2).is_ok());
    assert!(matches!(
        Format::new(0, 8),
        Err(Error::InvalidConfiguration(_))
    ));
    assert!(matches!(
        Format::new(23, 1),
        Err(Error::InvalidConfiguration(_))
    ));
    assert_eq!(FP32.get_precision(), 24);
    assert_eq!(FP64.bias_bits().to_u64_saturating(), 1023);
}

#[test]
fn test_special_encodings() {
    let zero = FloatValue::zero(FP32, true);
    assert!(zero.is_zero());
    assert!(zero.is_negative());
    assert_eq!(zero.get_bit_len(), 32);

    let inf = FloatValue::inf(FP32, false);
    assert!(inf.is_inf());
    assert_eq!(
        inf.bit_string(),
        "01111111100000000000000000000000"
    );

    let nan = FloatValue::nan(FP16);
    assert!(nan.is_nan());
    assert_eq!(nan.bit_string(), "0111111000000000");

    // Exponent all ones with any other mantissa is a normal number.
    let mut odd = FloatValue::inf(FP16, false);
    odd.set_mantissa(BitSeq::from_u64(10, 3)).unwrap();
    assert!(odd.is_normal());

    // A zero exponent with a non-zero mantissa is normal too.
    let mut small = FloatValue::zero(FP16, false);
    small.set_mantissa(BitSeq::from_u64(10, 1)).unwrap();
    assert!(small.is_normal());

    let one = FloatValue::one(FP16, false);
    assert!(one.is_normal());
    assert_eq!(one.bit_string(), "0011110000000000");
}

#[test]
fn test_setters() {
    let mut x = FloatValue::one(FP32, false);
    x.set_sign(true);
    assert!(x.is_negative());
    x.set_inf();
    assert!(x.is_inf() && x.is_negative());
    x.set_nan();
    assert!(x.is_nan());
    x.set_zero();
    assert!(x.is_zero() && x.is_negative());

    let err = x.set_mantissa(BitSeq::zeros(22)).unwrap_err();
    assert_eq!(err, Error::mismatch(Field::Mantissa, 23, 22));
    let err = x.set_exponent(BitSeq::zeros(11)).unwrap_err();
    assert_eq!(err, Error::mismatch(Field::Exponent, 8, 11));

    let v = FloatValue::from_fields(
        FP16,
        false,
        BitSeq::from_u64(5, 16),
        BitSeq::from_u64(10, 512),
    )
    .unwrap();
    assert_eq!(v.as_f64(), 3.0);
}

#[test]
fn test_comparisons() {
    use super::utils;

    // Compare a bunch of special values, using the comparison predicates and
    // check that they match the comparison on doubles. Signed zeros are
    // ordered by their sign here, so they are checked separately.
    for first in utils::get_special_test_values() {
        for second in utils::get_special_test_values() {
            if first == 0.0 && second == 0.0 {
                continue;
            }
            let a = FloatValue::from_f64(FP64, first);
            let b = FloatValue::from_f64(FP64, second);
            assert_eq!(first < second, a.is_lt(&b).unwrap(), "<");
            assert_eq!(first <= second, a.is_le(&b).unwrap(), "<=");
            assert_eq!(first == second, a.is_eq(&b).unwrap(), "==");
            assert_eq!(first != second, a.is_ne(&b).unwrap(), "!=");
            assert_eq!(first > second, a.is_gt(&b).unwrap(), ">");
            assert_eq!(first >= second, a.is_ge(&b).unwrap(), ">=");
        }
    }

    let pz = FloatValue::zero(FP64, false);
    let nz = FloatValue::zero(FP64, true);
    assert!(nz.is_lt(&pz).unwrap());
    assert!(pz.is_ne(&nz).unwrap());
    assert!(pz.is_eq(&pz.clone()).unwrap());
}

#[test]
fn test_compare_mismatch() {
    let a = FloatValue::one(FP32, false);
    let b = FloatValue::one(FP64, false);
    assert!(matches!(
        a.is_lt(&b),
        Err(Error::ConfigurationMismatch {
            field: Field::Mantissa,
            ..
        })
    ));
    let c = FloatValue::one(Format::new(23, 9).unwrap(), false);
    assert_eq!(a.is_eq(&c), Err(Error::mismatch(Field::Exponent, 8, 9)));
}
