//! Printing of float values. Values are printed through the nearest native
//! double, which is exact for every format up to double precision.

extern crate alloc;

use super::float::{Category, FloatValue, Format};
use alloc::string::String;
use core::fmt;

impl Format {
    /// Returns the highest number of decimal digits that are needed for
    /// representing values of this format accurately.
    pub fn get_decimal_accuracy(&self) -> usize {
        // Matula: N = 2 + floor(n / log(10, 2)).
        // We convert from bits to base-10 digits: log(2)/log(10) ==> 59/196.
        2 + (self.get_mantissa_len() * 59) / 196
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(m={}, e={})",
            self.get_mantissa_len(),
            self.get_exponent_len()
        )
    }
}

impl FloatValue {
    /// Returns the value printed with exactly `digits` digits after the
    /// decimal point.
    pub fn to_string_with_digits(&self, digits: usize) -> String {
        format!("{:.*}", digits, self.as_f64())
    }

    /// Prints the value with a fixed number of digits if one is given, or
    /// with the shortest representation otherwise.
    pub fn render(&self, digits: Option<usize>) -> String {
        match digits {
            Some(digits) => self.to_string_with_digits(digits),
            None => format!("{}", self),
        }
    }
}

impl fmt::Display for FloatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get_category() {
            Category::NaN => f.write_str("NaN"),
            Category::Infinity if self.get_sign() => f.write_str("-inf"),
            Category::Infinity => f.write_str("inf"),
            _ => write!(f, "{}", self.as_f64()),
        }
    }
}

#[cfg(test)]
use super::float::{FP16, FP32, FP64};

#[test]
fn test_display() {
    let v = |x: f64| FloatValue::from_f64(FP64, x);
    assert_eq!(v(1.0).to_string(), "1");
    assert_eq!(v(-0.5).to_string(), "-0.5");
    assert_eq!(v(0.0).to_string(), "0");
    assert_eq!(v(-0.0).to_string(), "-0");
    assert_eq!(FloatValue::nan(FP64).to_string(), "NaN");
    assert_eq!(FloatValue::inf(FP16, false).to_string(), "inf");
    assert_eq!(FloatValue::inf(FP16, true).to_string(), "-inf");

    // Loading truncates, so this is the float just below 0.1.
    let tenth = FloatValue::from_f64(FP32, 0.1);
    assert_eq!(tenth.to_string(), "0.09999999403953552");
}

#[test]
fn test_fixed_digits() {
    let tenth = FloatValue::from_f64(FP32, 0.1);
    assert_eq!(tenth.to_string_with_digits(2), "0.10");
    assert_eq!(tenth.to_string_with_digits(4), "0.1000");

    let v = FloatValue::from_f64(FP64, -2.0 / 3.0);
    assert_eq!(v.to_string_with_digits(3), "-0.667");
    assert_eq!(v.render(Some(3)), "-0.667");
    assert_eq!(v.render(None), "-0.6666666666666666");
}

#[test]
fn test_decimal_accuracy_for_format() {
    assert_eq!(FP16.get_decimal_accuracy(), 5);
    assert_eq!(FP32.get_decimal_accuracy(), 8);
    assert_eq!(FP64.get_decimal_accuracy(), 17);
    assert_eq!(format!("{}", FP32), "(m=23, e=8)");
}
