//! This module contains the fixed-length bit sequence that stores the exponent
//! and mantissa fields of the simulated floats, and the primitives (add,
//! negate, compare, shift) that the arithmetic kernel is built from.

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;

/// Reports the kind of values that are lost when we cut a sequence of bits.
/// The first lost bit is the guard bit, and the rest are the sticky bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LossFraction {
    ExactlyZero,  //0000000
    LessThanHalf, //0xxxxxx
    ExactlyHalf,  //1000000
    MoreThanHalf, //1xxxxxx
}

impl LossFraction {
    pub fn is_exactly_zero(&self) -> bool {
        matches!(self, Self::ExactlyZero)
    }
    pub fn is_exactly_half(&self) -> bool {
        matches!(self, Self::ExactlyHalf)
    }
    pub fn is_mt_half(&self) -> bool {
        matches!(self, Self::MoreThanHalf)
    }
    /// Build the loss kind from the guard bit and the sticky bit.
    pub fn from_guard_sticky(guard: bool, sticky: bool) -> Self {
        match (guard, sticky) {
            (false, false) => Self::ExactlyZero,
            (false, true) => Self::LessThanHalf,
            (true, false) => Self::ExactlyHalf,
            (true, true) => Self::MoreThanHalf,
        }
    }
}

/// An ordered sequence of bits with a fixed length. Index zero is the most
/// significant bit. When the sequence is read as a number, bit `i` has the
/// weight `2^(len - 1 - i)`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitSeq {
    len: usize,
    // Packed bits, least significant word first. The bits above `len` in the
    // last word are always zero.
    words: Vec<u64>,
}

fn word_count(len: usize) -> usize {
    len.div_ceil(64)
}

impl BitSeq {
    /// Returns a sequence of `len` zero bits.
    pub fn zeros(len: usize) -> Self {
        BitSeq {
            len,
            words: vec![0; word_count(len)],
        }
    }

    /// Returns a sequence of `len` one bits.
    pub fn ones(len: usize) -> Self {
        let mut res = BitSeq {
            len,
            words: vec![u64::MAX; word_count(len)],
        };
        res.clear_unused();
        res
    }

    /// Returns a sequence of `len` bits that holds the low bits of `val`.
    pub fn from_u64(len: usize, val: u64) -> Self {
        let mut res = Self::zeros(len);
        if let Some(w) = res.words.first_mut() {
            *w = val;
        }
        res.clear_unused();
        res
    }

    /// Returns the two's complement encoding of `val` in `len` bits.
    pub fn from_i64(len: usize, val: i64) -> Self {
        let mut res = Self::from_u64(len, val as u64);
        if val < 0 {
            for w in res.words.iter_mut().skip(1) {
                *w = u64::MAX;
            }
            res.clear_unused();
        }
        res
    }

    /// Creates a sequence from a list of bits, most significant first.
    pub fn from_bools(bits: &[bool]) -> Self {
        let mut res = Self::zeros(bits.len());
        for (i, b) in bits.iter().enumerate() {
            res.set(i, *b);
        }
        res
    }

    /// Returns the bits of the sequence, most significant first.
    pub fn to_bools(&self) -> Vec<bool> {
        self.iter().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(|i| self.get(i))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn clear_unused(&mut self) {
        let rem = self.len % 64;
        if rem != 0 {
            if let Some(w) = self.words.last_mut() {
                *w &= (1u64 << rem) - 1;
            }
        }
    }

    // Maps the sequence index to the numeric bit position.
    fn pos(&self, idx: usize) -> usize {
        debug_assert!(idx < self.len, "bit index out of range");
        self.len - 1 - idx
    }

    /// Returns the bit at index `idx` (zero is the MSB).
    pub fn get(&self, idx: usize) -> bool {
        let p = self.pos(idx);
        (self.words[p / 64] >> (p % 64)) & 1 == 1
    }

    /// Sets the bit at index `idx` (zero is the MSB) to `val`.
    pub fn set(&mut self, idx: usize, val: bool) {
        let p = self.pos(idx);
        let mask = 1u64 << (p % 64);
        if val {
            self.words[p / 64] |= mask;
        } else {
            self.words[p / 64] &= !mask;
        }
    }

    /// Returns the least significant bit.
    pub fn last(&self) -> bool {
        self.len > 0 && self.words[0] & 1 == 1
    }

    pub fn is_all_zero(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    pub fn is_all_one(&self) -> bool {
        *self == Self::ones(self.len)
    }

    /// Returns the sequence as an unsigned number, or u64::MAX if it does not
    /// fit.
    pub fn to_u64_saturating(&self) -> u64 {
        if self.words.iter().skip(1).any(|w| *w != 0) {
            return u64::MAX;
        }
        self.words.first().copied().unwrap_or(0)
    }

    /// Reads the sequence as a two's complement number, saturating to the
    /// range of i64.
    pub fn to_i64_saturating(&self) -> i64 {
        if self.is_empty() || !self.get(0) {
            return self.to_u64_saturating().min(i64::MAX as u64) as i64;
        }
        let magnitude = self.negate().0.to_u64_saturating();
        if magnitude > i64::MAX as u64 {
            return i64::MIN;
        }
        -(magnitude as i64)
    }

    /// Ripple-carry addition of two sequences of the same length. Returns the
    /// sum and the carry out of the most significant bit.
    pub fn add(&self, other: &Self) -> (Self, bool) {
        debug_assert_eq!(self.len, other.len, "adding sequences of mixed size");
        let mut res = Self::zeros(self.len);
        let mut carry = false;
        for i in 0..self.words.len() {
            let (s0, c0) = self.words[i].overflowing_add(other.words[i]);
            let (s1, c1) = s0.overflowing_add(carry as u64);
            res.words[i] = s1;
            carry = c0 || c1;
        }
        let rem = self.len % 64;
        if rem != 0 {
            if let Some(w) = res.words.last() {
                carry = (w >> rem) & 1 == 1;
            }
            res.clear_unused();
        }
        (res, carry)
    }

    /// Two's complement negation (invert all bits and add one). The carry is
    /// set only when the input was zero.
    pub fn negate(&self) -> (Self, bool) {
        let mut inverted = BitSeq {
            len: self.len,
            words: self.words.iter().map(|w| !w).collect(),
        };
        inverted.clear_unused();
        let carry = inverted.increment();
        (inverted, carry)
    }

    /// Computes `self - subtrahend` as `self + negate(subtrahend)`. The carry
    /// of the addition is dropped.
    pub fn subtract(&self, subtrahend: &Self) -> Self {
        let (neg, carry) = subtrahend.negate();
        if carry {
            // The subtrahend was zero.
            return self.clone();
        }
        self.add(&neg).0
    }

    /// Adds one to the sequence. Returns true if the sequence wrapped around.
    pub fn increment(&mut self) -> bool {
        let one = Self::from_u64(self.len, 1);
        let (sum, carry) = self.add(&one);
        *self = sum;
        carry
    }

    /// Compares two sequences of the same length as unsigned numbers.
    pub fn magnitude_compare(&self, other: &Self) -> Ordering {
        debug_assert_eq!(self.len, other.len, "comparing mixed size sequences");
        for i in (0..self.words.len()).rev() {
            match self.words[i].cmp(&other.words[i]) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }

    /// Compares the partial remainder of a long division against a divisor
    /// that is given without its implicit leading one. The remainder carries
    /// two more bits than the divisor: a zero and the synthetic leading one.
    pub fn magnitude_compare_division(&self, divisor: &Self) -> Ordering {
        debug_assert_eq!(self.len, divisor.len + 2);
        let full = Self::from_bools(&[false, true]).concat(divisor);
        self.magnitude_compare(&full)
    }

    /// Shifts the sequence one bit towards the MSB. The leading bit is
    /// dropped and a zero is appended at the end.
    pub fn shift_left_dropping_msb(&mut self) {
        self.shift_left(1);
    }

    /// Shifts the sequence `n` bits towards the MSB, dropping the bits that
    /// leave the sequence.
    pub fn shift_left(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        if n >= self.len {
            *self = Self::zeros(self.len);
            return;
        }
        let (ws, bs) = (n / 64, n % 64);
        for i in (0..self.words.len()).rev() {
            let mut val = 0;
            if i >= ws {
                val = self.words[i - ws] << bs;
                if bs > 0 && i > ws {
                    val |= self.words[i - ws - 1] >> (64 - bs);
                }
            }
            self.words[i] = val;
        }
        self.clear_unused();
    }

    /// Shifts the sequence `n` bits towards the LSB. Returns true if any of
    /// the dropped bits was set.
    pub fn shift_right(&mut self, n: usize) -> bool {
        if n == 0 {
            return false;
        }
        if n >= self.len {
            let lost = !self.is_all_zero();
            *self = Self::zeros(self.len);
            return lost;
        }
        let lost = self.low_bits_nonzero(n);
        let (ws, bs) = (n / 64, n % 64);
        let wc = self.words.len();
        for i in 0..wc {
            let mut val = 0;
            if i + ws < wc {
                val = self.words[i + ws] >> bs;
                if bs > 0 && i + ws + 1 < wc {
                    val |= self.words[i + ws + 1] << (64 - bs);
                }
            }
            self.words[i] = val;
        }
        lost
    }

    /// Shifts right by `n` bits and ORs everything that was dropped into the
    /// least significant bit.
    pub fn shift_right_sticky(&mut self, n: usize) {
        if self.shift_right(n) {
            let last = self.len - 1;
            self.set(last, true);
        }
    }

    // Returns true if any of the `n` least significant bits is set.
    fn low_bits_nonzero(&self, n: usize) -> bool {
        let full = n / 64;
        if self.words[..full].iter().any(|w| *w != 0) {
            return true;
        }
        let rem = n % 64;
        rem != 0 && self.words[full] & ((1u64 << rem) - 1) != 0
    }

    /// Returns the number of zero bits before the first set bit.
    pub fn leading_zeros(&self) -> usize {
        let padding = self.words.len() * 64 - self.len;
        let mut zeros = 0;
        for w in self.words.iter().rev() {
            if *w != 0 {
                return zeros + w.leading_zeros() as usize - padding;
            }
            zeros += 64;
        }
        self.len
    }

    /// Returns the number of bits needed to represent the sequence as an
    /// unsigned number, which is `floor(log2(x)) + 1` for non-zero values.
    pub fn significant_bits(&self) -> usize {
        self.len - self.leading_zeros()
    }

    /// Returns the sub-sequence `[start, end)`.
    pub fn slice(&self, start: usize, end: usize) -> Self {
        debug_assert!(start <= end && end <= self.len);
        let mut copy = self.clone();
        copy.shift_right(self.len - end);
        copy.low_bits(end - start)
    }

    // Keep the `width` least significant bits.
    fn low_bits(&self, width: usize) -> Self {
        let mut res = Self::zeros(width);
        let wc = res.words.len();
        res.words.copy_from_slice(&self.words[..wc]);
        res.clear_unused();
        res
    }

    /// Returns the sequence with `extra` zero bits added before the MSB. The
    /// numeric value is unchanged.
    pub fn zero_extend(&self, extra: usize) -> Self {
        let mut res = Self::zeros(self.len + extra);
        res.words[..self.words.len()].copy_from_slice(&self.words);
        res
    }

    /// Returns the concatenation of `self` (high part) and `other`.
    pub fn concat(&self, other: &Self) -> Self {
        let mut res = self.zero_extend(other.len);
        res.shift_left(other.len);
        for (i, w) in other.words.iter().enumerate() {
            res.words[i] |= w;
        }
        res
    }

    /// Returns the sequence truncated, or padded with zeros at the end, to
    /// `len` bits. The leading bits are kept in place.
    pub fn resized(&self, len: usize) -> Self {
        if len <= self.len {
            return self.slice(0, len);
        }
        self.concat(&Self::zeros(len - self.len))
    }

    /// Describes the bits from index `cut` to the end, as the bits that are
    /// lost when the sequence is truncated to `cut` bits.
    pub(crate) fn loss_from(&self, cut: usize) -> LossFraction {
        if cut >= self.len {
            return LossFraction::ExactlyZero;
        }
        let guard = self.get(cut);
        let rest = self.len - cut - 1;
        let sticky = rest > 0 && self.low_bits_nonzero(rest);
        LossFraction::from_guard_sticky(guard, sticky)
    }
}

impl fmt::Display for BitSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.iter() {
            f.write_str(if b { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl fmt::Debug for BitSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitSeq[{}]", self)
    }
}

#[cfg(test)]
fn bits(s: &str) -> BitSeq {
    let v: Vec<bool> = s.chars().map(|c| c == '1').collect();
    BitSeq::from_bools(&v)
}

#[test]
fn test_indexing() {
    let x = bits("1001");
    assert!(x.get(0));
    assert!(!x.get(1));
    assert!(x.last());
    assert_eq!(x.to_u64_saturating(), 9);
    assert_eq!(x.to_string(), "1001");

    let mut y = BitSeq::zeros(130);
    y.set(0, true);
    y.set(129, true);
    assert!(y.get(0));
    assert!(y.get(129));
    assert_eq!(y.leading_zeros(), 0);
    assert_eq!(y.to_u64_saturating(), u64::MAX);
    assert!(BitSeq::ones(130).is_all_one());
    assert!(!y.is_all_one());
}

#[test]
fn test_add_with_carry() {
    let (sum, carry) = bits("0110").add(&bits("0011"));
    assert_eq!(sum, bits("1001"));
    assert!(!carry);

    let (sum, carry) = bits("1111").add(&bits("0001"));
    assert_eq!(sum, bits("0000"));
    assert!(carry);

    // Carry across the word boundary.
    let a = BitSeq::ones(64).zero_extend(6);
    let (sum, carry) = a.add(&BitSeq::from_u64(70, 1));
    assert!(!carry);
    assert_eq!(sum.significant_bits(), 65);
    assert_eq!(sum.leading_zeros(), 5);

    let (sum, carry) = BitSeq::ones(128).add(&BitSeq::from_u64(128, 1));
    assert!(sum.is_all_zero());
    assert!(carry);
}

#[test]
fn test_negate_and_subtract() {
    let (neg, carry) = bits("0011").negate();
    assert_eq!(neg, bits("1101"));
    assert!(!carry);

    // Negating zero carries out.
    let (neg, carry) = BitSeq::zeros(5).negate();
    assert!(neg.is_all_zero());
    assert!(carry);

    assert_eq!(bits("1010").subtract(&bits("0011")), bits("0111"));
    assert_eq!(bits("1010").subtract(&BitSeq::zeros(4)), bits("1010"));
    // Wraps around like a two's complement number.
    assert_eq!(bits("0001").subtract(&bits("0010")), bits("1111"));
    assert_eq!(bits("1111").to_i64_saturating(), -1);
    assert_eq!(BitSeq::from_i64(100, -300).to_i64_saturating(), -300);
    assert_eq!(BitSeq::from_i64(12, 1023).to_i64_saturating(), 1023);
}

#[test]
fn test_compare() {
    let cmp = |a: &str, b: &str| bits(a).magnitude_compare(&bits(b));
    assert_eq!(cmp("0101", "0101"), Ordering::Equal);
    assert_eq!(cmp("1000", "0111"), Ordering::Greater);
    assert_eq!(cmp("0011", "0100"), Ordering::Less);

    // 0b0110 against 0b01 followed by 0b10.
    let div = |a: &str| bits(a).magnitude_compare_division(&bits("10"));
    assert_eq!(div("0110"), Ordering::Equal);
    assert_eq!(div("0101"), Ordering::Less);
    assert_eq!(div("1000"), Ordering::Greater);
}

#[test]
fn test_shifts() {
    let mut x = bits("1011");
    x.shift_left_dropping_msb();
    assert_eq!(x, bits("0110"));

    let mut x = bits("101101");
    assert!(x.shift_right(2));
    assert_eq!(x, bits("001011"));
    assert!(!x.shift_right(0));

    let mut x = bits("100001");
    x.shift_right_sticky(3);
    assert_eq!(x, bits("000101"));

    let mut x = bits("100000");
    x.shift_right_sticky(3);
    assert_eq!(x, bits("000100"));

    let mut x = bits("110");
    x.shift_right_sticky(10);
    assert_eq!(x, bits("001"));

    let mut wide = BitSeq::from_u64(200, 1);
    wide.shift_left(150);
    assert_eq!(wide.leading_zeros(), 49);
    assert!(wide.get(49));
    assert!(!wide.shift_right(150));
    assert_eq!(wide.to_u64_saturating(), 1);
}

#[test]
fn test_slice_and_resize() {
    let x = bits("1100101");
    assert_eq!(x.slice(1, 4), bits("100"));
    assert_eq!(x.slice(0, 0).len(), 0);
    assert_eq!(x.resized(3), bits("110"));
    assert_eq!(x.resized(9), bits("110010100"));
    assert_eq!(bits("10").concat(&bits("011")), bits("10011"));
    assert_eq!(bits("101").zero_extend(2), bits("00101"));
}

#[test]
fn test_loss_fraction() {
    let x = bits("1010000");
    assert!(x.loss_from(3).is_exactly_zero());
    assert!(x.loss_from(2).is_exactly_half());
    let x = bits("1011001");
    assert!(x.loss_from(3).is_mt_half());
    assert_eq!(x.loss_from(4), LossFraction::LessThanHalf);
    assert!(x.loss_from(7).is_exactly_zero());
}
