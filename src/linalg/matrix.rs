//! Dense containers of simulated floats: vectors, square row-major matrices
//! and row permutations. All elements of a container share one format.

use crate::error::{Error, Field, Result};
use crate::float::{FloatValue, Format};
use rand::seq::SliceRandom;
use rand::Rng;

/// The half-open interval that random elements are drawn from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomRange {
    lower: f64,
    upper: f64,
}

impl RandomRange {
    /// Creates a new range. The lower bound must be below the upper bound.
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        if !lower.is_finite() || !upper.is_finite() || lower >= upper {
            return Err(Error::InvalidConfiguration(format!(
                "random range [{}, {}) is empty",
                lower, upper
            )));
        }
        Ok(Self { lower, upper })
    }

    pub fn get_lower(&self) -> f64 {
        self.lower
    }

    pub fn get_upper(&self) -> f64 {
        self.upper
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        rng.gen_range(self.lower..self.upper)
    }

    /// Draws values until one is not zero once loaded into `format`. Fails
    /// if the range is too narrow for the format to tell its values from
    /// zero.
    fn sample_nonzero<R: Rng + ?Sized>(
        &self,
        format: Format,
        rng: &mut R,
    ) -> Result<FloatValue> {
        for _ in 0..MAX_NONZERO_ATTEMPTS {
            let v = FloatValue::from_f64(format, self.sample(rng));
            if !v.is_zero() {
                return Ok(v);
            }
        }
        Err(Error::InvalidConfiguration(format!(
            "random range [{}, {}) yields only zeros in format {}",
            self.lower, self.upper, format
        )))
    }
}

const MAX_NONZERO_ATTEMPTS: usize = 1000;

impl Default for RandomRange {
    fn default() -> Self {
        Self {
            lower: -10.,
            upper: 10.,
        }
    }
}

fn join(items: impl Iterator<Item = String>) -> String {
    items.collect::<Vec<_>>().join(", ")
}

fn check_dimension(lhs: usize, rhs: usize) -> Result<()> {
    if lhs != rhs {
        return Err(Error::mismatch(Field::Dimension, lhs, rhs));
    }
    Ok(())
}

fn check_not_empty(len: usize) -> Result<()> {
    if len == 0 {
        return Err(Error::InvalidConfiguration(
            "dimension must be at least 1".into(),
        ));
    }
    Ok(())
}

/// A column vector of values that share one format.
#[derive(Debug, Clone)]
pub struct Vector {
    format: Format,
    data: Vec<FloatValue>,
}

impl Vector {
    /// Loads native doubles. See [`FloatValue::from_f64`] for the rounding.
    pub fn from_f64(format: Format, values: &[f64]) -> Result<Self> {
        check_not_empty(values.len())?;
        let data = values
            .iter()
            .map(|v| FloatValue::from_f64(format, *v))
            .collect();
        Ok(Self { format, data })
    }

    /// Creates a vector from existing values, which must all share the
    /// format of the first one.
    pub fn from_values(values: Vec<FloatValue>) -> Result<Self> {
        let format = match values.first() {
            Some(first) => first.get_format(),
            None => {
                return Err(Error::InvalidConfiguration(
                    "vector must not be empty".into(),
                ))
            }
        };
        for v in values.iter() {
            format.check_same(&v.get_format())?;
        }
        Ok(Self {
            format,
            data: values,
        })
    }

    /// Creates a vector of `len` positive zeros.
    pub fn zeros(format: Format, len: usize) -> Result<Self> {
        check_not_empty(len)?;
        let data = vec![FloatValue::zero(format, false); len];
        Ok(Self { format, data })
    }

    /// Creates a vector of `len` values drawn uniformly from `range`.
    pub fn random<R: Rng + ?Sized>(
        len: usize,
        format: Format,
        range: &RandomRange,
        rng: &mut R,
    ) -> Result<Self> {
        check_not_empty(len)?;
        let data = (0..len)
            .map(|_| FloatValue::from_f64(format, range.sample(rng)))
            .collect();
        Ok(Self { format, data })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get_format(&self) -> Format {
        self.format
    }

    /// Returns the element at `idx`.
    pub fn get(&self, idx: usize) -> Result<&FloatValue> {
        self.data.get(idx).ok_or_else(|| {
            Error::InvalidState(format!(
                "index {} is out of range for a vector of length {}",
                idx,
                self.len()
            ))
        })
    }

    pub fn values(&self) -> &[FloatValue] {
        &self.data
    }

    pub fn iter(&self) -> impl Iterator<Item = &FloatValue> {
        self.data.iter()
    }

    /// Converts every element to the format `to`.
    pub fn cast(&mut self, to: Format) {
        if self.format == to {
            return;
        }
        for v in self.data.iter_mut() {
            v.cast(to);
        }
        self.format = to;
    }

    pub fn cast_to(&self, to: Format) -> Self {
        let mut res = self.clone();
        res.cast(to);
        res
    }

    fn check_compatible(&self, other: &Self) -> Result<()> {
        check_dimension(self.len(), other.len())?;
        self.format.check_same(&other.format)
    }

    fn zip_with(
        &self,
        other: &Self,
        op: impl Fn(&FloatValue, &FloatValue) -> Result<FloatValue>,
    ) -> Result<Self> {
        self.check_compatible(other)?;
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| op(a, b))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            format: self.format,
            data,
        })
    }

    /// Element-wise sum.
    pub fn add(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, |a, b| a.add(b))
    }

    /// Element-wise difference.
    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, |a, b| a.sub(b))
    }

    /// Reorders the elements so that element `i` of the result is element
    /// `perm[i]` of this vector.
    pub fn permute(&self, perm: &Permutation) -> Result<Self> {
        check_dimension(self.len(), perm.len())?;
        let data = perm.indices().iter().map(|i| self.data[*i].clone());
        Ok(Self {
            format: self.format,
            data: data.collect(),
        })
    }

    /// Returns the sum of the absolute values of the elements.
    pub fn norm_l1(&self) -> Result<FloatValue> {
        let mut sum = FloatValue::zero(self.format, false);
        for v in self.data.iter() {
            sum = sum.add(&v.abs())?;
        }
        Ok(sum)
    }

    /// Returns the mean of the absolute values of the elements.
    pub fn mean_abs(&self) -> Result<FloatValue> {
        let size = FloatValue::from_f64(self.format, self.len() as f64);
        self.norm_l1()?.div(&size)
    }

    /// Returns the mean number of matching mantissa bits between the
    /// elements of this vector and `reference`, in the format of this
    /// vector.
    pub fn mean_matching_bits(&self, reference: &Self) -> Result<FloatValue> {
        self.check_compatible(reference)?;
        let mut sum = FloatValue::zero(self.format, false);
        for (is, should) in self.data.iter().zip(reference.data.iter()) {
            let bits = is.matching_mantissa_bits(should)?;
            sum = sum.add(&FloatValue::from_f64(self.format, bits as f64))?;
        }
        let size = FloatValue::from_f64(self.format, self.len() as f64);
        sum.div(&size)
    }

    pub fn to_f64(&self) -> Vec<f64> {
        self.data.iter().map(|v| v.as_f64()).collect()
    }

    /// Renders the elements as a comma separated list.
    pub fn render(&self, digits: Option<usize>) -> String {
        join(self.data.iter().map(|v| v.render(digits)))
    }
}

/// A square matrix stored in row-major order.
#[derive(Debug, Clone)]
pub struct Matrix {
    n: usize,
    format: Format,
    data: Vec<FloatValue>,
}

impl Matrix {
    /// Creates the `n` by `n` identity matrix.
    pub fn identity(n: usize, format: Format) -> Result<Self> {
        check_not_empty(n)?;
        let one = FloatValue::one(format, false);
        let zero = FloatValue::zero(format, false);
        let data = (0..n * n)
            .map(|i| if i / n == i % n { one.clone() } else { zero.clone() })
            .collect();
        Ok(Self { n, format, data })
    }

    /// Loads `n * n` native doubles in row-major order.
    pub fn from_f64(n: usize, format: Format, values: &[f64]) -> Result<Self> {
        check_not_empty(n)?;
        if values.len() != n * n {
            return Err(Error::InvalidConfiguration(format!(
                "expected {} matrix elements, got {}",
                n * n,
                values.len()
            )));
        }
        let data = values
            .iter()
            .map(|v| FloatValue::from_f64(format, *v))
            .collect();
        Ok(Self { n, format, data })
    }

    /// Creates a random matrix with elements drawn from `range`. When
    /// `sparsity` is positive, roughly that fraction of the elements is
    /// zero, but every row keeps at least one nonzero element in a
    /// distinct column so the matrix is not trivially singular.
    pub fn random<R: Rng + ?Sized>(
        n: usize,
        format: Format,
        range: &RandomRange,
        sparsity: f64,
        rng: &mut R,
    ) -> Result<Self> {
        check_not_empty(n)?;
        check_sparsity(n, sparsity)?;

        if sparsity == 0. {
            let data = (0..n * n)
                .map(|_| FloatValue::from_f64(format, range.sample(rng)))
                .collect();
            return Ok(Self { n, format, data });
        }

        let mut columns: Vec<usize> = (0..n).collect();
        columns.shuffle(rng);
        // One element per row is always kept, so the others are dropped
        // more often to reach the requested rate overall.
        let adapted_rate = (sparsity * n as f64) / (n - 1) as f64;

        let mut data = Vec::with_capacity(n * n);
        for row in 0..n {
            for col in 0..n {
                let value = if col == columns[row] {
                    range.sample_nonzero(format, rng)?
                } else if rng.gen::<f64>() < adapted_rate {
                    FloatValue::zero(format, false)
                } else {
                    FloatValue::from_f64(format, range.sample(rng))
                };
                data.push(value);
            }
        }
        Ok(Self { n, format, data })
    }

    pub fn get_dimension(&self) -> usize {
        self.n
    }

    pub fn get_format(&self) -> Format {
        self.format
    }

    fn out_of_range(&self, row: usize, col: usize) -> Error {
        Error::InvalidState(format!(
            "element ({}, {}) is out of range for a {}x{} matrix",
            row, col, self.n, self.n
        ))
    }

    /// Returns the element at (`row`, `col`).
    pub fn get(&self, row: usize, col: usize) -> Result<&FloatValue> {
        if row >= self.n || col >= self.n {
            return Err(self.out_of_range(row, col));
        }
        Ok(self.at(row, col))
    }

    /// Returns the element at the row-major index `idx`.
    pub fn get_flat(&self, idx: usize) -> Result<&FloatValue> {
        if idx >= self.data.len() {
            return Err(self.out_of_range(idx / self.n, idx % self.n));
        }
        Ok(&self.data[idx])
    }

    /// Replaces the element at (`row`, `col`). The value must have the
    /// format of the matrix.
    pub fn set(
        &mut self,
        row: usize,
        col: usize,
        value: FloatValue,
    ) -> Result<()> {
        if row >= self.n || col >= self.n {
            return Err(self.out_of_range(row, col));
        }
        self.format.check_same(&value.get_format())?;
        *self.at_mut(row, col) = value;
        Ok(())
    }

    pub(crate) fn at(&self, row: usize, col: usize) -> &FloatValue {
        &self.data[row * self.n + col]
    }

    pub(crate) fn at_mut(&mut self, row: usize, col: usize) -> &mut FloatValue {
        &mut self.data[row * self.n + col]
    }

    /// Swaps the elements of two rows in the columns `cols`.
    pub(crate) fn swap_rows(
        &mut self,
        a: usize,
        b: usize,
        cols: core::ops::Range<usize>,
    ) {
        if a == b {
            return;
        }
        for col in cols {
            self.data.swap(a * self.n + col, b * self.n + col);
        }
    }

    /// Returns the row in `start..n` whose element in column `col` has the
    /// greatest magnitude. Ties go to the first row. A NaN row is picked
    /// only when every candidate is NaN.
    pub(crate) fn max_magnitude_row(&self, col: usize, start: usize) -> usize {
        let mut best = start;
        for row in start + 1..self.n {
            let candidate = self.at(row, col).abs();
            let current = self.at(best, col).abs();
            if candidate.is_nan() {
                continue;
            }
            if current.is_nan() || matches!(candidate.is_gt(&current), Ok(true))
            {
                best = row;
            }
        }
        best
    }

    /// Converts every element to the format `to`.
    pub fn cast(&mut self, to: Format) {
        if self.format == to {
            return;
        }
        for v in self.data.iter_mut() {
            v.cast(to);
        }
        self.format = to;
    }

    pub fn cast_to(&self, to: Format) -> Self {
        let mut res = self.clone();
        res.cast(to);
        res
    }

    /// Computes `self * x`. Each row sum starts at positive zero and
    /// accumulates left to right.
    pub fn mul_vector(&self, x: &Vector) -> Result<Vector> {
        check_dimension(self.n, x.len())?;
        self.format.check_same(&x.get_format())?;
        let mut out = Vec::with_capacity(self.n);
        for row in 0..self.n {
            let mut sum = FloatValue::zero(self.format, false);
            for (col, xv) in x.iter().enumerate() {
                sum = sum.add(&xv.mul(self.at(row, col))?)?;
            }
            out.push(sum);
        }
        Vector::from_values(out)
    }

    /// Computes `self * other`.
    pub fn mul_matrix(&self, other: &Matrix) -> Result<Matrix> {
        check_dimension(self.n, other.n)?;
        self.format.check_same(&other.format)?;
        let n = self.n;
        let mut data = Vec::with_capacity(n * n);
        for row in 0..n {
            for col in 0..n {
                let mut sum = FloatValue::zero(self.format, false);
                for k in 0..n {
                    sum = sum.add(&self.at(row, k).mul(other.at(k, col))?)?;
                }
                data.push(sum);
            }
        }
        Ok(Matrix {
            n,
            format: self.format,
            data,
        })
    }

    /// Renders the elements in row-major order as a comma separated list.
    pub fn render(&self, digits: Option<usize>) -> String {
        join(self.data.iter().map(|v| v.render(digits)))
    }
}

/// Fails unless `sparsity` is in `[0, 1 - 1/n]`.
pub(crate) fn check_sparsity(n: usize, sparsity: f64) -> Result<()> {
    let limit = 1. - 1. / n as f64;
    if !(0. ..=limit).contains(&sparsity) {
        return Err(Error::InvalidConfiguration(format!(
            "sparsity rate {} must be between 0 and {}",
            sparsity, limit
        )));
    }
    Ok(())
}

/// A row permutation. Entry `i` is the index of the original row that ends
/// up in row `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    indices: Vec<usize>,
}

impl Permutation {
    pub fn identity(n: usize) -> Self {
        Self {
            indices: (0..n).collect(),
        }
    }

    /// Creates a permutation from an index vector, which must contain every
    /// index below its length exactly once.
    pub fn from_indices(indices: Vec<usize>) -> Result<Self> {
        let mut seen = vec![false; indices.len()];
        for i in indices.iter() {
            if *i >= seen.len() || seen[*i] {
                return Err(Error::InvalidConfiguration(format!(
                    "{:?} is not a permutation",
                    indices
                )));
            }
            seen[*i] = true;
        }
        Ok(Self { indices })
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn swap(&mut self, a: usize, b: usize) {
        self.indices.swap(a, b);
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Returns the index vector as values of `format`.
    pub fn as_vector(&self, format: Format) -> Result<Vector> {
        let values: Vec<f64> = self.indices.iter().map(|i| *i as f64).collect();
        Vector::from_f64(format, &values)
    }

    /// Renders the permutation as the expanded `n * n` matrix of zeros and
    /// ones, in row-major order.
    pub fn render(&self, digits: Option<usize>) -> String {
        let render = |v: f64| match digits {
            Some(d) => format!("{:.*}", d, v),
            None => format!("{}", v),
        };
        let (zero, one) = (render(0.), render(1.));
        let n = self.len();
        join((0..n * n).map(|i| {
            if self.indices[i / n] == i % n {
                one.clone()
            } else {
                zero.clone()
            }
        }))
    }
}

#[cfg(test)]
use crate::float::{FP16, FP32, FP64};
#[cfg(test)]
use rand::{rngs::StdRng, SeedableRng};

#[test]
fn test_random_range() {
    assert!(RandomRange::new(1., 1.).is_err());
    assert!(RandomRange::new(2., 1.).is_err());
    assert!(RandomRange::new(f64::NAN, 1.).is_err());
    let range = RandomRange::new(-1., 3.).unwrap();
    assert_eq!(range.get_lower(), -1.);
    assert_eq!(range.get_upper(), 3.);
    assert_eq!(RandomRange::default().get_lower(), -10.);
    assert_eq!(RandomRange::default().get_upper(), 10.);

    let mut rng = StdRng::seed_from_u64(1);
    let v = Vector::random(100, FP64, &range, &mut rng).unwrap();
    assert!(v.to_f64().iter().all(|x| (-1.0..3.0).contains(x)));
}

#[test]
fn test_vector_ops() {
    let a = Vector::from_f64(FP64, &[1., -2., 3.]).unwrap();
    let b = Vector::from_f64(FP64, &[0.5, 0.5, -4.]).unwrap();
    assert_eq!(a.add(&b).unwrap().to_f64(), vec![1.5, -1.5, -1.]);
    assert_eq!(a.sub(&b).unwrap().to_f64(), vec![0.5, -2.5, 7.]);
    assert_eq!(a.norm_l1().unwrap().as_f64(), 6.);
    assert_eq!(a.mean_abs().unwrap().as_f64(), 2.);
    assert_eq!(a.render(Some(1)), "1.0, -2.0, 3.0");
    assert_eq!(a.render(None), "1, -2, 3");

    let perm = Permutation::from_indices(vec![2, 0, 1]).unwrap();
    assert_eq!(a.permute(&perm).unwrap().to_f64(), vec![3., 1., -2.]);

    let zeros = Vector::zeros(FP32, 2).unwrap();
    assert!(zeros.iter().all(|v| v.is_zero() && v.is_positive()));
    assert!(Vector::zeros(FP32, 0).is_err());
    assert!(a.get(3).is_err());
    assert_eq!(a.get(2).unwrap().as_f64(), 3.);
}

#[test]
fn test_vector_mismatch() {
    let a = Vector::from_f64(FP64, &[1., 2.]).unwrap();
    let b = Vector::from_f64(FP64, &[1., 2., 3.]).unwrap();
    let c = Vector::from_f64(FP32, &[1., 2.]).unwrap();
    let err = a.add(&b).unwrap_err();
    assert_eq!(err, Error::mismatch(Field::Dimension, 2, 3));
    let err = a.sub(&c).unwrap_err();
    assert_eq!(err, Error::mismatch(Field::Mantissa, 52, 23));

    let mixed =
        vec![FloatValue::one(FP64, false), FloatValue::one(FP32, false)];
    assert!(Vector::from_values(mixed).is_err());
    assert!(Vector::from_values(Vec::new()).is_err());
}

#[test]
fn test_mean_matching_bits() {
    let a = Vector::from_f64(FP32, &[1., 2.]).unwrap();
    let b = Vector::from_f64(FP32, &[1., 2. + 2f64.powi(-20)]).unwrap();
    // 23 and 20 matching bits.
    assert_eq!(a.mean_matching_bits(&a).unwrap().as_f64(), 23.);
    assert_eq!(b.mean_matching_bits(&a).unwrap().as_f64(), 21.5);
}

#[test]
fn test_matrix_products() {
    let a = Matrix::from_f64(2, FP64, &[1., 2., 3., 4.]).unwrap();
    let x = Vector::from_f64(FP64, &[1., -1.]).unwrap();
    assert_eq!(a.mul_vector(&x).unwrap().to_f64(), vec![-1., -1.]);

    let id = Matrix::identity(2, FP64).unwrap();
    assert_eq!(a.mul_matrix(&id).unwrap().render(None), "1, 2, 3, 4");
    assert_eq!(a.mul_matrix(&a).unwrap().render(None), "7, 10, 15, 22");

    let x3 = Vector::from_f64(FP64, &[1., 2., 3.]).unwrap();
    assert!(a.mul_vector(&x3).is_err());
    assert!(a.mul_vector(&x.cast_to(FP32)).is_err());
}

#[test]
fn test_matrix_access() {
    let mut a = Matrix::from_f64(2, FP32, &[1., 2., 3., 4.]).unwrap();
    assert_eq!(a.get(1, 0).unwrap().as_f64(), 3.);
    assert_eq!(a.get_flat(3).unwrap().as_f64(), 4.);
    assert!(a.get(2, 0).is_err());
    assert!(a.get_flat(4).is_err());

    a.set(0, 1, FloatValue::from_f64(FP32, -5.)).unwrap();
    assert_eq!(a.render(Some(0)), "1, -5, 3, 4");
    assert!(a.set(0, 1, FloatValue::one(FP64, false)).is_err());

    assert!(Matrix::from_f64(2, FP32, &[1., 2., 3.]).is_err());
    assert!(Matrix::identity(0, FP32).is_err());

    a.cast(FP64);
    assert_eq!(a.get_format(), FP64);
    assert_eq!(a.get(0, 1).unwrap().get_format(), FP64);
}

#[test]
fn test_max_magnitude_row() {
    let a = Matrix::from_f64(3, FP64, &[1., 0., 0., -3., 0., 0., 3., 0., 0.])
        .unwrap();
    // Ties go to the first row.
    assert_eq!(a.max_magnitude_row(0, 0), 1);
    assert_eq!(a.max_magnitude_row(0, 2), 2);
    assert_eq!(a.max_magnitude_row(1, 0), 0);

    let nan = f64::NAN;
    let b = Matrix::from_f64(3, FP64, &[nan, nan, 0., 2., nan, 0., -5., 0., 0.])
        .unwrap();
    assert_eq!(b.max_magnitude_row(0, 0), 2);
    assert_eq!(b.max_magnitude_row(1, 0), 2);
    let c = Matrix::from_f64(2, FP64, &[nan, 0., nan, 0.]).unwrap();
    assert_eq!(c.max_magnitude_row(0, 0), 0);
}

#[test]
fn test_random_sparse_matrix() {
    let mut rng = StdRng::seed_from_u64(7);
    let range = RandomRange::default();
    let n = 6;
    let a = Matrix::random(n, FP64, &range, 0.5, &mut rng).unwrap();

    for row in 0..n {
        let nonzero = (0..n).filter(|c| !a.get(row, *c).unwrap().is_zero());
        assert!(nonzero.count() >= 1);
    }
    let zeros = a.data.iter().filter(|v| v.is_zero()).count();
    assert!(zeros > 0 && zeros < n * n);

    assert!(Matrix::random(n, FP64, &range, 0.9, &mut rng).is_err());
    assert!(Matrix::random(n, FP64, &range, -0.1, &mut rng).is_err());
    assert!(Matrix::random(1, FP64, &range, 0.5, &mut rng).is_err());

    let dense = Matrix::random(n, FP64, &range, 0., &mut rng).unwrap();
    assert!(dense.data.iter().all(|v| v.as_f64().abs() < 10.));
}

#[test]
fn test_random_sparse_matrix_range_below_format() {
    // Every value in the range is below the smallest half precision normal.
    let mut rng = StdRng::seed_from_u64(1);
    let tiny = RandomRange::new(0., 1e-9).unwrap();
    let err = Matrix::random(3, FP16, &tiny, 0.5, &mut rng).unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)));
    assert!(err.to_string().contains("only zeros"));

    // The same range is fine where the format can represent it.
    let a = Matrix::random(3, FP32, &tiny, 0.5, &mut rng).unwrap();
    for row in 0..3 {
        assert!((0..3).any(|c| !a.get(row, c).unwrap().is_zero()));
    }
}

#[test]
fn test_permutation() {
    let mut p = Permutation::identity(3);
    p.swap(0, 2);
    assert_eq!(p.indices(), &[2, 1, 0]);
    assert_eq!(p.as_vector(FP32).unwrap().to_f64(), vec![2., 1., 0.]);
    assert_eq!(
        p.render(Some(1)),
        "0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0"
    );
    assert_eq!(p.render(None), "0, 0, 1, 0, 1, 0, 1, 0, 0");

    assert!(Permutation::from_indices(vec![0, 0]).is_err());
    assert!(Permutation::from_indices(vec![0, 2]).is_err());
}
