//! PLU decomposition with partial pivoting, and the triangular solves that
//! use it.
//!
//! The decomposition computes `P * A = L * U`, where `L` is unit lower
//! triangular, `U` is upper triangular and `P` is a row permutation. All
//! arithmetic happens in the format that the decomposition was requested
//! in. A zero pivot is not special-cased: the division by zero produces
//! infinities or NaNs in the dependent entries and the decomposition runs
//! to completion.

use super::matrix::{Matrix, Permutation, Vector};
use crate::error::{Error, Field, Result};
use crate::float::{FloatValue, Format};
use tracing::debug;

/// The factors of a PLU decomposition.
#[derive(Debug, Clone)]
pub struct Factors {
    l: Matrix,
    u: Matrix,
    p: Permutation,
}

impl Factors {
    /// Decomposes `a` after converting it to `format`.
    pub fn decompose(a: &Matrix, format: Format) -> Result<Self> {
        let n = a.get_dimension();
        let mut l = Matrix::identity(n, format)?;
        let mut u = a.cast_to(format);
        let mut p = Permutation::identity(n);

        for k in 0..n {
            let pivot = u.max_magnitude_row(k, k);
            u.swap_rows(k, pivot, k..n);
            l.swap_rows(k, pivot, 0..k);
            p.swap(k, pivot);

            for j in k + 1..n {
                let factor = u.at(j, k).div(u.at(k, k))?;
                for i in k..n {
                    let delta = factor.mul(u.at(k, i))?;
                    let updated = u.at(j, i).sub(&delta)?;
                    *u.at_mut(j, i) = updated;
                }
                *l.at_mut(j, k) = factor;
            }
        }

        debug!(n, ?format, "PLU decomposition finished");
        Ok(Self { l, u, p })
    }

    pub fn get_l(&self) -> &Matrix {
        &self.l
    }

    pub fn get_u(&self) -> &Matrix {
        &self.u
    }

    pub fn get_p(&self) -> &Permutation {
        &self.p
    }

    /// Returns the format that the factors were computed in.
    pub fn get_format(&self) -> Format {
        self.l.get_format()
    }

    pub fn get_dimension(&self) -> usize {
        self.l.get_dimension()
    }

    fn check_rhs(&self, b: &Vector) -> Result<()> {
        let n = self.get_dimension();
        if b.len() != n {
            return Err(Error::mismatch(Field::Dimension, n, b.len()));
        }
        self.get_format().check_same(&b.get_format())
    }

    /// Solves `L * x = b` row by row from the top.
    pub fn forward_substitute(&self, b: &Vector) -> Result<Vector> {
        self.check_rhs(b)?;
        let l = &self.l;
        let b = b.values();
        let mut x: Vec<FloatValue> = Vec::with_capacity(b.len());
        for i in 0..b.len() {
            let mut sum = FloatValue::zero(self.get_format(), false);
            for (j, xj) in x.iter().enumerate() {
                sum = sum.add(&l.at(i, j).mul(xj)?)?;
            }
            x.push(b[i].sub(&sum)?.div(l.at(i, i))?);
        }
        Vector::from_values(x)
    }

    /// Solves `U * x = b` row by row from the bottom.
    pub fn backward_substitute(&self, b: &Vector) -> Result<Vector> {
        self.check_rhs(b)?;
        let u = &self.u;
        let n = b.len();
        let b = b.values();
        let mut x = vec![FloatValue::zero(self.get_format(), false); n];
        for i in (0..n).rev() {
            let mut sum = FloatValue::zero(self.get_format(), false);
            for j in (i + 1..n).rev() {
                sum = sum.add(&u.at(i, j).mul(&x[j])?)?;
            }
            x[i] = b[i].sub(&sum)?.div(u.at(i, i))?;
        }
        Vector::from_values(x)
    }

    /// Solves `A * x = b` with the stored factors. `b` must already be in
    /// the format of the factors.
    pub fn solve(&self, b: &Vector) -> Result<Vector> {
        let permuted = b.permute(&self.p)?;
        let y = self.forward_substitute(&permuted)?;
        self.backward_substitute(&y)
    }
}

#[cfg(test)]
use crate::float::{FP32, FP64};

#[test]
fn test_decompose_3x3_single() {
    let a = Matrix::from_f64(3, FP32, &[1., 2., 3., 4., 5., 6., 7., 8., 9.])
        .unwrap();
    let f = Factors::decompose(&a, FP32).unwrap();
    assert_eq!(
        f.get_l().render(Some(2)),
        "1.00, 0.00, 0.00, 0.14, 1.00, 0.00, 0.57, 0.50, 1.00"
    );
    assert_eq!(
        f.get_u().render(Some(2)),
        "7.00, 8.00, 9.00, 0.00, 0.86, 1.71, 0.00, 0.00, 0.00"
    );
    assert_eq!(f.get_p().indices(), &[2, 0, 1]);
    assert_eq!(
        f.get_p().render(Some(2)),
        "0.00, 0.00, 1.00, 1.00, 0.00, 0.00, 0.00, 1.00, 0.00"
    );
}

#[test]
fn test_decompose_3x3_pivots_largest_row() {
    // Row pivoting moves 70 to the top, so P is not the identity even though
    // the first row is nonzero.
    let values = [10., 20., 30., 40., 50., 60., 70., 80., 90.];
    let a = Matrix::from_f64(3, FP64, &values).unwrap();
    let f = Factors::decompose(&a, FP64).unwrap();
    assert_eq!(
        f.get_l().render(Some(4)),
        "1.0000, 0.0000, 0.0000, 0.1429, 1.0000, 0.0000, \
         0.5714, 0.5000, 1.0000"
    );
    assert_eq!(
        f.get_u().render(Some(4)),
        "70.0000, 80.0000, 90.0000, 0.0000, 8.5714, 17.1429, \
         0.0000, 0.0000, -0.0000"
    );
    assert_eq!(f.get_p().indices(), &[2, 0, 1]);
    assert_eq!(f.get_p().render(Some(0)), "0, 0, 1, 1, 0, 0, 0, 1, 0");
}

#[test]
fn test_decompose_3x3_negative() {
    let values = [4., -7., 2., -3., 1., -6., 3.5, 3., -8.4];
    let a = Matrix::from_f64(3, FP32, &values).unwrap();
    let f = Factors::decompose(&a, FP32).unwrap();
    assert_eq!(
        f.get_l().render(Some(4)),
        "1.0000, 0.0000, 0.0000, 0.8750, 1.0000, 0.0000, \
         -0.7500, -0.4658, 1.0000"
    );
    assert_eq!(
        f.get_u().render(Some(4)),
        "4.0000, -7.0000, 2.0000, 0.0000, 9.1250, -10.1500, \
         0.0000, 0.0000, -9.2274"
    );
    assert_eq!(f.get_p().indices(), &[0, 2, 1]);
}

#[test]
fn test_decompose_4x4_double() {
    let values =
        [2., 5., 8., 7., 5., 2., 2., 8., 7., 5., 6., 6., 5., 4., 4., 8.];
    let a = Matrix::from_f64(4, FP64, &values).unwrap();
    let f = Factors::decompose(&a, FP64).unwrap();
    assert_eq!(
        f.get_l().render(Some(8)),
        "1.00000000, 0.00000000, 0.00000000, 0.00000000, \
         0.28571429, 1.00000000, 0.00000000, 0.00000000, \
         0.71428571, 0.12000000, 1.00000000, 0.00000000, \
         0.71428571, -0.44000000, -0.46153846, 1.00000000"
    );
    assert_eq!(
        f.get_u().render(Some(8)),
        "7.00000000, 5.00000000, 6.00000000, 6.00000000, \
         0.00000000, 3.57142857, 6.28571429, 5.28571429, \
         0.00000000, 0.00000000, -1.04000000, 3.08000000, \
         0.00000000, 0.00000000, 0.00000000, 7.46153846"
    );
    assert_eq!(f.get_p().indices(), &[2, 0, 3, 1]);
}

#[test]
fn test_decompose_4x4_single_negative_zero() {
    let values =
        [5., -2., 0., -6., 2., 8., 2., -4., 2., 12., 3., 5., 2., 33., -32., 3.];
    let a = Matrix::from_f64(4, FP32, &values).unwrap();
    let f = Factors::decompose(&a, FP32).unwrap();
    assert_eq!(
        f.get_l().render(Some(2)),
        "1.00, 0.00, 0.00, 0.00, 0.40, 1.00, 0.00, 0.00, \
         0.40, 0.38, 1.00, 0.00, 0.40, 0.26, 0.68, 1.00"
    );
    // The elimination leaves a negative rounding residue below the
    // diagonal.
    assert_eq!(
        f.get_u().render(Some(2)),
        "5.00, -2.00, 0.00, -6.00, 0.00, 33.80, -32.00, 5.40, \
         0.00, 0.00, 15.12, 5.36, 0.00, -0.00, 0.00, -6.67"
    );
    assert_eq!(
        f.get_p().render(Some(2)),
        "1.00, 0.00, 0.00, 0.00, 0.00, 0.00, 0.00, 1.00, \
         0.00, 0.00, 1.00, 0.00, 0.00, 1.00, 0.00, 0.00"
    );
}

#[test]
fn test_decompose_casts_input() {
    let a = Matrix::from_f64(2, FP64, &[4., 3., 6., 3.]).unwrap();
    let f = Factors::decompose(&a, FP32).unwrap();
    assert_eq!(f.get_format(), FP32);
    assert_eq!(f.get_u().get_format(), FP32);
    assert_eq!(f.get_l().render(None), "1, 0, 0.6666666865348816, 1");
}

#[test]
fn test_substitution() {
    let a = Matrix::from_f64(3, FP64, &[2., 1., 1., 4., -6., 0., -2., 7., 2.])
        .unwrap();
    let f = Factors::decompose(&a, FP64).unwrap();

    // A * [1, 2, 3] = [7, -8, 18].
    let b = Vector::from_f64(FP64, &[7., -8., 18.]).unwrap();
    let x = f.solve(&b).unwrap();
    for (got, want) in x.to_f64().iter().zip([1., 2., 3.].iter()) {
        approx::assert_abs_diff_eq!(*got, *want, epsilon = 1e-12);
    }

    // Forward substitution on the identity part of L leaves b alone.
    let id = Factors::decompose(&Matrix::identity(3, FP64).unwrap(), FP64)
        .unwrap();
    assert_eq!(id.forward_substitute(&b).unwrap().to_f64(), b.to_f64());
    assert_eq!(id.backward_substitute(&b).unwrap().to_f64(), b.to_f64());
}

#[test]
fn test_substitution_mismatch() {
    let a = Matrix::identity(2, FP64).unwrap();
    let f = Factors::decompose(&a, FP64).unwrap();
    let short = Vector::from_f64(FP64, &[1.]).unwrap();
    let single = Vector::from_f64(FP32, &[1., 2.]).unwrap();
    assert_eq!(
        f.forward_substitute(&short).unwrap_err(),
        Error::mismatch(Field::Dimension, 2, 1)
    );
    assert!(f.backward_substitute(&single).is_err());
}

#[test]
fn test_zero_pivot_is_not_an_error() {
    let a = Matrix::from_f64(2, FP64, &[0., 1., 0., 1.]).unwrap();
    let f = Factors::decompose(&a, FP64).unwrap();
    let b = Vector::from_f64(FP64, &[1., 2.]).unwrap();
    let x = f.solve(&b).unwrap();
    assert_eq!(x.get(1).unwrap().as_f64(), 2.);
    assert!(x.get(0).unwrap().is_inf());
}
