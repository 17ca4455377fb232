//! Simulation of floating point numbers with a configurable mantissa and
//! exponent length, and a mixed precision linear solver built on top of
//! them.

mod arithmetic;
mod bits;
mod cast;
mod error;
mod float;
mod precision;
mod string;
mod utils;

pub mod linalg;

pub use self::bits::BitSeq;
pub use self::error::{Error, Field, Result};
pub use self::float::{Category, FloatValue, Format, FP128, FP16, FP32, FP64};
pub use self::linalg::{
    ErrorTracker, Factor, Factors, LinearSystem, Matrix, Permutation, Phase,
    Precisions, RandomRange, RefinementObserver, RefinementReport,
    SolverConfig, Vector,
};
