//! Dense linear algebra on simulated floats, and a mixed precision solver
//! that refines the solution of a linear system iteratively.

mod matrix;
mod plu;
mod solver;

pub use self::matrix::{Matrix, Permutation, RandomRange, Vector};
pub use self::plu::Factors;
pub use self::solver::{
    ErrorTracker, Factor, LinearSystem, Phase, Precisions, RefinementObserver,
    RefinementReport, SolverConfig,
};
