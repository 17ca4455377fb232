//! Iterative refinement with three precisions.
//!
//! The system matrix is factored once in a cheap decomposition precision.
//! Each step computes the residual `r = b - A * x` in a wide residual
//! precision, solves `A * d = r` with the cheap factors, and applies the
//! correction `x += d` in the working precision. The loop ends when a
//! registered target is met, or when the iteration budget runs out.

use super::matrix::{check_sparsity, Matrix, RandomRange, Vector};
use super::plu::Factors;
use crate::error::{Error, Field, Result};
use crate::float::{FloatValue, Format};
use rand::Rng;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// The three precisions of the refinement loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precisions {
    decomposition: Format,
    working: Format,
    residual: Format,
}

impl Precisions {
    pub fn new(
        decomposition: Format,
        working: Format,
        residual: Format,
    ) -> Self {
        Self {
            decomposition,
            working,
            residual,
        }
    }

    /// Uses the same format for every step.
    pub fn uniform(format: Format) -> Self {
        Self::new(format, format, format)
    }

    /// The precision of the PLU decomposition and the correction solves.
    pub fn get_decomposition(&self) -> Format {
        self.decomposition
    }

    /// The precision of the solution and its updates.
    pub fn get_working(&self) -> Format {
        self.working
    }

    /// The precision of the system matrix and the residual.
    pub fn get_residual(&self) -> Format {
        self.residual
    }
}

/// Parameters of a [`LinearSystem`].
#[derive(Debug, Clone)]
pub struct SolverConfig {
    n: usize,
    precisions: Precisions,
    max_iter: usize,
    random_range: RandomRange,
    sparsity: f64,
}

impl SolverConfig {
    /// Creates the configuration of an `n` by `n` system with the default
    /// budget of 10 refinement steps, random elements in [-10, 10) and a
    /// dense random matrix.
    pub fn new(n: usize, precisions: Precisions) -> Result<Self> {
        if n == 0 {
            return Err(Error::InvalidConfiguration(
                "the system must have at least one unknown".into(),
            ));
        }
        Ok(Self {
            n,
            precisions,
            max_iter: 10,
            random_range: RandomRange::default(),
            sparsity: 0.,
        })
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_precisions(mut self, precisions: Precisions) -> Self {
        self.precisions = precisions;
        self
    }

    /// Sets the range of random elements. Fails unless `lower < upper`.
    pub fn with_random_range(mut self, lower: f64, upper: f64) -> Result<Self> {
        self.random_range = RandomRange::new(lower, upper)?;
        Ok(self)
    }

    /// Sets the fraction of zeros in random matrices. Fails unless the rate
    /// is in `[0, 1 - 1/n]`.
    pub fn with_sparsity(mut self, sparsity: f64) -> Result<Self> {
        check_sparsity(self.n, sparsity)?;
        self.sparsity = sparsity;
        Ok(self)
    }

    pub fn get_dimension(&self) -> usize {
        self.n
    }

    pub fn get_precisions(&self) -> Precisions {
        self.precisions
    }

    pub fn get_max_iter(&self) -> usize {
        self.max_iter
    }

    pub fn get_random_range(&self) -> RandomRange {
        self.random_range
    }

    pub fn get_sparsity(&self) -> f64 {
        self.sparsity
    }
}

/// Selects a matrix of the system for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Factor {
    /// The system matrix.
    A,
    L,
    U,
    P,
}

/// The timed phases of the refinement loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Decomposition and the initial solve, in the decomposition precision.
    Decomposition,
    /// Residual computation, in the residual precision.
    Residual,
    /// Correction solve, in the decomposition precision.
    Correction,
    /// Solution update, in the working precision.
    Update,
}

/// Receives progress of the refinement loop. Both hooks do nothing by
/// default.
pub trait RefinementObserver {
    /// Called after each phase with its wall-clock duration.
    fn on_phase(&mut self, _phase: Phase, _elapsed: Duration) {}

    /// Called after the solution was updated in step `step`. The residual is
    /// the one that the correction was computed from.
    fn on_iteration(&mut self, _step: usize, _x: &Vector, _residual: &Vector) {}
}

impl RefinementObserver for () {}

/// The outcome of a refinement run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefinementReport {
    /// The number of residual checks that ran. Equals the budget when no
    /// target was met.
    pub iterations: usize,
    /// True if a registered target was met.
    pub converged: bool,
}

/// A linear system `A * x = b`, its PLU factors, and the targets that the
/// refinement loop checks for convergence.
#[derive(Debug, Clone)]
pub struct LinearSystem {
    config: SolverConfig,
    matrix: Option<Matrix>,
    factors: Option<Factors>,
    expected_result: Option<Vector>,
    expected_error: Option<FloatValue>,
    expected_precision: Option<FloatValue>,
}

impl LinearSystem {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            matrix: None,
            factors: None,
            expected_result: None,
            expected_error: None,
            expected_precision: None,
        }
    }

    pub fn get_config(&self) -> &SolverConfig {
        &self.config
    }

    fn residual_format(&self) -> Format {
        self.config.precisions.residual
    }

    fn replace_matrix(&mut self, matrix: Matrix) {
        self.matrix = Some(matrix);
        self.factors = None;
    }

    /// Sets the system matrix to the identity.
    pub fn set_identity_matrix(&mut self) -> Result<()> {
        let n = self.config.n;
        self.replace_matrix(Matrix::identity(n, self.residual_format())?);
        Ok(())
    }

    /// Sets the system matrix from `n * n` row-major doubles.
    pub fn set_matrix(&mut self, values: &[f64]) -> Result<()> {
        let n = self.config.n;
        let format = self.residual_format();
        self.replace_matrix(Matrix::from_f64(n, format, values)?);
        Ok(())
    }

    /// Sets the system matrix to a random matrix that follows the random
    /// range and the sparsity of the configuration.
    pub fn set_random_matrix<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<()> {
        let cfg = &self.config;
        let matrix = Matrix::random(
            cfg.n,
            self.residual_format(),
            &cfg.random_range,
            cfg.sparsity,
            rng,
        )?;
        self.replace_matrix(matrix);
        Ok(())
    }

    /// Returns the system matrix.
    pub fn matrix(&self) -> Result<&Matrix> {
        self.matrix.as_ref().ok_or_else(|| {
            Error::InvalidState("no system matrix was set".into())
        })
    }

    /// Returns an element of the system matrix.
    pub fn element(&self, row: usize, col: usize) -> Result<&FloatValue> {
        self.matrix()?.get(row, col)
    }

    /// Computes the PLU decomposition of the system matrix in `format`, and
    /// keeps it for the substitution steps.
    pub fn decompose(&mut self, format: Format) -> Result<()> {
        let factors = Factors::decompose(self.matrix()?, format)?;
        self.factors = Some(factors);
        Ok(())
    }

    /// Returns the factors of the last decomposition.
    pub fn factors(&self) -> Result<&Factors> {
        self.factors.as_ref().ok_or_else(|| {
            Error::InvalidState("the system was not decomposed".into())
        })
    }

    pub fn forward_substitute(&self, b: &Vector) -> Result<Vector> {
        self.factors()?.forward_substitute(b)
    }

    pub fn backward_substitute(&self, b: &Vector) -> Result<Vector> {
        self.factors()?.backward_substitute(b)
    }

    /// Reorders `b` with the row permutation of the last decomposition.
    pub fn permute(&self, b: &Vector) -> Result<Vector> {
        b.permute(self.factors()?.get_p())
    }

    /// Renders one of the matrices as a comma separated row-major list.
    pub fn render(
        &self,
        factor: Factor,
        digits: Option<usize>,
    ) -> Result<String> {
        Ok(match factor {
            Factor::A => self.matrix()?.render(digits),
            Factor::L => self.factors()?.get_l().render(digits),
            Factor::U => self.factors()?.get_u().render(digits),
            Factor::P => self.factors()?.get_p().render(digits),
        })
    }

    /// Computes `A * x`. `x` must be in the residual precision.
    pub fn multiply(&self, x: &Vector) -> Result<Vector> {
        self.matrix()?.mul_vector(x)
    }

    fn check_len(&self, v: &Vector) -> Result<()> {
        if v.len() != self.config.n {
            let n = self.config.n;
            return Err(Error::mismatch(Field::Dimension, n, v.len()));
        }
        Ok(())
    }

    /// Solves the system directly with a decomposition in the residual
    /// precision, without refinement.
    pub fn solve_direct(&mut self, b: &Vector) -> Result<Vector> {
        self.check_len(b)?;
        let format = self.residual_format();
        self.decompose(format)?;
        self.factors()?.solve(&b.cast_to(format))
    }

    /// Runs iterative refinement. See [`LinearSystem::refine_with`].
    pub fn refine(
        &mut self,
        b: &Vector,
    ) -> Result<(Vector, RefinementReport)> {
        self.refine_with(b, &mut ())
    }

    /// Runs iterative refinement and reports progress to `observer`. The
    /// solution is returned in the working precision. Running out of
    /// iterations is not an error; the report tells whether a target was
    /// met.
    pub fn refine_with(
        &mut self,
        b: &Vector,
        observer: &mut dyn RefinementObserver,
    ) -> Result<(Vector, RefinementReport)> {
        self.check_len(b)?;
        let Precisions {
            decomposition: ul,
            working: u,
            residual: ur,
        } = self.config.precisions;
        let b = b.cast_to(ur);

        let start = Instant::now();
        self.decompose(ul)?;
        let factors = self.factors()?;
        let mut x = factors.solve(&b.cast_to(ul))?.cast_to(u);
        observer.on_phase(Phase::Decomposition, start.elapsed());

        let a = self.matrix()?;
        let max_iter = self.config.max_iter;
        let mut report = RefinementReport {
            iterations: max_iter,
            converged: false,
        };

        for step in 0..max_iter {
            let start = Instant::now();
            let b_approx = a.mul_vector(&x.cast_to(ur))?;
            let r = b.sub(&b_approx)?;
            observer.on_phase(Phase::Residual, start.elapsed());

            if self.has_converged(&b, &b_approx, &r)? {
                report = RefinementReport {
                    iterations: step + 1,
                    converged: true,
                };
                break;
            }

            let start = Instant::now();
            let d = factors.solve(&r.cast_to(ul))?;
            observer.on_phase(Phase::Correction, start.elapsed());

            let start = Instant::now();
            x = x.add(&d.cast_to(u))?;
            observer.on_phase(Phase::Update, start.elapsed());

            trace!(step, residual = %r.render(None), "refinement step");
            observer.on_iteration(step, &x, &r);
        }

        if report.converged {
            debug!(iterations = report.iterations, "refinement converged");
        } else {
            debug!(max_iter, "refinement used the whole iteration budget");
        }
        Ok((x, report))
    }

    /// Checks the registered targets against the current residual.
    fn has_converged(
        &self,
        b: &Vector,
        b_approx: &Vector,
        r: &Vector,
    ) -> Result<bool> {
        if let Some(target) = &self.expected_precision {
            let mean = b_approx.mean_matching_bits(b)?;
            if mean.cast_to(target.get_format()).is_ge(target)? {
                return Ok(true);
            }
        }
        if let Some(target) = &self.expected_error {
            if r.mean_abs()?.is_le(target)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Registers the known solution of the system. It is rounded to the
    /// working precision and then stored in the residual precision.
    pub fn set_expected_result(&mut self, x: &Vector) -> Result<()> {
        self.check_len(x)?;
        let precisions = self.config.precisions;
        let x = x.cast_to(precisions.working).cast_to(precisions.residual);
        self.expected_result = Some(x);
        Ok(())
    }

    pub fn expected_result(&self) -> Option<&Vector> {
        self.expected_result.as_ref()
    }

    fn require_expected_result(&self, what: &str) -> Result<&Vector> {
        self.expected_result.as_ref().ok_or_else(|| {
            Error::InvalidState(format!(
                "an expected result must be set before the {}",
                what
            ))
        })
    }

    /// Registers the target mean absolute residual, in the residual
    /// precision.
    pub fn set_expected_error(&mut self, error: &FloatValue) -> Result<()> {
        self.require_expected_result("expected error")?;
        self.expected_error = Some(error.cast_to(self.residual_format()));
        Ok(())
    }

    /// Registers the target mean number of matching mantissa bits between
    /// `A * x` and `b`. The comparison happens in the format of `bits`.
    pub fn set_expected_precision(&mut self, bits: &FloatValue) -> Result<()> {
        self.require_expected_result("expected precision")?;
        self.expected_precision = Some(bits.clone());
        Ok(())
    }

    /// Returns a random vector of length `n` in the residual precision.
    pub fn random_vector<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<Vector> {
        let cfg = &self.config;
        Vector::random(cfg.n, self.residual_format(), &cfg.random_range, rng)
    }

    /// Picks a random solution, registers it as the expected result and
    /// returns the matching right hand side.
    pub fn random_rhs<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<Vector> {
        let x = self.random_vector(rng)?;
        let b = self.multiply(&x)?;
        self.set_expected_result(&x)?;
        Ok(b)
    }

    /// Creates an observer that measures the refinement against the
    /// registered expected result.
    pub fn error_tracker(&self) -> Result<ErrorTracker> {
        let expected = self.require_expected_result("error tracker")?;
        Ok(ErrorTracker::new(expected, self.config.precisions.working))
    }
}

/// Records how far each refined solution is from a known solution, and how
/// much time each phase took.
#[derive(Debug, Clone)]
pub struct ErrorTracker {
    expected: Vector,
    expected_f64: Vec<f64>,
    working_mantissa: usize,
    relative_errors: Vec<f64>,
    absolute_errors: Vec<f64>,
    precision_errors: Vec<f64>,
    phase_times: [Duration; 4],
}

impl ErrorTracker {
    pub fn new(expected: &Vector, working: Format) -> Self {
        Self {
            expected: expected.clone(),
            expected_f64: expected.to_f64(),
            working_mantissa: working.get_mantissa_len(),
            relative_errors: Vec::new(),
            absolute_errors: Vec::new(),
            precision_errors: Vec::new(),
            phase_times: [Duration::ZERO; 4],
        }
    }

    /// The mean relative error of each step.
    pub fn get_relative_errors(&self) -> &[f64] {
        &self.relative_errors
    }

    /// The mean absolute error of each step.
    pub fn get_absolute_errors(&self) -> &[f64] {
        &self.absolute_errors
    }

    /// The mean number of mantissa bits of each step that do not match the
    /// expected solution, out of the working mantissa.
    pub fn get_precision_errors(&self) -> &[f64] {
        &self.precision_errors
    }

    pub fn get_phase_time(&self, phase: Phase) -> Duration {
        self.phase_times[phase as usize]
    }

    pub fn get_total_time(&self) -> Duration {
        self.phase_times.iter().sum()
    }

    fn mean(values: impl Iterator<Item = f64>, n: usize) -> f64 {
        values.sum::<f64>() / n as f64
    }
}

impl RefinementObserver for ErrorTracker {
    fn on_phase(&mut self, phase: Phase, elapsed: Duration) {
        self.phase_times[phase as usize] += elapsed;
    }

    fn on_iteration(&mut self, _step: usize, x: &Vector, _residual: &Vector) {
        let n = self.expected_f64.len();
        let pairs = || x.iter().zip(self.expected_f64.iter());

        let relative = pairs().map(|(v, e)| v.relative_error_f64(*e));
        self.relative_errors.push(Self::mean(relative, n));

        let absolute = pairs().map(|(v, e)| v.absolute_error_f64(*e));
        self.absolute_errors.push(Self::mean(absolute, n));

        let limit = self.working_mantissa as i64;
        let format = self.expected.get_format();
        let bits = x.iter().zip(self.expected.iter()).map(|(v, e)| {
            let matching = v.cast_to(format).matching_mantissa_bits(e);
            matching.unwrap_or(0).min(limit) as f64
        });
        let mean_bits = Self::mean(bits, n);
        self.precision_errors.push(limit as f64 - mean_bits);
    }
}

#[cfg(test)]
use crate::float::{FP16, FP32, FP64};
#[cfg(test)]
use rand::{rngs::StdRng, SeedableRng};

/// Routes the solver logs to the test output. Set RUST_LOG=mpsim=trace to
/// see every refinement step.
#[cfg(test)]
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Returns a diagonally dominant matrix, which is well conditioned.
#[cfg(test)]
fn well_conditioned(n: usize, rng: &mut StdRng) -> Vec<f64> {
    let mut values: Vec<f64> =
        (0..n * n).map(|_| rng.gen_range(-1.0..1.0)).collect();
    for i in 0..n {
        values[i * n + i] += 2. * n as f64;
    }
    values
}

#[cfg(test)]
#[derive(Default)]
struct CountingObserver {
    phases: usize,
    iterations: usize,
}

#[cfg(test)]
impl RefinementObserver for CountingObserver {
    fn on_phase(&mut self, _phase: Phase, _elapsed: Duration) {
        self.phases += 1;
    }
    fn on_iteration(&mut self, _step: usize, _x: &Vector, _residual: &Vector) {
        self.iterations += 1;
    }
}

#[test]
fn test_config() {
    let cfg = SolverConfig::new(3, Precisions::uniform(FP32)).unwrap();
    assert_eq!(cfg.get_max_iter(), 10);
    assert_eq!(cfg.get_sparsity(), 0.);
    assert_eq!(cfg.get_random_range(), RandomRange::default());
    assert_eq!(cfg.get_precisions().get_working(), FP32);

    let cfg = cfg
        .with_max_iter(4)
        .with_random_range(0., 1.)
        .unwrap()
        .with_sparsity(0.5)
        .unwrap()
        .with_precisions(Precisions::new(FP16, FP32, FP64));
    assert_eq!(cfg.get_max_iter(), 4);
    assert_eq!(cfg.get_random_range().get_upper(), 1.);
    assert_eq!(cfg.get_sparsity(), 0.5);
    assert_eq!(cfg.get_precisions().get_decomposition(), FP16);
    assert_eq!(cfg.get_precisions().get_residual(), FP64);

    assert!(cfg.clone().with_random_range(1., 0.).is_err());
    assert!(cfg.clone().with_sparsity(0.7).is_err());
    assert!(SolverConfig::new(0, Precisions::uniform(FP32)).is_err());
}

#[test]
fn test_render_factors() {
    let cfg = SolverConfig::new(3, Precisions::uniform(FP32)).unwrap();
    let mut system = LinearSystem::new(cfg);
    system
        .set_matrix(&[1., 2., 3., 4., 5., 6., 7., 8., 9.])
        .unwrap();
    assert_eq!(
        system.render(Factor::A, Some(0)).unwrap(),
        "1, 2, 3, 4, 5, 6, 7, 8, 9"
    );
    assert!(system.render(Factor::L, Some(2)).is_err());

    system.decompose(FP32).unwrap();
    let render = |f| system.render(f, Some(2)).unwrap();
    assert_eq!(
        render(Factor::L),
        "1.00, 0.00, 0.00, 0.14, 1.00, 0.00, 0.57, 0.50, 1.00"
    );
    assert_eq!(
        render(Factor::U),
        "7.00, 8.00, 9.00, 0.00, 0.86, 1.71, 0.00, 0.00, 0.00"
    );
    assert_eq!(
        render(Factor::P),
        "0.00, 0.00, 1.00, 1.00, 0.00, 0.00, 0.00, 1.00, 0.00"
    );

    let b = Vector::from_f64(FP32, &[1., 2., 3.]).unwrap();
    assert_eq!(system.permute(&b).unwrap().to_f64(), vec![3., 1., 2.]);
}

#[test]
fn test_state_errors() {
    let cfg = SolverConfig::new(2, Precisions::uniform(FP64)).unwrap();
    let mut system = LinearSystem::new(cfg);
    let b = Vector::from_f64(FP64, &[1., 2.]).unwrap();

    let is_state = |r: Result<()>| matches!(r, Err(Error::InvalidState(_)));
    assert!(is_state(system.matrix().map(|_| ())));
    assert!(is_state(system.render(Factor::A, None).map(|_| ())));
    assert!(is_state(system.solve_direct(&b).map(|_| ())));
    assert!(is_state(system.forward_substitute(&b).map(|_| ())));

    let one = FloatValue::one(FP64, false);
    assert!(is_state(system.set_expected_error(&one)));
    assert!(is_state(system.set_expected_precision(&one)));
    assert!(system.error_tracker().is_err());

    system.set_identity_matrix().unwrap();
    assert!(system.element(1, 1).unwrap().as_f64() == 1.);
    assert!(system.element(2, 0).is_err());
    assert!(system.set_matrix(&[1., 2., 3.]).is_err());

    let long = Vector::from_f64(FP64, &[1., 2., 3.]).unwrap();
    assert_eq!(
        system.solve_direct(&long).unwrap_err(),
        Error::mismatch(Field::Dimension, 2, 3)
    );
    assert!(system.set_expected_result(&long).is_err());
    system.set_expected_result(&b).unwrap();
    system.set_expected_error(&one).unwrap();
    system.set_expected_precision(&one).unwrap();
}

#[test]
fn test_solve_direct() {
    init_logging();
    let mut rng = StdRng::seed_from_u64(11);
    let n = 5;
    let cfg = SolverConfig::new(n, Precisions::uniform(FP64)).unwrap();
    let mut system = LinearSystem::new(cfg);
    system.set_matrix(&well_conditioned(n, &mut rng)).unwrap();

    let b = system.random_rhs(&mut rng).unwrap();
    let x = system.solve_direct(&b).unwrap();
    let expected = system.expected_result().unwrap().to_f64();
    for (got, want) in x.to_f64().iter().zip(expected.iter()) {
        approx::assert_abs_diff_eq!(*got, *want, epsilon = 1e-10);
    }
    assert_eq!(system.factors().unwrap().get_format(), FP64);

    // The identity system returns the right hand side.
    system.set_identity_matrix().unwrap();
    assert!(system.factors().is_err());
    let x = system.solve_direct(&b).unwrap();
    assert_eq!(x.to_f64(), b.to_f64());
}

#[test]
fn test_refine_mixed_precision() {
    init_logging();
    let mut rng = StdRng::seed_from_u64(3);
    let n = 5;
    let precisions = Precisions::new(FP32, FP64, FP64);
    let cfg = SolverConfig::new(n, precisions).unwrap();
    let mut system = LinearSystem::new(cfg);
    system.set_matrix(&well_conditioned(n, &mut rng)).unwrap();
    let b = system.random_rhs(&mut rng).unwrap();
    system
        .set_expected_precision(&FloatValue::from_f64(FP64, 30.))
        .unwrap();

    let mut tracker = system.error_tracker().unwrap();
    let (x, report) = system.refine_with(&b, &mut tracker).unwrap();
    assert!(report.converged);
    // The single precision solve alone cannot reach 30 matching bits.
    assert!(report.iterations >= 2);
    assert!(report.iterations <= 10);
    assert_eq!(x.get_format(), FP64);
    assert_eq!(system.factors().unwrap().get_format(), FP32);

    let expected = system.expected_result().unwrap().to_f64();
    for (got, want) in x.to_f64().iter().zip(expected.iter()) {
        approx::assert_abs_diff_eq!(*got, *want, epsilon = 1e-8);
    }

    let errors = tracker.get_relative_errors();
    assert_eq!(errors.len(), report.iterations - 1);
    assert_eq!(tracker.get_absolute_errors().len(), errors.len());
    assert_eq!(tracker.get_precision_errors().len(), errors.len());
    assert!(errors[errors.len() - 1] < 1e-9);
    assert!(tracker.get_total_time() >= tracker.get_phase_time(Phase::Update));
}

#[test]
fn test_refine_expected_error() {
    init_logging();
    let mut rng = StdRng::seed_from_u64(5);
    let n = 5;
    let precisions = Precisions::new(FP16, FP32, FP64);
    let cfg = SolverConfig::new(n, precisions).unwrap();
    let mut system = LinearSystem::new(cfg);
    system.set_matrix(&well_conditioned(n, &mut rng)).unwrap();
    let b = system.random_rhs(&mut rng).unwrap();
    system
        .set_expected_error(&FloatValue::from_f64(FP64, 1e-2))
        .unwrap();

    let (x, report) = system.refine(&b).unwrap();
    assert!(report.converged);
    assert_eq!(x.get_format(), FP32);
    let expected = system.expected_result().unwrap().to_f64();
    for (got, want) in x.to_f64().iter().zip(expected.iter()) {
        approx::assert_abs_diff_eq!(*got, *want, epsilon = 5e-2);
    }
}

#[test]
fn test_iteration_budget() {
    init_logging();
    let mut rng = StdRng::seed_from_u64(9);
    let n = 4;
    let precisions = Precisions::new(FP32, FP32, FP64);
    let cfg = SolverConfig::new(n, precisions).unwrap().with_max_iter(3);
    let mut system = LinearSystem::new(cfg);
    system.set_random_matrix(&mut rng).unwrap();
    let b = system.random_vector(&mut rng).unwrap();

    let mut counter = CountingObserver::default();
    let (_, report) = system.refine_with(&b, &mut counter).unwrap();
    assert_eq!(
        report,
        RefinementReport {
            iterations: 3,
            converged: false
        }
    );
    assert_eq!(counter.iterations, 3);
    // The setup phase and three phases per step.
    assert_eq!(counter.phases, 10);

    // Without a budget only the initial solve runs.
    let cfg = system.get_config().clone().with_max_iter(0);
    let mut system = LinearSystem::new(cfg);
    system.set_identity_matrix().unwrap();
    let (x, report) = system.refine(&b).unwrap();
    assert_eq!(report.iterations, 0);
    assert_eq!(x.to_f64(), b.cast_to(FP32).to_f64());
}
