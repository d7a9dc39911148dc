//! Traits for layer-potential kernels and far-field evaluators

use num::complex::Complex;
use rlst::RlstScalar;

use crate::error::Result;
use crate::types::{EvalType, LayerStrengths, MatrixLayers, PointSet};

/// Interface to evaluating a real-valued 2D Green's function kernel with charge and dipole layers.
pub trait Kernel: Sync {
    /// The scalar type
    type T: RlstScalar<Real = Self::T>;

    /// The decay parameter `k` of the kernel.
    fn decay_parameter(&self) -> Self::T;

    /// Evaluate the Green's fct. for a single source and single target.
    ///
    /// `source` and `target` are `[x, y]`. With [EvalType::Value] `result` receives the value,
    /// with [EvalType::ValueDeriv] the value followed by the two derivatives with respect to the
    /// target coordinates.
    fn greens_fct(
        &self,
        eval_type: EvalType,
        source: &[Self::T],
        target: &[Self::T],
        result: &mut [Self::T],
    );

    /// Single threaded evaluation of the potential induced by charge and dipole layers.
    ///
    /// - `eval_type`: Either [EvalType::Value] to only return potential values
    ///              or [EvalType::ValueDeriv] to return values and target gradients.
    /// - `sources`: The source points.
    /// - `targets`: The target points.
    /// - `strengths`: Charge and dipole strengths. These are used as given, any quadrature
    ///              weights or normalization must already be folded in.
    /// - `self_interaction`: If true, sources and targets are the same point set and the
    ///              pair `i == j` is skipped. Coincident points in distinct sets are not
    ///              detected and produce non-finite values.
    /// - `result`: The result array, which is added to. For [EvalType::Value] it has one entry
    ///           per target, for [EvalType::ValueDeriv] three consecutive entries per target.
    fn evaluate_st(
        &self,
        eval_type: EvalType,
        sources: PointSet<'_, Self::T>,
        targets: PointSet<'_, Self::T>,
        strengths: &LayerStrengths<'_, Self::T>,
        self_interaction: bool,
        result: &mut [Self::T],
    );

    /// Multi-threaded evaluation of the potential.
    ///
    /// The method parallelizes over the given targets on the global Rayon thread pool.
    fn evaluate_mt(
        &self,
        eval_type: EvalType,
        sources: PointSet<'_, Self::T>,
        targets: PointSet<'_, Self::T>,
        strengths: &LayerStrengths<'_, Self::T>,
        self_interaction: bool,
        result: &mut [Self::T],
    );

    /// Single threaded assembly of a kernel matrix.
    ///
    /// - `sources`: The source points.
    /// - `targets`: The target points.
    /// - `layers`: Which of charge and dipole contributions enter the matrix.
    /// - `weights`: Quadrature weights per source, unit weights if `None`.
    /// - `self_interaction`: If true, the diagonal is set to zero.
    /// - `result`: The result array of length `ntargets * nsources`. For each target all
    ///           corresponding source entries are consecutive in memory, i.e. this is a
    ///           row-major `[T, S]` matrix (or a column-major `[S, T]` matrix).
    fn assemble_st(
        &self,
        sources: PointSet<'_, Self::T>,
        targets: PointSet<'_, Self::T>,
        layers: &MatrixLayers<'_, Self::T>,
        weights: Option<&[Self::T]>,
        self_interaction: bool,
        result: &mut [Self::T],
    );

    /// Multi-threaded version of kernel matrix assembly.
    fn assemble_mt(
        &self,
        sources: PointSet<'_, Self::T>,
        targets: PointSet<'_, Self::T>,
        layers: &MatrixLayers<'_, Self::T>,
        weights: Option<&[Self::T]>,
        self_interaction: bool,
        result: &mut [Self::T],
    );

    /// Return the space dimension.
    fn space_dimension(&self) -> usize;

    /// Return the range component count of the Green's fct.
    ///
    /// This is `1` if [EvalType::Value] is given, and `3` if [EvalType::ValueDeriv] is given.
    fn range_component_count(&self, eval_type: EvalType) -> usize;
}

/// A far-field evaluation request.
///
/// The evaluator uses the 2D Helmholtz normalization `(i/4) H0(zk r)` for the Green's function.
/// Dipoles act through the derivative with respect to the source point along `dipvec`.
#[derive(Clone, Copy)]
pub struct FarFieldRequest<'a, T: RlstScalar<Real = T>> {
    /// Values only or values and target gradients.
    pub eval_type: EvalType,
    /// Complex wavenumber `zk`.
    pub wavenumber: Complex<T>,
    /// Source points.
    pub sources: PointSet<'a, T>,
    /// Evaluation points. `None` requests values at the sources with the
    /// self-interaction excluded.
    pub targets: Option<PointSet<'a, T>>,
    /// Charge strengths.
    pub charges: Option<&'a [Complex<T>]>,
    /// Dipole strengths.
    pub dipstr: Option<&'a [Complex<T>]>,
    /// Dipole orientations.
    pub dipvec: Option<PointSet<'a, T>>,
}

impl<T: RlstScalar<Real = T>> FarFieldRequest<'_, T> {
    /// Number of evaluation points.
    pub fn number_of_evaluation_points(&self) -> usize {
        match self.targets {
            Some(targets) => targets.len(),
            None => self.sources.len(),
        }
    }
}

/// An accelerated (fast multipole type) evaluator of Helmholtz potentials.
pub trait FarFieldEvaluator<T: RlstScalar<Real = T>>: Sync {
    /// Evaluate the field at the requested points.
    ///
    /// Returns one complex value per evaluation point for [EvalType::Value] and three
    /// consecutive values (potential and its x and y derivatives) for [EvalType::ValueDeriv].
    fn evaluate(&self, request: &FarFieldRequest<'_, T>) -> Result<Vec<Complex<T>>>;
}
