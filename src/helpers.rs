//! Helper functions
use num::traits::FloatConst;
use rlst::RlstScalar;

use crate::traits::Kernel;
use crate::types::{EvalType, LayerStrengths, MatrixLayers, PointSet};

/// Check dimensions for a direct evaluation.
pub(crate) fn check_dimensions_evaluate<K: Kernel + ?Sized>(
    kernel: &K,
    eval_type: EvalType,
    sources: PointSet<'_, K::T>,
    targets: PointSet<'_, K::T>,
    strengths: &LayerStrengths<'_, K::T>,
    self_interaction: bool,
    result: &[K::T],
) {
    check_strengths(sources, strengths);
    if self_interaction {
        assert_eq!(
            sources.len(),
            targets.len(),
            "self interaction requires identical source and target sets"
        );
    }
    assert_eq!(
        result.len(),
        kernel.range_component_count(eval_type) * targets.len(),
        "result has wrong size"
    );
}

/// Check dimensions for a kernel matrix assembly.
pub(crate) fn check_dimensions_assemble<T>(
    sources: PointSet<'_, T>,
    targets: PointSet<'_, T>,
    layers: &MatrixLayers<'_, T>,
    weights: Option<&[T]>,
    self_interaction: bool,
    result: &[T],
) {
    if let Some(dipvec) = layers.dipvec() {
        assert_eq!(
            dipvec.len(),
            sources.len(),
            "one dipole orientation per source required"
        );
    }
    if let Some(weights) = weights {
        assert_eq!(
            weights.len(),
            sources.len(),
            "one quadrature weight per source required"
        );
    }
    if self_interaction {
        assert_eq!(
            sources.len(),
            targets.len(),
            "self interaction requires identical source and target sets"
        );
    }
    assert_eq!(
        result.len(),
        sources.len() * targets.len(),
        "result has wrong size"
    );
}

/// Check that every given strength array has one entry per source.
pub(crate) fn check_strengths<T>(sources: PointSet<'_, T>, strengths: &LayerStrengths<'_, T>) {
    if let Some(charge) = strengths.charge {
        assert_eq!(
            charge.len(),
            sources.len(),
            "one charge per source required"
        );
    }
    if let Some(dipoles) = strengths.dipoles {
        assert_eq!(
            dipoles.len(),
            sources.len(),
            "one dipole per source required"
        );
    }
}

/// `1 / (2 pi)` in the given precision.
pub(crate) fn inv_2pi<T: RlstScalar<Real = T>>() -> T {
    num::cast::<f64, T>(0.5 * f64::FRAC_1_PI()).unwrap()
}

/// Per-source scale factors, `weights_j * factor`, with unit weights if none are given.
pub(crate) fn source_scale<T: RlstScalar<Real = T>>(
    nsources: usize,
    weights: Option<&[T]>,
    factor: T,
) -> Vec<T> {
    match weights {
        Some(weights) => {
            assert_eq!(
                weights.len(),
                nsources,
                "one quadrature weight per source required"
            );
            weights.iter().map(|&w| w * factor).collect()
        }
        None => vec![factor; nsources],
    }
}

/// Multiply `values` elementwise by `scale`.
pub(crate) fn scale_strengths<T: RlstScalar<Real = T>>(values: &[T], scale: &[T]) -> Vec<T> {
    assert_eq!(values.len(), scale.len());
    values.iter().zip(scale).map(|(&v, &s)| v * s).collect()
}
