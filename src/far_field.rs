//! Adapter to fast far-field evaluators
//!
//! A far-field evaluator works with the 2D Helmholtz Green's function `(i/4) H0(zk r)`. For the
//! imaginary wavenumber `zk = i k` this is `K0(k r) / (2π)`, the modified Helmholtz Green's
//! function including its normalization. Quadrature weights are therefore passed on unscaled.
use num::complex::Complex;
use rlst::RlstScalar;

use crate::error::{KernelError, Result};
use crate::helpers::{check_strengths, inv_2pi, source_scale};
use crate::modified_helmholtz_2d::ModifiedHelmholtz2dKernel;
use crate::traits::{FarFieldEvaluator, FarFieldRequest, Kernel};
use crate::types::{Dipoles, EvalType, LayerStrengths, PointSet};

/// Evaluate the modified Helmholtz potential with decay parameter `k` through a far-field evaluator.
///
/// Strengths are multiplied by the raw `weights` (unit weights if `None`), the decay parameter is
/// passed as the wavenumber `i k` and the real part of the returned field is written to `result`.
/// If `self_interaction` is set the evaluator is asked for values at the sources themselves.
#[allow(clippy::too_many_arguments)]
pub fn evaluate_far_field<T: RlstScalar<Real = T>>(
    evaluator: &dyn FarFieldEvaluator<T>,
    eval_type: EvalType,
    k: T,
    sources: PointSet<'_, T>,
    targets: PointSet<'_, T>,
    strengths: &LayerStrengths<'_, T>,
    weights: Option<&[T]>,
    self_interaction: bool,
    result: &mut [T],
) -> Result<()> {
    check_strengths(sources, strengths);
    if self_interaction {
        assert_eq!(
            sources.len(),
            targets.len(),
            "self interaction requires identical source and target sets"
        );
    }

    let weights = source_scale(sources.len(), weights, T::one());

    let weighted = |values: &[T]| -> Vec<Complex<T>> {
        values
            .iter()
            .zip(weights.iter())
            .map(|(&value, &weight)| Complex::new(value * weight, T::zero()))
            .collect()
    };

    let charges = strengths.charge.map(weighted);
    let dipstr = strengths
        .dipoles
        .map(|dipoles| weighted(dipoles.strengths()));

    let request = FarFieldRequest {
        eval_type,
        wavenumber: Complex::new(T::zero(), k),
        sources,
        targets: if self_interaction { None } else { Some(targets) },
        charges: charges.as_deref(),
        dipstr: dipstr.as_deref(),
        dipvec: strengths.dipoles.map(|dipoles| dipoles.orientation()),
    };

    let range_count = match eval_type {
        EvalType::Value => 1,
        EvalType::ValueDeriv => 3,
    };
    let expected_len = range_count * request.number_of_evaluation_points();
    assert_eq!(result.len(), expected_len, "result has wrong size");

    log::trace!(
        "far-field request: {} sources, {} evaluation points, self evaluation: {}",
        sources.len(),
        request.number_of_evaluation_points(),
        self_interaction
    );

    let values = evaluator.evaluate(&request)?;

    if values.len() != expected_len {
        return Err(KernelError::FarField(format!(
            "expected {} values, evaluator returned {}",
            expected_len,
            values.len()
        )));
    }

    for (r, value) in result.iter_mut().zip(values.iter()) {
        *r = value.re;
    }

    Ok(())
}

/// Far-field evaluator that sums all interactions directly.
///
/// Only purely imaginary wavenumbers `i k` with `k > 0` are supported, for which the Helmholtz
/// Green's function is real. Real and imaginary parts of the strengths are evaluated separately.
#[derive(Clone, Copy, Debug)]
pub struct DirectFarFieldEvaluator {
    multithreaded: bool,
}

impl Default for DirectFarFieldEvaluator {
    fn default() -> Self {
        Self::new(true)
    }
}

impl DirectFarFieldEvaluator {
    /// Create new
    pub fn new(multithreaded: bool) -> Self {
        Self { multithreaded }
    }
}

impl<T: RlstScalar<Real = T> + Send + Sync> FarFieldEvaluator<T> for DirectFarFieldEvaluator {
    fn evaluate(&self, request: &FarFieldRequest<'_, T>) -> Result<Vec<Complex<T>>> {
        let re = num::cast::<T, f64>(request.wavenumber.re).unwrap();
        let im = num::cast::<T, f64>(request.wavenumber.im).unwrap();
        if re != 0.0 || im.is_nan() || im <= 0.0 {
            return Err(KernelError::UnsupportedWavenumber { re, im });
        }

        let dipvec = match (request.dipstr, request.dipvec) {
            (Some(_), None) => {
                return Err(KernelError::FarField(
                    "dipole strengths given without orientations".to_string(),
                ))
            }
            (_, dipvec) => dipvec,
        };

        let kernel = ModifiedHelmholtz2dKernel::new(request.wavenumber.im);
        let (targets, self_interaction) = match request.targets {
            Some(targets) => (targets, false),
            None => (request.sources, true),
        };

        let m_inv_2pi = inv_2pi::<T>();
        let part = |values: Option<&[Complex<T>]>, imaginary: bool| -> Option<Vec<T>> {
            values.map(|values| {
                values
                    .iter()
                    .map(|v| (if imaginary { v.im } else { v.re }) * m_inv_2pi)
                    .collect()
            })
        };

        let range_count = kernel.range_component_count(request.eval_type);
        let mut parts = [
            vec![T::zero(); range_count * targets.len()],
            vec![T::zero(); range_count * targets.len()],
        ];

        for (imaginary, result) in [false, true].into_iter().zip(parts.iter_mut()) {
            let charges = part(request.charges, imaginary);
            let dipstr = part(request.dipstr, imaginary);

            let strengths = LayerStrengths {
                charge: charges.as_deref(),
                dipoles: dipstr
                    .as_deref()
                    .zip(dipvec)
                    .map(|(dipstr, dipvec)| Dipoles::new(dipstr, dipvec)),
            };

            if self.multithreaded {
                kernel.evaluate_mt(
                    request.eval_type,
                    request.sources,
                    targets,
                    &strengths,
                    self_interaction,
                    result,
                );
            } else {
                kernel.evaluate_st(
                    request.eval_type,
                    request.sources,
                    targets,
                    &strengths,
                    self_interaction,
                    result,
                );
            }
        }

        let [real, imag] = parts;
        Ok(real
            .into_iter()
            .zip(imag)
            .map(|(re, im)| Complex::new(re, im))
            .collect())
    }
}
