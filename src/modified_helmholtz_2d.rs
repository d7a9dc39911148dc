//! Implementation of the modified Helmholtz kernel in 2D
//!
//! The Green's function of `(Δ - k²) u = 0` in the plane is `K0(k r) / (2π)`.
use crate::bessel;
use crate::helpers::{check_dimensions_assemble, check_dimensions_evaluate, inv_2pi, source_scale};
use crate::traits::Kernel;
use crate::types::{EvalType, LayerStrengths, MatrixLayers, PointSet};
use rayon::prelude::*;
use rlst::{RlstScalar, RlstSimd, SimdFor};

/// Kernel for Modified Helmholtz in 2D
#[derive(Clone, Copy)]
pub struct ModifiedHelmholtz2dKernel<T: RlstScalar<Real = T>> {
    k: T,
}

impl<T: RlstScalar<Real = T>> ModifiedHelmholtz2dKernel<T> {
    /// Create new
    ///
    /// `k` is the decay parameter and must be positive.
    pub fn new(k: T) -> Self {
        Self { k }
    }
}

/// Green's function value `K0(k r)` without the `1 / (2π)` normalization.
///
/// Singular at `r = 0`.
pub fn greens_value<T: RlstScalar<Real = T>>(r: T, k: T) -> T {
    from_f64(bessel::k0(to_f64(k * r)))
}

/// Radial derivative factor `k K1(k r) / r` without the `1 / (2π)` normalization.
///
/// Multiplying by a component of `target - source` gives the derivative of the Green's function
/// with respect to that source coordinate. Singular at `r = 0`.
pub fn greens_derivative_factor<T: RlstScalar<Real = T>>(r: T, k: T) -> T {
    k * from_f64::<T>(bessel::k1(to_f64(k * r))) / r
}

#[inline(always)]
fn to_f64<T: RlstScalar<Real = T>>(value: T) -> f64 {
    num::cast::<T, f64>(value).unwrap()
}

#[inline(always)]
fn from_f64<T: RlstScalar<Real = T>>(value: f64) -> T {
    num::cast::<f64, T>(value).unwrap()
}

/// `(K0(k r), K1(k r))` in the kernel precision.
#[inline(always)]
fn bessel_pair<T: RlstScalar<Real = T>>(r: T, k: T) -> (T, T) {
    let (k0, k1) = bessel::k0_k1(to_f64(k * r));
    (from_f64(k0), from_f64(k1))
}

impl<T: RlstScalar<Real = T> + Send + Sync> Kernel for ModifiedHelmholtz2dKernel<T> {
    type T = T;

    fn decay_parameter(&self) -> T {
        self.k
    }

    fn space_dimension(&self) -> usize {
        2
    }

    fn range_component_count(&self, eval_type: EvalType) -> usize {
        modified_helmholtz_component_count(eval_type)
    }

    fn greens_fct(&self, eval_type: EvalType, source: &[T], target: &[T], result: &mut [T]) {
        assert_eq!(source.len(), 2);
        assert_eq!(target.len(), 2);

        let m_inv_2pi = inv_2pi::<T>();

        let diff0 = target[0] - source[0];
        let diff1 = target[1] - source[1];
        let diff_norm = (diff0 * diff0 + diff1 * diff1).sqrt();

        let (k0, k1) = bessel_pair(diff_norm, self.k);

        match eval_type {
            EvalType::Value => {
                result[0] = k0 * m_inv_2pi;
            }
            EvalType::ValueDeriv => {
                let deriv_factor = self.k * k1 / diff_norm * m_inv_2pi;
                result[0] = k0 * m_inv_2pi;
                result[1] = -diff0 * deriv_factor;
                result[2] = -diff1 * deriv_factor;
            }
        }
    }

    fn evaluate_st(
        &self,
        eval_type: EvalType,
        sources: PointSet<'_, T>,
        targets: PointSet<'_, T>,
        strengths: &LayerStrengths<'_, T>,
        self_interaction: bool,
        result: &mut [T],
    ) {
        check_dimensions_evaluate(
            self,
            eval_type,
            sources,
            targets,
            strengths,
            self_interaction,
            result,
        );
        let range_dim = self.range_component_count(eval_type);

        result
            .chunks_exact_mut(range_dim)
            .enumerate()
            .for_each(|(target_index, my_chunk)| {
                let target = [targets.x()[target_index], targets.y()[target_index]];

                evaluate_modified_helmholtz_one_target(
                    eval_type,
                    target,
                    self_interaction.then_some(target_index),
                    sources,
                    strengths,
                    self.k,
                    my_chunk,
                )
            });
    }

    fn evaluate_mt(
        &self,
        eval_type: EvalType,
        sources: PointSet<'_, T>,
        targets: PointSet<'_, T>,
        strengths: &LayerStrengths<'_, T>,
        self_interaction: bool,
        result: &mut [T],
    ) {
        check_dimensions_evaluate(
            self,
            eval_type,
            sources,
            targets,
            strengths,
            self_interaction,
            result,
        );
        let range_dim = self.range_component_count(eval_type);

        result
            .par_chunks_exact_mut(range_dim)
            .enumerate()
            .for_each(|(target_index, my_chunk)| {
                let target = [targets.x()[target_index], targets.y()[target_index]];

                evaluate_modified_helmholtz_one_target(
                    eval_type,
                    target,
                    self_interaction.then_some(target_index),
                    sources,
                    strengths,
                    self.k,
                    my_chunk,
                )
            });
    }

    fn assemble_st(
        &self,
        sources: PointSet<'_, T>,
        targets: PointSet<'_, T>,
        layers: &MatrixLayers<'_, T>,
        weights: Option<&[T]>,
        self_interaction: bool,
        result: &mut [T],
    ) {
        check_dimensions_assemble(sources, targets, layers, weights, self_interaction, result);

        if layers.is_empty() || sources.is_empty() {
            result.fill(T::zero());
            return;
        }

        let scale = source_scale(sources.len(), weights, inv_2pi::<T>());

        result
            .chunks_exact_mut(sources.len())
            .enumerate()
            .for_each(|(target_index, my_chunk)| {
                let target = [targets.x()[target_index], targets.y()[target_index]];

                assemble_modified_helmholtz_one_target(
                    target,
                    self_interaction.then_some(target_index),
                    sources,
                    layers,
                    &scale,
                    self.k,
                    my_chunk,
                )
            });
    }

    fn assemble_mt(
        &self,
        sources: PointSet<'_, T>,
        targets: PointSet<'_, T>,
        layers: &MatrixLayers<'_, T>,
        weights: Option<&[T]>,
        self_interaction: bool,
        result: &mut [T],
    ) {
        check_dimensions_assemble(sources, targets, layers, weights, self_interaction, result);

        if layers.is_empty() || sources.is_empty() {
            result.fill(T::zero());
            return;
        }

        let scale = source_scale(sources.len(), weights, inv_2pi::<T>());

        result
            .par_chunks_exact_mut(sources.len())
            .enumerate()
            .for_each(|(target_index, my_chunk)| {
                let target = [targets.x()[target_index], targets.y()[target_index]];

                assemble_modified_helmholtz_one_target(
                    target,
                    self_interaction.then_some(target_index),
                    sources,
                    layers,
                    &scale,
                    self.k,
                    my_chunk,
                )
            });
    }
}

/// Evaluate the modified Helmholtz potential with one target.
///
/// The strengths are used as given, no normalization is applied. The source with index
/// `exclude` is skipped. The contributions are added to `result`.
pub fn evaluate_modified_helmholtz_one_target<T: RlstScalar<Real = T>>(
    eval_type: EvalType,
    target: [T; 2],
    exclude: Option<usize>,
    sources: PointSet<'_, T>,
    strengths: &LayerStrengths<'_, T>,
    k: T,
    result: &mut [T],
) {
    let [t0, t1] = target;
    let two = T::one() + T::one();

    let mut value = T::zero();
    let mut deriv0 = T::zero();
    let mut deriv1 = T::zero();

    let with_deriv = matches!(eval_type, EvalType::ValueDeriv);

    for (source_index, (&s0, &s1)) in sources.x().iter().zip(sources.y()).enumerate() {
        if exclude == Some(source_index) {
            continue;
        }

        let diff0 = t0 - s0;
        let diff1 = t1 - s1;
        let diff_norm = (diff0 * diff0 + diff1 * diff1).sqrt();

        let (k0, k1) = bessel_pair(diff_norm, k);
        let deriv_factor = k * k1 / diff_norm;

        if let Some(dipoles) = strengths.dipoles {
            let n0 = dipoles.orientation().x()[source_index];
            let n1 = dipoles.orientation().y()[source_index];
            let dipstr = dipoles.strengths()[source_index];
            let n_dot_d = n0 * diff0 + n1 * diff1;

            value += n_dot_d * deriv_factor * dipstr;

            if with_deriv {
                let second_factor = k * (k * diff_norm * k0 + two * k1)
                    / (diff_norm * diff_norm * diff_norm);
                deriv0 += (n0 * deriv_factor - n_dot_d * diff0 * second_factor) * dipstr;
                deriv1 += (n1 * deriv_factor - n_dot_d * diff1 * second_factor) * dipstr;
            }
        }

        if let Some(charges) = strengths.charge {
            let charge = charges[source_index];

            value += k0 * charge;

            if with_deriv {
                deriv0 -= diff0 * deriv_factor * charge;
                deriv1 -= diff1 * deriv_factor * charge;
            }
        }
    }

    result[0] += value;
    if with_deriv {
        result[1] += deriv0;
        result[2] += deriv1;
    }
}

/// Assemble one row of the modified Helmholtz kernel matrix.
///
/// Entry `j` is `(K0(k r) + (n_j . d) k K1(k r) / r) * scale[j]` with the charge and dipole terms
/// switched by `layers`. The entry `diagonal` is set to zero.
pub fn assemble_modified_helmholtz_one_target<T: RlstScalar<Real = T>>(
    target: [T; 2],
    diagonal: Option<usize>,
    sources: PointSet<'_, T>,
    layers: &MatrixLayers<'_, T>,
    scale: &[T],
    k: T,
    result: &mut [T],
) {
    assert_eq!(result.len(), sources.len());
    assert_eq!(scale.len(), sources.len());

    // The row first holds the distances, then the kernel entries.
    row_distances(target, sources, result);

    let projections = layers.dipvec().map(|dipvec| {
        let mut projections = vec![T::zero(); sources.len()];
        row_projections(target, sources, dipvec, &mut projections);
        projections
    });

    for (source_index, entry) in result.iter_mut().enumerate() {
        let diff_norm = *entry;
        let (k0, k1) = bessel_pair(diff_norm, k);

        let mut green = T::zero();
        if layers.has_charge() {
            green += k0;
        }
        if let Some(projections) = &projections {
            green += projections[source_index] * k * k1 / diff_norm;
        }

        *entry = green * scale[source_index];
    }

    if let Some(diagonal) = diagonal {
        result[diagonal] = T::zero();
    }
}

/// Distances `|target - source_j|` for all sources.
fn row_distances<T: RlstScalar<Real = T>>(target: [T; 2], sources: PointSet<'_, T>, result: &mut [T]) {
    struct Impl<'a, T: RlstScalar<Real = T> + RlstSimd> {
        t0: T,
        t1: T,

        sources_x: &'a [T],
        sources_y: &'a [T],
        result: &'a mut [T],
    }

    impl<T: RlstScalar<Real = T> + RlstSimd> pulp::WithSimd for Impl<'_, T> {
        type Output = ();

        #[inline(always)]
        fn with_simd<S: pulp::Simd>(self, simd: S) -> Self::Output {
            use coe::Coerce;

            let Self {
                t0,
                t1,
                sources_x,
                sources_y,
                result,
            } = self;

            let (sources_x_head, sources_x_tail) = T::as_simd_slice(sources_x);
            let (sources_y_head, sources_y_tail) = T::as_simd_slice(sources_y);
            let (result_head, result_tail) = T::as_simd_slice_mut(result);

            fn impl_slice<T: RlstScalar<Real = T> + RlstSimd, S: pulp::Simd>(
                simd: S,
                t0: T,
                t1: T,
                sources_x: &[T::Scalars<S>],
                sources_y: &[T::Scalars<S>],
                result: &mut [T::Scalars<S>],
            ) {
                let simd = SimdFor::<T, S>::new(simd);

                let t0 = simd.splat(t0);
                let t1 = simd.splat(t1);
                let zero = simd.splat(T::zero());

                for (&s0, &s1, r) in itertools::izip!(sources_x, sources_y, result) {
                    let diff0 = simd.sub(t0, s0);
                    let diff1 = simd.sub(t1, s1);

                    let square_sum = simd.mul_add(diff0, diff0, simd.mul(diff1, diff1));

                    let is_zero = simd.cmp_eq(square_sum, zero);
                    let inv_diff_norm =
                        simd.select(is_zero, zero, simd.approx_recip_sqrt(square_sum));

                    *r = simd.mul(inv_diff_norm, square_sum);
                }
            }

            impl_slice::<T, S>(simd, t0, t1, sources_x_head, sources_y_head, result_head);
            impl_slice::<T, pulp::Scalar>(
                pulp::Scalar::new(),
                t0,
                t1,
                sources_x_tail.coerce(),
                sources_y_tail.coerce(),
                result_tail.coerce(),
            );
        }
    }

    use coe::coerce_static as to;
    use coe::Coerce;
    if coe::is_same::<T, f32>() {
        pulp::Arch::new().dispatch(Impl::<'_, f32> {
            t0: to(target[0]),
            t1: to(target[1]),
            sources_x: sources.x().coerce(),
            sources_y: sources.y().coerce(),
            result: result.coerce(),
        });
    } else if coe::is_same::<T, f64>() {
        pulp::Arch::new().dispatch(Impl::<'_, f64> {
            t0: to(target[0]),
            t1: to(target[1]),
            sources_x: sources.x().coerce(),
            sources_y: sources.y().coerce(),
            result: result.coerce(),
        });
    } else {
        panic!()
    }
}

/// Projections `n_j . (target - source_j)` of the displacements onto the dipole orientations.
fn row_projections<T: RlstScalar<Real = T>>(
    target: [T; 2],
    sources: PointSet<'_, T>,
    dipvec: PointSet<'_, T>,
    result: &mut [T],
) {
    struct Impl<'a, T: RlstScalar<Real = T> + RlstSimd> {
        t0: T,
        t1: T,

        sources_x: &'a [T],
        sources_y: &'a [T],
        dipvec_x: &'a [T],
        dipvec_y: &'a [T],
        result: &'a mut [T],
    }

    impl<T: RlstScalar<Real = T> + RlstSimd> pulp::WithSimd for Impl<'_, T> {
        type Output = ();

        #[inline(always)]
        fn with_simd<S: pulp::Simd>(self, simd: S) -> Self::Output {
            use coe::Coerce;

            let Self {
                t0,
                t1,
                sources_x,
                sources_y,
                dipvec_x,
                dipvec_y,
                result,
            } = self;

            let (sources_x_head, sources_x_tail) = T::as_simd_slice(sources_x);
            let (sources_y_head, sources_y_tail) = T::as_simd_slice(sources_y);
            let (dipvec_x_head, dipvec_x_tail) = T::as_simd_slice(dipvec_x);
            let (dipvec_y_head, dipvec_y_tail) = T::as_simd_slice(dipvec_y);
            let (result_head, result_tail) = T::as_simd_slice_mut(result);

            #[allow(clippy::too_many_arguments)]
            fn impl_slice<T: RlstScalar<Real = T> + RlstSimd, S: pulp::Simd>(
                simd: S,
                t0: T,
                t1: T,
                sources_x: &[T::Scalars<S>],
                sources_y: &[T::Scalars<S>],
                dipvec_x: &[T::Scalars<S>],
                dipvec_y: &[T::Scalars<S>],
                result: &mut [T::Scalars<S>],
            ) {
                let simd = SimdFor::<T, S>::new(simd);

                let t0 = simd.splat(t0);
                let t1 = simd.splat(t1);

                for (&s0, &s1, &n0, &n1, r) in
                    itertools::izip!(sources_x, sources_y, dipvec_x, dipvec_y, result)
                {
                    let diff0 = simd.sub(t0, s0);
                    let diff1 = simd.sub(t1, s1);

                    *r = simd.mul_add(n0, diff0, simd.mul(n1, diff1));
                }
            }

            impl_slice::<T, S>(
                simd,
                t0,
                t1,
                sources_x_head,
                sources_y_head,
                dipvec_x_head,
                dipvec_y_head,
                result_head,
            );
            impl_slice::<T, pulp::Scalar>(
                pulp::Scalar::new(),
                t0,
                t1,
                sources_x_tail.coerce(),
                sources_y_tail.coerce(),
                dipvec_x_tail.coerce(),
                dipvec_y_tail.coerce(),
                result_tail.coerce(),
            );
        }
    }

    use coe::coerce_static as to;
    use coe::Coerce;
    if coe::is_same::<T, f32>() {
        pulp::Arch::new().dispatch(Impl::<'_, f32> {
            t0: to(target[0]),
            t1: to(target[1]),
            sources_x: sources.x().coerce(),
            sources_y: sources.y().coerce(),
            dipvec_x: dipvec.x().coerce(),
            dipvec_y: dipvec.y().coerce(),
            result: result.coerce(),
        });
    } else if coe::is_same::<T, f64>() {
        pulp::Arch::new().dispatch(Impl::<'_, f64> {
            t0: to(target[0]),
            t1: to(target[1]),
            sources_x: sources.x().coerce(),
            sources_y: sources.y().coerce(),
            dipvec_x: dipvec.x().coerce(),
            dipvec_y: dipvec.y().coerce(),
            result: result.coerce(),
        });
    } else {
        panic!()
    }
}

fn modified_helmholtz_component_count(eval_type: EvalType) -> usize {
    match eval_type {
        EvalType::Value => 1,
        EvalType::ValueDeriv => 3,
    }
}
