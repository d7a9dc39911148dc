//! Kernel application and kernel matrix formation
//!
//! [apply_kernel] evaluates the potential of charge and dipole layers through a selectable
//! [Backend]. [form_kernel_matrix] assembles the dense interaction matrix instead.
use rlst::RlstScalar;

use crate::error::{KernelError, Result};
use crate::far_field::evaluate_far_field;
use crate::helpers::{check_strengths, inv_2pi, scale_strengths, source_scale};
use crate::traits::{FarFieldEvaluator, Kernel};
use crate::types::{BackendType, Dipoles, EvalType, LayerStrengths, MatrixLayers, PointSet};

/// Backend used by [apply_kernel].
///
/// The two backends differ in normalization. The direct backend scales the strengths by
/// `weights / (2π)` itself. The fast backend hands the strengths multiplied by the raw weights to
/// the far-field evaluator, whose Green's function already carries the `1 / (2π)` factor.
#[derive(Clone, Copy)]
pub enum Backend<'a, T: RlstScalar<Real = T>> {
    /// Direct pairwise summation.
    Direct,
    /// Fast far-field evaluator.
    Fast(&'a dyn FarFieldEvaluator<T>),
}

impl<'a, T: RlstScalar<Real = T>> Backend<'a, T> {
    /// Create a backend from its type.
    ///
    /// The fast backend requires an evaluator.
    pub fn from_type(
        backend_type: BackendType,
        evaluator: Option<&'a dyn FarFieldEvaluator<T>>,
    ) -> Result<Self> {
        match backend_type {
            BackendType::Direct => Ok(Backend::Direct),
            BackendType::Fast => evaluator
                .map(Backend::Fast)
                .ok_or(KernelError::MissingFarFieldEvaluator),
        }
    }

    /// Create a backend from its name, e.g. `"direct"` or `"fmm"`.
    pub fn from_name(name: &str, evaluator: Option<&'a dyn FarFieldEvaluator<T>>) -> Result<Self> {
        Self::from_type(name.parse()?, evaluator)
    }

    /// The type of the backend.
    pub fn backend_type(&self) -> BackendType {
        match self {
            Backend::Direct => BackendType::Direct,
            Backend::Fast(_) => BackendType::Fast,
        }
    }
}

/// Evaluate the potential of charge and dipole layers at the targets.
///
/// - `weights`: Quadrature weights per source, unit weights if `None`.
/// - `self_interaction`: Sources and targets are the same point set. The pairs `i == j` are
///   excluded. Distinct sets with coincident points are not detected and give non-finite values.
///
/// Returns one value per target for [EvalType::Value] and `[u, du/dx, du/dy]` per target for
/// [EvalType::ValueDeriv].
#[allow(clippy::too_many_arguments)]
pub fn apply_kernel<K: Kernel + ?Sized>(
    kernel: &K,
    backend: Backend<'_, K::T>,
    eval_type: EvalType,
    sources: PointSet<'_, K::T>,
    targets: PointSet<'_, K::T>,
    strengths: &LayerStrengths<'_, K::T>,
    weights: Option<&[K::T]>,
    self_interaction: bool,
) -> Result<Vec<K::T>> {
    log::debug!(
        "apply kernel: backend {}, {} sources, {} targets, {:?}, self interaction: {}",
        backend.backend_type(),
        sources.len(),
        targets.len(),
        eval_type,
        self_interaction
    );

    check_strengths(sources, strengths);

    let mut result =
        vec![<K::T as num::Zero>::zero(); kernel.range_component_count(eval_type) * targets.len()];

    match backend {
        Backend::Direct => {
            apply_direct(
                kernel,
                eval_type,
                sources,
                targets,
                strengths,
                weights,
                self_interaction,
                true,
                &mut result,
            );
        }
        Backend::Fast(evaluator) => {
            log::trace!("passing raw weights to the far-field evaluator");
            evaluate_far_field(
                evaluator,
                eval_type,
                kernel.decay_parameter(),
                sources,
                targets,
                strengths,
                weights,
                self_interaction,
                &mut result,
            )?;
        }
    }

    Ok(result)
}

/// Direct summation with the strengths scaled by `weights / (2π)`.
///
/// The contributions are added to `result`. See [apply_kernel] for the arguments.
#[allow(clippy::too_many_arguments)]
pub fn apply_direct<K: Kernel + ?Sized>(
    kernel: &K,
    eval_type: EvalType,
    sources: PointSet<'_, K::T>,
    targets: PointSet<'_, K::T>,
    strengths: &LayerStrengths<'_, K::T>,
    weights: Option<&[K::T]>,
    self_interaction: bool,
    multithreaded: bool,
    result: &mut [K::T],
) {
    log::trace!(
        "scaling strengths by {} / (2 pi)",
        if weights.is_some() { "weights" } else { "unit weights" }
    );
    let scale = source_scale(sources.len(), weights, inv_2pi::<K::T>());

    let charge = strengths
        .charge
        .map(|charge| scale_strengths(charge, &scale));
    let dipstr = strengths
        .dipoles
        .map(|dipoles| scale_strengths(dipoles.strengths(), &scale));

    let scaled = LayerStrengths {
        charge: charge.as_deref(),
        dipoles: dipstr
            .as_deref()
            .zip(strengths.dipoles)
            .map(|(dipstr, dipoles)| Dipoles::new(dipstr, dipoles.orientation())),
    };

    if multithreaded {
        kernel.evaluate_mt(eval_type, sources, targets, &scaled, self_interaction, result);
    } else {
        kernel.evaluate_st(eval_type, sources, targets, &scaled, self_interaction, result);
    }
}

/// Form the dense kernel matrix.
///
/// The result has `targets.len() * sources.len()` entries, all entries for one target being
/// consecutive. Entry `(i, j)` is `K0(k r_ij) + (n_j . d_ij) k K1(k r_ij) / r_ij` with the two
/// terms switched by `layers`, scaled by `weights_j / (2π)`. With `self_interaction` the
/// diagonal is exactly zero. Without any layer the matrix is zero.
pub fn form_kernel_matrix<K: Kernel + ?Sized>(
    kernel: &K,
    sources: PointSet<'_, K::T>,
    targets: PointSet<'_, K::T>,
    layers: &MatrixLayers<'_, K::T>,
    weights: Option<&[K::T]>,
    self_interaction: bool,
) -> Vec<K::T> {
    log::debug!(
        "form kernel matrix: {} x {}, charge: {}, dipole: {}, self interaction: {}",
        targets.len(),
        sources.len(),
        layers.has_charge(),
        layers.has_dipole(),
        self_interaction
    );

    let mut result = vec![<K::T as num::Zero>::zero(); targets.len() * sources.len()];
    kernel.assemble_mt(
        sources,
        targets,
        layers,
        weights,
        self_interaction,
        &mut result,
    );
    result
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::far_field::DirectFarFieldEvaluator;
    use crate::modified_helmholtz_2d::ModifiedHelmholtz2dKernel;
    use approx::assert_relative_eq;
    use rand::prelude::*;
    use rlst::{rlst_dynamic_array1, RawAccess};

    const K0_AT_ONE: f64 = 0.42102443824070834;
    const K1_AT_ONE: f64 = 0.6019072301972346;

    fn random_vec(len: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut values = rlst_dynamic_array1!(f64, [len]);
        values.fill_from_equally_distributed(&mut rng);
        values.data().to_vec()
    }

    #[test]
    fn test_form_without_layers_is_zero() {
        let sources_x = random_vec(5, 0);
        let sources_y = random_vec(5, 1);
        let targets_x = random_vec(3, 2);
        let targets_y = random_vec(3, 3);

        let kernel = ModifiedHelmholtz2dKernel::<f64>::new(1.5);
        let matrix = form_kernel_matrix(
            &kernel,
            PointSet::new(&sources_x, &sources_y),
            PointSet::new(&targets_x, &targets_y),
            &MatrixLayers::none(),
            None,
            false,
        );

        assert_eq!(matrix.len(), 15);
        assert!(matrix.iter().all(|&value| value == 0.0));
    }

    #[test]
    fn test_two_point_charges() {
        let x = [0.0, 1.0];
        let y = [0.0, 0.0];
        let charge = [1.0, 1.0];
        let points = PointSet::new(&x, &y);

        let kernel = ModifiedHelmholtz2dKernel::<f64>::new(1.0);
        let pot = apply_kernel(
            &kernel,
            Backend::Direct,
            EvalType::Value,
            points,
            points,
            &LayerStrengths::charge(&charge),
            None,
            true,
        )
        .unwrap();

        let expected = K0_AT_ONE / (2.0 * std::f64::consts::PI);
        assert_eq!(pot.len(), 2);
        assert_relative_eq!(pot[0], expected, max_relative = 1E-13);
        assert_relative_eq!(pot[1], expected, max_relative = 1E-13);
    }

    #[test]
    fn test_single_dipole() {
        let sources_x = [0.0];
        let sources_y = [0.0];
        let targets_x = [2.0];
        let targets_y = [0.0];
        let dipstr = [1.0];
        let normals_x = [1.0];
        let normals_y = [0.0];

        let kernel = ModifiedHelmholtz2dKernel::<f64>::new(0.5);
        let dipoles = Dipoles::new(&dipstr, PointSet::new(&normals_x, &normals_y));
        let pot = apply_kernel(
            &kernel,
            Backend::Direct,
            EvalType::Value,
            PointSet::new(&sources_x, &sources_y),
            PointSet::new(&targets_x, &targets_y),
            &LayerStrengths::dipole(dipoles),
            None,
            false,
        )
        .unwrap();

        // dx * k K1(k r) / r with dx = r = 2 and k = 0.5.
        let expected = 2.0 * 0.5 * K1_AT_ONE / 2.0 / (2.0 * std::f64::consts::PI);
        assert_relative_eq!(pot[0], expected, max_relative = 1E-13);
    }

    #[test]
    fn test_superposition() {
        let nsources = 17;
        let ntargets = 9;

        let sources_x = random_vec(nsources, 0);
        let sources_y = random_vec(nsources, 1);
        let targets_x: Vec<f64> = random_vec(ntargets, 2).iter().map(|x| x + 1.5).collect();
        let targets_y = random_vec(ntargets, 3);
        let charge = random_vec(nsources, 4);
        let dipstr = random_vec(nsources, 5);
        let normals_x = random_vec(nsources, 6);
        let normals_y = random_vec(nsources, 7);
        let weights = random_vec(nsources, 8);

        let sources = PointSet::new(&sources_x, &sources_y);
        let targets = PointSet::new(&targets_x, &targets_y);
        let dipoles = Dipoles::new(&dipstr, PointSet::new(&normals_x, &normals_y));

        let kernel = ModifiedHelmholtz2dKernel::<f64>::new(2.0);

        for eval_type in [EvalType::Value, EvalType::ValueDeriv] {
            let apply = |strengths: LayerStrengths<'_, f64>| {
                apply_kernel(
                    &kernel,
                    Backend::Direct,
                    eval_type,
                    sources,
                    targets,
                    &strengths,
                    Some(&weights),
                    false,
                )
                .unwrap()
            };

            let both = apply(LayerStrengths::charge_and_dipole(&charge, dipoles));
            let charge_only = apply(LayerStrengths::charge(&charge));
            let dipole_only = apply(LayerStrengths::dipole(dipoles));

            for (&b, &c, &d) in itertools::izip!(both.iter(), charge_only.iter(), dipole_only.iter())
            {
                assert_relative_eq!(b, c + d, epsilon = 1E-13, max_relative = 1E-12);
            }
        }
    }

    #[test]
    fn test_self_interaction_in_form() {
        let npoints = 12;
        let x = random_vec(npoints, 10);
        let y = random_vec(npoints, 11);
        let normals_x = random_vec(npoints, 12);
        let normals_y = random_vec(npoints, 13);
        let points = PointSet::new(&x, &y);
        let normals = PointSet::new(&normals_x, &normals_y);

        let kernel = ModifiedHelmholtz2dKernel::<f64>::new(1.0);

        for layers in [
            MatrixLayers::none(),
            MatrixLayers::charge(),
            MatrixLayers::dipole(normals),
            MatrixLayers::charge_and_dipole(normals),
        ] {
            let matrix = form_kernel_matrix(&kernel, points, points, &layers, None, true);
            for (index, row) in matrix.chunks_exact(npoints).enumerate() {
                assert_eq!(row[index], 0.0);
                assert!(row.iter().all(|value| value.is_finite()));
            }
        }
    }

    #[test]
    fn test_equal_but_distinct_point_sets() {
        let x = [0.0, 1.0];
        let y = [0.0, 0.0];
        let x_copy = x;
        let y_copy = y;
        let charge = [1.0, 1.0];

        let sources = PointSet::new(&x, &y);
        let targets = PointSet::new(&x_copy, &y_copy);
        let kernel = ModifiedHelmholtz2dKernel::<f64>::new(1.0);

        let pot = apply_kernel(
            &kernel,
            Backend::Direct,
            EvalType::Value,
            sources,
            targets,
            &LayerStrengths::charge(&charge),
            None,
            false,
        )
        .unwrap();
        assert!(pot.iter().all(|value| !value.is_finite()));

        let matrix = form_kernel_matrix(
            &kernel,
            sources,
            targets,
            &MatrixLayers::charge(),
            None,
            false,
        );
        assert!(!matrix[0].is_finite());
        assert!(!matrix[3].is_finite());
        assert!(matrix[1].is_finite());
    }

    #[test]
    fn test_form_matches_apply() {
        let nsources = 23;
        let ntargets = 14;

        let sources_x = random_vec(nsources, 20);
        let sources_y = random_vec(nsources, 21);
        let targets_x = random_vec(ntargets, 22);
        let targets_y: Vec<f64> = random_vec(ntargets, 23).iter().map(|y| y + 2.0).collect();
        let charge = random_vec(nsources, 24);
        let normals_x = random_vec(nsources, 25);
        let normals_y = random_vec(nsources, 26);
        let weights = random_vec(nsources, 27);

        let sources = PointSet::new(&sources_x, &sources_y);
        let targets = PointSet::new(&targets_x, &targets_y);
        let normals = PointSet::new(&normals_x, &normals_y);

        let kernel = ModifiedHelmholtz2dKernel::<f64>::new(0.8);

        // The same strengths drive the charge and the dipole layer.
        let dipoles = Dipoles::new(&charge, normals);

        for (layers, strengths) in [
            (MatrixLayers::charge(), LayerStrengths::charge(&charge)),
            (MatrixLayers::dipole(normals), LayerStrengths::dipole(dipoles)),
            (
                MatrixLayers::charge_and_dipole(normals),
                LayerStrengths::charge_and_dipole(&charge, dipoles),
            ),
        ] {
            let matrix =
                form_kernel_matrix(&kernel, sources, targets, &layers, Some(&weights), false);
            let pot = apply_kernel(
                &kernel,
                Backend::Direct,
                EvalType::Value,
                sources,
                targets,
                &strengths,
                Some(&weights),
                false,
            )
            .unwrap();

            for (row, &expected) in matrix.chunks_exact(nsources).zip(pot.iter()) {
                let actual: f64 = row.iter().zip(charge.iter()).map(|(m, c)| m * c).sum();
                assert_relative_eq!(actual, expected, epsilon = 1E-12, max_relative = 1E-10);
            }
        }
    }

    #[test]
    fn test_fast_backend_matches_direct() {
        let npoints = 31;

        let x = random_vec(npoints, 30);
        let y = random_vec(npoints, 31);
        let targets_x: Vec<f64> = random_vec(7, 32).iter().map(|x| x - 2.0).collect();
        let targets_y = random_vec(7, 33);
        let charge = random_vec(npoints, 34);
        let dipstr = random_vec(npoints, 35);
        let normals_x = random_vec(npoints, 36);
        let normals_y = random_vec(npoints, 37);
        let weights = random_vec(npoints, 38);

        let points = PointSet::new(&x, &y);
        let targets = PointSet::new(&targets_x, &targets_y);
        let dipoles = Dipoles::new(&dipstr, PointSet::new(&normals_x, &normals_y));
        let strengths = LayerStrengths::charge_and_dipole(&charge, dipoles);

        let kernel = ModifiedHelmholtz2dKernel::<f64>::new(1.3);
        let evaluator = DirectFarFieldEvaluator::default();
        let fast = Backend::<f64>::from_name("fmm", Some(&evaluator)).unwrap();
        assert_eq!(fast.backend_type(), BackendType::Fast);

        for eval_type in [EvalType::Value, EvalType::ValueDeriv] {
            for (targets, self_interaction) in [(points, true), (targets, false)] {
                let run = |backend| {
                    apply_kernel(
                        &kernel,
                        backend,
                        eval_type,
                        points,
                        targets,
                        &strengths,
                        Some(&weights),
                        self_interaction,
                    )
                    .unwrap()
                };

                let direct = run(Backend::Direct);
                let accelerated = run(fast);

                assert_eq!(direct.len(), accelerated.len());
                for (&d, &a) in direct.iter().zip(accelerated.iter()) {
                    assert_relative_eq!(d, a, epsilon = 1E-13, max_relative = 1E-12);
                }
            }
        }
    }

    #[test]
    fn test_backend_selection() {
        let evaluator = DirectFarFieldEvaluator::default();

        let backend = Backend::<f64>::from_name("Direct", None).unwrap();
        assert_eq!(backend.backend_type(), BackendType::Direct);

        let backend = Backend::<f64>::from_name("numba", Some(&evaluator)).unwrap();
        assert_eq!(backend.backend_type(), BackendType::Direct);

        assert!(matches!(
            Backend::<f64>::from_name("fast", None),
            Err(KernelError::MissingFarFieldEvaluator)
        ));

        match Backend::<f64>::from_name("treecode", Some(&evaluator)) {
            Err(KernelError::UnknownBackend { name, valid }) => {
                assert_eq!(name, "treecode");
                assert!(valid.contains("direct"));
                assert!(valid.contains("fmm"));
            }
            _ => panic!("expected an unknown backend error"),
        }
    }
}
