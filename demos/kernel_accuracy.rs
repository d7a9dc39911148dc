//! Test the accuracy of the assembled kernel and of the accelerated backend

const NSAMPLES: usize = 100;
use num::traits::FloatConst;
use rand::prelude::*;
use rlst::prelude::*;

use bie_kernels::{
    apply::{apply_kernel, Backend},
    bessel,
    far_field::DirectFarFieldEvaluator,
    modified_helmholtz_2d::ModifiedHelmholtz2dKernel,
    traits::Kernel,
    types::{EvalType, LayerStrengths, MatrixLayers, PointSet},
};

fn benchmark_kernel_modified_helmholtz<T: RlstScalar<Real = T>, K: Kernel<T = T>>(
    kernel: &K,
    sources: &[T],
    targets: &[T],
) -> f64 {
    let sources = PointSet::from_components(sources);
    let targets = PointSet::from_components(targets);

    let mut result = vec![T::zero(); NSAMPLES * NSAMPLES];

    kernel.assemble_mt(
        sources,
        targets,
        &MatrixLayers::charge(),
        None,
        false,
        &mut result,
    );

    let k = num::cast::<T, f64>(kernel.decay_parameter()).unwrap();
    let mut rel_error = 0.0f64;

    for (target_index, row) in result.chunks_exact(NSAMPLES).enumerate() {
        for (source_index, &green) in row.iter().enumerate() {
            let diff0 = num::cast::<T, f64>(targets.x()[target_index] - sources.x()[source_index])
                .unwrap();
            let diff1 = num::cast::<T, f64>(targets.y()[target_index] - sources.y()[source_index])
                .unwrap();
            let diff_norm = (diff0 * diff0 + diff1 * diff1).sqrt();

            let green = num::cast::<T, f64>(green).unwrap();
            let green_exact = bessel::k0(k * diff_norm) * 0.5 * f64::FRAC_1_PI();

            rel_error =
                rel_error.max((green - green_exact).abs() / green.abs().max(green_exact.abs()));
        }
    }

    rel_error
}

fn benchmark_fast_backend(
    kernel: &ModifiedHelmholtz2dKernel<f64>,
    points: &[f64],
    charges: &[f64],
) -> f64 {
    let points = PointSet::from_components(points);
    let strengths = LayerStrengths::charge(charges);
    let evaluator = DirectFarFieldEvaluator::default();

    let run = |backend| {
        apply_kernel(
            kernel,
            backend,
            EvalType::Value,
            points,
            points,
            &strengths,
            None,
            true,
        )
        .unwrap()
    };

    let direct = run(Backend::<f64>::Direct);
    let fast = run(Backend::<f64>::Fast(&evaluator));

    direct
        .iter()
        .zip(fast.iter())
        .map(|(d, f)| (d - f).abs() / d.abs().max(f.abs()))
        .fold(0.0, f64::max)
}

fn main() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    let mut sources_f32 = rlst_dynamic_array1!(f32, [2 * NSAMPLES]);
    let mut targets_f32 = rlst_dynamic_array1!(f32, [2 * NSAMPLES]);
    let mut sources_f64 = rlst_dynamic_array1!(f64, [2 * NSAMPLES]);
    let mut targets_f64 = rlst_dynamic_array1!(f64, [2 * NSAMPLES]);
    let mut charges = rlst_dynamic_array1!(f64, [NSAMPLES]);

    sources_f32.fill_from_equally_distributed(&mut rng);
    targets_f32.fill_from_equally_distributed(&mut rng);
    sources_f64.fill_from_equally_distributed(&mut rng);
    targets_f64.fill_from_equally_distributed(&mut rng);
    charges.fill_from_standard_normal(&mut rng);

    let modified_helmholtz_f32 = benchmark_kernel_modified_helmholtz(
        &ModifiedHelmholtz2dKernel::<f32>::new(1.5),
        sources_f32.data(),
        targets_f32.data(),
    );
    let modified_helmholtz_f64 = benchmark_kernel_modified_helmholtz(
        &ModifiedHelmholtz2dKernel::<f64>::new(1.5),
        sources_f64.data(),
        targets_f64.data(),
    );

    let fast_backend = benchmark_fast_backend(
        &ModifiedHelmholtz2dKernel::<f64>::new(1.5),
        sources_f64.data(),
        charges.data(),
    );

    println!(
        "Modified Helmholtz maximum relative error: {:.2E}",
        modified_helmholtz_f32
    );
    println!(
        "Modified Helmholtz maximum relative error: {:.2E}",
        modified_helmholtz_f64
    );
    println!(
        "Fast backend maximum relative deviation from direct summation: {:.2E}",
        fast_backend
    );
}
