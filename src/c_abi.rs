//! C Interface
//!
//! Point sets are passed as `[x_1, ..., x_N, y_1, ..., y_N]`. Optional arrays may be null.

use coe;
use rlst::RlstScalar;
use std::{ffi::c_void, mem::ManuallyDrop};

use crate::apply::apply_direct;
use crate::modified_helmholtz_2d::ModifiedHelmholtz2dKernel;
use crate::traits::Kernel;
use crate::types::{Dipoles, EvalType, LayerStrengths, MatrixLayers, PointSet};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub enum BieKernelCType {
    F32,
    F64,
}

pub struct BieKernelEvaluator {
    ctype: BieKernelCType,
    kernel_p: *mut c_void,
}

impl BieKernelEvaluator {
    pub fn get_ctype(&self) -> BieKernelCType {
        self.ctype
    }
}

impl Drop for BieKernelEvaluator {
    fn drop(&mut self) {
        let Self { ctype, kernel_p } = self;
        match ctype {
            BieKernelCType::F32 => {
                drop(unsafe { Box::from_raw(*kernel_p as *mut Box<dyn Kernel<T = f32>>) });
            }
            BieKernelCType::F64 => {
                drop(unsafe { Box::from_raw(*kernel_p as *mut Box<dyn Kernel<T = f64>>) });
            }
        }
    }
}

fn bie_kernel_inner<T: RlstScalar<Real = T>>(
    kernel_p: *mut BieKernelEvaluator,
) -> ManuallyDrop<Box<Box<dyn Kernel<T = T>>>> {
    assert!(!kernel_p.is_null());
    bie_kernel_assert_type::<T>(kernel_p);
    let kernel_p = unsafe { (*kernel_p).kernel_p };
    ManuallyDrop::new(unsafe { Box::from_raw(kernel_p as *mut Box<dyn Kernel<T = T>>) })
}

fn bie_kernel_assert_type<T: RlstScalar>(kernel_p: *mut BieKernelEvaluator) {
    assert!(!kernel_p.is_null());
    let ctype = unsafe { bie_kernel_get_ctype(kernel_p) };
    match ctype {
        BieKernelCType::F32 => coe::assert_same::<f32, T>(),
        BieKernelCType::F64 => coe::assert_same::<f64, T>(),
    }
}

/// View a nullable pointer as a slice.
///
/// # Safety
/// A non-null pointer must point to `len` values of type `T`.
unsafe fn optional_slice<'a, T>(data: *const c_void, len: usize) -> Option<&'a [T]> {
    if data.is_null() {
        None
    } else {
        Some(std::slice::from_raw_parts(data as *const T, len))
    }
}

/// Source layers from the nullable strength arrays of the C interface.
fn layer_strengths<'a, T>(
    charges: Option<&'a [T]>,
    dipstr: Option<&'a [T]>,
    dipvec: Option<PointSet<'a, T>>,
) -> LayerStrengths<'a, T> {
    assert!(
        dipstr.is_none() || dipvec.is_some(),
        "dipole strengths require dipole orientations"
    );

    LayerStrengths {
        charge: charges,
        dipoles: dipstr
            .zip(dipvec)
            .map(|(dipstr, dipvec)| Dipoles::new(dipstr, dipvec)),
    }
}

/// Return the type of the kernel.
///
/// # Safety
/// Pointer must be valid.
#[no_mangle]
pub unsafe extern "C" fn bie_kernel_get_ctype(kernel_p: *mut BieKernelEvaluator) -> BieKernelCType {
    assert!(!kernel_p.is_null());
    (*kernel_p).get_ctype()
}

/// Free the kernel.
///
/// # Safety
/// Pointer must be valid.
#[no_mangle]
pub unsafe extern "C" fn bie_kernel_free(kernel_p: *mut BieKernelEvaluator) {
    assert!(!kernel_p.is_null());
    drop(Box::from_raw(kernel_p))
}

/// Create a new 2D modified Helmholtz kernel with decay parameter `k`.
#[no_mangle]
pub extern "C" fn bie_kernel_modified_helmholtz_2d_alloc(
    ctype: BieKernelCType,
    k: f64,
) -> *mut BieKernelEvaluator {
    let kernel_p = match ctype {
        BieKernelCType::F32 => Box::into_raw(Box::new(Box::new(
            ModifiedHelmholtz2dKernel::<f32>::new(k as f32),
        ) as Box<dyn Kernel<T = f32>>)) as *mut c_void,
        BieKernelCType::F64 => Box::into_raw(Box::new(
            Box::new(ModifiedHelmholtz2dKernel::<f64>::new(k)) as Box<dyn Kernel<T = f64>>,
        )) as *mut c_void,
    };
    Box::into_raw(Box::new(BieKernelEvaluator { ctype, kernel_p }))
}

/// Return the range component count.
///
/// # Safety
/// Pointer must be valid.
#[no_mangle]
pub unsafe extern "C" fn bie_kernel_range_component_count(
    kernel_p: *mut BieKernelEvaluator,
    eval_type: EvalType,
) -> u32 {
    assert!(!kernel_p.is_null());
    match bie_kernel_get_ctype(kernel_p) {
        BieKernelCType::F32 => {
            bie_kernel_inner::<f32>(kernel_p).range_component_count(eval_type) as u32
        }
        BieKernelCType::F64 => {
            bie_kernel_inner::<f64>(kernel_p).range_component_count(eval_type) as u32
        }
    }
}

/// Return the space dimension.
///
/// # Safety
/// Pointer must be valid.
#[no_mangle]
pub unsafe extern "C" fn bie_kernel_space_dimension(kernel_p: *mut BieKernelEvaluator) -> u32 {
    assert!(!kernel_p.is_null());
    match bie_kernel_get_ctype(kernel_p) {
        BieKernelCType::F32 => bie_kernel_inner::<f32>(kernel_p).space_dimension() as u32,
        BieKernelCType::F64 => bie_kernel_inner::<f64>(kernel_p).space_dimension() as u32,
    }
}

/// Evaluate the Greens function for a single source/target pair.
///
/// # Safety
/// Pointers must be valid.
#[no_mangle]
pub unsafe extern "C" fn bie_kernel_greens_fct(
    kernel_p: *mut BieKernelEvaluator,
    eval_type: EvalType,
    source: *const c_void,
    target: *const c_void,
    result: *mut c_void,
) {
    fn impl_greens_fct<T: RlstScalar<Real = T>>(
        kernel_p: *mut BieKernelEvaluator,
        eval_type: EvalType,
        source: *const c_void,
        target: *const c_void,
        result: *mut c_void,
    ) {
        let kernel = bie_kernel_inner::<T>(kernel_p);
        let dim = kernel.space_dimension();
        let range_count = kernel.range_component_count(eval_type);
        let source = unsafe { std::slice::from_raw_parts(source as *const T, dim) };
        let target = unsafe { std::slice::from_raw_parts(target as *const T, dim) };
        let result = unsafe { std::slice::from_raw_parts_mut(result as *mut T, range_count) };
        kernel.greens_fct(eval_type, source, target, result);
    }

    assert!(!kernel_p.is_null());

    match bie_kernel_get_ctype(kernel_p) {
        BieKernelCType::F32 => {
            impl_greens_fct::<f32>(kernel_p, eval_type, source, target, result);
        }
        BieKernelCType::F64 => {
            impl_greens_fct::<f64>(kernel_p, eval_type, source, target, result);
        }
    }
}

/// Evaluate the potential of charge and dipole layers by direct summation.
///
/// `charges`, `dipstr` and `weights` hold one value per source, `dipvec` the dipole orientations
/// in the point layout. `dipstr` requires `dipvec`. The strengths are scaled by
/// `weights / (2π)`, with unit weights if `weights` is null. With `self_interaction` the sources
/// are the targets and `targets` is ignored. The values are added to `result`.
///
/// # Safety
/// Pointers must be valid.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn bie_kernel_apply_direct(
    kernel_p: *mut BieKernelEvaluator,
    eval_type: EvalType,
    nsources: usize,
    ntargets: usize,
    sources: *const c_void,
    targets: *const c_void,
    charges: *const c_void,
    dipstr: *const c_void,
    dipvec: *const c_void,
    weights: *const c_void,
    self_interaction: bool,
    result: *mut c_void,
    multithreaded: bool,
) {
    #[allow(clippy::too_many_arguments)]
    fn impl_apply<T: RlstScalar<Real = T>>(
        kernel_p: *mut BieKernelEvaluator,
        eval_type: EvalType,
        nsources: usize,
        ntargets: usize,
        sources: *const c_void,
        targets: *const c_void,
        charges: *const c_void,
        dipstr: *const c_void,
        dipvec: *const c_void,
        weights: *const c_void,
        self_interaction: bool,
        result: *mut c_void,
        multithreaded: bool,
    ) {
        let kernel = bie_kernel_inner::<T>(kernel_p);
        let range_count = kernel.range_component_count(eval_type);
        let dim = kernel.space_dimension();

        let sources = PointSet::from_components(unsafe {
            std::slice::from_raw_parts(sources as *const T, nsources * dim)
        });
        let targets = if self_interaction {
            sources
        } else {
            PointSet::from_components(unsafe {
                std::slice::from_raw_parts(targets as *const T, ntargets * dim)
            })
        };

        let charges = unsafe { optional_slice::<T>(charges, nsources) };
        let dipstr = unsafe { optional_slice::<T>(dipstr, nsources) };
        let dipvec =
            unsafe { optional_slice::<T>(dipvec, nsources * dim) }.map(PointSet::from_components);
        let weights = unsafe { optional_slice::<T>(weights, nsources) };

        let strengths = layer_strengths(charges, dipstr, dipvec);

        let result = unsafe {
            std::slice::from_raw_parts_mut(result as *mut T, targets.len() * range_count)
        };

        apply_direct(
            &***kernel,
            eval_type,
            sources,
            targets,
            &strengths,
            weights,
            self_interaction,
            multithreaded,
            result,
        );
    }

    assert!(!kernel_p.is_null());

    match bie_kernel_get_ctype(kernel_p) {
        BieKernelCType::F32 => {
            impl_apply::<f32>(
                kernel_p,
                eval_type,
                nsources,
                ntargets,
                sources,
                targets,
                charges,
                dipstr,
                dipvec,
                weights,
                self_interaction,
                result,
                multithreaded,
            );
        }
        BieKernelCType::F64 => {
            impl_apply::<f64>(
                kernel_p,
                eval_type,
                nsources,
                ntargets,
                sources,
                targets,
                charges,
                dipstr,
                dipvec,
                weights,
                self_interaction,
                result,
                multithreaded,
            );
        }
    }
}

/// Form the kernel matrix.
///
/// `result` receives `ntargets * nsources` values, all entries for one target being consecutive.
/// A non-null `dipvec` includes the dipole contribution. With `self_interaction` the sources are
/// the targets, `targets` is ignored and the diagonal is zero.
///
/// # Safety
/// Pointers must be valid.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn bie_kernel_form(
    kernel_p: *mut BieKernelEvaluator,
    nsources: usize,
    ntargets: usize,
    sources: *const c_void,
    targets: *const c_void,
    charge: bool,
    dipvec: *const c_void,
    weights: *const c_void,
    self_interaction: bool,
    result: *mut c_void,
    multithreaded: bool,
) {
    #[allow(clippy::too_many_arguments)]
    fn impl_form<T: RlstScalar<Real = T>>(
        kernel_p: *mut BieKernelEvaluator,
        nsources: usize,
        ntargets: usize,
        sources: *const c_void,
        targets: *const c_void,
        charge: bool,
        dipvec: *const c_void,
        weights: *const c_void,
        self_interaction: bool,
        result: *mut c_void,
        multithreaded: bool,
    ) {
        let kernel = bie_kernel_inner::<T>(kernel_p);
        let dim = kernel.space_dimension();

        let sources = PointSet::from_components(unsafe {
            std::slice::from_raw_parts(sources as *const T, nsources * dim)
        });
        let targets = if self_interaction {
            sources
        } else {
            PointSet::from_components(unsafe {
                std::slice::from_raw_parts(targets as *const T, ntargets * dim)
            })
        };

        let dipvec =
            unsafe { optional_slice::<T>(dipvec, nsources * dim) }.map(PointSet::from_components);
        let weights = unsafe { optional_slice::<T>(weights, nsources) };
        let layers = MatrixLayers::new(charge, dipvec.is_some(), dipvec);

        let result = unsafe {
            std::slice::from_raw_parts_mut(result as *mut T, targets.len() * sources.len())
        };

        if multithreaded {
            kernel.assemble_mt(sources, targets, &layers, weights, self_interaction, result);
        } else {
            kernel.assemble_st(sources, targets, &layers, weights, self_interaction, result);
        }
    }

    assert!(!kernel_p.is_null());

    match bie_kernel_get_ctype(kernel_p) {
        BieKernelCType::F32 => {
            impl_form::<f32>(
                kernel_p,
                nsources,
                ntargets,
                sources,
                targets,
                charge,
                dipvec,
                weights,
                self_interaction,
                result,
                multithreaded,
            );
        }
        BieKernelCType::F64 => {
            impl_form::<f64>(
                kernel_p,
                nsources,
                ntargets,
                sources,
                targets,
                charge,
                dipvec,
                weights,
                self_interaction,
                result,
                multithreaded,
            );
        }
    }
}
