//! Type definitions
use std::fmt;
use std::str::FromStr;

use crate::error::KernelError;

/// Evaluation Mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(C)]
pub enum EvalType {
    /// Only values required
    Value,
    /// Both values and derivatives required
    ValueDeriv,
}

/// Identifier of a kernel-apply backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackendType {
    /// Direct pairwise summation.
    #[default]
    Direct,
    /// Fast far-field evaluator (fast multipole type).
    Fast,
}

impl BackendType {
    /// Names accepted by [BackendType::from_str].
    pub const VALID_NAMES: &'static str = "direct, numba, fast, fmm";

    /// Canonical name of the backend.
    pub fn name(&self) -> &'static str {
        match self {
            BackendType::Direct => "direct",
            BackendType::Fast => "fast",
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendType {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct" | "numba" => Ok(BackendType::Direct),
            "fast" | "fmm" => Ok(BackendType::Fast),
            _ => Err(KernelError::UnknownBackend {
                name: s.to_string(),
                valid: Self::VALID_NAMES,
            }),
        }
    }
}

/// An ordered set of points in the plane.
///
/// The x and y components are stored in two separate slices of equal length.
#[derive(Debug)]
pub struct PointSet<'a, T> {
    x: &'a [T],
    y: &'a [T],
}

impl<'a, T> Clone for PointSet<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for PointSet<'a, T> {}

impl<'a, T> PointSet<'a, T> {
    /// Create a point set from its x and y components.
    pub fn new(x: &'a [T], y: &'a [T]) -> Self {
        assert_eq!(
            x.len(),
            y.len(),
            "x and y components must have the same number of points"
        );
        Self { x, y }
    }

    /// Create a point set from a slice `[x_1, ..., x_N, y_1, ..., y_N]`.
    pub fn from_components(points: &'a [T]) -> Self {
        assert_eq!(
            points.len() % 2,
            0,
            "points must hold x and y components"
        );
        let (x, y) = points.split_at(points.len() / 2);
        Self { x, y }
    }

    /// The x components.
    pub fn x(&self) -> &'a [T] {
        self.x
    }

    /// The y components.
    pub fn y(&self) -> &'a [T] {
        self.y
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// True if the set contains no points.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// A dipole layer: one strength and one orientation per source point.
#[derive(Debug)]
pub struct Dipoles<'a, T> {
    strengths: &'a [T],
    orientation: PointSet<'a, T>,
}

impl<'a, T> Clone for Dipoles<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for Dipoles<'a, T> {}

impl<'a, T> Dipoles<'a, T> {
    /// Create a dipole layer.
    pub fn new(strengths: &'a [T], orientation: PointSet<'a, T>) -> Self {
        assert_eq!(
            strengths.len(),
            orientation.len(),
            "each dipole strength needs an orientation"
        );
        Self {
            strengths,
            orientation,
        }
    }

    /// Dipole strengths.
    pub fn strengths(&self) -> &'a [T] {
        self.strengths
    }

    /// Dipole orientations.
    pub fn orientation(&self) -> PointSet<'a, T> {
        self.orientation
    }

    /// Number of dipoles.
    pub fn len(&self) -> usize {
        self.strengths.len()
    }

    /// True if there are no dipoles.
    pub fn is_empty(&self) -> bool {
        self.strengths.is_empty()
    }
}

/// Charge and dipole strengths attached to the source points.
#[derive(Debug)]
pub struct LayerStrengths<'a, T> {
    /// Charge (monopole) strengths.
    pub charge: Option<&'a [T]>,
    /// Dipole strengths together with their orientations.
    pub dipoles: Option<Dipoles<'a, T>>,
}

impl<'a, T> Clone for LayerStrengths<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for LayerStrengths<'a, T> {}

impl<'a, T> Default for LayerStrengths<'a, T> {
    fn default() -> Self {
        Self {
            charge: None,
            dipoles: None,
        }
    }
}

impl<'a, T> LayerStrengths<'a, T> {
    /// Charge layer only.
    pub fn charge(charge: &'a [T]) -> Self {
        Self {
            charge: Some(charge),
            dipoles: None,
        }
    }

    /// Dipole layer only.
    pub fn dipole(dipoles: Dipoles<'a, T>) -> Self {
        Self {
            charge: None,
            dipoles: Some(dipoles),
        }
    }

    /// Charge and dipole layer.
    pub fn charge_and_dipole(charge: &'a [T], dipoles: Dipoles<'a, T>) -> Self {
        Self {
            charge: Some(charge),
            dipoles: Some(dipoles),
        }
    }

    /// True if a charge layer is present.
    pub fn has_charge(&self) -> bool {
        self.charge.is_some()
    }

    /// True if a dipole layer is present.
    pub fn has_dipole(&self) -> bool {
        self.dipoles.is_some()
    }
}

/// Layers included in an assembled kernel matrix.
#[derive(Debug)]
pub struct MatrixLayers<'a, T> {
    charge: bool,
    dipole: bool,
    dipvec: Option<PointSet<'a, T>>,
}

impl<'a, T> Clone for MatrixLayers<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for MatrixLayers<'a, T> {}

impl<'a, T> MatrixLayers<'a, T> {
    /// Create from the charge and dipole switches.
    ///
    /// A dipole contribution requires the dipole orientations.
    pub fn new(charge: bool, dipole: bool, dipvec: Option<PointSet<'a, T>>) -> Self {
        assert!(
            !dipole || dipvec.is_some(),
            "dipole contributions require dipole orientations"
        );
        Self {
            charge,
            dipole,
            dipvec,
        }
    }

    /// Neither charges nor dipoles. The matrix is zero.
    pub fn none() -> Self {
        Self::new(false, false, None)
    }

    /// Charge contribution only.
    pub fn charge() -> Self {
        Self::new(true, false, None)
    }

    /// Dipole contribution only.
    pub fn dipole(dipvec: PointSet<'a, T>) -> Self {
        Self::new(false, true, Some(dipvec))
    }

    /// Charge and dipole contributions.
    pub fn charge_and_dipole(dipvec: PointSet<'a, T>) -> Self {
        Self::new(true, true, Some(dipvec))
    }

    /// True if the charge contribution is included.
    pub fn has_charge(&self) -> bool {
        self.charge
    }

    /// True if the dipole contribution is included.
    pub fn has_dipole(&self) -> bool {
        self.dipole
    }

    /// Dipole orientations if a dipole contribution is included.
    pub fn dipvec(&self) -> Option<PointSet<'a, T>> {
        if self.dipole {
            self.dipvec
        } else {
            None
        }
    }

    /// True if the matrix has any content.
    pub fn is_empty(&self) -> bool {
        !(self.charge || self.dipole)
    }
}
