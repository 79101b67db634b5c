//! Options applying to a subdivision scheme.
use num_enum::{IntoPrimitive, TryFromPrimitive};
use opensubdiv_petite::far;

use crate::object::{BoundarySmooth, MultiresModifier, UvSmooth};

/// Subdivision scheme used to build the limit surface.
#[repr(u8)]
#[derive(TryFromPrimitive, IntoPrimitive, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Scheme {
    /// *Bilinear* interpolation. The limit surface is the piecewise bilinear
    /// patch network of the control cage.
    Bilinear = 0,
    /// [*Catmull-Clark* subdivision](https://en.wikipedia.org/wiki/Catmull%E2%80%93Clark_subdivision_surface).
    CatmullClark = 1,
}

/// How vertices on a mesh boundary are interpolated.
#[repr(u8)]
#[derive(TryFromPrimitive, IntoPrimitive, Copy, Clone, Debug, PartialEq, Eq)]
pub enum BoundaryInterpolation {
    /// A sequence of boundary vertices defines a smooth curve to which the
    /// limit surface along boundary faces extends.
    EdgeOnly = 1,
    /// Similar to edge-only but the smooth curve resulting on the boundary is
    /// made to interpolate corner vertices (vertices with exactly one incident
    /// face).
    EdgeAndCorner = 2,
}

/// How face-varying data (UVs) is interpolated.
///
/// Displacement reshaping does not refine face-varying data. The value is
/// passed on to the topology refiner so that an evaluator built from a
/// multires modifier describes the same surface the modifier does.
#[repr(u8)]
#[derive(TryFromPrimitive, IntoPrimitive, Copy, Clone, Debug, PartialEq, Eq)]
pub enum FaceVaryingLinearInterpolation {
    /// Smooth everywhere the mesh is smooth.
    None = 0,
    /// Linearly interpolate (sharpen or pin) corners only.
    CornersOnly = 1,
    /// `CornersOnly` + sharpening of junctions of three or more regions.
    CornersPlusOne = 2,
    /// `CornersPlusOne` + sharpening of darts and concave corners.
    CornersPlusTwo = 3,
    /// Linear interpolation along all boundary edges and corners.
    Boundaries = 4,
    /// Linear interpolation everywhere (boundaries and interior).
    All = 5,
}

/// Settings a [`Subdiv`](super::Subdiv) is created with.
///
/// # Examples
///
/// ```
/// use multires_reshape::subdiv::{Scheme, SubdivSettings};
///
/// let settings = SubdivSettings {
///     scheme: Scheme::Bilinear,
///     refinement_level: 2,
///     ..Default::default()
/// };
/// assert!(settings.is_simple());
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SubdivSettings {
    pub scheme: Scheme,
    /// Isolation level of adaptive refinement around extraordinary vertices
    /// and creases. Higher values approximate the limit surface near them
    /// more closely; regular regions are exact at any level. Values below `1`
    /// are treated as `1`.
    pub refinement_level: usize,
    pub boundary_interpolation: BoundaryInterpolation,
    pub face_varying_linear_interpolation: FaceVaryingLinearInterpolation,
    /// Apply the edge creases of the base mesh. Without this creases are
    /// ignored and every edge is smooth.
    pub use_creases: bool,
}

impl Default for SubdivSettings {
    /// Create settings with the following defaults:
    ///
    /// | Property                            | Value                                                          |
    /// |-------------------------------------|----------------------------------------------------------------|
    /// | `scheme`                            | [`CatmullClark`](Scheme::CatmullClark)                         |
    /// | `refinement_level`                  | `4`                                                            |
    /// | `boundary_interpolation`            | [`EdgeOnly`](BoundaryInterpolation::EdgeOnly)                  |
    /// | `face_varying_linear_interpolation` | [`CornersPlusOne`](FaceVaryingLinearInterpolation::CornersPlusOne) |
    /// | `use_creases`                       | `true`                                                         |
    fn default() -> Self {
        Self {
            scheme: Scheme::CatmullClark,
            refinement_level: 4,
            boundary_interpolation: BoundaryInterpolation::EdgeOnly,
            face_varying_linear_interpolation: FaceVaryingLinearInterpolation::CornersPlusOne,
            use_creases: true,
        }
    }
}

impl SubdivSettings {
    /// Derives the evaluator settings a multires modifier describes.
    pub fn from_multires(multires: &MultiresModifier) -> Self {
        Self {
            scheme: Scheme::CatmullClark,
            refinement_level: multires.quality,
            boundary_interpolation: match multires.boundary_smooth {
                BoundarySmooth::All => BoundaryInterpolation::EdgeOnly,
                BoundarySmooth::PreserveCorners => BoundaryInterpolation::EdgeAndCorner,
            },
            face_varying_linear_interpolation: match multires.uv_smooth {
                UvSmooth::None => FaceVaryingLinearInterpolation::All,
                UvSmooth::PreserveCorners => FaceVaryingLinearInterpolation::CornersOnly,
                UvSmooth::PreserveCornersAndJunctions => {
                    FaceVaryingLinearInterpolation::CornersPlusOne
                }
                UvSmooth::PreserveCornersJunctionsAndConcave => {
                    FaceVaryingLinearInterpolation::CornersPlusTwo
                }
                UvSmooth::PreserveBoundaries => FaceVaryingLinearInterpolation::Boundaries,
                UvSmooth::All => FaceVaryingLinearInterpolation::None,
            },
            use_creases: multires.use_creases,
        }
    }

    /// Returns `true` for the bilinear ("simple") scheme.
    #[inline]
    pub fn is_simple(&self) -> bool {
        self.scheme == Scheme::Bilinear
    }

    /// The refinement level actually used.
    #[inline]
    pub fn isolation_level(&self) -> usize {
        self.refinement_level.max(1)
    }
}

impl From<Scheme> for far::Scheme {
    fn from(scheme: Scheme) -> Self {
        match scheme {
            Scheme::Bilinear => far::Scheme::Bilinear,
            Scheme::CatmullClark => far::Scheme::CatmullClark,
        }
    }
}

impl From<BoundaryInterpolation> for far::BoundaryInterpolation {
    fn from(interpolation: BoundaryInterpolation) -> Self {
        match interpolation {
            BoundaryInterpolation::EdgeOnly => far::BoundaryInterpolation::EdgeOnly,
            BoundaryInterpolation::EdgeAndCorner => far::BoundaryInterpolation::EdgeAndCorner,
        }
    }
}

impl From<FaceVaryingLinearInterpolation> for far::FaceVaryingLinearInterpolation {
    fn from(interpolation: FaceVaryingLinearInterpolation) -> Self {
        use FaceVaryingLinearInterpolation as Fvar;
        match interpolation {
            Fvar::None => far::FaceVaryingLinearInterpolation::None,
            Fvar::CornersOnly => far::FaceVaryingLinearInterpolation::CornersOnly,
            Fvar::CornersPlusOne => far::FaceVaryingLinearInterpolation::CornersPlusOne,
            Fvar::CornersPlusTwo => far::FaceVaryingLinearInterpolation::CornersPlusTwo,
            Fvar::Boundaries => far::FaceVaryingLinearInterpolation::Boundaries,
            Fvar::All => far::FaceVaryingLinearInterpolation::All,
        }
    }
}

impl From<&SubdivSettings> for far::TopologyRefinerOptions {
    fn from(settings: &SubdivSettings) -> Self {
        Self {
            scheme: settings.scheme.into(),
            boundary_interpolation: Some(settings.boundary_interpolation.into()),
            face_varying_linear_interpolation: Some(
                settings.face_varying_linear_interpolation.into(),
            ),
            ..Default::default()
        }
    }
}
