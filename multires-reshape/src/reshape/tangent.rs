//! Tangent frames displacement is stored in.
use ultraviolet::{Mat3, Vec3};

fn normalized_or_zero(v: Vec3) -> Vec3 {
    let mag = v.mag();
    if mag > 1.0e-35 {
        v / mag
    } else {
        Vec3::zero()
    }
}

/// Builds the tangent matrix of a grid from the limit surface derivatives
/// along the ptex axes.
///
/// The columns are the grid's x axis, y axis and the surface normal. The
/// grid axes of the four corners of a quad are rotated against the single
/// ptex face they share; non-quad faces always pass corner `0`.
///
/// Axes are normalized independently. A degenerate derivative yields a zero
/// column.
pub fn tangent_matrix(dpdu: Vec3, dpdv: Vec3, corner: usize) -> Mat3 {
    let (x, y) = match corner {
        0 => (-dpdv, -dpdu),
        1 => (dpdu, -dpdv),
        2 => (dpdv, dpdu),
        3 => (-dpdu, dpdv),
        _ => unreachable!("quad corner {} out of range", corner),
    };
    let z = dpdu.cross(dpdv);

    Mat3::new(
        normalized_or_zero(x),
        normalized_or_zero(y),
        normalized_or_zero(z),
    )
}
