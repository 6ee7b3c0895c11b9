//! Closed-form eigen-decomposition of symmetric 3×3 matrices.
//!
//! Used to derive collision box axes from the covariance of a point set.
//! Everything here runs in double precision; boxes are narrowed to `f32`
//! only when they are stored.

use std::f64::consts::PI;

use glam::{DMat3, DVec3};

/// Relative residual above which an eliminated eigenvector is rejected.
const RESIDUAL_TOLERANCE: f64 = 1e-6;

/// Eigenvalues of a symmetric 3×3 matrix.
///
/// For a non-diagonal matrix the values come back largest first
/// (`x >= y >= z`), computed with the trigonometric method. A matrix whose
/// off-diagonal terms are exactly zero returns its diagonal unchanged and in
/// order.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn eigen_values(m: &DMat3) -> DVec3 {
    let (r0, r1, r2) = (m.row(0), m.row(1), m.row(2));
    let p1 = r0.y * r0.y + r0.z * r0.z + r1.z * r1.z;
    if p1 == 0.0 {
        return DVec3::new(r0.x, r1.y, r2.z);
    }

    let q = (r0.x + r1.y + r2.z) / 3.0;
    let p2 = (r0.x - q).powi(2) + (r1.y - q).powi(2) + (r2.z - q).powi(2) + 2.0 * p1;
    let p = (p2 / 6.0).sqrt();
    let b = (*m - DMat3::from_diagonal(DVec3::splat(q))) * (1.0 / p);
    let r = b.determinant() / 2.0;

    // Rounding can push r marginally outside [-1, 1].
    let phi = if r <= -1.0 {
        PI / 3.0
    } else if r >= 1.0 {
        0.0
    } else {
        r.acos() / 3.0
    };

    let largest = q + 2.0 * p * phi.cos();
    let smallest = q + 2.0 * p * (phi + 2.0 * PI / 3.0).cos();
    DVec3::new(largest, 3.0 * q - largest - smallest, smallest)
}

/// Eigenvector for `lambda` by eliminating the first two rows of
/// `m - lambda * I` with the z component pinned to 1.
///
/// Returns `None` when the elimination divides by zero, which happens
/// whenever the true eigenvector has no z component.
#[must_use]
pub fn eigen_vector(m: &DMat3, lambda: f64) -> Option<DVec3> {
    let mut a = m.row(0);
    let mut b = m.row(1);
    a.x -= lambda;
    b.y -= lambda;
    if a.x.abs() < f64::EPSILON {
        return None;
    }
    b -= a * (b.x / a.x);
    if b.y.abs() < f64::EPSILON {
        return None;
    }
    let y = -b.z / b.y;
    let x = -(a.y * y + a.z) / a.x;
    DVec3::new(x, y, 1.0).try_normalize()
}

/// Eigenvector for `lambda`, falling back to the cross product of the rows
/// of `m - lambda * I` when elimination fails or is inaccurate.
fn solve_eigen_vector(m: &DMat3, lambda: f64) -> Option<DVec3> {
    let shifted = *m - DMat3::from_diagonal(DVec3::splat(lambda));
    let scale = m.to_cols_array().iter().fold(0.0f64, |acc, v| acc.max(v.abs()));

    if let Some(v) = eigen_vector(m, lambda) {
        if (shifted * v).length() <= RESIDUAL_TOLERANCE * scale.max(1.0) {
            return Some(v);
        }
    }

    let (r0, r1, r2) = (shifted.row(0), shifted.row(1), shifted.row(2));
    [r0.cross(r1), r0.cross(r2), r1.cross(r2)]
        .into_iter()
        .max_by(|a, b| a.length_squared().total_cmp(&b.length_squared()))
        .and_then(DVec3::try_normalize)
}

/// Orthonormal right-handed basis `(cross, up, forward)` of a covariance
/// matrix: `cross` follows the largest eigenvalue, `up` the smallest and
/// `forward = cross × up`.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn principal_axes(cov: &DMat3) -> [DVec3; 3] {
    let values = eigen_values(cov);
    let (r0, r1) = (cov.row(0), cov.row(1));
    let diagonal = r0.y * r0.y + r0.z * r0.z + r1.z * r1.z == 0.0;

    let (major, minor) = if diagonal {
        let units = [DVec3::X, DVec3::Y, DVec3::Z];
        let entries = values.to_array();
        let largest = (0..3).fold(0, |best, i| if entries[i] > entries[best] { i } else { best });
        let smallest = (0..3)
            .filter(|&i| i != largest)
            .fold(None, |best: Option<usize>, i| match best {
                Some(b) if entries[b] <= entries[i] => Some(b),
                _ => Some(i),
            })
            .unwrap_or((largest + 1) % 3);
        (units[largest], units[smallest])
    } else {
        (
            solve_eigen_vector(cov, values.x).unwrap_or(DVec3::X),
            solve_eigen_vector(cov, values.z).unwrap_or(DVec3::Y),
        )
    };

    let cross = major.try_normalize().unwrap_or(DVec3::X);
    let up = (minor - cross * minor.dot(cross))
        .try_normalize()
        .unwrap_or_else(|| cross.any_orthonormal_vector());
    [cross, up, cross.cross(up)]
}

/// Mean and population covariance of a point set.
///
/// Returns `None` for an empty set.
#[must_use]
pub fn covariance(points: &[DVec3]) -> Option<(DVec3, DMat3)> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let mean = points.iter().copied().sum::<DVec3>() / n;

    let mut cov = DMat3::ZERO;
    for p in points {
        let d = *p - mean;
        cov += DMat3::from_cols(d * d.x, d * d.y, d * d.z);
    }
    Some((mean, cov * (1.0 / n)))
}
