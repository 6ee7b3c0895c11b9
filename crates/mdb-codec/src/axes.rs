//! Axis and winding conventions between mdb and OBJ.
//!
//! mdb is Z-up, OBJ is Y-up: converting swaps Y and Z and negates one of
//! them. Texture V is flipped, and normals are stored in mdb as two angles
//! rather than a direction.

use glam::{Vec2, Vec3};

/// Convert an mdb-space position (or direction) into OBJ space.
#[must_use]
pub fn position_to_obj(p: Vec3) -> Vec3 {
    Vec3::new(p.x, p.z, -p.y)
}

/// Convert an OBJ-space position (or direction) into mdb space.
#[must_use]
pub fn position_to_mdb(p: Vec3) -> Vec3 {
    Vec3::new(p.x, -p.z, p.y)
}

/// Flip the V coordinate. The flip is its own inverse.
#[must_use]
pub fn flip_tex_coord(t: Vec2) -> Vec2 {
    Vec2::new(t.x, -t.y)
}

/// Expand mdb normal angles `(theta, phi)` into an OBJ direction.
///
/// The result is `(-sin θ, sin φ, -cos θ)`, which is not unit length when
/// φ is non-zero; OBJ readers normalize on load.
#[must_use]
pub fn normal_from_angles(angles: Vec2) -> Vec3 {
    let theta = f64::from(angles.x);
    let phi = f64::from(angles.y);
    Vec3::new(
        -theta.sin() as f32,
        phi.sin() as f32,
        -theta.cos() as f32,
    )
}

/// Encode an OBJ normal as mdb angles `(theta, phi)`.
///
/// Components outside `[-1, 1]` are clamped before the inverse
/// trigonometry, so malformed normals still produce finite angles.
#[must_use]
pub fn angles_from_normal(n: Vec3) -> Vec2 {
    let z = f64::from(n.z).clamp(-1.0, 1.0);
    let y = f64::from(n.y).clamp(-1.0, 1.0);
    let theta = (-z).acos();
    let theta = if n.x <= 0.0 { theta } else { -theta };
    Vec2::new(theta as f32, y.asin() as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_position_axes() {
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(position_to_obj(p), Vec3::new(1.0, 3.0, -2.0));
        assert_eq!(position_to_mdb(position_to_obj(p)), p);
    }

    #[test]
    fn test_straight_down_normal() {
        // theta = 0, phi = 0 points along -Z in OBJ space.
        let n = normal_from_angles(Vec2::ZERO);
        assert!((n - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-6);
        assert_eq!(angles_from_normal(n), Vec2::ZERO);
    }

    #[test]
    fn test_out_of_range_normal_is_clamped() {
        let angles = angles_from_normal(Vec3::new(0.0, 3.0, -7.0));
        assert!(angles.is_finite());
        assert!((angles.y - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn positions_survive_the_round_trip(
            x in -1e4f32..1e4, y in -1e4f32..1e4, z in -1e4f32..1e4
        ) {
            let p = Vec3::new(x, y, z);
            prop_assert_eq!(position_to_mdb(position_to_obj(p)), p);
            prop_assert_eq!(position_to_obj(position_to_mdb(p)), p);
        }

        #[test]
        fn tex_coord_flip_is_an_involution(u in -4f32..4.0, v in -4f32..4.0) {
            let t = Vec2::new(u, v);
            prop_assert_eq!(flip_tex_coord(flip_tex_coord(t)), t);
        }

        #[test]
        fn normal_angles_survive_the_round_trip(
            magnitude in 0.01f32..3.1,
            negative in any::<bool>(),
            phi in -1.5f32..1.5,
        ) {
            let theta = if negative { -magnitude } else { magnitude };
            let back = angles_from_normal(normal_from_angles(Vec2::new(theta, phi)));
            prop_assert!((back.x - theta).abs() < 1e-3, "theta {} -> {}", theta, back.x);
            prop_assert!((back.y - phi).abs() < 1e-3, "phi {} -> {}", phi, back.y);
        }
    }
}
