//! In-memory models produced and consumed by the codecs.
//!
//! [`MdbMesh`] keeps data exactly as stored in an mdb file (Z-up axes, V
//! flipped, normals as angles). [`ObjMesh`] keeps data as written in an OBJ
//! file (Y-up, direction normals, 1-based corner references). Conversion
//! between the two happens while encoding, never in place.

use glam::{Vec2, Vec3};

use crate::cbox::CollisionBox;
use crate::material::Material;

/// One vertex record of an mdb model.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MdbVertex {
    pub position: Vec3,
    pub tex_coord: Vec2,
    /// Spherical normal angles `(theta, phi)`.
    pub normal: Vec2,
}

/// Consecutive triangles of a model sharing one material index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaterialRun {
    pub material: u16,
    /// Model-local vertex indices in mdb winding.
    pub triangles: Vec<[u16; 3]>,
}

/// One model (mesh or LOD) of an mdb file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MdbModel {
    pub name: String,
    pub vertices: Vec<MdbVertex>,
    pub runs: Vec<MaterialRun>,
}

impl MdbModel {
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.runs.iter().map(|run| run.triangles.len()).sum()
    }

    /// Append a triangle, starting a new run when the material changes.
    pub fn push_triangle(&mut self, triangle: [u16; 3], material: u16) {
        match self.runs.last_mut() {
            Some(run) if run.material == material => run.triangles.push(triangle),
            _ => self.runs.push(MaterialRun {
                material,
                triangles: vec![triangle],
            }),
        }
    }
}

/// Decoded contents of one mdb file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MdbMesh {
    pub models: Vec<MdbModel>,
    /// Materials in file order; [`MaterialRun::material`] indexes this list.
    pub materials: Vec<Material>,
    /// Collision tree, held in OBJ axes.
    pub collision: Option<CollisionBox>,
}

impl MdbMesh {
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.models.iter().map(|m| m.vertices.len()).sum()
    }
}

/// A face corner: 1-based position, texture coordinate and normal
/// references. Zero means the component was absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Corner {
    pub position: i32,
    pub tex_coord: i32,
    pub normal: i32,
}

impl Corner {
    #[must_use]
    pub fn new(position: i32, tex_coord: i32, normal: i32) -> Self {
        Self {
            position,
            tex_coord,
            normal,
        }
    }
}

/// Triangle corners in OBJ winding order.
pub type ObjTriangle = [Corner; 3];

/// Triangles following one `usemtl` directive.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjRun {
    pub material: String,
    pub triangles: Vec<ObjTriangle>,
}

/// A named `g`/`o` group.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjGroup {
    pub name: String,
    pub runs: Vec<ObjRun>,
}

impl ObjGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            runs: Vec::new(),
        }
    }

    pub fn triangles(&self) -> impl Iterator<Item = &ObjTriangle> {
        self.runs.iter().flat_map(|run| run.triangles.iter())
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.runs.iter().map(|run| run.triangles.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.iter().all(|run| run.triangles.is_empty())
    }
}

/// Parsed contents of one OBJ file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjMesh {
    pub positions: Vec<Vec3>,
    pub tex_coords: Vec<Vec2>,
    pub normals: Vec<Vec3>,
    pub groups: Vec<ObjGroup>,
    /// Name given by the last `mtllib` directive.
    pub material_library: Option<String>,
}

impl ObjMesh {
    /// Position referenced by a corner, if it exists.
    #[must_use]
    pub fn position(&self, corner: &Corner) -> Option<Vec3> {
        lookup(&self.positions, corner.position)
    }

    /// Texture coordinate referenced by a corner, or zero when absent.
    #[must_use]
    pub fn tex_coord(&self, corner: &Corner) -> Vec2 {
        lookup(&self.tex_coords, corner.tex_coord).unwrap_or(Vec2::ZERO)
    }

    /// Normal referenced by a corner, or zero when absent.
    #[must_use]
    pub fn normal(&self, corner: &Corner) -> Vec3 {
        lookup(&self.normals, corner.normal).unwrap_or(Vec3::ZERO)
    }

    /// Remove and return the group named exactly `name`.
    pub fn take_group(&mut self, name: &str) -> Option<ObjGroup> {
        let index = self.groups.iter().position(|g| g.name == name)?;
        Some(self.groups.remove(index))
    }
}

fn lookup<T: Copy>(values: &[T], one_based: i32) -> Option<T> {
    let index = usize::try_from(one_based).ok()?.checked_sub(1)?;
    values.get(index).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_split_on_material_change() {
        let mut model = MdbModel::default();
        model.push_triangle([0, 1, 2], 0);
        model.push_triangle([2, 1, 3], 0);
        model.push_triangle([3, 4, 5], 1);
        model.push_triangle([5, 6, 7], 0);

        let materials: Vec<u16> = model.runs.iter().map(|r| r.material).collect();
        assert_eq!(materials, [0, 1, 0]);
        assert_eq!(model.triangle_count(), 4);
    }

    #[test]
    fn test_corner_lookup() {
        let mesh = ObjMesh {
            positions: vec![Vec3::X, Vec3::Y],
            tex_coords: vec![Vec2::ONE],
            ..Default::default()
        };
        let corner = Corner::new(2, 1, 0);
        assert_eq!(mesh.position(&corner), Some(Vec3::Y));
        assert_eq!(mesh.tex_coord(&corner), Vec2::ONE);
        assert_eq!(mesh.normal(&corner), Vec3::ZERO);
        assert_eq!(mesh.position(&Corner::new(3, 0, 0)), None);
        assert_eq!(mesh.position(&Corner::default()), None);
    }

    #[test]
    fn test_take_group_is_exact() {
        let mut mesh = ObjMesh {
            groups: vec![ObjGroup::new("_BOX0"), ObjGroup::new("Hull_0")],
            ..Default::default()
        };
        assert!(mesh.take_group("_box0").is_none());
        assert_eq!(mesh.take_group("_BOX0").unwrap().name, "_BOX0");
        assert_eq!(mesh.groups.len(), 1);
    }
}
