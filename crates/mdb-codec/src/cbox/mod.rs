//! Oriented collision box trees.
//!
//! Boxes are fitted to point sets with principal component analysis and
//! arranged in a binary tree no deeper than [`MAX_BOX_LEVEL`]. All box data
//! here is in OBJ axes; the mdb codec converts on the way in and out.

pub mod hierarchy;

use std::collections::HashSet;

use glam::{DVec3, Vec3};

use crate::MAX_BOX_LEVEL;
use crate::math::{covariance, principal_axes};
use crate::model::{ObjGroup, ObjMesh, ObjTriangle};

/// An oriented box with optional children.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionBox {
    /// Name used by the side-channel description file; empty when generated.
    pub name: String,
    /// Depth in the tree, 0 for the root.
    pub level: u32,
    pub center: Vec3,
    /// Axis of greatest spread.
    pub cross: Vec3,
    /// Axis of least spread.
    pub up: Vec3,
    /// `cross × up`.
    pub forward: Vec3,
    /// Half extents along `cross`, `up` and `forward`.
    pub half_lengths: Vec3,
    pub left: Option<Box<CollisionBox>>,
    pub right: Option<Box<CollisionBox>>,
}

impl Default for CollisionBox {
    fn default() -> Self {
        Self {
            name: String::new(),
            level: 0,
            center: Vec3::ZERO,
            cross: Vec3::X,
            up: Vec3::Y,
            forward: Vec3::Z,
            half_lengths: Vec3::ZERO,
            left: None,
            right: None,
        }
    }
}

impl CollisionBox {
    pub fn new(name: impl Into<String>, level: u32) -> Self {
        Self {
            name: name.into(),
            level,
            ..Self::default()
        }
    }

    /// Refit center, axes and extents to `points`.
    ///
    /// Returns the centroid, or `None` (leaving the box untouched) when
    /// there are no points.
    pub fn fit(&mut self, points: &[Vec3]) -> Option<Vec3> {
        let points: Vec<DVec3> = points.iter().map(|p| p.as_dvec3()).collect();
        let (mean, cov) = covariance(&points)?;
        let [cross, up, forward] = principal_axes(&cov);

        let mut min = DVec3::splat(f64::MAX);
        let mut max = DVec3::splat(f64::MIN);
        for p in &points {
            let local = DVec3::new(p.dot(cross), p.dot(up), p.dot(forward));
            min = min.min(local);
            max = max.max(local);
        }
        let mid = (min + max) / 2.0;

        self.center = (cross * mid.x + up * mid.y + forward * mid.z).as_vec3();
        self.half_lengths = ((max - min) / 2.0).as_vec3();
        self.cross = cross.as_vec3();
        self.up = up.as_vec3();
        self.forward = forward.as_vec3();
        Some(mean.as_vec3())
    }

    /// Largest half extent, stored in mdb files as the box radius.
    #[must_use]
    pub fn radius(&self) -> f32 {
        self.half_lengths.max_element()
    }

    /// The eight corners, ordered to match the wireframe face table.
    #[must_use]
    pub fn corners(&self) -> [Vec3; 8] {
        const SIGNS: [[f32; 3]; 8] = [
            [1.0, 1.0, 1.0],
            [1.0, -1.0, 1.0],
            [1.0, 1.0, -1.0],
            [1.0, -1.0, -1.0],
            [-1.0, -1.0, -1.0],
            [-1.0, 1.0, -1.0],
            [-1.0, 1.0, 1.0],
            [-1.0, -1.0, 1.0],
        ];
        let cross = self.cross * self.half_lengths.x;
        let up = self.up * self.half_lengths.y;
        let forward = self.forward * self.half_lengths.z;
        SIGNS.map(|[c, u, f]| self.center + cross * c + up * u + forward * f)
    }

    pub fn children(&self) -> impl Iterator<Item = &CollisionBox> {
        self.left.as_deref().into_iter().chain(self.right.as_deref())
    }

    /// Number of boxes in this subtree.
    #[must_use]
    pub fn count(&self) -> usize {
        1 + self.children().map(CollisionBox::count).sum::<usize>()
    }

    /// Number of levels in this subtree.
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self.children().map(CollisionBox::depth).max().unwrap_or(0)
    }

    /// Visit every box depth-first, parents before children.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a CollisionBox)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Build a full tree by recursive PCA splitting of a group's triangles.
    ///
    /// Triangles with an unresolvable position are ignored.
    #[must_use]
    pub fn auto_generate(mesh: &ObjMesh, group: &ObjGroup) -> Self {
        let triangles: Vec<[usize; 3]> = group
            .triangles()
            .filter_map(|tri| position_indices(mesh, tri))
            .collect();
        let mut root = Self::default();
        root.split(&mesh.positions, &triangles);
        root
    }

    fn split(&mut self, positions: &[Vec3], triangles: &[[usize; 3]]) {
        let points = unique_points(positions, triangles.iter().flatten().copied());
        let mean = self.fit(&points).unwrap_or(Vec3::ZERO);
        if self.level >= MAX_BOX_LEVEL {
            return;
        }

        let lengths = self.half_lengths;
        let axis = if lengths.x >= lengths.y && lengths.x >= lengths.z {
            self.cross
        } else if lengths.y >= lengths.z {
            self.up
        } else {
            self.forward
        };
        let pivot = axis.dot(mean);

        let (left, right): (Vec<[usize; 3]>, Vec<[usize; 3]>) =
            triangles.iter().partition(|tri| {
                let [a, b, c] = (**tri).map(|i| positions[i]);
                let center = (a.min(b).min(c) + a.max(b).max(c)) / 2.0;
                axis.dot(center) < pivot
            });

        let mut left_box = Self::new("", self.level + 1);
        left_box.split(positions, &left);
        let mut right_box = Self::new("", self.level + 1);
        right_box.split(positions, &right);
        self.left = Some(Box::new(left_box));
        self.right = Some(Box::new(right_box));
    }
}

/// Zero-based position indices of a triangle, if all three exist.
fn position_indices(mesh: &ObjMesh, tri: &ObjTriangle) -> Option<[usize; 3]> {
    let resolve = |position: i32| {
        let index = usize::try_from(position).ok()?.checked_sub(1)?;
        (index < mesh.positions.len()).then_some(index)
    };
    Some([
        resolve(tri[0].position)?,
        resolve(tri[1].position)?,
        resolve(tri[2].position)?,
    ])
}

/// Positions referenced by `indices`, each once, in first-seen order.
fn unique_points(positions: &[Vec3], indices: impl Iterator<Item = usize>) -> Vec<Vec3> {
    let mut seen = HashSet::new();
    indices
        .filter(|&i| seen.insert(i))
        .filter_map(|i| positions.get(i).copied())
        .collect()
}

/// Distinct positions used by a group's triangles.
#[must_use]
pub fn group_points(mesh: &ObjMesh, group: &ObjGroup) -> Vec<Vec3> {
    let indices = group
        .triangles()
        .flat_map(|tri| tri.iter())
        .filter_map(|corner| usize::try_from(corner.position).ok()?.checked_sub(1));
    unique_points(&mesh.positions, indices)
}
