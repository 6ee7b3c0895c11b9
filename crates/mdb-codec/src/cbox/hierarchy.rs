//! Collision box description files.
//!
//! # Format
//!
//! Tab-separated lines, one hierarchy per mesh:
//!
//! ```text
//! MESH	Hull
//! CBOX	_BOX0	_BOX1	_BOX2
//! CBOX	_BOX1
//! CBOX	_BOX2		_BOX3
//! CBOX	_BOX3
//! ```
//!
//! The first `CBOX` of a mesh is its root. Each line names a box followed by
//! its optional left and right children; an empty left field declares a
//! right child only.

use std::collections::HashMap;
use std::io::BufRead;

use tracing::warn;

use super::{CollisionBox, group_points};
use crate::MAX_BOX_LEVEL;
use crate::error::CodecResult;
use crate::obj::for_each_line;
use crate::model::ObjMesh;

/// The box tree declared for one mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxHierarchy {
    pub mesh: String,
    pub root: CollisionBox,
}

/// Arena node used while the tree shape is still being discovered.
struct Node {
    name: String,
    level: u32,
    left: Option<usize>,
    right: Option<usize>,
}

#[derive(Default)]
struct Section {
    mesh: String,
    nodes: Vec<Node>,
    by_name: HashMap<String, usize>,
}

impl Section {
    fn new(mesh: &str) -> Self {
        Self {
            mesh: mesh.to_string(),
            ..Self::default()
        }
    }

    fn add(&mut self, name: &str, level: u32) -> usize {
        let index = self.nodes.len();
        self.nodes.push(Node {
            name: name.to_string(),
            level,
            left: None,
            right: None,
        });
        self.by_name.insert(name.to_string(), index);
        index
    }

    fn declare(&mut self, name: &str, left: &str, right: &str) {
        if self.nodes.is_empty() {
            self.add(name, 0);
        }
        let Some(&parent) = self.by_name.get(name) else {
            warn!(mesh = %self.mesh, "box {name} has no parent, ignoring it");
            return;
        };
        if self.nodes[parent].level >= MAX_BOX_LEVEL {
            return;
        }
        if let Some(child) = self.attach(parent, left, self.nodes[parent].left) {
            self.nodes[parent].left = Some(child);
        }
        if let Some(child) = self.attach(parent, right, self.nodes[parent].right) {
            self.nodes[parent].right = Some(child);
        }
    }

    /// Resolve a child slot; `None` leaves the slot as it is.
    fn attach(&mut self, parent: usize, child: &str, current: Option<usize>) -> Option<usize> {
        if child.is_empty() {
            return None;
        }
        match self.by_name.get(child) {
            Some(&existing) if current == Some(existing) => None,
            Some(_) => {
                warn!(
                    mesh = %self.mesh,
                    "box {child} already belongs to the tree, not attaching it to {}",
                    self.nodes[parent].name
                );
                None
            }
            None if current.is_some() => {
                warn!(
                    mesh = %self.mesh,
                    "box {} already has that child, ignoring {child}",
                    self.nodes[parent].name
                );
                None
            }
            None => Some(self.add(child, self.nodes[parent].level + 1)),
        }
    }

    fn build(&self, index: usize) -> CollisionBox {
        let node = &self.nodes[index];
        CollisionBox {
            left: node.left.map(|i| Box::new(self.build(i))),
            right: node.right.map(|i| Box::new(self.build(i))),
            ..CollisionBox::new(node.name.clone(), node.level)
        }
    }

    fn finish(self) -> Option<BoxHierarchy> {
        if self.nodes.is_empty() {
            return None;
        }
        Some(BoxHierarchy {
            root: self.build(0),
            mesh: self.mesh,
        })
    }
}

/// Parse every hierarchy in a description file.
///
/// Lines are decoded lossily, so names that are not UTF-8 still parse. Boxes come back with default geometry; use [`BoxHierarchy::reconstruct`]
/// to fit them to their OBJ groups.
pub fn parse_description<R: BufRead>(reader: R) -> CodecResult<Vec<BoxHierarchy>> {
    let mut hierarchies = Vec::new();
    let mut section: Option<Section> = None;

    for_each_line(reader, "collision box file", |line| {
        let mut fields = line.split('\t');
        match fields.next() {
            Some("MESH") => {
                hierarchies.extend(section.take().and_then(Section::finish));
                section = Some(Section::new(fields.next().unwrap_or_default()));
            }
            Some("CBOX") => {
                let name = fields.next().unwrap_or_default();
                if let (Some(current), false) = (section.as_mut(), name.is_empty()) {
                    let left = fields.next().unwrap_or_default();
                    let right = fields.next().unwrap_or_default();
                    current.declare(name, left, right);
                }
            }
            _ => {}
        }
        Ok(())
    })?;
    hierarchies.extend(section.and_then(Section::finish));
    Ok(hierarchies)
}

impl BoxHierarchy {
    /// Fit every box to the OBJ group of the same name, removing those
    /// groups from `mesh`.
    ///
    /// The tree shape is kept as declared. Returns the names of boxes that
    /// had no group; they keep default geometry.
    pub fn reconstruct(&mut self, mesh: &mut ObjMesh) -> Vec<String> {
        let mut missing = Vec::new();
        fit_subtree(&mut self.root, mesh, &mut missing);
        missing
    }

    /// Remove the groups of every box in this hierarchy from `mesh` without
    /// fitting anything.
    pub fn strip_groups(&self, mesh: &mut ObjMesh) {
        self.root.walk(&mut |b| {
            mesh.take_group(&b.name);
        });
    }
}

fn fit_subtree(node: &mut CollisionBox, mesh: &mut ObjMesh, missing: &mut Vec<String>) {
    match mesh.take_group(&node.name) {
        Some(group) => {
            let points = group_points(mesh, &group);
            node.fit(&points);
        }
        None => missing.push(node.name.clone()),
    }
    if let Some(left) = node.left.as_deref_mut() {
        fit_subtree(left, mesh, missing);
    }
    if let Some(right) = node.right.as_deref_mut() {
        fit_subtree(right, mesh, missing);
    }
}
