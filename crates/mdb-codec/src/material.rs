//! Materials and the deduplicated material table of one output file.

use std::collections::HashMap;

use crate::MAX_INDEX_COUNT;
use crate::error::{CodecError, CodecResult};
use crate::naming::material_name_from_texture;

/// Texture reference of a material that has no texture.
pub const NULL_TEXTURE: &str = "NULL";

/// A display name paired with the texture it samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Material {
    pub name: String,
    pub texture: String,
}

impl Material {
    pub fn new(name: impl Into<String>, texture: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            texture: texture.into(),
        }
    }

    /// Material named after its texture, as stored in mdb files.
    pub fn from_texture(texture: impl Into<String>) -> Self {
        let texture = texture.into();
        Self {
            name: material_name_from_texture(&texture),
            texture,
        }
    }

    #[must_use]
    pub fn has_texture(&self) -> bool {
        self.texture != NULL_TEXTURE
    }
}

/// Ordered material table whose names are unique ignoring ASCII case.
///
/// Indices are stable once assigned and never exceed the 16-bit range of
/// mdb material references.
#[derive(Debug, Clone, Default)]
pub struct MaterialLibrary {
    materials: Vec<Material>,
    by_name: HashMap<String, u16>,
}

impl MaterialLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a material unless one with the same name (ignoring case) exists.
    ///
    /// Returns the index of the stored material, which is the existing one
    /// for duplicates.
    pub fn insert(&mut self, material: Material) -> CodecResult<u16> {
        if let Some(index) = self.position(&material.name) {
            return Ok(index);
        }
        self.push(material)
    }

    /// Insert every material of one file and return, per file-local index,
    /// the name of the material it now maps to.
    pub fn merge(&mut self, materials: &[Material]) -> CodecResult<Vec<String>> {
        materials
            .iter()
            .map(|material| {
                let index = self.insert(material.clone())?;
                Ok(self.materials[usize::from(index)].name.clone())
            })
            .collect()
    }

    /// Index of the material named `name`, ignoring ASCII case.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<u16> {
        self.by_name.get(&name.to_ascii_lowercase()).copied()
    }

    /// Index for a `usemtl` reference.
    ///
    /// An exact name match wins. Anything else falls back to the first
    /// untextured material, which is created on demand so a file carries at
    /// most one implicit null material.
    pub fn resolve(&mut self, name: &str) -> CodecResult<u16> {
        let exact = self
            .position(name)
            .filter(|&i| self.materials[usize::from(i)].name == name);
        let null = || {
            self.materials
                .iter()
                .position(|m| !m.has_texture())
                .map(|i| i as u16)
        };
        match exact.or_else(null) {
            Some(index) => Ok(index),
            None => self.push(Material::new("", NULL_TEXTURE)),
        }
    }

    fn push(&mut self, material: Material) -> CodecResult<u16> {
        if self.materials.len() >= MAX_INDEX_COUNT {
            return Err(CodecError::CapacityExceeded {
                what: "material",
                limit: MAX_INDEX_COUNT,
            });
        }
        let index = self.materials.len() as u16;
        self.by_name
            .entry(material.name.to_ascii_lowercase())
            .or_insert(index);
        self.materials.push(material);
        Ok(index)
    }

    #[must_use]
    pub fn get(&self, index: u16) -> Option<&Material> {
        self.materials.get(usize::from(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Material> {
        self.materials.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Materials in index order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Material> {
        self.materials.clone()
    }

    pub fn clear(&mut self) {
        self.materials.clear();
        self.by_name.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_ignore_case() {
        let mut library = MaterialLibrary::new();
        assert_eq!(library.insert(Material::from_texture("Hull Plate.tga")).unwrap(), 0);
        assert_eq!(library.insert(Material::from_texture("deck.tga")).unwrap(), 1);
        assert_eq!(library.insert(Material::from_texture("hull+plate.dds")).unwrap(), 0);
        assert_eq!(library.len(), 2);
        assert_eq!(library.get(0).unwrap().texture, "Hull Plate.tga");
    }

    #[test]
    fn test_merge_maps_file_indices_to_library_names() {
        let mut library = MaterialLibrary::new();
        library.insert(Material::from_texture("Deck.tga")).unwrap();
        let names = library
            .merge(&[
                Material::from_texture("hull.tga"),
                Material::from_texture("deck.dds"),
            ])
            .unwrap();
        assert_eq!(names, ["hull", "Deck"]);
        assert_eq!(library.len(), 2);
    }

    #[test]
    fn test_resolve_prefers_exact_match() {
        let mut library = MaterialLibrary::new();
        library.insert(Material::new("plain", NULL_TEXTURE)).unwrap();
        library.insert(Material::new("Hull", "hull.tga")).unwrap();
        assert_eq!(library.resolve("Hull").unwrap(), 1);
        // Lookup is case-sensitive; the miss reuses the untextured material.
        assert_eq!(library.resolve("hull").unwrap(), 0);
        assert_eq!(library.len(), 2);
    }

    #[test]
    fn test_resolve_creates_single_null_material() {
        let mut library = MaterialLibrary::new();
        library.insert(Material::new("Hull", "hull.tga")).unwrap();
        assert_eq!(library.resolve("missing").unwrap(), 1);
        assert_eq!(library.resolve("other").unwrap(), 1);
        assert_eq!(library.len(), 2);
        assert!(!library.get(1).unwrap().has_texture());
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut library = MaterialLibrary::new();
        for i in 0..MAX_INDEX_COUNT {
            library.insert(Material::new(format!("m{i}"), "t.tga")).unwrap();
        }
        assert_eq!(library.insert(Material::new("m0", "t.tga")).unwrap(), 0);
        assert!(matches!(
            library.insert(Material::new("extra", "t.tga")),
            Err(CodecError::CapacityExceeded { what: "material", .. })
        ));
        assert!(library.resolve("unknown").is_err());
    }
}
