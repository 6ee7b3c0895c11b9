//! Conversion settings.

/// Settings shared by every batch entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// mdb → OBJ: export box wireframes and a description file.
    /// OBJ → mdb: generate boxes by splitting the geometry, instead of
    /// rebuilding them from the description file.
    pub collision_boxes: bool,
    /// Prefix written before every `map_Kd` texture path.
    pub texture_directory: String,
    /// Extension given to textures in written MTL files.
    pub texture_extension: String,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            collision_boxes: false,
            texture_directory: String::new(),
            texture_extension: "dds".to_string(),
        }
    }
}
