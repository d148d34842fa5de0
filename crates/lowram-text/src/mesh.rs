//! Triangle meshes for drawing strings from atlas pages.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::atlas::TexRect;

/// Vertex of a glyph quad.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GlyphVertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
}

/// Indexed triangle list of glyph quads, all sampling one atlas page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlyphMesh {
    pub vertices: Vec<GlyphVertex>,
    pub indices: Vec<u32>,
}

impl GlyphMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a quad spanning `min..max` that samples `tex`.
    ///
    /// Corners are emitted as `min`, `(max.x, min.y)`, `max`, `(min.x, max.y)`
    /// with two triangles `0 1 2` and `2 3 0`.
    pub fn push_quad(&mut self, min: Vec2, max: Vec2, tex: TexRect) {
        let base = self.vertices.len() as u32;
        let corners = [
            ([min.x, min.y], [tex.left, tex.top]),
            ([max.x, min.y], [tex.right, tex.top]),
            ([max.x, max.y], [tex.right, tex.bottom]),
            ([min.x, max.y], [tex.left, tex.bottom]),
        ];
        self.vertices
            .extend(corners.iter().map(|&(position, tex_coords)| GlyphVertex {
                position,
                tex_coords,
            }));
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    /// Number of quads.
    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }

    /// Check if the mesh has no geometry.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Remove all geometry, keeping the allocations.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    /// Vertex data as bytes, ready for a vertex buffer.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index data as bytes, ready for an index buffer.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}
