use landmass_geom::{Aabb, Vec3};

/// Role of an emitted vertex in the LOD stitching scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexKind {
    /// Outer emitted ring, always at full resolution so neighbours meet exactly.
    MeshEdge,
    /// Ring just inside the edge; height interpolated between main vertices.
    EdgeConnection,
    /// Interior vertex on the LOD stride grid.
    Main,
}

/// Render-ready mesh for one chunk at one LOD. Positions are chunk-local.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshPayload {
    pub lod: usize,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    pub vertex_kinds: Vec<VertexKind>,
    pub flat_shaded: bool,
}

impl MeshPayload {
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    pub fn bounds(&self) -> Aabb {
        let mut min = Vec3::new(f32::MAX, f32::MAX, f32::MAX);
        let mut max = Vec3::new(f32::MIN, f32::MIN, f32::MIN);
        for p in &self.positions {
            min = Vec3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
            max = Vec3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
        }
        if self.positions.is_empty() {
            return Aabb::default();
        }
        Aabb::new(min, max)
    }

    pub(crate) fn with_capacity(lod: usize, verts: usize, tris: usize, flat_shaded: bool) -> Self {
        Self {
            lod,
            positions: Vec::with_capacity(verts),
            normals: Vec::with_capacity(verts),
            uvs: Vec::with_capacity(verts),
            indices: Vec::with_capacity(tris * 3),
            vertex_kinds: Vec::with_capacity(verts),
            flat_shaded,
        }
    }
}
