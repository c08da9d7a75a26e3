use std::time::Instant;

use landmass_geom::Vec3;
use landmass_world::{HeightMap, MeshSettings};

use crate::lod::{MeshError, check_height_map, lod_stride};
use crate::payload::{MeshPayload, VertexKind};

/// Builds LOD meshes from height maps sized `num_verts_per_line` on a side.
///
/// The outermost ring of the height map is never emitted; it only feeds normals
/// of the ring inside it. That ring is always kept at full resolution and the
/// ring inside it is bent onto the coarse grid, so any two LODs meet without cracks.
#[derive(Clone, Copy, Debug)]
pub struct LodMeshBuilder {
    mesh_scale: f32,
    flat_shaded: bool,
}

impl LodMeshBuilder {
    pub fn new(settings: &MeshSettings) -> Self {
        Self {
            mesh_scale: settings.mesh_scale,
            flat_shaded: settings.use_flat_shading,
        }
    }

    pub fn build(&self, map: &HeightMap, lod: usize) -> Result<MeshPayload, MeshError> {
        let t0 = Instant::now();
        let skip = lod_stride(lod)?;
        let n = check_height_map(map, skip)?;

        let grid = Grid { n, skip };
        let mut vertex_index: Vec<Option<u32>> = vec![None; n * n];
        let mut next = 0u32;
        for y in 1..n - 1 {
            for x in 1..n - 1 {
                if !grid.is_skipped(x, y) {
                    vertex_index[y * n + x] = Some(next);
                    next += 1;
                }
            }
        }

        let mut out = MeshPayload::with_capacity(lod, next as usize, next as usize * 2, false);
        let inv_span = 1.0 / (n - 3) as f32;
        let half = (n - 3) as f32 * 0.5;
        for y in 1..n - 1 {
            for x in 1..n - 1 {
                if grid.is_skipped(x, y) {
                    continue;
                }
                let kind = grid.kind(x, y);
                let h = match kind {
                    VertexKind::EdgeConnection => grid.connection_height(map, x, y),
                    _ => map.get(x, y),
                };
                out.positions.push(Vec3::new(
                    ((x - 1) as f32 - half) * self.mesh_scale,
                    h,
                    ((y - 1) as f32 - half) * self.mesh_scale,
                ));
                out.normals.push(self.sample_normal(map, x, y));
                out.uvs.push([(x - 1) as f32 * inv_span, (y - 1) as f32 * inv_span]);
                out.vertex_kinds.push(kind);

                let connection = kind == VertexKind::EdgeConnection;
                let emits_cell = x < n - 2 && y < n - 2 && (!connection || (x != 2 && y != 2));
                if !emits_cell {
                    continue;
                }
                let inc = if kind == VertexKind::Main && x != n - 3 && y != n - 3 {
                    skip
                } else {
                    1
                };
                let at = |cx: usize, cy: usize| vertex_index[cy * n + cx];
                let (Some(a), Some(b), Some(c), Some(d)) =
                    (at(x, y), at(x + inc, y), at(x, y + inc), at(x + inc, y + inc))
                else {
                    // Unreachable for a map that passed `check_height_map`.
                    log::warn!("lod {lod}: cell at ({x}, {y}) references a skipped vertex");
                    continue;
                };
                out.indices.extend_from_slice(&[a, c, d, d, b, a]);
            }
        }

        if self.flat_shaded {
            out = flatten(out);
        }
        log::debug!(
            target: "mesh",
            "lod {} mesh: {} verts, {} tris in {:?}",
            lod,
            out.vertex_count(),
            out.triangle_count(),
            t0.elapsed()
        );
        Ok(out)
    }

    /// Full-resolution central difference; identical on both sides of a seam.
    fn sample_normal(&self, map: &HeightMap, x: usize, y: usize) -> Vec3 {
        let dx = (map.get(x + 1, y) - map.get(x - 1, y)) / (2.0 * self.mesh_scale);
        let dz = (map.get(x, y + 1) - map.get(x, y - 1)) / (2.0 * self.mesh_scale);
        Vec3::new(-dx, 1.0, -dz).normalized()
    }
}

/// Pure form of [`LodMeshBuilder::build`].
pub fn build_lod_mesh(
    map: &HeightMap,
    settings: &MeshSettings,
    lod: usize,
) -> Result<MeshPayload, MeshError> {
    LodMeshBuilder::new(settings).build(map, lod)
}

#[derive(Clone, Copy)]
struct Grid {
    n: usize,
    skip: usize,
}

impl Grid {
    #[inline]
    fn is_skipped(&self, x: usize, y: usize) -> bool {
        let n = self.n;
        x > 2
            && x < n - 3
            && y > 2
            && y < n - 3
            && ((x - 2) % self.skip != 0 || (y - 2) % self.skip != 0)
    }

    // Only meaningful for the emitted range 1..n-1.
    fn kind(&self, x: usize, y: usize) -> VertexKind {
        let n = self.n;
        if x == 1 || y == 1 || x == n - 2 || y == n - 2 {
            VertexKind::MeshEdge
        } else if (x - 2) % self.skip == 0 && (y - 2) % self.skip == 0 {
            VertexKind::Main
        } else {
            VertexKind::EdgeConnection
        }
    }

    /// Height on the straight line between the two main vertices bracketing `(x, y)`.
    fn connection_height(&self, map: &HeightMap, x: usize, y: usize) -> f32 {
        let vertical = x == 2 || x == self.n - 3;
        let along = if vertical { y - 2 } else { x - 2 };
        let to_a = along % self.skip;
        let to_b = self.skip - to_a;
        let t = to_a as f32 / self.skip as f32;
        let (ha, hb) = if vertical {
            (map.get(x, y - to_a), map.get(x, y + to_b))
        } else {
            (map.get(x - to_a, y), map.get(x + to_b, y))
        };
        ha * (1.0 - t) + hb * t
    }
}

/// One vertex per triangle corner, each carrying the face normal.
fn flatten(shared: MeshPayload) -> MeshPayload {
    let tris = shared.triangle_count();
    let mut out = MeshPayload::with_capacity(shared.lod, tris * 3, tris, true);
    for tri in shared.triangles() {
        let [a, b, c] = tri.map(|i| i as usize);
        let (pa, pb, pc) = (shared.positions[a], shared.positions[b], shared.positions[c]);
        let face = (pb - pa).cross(pc - pa).normalized();
        for i in [a, b, c] {
            out.indices.push(out.positions.len() as u32);
            out.positions.push(shared.positions[i]);
            out.normals.push(face);
            out.uvs.push(shared.uvs[i]);
            out.vertex_kinds.push(shared.vertex_kinds[i]);
        }
    }
    out
}
