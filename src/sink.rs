use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use hashbrown::HashMap;
use landmass_geom::Vec2;
use landmass_mesh_cpu::MeshPayload;
use landmass_stream::TerrainSink;
use landmass_world::ChunkCoord;

#[derive(Debug, Default)]
pub struct SinkTotals {
    pub meshes_by_lod: HashMap<usize, usize>,
    pub triangles_uploaded: usize,
    pub shown: usize,
    pub hidden: usize,
    pub colliders: usize,
    pub removed: usize,
}

/// Headless stand-in for a renderer: tallies what would have been uploaded.
#[derive(Clone, Default)]
pub struct TallySink {
    totals: Rc<RefCell<SinkTotals>>,
}

impl TallySink {
    pub fn totals(&self) -> std::cell::Ref<'_, SinkTotals> {
        self.totals.borrow()
    }
}

impl TerrainSink for TallySink {
    fn mesh_ready(&mut self, coord: ChunkCoord, _position: Vec2, mesh: &Arc<MeshPayload>) {
        let mut t = self.totals.borrow_mut();
        *t.meshes_by_lod.entry(mesh.lod).or_default() += 1;
        t.triangles_uploaded += mesh.triangle_count();
        log::trace!("upload {:?} lod {} ({} verts)", coord, mesh.lod, mesh.vertex_count());
    }

    fn visibility_changed(&mut self, _coord: ChunkCoord, visible: bool) {
        let mut t = self.totals.borrow_mut();
        if visible {
            t.shown += 1;
        } else {
            t.hidden += 1;
        }
    }

    fn collider_ready(&mut self, coord: ChunkCoord, _position: Vec2, mesh: &Arc<MeshPayload>) {
        self.totals.borrow_mut().colliders += 1;
        log::trace!("collider {:?} ({} tris)", coord, mesh.triangle_count());
    }

    fn chunk_removed(&mut self, _coord: ChunkCoord) {
        self.totals.borrow_mut().removed += 1;
    }
}
