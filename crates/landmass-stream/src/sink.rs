use std::sync::Arc;

use landmass_geom::Vec2;
use landmass_mesh_cpu::MeshPayload;
use landmass_world::ChunkCoord;

/// Render and physics side of the streamer. Called only from `ChunkStreamer::tick`,
/// on the thread that owns the streamer.
pub trait TerrainSink {
    /// `mesh` replaces whatever the chunk showed before. `position` is the chunk
    /// centre on the xz plane; mesh positions are relative to it.
    fn mesh_ready(&mut self, coord: ChunkCoord, position: Vec2, mesh: &Arc<MeshPayload>);
    fn visibility_changed(&mut self, coord: ChunkCoord, visible: bool);
    fn collider_ready(&mut self, coord: ChunkCoord, position: Vec2, mesh: &Arc<MeshPayload>);
    fn chunk_removed(&mut self, coord: ChunkCoord);
}

/// Discards everything. For headless runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl TerrainSink for NullSink {
    fn mesh_ready(&mut self, _: ChunkCoord, _: Vec2, _: &Arc<MeshPayload>) {}
    fn visibility_changed(&mut self, _: ChunkCoord, _: bool) {}
    fn collider_ready(&mut self, _: ChunkCoord, _: Vec2, _: &Arc<MeshPayload>) {}
    fn chunk_removed(&mut self, _: ChunkCoord) {}
}
