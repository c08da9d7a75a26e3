use std::sync::Arc;

use landmass_geom::{Aabb, Vec2};
use landmass_mesh_cpu::MeshPayload;
use landmass_world::{ChunkCoord, HeightMap, LodInfo, StreamingSettings};

#[derive(Clone, Debug)]
pub enum HeightState {
    Unrequested,
    Pending { token: u64 },
    Ready(Arc<HeightMap>),
}

#[derive(Clone, Debug)]
pub enum MeshSlot {
    Empty,
    Pending { token: u64 },
    Ready(Arc<MeshPayload>),
}

impl MeshSlot {
    pub fn mesh(&self) -> Option<&Arc<MeshPayload>> {
        match self {
            MeshSlot::Ready(m) => Some(m),
            _ => None,
        }
    }
}

/// Cached mesh for one row of the LOD table.
#[derive(Clone, Debug)]
pub struct LodMesh {
    pub lod: usize,
    pub slot: MeshSlot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColliderState {
    None,
    /// In range; waiting for the collider LOD mesh.
    Pending,
    Ready,
}

/// Coarse lifecycle view of a chunk, for reporting and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkPhase {
    Unrequested,
    HeightPending,
    HeightReady,
    MeshPending { lod: usize },
    MeshReady { lod: usize },
}

/// What the streamer must do after [`TerrainChunk::plan_update`].
#[derive(Debug, Default)]
pub(crate) struct ChunkUpdate {
    pub request_height: bool,
    pub request_mesh: Option<usize>,
    pub show: Option<Arc<MeshPayload>>,
    pub visibility_changed: Option<bool>,
}

pub(crate) enum ColliderAction {
    Nothing,
    RequestMesh(usize),
    Attach(Arc<MeshPayload>),
}

/// One terrain tile. Only touches its own record; the streamer turns the
/// returned plans into jobs and sink calls.
#[derive(Debug)]
pub struct TerrainChunk {
    coord: ChunkCoord,
    position: Vec2,
    sample_center: Vec2,
    bounds: Aabb,
    height: HeightState,
    lod_meshes: Vec<LodMesh>,
    target_lod: Option<usize>,
    current_lod: Option<usize>,
    visible: bool,
    collider: ColliderState,
    pub(crate) last_visible_update: u64,
}

impl TerrainChunk {
    pub(crate) fn new(
        coord: ChunkCoord,
        chunk_world_size: f32,
        mesh_scale: f32,
        height_range: (f32, f32),
        lods: &[LodInfo],
        window_update: u64,
    ) -> Self {
        let position = coord.world_center(chunk_world_size);
        Self {
            coord,
            position,
            sample_center: position / mesh_scale,
            bounds: Aabb::from_footprint(
                position,
                chunk_world_size,
                height_range.0,
                height_range.1,
            ),
            height: HeightState::Unrequested,
            lod_meshes: lods
                .iter()
                .map(|l| LodMesh {
                    lod: l.lod,
                    slot: MeshSlot::Empty,
                })
                .collect(),
            target_lod: None,
            current_lod: None,
            visible: false,
            collider: ColliderState::None,
            last_visible_update: window_update,
        }
    }

    /// Back to `Unrequested` under new settings. Outstanding tokens no longer match.
    /// Visibility is kept so the owner's visible set stays consistent.
    pub(crate) fn reset(
        &mut self,
        chunk_world_size: f32,
        mesh_scale: f32,
        height_range: (f32, f32),
        lods: &[LodInfo],
    ) {
        let visible = self.visible;
        let last = self.last_visible_update;
        *self = Self::new(self.coord, chunk_world_size, mesh_scale, height_range, lods, last);
        self.visible = visible;
    }

    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// World-space centre on the xz plane.
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Height-map centre in noise-grid units.
    pub fn sample_center(&self) -> Vec2 {
        self.sample_center
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn height(&self) -> &HeightState {
        &self.height
    }

    pub fn height_map(&self) -> Option<&Arc<HeightMap>> {
        match &self.height {
            HeightState::Ready(m) => Some(m),
            _ => None,
        }
    }

    pub fn lod_meshes(&self) -> &[LodMesh] {
        &self.lod_meshes
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn collider(&self) -> ColliderState {
        self.collider
    }

    /// Detail level of the mesh currently shown.
    pub fn current_lod(&self) -> Option<usize> {
        self.current_lod.map(|i| self.lod_meshes[i].lod)
    }

    pub fn current_mesh(&self) -> Option<&Arc<MeshPayload>> {
        self.current_lod.and_then(|i| self.lod_meshes[i].slot.mesh())
    }

    pub fn phase(&self) -> ChunkPhase {
        match &self.height {
            HeightState::Unrequested => return ChunkPhase::Unrequested,
            HeightState::Pending { .. } => return ChunkPhase::HeightPending,
            HeightState::Ready(_) => {}
        }
        let Some(target) = self.target_lod else {
            return ChunkPhase::HeightReady;
        };
        let lod = self.lod_meshes[target].lod;
        match (&self.lod_meshes[target].slot, self.current_lod == Some(target)) {
            (MeshSlot::Ready(_), true) => ChunkPhase::MeshReady { lod },
            (MeshSlot::Pending { .. }, _) => ChunkPhase::MeshPending { lod },
            _ => ChunkPhase::HeightReady,
        }
    }

    pub(crate) fn begin_height_request(&mut self, token: u64) {
        self.height = HeightState::Pending { token };
    }

    /// Stores `map` if `token` is the outstanding request. Tightens the vertical
    /// bounds to the observed range.
    pub(crate) fn accept_height(&mut self, token: u64, map: HeightMap) -> bool {
        if !matches!(self.height, HeightState::Pending { token: t } if t == token) {
            return false;
        }
        self.bounds = self.bounds.with_height_range(map.min, map.max);
        self.height = HeightState::Ready(Arc::new(map));
        true
    }

    pub(crate) fn abandon_height(&mut self, token: u64) -> bool {
        if matches!(self.height, HeightState::Pending { token: t } if t == token) {
            self.height = HeightState::Unrequested;
            return true;
        }
        false
    }

    pub(crate) fn begin_mesh_request(&mut self, index: usize, token: u64) {
        self.lod_meshes[index].slot = MeshSlot::Pending { token };
    }

    pub(crate) fn accept_mesh(&mut self, index: usize, token: u64, mesh: MeshPayload) -> bool {
        let Some(slot) = self.lod_meshes.get_mut(index) else {
            return false;
        };
        if !matches!(slot.slot, MeshSlot::Pending { token: t } if t == token) {
            return false;
        }
        slot.slot = MeshSlot::Ready(Arc::new(mesh));
        true
    }

    pub(crate) fn abandon_mesh(&mut self, index: usize, token: u64) -> bool {
        match self.lod_meshes.get_mut(index) {
            Some(slot) if matches!(slot.slot, MeshSlot::Pending { token: t } if t == token) => {
                slot.slot = MeshSlot::Empty;
                true
            }
            _ => false,
        }
    }

    /// Distance-driven LOD and visibility decision. The first LOD row whose
    /// threshold reaches the viewer wins; beyond the last row the chunk hides.
    pub(crate) fn plan_update(
        &mut self,
        viewer: Vec2,
        lods: &[LodInfo],
        window_update: u64,
    ) -> ChunkUpdate {
        let mut out = ChunkUpdate::default();
        if !matches!(self.height, HeightState::Ready(_)) {
            out.request_height = matches!(self.height, HeightState::Unrequested);
            return out;
        }
        let Some(last) = lods.last() else {
            return out;
        };

        let dist = self.bounds.sqr_distance_xz(viewer).sqrt();
        let visible = dist <= last.visible_distance;
        if visible {
            self.last_visible_update = window_update;
            let index = lods
                .iter()
                .position(|l| dist <= l.visible_distance)
                .unwrap_or(lods.len() - 1);
            self.target_lod = Some(index);
            if self.current_lod != Some(index) {
                match &self.lod_meshes[index].slot {
                    MeshSlot::Ready(mesh) => {
                        self.current_lod = Some(index);
                        out.show = Some(Arc::clone(mesh));
                    }
                    MeshSlot::Empty => out.request_mesh = Some(index),
                    MeshSlot::Pending { .. } => {}
                }
            }
        }
        if visible != self.visible {
            self.visible = visible;
            out.visibility_changed = Some(visible);
        }
        out
    }

    /// Collider decisions use the fixed collider LOD, independent of what is rendered.
    pub(crate) fn plan_collider(
        &mut self,
        viewer: Vec2,
        lods: &[LodInfo],
        streaming: &StreamingSettings,
    ) -> ColliderAction {
        if self.collider == ColliderState::Ready || !matches!(self.height, HeightState::Ready(_)) {
            return ColliderAction::Nothing;
        }
        let index = streaming.collider_lod_index;
        let Some(info) = lods.get(index) else {
            return ColliderAction::Nothing;
        };
        let sqr_dst = self.bounds.sqr_distance_xz(viewer);
        let mut action = ColliderAction::Nothing;
        if sqr_dst < info.sqr_visible_distance() {
            self.collider = ColliderState::Pending;
            if matches!(self.lod_meshes[index].slot, MeshSlot::Empty) {
                action = ColliderAction::RequestMesh(index);
            }
        }
        let gen_dist = streaming.collider_generation_distance;
        if sqr_dst < gen_dist * gen_dist
            && let MeshSlot::Ready(mesh) = &self.lod_meshes[index].slot
        {
            self.collider = ColliderState::Ready;
            action = ColliderAction::Attach(Arc::clone(mesh));
        }
        action
    }
}
