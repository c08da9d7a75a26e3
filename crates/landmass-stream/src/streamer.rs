use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, unbounded};
use hashbrown::{HashMap, HashSet};
use landmass_geom::Vec2;
use landmass_mesh_cpu::{LodMeshBuilder, MeshError, MeshPayload};
use landmass_runtime::{Executor, JobError, QueueStats, WorkQueue};
use landmass_world::{
    ChunkCoord, ConfigError, HeightMap, HeightMapGenerator, ListenerId, TerrainConfig,
    UpdatableSettings,
};

use crate::chunk::{ColliderAction, ColliderState, TerrainChunk};
use crate::sink::TerrainSink;

const SETTINGS_LISTENER: ListenerId = ListenerId("chunk-streamer");

/// Everything a worker needs for one settings version. Shared read-only.
struct GenContext {
    config: Arc<TerrainConfig>,
    heights: HeightMapGenerator,
    mesher: LodMeshBuilder,
    verts_per_line: usize,
    chunk_world_size: f32,
    radius: i32,
}

impl GenContext {
    fn new(config: Arc<TerrainConfig>) -> Self {
        let verts_per_line = config.mesh.num_verts_per_line();
        let chunk_world_size = config.mesh.mesh_world_size();
        let radius = (config.max_view_distance() / chunk_world_size).round() as i32;
        Self {
            heights: HeightMapGenerator::new(Arc::new(config.height_map.clone()), verts_per_line),
            mesher: LodMeshBuilder::new(&config.mesh),
            verts_per_line,
            chunk_world_size,
            radius,
            config,
        }
    }

    fn height_range(&self) -> (f32, f32) {
        let hm = &self.config.height_map;
        (hm.min_height(), hm.max_height())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub chunks: usize,
    pub visible: usize,
    pub colliders: usize,
    pub evicted_total: u64,
    pub stale_results_dropped: u64,
    pub failed_jobs: u64,
    pub rejected_requests: u64,
    pub settings_reloads: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub completions: usize,
    /// Deferred chunks re-planned this tick.
    pub retried: usize,
    pub window_updated: bool,
    pub chunks_created: usize,
    pub chunks_evicted: usize,
    pub visible: usize,
    pub in_flight: usize,
}

/// Owning-thread state. Job callbacks receive it through the work queue.
pub struct StreamState {
    ctx: Arc<GenContext>,
    chunks: HashMap<ChunkCoord, TerrainChunk>,
    visible: HashSet<ChunkCoord>,
    viewer: Vec2,
    sink: Box<dyn TerrainSink>,
    next_token: u64,
    window_updates: u64,
    /// Chunks whose last request was refused or failed; re-driven every tick.
    deferred: HashSet<ChunkCoord>,
    stats: StreamStats,
}

impl StreamState {
    fn token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    fn create_chunk(&mut self, queue: &WorkQueue<StreamState>, coord: ChunkCoord) {
        let ctx = &self.ctx;
        let chunk = TerrainChunk::new(
            coord,
            ctx.chunk_world_size,
            ctx.config.mesh.mesh_scale,
            ctx.height_range(),
            &ctx.config.lods,
            self.window_updates,
        );
        log::debug!(target: "stream", "chunk {:?} created at {:?}", coord, chunk.position());
        self.chunks.insert(coord, chunk);
        self.request_height(queue, coord);
    }

    fn request_height(&mut self, queue: &WorkQueue<StreamState>, coord: ChunkCoord) {
        let token = self.token();
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return;
        };
        let ctx = Arc::clone(&self.ctx);
        let center = chunk.sample_center();
        let submitted = queue.submit(
            move || {
                let n = ctx.verts_per_line;
                ctx.heights.generate(n, n, center)
            },
            move |state: &mut StreamState, queue: &WorkQueue<StreamState>, result| {
                state.on_height_ready(queue, coord, token, result)
            },
        );
        match submitted {
            Ok(()) => chunk.begin_height_request(token),
            Err(e) => {
                self.stats.rejected_requests += 1;
                self.deferred.insert(coord);
                log::debug!(target: "stream", "height request for {:?} deferred: {}", coord, e);
            }
        }
    }

    fn on_height_ready(
        &mut self,
        queue: &WorkQueue<StreamState>,
        coord: ChunkCoord,
        token: u64,
        result: Result<HeightMap, JobError>,
    ) {
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            self.stats.stale_results_dropped += 1;
            return;
        };
        match result {
            Ok(map) => {
                if !chunk.accept_height(token, map) {
                    self.stats.stale_results_dropped += 1;
                    log::trace!(target: "stream", "stale height map for {:?} dropped", coord);
                    return;
                }
            }
            Err(e) => {
                self.stats.failed_jobs += 1;
                if chunk.abandon_height(token) {
                    self.deferred.insert(coord);
                }
                log::warn!(target: "stream", "height map for {:?} failed: {}", coord, e);
                return;
            }
        }
        self.update_chunk(queue, coord);
        self.update_collision(queue, coord);
    }

    fn request_mesh(&mut self, queue: &WorkQueue<StreamState>, coord: ChunkCoord, index: usize) {
        let token = self.token();
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return;
        };
        let Some(map) = chunk.height_map().cloned() else {
            return;
        };
        let lod = chunk.lod_meshes()[index].lod;
        let ctx = Arc::clone(&self.ctx);
        let submitted = queue.submit(
            move || ctx.mesher.build(&map, lod),
            move |state: &mut StreamState, queue: &WorkQueue<StreamState>, result| {
                state.on_mesh_ready(queue, coord, index, token, result)
            },
        );
        match submitted {
            Ok(()) => chunk.begin_mesh_request(index, token),
            Err(e) => {
                self.stats.rejected_requests += 1;
                self.deferred.insert(coord);
                log::debug!(
                    target: "stream",
                    "lod {} mesh for {:?} deferred: {}",
                    lod,
                    coord,
                    e
                );
            }
        }
    }

    fn on_mesh_ready(
        &mut self,
        queue: &WorkQueue<StreamState>,
        coord: ChunkCoord,
        index: usize,
        token: u64,
        result: Result<Result<MeshPayload, MeshError>, JobError>,
    ) {
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            self.stats.stale_results_dropped += 1;
            return;
        };
        let failure = match result {
            Ok(Ok(mesh)) => {
                if !chunk.accept_mesh(index, token, mesh) {
                    self.stats.stale_results_dropped += 1;
                    log::trace!(target: "stream", "stale mesh for {:?} dropped", coord);
                    return;
                }
                None
            }
            Ok(Err(e)) => Some(e.to_string()),
            Err(e) => Some(e.to_string()),
        };
        if let Some(reason) = failure {
            if chunk.abandon_mesh(index, token) {
                self.stats.failed_jobs += 1;
                log::error!(
                    target: "stream",
                    "mesh for {:?} (lod index {}) failed: {}",
                    coord,
                    index,
                    reason
                );
            } else {
                self.stats.stale_results_dropped += 1;
            }
            return;
        }
        self.update_chunk(queue, coord);
        if index == self.ctx.config.streaming.collider_lod_index {
            self.update_collision(queue, coord);
        }
    }

    /// Re-plans every deferred chunk. Requests refused again land back in the set.
    fn retry_deferred(&mut self, queue: &WorkQueue<StreamState>) -> usize {
        if self.deferred.is_empty() {
            return 0;
        }
        let pending = std::mem::take(&mut self.deferred);
        let count = pending.len();
        for coord in pending {
            self.update_chunk(queue, coord);
            self.update_collision(queue, coord);
        }
        log::trace!(
            target: "stream",
            "retried {} deferred chunk(s), {} still waiting",
            count,
            self.deferred.len()
        );
        count
    }

    fn update_chunk(&mut self, queue: &WorkQueue<StreamState>, coord: ChunkCoord) {
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return;
        };
        let plan = chunk.plan_update(self.viewer, &self.ctx.config.lods, self.window_updates);
        let position = chunk.position();
        if let Some(mesh) = &plan.show {
            log::debug!(
                target: "stream",
                "chunk {:?} shows lod {} ({} tris)",
                coord,
                mesh.lod,
                mesh.triangle_count()
            );
            self.sink.mesh_ready(coord, position, mesh);
        }
        if let Some(visible) = plan.visibility_changed {
            if visible {
                self.visible.insert(coord);
            } else {
                self.visible.remove(&coord);
            }
            self.sink.visibility_changed(coord, visible);
        }
        if plan.request_height {
            self.request_height(queue, coord);
        }
        if let Some(index) = plan.request_mesh {
            self.request_mesh(queue, coord, index);
        }
    }

    fn update_collision(&mut self, queue: &WorkQueue<StreamState>, coord: ChunkCoord) {
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return;
        };
        let cfg = &self.ctx.config;
        match chunk.plan_collider(self.viewer, &cfg.lods, &cfg.streaming) {
            ColliderAction::Nothing => {}
            ColliderAction::RequestMesh(index) => self.request_mesh(queue, coord, index),
            ColliderAction::Attach(mesh) => {
                let position = chunk.position();
                log::debug!(target: "stream", "collider ready for {:?}", coord);
                self.sink.collider_ready(coord, position, &mesh);
            }
        }
    }

    /// Re-evaluates visible chunks, then every coordinate in the square window
    /// around the viewer, creating chunks that do not exist yet.
    fn update_visible_chunks(&mut self, queue: &WorkQueue<StreamState>) -> (usize, usize) {
        self.window_updates += 1;
        let mut already_updated: HashSet<ChunkCoord> = HashSet::with_capacity(self.visible.len());
        let visible_now: Vec<ChunkCoord> = self.visible.iter().copied().collect();
        for coord in visible_now {
            already_updated.insert(coord);
            self.update_chunk(queue, coord);
        }

        let center = ChunkCoord::containing(self.viewer, self.ctx.chunk_world_size);
        let r = self.ctx.radius;
        let mut created = 0;
        for dz in -r..=r {
            for dx in -r..=r {
                let coord = center.offset(dx, dz);
                if already_updated.contains(&coord) {
                    continue;
                }
                if self.chunks.contains_key(&coord) {
                    self.update_chunk(queue, coord);
                } else {
                    self.create_chunk(queue, coord);
                    created += 1;
                }
            }
        }
        let evicted = self.evict_idle(center, r);
        log::debug!(
            target: "stream",
            "window update #{} around {:?}: {} created, {} evicted, {} visible, {} total",
            self.window_updates,
            center,
            created,
            evicted,
            self.visible.len(),
            self.chunks.len()
        );
        (created, evicted)
    }

    fn evict_idle(&mut self, center: ChunkCoord, r: i32) -> usize {
        let Some(max_idle) = self.ctx.config.streaming.eviction.max_idle_updates else {
            return 0;
        };
        let now = self.window_updates;
        let doomed: Vec<ChunkCoord> = self
            .chunks
            .iter()
            .filter(|(c, chunk)| {
                let in_window = (c.cx - center.cx).abs() <= r && (c.cz - center.cz).abs() <= r;
                !chunk.is_visible() && !in_window && now - chunk.last_visible_update > max_idle
            })
            .map(|(c, _)| *c)
            .collect();
        for coord in &doomed {
            self.chunks.remove(coord);
            self.sink.chunk_removed(*coord);
        }
        self.stats.evicted_total += doomed.len() as u64;
        doomed.len()
    }

    fn apply_settings(&mut self, config: Arc<TerrainConfig>) -> Result<(), ConfigError> {
        config.validate()?;
        self.ctx = Arc::new(GenContext::new(config));
        let ctx = &self.ctx;
        for chunk in self.chunks.values_mut() {
            chunk.reset(
                ctx.chunk_world_size,
                ctx.config.mesh.mesh_scale,
                ctx.height_range(),
                &ctx.config.lods,
            );
        }
        self.stats.settings_reloads += 1;
        log::info!(
            target: "stream",
            "terrain settings changed: {} chunk(s) invalidated, radius {} at {:.1} units per chunk",
            self.chunks.len(),
            ctx.radius,
            ctx.chunk_world_size
        );
        Ok(())
    }
}

/// Keeps the chunk window around a moving viewer populated with meshes.
///
/// Call [`ChunkStreamer::tick`] once per frame from the owning thread. Height
/// maps and meshes are built on the executor; results are applied during the
/// next tick.
pub struct ChunkStreamer {
    queue: WorkQueue<StreamState>,
    state: StreamState,
    settings_tx: Sender<Arc<TerrainConfig>>,
    settings_rx: Receiver<Arc<TerrainConfig>>,
    last_window_viewer: Option<Vec2>,
    last_collider_viewer: Option<Vec2>,
    force_window_update: bool,
    tick: u64,
}

impl ChunkStreamer {
    pub fn new(
        config: Arc<TerrainConfig>,
        executor: Arc<dyn Executor>,
        sink: Box<dyn TerrainSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let ctx = Arc::new(GenContext::new(config));
        let queue = WorkQueue::new(executor).with_max_in_flight(ctx.config.streaming.max_in_flight);
        log::info!(
            target: "stream",
            "streamer ready: {} verts per line, {:.1} units per chunk, window radius {}",
            ctx.verts_per_line,
            ctx.chunk_world_size,
            ctx.radius
        );
        let (settings_tx, settings_rx) = unbounded();
        Ok(Self {
            queue,
            state: StreamState {
                ctx,
                chunks: HashMap::new(),
                visible: HashSet::new(),
                viewer: Vec2::ZERO,
                sink,
                next_token: 0,
                window_updates: 0,
                deferred: HashSet::new(),
                stats: StreamStats::default(),
            },
            settings_tx,
            settings_rx,
            last_window_viewer: None,
            last_collider_viewer: None,
            force_window_update: true,
            tick: 0,
        })
    }

    /// Registers for settings changes; they are applied at the start of the next tick.
    /// Returns `false` if this streamer kind is already subscribed.
    pub fn subscribe_to(&self, settings: &mut UpdatableSettings<TerrainConfig>) -> bool {
        let tx = self.settings_tx.clone();
        settings.subscribe(SETTINGS_LISTENER, move |cfg: &Arc<TerrainConfig>| {
            let _ = tx.send(Arc::clone(cfg));
        })
    }

    /// Queues a settings change for the next tick.
    pub fn request_settings(&self, config: Arc<TerrainConfig>) {
        let _ = self.settings_tx.send(config);
    }

    pub fn tick(&mut self, viewer: Vec2) -> TickReport {
        self.tick += 1;
        let completions = self.queue.drain_and_dispatch(&mut self.state);

        // Only the newest pending settings matter.
        if let Some(cfg) = self.settings_rx.try_iter().last() {
            match self.state.apply_settings(cfg) {
                Ok(()) => {
                    self.queue
                        .set_max_in_flight(self.state.ctx.config.streaming.max_in_flight);
                    self.force_window_update = true;
                }
                Err(e) => log::error!(target: "stream", "ignoring invalid terrain settings: {}", e),
            }
        }

        self.state.viewer = viewer;
        // Capacity freed by the drain goes to work refused on earlier ticks first.
        let retried = self.state.retry_deferred(&self.queue);

        let streaming = &self.state.ctx.config.streaming;
        let eps = streaming.collider_move_epsilon;
        let collider_moved = self
            .last_collider_viewer
            .is_none_or(|p| p.distance_sq(viewer) > eps * eps);
        let window_moved = self
            .last_window_viewer
            .is_none_or(|p| p.distance_sq(viewer) > streaming.sqr_viewer_move_threshold());

        if collider_moved {
            self.last_collider_viewer = Some(viewer);
            let visible: Vec<ChunkCoord> = self.state.visible.iter().copied().collect();
            for coord in visible {
                self.state.update_collision(&self.queue, coord);
            }
        }

        let mut report = TickReport {
            tick: self.tick,
            completions,
            retried,
            ..TickReport::default()
        };
        if self.force_window_update || window_moved {
            self.force_window_update = false;
            self.last_window_viewer = Some(viewer);
            let (created, evicted) = self.state.update_visible_chunks(&self.queue);
            report.window_updated = true;
            report.chunks_created = created;
            report.chunks_evicted = evicted;
        }
        report.visible = self.state.visible.len();
        report.in_flight = self.queue.in_flight();
        report
    }

    /// Forces a window update on the next tick even if the viewer has not moved.
    pub fn invalidate_window(&mut self) {
        self.force_window_update = true;
    }

    pub fn config(&self) -> &Arc<TerrainConfig> {
        &self.state.ctx.config
    }

    pub fn chunk_world_size(&self) -> f32 {
        self.state.ctx.chunk_world_size
    }

    /// Chunks on each side of the viewer's chunk covered by a window update.
    pub fn view_radius(&self) -> i32 {
        self.state.ctx.radius
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&TerrainChunk> {
        self.state.chunks.get(&coord)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &TerrainChunk> + '_ {
        self.state.chunks.values()
    }

    pub fn chunk_count(&self) -> usize {
        self.state.chunks.len()
    }

    pub fn visible(&self) -> &HashSet<ChunkCoord> {
        &self.state.visible
    }

    /// Visible chunks grouped by the detail level they currently show.
    pub fn lod_histogram(&self) -> Vec<(usize, usize)> {
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for coord in &self.state.visible {
            if let Some(lod) = self.state.chunks.get(coord).and_then(|c| c.current_lod()) {
                *counts.entry(lod).or_default() += 1;
            }
        }
        let mut out: Vec<(usize, usize)> = counts.into_iter().collect();
        out.sort_unstable();
        out
    }

    pub fn stats(&self) -> StreamStats {
        StreamStats {
            chunks: self.state.chunks.len(),
            visible: self.state.visible.len(),
            colliders: self
                .state
                .chunks
                .values()
                .filter(|c| c.collider() == ColliderState::Ready)
                .count(),
            ..self.state.stats
        }
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    pub fn in_flight(&self) -> usize {
        self.queue.in_flight()
    }
}
