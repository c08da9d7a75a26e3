use std::sync::Arc;

use landmass_geom::Vec2;
use landmass_runtime::InlineExecutor;
use landmass_stream::{ChunkPhase, ChunkStreamer, NullSink};
use landmass_world::{ChunkCoord, LodInfo, MeshSettings, NoiseSettings, TerrainConfig};
use proptest::prelude::*;

fn config() -> TerrainConfig {
    let mut cfg = TerrainConfig {
        mesh: MeshSettings {
            mesh_scale: 1.0,
            chunk_size_index: 0,
            ..MeshSettings::default()
        },
        lods: vec![LodInfo::new(0, 40.0), LodInfo::new(2, 80.0)],
        ..TerrainConfig::default()
    };
    cfg.height_map.noise = NoiseSettings {
        octaves: 2,
        ..NoiseSettings::default()
    };
    cfg
}

fn settled_at(viewer: Vec2) -> ChunkStreamer {
    let mut s = ChunkStreamer::new(Arc::new(config()), Arc::new(InlineExecutor), Box::new(NullSink))
        .expect("streamer");
    s.tick(viewer);
    for _ in 0..8 {
        if s.in_flight() == 0 {
            break;
        }
        s.tick(viewer);
    }
    s
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn window_is_populated_and_visibility_tracks_distance(
        x in -2000.0f32..2000.0,
        z in -2000.0f32..2000.0,
    ) {
        let viewer = Vec2::new(x, z);
        let s = settled_at(viewer);
        prop_assert_eq!(s.in_flight(), 0);
        prop_assert_eq!(s.chunk_count(), 25);

        let here = ChunkCoord::containing(viewer, s.chunk_world_size());
        for dz in -2..=2 {
            for dx in -2..=2 {
                prop_assert!(s.chunk(here.offset(dx, dz)).is_some());
            }
        }
        for chunk in s.chunks() {
            let dist = chunk.bounds().sqr_distance_xz(viewer).sqrt();
            prop_assert_eq!(chunk.is_visible(), dist <= 80.0);
            prop_assert_eq!(s.visible().contains(&chunk.coord()), chunk.is_visible());
            if chunk.is_visible() {
                let lod = if dist <= 40.0 { 0 } else { 2 };
                prop_assert_eq!(chunk.phase(), ChunkPhase::MeshReady { lod });
            }
        }
    }
}
