use std::sync::Arc;

use landmass_geom::Vec2;
use landmass_world::{HeightMapGenerator, HeightMapSettings, MeshSettings, generate_height_map};

#[test]
fn generator_matches_pure_form() {
    let s = HeightMapSettings {
        use_falloff: true,
        ..HeightMapSettings::default()
    };
    let generator = HeightMapGenerator::new(Arc::new(s.clone()), 29);
    let c = Vec2::new(-290.0, 58.0);
    assert_eq!(generator.generate(29, 29, c), generate_height_map(29, 29, &s, c));
}

#[test]
fn falloff_flattens_rim() {
    let s = HeightMapSettings {
        use_falloff: true,
        ..HeightMapSettings::default()
    };
    let map = generate_height_map(25, 25, &s, Vec2::new(40.0, 40.0));
    for i in 0..25 {
        assert_eq!(map.get(i, 0), 0.0);
        assert_eq!(map.get(0, i), 0.0);
        assert_eq!(map.get(i, 24), 0.0);
        assert_eq!(map.get(24, i), 0.0);
    }
}

#[test]
fn neighbouring_chunks_share_edge_samples() {
    // Adjacent chunks overlap by three samples, so the last columns of one are the
    // first columns of the next when centres are `n - 3` apart.
    let mesh = MeshSettings {
        chunk_size_index: 0,
        ..MeshSettings::default()
    };
    let n = mesh.num_verts_per_line();
    let s = HeightMapSettings::default();
    let step = (n - 3) as f32;
    let a = generate_height_map(n, n, &s, Vec2::new(0.0, 0.0));
    let b = generate_height_map(n, n, &s, Vec2::new(step, 0.0));
    for y in 0..n {
        for k in 0..3 {
            assert_eq!(a.get(n - 3 + k, y), b.get(k, y), "row {y} col {k}");
        }
    }
}

#[test]
fn get_is_row_major() {
    let s = HeightMapSettings::default();
    let map = generate_height_map(7, 5, &s, Vec2::ZERO);
    assert_eq!(map.width, 7);
    assert_eq!(map.height, 5);
    assert_eq!(map.get(3, 2), map.values[2 * 7 + 3]);
    assert_eq!(map.get(6, 4), map.values[34]);
}
