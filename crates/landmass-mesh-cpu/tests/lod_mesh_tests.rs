use landmass_geom::{Vec2, Vec3};
use landmass_world::{
    HeightMap, HeightMapSettings, MeshSettings, NUM_SUPPORTED_LODS, generate_height_map,
};
use landmass_mesh_cpu::{LodMeshBuilder, MeshError, MeshPayload, VertexKind, build_lod_mesh};

fn approx(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}

fn approx_v3(a: Vec3, b: Vec3, eps: f32) -> bool {
    approx(a.x, b.x, eps) && approx(a.y, b.y, eps) && approx(a.z, b.z, eps)
}

fn small_mesh_settings() -> MeshSettings {
    MeshSettings {
        mesh_scale: 1.5,
        chunk_size_index: 0,
        ..MeshSettings::default()
    }
}

fn map_from(n: usize, f: impl Fn(usize, usize) -> f32) -> HeightMap {
    let mut values = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            values.push(f(x, y));
        }
    }
    let min = values.iter().copied().fold(f32::MAX, f32::min);
    let max = values.iter().copied().fold(f32::MIN, f32::max);
    HeightMap {
        width: n,
        height: n,
        values,
        min,
        max,
    }
}

fn chunk_map(mesh: &MeshSettings, cx: i32, cz: i32) -> HeightMap {
    let n = mesh.num_verts_per_line();
    let step = (n - 3) as f32;
    generate_height_map(
        n,
        n,
        &HeightMapSettings::default(),
        Vec2::new(cx as f32 * step, cz as f32 * step),
    )
}

#[test]
fn lod0_counts() {
    let mesh = small_mesh_settings();
    let n = mesh.num_verts_per_line();
    assert_eq!(n, 53);
    let out = build_lod_mesh(&chunk_map(&mesh, 0, 0), &mesh, 0).expect("mesh");
    assert_eq!(out.lod, 0);
    assert_eq!(out.vertex_count(), (n - 2) * (n - 2));
    assert_eq!(out.triangle_count(), (n - 3) * (n - 3) * 2);
    assert_eq!(out.normals.len(), out.vertex_count());
    assert_eq!(out.uvs.len(), out.vertex_count());
    assert!(!out.vertex_kinds.contains(&VertexKind::EdgeConnection));
}

#[test]
fn coarser_lods_emit_fewer_triangles() {
    let mesh = small_mesh_settings();
    let map = chunk_map(&mesh, 0, 0);
    let builder = LodMeshBuilder::new(&mesh);
    let mut last = usize::MAX;
    for lod in 0..NUM_SUPPORTED_LODS {
        let out = builder.build(&map, lod).expect("mesh");
        assert!(out.triangle_count() < last, "lod {lod}");
        last = out.triangle_count();
    }
}

#[test]
fn mesh_spans_world_size_centred_on_origin() {
    let mesh = small_mesh_settings();
    let half = mesh.mesh_world_size() * 0.5;
    for lod in 0..NUM_SUPPORTED_LODS {
        let out = build_lod_mesh(&chunk_map(&mesh, 2, -1), &mesh, lod).expect("mesh");
        let b = out.bounds();
        assert!(approx(b.min.x, -half, 1e-4) && approx(b.max.x, half, 1e-4));
        assert!(approx(b.min.z, -half, 1e-4) && approx(b.max.z, half, 1e-4));
    }
}

#[test]
fn flat_shading_splits_vertices() {
    let mesh = MeshSettings {
        use_flat_shading: true,
        ..small_mesh_settings()
    };
    let map = map_from(mesh.num_verts_per_line(), |x, y| ((x * 7 + y * 3) % 5) as f32);
    for lod in 0..NUM_SUPPORTED_LODS {
        let out = build_lod_mesh(&map, &mesh, lod).expect("mesh");
        assert!(out.flat_shaded);
        assert_eq!(out.vertex_count(), out.triangle_count() * 3);
        assert_eq!(out.indices.len(), out.vertex_count());
        for (i, t) in out.triangles().enumerate() {
            assert_eq!(t, [3 * i as u32, 3 * i as u32 + 1, 3 * i as u32 + 2]);
            let [a, b, c] = t.map(|k| k as usize);
            let face = (out.positions[b] - out.positions[a])
                .cross(out.positions[c] - out.positions[a])
                .normalized();
            for k in [a, b, c] {
                assert!(approx_v3(out.normals[k], face, 1e-5));
            }
            assert!(face.y > 0.0);
        }
    }
}

#[test]
fn flat_normal_of_plane_is_up() {
    let mesh = small_mesh_settings();
    let map = map_from(mesh.num_verts_per_line(), |_, _| 4.0);
    let out = build_lod_mesh(&map, &mesh, 3).expect("mesh");
    for n in &out.normals {
        assert!(approx_v3(*n, Vec3::UP, 1e-6));
    }
    for p in &out.positions {
        assert_eq!(p.y, 4.0);
    }
}

#[test]
fn slope_normals_follow_gradient() {
    // h = 0.5 * x in sample units, so dh/dx in world units is 0.5 / scale.
    let mesh = small_mesh_settings();
    let out = build_lod_mesh(&map_from(mesh.num_verts_per_line(), |x, _| 0.5 * x as f32), &mesh, 1)
        .expect("mesh");
    let expect = Vec3::new(-0.5 / mesh.mesh_scale, 1.0, 0.0).normalized();
    for n in &out.normals {
        assert!(approx_v3(*n, expect, 1e-5));
    }
}

#[test]
fn connection_vertices_interpolate_main_heights() {
    let mesh = small_mesh_settings();
    let n = mesh.num_verts_per_line();
    let map = map_from(n, |x, y| (x * x + y * y) as f32);
    let out = build_lod_mesh(&map, &mesh, 1).expect("mesh");
    let half = (n - 3) as f32 * 0.5;
    let world = |s: usize| ((s - 1) as f32 - half) * mesh.mesh_scale;

    // Column x = 2, stride 2: (2, 3) sits halfway between mains (2, 2) and (2, 4).
    let i = out
        .positions
        .iter()
        .position(|p| p.x == world(2) && p.z == world(3))
        .expect("connection vertex");
    assert_eq!(out.vertex_kinds[i], VertexKind::EdgeConnection);
    assert!(approx(out.positions[i].y, 0.5 * (map.get(2, 2) + map.get(2, 4)), 1e-4));
    assert!(!approx(out.positions[i].y, map.get(2, 3), 1e-3));

    // Skipped interior samples are not emitted at all.
    assert!(!out.positions.iter().any(|p| p.x == world(5) && p.z == world(5)));
}

fn seam_vertices(out: &MeshPayload, x: f32) -> Vec<(f32, f32, Vec3)> {
    let mut v: Vec<(f32, f32, Vec3)> = out
        .positions
        .iter()
        .zip(&out.normals)
        .filter(|(p, _)| p.x == x)
        .map(|(p, n)| (p.z, p.y, *n))
        .collect();
    v.sort_by(|a, b| a.0.total_cmp(&b.0));
    v
}

#[test]
fn seams_match_across_lod_pairs() {
    let mesh = small_mesh_settings();
    let half = mesh.mesh_world_size() * 0.5;
    let left = chunk_map(&mesh, 0, 0);
    let right = chunk_map(&mesh, 1, 0);
    let builder = LodMeshBuilder::new(&mesh);
    for la in 0..NUM_SUPPORTED_LODS {
        let a = builder.build(&left, la).expect("left");
        let a_edge = seam_vertices(&a, half);
        assert_eq!(a_edge.len(), mesh.num_verts_per_line() - 2);
        for lb in 0..NUM_SUPPORTED_LODS {
            let b = builder.build(&right, lb).expect("right");
            let b_edge = seam_vertices(&b, -half);
            assert_eq!(a_edge.len(), b_edge.len(), "lods {la}/{lb}");
            for ((za, ha, na), (zb, hb, nb)) in a_edge.iter().zip(&b_edge) {
                assert_eq!(za, zb);
                assert_eq!(ha, hb, "height at z={za}, lods {la}/{lb}");
                assert!(approx_v3(*na, *nb, 1e-6), "normal at z={za}, lods {la}/{lb}");
            }
        }
    }
}

#[test]
fn rejects_malformed_maps() {
    let mesh = small_mesh_settings();
    let builder = LodMeshBuilder::new(&mesh);

    let mut rect = map_from(9, |_, _| 0.0);
    rect.height = 3;
    rect.values.truncate(27);
    assert_eq!(
        builder.build(&rect, 0),
        Err(MeshError::NotSquare { width: 9, height: 3 })
    );
    assert_eq!(
        builder.build(&map_from(4, |_, _| 0.0), 0),
        Err(MeshError::TooSmall { size: 4, min: 5 })
    );
    assert_eq!(
        builder.build(&map_from(10, |_, _| 0.0), 2),
        Err(MeshError::StrideMismatch { size: 10, stride: 4 })
    );
    assert_eq!(
        builder.build(&map_from(9, |_, _| 0.0), NUM_SUPPORTED_LODS),
        Err(MeshError::LodOutOfRange { lod: 5, max: 5 })
    );
}

#[test]
fn smallest_map_meshes_at_every_lod() {
    let mesh = small_mesh_settings();
    for lod in 0..NUM_SUPPORTED_LODS {
        let out = build_lod_mesh(&map_from(5, |x, y| (x + y) as f32), &mesh, lod).expect("mesh");
        assert_eq!(out.vertex_count(), 9);
        assert_eq!(out.triangle_count(), 8);
    }
}
