use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::time::Duration;

use landmass_geom::Vec2;
use landmass_mesh_cpu::LodMeshBuilder;
use landmass_world::{HeightMapSettings, MeshSettings, NUM_SUPPORTED_LODS, generate_height_map};

fn bench_build_lods(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_lod_mesh");
    let mesh = MeshSettings::default();
    let n = mesh.num_verts_per_line();
    let map = generate_height_map(n, n, &HeightMapSettings::default(), Vec2::new(0.0, 0.0));
    let builder = LodMeshBuilder::new(&mesh);
    for lod in 0..NUM_SUPPORTED_LODS {
        group.bench_function(format!("{n}x{n}_lod{lod}"), |b| {
            b.iter(|| black_box(builder.build(black_box(&map), lod)))
        });
    }
    group.finish();
}

fn bench_flat_shaded(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_lod_mesh_flat");
    let mesh = MeshSettings {
        use_flat_shading: true,
        ..MeshSettings::default()
    };
    let n = mesh.num_verts_per_line();
    let map = generate_height_map(n, n, &HeightMapSettings::default(), Vec2::new(0.0, 0.0));
    let builder = LodMeshBuilder::new(&mesh);
    group.bench_function(format!("{n}x{n}_lod0"), |b| {
        b.iter(|| black_box(builder.build(black_box(&map), 0)))
    });
    group.finish();
}

fn bench_height_map(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_height_map");
    let n = MeshSettings::default().num_verts_per_line();
    let settings = HeightMapSettings::default();
    group.bench_function(format!("{n}x{n}"), |b| {
        b.iter(|| black_box(generate_height_map(n, n, &settings, black_box(Vec2::new(242.0, 0.0)))))
    });
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(5));
    targets = bench_build_lods, bench_flat_shaded, bench_height_map
}
criterion_main!(benches);
