//! Terrain settings, height-field sampling, and chunk addressing.
#![forbid(unsafe_code)]

mod chunk_coord;
pub mod curve;
pub mod error;
pub mod falloff;
pub mod heightmap;
pub mod noise;
pub mod observe;
pub mod settings;

pub use chunk_coord::ChunkCoord;
pub use curve::HeightCurve;
pub use error::ConfigError;
pub use falloff::FalloffField;
pub use heightmap::{HeightMap, HeightMapGenerator, generate_height_map};
pub use noise::NoiseField;
pub use observe::{ListenerId, UpdatableSettings};
pub use settings::{
    EvictionSettings, HeightMapSettings, LodInfo, MeshSettings, NUM_SUPPORTED_CHUNK_SIZES,
    NUM_SUPPORTED_FLATSHADED_CHUNK_SIZES, NUM_SUPPORTED_LODS, NoiseSettings, NormalizeMode,
    SUPPORTED_CHUNK_SIZES, StreamingSettings, TerrainConfig, load_config_from_path,
};
